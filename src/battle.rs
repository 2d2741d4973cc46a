//! Battle simulator
//!
//! Two combatants trade blows until one faints. The player's attack and the
//! enemy's counter-attack are separate phases: the reducer commits phase one,
//! then schedules phase two after a short delay so the UI can show the hit.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::api::PokemonRecord;
use crate::rng::RandomSource;

/// Backend base HP is scaled by this factor to get battle hit points.
pub const HP_SCALE: u16 = 5;
pub const HEAL_BUDGET: u8 = 2;
pub const CAPTURE_LIMIT: u32 = 10;

const BASE_DAMAGE: u32 = 5;
const HEAL_MIN: u16 = 15;
const HEAL_SPREAD: f64 = 25.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Normal,
    Fire,
    Water,
    Grass,
    Electric,
    Ice,
    Fighting,
    Poison,
    Ground,
    Flying,
    Psychic,
    Bug,
    Rock,
    Ghost,
    Dragon,
    Dark,
    Steel,
    Fairy,
}

impl ElementType {
    /// Case-insensitive lookup; anything unknown is `Normal`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "fire" => ElementType::Fire,
            "water" => ElementType::Water,
            "grass" => ElementType::Grass,
            "electric" => ElementType::Electric,
            "ice" => ElementType::Ice,
            "fighting" => ElementType::Fighting,
            "poison" => ElementType::Poison,
            "ground" => ElementType::Ground,
            "flying" => ElementType::Flying,
            "psychic" => ElementType::Psychic,
            "bug" => ElementType::Bug,
            "rock" => ElementType::Rock,
            "ghost" => ElementType::Ghost,
            "dragon" => ElementType::Dragon,
            "dark" => ElementType::Dark,
            "steel" => ElementType::Steel,
            "fairy" => ElementType::Fairy,
            _ => ElementType::Normal,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ElementType::Normal => "normal",
            ElementType::Fire => "fire",
            ElementType::Water => "water",
            ElementType::Grass => "grass",
            ElementType::Electric => "electric",
            ElementType::Ice => "ice",
            ElementType::Fighting => "fighting",
            ElementType::Poison => "poison",
            ElementType::Ground => "ground",
            ElementType::Flying => "flying",
            ElementType::Psychic => "psychic",
            ElementType::Bug => "bug",
            ElementType::Rock => "rock",
            ElementType::Ghost => "ghost",
            ElementType::Dragon => "dragon",
            ElementType::Dark => "dark",
            ElementType::Steel => "steel",
            ElementType::Fairy => "fairy",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effectiveness {
    Strong,
    Neutral,
    Weak,
}

impl Effectiveness {
    pub fn multiplier(self) -> f64 {
        match self {
            Effectiveness::Strong => 1.5,
            Effectiveness::Neutral => 1.0,
            Effectiveness::Weak => 0.75,
        }
    }
}

struct ChartEntry {
    strong: &'static [ElementType],
    weak: &'static [ElementType],
}

const FIRE_CHART: ChartEntry = ChartEntry {
    strong: &[ElementType::Grass, ElementType::Bug],
    weak: &[ElementType::Water, ElementType::Rock],
};
const WATER_CHART: ChartEntry = ChartEntry {
    strong: &[ElementType::Fire, ElementType::Rock],
    weak: &[ElementType::Electric, ElementType::Grass],
};
const GRASS_CHART: ChartEntry = ChartEntry {
    strong: &[ElementType::Water, ElementType::Rock],
    weak: &[ElementType::Fire, ElementType::Ice],
};
const ELECTRIC_CHART: ChartEntry = ChartEntry {
    strong: &[ElementType::Water, ElementType::Flying],
    weak: &[ElementType::Ground],
};

/// Only four attackers are charted; every other matchup is neutral.
fn type_chart(attacker: ElementType) -> Option<&'static ChartEntry> {
    match attacker {
        ElementType::Fire => Some(&FIRE_CHART),
        ElementType::Water => Some(&WATER_CHART),
        ElementType::Grass => Some(&GRASS_CHART),
        ElementType::Electric => Some(&ELECTRIC_CHART),
        _ => None,
    }
}

pub fn effectiveness(attacker: ElementType, defender: ElementType) -> Effectiveness {
    let Some(entry) = type_chart(attacker) else {
        return Effectiveness::Neutral;
    };
    if entry.strong.contains(&defender) {
        Effectiveness::Strong
    } else if entry.weak.contains(&defender) {
        Effectiveness::Weak
    } else {
        Effectiveness::Neutral
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Combatant {
    pub name: String,
    pub elemental_type: ElementType,
    pub attack_power: u16,
    pub hit_points: u16,
    pub max_hit_points: u16,
    #[serde(default)]
    pub image: Option<String>,
}

impl Combatant {
    pub fn new(name: &str, elemental_type: ElementType, attack_power: u16, base_hp: u16) -> Self {
        let max_hit_points = base_hp.saturating_mul(HP_SCALE);
        Self {
            name: name.to_string(),
            elemental_type,
            attack_power,
            hit_points: max_hit_points,
            max_hit_points,
            image: None,
        }
    }

    pub fn from_record(record: &PokemonRecord) -> Self {
        let elemental_type = record
            .element_name()
            .map(ElementType::parse)
            .unwrap_or(ElementType::Normal);
        let mut combatant = Self::new(&record.name, elemental_type, record.attack, record.hp);
        combatant.image = record.image.clone();
        combatant
    }

    pub fn display_name(&self) -> String {
        format_name(&self.name)
    }

    pub fn is_fainted(&self) -> bool {
        self.hit_points == 0
    }

    /// Apply damage, saturating at zero.
    pub fn take_damage(&mut self, amount: u16) {
        self.hit_points = self.hit_points.saturating_sub(amount);
    }

    /// Restore hit points, capped at the maximum.
    pub fn restore(&mut self, amount: u16) {
        self.hit_points = self
            .hit_points
            .saturating_add(amount)
            .min(self.max_hit_points);
    }
}

/// Damage for a known roll in `[0, 1)`.
pub fn damage_for_roll(attacker: &Combatant, defender: &Combatant, roll: f64) -> u16 {
    let base = (roll * f64::from(attacker.attack_power) / 2.0).floor() as u32 + BASE_DAMAGE;
    let multiplier = effectiveness(attacker.elemental_type, defender.elemental_type).multiplier();
    let damage = (f64::from(base) * multiplier).round();
    damage.clamp(0.0, f64::from(u16::MAX)) as u16
}

pub fn resolve_damage(
    attacker: &Combatant,
    defender: &Combatant,
    rng: &mut impl RandomSource,
) -> u16 {
    damage_for_roll(attacker, defender, rng.roll())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Outcome {
    #[default]
    InProgress,
    PlayerWon,
    EnemyWon,
}

impl Outcome {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Outcome::InProgress)
    }
}

#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum BattleError {
    #[error("Failed to load the Pokemon: {0}")]
    FetchFailure(String),
    #[error("Could not capture the Pokemon: {0}")]
    CaptureFailure(String),
    #[error("You already have the maximum of {limit} captured Pokemon.")]
    CaptureLimitReached { limit: u32 },
}

/// What the player's attack phase led to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttackPhase {
    /// Nothing happened: battle over or a counter-attack is still pending.
    Ignored,
    /// Enemy fainted; no counter-attack follows.
    EnemyFainted,
    /// Enemy survived; the counter-attack must be scheduled.
    CounterPending,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CapturePlan {
    Skip,
    LimitReached,
    Submit(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BattleState {
    pub player: Combatant,
    pub enemy: Combatant,
    pub heals_remaining: u8,
    pub outcome: Outcome,
    pub event_log: Vec<String>,
    pub captured: bool,
    #[serde(default)]
    pub counter_pending: bool,
}

impl BattleState {
    pub fn new(player: Combatant, enemy: Combatant) -> Self {
        let opening = format!(
            "A battle begins between {} and {}!",
            player.display_name(),
            enemy.display_name()
        );
        Self {
            player,
            enemy,
            heals_remaining: HEAL_BUDGET,
            outcome: Outcome::InProgress,
            event_log: vec![opening],
            captured: false,
            counter_pending: false,
        }
    }

    pub fn from_records(player: &PokemonRecord, enemy: &PokemonRecord) -> Self {
        Self::new(Combatant::from_record(player), Combatant::from_record(enemy))
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_terminal()
    }

    pub fn can_act(&self) -> bool {
        !self.is_over() && !self.counter_pending
    }

    pub fn can_heal(&self) -> bool {
        self.can_act() && self.heals_remaining > 0
    }

    pub fn can_capture(&self) -> bool {
        self.outcome == Outcome::PlayerWon && !self.captured
    }

    fn push_log(&mut self, line: String) {
        self.event_log.push(line);
    }

    /// Phase one of a turn: the player strikes.
    pub fn player_attack(&mut self, rng: &mut impl RandomSource) -> AttackPhase {
        if !self.can_act() {
            return AttackPhase::Ignored;
        }
        let damage = resolve_damage(&self.player, &self.enemy, rng);
        self.enemy.take_damage(damage);
        self.push_log(format!(
            "{} attacked and dealt {} damage.",
            self.player.display_name(),
            damage
        ));

        if self.enemy.is_fainted() {
            self.outcome = Outcome::PlayerWon;
            self.push_log("You won the battle!".to_string());
            return AttackPhase::EnemyFainted;
        }
        self.counter_pending = true;
        AttackPhase::CounterPending
    }

    /// Phase two of a turn: the enemy answers. Returns whether anything changed.
    pub fn enemy_counter_attack(&mut self, rng: &mut impl RandomSource) -> bool {
        if !self.counter_pending || self.is_over() {
            return false;
        }
        self.counter_pending = false;
        let damage = resolve_damage(&self.enemy, &self.player, rng);
        self.player.take_damage(damage);
        self.push_log(format!(
            "{} counter-attacked and dealt {} damage.",
            self.enemy.display_name(),
            damage
        ));

        if self.player.is_fainted() {
            self.outcome = Outcome::EnemyWon;
            self.push_log("You have been defeated...".to_string());
        }
        true
    }

    /// Heal the player. Does not consume a turn. Returns the amount rolled.
    pub fn heal(&mut self, rng: &mut impl RandomSource) -> Option<u16> {
        if !self.can_heal() {
            return None;
        }
        let amount = (rng.roll() * HEAL_SPREAD).floor() as u16 + HEAL_MIN;
        self.player.restore(amount);
        self.heals_remaining -= 1;
        self.push_log(format!(
            "{} healed {} HP ({} heals left).",
            self.player.display_name(),
            amount,
            self.heals_remaining
        ));
        Some(amount)
    }

    /// Decide whether a capture should be submitted given the global tally.
    pub fn begin_capture(&mut self, tally: u32) -> CapturePlan {
        if !self.can_capture() {
            return CapturePlan::Skip;
        }
        if tally >= CAPTURE_LIMIT {
            self.push_log(
                BattleError::CaptureLimitReached {
                    limit: CAPTURE_LIMIT,
                }
                .to_string(),
            );
            return CapturePlan::LimitReached;
        }
        CapturePlan::Submit(self.enemy.name.clone())
    }

    /// Record the capture result. Returns true when the tally should grow.
    /// Ignored unless the player won and nothing was captured yet.
    pub fn finish_capture(&mut self, result: Result<(), BattleError>) -> bool {
        if !self.can_capture() {
            return false;
        }
        match result {
            Ok(()) => {
                self.captured = true;
                self.push_log(format!("You captured {}!", self.enemy.display_name()));
                true
            }
            Err(error) => {
                self.push_log(error.to_string());
                false
            }
        }
    }
}

/// `"mr-mime"` -> `"Mr Mime"`
pub fn format_name(name: &str) -> String {
    name.split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    let rest = chars.as_str();
                    format!("{}{}", first.to_ascii_uppercase(), rest)
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedRolls;
    use pretty_assertions::assert_eq;

    fn pikachu() -> Combatant {
        Combatant::new("Pikachu", ElementType::Electric, 40, 35)
    }

    fn bulbasaur() -> Combatant {
        Combatant::new("Bulbasaur", ElementType::Grass, 30, 45)
    }

    fn neutral(name: &str, attack: u16) -> Combatant {
        Combatant::new(name, ElementType::Normal, attack, 40)
    }

    #[test]
    fn max_hp_is_scaled_base_hp() {
        assert_eq!(pikachu().max_hit_points, 175);
        assert_eq!(bulbasaur().max_hit_points, 225);
        assert_eq!(pikachu().hit_points, 175);
    }

    #[test]
    fn unknown_types_parse_as_normal() {
        assert_eq!(ElementType::parse("FIRE"), ElementType::Fire);
        assert_eq!(ElementType::parse(" Water "), ElementType::Water);
        assert_eq!(ElementType::parse("plasma"), ElementType::Normal);
        assert_eq!(ElementType::parse(""), ElementType::Normal);
    }

    #[test]
    fn chart_lookups() {
        use ElementType::*;
        assert_eq!(effectiveness(Fire, Grass), Effectiveness::Strong);
        assert_eq!(effectiveness(Fire, Rock), Effectiveness::Weak);
        assert_eq!(effectiveness(Water, Electric), Effectiveness::Weak);
        assert_eq!(effectiveness(Electric, Flying), Effectiveness::Strong);
        assert_eq!(effectiveness(Electric, Grass), Effectiveness::Neutral);
        // uncharted attackers never get a multiplier
        assert_eq!(effectiveness(Rock, Fire), Effectiveness::Neutral);
        assert_eq!(effectiveness(Normal, Water), Effectiveness::Neutral);
    }

    #[test]
    fn neutral_damage_range_for_attack_twenty() {
        let attacker = neutral("a", 20);
        let defender = neutral("b", 20);
        assert_eq!(damage_for_roll(&attacker, &defender, 0.0), 5);
        assert_eq!(damage_for_roll(&attacker, &defender, 0.999_999), 14);
        for step in 0..100 {
            let roll = f64::from(step) / 100.0;
            let damage = damage_for_roll(&attacker, &defender, roll);
            assert!((5..=15).contains(&damage), "roll {roll} gave {damage}");
        }
    }

    #[test]
    fn strong_and_weak_bracket_neutral_for_same_roll() {
        let fire = Combatant::new("charmander", ElementType::Fire, 52, 39);
        let grass = Combatant::new("oddish", ElementType::Grass, 50, 45);
        let water = Combatant::new("squirtle", ElementType::Water, 48, 44);
        let normal = Combatant::new("rattata", ElementType::Normal, 56, 30);
        for step in 0..50 {
            let roll = f64::from(step) / 50.0;
            let strong = damage_for_roll(&fire, &grass, roll);
            let neutral = damage_for_roll(&fire, &normal, roll);
            let weak = damage_for_roll(&fire, &water, roll);
            assert!(strong >= neutral);
            assert!(weak <= neutral);
        }
    }

    #[test]
    fn multiplier_rounds_to_nearest() {
        let fire = Combatant::new("charmander", ElementType::Fire, 52, 39);
        let grass = Combatant::new("oddish", ElementType::Grass, 50, 45);
        let water = Combatant::new("squirtle", ElementType::Water, 48, 44);
        // base 5: 7.5 rounds up, 3.75 rounds to 4
        assert_eq!(damage_for_roll(&fire, &grass, 0.0), 8);
        assert_eq!(damage_for_roll(&fire, &water, 0.0), 4);
    }

    #[test]
    fn opening_line_names_both() {
        let battle = BattleState::new(pikachu(), bulbasaur());
        assert_eq!(battle.event_log.len(), 1);
        assert!(battle.event_log[0].contains("Pikachu"));
        assert!(battle.event_log[0].contains("Bulbasaur"));
        assert_eq!(battle.heals_remaining, HEAL_BUDGET);
        assert_eq!(battle.outcome, Outcome::InProgress);
        assert!(!battle.captured);
    }

    #[test]
    fn killing_blow_skips_counter_attack() {
        let mut battle = BattleState::new(pikachu(), bulbasaur());
        battle.enemy.hit_points = 1;
        let mut rolls = ScriptedRolls::new([0.5, 0.5]);

        let phase = battle.player_attack(&mut rolls);

        assert_eq!(phase, AttackPhase::EnemyFainted);
        assert_eq!(battle.outcome, Outcome::PlayerWon);
        assert_eq!(battle.enemy.hit_points, 0);
        assert!(!battle.counter_pending);
        assert!(!battle.enemy_counter_attack(&mut rolls));
        assert_eq!(battle.player.hit_points, battle.player.max_hit_points);
        assert_eq!(rolls.remaining(), 1);
        assert_eq!(battle.event_log.last().unwrap(), "You won the battle!");
    }

    #[test]
    fn attack_then_counter_in_order() {
        let mut battle = BattleState::new(pikachu(), bulbasaur());
        let mut rolls = ScriptedRolls::new([0.5, 0.5]);

        assert_eq!(battle.player_attack(&mut rolls), AttackPhase::CounterPending);
        // electric vs grass is neutral: floor(0.5 * 40 / 2) + 5 = 15
        assert_eq!(battle.enemy.hit_points, 225 - 15);
        assert_eq!(battle.player.hit_points, 175);
        // a second attack while the counter is pending does nothing
        assert_eq!(battle.player_attack(&mut rolls), AttackPhase::Ignored);

        assert!(battle.enemy_counter_attack(&mut rolls));
        // grass vs electric is neutral: floor(0.5 * 30 / 2) + 5 = 12
        assert_eq!(battle.player.hit_points, 175 - 12);
        assert_eq!(
            battle.event_log,
            vec![
                "A battle begins between Pikachu and Bulbasaur!".to_string(),
                "Pikachu attacked and dealt 15 damage.".to_string(),
                "Bulbasaur counter-attacked and dealt 12 damage.".to_string(),
            ]
        );
    }

    #[test]
    fn counter_attack_can_defeat_player() {
        let mut battle = BattleState::new(pikachu(), bulbasaur());
        battle.player.hit_points = 3;
        let mut rolls = ScriptedRolls::new([0.0, 0.0]);
        battle.player_attack(&mut rolls);
        battle.enemy_counter_attack(&mut rolls);
        assert_eq!(battle.player.hit_points, 0);
        assert_eq!(battle.outcome, Outcome::EnemyWon);
        assert_eq!(battle.event_log.last().unwrap(), "You have been defeated...");
    }

    #[test]
    fn heal_caps_at_max_and_spends_budget() {
        let mut battle = BattleState::new(pikachu(), bulbasaur());
        battle.player.hit_points = 170;
        let mut rolls = ScriptedRolls::new([0.99, 0.0, 0.5]);

        assert_eq!(battle.heal(&mut rolls), Some(39));
        assert_eq!(battle.player.hit_points, 175);
        assert_eq!(battle.heals_remaining, 1);

        battle.player.hit_points = 100;
        assert_eq!(battle.heal(&mut rolls), Some(15));
        assert_eq!(battle.player.hit_points, 115);
        assert_eq!(battle.heals_remaining, 0);

        let before = battle.clone();
        assert_eq!(battle.heal(&mut rolls), None);
        assert_eq!(battle, before);
        assert_eq!(battle.event_log.last().unwrap(), "Pikachu healed 15 HP (0 heals left).");
    }

    #[test]
    fn heal_is_noop_once_battle_is_over() {
        let mut battle = BattleState::new(pikachu(), bulbasaur());
        battle.outcome = Outcome::EnemyWon;
        let before = battle.clone();
        assert_eq!(battle.heal(&mut ScriptedRolls::new([0.5])), None);
        assert_eq!(battle, before);
    }

    #[test]
    fn capture_requires_victory() {
        let mut battle = BattleState::new(pikachu(), bulbasaur());
        assert_eq!(battle.begin_capture(0), CapturePlan::Skip);
        battle.outcome = Outcome::PlayerWon;
        assert_eq!(
            battle.begin_capture(0),
            CapturePlan::Submit("Bulbasaur".to_string())
        );
    }

    #[test]
    fn capture_limit_logs_without_submitting() {
        let mut battle = BattleState::new(pikachu(), bulbasaur());
        battle.outcome = Outcome::PlayerWon;
        assert_eq!(battle.begin_capture(CAPTURE_LIMIT), CapturePlan::LimitReached);
        assert_eq!(
            battle.event_log.last().unwrap(),
            "You already have the maximum of 10 captured Pokemon."
        );
        assert!(!battle.captured);
    }

    #[test]
    fn capture_success_is_once_only() {
        let mut battle = BattleState::new(pikachu(), bulbasaur());
        battle.outcome = Outcome::PlayerWon;
        assert!(battle.finish_capture(Ok(())));
        assert!(battle.captured);
        let log_len = battle.event_log.len();

        assert_eq!(battle.begin_capture(1), CapturePlan::Skip);
        assert!(!battle.finish_capture(Ok(())));
        assert_eq!(battle.event_log.len(), log_len);
    }

    #[test]
    fn capture_failure_is_retryable() {
        let mut battle = BattleState::new(pikachu(), bulbasaur());
        battle.outcome = Outcome::PlayerWon;
        let failed = battle.finish_capture(Err(BattleError::CaptureFailure("timeout".into())));
        assert!(!failed);
        assert!(!battle.captured);
        assert_eq!(
            battle.event_log.last().unwrap(),
            "Could not capture the Pokemon: timeout"
        );
        assert!(matches!(battle.begin_capture(0), CapturePlan::Submit(_)));
    }

    #[test]
    fn capture_result_ignored_before_a_win() {
        let mut battle = BattleState::new(pikachu(), bulbasaur());
        let log_len = battle.event_log.len();
        assert!(!battle.finish_capture(Ok(())));
        assert!(!battle.captured);

        battle.outcome = Outcome::EnemyWon;
        assert!(!battle.finish_capture(Ok(())));
        assert!(!battle.captured);
        assert_eq!(battle.event_log.len(), log_len);
    }

    #[test]
    fn record_conversion_scales_hp_and_parses_type() {
        let record = PokemonRecord::new("charmander", 39, 52, "Fire");
        let combatant = Combatant::from_record(&record);
        assert_eq!(combatant.max_hit_points, 195);
        assert_eq!(combatant.elemental_type, ElementType::Fire);
        assert_eq!(combatant.display_name(), "Charmander");
    }

    #[test]
    fn format_name_capitalizes_parts() {
        assert_eq!(format_name("mr-mime"), "Mr Mime");
        assert_eq!(format_name("pikachu"), "Pikachu");
    }
}
