//! Reducer - pure function: (state, action) -> DispatchResult

use tui_dispatch::DispatchResult;

use crate::action::Action;
use crate::api::PokemonRecord;
use crate::battle::{AttackPhase, BattleError, BattleState, CapturePlan, CAPTURE_LIMIT};
use crate::effect::Effect;
use crate::state::{AppState, HitFlash, Side};

/// Delay between the player's hit and the enemy's counter-attack.
pub const COUNTER_ATTACK_DELAY_MS: u64 = 1000;
const FLASH_TICKS: u8 = 3;

pub fn reducer(state: &mut AppState, action: Action) -> DispatchResult<Effect> {
    match action {
        Action::Init | Action::BattleNew => start_battle(state),
        Action::UiTerminalResize(width, height) => {
            if state.terminal_size != (width, height) {
                state.terminal_size = (width, height);
                DispatchResult::changed()
            } else {
                DispatchResult::unchanged()
            }
        }
        Action::Tick => tick(state),

        Action::BattleAttack => attack(state),
        Action::BattleCounterAttack { session } => counter_attack(state, session),
        Action::BattleHeal => heal(state),
        Action::BattleCapture => capture(state),

        Action::CombatantsDidLoad { player, enemy } => combatants_loaded(state, &player, &enemy),
        Action::CombatantsDidError(error) => {
            if !state.loading {
                return DispatchResult::unchanged();
            }
            state.loading = false;
            state.battle = None;
            state.hit_flash = None;
            state.log_scroll = 0;
            state.fetch_error = Some(BattleError::FetchFailure(error).to_string());
            DispatchResult::changed()
        }

        Action::CaptureDidSucceed { session, .. } => capture_finished(state, session, Ok(())),
        Action::CaptureDidFail { session, error, .. } => {
            capture_finished(state, session, Err(BattleError::CaptureFailure(error)))
        }

        Action::LogScroll(delta) => scroll_log(state, delta),

        Action::Quit => DispatchResult::unchanged(),
    }
}

fn start_battle(state: &mut AppState) -> DispatchResult<Effect> {
    if !state.can_start_battle() {
        return DispatchResult::unchanged();
    }
    state.loading = true;
    state.fetch_error = None;
    DispatchResult::changed_with(Effect::FetchCombatants)
}

fn combatants_loaded(
    state: &mut AppState,
    player: &PokemonRecord,
    enemy: &PokemonRecord,
) -> DispatchResult<Effect> {
    if !state.loading {
        return DispatchResult::unchanged();
    }
    state.loading = false;
    state.fetch_error = None;
    state.session = state.session.wrapping_add(1);
    state.battle = Some(BattleState::from_records(player, enemy));
    state.capture_in_flight = false;
    state.hit_flash = None;
    state.log_scroll = 0;
    DispatchResult::changed()
}

fn attack(state: &mut AppState) -> DispatchResult<Effect> {
    let Some(battle) = state.battle.as_mut() else {
        return DispatchResult::unchanged();
    };
    match battle.player_attack(&mut state.rng) {
        AttackPhase::Ignored => DispatchResult::unchanged(),
        AttackPhase::EnemyFainted => {
            flash(state, Side::Enemy);
            DispatchResult::changed()
        }
        AttackPhase::CounterPending => {
            flash(state, Side::Enemy);
            DispatchResult::changed_with(Effect::ScheduleCounterAttack {
                session: state.session,
            })
        }
    }
}

fn counter_attack(state: &mut AppState, session: u64) -> DispatchResult<Effect> {
    if session != state.session {
        return DispatchResult::unchanged();
    }
    let Some(battle) = state.battle.as_mut() else {
        return DispatchResult::unchanged();
    };
    if !battle.enemy_counter_attack(&mut state.rng) {
        return DispatchResult::unchanged();
    }
    flash(state, Side::Player);
    DispatchResult::changed()
}

fn heal(state: &mut AppState) -> DispatchResult<Effect> {
    let Some(battle) = state.battle.as_mut() else {
        return DispatchResult::unchanged();
    };
    if battle.heal(&mut state.rng).is_none() {
        return DispatchResult::unchanged();
    }
    state.log_scroll = 0;
    DispatchResult::changed()
}

fn capture(state: &mut AppState) -> DispatchResult<Effect> {
    if state.capture_in_flight {
        return DispatchResult::unchanged();
    }
    let tally = state.capture_tally;
    let Some(battle) = state.battle.as_mut() else {
        return DispatchResult::unchanged();
    };
    match battle.begin_capture(tally) {
        CapturePlan::Skip => DispatchResult::unchanged(),
        CapturePlan::LimitReached => {
            state.log_scroll = 0;
            DispatchResult::changed()
        }
        CapturePlan::Submit(name) => {
            state.capture_in_flight = true;
            DispatchResult::changed_with(Effect::SubmitCapture {
                session: state.session,
                name,
            })
        }
    }
}

fn capture_finished(
    state: &mut AppState,
    session: u64,
    result: Result<(), BattleError>,
) -> DispatchResult<Effect> {
    // earlier battle: a success was still kept by the backend, so only the tally moves
    if session != state.session {
        if result.is_err() {
            return DispatchResult::unchanged();
        }
        count_capture(state);
        return DispatchResult::changed();
    }
    state.capture_in_flight = false;
    let Some(battle) = state.battle.as_mut() else {
        return DispatchResult::changed();
    };
    if battle.finish_capture(result) {
        count_capture(state);
    }
    state.log_scroll = 0;
    DispatchResult::changed()
}

fn count_capture(state: &mut AppState) {
    state.capture_tally = state.capture_tally.saturating_add(1).min(CAPTURE_LIMIT);
}

fn scroll_log(state: &mut AppState, delta: i16) -> DispatchResult<Effect> {
    let max_scroll = state.log_lines().len().saturating_sub(1) as i32;
    let next = (i32::from(state.log_scroll) + i32::from(delta)).clamp(0, max_scroll) as u16;
    if next == state.log_scroll {
        return DispatchResult::unchanged();
    }
    state.log_scroll = next;
    DispatchResult::changed()
}

fn tick(state: &mut AppState) -> DispatchResult<Effect> {
    state.tick = state.tick.wrapping_add(1);
    if let Some(flash) = state.hit_flash.as_mut() {
        flash.ticks_left = flash.ticks_left.saturating_sub(1);
        if flash.ticks_left == 0 {
            state.hit_flash = None;
        }
        return DispatchResult::changed();
    }
    if state.loading {
        DispatchResult::changed()
    } else {
        DispatchResult::unchanged()
    }
}

fn flash(state: &mut AppState, side: Side) {
    state.hit_flash = Some(HitFlash {
        side,
        ticks_left: FLASH_TICKS,
    });
    state.log_scroll = 0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::Outcome;

    fn records() -> (PokemonRecord, PokemonRecord) {
        (
            PokemonRecord::new("pikachu", 35, 40, "electric"),
            PokemonRecord::new("bulbasaur", 45, 30, "grass"),
        )
    }

    fn loaded_state() -> AppState {
        let mut state = AppState::with_seed(11);
        reducer(&mut state, Action::Init);
        let (player, enemy) = records();
        reducer(&mut state, Action::CombatantsDidLoad { player, enemy });
        state
    }

    #[test]
    fn init_requests_combatants() {
        let mut state = AppState::with_seed(1);
        let result = reducer(&mut state, Action::Init);
        assert!(result.changed);
        assert!(state.loading);
        assert_eq!(result.effects, vec![Effect::FetchCombatants]);
    }

    #[test]
    fn second_fetch_is_ignored_while_loading() {
        let mut state = AppState::with_seed(1);
        reducer(&mut state, Action::Init);
        let result = reducer(&mut state, Action::BattleNew);
        assert!(!result.changed);
        assert!(result.effects.is_empty());
    }

    #[test]
    fn load_builds_battle_and_bumps_session() {
        let state = loaded_state();
        let battle = state.battle.as_ref().unwrap();
        assert!(!state.loading);
        assert_eq!(state.session, 1);
        assert_eq!(battle.player.max_hit_points, 175);
        assert_eq!(battle.enemy.max_hit_points, 225);
        assert_eq!(battle.event_log.len(), 1);
    }

    #[test]
    fn fetch_error_leaves_single_line_and_no_battle() {
        let mut state = AppState::with_seed(1);
        reducer(&mut state, Action::Init);
        reducer(&mut state, Action::CombatantsDidError("timeout".into()));
        assert!(state.battle.is_none());
        assert!(!state.loading);
        assert_eq!(
            state.log_lines(),
            vec!["Failed to load the Pokemon: timeout"]
        );
        // retry is allowed
        let result = reducer(&mut state, Action::BattleNew);
        assert_eq!(result.effects, vec![Effect::FetchCombatants]);
    }

    #[test]
    fn attack_schedules_counter_for_current_session() {
        let mut state = loaded_state();
        let result = reducer(&mut state, Action::BattleAttack);
        assert!(result.changed);
        assert_eq!(
            result.effects,
            vec![Effect::ScheduleCounterAttack { session: 1 }]
        );
        assert!(state.is_flashing(Side::Enemy));
    }

    #[test]
    fn stale_counter_attack_is_dropped() {
        let mut state = loaded_state();
        reducer(&mut state, Action::BattleAttack);
        let player_hp = state.battle.as_ref().unwrap().player.hit_points;
        let result = reducer(&mut state, Action::BattleCounterAttack { session: 0 });
        assert!(!result.changed);
        assert_eq!(state.battle.as_ref().unwrap().player.hit_points, player_hp);
    }

    #[test]
    fn heal_blocked_while_counter_pending() {
        let mut state = loaded_state();
        reducer(&mut state, Action::BattleAttack);
        let result = reducer(&mut state, Action::BattleHeal);
        assert!(!result.changed);
        assert_eq!(state.battle.as_ref().unwrap().heals_remaining, 2);
    }

    #[test]
    fn capture_submits_once_and_counts() {
        let mut state = loaded_state();
        state.battle.as_mut().unwrap().outcome = Outcome::PlayerWon;

        let result = reducer(&mut state, Action::BattleCapture);
        assert_eq!(
            result.effects,
            vec![Effect::SubmitCapture {
                session: 1,
                name: "bulbasaur".into()
            }]
        );
        // duplicate while in flight
        assert!(reducer(&mut state, Action::BattleCapture).effects.is_empty());

        reducer(
            &mut state,
            Action::CaptureDidSucceed {
                session: 1,
                name: "bulbasaur".into(),
            },
        );
        assert_eq!(state.capture_tally, 1);
        assert!(state.battle.as_ref().unwrap().captured);
        assert!(reducer(&mut state, Action::BattleCapture).effects.is_empty());
    }

    #[test]
    fn tick_expires_hit_flash() {
        let mut state = loaded_state();
        reducer(&mut state, Action::BattleAttack);
        for _ in 0..FLASH_TICKS {
            assert!(reducer(&mut state, Action::Tick).changed);
        }
        assert!(state.hit_flash.is_none());
        assert!(!reducer(&mut state, Action::Tick).changed);
    }

    #[test]
    fn log_scroll_is_clamped() {
        let mut state = loaded_state();
        // a single line cannot scroll
        assert!(!reducer(&mut state, Action::LogScroll(1)).changed);
        reducer(&mut state, Action::BattleAttack);
        reducer(&mut state, Action::BattleCounterAttack { session: 1 });
        assert!(reducer(&mut state, Action::LogScroll(5)).changed);
        assert_eq!(state.log_scroll, 2);
        reducer(&mut state, Action::LogScroll(-10));
        assert_eq!(state.log_scroll, 0);
    }
}
