use serde::{Deserialize, Serialize};
use tui_dispatch_debug::debug::{ron_string, DebugSection, DebugState};

use crate::battle::{BattleState, CAPTURE_LIMIT};
use crate::rng::BattleRng;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Player,
    Enemy,
}

impl Side {
    pub fn label(self) -> &'static str {
        match self {
            Side::Player => "player",
            Side::Enemy => "enemy",
        }
    }
}

/// Short highlight on the panel that just took a hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitFlash {
    pub side: Side,
    pub ticks_left: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppState {
    pub terminal_size: (u16, u16),
    /// Current session; `None` until the first fetch succeeds or after a failed one.
    pub battle: Option<BattleState>,
    pub loading: bool,
    /// Single log line shown while no battle is playable.
    #[serde(default)]
    pub fetch_error: Option<String>,
    /// Bumped for every new battle so stale counter-attacks are dropped.
    pub session: u64,
    /// Successful captures across all sessions.
    pub capture_tally: u32,
    #[serde(default)]
    pub capture_in_flight: bool,
    #[serde(default)]
    pub hit_flash: Option<HitFlash>,
    /// Lines scrolled up from the newest log entry.
    #[serde(default)]
    pub log_scroll: u16,
    pub tick: u64,
    #[serde(default)]
    pub rng: BattleRng,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_rng(BattleRng::from_time())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(BattleRng::seeded(seed))
    }

    fn with_rng(rng: BattleRng) -> Self {
        Self {
            terminal_size: (80, 24),
            battle: None,
            loading: false,
            fetch_error: None,
            session: 0,
            capture_tally: 0,
            capture_in_flight: false,
            hit_flash: None,
            log_scroll: 0,
            tick: 0,
            rng,
        }
    }

    /// Lines the log panel shows: the battle log, or the fetch error alone.
    pub fn log_lines(&self) -> Vec<&str> {
        match (&self.battle, &self.fetch_error) {
            (_, Some(error)) => vec![error.as_str()],
            (Some(battle), None) => battle.event_log.iter().map(String::as_str).collect(),
            (None, None) => Vec::new(),
        }
    }

    pub fn capture_limit_reached(&self) -> bool {
        self.capture_tally >= CAPTURE_LIMIT
    }

    /// A new battle may start when nothing is loading and no fight is live.
    pub fn can_start_battle(&self) -> bool {
        !self.loading && self.battle.as_ref().map_or(true, |battle| battle.is_over())
    }

    pub fn is_flashing(&self, side: Side) -> bool {
        self.hit_flash
            .map(|flash| flash.side == side && flash.ticks_left > 0)
            .unwrap_or(false)
    }
}

impl DebugState for AppState {
    fn debug_sections(&self) -> Vec<DebugSection> {
        let mut sections = vec![DebugSection::new("Session")
            .entry("session", ron_string(&self.session))
            .entry("loading", ron_string(&self.loading))
            .entry("fetch_error", ron_string(&self.fetch_error))
            .entry("capture_tally", ron_string(&self.capture_tally))
            .entry("capture_in_flight", ron_string(&self.capture_in_flight))];

        if let Some(battle) = &self.battle {
            sections.push(
                DebugSection::new("Battle")
                    .entry("outcome", ron_string(&battle.outcome))
                    .entry("player", ron_string(&battle.player.name))
                    .entry("player_hp", ron_string(&battle.player.hit_points))
                    .entry("enemy", ron_string(&battle.enemy.name))
                    .entry("enemy_hp", ron_string(&battle.enemy.hit_points))
                    .entry("heals_remaining", ron_string(&battle.heals_remaining))
                    .entry("counter_pending", ron_string(&battle.counter_pending))
                    .entry("captured", ron_string(&battle.captured)),
            );
        }

        sections
    }
}
