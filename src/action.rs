use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::api::PokemonRecord;

#[derive(tui_dispatch::Action, Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[action(infer_categories)]
pub enum Action {
    Init,
    UiTerminalResize(u16, u16),
    Tick,

    // Battle controls
    BattleNew,
    BattleAttack,
    BattleCounterAttack {
        session: u64,
    },
    BattleHeal,
    BattleCapture,

    // Combatant loading
    CombatantsDidLoad {
        player: PokemonRecord,
        enemy: PokemonRecord,
    },
    CombatantsDidError(String),

    // Capture submission
    CaptureDidSucceed {
        session: u64,
        name: String,
    },
    CaptureDidFail {
        session: u64,
        name: String,
        error: String,
    },

    LogScroll(i16),

    Quit,
}
