//! Pokemon battle TUI
//!
//! The library exposes the battle core, the backend client and the
//! tui-dispatch store so the binary and the integration tests share them.

pub mod action;
pub mod api;
pub mod battle;
pub mod effect;
pub mod reducer;
pub mod rng;
pub mod state;
pub mod ui;
