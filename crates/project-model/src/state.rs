//! Display mode and driver state.

use serde::{Deserialize, Serialize};

/// How the compositor presents the cursor frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Previous frame underneath, cursor frame faded on top (onion skin).
    #[default]
    Compare,
    /// Cursor frame only. Used while a timer driver owns the cursor.
    Single,
}

/// Which mechanism currently owns the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverState {
    /// Manual selection; any driver may start.
    #[default]
    Idle,
    /// Interactive playback preview is ticking.
    Previewing,
    /// Export is ticking and the encoder is capturing.
    Exporting,
}

impl DriverState {
    pub fn is_idle(self) -> bool {
        self == DriverState::Idle
    }
}
