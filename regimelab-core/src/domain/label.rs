//! Barrier outcome label.

use serde::{Deserialize, Serialize};

/// Outcome of the first-barrier-touched rule for one entry point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    WinBarrier,
    LossBarrier,
    #[default]
    Undecided,
}

impl Label {
    /// Integer encoding used in exported training datasets.
    pub fn code(self) -> i8 {
        match self {
            Label::WinBarrier => 1,
            Label::LossBarrier => 0,
            Label::Undecided => -1,
        }
    }

    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            1 => Some(Label::WinBarrier),
            0 => Some(Label::LossBarrier),
            -1 => Some(Label::Undecided),
            _ => None,
        }
    }

    pub fn is_decided(self) -> bool {
        self != Label::Undecided
    }
}
