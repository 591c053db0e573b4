use serde::{Deserialize, Serialize};

/// Lifecycle of a participant within one exam run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum SessionState {
    Idle,
    Countdown,
    Active,
    Submitted,
    Disqualified,
}

impl SessionState {
    pub(crate) fn is_terminal(self) -> bool {
        matches!(self, Self::Submitted | Self::Disqualified)
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Countdown => "countdown",
            Self::Active => "active",
            Self::Submitted => "submitted",
            Self::Disqualified => "disqualified",
        }
    }
}

/// Why a session reached a terminal state. Auto-submitted participants stay
/// ranking-eligible; disqualified participants do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum FinalizeCause {
    Manual,
    TimeExpired,
    TabSwitchLimit,
    AdminStop,
    Disqualified,
}

impl FinalizeCause {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::TimeExpired => "time_expired",
            Self::TabSwitchLimit => "tab_switch_limit",
            Self::AdminStop => "admin_stop",
            Self::Disqualified => "disqualified",
        }
    }
}
