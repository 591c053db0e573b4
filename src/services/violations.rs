use time::{Duration, OffsetDateTime};

/// Third tab switch forces an auto-submit. Fixed by exam policy, not
/// configurable per run.
pub(crate) const TAB_SWITCH_LIMIT: u32 = 3;

/// Browsers can fire doubled visibility/fullscreen events for one physical
/// action; reports landing inside this window count once.
pub(crate) const DUPLICATE_REPORT_WINDOW: Duration = Duration::seconds(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TabSwitchDecision {
    /// Repeat delivery of the same physical violation; counter unchanged.
    Duplicate,
    Recorded { count: u32 },
    /// Threshold reached; the session must be auto-submitted with its score
    /// preserved.
    AutoSubmit { count: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FullscreenExitDecision {
    Duplicate,
    /// Policy disabled; the exit is counted and logged but the session stays
    /// active.
    Recorded { count: u32 },
    Disqualify { count: u32 },
}

pub(crate) const FULLSCREEN_EXIT_REASON: &str = "fullscreen exit";

fn is_duplicate(last_at: Option<OffsetDateTime>, now: OffsetDateTime) -> bool {
    match last_at {
        Some(last) => now - last < DUPLICATE_REPORT_WINDOW,
        None => false,
    }
}

pub(crate) fn assess_tab_switch(
    current_count: u32,
    last_at: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> TabSwitchDecision {
    if is_duplicate(last_at, now) {
        return TabSwitchDecision::Duplicate;
    }

    let count = current_count + 1;
    if count >= TAB_SWITCH_LIMIT {
        TabSwitchDecision::AutoSubmit { count }
    } else {
        TabSwitchDecision::Recorded { count }
    }
}

pub(crate) fn assess_fullscreen_exit(
    disqualify_on_fullscreen_exit: bool,
    current_count: u32,
    last_at: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> FullscreenExitDecision {
    if is_duplicate(last_at, now) {
        return FullscreenExitDecision::Duplicate;
    }

    let count = current_count + 1;
    if disqualify_on_fullscreen_exit {
        FullscreenExitDecision::Disqualify { count }
    } else {
        FullscreenExitDecision::Recorded { count }
    }
}
