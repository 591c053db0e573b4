use time::{format_description::well_known::Rfc3339, OffsetDateTime};

/// Single source of wall-clock readings. Orchestration code takes the reading
/// as an argument instead of calling this inline, so tests can drive the
/// engine through any timeline without sleeping.
pub(crate) fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

pub(crate) fn format_offset(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_else(|_| value.to_string())
}
