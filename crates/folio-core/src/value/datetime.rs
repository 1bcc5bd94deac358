use time::{
    Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description,
};

/// Parse an RFC 3339 timestamp or a `YYYY-MM-DD` date into unix milliseconds.
/// Dates resolve to midnight UTC.
#[must_use]
pub fn parse_millis(input: &str) -> Option<i64> {
    let at = OffsetDateTime::parse(input, &Rfc3339).ok().or_else(|| {
        Date::parse(input, format_description!("[year]-[month]-[day]"))
            .ok()
            .map(|date| date.midnight().assume_utc())
    })?;

    i64::try_from(at.unix_timestamp_nanos() / 1_000_000).ok()
}

/// Current UTC time rendered as RFC 3339.
pub fn now_rfc3339() -> Result<String, time::error::Format> {
    OffsetDateTime::now_utc().format(&Rfc3339)
}
