use crate::error::AppError;
use once_cell::sync::OnceCell;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

static LOCAL_OFFSET: OnceCell<UtcOffset> = OnceCell::new();

/// Local offset, looked up once per process. The lookup fails once other
/// threads are running on unix, so callers resolve it early; UTC is the fallback.
pub fn local_offset() -> UtcOffset {
    *LOCAL_OFFSET.get_or_init(|| UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC))
}

pub fn now_rfc3339() -> Result<String, AppError> {
    format_rfc3339(OffsetDateTime::now_utc())
}

pub fn format_rfc3339(value: OffsetDateTime) -> Result<String, AppError> {
    value
        .format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

pub fn parse_rfc3339(value: &str, field: &str) -> Result<OffsetDateTime, AppError> {
    OffsetDateTime::parse(value, &Rfc3339)
        .map_err(|_| AppError::invalid_data(format!("{field} must be RFC3339")))
}

/// Accepts RFC3339, `YYYY-MM-DD HH:MM[:SS]` or `YYYY-MM-DD` (midnight).
/// Values without an offset are read in `offset`.
pub fn parse_datetime_input(input: &str, offset: UtcOffset) -> Result<OffsetDateTime, AppError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("datetime is required"));
    }

    if let Ok(parsed) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Ok(parsed);
    }

    let with_seconds = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    if let Ok(parsed) = PrimitiveDateTime::parse(trimmed, with_seconds) {
        return Ok(parsed.assume_offset(offset));
    }

    let minutes_only = format_description!("[year]-[month]-[day] [hour]:[minute]");
    if let Ok(parsed) = PrimitiveDateTime::parse(trimmed, minutes_only) {
        return Ok(parsed.assume_offset(offset));
    }

    let date_only = format_description!("[year]-[month]-[day]");
    if let Ok(date) = Date::parse(trimmed, date_only) {
        return Ok(PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_offset(offset));
    }

    Err(AppError::invalid_input(
        "datetime must be RFC3339, 'YYYY-MM-DD HH:MM[:SS]' or 'YYYY-MM-DD'",
    ))
}
