//! Domain validation for room record fields.
//!
//! Every rule is checked before a lock is taken or a byte is written, so
//! invalid data never reaches the file.

use crate::error::{DbError, DbResult};
use crate::room::Room;
use chrono::NaiveDate;

/// Token marking a smoking room.
pub const SMOKING_ROOM: &str = "Y";

/// Token marking a non-smoking room.
pub const NON_SMOKING_ROOM: &str = "N";

/// Highest accepted nightly rate.
pub const MAX_RATE: f64 = 9999.99;

/// Highest accepted customer id (eight digits).
pub const MAX_OWNER_ID: u64 = 99_999_999;

/// Accepted date format, e.g. `2024/05/01`.
pub const DATE_FORMAT: &str = "%Y/%m/%d";

const CURRENCY_PREFIX: char = '$';

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Validates every field of a room record.
///
/// # Errors
///
/// Returns the first `InvalidField` violation, in schema field order.
pub fn validate_room(room: &Room) -> DbResult<()> {
    validate_name(&room.name)?;
    validate_location(&room.location)?;
    validate_size(&room.size)?;
    validate_smoking(&room.smoking)?;
    validate_rate(&room.rate)?;
    validate_date(&room.date)?;
    validate_owner(&room.owner)?;
    Ok(())
}

/// Hotel name: non-empty.
///
/// # Errors
///
/// Returns `InvalidField` when blank.
pub fn validate_name(name: &str) -> DbResult<()> {
    if is_blank(name) {
        return Err(DbError::invalid_field("name", "must not be empty"));
    }
    Ok(())
}

/// Location: non-empty.
///
/// # Errors
///
/// Returns `InvalidField` when blank.
pub fn validate_location(location: &str) -> DbResult<()> {
    if is_blank(location) {
        return Err(DbError::invalid_field("location", "must not be empty"));
    }
    Ok(())
}

/// Room size: a positive integer.
///
/// # Errors
///
/// Returns `InvalidField` when blank, non-numeric, zero, or negative.
pub fn validate_size(size: &str) -> DbResult<()> {
    let parsed: u32 = size
        .parse()
        .map_err(|_| DbError::invalid_field("size", format!("not a positive integer: {size:?}")))?;
    if parsed == 0 {
        return Err(DbError::invalid_field("size", "must be greater than zero"));
    }
    Ok(())
}

/// Smoking flag: exactly [`SMOKING_ROOM`] or [`NON_SMOKING_ROOM`].
///
/// # Errors
///
/// Returns `InvalidField` on any other token.
pub fn validate_smoking(smoking: &str) -> DbResult<()> {
    if smoking != SMOKING_ROOM && smoking != NON_SMOKING_ROOM {
        return Err(DbError::invalid_field(
            "smoking",
            format!("must be {SMOKING_ROOM:?} or {NON_SMOKING_ROOM:?}, got {smoking:?}"),
        ));
    }
    Ok(())
}

/// Rate: currency-prefixed positive decimal no greater than [`MAX_RATE`].
///
/// # Errors
///
/// Returns `InvalidField` when the prefix is missing, the amount does not
/// parse, or it falls outside `(0, MAX_RATE]`.
pub fn validate_rate(rate: &str) -> DbResult<()> {
    let amount = rate.strip_prefix(CURRENCY_PREFIX).ok_or_else(|| {
        DbError::invalid_field(
            "rate",
            format!("must start with {CURRENCY_PREFIX:?}, got {rate:?}"),
        )
    })?;

    let value: f64 = amount
        .parse()
        .map_err(|_| DbError::invalid_field("rate", format!("not a number: {amount:?}")))?;

    if value <= 0.0 || value > MAX_RATE {
        return Err(DbError::invalid_field(
            "rate",
            format!("must be greater than 0 and at most {MAX_RATE}"),
        ));
    }
    Ok(())
}

/// Date available: [`DATE_FORMAT`], a real calendar date.
///
/// # Errors
///
/// Returns `InvalidField` when the value does not parse as a date.
pub fn validate_date(date: &str) -> DbResult<()> {
    NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map_err(|_| DbError::invalid_field("date", format!("not a yyyy/MM/dd date: {date:?}")))?;
    Ok(())
}

/// Owner: empty (unbooked) or a customer id in `[1, MAX_OWNER_ID]`.
///
/// # Errors
///
/// Returns `InvalidField` when non-empty and not a valid id.
pub fn validate_owner(owner: &str) -> DbResult<()> {
    if owner.is_empty() {
        return Ok(());
    }

    let id: u64 = owner
        .parse()
        .map_err(|_| DbError::invalid_field("owner", format!("not a customer id: {owner:?}")))?;

    if id == 0 || id > MAX_OWNER_ID {
        return Err(DbError::invalid_field(
            "owner",
            format!("must be between 1 and {MAX_OWNER_ID}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_location_reject_blank() {
        assert!(validate_name("Elm").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());

        assert!(validate_location("Reno").is_ok());
        assert!(validate_location(" ").is_err());
    }

    #[test]
    fn size_must_be_positive_integer() {
        assert!(validate_size("4").is_ok());
        assert!(validate_size("0").is_err());
        assert!(validate_size("-2").is_err());
        assert!(validate_size("four").is_err());
        assert!(validate_size("").is_err());
    }

    #[test]
    fn smoking_accepts_only_fixed_tokens() {
        assert!(validate_smoking("Y").is_ok());
        assert!(validate_smoking("N").is_ok());
        assert!(validate_smoking("y").is_err());
        assert!(validate_smoking("yes").is_err());
        assert!(validate_smoking("").is_err());
    }

    #[test]
    fn rate_requires_prefix_and_range() {
        assert!(validate_rate("$99.50").is_ok());
        assert!(validate_rate("$9999.99").is_ok());
        assert!(validate_rate("$0.01").is_ok());

        assert!(validate_rate("99.50").is_err());
        assert!(validate_rate("$0").is_err());
        assert!(validate_rate("$-5").is_err());
        assert!(validate_rate("$10000").is_err());
        assert!(validate_rate("$abc").is_err());
        assert!(validate_rate("").is_err());
    }

    #[test]
    fn date_must_be_real_calendar_date() {
        assert!(validate_date("2024/05/01").is_ok());
        assert!(validate_date("2024-05-01").is_err());
        assert!(validate_date("2024/13/01").is_err());
        assert!(validate_date("05/01/2024").is_err());
        assert!(validate_date("").is_err());
    }

    #[test]
    fn owner_empty_or_eight_digit_id() {
        assert!(validate_owner("").is_ok());
        assert!(validate_owner("1").is_ok());
        assert!(validate_owner("12345678").is_ok());
        assert!(validate_owner("99999999").is_ok());

        assert!(validate_owner("0").is_err());
        assert!(validate_owner("100000000").is_err());
        assert!(validate_owner("abc").is_err());
        assert!(validate_owner("-3").is_err());
    }

    #[test]
    fn validate_room_reports_first_violation() {
        let mut room = Room::new("Elm", "Reno", "4", "Y", "$99.50", "2024/05/01");
        assert!(validate_room(&room).is_ok());

        room.rate = "99.50".to_string();
        let err = validate_room(&room).unwrap_err();
        assert!(matches!(err, DbError::InvalidField { ref field, .. } if field == "rate"));
    }
}
