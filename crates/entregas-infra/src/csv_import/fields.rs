//! Field parsers for imported cells
//!
//! Every parser reports a `Validation` error naming the column and the raw
//! cell so the row diagnostic points at the offending value.

use std::str::FromStr;

use chrono::NaiveDate;

use entregas_types::{Error, Result};

fn invalid(column: &str, value: &str, expected: &str) -> Error {
    Error::Validation(format!("{}: expected {}, got '{}'", column, expected, value))
}

/// `None` for blank cells
pub fn optional(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

pub fn required<'a>(column: &str, value: &'a str) -> Result<&'a str> {
    optional(value).ok_or_else(|| Error::Validation(format!("{} is required", column)))
}

/// ISO dates, plus the `DD/MM/YYYY` and `YYYY/MM/DD` forms found in exports
pub fn parse_date(column: &str, value: &str) -> Result<NaiveDate> {
    let value = required(column, value)?;
    let formats = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(date);
        }
    }
    Err(invalid(column, value, "a date"))
}

pub fn parse_optional_date(column: &str, value: &str) -> Result<Option<NaiveDate>> {
    optional(value).map(|v| parse_date(column, v)).transpose()
}

/// Non-negative integer; blank cells yield `default`
pub fn parse_count(column: &str, value: &str, default: u32) -> Result<u32> {
    let Some(value) = optional(value) else {
        return Ok(default);
    };
    value
        .parse()
        .map_err(|_| invalid(column, value, "a non-negative integer"))
}

/// Money amount to cents. Accepts `1234.5`, `1234,50` and `1.234,50`.
pub fn parse_cents(column: &str, value: &str) -> Result<u64> {
    let Some(raw) = optional(value) else {
        return Ok(0);
    };

    // Whichever separator comes last is the decimal one
    let normalized = match (raw.rfind(','), raw.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => raw.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => raw.replace(',', ""),
        (Some(_), None) => raw.replace(',', "."),
        _ => raw.to_string(),
    };

    let (whole, fraction) = normalized.split_once('.').unwrap_or((normalized.as_str(), ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid(column, raw, "an amount"));
    }
    if fraction.len() > 2 || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid(column, raw, "an amount with at most two decimals"));
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid(column, raw, "an amount"))?
    };
    let cents: u64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<u64>().map_err(|_| invalid(column, raw, "an amount"))? * 10,
        _ => fraction.parse().map_err(|_| invalid(column, raw, "an amount"))?,
    };

    whole
        .checked_mul(100)
        .and_then(|w| w.checked_add(cents))
        .ok_or_else(|| invalid(column, raw, "an amount"))
}

/// Duration in whole minutes from `90`, `1:30` or `01:30:00`
pub fn parse_minutes(column: &str, value: &str) -> Result<u32> {
    let Some(value) = optional(value) else {
        return Ok(0);
    };

    let parts: Vec<&str> = value.split(':').collect();
    let numbers: Option<Vec<u32>> = parts.iter().map(|p| p.trim().parse().ok()).collect();
    let Some(numbers) = numbers else {
        return Err(invalid(column, value, "minutes or HH:MM[:SS]"));
    };

    match numbers.as_slice() {
        [minutes] => Ok(*minutes),
        [hours, minutes] | [hours, minutes, _] if *minutes < 60 => hours
            .checked_mul(60)
            .and_then(|h| h.checked_add(*minutes))
            .ok_or_else(|| invalid(column, value, "a duration")),
        _ => Err(invalid(column, value, "minutes or HH:MM[:SS]")),
    }
}

/// Coded enum cell; blank cells yield the enum's default
pub fn parse_coded<T>(value: &str) -> Result<T>
where
    T: FromStr<Err = Error> + Default,
{
    optional(value).map(str::parse).unwrap_or_else(|| Ok(T::default()))
}

/// `|` separated list of keys
pub fn split_keys(value: &str) -> Vec<String> {
    value
        .split('|')
        .filter_map(optional)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use entregas_types::{DeliveryStatus, VehicleCategory};

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(parse_date("d", "2024-03-09").unwrap(), expected);
        assert_eq!(parse_date("d", "09/03/2024").unwrap(), expected);
        assert_eq!(parse_date("d", "2024/03/09").unwrap(), expected);
        assert!(parse_date("d", "").is_err());
        assert!(parse_date("d", "March 9").is_err());
        assert_eq!(parse_optional_date("d", " ").unwrap(), None);
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("f", "150").unwrap(), 15_000);
        assert_eq!(parse_cents("f", "150.5").unwrap(), 15_050);
        assert_eq!(parse_cents("f", "150,55").unwrap(), 15_055);
        assert_eq!(parse_cents("f", "1.234,50").unwrap(), 123_450);
        assert_eq!(parse_cents("f", "1,234.50").unwrap(), 123_450);
        assert_eq!(parse_cents("f", "").unwrap(), 0);
        assert!(parse_cents("f", "12.345").is_err());
        assert!(parse_cents("f", "-3").is_err());
        assert!(parse_cents("f", "abc").is_err());
    }

    #[test]
    fn test_parse_minutes() {
        assert_eq!(parse_minutes("t", "90").unwrap(), 90);
        assert_eq!(parse_minutes("t", "1:30").unwrap(), 90);
        assert_eq!(parse_minutes("t", "02:15:00").unwrap(), 135);
        assert_eq!(parse_minutes("t", "").unwrap(), 0);
        assert!(parse_minutes("t", "1:75").is_err());
        assert!(parse_minutes("t", "soon").is_err());
    }

    #[test]
    fn test_parse_count_default_and_errors() {
        assert_eq!(parse_count("c", "", 7).unwrap(), 7);
        assert_eq!(parse_count("c", " 12 ", 0).unwrap(), 12);
        let err = parse_count("capacity", "-1", 0).unwrap_err();
        assert!(err.to_string().contains("capacity"));
    }

    #[test]
    fn test_parse_coded_cells() {
        assert_eq!(parse_coded::<VehicleCategory>("2").unwrap(), VehicleCategory::Van);
        assert_eq!(parse_coded::<VehicleCategory>("").unwrap(), VehicleCategory::Car);
        assert_eq!(parse_coded::<DeliveryStatus>("E").unwrap(), DeliveryStatus::Delivered);
        assert!(parse_coded::<DeliveryStatus>("Z").is_err());
    }

    #[test]
    fn test_split_keys() {
        assert_eq!(split_keys("1| 2 ||3"), vec!["1", "2", "3"]);
        assert!(split_keys("").is_empty());
    }
}
