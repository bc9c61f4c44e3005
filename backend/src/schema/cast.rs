//! Casting of raw cell text to typed JSON values.

use super::{FieldType, SchemaField};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Number, Value};

const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d", "%d.%m.%Y", "%d/%m/%y",
];

const DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
];

/// An observation time as written in the file: with an explicit offset or
/// as local wall-clock time to be placed in the project timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationDate {
    Local(NaiveDateTime),
    Aware(DateTime<FixedOffset>),
}

impl ObservationDate {
    pub fn from_date(date: NaiveDate) -> Self {
        ObservationDate::Local(date.and_time(NaiveTime::default()))
    }

    fn to_json_string(self) -> String {
        match self {
            ObservationDate::Local(naive) => naive.format("%Y-%m-%dT%H:%M:%S").to_string(),
            ObservationDate::Aware(aware) => aware.to_rfc3339(),
        }
    }
}

/// `fmt:` is the Table Schema marker for a strftime pattern.
fn strftime_pattern(format: &str) -> &str {
    format.strip_prefix("fmt:").unwrap_or(format)
}

pub fn parse_date(value: &str, format: Option<&str>) -> Option<NaiveDate> {
    let value = value.trim();
    match format.unwrap_or("default") {
        "default" => NaiveDate::parse_from_str(value, "%Y-%m-%d").ok(),
        "any" => DATE_FORMATS
            .iter()
            .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
            .or_else(|| match parse_datetime(value, Some("any"))? {
                ObservationDate::Local(naive) => Some(naive.date()),
                ObservationDate::Aware(aware) => Some(aware.date_naive()),
            }),
        pattern => NaiveDate::parse_from_str(value, strftime_pattern(pattern)).ok(),
    }
}

pub fn parse_datetime(value: &str, format: Option<&str>) -> Option<ObservationDate> {
    let value = value.trim();
    match format.unwrap_or("default") {
        "default" => DateTime::parse_from_rfc3339(value)
            .map(ObservationDate::Aware)
            .or_else(|_| {
                NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").map(ObservationDate::Local)
            })
            .ok(),
        "any" => DateTime::parse_from_rfc3339(value)
            .map(ObservationDate::Aware)
            .ok()
            .or_else(|| {
                DATETIME_FORMATS
                    .iter()
                    .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
                    .map(ObservationDate::Local)
            })
            .or_else(|| {
                DATE_FORMATS
                    .iter()
                    .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
                    .map(ObservationDate::from_date)
            }),
        pattern => {
            let pattern = strftime_pattern(pattern);
            DateTime::parse_from_str(value, pattern)
                .map(ObservationDate::Aware)
                .or_else(|_| NaiveDateTime::parse_from_str(value, pattern).map(ObservationDate::Local))
                .or_else(|_| NaiveDate::parse_from_str(value, pattern).map(ObservationDate::from_date))
                .ok()
        }
    }
}

fn parse_boolean(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "t" | "1" => Some(true),
        "false" | "no" | "n" | "f" | "0" => Some(false),
        _ => None,
    }
}

/// Casts a non-blank cell to the field's type.
pub(crate) fn cast_value(field: &SchemaField, raw: &str) -> Result<Value, String> {
    let raw = raw.trim();
    let format = field.format.as_deref();
    let invalid = || format!("'{raw}' is not a valid {}", field.field_type.as_str());
    match field.field_type {
        FieldType::String => Ok(Value::String(raw.to_string())),
        FieldType::Integer => raw
            .parse::<i64>()
            .ok()
            .or_else(|| {
                // spreadsheets hand integers over as "12.0"
                raw.parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            })
            .map(Value::from)
            .ok_or_else(invalid),
        FieldType::Number => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(invalid),
        FieldType::Boolean => parse_boolean(raw).map(Value::Bool).ok_or_else(invalid),
        FieldType::Date => parse_date(raw, format)
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .ok_or_else(invalid),
        FieldType::Datetime => parse_datetime(raw, format)
            .map(|d| Value::String(d.to_json_string()))
            .ok_or_else(invalid),
    }
}

/// Checks `enum`, `minimum`, `maximum` and `pattern` on a cast value.
pub(crate) fn check_constraints(field: &SchemaField, raw: &str, value: &Value) -> Result<(), String> {
    let raw = raw.trim();
    let constraints = &field.constraints;
    if let Some(allowed) = &constraints.enum_values {
        if !allowed.iter().any(|a| a == raw) {
            return Err(format!("'{raw}' is not one of: {}", allowed.join(", ")));
        }
    }
    if let Some(number) = value.as_f64() {
        if let Some(min) = constraints.minimum {
            if number < min {
                return Err(format!("{raw} is less than the minimum of {min}"));
            }
        }
        if let Some(max) = constraints.maximum {
            if number > max {
                return Err(format!("{raw} is greater than the maximum of {max}"));
            }
        }
    }
    if let Some(pattern) = &constraints.pattern {
        if !pattern.is_match(raw) {
            return Err(format!("'{raw}' does not match the pattern {}", pattern.as_str()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Constraints, FieldType};
    use rstest::rstest;

    fn field(field_type: FieldType, format: Option<&str>) -> SchemaField {
        SchemaField {
            name: "f".into(),
            field_type,
            format: format.map(str::to_string),
            constraints: Constraints::default(),
            biosys: None,
        }
    }

    #[rstest]
    #[case("2018-03-21", None, Some((2018, 3, 21)))]
    #[case("21/03/2018", None, None)]
    #[case("21/03/2018", Some("any"), Some((2018, 3, 21)))]
    #[case("2018-03-21 10:30", Some("any"), Some((2018, 3, 21)))]
    #[case("03/21/2018", Some("%m/%d/%Y"), Some((2018, 3, 21)))]
    #[case("03/21/2018", Some("fmt:%m/%d/%Y"), Some((2018, 3, 21)))]
    #[case("yesterday", Some("any"), None)]
    fn dates(#[case] value: &str, #[case] format: Option<&str>, #[case] expected: Option<(i32, u32, u32)>) {
        let expected = expected.map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap());
        assert_eq!(parse_date(value, format), expected);
    }

    #[rstest]
    fn datetimes_keep_their_offset() {
        let parsed = parse_datetime("2018-03-21T10:30:00+08:00", None).unwrap();
        assert!(matches!(parsed, ObservationDate::Aware(dt) if dt.offset().local_minus_utc() == 8 * 3600));
        let parsed = parse_datetime("21/03/2018 10:30", Some("any")).unwrap();
        assert!(matches!(parsed, ObservationDate::Local(_)));
    }

    #[rstest]
    #[case(FieldType::Integer, "12", Some(Value::from(12)))]
    #[case(FieldType::Integer, "12.0", Some(Value::from(12)))]
    #[case(FieldType::Integer, "12.5", None)]
    #[case(FieldType::Number, "1.5", Some(Value::from(1.5)))]
    #[case(FieldType::Number, "abc", None)]
    #[case(FieldType::Boolean, "Yes", Some(Value::Bool(true)))]
    #[case(FieldType::Boolean, "0", Some(Value::Bool(false)))]
    #[case(FieldType::String, " text ", Some(Value::from("text")))]
    fn casts(#[case] field_type: FieldType, #[case] raw: &str, #[case] expected: Option<Value>) {
        assert_eq!(cast_value(&field(field_type, None), raw).ok(), expected);
    }

    #[rstest]
    fn constraint_violations() {
        let mut f = field(FieldType::Integer, None);
        f.constraints.minimum = Some(0.0);
        f.constraints.maximum = Some(10.0);
        assert!(check_constraints(&f, "5", &Value::from(5)).is_ok());
        assert!(check_constraints(&f, "11", &Value::from(11)).is_err());
        assert!(check_constraints(&f, "-1", &Value::from(-1)).is_err());

        let mut f = field(FieldType::String, None);
        f.constraints.enum_values = Some(vec!["M".into(), "F".into()]);
        assert!(check_constraints(&f, "M", &Value::from("M")).is_ok());
        assert!(check_constraints(&f, "X", &Value::from("X")).is_err());
    }
}
