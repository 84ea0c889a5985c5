//! Retention directives derived from descriptor retention policies

use crate::{Error, Result};
use mon_model::{RetentionMethod, RetentionPolicy};
use serde::Serialize;

const KIB: f64 = 1024.0;

/// Normalized retention: a size cap or a maximum age, plus an optional
/// number of rotated files or indices to keep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetentionDirective {
    pub method: RetentionMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep: Option<u32>,
}

impl RetentionDirective {
    /// Parse a descriptor policy. `source_name` is used in errors only.
    pub fn parse(source_name: &str, policy: &RetentionPolicy) -> Result<Self> {
        let fail = |message: String| Error::Retention {
            source_name: source_name.to_string(),
            value: policy.value.clone(),
            message,
        };
        let mut parts = policy.value.split(',').map(str::trim);
        let amount = parts.next().unwrap_or_default();
        let mut keep = None;
        for part in parts.filter(|p| !p.is_empty()) {
            let count = leading_integer(part.trim_start_matches(|c: char| !c.is_ascii_digit()))
                .ok_or_else(|| fail(format!("'{}' does not give a count to keep", part)))?;
            keep = Some(count);
        }

        let directive = match policy.method {
            RetentionMethod::Size => Self {
                method: policy.method,
                max_size_bytes: Some(parse_size(amount).map_err(fail)?),
                max_age_days: None,
                keep,
            },
            RetentionMethod::Time => Self {
                method: policy.method,
                max_size_bytes: None,
                max_age_days: Some(parse_age(amount).map_err(fail)?),
                keep,
            },
        };
        Ok(directive)
    }

    /// Rollover size in index-lifecycle notation, e.g. `10mb`.
    pub fn rollover_size(&self) -> Option<String> {
        let bytes = self.max_size_bytes?;
        let units = [("gb", 1u64 << 30), ("mb", 1 << 20), ("kb", 1 << 10)];
        Some(
            units
                .iter()
                .find(|(_, size)| bytes >= *size && bytes % size == 0)
                .map_or_else(|| format!("{}b", bytes), |(unit, size)| format!("{}{}", bytes / size, unit)),
        )
    }

    /// Maximum age in index-lifecycle notation, e.g. `30d`.
    pub fn max_age(&self) -> Option<String> {
        self.max_age_days.map(|days| format!("{}d", days))
    }
}

fn leading_integer(text: &str) -> Option<u32> {
    let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Split `"10 MB"` / `"1.5GB"` into the number and its lowercase unit.
fn split_amount(text: &str) -> std::result::Result<(f64, String), String> {
    let text = text.trim();
    let end = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let number: f64 = text[..end]
        .parse()
        .map_err(|_| format!("'{}' does not start with a number", text))?;
    if number <= 0.0 {
        return Err("amount must be positive".to_string());
    }
    Ok((number, text[end..].trim().to_lowercase()))
}

fn parse_size(text: &str) -> std::result::Result<u64, String> {
    let (number, unit) = split_amount(text)?;
    let multiplier = match unit.as_str() {
        "" | "b" | "bytes" => 1.0,
        "k" | "kb" | "kib" => KIB,
        "m" | "mb" | "mib" => KIB * KIB,
        "g" | "gb" | "gib" => KIB * KIB * KIB,
        other => return Err(format!("unknown size unit '{}'", other)),
    };
    Ok((number * multiplier).ceil() as u64)
}

fn parse_age(text: &str) -> std::result::Result<u32, String> {
    let (number, unit) = split_amount(text)?;
    let days_per_unit = match unit.as_str() {
        "" | "d" | "day" | "days" | "dia" | "dias" | "día" | "días" => 1.0,
        "w" | "week" | "weeks" | "semana" | "semanas" => 7.0,
        "month" | "months" | "mes" | "meses" => 30.0,
        "y" | "year" | "years" | "año" | "años" => 365.0,
        "h" | "hour" | "hours" | "horas" => {
            return Err("ages below one day are not supported".to_string());
        }
        other => return Err(format!("unknown time unit '{}'", other)),
    };
    Ok((number * days_per_unit).ceil() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn policy(method: RetentionMethod, value: &str) -> RetentionPolicy {
        RetentionPolicy {
            method,
            value: value.into(),
        }
    }

    #[test]
    fn size_with_backups() {
        let directive =
            RetentionDirective::parse("app.log", &policy(RetentionMethod::Size, "10MB, 5 backups"))
                .unwrap();

        assert_eq!(directive.max_size_bytes, Some(10 * 1024 * 1024));
        assert_eq!(directive.keep, Some(5));
        assert_eq!(directive.rollover_size().as_deref(), Some("10mb"));
        assert_eq!(directive.max_age(), None);
    }

    #[rstest]
    #[case("30 days", 30)]
    #[case("7d", 7)]
    #[case("2 weeks", 14)]
    #[case("1 month", 30)]
    #[case("14", 14)]
    fn time_based_ages(#[case] value: &str, #[case] days: u32) {
        let directive =
            RetentionDirective::parse("app.log", &policy(RetentionMethod::Time, value)).unwrap();
        assert_eq!(directive.max_age_days, Some(days));
        assert_eq!(directive.keep, None);
    }

    #[test]
    fn time_with_keep_count() {
        let directive =
            RetentionDirective::parse("app.log", &policy(RetentionMethod::Time, "7d, keep 4")).unwrap();
        assert_eq!(directive.keep, Some(4));
    }

    #[rstest]
    #[case(RetentionMethod::Size, "lots")]
    #[case(RetentionMethod::Size, "10 parsecs")]
    #[case(RetentionMethod::Time, "12 hours")]
    #[case(RetentionMethod::Time, "30 days, forever")]
    #[case(RetentionMethod::Time, "0d")]
    fn unparseable_values_fail(#[case] method: RetentionMethod, #[case] value: &str) {
        let err = RetentionDirective::parse("app.log", &policy(method, value)).unwrap_err();
        assert_eq!(err.source_name(), Some("app.log"));
        assert!(err.to_string().contains(value));
    }
}
