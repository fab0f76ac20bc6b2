use std::time::Duration;

use super::types::PositiveUsize;
use crate::error::{AppError, AppResult, ValidationError};

pub(crate) fn parse_header(s: &str) -> Result<(String, String), ValidationError> {
    match s.split_once(':') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_owned(), value.trim().to_owned()))
        }
        Some(_) | None => Err(ValidationError::InvalidHeaderFormat {
            value: s.to_owned(),
        }),
    }
}

pub(crate) fn parse_positive_usize(s: &str) -> AppResult<PositiveUsize> {
    s.parse::<PositiveUsize>().map_err(AppError::from)
}

/// Durations where a bare number means seconds (`--duration 30`).
pub(crate) fn parse_duration_arg(s: &str) -> AppResult<Duration> {
    parse_with_default_unit(s, "s", false)
}

/// Durations where a bare number means milliseconds (`--timeout 1500`).
pub(crate) fn parse_millis_arg(s: &str) -> AppResult<Duration> {
    parse_with_default_unit(s, "ms", false)
}

/// Like [`parse_millis_arg`] but accepts zero, which disables pacing.
pub(crate) fn parse_interval_arg(s: &str) -> AppResult<Duration> {
    parse_with_default_unit(s, "ms", true)
}

fn parse_with_default_unit(s: &str, default_unit: &str, allow_zero: bool) -> AppResult<Duration> {
    let value = s.trim();
    if value.is_empty() {
        return Err(AppError::validation(ValidationError::DurationEmpty));
    }

    let digits_len = value.chars().take_while(char::is_ascii_digit).count();
    if digits_len == 0 {
        return Err(AppError::validation(
            ValidationError::InvalidDurationFormat {
                value: value.to_owned(),
            },
        ));
    }
    let (num_part, unit_part) = value.split_at(digits_len);
    let number: u64 = num_part.parse().map_err(|err| {
        AppError::validation(ValidationError::InvalidDurationNumber {
            value: value.to_owned(),
            source: err,
        })
    })?;

    let unit = if unit_part.is_empty() {
        default_unit
    } else {
        unit_part.trim()
    };
    let duration = match unit {
        "ms" => Duration::from_millis(number),
        "s" => Duration::from_secs(number),
        "m" => {
            let secs = number
                .checked_mul(60)
                .ok_or_else(|| AppError::validation(ValidationError::DurationOverflow))?;
            Duration::from_secs(secs)
        }
        "h" => {
            let secs = number
                .checked_mul(60)
                .and_then(|seconds| seconds.checked_mul(60))
                .ok_or_else(|| AppError::validation(ValidationError::DurationOverflow))?;
            Duration::from_secs(secs)
        }
        _ => {
            return Err(AppError::validation(ValidationError::InvalidDurationUnit {
                unit: unit.to_owned(),
            }));
        }
    };

    if !allow_zero && duration.is_zero() {
        return Err(AppError::validation(ValidationError::DurationZero));
    }

    Ok(duration)
}
