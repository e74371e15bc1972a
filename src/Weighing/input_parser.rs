//! Parsing of user-entered numeric fields.
//!
//! Ratio fields accept a plain number or a single "a/b" fraction; excess
//! fields are percentages. All failures surface as
//! [`WeighingError::Format`](super::weighing_calculator::WeighingError)
//! before any computation starts.

use crate::Weighing::weighing_calculator::WeighingError;

fn format_error(field: &str, reason: impl Into<String>) -> WeighingError {
    WeighingError::Format {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Decodes one molar ratio field: "1", "1.0", "3.141" or "1/3".
///
/// At most one '/' is allowed; "1/3/5" is a format error, as are empty
/// fields, non-numeric text, zero denominators and negative values.
pub fn parse_ratio_field(field_name: &str, field: &str) -> Result<f64, WeighingError> {
    let text = field.trim();
    if text.is_empty() {
        return Err(format_error(field_name, "nothing entered"));
    }
    let slashes = text.matches('/').count();
    if slashes > 1 {
        return Err(format_error(
            field_name,
            format!("'{}' has more than one '/'", text),
        ));
    }
    let value = if slashes == 1 {
        let (numer, denom) = text.split_once('/').unwrap_or((text, ""));
        let numer: f64 = numer
            .trim()
            .parse()
            .map_err(|_| format_error(field_name, format!("'{}' is not a number", numer)))?;
        let denom: f64 = denom
            .trim()
            .parse()
            .map_err(|_| format_error(field_name, format!("'{}' is not a number", denom)))?;
        if denom == 0.0 {
            return Err(format_error(field_name, "denominator is zero"));
        }
        numer / denom
    } else {
        text.parse()
            .map_err(|_| format_error(field_name, format!("'{}' is not a number", text)))?
    };
    if value < 0.0 {
        return Err(format_error(field_name, "ratio must be non-negative"));
    }
    Ok(value)
}

/// Decodes an excess field given in mol% into a fraction: "5" -> 0.05.
/// Empty input counts as no excess.
pub fn parse_excess_field(field_name: &str, field: &str) -> Result<f64, WeighingError> {
    let text = field.trim();
    if text.is_empty() {
        return Ok(0.0);
    }
    let percent: f64 = text
        .parse()
        .map_err(|_| format_error(field_name, format!("'{}' is not a number", text)))?;
    if percent < 0.0 {
        return Err(format_error(field_name, "excess must be 0 or positive"));
    }
    Ok(percent / 100.0)
}

/// Decodes the target product mass in mg; must be a positive number.
pub fn parse_target_mass(field: &str) -> Result<f64, WeighingError> {
    let text = field.trim();
    let mg: f64 = text
        .parse()
        .map_err(|_| format_error("mg", format!("'{}' is not a number", text)))?;
    if !(mg > 0.0) {
        return Err(format_error("mg", "target mass must be positive"));
    }
    Ok(mg)
}
