//! Per-group z-score standardization.
//!
//! Each response variable is standardized within its species group before any
//! model is fit, so AICc values are comparable across nutrients and the year
//! effect is expressed in standard-deviation units.

use crate::error::AppError;

/// Output of standardizing one response column within one group.
#[derive(Debug, Clone)]
pub struct Standardized {
    pub values: Vec<f64>,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator).
    pub sd: f64,
}

/// Z-score a response column: `(raw - mean) / sd`.
///
/// Errors (rather than emitting NaN) when:
/// - fewer than 2 values (sample sd undefined)
/// - any value is non-finite (upstream join should have filtered these)
/// - the group has zero variance (degenerate standardization)
pub fn standardize(raw: &[f64]) -> Result<Standardized, AppError> {
    if raw.len() < 2 {
        return Err(AppError::new(
            3,
            format!("Need at least 2 values to standardize, got {}.", raw.len()),
        ));
    }
    if let Some(idx) = raw.iter().position(|v| !v.is_finite()) {
        return Err(AppError::new(
            3,
            format!("Non-finite response value at group row {idx}."),
        ));
    }

    let n = raw.len() as f64;
    let mean = raw.iter().sum::<f64>() / n;
    let ss = raw.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    let sd = (ss / (n - 1.0)).sqrt();

    // A constant column of a non-representable value (e.g. 0.15) leaves
    // summation residue in `sd` (~1e-17), so an exact `sd == 0.0` check would
    // let pure rounding noise through as z-scores. Reject anything at the
    // level of that residue, scaled by the magnitude of the data.
    let degenerate_sd = f64::EPSILON * mean.abs().max(1.0) * n.sqrt();
    if sd <= degenerate_sd {
        return Err(AppError::new(
            3,
            "Zero variance in group; cannot standardize.",
        ));
    }

    let values = raw.iter().map(|v| (v - mean) / sd).collect();
    Ok(Standardized { values, mean, sd })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_moments(values: &[f64]) -> (f64, f64) {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let ss = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
        (mean, (ss / (n - 1.0)).sqrt())
    }

    #[test]
    fn standardized_values_have_zero_mean_unit_sd() {
        let raw = [43.2, 47.9, 45.1, 44.0, 46.6, 48.3, 42.7, 45.5];
        let std = standardize(&raw).unwrap();

        let (mean, sd) = sample_moments(&std.values);
        assert!(mean.abs() < 1e-12, "mean = {mean}");
        assert!((sd - 1.0).abs() < 1e-12, "sd = {sd}");
    }

    #[test]
    fn zero_variance_group_is_an_error() {
        let raw = [1.5, 1.5, 1.5, 1.5];
        let err = standardize(&raw).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn constant_non_representable_value_is_still_zero_variance() {
        // 0.15 has no exact binary representation; the mean accumulates
        // residue and the naive sd comes out near 8e-17 instead of 0.
        let raw = vec![0.15_f64; 40];
        let err = standardize(&raw).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("Zero variance"));
    }

    #[test]
    fn tiny_but_real_variance_is_not_rejected() {
        // Genuine spread well above summation residue must standardize.
        let raw = [0.1500, 0.1501, 0.1502, 0.1499, 0.1503, 0.1498];
        let std = standardize(&raw).unwrap();
        assert!(std.sd > 0.0);
        let (mean, sd) = sample_moments(&std.values);
        assert!(mean.abs() < 1e-9, "mean = {mean}");
        assert!((sd - 1.0).abs() < 1e-9, "sd = {sd}");
    }

    #[test]
    fn non_finite_value_is_an_error_not_nan() {
        let raw = [1.0, f64::NAN, 3.0];
        let err = standardize(&raw).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn single_value_is_an_error() {
        assert!(standardize(&[42.0]).is_err());
    }
}
