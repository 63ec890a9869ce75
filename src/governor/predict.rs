//! Trend extrapolation over recent resource history.
//!
//! Fits an ordinary least-squares line to `(seconds, value)` points and
//! evaluates it at a future instant. Percentage-based resources are
//! clamped to `[0, 100]` after extrapolation.

use thiserror::Error;

/// Minimum history points required for a forecast.
pub const MIN_PREDICTION_POINTS: usize = 10;

/// Errors from trend prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PredictError {
    /// Not enough history to fit a line.
    #[error("insufficient history: {have} of {need} required points")]
    InsufficientData { have: usize, need: usize },
}

/// Least-squares line fit: `(intercept, slope)`.
fn fit_line(points: &[(f64, f64)]) -> (f64, f64) {
    let n = points.len() as f64;
    let sum_x: f64 = points.iter().map(|(x, _)| x).sum();
    let sum_y: f64 = points.iter().map(|(_, y)| y).sum();
    let sum_xy: f64 = points.iter().map(|(x, y)| x * y).sum();
    let sum_xx: f64 = points.iter().map(|(x, _)| x * x).sum();

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator.abs() < f64::EPSILON {
        // All samples at the same instant: flat line through the mean
        return (sum_y / n, 0.0);
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;
    (intercept, slope)
}

/// Extrapolates the fitted line to `at` (same axis as the points).
///
/// Requires at least [`MIN_PREDICTION_POINTS`] points.
pub fn linear_forecast(points: &[(f64, f64)], at: f64) -> Result<f64, PredictError> {
    if points.len() < MIN_PREDICTION_POINTS {
        return Err(PredictError::InsufficientData {
            have: points.len(),
            need: MIN_PREDICTION_POINTS,
        });
    }

    let (intercept, slope) = fit_line(points);
    Ok(intercept + slope * at)
}

/// Forecast for a percentage resource, clamped to `[0, 100]`.
pub fn forecast_percent(points: &[(f64, f64)], at: f64) -> Result<f64, PredictError> {
    linear_forecast(points, at).map(|value| value.clamp(0.0, 100.0))
}
