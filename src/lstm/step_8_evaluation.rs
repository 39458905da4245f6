// Internal imports
use super::step_1_tensor_preparation::MinMaxScaler;
use crate::error::{ForecastError, Result};

/// Price-space output of a run
///
/// `history` and `predicted_history` line up element for element: the targets of
/// every training window followed by every validation window. `model_forecast` is
/// `predicted_history` followed by `forecast`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    pub history: Vec<f64>,
    pub predicted_history: Vec<f64>,
    pub forecast: Vec<f64>,
    pub model_forecast: Vec<f64>,
    pub mape: f64,
}

impl ForecastResult {
    /// Last forecast value, the predicted price at the horizon
    pub fn final_forecast(&self) -> Option<f64> {
        self.forecast.last().copied()
    }
}

/// Mean absolute percentage error, in percent
pub fn mape(actual: &[f64], fit: &[f64]) -> Result<f64> {
    if actual.len() != fit.len() {
        return Err(ForecastError::InvalidInput(format!(
            "{} actual values but {} fitted values",
            actual.len(),
            fit.len()
        )));
    }
    if actual.is_empty() {
        return Err(ForecastError::InvalidInput(
            "MAPE needs at least one observation".to_string(),
        ));
    }

    let mut total = 0.0;
    for (index, (&a, &f)) in actual.iter().zip(fit).enumerate() {
        if a == 0.0 {
            return Err(ForecastError::DegenerateInput { index });
        }
        total += ((a - f) / a).abs();
    }
    Ok(total / actual.len() as f64 * 100.0)
}

/// Inverse-scale targets, fits and forecast and score the historical fit
pub fn build_report(
    train_targets: &[f64],
    val_targets: &[f64],
    train_predictions: &[f64],
    val_predictions: &[f64],
    forecast: &[f64],
    scaler: &MinMaxScaler,
) -> Result<ForecastResult> {
    let history: Vec<f64> = scaler.inverse_all(&[train_targets, val_targets].concat());
    let predicted_history: Vec<f64> =
        scaler.inverse_all(&[train_predictions, val_predictions].concat());
    let forecast = scaler.inverse_all(forecast);

    let mape = mape(&history, &predicted_history)?;
    let model_forecast = [predicted_history.as_slice(), forecast.as_slice()].concat();

    Ok(ForecastResult {
        history,
        predicted_history,
        forecast,
        model_forecast,
        mape,
    })
}
