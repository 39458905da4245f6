// External imports
use burn::tensor::{backend::Backend, Tensor};
use log::debug;
use std::collections::VecDeque;

// Internal imports
use super::step_1_tensor_preparation::{window_set_to_tensors, window_to_tensor, WindowSet};
use super::step_3_lstm_model_arch::PriceLstm;
use crate::error::{ForecastError, Result};

fn tensor_to_vec<B: Backend>(tensor: Tensor<B, 2>) -> Result<Vec<f64>> {
    let values = tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| ForecastError::Tensor(format!("{:?}", e)))?;
    Ok(values.into_iter().map(f64::from).collect())
}

/// One-step predictions for every window of `set`, in window order (scaled units)
pub fn predict_windows<B: Backend>(
    model: &PriceLstm<B>,
    set: &WindowSet,
    device: &B::Device,
) -> Result<Vec<f64>> {
    if set.is_empty() {
        return Ok(Vec::new());
    }
    let (features, _) = window_set_to_tensors::<B>(set, device);
    tensor_to_vec(model.forward(features))
}

/// Single-step prediction for one window
pub fn predict_next_step<B: Backend>(
    model: &PriceLstm<B>,
    window: &[f64],
    device: &B::Device,
) -> Result<f64> {
    let prediction = tensor_to_vec(model.forward(window_to_tensor::<B>(window, device)))?;
    prediction
        .first()
        .copied()
        .ok_or_else(|| ForecastError::Tensor("model returned no prediction".to_string()))
}

/// Autoregressive forecast of `steps` values past `last_window` (scaled units)
///
/// Each prediction is appended to the output and pushed onto the window, whose oldest
/// value is dropped, before the next step runs. Use an inner-backend model so dropout
/// stays off and the result is deterministic.
pub fn generate_forecast<B: Backend>(
    model: &PriceLstm<B>,
    last_window: &[f64],
    steps: usize,
    device: &B::Device,
) -> Result<Vec<f64>> {
    if last_window.len() != model.window_size() {
        return Err(ForecastError::InvalidInput(format!(
            "forecast window holds {} values, the model expects {}",
            last_window.len(),
            model.window_size()
        )));
    }

    let mut window: VecDeque<f64> = last_window.iter().copied().collect();
    let mut forecast = Vec::with_capacity(steps);
    for step in 1..=steps {
        let next_value = predict_next_step(model, window.make_contiguous(), device)?;
        debug!("Forecast step {}/{}: {:.6}", step, steps, next_value);

        forecast.push(next_value);
        window.pop_front();
        window.push_back(next_value);
    }
    Ok(forecast)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lstm::step_1_tensor_preparation::sliding_windows;
    use crate::lstm::step_3_lstm_model_arch::PriceLstmConfig;
    use burn_ndarray::{NdArray, NdArrayDevice};

    fn model() -> PriceLstm<NdArray> {
        PriceLstmConfig::new(20, 50, 0.2).init(&NdArrayDevice::default())
    }

    fn last_window() -> Vec<f64> {
        (0..20).map(|i| 0.5 + i as f64 / 100.0).collect()
    }

    #[test]
    fn test_forecast_length_matches_steps() {
        let device = NdArrayDevice::default();
        let model = model();
        for steps in [0usize, 1, 20] {
            let forecast = generate_forecast(&model, &last_window(), steps, &device).unwrap();
            assert_eq!(forecast.len(), steps);
        }
    }

    #[test]
    fn test_forecast_is_deterministic() {
        let device = NdArrayDevice::default();
        let model = model();
        let first = generate_forecast(&model, &last_window(), 20, &device).unwrap();
        let second = generate_forecast(&model, &last_window(), 20, &device).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_forecast_rolls_predictions_into_window() {
        let device = NdArrayDevice::default();
        let model = model();
        let window = last_window();
        let forecast = generate_forecast(&model, &window, 2, &device).unwrap();

        let mut rolled = window[1..].to_vec();
        rolled.push(forecast[0]);
        let second = predict_next_step(&model, &rolled, &device).unwrap();
        assert!((second - forecast[1]).abs() < 1e-6);
    }

    #[test]
    fn test_wrong_window_length_is_rejected() {
        let device = NdArrayDevice::default();
        let result = generate_forecast(&model(), &[0.1; 5], 3, &device);
        assert!(matches!(result, Err(ForecastError::InvalidInput(_))));
    }

    #[test]
    fn test_predict_windows_matches_single_steps() {
        let device = NdArrayDevice::default();
        let model = model();
        let series: Vec<f64> = (0..30).map(|i| i as f64 / 30.0).collect();
        let set = sliding_windows(&series, 20);

        let batch = predict_windows(&model, &set, &device).unwrap();
        assert_eq!(batch.len(), set.len());
        let single = predict_next_step(&model, &series[0..20], &device).unwrap();
        assert!((batch[0] - single).abs() < 1e-5);
    }
}
