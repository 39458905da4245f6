// External imports
use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Initializer, Linear, LinearConfig};
use burn::tensor::{backend::Backend, Tensor};
use serde::{Deserialize, Serialize};

// Internal imports
use super::step_2_lstm_cell::ReluLstm;
use crate::config::ForecastConfig;

/// Next-close regressor: LSTM -> dropout -> single linear unit
///
/// Input is `[batch_size, 1, window_size]`: the whole window is one time step with
/// `window_size` features. Output is `[batch_size, 1]` in scaled units.
///
/// The linear unit predicts the move from the window's most recent value and starts
/// at zero, so an untrained model repeats the last close.
#[derive(Module, Debug)]
pub struct PriceLstm<B: Backend> {
    window_size: usize,
    hidden_size: usize,

    lstm: ReluLstm<B>,
    dropout: Dropout,
    output: Linear<B>,
}

impl<B: Backend> PriceLstm<B> {
    /// Create a new model
    ///
    /// # Arguments
    ///
    /// * `window_size` - Values per input window
    /// * `hidden_size` - Width of the recurrent layer
    /// * `dropout_rate` - Drop probability applied to the recurrent output
    /// * `device` - Device to place tensors on
    pub fn new(
        window_size: usize,
        hidden_size: usize,
        dropout_rate: f64,
        device: &B::Device,
    ) -> Self {
        let lstm = ReluLstm::new(window_size, hidden_size, device);
        let dropout = DropoutConfig::new(dropout_rate).init();
        let output = LinearConfig::new(hidden_size, 1)
            .with_initializer(Initializer::Zeros)
            .init(device);

        Self {
            window_size,
            hidden_size,
            lstm,
            dropout,
            output,
        }
    }

    /// Forward pass
    ///
    /// Dropout is only active on autodiff backends, so the inner-backend copy of a
    /// trained model predicts deterministically.
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch_size, sequence_length, input_size] = x.dims();
        // [batch_size, 1]
        let last_value = x
            .clone()
            .narrow(1, sequence_length - 1, 1)
            .narrow(2, input_size - 1, 1)
            .reshape([batch_size, 1]);

        let hidden = self.lstm.forward(x);
        let dropped = self.dropout.forward(hidden);
        last_value + self.output.forward(dropped)
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }
}

/// Architecture of a `PriceLstm`, also written next to every checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLstmConfig {
    pub window_size: usize,
    pub hidden_size: usize,
    pub dropout_rate: f64,
}

impl PriceLstmConfig {
    pub fn new(window_size: usize, hidden_size: usize, dropout_rate: f64) -> Self {
        Self {
            window_size,
            hidden_size,
            dropout_rate,
        }
    }

    /// Initialize a model from this configuration
    pub fn init<B: Backend>(&self, device: &B::Device) -> PriceLstm<B> {
        PriceLstm::new(self.window_size, self.hidden_size, self.dropout_rate, device)
    }
}

impl From<&ForecastConfig> for PriceLstmConfig {
    fn from(config: &ForecastConfig) -> Self {
        Self::new(config.window_size, config.hidden_size, config.dropout)
    }
}
