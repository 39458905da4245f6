// External imports
use burn::module::AutodiffModule;
use burn::nn::loss::{MseLoss, Reduction::Mean};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Tensor};
use log::{debug, info};

// Internal imports
use super::step_1_tensor_preparation::{window_set_to_tensors, WindowSet};
use super::step_3_lstm_model_arch::{PriceLstm, PriceLstmConfig};
use super::step_6_model_serialization::{CheckpointMetadata, CheckpointWriter, Checkpoints};
use crate::config::ForecastConfig;
use crate::constants;
use crate::error::{ForecastError, Result};

/// Configuration for training the model
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub learning_rate: f64,
    pub batch_size: usize,
    pub epochs: usize,
    pub random_seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: constants::LEARNING_RATE,
            batch_size: constants::BATCH_SIZE,
            epochs: constants::EPOCHS,
            random_seed: constants::RANDOM_SEED,
        }
    }
}

impl From<&ForecastConfig> for TrainingConfig {
    fn from(config: &ForecastConfig) -> Self {
        Self {
            learning_rate: config.learning_rate,
            batch_size: config.batch_size,
            epochs: config.epochs,
            random_seed: config.random_seed,
        }
    }
}

/// Per-epoch MSE in scaled units; index 0 is epoch 1
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingHistory {
    pub train_loss: Vec<f64>,
    pub val_loss: Vec<f64>,
}

impl TrainingHistory {
    pub fn epochs(&self) -> usize {
        self.train_loss.len()
    }

    pub fn train_rmse(&self) -> Vec<f64> {
        self.train_loss.iter().map(|loss| loss.sqrt()).collect()
    }

    pub fn val_rmse(&self) -> Vec<f64> {
        self.val_loss.iter().map(|loss| loss.sqrt()).collect()
    }
}

/// Split along the first dimension into chronological batches
fn get_batches<B: Backend, const D: usize>(
    data: &Tensor<B, D>,
    batch_size: usize,
) -> Vec<Tensor<B, D>> {
    let num_samples = data.dims()[0];
    let mut batches = Vec::new();
    let mut start = 0;
    while start < num_samples {
        let end = usize::min(start + batch_size, num_samples);
        batches.push(data.clone().narrow(0, start, end - start));
        start = end;
    }
    batches
}

fn scalar<B: Backend>(tensor: Tensor<B, 1>) -> f64 {
    tensor.into_scalar().elem::<f64>()
}

fn ensure_finite(epoch: usize, what: &str, loss: f64) -> Result<f64> {
    if loss.is_finite() {
        Ok(loss)
    } else {
        Err(ForecastError::TrainingFailure {
            epoch,
            reason: format!("{} loss is {}", what, loss),
        })
    }
}

/// Train a fresh `PriceLstm` and checkpoint it after every epoch
///
/// The backend RNG is seeded right before the model is built, so the same inputs and
/// seed give the same checkpoints. Batches are fed in chronological order. The epoch's
/// training loss is the sample-weighted mean of its batch losses; the validation loss
/// is the MSE of the end-of-epoch model over the whole validation set, computed on the
/// inner backend where dropout is off.
///
/// Checkpoints already written stay on disk when a later epoch fails.
pub fn train_model<B: AutodiffBackend>(
    train: &WindowSet,
    validation: &WindowSet,
    model_config: &PriceLstmConfig,
    config: &TrainingConfig,
    mut writer: CheckpointWriter,
    device: &B::Device,
) -> Result<(TrainingHistory, Checkpoints)> {
    if train.is_empty() || validation.is_empty() {
        return Err(ForecastError::InvalidInput(format!(
            "cannot train on {} training and {} validation windows",
            train.len(),
            validation.len()
        )));
    }
    if config.batch_size == 0 {
        return Err(ForecastError::InvalidConfig(
            "batch_size must be positive".to_string(),
        ));
    }

    info!(
        "Starting model training: {} training windows, {} validation windows, {} epochs",
        train.len(),
        validation.len(),
        config.epochs
    );

    let (train_features, train_targets) = window_set_to_tensors::<B>(train, device);
    let (val_features, val_targets) = window_set_to_tensors::<B::InnerBackend>(validation, device);

    let feature_batches = get_batches(&train_features, config.batch_size);
    let target_batches = get_batches(&train_targets, config.batch_size);
    debug!(
        "{} batches of up to {} windows per epoch",
        feature_batches.len(),
        config.batch_size
    );

    B::seed(config.random_seed);
    let mut model: PriceLstm<B> = model_config.init(device);
    let mut optimizer = AdamConfig::new().init();
    let loss_fn = MseLoss::new();

    let mut history = TrainingHistory::default();
    for epoch in 1..=config.epochs {
        let mut weighted_loss = 0.0;
        for (batch_features, batch_targets) in feature_batches.iter().zip(target_batches.iter()) {
            let batch_len = batch_features.dims()[0];
            let predictions = model.forward(batch_features.clone());
            let loss = loss_fn.forward(predictions, batch_targets.clone(), Mean);

            let batch_loss = ensure_finite(epoch, "training", scalar(loss.clone()))?;
            weighted_loss += batch_loss * batch_len as f64;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optimizer.step(config.learning_rate, model, grads);
        }
        let train_loss = weighted_loss / train.len() as f64;

        // Evaluate and checkpoint the dropout-free copy
        let inner_model = model.valid();
        let val_predictions = inner_model.forward(val_features.clone());
        let val_loss = ensure_finite(
            epoch,
            "validation",
            scalar(MseLoss::new().forward(val_predictions, val_targets.clone(), Mean)),
        )?;

        info!(
            "Epoch {}/{}: Train Loss = {:.6}, Validation Loss = {:.6}",
            epoch, config.epochs, train_loss, val_loss
        );

        let metadata = CheckpointMetadata::new(epoch, *model_config, train_loss, val_loss);
        writer.record(&inner_model, &metadata)?;

        history.train_loss.push(train_loss);
        history.val_loss.push(val_loss);
    }

    info!("Training completed, {} checkpoints written", history.epochs());
    Ok((history, writer.finish()))
}
