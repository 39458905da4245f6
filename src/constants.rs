// Windowing and forecasting
pub const WINDOW_SIZE: usize = 20; // Days of history in each model input
pub const DAYS_AHEAD: usize = 20; // Trading days forecast past the last close

// Data preprocessing
pub const TRAIN_SPLIT_RATIO: f64 = 0.80; // First 80% trains, the rest validates
pub const MIN_HISTORY: usize = 125; // Observations required before training starts

// Model parameters
pub const HIDDEN_SIZE: usize = 50;
pub const STD_DROPOUT_LAYER: f64 = 0.20;
pub const LEARNING_RATE: f64 = 0.001;
pub const EPOCHS: usize = 15;
pub const BATCH_SIZE: usize = 64;
pub const RANDOM_SEED: u64 = 12;

// Epoch scoring: ALPHA * training RMSE + (1 - ALPHA) * validation RMSE
pub const ALPHA: f64 = 0.25;

// Checkpoint paths
pub const CHECKPOINT_DIR: &str = "/tmp/saved_models";
pub const CHECKPOINT_PREFIX: &str = "model_epoch_";
