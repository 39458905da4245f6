/// # LSTM Forecasting Module
///
/// Trains a single-layer LSTM on sliding windows of scaled closes, checkpoints it after
/// every epoch, picks the checkpoint with the best blended training/validation RMSE and
/// rolls it forward to forecast the coming days.
///
/// ## Module Structure:
///
/// 1. **step_1_tensor_preparation**: Scaling, chronological split, leak check and windowing
/// 2. **step_2_lstm_cell**: LSTM layer with ReLU cell and output activations
/// 3. **step_3_lstm_model_arch**: LSTM -> dropout -> linear regressor
/// 4. **step_4_train_model**: Seeded, unshuffled training loop with per-epoch checkpoints
/// 5. **step_5_prediction**: Batch prediction and autoregressive multi-step forecasting
/// 6. **step_6_model_serialization**: Checkpoint directory writer and read-only view
/// 7. **step_7_epoch_selection**: Epoch scoring strategies and the score table
/// 8. **step_8_evaluation**: Price-space reconstruction and MAPE
///
pub mod step_1_tensor_preparation;
pub mod step_2_lstm_cell;
pub mod step_3_lstm_model_arch;
pub mod step_4_train_model;
pub mod step_5_prediction;
pub mod step_6_model_serialization;
pub mod step_7_epoch_selection;
pub mod step_8_evaluation;
