// External imports
use burn::tensor::backend::AutodiffBackend;
use burn_autodiff::Autodiff;
use burn_ndarray::NdArray;
use log::{info, warn};

// Internal imports
use crate::config::{ForecastConfig, LeakPolicy};
use crate::error::{ForecastError, Result};
use crate::lstm::step_1_tensor_preparation::{
    sliding_windows, split_chronological, split_index, LeakStatus, MinMaxScaler, ScalingPolicy,
    WindowSet,
};
use crate::lstm::step_3_lstm_model_arch::{PriceLstm, PriceLstmConfig};
use crate::lstm::step_4_train_model::{train_model, TrainingConfig, TrainingHistory};
use crate::lstm::step_5_prediction::{generate_forecast, predict_windows};
use crate::lstm::step_6_model_serialization::{CheckpointWriter, Checkpoints};
use crate::lstm::step_7_epoch_selection::{select_epoch, EpochScoring, EpochSelection};
use crate::lstm::step_8_evaluation::{build_report, ForecastResult};
use crate::report::ForecastReport;
use crate::util::pre_processor::PriceSeries;

/// CPU training backend
pub type DefaultBackend = Autodiff<NdArray<f32>>;

/// Everything one run produced
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub result: ForecastResult,
    pub selection: EpochSelection,
    pub history: TrainingHistory,
    pub leak: LeakStatus,
    pub scaler: MinMaxScaler,
    pub checkpoints: Checkpoints,
}

impl PipelineRun {
    pub fn optimal_epoch(&self) -> usize {
        self.selection.best_epoch
    }

    /// JSON-ready summary of this run over `series`
    pub fn report(&self, ticker: &str, series: &PriceSeries) -> Result<ForecastReport> {
        ForecastReport::from_run(ticker, series, &self.result, self.optimal_epoch())
    }
}

/// The newest `window_size` values, where the forecast starts
fn last_window(scaled: &[f64], window_size: usize) -> Result<&[f64]> {
    let start = scaled
        .len()
        .checked_sub(window_size)
        .ok_or(ForecastError::InsufficientHistory {
            required: window_size,
            actual: scaled.len(),
        })?;
    Ok(&scaled[start..])
}

/// Train, select and forecast for one price series
///
/// Strictly sequential. Each run purges and refills `config.checkpoint_dir`, so
/// concurrent runs need distinct directories (see `util::model_utils::get_run_dir`).
pub struct ForecastPipeline<B: AutodiffBackend> {
    config: ForecastConfig,
    device: B::Device,
    scaling: Box<dyn ScalingPolicy>,
    scoring: Box<dyn EpochScoring>,
}

impl<B: AutodiffBackend> ForecastPipeline<B> {
    pub fn new(config: ForecastConfig, device: B::Device) -> Result<Self> {
        config.validate()?;
        let scaling = config.scaling.policy();
        let scoring = config.scoring.strategy(config.alpha);
        Ok(Self {
            config,
            device,
            scaling,
            scoring,
        })
    }

    /// Swap the scaler fitting policy
    pub fn with_scaling(mut self, scaling: Box<dyn ScalingPolicy>) -> Self {
        self.scaling = scaling;
        self
    }

    /// Swap the epoch scoring formula
    pub fn with_scoring(mut self, scoring: Box<dyn EpochScoring>) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    fn check_partition(&self, status: LeakStatus) -> Result<()> {
        if let LeakStatus::Detected {
            total,
            train,
            validation,
        } = status
        {
            match self.config.leak_policy {
                LeakPolicy::Warn => warn!("Data leak detected: {}", status),
                LeakPolicy::Fail => {
                    return Err(ForecastError::DataLeakDetected {
                        total,
                        train,
                        validation,
                    })
                }
            }
        }
        Ok(())
    }

    fn windows(&self, partition: &[f64]) -> Result<WindowSet> {
        let set = sliding_windows(partition, self.config.window_size);
        if set.is_empty() {
            return Err(ForecastError::InsufficientHistory {
                required: self.config.window_size + 2,
                actual: partition.len(),
            });
        }
        Ok(set)
    }

    /// Run the full forecast for `series`
    pub fn run(&self, series: &PriceSeries) -> Result<PipelineRun> {
        let config = &self.config;
        series.ensure_min_history(config.min_history)?;

        let closes = series.closes();
        let total = closes.len();

        let scaler = self
            .scaling
            .fit(&closes, split_index(total, config.train_fraction))
            .ok_or_else(|| ForecastError::InvalidInput("nothing to fit the scaler on".into()))?;
        info!(
            "Fitted {} scaler on [{:.4}, {:.4}]",
            self.scaling.name(),
            scaler.min(),
            scaler.max()
        );
        let scaled = scaler.transform_all(&closes);

        let (train, validation) = split_chronological(&scaled, config.train_fraction);
        let leak = LeakStatus::check(total, train.len(), validation.len());
        self.check_partition(leak)?;
        info!(
            "Split {} observations into {} training and {} validation",
            total,
            train.len(),
            validation.len()
        );

        let train_set = self.windows(train)?;
        let val_set = self.windows(validation)?;

        let model_config = PriceLstmConfig::from(config);
        let writer = CheckpointWriter::open(&config.checkpoint_dir)?;
        let (history, checkpoints) = train_model::<B>(
            &train_set,
            &val_set,
            &model_config,
            &TrainingConfig::from(config),
            writer,
            &self.device,
        )?;

        let selection = select_epoch(&history, self.scoring.as_ref())?;
        let model: PriceLstm<B::InnerBackend> =
            checkpoints.load(selection.best_epoch, &model_config, &self.device)?;

        let train_predictions = predict_windows(&model, &train_set, &self.device)?;
        let val_predictions = predict_windows(&model, &val_set, &self.device)?;

        let forecast = generate_forecast(
            &model,
            last_window(&scaled, config.window_size)?,
            config.forecast_horizon,
            &self.device,
        )?;

        let result = build_report(
            &train_set.target_vec(),
            &val_set.target_vec(),
            &train_predictions,
            &val_predictions,
            &forecast,
            &scaler,
        )?;
        info!(
            "Forecast complete: MAPE {:.2}%, price in {} days {:.2}",
            result.mape,
            config.forecast_horizon,
            result.final_forecast().unwrap_or(f64::NAN)
        );

        Ok(PipelineRun {
            result,
            selection,
            history,
            leak,
            scaler,
            checkpoints,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringMode;
    use crate::lstm::step_1_tensor_preparation::FitOnTrainingPrefix;
    use burn_ndarray::NdArrayDevice;

    fn pipeline(leak_policy: LeakPolicy) -> ForecastPipeline<DefaultBackend> {
        let config = ForecastConfig {
            leak_policy,
            ..ForecastConfig::default()
        };
        ForecastPipeline::new(config, NdArrayDevice::Cpu).unwrap()
    }

    #[test]
    fn test_clean_partition_passes_both_policies() {
        assert!(pipeline(LeakPolicy::Warn).check_partition(LeakStatus::Clean).is_ok());
        assert!(pipeline(LeakPolicy::Fail).check_partition(LeakStatus::Clean).is_ok());
    }

    #[test]
    fn test_leak_policy_decides_outcome() {
        let leak = LeakStatus::check(200, 160, 41);

        assert!(pipeline(LeakPolicy::Warn).check_partition(leak).is_ok());
        assert!(matches!(
            pipeline(LeakPolicy::Fail).check_partition(leak),
            Err(ForecastError::DataLeakDetected {
                total: 200,
                train: 160,
                validation: 41
            })
        ));
    }

    #[test]
    fn test_strategies_follow_config_and_overrides() {
        let config = ForecastConfig {
            scoring: ScoringMode::Additive,
            ..ForecastConfig::default()
        };
        let pipeline = ForecastPipeline::<DefaultBackend>::new(config, NdArrayDevice::Cpu)
            .unwrap()
            .with_scaling(Box::new(FitOnTrainingPrefix));

        assert_eq!(pipeline.scoring.name(), "additive");
        assert_eq!(pipeline.scaling.name(), "training_prefix");
        assert_eq!(pipeline.config().scoring, ScoringMode::Additive);
    }

    #[test]
    fn test_window_set_too_short() {
        let pipeline = pipeline(LeakPolicy::Warn);
        let partition = vec![0.5; 21];
        assert!(matches!(
            pipeline.windows(&partition),
            Err(ForecastError::InsufficientHistory {
                required: 22,
                actual: 21
            })
        ));
        assert_eq!(pipeline.windows(&[0.5; 22]).unwrap().len(), 1);
    }

    #[test]
    fn test_last_window_needs_window_size_values() {
        let scaled = [0.1, 0.2, 0.3, 0.4];
        assert_eq!(last_window(&scaled, 3).unwrap(), &[0.2, 0.3, 0.4]);
        assert_eq!(last_window(&scaled, 4).unwrap(), &scaled);
        assert!(matches!(
            last_window(&scaled, 5),
            Err(ForecastError::InsufficientHistory {
                required: 5,
                actual: 4
            })
        ));
    }
}
