// External imports
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// Internal imports
use crate::constants;
use crate::error::{ForecastError, Result};

/// What to do when the train/validation partition does not add up to the series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeakPolicy {
    /// Log the leak and keep going
    #[default]
    Warn,
    /// Abort the run with `ForecastError::DataLeakDetected`
    Fail,
}

/// Which slice of the series the min-max scaler is fitted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMode {
    /// Fit on every observation before splitting
    #[default]
    FullSeries,
    /// Fit on the training prefix only
    TrainingPrefix,
}

/// Which blended-RMSE formula ranks the epochs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// `1 / (alpha * train + (1 - alpha) * val)`, highest wins
    #[default]
    Reciprocal,
    /// `alpha * train + (1 - alpha) * val`, lowest wins
    Additive,
}

/// Configuration for one forecasting run
///
/// Every field has a default, so a JSON file only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub window_size: usize,
    pub forecast_horizon: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub train_fraction: f64,
    pub alpha: f64,
    pub random_seed: u64,
    pub hidden_size: usize,
    pub dropout: f64,
    pub learning_rate: f64,
    pub min_history: usize,
    pub checkpoint_dir: PathBuf,
    pub leak_policy: LeakPolicy,
    pub scaling: ScalingMode,
    pub scoring: ScoringMode,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            window_size: constants::WINDOW_SIZE,
            forecast_horizon: constants::DAYS_AHEAD,
            epochs: constants::EPOCHS,
            batch_size: constants::BATCH_SIZE,
            train_fraction: constants::TRAIN_SPLIT_RATIO,
            alpha: constants::ALPHA,
            random_seed: constants::RANDOM_SEED,
            hidden_size: constants::HIDDEN_SIZE,
            dropout: constants::STD_DROPOUT_LAYER,
            learning_rate: constants::LEARNING_RATE,
            min_history: constants::MIN_HISTORY,
            checkpoint_dir: PathBuf::from(constants::CHECKPOINT_DIR),
            leak_policy: LeakPolicy::default(),
            scaling: ScalingMode::default(),
            scoring: ScoringMode::default(),
        }
    }
}

impl ForecastConfig {
    /// Load a configuration from a JSON file and validate it
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_json = fs::read_to_string(path.as_ref())?;
        let config: ForecastConfig = serde_json::from_str(&config_json)?;
        config.validate()?;
        info!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Save the configuration as pretty JSON
    pub fn save_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Point checkpoints at another directory
    pub fn with_checkpoint_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.checkpoint_dir = dir.into();
        self
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(ForecastError::InvalidConfig(msg));

        if self.window_size == 0 {
            return invalid("window_size must be positive".into());
        }
        if self.forecast_horizon == 0 {
            return invalid("forecast_horizon must be positive".into());
        }
        if self.epochs == 0 {
            return invalid("epochs must be positive".into());
        }
        if self.epochs > 99 {
            return invalid(format!(
                "epochs must fit a two-digit checkpoint index, got {}",
                self.epochs
            ));
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be positive".into());
        }
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return invalid(format!(
                "train_fraction must be inside (0, 1), got {}",
                self.train_fraction
            ));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return invalid(format!("alpha must be inside [0, 1], got {}", self.alpha));
        }
        if self.hidden_size == 0 {
            return invalid("hidden_size must be positive".into());
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return invalid(format!("dropout must be inside [0, 1), got {}", self.dropout));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return invalid(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }
        if self.min_history <= self.window_size + 1 {
            return invalid(format!(
                "min_history ({}) must exceed window_size + 1 ({})",
                self.min_history,
                self.window_size + 1
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_reference_run() {
        let config = ForecastConfig::default();
        assert_eq!(config.window_size, 20);
        assert_eq!(config.forecast_horizon, 20);
        assert_eq!(config.epochs, 15);
        assert_eq!(config.batch_size, 64);
        assert!((config.train_fraction - 0.80).abs() < f64::EPSILON);
        assert!((config.alpha - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.random_seed, 12);
        assert_eq!(config.leak_policy, LeakPolicy::Warn);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() -> Result<()> {
        let temp_dir = tempdir()?;
        let path = temp_dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "epochs": 3, "leak_policy": "fail", "scoring": "additive" }"#,
        )?;

        let config = ForecastConfig::from_json_file(&path)?;
        assert_eq!(config.epochs, 3);
        assert_eq!(config.leak_policy, LeakPolicy::Fail);
        assert_eq!(config.scoring, ScoringMode::Additive);
        assert_eq!(config.window_size, constants::WINDOW_SIZE);
        assert_eq!(config.scaling, ScalingMode::FullSeries);
        Ok(())
    }

    #[test]
    fn test_save_and_reload() -> Result<()> {
        let temp_dir = tempdir()?;
        let path = temp_dir.path().join("nested").join("config.json");
        let config = ForecastConfig {
            batch_size: 16,
            ..ForecastConfig::default()
        }
        .with_checkpoint_dir(temp_dir.path().join("ckpt"));

        config.save_json_file(&path)?;
        let reloaded = ForecastConfig::from_json_file(&path)?;
        assert_eq!(reloaded, config);
        Ok(())
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let bad = [
            ForecastConfig { window_size: 0, ..Default::default() },
            ForecastConfig { epochs: 0, ..Default::default() },
            ForecastConfig { epochs: 100, ..Default::default() },
            ForecastConfig { train_fraction: 1.0, ..Default::default() },
            ForecastConfig { alpha: 1.5, ..Default::default() },
            ForecastConfig { dropout: 1.0, ..Default::default() },
            ForecastConfig { learning_rate: 0.0, ..Default::default() },
            ForecastConfig { min_history: 10, ..Default::default() },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(ForecastError::InvalidConfig(_))),
                "expected rejection for {:?}",
                config
            );
        }
    }
}
