// External imports
use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

// Internal imports
use super::step_3_lstm_model_arch::{PriceLstm, PriceLstmConfig};
use crate::constants::CHECKPOINT_PREFIX;
use crate::error::{ForecastError, Result};

type Recorder = BinFileRecorder<FullPrecisionSettings>;

/// Written as `model_epoch_XX.meta.json` next to each checkpoint
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CheckpointMetadata {
    pub version: String,
    pub timestamp: u64,
    pub epoch: usize,
    pub model: PriceLstmConfig,
    pub train_loss: f64,
    pub val_loss: f64,
}

impl CheckpointMetadata {
    pub fn new(epoch: usize, model: PriceLstmConfig, train_loss: f64, val_loss: f64) -> Self {
        Self {
            version: crate::built_info::PKG_VERSION.to_string(),
            timestamp: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            epoch,
            model,
            train_loss,
            val_loss,
        }
    }
}

/// `model_epoch_07`, without extension
pub fn checkpoint_stem(epoch: usize) -> String {
    format!("{}{:02}", CHECKPOINT_PREFIX, epoch)
}

fn is_checkpoint_file(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(CHECKPOINT_PREFIX))
}

/// Write side of the checkpoint directory, alive only while training runs
///
/// Opening the writer purges every checkpoint a previous run left behind, so the
/// epoch selector can never pick up a stale artifact. Two runs must not share a
/// directory.
#[derive(Debug)]
pub struct CheckpointWriter {
    dir: PathBuf,
    epochs: Vec<usize>,
}

impl CheckpointWriter {
    /// Create `dir` if needed and remove any leftover checkpoints inside it
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut purged = 0usize;
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if is_checkpoint_file(&path) {
                fs::remove_file(&path)?;
                purged += 1;
            }
        }
        if purged > 0 {
            info!(
                "Purged {} stale checkpoint files from {}",
                purged,
                dir.display()
            );
        }

        Ok(Self {
            dir,
            epochs: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist the model state at the end of `epoch`
    pub fn record<B: Backend>(
        &mut self,
        model: &PriceLstm<B>,
        metadata: &CheckpointMetadata,
    ) -> Result<PathBuf> {
        let epoch = metadata.epoch;
        let base = self.dir.join(checkpoint_stem(epoch));

        let model_path = base.with_extension("bin");
        model
            .clone()
            .save_file::<Recorder, _>(&model_path, &Recorder::default())
            .map_err(|e| ForecastError::Checkpoint {
                epoch,
                reason: format!("{:?}", e),
            })?;

        let metadata_path = base.with_extension("meta.json");
        fs::write(&metadata_path, serde_json::to_string_pretty(metadata)?)?;

        debug!("Saved checkpoint {}", model_path.display());
        self.epochs.push(epoch);
        Ok(model_path)
    }

    /// Close the write side; the checkpoints become read-only
    pub fn finish(self) -> Checkpoints {
        Checkpoints {
            dir: self.dir,
            epochs: self.epochs,
        }
    }
}

/// Read-only view over the checkpoints one training run produced
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoints {
    dir: PathBuf,
    epochs: Vec<usize>,
}

impl Checkpoints {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Epoch indices, 1-based, in the order they were written
    pub fn epochs(&self) -> &[usize] {
        &self.epochs
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn contains(&self, epoch: usize) -> bool {
        self.epochs.contains(&epoch)
    }

    pub fn model_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(checkpoint_stem(epoch)).with_extension("bin")
    }

    pub fn metadata_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(checkpoint_stem(epoch)).with_extension("meta.json")
    }

    fn ensure_known(&self, epoch: usize) -> Result<()> {
        if self.contains(epoch) {
            Ok(())
        } else {
            Err(ForecastError::Checkpoint {
                epoch,
                reason: format!("no checkpoint was written in {}", self.dir.display()),
            })
        }
    }

    pub fn metadata(&self, epoch: usize) -> Result<CheckpointMetadata> {
        self.ensure_known(epoch)?;
        let metadata_json = fs::read_to_string(self.metadata_path(epoch))?;
        Ok(serde_json::from_str(&metadata_json)?)
    }

    /// Rebuild the model saved at `epoch`
    pub fn load<B: Backend>(
        &self,
        epoch: usize,
        config: &PriceLstmConfig,
        device: &B::Device,
    ) -> Result<PriceLstm<B>> {
        self.ensure_known(epoch)?;
        let model_path = self.model_path(epoch);
        info!("Loading checkpoint from: {}", model_path.display());

        config
            .init::<B>(device)
            .load_file::<Recorder, _>(&model_path, &Recorder::default(), device)
            .map_err(|e| ForecastError::Checkpoint {
                epoch,
                reason: format!("{:?}", e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lstm::step_1_tensor_preparation::window_to_tensor;
    use burn_ndarray::{NdArray, NdArrayDevice};
    use tempfile::tempdir;

    fn model_config() -> PriceLstmConfig {
        PriceLstmConfig::new(20, 50, 0.2)
    }

    #[test]
    fn test_stem_is_zero_padded() {
        assert_eq!(checkpoint_stem(1), "model_epoch_01");
        assert_eq!(checkpoint_stem(15), "model_epoch_15");
    }

    #[test]
    fn test_open_purges_only_checkpoints() -> Result<()> {
        let temp_dir = tempdir()?;
        fs::write(temp_dir.path().join("model_epoch_03.bin"), b"stale")?;
        fs::write(temp_dir.path().join("model_epoch_03.meta.json"), b"{}")?;
        fs::write(temp_dir.path().join("notes.txt"), b"keep me")?;

        let writer = CheckpointWriter::open(temp_dir.path())?;
        assert!(!temp_dir.path().join("model_epoch_03.bin").exists());
        assert!(!temp_dir.path().join("model_epoch_03.meta.json").exists());
        assert!(temp_dir.path().join("notes.txt").exists());
        assert!(writer.finish().is_empty());
        Ok(())
    }

    #[test]
    fn test_record_and_reload() -> Result<()> {
        let temp_dir = tempdir()?;
        let device = NdArrayDevice::Cpu;
        let config = model_config();
        let model: PriceLstm<NdArray> = config.init(&device);

        let mut writer = CheckpointWriter::open(temp_dir.path().join("run"))?;
        let metadata = CheckpointMetadata::new(1, config, 0.04, 0.09);
        let saved = writer.record(&model, &metadata)?;
        assert!(saved.exists());

        let checkpoints = writer.finish();
        assert_eq!(checkpoints.epochs(), &[1]);
        assert_eq!(checkpoints.metadata(1)?, metadata);

        let loaded: PriceLstm<NdArray> = checkpoints.load(1, &config, &device)?;
        let window: Vec<f64> = (0..20).map(|i| i as f64 / 20.0).collect();
        let expected = model
            .forward(window_to_tensor::<NdArray>(&window, &device))
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        let actual = loaded
            .forward(window_to_tensor::<NdArray>(&window, &device))
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        assert_eq!(expected, actual);
        Ok(())
    }

    #[test]
    fn test_metadata_losses_are_exact_after_reload() -> Result<()> {
        let temp_dir = tempdir()?;
        let device = NdArrayDevice::Cpu;
        let config = model_config();
        let model: PriceLstm<NdArray> = config.init(&device);

        // serde_json's default parser reads the first one back one ULP off
        let train_loss = 0.19163697957992554;
        let val_loss = 0.1 + 0.2;
        let metadata = CheckpointMetadata::new(2, config, train_loss, val_loss);

        let mut writer = CheckpointWriter::open(temp_dir.path())?;
        writer.record(&model, &metadata)?;
        let reloaded = writer.finish().metadata(2)?;

        assert_eq!(reloaded.train_loss.to_bits(), train_loss.to_bits());
        assert_eq!(reloaded.val_loss.to_bits(), val_loss.to_bits());
        Ok(())
    }

    #[test]
    fn test_unknown_epoch_is_an_error() -> Result<()> {
        let temp_dir = tempdir()?;
        let device = NdArrayDevice::Cpu;
        let checkpoints = CheckpointWriter::open(temp_dir.path())?.finish();

        let result = checkpoints.load::<NdArray>(4, &model_config(), &device);
        assert!(matches!(
            result,
            Err(ForecastError::Checkpoint { epoch: 4, .. })
        ));
        Ok(())
    }
}
