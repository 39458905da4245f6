// External imports
use burn::tensor::{backend::Backend, Tensor, TensorData};
use log::{debug, warn};
use ndarray::{s, Array1, Array2};
use std::fmt;

// Internal imports
use crate::config::ScalingMode;

/// Min-max transform onto [0, 1]
///
/// A constant series has no range to divide by, so it is scaled with a unit range
/// instead and every value maps to 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxScaler {
    min: f64,
    max: f64,
}

impl MinMaxScaler {
    /// Fit on the given values. Returns `None` for an empty slice.
    pub fn fit(values: &[f64]) -> Option<Self> {
        let first = *values.first()?;
        let (min, max) = values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        Some(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    fn range(&self) -> f64 {
        let range = self.max - self.min;
        if range.abs() < f64::EPSILON {
            1.0
        } else {
            range
        }
    }

    pub fn transform(&self, value: f64) -> f64 {
        (value - self.min) / self.range()
    }

    pub fn inverse(&self, scaled: f64) -> f64 {
        scaled * self.range() + self.min
    }

    pub fn transform_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.transform(v)).collect()
    }

    pub fn inverse_all(&self, scaled: &[f64]) -> Vec<f64> {
        scaled.iter().map(|&v| self.inverse(v)).collect()
    }
}

/// Decides which observations the scaler is allowed to see
pub trait ScalingPolicy {
    fn name(&self) -> &'static str;

    /// Fit a scaler for `closes`, whose first `train_len` values form the training
    /// partition. Returns `None` when there is nothing to fit on.
    fn fit(&self, closes: &[f64], train_len: usize) -> Option<MinMaxScaler>;
}

/// Fits on the whole series before it is split.
///
/// The validation range leaks into the scaling of the training data; this is the
/// reference behavior and scores are compared against it.
#[derive(Debug, Clone, Copy, Default)]
pub struct FitOnFullSeries;

impl ScalingPolicy for FitOnFullSeries {
    fn name(&self) -> &'static str {
        "full_series"
    }

    fn fit(&self, closes: &[f64], _train_len: usize) -> Option<MinMaxScaler> {
        MinMaxScaler::fit(closes)
    }
}

/// Fits on the training prefix only, so validation values may scale outside [0, 1]
#[derive(Debug, Clone, Copy, Default)]
pub struct FitOnTrainingPrefix;

impl ScalingPolicy for FitOnTrainingPrefix {
    fn name(&self) -> &'static str {
        "training_prefix"
    }

    fn fit(&self, closes: &[f64], train_len: usize) -> Option<MinMaxScaler> {
        MinMaxScaler::fit(&closes[..train_len.min(closes.len())])
    }
}

impl ScalingMode {
    pub fn policy(self) -> Box<dyn ScalingPolicy> {
        match self {
            ScalingMode::FullSeries => Box::new(FitOnFullSeries),
            ScalingMode::TrainingPrefix => Box::new(FitOnTrainingPrefix),
        }
    }
}

/// Sliding windows over a scaled series with their one-step-ahead targets
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSet {
    windows: Array2<f64>,
    targets: Array1<f64>,
}

impl WindowSet {
    /// Number of windows
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.windows.ncols()
    }

    pub fn windows(&self) -> &Array2<f64> {
        &self.windows
    }

    pub fn targets(&self) -> &Array1<f64> {
        &self.targets
    }

    /// Targets as a plain vector, in window order
    pub fn target_vec(&self) -> Vec<f64> {
        self.targets.to_vec()
    }
}

/// Slice `series` into overlapping windows of `window_size` values.
///
/// Produces `n - 1 - window_size` windows, one fewer than every possible window: the
/// final observation is never used as a target. Epoch scores are calibrated against
/// exactly this count, so the boundary stays. Window `i` is
/// `series[i..i + window_size]` and its target is `series[i + window_size]`.
pub fn sliding_windows(series: &[f64], window_size: usize) -> WindowSet {
    let count = series.len().saturating_sub(1).saturating_sub(window_size);
    let series = Array1::from(series.to_vec());

    let mut windows = Array2::<f64>::zeros((count, window_size));
    let mut targets = Array1::<f64>::zeros(count);
    for i in 0..count {
        windows
            .row_mut(i)
            .assign(&series.slice(s![i..i + window_size]));
        targets[i] = series[i + window_size];
    }

    debug!(
        "Built {} windows of size {} from {} values",
        count,
        window_size,
        series.len()
    );
    WindowSet { windows, targets }
}

/// Index where the validation partition starts: `floor(train_fraction * len)`
pub fn split_index(len: usize, train_fraction: f64) -> usize {
    ((len as f64 * train_fraction).floor() as usize).min(len)
}

/// Chronological train/validation split. No shuffling.
pub fn split_chronological(series: &[f64], train_fraction: f64) -> (&[f64], &[f64]) {
    series.split_at(split_index(series.len(), train_fraction))
}

/// Outcome of checking that a partition neither lost nor duplicated observations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeakStatus {
    Clean,
    Detected {
        total: usize,
        train: usize,
        validation: usize,
    },
}

impl LeakStatus {
    pub fn check(total: usize, train: usize, validation: usize) -> Self {
        if data_leak_occurred(total, train, validation) {
            LeakStatus::Detected {
                total,
                train,
                validation,
            }
        } else {
            LeakStatus::Clean
        }
    }

    pub fn is_leak(&self) -> bool {
        matches!(self, LeakStatus::Detected { .. })
    }
}

impl fmt::Display for LeakStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeakStatus::Clean => write!(f, "training and validation partitions are clean"),
            LeakStatus::Detected {
                total,
                train,
                validation,
            } => write!(
                f,
                "{} observations split into {} + {}",
                total, train, validation
            ),
        }
    }
}

/// True when `train + validation` does not add back up to `total`
pub fn data_leak_occurred(total: usize, train: usize, validation: usize) -> bool {
    total != train + validation
}

/// Convert a window set into model tensors
///
/// Each window becomes a single time step of `window_size` features:
/// features are `[n, 1, window_size]`, targets `[n, 1]`.
pub fn window_set_to_tensors<B: Backend>(
    set: &WindowSet,
    device: &B::Device,
) -> (Tensor<B, 3>, Tensor<B, 2>) {
    let n = set.len();
    let w = set.window_size();
    if n == 0 {
        warn!("Converting an empty window set to tensors");
    }

    let x_data: Vec<f32> = set.windows.iter().map(|&v| v as f32).collect();
    let y_data: Vec<f32> = set.targets.iter().map(|&v| v as f32).collect();

    let features = Tensor::<B, 3>::from_data(TensorData::new(x_data, [n, 1, w]), device);
    let targets = Tensor::<B, 2>::from_data(TensorData::new(y_data, [n, 1]), device);
    (features, targets)
}

/// A single window as a `[1, 1, window_size]` tensor
pub fn window_to_tensor<B: Backend>(window: &[f64], device: &B::Device) -> Tensor<B, 3> {
    let data: Vec<f32> = window.iter().map(|&v| v as f32).collect();
    Tensor::<B, 3>::from_data(TensorData::new(data, [1, 1, window.len()]), device)
}
