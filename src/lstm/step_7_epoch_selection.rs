// External imports
use log::info;
use polars::prelude::*;

// Internal imports
use super::step_4_train_model::TrainingHistory;
use crate::config::ScoringMode;
use crate::error::{ForecastError, Result};

/// Error blend of one epoch's checkpoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochScore {
    pub epoch: usize,
    pub train_rmse: f64,
    pub val_rmse: f64,
    pub score: f64,
}

/// Turns a pair of RMSEs into a single ranking value
pub trait EpochScoring {
    fn name(&self) -> &'static str;

    fn score(&self, train_rmse: f64, val_rmse: f64) -> f64;

    /// Strictly better, so an equal score never displaces an earlier epoch
    fn is_better(&self, candidate: f64, incumbent: f64) -> bool;
}

/// `1 / (alpha * train + (1 - alpha) * val)`, highest wins
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReciprocalBlend {
    pub alpha: f64,
}

impl EpochScoring for ReciprocalBlend {
    fn name(&self) -> &'static str {
        "reciprocal"
    }

    fn score(&self, train_rmse: f64, val_rmse: f64) -> f64 {
        // A perfect fit divides by zero and scores +inf, which still ranks first
        1.0 / (self.alpha * train_rmse + (1.0 - self.alpha) * val_rmse)
    }

    fn is_better(&self, candidate: f64, incumbent: f64) -> bool {
        candidate > incumbent
    }
}

/// `alpha * train + (1 - alpha) * val`, lowest wins
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdditiveBlend {
    pub alpha: f64,
}

impl EpochScoring for AdditiveBlend {
    fn name(&self) -> &'static str {
        "additive"
    }

    fn score(&self, train_rmse: f64, val_rmse: f64) -> f64 {
        self.alpha * train_rmse + (1.0 - self.alpha) * val_rmse
    }

    fn is_better(&self, candidate: f64, incumbent: f64) -> bool {
        candidate < incumbent
    }
}

impl ScoringMode {
    pub fn strategy(self, alpha: f64) -> Box<dyn EpochScoring> {
        match self {
            ScoringMode::Reciprocal => Box::new(ReciprocalBlend { alpha }),
            ScoringMode::Additive => Box::new(AdditiveBlend { alpha }),
        }
    }
}

/// Every epoch's score plus the winner
#[derive(Debug, Clone, PartialEq)]
pub struct EpochSelection {
    pub scores: Vec<EpochScore>,
    pub best_epoch: usize,
}

impl EpochSelection {
    pub fn best(&self) -> Option<&EpochScore> {
        self.scores.iter().find(|s| s.epoch == self.best_epoch)
    }

    /// Score table with columns `epoch | training RMSE | validation RMSE | score`
    pub fn to_frame(&self) -> Result<DataFrame> {
        let epochs: Vec<u32> = self.scores.iter().map(|s| s.epoch as u32).collect();
        let train: Vec<f64> = self.scores.iter().map(|s| s.train_rmse).collect();
        let val: Vec<f64> = self.scores.iter().map(|s| s.val_rmse).collect();
        let score: Vec<f64> = self.scores.iter().map(|s| s.score).collect();

        Ok(DataFrame::new(vec![
            Series::new("epoch".into(), epochs).into(),
            Series::new("training RMSE".into(), train).into(),
            Series::new("validation RMSE".into(), val).into(),
            Series::new("score".into(), score).into(),
        ])?)
    }
}

/// Score epochs `1..=n` from per-epoch RMSEs and pick the best
///
/// The first epoch holding the best score wins ties. A NaN score never wins.
pub fn score_epochs(
    train_rmse: &[f64],
    val_rmse: &[f64],
    scoring: &dyn EpochScoring,
) -> Result<EpochSelection> {
    if train_rmse.len() != val_rmse.len() {
        return Err(ForecastError::InvalidInput(format!(
            "{} training RMSEs but {} validation RMSEs",
            train_rmse.len(),
            val_rmse.len()
        )));
    }
    if train_rmse.is_empty() {
        return Err(ForecastError::InvalidInput(
            "no epochs to select from".to_string(),
        ));
    }

    let scores: Vec<EpochScore> = train_rmse
        .iter()
        .zip(val_rmse)
        .enumerate()
        .map(|(i, (&train_rmse, &val_rmse))| EpochScore {
            epoch: i + 1,
            train_rmse,
            val_rmse,
            score: scoring.score(train_rmse, val_rmse),
        })
        .collect();

    let mut best: Option<&EpochScore> = None;
    for candidate in &scores {
        if candidate.score.is_nan() {
            continue;
        }
        match best {
            Some(incumbent) if !scoring.is_better(candidate.score, incumbent.score) => {}
            _ => best = Some(candidate),
        }
    }
    let best_epoch = best.map(|s| s.epoch).ok_or_else(|| {
        ForecastError::InvalidInput("every epoch scored NaN".to_string())
    })?;

    Ok(EpochSelection { scores, best_epoch })
}

/// Pick the checkpoint to forecast with from a finished training run
pub fn select_epoch(history: &TrainingHistory, scoring: &dyn EpochScoring) -> Result<EpochSelection> {
    let selection = score_epochs(&history.train_rmse(), &history.val_rmse(), scoring)?;
    if let Some(best) = selection.best() {
        info!(
            "Optimal epoch {} ({} score {:.6}, train RMSE {:.6}, validation RMSE {:.6})",
            best.epoch,
            scoring.name(),
            best.score,
            best.train_rmse,
            best.val_rmse
        );
    }
    Ok(selection)
}
