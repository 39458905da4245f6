// External imports
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// Internal imports
use crate::error::{ForecastError, Result};
use crate::lstm::step_8_evaluation::ForecastResult;
use crate::util::pre_processor::PriceSeries;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSummary {
    pub horizon_days: usize,
    pub predicted_price: f64,
    pub current_price: f64,
    /// Percent, relative to `current_price`
    pub predicted_change_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPerformance {
    /// Percent
    pub mape: f64,
    pub optimal_epoch: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastTimeline {
    pub historical_days: usize,
    pub forecast_days: usize,
    pub total_days: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsHeadline {
    pub datetime: String,
    pub headline: String,
    pub sentiment: f64,
}

/// News sentiment gathered by the caller; the forecaster only passes it through
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SentimentSummary {
    pub average_sentiment: Option<f64>,
    #[serde(default)]
    pub news_headlines: Vec<NewsHeadline>,
}

impl SentimentSummary {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Serializable outcome of one forecasting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub ticker: String,
    pub date_range: DateRange,
    pub prediction: PredictionSummary,
    pub model_performance: ModelPerformance,
    pub forecast_timeline: ForecastTimeline,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<SentimentSummary>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl ForecastReport {
    /// Summarize a finished run over `series`
    ///
    /// The current price is the last historical target, the newest close a window
    /// predicted. Prices, the change and MAPE are rounded to cents / hundredths of a
    /// percent.
    pub fn from_run(
        ticker: &str,
        series: &PriceSeries,
        result: &ForecastResult,
        optimal_epoch: usize,
    ) -> Result<Self> {
        let (start, end) = series
            .first_date()
            .zip(series.last_date())
            .ok_or_else(|| ForecastError::InvalidInput("empty price series".to_string()))?;
        let current_price = result
            .history
            .last()
            .copied()
            .ok_or_else(|| ForecastError::InvalidInput("empty price history".to_string()))?;
        let predicted_price = result
            .final_forecast()
            .ok_or_else(|| ForecastError::InvalidInput("empty forecast".to_string()))?;
        if current_price == 0.0 {
            return Err(ForecastError::DegenerateInput {
                index: result.history.len() - 1,
            });
        }

        Ok(Self {
            ticker: ticker.to_uppercase(),
            date_range: DateRange { start, end },
            prediction: PredictionSummary {
                horizon_days: result.forecast.len(),
                predicted_price: round2(predicted_price),
                current_price: round2(current_price),
                predicted_change_pct: round2(
                    (predicted_price - current_price) / current_price * 100.0,
                ),
            },
            model_performance: ModelPerformance {
                mape: round2(result.mape),
                optimal_epoch,
            },
            forecast_timeline: ForecastTimeline {
                historical_days: result.history.len(),
                forecast_days: result.forecast.len(),
                total_days: result.model_forecast.len(),
            },
            sentiment: None,
        })
    }

    /// Attach caller-supplied sentiment
    pub fn with_sentiment(mut self, sentiment: SentimentSummary) -> Self {
        self.sentiment = Some(sentiment);
        self
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> ForecastResult {
        ForecastResult {
            history: vec![100.0, 101.0, 102.0],
            predicted_history: vec![99.0, 101.5, 102.5],
            forecast: vec![103.0, 104.0, 110.0],
            model_forecast: vec![99.0, 101.5, 102.5, 103.0, 104.0, 110.0],
            mape: 0.829_187,
        }
    }

    fn series() -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        PriceSeries::from_closes(start, &[98.0, 100.0, 101.0, 102.0, 100.0]).unwrap()
    }

    #[test]
    fn test_report_fields() {
        let report = ForecastReport::from_run("aapl", &series(), &result(), 7).unwrap();

        assert_eq!(report.ticker, "AAPL");
        assert_eq!(report.date_range.start.to_string(), "2024-03-01");
        assert_eq!(report.date_range.end.to_string(), "2024-03-05");
        // From the last historical target, not the series' final close of 100.0
        assert_eq!(report.prediction.current_price, 102.0);
        assert_eq!(report.prediction.predicted_price, 110.0);
        assert_eq!(report.prediction.predicted_change_pct, 7.84);
        assert_eq!(report.prediction.horizon_days, 3);
        assert_eq!(report.model_performance.mape, 0.83);
        assert_eq!(report.model_performance.optimal_epoch, 7);
        assert_eq!(report.forecast_timeline.historical_days, 3);
        assert_eq!(report.forecast_timeline.total_days, 6);
        assert!(report.sentiment.is_none());
    }

    #[test]
    fn test_zero_current_price_is_degenerate() {
        let mut zero_tail = result();
        zero_tail.history = vec![100.0, 101.0, 0.0];
        let report = ForecastReport::from_run("aapl", &series(), &zero_tail, 1);
        assert!(matches!(report, Err(ForecastError::DegenerateInput { index: 2 })));
    }

    #[test]
    fn test_json_omits_missing_sentiment() {
        let report = ForecastReport::from_run("msft", &series(), &result(), 1).unwrap();
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert!(json.get("sentiment").is_none());
        assert_eq!(json["prediction"]["predicted_price"], 110.0);
        assert_eq!(json["date_range"]["start"], "2024-03-01");
    }

    #[test]
    fn test_sentiment_is_merged_verbatim() {
        let sentiment: SentimentSummary = serde_json::from_str(
            r#"{
                "average_sentiment": 0.21,
                "news_headlines": [
                    {"datetime": "2024-03-05 09:30", "headline": "Shares rise", "sentiment": 0.42}
                ]
            }"#,
        )
        .unwrap();

        let report = ForecastReport::from_run("nvda", &series(), &result(), 1)
            .unwrap()
            .with_sentiment(sentiment.clone());
        assert_eq!(report.sentiment, Some(sentiment));

        let round_trip: ForecastReport = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(round_trip, report);
    }
}
