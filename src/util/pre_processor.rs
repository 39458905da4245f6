// External crates
use chrono::NaiveDate;
use log::{info, warn};
use polars::prelude::*;
use std::path::Path;

// Local modules
use crate::error::{ForecastError, Result};

/// One daily observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Chronological daily closes for a single symbol
///
/// Dates are strictly increasing and every close is finite. Gaps (weekends,
/// holidays) are allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series, rejecting out-of-order dates and non-finite closes
    pub fn new(points: Vec<PricePoint>) -> Result<Self> {
        for (i, point) in points.iter().enumerate() {
            if !point.close.is_finite() {
                return Err(ForecastError::InvalidInput(format!(
                    "close on {} is not finite",
                    point.date
                )));
            }
            if i > 0 && points[i - 1].date >= point.date {
                return Err(ForecastError::InvalidInput(format!(
                    "dates must be strictly increasing: {} is followed by {}",
                    points[i - 1].date, point.date
                )));
            }
        }
        Ok(Self { points })
    }

    /// Build a series of consecutive calendar days starting at `start`
    pub fn from_closes(start: NaiveDate, closes: &[f64]) -> Result<Self> {
        let points = closes
            .iter()
            .zip(start.iter_days())
            .map(|(&close, date)| PricePoint { date, close })
            .collect();
        Self::new(points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    pub fn last_close(&self) -> Option<f64> {
        self.points.last().map(|p| p.close)
    }

    /// Fail fast when there is not enough history to train on
    pub fn ensure_min_history(&self, required: usize) -> Result<()> {
        if self.len() < required {
            return Err(ForecastError::InsufficientHistory {
                required,
                actual: self.len(),
            });
        }
        Ok(())
    }
}

/// Map a raw column name onto the two columns the forecaster needs
fn standard_column(column_name: &str) -> Option<&'static str> {
    match column_name.trim().to_lowercase().as_str() {
        "date" | "time" | "timestamp" | "datetime" | "dt" | "day" | "t" => Some("date"),
        "close" | "c" | "cl" | "closeprice" | "close_price" => Some("close"),
        "adj close" | "adj_close" | "adjusted close" | "adjusted_close" | "adjclose" => {
            Some("adjusted_close")
        }
        _ => None,
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    // Datetime columns render as "YYYY-MM-DD HH:MM:SS..."; the day is all we keep
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Extract a `PriceSeries` from a DataFrame holding a date and a close column
///
/// Column names are matched case-insensitively. A plain close column wins over an
/// adjusted close. Rows with a missing date or close are dropped, and the rest are
/// sorted ascending by date.
pub fn price_series_from_frame(df: &DataFrame) -> Result<PriceSeries> {
    let mut date_column = None;
    let mut close_column = None;
    let mut adjusted_column = None;

    for column_name in df.get_column_names() {
        match standard_column(column_name.as_str()) {
            Some("date") if date_column.is_none() => date_column = Some(column_name.to_string()),
            Some("close") if close_column.is_none() => close_column = Some(column_name.to_string()),
            Some("adjusted_close") if adjusted_column.is_none() => {
                adjusted_column = Some(column_name.to_string())
            }
            _ => {}
        }
    }

    let date_column = date_column.ok_or_else(|| {
        ForecastError::InvalidInput(format!(
            "no date column among {:?}",
            df.get_column_names()
        ))
    })?;
    let close_column = close_column.or(adjusted_column).ok_or_else(|| {
        ForecastError::InvalidInput(format!(
            "no close column among {:?}",
            df.get_column_names()
        ))
    })?;

    let dates = df.column(&date_column)?.cast(&DataType::String)?;
    let closes = df.column(&close_column)?.cast(&DataType::Float64)?;

    let mut points = Vec::with_capacity(df.height());
    let mut dropped = 0usize;
    for (raw_date, close) in dates.str()?.into_iter().zip(closes.f64()?.into_iter()) {
        match (raw_date, close) {
            (Some(raw_date), Some(close)) => {
                let date = parse_date(raw_date).ok_or_else(|| {
                    ForecastError::InvalidInput(format!("unparseable date '{}'", raw_date))
                })?;
                points.push(PricePoint { date, close });
            }
            _ => dropped += 1,
        }
    }
    if dropped > 0 {
        warn!("Dropped {} rows with a missing date or close", dropped);
    }

    // Such that the newest observation is last
    points.sort_by_key(|p| p.date);
    PriceSeries::new(points)
}

/// Load a CSV file of daily bars into a `PriceSeries`
pub fn load_price_series<P: AsRef<Path>>(path: P) -> Result<PriceSeries> {
    let path = path.as_ref();
    info!("Loading price history from: {}", path.display());

    if !path.exists() {
        return Err(ForecastError::InvalidInput(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let file = std::fs::File::open(path)?;
    let df = CsvReader::new(file).finish()?;
    let series = price_series_from_frame(&df)?;

    info!(
        "Loaded {} closes ({:?} to {:?})",
        series.len(),
        series.first_date(),
        series.last_date()
    );
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_series_rejects_unordered_dates() {
        let points = vec![
            PricePoint { date: day("2024-01-03"), close: 10.0 },
            PricePoint { date: day("2024-01-02"), close: 11.0 },
        ];
        assert!(matches!(
            PriceSeries::new(points),
            Err(ForecastError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_series_rejects_non_finite_close() {
        let result = PriceSeries::from_closes(day("2024-01-01"), &[1.0, f64::NAN]);
        assert!(result.is_err());
    }

    #[test]
    fn test_min_history_check() {
        let closes: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
        let series = PriceSeries::from_closes(day("2024-01-01"), &closes).unwrap();
        match series.ensure_min_history(125) {
            Err(ForecastError::InsufficientHistory { required, actual }) => {
                assert_eq!(required, 125);
                assert_eq!(actual, 50);
            }
            other => panic!("expected InsufficientHistory, got {:?}", other),
        }
        assert!(series.ensure_min_history(50).is_ok());
    }

    #[test]
    fn test_frame_with_capitalized_columns_is_sorted() {
        let df = DataFrame::new(vec![
            Series::new("Date".into(), &["2024-01-03", "2024-01-01", "2024-01-02"]).into(),
            Series::new("Open".into(), &[1.0, 2.0, 3.0]).into(),
            Series::new("Close".into(), &[30.0, 10.0, 20.0]).into(),
        ])
        .unwrap();

        let series = price_series_from_frame(&df).unwrap();
        assert_eq!(series.closes(), vec![10.0, 20.0, 30.0]);
        assert_eq!(series.first_date(), Some(day("2024-01-01")));
        assert_eq!(series.last_close(), Some(30.0));
    }

    #[test]
    fn test_frame_falls_back_to_adjusted_close() {
        let df = DataFrame::new(vec![
            Series::new("timestamp".into(), &["2024-01-01 00:00:00", "2024-01-02 00:00:00"])
                .into(),
            Series::new("Adj Close".into(), &[5.0, 6.0]).into(),
        ])
        .unwrap();

        let series = price_series_from_frame(&df).unwrap();
        assert_eq!(series.closes(), vec![5.0, 6.0]);
    }

    #[test]
    fn test_frame_without_close_fails() {
        let df = DataFrame::new(vec![
            Series::new("date".into(), &["2024-01-01"]).into(),
            Series::new("volume".into(), &[5.0]).into(),
        ])
        .unwrap();
        assert!(price_series_from_frame(&df).is_err());
    }

    #[test]
    fn test_load_price_series_from_csv() -> Result<()> {
        let temp_dir = tempdir()?;
        let path = temp_dir.path().join("AAPL_daily.csv");
        let mut file = std::fs::File::create(&path)?;
        writeln!(file, "date,open,high,low,close,volume")?;
        writeln!(file, "2024-01-02,1,2,0.5,187.15,1000")?;
        writeln!(file, "2024-01-03,1,2,0.5,184.25,1000")?;
        writeln!(file, "2024-01-04,1,2,0.5,181.91,1000")?;
        drop(file);

        let series = load_price_series(&path)?;
        assert_eq!(series.len(), 3);
        assert_eq!(series.last_date(), Some(day("2024-01-04")));
        assert!((series.last_close().unwrap() - 181.91).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_price_series("non_existent_file.csv");
        match result {
            Err(e) => assert!(e.to_string().contains("not found")),
            Ok(_) => panic!("Should fail with non-existent file"),
        }
    }
}
