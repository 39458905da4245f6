// External crates
use anyhow::{bail, Context, Result};
use log::info;
use std::env;

// Local modules
use stock_forecaster::pipeline::{DefaultBackend, ForecastPipeline};
use stock_forecaster::report::SentimentSummary;
use stock_forecaster::util::{model_utils, pre_processor};
use stock_forecaster::ForecastConfig;

const USAGE: &str = "Usage: stock_forecaster <TICKER> <CSV> [CONFIG_JSON] [SENTIMENT_JSON]";

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    // Accept ticker, price file and optional config / sentiment files as arguments
    let args: Vec<String> = env::args().collect();
    let (ticker, csv_path) = match (args.get(1), args.get(2)) {
        (Some(ticker), Some(csv_path)) => (ticker.to_uppercase(), csv_path),
        _ => bail!(USAGE),
    };
    let config_path = args.get(3).filter(|path| !path.is_empty());
    let sentiment_path = args.get(4);
    info!("Using ticker: {} | prices: {}", ticker, csv_path);

    let config = match config_path {
        Some(path) => ForecastConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => ForecastConfig::default(),
    };
    let config = model_utils::namespaced_config(config, &ticker);
    info!("Checkpoints go to {}", config.checkpoint_dir.display());

    let series = pre_processor::load_price_series(csv_path)
        .with_context(|| format!("Failed to load prices from {}", csv_path))?;

    let device = Default::default();
    let pipeline = ForecastPipeline::<DefaultBackend>::new(config, device)?;
    let run = pipeline.run(&series).context("Forecast run failed")?;

    info!("Epoch scores:\n{}", run.selection.to_frame()?);

    let mut report = run.report(&ticker, &series)?;
    if let Some(path) = sentiment_path {
        let sentiment = SentimentSummary::from_json_file(path)
            .with_context(|| format!("Failed to load sentiment from {}", path))?;
        report = report.with_sentiment(sentiment);
    }

    println!("{}", report.to_json()?);
    Ok(())
}
