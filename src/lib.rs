pub mod config;
pub mod constants;
pub mod error;
pub mod lstm;
pub mod pipeline;
pub mod report;
pub mod util {
    pub mod model_utils;
    pub mod pre_processor;
}

/// Build-time information generated by `built`
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub use config::ForecastConfig;
pub use error::{ForecastError, Result};
pub use pipeline::{DefaultBackend, ForecastPipeline, PipelineRun};
pub use report::ForecastReport;
