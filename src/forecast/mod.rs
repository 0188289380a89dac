pub mod format;
pub mod handlers;
pub mod models;
mod pipeline;
mod state;

pub use pipeline::ForecastPipeline;
pub use state::{ForecastController, ForecastError, Phase};
