pub mod clip;
pub mod color;
pub mod config;
pub mod error;
pub mod export;
pub mod luma;
pub mod observability;
pub mod reporter;
pub mod scheduler;
pub mod stats;
pub mod validation;
pub mod video;

pub use clip::Clip;
pub use config::{AnalyzerConfig, ContentionPolicy, MAX_WORKERS};
pub use error::{Error, Result};
pub use luma::LumaMode;
pub use scheduler::{BatchScheduler, ClipScore, RunOutcome};
pub use stats::LumaAggregate;
