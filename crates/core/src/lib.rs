pub mod config;
pub mod error;
pub mod task;

pub use config::{SchedConfig, StatsFormat};
pub use error::*;
pub use task::*;
