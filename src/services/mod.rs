pub mod allocation;
pub mod database;
pub mod metrics;
pub mod sequence;
pub mod settlement;

pub use database::Database;
pub use metrics::{get_metrics, init_metrics};
