pub mod error;
pub mod provider;
pub mod utilization;

pub use error::{CoreError, Result};
pub use provider::{Clinician, Provider, population_from_json};
pub use utilization::{Metric, Utilization, UtilizationTotals};
