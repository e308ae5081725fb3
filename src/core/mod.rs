mod engine;
mod types;

pub use engine::{parse_percent, project, quick_estimate, true_yield};
pub use types::{MAX_YEARS, ProjectionError, QuickEstimate, SimulationInputs, YearlySnapshot};
