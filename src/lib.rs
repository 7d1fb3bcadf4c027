pub mod config;
pub mod demand;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod parse;
pub mod problem;
pub mod report;

pub use config::{Objective, SolverConfig};
pub use error::{Error, Result};
pub use orchestrator::{run, DayOutcome, Outcome};
pub use problem::Problem;
pub use report::Report;
