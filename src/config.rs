use clap::ArgEnum;
use derive_more::Display;
use serde::Serialize;

/// The objective used by the supply planning model. Exactly one of them is built per solve.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, ArgEnum, Serialize)]
pub enum Objective {
    /// Minimize procurement and planting cost, with the budget as a hard cap
    #[display(fmt = "cost")]
    Cost,
    /// Minimize the weighted deviations from the budget, waste and stock goals
    #[display(fmt = "goal")]
    Goal,
}

impl Default for Objective {
    fn default() -> Self {
        Objective::Cost
    }
}

/// Settings shared by every solve of a run.
#[derive(Debug, Clone, Default)]
pub struct SolverConfig {
    /// Wall-clock budget per solve call, in seconds
    pub time_limit: Option<f64>,
    /// The objective of the supply planning model
    pub objective: Objective,
    /// Whether the daily routing models are solved concurrently
    pub parallel: bool,
    /// Whether the solver is allowed to log to the console
    pub solver_output: bool,
}
