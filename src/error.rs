use derive_more::Display;

use crate::models::routing::Anomaly;

#[derive(Debug, Display)]
pub enum Error {
    /// A required parameter or key is missing or malformed. Raised before any solve.
    #[display(fmt = "inconsistent scenario data: {}", _0)]
    DataInconsistency(String),
    /// The MILP backend could not be instantiated
    #[display(fmt = "solver unavailable: {}", _0)]
    SolverUnavailable(String),
    /// The model is well-formed, but has no feasible point
    #[display(fmt = "model is infeasible")]
    Infeasible,
    /// The solver terminated with a status that is neither optimal, feasible nor infeasible
    #[display(fmt = "solve was inconclusive (status {})", _0)]
    SolveInconclusive(String),
    /// The configured wall-clock budget was exhausted before the solve concluded
    #[display(fmt = "solve exceeded its time limit")]
    TimeLimit,
    /// Following the selected arcs did not lead back to the depot for at least one vehicle
    #[display(fmt = "route reconstruction failed for {} vehicle(s)", "_0.len()")]
    ReconstructionAnomaly(Vec<Anomaly>),
    /// An error reported by the backend while building or querying a model
    #[display(fmt = "solver error: {}", _0)]
    Solver(grb::Error),
    #[display(fmt = "i/o error: {}", _0)]
    Io(std::io::Error),
    #[display(fmt = "malformed scenario file: {}", _0)]
    Parse(serde_json::Error),
}

impl std::error::Error for Error {}

impl From<grb::Error> for Error {
    fn from(error: grb::Error) -> Self {
        Error::Solver(error)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Io(error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Parse(error)
    }
}

impl Error {
    /// Whether the error must abort the entire run, rather than just the day it occurred on.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::DataInconsistency(_) | Error::SolverUnavailable(_) | Error::Io(_) | Error::Parse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
