pub mod model;
pub mod reconstruct;
pub mod sets_and_parameters;

pub use model::{Route, RouteViolation, RoutingPlan, RoutingSolver, RoutingStatus};
pub use reconstruct::{Anomaly, AnomalyKind};
