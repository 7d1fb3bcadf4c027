use std::collections::BTreeMap;

use log::{error, info, warn};

use crate::{
    config::SolverConfig,
    demand::DailyDemand,
    error::{Error, Result},
    models::{
        routing::{RoutingPlan, RoutingSolver},
        supply::{SupplyPlan, SupplySolver},
    },
    problem::{Day, Problem},
};

/// The result of routing a single day
#[derive(Debug)]
pub enum DayOutcome {
    Planned(RoutingPlan),
    /// The day could not be routed. Other days are unaffected.
    Failed(Error),
}

impl DayOutcome {
    pub fn plan(&self) -> Option<&RoutingPlan> {
        match self {
            DayOutcome::Planned(plan) => Some(plan),
            DayOutcome::Failed(_) => None,
        }
    }
}

/// The outcome of a complete planning run
#[derive(Debug)]
pub struct Outcome {
    pub supply: SupplyPlan,
    /// The demand that was routed on each day of the horizon
    pub demand: BTreeMap<Day, DailyDemand>,
    pub days: BTreeMap<Day, DayOutcome>,
}

impl Outcome {
    /// The number of days that could not be routed
    pub fn failures(&self) -> usize {
        self.days
            .values()
            .filter(|d| matches!(d, DayOutcome::Failed(_)))
            .count()
    }
}

/// Solves the supply plan once, and then routes every day of the horizon against its plantings.
///
/// A failure in the supply phase aborts the run. A failure while routing a day is recorded for that
/// day only, unless it prevents any further solve.
pub fn run(problem: &Problem, config: &SolverConfig) -> Result<Outcome> {
    info!(
        "Planning {} plots over {} days with the {} objective",
        problem.plots().len(),
        problem.operations().horizon,
        config.objective
    );

    let supply = SupplySolver::solve(problem, config)?;
    let demands = DailyDemand::horizon(&supply, problem.days());

    let results: Vec<(Day, Result<RoutingPlan>)> = match config.parallel {
        true => std::thread::scope(|s| {
            let handles: Vec<_> = demands
                .iter()
                .map(|demand| s.spawn(move || (demand.day, route(problem, demand, config))))
                .collect();

            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        }),
        false => {
            let mut results = Vec::with_capacity(demands.len());
            for demand in &demands {
                let result = route(problem, demand, config);
                let fatal = matches!(&result, Err(e) if e.is_fatal());
                results.push((demand.day, result));
                if fatal {
                    break;
                }
            }
            results
        }
    };

    let days = collect(results)?;

    let outcome = Outcome {
        supply,
        demand: demands.into_iter().map(|d| (d.day, d)).collect(),
        days,
    };

    info!(
        "Planning finished: {} day(s) routed, {} failed",
        outcome.days.len() - outcome.failures(),
        outcome.failures()
    );

    Ok(outcome)
}

/// Records the routing result of every day. A fatal error aborts the run, any other error only fails
/// the day it occurred on.
fn collect(results: Vec<(Day, Result<RoutingPlan>)>) -> Result<BTreeMap<Day, DayOutcome>> {
    let mut days = BTreeMap::new();
    for (day, result) in results {
        match result {
            Ok(plan) => {
                days.insert(day, DayOutcome::Planned(plan));
            }
            Err(e) if e.is_fatal() => {
                error!("Day {}: {}", day, e);
                return Err(e);
            }
            Err(e) => {
                warn!("Day {}: routing failed: {}", day, e);
                days.insert(day, DayOutcome::Failed(e));
            }
        }
    }
    Ok(days)
}

/// Routes a single day and checks the resulting routes
fn route(problem: &Problem, demand: &DailyDemand, config: &SolverConfig) -> Result<RoutingPlan> {
    let plan = RoutingSolver::solve(problem, demand, config)?;
    for violation in plan.check(problem, demand) {
        warn!("Day {}: {}", demand.day, violation);
    }
    Ok(plan)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn planned(day: usize) -> (Day, Result<RoutingPlan>) {
        (Day::from(day), Ok(RoutingPlan::no_demand(Day::from(day))))
    }

    #[test]
    fn failed_days_do_not_affect_later_days() {
        let results = vec![
            planned(1),
            (Day::from(2), Err(Error::Infeasible)),
            (Day::from(3), Err(Error::ReconstructionAnomaly(Vec::new()))),
            (Day::from(4), Err(Error::TimeLimit)),
            planned(5),
        ];

        let days = collect(results).unwrap();
        assert_eq!(days.len(), 5);
        assert!(days[&Day::from(1)].plan().is_some());
        assert!(matches!(days[&Day::from(2)], DayOutcome::Failed(Error::Infeasible)));
        assert!(matches!(
            days[&Day::from(3)],
            DayOutcome::Failed(Error::ReconstructionAnomaly(_))
        ));
        assert!(matches!(days[&Day::from(4)], DayOutcome::Failed(Error::TimeLimit)));
        assert!(days[&Day::from(5)].plan().is_some());
    }

    #[test]
    fn fatal_error_aborts_the_run() {
        let results = vec![
            planned(1),
            (Day::from(2), Err(Error::Infeasible)),
            (Day::from(3), Err(Error::SolverUnavailable(String::from("no licence")))),
            planned(4),
        ];

        assert!(matches!(collect(results), Err(Error::SolverUnavailable(_))));
    }
}
