use std::collections::HashMap;

use derive_more::Display;
use grb::prelude::*;
use itertools::iproduct;
use log::{debug, info, trace, warn};
use serde::Serialize;

use super::{
    reconstruct::{follow, Anomaly, AnomalyKind},
    sets_and_parameters::{LocalNode, Parameters, Sets, DEPOT},
};
use crate::{
    config::SolverConfig,
    demand::DailyDemand,
    error::{Error, Result},
    models::utils::{create_model, optimize, sparse_vars, ConvertVars, SolveStatus, SELECTED},
    problem::{Day, Minutes, Node, Problem, Quantity, VehicleIndex},
};

/// Tolerance used when comparing loads and durations against their limits
const EPSILON: f64 = 1e-6;

pub struct Variables {
    /// 1 if vehicle k travels from node i to node j
    pub x: HashMap<(LocalNode, LocalNode, VehicleIndex), Var>,
    /// Position of demand node i in its route
    pub u: HashMap<LocalNode, Var>,
}

pub struct RoutingSolver {}

#[allow(non_snake_case)]
impl RoutingSolver {
    /// Builds the capacitated routing model for a single day
    pub fn build(
        sets: &Sets,
        parameters: &Parameters,
        config: &SolverConfig,
        day: Day,
    ) -> Result<(Model, Variables)> {
        let N = &sets.N;
        let D = &sets.D;
        let K = &sets.K;
        let n = D.len() as f64;

        trace!(
            "Building routing model for day {} with {} demand nodes and {} vehicles",
            day,
            D.len(),
            K.len()
        );

        let mut model = create_model(&format!("routing_model_{}", day), config)?;

        //*************CREATE VARIABLES*************//

        let arcs = iproduct!(N.iter().cloned(), N.iter().cloned(), K.iter().cloned())
            .filter(|(i, j, _)| i != j);
        let x = sparse_vars(arcs, &mut model, VarType::Binary, &(0.0..1.0), "x")?;
        let u = sparse_vars(D.iter().cloned(), &mut model, VarType::Integer, &(1.0..n), "u")?;

        model.update()?;

        //*************ADD CONSTRAINTS*************//

        // every demand node is entered exactly once
        for j in D {
            let lhs = iproduct!(N, K)
                .filter(|(i, _)| *i != j)
                .map(|(i, k)| x[&(*i, *j, *k)])
                .grb_sum();
            model.add_constr(&format!("visit_once_{j}"), c!(lhs == 1.0_f64))?;
        }

        // every vehicle leaves the depot at most once
        for k in K {
            let lhs = D.iter().map(|j| x[&(DEPOT, *j, *k)]).grb_sum();
            model.add_constr(&format!("depot_departure_{k}"), c!(lhs <= 1.0_f64))?;
        }

        // a vehicle entering a demand node must also leave it
        for (h, k) in iproduct!(D, K) {
            let entering = N
                .iter()
                .filter(|i| *i != h)
                .map(|i| x[&(*i, *h, *k)])
                .grb_sum();
            let leaving = N
                .iter()
                .filter(|j| *j != h)
                .map(|j| x[&(*h, *j, *k)])
                .grb_sum();
            model.add_constr(&format!("flow_{h}_{k}"), c!(entering - leaving == 0.0_f64))?;
        }

        for k in K {
            // the demand served by a vehicle must fit in it
            let load = iproduct!(N, D)
                .filter(|(i, j)| i != j)
                .map(|(i, j)| parameters.demand[*j] * x[&(*i, *j, *k)])
                .grb_sum();
            model.add_constr(&format!("capacity_{k}"), c!(load <= parameters.capacity[*k]))?;

            // travelling and serving must fit within the workday
            let duration = iproduct!(N, N)
                .filter(|(i, j)| i != j)
                .map(|(i, j)| Self::arc_time(parameters, *i, *j) * x[&(*i, *j, *k)])
                .grb_sum();
            model.add_constr(&format!("duration_{k}"), c!(duration <= parameters.workday))?;
        }

        // subtour elimination (Miller-Tucker-Zemlin) over the demand nodes
        for (i, j) in iproduct!(D, D) {
            if i == j {
                continue;
            }
            let used = K.iter().map(|k| x[&(*i, *j, *k)]).grb_sum();
            let lhs = u[i] - u[j] + n * used;
            model.add_constr(&format!("mtz_{i}_{j}"), c!(lhs <= n - 1.0))?;
        }

        //*************OBJECTIVE*************//

        let total_time = iproduct!(N, N, K)
            .filter(|(i, j, _)| i != j)
            .map(|(i, j, k)| Self::arc_time(parameters, *i, *j) * x[&(*i, *j, *k)])
            .grb_sum();
        model.set_objective(total_time, Minimize)?;

        model.update()?;

        Ok((model, Variables { x, u }))
    }

    /// The time spent by traversing the arc (i, j): the travel time plus the service time at j, unless
    /// j is the depot.
    fn arc_time(parameters: &Parameters, i: LocalNode, j: LocalNode) -> Minutes {
        match j {
            DEPOT => parameters.travel[i][j],
            _ => parameters.travel[i][j] + parameters.service,
        }
    }

    /// Routes the vehicle fleet between the depot and the plots with demand on the given day.
    ///
    /// Days without demand are resolved without invoking the solver.
    pub fn solve(
        problem: &Problem,
        demand: &DailyDemand,
        config: &SolverConfig,
    ) -> Result<RoutingPlan> {
        if demand.is_empty() {
            info!("Day {}: no demand, routing is not required", demand.day);
            return Ok(RoutingPlan::no_demand(demand.day));
        }

        let sets = Sets::new(problem, demand);
        let parameters = Parameters::new(problem, demand);
        let (mut model, vars) = RoutingSolver::build(&sets, &parameters, config, demand.day)?;

        info!(
            "Day {}: routing {} plants to {} plots",
            demand.day,
            demand.total(),
            demand.len()
        );

        let status = optimize(&mut model)?;
        let total_time = model.get_attr(attr::ObjVal)?;
        let x = vars.x.convert(&model)?;

        let plan = RoutingPlan::from_arcs(&sets, &parameters, demand.day, status, total_time, &x)?;

        info!(
            "Day {}: {} route(s) with a total time of {:.2} minutes ({:?})",
            plan.day,
            plan.routes.len(),
            plan.total_time,
            plan.status
        );

        Ok(plan)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RoutingStatus {
    Optimal,
    Feasible,
    /// No plot received plantings, so no model was solved
    NoDemand,
}

impl From<SolveStatus> for RoutingStatus {
    fn from(status: SolveStatus) -> Self {
        match status {
            SolveStatus::Optimal => RoutingStatus::Optimal,
            SolveStatus::Feasible => RoutingStatus::Feasible,
        }
    }
}

/// The route driven by a single vehicle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub vehicle: VehicleIndex,
    /// The visited nodes, starting and ending at the depot
    pub stops: Vec<Node>,
    /// Plants carried by the vehicle
    pub load: Quantity,
    /// Travel time plus service time of the route
    pub duration: Minutes,
}

/// The routes of a single day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingPlan {
    pub day: Day,
    pub status: RoutingStatus,
    pub routes: Vec<Route>,
    /// The objective value: total travel and service time across all vehicles
    pub total_time: Minutes,
}

impl RoutingPlan {
    pub fn no_demand(day: Day) -> RoutingPlan {
        RoutingPlan {
            day,
            status: RoutingStatus::NoDemand,
            routes: Vec::new(),
            total_time: 0.0,
        }
    }

    /// Reconstructs the routes of every vehicle leaving the depot from the values of the arc variables.
    pub fn from_arcs(
        sets: &Sets,
        parameters: &Parameters,
        day: Day,
        status: SolveStatus,
        total_time: f64,
        x: &HashMap<(LocalNode, LocalNode, VehicleIndex), f64>,
    ) -> Result<RoutingPlan> {
        let mut selected: HashMap<VehicleIndex, Vec<(LocalNode, LocalNode)>> = HashMap::new();
        for ((i, j, k), value) in x {
            if *value > SELECTED {
                selected.entry(*k).or_default().push((*i, *j));
            }
        }

        let mut routes = Vec::new();
        let mut anomalies = Vec::new();

        for k in &sets.K {
            let arcs = match selected.get(k) {
                Some(arcs) => arcs,
                None => continue,
            };

            if !arcs.iter().any(|(i, _)| *i == DEPOT) {
                anomalies.push(Anomaly {
                    vehicle: *k,
                    kind: AnomalyKind::Detached,
                    partial: Vec::new(),
                });
                continue;
            }

            match follow(arcs, sets.D.len()) {
                Ok(path) => routes.push(Route::new(*k, &path, parameters)),
                Err((kind, partial)) => anomalies.push(Anomaly {
                    vehicle: *k,
                    kind,
                    partial: partial.iter().map(|i| parameters.nodes[*i]).collect(),
                }),
            }
        }

        if !anomalies.is_empty() {
            for anomaly in &anomalies {
                warn!(
                    "Day {}: could not reconstruct the route of vehicle {} ({}), partial route {:?}",
                    day, anomaly.vehicle, anomaly.kind, anomaly.partial
                );
            }
            return Err(Error::ReconstructionAnomaly(anomalies));
        }

        debug!("Day {}: reconstructed {} route(s)", day, routes.len());

        Ok(RoutingPlan {
            day,
            status: status.into(),
            routes,
            total_time,
        })
    }

    /// Checks every route, and that every demand node of the day is visited by exactly one of them.
    pub fn check(&self, problem: &Problem, demand: &DailyDemand) -> Vec<RouteViolation> {
        let mut violations: Vec<RouteViolation> = self
            .routes
            .iter()
            .flat_map(|route| route.check(problem, demand))
            .collect();

        for g in demand.plots.keys() {
            let visits = self
                .routes
                .iter()
                .flat_map(|r| r.stops.iter())
                .filter(|n| **n == Node::Plot(*g))
                .count();
            if visits != 1 {
                violations.push(RouteViolation::VisitCount(Node::Plot(*g), visits));
            }
        }

        violations
    }
}

#[derive(Debug, Display, Clone, PartialEq)]
pub enum RouteViolation {
    #[display(fmt = "route of vehicle {} does not start and end at the depot", _0)]
    NotClosed(VehicleIndex),
    #[display(fmt = "vehicle {} visits {:?} which has no demand, or visits it twice", _0, _1)]
    UnexpectedStop(VehicleIndex, Node),
    #[display(fmt = "vehicle {} carries {} plants, more than its capacity", _0, _1)]
    Overloaded(VehicleIndex, Quantity),
    #[display(fmt = "vehicle {} needs {} minutes, more than the workday", _0, _1)]
    Overtime(VehicleIndex, Minutes),
    #[display(fmt = "{:?} is visited {} times", _0, _1)]
    VisitCount(Node, usize),
}

impl Route {
    fn new(vehicle: VehicleIndex, path: &[LocalNode], parameters: &Parameters) -> Route {
        let load = path.iter().map(|i| parameters.demand[*i]).sum();
        let duration = path
            .windows(2)
            .map(|w| RoutingSolver::arc_time(parameters, w[0], w[1]))
            .sum();

        Route {
            vehicle,
            stops: path.iter().map(|i| parameters.nodes[*i]).collect(),
            load,
            duration,
        }
    }

    /// The plots visited by the route, in order
    pub fn plots(&self) -> &[Node] {
        match self.stops.len() {
            0 | 1 => &[],
            len => &self.stops[1..len - 1],
        }
    }

    /// Checks that the route starts and ends at the depot, visits only demand nodes of the day and at most
    /// once, and respects the capacity and workday of the vehicle.
    pub fn check(&self, problem: &Problem, demand: &DailyDemand) -> Vec<RouteViolation> {
        let mut violations = Vec::new();
        let k = self.vehicle;

        if self.stops.len() < 2
            || self.stops.first() != Some(&Node::Depot)
            || self.stops.last() != Some(&Node::Depot)
        {
            violations.push(RouteViolation::NotClosed(k));
        }

        let mut seen = Vec::with_capacity(self.plots().len());
        for node in self.plots() {
            let expected = match node {
                Node::Plot(g) => demand.plots.contains_key(g),
                Node::Depot => false,
            };
            if !expected || seen.contains(node) {
                violations.push(RouteViolation::UnexpectedStop(k, *node));
            }
            seen.push(*node);
        }

        let load: Quantity = self
            .plots()
            .iter()
            .filter_map(|n| match n {
                Node::Plot(g) => demand.plots.get(g),
                Node::Depot => None,
            })
            .sum();
        if load > problem.vehicles()[k].capacity + EPSILON {
            violations.push(RouteViolation::Overloaded(k, load));
        }

        let ops = problem.operations();
        let duration: Minutes = self
            .stops
            .windows(2)
            .map(|w| problem.travel_time(w[0], w[1]))
            .sum::<Minutes>()
            + ops.service() * self.plots().len() as f64;
        if duration > ops.workday_minutes + EPSILON {
            violations.push(RouteViolation::Overtime(k, duration));
        }

        violations
    }
}
