use chrono::Local;
use itertools::Itertools;
use serde::Serialize;

use crate::{
    config::Objective,
    models::{routing::RoutingStatus, supply::SupplyPlan, utils::SolveStatus},
    orchestrator::{DayOutcome, Outcome},
    problem::{Cost, Day, Minutes, Problem, Quantity},
};

/// A purchase of plants from a supplier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseRow {
    pub day: Day,
    pub species: String,
    pub supplier: String,
    pub quantity: Quantity,
    pub cost: Cost,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantingRow {
    pub day: Day,
    pub species: String,
    pub plot: String,
    pub quantity: Quantity,
}

/// Key figures of a single day of the supply plan, and the status of its routing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayRow {
    pub day: Day,
    pub hectares_planted: f64,
    /// Hectares still to be planted at the end of the day, across all plots
    pub remaining_hectares: f64,
    pub purchase_cost: Cost,
    pub planting_cost: Cost,
    pub waste_cost: Cost,
    /// Purchase and planting cost of this and every earlier day
    pub cumulative_cost: Cost,
    pub routing: Option<RoutingStatus>,
    pub routing_minutes: Option<Minutes>,
    pub error: Option<String>,
}

/// A single vehicle route, flattened for tabular output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteRow {
    pub day: Day,
    pub vehicle: String,
    /// The visited node ids joined by dashes, e.g. `18-7-18`
    pub path: String,
    pub load: Quantity,
    pub minutes: Minutes,
}

/// The result document of a planning run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Local time at which the report was created, in RFC 3339
    pub generated: String,
    pub objective: Objective,
    pub supply_status: SolveStatus,
    pub supply_objective: f64,
    pub budget_over: Cost,
    pub budget_under: Cost,
    pub purchases: Vec<PurchaseRow>,
    pub plantings: Vec<PlantingRow>,
    pub days: Vec<DayRow>,
    pub routes: Vec<RouteRow>,
}

impl Report {
    pub fn new(problem: &Problem, outcome: &Outcome, objective: Objective) -> Report {
        let supply = &outcome.supply;

        let purchases = supply
            .purchases
            .iter()
            .sorted_by_key(|((s, p, t), _)| (*t, *s, *p))
            .map(|((s, p, t), quantity)| PurchaseRow {
                day: *t,
                species: problem.species()[*s].id.clone(),
                supplier: problem.suppliers()[*p].id.clone(),
                quantity: *quantity,
                cost: quantity * problem.offer(*s, *p).unit_cost.unwrap_or(0.0),
            })
            .collect();

        let plantings = supply
            .plantings
            .iter()
            .sorted_by_key(|((s, g, t), _)| (*t, *g, *s))
            .map(|((s, g, t), quantity)| PlantingRow {
                day: *t,
                species: problem.species()[*s].id.clone(),
                plot: problem.plots()[*g].id.clone(),
                quantity: *quantity,
            })
            .collect();

        let mut days = day_rows(problem, supply);
        for row in &mut days {
            match outcome.days.get(&row.day) {
                Some(DayOutcome::Planned(plan)) => {
                    row.routing = Some(plan.status);
                    row.routing_minutes = Some(plan.total_time);
                }
                Some(DayOutcome::Failed(e)) => row.error = Some(e.to_string()),
                None => (),
            }
        }

        // failed days have no routes to report
        let routes = outcome
            .days
            .values()
            .filter_map(DayOutcome::plan)
            .flat_map(|plan| {
                plan.routes.iter().map(move |route| RouteRow {
                    day: plan.day,
                    vehicle: problem.vehicles()[route.vehicle].id.clone(),
                    path: route.stops.iter().map(|n| problem.node_id(*n)).join("-"),
                    load: route.load,
                    minutes: route.duration,
                })
            })
            .collect();

        Report {
            generated: Local::now().to_rfc3339(),
            objective,
            supply_status: supply.status,
            supply_objective: supply.objective,
            budget_over: supply.budget_over,
            budget_under: supply.budget_under,
            purchases,
            plantings,
            days,
            routes,
        }
    }
}

/// The daily key figures of a supply plan, one row per day of the horizon
pub fn day_rows(problem: &Problem, supply: &SupplyPlan) -> Vec<DayRow> {
    let ops = problem.operations();
    let mut remaining: f64 = problem.plots().iter().map(|g| g.hectares).sum();
    let mut cumulative = 0.0;

    problem
        .days()
        .map(|day| {
            let hectares_planted: f64 = supply
                .plantings
                .iter()
                .filter(|((_, _, t), _)| *t == day)
                .map(|((s, _, _), q)| q / problem.species()[*s].density)
                .sum();

            let purchase_cost: Cost = supply
                .purchases
                .iter()
                .filter(|((_, _, t), _)| *t == day)
                .map(|((s, p, _), q)| q * problem.offer(*s, *p).unit_cost.unwrap_or(0.0))
                .sum();

            let planted: Quantity = sum_on(day, &supply.plantings);
            let planting_cost = ops.planting_unit_cost * planted;
            let waste_cost = ops.waste_penalty * sum_on(day, &supply.waste);

            remaining = (remaining - hectares_planted).max(0.0);
            cumulative += purchase_cost + planting_cost;

            DayRow {
                day,
                hectares_planted,
                remaining_hectares: remaining,
                purchase_cost,
                planting_cost,
                waste_cost,
                cumulative_cost: cumulative,
                routing: None,
                routing_minutes: None,
                error: None,
            }
        })
        .collect()
}

fn sum_on<A, B>(day: Day, values: &std::collections::HashMap<(A, B, Day), f64>) -> f64 {
    values
        .iter()
        .filter(|((_, _, t), _)| *t == day)
        .map(|(_, q)| q)
        .sum()
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use serde_json::json;

    use super::*;
    use crate::{
        error::Error,
        models::routing::{Route, RoutingPlan},
        parse::Scenario,
        problem::{Node, PlotIndex, SpeciesIndex, SupplierIndex, VehicleIndex},
    };

    fn problem() -> Problem {
        let mut value = crate::parse::tests::scenario();
        value["plots"] = json!([{ "id": "7", "hectares": 2.0 }]);
        value["operations"]["planting_unit_cost"] = json!(0.5);
        value["operations"]["waste_penalty"] = json!(3.0);
        serde_json::from_value::<Scenario>(value)
            .unwrap()
            .into_problem()
            .unwrap()
    }

    fn supply() -> SupplyPlan {
        let (s, p, g) = (SpeciesIndex::from(0), SupplierIndex::from(0), PlotIndex::from(0));
        SupplyPlan {
            status: SolveStatus::Optimal,
            objective: 610.0,
            purchases: HashMap::from([((s, p, Day::from(1)), 200.0)]),
            plantings: HashMap::from([
                ((s, g, Day::from(1)), 100.0),
                ((s, g, Day::from(2)), 100.0),
            ]),
            inventory: HashMap::from([((s, Day::from(1)), 100.0)]),
            acquisition_trucks: HashMap::from([(Day::from(1), 1.0)]),
            distribution_trucks: HashMap::new(),
            waste: HashMap::from([((s, g, Day::from(2)), 4.0)]),
            stock_shortfall: HashMap::new(),
            budget_over: 0.0,
            budget_under: 0.0,
        }
    }

    #[test]
    fn daily_key_figures() {
        let rows = day_rows(&problem(), &supply());
        assert_eq!(rows.len(), 2);

        // density of 100 plants per hectare
        assert_eq!(rows[0].hectares_planted, 1.0);
        assert_eq!(rows[0].remaining_hectares, 1.0);
        assert_eq!(rows[0].purchase_cost, 400.0);
        assert_eq!(rows[0].planting_cost, 50.0);
        assert_eq!(rows[0].waste_cost, 0.0);
        assert_eq!(rows[0].cumulative_cost, 450.0);

        assert_eq!(rows[1].hectares_planted, 1.0);
        assert_eq!(rows[1].remaining_hectares, 0.0);
        assert_eq!(rows[1].purchase_cost, 0.0);
        assert_eq!(rows[1].waste_cost, 12.0);
        assert_eq!(rows[1].cumulative_cost, 500.0);
    }

    #[test]
    fn failed_days_have_no_routes() {
        let problem = problem();
        let plan = RoutingPlan {
            day: Day::from(1),
            status: RoutingStatus::Optimal,
            routes: vec![Route {
                vehicle: VehicleIndex::from(0),
                stops: vec![Node::Depot, Node::Plot(PlotIndex::from(0)), Node::Depot],
                load: 100.0,
                duration: 70.0,
            }],
            total_time: 70.0,
        };
        let outcome = Outcome {
            supply: supply(),
            demand: BTreeMap::new(),
            days: BTreeMap::from([
                (Day::from(1), DayOutcome::Planned(plan)),
                (Day::from(2), DayOutcome::Failed(Error::TimeLimit)),
            ]),
        };

        let report = Report::new(&problem, &outcome, Objective::Cost);

        assert_eq!(
            report.routes,
            vec![RouteRow {
                day: Day::from(1),
                vehicle: String::from("K1"),
                path: String::from("18-7-18"),
                load: 100.0,
                minutes: 70.0,
            }]
        );
        assert_eq!(report.days[0].routing, Some(RoutingStatus::Optimal));
        assert_eq!(report.days[0].routing_minutes, Some(70.0));
        assert_eq!(report.days[1].routing, None);
        assert!(report.days[1].error.is_some());

        assert_eq!(report.purchases.len(), 1);
        assert_eq!(report.purchases[0].supplier, "nursery");
        assert_eq!(report.purchases[0].cost, 400.0);
        assert_eq!(report.plantings[0].day, Day::from(1));
        assert_eq!(report.plantings[1].day, Day::from(2));
    }
}
