//! Scenario tests that solve the models. They need a working Gurobi installation and licence, and
//! are run with `cargo test -- --ignored`.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use reforest::{
    demand::DailyDemand,
    models::{
        routing::{RoutingSolver, RoutingStatus},
        supply::SupplySolver,
    },
    orchestrator::{self, DayOutcome},
    parse::Scenario,
    problem::{Day, Node, PlotIndex, SpeciesIndex},
    Error, Objective, Problem, Report, SolverConfig,
};

fn scenario() -> Value {
    json!({
        "species": [
            { "id": "pine", "density": 100.0, "area_per_plant": 0.1, "treatment_minutes": 0.5 },
            { "id": "oak", "density": 50.0, "area_per_plant": 0.2, "treatment_minutes": 1.0 }
        ],
        "suppliers": ["north", "south"],
        "offers": [
            { "species": "pine", "supplier": "north", "unit_cost": 2.0 },
            { "species": "pine", "supplier": "south", "unit_cost": 3.0 },
            { "species": "oak", "supplier": "south", "unit_cost": 5.0 }
        ],
        "plots": [
            { "id": "7", "hectares": 1.0 },
            { "id": "8", "hectares": 0.5 },
            { "id": "9", "hectares": 1.5 }
        ],
        "vehicles": [
            { "id": "K1", "capacity": 250.0 },
            { "id": "K2", "capacity": 250.0 }
        ],
        "depot": "18",
        "travel_times": [
            { "from": "18", "to": "7", "minutes": 30.0 },
            { "from": "7", "to": "18", "minutes": 30.0 },
            { "from": "18", "to": "8", "minutes": 20.0 },
            { "from": "8", "to": "18", "minutes": 20.0 },
            { "from": "18", "to": "9", "minutes": 45.0 },
            { "from": "9", "to": "18", "minutes": 45.0 },
            { "from": "7", "to": "8", "minutes": 10.0 },
            { "from": "8", "to": "7", "minutes": 10.0 },
            { "from": "7", "to": "9", "minutes": 25.0 },
            { "from": "9", "to": "7", "minutes": 25.0 },
            { "from": "8", "to": "9", "minutes": 15.0 },
            { "from": "9", "to": "8", "minutes": 15.0 }
        ],
        "operations": {
            "horizon": 3,
            "acquisition_truck_capacity": 300.0,
            "load_minutes": 20.0,
            "unload_minutes": 10.0,
            "workday_minutes": 480.0,
            "warehouse_m2": 100.0,
            "max_daily_trips": 2.0
        }
    })
}

fn problem(value: Value) -> Problem {
    serde_json::from_value::<Scenario>(value)
        .unwrap()
        .into_problem()
        .unwrap()
}

fn config() -> SolverConfig {
    SolverConfig {
        time_limit: Some(60.0),
        ..SolverConfig::default()
    }
}

#[test]
#[ignore = "requires a Gurobi licence"]
fn single_plot_is_served_by_one_route() {
    let mut value = scenario();
    value["plots"] = json!([{ "id": "7", "hectares": 1.0 }]);
    value["vehicles"] = json!([{ "id": "K1", "capacity": 10.0 }]);
    value["travel_times"] = json!([
        { "from": "18", "to": "7", "minutes": 3.0 },
        { "from": "7", "to": "18", "minutes": 3.0 }
    ]);
    value["operations"]["service_minutes"] = json!(2.0);
    value["operations"]["workday_minutes"] = json!(100.0);
    let problem = problem(value);

    let demand = DailyDemand {
        day: Day::from(1),
        plots: BTreeMap::from([(PlotIndex::from(0), 5.0)]),
    };
    let plan = RoutingSolver::solve(&problem, &demand, &config()).unwrap();

    assert_eq!(plan.status, RoutingStatus::Optimal);
    assert_eq!(plan.routes.len(), 1);
    assert_eq!(
        plan.routes[0].stops,
        vec![Node::Depot, Node::Plot(PlotIndex::from(0)), Node::Depot]
    );
    assert_eq!(plan.routes[0].load, 5.0);
    assert!((plan.routes[0].duration - 8.0).abs() < 1e-6);
    assert!((plan.total_time - 8.0).abs() < 1e-6);
    assert!(plan.check(&problem, &demand).is_empty());
}

#[test]
#[ignore = "requires a Gurobi licence"]
fn insufficient_budget_makes_the_supply_plan_infeasible() {
    let mut value = scenario();
    value["operations"]["budget"] = json!(1.0);
    let problem = problem(value);

    let result = orchestrator::run(&problem, &config());
    assert!(matches!(result, Err(Error::Infeasible)), "{:?}", result);
}

#[test]
#[ignore = "requires a Gurobi licence"]
fn goal_objective_tolerates_a_small_budget() {
    let mut value = scenario();
    value["operations"]["budget"] = json!(1.0);
    let problem = problem(value);

    let config = SolverConfig {
        objective: Objective::Goal,
        ..config()
    };
    let plan = SupplySolver::solve(&problem, &config).unwrap();
    assert!(plan.budget_over > 0.0);
    assert_eq!(plan.budget_under, 0.0);
}

#[test]
#[ignore = "requires a Gurobi licence"]
fn supply_plan_balances_inventory_and_covers_every_plot() {
    let problem = problem(scenario());
    let plan = SupplySolver::solve(&problem, &config()).unwrap();

    for s in (0..problem.species().len()).map(SpeciesIndex::from) {
        let mut previous = 0.0;
        for t in problem.days() {
            let expected = previous + plan.purchased(s, t) - plan.planted(s, t);
            assert!((plan.stock(s, t) - expected).abs() < 1e-6, "species {s} on day {t}");
            previous = plan.stock(s, t);
        }
    }

    for (g, plot) in problem.plots().iter_enumerated() {
        assert!(plan.covered(&problem, g) >= plot.hectares - 0.001 - 1e-6);
    }

    // oak is only offered by the southern supplier
    assert!(plan
        .purchases
        .keys()
        .all(|(s, p, _)| problem.offer(*s, *p).purchasable().is_some()));
}

#[test]
#[ignore = "requires a Gurobi licence"]
fn every_day_with_plantings_is_routed() {
    let problem = problem(scenario());
    let outcome = orchestrator::run(&problem, &config()).unwrap();

    assert_eq!(outcome.days.len(), problem.operations().horizon);
    assert_eq!(outcome.failures(), 0);

    for (day, result) in &outcome.days {
        let demand = &outcome.demand[day];
        let plan = result.plan().unwrap();
        if demand.is_empty() {
            assert_eq!(plan.status, RoutingStatus::NoDemand);
            assert!(plan.routes.is_empty());
        } else {
            assert!(plan.check(&problem, demand).is_empty());
            for route in &plan.routes {
                assert!(route.load <= problem.vehicles()[route.vehicle].capacity + 1e-6);
            }
        }
    }
}

#[test]
#[ignore = "requires a Gurobi licence"]
fn unroutable_days_fail_without_aborting_the_run() {
    // every planting is a whole plant, so no plot can be served
    let mut value = scenario();
    value["vehicles"] = json!([{ "id": "K1", "capacity": 0.5 }]);
    let problem = problem(value);

    let outcome = orchestrator::run(&problem, &config()).unwrap();
    assert_eq!(outcome.days.len(), problem.operations().horizon);

    for (day, result) in &outcome.days {
        match result {
            DayOutcome::Failed(e) => {
                assert!(!outcome.demand[day].is_empty());
                assert!(matches!(e, Error::Infeasible), "day {}: {}", day, e);
            }
            DayOutcome::Planned(plan) => {
                assert!(outcome.demand[day].is_empty());
                assert_eq!(plan.status, RoutingStatus::NoDemand);
            }
        }
    }
    assert!(outcome.failures() > 0);

    let report = Report::new(&problem, &outcome, Objective::Cost);
    assert!(report.routes.is_empty());
}

#[test]
#[ignore = "requires a Gurobi licence"]
fn parallel_routing_matches_sequential_routing() {
    let problem = problem(scenario());
    let sequential = orchestrator::run(&problem, &config()).unwrap();
    let parallel = orchestrator::run(
        &problem,
        &SolverConfig {
            parallel: true,
            ..config()
        },
    )
    .unwrap();

    assert_eq!(sequential.supply.objective, parallel.supply.objective);
    assert_eq!(sequential.demand, parallel.demand);
    for (day, outcome) in &sequential.days {
        let (a, b) = (outcome.plan().unwrap(), parallel.days[day].plan().unwrap());
        assert!((a.total_time - b.total_time).abs() < 1e-6);
    }
}

#[test]
#[ignore = "requires a Gurobi licence"]
fn repeated_runs_are_identical() {
    let problem = problem(scenario());
    let first = orchestrator::run(&problem, &config()).unwrap();
    let second = orchestrator::run(&problem, &config()).unwrap();

    assert!((first.supply.objective - second.supply.objective).abs() < 1e-6);
    assert_eq!(first.demand, second.demand);
    for (day, outcome) in &first.days {
        match (outcome, &second.days[day]) {
            // routes may differ among alternatives of equal cost
            (DayOutcome::Planned(a), DayOutcome::Planned(b)) => {
                assert_eq!(a.status, b.status);
                assert!((a.total_time - b.total_time).abs() < 1e-6);
            }
            _ => panic!("day {} was not routed", day),
        }
    }
}

#[test]
fn empty_day_needs_no_solver() {
    let problem = problem(scenario());
    let demand = DailyDemand {
        day: Day::from(3),
        plots: BTreeMap::new(),
    };

    let plan = RoutingSolver::solve(&problem, &demand, &config()).unwrap();
    assert_eq!(plan.status, RoutingStatus::NoDemand);
    assert_eq!(plan.total_time, 0.0);
}
