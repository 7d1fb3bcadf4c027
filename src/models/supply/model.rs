use std::collections::HashMap;

use grb::prelude::*;
use itertools::iproduct;
use log::{debug, info};

use super::sets_and_parameters::{Parameters, Sets, COVERAGE_TOLERANCE};
use crate::{
    config::{Objective, SolverConfig},
    error::Result,
    models::utils::{
        create_model, nonzero, nonzero_scalar, optimize, sparse_vars, ConvertVars, SolveStatus,
    },
    problem::{Cost, Day, PlotIndex, Problem, Quantity, SpeciesIndex, SupplierIndex},
};

pub struct Variables {
    /// Plants of species s bought from supplier p on day t
    pub x: HashMap<(SpeciesIndex, SupplierIndex, Day), Var>,
    /// Plants of species s planted at plot g on day t
    pub y: HashMap<(SpeciesIndex, PlotIndex, Day), Var>,
    /// Depot inventory of species s at the end of day t
    pub inventory: HashMap<(SpeciesIndex, Day), Var>,
    /// Acquisition trucks used on day t
    pub z1: HashMap<Day, Var>,
    /// Distribution trucks sent to plot g on day t
    pub z2: HashMap<(PlotIndex, Day), Var>,
    /// Plants of species s wasted at plot g on day t. Inert in this formulation: nothing links it to
    /// purchases or plantings, so it is 0 in any optimal solution and the waste ratio never binds.
    pub waste: HashMap<(SpeciesIndex, PlotIndex, Day), Var>,
    /// Shortfall of the final inventory of species s with respect to the minimum stock
    pub stock_shortfall: HashMap<SpeciesIndex, Var>,
    /// Deviations (over, under) from the budget. Only present in the goal programming variant.
    pub budget: Option<(Var, Var)>,
}

pub struct SupplySolver {}

#[allow(non_snake_case)]
impl SupplySolver {
    /// Builds the supply planning model
    pub fn build(
        sets: &Sets,
        parameters: &Parameters,
        config: &SolverConfig,
    ) -> Result<(Model, Variables)> {
        info!(
            "Building supply model ({} objective) for {} species, {} suppliers, {} plots and {} days",
            config.objective,
            sets.S.len(),
            sets.P.len(),
            sets.G.len(),
            sets.T.len()
        );

        let mut model = create_model("supply_model", config)?;

        let S = &sets.S;
        let P = &sets.P;
        let G = &sets.G;
        let T = &sets.T;
        let unbounded = 0.0..f64::INFINITY;

        //*************CREATE VARIABLES*************//

        let indices = iproduct!(S.iter().cloned(), P.iter().cloned(), T.iter().cloned());
        let x = sparse_vars(indices, &mut model, VarType::Integer, &unbounded, "x")?;

        let indices = iproduct!(S.iter().cloned(), G.iter().cloned(), T.iter().cloned());
        let y = sparse_vars(indices, &mut model, VarType::Integer, &unbounded, "y")?;

        let indices = iproduct!(S.iter().cloned(), T.iter().cloned());
        let inventory = sparse_vars(indices, &mut model, VarType::Integer, &unbounded, "XI")?;

        let z1 = sparse_vars(T.iter().cloned(), &mut model, VarType::Integer, &unbounded, "z1")?;

        let indices = iproduct!(G.iter().cloned(), T.iter().cloned());
        let z2 = sparse_vars(indices, &mut model, VarType::Integer, &unbounded, "z2")?;

        let indices = iproduct!(S.iter().cloned(), G.iter().cloned(), T.iter().cloned());
        let waste = sparse_vars(indices, &mut model, VarType::Integer, &unbounded, "waste")?;

        let stock_shortfall = sparse_vars(
            S.iter().cloned(),
            &mut model,
            VarType::Continuous,
            &unbounded,
            "stock_shortfall",
        )?;

        let budget = match config.objective {
            Objective::Cost => None,
            Objective::Goal => {
                let mut deviation = |name: &str| {
                    model.add_var(
                        name,
                        VarType::Continuous,
                        0.0,
                        0.0,
                        f64::INFINITY,
                        std::iter::empty(),
                    )
                };
                Some((deviation("budget_over")?, deviation("budget_under")?))
            }
        };

        model.update()?;

        //*************ADD CONSTRAINTS*************//

        // nothing can be bought from a supplier that does not offer the species
        for (s, p, t) in iproduct!(S, P, T) {
            if !parameters.available(*s, *p) {
                model.set_obj_attr(attr::UB, &x[&(*s, *p, *t)], 0.0)?;
            }
        }

        // the plantings must cover the required area of every plot
        for g in G {
            let lhs = iproduct!(S, T)
                .map(|(s, t)| (1.0 / parameters.density[*s]) * y[&(*s, *g, *t)])
                .grb_sum();
            let rhs = parameters.hectares[*g] - COVERAGE_TOLERANCE;
            model.add_constr(&format!("coverage_{g}"), c!(lhs >= rhs))?;
        }

        // inventory balance at the depot, starting from an empty warehouse
        for (s, t) in iproduct!(S, T) {
            let purchases = P
                .iter()
                .filter(|p| parameters.available(*s, **p))
                .map(|p| x[&(*s, *p, *t)])
                .grb_sum();
            let plantings = G.iter().map(|g| y[&(*s, *g, *t)]).grb_sum();
            let previous = match t.previous() {
                Some(prev) => Expr::from(inventory[&(*s, prev)]),
                None => Expr::Constant(0.0),
            };

            let lhs = Expr::from(inventory[&(*s, *t)]) - previous - purchases + plantings;
            model.add_constr(&format!("inventory_{s}_{t}"), c!(lhs == 0.0_f64))?;
        }

        for t in T {
            // purchases must fit on the acquisition trucks
            let lhs = iproduct!(S, P).map(|(s, p)| x[&(*s, *p, *t)]).grb_sum();
            let rhs = parameters.acquisition_capacity * z1[t];
            model.add_constr(&format!("acquisition_capacity_{t}"), c!(lhs <= rhs))?;

            // plantings must fit on the distribution trucks sent to the plot
            for g in G {
                let lhs = S.iter().map(|s| y[&(*s, *g, *t)]).grb_sum();
                let rhs = parameters.distribution_capacity * z2[&(*g, *t)];
                model.add_constr(&format!("distribution_capacity_{g}_{t}"), c!(lhs <= rhs))?;
            }

            // treatment, loading and unloading must fit within the workday
            let treatment = iproduct!(S, G)
                .map(|(s, g)| parameters.treatment[*s] * y[&(*s, *g, *t)])
                .grb_sum();
            let unloading = G
                .iter()
                .map(|g| parameters.unload_time * z2[&(*g, *t)])
                .grb_sum();
            let lhs = treatment + parameters.load_time * z1[t] + unloading;
            model.add_constr(&format!("workday_{t}"), c!(lhs <= parameters.workday))?;

            // the inventory must fit in the warehouse
            let lhs = S
                .iter()
                .map(|s| parameters.area[*s] * inventory[&(*s, *t)])
                .grb_sum();
            model.add_constr(&format!("warehouse_{t}"), c!(lhs <= parameters.warehouse))?;

            model.add_constr(&format!("max_trips_{t}"), c!(z1[t] <= parameters.max_trips))?;
        }

        // only a fraction of the purchased plants may be wasted
        let total_waste = iproduct!(S, G, T).map(|(s, g, t)| waste[&(*s, *g, *t)]).grb_sum();
        let total_purchased = iproduct!(S, P, T).map(|(s, p, t)| x[&(*s, *p, *t)]).grb_sum();
        model.add_constr(
            "waste_ratio",
            c!(total_waste <= parameters.waste_fraction * total_purchased),
        )?;

        // the final inventory should reach the minimum stock
        if let Some(last) = T.last() {
            for s in S {
                let lhs = inventory[&(*s, *last)] + stock_shortfall[s];
                model.add_constr(&format!("min_stock_{s}"), c!(lhs >= parameters.min_stock))?;
            }
        }

        //*************OBJECTIVE*************//

        let procurement = iproduct!(S, P, T)
            .filter_map(|(s, p, t)| parameters.cost[*s][*p].map(|price| price * x[&(*s, *p, *t)]))
            .grb_sum();
        let planting = iproduct!(S, G, T)
            .map(|(s, g, t)| parameters.planting_cost * y[&(*s, *g, *t)])
            .grb_sum();
        let cost = procurement + planting;

        let waste_penalty = iproduct!(S, G, T)
            .map(|(s, g, t)| parameters.waste_penalty * waste[&(*s, *g, *t)])
            .grb_sum();
        let shortfall = S.iter().map(|s| stock_shortfall[s]).grb_sum();

        match budget {
            None => {
                model.add_constr("budget_cap", c!(cost.clone() <= parameters.budget))?;
                model.set_objective(
                    cost + waste_penalty + parameters.weights.stock * shortfall,
                    Minimize,
                )?;
            }
            Some((over, under)) => {
                model.add_constr("budget_goal", c!(cost - over + under == parameters.budget))?;
                model.set_objective(
                    parameters.weights.budget * (over + under)
                        + parameters.weights.waste * waste_penalty
                        + parameters.weights.stock * shortfall,
                    Minimize,
                )?;
            }
        }

        model.update()?;

        debug!(
            "Supply model has {} variables and {} constraints",
            model.get_attr(attr::NumVars)?,
            model.get_attr(attr::NumConstrs)?
        );

        Ok((
            model,
            Variables {
                x,
                y,
                inventory,
                z1,
                z2,
                waste,
                stock_shortfall,
                budget,
            },
        ))
    }

    /// Builds and solves the supply planning model for the entire horizon
    pub fn solve(problem: &Problem, config: &SolverConfig) -> Result<SupplyPlan> {
        let sets = Sets::new(problem);
        let parameters = Parameters::new(problem, &sets);
        let (mut model, vars) = SupplySolver::build(&sets, &parameters, config)?;

        let status = optimize(&mut model)?;
        let plan = SupplyPlan::new(&vars, &model, status)?;

        info!(
            "Supply model solved ({:?}) with objective {:.2}: {} purchases and {} plantings",
            plan.status,
            plan.objective,
            plan.purchases.len(),
            plan.plantings.len()
        );

        Ok(plan)
    }
}

/// The materially nonzero decisions of a solved supply planning model
#[derive(Debug, Clone)]
pub struct SupplyPlan {
    pub status: SolveStatus,
    pub objective: f64,
    pub purchases: HashMap<(SpeciesIndex, SupplierIndex, Day), Quantity>,
    pub plantings: HashMap<(SpeciesIndex, PlotIndex, Day), Quantity>,
    pub inventory: HashMap<(SpeciesIndex, Day), Quantity>,
    pub acquisition_trucks: HashMap<Day, f64>,
    pub distribution_trucks: HashMap<(PlotIndex, Day), f64>,
    pub waste: HashMap<(SpeciesIndex, PlotIndex, Day), Quantity>,
    pub stock_shortfall: HashMap<SpeciesIndex, Quantity>,
    pub budget_over: Cost,
    pub budget_under: Cost,
}

impl SupplyPlan {
    pub fn new(variables: &Variables, model: &Model, status: SolveStatus) -> grb::Result<SupplyPlan> {
        let (budget_over, budget_under) = match variables.budget {
            Some((over, under)) => (
                nonzero_scalar(over.convert(model)?),
                nonzero_scalar(under.convert(model)?),
            ),
            None => (0.0, 0.0),
        };

        Ok(SupplyPlan {
            status,
            objective: model.get_attr(attr::ObjVal)?,
            purchases: nonzero(variables.x.convert(model)?),
            plantings: nonzero(variables.y.convert(model)?),
            inventory: nonzero(variables.inventory.convert(model)?),
            acquisition_trucks: nonzero(variables.z1.convert(model)?),
            distribution_trucks: nonzero(variables.z2.convert(model)?),
            waste: nonzero(variables.waste.convert(model)?),
            stock_shortfall: nonzero(variables.stock_shortfall.convert(model)?),
            budget_over,
            budget_under,
        })
    }

    /// Plants of species `s` bought on day `t`, across all suppliers
    pub fn purchased(&self, s: SpeciesIndex, t: Day) -> Quantity {
        self.purchases
            .iter()
            .filter(|((s2, _, t2), _)| *s2 == s && *t2 == t)
            .map(|(_, q)| q)
            .sum()
    }

    /// Plants of species `s` planted on day `t`, across all plots
    pub fn planted(&self, s: SpeciesIndex, t: Day) -> Quantity {
        self.plantings
            .iter()
            .filter(|((s2, _, t2), _)| *s2 == s && *t2 == t)
            .map(|(_, q)| q)
            .sum()
    }

    /// Depot inventory of species `s` at the end of day `t`
    pub fn stock(&self, s: SpeciesIndex, t: Day) -> Quantity {
        self.inventory.get(&(s, t)).cloned().unwrap_or(0.0)
    }

    /// Hectares planted at plot `g` over the horizon
    pub fn covered(&self, problem: &Problem, g: PlotIndex) -> f64 {
        self.plantings
            .iter()
            .filter(|((_, g2, _), _)| *g2 == g)
            .map(|((s, _, _), q)| q / problem.species()[*s].density)
            .sum()
    }
}
