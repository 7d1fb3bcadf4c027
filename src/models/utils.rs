use std::{collections::HashMap, fmt::Debug, hash::Hash, ops::Range};

use grb::prelude::*;
use log::trace;
use serde::Serialize;

use crate::{
    config::SolverConfig,
    error::{Error, Result},
};

/// Values at or below this are not considered materially nonzero
pub const NONZERO: f64 = 0.1;

/// Binary variables with a value above this are considered selected
pub const SELECTED: f64 = 0.5;

/// How a solve concluded, when it produced a usable solution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolveStatus {
    /// Proven optimal
    Optimal,
    /// Feasible, but not proven optimal
    Feasible,
}

/// Creates a model with its own environment, so that no solver state is shared between solves.
pub fn create_model(name: &str, config: &SolverConfig) -> Result<Model> {
    let env = Env::new("").map_err(|e| Error::SolverUnavailable(e.to_string()))?;
    let mut model =
        Model::with_env(name, env).map_err(|e| Error::SolverUnavailable(e.to_string()))?;

    model.set_param(param::OutputFlag, config.solver_output as i32)?;
    if let Some(limit) = config.time_limit {
        model.set_param(param::TimeLimit, limit)?;
    }

    Ok(model)
}

/// Creates one variable per index, named after the index
pub fn sparse_vars<K: Hash + Eq + Debug + Copy>(
    indices: impl IntoIterator<Item = K>,
    model: &mut Model,
    vtype: VarType,
    bounds: &Range<f64>,
    base_name: &str,
) -> grb::Result<HashMap<K, Var>> {
    let indices = indices.into_iter();
    let mut vars = HashMap::with_capacity(indices.size_hint().0);

    for k in indices {
        let var = model.add_var(
            &format!("{}_{:?}", base_name, k),
            vtype,
            0.0,
            bounds.start,
            bounds.end,
            std::iter::empty(),
        )?;
        vars.insert(k, var);
    }

    trace!("Created {} {} variables", vars.len(), base_name);
    Ok(vars)
}

/// Optimizes the model and maps the terminal status onto the solve outcome.
pub fn optimize(model: &mut Model) -> Result<SolveStatus> {
    model.optimize()?;

    match model.status()? {
        Status::Optimal => Ok(SolveStatus::Optimal),
        Status::SubOptimal => Ok(SolveStatus::Feasible),
        Status::Infeasible | Status::InfOrUnbd => Err(Error::Infeasible),
        Status::TimeLimit => Err(Error::TimeLimit),
        other => Err(Error::SolveInconclusive(format!("{:?}", other))),
    }
}

/// Trait that converts gurobi variables to their value in the current solution
pub trait ConvertVars {
    type Out;
    fn convert(&self, model: &Model) -> grb::Result<Self::Out>;
}

impl ConvertVars for Var {
    type Out = f64;

    fn convert(&self, model: &Model) -> grb::Result<Self::Out> {
        model.get_obj_attr(attr::X, self)
    }
}

impl<K: Hash + Eq + Copy> ConvertVars for HashMap<K, Var> {
    type Out = HashMap<K, f64>;

    fn convert(&self, model: &Model) -> grb::Result<Self::Out> {
        let mut out = HashMap::with_capacity(self.len());
        for (k, var) in self {
            out.insert(*k, var.convert(model)?);
        }
        Ok(out)
    }
}

/// Keeps only the materially nonzero entries of a solution
pub fn nonzero<K: Hash + Eq>(values: HashMap<K, f64>) -> HashMap<K, f64> {
    values.into_iter().filter(|(_, v)| *v > NONZERO).collect()
}

/// A scalar value, zeroed if it is not materially nonzero
pub fn nonzero_scalar(value: f64) -> f64 {
    match value > NONZERO {
        true => value,
        false => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonzero_drops_small_values() {
        let values: HashMap<_, _> = [(1, 0.05), (2, 0.1), (3, 0.11), (4, 7.0), (5, -3.0)]
            .into_iter()
            .collect();
        let kept = nonzero(values);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[&3], 0.11);
        assert_eq!(kept[&4], 7.0);
        assert_eq!(nonzero_scalar(0.09), 0.0);
        assert_eq!(nonzero_scalar(2.5), 2.5);
    }
}
