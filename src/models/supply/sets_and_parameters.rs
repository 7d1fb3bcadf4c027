use typed_index_collections::TiVec;

use crate::problem::{
    Cost, Day, Minutes, PlotIndex, Problem, Quantity, SpeciesIndex, SupplierIndex, Weights,
};

/// Slack allowed on the area coverage requirement, in hectares
pub const COVERAGE_TOLERANCE: f64 = 0.001;

/// Sets for the supply planning model
#[derive(Debug)]
#[allow(non_snake_case)]
pub struct Sets {
    /// Set of species
    pub S: Vec<SpeciesIndex>,
    /// Set of suppliers
    pub P: Vec<SupplierIndex>,
    /// Set of plots
    pub G: Vec<PlotIndex>,
    /// Set of days in the planning horizon
    pub T: Vec<Day>,
}

/// Parameters for the supply planning model
#[derive(Debug)]
pub struct Parameters {
    /// Plants per hectare of species s
    pub density: TiVec<SpeciesIndex, f64>,
    /// Warehouse area of a single plant of species s
    pub area: TiVec<SpeciesIndex, f64>,
    /// Treatment time of a single plant of species s
    pub treatment: TiVec<SpeciesIndex, Minutes>,
    /// Unit cost of species s at supplier p, `None` if it can not be bought there
    pub cost: TiVec<SpeciesIndex, TiVec<SupplierIndex, Option<Cost>>>,
    /// Hectares to reforest at plot g
    pub hectares: TiVec<PlotIndex, f64>,
    /// Capacity of an acquisition truck
    pub acquisition_capacity: Quantity,
    /// Capacity of a distribution truck
    pub distribution_capacity: Quantity,
    pub load_time: Minutes,
    pub unload_time: Minutes,
    pub workday: Minutes,
    /// Warehouse area at the depot
    pub warehouse: f64,
    /// Maximum number of acquisition trips per day
    pub max_trips: f64,
    /// Cost of planting a single plant
    pub planting_cost: Cost,
    pub budget: Cost,
    /// Maximum fraction of the purchases that may be wasted
    pub waste_fraction: f64,
    /// Desired inventory of each species at the end of the horizon
    pub min_stock: Quantity,
    pub waste_penalty: Cost,
    pub weights: Weights,
}

#[allow(non_snake_case)]
impl Sets {
    pub fn new(problem: &Problem) -> Sets {
        Sets {
            S: (0..problem.species().len()).map(SpeciesIndex::from).collect(),
            P: (0..problem.suppliers().len()).map(SupplierIndex::from).collect(),
            G: (0..problem.plots().len()).map(PlotIndex::from).collect(),
            T: problem.days().collect(),
        }
    }
}

impl Parameters {
    pub fn new(problem: &Problem, sets: &Sets) -> Parameters {
        let ops = problem.operations();
        let species = problem.species();

        let cost = sets
            .S
            .iter()
            .map(|s| {
                sets.P
                    .iter()
                    .map(|p| problem.offer(*s, *p).purchasable())
                    .collect()
            })
            .collect();

        Parameters {
            density: species.iter().map(|s| s.density).collect(),
            area: species.iter().map(|s| s.area_per_plant).collect(),
            treatment: species.iter().map(|s| s.treatment_minutes).collect(),
            cost,
            hectares: problem.plots().iter().map(|g| g.hectares).collect(),
            acquisition_capacity: ops.acquisition_truck_capacity,
            distribution_capacity: ops.distribution_capacity(),
            load_time: ops.load_minutes,
            unload_time: ops.unload_minutes,
            workday: ops.workday_minutes,
            warehouse: ops.warehouse_m2,
            max_trips: ops.max_daily_trips,
            planting_cost: ops.planting_unit_cost,
            budget: ops.budget,
            waste_fraction: ops.max_waste_fraction,
            min_stock: ops.min_stock,
            waste_penalty: ops.waste_penalty,
            weights: ops.weights,
        }
    }

    /// Whether species `s` can be bought from supplier `p`
    pub fn available(&self, s: SpeciesIndex, p: SupplierIndex) -> bool {
        self.cost[s][p].is_some()
    }
}
