use std::collections::{HashMap, HashSet};

use derive_more::{Deref, Display, From, Into};
use serde::{Deserialize, Serialize};
use typed_index_collections::TiVec;

use crate::error::{Error, Result};

/// The type used for plant quantities
pub type Quantity = f64;
/// The type used for durations, in minutes
pub type Minutes = f64;
/// The type used for cost.
pub type Cost = f64;

/// Travel time used for node pairs missing from the lookup. Large enough to make the arc unattractive, but
/// small enough to not cause numerical trouble in the solver.
pub const MISSING_TRAVEL_TIME: Minutes = 1e6;

#[derive(Deref, Debug, Display, PartialEq, Eq, PartialOrd, Ord, From, Into, Clone, Copy, Hash, Serialize)]
pub struct SpeciesIndex(usize);

#[derive(Deref, Debug, Display, PartialEq, Eq, PartialOrd, Ord, From, Into, Clone, Copy, Hash, Serialize)]
pub struct SupplierIndex(usize);

#[derive(Deref, Debug, Display, PartialEq, Eq, PartialOrd, Ord, From, Into, Clone, Copy, Hash, Serialize)]
pub struct PlotIndex(usize);

#[derive(Deref, Debug, Display, PartialEq, Eq, PartialOrd, Ord, From, Into, Clone, Copy, Hash, Serialize)]
pub struct VehicleIndex(usize);

/// A day of the planning horizon. Days are numbered from 1.
#[derive(Deref, Debug, Display, PartialEq, Eq, PartialOrd, Ord, From, Into, Clone, Copy, Hash, Serialize)]
pub struct Day(usize);

impl Day {
    /// The day before this one, or `None` for the first day of the horizon.
    pub fn previous(&self) -> Option<Day> {
        match self.0 {
            0 | 1 => None,
            t => Some(Day(t - 1)),
        }
    }
}

/// A node of the routing network: either the depot or a plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Node {
    Depot,
    Plot(PlotIndex),
}

#[derive(Debug, Clone)]
pub struct Species {
    /// Identifier of the species
    pub id: String,
    /// Plants per hectare
    pub density: f64,
    /// Warehouse area occupied by a single plant, in m²
    pub area_per_plant: f64,
    /// Treatment time needed per plant, in minutes
    pub treatment_minutes: Minutes,
}

#[derive(Debug, Clone)]
pub struct Supplier {
    pub id: String,
}

/// The terms under which a supplier offers a species.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offer {
    /// Unit cost, `None` if the supplier does not sell the species
    pub unit_cost: Option<Cost>,
    /// Whether the supplier currently has the species available
    pub available: bool,
}

impl Offer {
    /// The unit cost if the species can actually be bought from the supplier
    pub fn purchasable(&self) -> Option<Cost> {
        match self.available {
            true => self.unit_cost,
            false => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Plot {
    pub id: String,
    /// Hectares that must be reforested over the horizon
    pub hectares: f64,
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: String,
    /// The number of plants the vehicle can carry
    pub capacity: Quantity,
}

/// Weights of the goal programming objective
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Weights {
    /// Weight on the budget deviations (over and under)
    #[serde(default = "Weights::default_budget")]
    pub budget: f64,
    /// Weight on the wasted plants
    #[serde(default = "Weights::default_waste")]
    pub waste: f64,
    /// Weight on the shortfall with respect to the minimum stock
    #[serde(default = "Weights::default_stock")]
    pub stock: f64,
}

impl Weights {
    fn default_budget() -> f64 {
        1.0
    }
    fn default_waste() -> f64 {
        5.0
    }
    fn default_stock() -> f64 {
        10.0
    }
}

impl Default for Weights {
    fn default() -> Self {
        Weights {
            budget: Weights::default_budget(),
            waste: Weights::default_waste(),
            stock: Weights::default_stock(),
        }
    }
}

/// Scalar operating parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operations {
    /// The number of days in the planning horizon
    pub horizon: usize,
    /// Capacity of a truck used to acquire plants from suppliers
    pub acquisition_truck_capacity: Quantity,
    /// Capacity of a truck used to distribute plants to plots. Defaults to the acquisition truck capacity.
    #[serde(default)]
    pub distribution_truck_capacity: Option<Quantity>,
    /// Time needed to load an acquisition truck
    pub load_minutes: Minutes,
    /// Time needed to unload a distribution truck
    pub unload_minutes: Minutes,
    /// Length of a workday
    pub workday_minutes: Minutes,
    /// Area available in the depot warehouse, in m²
    pub warehouse_m2: f64,
    /// Maximum number of acquisition trips in a single day
    pub max_daily_trips: f64,
    /// Cost of planting a single plant
    #[serde(default = "Operations::default_planting_cost")]
    pub planting_unit_cost: Cost,
    /// Budget target for the entire horizon
    #[serde(default = "Operations::default_budget")]
    pub budget: Cost,
    /// Maximum fraction of purchased plants that may be wasted
    #[serde(default = "Operations::default_waste_fraction")]
    pub max_waste_fraction: f64,
    /// Desired stock of every species at the end of the horizon
    #[serde(default = "Operations::default_min_stock")]
    pub min_stock: Quantity,
    /// Penalty per wasted plant
    #[serde(default = "Operations::default_waste_penalty")]
    pub waste_penalty: Cost,
    /// Service time at each stop of a route. Defaults to the unload time.
    #[serde(default)]
    pub service_minutes: Option<Minutes>,
    #[serde(default)]
    pub weights: Weights,
}

impl Operations {
    fn default_planting_cost() -> Cost {
        1.0
    }
    fn default_budget() -> Cost {
        1e9
    }
    fn default_waste_fraction() -> f64 {
        0.1
    }
    fn default_min_stock() -> Quantity {
        10.0
    }
    fn default_waste_penalty() -> Cost {
        1.0
    }

    pub fn distribution_capacity(&self) -> Quantity {
        self.distribution_truck_capacity
            .unwrap_or(self.acquisition_truck_capacity)
    }

    pub fn service(&self) -> Minutes {
        self.service_minutes.unwrap_or(self.unload_minutes)
    }
}

/// Travel times between ordered pairs of nodes.
#[derive(Debug, Clone, Default)]
pub struct TravelTimes(HashMap<(Node, Node), Minutes>);

impl TravelTimes {
    pub fn new(times: HashMap<(Node, Node), Minutes>) -> Self {
        TravelTimes(times)
    }

    /// The travel time from `from` to `to`. Missing pairs are given a prohibitively large travel time.
    pub fn get(&self, from: Node, to: Node) -> Minutes {
        self.0
            .get(&(from, to))
            .cloned()
            .unwrap_or(MISSING_TRAVEL_TIME)
    }

    pub fn contains(&self, from: Node, to: Node) -> bool {
        self.0.contains_key(&(from, to))
    }
}

/// The full, validated parameter set of a planning scenario.
#[derive(Debug, Clone)]
pub struct Problem {
    species: TiVec<SpeciesIndex, Species>,
    suppliers: TiVec<SupplierIndex, Supplier>,
    /// The offer of every (species, supplier) pair
    offers: TiVec<SpeciesIndex, TiVec<SupplierIndex, Offer>>,
    plots: TiVec<PlotIndex, Plot>,
    vehicles: TiVec<VehicleIndex, Vehicle>,
    /// Identifier of the depot node
    depot: String,
    travel: TravelTimes,
    operations: Operations,
}

impl Problem {
    pub fn new(
        species: Vec<Species>,
        suppliers: Vec<Supplier>,
        offers: Vec<Vec<Offer>>,
        plots: Vec<Plot>,
        vehicles: Vec<Vehicle>,
        depot: String,
        travel: TravelTimes,
        operations: Operations,
    ) -> Result<Problem> {
        let inconsistent = |msg: String| Err(Error::DataInconsistency(msg));

        if operations.horizon == 0 {
            return inconsistent("the planning horizon must be at least one day".into());
        }
        if species.is_empty() {
            return inconsistent("there must be at least one species".into());
        }

        unique("species", species.iter().map(|s| s.id.as_str()))?;
        unique("supplier", suppliers.iter().map(|s| s.id.as_str()))?;
        unique("vehicle", vehicles.iter().map(|v| v.id.as_str()))?;
        unique(
            "node",
            plots
                .iter()
                .map(|p| p.id.as_str())
                .chain(std::iter::once(depot.as_str())),
        )?;

        for s in &species {
            if !(s.density > 0.0) {
                return inconsistent(format!("species {} has non-positive density", s.id));
            }
            if s.area_per_plant < 0.0 || s.treatment_minutes < 0.0 {
                return inconsistent(format!("species {} has a negative area or treatment time", s.id));
            }
        }

        if offers.len() != species.len() || offers.iter().any(|o| o.len() != suppliers.len()) {
            return inconsistent(format!(
                "expected an offer table of size {}x{}",
                species.len(),
                suppliers.len()
            ));
        }

        if offers.iter().flatten().any(|o| o.unit_cost.map_or(false, |c| c < 0.0)) {
            return inconsistent("negative unit cost".into());
        }

        if let Some(p) = plots.iter().find(|p| p.hectares < 0.0) {
            return inconsistent(format!("plot {} requires negative hectares", p.id));
        }

        if let Some(v) = vehicles.iter().find(|v| v.capacity < 0.0) {
            return inconsistent(format!("vehicle {} has negative capacity", v.id));
        }

        let scalars = [
            ("acquisition_truck_capacity", operations.acquisition_truck_capacity),
            ("distribution_truck_capacity", operations.distribution_capacity()),
            ("load_minutes", operations.load_minutes),
            ("unload_minutes", operations.unload_minutes),
            ("workday_minutes", operations.workday_minutes),
            ("warehouse_m2", operations.warehouse_m2),
            ("max_daily_trips", operations.max_daily_trips),
            ("max_waste_fraction", operations.max_waste_fraction),
            ("min_stock", operations.min_stock),
            ("service_minutes", operations.service()),
            ("planting_unit_cost", operations.planting_unit_cost),
            ("budget", operations.budget),
            ("waste_penalty", operations.waste_penalty),
            ("weights.budget", operations.weights.budget),
            ("weights.waste", operations.weights.waste),
            ("weights.stock", operations.weights.stock),
        ];
        if let Some((name, _)) = scalars.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return inconsistent(format!("operating parameter {name} must be a non-negative number"));
        }

        Ok(Problem {
            species: species.into(),
            suppliers: suppliers.into(),
            offers: offers.into_iter().map(TiVec::from).collect(),
            plots: plots.into(),
            vehicles: vehicles.into(),
            depot,
            travel,
            operations,
        })
    }

    pub fn species(&self) -> &TiVec<SpeciesIndex, Species> {
        &self.species
    }

    pub fn suppliers(&self) -> &TiVec<SupplierIndex, Supplier> {
        &self.suppliers
    }

    /// The offer of supplier `p` for species `s`
    pub fn offer(&self, s: SpeciesIndex, p: SupplierIndex) -> Offer {
        self.offers[s][p]
    }

    pub fn plots(&self) -> &TiVec<PlotIndex, Plot> {
        &self.plots
    }

    pub fn vehicles(&self) -> &TiVec<VehicleIndex, Vehicle> {
        &self.vehicles
    }

    pub fn operations(&self) -> &Operations {
        &self.operations
    }

    /// The days of the planning horizon, in order
    pub fn days(&self) -> impl Iterator<Item = Day> {
        (1..=self.operations.horizon).map(Day::from)
    }

    /// The travel time between two nodes
    pub fn travel_time(&self, from: Node, to: Node) -> Minutes {
        self.travel.get(from, to)
    }

    pub fn travel(&self) -> &TravelTimes {
        &self.travel
    }

    /// The identifier of a node
    pub fn node_id(&self, node: Node) -> &str {
        match node {
            Node::Depot => &self.depot,
            Node::Plot(g) => &self.plots[g].id,
        }
    }
}

/// Ensures that there are no duplicated identifiers
fn unique<'a>(kind: &str, ids: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(Error::DataInconsistency(format!("duplicate {kind} id {id}")));
        }
    }
    Ok(())
}
