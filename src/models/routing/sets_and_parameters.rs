use typed_index_collections::TiVec;

use crate::{
    demand::DailyDemand,
    problem::{Minutes, Node, Problem, Quantity, VehicleIndex},
};

/// Index of a node within a single routing instance
pub type LocalNode = usize;

/// The depot always has local index 0, followed by the demand nodes
pub const DEPOT: LocalNode = 0;

/// Sets for the daily routing model
#[derive(Debug)]
#[allow(non_snake_case)]
pub struct Sets {
    /// All nodes, depot included
    pub N: Vec<LocalNode>,
    /// Nodes with positive demand
    pub D: Vec<LocalNode>,
    /// Set of vehicles
    pub K: Vec<VehicleIndex>,
}

/// Parameters for the daily routing model
#[derive(Debug)]
pub struct Parameters {
    /// The network node corresponding to each local node
    pub nodes: Vec<Node>,
    /// Plants to deliver at each node. Zero for the depot.
    pub demand: Vec<Quantity>,
    /// Travel time between every pair of local nodes
    pub travel: Vec<Vec<Minutes>>,
    /// Plants that vehicle k can carry
    pub capacity: TiVec<VehicleIndex, Quantity>,
    /// Service time at every stop
    pub service: Minutes,
    /// Maximum duration of a route
    pub workday: Minutes,
}

#[allow(non_snake_case)]
impl Sets {
    pub fn new(problem: &Problem, demand: &DailyDemand) -> Sets {
        let n = demand.len();
        Sets {
            N: (0..=n).collect(),
            D: (1..=n).collect(),
            K: (0..problem.vehicles().len()).map(VehicleIndex::from).collect(),
        }
    }
}

impl Parameters {
    pub fn new(problem: &Problem, demand: &DailyDemand) -> Parameters {
        let nodes: Vec<Node> = std::iter::once(Node::Depot)
            .chain(demand.plots.keys().map(|g| Node::Plot(*g)))
            .collect();

        let quantities = std::iter::once(0.0)
            .chain(demand.plots.values().cloned())
            .collect();

        let travel = nodes
            .iter()
            .map(|i| {
                nodes
                    .iter()
                    .map(|j| match i == j {
                        true => 0.0,
                        false => problem.travel_time(*i, *j),
                    })
                    .collect()
            })
            .collect();

        let ops = problem.operations();
        Parameters {
            nodes,
            demand: quantities,
            travel,
            capacity: problem.vehicles().iter().map(|v| v.capacity).collect(),
            service: ops.service(),
            workday: ops.workday_minutes,
        }
    }
}
