use std::{
    collections::{hash_map::Entry, HashMap},
    path::Path,
};

use log::{debug, warn};
use serde::Deserialize;

use crate::{
    error::{Error, Result},
    problem::{Node, Offer, Operations, Plot, PlotIndex, Problem, Species, Supplier, TravelTimes, Vehicle},
};

/// The on-disk representation of a planning scenario.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub species: Vec<RawSpecies>,
    pub suppliers: Vec<String>,
    #[serde(default)]
    pub offers: Vec<RawOffer>,
    pub plots: Vec<RawPlot>,
    pub vehicles: Vec<RawVehicle>,
    pub depot: String,
    #[serde(default)]
    pub travel_times: Vec<RawTravelTime>,
    pub operations: Operations,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSpecies {
    pub id: String,
    pub density: f64,
    pub area_per_plant: f64,
    pub treatment_minutes: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawOffer {
    pub species: String,
    pub supplier: String,
    /// `null` when the supplier does not sell the species
    pub unit_cost: Option<f64>,
    #[serde(default = "RawOffer::default_available")]
    pub available: bool,
}

impl RawOffer {
    fn default_available() -> bool {
        true
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPlot {
    pub id: String,
    pub hectares: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawVehicle {
    pub id: String,
    pub capacity: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTravelTime {
    pub from: String,
    pub to: String,
    pub minutes: f64,
}

impl Scenario {
    /// Reads a scenario from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Scenario> {
        let file = std::fs::File::open(path.as_ref())?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Resolves all identifiers and validates the scenario into a `Problem`
    pub fn into_problem(self) -> Result<Problem> {
        let species_index = index_of(self.species.iter().map(|s| s.id.as_str()));
        let supplier_index = index_of(self.suppliers.iter().map(|s| s.as_str()));
        let plot_index = index_of(self.plots.iter().map(|p| p.id.as_str()));

        let mut offers = vec![vec![Offer::default(); self.suppliers.len()]; self.species.len()];
        for offer in &self.offers {
            let s = lookup(&species_index, &offer.species, "species")?;
            let p = lookup(&supplier_index, &offer.supplier, "supplier")?;
            offers[s][p] = Offer {
                unit_cost: offer.unit_cost,
                available: offer.available,
            };
        }

        let node = |id: &str| -> Result<Node> {
            if id == self.depot {
                Ok(Node::Depot)
            } else {
                lookup(&plot_index, id, "node").map(|g| Node::Plot(PlotIndex::from(g)))
            }
        };

        let mut travel = HashMap::with_capacity(self.travel_times.len());
        for entry in &self.travel_times {
            if !entry.minutes.is_finite() || entry.minutes < 0.0 {
                return Err(Error::DataInconsistency(format!(
                    "travel time {} -> {} must be a non-negative number",
                    entry.from, entry.to
                )));
            }
            match travel.entry((node(&entry.from)?, node(&entry.to)?)) {
                Entry::Occupied(_) => warn!(
                    "duplicate travel time {} -> {}, keeping the first",
                    entry.from, entry.to
                ),
                Entry::Vacant(e) => {
                    e.insert(entry.minutes);
                }
            }
        }

        // every plot must be reachable from the depot, and the depot from every plot
        for (g, plot) in self.plots.iter().enumerate() {
            let g = Node::Plot(PlotIndex::from(g));
            if !travel.contains_key(&(Node::Depot, g)) || !travel.contains_key(&(g, Node::Depot)) {
                return Err(Error::DataInconsistency(format!(
                    "missing travel time between the depot {} and plot {}",
                    self.depot, plot.id
                )));
            }
        }

        debug!(
            "Parsed scenario with {} species, {} suppliers, {} plots, {} vehicles and {} travel times",
            self.species.len(),
            self.suppliers.len(),
            self.plots.len(),
            self.vehicles.len(),
            travel.len()
        );

        Problem::new(
            self.species
                .into_iter()
                .map(|s| Species {
                    id: s.id,
                    density: s.density,
                    area_per_plant: s.area_per_plant,
                    treatment_minutes: s.treatment_minutes,
                })
                .collect(),
            self.suppliers.into_iter().map(|id| Supplier { id }).collect(),
            offers,
            self.plots
                .into_iter()
                .map(|p| Plot {
                    id: p.id,
                    hectares: p.hectares,
                })
                .collect(),
            self.vehicles
                .into_iter()
                .map(|v| Vehicle {
                    id: v.id,
                    capacity: v.capacity,
                })
                .collect(),
            self.depot,
            TravelTimes::new(travel),
            self.operations,
        )
    }
}

impl TryFrom<Scenario> for Problem {
    type Error = Error;

    fn try_from(scenario: Scenario) -> Result<Problem> {
        scenario.into_problem()
    }
}

fn index_of<'a>(ids: impl Iterator<Item = &'a str>) -> HashMap<String, usize> {
    ids.enumerate().map(|(i, id)| (id.to_string(), i)).collect()
}

fn lookup(index: &HashMap<String, usize>, id: &str, kind: &str) -> Result<usize> {
    index
        .get(id)
        .cloned()
        .ok_or_else(|| Error::DataInconsistency(format!("unknown {kind} {id}")))
}
