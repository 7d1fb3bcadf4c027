use std::collections::BTreeMap;

use crate::{
    models::supply::SupplyPlan,
    problem::{Day, PlotIndex, Quantity},
};

/// The plants that must be delivered to each plot on a single day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyDemand {
    pub day: Day,
    /// Plants per plot. Only plots with positive demand are present.
    pub plots: BTreeMap<PlotIndex, Quantity>,
}

impl DailyDemand {
    /// Sums the plantings of `day` per plot, across all species.
    pub fn aggregate(plan: &SupplyPlan, day: Day) -> DailyDemand {
        let mut plots = BTreeMap::new();
        for ((_, g, t), quantity) in &plan.plantings {
            if *t == day && *quantity > 0.0 {
                *plots.entry(*g).or_insert(0.0) += quantity;
            }
        }

        DailyDemand { day, plots }
    }

    /// The demand of every day of the horizon, in order
    pub fn horizon(plan: &SupplyPlan, days: impl Iterator<Item = Day>) -> Vec<DailyDemand> {
        days.map(|day| DailyDemand::aggregate(plan, day)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.plots.is_empty()
    }

    /// The number of demand nodes
    pub fn len(&self) -> usize {
        self.plots.len()
    }

    pub fn total(&self) -> Quantity {
        self.plots.values().sum()
    }
}
