use derive_more::Display;
use serde::Serialize;

use super::sets_and_parameters::{LocalNode, DEPOT};
use crate::problem::{Node, VehicleIndex};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnomalyKind {
    /// A node reached by the vehicle has no selected outgoing arc
    #[display(fmt = "dead end")]
    DeadEnd,
    /// A node has more than one selected outgoing arc for the same vehicle
    #[display(fmt = "branching")]
    Branching,
    /// The route grew beyond the number of demand nodes without returning to the depot
    #[display(fmt = "overlong")]
    Overlong,
    /// Some selected arcs of the vehicle are not part of its route from the depot
    #[display(fmt = "detached arcs")]
    Detached,
}

/// A vehicle whose selected arcs could not be turned into a route
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub vehicle: VehicleIndex,
    pub kind: AnomalyKind,
    /// The route as far as it could be followed
    pub partial: Vec<Node>,
}

/// Follows the selected arcs of a single vehicle from the depot until it returns there.
///
/// `arcs` are the selected (from, to) pairs of the vehicle. Fails if the arcs do not form a single
/// cycle through the depot, or if the route grows longer than `demand_nodes + 2` nodes.
pub fn follow(
    arcs: &[(LocalNode, LocalNode)],
    demand_nodes: usize,
) -> Result<Vec<LocalNode>, (AnomalyKind, Vec<LocalNode>)> {
    let mut route = vec![DEPOT];
    let mut current = DEPOT;

    loop {
        let mut successors = arcs.iter().filter(|(i, _)| *i == current).map(|(_, j)| *j);
        let next = match (successors.next(), successors.next()) {
            (Some(j), None) => j,
            (None, _) => return Err((AnomalyKind::DeadEnd, route)),
            (Some(_), Some(_)) => return Err((AnomalyKind::Branching, route)),
        };

        route.push(next);

        if next == DEPOT {
            break;
        }

        if route.len() > demand_nodes + 2 {
            return Err((AnomalyKind::Overlong, route));
        }

        current = next;
    }

    // every selected arc must have been traversed exactly once
    if route.len() - 1 != arcs.len() {
        return Err((AnomalyKind::Detached, route));
    }

    Ok(route)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_a_single_cycle() {
        let arcs = [(2, 0), (0, 3), (1, 2), (3, 1)];
        assert_eq!(follow(&arcs, 3), Ok(vec![0, 3, 1, 2, 0]));
    }

    #[test]
    fn single_stop() {
        assert_eq!(follow(&[(0, 1), (1, 0)], 1), Ok(vec![0, 1, 0]));
    }

    #[test]
    fn dead_end_is_flagged() {
        let result = follow(&[(0, 1), (1, 2)], 2);
        assert_eq!(result, Err((AnomalyKind::DeadEnd, vec![0, 1, 2])));
    }

    #[test]
    fn branching_is_flagged() {
        let result = follow(&[(0, 1), (1, 2), (1, 0), (2, 0)], 2);
        assert_eq!(result, Err((AnomalyKind::Branching, vec![0, 1])));
    }

    #[test]
    fn cycle_away_from_the_depot_terminates() {
        // 0 -> 1 -> 2 -> 3 -> 1 -> ... never returns to the depot
        let arcs = [(0, 1), (1, 2), (2, 3), (3, 1)];
        let (kind, partial) = follow(&arcs, 3).unwrap_err();
        assert_eq!(kind, AnomalyKind::Overlong);
        assert_eq!(partial.len(), 3 + 3);
    }

    #[test]
    fn detached_subtour_is_flagged() {
        let arcs = [(0, 1), (1, 0), (2, 3), (3, 2)];
        let (kind, partial) = follow(&arcs, 3).unwrap_err();
        assert_eq!(kind, AnomalyKind::Detached);
        assert_eq!(partial, vec![0, 1, 0]);
    }
}
