/**
 * Cost-based bidding.
 *
 * Every node evaluates every announced hall order against every alive
 * peer with the same deterministic function, so all nodes agree on the
 * winner without any extra messaging. Ties fall to the lexicographically
 * smallest peer identifier.
 */

/***************************************/
/*           Local modules             */
/***************************************/
use crate::config::CostWeights;
use crate::shared::{ElevatorInfo, Order, OrderKind};

/// Price for `peer` to take `order`. Lower is better. Returns -1 when the
/// peer already holds the order, which ends the arbitration: an owned
/// order is never reassigned.
pub fn order_cost(order: &Order, peer: &ElevatorInfo, weights: &CostWeights) -> i64 {
    if peer.orders.has(order.floor, order.kind) {
        return -1;
    }

    let mut cost = (peer.floor as i64 - order.floor as i64).abs() * weights.floor_weight;
    for existing in peer.orders.iter() {
        // Cabin stops are the car's own business and do not count against it.
        let existing_direction = match existing.kind.direction() {
            Some(d) => d,
            None => continue,
        };
        let lo = peer.floor.min(existing.floor);
        let hi = peer.floor.max(existing.floor);
        if lo <= order.floor && order.floor <= hi && Some(existing_direction) != order.kind.direction()
        {
            cost += weights.direction_weight;
        }
        cost += weights.order_weight;
    }
    cost
}

/// Outcome of one arbitration round over the alive candidates.
#[derive(Debug, Clone, PartialEq)]
pub enum Arbitration {
    /// Some candidate already holds the order.
    AlreadyOwned,
    /// The named peer bids lowest (ties broken by identifier).
    Winner(String),
    /// Nobody was eligible to bid.
    NoCandidates,
}

pub fn arbitrate<'a, I>(order: &Order, candidates: I, weights: &CostWeights) -> Arbitration
where
    I: Iterator<Item = (&'a String, &'a ElevatorInfo)>,
{
    let mut best: Option<(i64, &'a String)> = None;
    for (id, info) in candidates {
        let cost = order_cost(order, info, weights);
        if cost < 0 {
            return Arbitration::AlreadyOwned;
        }
        let better = match best {
            None => true,
            Some((best_cost, best_id)) => {
                cost < best_cost || (cost == best_cost && id.as_str() < best_id.as_str())
            }
        };
        if better {
            best = Some((cost, id));
        }
    }
    match best {
        Some((_, id)) => Arbitration::Winner(id.clone()),
        None => Arbitration::NoCandidates,
    }
}

/// Sanity helper used by arbitration call sites: only hall orders are ever
/// put up for bidding.
pub fn biddable(order: &Order) -> bool {
    order.kind != OrderKind::Cabin
}
