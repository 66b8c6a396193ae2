/*
 * Unit tests for the bidding cost function.
 *
 * The unit tests follows the Arrange, Act, Assert pattern.
 */

/***************************************/
/*             Unit tests              */
/***************************************/
use std::collections::HashMap;

use crate::config::CostWeights;
use crate::network::cost::{arbitrate, order_cost, Arbitration};
use crate::shared::Direction::{Down, Up};
use crate::shared::{Direction, ElevatorInfo, Order, OrderKind};

fn weights() -> CostWeights {
    CostWeights {
        floor_weight: 1,
        order_weight: 5,
        direction_weight: 2,
    }
}

fn idle_car(floor: u8, direction: Direction) -> ElevatorInfo {
    let mut info = ElevatorInfo::new(4);
    info.floor = floor;
    info.direction = direction;
    info
}

fn hall_down(floor: u8) -> Order {
    Order {
        kind: OrderKind::HallDown,
        floor,
    }
}

#[test]
fn test_cost_is_weighted_floor_distance_for_idle_car() {
    let order = hall_down(1);

    assert_eq!(order_cost(&order, &idle_car(0, Up), &weights()), 1);
    assert_eq!(order_cost(&order, &idle_car(3, Up), &weights()), 2);
    assert_eq!(order_cost(&order, &idle_car(1, Down), &weights()), 0);
}

#[test]
fn test_owning_peer_costs_minus_one() {
    // Arrange
    let mut owner = idle_car(0, Up);
    owner.orders.add(hall_down(1));

    // Act & Assert: an owned order is never rebid
    assert_eq!(order_cost(&hall_down(1), &owner, &weights()), -1);
}

#[test]
fn test_each_existing_hall_order_adds_order_weight() {
    // Arrange
    let mut busy = idle_car(0, Up);
    busy.orders.add(Order { kind: OrderKind::HallUp, floor: 2 });

    // Act
    let cost = order_cost(&hall_down(3), &busy, &weights());

    // Assert: distance 3, one extra order (+5); same floor span but the
    // candidate lies outside [0, 2] so no direction penalty
    assert_eq!(cost, 3 + 5);
}

#[test]
fn test_opposing_order_on_the_way_adds_direction_weight() {
    // Arrange: car at 0 already serving hall-up at 3; a hall-down at 1
    // sits inside that run with the opposite direction
    let mut busy = idle_car(0, Up);
    busy.orders.add(Order { kind: OrderKind::HallUp, floor: 3 });

    // Act
    let cost = order_cost(&hall_down(1), &busy, &weights());

    // Assert: distance 1 + order 5 + direction 2
    assert_eq!(cost, 8);
}

#[test]
fn test_cabin_orders_cost_nothing() {
    // Arrange
    let mut busy = idle_car(0, Up);
    busy.orders.add(Order { kind: OrderKind::Cabin, floor: 2 });

    // Act & Assert
    assert_eq!(order_cost(&hall_down(1), &busy, &weights()), 1);
}

#[test]
fn test_arbitrate_picks_cheapest_peer() {
    // Arrange: the hall-call-steal scenario, A at floor 0, B at floor 3
    let mut peers = HashMap::new();
    peers.insert("10.0.0.1".to_string(), idle_car(0, Down));
    peers.insert("10.0.0.9".to_string(), idle_car(3, Down));

    // Act
    let outcome = arbitrate(&hall_down(1), peers.iter(), &weights());

    // Assert
    assert_eq!(outcome, Arbitration::Winner("10.0.0.1".to_string()));
}

#[test]
fn test_arbitrate_breaks_ties_by_peer_id() {
    // Arrange: both cars equally far from the order
    let mut peers = HashMap::new();
    peers.insert("10.0.0.9".to_string(), idle_car(0, Down));
    peers.insert("10.0.0.1".to_string(), idle_car(2, Down));

    // Act
    let outcome = arbitrate(&hall_down(1), peers.iter(), &weights());

    // Assert: equal cost 1, lexicographically smaller id wins everywhere
    assert_eq!(outcome, Arbitration::Winner("10.0.0.1".to_string()));
}

#[test]
fn test_arbitrate_reports_owned_and_empty_cases() {
    let mut peers: HashMap<String, ElevatorInfo> = HashMap::new();
    assert_eq!(
        arbitrate(&hall_down(1), peers.iter(), &weights()),
        Arbitration::NoCandidates
    );

    let mut owner = idle_car(1, Down);
    owner.orders.add(hall_down(1));
    peers.insert("10.0.0.2".to_string(), owner);
    assert_eq!(
        arbitrate(&hall_down(1), peers.iter(), &weights()),
        Arbitration::AlreadyOwned
    );
}
