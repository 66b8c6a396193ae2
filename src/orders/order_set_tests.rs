/*
 * Unit tests for the order matrix.
 *
 * The unit tests follows the Arrange, Act, Assert pattern.
 */

/***************************************/
/*             Unit tests              */
/***************************************/
use crate::orders::OrderSet;
use crate::shared::Direction::{Down, Up};
use crate::shared::{Order, OrderKind};

fn order(kind: OrderKind, floor: u8) -> Order {
    Order { kind, floor }
}

#[test]
fn test_add_is_idempotent() {
    // Arrange
    let mut orders = OrderSet::new(4);

    // Act
    let first = orders.add(order(OrderKind::Cabin, 2));
    let second = orders.add(order(OrderKind::Cabin, 2));

    // Assert
    assert!(first);
    assert!(!second);
    assert!(orders.has(2, OrderKind::Cabin));
}

#[test]
fn test_add_rejects_impossible_corner_calls() {
    let mut orders = OrderSet::new(4);

    assert!(!orders.add(order(OrderKind::HallUp, 3)));
    assert!(!orders.add(order(OrderKind::HallDown, 0)));
    assert!(!orders.add(order(OrderKind::Cabin, 4)));
    assert!(!orders.has_any());
}

#[test]
fn test_remove_at_preserves_opposite_hall_call() {
    // Arrange
    let mut orders = OrderSet::new(4);
    orders.add(order(OrderKind::HallUp, 1));
    orders.add(order(OrderKind::HallDown, 1));
    orders.add(order(OrderKind::Cabin, 1));

    // Act
    orders.remove_at(1, Up);

    // Assert
    assert!(!orders.has(1, OrderKind::HallUp));
    assert!(!orders.has(1, OrderKind::Cabin));
    assert!(orders.has(1, OrderKind::HallDown));
}

#[test]
fn test_remove_all_non_cabin_keeps_cabin_calls() {
    // Arrange
    let mut orders = OrderSet::new(4);
    orders.add(order(OrderKind::HallUp, 0));
    orders.add(order(OrderKind::HallDown, 3));
    orders.add(order(OrderKind::Cabin, 2));

    // Act
    orders.remove_all_non_cabin();

    // Assert
    assert!(!orders.has(0, OrderKind::HallUp));
    assert!(!orders.has(3, OrderKind::HallDown));
    assert!(orders.has(2, OrderKind::Cabin));
}

#[test]
fn test_queries_cover_all_kinds() {
    let mut orders = OrderSet::new(4);
    assert!(!orders.has_any());
    assert!(!orders.has_any_at(1));

    orders.add(order(OrderKind::HallDown, 1));
    assert!(orders.has_any());
    assert!(orders.has_any_at(1));
    assert!(!orders.has_any_at(2));
}

#[test]
fn test_iter_yields_every_present_order() {
    // Arrange
    let mut orders = OrderSet::new(4);
    orders.add(order(OrderKind::HallUp, 0));
    orders.add(order(OrderKind::HallDown, 2));
    orders.add(order(OrderKind::Cabin, 3));

    // Act
    let collected: Vec<Order> = orders.iter().collect();

    // Assert
    assert_eq!(collected.len(), 3);
    assert!(collected.contains(&order(OrderKind::HallUp, 0)));
    assert!(collected.contains(&order(OrderKind::HallDown, 2)));
    assert!(collected.contains(&order(OrderKind::Cabin, 3)));
}

#[test]
fn test_snapshot_is_a_deep_copy() {
    // Arrange
    let mut orders = OrderSet::new(4);
    orders.add(order(OrderKind::Cabin, 1));

    // Act
    let snapshot = orders.snapshot();
    orders.remove_at(1, Down);

    // Assert
    assert!(snapshot.has(1, OrderKind::Cabin));
    assert!(!orders.has(1, OrderKind::Cabin));
}

#[test]
fn test_serialize_round_trips_through_wire_format() {
    // Arrange
    let mut orders = OrderSet::new(4);
    orders.add(order(OrderKind::HallUp, 1));
    orders.add(order(OrderKind::Cabin, 3));

    // Act
    let json = serde_json::to_string(&orders).unwrap();
    let back: OrderSet = serde_json::from_str(&json).unwrap();

    // Assert
    assert_eq!(back, orders);
    assert!(json.contains("\"UP\""));
    assert!(json.contains("\"DOWN\""));
    assert!(json.contains("\"IN\""));
}

#[test]
fn test_well_formedness_checks_lengths_and_corners() {
    let orders = OrderSet::new(4);
    assert!(orders.is_well_formed(4));
    assert!(!orders.is_well_formed(3));

    // A peer claiming hall-up at the top floor is lying about its panel.
    let bad: OrderSet = serde_json::from_str(
        "{\"UP\":[false,false,false,true],\"DOWN\":[false,false,false,false],\"IN\":[false,false,false,false]}",
    )
    .unwrap();
    assert!(!bad.is_well_formed(4));
}
