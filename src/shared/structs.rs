/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::Deserialize;
use serde::Serialize;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::orders::OrderSet;

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn opposite(&self) -> Direction {
        match *self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// Value written to the motor-direction bit. The motor interprets
    /// 0 as up and 1 as down.
    pub fn motor_bit(&self) -> u8 {
        match *self {
            Direction::Up => 0,
            Direction::Down => 1,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderKind {
    #[serde(rename = "HALL_UP")]
    HallUp,
    #[serde(rename = "HALL_DOWN")]
    HallDown,
    #[serde(rename = "CABIN")]
    Cabin,
}

impl OrderKind {
    /// The hall kind serving the given travel direction.
    pub fn hall(direction: Direction) -> OrderKind {
        match direction {
            Direction::Up => OrderKind::HallUp,
            Direction::Down => OrderKind::HallDown,
        }
    }

    /// Travel direction implied by the order kind. Cabin orders carry none.
    pub fn direction(&self) -> Option<Direction> {
        match *self {
            OrderKind::HallUp => Some(Direction::Up),
            OrderKind::HallDown => Some(Direction::Down),
            OrderKind::Cabin => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Order {
    pub kind: OrderKind,
    pub floor: u8,
}

impl Order {
    /// A hall-up call at the top floor and a hall-down call at the bottom
    /// floor do not exist on the panel and must never enter the system.
    pub fn is_valid(&self, n_floors: u8) -> bool {
        if self.floor >= n_floors {
            return false;
        }
        match self.kind {
            OrderKind::HallUp => self.floor != n_floors - 1,
            OrderKind::HallDown => self.floor != 0,
            OrderKind::Cabin => true,
        }
    }
}

/// Snapshot of one car as published by its controller and carried in every
/// heartbeat. Deep-copied on publish so the network threads read freely.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ElevatorInfo {
    pub floor: u8,
    pub direction: Direction,
    pub orders: OrderSet,
}

impl ElevatorInfo {
    pub fn new(n_floors: u8) -> ElevatorInfo {
        ElevatorInfo {
            floor: 0,
            direction: Direction::Down,
            orders: OrderSet::new(n_floors),
        }
    }
}

/// Events consumed by the controller's decision loop. Every producer thread
/// (poller, door timer, network) enqueues these; nothing else crosses the
/// thread boundary into the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    ButtonPressed(OrderKind, u8),
    FloorReached(u8),
    DoorClosed,
    ReceiveOrder(Order),
    LostConnection,
    SetHallLight(Direction, u8, bool),
    Obstruction,
    StopPressed,
}
