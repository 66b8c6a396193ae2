/**
 * Dense order matrix for one car.
 *
 * One boolean row per order kind, indexed by floor. The set is the single
 * source of truth for which orders this car is committed to serve and which
 * cabin lamps are lit. It is owned exclusively by the controller; everyone
 * else sees deep copies taken with `snapshot()`.
 *
 * Serialised form matches the heartbeat wire format:
 * `{ "UP": [...], "DOWN": [...], "IN": [...] }`.
 */

/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::Deserialize;
use serde::Serialize;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::shared::{Direction, Order, OrderKind};

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OrderSet {
    #[serde(rename = "UP")]
    up: Vec<bool>,
    #[serde(rename = "DOWN")]
    down: Vec<bool>,
    #[serde(rename = "IN")]
    cabin: Vec<bool>,
}

impl OrderSet {
    pub fn new(n_floors: u8) -> OrderSet {
        OrderSet {
            up: vec![false; n_floors as usize],
            down: vec![false; n_floors as usize],
            cabin: vec![false; n_floors as usize],
        }
    }

    pub fn n_floors(&self) -> u8 {
        self.cabin.len() as u8
    }

    fn row(&self, kind: OrderKind) -> &Vec<bool> {
        match kind {
            OrderKind::HallUp => &self.up,
            OrderKind::HallDown => &self.down,
            OrderKind::Cabin => &self.cabin,
        }
    }

    fn row_mut(&mut self, kind: OrderKind) -> &mut Vec<bool> {
        match kind {
            OrderKind::HallUp => &mut self.up,
            OrderKind::HallDown => &mut self.down,
            OrderKind::Cabin => &mut self.cabin,
        }
    }

    pub fn has(&self, floor: u8, kind: OrderKind) -> bool {
        *self.row(kind).get(floor as usize).unwrap_or(&false)
    }

    pub fn has_any_at(&self, floor: u8) -> bool {
        self.has(floor, OrderKind::HallUp)
            || self.has(floor, OrderKind::HallDown)
            || self.has(floor, OrderKind::Cabin)
    }

    pub fn has_any(&self) -> bool {
        self.up.iter().chain(&self.down).chain(&self.cabin).any(|&b| b)
    }

    /// Idempotent insertion. Orders that cannot exist (out of range,
    /// hall-up at the top floor, hall-down at the bottom) are rejected.
    /// Returns whether the set changed.
    pub fn add(&mut self, order: Order) -> bool {
        if !order.is_valid(self.n_floors()) {
            return false;
        }
        let cell = &mut self.row_mut(order.kind)[order.floor as usize];
        let changed = !*cell;
        *cell = true;
        changed
    }

    /// Clears the cabin order at `floor` and the hall order matching
    /// `direction`. The opposite-direction hall call belongs to a different
    /// run and is preserved.
    pub fn remove_at(&mut self, floor: u8, direction: Direction) {
        if floor >= self.n_floors() {
            return;
        }
        self.cabin[floor as usize] = false;
        self.row_mut(OrderKind::hall(direction))[floor as usize] = false;
    }

    /// Drops every hall call but keeps the cabin calls. Used when the
    /// network connection is declared lost.
    pub fn remove_all_non_cabin(&mut self) {
        self.up.iter_mut().for_each(|b| *b = false);
        self.down.iter_mut().for_each(|b| *b = false);
    }

    /// Immutable deep copy for heartbeats and persistence.
    pub fn snapshot(&self) -> OrderSet {
        self.clone()
    }

    /// Copy containing only the cabin row. This is the shape that goes to
    /// stable storage.
    pub fn restrict_to_cabin(&self) -> OrderSet {
        OrderSet {
            up: vec![false; self.up.len()],
            down: vec![false; self.down.len()],
            cabin: self.cabin.clone(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Order> + '_ {
        let kinds = [OrderKind::HallUp, OrderKind::HallDown, OrderKind::Cabin];
        kinds.into_iter().flat_map(move |kind| {
            self.row(kind)
                .iter()
                .enumerate()
                .filter(|(_, &set)| set)
                .map(move |(floor, _)| Order {
                    kind,
                    floor: floor as u8,
                })
        })
    }

    /// True when the set can have come from a well-behaved node with the
    /// same floor count: correct row lengths and no structurally
    /// impossible corner calls. Heartbeats failing this are discarded.
    pub fn is_well_formed(&self, n_floors: u8) -> bool {
        let n = n_floors as usize;
        self.up.len() == n
            && self.down.len() == n
            && self.cabin.len() == n
            && n > 0
            && !self.up[n - 1]
            && !self.down[0]
    }
}
