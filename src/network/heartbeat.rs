/***************************************/
/*        3rd party libraries          */
/***************************************/
use log::debug;
use serde::Deserialize;
use serde::Serialize;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::shared::{Direction, ElevatorInfo, Order};
use crate::orders::OrderSet;

/// One multicast state announcement. Unknown trailing fields from newer
/// nodes are accepted and ignored (serde default behaviour).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Heartbeat {
    pub floor: u8,
    pub direction: Direction,
    pub orders: OrderSet,
    #[serde(default)]
    pub new_orders: Vec<Order>,
    #[serde(default)]
    pub started_orders: Vec<Order>,
}

impl Heartbeat {
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Parses a received datagram. Anything malformed is dropped here and
    /// never reaches the protocol logic.
    pub fn decode(bytes: &[u8]) -> Option<Heartbeat> {
        match serde_json::from_slice(bytes) {
            Ok(heartbeat) => Some(heartbeat),
            Err(e) => {
                debug!("discarding malformed heartbeat: {}", e);
                None
            }
        }
    }

    /// A heartbeat is only believed when its payload could have come from
    /// a well-behaved node with our floor count.
    pub fn is_well_formed(&self, n_floors: u8) -> bool {
        self.orders.is_well_formed(n_floors)
            && self.floor < n_floors
            && self
                .new_orders
                .iter()
                .chain(&self.started_orders)
                .all(|o| o.is_valid(n_floors))
    }

    pub fn info(&self) -> ElevatorInfo {
        ElevatorInfo {
            floor: self.floor,
            direction: self.direction,
            orders: self.orders.snapshot(),
        }
    }
}
