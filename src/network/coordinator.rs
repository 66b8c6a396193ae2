/**
 * Receiver-side protocol state.
 *
 * The coordinator owns the table of peers as seen from this node and runs
 * the distributed order assignment on top of it: cost arbitration for
 * announced hall orders, the two-phase new -> started handoff, takeover of
 * orders held by dead peers, and the fleet-wide hall-light union. It never
 * touches hardware or the local order set; every decision leaves as a
 * `ControllerEvent`.
 *
 * # Fields
 * - `local_id`:        This node's identity (its source IP as peers see it).
 * - `peers`:           Alive peers, keyed by source IP, refreshed per heartbeat.
 * - `awaiting_start`:  Hall orders assigned to a remote winner that has not
 *                      yet acknowledged them in `started_orders`.
 * - `hall_lights`:     Last published union of all alive peers' hall calls.
 * - `event_tx`:        Queue into the controller's decision loop.
 *
 * All timing is passed in as `Instant` parameters so the protocol is a
 * pure function of (heartbeats, clock); the socket loop in `run` feeds it.
 */

/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::{debug, info};
use std::collections::HashMap;
use std::collections::HashSet;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/***************************************/
/*           Local modules             */
/***************************************/
use crate::config::CostWeights;
use crate::network::cost::{arbitrate, biddable, Arbitration};
use crate::network::heartbeat::Heartbeat;
use crate::shared::{ControllerEvent, Direction, ElevatorInfo, Order, OrderKind};

/***************************************/
/*       Public data structures        */
/***************************************/
pub struct PeerView {
    pub last_seen: Instant,
    pub info: ElevatorInfo,
}

struct PendingStart {
    winner: String,
    deadline: Instant,
    excluded: HashSet<String>,
}

struct HallLights {
    up: Vec<bool>,
    down: Vec<bool>,
}

impl HallLights {
    fn new(n_floors: u8) -> HallLights {
        HallLights {
            up: vec![false; n_floors as usize],
            down: vec![false; n_floors as usize],
        }
    }

    fn cell(&mut self, direction: Direction, floor: u8) -> &mut bool {
        match direction {
            Direction::Up => &mut self.up[floor as usize],
            Direction::Down => &mut self.down[floor as usize],
        }
    }
}

/***************************************/
/*             Public API              */
/***************************************/
pub struct Coordinator {
    local_id: String,
    n_floors: u8,
    weights: CostWeights,
    peer_timeout: Duration,
    start_window: Duration,
    peers: HashMap<String, PeerView>,
    awaiting_start: HashMap<Order, PendingStart>,
    hall_lights: HallLights,
    event_tx: cbc::Sender<ControllerEvent>,
}

impl Coordinator {
    pub fn new(
        local_id: String,
        n_floors: u8,
        weights: CostWeights,
        peer_timeout: Duration,
        start_window: Duration,
        event_tx: cbc::Sender<ControllerEvent>,
    ) -> Coordinator {
        Coordinator {
            local_id,
            n_floors,
            weights,
            peer_timeout,
            start_window,
            peers: HashMap::new(),
            awaiting_start: HashMap::new(),
            hall_lights: HallLights::new(n_floors),
            event_tx,
        }
    }

    /// Blocking receive loop. The 100 ms read timeout guarantees that
    /// timeout handling runs even when the network is silent.
    pub fn run(mut self, socket: UdpSocket, interrupt: Arc<AtomicBool>) {
        let mut buf = [0u8; 1024];
        while !interrupt.load(Ordering::SeqCst) {
            match socket.recv_from(&mut buf) {
                Ok((n, src)) => {
                    if let Some(heartbeat) = Heartbeat::decode(&buf[..n]) {
                        self.handle_heartbeat(&src.ip().to_string(), heartbeat, Instant::now());
                    }
                }
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(e) => debug!("heartbeat receive failed: {}", e),
            }
            self.handle_timeouts(Instant::now());
        }
    }

    pub fn handle_heartbeat(&mut self, peer_id: &str, heartbeat: Heartbeat, now: Instant) {
        if !heartbeat.is_well_formed(self.n_floors) {
            debug!("discarding ill-formed heartbeat from {}", peer_id);
            return;
        }
        if !self.peers.contains_key(peer_id) {
            info!("new peer on network: {}", peer_id);
        }
        self.peers.insert(
            peer_id.to_string(),
            PeerView {
                last_seen: now,
                info: heartbeat.info(),
            },
        );
        self.handle_started_orders(peer_id, &heartbeat.started_orders);
        self.handle_new_orders(&heartbeat.new_orders, now);
        self.sync_hall_lights();
    }

    pub fn handle_timeouts(&mut self, now: Instant) {
        // Dead peers first: their hall orders go back into arbitration,
        // their cabin orders stay with the passengers inside that car.
        let dead: Vec<String> = self
            .peers
            .iter()
            .filter(|(_, view)| now.duration_since(view.last_seen) > self.peer_timeout)
            .map(|(id, _)| id.clone())
            .collect();
        for id in dead {
            let view = match self.peers.remove(&id) {
                Some(view) => view,
                None => continue,
            };
            info!("peer {} declared dead, redistributing its hall orders", id);

            // Orders announced to the dead peer but never started would be
            // lost with it; rebid them right away.
            let orphaned: Vec<(Order, HashSet<String>)> = self
                .awaiting_start
                .iter()
                .filter(|(_, pending)| pending.winner == id)
                .map(|(order, pending)| (*order, pending.excluded.clone()))
                .collect();
            for (order, mut excluded) in orphaned {
                self.awaiting_start.remove(&order);
                excluded.insert(id.clone());
                self.assign(order, excluded, now);
            }

            for order in view.info.orders.iter().filter(biddable) {
                let mut excluded = HashSet::new();
                excluded.insert(id.clone());
                self.assign(order, excluded, now);
            }
        }

        // Winners that did not start their order inside the broadcast
        // window are treated as gone for that order and bid out again.
        let expired: Vec<Order> = self
            .awaiting_start
            .iter()
            .filter(|(_, pending)| pending.deadline <= now)
            .map(|(order, _)| *order)
            .collect();
        for order in expired {
            if let Some(pending) = self.awaiting_start.remove(&order) {
                let mut excluded = pending.excluded;
                excluded.insert(pending.winner);
                self.assign(order, excluded, now);
            }
        }
    }

    fn handle_started_orders(&mut self, peer_id: &str, started: &[Order]) {
        for order in started {
            let acknowledged = self
                .awaiting_start
                .get(order)
                .map(|pending| pending.winner == peer_id)
                .unwrap_or(false);
            if acknowledged {
                self.awaiting_start.remove(order);
            }
        }
    }

    fn handle_new_orders(&mut self, new_orders: &[Order], now: Instant) {
        for order in new_orders {
            if !biddable(order) {
                continue;
            }
            // Announcements repeat for several heartbeats; an order already
            // waiting on its winner keeps its deadline.
            if self.awaiting_start.contains_key(order) {
                continue;
            }
            self.assign(*order, HashSet::new(), now);
        }
    }

    fn assign(&mut self, order: Order, excluded: HashSet<String>, now: Instant) {
        let candidates = self
            .peers
            .iter()
            .filter(|(id, _)| !excluded.contains(*id))
            .map(|(id, view)| (id, &view.info));
        match arbitrate(&order, candidates, &self.weights) {
            Arbitration::AlreadyOwned => {}
            Arbitration::NoCandidates => {
                debug!("no candidates for {:?}, dropping", order);
            }
            Arbitration::Winner(id) if id == self.local_id => {
                let _ = self.event_tx.send(ControllerEvent::ReceiveOrder(order));
            }
            Arbitration::Winner(id) => {
                self.awaiting_start.insert(
                    order,
                    PendingStart {
                        winner: id,
                        deadline: now + self.start_window,
                        excluded,
                    },
                );
            }
        }
    }

    /// Union of all alive peers' hall calls, published as one event per
    /// changed lamp so every car shows the same hall lights.
    fn sync_hall_lights(&mut self) {
        for floor in 0..self.n_floors {
            for direction in [Direction::Up, Direction::Down] {
                let lit = self
                    .peers
                    .values()
                    .any(|view| view.info.orders.has(floor, OrderKind::hall(direction)));
                let cell = self.hall_lights.cell(direction, floor);
                if *cell != lit {
                    *cell = lit;
                    let _ = self
                        .event_tx
                        .send(ControllerEvent::SetHallLight(direction, floor, lit));
                }
            }
        }
    }
}

/***************************************/
/*              Test API               */
/***************************************/
