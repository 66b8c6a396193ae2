/**
 * Heartbeat transmitter.
 *
 * Once per heartbeat period the sender snapshots the controller-published
 * `ElevatorInfo`, folds in the new/started order announcements, and
 * multicasts the JSON payload. New and started orders are each announced
 * for a fixed number of heartbeats so a few lost datagrams cannot hide an
 * announcement.
 *
 * A failed send means the network is gone: the controller is told once,
 * pending new orders are discarded (they would be stale after
 * reconnection), and the sender backs off before retrying.
 */

/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::warn;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::{Duration, Instant};

/***************************************/
/*           Local modules             */
/***************************************/
use crate::network::heartbeat::Heartbeat;
use crate::shared::{ControllerEvent, ElevatorInfo, Order};

/***************************************/
/*             Public API              */
/***************************************/
pub struct HeartbeatSender {
    socket: UdpSocket,
    target: SocketAddr,
    info_slot: Arc<Mutex<ElevatorInfo>>,
    pending_new_rx: cbc::Receiver<Order>,
    pending_started_rx: cbc::Receiver<Order>,
    event_tx: cbc::Sender<ControllerEvent>,
    active_new: Vec<(Order, Instant)>,
    active_started: Vec<(Order, Instant)>,
    period: Duration,
    broadcast_window: Duration,
    reconnect: Duration,
    connected: bool,
}

impl HeartbeatSender {
    pub fn new(
        socket: UdpSocket,
        target: SocketAddr,
        info_slot: Arc<Mutex<ElevatorInfo>>,
        pending_new_rx: cbc::Receiver<Order>,
        pending_started_rx: cbc::Receiver<Order>,
        event_tx: cbc::Sender<ControllerEvent>,
        period: Duration,
        broadcast_window: Duration,
        reconnect: Duration,
    ) -> HeartbeatSender {
        HeartbeatSender {
            socket,
            target,
            info_slot,
            pending_new_rx,
            pending_started_rx,
            event_tx,
            active_new: Vec::new(),
            active_started: Vec::new(),
            period,
            broadcast_window,
            reconnect,
            connected: true,
        }
    }

    pub fn run(mut self, interrupt: Arc<AtomicBool>) {
        while !interrupt.load(Ordering::SeqCst) {
            sleep(self.period);
            let heartbeat = self.build_heartbeat(Instant::now());
            let bytes = match heartbeat.encode() {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("failed to encode heartbeat: {}", e);
                    continue;
                }
            };
            match self.socket.send_to(&bytes, self.target) {
                Ok(_) => self.connected = true,
                Err(e) => self.on_send_failure(e),
            }
        }
    }

    fn build_heartbeat(&mut self, now: Instant) -> Heartbeat {
        self.active_new.retain(|(_, expires)| *expires > now);
        self.active_started.retain(|(_, expires)| *expires > now);

        // At most one order is drained from each buffer per tick, each
        // carried for the full broadcast window.
        if let Ok(order) = self.pending_new_rx.try_recv() {
            self.active_new.push((order, now + self.broadcast_window));
        }
        if let Ok(order) = self.pending_started_rx.try_recv() {
            self.active_started.push((order, now + self.broadcast_window));
        }

        let info = self.info_slot.lock().unwrap().clone();
        Heartbeat {
            floor: info.floor,
            direction: info.direction,
            orders: info.orders,
            new_orders: self.active_new.iter().map(|(o, _)| *o).collect(),
            started_orders: self.active_started.iter().map(|(o, _)| *o).collect(),
        }
    }

    fn on_send_failure(&mut self, e: std::io::Error) {
        warn!("heartbeat send failed, backing off: {}", e);
        if self.connected {
            self.connected = false;
            let _ = self.event_tx.send(ControllerEvent::LostConnection);
        }
        while self.pending_new_rx.try_recv().is_ok() {}
        self.active_new.clear();
        sleep(self.reconnect);
    }
}

/***************************************/
/*              Test API               */
/***************************************/
#[cfg(test)]
pub mod testing {
    use super::HeartbeatSender;
    use crate::network::heartbeat::Heartbeat;
    use std::time::Instant;

    impl HeartbeatSender {
        pub fn test_build_heartbeat(&mut self, now: Instant) -> Heartbeat {
            self.build_heartbeat(now)
        }

        pub fn test_fail_send(&mut self) {
            self.on_send_failure(std::io::Error::new(std::io::ErrorKind::Other, "no route"));
        }
    }
}
