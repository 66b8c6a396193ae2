/**
 * Facilitates network communications for the elevator fleet.
 *
 * Heartbeats go out on IPv4 UDP multicast and come back in on a group-
 * joined socket; there is no loopback suppression, so this node hears its
 * own heartbeats and takes part in arbitration like any other peer. Peer
 * identity is the sender's source IP address.
 *
 * `Network::new` opens both sockets and spawns the sender and receiver
 * threads; everything after construction happens on those threads.
 */

/***************************************/
/*             Modules                 */
/***************************************/
pub mod coordinator;
pub mod cost;
pub mod heartbeat;
pub mod sender;

#[cfg(test)]
mod cost_tests;

/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::warn;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::thread::Builder;
use std::time::Duration;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::config::{CostWeights, NetworkConfig};
use crate::network::coordinator::Coordinator;
use crate::network::sender::HeartbeatSender;
use crate::shared::{ControllerEvent, ElevatorInfo, Order};

/***************************************/
/*             Constants               */
/***************************************/
/// Probed with a connected UDP socket to learn our outward-facing address;
/// no datagram is ever sent to it.
const IP_PROBE_ADDR: &str = "8.8.8.8:53";

const RECV_TIMEOUT: Duration = Duration::from_millis(100);
const MULTICAST_TTL: u32 = 2;

/***************************************/
/*             Public API              */
/***************************************/
pub struct Network {
    pub id: String,
}

impl Network {
    pub fn new(
        config: &NetworkConfig,
        n_floors: u8,
        weights: CostWeights,
        info_slot: Arc<Mutex<ElevatorInfo>>,
        pending_new_rx: cbc::Receiver<Order>,
        pending_started_rx: cbc::Receiver<Order>,
        event_tx: cbc::Sender<ControllerEvent>,
        interrupt: Arc<AtomicBool>,
    ) -> std::io::Result<Network> {
        let group: Ipv4Addr = config.mcast_group.parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("bad multicast group {}: {}", config.mcast_group, e),
            )
        })?;

        let id = match find_local_ip() {
            Some(ip) => ip.to_string(),
            None => {
                warn!("could not determine local IP, assuming offline single-node mode");
                "127.0.0.1".to_string()
            }
        };

        let tx_socket = UdpSocket::bind("0.0.0.0:0")?;
        tx_socket.set_multicast_ttl_v4(MULTICAST_TTL)?;
        let target = SocketAddr::from((group, config.mcast_port));

        let rx_socket = join_multicast(group, config.mcast_port)?;

        let heartbeat_sender = HeartbeatSender::new(
            tx_socket,
            target,
            info_slot,
            pending_new_rx,
            pending_started_rx,
            event_tx.clone(),
            config.heartbeat_period(),
            config.broadcast_window(),
            Duration::from_secs_f64(config.reconnect_seconds),
        );
        let sender_interrupt = interrupt.clone();
        Builder::new()
            .name("heartbeat_tx".into())
            .spawn(move || heartbeat_sender.run(sender_interrupt))?;

        let coordinator = Coordinator::new(
            id.clone(),
            n_floors,
            weights,
            config.peer_timeout(),
            config.broadcast_window(),
            event_tx,
        );
        Builder::new()
            .name("heartbeat_rx".into())
            .spawn(move || coordinator.run(rx_socket, interrupt))?;

        Ok(Network { id })
    }
}

/***************************************/
/*           Local functions           */
/***************************************/
fn find_local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect(IP_PROBE_ADDR).ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}

/// Group-joined receive socket. SO_REUSEADDR lets several nodes share the
/// port on one host during bench testing.
fn join_multicast(group: Ipv4Addr, port: u16) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)).into())?;
    let socket: UdpSocket = socket.into();
    socket.join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)?;
    socket.set_read_timeout(Some(RECV_TIMEOUT))?;
    Ok(socket)
}
