/* 3rd party libraries */
use clap::{Arg, Command};
use crossbeam_channel as cbc;
use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::Builder;
use std::time::Duration;

/* Custom libraries */
use controller::Controller;
use hardware::{IoDevice, MemoryIo, NOT_WIRED};
use network::Network;
use poller::EdgePoller;
use shared::{ControllerEvent, Direction, ElevatorInfo, Order, OrderKind};
use timer::DoorTimer;

/* Modules */
mod config;
mod controller;
mod hardware;
mod network;
mod orders;
mod poller;
mod shared;
mod timer;

/* Main */
fn main() {
    env_logger::init();

    let matches = Command::new("heis")
        .about("One node of a multicast-coordinated elevator fleet")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .takes_value(true)
                .default_value("config.toml")
                .help("Path to the configuration file"),
        )
        .get_matches();

    // Load the configuration
    let config = unwrap_or_exit!(config::load_config(matches.value_of("config").unwrap()));
    let n_floors = config.elevator.num_floors;

    // Open the hardware; failing here is fatal
    let io: Arc<dyn IoDevice> = Arc::new(unwrap_or_exit!(MemoryIo::open()));

    // Initialize the event fabric
    let (event_tx, event_rx) = cbc::unbounded::<ControllerEvent>();
    let (pending_new_tx, pending_new_rx) = cbc::bounded::<Order>(32);
    let (pending_started_tx, pending_started_rx) = cbc::bounded::<Order>(32);
    let info_slot = Arc::new(Mutex::new(ElevatorInfo::new(n_floors)));
    let interrupt = Arc::new(AtomicBool::new(false));

    // SIGINT sets the interrupt flag and wakes the controller
    {
        let interrupt = interrupt.clone();
        let event_tx = event_tx.clone();
        unwrap_or_exit!(ctrlc::set_handler(move || {
            interrupt.store(true, Ordering::SeqCst);
            let _ = event_tx.send(ControllerEvent::StopPressed);
        }));
    }

    // Start the network module
    let network = unwrap_or_exit!(Network::new(
        &config.network,
        n_floors,
        config.cost,
        info_slot.clone(),
        pending_new_rx,
        pending_started_rx,
        event_tx.clone(),
        interrupt.clone(),
    ));
    info!("node id: {}", network.id);

    // Wire every input channel to its event
    let mut edge_poller = EdgePoller::new(
        io.clone(),
        event_tx.clone(),
        config.network.heartbeat_frequency,
        interrupt.clone(),
    );
    let channels = &config.channels;
    for floor in 0..n_floors {
        edge_poller.register(
            *channels.sensors.get(floor as usize).unwrap_or(&NOT_WIRED),
            ControllerEvent::FloorReached(floor),
        );
        edge_poller.register(
            *channels.cabin_buttons.get(floor as usize).unwrap_or(&NOT_WIRED),
            ControllerEvent::ButtonPressed(OrderKind::Cabin, floor),
        );
        edge_poller.register(
            channels.hall_button(Direction::Up, floor),
            ControllerEvent::ButtonPressed(OrderKind::HallUp, floor),
        );
        edge_poller.register(
            channels.hall_button(Direction::Down, floor),
            ControllerEvent::ButtonPressed(OrderKind::HallDown, floor),
        );
    }
    edge_poller.register(channels.stop_button, ControllerEvent::StopPressed);
    edge_poller.register(channels.obstruction, ControllerEvent::Obstruction);

    unwrap_or_exit!(Builder::new()
        .name("edge_poller".into())
        .spawn(move || edge_poller.run()));

    // Door timer
    let door_timer = DoorTimer::spawn(
        Duration::from_secs_f64(config.elevator.door_open_seconds),
        event_tx.clone(),
    );

    // The controller owns the main thread until shutdown
    let controller = Controller::new(
        &config.elevator,
        io,
        config.channels.clone(),
        door_timer,
        event_rx,
        pending_new_tx,
        pending_started_tx,
        info_slot,
        interrupt,
    );
    controller.run();
}
