/**
 * The car's decision loop.
 *
 * The controller is the only thread that writes hardware outputs or
 * mutates the order set. Everything that happens to the car arrives as a
 * `ControllerEvent` on one queue: button edges and floor sensors from the
 * poller, door expiry from the timer, adjudicated orders, hall-light
 * updates and connection loss from the network. Handling an event may
 * stop or start the motor, open the door, relight the panel, persist the
 * cabin calls and publish a fresh snapshot for the heartbeat sender.
 *
 * # Fields
 * - `floor`:       Last floor sensor hit; meaningful after the first one.
 * - `direction`:   Current travel direction, starts downward.
 * - `moving`:      Whether a motion command is active.
 * - `orders`:      The authoritative order matrix for this car.
 * - `door_timer`:  Restartable dwell countdown.
 * - `info_slot`:   Single-writer snapshot read by the heartbeat sender.
 *
 * A handler that fails on hardware i/o is logged and the loop carries on;
 * the car keeps serving what it can.
 */

/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::Duration;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::config::ElevatorConfig;
use crate::hardware::{Channel, ChannelMap, IoDevice, IoError, MOTOR_STOP_LEVEL, NOT_WIRED};
use crate::orders::{backup, OrderSet};
use crate::shared::Direction::{Down, Up};
use crate::shared::{ControllerEvent, Direction, ElevatorInfo, Order, OrderKind};
use crate::timer::DoorTimer;

/***************************************/
/*             Constants               */
/***************************************/
/// Reversing the direction bit briefly before cutting power acts as a
/// mechanical brake.
const BRAKE_PULSE: Duration = Duration::from_millis(10);

/***************************************/
/*             Public API              */
/***************************************/
pub struct Controller {
    // Hardware
    io: Arc<dyn IoDevice>,
    channels: ChannelMap,

    // Car state
    floor: u8,
    direction: Direction,
    moving: bool,
    orders: OrderSet,
    door_timer: DoorTimer,

    // Fabric
    event_rx: cbc::Receiver<ControllerEvent>,
    pending_new_tx: cbc::Sender<Order>,
    pending_started_tx: cbc::Sender<Order>,
    info_slot: Arc<Mutex<ElevatorInfo>>,
    interrupt: Arc<AtomicBool>,

    // Config
    n_floors: u8,
    speed: u16,
    backup_path: PathBuf,
}

impl Controller {
    pub fn new(
        config: &ElevatorConfig,
        io: Arc<dyn IoDevice>,
        channels: ChannelMap,
        door_timer: DoorTimer,
        event_rx: cbc::Receiver<ControllerEvent>,
        pending_new_tx: cbc::Sender<Order>,
        pending_started_tx: cbc::Sender<Order>,
        info_slot: Arc<Mutex<ElevatorInfo>>,
        interrupt: Arc<AtomicBool>,
    ) -> Controller {
        let backup_path = PathBuf::from(&config.backup_path);
        Controller {
            io,
            channels,
            floor: 0,
            direction: Down,
            moving: false,
            orders: backup::load(&backup_path, config.num_floors),
            door_timer,
            event_rx,
            pending_new_tx,
            pending_started_tx,
            info_slot,
            interrupt,
            n_floors: config.num_floors,
            speed: config.speed,
            backup_path,
        }
    }

    pub fn run(mut self) {
        if let Err(e) = self.startup() {
            error!("startup i/o failed: {}", e);
        }

        loop {
            if self.interrupt.load(Ordering::SeqCst) {
                break;
            }
            match self.event_rx.recv() {
                Ok(event) => self.handle_event(event),
                Err(_) => break,
            }
        }

        // Drain whatever is queued, bring the car to rest, flush state.
        while self.event_rx.try_recv().is_ok() {}
        if let Err(e) = self.stop_elevator() {
            error!("failed to stop motor on shutdown: {}", e);
        }
        self.persist();
        info!("controller stopped");
    }

    /// Relight the panel from the persisted cabin calls and drive down
    /// until the first floor sensor tells us where we are.
    fn startup(&mut self) -> Result<(), IoError> {
        for floor in 0..self.n_floors {
            self.set_lamp(self.channels.hall_light(Up, floor), false)?;
            self.set_lamp(self.channels.hall_light(Down, floor), false)?;
            let lit = self.orders.has(floor, OrderKind::Cabin);
            self.set_lamp(self.channels.cabin_light(floor), lit)?;
        }
        self.io.clear_bit(self.channels.door_open)?;

        self.direction = Down;
        self.start_motor()?;
        self.publish();
        Ok(())
    }

    fn handle_event(&mut self, event: ControllerEvent) {
        let result = match event {
            ControllerEvent::ButtonPressed(kind, floor) => self.button_pressed(kind, floor),
            ControllerEvent::FloorReached(floor) => self.floor_reached(floor),
            ControllerEvent::DoorClosed => self.door_closed(),
            ControllerEvent::ReceiveOrder(order) => self.receive_order(order),
            ControllerEvent::LostConnection => self.lost_connection(),
            ControllerEvent::SetHallLight(direction, floor, value) => {
                self.set_lamp(self.channels.hall_light(direction, floor), value)
            }
            ControllerEvent::Obstruction => {
                if !self.door_timer.is_finished() {
                    self.door_timer.start();
                }
                Ok(())
            }
            ControllerEvent::StopPressed => {
                self.interrupt.store(true, Ordering::SeqCst);
                Ok(())
            }
        };
        if let Err(e) = result {
            error!("event handler failed: {}", e);
        }
    }

    /// Cabin presses are ours by definition; hall presses only go on the
    /// wire and come back through arbitration if we win them.
    fn button_pressed(&mut self, kind: OrderKind, floor: u8) -> Result<(), IoError> {
        let order = Order { kind, floor };
        if !order.is_valid(self.n_floors) || self.orders.has(floor, kind) {
            return Ok(());
        }
        match kind {
            OrderKind::Cabin => self.receive_order(order),
            _ => {
                if self.pending_new_tx.try_send(order).is_err() {
                    warn!("new-order buffer full, dropping {:?}", order);
                }
                Ok(())
            }
        }
    }

    fn receive_order(&mut self, order: Order) -> Result<(), IoError> {
        if !self.orders.add(order) {
            return Ok(());
        }
        if order.kind == OrderKind::Cabin {
            self.set_lamp(self.channels.cabin_light(order.floor), true)?;
        }
        if self.pending_started_tx.try_send(order).is_err() {
            warn!("started-order buffer full, dropping ack for {:?}", order);
        }
        self.should_drive()?;
        self.persist();
        self.publish();
        Ok(())
    }

    fn floor_reached(&mut self, floor: u8) -> Result<(), IoError> {
        if floor >= self.n_floors {
            return Ok(());
        }
        self.floor = floor;
        self.set_floor_indicator(floor)?;
        self.should_stop()?;
        self.persist();
        self.publish();
        Ok(())
    }

    fn should_stop(&mut self) -> Result<(), IoError> {
        let next_direction = self.find_direction();
        let floor = self.floor;

        if !self.orders.has_any() {
            self.stop_elevator()?;
        } else if self.orders.has(floor, OrderKind::hall(self.direction))
            || self.orders.has(floor, OrderKind::Cabin)
        {
            self.stop_elevator()?;
            self.orders.remove_at(floor, self.direction);
            if next_direction != self.direction {
                // Turning around here also serves the opposite call.
                self.orders.remove_at(floor, next_direction);
            }
            self.open_door()?;
        } else if next_direction != self.direction
            && self.orders.has(floor, OrderKind::hall(next_direction))
        {
            self.stop_elevator()?;
            self.orders.remove_at(floor, next_direction);
            self.open_door()?;
        } else if next_direction != self.direction {
            // Nothing to serve here but the run ends; settle and let
            // should_drive turn the car around.
            self.stop_elevator()?;
            self.should_drive()?;
        }
        Ok(())
    }

    fn should_drive(&mut self) -> Result<(), IoError> {
        if self.moving {
            return Ok(());
        }
        let next_direction = self.find_direction();
        let floor = self.floor;

        if self.orders.has(floor, OrderKind::hall(self.direction))
            || self.orders.has(floor, OrderKind::Cabin)
        {
            self.orders.remove_at(floor, self.direction);
            self.open_door()?;
        } else if next_direction != self.direction
            && self.orders.has(floor, OrderKind::hall(next_direction))
        {
            self.orders.remove_at(floor, next_direction);
            self.open_door()?;
        } else if self.orders.has_any() && self.door_timer.is_finished() {
            self.drive()?;
        }
        Ok(())
    }

    fn drive(&mut self) -> Result<(), IoError> {
        self.direction = self.find_direction();
        self.start_motor()
    }

    fn start_motor(&mut self) -> Result<(), IoError> {
        self.io
            .set_bit(self.channels.motor_direction, self.direction.motor_bit())?;
        self.io
            .write_analog(self.channels.motor, MOTOR_STOP_LEVEL + 4 * self.speed)?;
        self.moving = true;
        Ok(())
    }

    fn stop_elevator(&mut self) -> Result<(), IoError> {
        if !self.moving {
            return Ok(());
        }
        self.io.set_bit(
            self.channels.motor_direction,
            self.direction.opposite().motor_bit(),
        )?;
        sleep(BRAKE_PULSE);
        self.io.write_analog(self.channels.motor, MOTOR_STOP_LEVEL)?;
        self.moving = false;
        Ok(())
    }

    /// Keep going while something lies ahead, otherwise turn around.
    fn find_direction(&self) -> Direction {
        match self.direction {
            Up => {
                for floor in self.floor + 1..self.n_floors {
                    if self.orders.has_any_at(floor) {
                        return Up;
                    }
                }
                Down
            }
            Down => {
                for floor in (0..self.floor).rev() {
                    if self.orders.has_any_at(floor) {
                        return Down;
                    }
                }
                Up
            }
        }
    }

    fn open_door(&mut self) -> Result<(), IoError> {
        self.set_lamp(self.channels.cabin_light(self.floor), false)?;
        self.io.set_bit(self.channels.door_open, 1)?;
        self.door_timer.start();
        Ok(())
    }

    fn door_closed(&mut self) -> Result<(), IoError> {
        self.io.clear_bit(self.channels.door_open)?;
        self.should_drive()?;
        self.persist();
        self.publish();
        Ok(())
    }

    /// The network is gone: hall calls are no longer ours to keep. They
    /// come back from the peers once connectivity returns.
    fn lost_connection(&mut self) -> Result<(), IoError> {
        info!("connection lost, dropping hall orders");
        for floor in 0..self.n_floors {
            self.set_lamp(self.channels.hall_light(Up, floor), false)?;
            self.set_lamp(self.channels.hall_light(Down, floor), false)?;
        }
        self.orders.remove_all_non_cabin();
        self.persist();
        self.publish();
        Ok(())
    }

    fn set_floor_indicator(&self, floor: u8) -> Result<(), IoError> {
        let [low, high] = self.channels.floor_indicators;
        self.io.set_bit(low, floor & 0x01)?;
        self.io.set_bit(high, (floor & 0x02) >> 1)?;
        Ok(())
    }

    fn set_lamp(&self, channel: Channel, on: bool) -> Result<(), IoError> {
        if channel == NOT_WIRED {
            return Ok(());
        }
        if on {
            self.io.set_bit(channel, 1)
        } else {
            self.io.clear_bit(channel)
        }
    }

    fn publish(&self) {
        let mut info = self.info_slot.lock().unwrap();
        *info = ElevatorInfo {
            floor: self.floor,
            direction: self.direction,
            orders: self.orders.snapshot(),
        };
    }

    fn persist(&self) {
        if let Err(e) = backup::save(&self.backup_path, &self.orders) {
            warn!("failed to persist cabin orders: {}", e);
        }
    }
}

/***************************************/
/*              Test API               */
/***************************************/
