/**
 * Hardware abstraction for the elevator board.
 *
 * The controller and the edge poller talk to the physical car through the
 * `IoDevice` trait: digital reads/writes addressed by 16-bit channels
 * (high byte = subdevice, low byte = line) plus one analog motor channel.
 * A channel value of -1 means the line is not wired on the board; every
 * consumer skips it silently.
 *
 * `MemoryIo` is a thread-safe in-memory board used by the binary when no
 * physical driver is linked, and by the unit tests to observe lamp, motor
 * and indicator writes.
 */

/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::shared::Direction;

/***************************************/
/*             Constants               */
/***************************************/
pub type Channel = i32;

/// Sentinel for panel positions that have no physical line (top-floor up
/// button, bottom-floor down button and their lamps).
pub const NOT_WIRED: Channel = -1;

/// Analog level that holds the motor still. Motion is commanded as
/// `MOTOR_STOP_LEVEL + 4 * speed` with the direction in a separate bit.
pub const MOTOR_STOP_LEVEL: u16 = 2048;

/***************************************/
/*              Errors                 */
/***************************************/
#[derive(Debug, Error)]
pub enum IoError {
    #[error("could not open i/o device: {0}")]
    Init(String),
    #[error("read failed on channel {channel:#x}")]
    Read { channel: Channel },
    #[error("write failed on channel {channel:#x}")]
    Write { channel: Channel },
}

/***************************************/
/*             Public API              */
/***************************************/
pub trait IoDevice: Send + Sync {
    fn set_bit(&self, channel: Channel, value: u8) -> Result<(), IoError>;
    fn clear_bit(&self, channel: Channel) -> Result<(), IoError>;
    fn read_bit(&self, channel: Channel) -> Result<u8, IoError>;
    fn write_analog(&self, channel: Channel, value: u16) -> Result<(), IoError>;
}

/// In-memory `IoDevice`. All registers start at zero.
pub struct MemoryIo {
    bits: Mutex<HashMap<Channel, u8>>,
    analog: Mutex<HashMap<Channel, u16>>,
}

impl MemoryIo {
    pub fn open() -> Result<MemoryIo, IoError> {
        Ok(MemoryIo {
            bits: Mutex::new(HashMap::new()),
            analog: Mutex::new(HashMap::new()),
        })
    }

    /// Current value of a digital channel, 0 if never written.
    pub fn bit(&self, channel: Channel) -> u8 {
        *self.bits.lock().unwrap().get(&channel).unwrap_or(&0)
    }

    /// Current value of an analog channel, 0 if never written.
    pub fn analog(&self, channel: Channel) -> u16 {
        *self.analog.lock().unwrap().get(&channel).unwrap_or(&0)
    }
}

impl IoDevice for MemoryIo {
    fn set_bit(&self, channel: Channel, value: u8) -> Result<(), IoError> {
        if channel == NOT_WIRED {
            return Ok(());
        }
        self.bits.lock().unwrap().insert(channel, value & 1);
        Ok(())
    }

    fn clear_bit(&self, channel: Channel) -> Result<(), IoError> {
        self.set_bit(channel, 0)
    }

    fn read_bit(&self, channel: Channel) -> Result<u8, IoError> {
        if channel == NOT_WIRED {
            return Ok(0);
        }
        Ok(*self.bits.lock().unwrap().get(&channel).unwrap_or(&0))
    }

    fn write_analog(&self, channel: Channel, value: u16) -> Result<(), IoError> {
        if channel == NOT_WIRED {
            return Ok(());
        }
        self.analog.lock().unwrap().insert(channel, value);
        Ok(())
    }
}

/***************************************/
/*            Channel map              */
/***************************************/
/// Where every button, sensor, lamp and actuator sits on the board.
/// Loaded from the `[channels]` config section; the default is the classic
/// 4-floor layout.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ChannelMap {
    pub sensors: Vec<Channel>,
    pub up_buttons: Vec<Channel>,
    pub down_buttons: Vec<Channel>,
    pub cabin_buttons: Vec<Channel>,
    pub up_lights: Vec<Channel>,
    pub down_lights: Vec<Channel>,
    pub cabin_lights: Vec<Channel>,
    pub floor_indicators: [Channel; 2],
    pub motor: Channel,
    pub motor_direction: Channel,
    pub door_open: Channel,
    pub stop_button: Channel,
    pub obstruction: Channel,
}

impl Default for ChannelMap {
    fn default() -> ChannelMap {
        ChannelMap {
            sensors: vec![0x204, 0x205, 0x206, 0x207],
            up_buttons: vec![0x311, 0x310, 0x201, NOT_WIRED],
            down_buttons: vec![NOT_WIRED, 0x200, 0x202, 0x203],
            cabin_buttons: vec![0x315, 0x314, 0x313, 0x312],
            up_lights: vec![0x309, 0x308, 0x306, NOT_WIRED],
            down_lights: vec![NOT_WIRED, 0x307, 0x305, 0x304],
            cabin_lights: vec![0x30d, 0x30c, 0x30b, 0x30a],
            floor_indicators: [0x301, 0x300],
            motor: 0x100,
            motor_direction: 0x30f,
            door_open: 0x303,
            stop_button: 0x316,
            obstruction: 0x317,
        }
    }
}

impl ChannelMap {
    pub fn hall_button(&self, direction: Direction, floor: u8) -> Channel {
        let row = match direction {
            Direction::Up => &self.up_buttons,
            Direction::Down => &self.down_buttons,
        };
        *row.get(floor as usize).unwrap_or(&NOT_WIRED)
    }

    pub fn hall_light(&self, direction: Direction, floor: u8) -> Channel {
        let row = match direction {
            Direction::Up => &self.up_lights,
            Direction::Down => &self.down_lights,
        };
        *row.get(floor as usize).unwrap_or(&NOT_WIRED)
    }

    pub fn cabin_light(&self, floor: u8) -> Channel {
        *self.cabin_lights.get(floor as usize).unwrap_or(&NOT_WIRED)
    }
}
