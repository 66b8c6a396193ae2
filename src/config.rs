/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::hardware::ChannelMap;

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub elevator: ElevatorConfig,
    pub network: NetworkConfig,
    pub cost: CostWeights,
    pub channels: ChannelMap,
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct ElevatorConfig {
    pub num_floors: u8,
    pub door_open_seconds: f64,
    pub speed: u16,
    pub backup_path: String,
}

impl Default for ElevatorConfig {
    fn default() -> ElevatorConfig {
        ElevatorConfig {
            num_floors: 4,
            door_open_seconds: 3.0,
            speed: 25,
            backup_path: "orderqueue.backup".to_string(),
        }
    }
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct NetworkConfig {
    pub mcast_group: String,
    pub mcast_port: u16,
    pub heartbeat_frequency: f64,
    pub broadcast_heartbeats: u32,
    pub timeout_limit: f64,
    pub reconnect_seconds: f64,
}

impl Default for NetworkConfig {
    fn default() -> NetworkConfig {
        NetworkConfig {
            mcast_group: "224.1.1.1".to_string(),
            mcast_port: 5007,
            heartbeat_frequency: 100.0,
            broadcast_heartbeats: 5,
            timeout_limit: 0.5,
            reconnect_seconds: 5.0,
        }
    }
}

impl NetworkConfig {
    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.heartbeat_frequency)
    }

    /// How long a new/started order stays in outgoing heartbeats, and how
    /// long an announced order may wait for its winner to start it.
    pub fn broadcast_window(&self) -> Duration {
        Duration::from_secs_f64(self.broadcast_heartbeats as f64 / self.heartbeat_frequency)
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_limit)
    }
}

/// Tuning knobs for the bidding cost function. Deliberately configuration,
/// not constants.
#[derive(Deserialize, Clone, Copy)]
#[serde(default)]
pub struct CostWeights {
    pub floor_weight: i64,
    pub order_weight: i64,
    pub direction_weight: i64,
}

impl Default for CostWeights {
    fn default() -> CostWeights {
        CostWeights {
            floor_weight: 1,
            order_weight: 5,
            direction_weight: 2,
        }
    }
}

/***************************************/
/*             Public API              */
/***************************************/
/// Reads the configuration file. A missing file is fine (defaults apply);
/// a file that exists but does not parse is a startup error.
pub fn load_config(path: &str) -> Result<Config, String> {
    if !Path::new(path).exists() {
        return Ok(Config::default());
    }
    let config_str =
        fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path, e))?;
    toml::from_str(&config_str).map_err(|e| format!("failed to parse {}: {}", path, e))
}

/***************************************/
/*             Unit tests              */
/***************************************/
