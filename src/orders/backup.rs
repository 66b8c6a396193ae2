/***************************************/
/*        3rd party libraries          */
/***************************************/
use log::warn;
use serde::Deserialize;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::orders::OrderSet;
use crate::shared::{Order, OrderKind};

/// Cabin calls survive a restart; hall calls must not, the network
/// re-advertises those through the surviving peers.
#[derive(Serialize, Deserialize)]
struct CabBackup {
    cab_calls: Vec<bool>,
}

/// Writes the cabin-only restriction of `orders` to `path`. Crash-safe:
/// the file is written next to the target and renamed into place.
pub fn save(path: &Path, orders: &OrderSet) -> std::io::Result<()> {
    let cabin = orders.restrict_to_cabin();
    let backup = CabBackup {
        cab_calls: (0..cabin.n_floors())
            .map(|f| cabin.has(f, OrderKind::Cabin))
            .collect(),
    };
    let toml_string = toml::to_string(&backup)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    let tmp = path.with_extension("tmp");
    let mut file = fs::File::create(&tmp)?;
    file.write_all(toml_string.as_bytes())?;
    file.sync_all()?;
    fs::rename(&tmp, path)
}

/// Loads the persisted cabin set. A missing or corrupt file yields an
/// empty set; restart must never fail on bad storage.
pub fn load(path: &Path, n_floors: u8) -> OrderSet {
    let mut orders = OrderSet::new(n_floors);
    let contents = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => return orders,
    };
    let backup: CabBackup = match toml::from_str(&contents) {
        Ok(b) => b,
        Err(e) => {
            warn!("corrupt order backup {}: {}", path.display(), e);
            return orders;
        }
    };
    for (floor, &set) in backup.cab_calls.iter().take(n_floors as usize).enumerate() {
        if set {
            orders.add(Order {
                kind: OrderKind::Cabin,
                floor: floor as u8,
            });
        }
    }
    orders
}

/***************************************/
/*             Unit tests              */
/***************************************/
