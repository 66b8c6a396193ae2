/**
 * Debounced edge detection over the raw input channels.
 *
 * Every registered channel is sampled at the heartbeat frequency and
 * compared against its previous value; a 0 -> 1 transition enqueues the
 * registered event exactly once. Falling edges and steady levels enqueue
 * nothing, so holding a button or standing on a floor sensor never
 * re-fires. Channels marked not-wired are refused at registration.
 */

/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::hardware::{Channel, IoDevice, NOT_WIRED};
use crate::shared::ControllerEvent;

/***************************************/
/*             Public API              */
/***************************************/
struct WatchedChannel {
    channel: Channel,
    event: ControllerEvent,
    last: u8,
}

pub struct EdgePoller {
    io: Arc<dyn IoDevice>,
    event_tx: cbc::Sender<ControllerEvent>,
    period: Duration,
    interrupt: Arc<AtomicBool>,
    channels: Vec<WatchedChannel>,
}

impl EdgePoller {
    pub fn new(
        io: Arc<dyn IoDevice>,
        event_tx: cbc::Sender<ControllerEvent>,
        frequency: f64,
        interrupt: Arc<AtomicBool>,
    ) -> EdgePoller {
        EdgePoller {
            io,
            event_tx,
            period: Duration::from_secs_f64(1.0 / frequency),
            interrupt,
            channels: Vec::new(),
        }
    }

    pub fn register(&mut self, channel: Channel, event: ControllerEvent) {
        if channel == NOT_WIRED {
            return;
        }
        self.channels.push(WatchedChannel {
            channel,
            event,
            last: 0,
        });
    }

    pub fn run(mut self) {
        while !self.interrupt.load(Ordering::SeqCst) {
            sleep(self.period);
            self.sample();
        }
    }

    fn sample(&mut self) {
        for watched in self.channels.iter_mut() {
            match self.io.read_bit(watched.channel) {
                Ok(value) => {
                    if value == 1 && watched.last == 0 {
                        let _ = self.event_tx.send(watched.event.clone());
                    }
                    watched.last = value;
                }
                // A transient read fault counts as "unchanged"; the poller
                // keeps going.
                Err(e) => debug!("poll read failed: {}", e),
            }
        }
    }
}

/***************************************/
/*              Test API               */
/***************************************/
#[cfg(test)]
pub mod testing {
    use super::EdgePoller;

    impl EdgePoller {
        pub fn test_sample(&mut self) {
            self.sample()
        }

        pub fn test_watched_count(&self) -> usize {
            self.channels.len()
        }
    }
}
