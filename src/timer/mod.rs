/**
 * Restartable one-shot door countdown.
 *
 * `start()` arms the timer for the configured dwell; starting again while
 * counting cancels and re-arms, so another stop at the same floor extends
 * the dwell measured from the latest start. Expiry enqueues
 * `ControllerEvent::DoorClosed` on the controller queue; the timer thread
 * never touches hardware or orders itself.
 */

/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::Builder;
use std::time::{Duration, Instant};

/***************************************/
/*           Local modules             */
/***************************************/
use crate::shared::ControllerEvent;

/***************************************/
/*             Public API              */
/***************************************/
pub struct DoorTimer {
    start_tx: cbc::Sender<()>,
    finished: Arc<AtomicBool>,
}

impl DoorTimer {
    pub fn spawn(dwell: Duration, event_tx: cbc::Sender<ControllerEvent>) -> DoorTimer {
        let (start_tx, start_rx) = cbc::unbounded::<()>();
        let finished = Arc::new(AtomicBool::new(true));

        let flag = finished.clone();
        Builder::new()
            .name("door_timer".into())
            .spawn(move || timer_loop(dwell, start_rx, event_tx, flag))
            .expect("failed to spawn door timer thread");

        DoorTimer { start_tx, finished }
    }

    pub fn start(&self) {
        self.finished.store(false, Ordering::SeqCst);
        let _ = self.start_tx.send(());
    }

    /// True when no countdown is active.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

// The thread holds only the event sender; dropping the DoorTimer handle
// closes start_tx and the loop exits.
fn timer_loop(
    dwell: Duration,
    start_rx: cbc::Receiver<()>,
    event_tx: cbc::Sender<ControllerEvent>,
    finished: Arc<AtomicBool>,
) {
    let mut deadline: Option<Instant> = None;
    loop {
        match deadline {
            None => match start_rx.recv() {
                Ok(()) => deadline = Some(Instant::now() + dwell),
                Err(_) => break,
            },
            Some(d) => {
                let timeout = d.saturating_duration_since(Instant::now());
                cbc::select! {
                    recv(start_rx) -> msg => match msg {
                        Ok(()) => deadline = Some(Instant::now() + dwell),
                        Err(_) => break,
                    },
                    default(timeout) => {
                        deadline = None;
                        finished.store(true, Ordering::SeqCst);
                        let _ = event_tx.send(ControllerEvent::DoorClosed);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod timer_tests;
