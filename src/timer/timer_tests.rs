/*
 * Unit tests for the door timer.
 *
 * The unit tests follows the Arrange, Act, Assert pattern.
 */

/***************************************/
/*             Unit tests              */
/***************************************/
use crossbeam_channel::unbounded;
use std::thread::sleep;
use std::time::Duration;

use crate::shared::ControllerEvent;
use crate::timer::DoorTimer;

#[test]
fn test_timer_fires_once_after_dwell() {
    // Arrange
    let (event_tx, event_rx) = unbounded();
    let timer = DoorTimer::spawn(Duration::from_millis(50), event_tx);

    // Act
    timer.start();
    assert!(!timer.is_finished());
    sleep(Duration::from_millis(120));

    // Assert
    assert!(timer.is_finished());
    assert_eq!(event_rx.try_recv(), Ok(ControllerEvent::DoorClosed));
    assert!(event_rx.try_recv().is_err());
}

#[test]
fn test_restart_extends_dwell_from_latest_start() {
    // Arrange
    let (event_tx, event_rx) = unbounded();
    let timer = DoorTimer::spawn(Duration::from_millis(80), event_tx);

    // Act
    timer.start();
    sleep(Duration::from_millis(50));
    timer.start();
    sleep(Duration::from_millis(50));

    // Assert: 100 ms after the first start, but only 50 ms after the
    // latest, so the countdown is still running.
    assert!(!timer.is_finished());
    assert!(event_rx.try_recv().is_err());

    sleep(Duration::from_millis(80));
    assert!(timer.is_finished());
    assert_eq!(event_rx.try_recv(), Ok(ControllerEvent::DoorClosed));
}

#[test]
fn test_timer_is_finished_before_first_start() {
    let (event_tx, _event_rx) = unbounded();
    let timer = DoorTimer::spawn(Duration::from_millis(50), event_tx);
    assert!(timer.is_finished());
}
