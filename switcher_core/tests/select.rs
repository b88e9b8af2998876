use std::time::Duration;

use switcher_core::error::SwitchError;
use switcher_core::mocks::{Call, SpyRig};
use switcher_core::{FilamentState, Port, PortTable, SwitchOutcome};

#[test]
fn select_with_servo_seats_only_that_clutch() {
    let rig = SpyRig::new(4, FilamentState::Absent);
    let mut sw = rig.switcher(PortTable::default()).build().unwrap();

    sw.select_port(Port::new(2), true).unwrap();
    assert_eq!(
        rig.calls(),
        vec![
            Call::Clutch { index: 0, degrees: 90.0 },
            Call::Clutch { index: 1, degrees: 90.0 },
            Call::Clutch { index: 3, degrees: 90.0 },
            Call::Clutch { index: 2, degrees: 29.0 },
            Call::Dwell(Duration::from_secs(1)),
            Call::WaitMoves,
        ]
    );
    assert_eq!(sw.state().current(), Some(Port::new(2)));
    assert_eq!(sw.state().last(), None);
}

#[test]
fn select_without_servo_releases_everything() {
    let rig = SpyRig::new(4, FilamentState::Absent);
    let mut sw = rig.switcher(PortTable::default()).build().unwrap();
    sw.select_port(Port::new(2), true).unwrap();
    rig.clear();

    sw.select_port(Port::new(1), false).unwrap();
    let calls = rig.calls();
    let angles: Vec<(usize, f64)> = calls
        .iter()
        .filter_map(|c| match c {
            Call::Clutch { index, degrees } => Some((*index, *degrees)),
            _ => None,
        })
        .collect();
    assert_eq!(angles, vec![(0, 90.0), (1, 90.0), (2, 90.0), (3, 90.0)]);
    assert!(!calls.iter().any(|c| matches!(c, Call::FeederMove { .. } | Call::AxisMove { .. })));
    assert_eq!(sw.state().current(), Some(Port::new(1)));
    assert_eq!(sw.state().last(), Some(Port::new(2)));
}

#[test]
fn select_out_of_range_keeps_state() {
    let rig = SpyRig::new(4, FilamentState::Absent);
    let mut sw = rig.switcher(PortTable::default()).build().unwrap();
    sw.select_port(Port::new(0), false).unwrap();
    rig.clear();

    let err = sw.select_port(Port::new(9), true).expect_err("only four ports");
    assert!(matches!(
        err.downcast_ref::<SwitchError>(),
        Some(SwitchError::Config(_))
    ));
    assert!(rig.calls().is_empty());
    assert_eq!(sw.state().current(), Some(Port::new(0)));
}

#[test]
fn status_and_reset() {
    let rig = SpyRig::new(4, FilamentState::Present);
    let mut sw = rig.switcher(PortTable::default()).build().unwrap();
    sw.switch_port(Port::new(3)).unwrap();
    sw.select_port(Port::new(1), false).unwrap();

    let status = sw.status().unwrap();
    assert_eq!(status.current_port, Some(Port::new(1)));
    assert_eq!(status.last_port, Some(Port::new(3)));
    assert_eq!(status.sensor, FilamentState::Present);
    assert_eq!(status.last_switch, Some(SwitchOutcome::Assigned));

    rig.clear();
    sw.reset();
    assert!(rig.calls().is_empty(), "reset touches no hardware");
    let status = sw.status().unwrap();
    assert_eq!(status.current_port, None);
    assert_eq!(status.last_port, None);
    assert_eq!(status.last_switch, None);
    assert_eq!(sw.sensor_state().unwrap(), FilamentState::Present);
}
