use rstest::rstest;
use switcher_core::error::SwitchError;
use switcher_core::mocks::{Call, FailAt, SpyRig};
use switcher_core::{FilamentState, Port, PortTable};
use switcher_hardware::error::HwError;

fn on_port_zero() -> (SpyRig, switcher_core::Switcher) {
    let rig = SpyRig::new(4, FilamentState::Present);
    rig.script_sensor([FilamentState::Absent]);
    let mut sw = rig.switcher(PortTable::default()).build().unwrap();
    sw.switch_port(Port::new(0)).unwrap();
    (rig, sw)
}

#[test]
fn typed_hardware_fault_maps_to_hardware_fault() {
    let (rig, mut sw) = on_port_zero();
    rig.fail_next(FailAt::FeederMove, HwError::Disabled("feeder stepper"));

    let err = sw.switch_port(Port::new(1)).expect_err("feeder fails");
    match err.downcast_ref::<SwitchError>() {
        Some(SwitchError::HardwareFault(msg)) => assert!(msg.contains("disabled"), "{msg}"),
        other => panic!("unexpected error variant: {other:?}"),
    }
    assert!(format!("{err:#}").contains("move feeder"));
    assert_eq!(sw.state().current(), Some(Port::new(0)), "no commit on fault");
}

#[test]
fn invalid_index_maps_to_config() {
    let (rig, mut sw) = on_port_zero();
    rig.fail_next(FailAt::Clutch, HwError::InvalidIndex { index: 1, len: 1 });

    let err = sw.feed(None).expect_err("clutch fails");
    assert!(matches!(
        err.downcast_ref::<SwitchError>(),
        Some(SwitchError::Config(_))
    ));
}

#[rstest]
#[case("servo index out of range", true)]
#[case("bus timeout", false)]
fn foreign_errors_fall_back_to_message(#[case] msg: &str, #[case] is_config: bool) {
    let (rig, mut sw) = on_port_zero();
    rig.fail_next(FailAt::Sensor, std::io::Error::other(msg.to_string()));

    let err = sw.status().expect_err("sensor fails");
    match err.downcast_ref::<SwitchError>() {
        Some(SwitchError::Config(m)) if is_config => assert_eq!(m, msg),
        Some(SwitchError::Hardware(m)) if !is_config => assert_eq!(m, msg),
        other => panic!("unexpected error variant: {other:?}"),
    }
}

#[test]
fn failure_is_one_shot() {
    let (rig, mut sw) = on_port_zero();
    rig.fail_next(FailAt::FeederEnable, std::io::Error::other("driver fault"));
    assert!(sw.move_feeder(5.0, true).is_err());
    assert_eq!(sw.move_feeder(5.0, true).unwrap(), (5.0, 50.0));
}

fn last_feeder_enable(calls: &[Call]) -> Option<bool> {
    calls.iter().rev().find_map(|c| match c {
        Call::FeederEnable(on) => Some(*on),
        _ => None,
    })
}

fn last_clutch_angle(calls: &[Call], index: usize) -> Option<f64> {
    calls.iter().rev().find_map(|c| match c {
        Call::Clutch { index: i, degrees } if *i == index => Some(*degrees),
        _ => None,
    })
}

#[rstest]
#[case(FailAt::FeederMove)]
#[case(FailAt::Clutch)]
fn failed_switch_disables_feeder_and_releases_clutches(#[case] at: FailAt) {
    let (rig, mut sw) = on_port_zero();
    rig.fail_next(at, HwError::Disabled("feeder stepper"));

    sw.switch_port(Port::new(1)).expect_err("injected failure");
    let calls = rig.calls();
    assert_eq!(last_feeder_enable(&calls), Some(false));
    for i in 0..4 {
        assert_eq!(last_clutch_angle(&calls, i), Some(90.0), "clutch {i}");
    }
}

#[test]
fn failed_feed_releases_its_clutch() {
    let (rig, mut sw) = on_port_zero();
    rig.clear();
    rig.fail_next(FailAt::FeederMove, std::io::Error::other("stall"));

    assert!(sw.feed(None).is_err());
    let calls = rig.calls();
    assert_eq!(last_feeder_enable(&calls), Some(false));
    assert_eq!(last_clutch_angle(&calls, 0), Some(90.0));
}

#[test]
fn failed_feeder_move_disables_feeder_only() {
    let (rig, mut sw) = on_port_zero();
    rig.clear();
    rig.fail_next(FailAt::FeederMove, std::io::Error::other("stall"));

    assert!(sw.move_feeder(5.0, false).is_err());
    let calls = rig.calls();
    assert_eq!(last_feeder_enable(&calls), Some(false));
    assert!(!calls.iter().any(|c| matches!(c, Call::Clutch { .. })));
}
