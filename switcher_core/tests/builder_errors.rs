use switcher_core::error::BuildError;
use switcher_core::mocks::SpyRig;
use switcher_core::{
    FilamentState, GeometryCfg, Port, PortConfig, PortTable, SpeedCfg, SwitchCfg, Switcher,
};
use rstest::rstest;

#[rstest]
fn builder_missing_sensor_yields_typed_build_error() {
    let rig = SpyRig::new(4, FilamentState::Absent);
    let err = Switcher::builder()
        .with_clutches(rig.clutch_bank())
        .with_feeder(rig.feeder())
        .with_axis(rig.axis())
        .with_barrier(rig.barrier())
        // missing with_sensor()
        .build()
        .expect_err("should fail with MissingSensor");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingSensor) => {}
        other => panic!("expected MissingSensor, got: {other:?}"),
    }
}

#[rstest]
fn builder_without_anything_reports_clutches_first() {
    let err = Switcher::builder().build().expect_err("empty builder");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingClutches)
    ));
}

#[rstest]
fn clutch_bank_smaller_than_port_table_is_rejected() {
    let rig = SpyRig::new(2, FilamentState::Absent);
    let err = rig
        .switcher(PortTable::default())
        .build()
        .expect_err("4 ports, 2 clutches");
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::ClutchBankTooSmall { clutches, ports }) => {
            assert_eq!((*clutches, *ports), (2, 4));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[rstest]
fn larger_clutch_bank_is_fine() {
    let rig = SpyRig::new(4, FilamentState::Absent);
    let ports = PortTable::new(vec![PortConfig::stock(Port::new(0))]).unwrap();
    assert!(rig.switcher(ports).build().is_ok());
}

#[rstest]
#[case::zero_speed(SwitchCfg { speeds: SpeedCfg { slow: 0.0, ..SpeedCfg::default() }, ..SwitchCfg::default() })]
#[case::nan_speed(SwitchCfg { speeds: SpeedCfg { unload: f64::NAN, ..SpeedCfg::default() }, ..SwitchCfg::default() })]
#[case::margin_past_gear(SwitchCfg { geometry: GeometryCfg { sensor_to_gear_margin: 40.0, ..GeometryCfg::default() }, ..SwitchCfg::default() })]
fn invalid_runtime_config_is_rejected(#[case] cfg: SwitchCfg) {
    let rig = SpyRig::new(4, FilamentState::Absent);
    let err = rig
        .switcher(PortTable::default())
        .with_config(cfg)
        .build()
        .expect_err("invalid config");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidConfig(_))
    ));
}
