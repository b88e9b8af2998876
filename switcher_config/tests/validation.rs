use rstest::rstest;
use switcher_config::load_toml;

fn validate_err(toml: &str) -> String {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("config should be rejected");
    format!("{err}")
}

#[test]
fn accepts_full_config() {
    let toml = r#"
[ports]
retract_distance = [95, 95, 95, 95]
feed_distance = [98, 98, 98, 98]
small_feed_distance = [2, 2, 2, 2]
slower_margin = [10, 10, 10, 10]
servo_on_deg = [29, 157, 29, 157]
servo_off_deg = [90, 90, 90, 90]

[speeds]
unload_speed = 20
stepper_speed = 50
stepper_slower_speed = 5
stepper_accel = 50

[geometry]
sensor_to_gear_distance = 35
sensor_to_gear_margin = 5
filament_catching_margin = 2

[timing]
servo_settle_ms = 1000
settle_ms = 100
sensor_poll_ms = 50

[safety]
max_unload_distance = 150

[logging]
file = "switcher.log"
rotation = "daily"
max_files = 5

[pins]
servos = [12, 13, 18, 19]
sensor = 17
feeder_step = 23
feeder_dir = 24
extruder_step = 5
extruder_dir = 6
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    let pins = cfg.pins.expect("pins present");
    assert_eq!(pins.feeder_en, None);
    assert_eq!(pins.servos.len(), 4);
}

#[rstest]
#[case(
    "[ports]\nretract_distance = [95, 95]\n",
    "ports.feed_distance has 4 entries"
)]
#[case(
    "[ports]\nretract_distance = []\nfeed_distance = []\nsmall_feed_distance = []\nslower_margin = []\nservo_on_deg = []\nservo_off_deg = []\n",
    "at least one port"
)]
#[case(
    "[ports]\nretract_distance = [95, -1, 95, 95]\n",
    "ports.retract_distance[1] must be >= 0"
)]
#[case(
    "[ports]\nservo_on_deg = [29, 190, 29, 157]\n",
    "ports.servo_on_deg[1] must be in [0, 180]"
)]
#[case(
    "[ports]\nslower_margin = [10, 10, 120, 10]\n",
    "ports.slower_margin[2] must not exceed"
)]
#[case("[speeds]\nstepper_speed = 0\n", "speeds.stepper_speed must be > 0")]
#[case("[speeds]\nstepper_accel = -5\n", "speeds.stepper_accel must be > 0")]
#[case(
    "[geometry]\nsensor_to_gear_distance = 4\n",
    "sensor_to_gear_margin must not exceed"
)]
#[case(
    "[safety]\nmax_unload_distance = 0\n",
    "safety.max_unload_distance must be > 0"
)]
#[case("[timing]\nservo_settle_ms = 60000\n", "servo_settle_ms is unreasonably large")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation must be one of")]
#[case(
    "[pins]\nservos = [12, 13]\nsensor = 17\nfeeder_step = 23\nfeeder_dir = 24\nextruder_step = 5\nextruder_dir = 6\n",
    "pins.servos has 2 entries"
)]
fn rejects_invalid_values(#[case] toml: &str, #[case] needle: &str) {
    let msg = validate_err(toml);
    assert!(msg.contains(needle), "expected {needle:?} in {msg:?}");
}

#[test]
fn rejects_unknown_field_types() {
    let err = load_toml("[speeds]\nstepper_speed = \"fast\"\n").expect_err("type error");
    assert!(format!("{err}").contains("stepper_speed"));
}
