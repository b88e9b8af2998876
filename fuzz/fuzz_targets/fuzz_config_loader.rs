#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation of arbitrary TOML must fail gracefully, never panic.
    if let Ok(cfg) = toml::from_str::<switcher_config::Config>(data) {
        if cfg.validate().is_ok() {
            // A valid table always has one entry per port in every column.
            let n = cfg.ports.len();
            assert!(n > 0 && n <= switcher_config::MAX_PORTS);
            assert_eq!(cfg.ports.servo_off_deg.len(), n);
        }
    }
});
