//! Filament switcher command line.
//!
//! One-shot subcommands run against a fresh controller; `console` keeps one
//! controller alive for a whole `FS_*` session on stdin.

mod cli;
mod console;
mod error_fmt;
mod logging;
mod rig;
mod run;

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::{Report, Result, WrapErr};
use serde_json::json;
use switcher_config::{Config, PortsCfg, load_ports_csv};
use switcher_core::error::SwitchError;
use switcher_core::{Port, Switcher};

use crate::cli::{Cli, Commands, JSON_MODE, json_mode};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::rig::{RigOptions, backend_name, build_switcher};
use crate::run::{Request, execute};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    let _ = color_eyre::install();

    let code = match real_main(&cli) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "command failed");
            if json_mode() {
                eprintln!("{}", format_error_json(&err));
            } else {
                eprintln!("{}", humanize(&err));
            }
            exit_code_for_error(&err)
        }
    };
    std::process::exit(code);
}

fn config_err(err: &Report) -> Report {
    Report::new(SwitchError::Config(format!("{err:#}")))
}

/// Read and validate the config. A missing file yields the stock defaults.
fn load_config(path: &Path, ports_csv: Option<&Path>) -> Result<(Config, bool)> {
    let from_file = path.exists();
    let mut cfg = if from_file {
        let text = fs::read_to_string(path)
            .wrap_err_with(|| format!("read config {}", path.display()))
            .map_err(|e| config_err(&e))?;
        toml::from_str::<Config>(&text)
            .wrap_err_with(|| format!("parse config {}", path.display()))
            .map_err(|e| config_err(&e))?
    } else {
        Config::default()
    };
    if let Some(csv) = ports_csv {
        let rows = load_ports_csv(csv).map_err(|e| config_err(&e))?;
        cfg.ports = PortsCfg::from_rows(&rows);
    }
    cfg.validate().map_err(|e| config_err(&e))?;
    Ok((cfg, from_file))
}

fn request_for(cmd: &Commands) -> Option<Request> {
    Some(match *cmd {
        Commands::Status => Request::Status,
        Commands::Reset => Request::Reset,
        Commands::Select { port, servo } => Request::Select {
            port,
            servo: servo == 1,
        },
        Commands::Feed { dist } => Request::Feed { dist },
        Commands::SmallFeed => Request::SmallFeed,
        Commands::MoveStepper { dist, slow } => Request::MoveStepper { dist, slow },
        Commands::Sensor => Request::Sensor,
        Commands::Switch { port } => Request::Switch { port },
        Commands::SelfCheck | Commands::Console => return None,
    })
}

fn self_check(sw: &mut Switcher, backend: &str, json: bool) -> Result<()> {
    let sensor = sw.sensor_state()?;
    let ports = sw.ports().len();
    if json {
        println!(
            "{}",
            json!({
                "command": "self_check",
                "backend": backend,
                "ports": ports,
                "sensor": sensor.to_string(),
            })
        );
    } else {
        println!("ok: {backend} backend, {ports} ports, sensor {sensor}");
    }
    Ok(())
}

fn real_main(cli: &Cli) -> Result<i32> {
    let (cfg, from_file) = load_config(&cli.config, cli.ports.as_deref())?;

    let level = cli
        .log_level
        .clone()
        .or_else(|| cfg.logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    logging::init_tracing(cli.json, &level, &cfg.logging)?;
    if from_file {
        tracing::debug!(path = %cli.config.display(), "config loaded");
    } else {
        tracing::info!(path = %cli.config.display(), "config file not found; using defaults");
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler");
        }
    }

    let opts = RigOptions {
        realtime: cli.realtime,
        loaded_port: cli.start_port,
        json: cli.json,
    };
    let mut sw = build_switcher(&cfg, &opts)?;
    if let Some(p) = cli.start_port {
        sw.select_port(Port::new(p), false)?;
    }

    match &cli.cmd {
        Commands::SelfCheck => {
            self_check(&mut sw, backend_name(&cfg), cli.json)?;
            Ok(0)
        }
        Commands::Console => {
            let stdin = io::stdin();
            let mut stdout = io::stdout();
            let code =
                console::run_session(&mut sw, stdin.lock(), &mut stdout, cli.json, &shutdown)?;
            stdout.flush()?;
            Ok(code)
        }
        other => {
            let Some(req) = request_for(other) else {
                return Ok(0);
            };
            let resp = execute(&mut sw, &req)?;
            if let Some(text) = resp.render(cli.json) {
                println!("{text}");
            }
            Ok(0)
        }
    }
}
