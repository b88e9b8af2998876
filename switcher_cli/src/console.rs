//! Line-oriented `FS_*` command console.
//!
//! Syntax follows the printer console: a command word followed by
//! `KEY=VALUE` parameters, both case-insensitive.

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use eyre::{Result, WrapErr, bail};
use switcher_core::Switcher;

use crate::error_fmt::exit_code_for_error;
use crate::run::{Request, execute};

struct Params(HashMap<String, String>);

impl Params {
    fn parse<'a>(tokens: impl Iterator<Item = &'a str>) -> Result<Self> {
        let mut map = HashMap::new();
        for tok in tokens {
            let Some((k, v)) = tok.split_once('=') else {
                bail!("Malformed parameter '{tok}'");
            };
            map.insert(k.to_ascii_uppercase(), v.to_string());
        }
        Ok(Self(map))
    }

    fn int(&self, key: &str, default: i64, min: Option<i64>, max: Option<i64>) -> Result<i64> {
        let v = match self.0.get(key) {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| eyre::eyre!("Unable to parse '{raw}' as a int"))?,
            None => default,
        };
        if let Some(min) = min {
            if v < min {
                bail!("{key} must have minimum of {min}");
            }
        }
        if let Some(max) = max {
            if v > max {
                bail!("{key} must have maximum of {max}");
            }
        }
        Ok(v)
    }

    fn opt_float(&self, key: &str) -> Result<Option<f64>> {
        self.0
            .get(key)
            .map(|raw| {
                raw.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| eyre::eyre!("Unable to parse '{raw}' as a float"))
            })
            .transpose()
    }

    fn port(&self, ports: usize) -> Result<usize> {
        let max = i64::try_from(ports).unwrap_or(i64::MAX) - 1;
        let p = self.int("PORT", 0, Some(0), Some(max))?;
        Ok(usize::try_from(p).unwrap_or_default())
    }

    fn flag(&self, key: &str) -> Result<bool> {
        Ok(self.int(key, 0, Some(0), Some(1))? == 1)
    }
}

/// Parse one console line. Blank lines and `;`/`#` comments yield `None`.
pub fn parse_line(line: &str, ports: usize) -> Result<Option<Request>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
        return Ok(None);
    }
    let mut tokens = line.split_whitespace();
    let Some(cmd) = tokens.next() else {
        return Ok(None);
    };
    let cmd = cmd.to_ascii_uppercase();
    let p = Params::parse(tokens)?;
    let req = match cmd.as_str() {
        "FS_STATUS" => Request::Status,
        "FS_RESET" => Request::Reset,
        "FS_SELECT" => Request::Select {
            port: p.port(ports)?,
            servo: p.flag("SERVO")?,
        },
        "FS_SMALL_FEED" => Request::SmallFeed,
        "FS_FEED" => Request::Feed {
            dist: p.opt_float("DIST")?,
        },
        "FS_MOVE_STEPPER" => Request::MoveStepper {
            dist: p.int("DIST", 0, None, None)?,
            slow: p.flag("SLOW")?,
        },
        "FS_FIL_SENSOR" => Request::Sensor,
        "FS_SWITCH" => Request::Switch {
            port: p.port(ports)?,
        },
        other => bail!("Unknown command:\"{other}\""),
    };
    Ok(Some(req))
}

/// Run commands from `input` until EOF or `shutdown`. Failures are reported
/// and the session continues; the exit code of the first failure is returned.
pub fn run_session(
    sw: &mut Switcher,
    input: impl BufRead,
    out: &mut impl Write,
    json: bool,
    shutdown: &AtomicBool,
) -> Result<i32> {
    let ports = sw.ports().len();
    let mut code = 0;
    for line in input.lines() {
        if shutdown.load(Ordering::Relaxed) {
            tracing::warn!("console interrupted");
            break;
        }
        let line = line.wrap_err("read console input")?;
        let result = parse_line(&line, ports).and_then(|req| match req {
            Some(req) => execute(sw, &req).map(Some),
            None => Ok(None),
        });
        match result {
            Ok(Some(resp)) => {
                if let Some(text) = resp.render(json) {
                    writeln!(out, "{text}")?;
                }
            }
            Ok(None) => {}
            Err(err) => {
                tracing::error!(
                    line = line.trim(),
                    error = %format!("{err:#}"),
                    "console command failed"
                );
                if json {
                    let obj = serde_json::json!({
                        "command": line.trim(),
                        "error": format!("{err:#}"),
                    });
                    writeln!(out, "{obj}")?;
                } else {
                    writeln!(out, "!! Error on '{}': {err:#}", line.trim())?;
                }
                if code == 0 {
                    code = exit_code_for_error(&err);
                }
            }
        }
        out.flush()?;
    }
    Ok(code)
}
