//! Request execution and response rendering shared by subcommands and the console.

use eyre::Result;
use serde_json::{Value, json};
use switcher_core::{Port, Switcher};

/// One user command, already parsed and bounds-checked.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Status,
    Reset,
    Select { port: usize, servo: bool },
    Feed { dist: Option<f64> },
    SmallFeed,
    MoveStepper { dist: i64, slow: bool },
    Sensor,
    Switch { port: usize },
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::Status => "status",
            Request::Reset => "reset",
            Request::Select { .. } => "select",
            Request::Feed { .. } => "feed",
            Request::SmallFeed => "small_feed",
            Request::MoveStepper { .. } => "move_stepper",
            Request::Sensor => "sensor",
            Request::Switch { .. } => "switch",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub command: &'static str,
    /// Console wording; empty for commands that answer nothing.
    pub text: String,
    pub data: Value,
}

impl Response {
    /// The line(s) to print, if any.
    pub fn render(&self, json: bool) -> Option<String> {
        if json {
            let mut obj = json!({ "command": self.command });
            if let (Some(map), Value::Object(extra)) = (obj.as_object_mut(), &self.data) {
                map.extend(extra.clone());
            }
            Some(obj.to_string())
        } else if self.text.is_empty() {
            None
        } else {
            Some(self.text.clone())
        }
    }
}

/// Console numbers print as integers, truncated toward zero.
#[allow(clippy::cast_possible_truncation)]
fn int(v: f64) -> i64 {
    v.trunc() as i64
}

fn port_or_unset(p: Option<Port>) -> i64 {
    p.map_or(-1, |p| p.index() as i64)
}

fn feed_text(verb: &str, dist: f64, speed: f64, accel: f64) -> String {
    format!("{verb}: {} at {} with {}", int(dist), int(speed), int(accel))
}

pub fn execute(sw: &mut Switcher, req: &Request) -> Result<Response> {
    let command = req.name();
    let (text, data) = match *req {
        Request::Status => {
            let st = sw.status()?;
            let text = format!(
                "STATUS:\n  Port: {}\n  Last Port: {}\n  Filament Switch: {}",
                port_or_unset(st.current_port),
                port_or_unset(st.last_port),
                st.sensor
            );
            let data = json!({
                "port": st.current_port.map(Port::index),
                "last_port": st.last_port.map(Port::index),
                "sensor": st.sensor.to_string(),
                "last_switch": st.last_switch.map(|o| o.name()),
            });
            (text, data)
        }
        Request::Reset => {
            sw.reset();
            (String::new(), json!({}))
        }
        Request::Select { port, servo } => {
            sw.select_port(Port::new(port), servo)?;
            (
                format!("Port selected: {port}"),
                json!({ "port": port, "servo": servo }),
            )
        }
        Request::Feed { dist } => {
            let r = sw.feed(dist)?;
            (
                feed_text("Feeding", r.distance, r.speed, r.accel),
                json!({ "distance": r.distance, "speed": r.speed, "accel": r.accel }),
            )
        }
        Request::SmallFeed => {
            let r = sw.small_feed()?;
            (
                feed_text("Feeding", r.distance, r.speed, r.accel),
                json!({ "distance": r.distance, "speed": r.speed, "accel": r.accel }),
            )
        }
        Request::MoveStepper { dist, slow } => {
            #[allow(clippy::cast_precision_loss)]
            let (speed, accel) = sw.move_feeder(dist as f64, slow)?;
            (
                feed_text("moving", dist as f64, speed, accel),
                json!({ "distance": dist, "speed": speed, "accel": accel, "slow": slow }),
            )
        }
        Request::Sensor => {
            let state = sw.sensor_state()?;
            (
                format!("Filament Sensor: {state}"),
                json!({ "sensor": state.to_string() }),
            )
        }
        Request::Switch { port } => {
            let outcome = sw.switch_port(Port::new(port))?;
            (
                format!("Switched to port: {port}"),
                json!({ "port": port, "outcome": outcome.name() }),
            )
        }
    };
    Ok(Response {
        command,
        text,
        data,
    })
}
