use std::str::FromStr;

use nix::sys::signal::Signal;
use serde::{Deserialize, Deserializer};

/// One long-running command, restarted on exit until shut down.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DaemonDef {
	pub command: String,
	#[serde(
		default = "default_restart_signal",
		deserialize_with = "deserialize_signal"
	)]
	pub restart_signal: Signal,
}

/// One command run once to completion before daemons may start.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PrepDef {
	pub command: String,
}

fn default_restart_signal() -> Signal {
	Signal::SIGHUP
}

/// Parse a signal name. Accepts "hup", "HUP", "SIGHUP" and friends.
pub fn parse_signal(name: &str) -> Result<Signal, SignalParseError> {
	let upper = name.trim().to_uppercase();
	let full = if upper.starts_with("SIG") {
		upper
	} else {
		format!("SIG{}", upper)
	};
	Signal::from_str(&full).map_err(|_| SignalParseError {
		name: name.to_string(),
	})
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown signal name: {name}")]
pub struct SignalParseError {
	name: String,
}

fn deserialize_signal<'de, D>(deserializer: D) -> Result<Signal, D::Error>
where
	D: Deserializer<'de>,
{
	let name = String::deserialize(deserializer)?;
	parse_signal(&name).map_err(serde::de::Error::custom)
}
