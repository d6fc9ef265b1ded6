use std::process::Stdio;
use std::time::Duration;

use nix::sys::resource::{getrusage, UsageWho};
use tokio::process::{Child, Command};

use crate::config::PrepDef;
use crate::logs::{nice_header, LogStream, Logger};
use crate::output;

const SHELL: &str = "/bin/sh";

/// Failure of a one-shot command. Daemons never surface this: their
/// restart loop absorbs every failure and the log is the only signal.
#[derive(Debug, thiserror::Error)]
pub enum ProcError {
	#[error("failed to start command: {0}")]
	Start(#[from] std::io::Error),
	#[error("{0}")]
	Exited(String),
}

pub(crate) fn spawn_shell(command: &str) -> std::io::Result<Child> {
	Command::new(SHELL)
		.arg("-c")
		.arg(command)
		.stdin(Stdio::null())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.spawn()
}

/// Run a command to completion, streaming its output to `log`. Both
/// streamer tasks have drained their pipes by the time this returns.
pub async fn run_proc(command: &str, log: &LogStream) -> Result<(), ProcError> {
	log.header();
	let before = child_user_time();
	let mut child = match spawn_shell(command) {
		Ok(child) => child,
		Err(err) => {
			log.shout(&err.to_string());
			return Err(err.into());
		}
	};
	let streamers = output::attach(&mut child, log);
	let status = match child.wait().await {
		Ok(status) => status,
		Err(err) => {
			log.shout(&err.to_string());
			return Err(err.into());
		}
	};
	for task in streamers {
		let _ = task.await;
	}
	if !status.success() {
		let desc = status.to_string();
		log.shout(&desc);
		return Err(ProcError::Exited(desc));
	}
	if let (Some(before), Some(after)) = (before, child_user_time()) {
		log.notice(&format!("run time: {:?}", after.saturating_sub(before)));
	}
	Ok(())
}

/// Run preps in order, stopping at the first failure. Callers must not
/// start daemons when this returns an error.
pub async fn run_preps(preps: &[PrepDef], log: &Logger) -> Result<(), ProcError> {
	for prep in preps {
		let stream = log.stream(nice_header("prep: ", &prep.command));
		run_proc(&prep.command, &stream).await?;
	}
	Ok(())
}

/// User CPU time consumed by reaped children so far. The delta around one
/// sequentially run command approximates that command's user time.
fn child_user_time() -> Option<Duration> {
	let usage = getrusage(UsageWho::RUSAGE_CHILDREN).ok()?;
	let tv = usage.user_time();
	if tv.tv_sec() < 0 {
		return None;
	}
	Some(Duration::new(tv.tv_sec() as u64, tv.tv_usec() as u32 * 1000))
}
