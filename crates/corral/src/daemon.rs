use std::process::ExitStatus;
use std::time::{Duration, Instant};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::config::DaemonDef;
use crate::logs::{nice_header, LogStream, Logger};
use crate::output;
use crate::runner::spawn_shell;

/// Minimum time between successive spawn attempts of one daemon. There is
/// no retry cap: a permanently failing command restarts forever at this
/// rate, and the log is the only failure signal.
pub const MIN_RESTART: Duration = Duration::from_secs(1);

const COMMAND_BUFFER: usize = 8;

enum DaemonCommand {
	Restart,
	Shutdown {
		signal: Signal,
		done: oneshot::Sender<()>,
	},
}

/// Handle to one supervised daemon. The daemon's mutable state (live
/// child, stop flag) is owned by a dedicated actor task; this handle only
/// sends it commands.
pub struct Daemon {
	commands: mpsc::Sender<DaemonCommand>,
}

impl Daemon {
	/// Launch the daemon's restart loop as an independent task.
	pub fn spawn(def: DaemonDef, log: LogStream, min_restart: Duration) -> Self {
		let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
		let actor = DaemonActor {
			def,
			log,
			min_restart,
			commands: rx,
			stop: false,
			detached: false,
		};
		tokio::spawn(actor.run());
		Self { commands: tx }
	}

	/// Ask the running process to restart itself by delivering the
	/// configured restart signal. Does not wait for the effect; a no-op
	/// when no process is live or the daemon has already stopped.
	pub async fn restart(&self) {
		let _ = self.commands.send(DaemonCommand::Restart).await;
	}

	/// Stop the restart loop, deliver `signal` to the live process if
	/// any, and wait until that process has actually exited. A no-op if
	/// the daemon has already stopped.
	pub async fn shutdown(&self, signal: Signal) {
		let (done, ack) = oneshot::channel();
		let cmd = DaemonCommand::Shutdown { signal, done };
		if self.commands.send(cmd).await.is_ok() {
			let _ = ack.await;
		}
	}
}

enum Exit {
	Status(ExitStatus),
	WaitFailed(std::io::Error),
	/// Exit observed by a shutdown command; already acknowledged.
	Stopped,
}

struct DaemonActor {
	def: DaemonDef,
	log: LogStream,
	min_restart: Duration,
	commands: mpsc::Receiver<DaemonCommand>,
	stop: bool,
	/// The command channel closed: the pen was replaced or dropped
	/// without a shutdown. The loop keeps running, per the documented
	/// precondition that callers shut down before starting again.
	detached: bool,
}

impl DaemonActor {
	async fn run(mut self) {
		let mut last_start: Option<Instant> = None;
		while !self.stop {
			if let Some(at) = last_start {
				let since = at.elapsed();
				if since < self.min_restart {
					self.idle(self.min_restart - since).await;
					if self.stop {
						break;
					}
				}
			}
			self.log.header();
			last_start = Some(Instant::now());
			let mut child = match spawn_shell(&self.def.command) {
				Ok(child) => child,
				Err(err) => {
					self.log.shout(&err.to_string());
					continue;
				}
			};
			tracing::debug!(pid = child.id(), command = %self.def.command, "spawned");
			let streamers = output::attach(&mut child, &self.log);
			let exit = self.supervise(&mut child).await;
			for task in streamers {
				let _ = task.await;
			}
			match exit {
				Exit::Status(status) if !status.success() => {
					self.log.shout(&status.to_string());
				}
				Exit::WaitFailed(err) => self.log.shout(&err.to_string()),
				_ => {}
			}
		}
		tracing::debug!(command = %self.def.command, "daemon stopped");
	}

	/// Sleep out the restart throttle while staying responsive to
	/// commands. Restart with no live process is a no-op.
	async fn idle(&mut self, wait: Duration) {
		let sleep = tokio::time::sleep(wait);
		tokio::pin!(sleep);
		loop {
			if self.detached {
				sleep.await;
				return;
			}
			tokio::select! {
				_ = &mut sleep => return,
				cmd = self.commands.recv() => match cmd {
					Some(DaemonCommand::Restart) => {}
					Some(DaemonCommand::Shutdown { done, .. }) => {
						self.stop = true;
						let _ = done.send(());
						return;
					}
					None => self.detached = true,
				},
			}
		}
	}

	/// Wait for the child to exit while serving commands against it.
	async fn supervise(&mut self, child: &mut Child) -> Exit {
		loop {
			if self.detached {
				return match child.wait().await {
					Ok(status) => Exit::Status(status),
					Err(err) => Exit::WaitFailed(err),
				};
			}
			tokio::select! {
				status = child.wait() => {
					return match status {
						Ok(status) => Exit::Status(status),
						Err(err) => Exit::WaitFailed(err),
					};
				}
				cmd = self.commands.recv() => match cmd {
					Some(DaemonCommand::Restart) => {
						self.log.header();
						signal_child(child, self.def.restart_signal);
					}
					Some(DaemonCommand::Shutdown { signal, done }) => {
						self.stop = true;
						signal_child(child, signal);
						let exit = match child.wait().await {
							Ok(_) => Exit::Stopped,
							Err(err) => Exit::WaitFailed(err),
						};
						let _ = done.send(());
						return exit;
					}
					None => self.detached = true,
				},
			}
		}
	}
}

fn signal_child(child: &Child, signal: Signal) {
	if let Some(pid) = child.id() {
		let _ = kill(Pid::from_raw(pid as i32), signal);
	}
}

/// A group of daemons, managed as a unit. Every operation holds the pen's
/// lock for its whole duration.
pub struct DaemonPen {
	daemons: Mutex<Option<Vec<Daemon>>>,
	min_restart: Duration,
}

impl Default for DaemonPen {
	fn default() -> Self {
		Self::new()
	}
}

impl DaemonPen {
	pub fn new() -> Self {
		Self::with_min_restart(MIN_RESTART)
	}

	/// A pen whose daemons use a custom restart throttle.
	pub fn with_min_restart(min_restart: Duration) -> Self {
		Self {
			daemons: Mutex::new(None),
			min_restart,
		}
	}

	/// Start one daemon per definition, each with its own labeled log
	/// stream, and replace the pen's collection. Callers must shut down
	/// any previously started set first: replaced daemons keep running,
	/// orphaned from future restart/shutdown calls.
	pub async fn start(&self, defs: &[DaemonDef], log: &Logger) {
		let mut daemons = self.daemons.lock().await;
		let next = defs
			.iter()
			.map(|def| {
				let stream = log.stream(nice_header("daemon: ", &def.command));
				Daemon::spawn(def.clone(), stream, self.min_restart)
			})
			.collect();
		*daemons = Some(next);
		tracing::info!(count = defs.len(), "daemons started");
	}

	/// Deliver each daemon's restart signal to its live process. Cheap
	/// regardless of pen size: individual restarts do not wait for the
	/// signal to take effect.
	pub async fn restart(&self) {
		let daemons = self.daemons.lock().await;
		if let Some(daemons) = daemons.as_ref() {
			for daemon in daemons {
				daemon.restart().await;
			}
		}
	}

	/// Shut down every daemon in turn, delivering `signal` to each live
	/// process and waiting for it to exit. Total latency is the sum of
	/// the individual shutdown times.
	pub async fn shutdown(&self, signal: Signal) {
		let daemons = self.daemons.lock().await;
		if let Some(daemons) = daemons.as_ref() {
			for daemon in daemons {
				daemon.shutdown(signal).await;
			}
			tracing::info!(count = daemons.len(), "daemons shut down");
		}
	}
}
