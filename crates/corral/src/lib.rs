//! # corral
//!
//! Process supervision core for development-workflow tools.
//!
//! Run prep commands once to completion, then keep a pen of daemon
//! processes alive: spawn under a shell, stream their output line by line
//! into labeled log streams, restart on exit (throttled), and shut the
//! whole pen down on request.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use corral::{DaemonDef, DaemonPen, Logger, PrepDef, run_preps};
//! use nix::sys::signal::Signal;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let log = Logger::terminal();
//!
//! // Preps gate the daemons: a failure here means nothing starts.
//! let preps = vec![PrepDef { command: "make generate".into() }];
//! if run_preps(&preps, &log).await.is_err() {
//!     return;
//! }
//!
//! let pen = DaemonPen::new();
//! pen.start(
//!     &[DaemonDef {
//!         command: "python -m http.server".into(),
//!         restart_signal: Signal::SIGHUP,
//!     }],
//!     &log,
//! )
//! .await;
//!
//! // ... on file change: pen.restart().await;
//! pen.shutdown(Signal::SIGTERM).await;
//! # }
//! ```

pub mod config;
pub mod daemon;
pub mod logs;
pub mod output;
pub mod runner;

pub use config::{parse_signal, DaemonDef, PrepDef};
pub use daemon::{Daemon, DaemonPen, MIN_RESTART};
pub use logs::{nice_header, Level, LogSink, LogStream, Logger};
pub use runner::{run_preps, run_proc, ProcError};
