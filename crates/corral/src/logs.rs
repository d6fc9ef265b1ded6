use std::sync::Arc;
use std::time::SystemTime;

use owo_colors::OwoColorize;

const LINE_LIMIT: usize = 80;
const POSTAMBLE: &str = "...";

/// Severity of one log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
	/// Marker printed when a stream's command (re)starts.
	Header,
	/// A line from the command's stdout.
	Say,
	/// Informational line from corral itself (timing stats).
	Notice,
	/// A line from the command's stderr.
	Warn,
	/// A supervision failure: spawn error or abnormal exit.
	Shout,
}

/// Receives every line from every stream. Implemented by the terminal
/// sink here and by capture sinks in tests.
pub trait LogSink: Send + Sync {
	fn emit(&self, name: &str, level: Level, text: &str);
}

/// Hands out labeled streams backed by a shared sink.
#[derive(Clone)]
pub struct Logger {
	sink: Arc<dyn LogSink>,
}

impl Logger {
	pub fn terminal() -> Self {
		Self::with_sink(Arc::new(TermSink))
	}

	pub fn with_sink(sink: Arc<dyn LogSink>) -> Self {
		Self { sink }
	}

	pub fn stream(&self, name: impl Into<String>) -> LogStream {
		LogStream {
			name: name.into().into(),
			sink: Arc::clone(&self.sink),
		}
	}
}

/// A labeled output stream for one command.
#[derive(Clone)]
pub struct LogStream {
	name: Arc<str>,
	sink: Arc<dyn LogSink>,
}

impl LogStream {
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn header(&self) {
		self.sink.emit(&self.name, Level::Header, "");
	}

	pub fn say(&self, line: &str) {
		self.sink.emit(&self.name, Level::Say, line);
	}

	pub fn notice(&self, line: &str) {
		self.sink.emit(&self.name, Level::Notice, line);
	}

	pub fn warn(&self, line: &str) {
		self.sink.emit(&self.name, Level::Warn, line);
	}

	pub fn shout(&self, line: &str) {
		self.sink.emit(&self.name, Level::Shout, line);
	}
}

/// Default sink: colored lines on stdout, warn/shout on stderr.
pub struct TermSink;

impl LogSink for TermSink {
	fn emit(&self, name: &str, level: Level, text: &str) {
		let ts = timestamp();
		match level {
			Level::Header => println!("{} {}", ts.dimmed(), name.cyan().bold()),
			Level::Say => println!("{} {} {}", ts.dimmed(), name.cyan(), text),
			Level::Notice => println!("{} {} {}", ts.dimmed(), name.cyan(), text.dimmed()),
			Level::Warn => eprintln!("{} {} {}", ts.dimmed(), name.cyan(), text.yellow()),
			Level::Shout => {
				eprintln!("{} {} {}", ts.dimmed(), name.cyan(), text.red().bold())
			}
		}
	}
}

/// Build a stream label: condense whitespace so multi-line commands stay
/// legible, and truncate to 80 columns.
pub fn nice_header(preamble: &str, command: &str) -> String {
	let mut name = condense_ws(command);
	let limit = LINE_LIMIT - POSTAMBLE.len();
	if name.len() > limit {
		let mut cut = limit;
		while !name.is_char_boundary(cut) {
			cut -= 1;
		}
		name.truncate(cut);
		name.push_str(POSTAMBLE);
	}
	format!("{}{}", preamble, name)
}

fn condense_ws(s: &str) -> String {
	s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn timestamp() -> String {
	let secs = SystemTime::now()
		.duration_since(SystemTime::UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs();
	let tod = secs % 86400;
	format!("{:02}:{:02}:{:02}", tod / 3600, (tod % 3600) / 60, tod % 60)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn nice_header_condenses_whitespace() {
		assert_eq!(
			nice_header("daemon: ", "run \\\n\t  --flag   value"),
			"daemon: run \\ --flag value"
		);
	}

	#[test]
	fn nice_header_truncates_long_commands() {
		let cmd = "x".repeat(200);
		let header = nice_header("prep: ", &cmd);
		assert!(header.ends_with(POSTAMBLE));
		assert_eq!(header.len(), "prep: ".len() + LINE_LIMIT);
	}

	#[test]
	fn nice_header_short_commands_untouched() {
		assert_eq!(nice_header("prep: ", "echo hi"), "prep: echo hi");
	}

	#[test]
	fn timestamp_shape() {
		let ts = timestamp();
		assert_eq!(ts.len(), 8);
		assert_eq!(ts.as_bytes()[2], b':');
		assert_eq!(ts.as_bytes()[5], b':');
	}
}
