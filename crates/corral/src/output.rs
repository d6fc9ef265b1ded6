use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::task::JoinHandle;

use crate::logs::LogStream;

/// Read lines from a child's pipe and forward each one to the sink.
/// EOF and read errors both end the stream silently: the pipe closing on
/// process exit is the expected termination path.
pub async fn stream_lines<R, F>(reader: R, mut sink: F)
where
	R: AsyncRead + Unpin,
	F: FnMut(&str),
{
	let mut lines = BufReader::new(reader).lines();
	while let Ok(Some(line)) = lines.next_line().await {
		sink(&line);
	}
}

/// Attach one streamer task per pipe: stdout lines become `say` lines,
/// stderr lines become `warn` lines. Returns the streamer handles so the
/// caller can join them after the child exits.
pub fn attach(child: &mut Child, log: &LogStream) -> Vec<JoinHandle<()>> {
	let mut tasks = Vec::with_capacity(2);
	if let Some(stdout) = child.stdout.take() {
		let log = log.clone();
		tasks.push(tokio::spawn(async move {
			stream_lines(stdout, |line| log.say(line)).await;
		}));
	}
	if let Some(stderr) = child.stderr.take() {
		let log = log.clone();
		tasks.push(tokio::spawn(async move {
			stream_lines(stderr, |line| log.warn(line)).await;
		}));
	}
	tasks
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn forwards_lines_in_order() {
		let input: &[u8] = b"one\ntwo\nthree\n";
		let mut seen = Vec::new();
		stream_lines(input, |line| seen.push(line.to_string())).await;
		assert_eq!(seen, ["one", "two", "three"]);
	}

	#[tokio::test]
	async fn empty_input_yields_nothing() {
		let input: &[u8] = b"";
		let mut seen = Vec::new();
		stream_lines(input, |line| seen.push(line.to_string())).await;
		assert!(seen.is_empty());
	}

	#[tokio::test]
	async fn unterminated_final_line_is_delivered() {
		let input: &[u8] = b"partial";
		let mut seen = Vec::new();
		stream_lines(input, |line| seen.push(line.to_string())).await;
		assert_eq!(seen, ["partial"]);
	}
}
