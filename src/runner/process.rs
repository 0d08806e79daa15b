//! Launching the entry point and relaying its output.

use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use super::request::RunRequest;
use crate::adb::hide_console_window;
use crate::config::EntryPoint;

/// Exit code reported when the entry point could not run to completion.
pub const FAILURE_EXIT_CODE: i32 = 1;

const READ_BUFFER_SIZE: usize = 4096;

/// Receives everything a run produces.
///
/// `output` may be called from two threads at once (stdout and stderr);
/// `finished` is called exactly once per run, last.
pub trait RunSink: Send + Sync {
    fn output(&self, chunk: &str);
    fn finished(&self, exit_code: i32);
}

/// Events of a run, as delivered over a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Output(String),
    Finished(i32),
}

impl RunSink for iced::futures::channel::mpsc::UnboundedSender<RunEvent> {
    fn output(&self, chunk: &str) {
        let _ = self.unbounded_send(RunEvent::Output(chunk.to_string()));
    }

    fn finished(&self, exit_code: i32) {
        let _ = self.unbounded_send(RunEvent::Finished(exit_code));
    }
}

/// Reports completion when dropped, so the sink hears about the end of a
/// run exactly once even if the runner panics.
struct Completion<'a, S: RunSink + ?Sized> {
    sink: &'a S,
    exit_code: Option<i32>,
}

impl<'a, S: RunSink + ?Sized> Completion<'a, S> {
    fn new(sink: &'a S) -> Self {
        Self {
            sink,
            exit_code: None,
        }
    }

    fn finish(mut self, exit_code: i32) {
        self.exit_code = Some(exit_code);
    }
}

impl<S: RunSink + ?Sized> Drop for Completion<'_, S> {
    fn drop(&mut self) {
        self.sink
            .finished(self.exit_code.unwrap_or(FAILURE_EXIT_CODE));
    }
}

/// Launches the automation entry point as a child process.
#[derive(Debug, Clone)]
pub struct TaskRunner {
    entry: EntryPoint,
}

impl TaskRunner {
    pub fn new(entry: EntryPoint) -> Self {
        Self { entry }
    }

    /// Full command line for display, with the API key masked.
    pub fn display_command(&self, request: &RunRequest) -> String {
        let mut args = request.to_args(&self.entry.script);
        if let Some(pos) = args.iter().position(|a| a == "--apikey") {
            if let Some(key) = args.get_mut(pos + 1) {
                *key = "****".to_string();
            }
        }
        match &self.entry.interpreter {
            Some(interpreter) => format!("{} {}", interpreter, args.join(" ")),
            None => args.join(" "),
        }
    }

    /// Run to completion on the current thread and return the exit code.
    ///
    /// Everything the child writes goes to `sink`; `sink.finished` is
    /// called exactly once before this returns (or unwinds).
    pub fn run<S: RunSink + ?Sized>(&self, request: &RunRequest, sink: &S) -> i32 {
        let completion = Completion::new(sink);

        sink.output(&format!("\n> Executing: {}\n\n", self.display_command(request)));
        tracing::info!(task = %request.task, "starting task");

        let exit_code = match self.execute(request, sink) {
            Ok(status) => status_code(status),
            Err(e) => {
                tracing::error!("error in execution: {}", e);
                sink.output(&format!("\nError: {}\n", e));
                FAILURE_EXIT_CODE
            }
        };

        tracing::info!(exit_code, "task finished");
        completion.finish(exit_code);
        exit_code
    }

    /// Run on a dedicated background thread.
    pub fn spawn<S: RunSink + 'static>(
        &self,
        request: RunRequest,
        sink: S,
    ) -> io::Result<JoinHandle<()>> {
        let runner = self.clone();
        thread::Builder::new()
            .name("task-runner".to_string())
            .spawn(move || {
                runner.run(&request, &sink);
            })
    }

    fn command(&self, request: &RunRequest) -> Command {
        let args = request.to_args(&self.entry.script);
        let mut command = match &self.entry.interpreter {
            Some(interpreter) => {
                let mut command = Command::new(interpreter);
                command.args(&args);
                command
            }
            None => {
                let mut command = Command::new(&args[0]);
                command.args(&args[1..]);
                command
            }
        };

        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Python entry points otherwise block-buffer a piped stdout and
            // fall back to the locale encoding.
            .env("PYTHONUNBUFFERED", "1")
            .env("PYTHONIOENCODING", "utf-8");
        hide_console_window(&mut command);
        command
    }

    fn execute<S: RunSink + ?Sized>(&self, request: &RunRequest, sink: &S) -> io::Result<ExitStatus> {
        let mut child = self.command(request).spawn()?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        thread::scope(|scope| {
            if let Some(stderr) = stderr {
                scope.spawn(move || pump(stderr, sink));
            }
            if let Some(stdout) = stdout {
                pump(stdout, sink);
            }
        });

        child.wait()
    }
}

fn status_code(status: ExitStatus) -> i32 {
    // No code means the child was killed by a signal.
    status.code().unwrap_or(FAILURE_EXIT_CODE)
}

/// Forward raw chunks from a pipe until EOF.
fn pump<R: Read, S: RunSink + ?Sized>(mut reader: R, sink: &S) {
    let mut buf = [0u8; READ_BUFFER_SIZE];
    let mut decoder = Utf8Chunks::default();

    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                let text = decoder.push(&buf[..n]);
                if !text.is_empty() {
                    sink.output(&text);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!("failed to read task output: {}", e);
                break;
            }
        }
    }

    let rest = decoder.finish();
    if !rest.is_empty() {
        sink.output(&rest);
    }
}

/// Incremental UTF-8 decoding that holds back a multi-byte sequence split
/// across reads and replaces invalid bytes.
#[derive(Debug, Default)]
struct Utf8Chunks {
    pending: Vec<u8>,
}

impl Utf8Chunks {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(std::str::from_utf8(&self.pending[..valid]).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                        None => {
                            // Incomplete sequence at the end; wait for more bytes.
                            self.pending.drain(..valid);
                            return out;
                        }
                    }
                }
            }
        }
    }

    fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<RunEvent>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<RunEvent> {
            self.events.lock().unwrap().clone()
        }

        fn output_text(&self) -> String {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    RunEvent::Output(text) => Some(text),
                    RunEvent::Finished(_) => None,
                })
                .collect()
        }

        fn finished_codes(&self) -> Vec<i32> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    RunEvent::Finished(code) => Some(code),
                    RunEvent::Output(_) => None,
                })
                .collect()
        }
    }

    impl RunSink for RecordingSink {
        fn output(&self, chunk: &str) {
            self.events
                .lock()
                .unwrap()
                .push(RunEvent::Output(chunk.to_string()));
        }

        fn finished(&self, exit_code: i32) {
            self.events.lock().unwrap().push(RunEvent::Finished(exit_code));
        }
    }

    fn request(task: &str) -> RunRequest {
        RunRequest::new("http://x/v1", "autoglm-phone", "", "sk-secret", "", task).unwrap()
    }

    #[test]
    fn test_display_command_masks_api_key() {
        let runner = TaskRunner::new(EntryPoint::default());
        let line = runner.display_command(&request("open settings"));
        assert_eq!(
            line,
            "python main.py --base-url http://x/v1 --model autoglm-phone --apikey **** open settings"
        );
    }

    #[test]
    fn test_spawn_failure_reports_once_with_failure_code() {
        let runner = TaskRunner::new(EntryPoint {
            interpreter: Some("/definitely/not/a/python".to_string()),
            script: "main.py".to_string(),
        });
        let sink = RecordingSink::default();

        assert_eq!(runner.run(&request("task"), &sink), FAILURE_EXIT_CODE);
        assert!(sink.output_text().contains("\nError: "));
        assert_eq!(sink.finished_codes(), vec![FAILURE_EXIT_CODE]);
        assert_eq!(sink.events().last(), Some(&RunEvent::Finished(FAILURE_EXIT_CODE)));
    }

    #[test]
    fn test_completion_fires_once_on_panic() {
        let sink = RecordingSink::default();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _completion = Completion::new(&sink);
            panic!("entry point blew up");
        }));

        assert!(result.is_err());
        assert_eq!(sink.finished_codes(), vec![FAILURE_EXIT_CODE]);
    }

    #[test]
    fn test_completion_fires_once_on_finish() {
        let sink = RecordingSink::default();
        Completion::new(&sink).finish(0);
        assert_eq!(sink.finished_codes(), vec![0]);
    }

    #[test]
    fn test_utf8_split_across_reads() {
        let bytes = "世界".as_bytes();
        let mut decoder = Utf8Chunks::default();
        assert_eq!(decoder.push(&bytes[..2]), "");
        assert_eq!(decoder.push(&bytes[2..4]), "世");
        assert_eq!(decoder.push(&bytes[4..]), "界");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_utf8_invalid_bytes_are_replaced() {
        let mut decoder = Utf8Chunks::default();
        assert_eq!(decoder.push(b"ok\xffok"), "ok\u{FFFD}ok");
        assert_eq!(decoder.push(&[0xe4]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }

    #[cfg(unix)]
    mod with_shell {
        use super::*;
        use crate::test_support::write_script;

        #[test]
        fn test_output_and_exit_code_are_relayed() {
            let script = write_script(
                "main.py",
                r#"echo "args: $*"
echo "warning from agent" >&2
exit 3"#,
            );
            let runner = TaskRunner::new(EntryPoint {
                interpreter: Some("sh".to_string()),
                script: script.to_string_lossy().into_owned(),
            });
            let sink = RecordingSink::default();

            let code = runner.run(&request("open settings"), &sink);
            assert_eq!(code, 3);

            let text = sink.output_text();
            assert!(text.starts_with("\n> Executing: sh "));
            assert!(text.contains(
                "args: --base-url http://x/v1 --model autoglm-phone --apikey sk-secret open settings"
            ));
            assert!(text.contains("warning from agent"));
            assert_eq!(sink.finished_codes(), vec![3]);
            assert_eq!(sink.events().last(), Some(&RunEvent::Finished(3)));
        }

        #[test]
        fn test_direct_executable_entry_point() {
            let script = write_script("agent", r#"for last; do :; done
printf 'task=%s' "$last""#);
            let runner = TaskRunner::new(EntryPoint {
                interpreter: None,
                script: script.to_string_lossy().into_owned(),
            });
            let sink = RecordingSink::default();

            assert_eq!(runner.run(&request("打开微信"), &sink), 0);
            assert!(sink.output_text().ends_with("task=打开微信"));
        }

        #[test]
        fn test_spawned_run_delivers_over_channel() {
            use iced::futures::channel::mpsc;

            let script = write_script("main.py", "echo done");
            let runner = TaskRunner::new(EntryPoint {
                interpreter: Some("sh".to_string()),
                script: script.to_string_lossy().into_owned(),
            });
            let (tx, mut rx) = mpsc::unbounded();

            runner.spawn(request("task"), tx).unwrap().join().unwrap();

            let mut events = Vec::new();
            while let Ok(Some(event)) = rx.try_next() {
                events.push(event);
            }
            assert_eq!(events.last(), Some(&RunEvent::Finished(0)));
            assert!(events
                .iter()
                .any(|e| matches!(e, RunEvent::Output(text) if text.contains("done"))));
        }
    }
}
