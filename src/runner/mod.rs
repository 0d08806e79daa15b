//! Task execution: building the entry point command line and relaying its
//! output while it runs.

mod process;
mod request;

pub use process::{RunEvent, RunSink, TaskRunner, FAILURE_EXIT_CODE};
pub use request::{RunError, RunRequest};
