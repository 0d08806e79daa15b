//! GUI module for the Phone Agent controller.
//!
//! Provides a graphical user interface using Iced.

pub mod app;
pub mod focus;
pub mod output;

pub use app::{Language, Message, PhoneAgentApp, RunStatus, View};
pub use focus::{Field, FocusTracker};
pub use output::{LogLevel, OutputLog};
