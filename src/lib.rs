// Copyright 2025 Zhipu AI (Original Python implementation)
// Copyright 2025 ModerRAS (Rust implementation)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Phone Agent GUI
//!
//! Desktop controller for the [Open-AutoGLM](https://github.com/zai-org/Open-AutoGLM)
//! phone agent.
//!
//! The controller does not drive the phone itself. It keeps the agent's
//! settings, connects an Android device over ADB (provisioning ADB Keyboard
//! on the way), proves the model endpoint and key work, and runs the agent's
//! entry point as a child process while relaying its output.
//!
//! ## Running a task headlessly
//!
//! ```rust,no_run
//! use phone_agent_gui::{GuiConfig, RunEvent, RunRequest, TaskRunner};
//!
//! let config = GuiConfig::from_env();
//! let request = RunRequest::new(
//!     "https://open.bigmodel.cn/api/paas/v4",
//!     "autoglm-phone",
//!     "cn",
//!     "",
//!     "192.168.1.5:5555",
//!     "打开微信",
//! )?;
//!
//! let (tx, _rx) = iced::futures::channel::mpsc::unbounded::<RunEvent>();
//! let handle = TaskRunner::new(config.entry_point).spawn(request, tx)?;
//! handle.join().ok();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod adb;
pub mod config;
pub mod gui;
pub mod model;
pub mod runner;
pub mod settings;

#[cfg(test)]
mod test_support;

pub use adb::{ADBConnection, ConnectReport, DeviceAddress, DeviceConnector, KeyboardStatus};
pub use config::{EntryPoint, GuiConfig};
pub use model::{check_credentials, CheckOutcome, CredentialValidator, ModelClient, ModelConfig};
pub use runner::{RunEvent, RunRequest, RunSink, TaskRunner};
pub use settings::{GuiSettings, SettingsStore};
