//! Phone Agent controller - headless entry point.
//!
//! Runs the same operations as the GUI from a terminal, using the settings
//! file the GUI writes.
//!
//! Run with: cargo run --bin phone-agent-ctl -- <command>

use std::env;
use std::io::{self, Write};
use std::process::ExitCode;

use phone_agent_gui::adb::{ADBConnection, DeviceAddress, DeviceConnector};
use phone_agent_gui::config::GuiConfig;
use phone_agent_gui::model::{check_credentials, CheckOutcome, ModelConfig};
use phone_agent_gui::runner::{RunRequest, RunSink, TaskRunner};
use phone_agent_gui::settings::SettingsStore;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Usage: phone-agent-ctl <command>

Commands:
  connect <address>   Connect a device over ADB (IPv4[:port]) and set up ADB Keyboard
  check               Verify the saved model endpoint, model and API key
  run <task...>       Run a task with the saved settings

Environment:
  ADB_PATH                 adb executable to use
  AGENT_PYTHON             interpreter for the agent entry point (\"none\" to exec it directly)
  AGENT_SCRIPT             agent entry point script
  PHONE_AGENT_GUI_CONFIG   settings file
  ADB_KEYBOARD_APK         ADBKeyboard.apk to install when missing";

/// Writes entry point output straight to the terminal.
struct StdoutSink;

impl RunSink for StdoutSink {
    fn output(&self, chunk: &str) {
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(chunk.as_bytes());
        let _ = stdout.flush();
    }

    fn finished(&self, code: i32) {
        println!("\nFinished (Exit Code: {})", code);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize tracing; stderr keeps the task output on stdout clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        return Ok(ExitCode::from(2));
    };

    let config = GuiConfig::from_env();
    let store = SettingsStore::new(config.settings_path.clone());

    match command.as_str() {
        "connect" => {
            let Some(raw) = args.get(1) else {
                eprintln!("{}", USAGE);
                return Ok(ExitCode::from(2));
            };
            connect(&config, store, raw).await
        }
        "check" => check(&store).await,
        "run" if args.len() > 1 => run(&config, &store, &args[1..].join(" ")).await,
        "-h" | "--help" | "help" => {
            println!("{}", USAGE);
            Ok(ExitCode::SUCCESS)
        }
        _ => {
            eprintln!("{}", USAGE);
            Ok(ExitCode::from(2))
        }
    }
}

async fn connect(config: &GuiConfig, store: SettingsStore, raw: &str) -> anyhow::Result<ExitCode> {
    let address: DeviceAddress = raw.parse()?;
    let connector = DeviceConnector::new(
        ADBConnection::with_path(config.adb_path.clone()),
        config.apk_candidates.clone(),
        store,
    );

    println!("Connecting to {}...", address);
    let report = tokio::task::spawn_blocking(move || {
        connector.connect(&address, |step| println!("{}", step))
    })
    .await??;

    println!("Successfully connected to {}", report.address);
    if let Some(e) = &report.save_error {
        eprintln!("Settings not saved: {}", e);
    }
    println!("{}", report.keyboard);

    Ok(if report.keyboard.is_ready() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn check(store: &SettingsStore) -> anyhow::Result<ExitCode> {
    let settings = store.load_settings();
    let config = ModelConfig::new(&settings.base_url, &settings.model, &settings.api_key);

    println!("Checking {} ({})...", config.base_url, config.model_name);
    match check_credentials(config, store).await {
        CheckOutcome::Verified { save_error } => {
            println!("API Connection Verified!");
            if let Some(e) = save_error {
                eprintln!("Settings not saved: {}", e);
            }
            Ok(ExitCode::SUCCESS)
        }
        CheckOutcome::Failed(failure) => {
            eprintln!("API Check Failed: {}", failure);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(config: &GuiConfig, store: &SettingsStore, task: &str) -> anyhow::Result<ExitCode> {
    let settings = store.load_settings();
    let request = RunRequest::new(
        &settings.base_url,
        &settings.model,
        &settings.language,
        &settings.api_key,
        &settings.device_id,
        task,
    )?;

    let runner = TaskRunner::new(config.entry_point.clone());
    let code = tokio::task::spawn_blocking(move || runner.run(&request, &StdoutSink)).await?;

    // Exit codes outside 0..=255 are truncated the way the OS would
    Ok(ExitCode::from(code as u8))
}
