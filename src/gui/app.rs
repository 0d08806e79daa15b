//! Main Iced application for the Phone Agent controller.

use iced::font::{self, Font};
use iced::futures::channel::mpsc;
use iced::time::{self, Duration, Instant};
use iced::widget::{
    button, checkbox, column, container, horizontal_rule, horizontal_space, pick_list, row,
    scrollable, text, text_input, Column,
};
use iced::{Border, Color, Element, Length, Subscription, Task, Theme};
use serde_json::json;

use crate::adb::{ADBConnection, ConnectReport, DeviceConnector, DeviceGate, KeyboardStatus};
use crate::config::{get_help, GuiConfig};
use crate::config::{API_KEY_DOCS_URL, PROJECT_URL};
use crate::model::{check_credentials, CheckOutcome, CredentialValidator};
use crate::runner::{RunEvent, RunRequest, RunSink, TaskRunner, FAILURE_EXIT_CODE};
use crate::settings::SettingsStore;

use super::focus::{Field, FocusTracker};
use super::output::{LogLevel, OutputLog};

/// Most notices shown at once.
const MAX_NOTICES: usize = 4;

const SUCCESS_COLOR: Color = Color::from_rgb(0.18, 0.55, 0.24);
const RUNNING_COLOR: Color = Color::from_rgb(0.90, 0.49, 0.13);
const ERROR_COLOR: Color = Color::from_rgb(0.80, 0.18, 0.18);

const BOLD: Font = Font {
    weight: font::Weight::Bold,
    ..Font::DEFAULT
};

/// Current view of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Main,
    Help,
}

/// Agent language passed to the entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Default,
    Chinese,
    English,
}

impl Language {
    const ALL: [Language; 3] = [Language::Default, Language::Chinese, Language::English];

    fn as_code(&self) -> &'static str {
        match self {
            Language::Default => "",
            Language::Chinese => "cn",
            Language::English => "en",
        }
    }

    fn from_code(code: &str) -> Self {
        match code {
            "cn" => Language::Chinese,
            "en" => Language::English,
            _ => Language::Default,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::Default => write!(f, "Default (None)"),
            Language::Chinese => write!(f, "Chinese (cn)"),
            Language::English => write!(f, "English (en)"),
        }
    }
}

/// Run state shown next to the run controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    #[default]
    Ready,
    Running,
    Finished(i32),
}

impl RunStatus {
    fn label(&self) -> String {
        match self {
            RunStatus::Ready => "Ready".to_string(),
            RunStatus::Running => "Running...".to_string(),
            RunStatus::Finished(code) => format!("Finished (Exit Code: {})", code),
        }
    }

    fn color(&self) -> Color {
        match self {
            RunStatus::Ready => SUCCESS_COLOR,
            RunStatus::Running => RUNNING_COLOR,
            RunStatus::Finished(0) => SUCCESS_COLOR,
            RunStatus::Finished(_) => ERROR_COLOR,
        }
    }
}

/// A transient notification.
#[derive(Debug, Clone)]
pub struct Notice {
    id: u64,
    level: LogLevel,
    message: String,
    created: Instant,
}

impl Notice {
    fn lifetime(&self) -> Duration {
        match self.level {
            LogLevel::Error => Duration::from_secs(10),
            _ => Duration::from_secs(5),
        }
    }

    fn color(&self) -> Color {
        match self.level {
            LogLevel::Info => Color::from_rgb(0.45, 0.45, 0.45),
            LogLevel::Success => SUCCESS_COLOR,
            LogLevel::Warning => RUNNING_COLOR,
            LogLevel::Error => ERROR_COLOR,
        }
    }
}

/// Messages for the Iced application.
#[derive(Debug, Clone)]
pub enum Message {
    // Navigation
    ToggleHelp,
    OpenUrl(&'static str),
    UrlOpened(Result<(), String>),

    // Form
    BaseUrlChanged(String),
    ModelChanged(String),
    ApiKeyChanged(String),
    DeviceIdChanged(String),
    TaskChanged(String),
    FieldSubmitted(Field),
    LanguageSelected(Language),
    ClearTask,

    // Background results
    ApiChecked(CheckOutcome),
    DeviceProgress(String),
    DeviceConnected(Result<ConnectReport, String>),
    LanguageSaved(Result<(), String>),

    // Task execution
    RunTask,
    StopTask,
    Run(RunEvent),

    // Output
    ClearOutput,
    AutoScrollToggled(bool),

    // Notices
    DismissNotice(u64),
    Tick(Instant),
}

/// Main application struct.
pub struct PhoneAgentApp {
    view: View,

    // Collaborators
    store: SettingsStore,
    connector: DeviceConnector,
    runner: TaskRunner,

    // Blur de-duplication
    validator: CredentialValidator,
    device_gate: DeviceGate,
    focus: FocusTracker,

    // Form values
    base_url: String,
    model: String,
    api_key: String,
    device_id: String,
    language: Language,
    task: String,
    device_error: Option<String>,

    status: RunStatus,
    output: OutputLog,

    notices: Vec<Notice>,
    next_notice_id: u64,
}

impl Default for PhoneAgentApp {
    fn default() -> Self {
        Self::new()
    }
}

impl PhoneAgentApp {
    /// Create the application from the process environment.
    pub fn new() -> Self {
        Self::with_parts(GuiConfig::from_env(), OutputLog::new())
    }

    /// Create the application from explicit parts.
    pub fn with_parts(config: GuiConfig, output: OutputLog) -> Self {
        let store = SettingsStore::new(config.settings_path.clone());
        let settings = store.load_settings();
        let connector = DeviceConnector::new(
            ADBConnection::with_path(config.adb_path.clone()),
            config.apk_candidates.clone(),
            store.clone(),
        );

        Self {
            view: View::Main,
            connector,
            runner: TaskRunner::new(config.entry_point),
            store,
            validator: CredentialValidator::new(),
            device_gate: DeviceGate::default(),
            focus: FocusTracker::default(),
            base_url: settings.base_url,
            model: settings.model,
            api_key: settings.api_key,
            device_id: settings.device_id,
            language: Language::from_code(&settings.language),
            task: String::new(),
            device_error: None,
            status: RunStatus::Ready,
            output,
            notices: Vec::new(),
            next_notice_id: 0,
        }
    }

    /// Get the window title.
    pub fn title(&self) -> String {
        "Open-AutoGLM Controller".to_string()
    }

    /// Get the theme.
    pub fn theme(&self) -> Theme {
        Theme::Light
    }

    /// Tick only while notices are on screen.
    pub fn subscription(&self) -> Subscription<Message> {
        if self.notices.is_empty() {
            Subscription::none()
        } else {
            time::every(Duration::from_millis(500)).map(Message::Tick)
        }
    }

    fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    fn notify(&mut self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        self.output.note(level, &message);

        self.notices.insert(
            0,
            Notice {
                id: self.next_notice_id,
                level,
                message,
                created: Instant::now(),
            },
        );
        self.notices.truncate(MAX_NOTICES);
        self.next_notice_id += 1;
    }

    /// Update the application state based on messages.
    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            // Navigation
            Message::ToggleHelp => {
                self.view = match self.view {
                    View::Main => View::Help,
                    View::Help => View::Main,
                };
                Task::none()
            }
            Message::OpenUrl(url) => Task::perform(
                async move {
                    match tokio::task::spawn_blocking(move || webbrowser::open(url)).await {
                        Ok(result) => result.map_err(|e| format!("Failed to open {}: {}", url, e)),
                        Err(e) => Err(format!("Failed to open {}: {}", url, e)),
                    }
                },
                Message::UrlOpened,
            ),
            Message::UrlOpened(result) => {
                if let Err(e) = result {
                    tracing::warn!("{}", e);
                    self.notify(LogLevel::Error, e);
                }
                Task::none()
            }

            // Form
            Message::BaseUrlChanged(value) => {
                self.base_url = value;
                self.edited(Field::BaseUrl)
            }
            Message::ModelChanged(value) => {
                self.model = value;
                self.edited(Field::Model)
            }
            Message::ApiKeyChanged(value) => {
                self.api_key = value;
                self.edited(Field::ApiKey)
            }
            Message::DeviceIdChanged(value) => {
                self.device_id = value;
                self.device_error = None;
                self.edited(Field::DeviceId)
            }
            Message::TaskChanged(value) => {
                self.task = value;
                self.edited(Field::Task)
            }
            Message::FieldSubmitted(field) => {
                let field = self.focus.submit(field);
                self.blur(field)
            }
            Message::LanguageSelected(language) => {
                self.language = language;
                let store = self.store.clone();
                let code = language.as_code();
                Task::perform(
                    async move {
                        store
                            .save(json!({ "language": code }))
                            .map_err(|e| e.to_string())
                    },
                    Message::LanguageSaved,
                )
            }
            Message::ClearTask => {
                self.task.clear();
                Task::none()
            }

            // Background results
            Message::ApiChecked(outcome) => {
                match outcome {
                    CheckOutcome::Verified { save_error } => {
                        self.notify(LogLevel::Success, "API Connection Verified!");
                        if let Some(e) = save_error {
                            self.notify(LogLevel::Warning, format!("Settings not saved: {}", e));
                        }
                    }
                    CheckOutcome::Failed(failure) => {
                        self.notify(LogLevel::Error, format!("API Check Failed: {}", failure));
                    }
                }
                Task::none()
            }
            Message::DeviceProgress(step) => {
                self.notify(LogLevel::Info, step);
                Task::none()
            }
            Message::DeviceConnected(result) => {
                match result {
                    Ok(report) => self.report_connection(report),
                    Err(e) => self.notify(LogLevel::Error, e),
                }
                Task::none()
            }
            Message::LanguageSaved(result) => {
                if let Err(e) = result {
                    tracing::warn!("failed to save language: {}", e);
                    self.notify(LogLevel::Warning, format!("Settings not saved: {}", e));
                }
                Task::none()
            }

            // Task execution
            Message::RunTask if self.is_running() => Task::none(),
            Message::RunTask => {
                let blur = match self.focus.leave() {
                    Some(field) => self.blur(field),
                    None => Task::none(),
                };
                Task::batch([blur, self.start_run()])
            }
            Message::StopTask => {
                self.notify(LogLevel::Info, "Stopping is not supported in this mode.");
                Task::none()
            }
            Message::Run(RunEvent::Output(chunk)) => {
                if self.output.append(&chunk) {
                    scrollable::snap_to(output_scroll_id(), scrollable::RelativeOffset::END)
                } else {
                    Task::none()
                }
            }
            Message::Run(RunEvent::Finished(code)) => {
                self.status = RunStatus::Finished(code);
                Task::none()
            }

            // Output
            Message::ClearOutput => {
                self.output.clear();
                Task::none()
            }
            Message::AutoScrollToggled(enabled) => {
                self.output.set_auto_scroll(enabled);
                Task::none()
            }

            // Notices
            Message::DismissNotice(id) => {
                self.notices.retain(|n| n.id != id);
                Task::none()
            }
            Message::Tick(now) => {
                self.notices
                    .retain(|n| now.saturating_duration_since(n.created) < n.lifetime());
                Task::none()
            }
        }
    }

    /// A field was edited; blur whichever field was edited before it.
    fn edited(&mut self, field: Field) -> Task<Message> {
        match self.focus.edit(field) {
            Some(previous) => self.blur(previous),
            None => Task::none(),
        }
    }

    fn blur(&mut self, field: Field) -> Task<Message> {
        match field {
            field if field.is_api_field() => self.check_api(),
            Field::DeviceId => self.connect_device(),
            _ => Task::none(),
        }
    }

    fn check_api(&mut self) -> Task<Message> {
        let Some(config) = self
            .validator
            .on_blur(&self.base_url, &self.model, &self.api_key)
        else {
            return Task::none();
        };

        let store = self.store.clone();
        Task::perform(
            async move { check_credentials(config, &store).await },
            Message::ApiChecked,
        )
    }

    fn connect_device(&mut self) -> Task<Message> {
        let address = match self.device_gate.on_blur(&self.device_id) {
            Ok(Some(address)) => address,
            Ok(None) => return Task::none(),
            Err(e) => {
                self.device_error = Some("Invalid IP Format".to_string());
                self.notify(LogLevel::Warning, e.to_string());
                return Task::none();
            }
        };

        self.device_error = None;
        self.notify(LogLevel::Info, format!("Connecting to {}...", address));

        // Progress steps stream in while the blocking connect is still running;
        // the stream ends when the worker drops its sender.
        let (progress, steps) = mpsc::unbounded::<String>();
        let connector = self.connector.clone();
        let connect = Task::perform(
            async move {
                let worker = move || {
                    connector.connect(&address, |step| {
                        let _ = progress.unbounded_send(step.to_string());
                    })
                };
                match tokio::task::spawn_blocking(worker).await {
                    Ok(result) => result.map_err(|e| e.to_string()),
                    Err(e) => Err(format!("ADB Error: {}", e)),
                }
            },
            Message::DeviceConnected,
        );

        Task::batch([Task::run(steps, Message::DeviceProgress), connect])
    }

    fn report_connection(&mut self, report: ConnectReport) {
        self.notify(
            LogLevel::Success,
            format!("Successfully connected to {}", report.address),
        );
        if let Some(e) = report.save_error {
            self.notify(LogLevel::Warning, format!("Settings not saved: {}", e));
        }
        match report.keyboard {
            KeyboardStatus::Repaired => {}
            KeyboardStatus::Installed(_) => {
                self.notify(LogLevel::Success, report.keyboard.to_string());
            }
            other => self.notify(LogLevel::Error, other.to_string()),
        }
    }

    fn start_run(&mut self) -> Task<Message> {
        let request = match RunRequest::new(
            &self.base_url,
            &self.model,
            self.language.as_code(),
            &self.api_key,
            &self.device_id,
            &self.task,
        ) {
            Ok(request) => request,
            Err(e) => {
                self.notify(LogLevel::Warning, e.to_string());
                return Task::none();
            }
        };

        self.status = RunStatus::Running;

        let (sender, receiver) = mpsc::unbounded();
        if let Err(e) = self.runner.spawn(request, sender.clone()) {
            tracing::error!("failed to start task thread: {}", e);
            sender.output(&format!("\nError: {}\n", e));
            sender.finished(FAILURE_EXIT_CODE);
        }
        drop(sender);

        Task::run(receiver, Message::Run)
    }

    /// Build the view.
    pub fn view(&self) -> Element<'_, Message> {
        let content = match self.view {
            View::Main => self.view_main(),
            View::Help => self.view_help(),
        };

        column![self.view_header(), horizontal_rule(1), content, self.view_notices()]
            .spacing(10)
            .padding(20)
            .into()
    }

    fn view_header(&self) -> Element<'_, Message> {
        let help_label = match self.view {
            View::Main => "Help",
            View::Help => "Back",
        };

        row![
            text("Open-AutoGLM Controller").size(24).font(BOLD),
            horizontal_space(),
            button(text(help_label))
                .on_press(Message::ToggleHelp)
                .style(button::secondary),
            button(text("Get API Key"))
                .on_press(Message::OpenUrl(API_KEY_DOCS_URL))
                .style(button::text),
            button(text("GitHub"))
                .on_press(Message::OpenUrl(PROJECT_URL))
                .style(button::text),
        ]
        .spacing(8)
        .align_y(iced::Alignment::Center)
        .into()
    }

    fn view_main(&self) -> Element<'_, Message> {
        let base_url = labeled(
            "Base URL",
            text_input("https://open.bigmodel.cn/api/paas/v4", &self.base_url)
                .on_input(Message::BaseUrlChanged)
                .on_submit(Message::FieldSubmitted(Field::BaseUrl))
                .padding(8),
        );
        let model = labeled(
            "Model",
            text_input("autoglm-phone", &self.model)
                .on_input(Message::ModelChanged)
                .on_submit(Message::FieldSubmitted(Field::Model))
                .padding(8),
        );
        let api_key = labeled(
            "API Key",
            text_input("", &self.api_key)
                .on_input(Message::ApiKeyChanged)
                .on_submit(Message::FieldSubmitted(Field::ApiKey))
                .secure(true)
                .padding(8),
        );
        let language = column![
            text("Language").size(12),
            pick_list(Language::ALL, Some(self.language), Message::LanguageSelected)
                .width(160),
        ]
        .spacing(4);
        let device_id = labeled(
            "Device ID (IP:Port or Serial)",
            text_input("e.g. 192.168.1.5:5555", &self.device_id)
                .on_input(Message::DeviceIdChanged)
                .on_submit(Message::FieldSubmitted(Field::DeviceId))
                .padding(8),
        );
        let device_error = self
            .device_error
            .as_ref()
            .map(|e| text(e).size(12).color(ERROR_COLOR));

        let task_row = row![
            text_input("Task Description", &self.task)
                .on_input(Message::TaskChanged)
                .on_submit_maybe((!self.is_running()).then_some(Message::RunTask))
                .padding(10),
            button(text("Clear")).on_press(Message::ClearTask).style(button::secondary),
        ]
        .spacing(10);

        let run_btn = button(text("Run Task"))
            .on_press_maybe((!self.is_running()).then_some(Message::RunTask))
            .style(button::primary)
            .padding([8, 16]);
        let stop_btn = button(text("Stop"))
            .on_press(Message::StopTask)
            .style(button::danger)
            .padding([8, 16]);
        let clear_btn = button(text("Clear Output"))
            .on_press(Message::ClearOutput)
            .style(button::secondary)
            .padding([8, 16]);

        let controls = row![
            run_btn,
            stop_btn,
            clear_btn,
            checkbox("Auto Scroll", self.output.auto_scroll())
                .on_toggle(Message::AutoScrollToggled),
            text(self.status.label()).color(self.status.color()),
        ]
        .spacing(10)
        .align_y(iced::Alignment::Center);

        let output = container(
            scrollable(text(self.output.text()).font(Font::MONOSPACE).size(12))
                .id(output_scroll_id())
                .width(Length::Fill)
                .height(Length::Fill),
        )
        .width(Length::Fill)
        .height(Length::Fill)
        .padding(10)
        .style(container::bordered_box);

        column![
            row![base_url, model].spacing(10),
            row![api_key, language].spacing(10),
            device_id,
        ]
        .push_maybe(device_error)
        .push(horizontal_rule(1))
        .push(text("Task:").font(BOLD))
        .push(task_row)
        .push(controls)
        .push(horizontal_rule(1))
        .push(text("Output:").font(BOLD))
        .push(output)
        .spacing(10)
        .height(Length::Fill)
        .into()
    }

    fn view_help(&self) -> Element<'_, Message> {
        let help = get_help(self.language.as_code());

        let sections = help.sections.iter().map(|section| {
            column![text(section.heading).size(18).font(BOLD), text(section.body).size(14)]
                .spacing(4)
                .into()
        });

        let content = Column::with_children(sections).spacing(16).padding(10);

        let log_path = self
            .output
            .log_file_path()
            .map(|p| format!("Session log: {}", p.display()))
            .unwrap_or_else(|| "Session log: not created".to_string());

        column![
            text(help.title).size(22).font(BOLD),
            scrollable(content).height(Length::Fill),
            text(log_path).size(12),
        ]
        .spacing(10)
        .height(Length::Fill)
        .into()
    }

    fn view_notices(&self) -> Element<'_, Message> {
        let notices = self.notices.iter().map(|notice| {
            let background = notice.color();
            container(
                row![
                    text(&notice.message).color(Color::WHITE).width(Length::Fill),
                    button(text("x").color(Color::WHITE))
                        .on_press(Message::DismissNotice(notice.id))
                        .style(button::text),
                ]
                .align_y(iced::Alignment::Center),
            )
            .padding([6, 12])
            .width(Length::Fill)
            .style(move |_theme: &Theme| container::Style {
                background: Some(background.into()),
                border: Border {
                    radius: 4.0.into(),
                    ..Border::default()
                },
                ..container::Style::default()
            })
            .into()
        });

        Column::with_children(notices).spacing(4).into()
    }
}

fn output_scroll_id() -> scrollable::Id {
    scrollable::Id::new("output")
}

/// Helper function to stack a small label over an input.
fn labeled<'a>(
    label: &'a str,
    input: impl Into<Element<'a, Message>>,
) -> Element<'a, Message> {
    column![text(label).size(12), input.into()]
        .spacing(4)
        .width(Length::Fill)
        .into()
}
