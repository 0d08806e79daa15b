//! GUI entry point for the Phone Agent controller.
//!
//! Run with: cargo run --bin phone-agent-gui

use iced::font::Font;
use iced::{Size, Task};
use tracing_subscriber::EnvFilter;

use phone_agent_gui::config::GuiConfig;
use phone_agent_gui::gui::PhoneAgentApp;

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let app = iced::application(PhoneAgentApp::title, PhoneAgentApp::update, PhoneAgentApp::view)
        .theme(PhoneAgentApp::theme)
        .subscription(PhoneAgentApp::subscription)
        .window_size(Size::new(1000.0, 800.0));

    // Noto Sans SC for Chinese text, when shipped alongside the binary.
    let app = match GuiConfig::bundled_font() {
        Some(bytes) => app
            .font(bytes)
            .default_font(Font::with_name("Noto Sans SC")),
        None => {
            tracing::warn!("bundled font not found, falling back to the system default");
            app
        }
    };

    app.run_with(|| (PhoneAgentApp::new(), Task::none()))
}
