//! Configuration module: runtime paths and bundled help text.

mod i18n;
mod runtime;

pub use i18n::{
    get_help, HelpSection, HelpText, API_KEY_DOCS_URL, HELP_EN, HELP_ZH, PROJECT_URL,
};
pub use runtime::{
    EntryPoint, GuiConfig, DEFAULT_INTERPRETER, DEFAULT_SCRIPT, ENV_ADB_PATH, ENV_AGENT_PYTHON,
    ENV_AGENT_SCRIPT, ENV_KEYBOARD_APK, ENV_SETTINGS_PATH, KEYBOARD_APK_NAME,
};
