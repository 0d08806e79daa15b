//! Help page text for the controller, in Chinese and English.

/// Where API keys for the default endpoint are issued.
pub const API_KEY_DOCS_URL: &str = "https://docs.bigmodel.cn/cn/api/introduction";

/// Home of this controller.
pub const PROJECT_URL: &str = "https://github.com/Lama9/Open-AutoGLM-Gui";

/// Help page strings
#[derive(Debug, Clone)]
pub struct HelpText {
    pub title: &'static str,
    pub sections: &'static [HelpSection],
}

/// One titled block of the help page.
#[derive(Debug, Clone)]
pub struct HelpSection {
    pub heading: &'static str,
    pub body: &'static str,
}

/// Chinese help
pub static HELP_ZH: HelpText = HelpText {
    title: "Open-AutoGLM Controller 使用指南",
    sections: &[
        HelpSection {
            heading: "1. 简介",
            body: "这是一个为 Open-AutoGLM 设计的图形化控制台，用于简化命令行操作，提供更直观的任务管理和设备连接体验。",
        },
        HelpSection {
            heading: "2. 连接设备",
            body: "确保手机已开启 USB 调试。在 Device ID 输入框中输入 IP:端口 (如 192.168.1.5:5555)，按回车或切换到其他输入框后程序会自动连接，并自动检测、安装和启用 ADB Keyboard 输入法。",
        },
        HelpSection {
            heading: "3. 配置 API",
            body: "输入 Base URL、API Key 和 Model 名称 (如 autoglm-phone)。离开输入框后程序会自动验证连通性，验证成功后配置会被保存。",
        },
        HelpSection {
            heading: "4. 运行任务",
            body: "在 Task 输入框中描述任务 (如 \"打开微信发送消息给张三\")，点击 Run 开始运行，底部日志窗口会实时显示 Agent 的执行过程。运行中的任务无法停止。",
        },
        HelpSection {
            heading: "5. 常见问题",
            body: "连接失败: 检查手机上是否需要点击 \"允许调试\"，IP 是否正确，电脑和手机是否在同一 Wi-Fi 下。\n任务无反应: 检查 API Key 是否过期，Base URL 是否正确。",
        },
        HelpSection {
            heading: "6. 关于",
            body: "原始项目地址: https://github.com/zai-org/Open-AutoGLM\nAPI Key 获取: https://docs.bigmodel.cn/cn/api/introduction",
        },
    ],
};

/// English help
pub static HELP_EN: HelpText = HelpText {
    title: "Open-AutoGLM Controller Guide",
    sections: &[
        HelpSection {
            heading: "1. Overview",
            body: "A graphical console for Open-AutoGLM that replaces the command line with a form for device connection and task runs.",
        },
        HelpSection {
            heading: "2. Connecting a device",
            body: "Enable USB debugging on the phone. Enter IP:port (e.g. 192.168.1.5:5555) in Device ID, then press Enter or move to another field. The controller connects, then checks for ADB Keyboard and installs and enables it when needed.",
        },
        HelpSection {
            heading: "3. API settings",
            body: "Fill in Base URL, API Key and Model (e.g. autoglm-phone). Leaving a field triggers a connectivity check; settings are saved only when the check succeeds.",
        },
        HelpSection {
            heading: "4. Running a task",
            body: "Describe the task, then click Run. The output window streams the agent's console output. A running task cannot be stopped.",
        },
        HelpSection {
            heading: "5. Troubleshooting",
            body: "Connection failed: accept the debugging prompt on the phone, check the IP, and keep both devices on the same Wi-Fi.\nNo progress: check that the API key is valid and the Base URL is correct.",
        },
        HelpSection {
            heading: "6. About",
            body: "Upstream project: https://github.com/zai-org/Open-AutoGLM\nAPI keys: https://docs.bigmodel.cn/cn/api/introduction",
        },
    ],
};

/// Get help text by language.
///
/// # Arguments
/// * `lang` - Language code, "en" for English, anything else for Chinese.
pub fn get_help(lang: &str) -> &'static HelpText {
    match lang {
        "en" => &HELP_EN,
        _ => &HELP_ZH,
    }
}
