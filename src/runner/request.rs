//! Run requests: the form snapshot taken when "Run" is clicked.

use thiserror::Error;

/// Run request errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("Please enter a task!")]
    EmptyTask,
}

/// Form values at the moment "Run" is clicked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRequest {
    pub base_url: String,
    pub model: String,
    pub language: String,
    pub api_key: String,
    pub device_id: String,
    pub task: String,
}

impl RunRequest {
    /// Build a request, trimming every field.
    ///
    /// The task is the only field that is validated.
    pub fn new(
        base_url: &str,
        model: &str,
        language: &str,
        api_key: &str,
        device_id: &str,
        task: &str,
    ) -> Result<Self, RunError> {
        let task = task.trim();
        if task.is_empty() {
            return Err(RunError::EmptyTask);
        }

        Ok(Self {
            base_url: base_url.trim().to_string(),
            model: model.trim().to_string(),
            language: language.trim().to_string(),
            api_key: api_key.trim().to_string(),
            device_id: device_id.trim().to_string(),
            task: task.to_string(),
        })
    }

    /// Command line for the entry point, with `script` as argv[0].
    ///
    /// Optional flags are only emitted for non-empty values and the task is
    /// always the last argument.
    pub fn to_args(&self, script: &str) -> Vec<String> {
        let mut args = vec![
            script.to_string(),
            "--base-url".to_string(),
            self.base_url.clone(),
            "--model".to_string(),
            self.model.clone(),
        ];

        let optional = [
            ("--lang", &self.language),
            ("--apikey", &self.api_key),
            ("--device-id", &self.device_id),
        ];
        for (flag, value) in optional {
            if !value.is_empty() {
                args.push(flag.to_string());
                args.push(value.clone());
            }
        }

        args.push(self.task.clone());
        args
    }
}
