//! Convert workflow: upload a file, get back the converted file's storage
//! path, and offer it for download.

use std::path::PathBuf;
use std::sync::mpsc::Sender;

use crate::api::{ApiClient, ApiError, Converted, OutputFormat, UploadRequest};
use crate::op::{Controller, OperationState};
use crate::telemetry::Reporter;
use crate::widgets::text_input::TextInput;
use crate::AppEvent;

/// Shown when the exchange itself failed and the service supplied no message
pub const UPLOAD_FALLBACK: &str = "An error occurred during upload.";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ConvertFocus {
    #[default]
    FileInput,
    FormatSelector,
    ConvertButton,
}

pub struct ConvertForm {
    pub focus: ConvertFocus,
    pub file_input: TextInput,
    pub format: OutputFormat,
    pub state: OperationState<Converted>,
    controller: Controller,
}

impl ConvertForm {
    pub fn new(default_format: OutputFormat, history_limit: usize) -> Self {
        Self {
            focus: ConvertFocus::default(),
            file_input: TextInput::new()
                .with_history("file".to_string())
                .with_history_limit(history_limit)
                .with_placeholder("path/to/data.csv"),
            format: default_format,
            state: OperationState::Idle,
            controller: Controller::new(),
        }
    }

    pub fn next_focus(&mut self) {
        self.focus = match self.focus {
            ConvertFocus::FileInput => ConvertFocus::FormatSelector,
            ConvertFocus::FormatSelector => ConvertFocus::ConvertButton,
            ConvertFocus::ConvertButton => ConvertFocus::FileInput,
        };
    }

    pub fn prev_focus(&mut self) {
        self.focus = match self.focus {
            ConvertFocus::FileInput => ConvertFocus::ConvertButton,
            ConvertFocus::FormatSelector => ConvertFocus::FileInput,
            ConvertFocus::ConvertButton => ConvertFocus::FormatSelector,
        };
    }

    pub fn cycle_format(&mut self) {
        let idx = OutputFormat::ALL
            .iter()
            .position(|f| *f == self.format)
            .unwrap_or(0);
        self.format = OutputFormat::ALL[(idx + 1) % OutputFormat::ALL.len()];
    }

    /// Validate current fields into an upload request
    pub fn validate(&self) -> Result<UploadRequest, String> {
        let file = self.file_input.value().trim();
        if file.is_empty() {
            return Err("Please select a file to upload.".to_string());
        }
        let path = PathBuf::from(file);
        if !path.is_file() {
            return Err(format!("File not found: {}", path.display()));
        }
        Ok(UploadRequest {
            file: path,
            output_format: self.format,
        })
    }

    /// Submit the form. The click event is recorded before validation runs;
    /// the controller then takes over (validation failures land in the
    /// workflow state without dispatching).
    pub fn submit(&mut self, api: &ApiClient, reporter: &dyn Reporter, tx: &Sender<AppEvent>) {
        reporter.record(
            "convert_click",
            serde_json::json!({
                "file": self.file_input.value(),
                "output_format": self.format.as_field(),
            }),
        );

        let validated = self.validate();
        let api = api.clone();
        self.controller.run(
            &mut self.state,
            tx,
            move || validated,
            move |req| api.convert(&req),
            AppEvent::ConvertFinished,
        );
    }

    /// Reconcile a completion. Returns whether it was applied (stale
    /// completions are dropped without telemetry).
    pub fn finish(
        &mut self,
        seq: u64,
        outcome: Result<Converted, ApiError>,
        reporter: &dyn Reporter,
    ) -> bool {
        let applied = self
            .state
            .apply(seq, outcome.map_err(|e| e.user_message(UPLOAD_FALLBACK)));
        if applied {
            match &self.state {
                OperationState::Success(converted) => reporter.record(
                    "convert_success",
                    serde_json::json!({"file_path": converted.file_path}),
                ),
                OperationState::Error(message) => {
                    reporter.record("convert_error", serde_json::json!({"error": message}))
                }
                _ => {}
            }
        }
        applied
    }

    /// Download URL for the converted file; only available once a
    /// conversion has succeeded.
    pub fn download_url(&self, api: &ApiClient) -> Option<String> {
        self.state
            .payload()
            .map(|converted| api.download_url(&converted.file_path))
    }
}
