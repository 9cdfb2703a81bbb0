//! Save Table workflow: upload a file and persist it as a named table.

use std::path::PathBuf;
use std::sync::mpsc::Sender;

use crate::api::{ApiClient, ApiError, SaveTableRequest, Saved, WriteMode};
use crate::catalog::TableCatalog;
use crate::op::{Controller, OperationState};
use crate::telemetry::Reporter;
use crate::widgets::text_input::TextInput;
use crate::AppEvent;

/// Shown when the exchange itself failed and the service supplied no message
pub const SAVE_FALLBACK: &str = "An error occurred while saving the table.";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SaveTableFocus {
    #[default]
    FileInput,
    TableInput,
    ModeSelector,
    SaveButton,
}

pub struct SaveTableForm {
    pub focus: SaveTableFocus,
    pub file_input: TextInput,
    pub table_input: TextInput,
    pub mode: WriteMode,
    pub catalog: TableCatalog,
    pub state: OperationState<Saved>,
    controller: Controller,
}

impl SaveTableForm {
    pub fn new(default_mode: WriteMode, history_limit: usize) -> Self {
        Self {
            focus: SaveTableFocus::default(),
            file_input: TextInput::new()
                .with_history("file".to_string())
                .with_history_limit(history_limit)
                .with_placeholder("path/to/data.csv"),
            table_input: TextInput::new()
                .with_history("table".to_string())
                .with_history_limit(history_limit)
                .with_placeholder("table name"),
            mode: default_mode,
            catalog: TableCatalog::new(),
            state: OperationState::Idle,
            controller: Controller::new(),
        }
    }

    pub fn next_focus(&mut self) {
        self.focus = match self.focus {
            SaveTableFocus::FileInput => SaveTableFocus::TableInput,
            SaveTableFocus::TableInput => SaveTableFocus::ModeSelector,
            SaveTableFocus::ModeSelector => SaveTableFocus::SaveButton,
            SaveTableFocus::SaveButton => SaveTableFocus::FileInput,
        };
    }

    pub fn prev_focus(&mut self) {
        self.focus = match self.focus {
            SaveTableFocus::FileInput => SaveTableFocus::SaveButton,
            SaveTableFocus::TableInput => SaveTableFocus::FileInput,
            SaveTableFocus::ModeSelector => SaveTableFocus::TableInput,
            SaveTableFocus::SaveButton => SaveTableFocus::ModeSelector,
        };
    }

    pub fn cycle_mode(&mut self) {
        let idx = WriteMode::ALL
            .iter()
            .position(|m| *m == self.mode)
            .unwrap_or(0);
        self.mode = WriteMode::ALL[(idx + 1) % WriteMode::ALL.len()];
    }

    /// Validate current fields into a save request
    pub fn validate(&self) -> Result<SaveTableRequest, String> {
        let file = self.file_input.value().trim();
        if file.is_empty() {
            return Err("Please select a file to upload.".to_string());
        }
        let path = PathBuf::from(file);
        if !path.is_file() {
            return Err(format!("File not found: {}", path.display()));
        }
        let table_name = self.table_input.value().trim();
        if table_name.is_empty() {
            return Err("Please enter a table name.".to_string());
        }
        Ok(SaveTableRequest {
            file: path,
            table_name: table_name.to_string(),
            write_mode: self.mode,
        })
    }

    /// Submit the form. Click telemetry fires before validation.
    pub fn submit(&mut self, api: &ApiClient, reporter: &dyn Reporter, tx: &Sender<AppEvent>) {
        reporter.record(
            "save_table_click",
            serde_json::json!({
                "file": self.file_input.value(),
                "table_name": self.table_input.value(),
                "write_mode": self.mode.as_field(),
            }),
        );

        let validated = self.validate();
        let api = api.clone();
        self.controller.run(
            &mut self.state,
            tx,
            move || validated,
            move |req| api.save_table(&req),
            AppEvent::SaveFinished,
        );
    }

    /// Reconcile a completion. Returns whether it was applied.
    pub fn finish(
        &mut self,
        seq: u64,
        outcome: Result<Saved, ApiError>,
        reporter: &dyn Reporter,
    ) -> bool {
        let applied = self
            .state
            .apply(seq, outcome.map_err(|e| e.user_message(SAVE_FALLBACK)));
        if applied {
            match &self.state {
                OperationState::Success(saved) => reporter.record(
                    "save_table_success",
                    serde_json::json!({"destination": saved.destination}),
                ),
                OperationState::Error(message) => {
                    reporter.record("save_table_error", serde_json::json!({"error": message}))
                }
                _ => {}
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::NullReporter;
    use std::io::Write;
    use std::sync::mpsc::channel;
    use std::time::Duration;

    fn form_with_file() -> (SaveTableForm, tempfile::NamedTempFile) {
        let mut form = SaveTableForm::new(WriteMode::Append, 10);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a,b").unwrap();
        form.file_input
            .set_value(file.path().display().to_string());
        (form, file)
    }

    #[test]
    fn test_file_is_validated_before_table_name() {
        let form = SaveTableForm::new(WriteMode::Append, 10);
        assert_eq!(
            form.validate().unwrap_err(),
            "Please select a file to upload."
        );
    }

    #[test]
    fn test_empty_table_name_validation_message() {
        let (form, _file) = form_with_file();
        assert_eq!(form.validate().unwrap_err(), "Please enter a table name.");
    }

    #[test]
    fn test_whitespace_table_name_is_rejected() {
        let (mut form, _file) = form_with_file();
        form.table_input.set_value("   ".to_string());
        assert_eq!(form.validate().unwrap_err(), "Please enter a table name.");
    }

    #[test]
    fn test_invalid_submit_never_dispatches() {
        let (tx, rx) = channel();
        let api = ApiClient::new("http://127.0.0.1:1");
        let (mut form, _file) = form_with_file();

        form.submit(&api, &NullReporter, &tx);

        assert!(!form.state.is_pending());
        assert_eq!(form.state.error(), Some("Please enter a table name."));
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_destination_is_stored_verbatim() {
        let (mut form, _file) = form_with_file();
        form.state = OperationState::Pending { seq: 1 };

        let applied = form.finish(
            1,
            Ok(Saved {
                destination: "warehouse.t1".to_string(),
            }),
            &NullReporter,
        );
        assert!(applied);
        assert_eq!(
            form.state.payload().map(|s| s.destination.as_str()),
            Some("warehouse.t1")
        );
    }

    #[test]
    fn test_cycle_mode() {
        let mut form = SaveTableForm::new(WriteMode::Append, 10);
        form.cycle_mode();
        assert_eq!(form.mode, WriteMode::Overwrite);
        form.cycle_mode();
        assert_eq!(form.mode, WriteMode::Append);
    }
}
