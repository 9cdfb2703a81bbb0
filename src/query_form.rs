//! Query workflow: run ad-hoc SQL against a saved table or a previously
//! uploaded file and hold the result set for the grid.

use std::sync::mpsc::Sender;

use crate::api::{ApiClient, ApiError, QueryRequest, Record};
use crate::catalog::TableCatalog;
use crate::op::{Controller, OperationState};
use crate::telemetry::Reporter;
use crate::widgets::text_input::TextInput;
use crate::AppEvent;

/// Shown when the exchange itself failed and the service supplied no message
pub const QUERY_FALLBACK: &str = "An error occurred while running the query.";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum QueryFocus {
    #[default]
    TableInput,
    SqlInput,
    RunButton,
}

pub struct QueryForm {
    pub focus: QueryFocus,
    pub table_input: TextInput,
    pub sql_input: TextInput,
    pub catalog: TableCatalog,
    pub state: OperationState<Vec<Record>>,
    /// First visible row of the results grid
    pub scroll: usize,
    controller: Controller,
}

impl QueryForm {
    pub fn new(history_limit: usize) -> Self {
        Self {
            focus: QueryFocus::default(),
            table_input: TextInput::new()
                .with_history("table".to_string())
                .with_history_limit(history_limit)
                .with_placeholder("table name or upload path"),
            sql_input: TextInput::new()
                .with_history("sql".to_string())
                .with_history_limit(history_limit)
                .with_placeholder("SELECT * FROM self"),
            catalog: TableCatalog::new(),
            state: OperationState::Idle,
            scroll: 0,
            controller: Controller::new(),
        }
    }

    pub fn next_focus(&mut self) {
        self.focus = match self.focus {
            QueryFocus::TableInput => QueryFocus::SqlInput,
            QueryFocus::SqlInput => QueryFocus::RunButton,
            QueryFocus::RunButton => QueryFocus::TableInput,
        };
    }

    pub fn prev_focus(&mut self) {
        self.focus = match self.focus {
            QueryFocus::TableInput => QueryFocus::RunButton,
            QueryFocus::SqlInput => QueryFocus::TableInput,
            QueryFocus::RunButton => QueryFocus::SqlInput,
        };
    }

    /// Validate current fields into a query request. The table reference is
    /// optional context; an empty string is passed through for the service
    /// to judge.
    pub fn validate(&self) -> Result<QueryRequest, String> {
        let sql = self.sql_input.value().trim();
        if sql.is_empty() {
            return Err("Please enter a SQL query.".to_string());
        }
        Ok(QueryRequest {
            table_name: self.table_input.value().trim().to_string(),
            sql: sql.to_string(),
        })
    }

    /// Submit the form. Click telemetry fires before validation.
    pub fn submit(&mut self, api: &ApiClient, reporter: &dyn Reporter, tx: &Sender<AppEvent>) {
        reporter.record(
            "query_click",
            serde_json::json!({
                "table_name": self.table_input.value(),
                "sql": self.sql_input.value(),
            }),
        );

        let validated = self.validate();
        let api = api.clone();
        self.controller.run(
            &mut self.state,
            tx,
            move || validated,
            move |req| api.query(&req),
            AppEvent::QueryFinished,
        );
    }

    /// Reconcile a completion. Returns whether it was applied. The result
    /// row count goes into outcome telemetry.
    pub fn finish(
        &mut self,
        seq: u64,
        outcome: Result<Vec<Record>, ApiError>,
        reporter: &dyn Reporter,
    ) -> bool {
        let applied = self
            .state
            .apply(seq, outcome.map_err(|e| e.user_message(QUERY_FALLBACK)));
        if applied {
            self.scroll = 0;
            match &self.state {
                OperationState::Success(records) => reporter.record(
                    "query_success",
                    serde_json::json!({
                        "table_name": self.table_input.value(),
                        "rows": records.len(),
                    }),
                ),
                OperationState::Error(message) => {
                    reporter.record("query_error", serde_json::json!({"error": message}))
                }
                _ => {}
            }
        }
        applied
    }

    pub fn row_count(&self) -> Option<usize> {
        self.state.payload().map(Vec::len)
    }

    pub fn scroll_down(&mut self, lines: usize) {
        let rows = self.row_count().unwrap_or(0);
        self.scroll = (self.scroll + lines).min(rows.saturating_sub(1));
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
    }
}
