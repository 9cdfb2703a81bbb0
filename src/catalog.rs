//! Advisory catalog of table names known to the service.
//!
//! Fetched once per workflow mount; read-only afterwards (a table saved in
//! this session does not appear until the next mount). A failed fetch is
//! non-fatal: the catalog stays empty, the table-name field remains
//! free-text, and only autocomplete degrades.

use std::sync::mpsc::Sender;
use std::thread;

use crate::api::ApiClient;
use crate::{AppEvent, Pane};

#[derive(Debug, Default)]
pub struct TableCatalog {
    tables: Vec<String>,
    loaded: bool,
}

impl TableCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the table list on a worker thread. The result arrives as
    /// [`AppEvent::TablesLoaded`] for `pane`; each workflow fetches
    /// independently.
    pub fn spawn_fetch(pane: Pane, api: ApiClient, tx: Sender<AppEvent>) {
        thread::spawn(move || {
            let tables = api.list_tables().unwrap_or_else(|e| {
                log::debug!("table catalog fetch failed: {e}");
                Vec::new()
            });
            let _ = tx.send(AppEvent::TablesLoaded(pane, tables));
        });
    }

    pub fn set_tables(&mut self, tables: Vec<String>) {
        self.tables = tables;
        self.loaded = true;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    /// First known table name extending `prefix`. Advisory only; the field
    /// accepts any free-text name.
    pub fn suggest(&self, prefix: &str) -> Option<&str> {
        if prefix.is_empty() {
            return None;
        }
        self.tables
            .iter()
            .map(String::as_str)
            .find(|name| name.starts_with(prefix) && *name != prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggest_matches_prefix() {
        let mut catalog = TableCatalog::new();
        catalog.set_tables(vec!["trades".to_string(), "quotes".to_string()]);

        assert_eq!(catalog.suggest("tr"), Some("trades"));
        assert_eq!(catalog.suggest("q"), Some("quotes"));
        assert_eq!(catalog.suggest("x"), None);
    }

    #[test]
    fn test_suggest_ignores_empty_and_exact_input() {
        let mut catalog = TableCatalog::new();
        catalog.set_tables(vec!["trades".to_string()]);

        assert_eq!(catalog.suggest(""), None);
        assert_eq!(catalog.suggest("trades"), None);
    }

    #[test]
    fn test_unloaded_catalog_is_empty() {
        let catalog = TableCatalog::new();
        assert!(!catalog.is_loaded());
        assert!(catalog.tables().is_empty());
        assert_eq!(catalog.suggest("t"), None);
    }
}
