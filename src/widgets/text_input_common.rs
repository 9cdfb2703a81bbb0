use color_eyre::Result;
use std::fs;
use std::io::{BufRead, BufReader, Write};

use crate::cache::CacheManager;

/// Shared utilities for text input widgets
/// Load history from a cache file
pub fn load_history_impl(cache: &CacheManager, history_id: &str) -> Result<Vec<String>> {
    let history_file = cache.cache_file(&format!("{}_history.txt", history_id));

    if !history_file.exists() {
        return Ok(Vec::new());
    }

    let file = fs::File::open(&history_file)?;
    let reader = BufReader::new(file);
    let mut history = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            history.push(line);
        }
    }

    Ok(history)
}

/// Save history to a cache file
pub fn save_history_impl(
    cache: &CacheManager,
    history_id: &str,
    history: &[String],
    limit: usize,
) -> Result<()> {
    cache.ensure_cache_dir()?;
    let history_file = cache.cache_file(&format!("{}_history.txt", history_id));

    let mut file = fs::File::create(&history_file)?;

    // Write history entries (oldest first, but we keep the most recent `limit` entries)
    let start = history.len().saturating_sub(limit);
    for entry in history.iter().skip(start) {
        writeln!(file, "{}", entry)?;
    }

    Ok(())
}

/// Add entry to history with deduplication
/// Only consecutive duplicate entries are skipped
pub fn add_to_history(history: &mut Vec<String>, entry: String) {
    // Only skip if the new entry matches the last entry (consecutive duplicate)
    if let Some(last) = history.last() {
        if last == &entry {
            return; // Skip consecutive duplicate
        }
    }
    history.push(entry);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_to_history() {
        let mut history = Vec::new();

        add_to_history(&mut history, "SELECT * FROM self".to_string());
        assert_eq!(history.len(), 1);

        add_to_history(&mut history, "SELECT a FROM self".to_string());
        assert_eq!(history.len(), 2);

        // Consecutive duplicate is skipped
        add_to_history(&mut history, "SELECT a FROM self".to_string());
        assert_eq!(history.len(), 2);

        // Non-consecutive duplicate is preserved
        add_to_history(&mut history, "SELECT * FROM self".to_string());
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_history_round_trip_respects_limit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::with_dir(dir.path().to_path_buf());

        let history: Vec<String> = (0..10).map(|i| format!("query {}", i)).collect();
        save_history_impl(&cache, "sql", &history, 4).unwrap();

        let loaded = load_history_impl(&cache, "sql").unwrap();
        assert_eq!(loaded.len(), 4);
        assert_eq!(loaded.first().map(String::as_str), Some("query 6"));
        assert_eq!(loaded.last().map(String::as_str), Some("query 9"));
    }

    #[test]
    fn test_load_history_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::with_dir(dir.path().to_path_buf());
        assert!(load_history_impl(&cache, "sql").unwrap().is_empty());
    }
}
