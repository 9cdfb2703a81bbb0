use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::{mpsc::Sender, Arc};

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

use ratatui::widgets::{Block, Borders, Paragraph, Tabs};

pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod convert_form;
pub mod op;
pub mod opener;
pub mod query_form;
pub mod save_table_form;
pub mod telemetry;
pub mod widgets;

pub use cache::CacheManager;
pub use config::{AppConfig, ConfigManager};

use api::{ApiClient, ApiError, Converted, Record, Saved};
use convert_form::{ConvertFocus, ConvertForm};
use query_form::{QueryFocus, QueryForm};
use save_table_form::{SaveTableFocus, SaveTableForm};
use telemetry::Reporter;
use widgets::controls::Controls;
use widgets::debug::DebugState;
use widgets::results_grid::ResultsGrid;
use widgets::text_input::{TextInput, TextInputEvent};

/// Application name used for cache directory and other app-specific paths
pub const APP_NAME: &str = "tabq";

/// Events driving the application state machine. Worker threads post the
/// `*Finished` completions; everything else originates in the terminal.
pub enum AppEvent {
    Key(KeyEvent),
    Resize(u16, u16), // resized (width, height)
    ConvertFinished(u64, Result<Converted, ApiError>),
    SaveFinished(u64, Result<Saved, ApiError>),
    QueryFinished(u64, Result<Vec<Record>, ApiError>),
    TablesLoaded(Pane, Vec<String>),
    Exit,
}

/// The three workflows, one pane each. Every pane owns its state
/// exclusively; switching panes never touches the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Convert,
    SaveTable,
    Query,
}

impl Pane {
    pub const ALL: [Self; 3] = [Self::Convert, Self::SaveTable, Self::Query];

    pub fn title(self) -> &'static str {
        match self {
            Self::Convert => "Convert",
            Self::SaveTable => "Save Table",
            Self::Query => "Query",
        }
    }
}

pub struct App {
    pub pane: Pane,
    pub convert: ConvertForm,
    pub save_table: SaveTableForm,
    pub query: QueryForm,
    api: ApiClient,
    reporter: Arc<dyn Reporter>,
    events: Sender<AppEvent>,
    cache: Option<CacheManager>,
    debug: DebugState,
}

impl App {
    /// Build the application and kick off one table-catalog fetch per
    /// table-aware workflow. Catalog failures degrade to an empty list and
    /// never block a form.
    pub fn new(
        events: Sender<AppEvent>,
        api: ApiClient,
        reporter: Arc<dyn Reporter>,
        config: &AppConfig,
    ) -> App {
        let history_limit = config.ui.history_limit;

        catalog::TableCatalog::spawn_fetch(Pane::SaveTable, api.clone(), events.clone());
        catalog::TableCatalog::spawn_fetch(Pane::Query, api.clone(), events.clone());

        App {
            pane: Pane::Convert,
            convert: ConvertForm::new(config.output_format(), history_limit),
            save_table: SaveTableForm::new(config.write_mode(), history_limit),
            query: QueryForm::new(history_limit),
            api,
            reporter,
            events,
            cache: CacheManager::new(APP_NAME).ok(),
            debug: DebugState::default(),
        }
    }

    pub fn enable_debug(&mut self) {
        self.debug.enabled = true;
    }

    pub fn next_pane(&mut self) {
        let idx = Pane::ALL.iter().position(|p| *p == self.pane).unwrap_or(0);
        self.pane = Pane::ALL[(idx + 1) % Pane::ALL.len()];
    }

    /// Whether the active pane has a dispatch in flight
    pub fn active_pending(&self) -> bool {
        match self.pane {
            Pane::Convert => self.convert.state.is_pending(),
            Pane::SaveTable => self.save_table.state.is_pending(),
            Pane::Query => self.query.state.is_pending(),
        }
    }

    /// Advance the state machine by one event. Completion events are routed
    /// to their workflow, which drops them when stale.
    pub fn event(&mut self, event: AppEvent) -> Option<AppEvent> {
        self.debug.num_events += 1;
        match event {
            AppEvent::Key(key) => self.key(&key),
            AppEvent::Resize(_cols, _rows) => None,
            AppEvent::ConvertFinished(seq, outcome) => {
                self.convert.finish(seq, outcome, self.reporter.as_ref());
                None
            }
            AppEvent::SaveFinished(seq, outcome) => {
                self.save_table.finish(seq, outcome, self.reporter.as_ref());
                None
            }
            AppEvent::QueryFinished(seq, outcome) => {
                self.query.finish(seq, outcome, self.reporter.as_ref());
                None
            }
            AppEvent::TablesLoaded(pane, tables) => {
                match pane {
                    Pane::SaveTable => self.save_table.catalog.set_tables(tables),
                    Pane::Query => self.query.catalog.set_tables(tables),
                    Pane::Convert => {}
                }
                None
            }
            AppEvent::Exit => None,
        }
    }

    fn key(&mut self, key: &KeyEvent) -> Option<AppEvent> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => return Some(AppEvent::Exit),
                KeyCode::Char('t') => {
                    self.next_pane();
                    return None;
                }
                KeyCode::Char('d') => {
                    self.open_download();
                    return None;
                }
                _ => {}
            }
        }

        match self.pane {
            Pane::Convert => self.convert_key(key),
            Pane::SaveTable => self.save_table_key(key),
            Pane::Query => self.query_key(key),
        }
    }

    fn convert_key(&mut self, key: &KeyEvent) -> Option<AppEvent> {
        match key.code {
            KeyCode::Tab => {
                self.convert.next_focus();
                return None;
            }
            KeyCode::BackTab => {
                self.convert.prev_focus();
                return None;
            }
            _ => {}
        }

        match self.convert.focus {
            ConvertFocus::FileInput => {
                match self.convert.file_input.handle_key(key, self.cache.as_ref()) {
                    TextInputEvent::Submit => {
                        self.submit_convert();
                        None
                    }
                    TextInputEvent::Cancel => Some(AppEvent::Exit),
                    _ => None,
                }
            }
            ConvertFocus::FormatSelector => match key.code {
                KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') => {
                    self.convert.cycle_format();
                    None
                }
                KeyCode::Enter => {
                    self.submit_convert();
                    None
                }
                KeyCode::Esc => Some(AppEvent::Exit),
                _ => None,
            },
            ConvertFocus::ConvertButton => match key.code {
                KeyCode::Enter | KeyCode::Char(' ') => {
                    self.submit_convert();
                    None
                }
                KeyCode::Esc => Some(AppEvent::Exit),
                _ => None,
            },
        }
    }

    fn save_table_key(&mut self, key: &KeyEvent) -> Option<AppEvent> {
        match key.code {
            KeyCode::Tab => {
                self.save_table.next_focus();
                return None;
            }
            KeyCode::BackTab => {
                self.save_table.prev_focus();
                return None;
            }
            _ => {}
        }

        match self.save_table.focus {
            SaveTableFocus::FileInput => {
                match self
                    .save_table
                    .file_input
                    .handle_key(key, self.cache.as_ref())
                {
                    TextInputEvent::Submit => {
                        self.submit_save_table();
                        None
                    }
                    TextInputEvent::Cancel => Some(AppEvent::Exit),
                    _ => None,
                }
            }
            SaveTableFocus::TableInput => {
                // Right at end-of-input accepts the catalog suggestion
                if key.code == KeyCode::Right && self.save_table.table_input.cursor_at_end() {
                    if let Some(name) = self
                        .save_table
                        .catalog
                        .suggest(self.save_table.table_input.value())
                    {
                        let name = name.to_string();
                        self.save_table.table_input.set_value(name);
                        return None;
                    }
                }
                match self
                    .save_table
                    .table_input
                    .handle_key(key, self.cache.as_ref())
                {
                    TextInputEvent::Submit => {
                        self.submit_save_table();
                        None
                    }
                    TextInputEvent::Cancel => Some(AppEvent::Exit),
                    _ => None,
                }
            }
            SaveTableFocus::ModeSelector => match key.code {
                KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') => {
                    self.save_table.cycle_mode();
                    None
                }
                KeyCode::Enter => {
                    self.submit_save_table();
                    None
                }
                KeyCode::Esc => Some(AppEvent::Exit),
                _ => None,
            },
            SaveTableFocus::SaveButton => match key.code {
                KeyCode::Enter | KeyCode::Char(' ') => {
                    self.submit_save_table();
                    None
                }
                KeyCode::Esc => Some(AppEvent::Exit),
                _ => None,
            },
        }
    }

    fn query_key(&mut self, key: &KeyEvent) -> Option<AppEvent> {
        match key.code {
            KeyCode::Tab => {
                self.query.next_focus();
                return None;
            }
            KeyCode::BackTab => {
                self.query.prev_focus();
                return None;
            }
            KeyCode::PageDown => {
                self.query.scroll_down(10);
                return None;
            }
            KeyCode::PageUp => {
                self.query.scroll_up(10);
                return None;
            }
            _ => {}
        }

        match self.query.focus {
            QueryFocus::TableInput => {
                if key.code == KeyCode::Right && self.query.table_input.cursor_at_end() {
                    if let Some(name) = self.query.catalog.suggest(self.query.table_input.value())
                    {
                        let name = name.to_string();
                        self.query.table_input.set_value(name);
                        return None;
                    }
                }
                match self.query.table_input.handle_key(key, self.cache.as_ref()) {
                    TextInputEvent::Submit => {
                        self.submit_query();
                        None
                    }
                    TextInputEvent::Cancel => Some(AppEvent::Exit),
                    _ => None,
                }
            }
            QueryFocus::SqlInput => {
                match self.query.sql_input.handle_key(key, self.cache.as_ref()) {
                    TextInputEvent::Submit => {
                        self.submit_query();
                        None
                    }
                    TextInputEvent::Cancel => Some(AppEvent::Exit),
                    _ => None,
                }
            }
            QueryFocus::RunButton => match key.code {
                KeyCode::Enter | KeyCode::Char(' ') => {
                    self.submit_query();
                    None
                }
                KeyCode::Esc => Some(AppEvent::Exit),
                _ => None,
            },
        }
    }

    /// Submit the Convert form unless its dispatch is already in flight.
    /// The pending check mirrors the disabled trigger; the controller
    /// ignores re-entrant dispatch as well.
    pub fn submit_convert(&mut self) {
        if self.convert.state.is_pending() {
            return;
        }
        self.convert
            .submit(&self.api, self.reporter.as_ref(), &self.events);
    }

    pub fn submit_save_table(&mut self) {
        if self.save_table.state.is_pending() {
            return;
        }
        self.save_table
            .submit(&self.api, self.reporter.as_ref(), &self.events);
    }

    pub fn submit_query(&mut self) {
        if self.query.state.is_pending() {
            return;
        }
        self.query
            .submit(&self.api, self.reporter.as_ref(), &self.events);
    }

    fn open_download(&mut self) {
        if let Some(url) = self.convert.download_url(&self.api) {
            self.reporter
                .record("download_click", serde_json::json!({"url": url}));
            if let Err(e) = opener::open_url(&url) {
                log::warn!("could not open download URL: {e}");
            }
        }
    }

    fn render_labeled_input(
        label: &str,
        input: &TextInput,
        focused: bool,
        area: Rect,
        buf: &mut Buffer,
    ) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(8), Constraint::Fill(1)])
            .split(area);
        let label_style = if focused {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        Paragraph::new(label).style(label_style).render(chunks[0], buf);
        input.render(chunks[1], buf);
    }

    fn render_selector<T: Copy + PartialEq>(
        label: &str,
        options: &[T],
        selected: T,
        name: fn(T) -> &'static str,
        focused: bool,
        area: Rect,
        buf: &mut Buffer,
    ) {
        let mut text = format!("{:<7} ", label);
        for option in options {
            if *option == selected {
                text.push_str(&format!("[{}] ", name(*option)));
            } else {
                text.push_str(&format!(" {}  ", name(*option)));
            }
        }
        let style = if focused {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        Paragraph::new(text).style(style).render(area, buf);
    }

    fn render_button(label: &str, focused: bool, pending: bool, area: Rect, buf: &mut Buffer) {
        let text = if pending {
            "[ Running... ]".to_string()
        } else {
            format!("[ {} ]", label)
        };
        let style = if pending {
            Style::default().fg(Color::DarkGray)
        } else if focused {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        Paragraph::new(text).style(style).render(area, buf);
    }

    /// Inline status line for one workflow: pending, success, or error
    fn render_status(
        pending_text: &str,
        pending: bool,
        success: Option<String>,
        error: Option<&str>,
        area: Rect,
        buf: &mut Buffer,
    ) {
        let (text, style) = if pending {
            (
                pending_text.to_string(),
                Style::default().fg(Color::Cyan),
            )
        } else if let Some(message) = error {
            (
                format!("\u{2717} Error: {}", message),
                Style::default().fg(Color::Red),
            )
        } else if let Some(message) = success {
            (message, Style::default().fg(Color::Green))
        } else {
            (String::new(), Style::default())
        };
        Paragraph::new(text).style(style).render(area, buf);
    }

    fn render_convert(&mut self, area: Rect, buf: &mut Buffer) {
        let pending = self.convert.state.is_pending();
        let block = Block::default().borders(Borders::ALL).title("Convert File");
        let inner = block.inner(area);
        block.render(area, buf);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Fill(1),
            ])
            .split(inner);

        self.convert
            .file_input
            .set_focused(self.convert.focus == ConvertFocus::FileInput);
        Self::render_labeled_input(
            "File:",
            &self.convert.file_input,
            self.convert.focus == ConvertFocus::FileInput,
            rows[0],
            buf,
        );
        Self::render_selector(
            "Format:",
            &api::OutputFormat::ALL,
            self.convert.format,
            api::OutputFormat::as_str,
            self.convert.focus == ConvertFocus::FormatSelector,
            rows[1],
            buf,
        );
        Self::render_button(
            "Convert",
            self.convert.focus == ConvertFocus::ConvertButton,
            pending,
            rows[2],
            buf,
        );

        let success = self.convert.state.payload().map(|converted| {
            format!(
                "\u{2713} Uploaded: {}  (Ctrl+D to download)",
                converted.file_path
            )
        });
        Self::render_status(
            "Uploading...",
            pending,
            success,
            self.convert.state.error(),
            rows[4],
            buf,
        );
    }

    fn render_save_table(&mut self, area: Rect, buf: &mut Buffer) {
        let pending = self.save_table.state.is_pending();
        let block = Block::default().borders(Borders::ALL).title("Save Table");
        let inner = block.inner(area);
        block.render(area, buf);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Fill(1),
            ])
            .split(inner);

        self.save_table
            .file_input
            .set_focused(self.save_table.focus == SaveTableFocus::FileInput);
        self.save_table
            .table_input
            .set_focused(self.save_table.focus == SaveTableFocus::TableInput);

        Self::render_labeled_input(
            "File:",
            &self.save_table.file_input,
            self.save_table.focus == SaveTableFocus::FileInput,
            rows[0],
            buf,
        );
        Self::render_labeled_input(
            "Table:",
            &self.save_table.table_input,
            self.save_table.focus == SaveTableFocus::TableInput,
            rows[1],
            buf,
        );
        Self::render_suggestion(
            &self.save_table.catalog,
            &self.save_table.table_input,
            self.save_table.focus == SaveTableFocus::TableInput,
            rows[2],
            buf,
        );
        Self::render_selector(
            "Mode:",
            &api::WriteMode::ALL,
            self.save_table.mode,
            api::WriteMode::as_str,
            self.save_table.focus == SaveTableFocus::ModeSelector,
            rows[3],
            buf,
        );
        Self::render_button(
            "Save",
            self.save_table.focus == SaveTableFocus::SaveButton,
            pending,
            rows[4],
            buf,
        );

        let success = self
            .save_table
            .state
            .payload()
            .map(|saved| format!("\u{2713} Saved: {}", saved.destination));
        Self::render_status(
            "Saving...",
            pending,
            success,
            self.save_table.state.error(),
            rows[5],
            buf,
        );
    }

    fn render_suggestion(
        catalog: &catalog::TableCatalog,
        input: &TextInput,
        focused: bool,
        area: Rect,
        buf: &mut Buffer,
    ) {
        if !focused {
            return;
        }
        if let Some(name) = catalog.suggest(input.value()) {
            Paragraph::new(format!("        \u{2192} {}  (Right to accept)", name))
                .style(Style::default().fg(Color::DarkGray))
                .render(area, buf);
        }
    }

    fn render_query(&mut self, area: Rect, buf: &mut Buffer) {
        let pending = self.query.state.is_pending();
        let block = Block::default().borders(Borders::ALL).title("Query");
        let inner = block.inner(area);
        block.render(area, buf);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Fill(1),
            ])
            .split(inner);

        self.query
            .table_input
            .set_focused(self.query.focus == QueryFocus::TableInput);
        self.query
            .sql_input
            .set_focused(self.query.focus == QueryFocus::SqlInput);

        Self::render_labeled_input(
            "Table:",
            &self.query.table_input,
            self.query.focus == QueryFocus::TableInput,
            rows[0],
            buf,
        );
        Self::render_labeled_input(
            "SQL:",
            &self.query.sql_input,
            self.query.focus == QueryFocus::SqlInput,
            rows[1],
            buf,
        );
        Self::render_suggestion(
            &self.query.catalog,
            &self.query.table_input,
            self.query.focus == QueryFocus::TableInput,
            rows[2],
            buf,
        );
        Self::render_button(
            "Run Query",
            self.query.focus == QueryFocus::RunButton,
            pending,
            rows[3],
            buf,
        );

        Self::render_status(
            "Running...",
            pending,
            None,
            self.query.state.error(),
            rows[4],
            buf,
        );

        if let Some(records) = self.query.state.payload() {
            ResultsGrid::new(records)
                .with_offset(self.query.scroll)
                .render(rows[5], buf);
        }
    }
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.debug.num_frames += 1;

        let mut constraints = vec![
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1), // Controls
        ];
        if self.debug.enabled {
            constraints.push(Constraint::Length(1));
        }
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        let titles: Vec<&str> = Pane::ALL.iter().map(|p| p.title()).collect();
        let selected = Pane::ALL.iter().position(|p| *p == self.pane).unwrap_or(0);
        Tabs::new(titles)
            .select(selected)
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .render(layout[0], buf);

        match self.pane {
            Pane::Convert => self.render_convert(layout[1], buf),
            Pane::SaveTable => self.render_save_table(layout[1], buf),
            Pane::Query => self.render_query(layout[1], buf),
        }

        let controls = Controls::new()
            .with_pending(self.active_pending())
            .with_row_count(self.query.row_count())
            .with_download_ready(self.convert.state.payload().is_some());
        controls.render(layout[2], buf);

        if self.debug.enabled {
            self.debug.render(layout[3], buf);
        }
    }
}
