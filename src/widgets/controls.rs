use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    widgets::{Paragraph, Widget},
};

#[derive(Default)]
pub struct Controls {
    pub row_count: Option<usize>,
    pub pending: bool,
    pub download_ready: bool,
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row_count(mut self, row_count: Option<usize>) -> Self {
        self.row_count = row_count;
        self
    }

    pub fn with_pending(mut self, pending: bool) -> Self {
        self.pending = pending;
        self
    }

    pub fn with_download_ready(mut self, download_ready: bool) -> Self {
        self.download_ready = download_ready;
        self
    }
}

impl Widget for &Controls {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut controls: Vec<(&str, &str)> = vec![
            ("^T", "Pane"),
            ("Tab", "Field"),
            ("Enter", "Run"),
        ];
        if self.download_ready {
            controls.push(("^D", "Download"));
        }
        controls.push(("Esc", "Quit"));

        let mut constraints = controls.iter().fold(vec![], |mut acc, (key, action)| {
            acc.push(Constraint::Length(key.chars().count() as u16 + 2));
            acc.push(Constraint::Length(action.chars().count() as u16 + 1));
            acc
        });

        // Space for the status section on the right
        constraints.push(Constraint::Fill(1));
        constraints.push(Constraint::Length(15));

        let layout = Layout::new(Direction::Horizontal, constraints).split(area);
        let color = Color::DarkGray;

        // Dim the hints while a dispatch is pending so the disabled trigger
        // reads as disabled
        let base_style = if self.pending {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        for (i, (key, action)) in controls.iter().enumerate() {
            let j = i * 2;
            Paragraph::new(*key)
                .style(base_style.bold())
                .centered()
                .render(layout[j], buf);
            Paragraph::new(*action)
                .style(base_style.bg(color))
                .render(layout[j + 1], buf);
        }

        let fill_idx = controls.len() * 2;
        Paragraph::new("")
            .style(base_style.bg(color))
            .render(layout[fill_idx], buf);

        let status = if self.pending {
            "Running...".to_string()
        } else if let Some(count) = self.row_count {
            format!("Rows: {}", count)
        } else {
            String::new()
        };
        Paragraph::new(status)
            .style(base_style.bg(color).fg(if self.pending {
                Color::Cyan
            } else {
                Color::White
            }))
            .right_aligned()
            .render(layout[fill_idx + 1], buf);
    }
}
