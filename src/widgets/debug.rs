use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::{Paragraph, Widget},
};

/// Operational counters shown on the debug strip (`--debug`)
#[derive(Default)]
pub struct DebugState {
    pub enabled: bool,
    pub num_events: usize,
    pub num_frames: usize,
}

impl Widget for &DebugState {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(format!(
            "events: {}  frames: {}",
            self.num_events, self.num_frames
        ))
        .style(Style::default().fg(Color::DarkGray))
        .render(area, buf);
    }
}
