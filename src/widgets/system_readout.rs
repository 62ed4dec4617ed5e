use ratatui::{
    buffer::Buffer,
    layout::{Rect, Layout, Direction, Constraint},
    style::{Stylize, Style, Color},
    text::{Line, Span},
    widgets::{Block, Widget, Sparkline, BorderType, Paragraph},
    symbols,
};
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// CPU usage and available memory, sampled on every UI tick.
pub struct SystemReadoutWidget {
    system: System,
    max_points: usize,
    cpu_history: Vec<u64>,
    cpu_usage: f32,
    available_mb: f64,
}

impl SystemReadoutWidget {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
            .with_memory(MemoryRefreshKind::nothing().with_ram());

        Self {
            system: System::new_with_specifics(refresh_kind),
            max_points: 100,
            cpu_history: Vec::new(),
            cpu_usage: 0.0,
            available_mb: 0.0,
        }
    }

    pub fn with_max_points(mut self, points: usize) -> Self {
        self.max_points = points;
        self
    }

    pub fn update(&mut self) {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        self.cpu_usage = self.system.global_cpu_usage();
        self.available_mb = self.system.available_memory() as f64 / BYTES_PER_MB;

        self.cpu_history.push(self.cpu_usage.round() as u64);
        if self.cpu_history.len() > self.max_points {
            let excess = self.cpu_history.len() - self.max_points;
            self.cpu_history.drain(0..excess);
        }
    }
}

impl Widget for &SystemReadoutWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::bordered()
            .title("System")
            .title_style(Style::new().bold().fg(Color::Cyan))
            .border_type(BorderType::Plain)
            .border_style(Style::new().fg(Color::Blue));
        let inner = block.inner(area);
        block.render(area, buf);

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(30),  // Readout text
                Constraint::Min(10),     // CPU sparkline
            ])
            .split(inner);

        let text = Paragraph::new(vec![
            Line::from(vec![
                Span::raw("CPU Usage: "),
                Span::styled(
                    format!("{:.1}%", self.cpu_usage),
                    Style::default().fg(Color::Green).bold()
                ),
            ]),
            Line::from(vec![
                Span::raw("Available RAM: "),
                Span::styled(
                    format!("{:.1} MB", self.available_mb),
                    Style::default().fg(Color::Green).bold()
                ),
            ]),
        ]);
        text.render(chunks[0], buf);

        let width = chunks[1].width as usize;
        let start = self.cpu_history.len().saturating_sub(width);
        let sparkline = Sparkline::default()
            .data(&self.cpu_history[start..])
            .max(100)
            .bar_set(symbols::bar::NINE_LEVELS)
            .style(Style::new().fg(Color::Yellow));
        sparkline.render(chunks[1], buf);
    }
}
