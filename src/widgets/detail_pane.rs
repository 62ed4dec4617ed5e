use ratatui::{
    buffer::Buffer,
    layout::{Rect, Alignment},
    style::{Stylize, Style, Color},
    text::{Line, Span, Text},
    widgets::{Block, Paragraph, Widget, BorderType, Wrap},
};

use crate::core::connection::ConnectionRecord;

/// Text about the selected record, refreshed on the UI tick.
pub struct DetailPaneWidget {
    lines: Vec<(&'static str, String)>,
    status: Option<String>,
}

impl DetailPaneWidget {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            status: None,
        }
    }

    pub fn update(&mut self, record: Option<&ConnectionRecord>, status: Option<&str>) {
        self.status = status.map(str::to_string);
        self.lines = match record {
            Some(rec) => describe(rec),
            None => Vec::new(),
        };
    }
}

fn describe(rec: &ConnectionRecord) -> Vec<(&'static str, String)> {
    vec![
        ("Protocol", rec.protocol.to_string()),
        ("Local", rec.local_endpoint()),
        ("Remote", rec.remote_endpoint()),
        ("State", rec.state.clone().unwrap_or_default()),
        ("PID", rec.pid.map(|pid| pid.to_string()).unwrap_or_default()),
        ("Process", rec.process_name().unwrap_or("Unknown").to_string()),
        ("Service", rec.service_name().unwrap_or_default().to_string()),
        ("Path", rec.process_path().unwrap_or_default().to_string()),
    ]
}

impl Widget for &DetailPaneWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut lines: Vec<Line> = Vec::new();

        if let Some(ref status) = self.status {
            lines.push(Line::from(Span::styled(
                status.clone(),
                Style::default().fg(Color::Red).bold(),
            )));
        }

        if self.lines.is_empty() {
            lines.push(Line::from(Span::styled(
                "No connection selected",
                Style::default().fg(Color::Gray),
            )));
        }

        for (label, value) in &self.lines {
            lines.push(Line::from(vec![
                Span::raw(format!("{}: ", label)),
                Span::styled(value.clone(), Style::default().fg(Color::Green).bold()),
            ]));
        }

        let paragraph = Paragraph::new(Text::from(lines))
            .block(
                Block::bordered()
                    .title("Details")
                    .title_style(Style::new().bold().fg(Color::Cyan))
                    .border_type(BorderType::Plain)
                    .border_style(Style::new().fg(Color::Blue))
            )
            .wrap(Wrap { trim: true })
            .alignment(Alignment::Left);

        paragraph.render(area, buf);
    }
}
