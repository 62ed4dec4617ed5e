use ratatui::{
    buffer::Buffer,
    layout::{Rect, Alignment},
    style::{Stylize, Style, Color},
    text::{Line, Span},
    widgets::{Block, BorderType, Paragraph, Widget, Clear, Wrap},
};

use crate::core::error::MonitorError;
use crate::core::identity::ProcessDetails;

/// Result of the one-shot process lookup for the selected row.
pub struct ProcessPopupWidget {
    content: Option<Result<ProcessDetails, MonitorError>>,
}

impl ProcessPopupWidget {
    pub fn new() -> Self {
        Self { content: None }
    }

    pub fn show(&mut self, result: Result<ProcessDetails, MonitorError>) {
        self.content = Some(result);
    }

    pub fn hide(&mut self) {
        self.content = None;
    }

    pub fn is_active(&self) -> bool {
        self.content.is_some()
    }
}

impl Widget for &ProcessPopupWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let content = match self.content {
            Some(ref content) => content,
            None => return,
        };

        let popup_width = area.width.min(70);
        let popup_height = 8.min(area.height);
        let popup_area = Rect {
            x: area.x + (area.width.saturating_sub(popup_width)) / 2,
            y: area.y + (area.height.saturating_sub(popup_height)) / 2,
            width: popup_width,
            height: popup_height,
        };

        Clear.render(popup_area, buf);

        let (title, color, lines) = match content {
            Ok(details) => (
                "Process Info",
                Color::Cyan,
                vec![
                    Line::from(format!("PID: {}", details.pid)),
                    Line::from(format!("Process: {}", details.name)),
                    Line::from(format!("Path: {}", details.path_or_na())),
                ],
            ),
            Err(e) => (
                "Error",
                Color::Red,
                vec![Line::from(Span::styled(
                    format!("Cannot obtain process info: {}", e),
                    Style::new().fg(Color::Red),
                ))],
            ),
        };

        let mut lines = lines;
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Press any key to close",
            Style::new().fg(Color::Gray),
        )));

        Paragraph::new(lines)
            .block(
                Block::bordered()
                    .title(title)
                    .title_style(Style::new().bold().fg(color))
                    .border_type(BorderType::Plain)
                    .border_style(Style::new().fg(color))
            )
            .wrap(Wrap { trim: false })
            .alignment(Alignment::Left)
            .render(popup_area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(widget: &ProcessPopupWidget) -> String {
        let area = Rect::new(0, 0, 80, 12);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        buf.content.iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_failed_lookup_is_reported() {
        let mut popup = ProcessPopupWidget::new();
        popup.show(Err(MonitorError::OnDemandLookupFailed {
            pid: 77,
            reason: "process no longer exists".to_string(),
        }));
        assert!(rendered(&popup).contains("Cannot obtain process info"));

        popup.hide();
        assert!(!popup.is_active());
        assert!(!rendered(&popup).contains("Cannot"));
    }

    #[test]
    fn test_missing_path_shows_na() {
        let mut popup = ProcessPopupWidget::new();
        popup.show(Ok(ProcessDetails {
            pid: 4,
            name: "System".to_string(),
            path: None,
        }));
        let text = rendered(&popup);
        assert!(text.contains("Process: System"));
        assert!(text.contains("Path: N/A"));
    }
}
