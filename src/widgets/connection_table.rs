use std::sync::{Arc, Mutex};
use ratatui::{
    buffer::Buffer,
    layout::{Rect, Constraint},
    style::{Stylize, Style, Color},
    widgets::{Block, Table, Row, Cell, Widget, BorderType},
};

use crate::core::connection::{ConnectionRecord, Protocol};
use crate::core::view::ViewState;

pub struct ConnectionTableWidget {
    view: Arc<Mutex<ViewState>>,
    selected: usize,
}

impl ConnectionTableWidget {
    pub fn new(view: Arc<Mutex<ViewState>>) -> Self {
        Self {
            view,
            selected: 0,
        }
    }

    pub fn select_up(&mut self, amount: usize) {
        self.selected = self.selected.saturating_sub(amount);
    }

    pub fn select_down(&mut self, amount: usize) {
        let total = self.row_count();
        self.selected = (self.selected + amount).min(total.saturating_sub(1));
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.row_count().saturating_sub(1);
    }

    /// Keeps the selection inside the current snapshot after a refresh.
    pub fn clamp_selection(&mut self) {
        let total = self.row_count();
        self.selected = self.selected.min(total.saturating_sub(1));
    }

    pub fn selected_record(&self) -> Option<ConnectionRecord> {
        let view = self.view.lock().ok()?;
        view.snapshot().get(self.selected).cloned()
    }

    fn row_count(&self) -> usize {
        self.view.lock().map(|view| view.snapshot().len()).unwrap_or(0)
    }
}

impl Widget for &ConnectionTableWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let view_guard = match self.view.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        let records = view_guard.snapshot().records();

        let content_height = area.height.saturating_sub(4);
        let visible_rows = (content_height as usize).max(1);
        let total_rows = records.len();

        // Scroll just far enough to keep the selected row on screen.
        let start_idx = (self.selected + 1).saturating_sub(visible_rows);
        let end_idx = (start_idx + visible_rows).min(total_rows);
        let visible_records = records.get(start_idx..end_idx).unwrap_or(&[]);

        let rows: Vec<Row> = visible_records.iter().enumerate().map(|(offset, rec)| {
            let protocol_style = match rec.protocol {
                Protocol::Tcp => Style::new().fg(Color::Green),
                Protocol::Udp => Style::new().fg(Color::Magenta),
            };

            let row = Row::new(vec![
                Cell::from(rec.protocol.as_str()).style(protocol_style),
                Cell::from(rec.local_address.clone()),
                Cell::from(rec.local_port.clone()),
                Cell::from(rec.remote_address.clone()),
                Cell::from(rec.remote_port.clone()),
                Cell::from(rec.state.clone().unwrap_or_default()),
                Cell::from(rec.pid.map(|pid| pid.to_string()).unwrap_or_default()),
                Cell::from(rec.process_name().unwrap_or_default().to_string()),
                Cell::from(rec.service_name().unwrap_or_default().to_string()),
                Cell::from(rec.process_path().unwrap_or_default().to_string()),
            ]);

            if start_idx + offset == self.selected {
                row.style(Style::new().bg(Color::DarkGray).bold())
            } else {
                row
            }
        }).collect();

        let widths = [
            Constraint::Length(5),       // Protocol
            Constraint::Percentage(13),  // Local IP
            Constraint::Length(7),       // Local Port
            Constraint::Percentage(13),  // Remote IP
            Constraint::Length(7),       // Remote Port
            Constraint::Length(12),      // State
            Constraint::Length(7),       // PID
            Constraint::Percentage(14),  // Process
            Constraint::Percentage(16),  // Service
            Constraint::Percentage(24),  // Path
        ];

        let title = if view_guard.has_data() {
            format!(
                "Connections [{}] - {} rows at {}",
                view_guard.snapshot().criterion(),
                total_rows,
                view_guard.snapshot().taken_at().format("%H:%M:%S")
            )
        } else {
            "Connections - waiting for first snapshot".to_string()
        };

        let table = Table::new(rows, widths)
            .header(
                Row::new(vec![
                    "Proto",
                    "Local IP",
                    "L.Port",
                    "Remote IP",
                    "R.Port",
                    "State",
                    "PID",
                    "Process",
                    "Service",
                    "Path",
                ])
                .style(Style::new().bold().fg(Color::White))
                .bottom_margin(1)
            )
            .block(
                Block::bordered()
                    .title(title)
                    .title_style(Style::new().bold().fg(Color::Cyan))
                    .border_type(BorderType::Plain)
                    .border_style(Style::new().fg(Color::Blue))
            );

        table.render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::parse_listing;
    use crate::core::snapshot::Snapshot;
    use chrono::Local;

    fn widget_with(text: &str) -> ConnectionTableWidget {
        let mut view = ViewState::new();
        view.apply(Ok(Snapshot::new(parse_listing(text), Local::now())));
        ConnectionTableWidget::new(Arc::new(Mutex::new(view)))
    }

    #[test]
    fn test_selection_stays_within_snapshot() {
        let mut table = widget_with(
            "TCP 0.0.0.0:135 0.0.0.0:0 LISTENING 1044\nTCP 0.0.0.0:445 0.0.0.0:0 LISTENING 4\n",
        );
        table.select_down(10);
        assert_eq!(table.selected_record().unwrap().local_port, "445");
        table.select_up(1);
        assert_eq!(table.selected_record().unwrap().local_port, "135");
        table.select_last();
        assert_eq!(table.selected_record().unwrap().pid, Some(4));
        table.select_first();
        assert_eq!(table.selected_record().unwrap().pid, Some(1044));
    }

    #[test]
    fn test_title_follows_displayed_snapshot() {
        let listing = parse_listing("TCP 0.0.0.0:135 0.0.0.0:0 LISTENING 1044\nUDP 0.0.0.0:500 *:* 3920\n");
        let all = Snapshot::new(listing, Local::now());
        let view = Arc::new(Mutex::new(ViewState::new()));
        view.lock().unwrap().apply(Ok(all.clone()));
        let table = ConnectionTableWidget::new(Arc::clone(&view));

        let area = Rect::new(0, 0, 160, 10);
        let render = |table: &ConnectionTableWidget| {
            let mut buf = Buffer::empty(area);
            table.render(area, &mut buf);
            buf.content.iter().map(|cell| cell.symbol()).collect::<String>()
        };
        assert!(render(&table).contains("Connections [All] - 2 rows"));

        view.lock()
            .unwrap()
            .apply(Ok(crate::core::filters::apply(&all, crate::core::filters::FilterCriterion::Udp)));
        assert!(render(&table).contains("Connections [UDP] - 1 rows"));
    }

    #[test]
    fn test_render_shows_rows() {
        let table = widget_with("TCP 0.0.0.0:135 0.0.0.0:0 LISTENING 1044\n");
        let area = Rect::new(0, 0, 160, 10);
        let mut buf = Buffer::empty(area);
        (&table).render(area, &mut buf);

        let rendered: String = buf.content.iter().map(|cell| cell.symbol()).collect();
        assert!(rendered.contains("LISTENING"));
        assert!(rendered.contains("1044"));
    }
}
