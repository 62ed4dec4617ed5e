use ratatui::{
    buffer::Buffer,
    layout::{Rect, Layout, Direction, Constraint, Alignment},
    style::{Stylize, Style, Color},
    text::{Line, Span},
    widgets::{Block, BorderType, Paragraph, Widget, Clear},
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::core::filters::FilterCriterion;

/// Popup offering the closed set of view filters.
pub struct FilterWidget {
    highlighted: usize,
    active: bool,
}

impl FilterWidget {
    pub fn new() -> Self {
        Self {
            highlighted: 0,
            active: false,
        }
    }

    pub fn show(&mut self, current: FilterCriterion) {
        self.active = true;
        self.highlighted = FilterCriterion::ALL
            .iter()
            .position(|c| *c == current)
            .unwrap_or(0);
    }

    pub fn hide(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn handle_key_event(&mut self, key_event: KeyEvent) -> Option<FilterCriterion> {
        if !self.active {
            return None;
        }

        if key_event.kind != KeyEventKind::Press {
            return None;
        }

        let count = FilterCriterion::ALL.len();
        match key_event.code {
            KeyCode::Esc => {
                self.hide();
                None
            },
            KeyCode::Enter => {
                self.hide();
                Some(self.highlighted_criterion())
            },
            KeyCode::Down | KeyCode::Tab | KeyCode::Char('j') => {
                self.highlighted = (self.highlighted + 1) % count;
                None
            },
            KeyCode::Up | KeyCode::BackTab | KeyCode::Char('k') => {
                self.highlighted = (self.highlighted + count - 1) % count;
                None
            },
            KeyCode::Char(c) => {
                // First letter jumps straight to a filter: a/t/u/l/e.
                let wanted = c.to_ascii_lowercase();
                if let Some(idx) = FilterCriterion::ALL.iter().position(|crit| {
                    crit.as_str()
                        .chars()
                        .next()
                        .map_or(false, |first| first.to_ascii_lowercase() == wanted)
                }) {
                    self.highlighted = idx;
                }
                None
            },
            _ => None,
        }
    }

    fn highlighted_criterion(&self) -> FilterCriterion {
        FilterCriterion::ALL[self.highlighted % FilterCriterion::ALL.len()]
    }
}

impl Widget for &FilterWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if !self.active {
            return;
        }

        let popup_width = area.width.min(40);
        let popup_height = 11;

        let hmargin = (area.width.saturating_sub(popup_width)) / 2;
        let vmargin = (area.height.saturating_sub(popup_height)) / 2;

        let popup_area = Rect {
            x: area.x + hmargin,
            y: area.y + vmargin,
            width: popup_width,
            height: popup_height.min(area.height),
        };

        Clear.render(popup_area, buf);

        let block = Block::bordered()
            .title("Filter Connections")
            .title_style(Style::new().bold().fg(Color::Yellow))
            .border_type(BorderType::Plain)
            .border_style(Style::new().fg(Color::Yellow));

        let inner_area = block.inner(popup_area);

        block.render(popup_area, buf);

        let field_layout = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(FilterCriterion::ALL.len() as u16),  // Options
                Constraint::Length(1),  // Empty space
                Constraint::Length(1),  // Instructions
            ])
            .split(inner_area);

        let options: Vec<Line> = FilterCriterion::ALL.iter().enumerate().map(|(idx, criterion)| {
            if idx == self.highlighted {
                Line::from(Span::styled(
                    format!("> {}", criterion),
                    Style::new().fg(Color::Yellow).bold(),
                ))
            } else {
                Line::from(Span::styled(
                    format!("  {}", criterion),
                    Style::new().fg(Color::Gray),
                ))
            }
        }).collect();
        Paragraph::new(options).render(field_layout[0], buf);

        let instructions = Paragraph::new("Up/Down: Move  |  Enter: Apply  |  Esc: Cancel")
            .style(Style::new().fg(Color::Gray))
            .alignment(Alignment::Center);
        instructions.render(field_layout[2], buf);
    }
}
