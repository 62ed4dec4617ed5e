use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use crossbeam::channel::{self, Receiver};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, MouseEvent, MouseEventKind};
use crossterm::{execute, event::EnableMouseCapture, event::DisableMouseCapture};
use log::{debug, info};
use ratatui::{DefaultTerminal, Frame};

use crate::config::Config;
use crate::core::filters::FilterCriterion;
use crate::core::identity::IdentityResolver;
use crate::core::scheduler::{RefreshOutcome, RefreshScheduler, TickOutcome, TimerHandle};
use crate::core::snapshot::SnapshotBuilder;
use crate::core::view::ViewState;
use crate::widgets::{
    ConnectionTableWidget,
    DetailPaneWidget,
    SystemReadoutWidget,
    FilterWidget,
    ProcessPopupWidget,
};

use ratatui::layout::{Layout, Direction, Constraint};
use ratatui::widgets::Paragraph;
use ratatui::style::{Style, Color};
use ratatui::text::{Span, Line};

/// Upper bound on a single event poll so finished refreshes show up promptly.
const MAX_POLL: Duration = Duration::from_millis(200);

pub struct App {
    pub connection_table_widget: ConnectionTableWidget,
    pub detail_pane_widget: DetailPaneWidget,
    pub system_readout_widget: SystemReadoutWidget,
    pub filter_widget: FilterWidget,
    pub process_popup_widget: ProcessPopupWidget,
    pub view: Arc<Mutex<ViewState>>,
    pub scheduler: Arc<RefreshScheduler>,
    outcomes: Receiver<RefreshOutcome>,
    lookup: IdentityResolver,
    timer: Option<TimerHandle>,
    pub refresh_interval: Duration,
    pub exit: bool,
    pub last_tick: Instant,
    pub tick_rate: Duration,
    pub mouse_enabled: bool,
}

impl App {
    pub fn new(config: Config) -> Self {
        let view = Arc::new(Mutex::new(ViewState::new()));
        let (tx, rx) = channel::unbounded();

        let source = config.source.into_source();
        info!("Reading connections from {}", source.describe());
        let builder = SnapshotBuilder::new(source, IdentityResolver::for_host());
        let scheduler = Arc::new(RefreshScheduler::new(
            builder,
            config.initial_filter,
            move |outcome| {
                // The receiver is gone only while the app is shutting down.
                let _ = tx.send(outcome);
            },
        ));

        App {
            connection_table_widget: ConnectionTableWidget::new(Arc::clone(&view)),
            detail_pane_widget: DetailPaneWidget::new(),
            system_readout_widget: SystemReadoutWidget::new().with_max_points(300),
            filter_widget: FilterWidget::new(),
            process_popup_widget: ProcessPopupWidget::new(),
            view,
            scheduler,
            outcomes: rx,
            lookup: IdentityResolver::for_host(),
            timer: None,
            refresh_interval: config.refresh_interval,
            exit: false,
            last_tick: Instant::now(),
            tick_rate: config.ui_interval,
            mouse_enabled: false,
        }
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> io::Result<()> {
        if let Ok(()) = execute!(
            std::io::stdout(),
            EnableMouseCapture
        ) {
            self.mouse_enabled = true;
        }

        self.timer = Some(self.scheduler.start(self.refresh_interval));

        let result = self.run_loop(terminal);

        if let Some(timer) = self.timer.take() {
            timer.stop();
        }
        self.scheduler.wait();

        if self.mouse_enabled {
            let _ = execute!(
                std::io::stdout(),
                DisableMouseCapture
            );
        }

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> io::Result<()> {
        self.tick();

        while !self.exit {
            self.drain_outcomes();

            let timeout = self.tick_rate
                .checked_sub(self.last_tick.elapsed())
                .unwrap_or(Duration::ZERO)
                .min(MAX_POLL);

            if crossterm::event::poll(timeout)? {
                self.handle_events()?;
            }

            if self.last_tick.elapsed() >= self.tick_rate {
                self.tick();
                self.last_tick = Instant::now();
            }

            terminal.draw(|frame| self.draw(frame))?;
        }
        Ok(())
    }

    /// Moves every finished cycle into the view on the UI thread.
    fn drain_outcomes(&mut self) {
        let mut received = false;
        let mut view = self.view.lock().unwrap_or_else(PoisonError::into_inner);
        for outcome in self.outcomes.try_iter() {
            view.apply(outcome);
            received = true;
        }
        drop(view);
        if received {
            self.connection_table_widget.clamp_selection();
            self.update_detail_pane();
        }
    }

    fn tick(&mut self) {
        self.system_readout_widget.update();
        self.update_detail_pane();
    }

    fn update_detail_pane(&mut self) {
        let record = self.connection_table_widget.selected_record();
        let status = self.view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .status()
            .map(str::to_string);
        self.detail_pane_widget.update(record.as_ref(), status.as_deref());
    }

    fn draw(&self, frame: &mut Frame) {
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),   // First row: System readout
                Constraint::Min(8),      // Second row: Connection table
                Constraint::Length(11),  // Third row: Detail pane
                Constraint::Length(1),   // Fourth row: Status bar
            ])
            .margin(1)
            .split(frame.area());

        frame.render_widget(&self.system_readout_widget, main_chunks[0]);
        frame.render_widget(&self.connection_table_widget, main_chunks[1]);
        frame.render_widget(&self.detail_pane_widget, main_chunks[2]);

        let status_bar = Paragraph::new(Line::from(self.status_spans()));
        frame.render_widget(status_bar, main_chunks[3]);

        if self.filter_widget.is_active() {
            frame.render_widget(&self.filter_widget, frame.area());
        }

        if self.process_popup_widget.is_active() {
            frame.render_widget(&self.process_popup_widget, frame.area());
        }
    }

    fn status_spans(&self) -> Vec<Span<'static>> {
        let mut status_text = Vec::new();

        status_text.push(Span::styled(
            format!("Filter: {}", self.scheduler.criterion()),
            Style::default().fg(Color::Yellow),
        ));
        status_text.push(Span::raw(" | "));

        if self.scheduler.is_running() {
            status_text.push(Span::styled("Refreshing", Style::default().fg(Color::Magenta)));
            status_text.push(Span::raw(" | "));
        }

        let view = self.view.lock().unwrap_or_else(PoisonError::into_inner);
        if view.has_data() {
            let snapshot = view.snapshot();
            status_text.push(Span::styled(
                format!("{} records at {}", snapshot.len(), snapshot.taken_at().format("%H:%M:%S")),
                Style::default().fg(Color::Cyan),
            ));
        } else {
            status_text.push(Span::styled("Waiting for first snapshot", Style::default().fg(Color::Gray)));
        }
        status_text.push(Span::raw(" | "));

        if let Some(failed_at) = view.last_failure_at() {
            status_text.push(Span::styled(
                format!("Last failure {}", failed_at.format("%H:%M:%S")),
                Style::default().fg(Color::Red),
            ));
            status_text.push(Span::raw(" | "));
        }
        drop(view);

        // Add key bindings
        status_text.push(Span::styled("↑↓", Style::default().fg(Color::Green)));
        status_text.push(Span::raw(": Select "));

        status_text.push(Span::styled("Enter", Style::default().fg(Color::Green)));
        status_text.push(Span::raw(": Process "));

        status_text.push(Span::styled("f", Style::default().fg(Color::Green)));
        status_text.push(Span::raw(": Filter "));

        status_text.push(Span::styled("r", Style::default().fg(Color::Green)));
        status_text.push(Span::raw(": Refresh "));

        status_text.push(Span::styled("q", Style::default().fg(Color::Green)));
        status_text.push(Span::raw(": Quit"));

        status_text
    }

    fn handle_events(&mut self) -> io::Result<()> {
        match event::read()? {
            Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                self.handle_key_event(key_event)
            }
            Event::Mouse(mouse_event) => {
                self.handle_mouse_event(mouse_event)
            }
            _ => {}
        };
        Ok(())
    }

    fn handle_key_event(&mut self, key_event: KeyEvent) {
        if self.process_popup_widget.is_active() {
            self.process_popup_widget.hide();
            return;
        }

        if self.filter_widget.is_active() {
            if let Some(criterion) = self.filter_widget.handle_key_event(key_event) {
                self.apply_filter(criterion);
            }
            return;
        }

        match key_event.code {
            KeyCode::Char('q') => self.exit(),
            KeyCode::Char('f') => self.filter_widget.show(self.scheduler.criterion()),
            KeyCode::Char('r') => self.refresh_now(),
            KeyCode::Enter => self.show_process_info(),
            KeyCode::Up => self.connection_table_widget.select_up(1),
            KeyCode::Down => self.connection_table_widget.select_down(1),
            KeyCode::PageUp => self.connection_table_widget.select_up(10),
            KeyCode::PageDown => self.connection_table_widget.select_down(10),
            KeyCode::Home => self.connection_table_widget.select_first(),
            KeyCode::End => self.connection_table_widget.select_last(),
            _ => {}
        }
        self.update_detail_pane();
    }

    fn handle_mouse_event(&mut self, mouse_event: MouseEvent) {
        if !self.mouse_enabled {
            return;
        }

        match mouse_event.kind {
            MouseEventKind::ScrollUp => {
                self.connection_table_widget.select_up(3);
            }
            MouseEventKind::ScrollDown => {
                self.connection_table_widget.select_down(3);
            }
            _ => {}
        }
        self.update_detail_pane();
    }

    fn apply_filter(&mut self, criterion: FilterCriterion) {
        self.scheduler.set_criterion(criterion);
        self.connection_table_widget.select_first();
        self.refresh_now();
    }

    fn refresh_now(&mut self) {
        if self.scheduler.trigger_now() == TickOutcome::Dropped {
            debug!("Refresh already in flight, request dropped");
        }
    }

    fn show_process_info(&mut self) {
        let pid = match self.connection_table_widget.selected_record().and_then(|rec| rec.pid) {
            Some(pid) => pid,
            None => return,
        };
        let result = self.lookup.lookup_now(pid);
        self.process_popup_widget.show(result);
    }

    fn exit(&mut self) {
        self.exit = true
    }
}
