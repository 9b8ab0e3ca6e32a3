//! Terminal UI browsing probed endpoints

use crate::database::{SettingsDatabase, Theme};
use crate::proxy::{
    launch_link, short_fingerprint, ChannelSink, Feed, FeedKind, PageSize, Pipeline, ProbeResult,
    Progress, ResultAggregator, RunContext, RunEvent, Scheme,
};
use crate::tui::actions::{copy_to_clipboard, open_link};
use crate::tui::palette::{tier_label, Palette};
use crate::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{info, warn};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Duration;

/// How long the copy confirmation stays visible
const COPY_LABEL_RESET: Duration = Duration::from_secs(2);

/// Endpoint browser application state
pub struct App {
    /// Fetcher and probe engine shared with spawned runs
    pipeline: Arc<Pipeline>,
    /// Persisted settings store
    settings: SettingsDatabase,
    /// Source of run ids; events from older runs are dropped
    runs: RunContext,
    /// Feed being browsed
    feed: Feed,
    /// A user supplied URL pins the feed; Tab does not switch it
    pinned: bool,
    /// Sender handed to each run's sink
    tx: UnboundedSender<RunEvent>,
    /// Events from the current and superseded runs
    rx: UnboundedReceiver<RunEvent>,
    /// Results of the current run rebuilt from render events
    aggregator: ResultAggregator,
    /// Probes completed out of the run's total
    progress: Progress,
    /// Number of results shown
    page_size: PageSize,
    /// Selected row within the visible page
    list_state: ListState,
    /// Latest status line from the run or an action
    status_message: String,
    /// A run is in flight
    loading: bool,
    /// Active color theme
    theme: Theme,
    /// When the last copy succeeded, for the "Copied!" label
    copied_at: Option<Instant>,
    /// Exit the event loop on the next iteration
    should_quit: bool,
}

impl App {
    pub async fn new(pipeline: Pipeline, settings: SettingsDatabase, feed: Feed, pinned: bool) -> Result<Self> {
        let theme = settings.theme().await?;
        let (tx, rx) = mpsc::unbounded_channel();

        Ok(Self {
            pipeline: Arc::new(pipeline),
            settings,
            runs: RunContext::new(),
            feed,
            pinned,
            tx,
            rx,
            aggregator: ResultAggregator::default(),
            progress: Progress::default(),
            page_size: PageSize::default(),
            list_state: ListState::default(),
            status_message: "Starting...".to_string(),
            loading: false,
            theme,
            copied_at: None,
            should_quit: false,
        })
    }

    /// Run the TUI application
    pub async fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.run_app(&mut terminal).await;

        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    async fn run_app<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        self.refresh();

        while !self.should_quit {
            terminal.draw(|f| self.ui(f))?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_input(key.code).await?;
                    }
                }
            }

            while let Ok(event) = self.rx.try_recv() {
                self.apply(event);
            }

            if self
                .copied_at
                .is_some_and(|at| at.elapsed() >= COPY_LABEL_RESET)
            {
                self.copied_at = None;
            }
        }

        Ok(())
    }

    /// Start a new run for the current feed, superseding any in flight
    fn refresh(&mut self) {
        let token = self.runs.begin();
        info!("Refreshing {} (run {})", self.feed.url, token.id());

        self.aggregator = ResultAggregator::new(self.pipeline.engine().config().thresholds);
        self.progress = Progress::default();
        self.list_state.select(None);
        self.loading = true;

        let pipeline = Arc::clone(&self.pipeline);
        let feed = self.feed.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let mut sink = ChannelSink::new(tx);
            let error = pipeline
                .run(&feed, &token, &mut sink)
                .await
                .err()
                .map(|e| e.to_string());
            sink.finish(token.id(), error);
        });
    }

    /// Apply an event from a pipeline run, ignoring superseded runs
    fn apply(&mut self, event: RunEvent) {
        if !self.runs.is_current(event.run_id()) {
            return;
        }

        match event {
            RunEvent::Status { message, .. } => self.status_message = message,
            RunEvent::Render {
                results, progress, ..
            } => {
                for result in results {
                    self.aggregator.add(result);
                }
                self.progress = progress;
                if self.list_state.selected().is_none() && !self.page().is_empty() {
                    self.list_state.select(Some(0));
                }
            }
            RunEvent::Finished { error, .. } => {
                self.loading = false;
                if let Some(error) = error {
                    warn!("Run failed: {}", error);
                }
            }
        }
    }

    fn page(&self) -> &[ProbeResult] {
        self.aggregator.page(self.page_size)
    }

    fn selected(&self) -> Option<&ProbeResult> {
        self.list_state.selected().and_then(|i| self.page().get(i))
    }

    fn set_page_size(&mut self, page_size: PageSize) {
        self.page_size = page_size;
        let len = self.page().len();
        let selected = match self.list_state.selected() {
            _ if len == 0 => None,
            Some(i) => Some(i.min(len - 1)),
            None => Some(0),
        };
        self.list_state.select(selected);
    }

    async fn handle_input(&mut self, key: KeyCode) -> Result<()> {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Tab if !self.pinned => {
                let kind = match self.feed.kind {
                    FeedKind::Telegram => FeedKind::V2ray,
                    FeedKind::V2ray => FeedKind::Telegram,
                };
                self.feed = Feed::builtin(kind);
                self.refresh();
            }
            KeyCode::Char('p') => self.set_page_size(self.page_size.next()),
            KeyCode::Char('a') => self.set_page_size(PageSize::All),
            KeyCode::Char('t') => {
                self.theme = self.theme.toggle();
                self.settings.set_theme(self.theme).await?;
            }
            KeyCode::Char('c') => {
                if let Some(link) = self.selected().map(|r| launch_link(&r.descriptor)) {
                    match copy_to_clipboard(&link) {
                        Ok(()) => self.copied_at = Some(Instant::now()),
                        Err(e) => self.status_message = format!("Copy failed: {}", e),
                    }
                }
            }
            KeyCode::Char('o') | KeyCode::Enter => {
                if let Some(link) = self.selected().map(|r| launch_link(&r.descriptor)) {
                    if let Err(e) = open_link(&link) {
                        self.status_message = format!("Could not open link: {}", e);
                    }
                }
            }
            KeyCode::Down => {
                let len = self.page().len();
                let i = match self.list_state.selected() {
                    Some(i) if i + 1 < len => i + 1,
                    _ => 0,
                };
                self.list_state.select((len > 0).then_some(i));
            }
            KeyCode::Up => {
                let len = self.page().len();
                let i = match self.list_state.selected() {
                    Some(i) if i > 0 => i - 1,
                    _ => len.saturating_sub(1),
                };
                self.list_state.select((len > 0).then_some(i));
            }
            _ => {}
        }
        Ok(())
    }

    fn ui(&mut self, f: &mut Frame) {
        let palette = Palette::for_theme(self.theme);
        f.render_widget(Block::default().style(palette.base()), f.size());

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Title
                Constraint::Length(3), // Legend
                Constraint::Length(3), // Progress bar
                Constraint::Min(0),    // Endpoint list
                Constraint::Length(4), // Selected link
                Constraint::Length(3), // Status bar
            ])
            .split(f.size());

        let title = match self.feed.kind {
            FeedKind::Telegram => "Telegram proxies",
            FeedKind::V2ray => "V2Ray configs",
        };
        let title = Paragraph::new(format!("{} | {} | theme: {}", title, self.feed.name, self.theme))
            .style(Style::default().fg(palette.accent))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).border_style(palette.border(false)));
        f.render_widget(title, chunks[0]);

        let summary = self.aggregator.summary();
        let thresholds = *self.aggregator.thresholds();
        let legend = Paragraph::new(Line::from(vec![
            Span::raw(format!("{} working  ", summary.total)),
            Span::styled(
                format!("● excellent (≤{}ms): {}  ", thresholds.good_max_ms, summary.good),
                Style::default().fg(palette.good),
            ),
            Span::styled(
                format!(
                    "● average ({}-{}ms): {}  ",
                    thresholds.good_max_ms + 1,
                    thresholds.mid_max_ms,
                    summary.mid
                ),
                Style::default().fg(palette.mid),
            ),
            Span::styled(
                format!("● weak (>{}ms): {}", thresholds.mid_max_ms, summary.bad),
                Style::default().fg(palette.bad),
            ),
        ]))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(palette.border(false)));
        f.render_widget(legend, chunks[1]);

        let percent = if self.loading { self.progress.percent().min(100) } else { 100 };
        let gauge = Gauge::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Progress")
                    .border_style(palette.border(false)),
            )
            .gauge_style(Style::default().fg(palette.accent).bg(palette.background))
            .percent(percent)
            .label(format!(
                "{}/{} ({}%)",
                self.progress.completed, self.progress.total, percent
            ));
        f.render_widget(gauge, chunks[2]);

        let page = self.aggregator.page(self.page_size);
        let items: Vec<ListItem> = if page.is_empty() {
            let text = if self.loading {
                "Waiting for the first reachable endpoint..."
            } else {
                "No working endpoints found. Try again in a few minutes or press 'r'."
            };
            vec![ListItem::new(text).style(Style::default().fg(palette.muted))]
        } else {
            page.iter()
                .enumerate()
                .map(|(i, result)| {
                    let tier = result.tier(&thresholds);
                    let color = tier.map_or(palette.muted, |t| palette.tier(t));
                    let d = &result.descriptor;
                    let mut content = format!(
                        "{:>3}. [{:<6}] {:<40} {:>6}ms  {}",
                        i + 1,
                        d.scheme.label(),
                        d.to_simple_string(),
                        result.elapsed_ms.unwrap_or_default(),
                        tier.map_or("", tier_label)
                    );
                    if d.scheme != Scheme::TelegramProxy {
                        content.push_str(&format!("  #{}", short_fingerprint(&d.raw_line)));
                    }
                    ListItem::new(content).style(Style::default().fg(color))
                })
                .collect()
        };

        let list_title = format!(
            "Endpoints: showing {} of {} (page size {})",
            page.len(),
            summary.total,
            self.page_size
        );
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(list_title)
                    .border_style(palette.border(true)),
            )
            .highlight_style(
                Style::default()
                    .bg(palette.highlight)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol(">> ");
        f.render_stateful_widget(list, chunks[3], &mut self.list_state);

        let link = self
            .selected()
            .map(|r| launch_link(&r.descriptor))
            .unwrap_or_default();
        let copy_label = if self.copied_at.is_some() { "Copied!" } else { "c: copy" };
        let detail = Paragraph::new(link)
            .style(Style::default().fg(palette.foreground))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Link ({} | o: open)", copy_label))
                    .border_style(palette.border(false)),
            );
        f.render_widget(detail, chunks[4]);

        let help = if self.pinned {
            "r: refresh | p: page size | a: all | t: theme | q: quit"
        } else {
            "r: refresh | Tab: switch list | p: page size | a: all | t: theme | q: quit"
        };
        let status_color = if self.loading { palette.mid } else { palette.good };
        let status = Paragraph::new(Line::from(vec![
            Span::styled(self.status_message.clone(), Style::default().fg(status_color)),
            Span::styled(format!("  [{}]", help), Style::default().fg(palette.muted)),
        ]))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Status")
                .border_style(palette.border(false)),
        );
        f.render_widget(status, chunks[5]);
    }
}
