mod rows;
mod types;

pub use types::Focus;

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use std::collections::HashSet;
use std::io;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::client::ScanService;
use crate::controller::{SearchController, SearchRequest};
use crate::error::SearchError;
use crate::results::{
    FileEntryView, FolderGroup, ResultsView, MODIFIED_LABEL, NO_FILES_MESSAGE, PATH_LABEL,
    SIZE_LABEL,
};

use rows::{compute_visible_rows, folder_arrow, toggle, Row};
use types::{ActiveCacheClear, ActiveSearch, KeyOutcome};

const THROBBER_CHARS: [char; 8] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧'];

pub struct App<S> {
    controller: SearchController<S>,
    focus: Focus,
    results_state: ListState,
    /// Collapsed folder groups, by index into the current results
    collapsed_folders: HashSet<usize>,
    /// File entries whose details panel is open
    expanded_files: HashSet<(usize, usize)>,
    /// Scan request in flight (at most one)
    active_search: Option<ActiveSearch>,
    /// Cache clear requests in flight
    active_clears: Vec<ActiveCacheClear>,
    throbber_frame: usize,
    server_url: String,
}

impl<S> App<S>
where
    S: ScanService + Clone + Send + Sync + 'static,
{
    pub fn new(controller: SearchController<S>, server_url: String) -> Self {
        Self {
            controller,
            focus: Focus::BasePath,
            results_state: ListState::default(),
            collapsed_folders: HashSet::new(),
            expanded_files: HashSet::new(),
            active_search: None,
            active_clears: Vec::new(),
            throbber_frame: 0,
            server_url,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.run_event_loop(&mut terminal).await;

        // Every restore step runs even if an earlier one fails
        let restored = first_error([
            disable_raw_mode(),
            execute!(
                terminal.backend_mut(),
                LeaveAlternateScreen,
                DisableMouseCapture
            ),
            terminal.show_cursor(),
        ]);

        result?;
        Ok(restored?)
    }

    async fn run_event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press
                        && self.handle_key(key) == KeyOutcome::Quit
                    {
                        return Ok(());
                    }
                }
            }

            self.poll_tasks().await;
            self.tick(Instant::now());
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return KeyOutcome::Quit;
        }

        match key.code {
            KeyCode::Tab => {
                self.focus = self.focus.next();
                return KeyOutcome::Continue;
            }
            KeyCode::BackTab => {
                self.focus = self.focus.previous();
                return KeyOutcome::Continue;
            }
            _ => {}
        }

        match self.focus {
            Focus::BasePath => match key.code {
                KeyCode::Char(c) => {
                    let mut path = self.controller.base_path().to_string();
                    path.push(c);
                    self.controller.set_base_path(path);
                }
                KeyCode::Backspace => {
                    let mut path = self.controller.base_path().to_string();
                    path.pop();
                    self.controller.set_base_path(path);
                }
                KeyCode::Enter => self.submit(),
                KeyCode::Esc => self.focus = Focus::Results,
                _ => {}
            },
            Focus::Search => match key.code {
                KeyCode::Char(c) => {
                    let mut term = self.controller.search_input().to_string();
                    term.push(c);
                    self.controller.set_search_input(term, Instant::now());
                }
                KeyCode::Backspace => {
                    let mut term = self.controller.search_input().to_string();
                    if term.pop().is_some() {
                        self.controller.set_search_input(term, Instant::now());
                    }
                }
                KeyCode::Enter => self.submit(),
                KeyCode::Esc => self.focus = Focus::Results,
                _ => {}
            },
            Focus::Results => match key.code {
                KeyCode::Char('q') => return KeyOutcome::Quit,
                KeyCode::Down | KeyCode::Char('j') => self.results_next(),
                KeyCode::Up | KeyCode::Char('k') => self.results_previous(),
                KeyCode::Home | KeyCode::Char('g') => self.results_top(),
                KeyCode::End | KeyCode::Char('G') => self.results_bottom(),
                KeyCode::Enter | KeyCode::Char(' ') => self.toggle_selected(),
                KeyCode::Char('r') => self.submit(),
                KeyCode::Char('c') => self.start_clear_cache(None),
                KeyCode::Char('C') => {
                    let path = self.controller.base_path().to_string();
                    if path.is_empty() {
                        self.start_clear_cache(None);
                    } else {
                        self.start_clear_cache(Some(path));
                    }
                }
                KeyCode::Char('/') => self.focus = Focus::Search,
                KeyCode::Char('p') => self.focus = Focus::BasePath,
                _ => {}
            },
        }

        KeyOutcome::Continue
    }

    fn submit(&mut self) {
        if let Some(request) = self.controller.submit(Instant::now()) {
            self.spawn_search(request);
        }
    }

    fn tick(&mut self, now: Instant) {
        self.throbber_frame = self.throbber_frame.wrapping_add(1);
        if let Some(request) = self.controller.tick(now) {
            self.spawn_search(request);
        }
    }

    fn spawn_search(&mut self, request: SearchRequest) {
        let service = self.controller.service().clone();
        let path = request.base_path.clone();
        let handle = tokio::spawn(async move { service.scan(&path).await });
        self.active_search = Some(ActiveSearch { request, handle });
    }

    fn start_clear_cache(&mut self, path: Option<String>) {
        debug!(?path, "clearing cache");
        let service = self.controller.service().clone();
        let handle = tokio::spawn(async move { service.clear_cache(path.as_deref()).await });
        self.active_clears.push(handle);
    }

    /// Collect finished network tasks and hand their outcome to the controller
    async fn poll_tasks(&mut self) {
        if self
            .active_search
            .as_ref()
            .is_some_and(|search| search.handle.is_finished())
        {
            if let Some(active) = self.active_search.take() {
                let result = match active.handle.await {
                    Ok(result) => result,
                    Err(e) => Err(SearchError::Unexpected(e.to_string())),
                };
                self.controller
                    .finish_search(&active.request, result, Instant::now());
                self.reset_results_view();
            }
        }

        if self.active_clears.iter().any(|h| h.is_finished()) {
            let (finished, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.active_clears)
                .into_iter()
                .partition(|h| h.is_finished());
            self.active_clears = pending;

            for handle in finished {
                let result = match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(SearchError::Unexpected(e.to_string())),
                };
                self.controller.finish_clear_cache(result, Instant::now());
            }
        }
    }

    fn reset_results_view(&mut self) {
        self.collapsed_folders.clear();
        self.expanded_files.clear();
        let has_rows = !self.visible_rows().is_empty();
        self.results_state.select(if has_rows { Some(0) } else { None });
    }

    fn visible_rows(&self) -> Vec<Row> {
        compute_visible_rows(self.controller.results().groups(), &self.collapsed_folders)
    }

    fn toggle_selected(&mut self) {
        let rows = self.visible_rows();
        let Some(row) = self.results_state.selected().and_then(|i| rows.get(i)) else {
            return;
        };
        match *row {
            Row::Folder(group) => toggle(&mut self.collapsed_folders, group),
            Row::File(group, entry) => toggle(&mut self.expanded_files, (group, entry)),
        }
    }

    fn results_next(&mut self) {
        let len = self.visible_rows().len();
        if len == 0 {
            return;
        }
        let i = match self.results_state.selected() {
            Some(i) => (i + 1).min(len - 1),
            None => 0,
        };
        self.results_state.select(Some(i));
    }

    fn results_previous(&mut self) {
        if self.visible_rows().is_empty() {
            return;
        }
        let i = self
            .results_state
            .selected()
            .map_or(0, |i| i.saturating_sub(1));
        self.results_state.select(Some(i));
    }

    fn results_top(&mut self) {
        if !self.visible_rows().is_empty() {
            self.results_state.select(Some(0));
        }
    }

    fn results_bottom(&mut self) {
        let len = self.visible_rows().len();
        if len > 0 {
            self.results_state.select(Some(len - 1));
        }
    }

    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Base path
                Constraint::Length(3), // Search
                Constraint::Length(1), // Loading / banners
                Constraint::Min(0),    // Results
                Constraint::Length(1), // Stats
                Constraint::Length(1), // Key help
            ])
            .split(f.area());

        self.render_inputs(f, chunks[0], chunks[1]);
        self.render_banners(f, chunks[2]);
        self.render_results(f, chunks[3]);
        self.render_stats(f, chunks[4]);
        self.render_help_bar(f, chunks[5]);
    }

    fn render_inputs(&self, f: &mut Frame, path_area: Rect, search_area: Rect) {
        let searching = self.controller.is_searching();

        let path_title = format!("Path to scan | {}", self.server_url);
        f.render_widget(
            input_box(
                &path_title,
                self.controller.base_path(),
                self.focus == Focus::BasePath,
                false,
            ),
            path_area,
        );

        let search_title = if searching {
            "Search (scanning...)"
        } else {
            "Search by name"
        };
        f.render_widget(
            input_box(
                search_title,
                self.controller.search_input(),
                self.focus == Focus::Search,
                searching,
            ),
            search_area,
        );
    }

    fn render_banners(&self, f: &mut Frame, area: Rect) {
        let now = Instant::now();
        let mut spans = Vec::new();

        if self.controller.is_searching() {
            let throbber = THROBBER_CHARS[self.throbber_frame % THROBBER_CHARS.len()];
            spans.push(Span::styled(
                format!("{} Scanning...", throbber),
                Style::default().fg(Color::Cyan),
            ));
        }
        if let Some(message) = self.controller.error_message(now) {
            if !spans.is_empty() {
                spans.push(Span::raw(" | "));
            }
            spans.push(Span::styled(
                message.to_string(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ));
        }
        if let Some(message) = self.controller.success_message(now) {
            if !spans.is_empty() {
                spans.push(Span::raw(" | "));
            }
            spans.push(Span::styled(
                message.to_string(),
                Style::default().fg(Color::Green),
            ));
        }

        f.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_results(&mut self, f: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Results");

        let groups = match self.controller.results() {
            ResultsView::Cleared => {
                f.render_widget(block, area);
                return;
            }
            ResultsView::NoFiles => {
                let paragraph = Paragraph::new(NO_FILES_MESSAGE)
                    .style(Style::default().fg(Color::Red))
                    .alignment(Alignment::Center)
                    .block(block);
                f.render_widget(paragraph, area);
                return;
            }
            ResultsView::Groups(groups) => groups,
        };

        let items: Vec<ListItem> = compute_visible_rows(groups, &self.collapsed_folders)
            .into_iter()
            .map(|row| match row {
                Row::Folder(g) => {
                    folder_item(&groups[g], self.collapsed_folders.contains(&g))
                }
                Row::File(g, e) => file_item(
                    &groups[g].entries[e],
                    self.expanded_files.contains(&(g, e)),
                ),
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol(">> ");

        f.render_stateful_widget(list, area, &mut self.results_state);
    }

    fn render_stats(&self, f: &mut Frame, area: Rect) {
        let line = self.controller.stats_line().unwrap_or_default();
        f.render_widget(
            Paragraph::new(line.to_string()).style(Style::default().fg(Color::Gray)),
            area,
        );
    }

    fn render_help_bar(&self, f: &mut Frame, area: Rect) {
        let help_text = match self.focus {
            Focus::BasePath => "Enter: scan | Tab: next field | Esc: results | Ctrl-C: quit",
            Focus::Search => "Type to filter | Enter: scan now | Tab: next field | Esc: results",
            Focus::Results => {
                "↑↓/jk: navigate | Enter/Space: toggle | r: rescan | c/C: clear cache (all/path) | /: search | q: quit"
            }
        };

        f.render_widget(
            Paragraph::new(Line::from(Span::styled(
                help_text,
                Style::default().fg(Color::Gray),
            ))),
            area,
        );
    }
}

fn input_box<'a>(title: &'a str, value: &'a str, focused: bool, disabled: bool) -> Paragraph<'a> {
    let border_style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let text_style = if disabled {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };

    let mut spans = vec![Span::styled(value, text_style)];
    if focused {
        spans.push(Span::raw("█"));
    }

    Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(title),
    )
}

fn folder_item(group: &FolderGroup, collapsed: bool) -> ListItem<'_> {
    ListItem::new(Line::from(vec![
        Span::raw(folder_arrow(collapsed)),
        Span::raw(" "),
        Span::styled(
            group.folder.as_str(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(group.count_label(), Style::default().fg(Color::Gray)),
    ]))
}

fn file_item(entry: &FileEntryView, expanded: bool) -> ListItem<'_> {
    let (r, g, b) = entry.type_info.rgb();
    let mut spans = vec![
        Span::raw("  "),
        Span::styled(
            format!(" {} ", entry.type_info.name),
            Style::default().bg(Color::Rgb(r, g, b)).fg(Color::White),
        ),
        Span::raw(" "),
    ];
    spans.extend(entry.name_segments.iter().map(|seg| {
        if seg.highlighted {
            Span::styled(
                seg.text.as_str(),
                Style::default().bg(Color::Yellow).fg(Color::Black),
            )
        } else {
            Span::raw(seg.text.as_str())
        }
    }));

    let mut lines = vec![Line::from(spans)];
    if expanded {
        let label = Style::default().fg(Color::Yellow);
        lines.push(Line::from(vec![
            Span::styled(format!("      {} ", PATH_LABEL), label),
            Span::raw(entry.path.as_str()),
        ]));
        lines.push(Line::from(vec![
            Span::styled(format!("      {} ", SIZE_LABEL), label),
            Span::raw(entry.size_label.as_str()),
        ]));
        lines.push(Line::from(vec![
            Span::styled(format!("      {} ", MODIFIED_LABEL), label),
            Span::raw(entry.modified_label.as_str()),
        ]));
    }

    ListItem::new(Text::from(lines))
}

/// The first error among already-evaluated steps
fn first_error<const N: usize>(results: [io::Result<()>; N]) -> io::Result<()> {
    results.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{CacheClearResponse, FileEntry, ScanResponse};
    use crate::controller::{Timings, EMPTY_PATH_MESSAGE};
    use ratatui::backend::TestBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct StubService {
        scan_calls: Arc<AtomicUsize>,
        clear_calls: Arc<AtomicUsize>,
    }

    impl ScanService for StubService {
        async fn scan(&self, path: &str) -> Result<ScanResponse, SearchError> {
            self.scan_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ScanResponse {
                files: Some(vec![
                    FileEntry {
                        name: "a.ckpt".to_string(),
                        path: format!("{}\\a.ckpt", path),
                        size: 2048,
                        modified: "2023-01-01T10:00:00".to_string(),
                    },
                    FileEntry {
                        name: "b.safetensors".to_string(),
                        path: format!("{}\\b.safetensors", path),
                        size: 1536,
                        modified: "2023-01-02T11:30:00".to_string(),
                    },
                ]),
                ..Default::default()
            })
        }

        async fn clear_cache(&self, _path: Option<&str>) -> Result<CacheClearResponse, SearchError> {
            self.clear_calls.fetch_add(1, Ordering::SeqCst);
            Ok(CacheClearResponse {
                message: Some("Cleared entire cache".to_string()),
                error: None,
            })
        }
    }

    fn create_test_app(service: StubService) -> App<StubService> {
        App::new(
            SearchController::new(service, Timings::default()),
            "http://localhost:3000".to_string(),
        )
    }

    fn press(app: &mut App<StubService>, code: KeyCode) -> KeyOutcome {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App<StubService>, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    async fn wait_for_search(app: &mut App<StubService>) {
        for _ in 0..1000 {
            app.poll_tasks().await;
            if app.active_search.is_none() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("search did not finish");
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[tokio::test]
    async fn test_enter_with_empty_path_shows_error() {
        let service = StubService::default();
        let mut app = create_test_app(service.clone());

        press(&mut app, KeyCode::Enter);

        assert!(app.active_search.is_none());
        assert_eq!(service.scan_calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            app.controller.error_message(Instant::now()),
            Some(EMPTY_PATH_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_enter_runs_search_and_selects_first_row() {
        let service = StubService::default();
        let mut app = create_test_app(service.clone());

        type_text(&mut app, "C:\\m");
        press(&mut app, KeyCode::Enter);
        assert!(app.active_search.is_some());
        assert!(app.controller.is_searching());

        wait_for_search(&mut app).await;

        assert!(!app.controller.is_searching());
        assert_eq!(service.scan_calls.load(Ordering::SeqCst), 1);
        assert_eq!(app.visible_rows().len(), 3);
        assert_eq!(app.results_state.selected(), Some(0));
    }

    #[tokio::test]
    async fn test_search_typing_is_debounced() {
        let mut app = create_test_app(StubService::default());
        type_text(&mut app, "C:\\m");
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Focus::Search);

        type_text(&mut app, "ckpt");
        assert!(app.active_search.is_none());

        app.tick(Instant::now());
        assert!(app.active_search.is_none());

        app.tick(Instant::now() + Duration::from_millis(300));
        assert!(app.active_search.is_some());

        wait_for_search(&mut app).await;
        let groups = app.controller.results().groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].entries.len(), 1);
        assert_eq!(groups[0].entries[0].name, "a.ckpt");
    }

    #[tokio::test]
    async fn test_toggle_folder_and_details() {
        let mut app = create_test_app(StubService::default());
        type_text(&mut app, "C:\\m");
        press(&mut app, KeyCode::Enter);
        wait_for_search(&mut app).await;
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.focus, Focus::Results);

        // Open details of the first file
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Enter);
        assert!(app.expanded_files.contains(&(0, 0)));
        press(&mut app, KeyCode::Enter);
        assert!(!app.expanded_files.contains(&(0, 0)));

        // Collapse the folder
        press(&mut app, KeyCode::Char('g'));
        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.visible_rows(), vec![Row::Folder(0)]);
        press(&mut app, KeyCode::Char('G'));
        assert_eq!(app.results_state.selected(), Some(0));
    }

    #[tokio::test]
    async fn test_clear_cache_shows_success() {
        let service = StubService::default();
        let mut app = create_test_app(service.clone());
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.active_clears.len(), 1);

        for _ in 0..1000 {
            app.poll_tasks().await;
            if app.active_clears.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(service.clear_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            app.controller.success_message(Instant::now()),
            Some("Cleared entire cache")
        );
    }

    #[test]
    fn test_first_error_keeps_earliest_failure() {
        assert!(first_error([Ok(()), Ok(()), Ok(())]).is_ok());

        let err = first_error([
            Err(io::Error::other("raw mode")),
            Ok(()),
            Err(io::Error::other("cursor")),
        ])
        .unwrap_err();
        assert_eq!(err.to_string(), "raw mode");

        let err = first_error([Ok(()), Err(io::Error::other("screen")), Ok(())]).unwrap_err();
        assert_eq!(err.to_string(), "screen");
    }

    #[tokio::test]
    async fn test_quit_keys() {
        let mut app = create_test_app(StubService::default());
        // 'q' is text while an input has focus
        assert_eq!(press(&mut app, KeyCode::Char('q')), KeyOutcome::Continue);
        assert_eq!(app.controller.base_path(), "q");

        assert_eq!(
            app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            KeyOutcome::Quit
        );

        press(&mut app, KeyCode::Esc);
        assert_eq!(press(&mut app, KeyCode::Char('q')), KeyOutcome::Quit);
    }

    #[tokio::test]
    async fn test_render_grouped_results() {
        let mut app = create_test_app(StubService::default());
        type_text(&mut app, "C:\\m");
        press(&mut app, KeyCode::Enter);
        wait_for_search(&mut app).await;

        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|f| app.render(f)).unwrap();
        let text = buffer_text(&terminal);

        assert!(text.contains("▼ C:\\m"));
        assert!(text.contains("2 files"));
        assert!(text.contains("Checkpoint"));
        assert!(text.contains("SafeTensors"));
    }

    #[tokio::test]
    async fn test_render_no_files_placeholder() {
        let mut app = create_test_app(StubService::default());
        let request = SearchRequest {
            base_path: "C:\\empty".to_string(),
            search_term: String::new(),
        };
        app.controller.set_base_path("C:\\empty");
        let begun = app.controller.begin_search(Instant::now()).unwrap();
        assert_eq!(begun, request);
        app.controller
            .finish_search(&request, Ok(ScanResponse::default()), Instant::now());

        let mut terminal = Terminal::new(TestBackend::new(60, 16)).unwrap();
        terminal.draw(|f| app.render(f)).unwrap();
        assert!(buffer_text(&terminal).contains(NO_FILES_MESSAGE));
    }
}
