use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use filing_registry::{Company, ValidationStats};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

const PAGE_STEP: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Companies,
    Filings,
    Validation,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Companies => Page::Filings,
            Page::Filings => Page::Validation,
            Page::Validation => Page::Companies,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Companies => Page::Validation,
            Page::Filings => Page::Companies,
            Page::Validation => Page::Filings,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Companies => "Companies",
            Page::Filings => "Filings",
            Page::Validation => "Validation History",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    None,
    WithDocuments,
    Enriched,
    Active,
}

impl FilterType {
    fn label(&self) -> &str {
        match self {
            FilterType::None => "ALL",
            FilterType::WithDocuments => "WITH DOCUMENTS",
            FilterType::Enriched => "ENRICHED",
            FilterType::Active => "ACTIVE",
        }
    }

    fn matches(&self, company: &Company) -> bool {
        match self {
            FilterType::None => true,
            FilterType::WithDocuments => company
                .filings
                .iter()
                .any(|f| !f.document_urls.is_empty()),
            FilterType::Enriched => !company.enrichment.is_empty(),
            FilterType::Active => company
                .enrichment
                .get("is_active")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        }
    }
}

pub struct App {
    pub companies: Vec<Company>,
    /// Indices into `companies` that pass the active filter
    pub visible: Vec<usize>,
    pub history: Vec<ValidationStats>,
    pub state: TableState,
    pub filing_state: TableState,
    /// Selection in the validation history, newest run first
    pub history_state: TableState,
    pub current_page: Page,
    pub show_detail: bool,
    pub filter: FilterType,
}

impl App {
    pub fn new(companies: Vec<Company>, history: Vec<ValidationStats>) -> Self {
        let mut app = Self {
            visible: Vec::new(),
            companies,
            history,
            state: TableState::default(),
            filing_state: TableState::default(),
            history_state: TableState::default(),
            current_page: Page::Companies,
            show_detail: false,
            filter: FilterType::None,
        };
        app.apply_filter(FilterType::None);
        if !app.history.is_empty() {
            app.history_state.select(Some(0));
        }
        app
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn selected_company(&self) -> Option<&Company> {
        self.state
            .selected()
            .and_then(|i| self.visible.get(i))
            .and_then(|&idx| self.companies.get(idx))
    }

    pub fn apply_filter(&mut self, filter: FilterType) {
        self.filter = filter;
        self.visible = self
            .companies
            .iter()
            .enumerate()
            .filter(|(_, c)| filter.matches(c))
            .map(|(i, _)| i)
            .collect();

        // Reset selection to first item
        self.state
            .select(if self.visible.is_empty() { None } else { Some(0) });
        self.reset_filing_selection();
    }

    fn reset_filing_selection(&mut self) {
        let has_filings = self
            .selected_company()
            .map(|c| !c.filings.is_empty())
            .unwrap_or(false);
        self.filing_state
            .select(if has_filings { Some(0) } else { None });
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    /// Length and state of the table the current page navigates
    fn active_table(&mut self) -> (usize, &mut TableState) {
        match self.current_page {
            Page::Filings => {
                let len = self.selected_company().map(|c| c.filings.len()).unwrap_or(0);
                (len, &mut self.filing_state)
            }
            Page::Validation => (self.history.len(), &mut self.history_state),
            Page::Companies => (self.visible.len(), &mut self.state),
        }
    }

    /// 1-based selected row and row count of the current page's table
    pub fn position(&self) -> (usize, usize) {
        let (state, len) = match self.current_page {
            Page::Companies => (&self.state, self.visible.len()),
            Page::Filings => (
                &self.filing_state,
                self.selected_company().map(|c| c.filings.len()).unwrap_or(0),
            ),
            Page::Validation => (&self.history_state, self.history.len()),
        };
        (state.selected().map(|i| i + 1).unwrap_or(0), len)
    }

    fn move_selection(&mut self, step: impl Fn(usize, usize) -> usize) {
        let page = self.current_page;
        let (len, state) = self.active_table();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) => step(i, len),
            None => 0,
        };
        state.select(Some(i));
        if page == Page::Companies {
            self.reset_filing_selection();
        }
    }

    pub fn next(&mut self) {
        self.move_selection(|i, len| if i >= len - 1 { 0 } else { i + 1 });
    }

    pub fn previous(&mut self) {
        self.move_selection(|i, len| if i == 0 { len - 1 } else { i - 1 });
    }

    pub fn page_down(&mut self) {
        self.move_selection(|i, len| (i + PAGE_STEP).min(len - 1));
    }

    pub fn page_up(&mut self) {
        self.move_selection(|i, _| i.saturating_sub(PAGE_STEP));
    }

    pub fn first(&mut self) {
        self.move_selection(|_, _| 0);
    }

    pub fn last(&mut self) {
        self.move_selection(|_, len| len - 1);
    }

    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats {
            companies: self.companies.len(),
            ..Default::default()
        };

        for company in &self.companies {
            stats.filings += company.filing_count;
            stats.documents += company
                .filings
                .iter()
                .map(|f| f.document_urls.len())
                .sum::<usize>();
            if !company.enrichment.is_empty() {
                stats.enriched += 1;
            }
        }

        stats
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct RegistryStats {
    pub companies: usize,
    pub filings: usize,
    pub documents: usize,
    pub enriched: usize,
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char('c') => app.apply_filter(FilterType::None),
                KeyCode::Char('d') => app.apply_filter(FilterType::WithDocuments),
                KeyCode::Char('e') => app.apply_filter(FilterType::Enriched),
                KeyCode::Char('a') => app.apply_filter(FilterType::Active),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.first(),
                KeyCode::End => app.last(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail && app.current_page == Page::Companies {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        render_companies(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        match app.current_page {
            Page::Companies => render_companies(f, chunks[1], app),
            Page::Filings => render_filings(f, chunks[1], app),
            Page::Validation => render_validation(f, chunks[1], app),
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn header_style() -> Style {
    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
}

fn label_style() -> Style {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let stats = app.stats();

    let mut tab_spans = vec![];
    for (i, page) in [Page::Companies, Page::Filings, Page::Validation].iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Companies: {}", stats.companies),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("Filings: {}", stats.filings),
        Style::default().fg(Color::Green),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("Docs: {}", stats.documents),
        Style::default().fg(Color::Magenta),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("Enriched: {}", stats.enriched),
        Style::default().fg(Color::Cyan),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_companies(f: &mut Frame, area: Rect, app: &mut App) {
    let header = Row::new(
        ["Latest", "Entity", "Filings", "Segment", "Position"]
            .iter()
            .map(|h| Cell::from(*h).style(header_style())),
    )
    .style(Style::default().bg(Color::DarkGray))
    .height(1);

    let rows: Vec<Row> = app
        .visible
        .iter()
        .filter_map(|&i| app.companies.get(i))
        .map(|c| {
            let segment = enrichment_text(c, "industry_segment");
            let position = enrichment_text(c, "market_position");
            Row::new(vec![
                Cell::from(c.latest_filing_date().to_string()),
                Cell::from(truncate(&c.entity_name, 40)),
                Cell::from(c.filing_count.to_string()).style(Style::default().fg(Color::Green)),
                Cell::from(truncate(&segment, 18)),
                Cell::from(truncate(&position, 12)),
            ])
            .height(1)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(42),
            Constraint::Length(8),
            Constraint::Length(20),
            Constraint::Length(14),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Companies "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_filings(f: &mut Frame, area: Rect, app: &mut App) {
    let title = app
        .selected_company()
        .map(|c| format!(" Filings: {} ", truncate(&c.entity_name, 50)))
        .unwrap_or_else(|| " Filings ".to_string());

    let header = Row::new(
        ["Date", "Filing ID", "Docket", "Type", "Status", "Document"]
            .iter()
            .map(|h| Cell::from(*h).style(header_style())),
    )
    .style(Style::default().bg(Color::DarkGray))
    .height(1);

    let rows: Vec<Row> = app
        .selected_company()
        .map(|c| {
            c.filings
                .iter()
                .map(|filing| {
                    let date = if filing.date_received.is_empty() {
                        "—".to_string()
                    } else {
                        filing.date_received.clone()
                    };
                    Row::new(vec![
                        Cell::from(date),
                        Cell::from(filing.filing_id.clone()),
                        Cell::from(truncate(&filing.docket_number, 16)),
                        Cell::from(truncate(&filing.submission_type, 24)),
                        Cell::from(filing.filing_status.clone()),
                        Cell::from(truncate(filing.primary_document_url(), 50))
                            .style(Style::default().fg(Color::Magenta)),
                    ])
                    .height(1)
                })
                .collect()
        })
        .unwrap_or_default();

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(16),
            Constraint::Length(18),
            Constraint::Length(26),
            Constraint::Length(10),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.filing_state);
}

fn render_validation(f: &mut Frame, area: Rect, app: &mut App) {
    let header = Row::new(
        ["Timestamp", "Total", "Valid", "Invalid", "Valid %", "First Error"]
            .iter()
            .map(|h| Cell::from(*h).style(header_style())),
    )
    .style(Style::default().bg(Color::DarkGray))
    .height(1);

    // Newest run first
    let rows = app.history.iter().rev().map(|stats| {
        let ratio = stats.valid_ratio() * 100.0;
        let color = if stats.invalid_records == 0 { Color::Green } else { Color::Red };
        let first_error = stats
            .error_samples
            .first()
            .map(|s| format!("{}: {}", s.name, s.error))
            .unwrap_or_default();

        Row::new(vec![
            Cell::from(stats.timestamp.format("%Y-%m-%d %H:%M").to_string()),
            Cell::from(stats.total_processed.to_string()),
            Cell::from(stats.valid_records.to_string()).style(Style::default().fg(Color::Green)),
            Cell::from(stats.invalid_records.to_string()).style(Style::default().fg(color)),
            Cell::from(format!("{:.1}", ratio)),
            Cell::from(truncate(&first_error, 60)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(18),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" Validation History ({} runs) ", app.history.len())),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.history_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let (selected, total) = app.position();

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, total),
        Style::default().fg(Color::Cyan),
    )];

    if app.filter != FilterType::None {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(
            format!("Filter: {}", app.filter.label()),
            Style::default().fg(Color::Green),
        ));
        status_spans.push(Span::raw(" ("));
        status_spans.push(Span::styled("c", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" clear)"));
    }

    for (key, action, color) in [
        ("Enter", " Details", Color::Yellow),
        ("Tab", " Page", Color::Yellow),
        ("d/e/a", " Docs/Enriched/Active", Color::Yellow),
        ("↑/↓", " Nav", Color::Yellow),
        ("q", " Quit", Color::Red),
    ] {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(key, Style::default().fg(color)));
        status_spans.push(Span::raw(action));
    }

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Company Details ");

    let Some(company) = app.selected_company() else {
        f.render_widget(Paragraph::new("No company selected").block(block), area);
        return;
    };

    let field = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("  {}: ", label), label_style()),
            Span::raw(value),
        ])
    };

    let mut content = vec![
        Line::from(""),
        field("Name", company.entity_name.clone()),
        field("Normalized", company.normalized_name.clone()),
        field("Type", company.entity_type.as_str().to_string()),
        field("ID", company.id.clone()),
        field("Filings", company.filing_count.to_string()),
        field("Dockets", company.dockets().join(", ")),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "  ENRICHMENT",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )]),
        Line::from(""),
    ];

    if company.enrichment.is_empty() {
        content.push(Line::from(Span::styled(
            "  Not enriched",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    } else {
        content.push(field("Active", enrichment_text(company, "is_active")));
        content.push(field("Segment", enrichment_text(company, "industry_segment")));
        content.push(field("Position", enrichment_text(company, "market_position")));
        content.push(Line::from(""));
        content.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(
                wrap_text(&enrichment_text(company, "product_summary"), 35),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ),
        ]));
    }

    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        "  Press Enter to close",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));

    f.render_widget(Paragraph::new(content).block(block), area);
}

fn enrichment_text(company: &Company, field: &str) -> String {
    match company.enrichment.get(field) {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn wrap_text(text: &str, width: usize) -> String {
    if text.len() <= width {
        return text.to_string();
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if !current_line.is_empty() && current_line.len() + word.len() + 1 > width {
            lines.push(std::mem::take(&mut current_line));
        }
        if !current_line.is_empty() {
            current_line.push(' ');
        }
        current_line.push_str(word);
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    lines.join("\n  ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use filing_registry::{EntityType, Filing};

    fn company(name: &str, urls: &[&str], active: Option<bool>) -> Company {
        let mut enrichment = serde_json::Map::new();
        if let Some(active) = active {
            enrichment.insert("is_active".to_string(), serde_json::json!(active));
        }
        Company {
            id: name.to_string(),
            entity_name: name.to_string(),
            normalized_name: name.to_lowercase(),
            entity_type: EntityType::Company,
            is_applicant: true,
            filing_count: 2,
            filings: vec![
                Filing {
                    filing_id: "1".to_string(),
                    date_received: "2024-01-01".to_string(),
                    docket_number: String::new(),
                    submission_type: String::new(),
                    filing_status: String::new(),
                    document_urls: urls.iter().map(|u| u.to_string()).collect(),
                    detail_url: String::new(),
                },
                Filing {
                    filing_id: "2".to_string(),
                    date_received: String::new(),
                    docket_number: String::new(),
                    submission_type: String::new(),
                    filing_status: String::new(),
                    document_urls: vec![],
                    detail_url: String::new(),
                },
            ],
            enrichment,
        }
    }

    fn app() -> App {
        App::new(
            vec![
                company("Alpha", &["http://x/1"], Some(true)),
                company("Bravo", &[], Some(false)),
                company("Charlie", &[], None),
            ],
            Vec::new(),
        )
    }

    #[test]
    fn test_filters() {
        let mut app = app();
        assert_eq!(app.visible.len(), 3);

        app.apply_filter(FilterType::WithDocuments);
        assert_eq!(app.visible, vec![0]);

        app.apply_filter(FilterType::Enriched);
        assert_eq!(app.visible, vec![0, 1]);

        app.apply_filter(FilterType::Active);
        assert_eq!(app.selected_company().map(|c| c.entity_name.as_str()), Some("Alpha"));

        app.apply_filter(FilterType::None);
        assert_eq!(app.visible.len(), 3);
    }

    #[test]
    fn test_navigation_wraps_and_tracks_pages() {
        let mut app = app();
        app.previous();
        assert_eq!(app.state.selected(), Some(2));
        app.next();
        assert_eq!(app.state.selected(), Some(0));

        app.next_page();
        assert_eq!(app.current_page, Page::Filings);
        app.next();
        assert_eq!(app.filing_state.selected(), Some(1));
        assert_eq!(app.state.selected(), Some(0));

        app.previous_page();
        app.last();
        assert_eq!(app.state.selected(), Some(2));
        assert_eq!(app.filing_state.selected(), Some(0));
    }

    fn history(runs: usize) -> Vec<ValidationStats> {
        (0..runs).map(|_| ValidationStats::empty()).collect()
    }

    #[test]
    fn test_validation_page_scrolls_its_own_table() {
        let mut app = App::new(app().companies, history(30));
        assert_eq!(app.history_state.selected(), Some(0));

        app.next_page();
        app.next_page();
        assert_eq!(app.current_page, Page::Validation);

        app.next();
        assert_eq!(app.history_state.selected(), Some(1));
        app.page_down();
        assert_eq!(app.history_state.selected(), Some(1 + PAGE_STEP));
        app.last();
        assert_eq!(app.history_state.selected(), Some(29));
        assert_eq!(app.position(), (30, 30));

        // Company and filing selections are untouched
        assert_eq!(app.state.selected(), Some(0));
        assert_eq!(app.filing_state.selected(), Some(0));
    }

    #[test]
    fn test_validation_page_without_history() {
        let mut app = app();
        app.previous_page();
        assert_eq!(app.current_page, Page::Validation);
        app.next();
        assert_eq!(app.history_state.selected(), None);
        assert_eq!(app.position(), (0, 0));
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_stats() {
        assert_eq!(
            app().stats(),
            RegistryStats { companies: 3, filings: 6, documents: 1, enriched: 2 }
        );
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Télécom Québec Services", 10), "Télécom...");
    }
}
