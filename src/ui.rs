use anyhow::Result;
use carbon_dashboard::{DashboardSession, DerivedMetrics};
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use std::io;

pub struct App {
    pub session: DashboardSession,
    pub list_state: ListState,
    pub size_input: String,
    pub workbook_label: String,
}

impl App {
    pub fn new(session: DashboardSession, workbook_label: String) -> Self {
        let mut list_state = ListState::default();
        if !session.sink_options().is_empty() {
            list_state.select(Some(session.selected_index()));
        }

        let size_input = format_size(session.size());

        Self {
            session,
            list_state,
            size_input,
            workbook_label,
        }
    }

    pub fn next_sink(&mut self) {
        self.session.select_next();
        self.list_state.select(Some(self.session.selected_index()));
    }

    pub fn previous_sink(&mut self) {
        self.session.select_previous();
        self.list_state.select(Some(self.session.selected_index()));
    }

    pub fn push_size_digit(&mut self, c: char) {
        if c.is_ascii_digit() || (c == '.' && !self.size_input.contains('.')) {
            self.size_input.push(c);
            self.apply_size_input();
        }
    }

    pub fn pop_size_digit(&mut self) {
        self.size_input.pop();
        self.apply_size_input();
    }

    // Unparseable input (e.g. the buffer is empty mid-edit) counts as zero
    fn apply_size_input(&mut self) {
        let size = self.size_input.parse::<f64>().unwrap_or(0.0);
        self.session.set_size(size);
    }

    pub fn metrics(&self) -> DerivedMetrics {
        self.session.metrics()
    }
}

fn format_size(size: f64) -> String {
    if size == size.trunc() {
        format!("{:.0}", size)
    } else {
        format!("{}", size)
    }
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
                KeyCode::Down | KeyCode::Char('j') => app.next_sink(),
                KeyCode::Up | KeyCode::Char('k') => app.previous_sink(),
                KeyCode::Backspace => app.pop_size_digit(),
                KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => app.push_size_digit(c),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(50), // Project configuration
            Constraint::Percentage(50), // Financial metrics
        ])
        .split(chunks[1]);

    render_configuration(f, content_chunks[0], app);
    render_metrics(f, content_chunks[1], app);

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![
        Span::styled(
            "Carbon Credit Project Financing Dashboard",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(app.workbook_label.as_str(), Style::default().fg(Color::White)),
    ];

    if app.session.load_error().is_some() {
        spans.push(Span::raw("  |  "));
        spans.push(Span::styled(
            "FALLBACK DATA",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }

    let header = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn render_configuration(f: &mut Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(4),    // Sink selector
            Constraint::Length(5), // Size input + emitter unit
        ])
        .split(area);

    let items: Vec<ListItem> = app
        .session
        .sink_options()
        .iter()
        .map(|name| ListItem::new(name.clone()))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue))
                .title(" Project Configuration - SINK "),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("→ ");

    f.render_stateful_widget(list, chunks[0], &mut app.list_state);

    let metrics = app.metrics();
    let input_lines = vec![
        Line::from(vec![
            Span::styled(
                "  Sink Size (in units)/year: ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{}_", app.size_input),
                Style::default().fg(Color::Yellow),
            ),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled(
                "  Emitter Unit: ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(metrics.emitter_unit.as_str().to_string()),
        ]),
    ];

    let input_panel = Paragraph::new(input_lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    );

    f.render_widget(input_panel, chunks[1]);
}

fn render_metrics(f: &mut Frame, area: Rect, app: &App) {
    let metrics = app.metrics();

    let rows = [
        ("Carbon Credits Per Year", metrics.carbon_credits_per_year),
        ("Total CC Generated", metrics.total_cc_generated),
        ("Total Project Cost ($)", metrics.total_project_cost),
        ("Fair Trade Price per CC ($)", metrics.fair_trade_price),
        ("Expected Price / CC ($)", metrics.expected_price_per_cc),
    ];

    let mut lines = vec![Line::from("")];
    for (label, value) in rows {
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {:<30}", label),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{:>16.2}", value),
                Style::default().fg(Color::Green),
            ),
        ]));
        lines.push(Line::from(""));
    }

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green))
            .title(" Financial Metrics "),
    );

    f.render_widget(panel, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![Span::styled(
        format!(" Sink: {} ", app.session.sink()),
        Style::default().fg(Color::Cyan),
    )];

    if let Some(message) = app.session.load_error() {
        status_spans.push(Span::raw("| "));
        status_spans.push(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Red),
        ));
        status_spans.push(Span::raw(" "));
    }

    status_spans.push(Span::raw("| "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Sink | "));
    status_spans.push(Span::styled("0-9", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Size | "));
    status_spans.push(Span::styled("Bksp", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Erase | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}
