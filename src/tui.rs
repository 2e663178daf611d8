use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossterm::event::{self, DisableFocusChange, EnableFocusChange, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, Tabs, Wrap};
use ratatui::Terminal;

use crate::cache::Snapshot;
use crate::config::DashConfig;
use crate::coordinator::RefreshReport;
use crate::dashboard::Dashboard;
use crate::lifecycle::LifecycleEvent;
use crate::resource::ResourceKind;
use crate::theme::Theme;
use crate::types::{AlarmSide, Interval};
use crate::views::alarms::{alarm_cards, AlarmFilter, Proximity};
use crate::views::analysis::{available_symbols, coin_detail};
use crate::views::chart::{sparkline_bars, ChartPoint};
use crate::views::coins::{coin_cards, Trend, COIN_LIMIT};
use crate::views::rsi::{rsi_points, rsi_rows, rsi_stats, RsiStatus, RSI_TIMEFRAMES};
use crate::views::signals::signal_cards;
use crate::views::smc::{overview, short_entries_for, SMC_TIMEFRAMES};
use crate::views::{format_change, format_compact, format_price, PanelStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Coins,
    Signals,
    Alarms,
    Rsi,
    Analysis,
    Smc,
}

impl Tab {
    const ALL: [Tab; 6] = [Tab::Coins, Tab::Signals, Tab::Alarms, Tab::Rsi, Tab::Analysis, Tab::Smc];

    fn title(&self) -> &'static str {
        match self {
            Tab::Coins => "Coins",
            Tab::Signals => "Signals",
            Tab::Alarms => "Alarms",
            Tab::Rsi => "RSI Map",
            Tab::Analysis => "Analysis",
            Tab::Smc => "SMC-PA",
        }
    }

    fn index(&self) -> usize {
        Tab::ALL.iter().position(|t| t == self).unwrap_or(0)
    }

    fn step(&self, delta: isize) -> Tab {
        let n = Tab::ALL.len() as isize;
        Tab::ALL[((self.index() as isize + delta).rem_euclid(n)) as usize]
    }
}

struct Palette {
    fg: Color,
    bg: Color,
    dim: Color,
    accent: Color,
    up: Color,
    down: Color,
}

impl Palette {
    fn of(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Palette {
                fg: Color::White,
                bg: Color::Black,
                dim: Color::DarkGray,
                accent: Color::Cyan,
                up: Color::Green,
                down: Color::Red,
            },
            Theme::Light => Palette {
                fg: Color::Black,
                bg: Color::White,
                dim: Color::Gray,
                accent: Color::Blue,
                up: Color::Green,
                down: Color::Red,
            },
        }
    }
}

struct App {
    tab: Tab,
    query: String,
    editing: bool,
    theme: Theme,
    theme_file: PathBuf,
    side: Option<AlarmSide>,
    rsi_tf: usize,
    smc_tf: usize,
    selected: usize,
    last_report: Option<RefreshReport>,
    notice: Option<String>,
    uptime: Instant,
    should_quit: bool,
}

impl App {
    fn new(theme_file: PathBuf) -> Self {
        Self {
            tab: Tab::Coins,
            query: String::new(),
            editing: false,
            theme: Theme::load(&theme_file),
            theme_file,
            side: None,
            rsi_tf: 0,
            smc_tf: 0,
            selected: 0,
            last_report: None,
            notice: None,
            uptime: Instant::now(),
            should_quit: false,
        }
    }

    fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        if let Err(e) = self.theme.save(&self.theme_file) {
            tracing::warn!(error = %e, "could not persist theme");
            self.notice = Some(format!("theme not saved: {e}"));
        }
    }

    fn cycle_side(&mut self) {
        self.side = match self.side {
            None => Some(AlarmSide::Long),
            Some(AlarmSide::Long) => Some(AlarmSide::Short),
            Some(AlarmSide::Short) => None,
        };
    }
}

pub async fn run(mut dash: Dashboard, config: DashConfig, duration: u64) -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut dash, &config, duration).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableFocusChange, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    dash.shutdown();
    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    dash: &mut Dashboard,
    config: &DashConfig,
    duration: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::new(config.theme_file.clone());
    app.last_report = Some(dash.launch(config).await?);
    let dash: &Dashboard = dash;

    let run_duration = if duration == 0 { None } else { Some(Duration::from_secs(duration)) };

    while !app.should_quit && run_duration.map_or(true, |d| app.uptime.elapsed() < d) {
        let snapshot = dash.cache.snapshot();
        terminal.draw(|f| draw(f, &app, &snapshot, dash))?;

        // Blocking poll; the cache refreshes on its own tasks meanwhile.
        if !tokio::task::block_in_place(|| event::poll(Duration::from_millis(150)))? {
            continue;
        }
        match event::read()? {
            Event::FocusGained => {
                dash.signals.emit(LifecycleEvent::FocusRegained);
            }
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if app.editing {
                    match key.code {
                        KeyCode::Enter | KeyCode::Esc => app.editing = false,
                        KeyCode::Backspace => {
                            app.query.pop();
                        }
                        KeyCode::Char(c) => app.query.push(c),
                        _ => {}
                    }
                    app.selected = 0;
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
                    KeyCode::Tab | KeyCode::Right => app.tab = app.tab.step(1),
                    KeyCode::BackTab | KeyCode::Left => app.tab = app.tab.step(-1),
                    KeyCode::Char(c @ '1'..='6') => {
                        app.tab = Tab::ALL[(c as u8 - b'1') as usize];
                    }
                    KeyCode::Char('/') => app.editing = true,
                    KeyCode::Char('r') => {
                        app.last_report = Some(dash.coordinator.refresh_all().await);
                    }
                    KeyCode::Char('t') => app.toggle_theme(),
                    KeyCode::Char('s') => app.cycle_side(),
                    KeyCode::Char('f') => match app.tab {
                        Tab::Rsi => app.rsi_tf = (app.rsi_tf + 1) % RSI_TIMEFRAMES.len(),
                        Tab::Smc => app.smc_tf = (app.smc_tf + 1) % SMC_TIMEFRAMES.len(),
                        _ => {}
                    },
                    KeyCode::Up => app.selected = app.selected.saturating_sub(1),
                    KeyCode::Down => app.selected = app.selected.saturating_add(1),
                    _ => {}
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn draw(f: &mut ratatui::Frame, app: &App, snap: &Snapshot, dash: &Dashboard) {
    let pal = Palette::of(app.theme);
    f.render_widget(Block::default().style(Style::default().bg(pal.bg).fg(pal.fg)), f.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Length(3), // tabs + filter
            Constraint::Min(8),    // panel
            Constraint::Length(4), // resource status
        ])
        .split(f.area());

    draw_header(f, app, dash, &pal, chunks[0]);
    draw_tabs(f, app, &pal, chunks[1]);
    match app.tab {
        Tab::Coins => draw_coins(f, app, snap, &pal, chunks[2]),
        Tab::Signals => draw_signals(f, app, snap, &pal, chunks[2]),
        Tab::Alarms => draw_alarms(f, app, snap, &pal, chunks[2]),
        Tab::Rsi => draw_rsi(f, app, snap, &pal, chunks[2]),
        Tab::Analysis => draw_analysis(f, app, snap, &pal, chunks[2]),
        Tab::Smc => draw_smc(f, app, snap, &pal, chunks[2]),
    }
    draw_status(f, app, snap, &pal, chunks[3]);
}

fn draw_header(f: &mut ratatui::Frame, app: &App, dash: &Dashboard, pal: &Palette, area: Rect) {
    let interval = dash
        .coordinator
        .interval()
        .map_or_else(|| "off".to_string(), |d| format!("{}s", d.as_secs()));
    let stats = dash.coordinator.stats();
    let header = vec![
        Span::styled(" margingate-dash ", Style::default().fg(pal.accent).add_modifier(Modifier::BOLD)),
        Span::raw(" | "),
        Span::raw(format!("Auto-refresh: {interval}")),
        Span::raw(" | "),
        Span::raw(format!("Fetches: {} (+{} deduped)", stats.fetches_issued, stats.fetches_deduplicated)),
        Span::raw(" | "),
        Span::raw(format!("Uptime: {}s", app.uptime.elapsed().as_secs())),
        Span::raw(" | "),
        Span::styled(
            "q=quit /=filter r=refresh t=theme s=side f=timeframe",
            Style::default().fg(pal.dim),
        ),
    ];
    let p = Paragraph::new(Line::from(header))
        .block(Block::default().borders(Borders::ALL).title(format!(" Dashboard ({}) ", app.theme.as_str())));
    f.render_widget(p, area);
}

fn draw_tabs(f: &mut ratatui::Frame, app: &App, pal: &Palette, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Length(30)])
        .split(area);

    let titles: Vec<Line> = Tab::ALL
        .iter()
        .enumerate()
        .map(|(i, t)| Line::from(format!("{} {}", i + 1, t.title())))
        .collect();
    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .highlight_style(Style::default().fg(pal.accent).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(tabs, chunks[0]);

    let cursor = if app.editing { "_" } else { "" };
    let filter = Paragraph::new(format!("{}{cursor}", app.query))
        .style(Style::default().fg(if app.editing { pal.accent } else { pal.fg }))
        .block(Block::default().borders(Borders::ALL).title(" Filter "));
    f.render_widget(filter, chunks[1]);
}

/// Placeholder for a panel whose resource has nothing to show yet.
/// Returns `true` when the caller should render its content.
fn panel_ready(f: &mut ratatui::Frame, snap: &Snapshot, kind: ResourceKind, title: &str, pal: &Palette, area: Rect) -> bool {
    let (text, color) = match PanelStatus::of(snap.state(kind)) {
        PanelStatus::Ready { .. } => return true,
        PanelStatus::Loading => ("Loading...".to_string(), pal.dim),
        PanelStatus::Failed { message } => (message, pal.down),
    };
    let p = Paragraph::new(Span::styled(text, Style::default().fg(color)))
        .block(Block::default().borders(Borders::ALL).title(format!(" {title} ")));
    f.render_widget(p, area);
    false
}

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

fn spark(points: &[ChartPoint]) -> String {
    sparkline_bars(points, 7)
        .into_iter()
        .map(|h| BARS[(h as usize).min(BARS.len() - 1)])
        .collect()
}

fn change_color(pct: f64, pal: &Palette) -> Color {
    if pct > 0.0 {
        pal.up
    } else {
        pal.down
    }
}

fn draw_coins(f: &mut ratatui::Frame, app: &App, snap: &Snapshot, pal: &Palette, area: Rect) {
    if !panel_ready(f, snap, ResourceKind::Coins, "Coins", pal, area) {
        return;
    }
    let Some(coins) = snap.coins() else { return };
    let cards = coin_cards(coins, snap.ohlcv(), &app.query, COIN_LIMIT);
    let rows: Vec<Row> = cards
        .iter()
        .map(|c| {
            let color = match c.trend {
                Trend::Up => pal.up,
                Trend::Down => pal.down,
            };
            Row::new(vec![
                Cell::from(Span::styled(c.display.clone(), Style::default().add_modifier(Modifier::BOLD))),
                Cell::from(format_price(c.last_price)),
                Cell::from(Span::styled(format_change(c.change_pct), Style::default().fg(color))),
                Cell::from(format_compact(c.volume)),
                Cell::from(Span::styled(spark(&c.chart), Style::default().fg(color))),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(14),
            Constraint::Length(9),
            Constraint::Length(8),
            Constraint::Min(10),
        ],
    )
    .header(Row::new(vec!["COIN", "PRICE", "24H", "VOLUME", "4H"]).style(Style::default().add_modifier(Modifier::BOLD)))
    .block(Block::default().borders(Borders::ALL).title(format!(" Coins ({}) ", cards.len())));
    f.render_widget(table, area);
}

fn draw_signals(f: &mut ratatui::Frame, app: &App, snap: &Snapshot, pal: &Palette, area: Rect) {
    if !panel_ready(f, snap, ResourceKind::Signals, "Signals", pal, area) {
        return;
    }
    let Some(signals) = snap.signals() else { return };
    let cards = signal_cards(signals, snap.ohlcv(), &app.query);
    let rows: Vec<Row> = cards
        .iter()
        .map(|c| {
            let (rsi, color) = match (c.rsi_4h, c.rsi_4h_status) {
                (Some(v), Some(RsiStatus::Overbought)) => (format!("{v:.1}"), pal.down),
                (Some(v), Some(RsiStatus::Oversold)) => (format!("{v:.1}"), pal.up),
                (Some(v), _) => (format!("{v:.1}"), pal.fg),
                (None, _) => ("-".to_string(), pal.dim),
            };
            let flag = |b: bool| if b { "✓" } else { "·" };
            Row::new(vec![
                Cell::from(Span::styled(c.display.clone(), Style::default().add_modifier(Modifier::BOLD))),
                Cell::from(c.interval_count.to_string()),
                Cell::from(flag(c.has_30m)),
                Cell::from(flag(c.has_4h)),
                Cell::from(c.totals.fvg.to_string()),
                Cell::from(c.totals.bos.to_string()),
                Cell::from(c.totals.choch.to_string()),
                Cell::from(Span::styled(rsi, Style::default().fg(color))),
                Cell::from(spark(&c.chart)),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Length(5),
            Constraint::Length(5),
            Constraint::Length(6),
            Constraint::Length(7),
            Constraint::Min(10),
        ],
    )
    .header(
        Row::new(vec!["COIN", "IVS", "30M", "4H", "FVG", "BOS", "CHOCH", "RSI 4H", "4H"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title(format!(" Signals ({}) ", cards.len())));
    f.render_widget(table, area);
}

fn draw_alarms(f: &mut ratatui::Frame, app: &App, snap: &Snapshot, pal: &Palette, area: Rect) {
    if !panel_ready(f, snap, ResourceKind::Alarms, "Alarms", pal, area) {
        return;
    }
    let Some(alarms) = snap.alarms() else { return };
    let filter = AlarmFilter { side: app.side, query: app.query.clone() };
    let cards = alarm_cards(alarms, snap.ohlcv(), &filter);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let selected = app.selected.min(cards.len().saturating_sub(1));
    let rows: Vec<Row> = cards
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let side_color = match c.side {
                AlarmSide::Long => pal.up,
                AlarmSide::Short => pal.down,
            };
            let prox = match c.proximity {
                Some(Proximity::Near) => "near",
                Some(Proximity::Approaching) => "approaching",
                _ => "",
            };
            let style = if i == selected {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(Span::styled(c.side.label(), Style::default().fg(side_color).add_modifier(Modifier::BOLD))),
                Cell::from(c.display.clone()),
                Cell::from(c.interval.as_str()),
                Cell::from(c.current_price.map(format_price).unwrap_or_default()),
                Cell::from(prox),
                Cell::from(spark(&c.chart)),
            ])
            .style(style)
        })
        .collect();
    let side = app.side.map_or("all", |s| s.label());
    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(9),
            Constraint::Length(4),
            Constraint::Length(14),
            Constraint::Length(12),
            Constraint::Min(10),
        ],
    )
    .header(Row::new(vec!["SIDE", "COIN", "TF", "PRICE", "PROXIMITY", "CHART"]).style(Style::default().add_modifier(Modifier::BOLD)))
    .block(Block::default().borders(Borders::ALL).title(format!(" Alarms [{side}] ({}) ", cards.len())));
    f.render_widget(table, chunks[0]);

    let detail = match cards.get(selected) {
        Some(c) => {
            let pa = &c.price_action;
            vec![
                Line::from(Span::styled(pa.title.clone(), Style::default().fg(pal.accent).add_modifier(Modifier::BOLD))),
                Line::from(""),
                Line::from(pa.description.clone()),
                Line::from(""),
                Line::from(vec![Span::styled("Strategy: ", Style::default().fg(pal.up)), Span::raw(pa.strategy.clone())]),
                Line::from(vec![Span::styled("Risk: ", Style::default().fg(pal.down)), Span::raw(pa.risk.clone())]),
                Line::from(vec![Span::styled("Target: ", Style::default().fg(pal.accent)), Span::raw(pa.target.clone())]),
                Line::from(""),
                Line::from(Span::styled(c.rule.clone(), Style::default().fg(pal.dim))),
            ]
        }
        None => vec![Line::from(Span::styled("No alarms", Style::default().fg(pal.dim)))],
    };
    let p = Paragraph::new(detail)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Price Action "));
    f.render_widget(p, chunks[1]);
}

fn draw_rsi(f: &mut ratatui::Frame, app: &App, snap: &Snapshot, pal: &Palette, area: Rect) {
    if !panel_ready(f, snap, ResourceKind::Signals, "RSI Map", pal, area) {
        return;
    }
    let Some(signals) = snap.signals() else { return };
    let tf = RSI_TIMEFRAMES[app.rsi_tf % RSI_TIMEFRAMES.len()];
    let rows = rsi_rows(signals, &app.query);
    let stats = rsi_stats(&rows, tf);
    let mut points = rsi_points(&rows, tf);
    points.sort_by(|a, b| b.rsi.total_cmp(&a.rsi));

    let lines: Vec<Line> = points
        .iter()
        .map(|p| {
            let color = match p.status {
                RsiStatus::Overbought => pal.down,
                RsiStatus::Oversold => pal.up,
                RsiStatus::Normal => pal.fg,
            };
            let width = (p.rsi / 2.0).round() as usize;
            Line::from(vec![
                Span::raw(format!("{:<10}", p.symbol)),
                Span::styled(format!("{:>5.1} ", p.rsi), Style::default().fg(color)),
                Span::styled("█".repeat(width), Style::default().fg(color)),
            ])
        })
        .collect();
    let title = format!(
        " RSI {} | overbought {} | oversold {} | total {} ",
        tf.as_str(),
        stats.overbought,
        stats.oversold,
        stats.total
    );
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

fn draw_analysis(f: &mut ratatui::Frame, app: &App, snap: &Snapshot, pal: &Palette, area: Rect) {
    let symbols = available_symbols(snap.coins(), snap.signals(), snap.alarms(), &app.query);
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(16), Constraint::Min(30)])
        .split(area);

    let selected = app.selected.min(symbols.len().saturating_sub(1));
    let list: Vec<Line> = symbols
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let style = if i == selected {
                Style::default().fg(pal.accent).add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            Line::from(Span::styled(s.clone(), style))
        })
        .collect();
    let offset = selected.saturating_sub(chunks[0].height.saturating_sub(3) as usize) as u16;
    f.render_widget(
        Paragraph::new(list)
            .scroll((offset, 0))
            .block(Block::default().borders(Borders::ALL).title(format!(" Coins ({}) ", symbols.len()))),
        chunks[0],
    );

    let Some(symbol) = symbols.get(selected) else {
        f.render_widget(
            Paragraph::new(Span::styled("No coins", Style::default().fg(pal.dim)))
                .block(Block::default().borders(Borders::ALL).title(" Detail ")),
            chunks[1],
        );
        return;
    };
    let detail = coin_detail(symbol, snap.coins(), snap.signals(), snap.alarms(), snap.ohlcv());
    let mut lines = Vec::new();
    if let Some(c) = &detail.coin {
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", format_price(c.last_price)), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(format_change(c.price_change_percent), Style::default().fg(change_color(c.price_change_percent, pal))),
            Span::raw(format!("  vol {}", format_compact(c.volume))),
        ]));
    }
    lines.push(Line::from(format!("4h  {}", spark(&detail.chart))));
    lines.push(Line::from(format!(
        "FVG {}  BOS {}  CHoCH {}",
        detail.totals.fvg, detail.totals.bos, detail.totals.choch
    )));
    lines.push(Line::from(""));
    for (iv, bundle) in &detail.signals {
        let rsi = bundle.rsi.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"));
        lines.push(Line::from(format!(
            "{iv:>4}  FVG {}  BOS {}  CHoCH {}  RSI {rsi}",
            bundle.fvg.len(),
            bundle.bos.len(),
            bundle.choch.len()
        )));
    }
    for alarm in &detail.alarms {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("{} {}: {}", alarm.side.label(), alarm.interval, alarm.price_action.title),
            Style::default().fg(pal.accent),
        )));
        lines.push(Line::from(alarm.price_action.description.clone()));
    }
    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title(format!(" {} ", detail.symbol))),
        chunks[1],
    );
}

fn draw_smc(f: &mut ratatui::Frame, app: &App, snap: &Snapshot, pal: &Palette, area: Rect) {
    if !panel_ready(f, snap, ResourceKind::SmcPa, "SMC-PA", pal, area) {
        return;
    }
    let Some(data) = snap.smc() else { return };
    let ov = overview(data);
    let tf: Interval = SMC_TIMEFRAMES[app.smc_tf % SMC_TIMEFRAMES.len()];

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let mut left = vec![
        Line::from(vec![
            Span::raw(format!("Alarms {}  ", ov.total_alarms)),
            Span::styled(format!("Long {}  ", ov.long_entry_count), Style::default().fg(pal.up)),
            Span::styled(format!("Short {}  ", ov.short_combo_count), Style::default().fg(pal.down)),
            Span::raw(format!("Short coins {}", ov.short_signal_total)),
        ]),
        Line::from(Span::styled(
            format!("Updated {}", ov.last_update.as_deref().unwrap_or("-")),
            Style::default().fg(pal.dim),
        )),
        Line::from(""),
    ];
    for a in &ov.recent_alarms {
        left.push(Line::from(format!(
            "{:>3} {:<10} {:>12}  range {:.1}%",
            a.interval.as_str(),
            a.alarm.symbol,
            format_price(a.alarm.current_price),
            a.alarm.range_position_pct
        )));
    }
    f.render_widget(
        Paragraph::new(left).block(Block::default().borders(Borders::ALL).title(" Overview ")),
        chunks[0],
    );

    let mut right: Vec<Line> = ov
        .short_by_timeframe
        .get(&tf)
        .map(|coins| coins.iter().map(|c| Line::from(format!("{:<10} {}", c.symbol, c.timeframes.join(", ")))).collect())
        .unwrap_or_default();
    right.push(Line::from(""));
    for s in short_entries_for(data, tf) {
        right.push(Line::from(Span::styled(
            format!("{:<10} {}", s.symbol, s.signal_type),
            Style::default().fg(pal.down),
        )));
    }
    f.render_widget(
        Paragraph::new(right).block(Block::default().borders(Borders::ALL).title(format!(" Short signals {} ", tf.as_str()))),
        chunks[1],
    );
}

fn draw_status(f: &mut ratatui::Frame, app: &App, snap: &Snapshot, pal: &Palette, area: Rect) {
    let resources: Vec<Span> = ResourceKind::ALL
        .iter()
        .flat_map(|kind| {
            let state = snap.state(*kind);
            let (mark, color) = match PanelStatus::of(state) {
                _ if state.loading => ("…", pal.accent),
                PanelStatus::Ready { stale: false } => ("●", pal.up),
                PanelStatus::Ready { stale: true } => ("◐", pal.down),
                PanelStatus::Failed { .. } => ("✗", pal.down),
                PanelStatus::Loading => ("○", pal.dim),
            };
            [Span::styled(format!("{mark} "), Style::default().fg(color)), Span::raw(format!("{}  ", kind.label()))]
        })
        .collect();

    let mut second = Vec::new();
    if let Some(report) = &app.last_report {
        second.push(Span::styled(
            format!(
                "last refresh ({:?}): {} issued, {} deduplicated",
                report.trigger,
                report.issued.len(),
                report.deduplicated.len()
            ),
            Style::default().fg(pal.dim),
        ));
    }
    if let Some(notice) = &app.notice {
        second.push(Span::styled(format!("  {notice}"), Style::default().fg(pal.down)));
    }

    let p = Paragraph::new(vec![Line::from(resources), Line::from(second)])
        .block(Block::default().borders(Borders::ALL).title(" Resources "));
    f.render_widget(p, area);
}
