//! TUI rendering.
//!
//! ┌──────────────────────────────────────────────┐
//! │  ⚡ Reflex    stats: reflex-data             │
//! ├────────────────────────────┬─────────────────┤
//! │                            │  Last     212 ms│
//! │                            │  Best     187 ms│
//! │        Now! Press!         │  Average  230 ms│
//! │                            │  Attempts     14│
//! │                            ├─────────────────┤
//! │                            │  ▇ ▅ ▆ ▃ ▇ ...  │
//! ├────────────────────────────┴─────────────────┤
//! │  space/enter/click: press   s: start   ...   │
//! └──────────────────────────────────────────────┘

use super::app::App;
use ratatui::{prelude::*, widgets::*};
use reflex_core::{KeyValueStore, PadMode, Statistics, TrialView, format_ms, format_optional_ms};

/// Screen regions of one frame.
struct Areas {
    title: Rect,
    pad: Rect,
    stats: Rect,
    recent: Rect,
    keys: Rect,
}

fn split(area: Rect) -> Areas {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Min(10),   // main
            Constraint::Length(1), // keys
        ])
        .split(area);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[1]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(4)])
        .split(cols[1]);

    Areas {
        title: rows[0],
        pad: cols[0],
        stats: right[0],
        recent: right[1],
        keys: rows[2],
    }
}

/// Where the reaction pad lands in a frame of size `area`.
pub fn pad_area(area: Rect) -> Rect {
    split(area).pad
}

pub fn draw<K: KeyValueStore>(f: &mut Frame, app: &App<K>) {
    let view = app.view();
    let areas = split(f.area());

    draw_title(f, areas.title, app);
    draw_pad(f, areas.pad, &view);
    draw_stats(f, areas.stats, &view);
    draw_recent(f, areas.recent, app.statistics());
    draw_keys(f, areas.keys);
}

fn draw_title<K: KeyValueStore>(f: &mut Frame, area: Rect, app: &App<K>) {
    let mut spans = vec![
        Span::styled(" ⚡ Reflex ", Style::default().bold().fg(Color::Cyan)),
        Span::raw("  stats: "),
        Span::styled(app.storage_label(), Style::default().fg(Color::DarkGray)),
    ];
    if app.write_failures() > 0 {
        spans.push(Span::styled(
            format!("  ⚠ {} unsaved writes ", app.write_failures()),
            Style::default().bold().fg(Color::Red),
        ));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(spans));

    f.render_widget(block, area);
}

fn pad_colors(mode: PadMode) -> (Color, Color) {
    match mode {
        PadMode::Idle => (Color::DarkGray, Color::White),
        PadMode::Wait => (Color::Red, Color::White),
        PadMode::Ready => (Color::Green, Color::Black),
    }
}

fn draw_pad(f: &mut Frame, area: Rect, view: &TrialView) {
    let (bg, fg) = pad_colors(view.pad_mode());

    // Center the label vertically inside the block.
    let inner_height = area.height.saturating_sub(2);
    let padding = inner_height.saturating_sub(1) / 2;
    let mut lines: Vec<Line> = (0..padding).map(|_| Line::from("")).collect();
    lines.push(Line::from(Span::styled(
        view.label.to_string(),
        Style::default().bold(),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", view.phase));
    let p = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(bg).fg(fg))
        .block(block);
    f.render_widget(p, area);
}

fn draw_stats(f: &mut Frame, area: Rect, view: &TrialView) {
    let agg = &view.aggregates;
    let rows = vec![
        Row::new(vec!["Last".to_string(), format_optional_ms(agg.last)]),
        Row::new(vec!["Best".to_string(), format_optional_ms(agg.best)])
            .style(Style::default().fg(Color::Green)),
        Row::new(vec!["Average".to_string(), format_optional_ms(agg.average)]),
        Row::new(vec!["Attempts".to_string(), agg.attempts.to_string()]),
    ];

    let table = Table::new(rows, [Constraint::Length(10), Constraint::Min(8)])
        .block(Block::default().borders(Borders::ALL).title(" Stats "));
    f.render_widget(table, area);
}

fn draw_recent(f: &mut Frame, area: Rect, stats: &Statistics) {
    if stats.recent.is_empty() {
        let block = Block::default().borders(Borders::ALL).title(" Recent ");
        let p = Paragraph::new("No reactions yet")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(p, area);
        return;
    }

    let labels: Vec<String> = (1..=stats.recent.len()).map(|i| i.to_string()).collect();
    let data: Vec<(&str, u64)> = labels
        .iter()
        .zip(stats.recent.iter())
        .map(|(label, &ms)| (label.as_str(), ms.round().max(0.0) as u64))
        .collect();

    let title = match stats.average() {
        Some(avg) => format!(" Recent  avg {} ", format_ms(avg)),
        None => " Recent ".to_string(),
    };

    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .data(data.as_slice())
        .bar_width(3)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    f.render_widget(chart, area);
}

fn draw_keys(f: &mut Frame, area: Rect) {
    let bar = Paragraph::new(" space/enter/click: press   s: start   r: reset stats   q: quit")
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(bar, area);
}
