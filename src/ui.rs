use crate::app::{App, InputMode};
use crate::trend::chart_bounds;
use chrono::{Datelike, NaiveDate};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Clear, Dataset, GraphType, List, ListItem, Paragraph},
    Frame,
};

const LINE_COLORS: [Color; 6] = [Color::Cyan, Color::Yellow, Color::Magenta, Color::Green, Color::Blue, Color::Red];

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),  // Banner
            Constraint::Min(12),    // Chart
            Constraint::Length(app.rows.len() as u16 + 2), // Price list
            Constraint::Length(1),  // Footer
        ])
        .split(f.area());

    render_banner(f, app, chunks[0]);
    render_chart(f, app, chunks[1]);
    render_rows(f, app, chunks[2]);
    render_footer(f, app, chunks[3]);

    if let InputMode::AddSymbol(text) = &app.input_mode {
        render_add_dialog(f, text);
    }
}

fn render_banner(f: &mut Frame, app: &App, area: Rect) {
    let line = match &app.banner {
        Some(text) => Line::from(format!(" {} ", text)).black().on_yellow().bold(),
        None => Line::from(" Stock Market ").white().on_blue().bold(),
    };
    f.render_widget(Paragraph::new(line), area);
}

fn render_chart(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Stock Market Trends (Live) ");

    if app.lines.is_empty() {
        let empty = Paragraph::new("  Not enough data to chart yet")
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(empty, area);
        return;
    }

    let (x, y) = chart_bounds(&app.lines);
    let baseline = [(x[0], 0.0), (x[1], 0.0)];

    let mut datasets: Vec<Dataset> = app
        .lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            Dataset::default()
                .name(line.symbol.to_string())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(LINE_COLORS[i % LINE_COLORS.len()]))
                .data(&line.points)
        })
        .collect();
    datasets.push(
        Dataset::default()
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::DarkGray))
            .data(&baseline),
    );

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .title("Time")
                .style(Style::default().fg(Color::Gray))
                .bounds(x)
                .labels(vec![Span::raw(day_label(x[0])), Span::raw(day_label(x[1]))]),
        )
        .y_axis(
            Axis::default()
                .title("% Change")
                .style(Style::default().fg(Color::Gray))
                .bounds(y)
                .labels(vec![
                    Span::raw(format!("{:+.1}%", y[0])),
                    Span::raw("0%"),
                    Span::raw(format!("{:+.1}%", y[1])),
                ]),
        );

    f.render_widget(chart, area);
}

fn day_label(day: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(day as i32)
        .map(|d| format!("{:02}-{:02}", d.month(), d.day()))
        .unwrap_or_default()
}

fn render_rows(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .rows
        .iter()
        .map(|row| {
            let style = if row.price.is_some() {
                Style::default()
            } else {
                Style::default().fg(Color::Red)
            };
            ListItem::new(Line::from(Span::styled(format!("  {}", row.text()), style)))
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" Stocks "));
    f.render_widget(list, area);
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let updated = app
        .last_update
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());
    let status = if app.is_fetching() {
        Span::styled("  |  Refreshing...", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    } else {
        Span::styled(
            format!("  |  every {}s", app.refresh_interval.as_secs()),
            Style::default().fg(Color::Green),
        )
    };

    let line = Line::from(vec![
        Span::styled(" a=Add | r=Refresh | q=Quit ", Style::default().fg(Color::Yellow)),
        Span::styled(format!("  Updated: {}", updated), Style::default().fg(Color::DarkGray)),
        status,
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn render_add_dialog(f: &mut Frame, text: &str) {
    let area = centered_rect(40, 20, f.area());
    f.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from("  Enter stock symbol:"),
        Line::from(""),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(format!("{}█", text), Style::default().fg(Color::Yellow)),
        ]),
        Line::from(""),
        Line::from("  Enter=Search, Esc=Cancel").style(Style::default().fg(Color::DarkGray)),
    ];

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Search Stock ").border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PricePoint, PriceSeries, Snapshot, Symbol, Watchlist};
    use crate::worker::{RefreshReport, WorkerEvent};
    use ratatui::{backend::TestBackend, Terminal};
    use std::time::Duration;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn draws_rows_and_chart_title() {
        let aapl = Symbol::parse("AAPL").unwrap();
        let tsla = Symbol::parse("TSLA").unwrap();
        let series = PriceSeries::from_points((4..=8).map(|day| PricePoint {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            close: 170.0 + day as f64,
        }));

        let mut app = App::new(Watchlist::from_symbols(vec![aapl.clone(), tsla.clone()]), Duration::from_secs(60));
        app.apply(WorkerEvent::Refreshed(RefreshReport {
            outcome: "fetched",
            notice: None,
            table: vec![(aapl, series)].into_iter().collect::<Snapshot>(),
            watchlist: Watchlist::from_symbols(vec![Symbol::parse("AAPL").unwrap(), tsla]),
        }));

        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();
        let text = screen_text(&terminal);

        assert!(text.contains("Stock Market Trends (Live)"));
        assert!(text.contains("AAPL - $178.00"));
        assert!(text.contains("TSLA - no data"));
    }

    #[test]
    fn draws_add_dialog() {
        let mut app = App::new(Watchlist::default(), Duration::from_secs(60));
        app.input_mode = InputMode::AddSymbol("NFL".to_string());

        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();

        assert!(screen_text(&terminal).contains("Search Stock"));
    }
}
