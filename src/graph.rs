use std::io::stdout;

use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use crossterm::execute;
use ratatui::{
    backend::CrosstermBackend,
    style::{Color, Style},
    widgets::{Bar, BarChart, BarGroup, Block},
    Terminal, TerminalOptions, Viewport,
};

use crate::types::{TimeSeries, Window};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// One bar per calendar day of `window`; days without data are zero.
fn daily_values(series: &TimeSeries, window: &Window) -> Vec<(NaiveDate, f64)> {
    let mut values: Vec<(NaiveDate, f64)> = window
        .start_date
        .iter_days()
        .take(window.length_days as usize)
        .map(|d| (d, 0.0))
        .collect();
    for r in series.in_window(window) {
        let offset = (r.date - window.start_date).num_days() as usize;
        if let Some(slot) = values.get_mut(offset) {
            slot.1 += r.amount;
        }
    }
    values
}

fn day_label(date: NaiveDate, first: bool) -> String {
    // Month name only on the 1st and on the first bar.
    if date.day() == 1 || first {
        format!("{} {}", MONTHS[date.month0() as usize], date.day())
    } else {
        date.day().to_string()
    }
}

pub fn render(series: &TimeSeries, window: &Window) -> Result<()> {
    let values = daily_values(series, window);
    if values.is_empty() {
        eprintln!("No days to display.");
        return Ok(());
    }

    let bars: Vec<Bar> = values
        .iter()
        .enumerate()
        .map(|(i, (date, amount))| {
            Bar::default()
                .value(amount.round().max(0.0) as u64)
                .text_value(format!("{:.0}", amount))
                .label(day_label(*date, i == 0).into())
                .style(Style::default().fg(Color::Cyan))
        })
        .collect();

    let title = format!(
        "Daily spend ({}) — {} to {}",
        series.dimension_key(),
        window.start_date,
        window.end_date
    );

    let chart = BarChart::default()
        .block(Block::bordered().title(title))
        .data(BarGroup::default().bars(&bars))
        .bar_width(3)
        .bar_gap(1)
        .value_style(Style::default().fg(Color::White))
        .label_style(Style::default().fg(Color::DarkGray));

    let chart_height: u16 = 17; // 15 for bars + 2 for border

    let mut terminal = Terminal::with_options(
        CrosstermBackend::new(stdout()),
        TerminalOptions {
            viewport: Viewport::Inline(chart_height),
        },
    )?;

    terminal.draw(|frame| {
        frame.render_widget(chart, frame.area());
    })?;

    // Move cursor below the chart
    execute!(stdout(), crossterm::cursor::MoveDown(1))?;

    Ok(())
}
