use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, ContentArrangement, Table};
use serde::Serialize;

use crate::aggregate::RollingAverage;
use crate::analysis::{RatioReport, Report};
use crate::anomaly::AnomalyEvent;
use crate::rank::RankedBreakdown;
use crate::summary::{RollingTrend, SeriesSummary};
use crate::trend::TrendResult;
use crate::types::Window;

fn format_cost(cost: f64) -> String {
    format!("${:.2}", cost)
}

fn format_percent(p: f64) -> String {
    format!("{:.1}%", p)
}

fn format_window(w: &Window) -> String {
    format!("{} — {}", w.start_date, w.end_date)
}

fn new_table<I, S>(header: I) -> Table
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header.into_iter().map(|h| Cell::new(h.into())));
    table
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("JSON serialization failed")
    );
}

pub fn print_breakdown(breakdown: &RankedBreakdown) {
    let mut table = new_table(["#", "Dimension", "Total", "Share"]);
    for (i, e) in breakdown.entries.iter().enumerate() {
        let rank = if e.is_other() {
            String::new()
        } else {
            (i + 1).to_string()
        };
        let name = if e.is_other() {
            format!("{} ({} more)", e.dimension_key, e.folded)
        } else {
            e.dimension_key.clone()
        };
        table.add_row(vec![
            Cell::new(rank),
            Cell::new(name),
            Cell::new(format_cost(e.total)),
            Cell::new(format_percent(e.percent_of_total)),
        ]);
    }
    table.add_row(vec![
        Cell::new(""),
        Cell::new("TOTAL"),
        Cell::new(format_cost(breakdown.grand_total)),
        Cell::new(""),
    ]);
    println!("{table}");
}

fn trend_row(t: &TrendResult) -> Vec<Cell> {
    vec![
        Cell::new(&t.dimension_key),
        Cell::new(format!("{}/day", format_cost(t.previous.average_per_day))),
        Cell::new(format!("{}/day", format_cost(t.current.average_per_day))),
        Cell::new(format!("{:+.2}", t.delta_amount)),
        Cell::new(t.delta_percent.to_string()),
        Cell::new(t.direction.to_string()),
    ]
}

pub fn print_trends(trends: &[TrendResult], overall: Option<&TrendResult>) {
    let mut table = new_table(["Dimension", "Previous", "Current", "Δ/day", "Δ%", "Direction"]);
    for t in trends {
        table.add_row(trend_row(t));
    }
    if let Some(o) = overall {
        table.add_row(trend_row(o));
    }
    println!("{table}");
}

pub fn print_anomalies(events: &[AnomalyEvent]) {
    if events.is_empty() {
        println!("No anomalies.");
        return;
    }
    let mut table = new_table(["Severity", "Dimension", "Baseline", "Current", "Δ%", "Impact"]);
    for e in events {
        table.add_row(vec![
            Cell::new(e.severity.to_string()),
            Cell::new(&e.dimension_key),
            Cell::new(format!("{}/day", format_cost(e.baseline_avg))),
            Cell::new(format!("{}/day", format_cost(e.current_avg))),
            Cell::new(e.delta_percent.to_string()),
            Cell::new(format!("{:+.2}", e.impact_total)),
        ]);
    }
    println!("{table}");
}

pub fn print_summary(summary: &SeriesSummary) {
    let mut table = new_table(["Period", "Total", "Per day"]);
    for w in &summary.weekly {
        table.add_row(vec![
            Cell::new(format_window(&w.window)),
            Cell::new(format_cost(w.total)),
            Cell::new(format_cost(w.average_per_day)),
        ]);
    }
    table.add_row(vec![
        Cell::new(format_window(&summary.window)),
        Cell::new(format_cost(summary.total)),
        Cell::new(format_cost(summary.average_per_day)),
    ]);
    println!("{table}");

    println!(
        "Monthly projection: {}  Volatility: {}",
        format_cost(summary.monthly_projection),
        format_percent(summary.volatility_percent)
    );
    if let Some(peak) = &summary.peak {
        println!("Peak day: {} ({})", peak.date, format_cost(peak.amount));
    }
}

pub fn print_ratio(ratio: &RatioReport) {
    let mut table = new_table(["Side", "Dimensions", "Total"]);
    table.add_row(vec![
        Cell::new("numerator"),
        Cell::new(ratio.numerator_keys.join(", ")),
        Cell::new(format_cost(ratio.numerator_total)),
    ]);
    table.add_row(vec![
        Cell::new("denominator"),
        Cell::new(ratio.denominator_keys.join(", ")),
        Cell::new(format_cost(ratio.denominator_total)),
    ]);
    println!("{table}");

    let ratio_text = match ratio.classification.ratio {
        Some(r) => format!("{r:.3}"),
        None => "n/a".to_string(),
    };
    println!(
        "Ratio: {} (healthy max {:.3}) — {}",
        ratio_text, ratio.healthy_max_ratio, ratio.classification.status
    );
}

#[derive(Serialize)]
struct RollingOutput<'a> {
    points: &'a [RollingAverage],
    trend: Option<&'a RollingTrend>,
}

pub fn print_rolling_json(points: &[RollingAverage], trend: Option<&RollingTrend>) {
    print_json(&RollingOutput { points, trend });
}

pub fn print_rolling(points: &[RollingAverage], trend: Option<&RollingTrend>, window: i64) {
    let mut table = new_table(["Day".to_string(), format!("{window}-day avg")]);
    for p in points {
        table.add_row(vec![
            Cell::new(p.end_date),
            Cell::new(format_cost(p.average_per_day)),
        ]);
    }
    println!("{table}");

    if let Some(t) = trend {
        println!(
            "{} vs {}: {} ({})",
            t.latest.end_date, t.earlier.end_date, t.delta_percent, t.direction
        );
    }
}

pub fn print_report(report: &Report) {
    println!(
        "Current window: {}  Baseline: {}",
        format_window(&report.windows.current),
        format_window(&report.windows.baseline)
    );
    println!();
    print_breakdown(&report.breakdown);
    println!();
    print_trends(&report.trends, Some(&report.overall));
    println!();
    print_anomalies(&report.anomalies);
    if !report.insufficient_data.is_empty() {
        println!(
            "Too little data for trends: {}",
            report.insufficient_data.join(", ")
        );
    }
    println!();
    print_summary(&report.summary);
    if let Some(ratio) = &report.ratio {
        println!();
        print_ratio(ratio);
    }
}
