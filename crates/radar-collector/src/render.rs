//! 결과 출력.
//!
//! 레코드는 전체 정밀도로 보관하고, 반올림은 출력 시점에만 합니다.

use chrono::{DateTime, Utc};
use radar_core::ScreeningRecord;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::aggregator::{BatchReport, BatchStatus, SymbolFailure};
use crate::stats::CollectionStats;

/// 누락 값 표시.
pub const MISSING: &str = "N/A";

/// 출력 형식.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// 부호와 소수 2자리가 붙은 등락률 (예: `+10.00%`).
pub fn format_change(value: Option<Decimal>) -> String {
    match value {
        Some(v) => {
            let v = v.round_dp(2);
            let sign = if v > Decimal::ZERO { "+" } else { "" };
            format!("{}{:.2}%", sign, v)
        }
        None => MISSING.to_string(),
    }
}

/// 상대 거래량 (예: `2.35x`, 대체값이면 `1.00x*`).
pub fn format_rel_volume(record: &ScreeningRecord) -> String {
    match record.rel_volume {
        Some(v) => {
            let marker = if record.rel_volume_is_fallback() { "*" } else { "" };
            format!("{:.2}x{}", v.round_dp(2), marker)
        }
        None => MISSING.to_string(),
    }
}

fn format_decimal(value: Option<Decimal>, dp: u32) -> String {
    value
        .map(|v| format!("{:.*}", dp as usize, v.round_dp(dp)))
        .unwrap_or_else(|| MISSING.to_string())
}

fn format_pct(value: Option<Decimal>, dp: u32) -> String {
    value
        .map(|v| format!("{:.*}%", dp as usize, v.round_dp(dp)))
        .unwrap_or_else(|| MISSING.to_string())
}

/// 긴 섹터명 자르기.
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let cut: String = text.chars().take(width.saturating_sub(1)).collect();
        format!("{}~", cut)
    }
}

/// 표의 한 줄 (열 폭 고정).
fn table_line(cells: [&str; 13]) -> String {
    let [symbol, price, change, rel_volume, volume, market_cap, beta, from_high, rsi, sector, float, short, news] =
        cells;
    format!(
        "{:<7} {:>10} {:>9} {:>8} {:>12} {:>10} {:>6} {:>8} {:>6} {:<18} {:>9} {:>7} {:>5}",
        symbol,
        price,
        change,
        rel_volume,
        volume,
        market_cap,
        beta,
        from_high,
        rsi,
        sector,
        float,
        short,
        news
    )
}

/// 고정폭 텍스트 표.
pub fn render_table(records: &[&ScreeningRecord]) -> String {
    let mut lines = vec![
        table_line([
            "Symbol", "Price", "Chg%", "RelVol", "Volume", "MCap(M)", "Beta", "%High", "RSI", "Sector",
            "Float(M)", "Short%", "News",
        ]),
        "-".repeat(129),
    ];

    for r in records {
        lines.push(table_line([
            r.symbol.as_str(),
            format!("{:.2}", r.price.round_dp(2)).as_str(),
            format_change(r.change_pct).as_str(),
            format_rel_volume(r).as_str(),
            r.volume.to_string().as_str(),
            format_decimal(r.market_cap_m, 1).as_str(),
            format_decimal(r.beta, 2).as_str(),
            format_pct(r.pct_from_high, 1).as_str(),
            format_decimal(r.rsi_14, 1).as_str(),
            truncate(r.sector.as_deref().unwrap_or(MISSING), 18).as_str(),
            format_decimal(r.float_m, 1).as_str(),
            format_pct(r.short_pct, 1).as_str(),
            r.news_count.to_string().as_str(),
        ]));
    }

    lines.iter().map(|line| format!("{}\n", line)).collect()
}

/// 실패 목록과 상태 줄.
pub fn render_summary(report: &BatchReport, shown: usize) -> String {
    let mut lines = Vec::new();

    if !report.failures.is_empty() {
        lines.push(format!("\nFailed ({}):", report.failures.len()));
        lines.extend(
            report
                .failures
                .iter()
                .map(|f| format!("  {:<7} {}", f.symbol, f.reason())),
        );
    }

    let status = match report.status() {
        BatchStatus::NoData => "no data could be fetched",
        BatchStatus::Partial => "partial",
        BatchStatus::Complete => "complete",
    };
    lines.push(format!(
        "\nLast updated {} | {}/{} succeeded | {} shown | {}",
        report.completed_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.stats.success,
        report.stats.total,
        shown,
        status
    ));

    if report.stats.rel_volume_fallbacks > 0 {
        lines.push("* relative volume uses today's volume as the average".to_string());
    }

    lines.iter().map(|line| format!("{}\n", line)).collect()
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    status: BatchStatus,
    completed_at: DateTime<Utc>,
    records: &'a [&'a ScreeningRecord],
    failures: &'a [SymbolFailure],
    stats: &'a CollectionStats,
}

/// JSON 출력.
pub fn render_json(report: &BatchReport, records: &[&ScreeningRecord]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonOutput {
        status: report.status(),
        completed_at: report.completed_at,
        records,
        failures: &report.failures,
        stats: &report.stats,
    })
}

/// 형식에 맞게 전체 출력 문자열 생성.
pub fn render(
    report: &BatchReport,
    records: &[&ScreeningRecord],
    format: OutputFormat,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => render_json(report, records),
        OutputFormat::Table => {
            let mut out = if report.status() == BatchStatus::NoData {
                String::new()
            } else {
                render_table(records)
            };
            out.push_str(&render_summary(report, records.len()));
            Ok(out)
        }
    }
}
