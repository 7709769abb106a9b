//! Radar 스크리닝 CLI.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use radar_collector::{
    build_provider, rank, render, BatchAggregator, BatchReport, CollectorConfig, MissingPolicy,
    OutputFormat, RankKey, ScreeningFilter, SortDirection,
};
use radar_core::{init_logging, LogFormat, ScreeningRecord, SystemClock};
use rust_decimal::Decimal;

#[derive(Parser)]
#[command(name = "radar")]
#[command(about = "Watch-list market screening radar", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 설정 파일 경로 (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// 로그 형식 (pretty, json, compact)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(clap::Args, Debug, Clone)]
struct ViewArgs {
    /// 최소 등락률 (%)
    #[arg(long)]
    min_change: Option<Decimal>,

    /// 최소 RSI
    #[arg(long)]
    min_rsi: Option<Decimal>,

    /// 최소 뉴스 건수
    #[arg(long)]
    min_news: Option<u32>,

    /// 조건 필드가 누락된 레코드 제외 (기본: 0으로 간주)
    #[arg(long)]
    exclude_missing: bool,

    /// 정렬 기준 (change, rel-volume, rsi, from-high, market-cap, news, volume, symbol)
    #[arg(long)]
    sort: Option<RankKey>,

    /// 오름차순 정렬
    #[arg(long)]
    ascending: bool,

    /// 출력 형식
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

impl ViewArgs {
    fn filter(&self) -> ScreeningFilter {
        ScreeningFilter {
            min_change_pct: self.min_change,
            min_rsi: self.min_rsi,
            min_news_count: self.min_news,
            missing: if self.exclude_missing {
                MissingPolicy::Exclude
            } else {
                MissingPolicy::TreatAsZero
            },
        }
    }

    fn direction(&self) -> SortDirection {
        if self.ascending {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        }
    }

    fn print(&self, report: &BatchReport) -> anyhow::Result<()> {
        let mut records: Vec<&ScreeningRecord> = self.filter().filter(&report.dataset);
        if let Some(key) = self.sort {
            rank(&mut records, key, self.direction());
        }

        println!("{}", render::render(report, &records, self.format)?);
        Ok(())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// 워치리스트를 한 번 스크리닝하고 결과 출력
    Run {
        /// 특정 심볼만 처리 (쉼표로 구분, 예: "MP,UUUU")
        #[arg(long)]
        symbols: Option<String>,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// 데몬 모드: 주기적으로 스크리닝 (SIGHUP으로 즉시 새로고침)
    Daemon {
        #[command(flatten)]
        view: ViewArgs,
    },
}

fn watchlist(config: &CollectorConfig, symbols: Option<&str>) -> Vec<String> {
    match symbols {
        Some(list) => list.split(',').map(|s| s.to_string()).collect(),
        None => config.watchlist.clone(),
    }
}

#[cfg(unix)]
async fn refresh_signal(
    hangup: &mut Option<tokio::signal::unix::Signal>,
) -> Option<()> {
    match hangup {
        Some(signal) => signal.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(not(unix))]
async fn refresh_signal(_: &mut Option<()>) -> Option<()> {
    std::future::pending().await
}

#[cfg(unix)]
fn install_refresh_signal() -> Option<tokio::signal::unix::Signal> {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::hangup()) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::warn!(error = %e, "SIGHUP 핸들러 등록 실패, 주기 실행만 사용");
            None
        }
    }
}

#[cfg(not(unix))]
fn install_refresh_signal() -> Option<()> {
    None
}

async fn run_daemon(
    config: &CollectorConfig,
    aggregator: &BatchAggregator,
    view: &ViewArgs,
) -> anyhow::Result<()> {
    tracing::info!(
        "=== 데몬 모드 시작 (주기: {}분) ===",
        config.daemon.interval_minutes
    );

    let mut interval = tokio::time::interval(config.daemon.interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut hangup = install_refresh_signal();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("종료 신호 수신, 데몬 종료 중...");
                break;
            }
            Some(()) = refresh_signal(&mut hangup) => {
                tracing::info!("새로고침 신호 수신");
                let report = aggregator.refresh_now(config.watchlist.as_slice()).await;
                view.print(&report)?;
                interval.reset();
            }
            _ = interval.tick() => {
                let report = aggregator.run(config.watchlist.as_slice()).await;
                view.print(&report)?;
                tracing::info!(
                    "=== 배치 완료, 다음 실행: {}분 후 ===",
                    config.daemon.interval_minutes
                );
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = CollectorConfig::load(cli.config.as_deref())?;

    let mut log_config = config.log_config()?;
    if let Some(level) = cli.log_level {
        log_config.level = level;
    }
    if let Some(format) = cli.log_format {
        log_config.format = format;
    }
    init_logging(log_config).map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    tracing::info!("Radar 시작");

    let provider = build_provider(&config)?;
    let aggregator = BatchAggregator::from_config(&config, provider, Arc::new(SystemClock))?;

    match cli.command {
        Commands::Run { symbols, view } => {
            let watchlist = watchlist(&config, symbols.as_deref());
            let report = aggregator.run(watchlist.as_slice()).await;
            view.print(&report)?;
        }
        Commands::Daemon { view } => {
            run_daemon(&config, &aggregator, &view).await?;
        }
    }

    tracing::info!("Radar 종료");
    Ok(())
}
