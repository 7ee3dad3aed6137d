use anyhow::{anyhow, Context};
use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use clap::Parser;
use ingestion_application::{CandleQuery, CandleRepository};
use ingestion_domain::{CandleRow, TableName, TRADING_TZ};
use ingestion_infrastructure::{DatabaseSettings, PostgresCandleRepository};
use tracing_subscriber::EnvFilter;

const TABLES: [&str; 4] = [
    "classic_stocks",
    "weekend_stocks",
    "classic_stocks_hourly",
    "weekend_stocks_hourly",
];

const HEADERS: [&str; 7] = ["ticker", "begin_time", "close_time", "open", "high", "low", "close"];

/// Query stored candles.
#[derive(Parser, Debug)]
#[command(name = "candle-query")]
struct Args {
    /// Table to query
    #[arg(short, long, value_parser = TABLES)]
    table: String,

    /// Maximum number of rows, newest first
    #[arg(short, long, default_value_t = 10)]
    limit: u32,

    /// Filter by ticker symbol
    #[arg(short = 'k', long)]
    ticker: Option<String>,

    /// First trading day to include (YYYY-MM-DD, Moscow time)
    #[arg(short, long)]
    start_date: Option<NaiveDate>,

    /// Last trading day to include (YYYY-MM-DD, Moscow time)
    #[arg(short, long)]
    end_date: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let database = DatabaseSettings::from_env().context("Failed to load database settings")?;
    let repository = PostgresCandleRepository::new(database);

    let query = CandleQuery {
        table: TableName::new(args.table.as_str())?,
        limit: args.limit,
        ticker: args.ticker,
        begin_from: args.start_date.map(start_of_day).transpose()?,
        begin_to: args
            .end_date
            .map(|date| {
                date.checked_add_days(Days::new(1))
                    .ok_or_else(|| anyhow!("End date {} is out of range", date))
                    .and_then(start_of_day)
            })
            .transpose()?,
    };

    let rows = repository.recent(&query).await?;
    if rows.is_empty() {
        println!("No records found with the specified criteria.");
    } else {
        print!("{}", render_table(&rows));
    }

    Ok(())
}

fn start_of_day(date: NaiveDate) -> anyhow::Result<DateTime<Utc>> {
    TRADING_TZ
        .from_local_datetime(&date.and_time(chrono::NaiveTime::MIN))
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("Midnight of {} does not exist in {}", date, TRADING_TZ))
}

fn render_table(rows: &[CandleRow]) -> String {
    let cells: Vec<[String; 7]> = rows
        .iter()
        .map(|row| {
            [
                row.ticker().to_string(),
                format_time(row.begin_time()),
                format_time(row.close_time()),
                row.open().to_string(),
                row.high().to_string(),
                row.low().to_string(),
                row.close().to_string(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for line in &cells {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    push_line(&mut out, HEADERS.iter().copied(), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, rule.iter().map(String::as_str), &widths);
    for line in &cells {
        push_line(&mut out, line.iter().map(String::as_str), &widths);
    }
    out
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = width))
        .collect();
    out.push_str(padded.join(" | ").trim_end());
    out.push('\n');
}

fn format_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&TRADING_TZ)
        .format("%Y-%m-%d %H:%M:%S%:z")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingestion_domain::{Granularity, TimeWindow};
    use rust_decimal_macros::dec;

    #[test]
    fn test_day_bounds_use_moscow_midnight() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        assert_eq!(
            start_of_day(date).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 11, 21, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_render_table_aligns_columns() {
        let begin = Utc.with_ymd_and_hms(2025, 3, 12, 11, 0, 0).unwrap();
        let rows = vec![
            CandleRow::new(
                "SBER",
                TimeWindow::new(begin, Granularity::Hour).unwrap(),
                dec!(300.12),
                dec!(301),
                dec!(299.5),
                dec!(300.9),
            ),
            CandleRow::new(
                "GAZP",
                TimeWindow::new(begin, Granularity::Hour).unwrap(),
                dec!(160.5),
                dec!(161),
                dec!(159),
                dec!(160.75),
            ),
        ];

        let rendered = render_table(&rows);
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("ticker | begin_time"));
        assert!(lines[2]
            .starts_with("SBER   | 2025-03-12 14:00:00+03:00 | 2025-03-12 15:00:00+03:00"));
        let separators: Vec<usize> = lines
            .iter()
            .map(|line| line.match_indices(" | ").map(|(i, _)| i).collect::<Vec<_>>()[0])
            .collect();
        assert!(separators.iter().all(|i| *i == separators[0]));
    }

    #[test]
    fn test_table_choices_are_valid_names() {
        for table in TABLES {
            assert!(TableName::new(table).is_ok());
        }
    }
}
