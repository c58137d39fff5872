use std::io;

use anyhow::{Context, Result};
use chrono::FixedOffset;
use clap::{Parser, Subcommand};
use log::{info, warn};

use tictally::console::ConsoleMarkdownList;
use tictally::datetime::{parse_offset, Clock, SystemClock};
use tictally::logger::setup_logger;
use tictally::repository::{SupabaseClient, SupabaseConfig};
use tictally::settings::Settings;
use tictally::summary_command::{SummaryArgs, SummaryCommand};
use tictally::track_command::{TrackArgs, TrackCommand};
use tictally::WeekStart;

/// タイマーを実行し、time entryを集計するためのCLIアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run -- summary --window week --daily
/// $ cargo run -- track -m "Write report" -p 1 --save
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(subcommand)]
    subcommand: SubCommands,

    #[clap(
        short = 'v',
        long = "verbose",
        global = true,
        parse(from_occurrences),
        help = "Increase log verbosity"
    )]
    verbose: u64,

    #[clap(
        long = "week-start",
        global = true,
        help = "First day of the week: sunday or monday"
    )]
    week_start: Option<WeekStart>,

    #[clap(
        long = "offset",
        global = true,
        help = "UTC offset for day boundaries, e.g. +09:00",
        parse(try_from_str = parse_offset),
    )]
    offset: Option<FixedOffset>,
}

/// サブコマンドを表す列挙型。
#[derive(Debug, Subcommand)]
enum SubCommands {
    Summary(SummaryArgs),
    Track(TrackArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logger(args.verbose)?;

    let settings = Settings::load().context("Failed to load settings")?;
    let aggregator = settings
        .aggregator(args.week_start, args.offset)
        .context("Failed to configure aggregation")?;
    let client = SupabaseConfig::from_env(&settings).map(SupabaseClient::new);
    let mut stdout = io::stdout();

    match args.subcommand {
        SubCommands::Summary(summary) => {
            let client = client.context("Failed to configure store client")?;
            let command = SummaryCommand::new(&client, aggregator);
            let result = command.run(&summary, SystemClock.now()).await?;
            let mut presenter = ConsoleMarkdownList::new(&mut stdout, aggregator.offset())
                .with_projects(&result.projects);
            result.show(&mut presenter, summary.entries, summary.daily)?;
        }
        SubCommands::Track(track) => {
            let client = match client {
                Ok(client) => Some(client),
                Err(err) => {
                    info!("Tracking without the store: {:#}", err);
                    None
                }
            };
            let mut presenter = ConsoleMarkdownList::new(&mut stdout, aggregator.offset());
            let mut command = TrackCommand::new(client.as_ref(), aggregator, SystemClock);
            let stop_signal = async {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    warn!("Failed to listen for Ctrl-C: {}", err);
                }
            };
            command.run(&track, stop_signal, &mut presenter).await?;
        }
    }

    Ok(())
}
