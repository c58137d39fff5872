use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use log::info;

use crate::aggregate::{EntryAggregator, Window};
use crate::console::SummaryPresenter;
use crate::project::{Project, ProjectId};
use crate::repository::EntryRepository;
use crate::time_entry::TimeEntry;

/// 期間ごとの集計結果を出力するためのサブコマンド。
#[derive(Debug, clap::Args)]
pub struct SummaryArgs {
    #[clap(
        short = 'w',
        long = "window",
        default_value = "today",
        help = "Aggregation window: today, week or month"
    )]
    pub window: Window,

    #[clap(
        short = 'd',
        long = "date",
        help = "Sets a custom date in the format YYYY-MM-DD",
        parse(try_from_str = parse_date),
    )]
    pub date: Option<NaiveDate>,

    #[clap(long = "daily", help = "Show totals by day")]
    pub daily: bool,

    #[clap(long = "entries", help = "List the time entries of the window")]
    pub entries: bool,
}

/// 1つの期間の集計結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub window: Window,
    pub entries: Vec<TimeEntry>,
    pub projects: Vec<Project>,
    pub total: u64,
    pub by_project: HashMap<Option<ProjectId>, u64>,
    pub daily: BTreeMap<NaiveDate, u64>,
}

impl Summary {
    /// 集計結果を表示する。
    ///
    /// # Arguments
    ///
    /// * `show_entries` - タイムエントリーの一覧も表示する
    /// * `show_daily` - 日ごとの合計も表示する
    pub fn show<P: SummaryPresenter>(
        &self,
        presenter: &mut P,
        show_entries: bool,
        show_daily: bool,
    ) -> Result<()> {
        presenter
            .show_summary(self.window.label(), self.total, &self.by_project)
            .context("Failed to show summary")?;
        if show_daily {
            presenter
                .show_daily_totals(&self.daily)
                .context("Failed to show daily totals")?;
        }
        if show_entries {
            let entries = self.entries.iter().collect::<Vec<_>>();
            presenter
                .show_time_entries(&entries)
                .context("Failed to show time entries")?;
        }

        Ok(())
    }
}

pub struct SummaryCommand<'a, T: EntryRepository> {
    repository: &'a T,
    aggregator: EntryAggregator,
}

impl<'a, T: EntryRepository> SummaryCommand<'a, T> {
    /// 新しい`SummaryCommand`を返す。
    ///
    /// # Arguments
    /// * `repository` - タイムエントリーを取得するリポジトリ
    /// * `aggregator` - 集計に利用する`EntryAggregator`
    pub fn new(repository: &'a T, aggregator: EntryAggregator) -> Self {
        Self {
            repository,
            aggregator,
        }
    }

    /// `summary`サブコマンドの処理を行う。
    ///
    /// 日付が指定されていない場合は`now`を基準とする。
    /// 日付が指定された場合は、設定されたオフセットでのその日の00:00:00を基準とする。
    pub async fn run(&self, args: &SummaryArgs, now: DateTime<Utc>) -> Result<Summary> {
        let reference = match args.date {
            Some(date) => self.start_of(date)?,
            None => now,
        };
        let (start_at, end_at) = self
            .aggregator
            .window_bounds(args.window, reference)
            .context("Failed to compute window bounds")?;
        info!("Start at: {}, End at: {}", start_at, end_at);

        let time_entries = self
            .repository
            .read_time_entries(&start_at, &end_at)
            .await
            .context("Failed to retrieve time entries")?;
        let projects = self
            .repository
            .read_projects()
            .await
            .context("Failed to get project list")?;
        info!("Time entries retrieved successfully.");

        let entries = self
            .aggregator
            .entries_in(args.window, reference, &time_entries)
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();

        Ok(Summary {
            window: args.window,
            total: self
                .aggregator
                .total_for(args.window, reference, &entries, None),
            by_project: self.aggregator.totals_by_project(&entries),
            daily: self.aggregator.daily_totals(args.window, reference, &entries),
            entries,
            projects,
        })
    }

    fn start_of(&self, date: NaiveDate) -> Result<DateTime<Utc>> {
        let naive_datetime = date
            .and_hms_opt(0, 0, 0)
            .context("Failed to set hour, minute, and second")?;
        let datetime = self
            .aggregator
            .offset()
            .from_local_datetime(&naive_datetime)
            .single()
            .context("Failed to convert to DateTime<FixedOffset>")?;

        Ok(datetime.with_timezone(&Utc))
    }
}

/// 日付をパースする。
fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("Failed to parse date: {}", s))
}
