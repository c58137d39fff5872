use std::future::Future;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use tokio::time::{self, MissedTickBehavior};

use crate::aggregate::{EntryAggregator, Window};
use crate::console::SummaryPresenter;
use crate::datetime::Clock;
use crate::project::ProjectId;
use crate::repository::EntryRepository;
use crate::time_entry::TimeEntry;
use crate::timer::TimerEngine;

/// タイマーを実行するためのサブコマンド。
#[derive(Debug, clap::Args)]
pub struct TrackArgs {
    #[clap(
        short = 'm',
        long = "description",
        default_value = "",
        help = "What are you working on?"
    )]
    pub description: String,

    #[clap(short = 'p', long = "project", help = "Project ID of the entry")]
    pub project: Option<String>,

    #[clap(long = "save", help = "Save the entry when the timer stops")]
    pub save: bool,
}

/// `track`サブコマンドの結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackOutcome {
    pub entry: TimeEntry,
    /// 停止したentryを含む今日の合計時間(秒)。
    pub today_total: u64,
}

pub struct TrackCommand<'a, T: EntryRepository, C: Clock> {
    /// ストアが設定されていない場合は`None`。entryの保存はできず、今日の合計は新しいentryのみになる。
    repository: Option<&'a T>,
    aggregator: EntryAggregator,
    timer: TimerEngine<C>,
}

impl<'a, T: EntryRepository, C: Clock> TrackCommand<'a, T, C> {
    /// 新しい`TrackCommand`を返す。
    pub fn new(repository: Option<&'a T>, aggregator: EntryAggregator, clock: C) -> Self {
        Self {
            repository,
            aggregator,
            timer: TimerEngine::new(clock),
        }
    }

    /// `track`サブコマンドの処理を行う。
    ///
    /// タイマーを開始し、`stop_signal`が完了するまで1秒ごとに経過時間を表示する。
    /// 停止後はentryと、そのentryを含む今日の合計を表示する。
    /// 日付をまたいだセッションは開始した日の合計に含める。
    ///
    /// # Arguments
    ///
    /// * `args` - `track`サブコマンドの引数
    /// * `stop_signal` - タイマーを停止するタイミング(通常はCtrl-C)
    /// * `presenter` - 表示先
    pub async fn run<F, P>(
        &mut self,
        args: &TrackArgs,
        stop_signal: F,
        presenter: &mut P,
    ) -> Result<TrackOutcome>
    where
        F: Future<Output = ()>,
        P: SummaryPresenter,
    {
        if args.save && self.repository.is_none() {
            bail!("Cannot save the entry: the store is not configured");
        }
        self.timer
            .start(args.description.clone(), args.project.clone().map(ProjectId::from))
            .context("Failed to start timer")?;

        let mut ticker = time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(stop_signal);
        loop {
            tokio::select! {
                biased;
                _ = &mut stop_signal => break,
                _ = ticker.tick() => presenter
                    .show_elapsed(self.timer.elapsed_seconds())
                    .context("Failed to show elapsed time")?,
            }
        }

        let entry = self.timer.stop().context("Failed to stop timer")?;
        if let Some(repository) = self.repository.filter(|_| args.save) {
            repository
                .create_time_entry(&entry)
                .await
                .context("Failed to save time entry")?;
        }

        let today_entries = self.today_entries(&entry).await;
        let today_total = self
            .aggregator
            .total_for(Window::Today, entry.start(), &today_entries, None);
        presenter
            .show_time_entries(&[&entry])
            .context("Failed to show time entry")?;
        presenter
            .show_summary(
                Window::Today.label(),
                today_total,
                &self.aggregator.totals_by_project(&today_entries),
            )
            .context("Failed to show summary")?;

        Ok(TrackOutcome { entry, today_total })
    }

    /// 停止したentryを含む、entryの開始日のentryを返す。
    ///
    /// ストアから取得したentryに同じentryが含まれる場合は二重に数えない。
    /// ストアから取得できない場合は停止したentryのみを返す。
    async fn today_entries(&self, entry: &TimeEntry) -> Vec<TimeEntry> {
        let mut entries = match self.repository {
            Some(repository) => self
                .read_stored(repository, entry)
                .await
                .unwrap_or_else(|err| {
                    warn!("Today's total covers only the new entry: {:#}", err);
                    vec![]
                }),
            None => {
                debug!("Store is not configured, today's total covers only the new entry");
                vec![]
            }
        };
        if !entries.iter().any(|stored| stored.id() == entry.id()) {
            entries.push(entry.clone());
        }
        let entries = self
            .aggregator
            .entries_in(Window::Today, entry.start(), &entries)
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();
        info!("Today's entries: {}", entries.len());

        entries
    }

    async fn read_stored(&self, repository: &T, entry: &TimeEntry) -> Result<Vec<TimeEntry>> {
        let (start_at, end_at) = self
            .aggregator
            .window_bounds(Window::Today, entry.start())
            .context("Failed to compute window bounds")?;
        repository
            .read_time_entries(&start_at, &end_at)
            .await
            .context("Failed to retrieve time entries")
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};

    use super::{TrackArgs, TrackCommand};
    use crate::aggregate::{EntryAggregator, WeekStart};
    use crate::console::ConsoleMarkdownList;
    use crate::datetime::mock_datetime::MockClock;
    use crate::project::ProjectId;
    use crate::repository::MockEntryRepository;
    use crate::time_entry::TimeEntry;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
    }

    fn aggregator() -> EntryAggregator {
        EntryAggregator::new(FixedOffset::east_opt(0).unwrap(), WeekStart::Sunday)
    }

    fn args(save: bool) -> TrackArgs {
        TrackArgs {
            description: "Bug fixes".to_string(),
            project: Some("p2".to_string()),
            save,
        }
    }

    #[tokio::test]
    async fn test_track_and_save() {
        let clock = MockClock::new(at(9, 0));
        let handle = clock.clone();
        let stored = TimeEntry::new("earlier", None, at(7, 0), at(8, 0)).unwrap();
        let mut repository = MockEntryRepository::new();
        repository
            .expect_create_time_entry()
            .withf(|entry| entry.duration() == 1500)
            .times(1)
            .returning(|_| Ok(()));
        repository
            .expect_read_time_entries()
            .times(1)
            .returning(move |_, _| Ok(vec![stored.clone()]));

        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer, aggregator().offset());
        let mut command = TrackCommand::new(Some(&repository), aggregator(), clock);
        let outcome = command
            .run(
                &args(true),
                async move { handle.advance(Duration::minutes(25)) },
                &mut presenter,
            )
            .await
            .unwrap();

        assert_eq!(outcome.entry.duration(), 1500);
        assert_eq!(outcome.entry.description(), "Bug fixes");
        assert_eq!(outcome.entry.project(), Some(&ProjectId::new("p2")));
        assert_eq!(outcome.today_total, 3600 + 1500);
        assert_eq!(
            String::from_utf8(writer).unwrap(),
            "- 09:00 ~ 09:25 (0:25): Bug fixes [p2]\n## Today: 1h 25m\n- No Project: 1h 0m\n- p2: 0h 25m\n"
        );
    }

    #[tokio::test]
    async fn test_track_counts_saved_entry_once() {
        let clock = MockClock::new(at(9, 0));
        let handle = clock.clone();
        let saved = std::sync::Arc::new(std::sync::Mutex::new(None::<TimeEntry>));
        let saved_for_create = saved.clone();
        let mut repository = MockEntryRepository::new();
        repository
            .expect_create_time_entry()
            .times(1)
            .returning(move |entry| {
                *saved_for_create.lock().unwrap() = Some(entry.clone());
                Ok(())
            });
        repository
            .expect_read_time_entries()
            .times(1)
            .returning(move |_, _| Ok(saved.lock().unwrap().iter().cloned().collect()));

        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer, aggregator().offset());
        let mut command = TrackCommand::new(Some(&repository), aggregator(), clock);
        let outcome = command
            .run(
                &args(true),
                async move { handle.advance(Duration::minutes(10)) },
                &mut presenter,
            )
            .await
            .unwrap();

        assert_eq!(outcome.today_total, 600);
    }

    #[tokio::test]
    async fn test_track_without_save_survives_read_error() {
        let clock = MockClock::new(at(23, 50));
        let handle = clock.clone();
        let mut repository = MockEntryRepository::new();
        repository.expect_create_time_entry().never();
        repository
            .expect_read_time_entries()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("offline")));

        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer, aggregator().offset());
        let mut command = TrackCommand::new(Some(&repository), aggregator(), clock);
        let outcome = command
            .run(
                &args(false),
                async move { handle.advance(Duration::minutes(5)) },
                &mut presenter,
            )
            .await
            .unwrap();

        assert_eq!(outcome.entry.duration(), 300);
        assert_eq!(outcome.today_total, 300);
    }

    #[tokio::test]
    async fn test_track_save_error() {
        let clock = MockClock::new(at(9, 0));
        let mut repository = MockEntryRepository::new();
        repository
            .expect_create_time_entry()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("unauthorized")));
        repository.expect_read_time_entries().never();

        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer, aggregator().offset());
        let mut command = TrackCommand::new(Some(&repository), aggregator(), clock);
        let result = command.run(&args(true), async {}, &mut presenter).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_track_across_midnight_counts_start_day() {
        let clock = MockClock::new(at(23, 50));
        let handle = clock.clone();
        let stored = TimeEntry::new("earlier", None, at(22, 0), at(23, 0)).unwrap();
        let mut repository = MockEntryRepository::new();
        repository.expect_create_time_entry().never();
        repository
            .expect_read_time_entries()
            .withf(|start_at, end_at| {
                *start_at == at(0, 0) && *end_at == at(0, 0) + Duration::days(1)
            })
            .times(1)
            .returning(move |_, _| Ok(vec![stored.clone()]));

        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer, aggregator().offset());
        let mut command = TrackCommand::new(Some(&repository), aggregator(), clock);
        let outcome = command
            .run(
                &TrackArgs {
                    description: "late".to_string(),
                    ..args(false)
                },
                async move { handle.advance(Duration::minutes(20)) },
                &mut presenter,
            )
            .await
            .unwrap();

        assert_eq!(outcome.entry.duration(), 1200);
        assert_eq!(outcome.today_total, 3600 + 1200);
        assert_eq!(
            String::from_utf8(writer).unwrap(),
            "- 23:50 ~ 00:10 (0:20): late [p2]\n## Today: 1h 20m\n- No Project: 1h 0m\n- p2: 0h 20m\n"
        );
    }

    #[tokio::test]
    async fn test_track_without_store() {
        let clock = MockClock::new(at(23, 50));
        let handle = clock.clone();

        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer, aggregator().offset());
        let mut command = TrackCommand::<MockEntryRepository, _>::new(None, aggregator(), clock);
        let outcome = command
            .run(
                &args(false),
                async move { handle.advance(Duration::minutes(20)) },
                &mut presenter,
            )
            .await
            .unwrap();

        assert_eq!(outcome.today_total, 1200);
        assert_eq!(
            String::from_utf8(writer).unwrap(),
            "- 23:50 ~ 00:10 (0:20): Bug fixes [p2]\n## Today: 0h 20m\n- p2: 0h 20m\n"
        );
    }

    #[tokio::test]
    async fn test_track_save_without_store() {
        let clock = MockClock::new(at(9, 0));

        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer, aggregator().offset());
        let mut command = TrackCommand::<MockEntryRepository, _>::new(None, aggregator(), clock);
        let result = command.run(&args(true), async {}, &mut presenter).await;

        assert!(result.is_err());
        assert!(writer.is_empty());
    }
}
