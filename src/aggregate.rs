use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc};

use crate::error::ParseError;
use crate::format;
use crate::project::ProjectId;
use crate::time_entry::TimeEntry;
use crate::timer::RunningSnapshot;

/// 集計の対象期間。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Window {
    Today,
    ThisWeek,
    ThisMonth,
}

impl Window {
    pub fn label(&self) -> &'static str {
        match self {
            Window::Today => "Today",
            Window::ThisWeek => "This week",
            Window::ThisMonth => "This month",
        }
    }
}

impl FromStr for Window {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "today" | "day" => Ok(Window::Today),
            "week" | "this-week" => Ok(Window::ThisWeek),
            "month" | "this-month" => Ok(Window::ThisMonth),
            _ => Err(ParseError::new("window", s)),
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 週の始まりの曜日。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    /// `date`から、その週の始まりの日までの日数を返す。
    fn days_since(&self, date: NaiveDate) -> u32 {
        match self {
            WeekStart::Sunday => date.weekday().num_days_from_sunday(),
            WeekStart::Monday => date.weekday().num_days_from_monday(),
        }
    }
}

/// プロフィールの`week_starts_on`(0 = 日曜, 1 = 月曜)から変換する。
impl TryFrom<u8> for WeekStart {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WeekStart::Sunday),
            1 => Ok(WeekStart::Monday),
            _ => Err(ParseError::new("week start", value.to_string())),
        }
    }
}

impl FromStr for WeekStart {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sunday" | "sun" | "0" => Ok(WeekStart::Sunday),
            "monday" | "mon" | "1" => Ok(WeekStart::Monday),
            _ => Err(ParseError::new("week start", s)),
        }
    }
}

/// time entryの集計を行う。
///
/// 日付の境界は設定された固定のオフセットで判定する。
/// entryは呼び出し側が渡したスナップショットとして扱い、再検証はしない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryAggregator {
    offset: FixedOffset,
    week_start: WeekStart,
}

impl EntryAggregator {
    /// 新しい`EntryAggregator`を返す。
    ///
    /// # Arguments
    ///
    /// * `offset` - 日付の境界を判定するUTCオフセット
    /// * `week_start` - 週の始まりの曜日
    pub fn new(offset: FixedOffset, week_start: WeekStart) -> Self {
        Self { offset, week_start }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn week_start(&self) -> WeekStart {
        self.week_start
    }

    /// 設定されたオフセットでの日付を返す。
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// `window`に含まれる最初と最後の日付(両端を含む)を返す。
    pub fn date_range(&self, window: Window, reference: DateTime<Utc>) -> (NaiveDate, NaiveDate) {
        let today = self.local_date(reference);
        match window {
            Window::Today => (today, today),
            Window::ThisWeek => {
                let first = today - Duration::days(self.week_start.days_since(today) as i64);
                (first, first + Duration::days(6))
            }
            Window::ThisMonth => {
                let first = today - Duration::days(today.day0() as i64);
                let next_month = if first.month() == 12 {
                    NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
                };
                let last = next_month.map_or(NaiveDate::MAX, |date| date - Duration::days(1));
                (first, last)
            }
        }
    }

    /// `window`をUTCの半開区間`[start, end)`で返す。
    ///
    /// ストアに問い合わせる範囲として利用する。
    pub fn window_bounds(
        &self,
        window: Window,
        reference: DateTime<Utc>,
    ) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let (first, last) = self.date_range(window, reference);
        let start = self
            .offset
            .from_local_datetime(&first.and_hms_opt(0, 0, 0)?)
            .single()?;
        let end = self
            .offset
            .from_local_datetime(&last.succ_opt()?.and_hms_opt(0, 0, 0)?)
            .single()?;

        Some((start.with_timezone(&Utc), end.with_timezone(&Utc)))
    }

    /// `instant`が`window`に含まれるかどうかを返す。
    pub fn contains(
        &self,
        window: Window,
        reference: DateTime<Utc>,
        instant: DateTime<Utc>,
    ) -> bool {
        let (first, last) = self.date_range(window, reference);
        let date = self.local_date(instant);
        first <= date && date <= last
    }

    /// 開始時刻が`window`に含まれるentryを返す。
    pub fn entries_in<'a>(
        &self,
        window: Window,
        reference: DateTime<Utc>,
        entries: &'a [TimeEntry],
    ) -> Vec<&'a TimeEntry> {
        let (first, last) = self.date_range(window, reference);
        entries
            .iter()
            .filter(|entry| {
                let date = self.local_date(entry.start());
                first <= date && date <= last
            })
            .collect()
    }

    /// `window`の合計時間(秒)を返す。
    ///
    /// 実行中のセッションは、その開始日が`window`に含まれる場合のみ経過時間を加算する。
    pub fn total_for(
        &self,
        window: Window,
        reference: DateTime<Utc>,
        entries: &[TimeEntry],
        running: Option<RunningSnapshot>,
    ) -> u64 {
        let closed: u64 = self
            .entries_in(window, reference, entries)
            .iter()
            .map(|entry| entry.duration())
            .sum();
        let running = running
            .filter(|snapshot| self.contains(window, reference, snapshot.started_at))
            .map_or(0, |snapshot| snapshot.elapsed_seconds);

        closed + running
    }

    /// プロジェクトごとの合計時間(秒)を返す。
    ///
    /// プロジェクトなしのentryは`None`のキーに集計する。
    pub fn totals_by_project(&self, entries: &[TimeEntry]) -> HashMap<Option<ProjectId>, u64> {
        entries.iter().fold(HashMap::new(), |mut totals, entry| {
            *totals.entry(entry.project().cloned()).or_insert(0) += entry.duration();
            totals
        })
    }

    /// `window`内の日ごとの合計時間(秒)を日付順に返す。
    ///
    /// entryのない日は含めない。
    pub fn daily_totals(
        &self,
        window: Window,
        reference: DateTime<Utc>,
        entries: &[TimeEntry],
    ) -> BTreeMap<NaiveDate, u64> {
        self.entries_in(window, reference, entries)
            .into_iter()
            .fold(BTreeMap::new(), |mut totals, entry| {
                *totals.entry(self.local_date(entry.start())).or_insert(0) += entry.duration();
                totals
            })
    }

    /// 集計表示用に`<H>h <M>m`形式へ変換する。
    pub fn format_duration(seconds: u64) -> String {
        format::format_duration(seconds)
    }
}
