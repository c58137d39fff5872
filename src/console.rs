use std::collections::{BTreeMap, HashMap};
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveDate};

use crate::format::{format_clock, format_duration, format_elapsed, format_hours};
use crate::project::{Project, ProjectId};
use crate::time_entry::TimeEntry;

/// プロジェクトが設定されていないentryの表示名。
const NO_PROJECT: &str = "No Project";
const ARCHIVED_SUFFIX: &str = "(archived)";

/// Consoleに集計結果を表示するためのtrait。
pub trait SummaryPresenter {
    /// タイムエントリーを開始時刻順に表示する。
    ///
    /// # Arguments
    ///
    /// * `time_entries` - 表示するタイムエントリー
    fn show_time_entries(&mut self, time_entries: &[&TimeEntry]) -> Result<()>;

    /// 期間の合計とプロジェクトごとの内訳を表示する。
    ///
    /// # Arguments
    ///
    /// * `label` - 期間の表示名
    /// * `total` - 合計時間(秒)
    /// * `by_project` - プロジェクトごとの合計時間(秒)
    fn show_summary(
        &mut self,
        label: &str,
        total: u64,
        by_project: &HashMap<Option<ProjectId>, u64>,
    ) -> Result<()>;

    /// 日ごとの合計を表示する。
    fn show_daily_totals(&mut self, daily: &BTreeMap<NaiveDate, u64>) -> Result<()>;

    /// 実行中のタイマーの経過時間を表示する。
    fn show_elapsed(&mut self, elapsed_seconds: u64) -> Result<()>;
}

/// 集計結果をMarkdownのlist形式で表示する。
pub struct ConsoleMarkdownList<'a, W: Write> {
    writer: &'a mut W,
    offset: FixedOffset,
    project_names: HashMap<ProjectId, String>,
    /// 経過時間の行が改行されずに残っているかどうか。
    elapsed_line: bool,
}

impl<'a, W: Write> ConsoleMarkdownList<'a, W> {
    /// 新しい`ConsoleMarkdownList`を返す。
    ///
    /// 時刻は`offset`で表示する。
    pub fn new(writer: &'a mut W, offset: FixedOffset) -> Self {
        Self {
            writer,
            offset,
            project_names: HashMap::new(),
            elapsed_line: false,
        }
    }

    /// プロジェクト名の表示に利用するプロジェクト一覧を設定する。
    ///
    /// アーカイブ済みのプロジェクトは名前の後ろに`(archived)`を付けて表示する。
    pub fn with_projects(mut self, projects: &[Project]) -> Self {
        self.project_names = projects
            .iter()
            .map(|project| {
                let name = if project.is_active {
                    project.name().to_string()
                } else {
                    format!("{} {}", project.name(), ARCHIVED_SUFFIX)
                };
                (project.id.clone(), name)
            })
            .collect();
        self
    }

    /// 経過時間の行を閉じる。
    fn end_elapsed_line(&mut self) -> Result<()> {
        if self.elapsed_line {
            writeln!(self.writer).context("Failed to end elapsed line")?;
            self.elapsed_line = false;
        }
        Ok(())
    }

    fn project_name(&self, project: Option<&ProjectId>) -> String {
        match project {
            Some(id) => self
                .project_names
                .get(id)
                .cloned()
                .unwrap_or_else(|| id.to_string()),
            None => NO_PROJECT.to_string(),
        }
    }
}

impl<'a, W: Write> SummaryPresenter for ConsoleMarkdownList<'a, W> {
    fn show_time_entries(&mut self, time_entries: &[&TimeEntry]) -> Result<()> {
        self.end_elapsed_line()?;
        let mut sorted_entries = time_entries.to_vec();
        sorted_entries.sort_by_key(|entry| entry.start());

        for entry in sorted_entries {
            let start_str = entry.start().with_timezone(&self.offset).format("%H:%M");
            let stop_str = entry.stop().with_timezone(&self.offset).format("%H:%M");
            let description = match entry.description() {
                "" => "(no description)",
                description => description,
            };
            let project_name = self.project_name(entry.project());
            writeln!(
                self.writer,
                "- {} ~ {} ({}): {} [{}]",
                start_str,
                stop_str,
                format_clock(entry.duration()),
                description,
                project_name
            )
            .with_context(|| format!("Failed to write time entry: {:?}", entry))?;
        }

        Ok(())
    }

    fn show_summary(
        &mut self,
        label: &str,
        total: u64,
        by_project: &HashMap<Option<ProjectId>, u64>,
    ) -> Result<()> {
        self.end_elapsed_line()?;
        writeln!(self.writer, "## {}: {}", label, format_duration(total))
            .context("Failed to write summary")?;

        let mut rows = by_project
            .iter()
            .map(|(project, seconds)| (self.project_name(project.as_ref()), *seconds))
            .collect::<Vec<_>>();
        rows.sort_by(|(a_name, a_secs), (b_name, b_secs)| {
            b_secs.cmp(a_secs).then_with(|| a_name.cmp(b_name))
        });
        for (name, seconds) in rows {
            writeln!(self.writer, "- {}: {}", name, format_duration(seconds))
                .with_context(|| format!("Failed to write project total: {}", name))?;
        }

        Ok(())
    }

    fn show_daily_totals(&mut self, daily: &BTreeMap<NaiveDate, u64>) -> Result<()> {
        self.end_elapsed_line()?;
        for (date, seconds) in daily {
            writeln!(
                self.writer,
                "- {}: {} ({}h)",
                date,
                format_duration(*seconds),
                format_hours(*seconds)
            )
            .with_context(|| format!("Failed to write daily total: {}", date))?;
        }

        Ok(())
    }

    fn show_elapsed(&mut self, elapsed_seconds: u64) -> Result<()> {
        write!(self.writer, "\r{}", format_elapsed(elapsed_seconds))
            .context("Failed to write elapsed time")?;
        self.writer.flush().context("Failed to flush writer")?;
        self.elapsed_line = true;

        Ok(())
    }
}
