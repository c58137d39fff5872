//! Toggl風のタイムトラッカーのタイマーとtime entryの集計。
//!
//! `TimerEngine`が1つのセッションを計測して`TimeEntry`を作り、
//! `EntryAggregator`が期間やプロジェクトごとの合計を計算する。

pub mod aggregate;
pub mod console;
pub mod datetime;
pub mod error;
pub mod format;
pub mod logger;
pub mod project;
pub mod repository;
pub mod settings;
pub mod summary_command;
pub mod time_entry;
pub mod timer;
pub mod track_command;

pub use aggregate::{EntryAggregator, WeekStart, Window};
pub use datetime::{Clock, SystemClock};
pub use error::{EntryError, TimerError};
pub use format::{format_duration, format_elapsed};
pub use project::{Project, ProjectId};
pub use time_entry::{EntryId, TimeEntry};
pub use timer::{RunningSession, RunningSnapshot, TimerEngine, TimerState};
