use chrono::{DateTime, Utc};
use thiserror::Error;

/// タイマーの状態遷移に関するエラー。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimerError {
    #[error("timer already running")]
    AlreadyRunning,
    #[error("no timer running")]
    NotRunning,
    #[error(transparent)]
    Entry(#[from] EntryError),
}

/// 不正なtime entryやprojectを作成しようとした時のエラー。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryError {
    #[error("stop ({stop}) is before start ({start})")]
    StopBeforeStart {
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    },
    #[error("negative duration: {0}")]
    NegativeDuration(i64),
    #[error("stored duration {stored}s does not match {computed}s between start and stop")]
    DurationMismatch { stored: i64, computed: u64 },
    #[error("project name must not be empty")]
    EmptyProjectName,
}

/// 文字列から設定値をパースできなかった時のエラー。
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseError {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
