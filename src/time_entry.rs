use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EntryError;
use crate::project::ProjectId;

/// time entryの識別子。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    /// 新しいランダムな識別子を返す。
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for EntryId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 終了済みのtime entry。
///
/// 実行中のセッションは`TimerEngine`が保持し、停止した時点で`TimeEntry`になる。
/// `stop >= start`かつ`duration`は非負であることを生成時に保証する。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTimeEntry")]
pub struct TimeEntry {
    id: EntryId,
    description: String,
    project: Option<ProjectId>,
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
    duration: u64,
}

impl TimeEntry {
    /// 開始・終了時刻から新しい`TimeEntry`を返す。
    ///
    /// 期間は秒単位に四捨五入する。`stop`が`start`より前の場合はエラーを返す。
    pub fn new(
        description: impl Into<String>,
        project: Option<ProjectId>,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    ) -> Result<Self, EntryError> {
        Self::restore(EntryId::new(), description, project, start, stop, None)
    }

    /// 保存済みのデータから`TimeEntry`を復元する。
    ///
    /// `duration`が`None`の場合は開始・終了時刻から計算する。
    ///
    /// # Arguments
    ///
    /// * `duration` - 保存されている期間(秒)。負の値や、開始・終了時刻から計算した値と
    ///   1秒より大きくずれる値はエラーとする。
    pub fn restore(
        id: EntryId,
        description: impl Into<String>,
        project: Option<ProjectId>,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
        duration: Option<i64>,
    ) -> Result<Self, EntryError> {
        if stop < start {
            return Err(EntryError::StopBeforeStart { start, stop });
        }
        let computed = rounded_seconds(start, stop);
        let duration = match duration {
            Some(stored) if stored < 0 => return Err(EntryError::NegativeDuration(stored)),
            Some(stored) if stored.abs_diff(computed as i64) > DURATION_TOLERANCE_SECS => {
                return Err(EntryError::DurationMismatch { stored, computed })
            }
            Some(stored) => stored as u64,
            None => computed,
        };

        Ok(Self {
            id,
            description: description.into(),
            project,
            start,
            stop,
            duration,
        })
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn project(&self) -> Option<&ProjectId> {
        self.project.as_ref()
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn stop(&self) -> DateTime<Utc> {
        self.stop
    }

    /// 期間(秒)。
    pub fn duration(&self) -> u64 {
        self.duration
    }
}

/// 保存済みの期間と開始・終了時刻から計算した期間の許容誤差(秒)。
const DURATION_TOLERANCE_SECS: u64 = 1;

/// `start`から`stop`までの秒数を四捨五入して返す。`stop < start`の場合は0。
pub(crate) fn rounded_seconds(start: DateTime<Utc>, stop: DateTime<Utc>) -> u64 {
    let millis = (stop - start).num_milliseconds().max(0) as u64;
    (millis + 500) / 1000
}

/// デシリアライズ時に検証を通すための中間表現。
#[derive(Deserialize)]
struct RawTimeEntry {
    id: EntryId,
    #[serde(default)]
    description: String,
    project: Option<ProjectId>,
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
    duration: Option<i64>,
}

impl TryFrom<RawTimeEntry> for TimeEntry {
    type Error = EntryError;

    fn try_from(raw: RawTimeEntry) -> Result<Self, Self::Error> {
        Self::restore(
            raw.id,
            raw.description,
            raw.project,
            raw.start,
            raw.stop,
            raw.duration,
        )
    }
}
