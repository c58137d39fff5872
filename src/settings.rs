use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::FixedOffset;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::aggregate::{EntryAggregator, WeekStart};
use crate::datetime::{local_offset, parse_offset};

/// ユーザー設定。
///
/// `<config_dir>/tictally/config.json`から読み込む。ファイルがない場合は既定値を利用する。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 週の始まり(0 = 日曜, 1 = 月曜)。
    pub week_starts_on: u8,
    /// 日付の境界に利用するUTCオフセット(`+09:00`など)。未設定の場合はローカルのオフセット。
    pub utc_offset: Option<String>,
    pub supabase_url: Option<String>,
    pub user_id: Option<String>,
}

impl Settings {
    /// 設定ファイルのパスを返す。
    pub fn config_path() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Cannot determine config directory")?
            .join("tictally")
            .join("config.json"))
    }

    /// 既定の場所から設定を読み込む。
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// 指定したパスから設定を読み込む。ファイルが存在しない場合は既定値を返す。
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let settings: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;

        Ok(settings)
    }

    pub fn week_start(&self) -> Result<WeekStart> {
        WeekStart::try_from(self.week_starts_on).context("Invalid week_starts_on in config")
    }

    pub fn offset(&self) -> Result<FixedOffset> {
        match &self.utc_offset {
            Some(offset) => parse_offset(offset).context("Invalid utc_offset in config"),
            None => Ok(local_offset()),
        }
    }

    /// 設定から`EntryAggregator`を作成する。
    ///
    /// 引数で指定された値は設定ファイルの値より優先する。
    pub fn aggregator(
        &self,
        week_start: Option<WeekStart>,
        offset: Option<FixedOffset>,
    ) -> Result<EntryAggregator> {
        let week_start = match week_start {
            Some(week_start) => week_start,
            None => self.week_start()?,
        };
        let offset = match offset {
            Some(offset) => offset,
            None => self.offset()?,
        };

        Ok(EntryAggregator::new(offset, week_start))
    }
}
