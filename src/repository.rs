use std::env;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info};
use reqwest::{header::CONTENT_TYPE, Client};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::project::{Project, ProjectId};
use crate::settings::Settings;
use crate::time_entry::{EntryId, TimeEntry};

/// time entryを保存・取得するストアとのやりとりを行うためのtrait。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntryRepository: Send + Sync {
    /// 開始時刻が`[start_at, end_at)`に含まれる終了済みのタイムエントリーを取得する。
    ///
    /// 実行中のタイムエントリーは含めない。
    async fn read_time_entries(
        &self,
        start_at: &DateTime<Utc>,
        end_at: &DateTime<Utc>,
    ) -> Result<Vec<TimeEntry>>;

    /// プロジェクト一覧を取得する。
    async fn read_projects(&self) -> Result<Vec<Project>>;

    /// タイムエントリーを保存する。
    async fn create_time_entry(&self, entry: &TimeEntry) -> Result<()>;
}

/// `time_entries`テーブルの行をデシリアライズするための構造体。
#[derive(Debug, Deserialize)]
struct SupabaseTimeEntry {
    id: Uuid,
    project_id: Option<String>,
    description: Option<String>,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    duration: Option<i64>,
    #[serde(default)]
    is_running: bool,
}

/// `time_entries`テーブルに行を追加するための構造体。
#[derive(Debug, Serialize)]
struct NewSupabaseTimeEntry<'a> {
    id: String,
    user_id: &'a str,
    project_id: Option<&'a str>,
    description: &'a str,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    duration: u64,
    is_running: bool,
}

/// `projects`テーブルの行をデシリアライズするための構造体。
#[derive(Debug, Deserialize)]
struct SupabaseProject {
    id: String,
    name: String,
    #[serde(default)]
    color: String,
    #[serde(default = "default_is_active")]
    is_active: bool,
    notes: Option<String>,
}

fn default_is_active() -> bool {
    true
}

/// `SupabaseClient`の接続情報。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    /// ログイン済みユーザーのアクセストークン。未設定の場合はanon keyを利用する。
    pub access_token: Option<String>,
    /// entryを保存する時に利用するユーザーID。
    pub user_id: Option<String>,
}

impl SupabaseConfig {
    /// 環境変数と設定ファイルから接続情報を作成する。
    ///
    /// `SUPABASE_URL`は設定ファイルの`supabase_url`より優先する。
    /// `SUPABASE_ANON_KEY`が設定されていない場合はエラーを返す。
    pub fn from_env(settings: &Settings) -> Result<Self> {
        let url = env::var("SUPABASE_URL")
            .ok()
            .or_else(|| settings.supabase_url.clone())
            .context("SUPABASE_URL must be set")?;
        let anon_key = env::var("SUPABASE_ANON_KEY").context("SUPABASE_ANON_KEY must be set")?;
        let access_token = env::var("SUPABASE_ACCESS_TOKEN").ok();

        Ok(Self {
            url,
            anon_key,
            access_token,
            user_id: settings.user_id.clone(),
        })
    }
}

/// ストアのREST APIと通信するためのクライアント。
pub struct SupabaseClient {
    client: Client,
    api_url: String,
    config: SupabaseConfig,
}

impl SupabaseClient {
    /// 新しい`SupabaseClient`を返す。
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: format!("{}/rest/v1", config.url.trim_end_matches('/')),
            config,
        }
    }

    fn bearer(&self) -> &str {
        self.config
            .access_token
            .as_deref()
            .unwrap_or(&self.config.anon_key)
    }
}

#[async_trait]
impl EntryRepository for SupabaseClient {
    async fn read_time_entries(
        &self,
        start_at: &DateTime<Utc>,
        end_at: &DateTime<Utc>,
    ) -> Result<Vec<TimeEntry>> {
        let rows = self
            .client
            .get(format!("{}/time_entries", self.api_url))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(self.bearer())
            .header(CONTENT_TYPE, "application/json")
            .query(&[
                ("select", "*".to_string()),
                (
                    "start_time",
                    format!("gte.{}", start_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ),
                (
                    "start_time",
                    format!("lt.{}", end_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ),
                ("is_running", "eq.false".to_string()),
                ("order", "start_time.asc".to_string()),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", self.api_url))?
            .error_for_status()
            .context("Request returned an error status")?
            .json::<Vec<SupabaseTimeEntry>>()
            .await
            .context("Failed to deserialize response")?;
        info!("length of time entries: {}", rows.len());

        let mut time_entries = Vec::with_capacity(rows.len());
        for row in rows {
            let stop = match row.end_time {
                Some(stop) if !row.is_running => stop,
                _ => {
                    debug!("Skip running time entry: {}", row.id);
                    continue;
                }
            };
            let entry = TimeEntry::restore(
                EntryId::from(row.id),
                row.description.unwrap_or_default(),
                row.project_id.map(ProjectId::from),
                row.start_time,
                stop,
                row.duration,
            )
            .with_context(|| format!("Malformed time entry: {}", row.id))?;
            time_entries.push(entry);
        }

        Ok(time_entries)
    }

    async fn read_projects(&self) -> Result<Vec<Project>> {
        let rows = self
            .client
            .get(format!("{}/projects", self.api_url))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(self.bearer())
            .header(CONTENT_TYPE, "application/json")
            .query(&[("select", "*"), ("order", "name.asc")])
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", self.api_url))?
            .error_for_status()
            .context("Request returned an error status")?
            .json::<Vec<SupabaseProject>>()
            .await
            .context("Failed to deserialize response")?;

        rows.into_iter()
            .map(|row| {
                let mut project = Project::new(row.id.clone(), row.name, row.color)
                    .with_context(|| format!("Malformed project: {}", row.id))?;
                project.is_active = row.is_active;
                project.notes = row.notes;
                Ok(project)
            })
            .collect()
    }

    async fn create_time_entry(&self, entry: &TimeEntry) -> Result<()> {
        let user_id = self
            .config
            .user_id
            .as_deref()
            .context("user_id must be set to save time entries")?;
        let body = NewSupabaseTimeEntry {
            id: entry.id().to_string(),
            user_id,
            project_id: entry.project().map(ProjectId::as_str),
            description: entry.description(),
            start_time: entry.start(),
            end_time: entry.stop(),
            duration: entry.duration(),
            is_running: false,
        };

        self.client
            .post(format!("{}/time_entries", self.api_url))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(self.bearer())
            .header("Prefer", "return=minimal")
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", self.api_url))?
            .error_for_status()
            .context("Request returned an error status")?;
        info!("Time entry saved: {}", entry.id());

        Ok(())
    }
}
