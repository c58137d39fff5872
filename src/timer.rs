use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::datetime::Clock;
use crate::error::TimerError;
use crate::format::format_elapsed;
use crate::project::ProjectId;
use crate::time_entry::{rounded_seconds, TimeEntry};

/// 実行中のセッション。
///
/// メモリ上にのみ保持され、プロセスが終了すると失われる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningSession {
    pub description: String,
    pub project: Option<ProjectId>,
    pub started_at: DateTime<Utc>,
}

/// 集計時に実行中のセッションを含めるための値。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunningSnapshot {
    pub started_at: DateTime<Utc>,
    pub elapsed_seconds: u64,
}

/// タイマーの状態。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TimerState {
    #[default]
    Idle,
    Running(RunningSession),
}

/// 1つのセッションを計測するタイマー。
///
/// 経過時間はtickの回数ではなく、読み出し時の`now() - started_at`で計算する。
/// tickが遅延しても経過時間がずれることはない。
#[derive(Debug)]
pub struct TimerEngine<C: Clock> {
    clock: C,
    state: TimerState,
}

impl<C: Clock> TimerEngine<C> {
    /// `Idle`状態の新しい`TimerEngine`を返す。
    pub fn new(clock: C) -> Self {
        Self::with_state(clock, TimerState::Idle)
    }

    /// 呼び出し側が保持している状態から`TimerEngine`を返す。
    pub fn with_state(clock: C, state: TimerState) -> Self {
        Self { clock, state }
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, TimerState::Running(_))
    }

    /// 実行中のセッションを返す。
    pub fn running(&self) -> Option<&RunningSession> {
        match &self.state {
            TimerState::Running(session) => Some(session),
            TimerState::Idle => None,
        }
    }

    /// タイマーを開始する。
    ///
    /// 既に実行中の場合は`TimerError::AlreadyRunning`を返し、状態は変更しない。
    pub fn start(
        &mut self,
        description: impl Into<String>,
        project: Option<ProjectId>,
    ) -> Result<(), TimerError> {
        if self.is_running() {
            return Err(TimerError::AlreadyRunning);
        }

        let session = RunningSession {
            description: description.into(),
            project,
            started_at: self.clock.now(),
        };
        info!(
            "Timer started at {} (project: {:?})",
            session.started_at, session.project
        );
        self.state = TimerState::Running(session);

        Ok(())
    }

    /// タイマーを停止し、終了したtime entryを返す。
    ///
    /// 返したentryを保存するかどうかは呼び出し側が決める。
    /// 実行中でない場合は`TimerError::NotRunning`を返す。
    pub fn stop(&mut self) -> Result<TimeEntry, TimerError> {
        let TimerState::Running(session) = &self.state else {
            return Err(TimerError::NotRunning);
        };

        let entry = TimeEntry::new(
            session.description.clone(),
            session.project.clone(),
            session.started_at,
            self.clock.now(),
        )?;
        self.state = TimerState::Idle;
        info!(
            "Timer stopped: {} ({} seconds)",
            entry.id(),
            entry.duration()
        );

        Ok(entry)
    }

    /// 実行中のセッションをentryを作らずに破棄する。
    ///
    /// 実行中でない場合は`TimerError::NotRunning`を返す。
    pub fn cancel(&mut self) -> Result<RunningSession, TimerError> {
        match std::mem::take(&mut self.state) {
            TimerState::Running(session) => {
                debug!("Timer cancelled, started at {}", session.started_at);
                Ok(session)
            }
            TimerState::Idle => Err(TimerError::NotRunning),
        }
    }

    /// 経過秒数を返す。`Idle`の場合は0を返す。
    ///
    /// 停止時のentryと同じく秒単位に四捨五入する。時計が開始時刻より戻った場合は0とする。
    pub fn elapsed_seconds(&self) -> u64 {
        match &self.state {
            TimerState::Running(session) => rounded_seconds(session.started_at, self.clock.now()),
            TimerState::Idle => 0,
        }
    }

    /// 経過時間を`HH:MM:SS`形式で返す。
    pub fn format_elapsed(&self) -> String {
        format_elapsed(self.elapsed_seconds())
    }

    /// 集計用に実行中のセッションの開始時刻と経過秒数を返す。
    pub fn snapshot(&self) -> Option<RunningSnapshot> {
        self.running().map(|session| RunningSnapshot {
            started_at: session.started_at,
            elapsed_seconds: self.elapsed_seconds(),
        })
    }
}
