use chrono::{DateTime, FixedOffset, Local, Offset, Utc};

use crate::error::ParseError;

/// 現在時刻を提供するためのtrait。
///
/// タイマーは`now()`の差分で経過時間を求めるため、テストでは時刻を差し替える。
pub trait Clock {
    /// 現在のUTC時間を取得する。
    fn now(&self) -> DateTime<Utc>;
}

/// システム時計を利用する`Clock`。
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 実行環境のローカルタイムゾーンの現在のオフセットを取得する。
pub fn local_offset() -> FixedOffset {
    Local::now().offset().fix()
}

/// `+09:00`や`-05:30`の形式のオフセットをパースする。
///
/// `Z`と`UTC`は`+00:00`として扱う。
pub fn parse_offset(s: &str) -> Result<FixedOffset, ParseError> {
    let trimmed = s.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }

    trimmed
        .parse::<FixedOffset>()
        .map_err(|_| ParseError::new("utc offset", s))
}
