//! 経過時間や集計結果を表示用の文字列に変換する。
//!
//! タイマー表示と集計表示では表記が異なるため、それぞれ別の関数として提供する。

/// タイマー表示用に`HH:MM:SS`形式へ変換する。
///
/// 時間は24時間で折り返さない(99時間は`99:00:00`、100時間は`100:00:00`)。
pub fn format_elapsed(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// 集計表示用に`<H>h <M>m`形式へ変換する。
///
/// 分は切り捨て、秒は表示しない。
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    format!("{hours}h {minutes}m")
}

/// エントリー一覧用に`H:MM`形式へ変換する。
pub fn format_clock(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    format!("{hours}:{minutes:02}")
}

/// レポート用に小数2桁の時間単位へ変換する。
pub fn format_hours(seconds: u64) -> String {
    format!("{:.2}", seconds as f64 / 3600.0)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{format_clock, format_duration, format_elapsed, format_hours};

    #[rstest]
    #[case::zero(0, "00:00:00")]
    #[case::one_of_each(3661, "01:01:01")]
    #[case::just_under_a_day(86_399, "23:59:59")]
    #[case::no_wraparound(99 * 3600, "99:00:00")]
    #[case::three_digit_hours(100 * 3600 + 5, "100:00:05")]
    fn test_format_elapsed(#[case] seconds: u64, #[case] expected: &str) {
        assert_eq!(format_elapsed(seconds), expected);
    }

    #[rstest]
    #[case::zero(0, "0h 0m")]
    #[case::seconds_dropped(59, "0h 0m")]
    #[case::minutes_rounded_down(125 * 60 + 59, "2h 5m")]
    #[case::hour_and_half(5400, "1h 30m")]
    #[case::long(30 * 3600, "30h 0m")]
    fn test_format_duration(#[case] seconds: u64, #[case] expected: &str) {
        assert_eq!(format_duration(seconds), expected);
    }

    #[test]
    fn test_format_duration_125_minutes() {
        assert_eq!(format_duration(125 * 60), "2h 5m");
    }

    #[rstest]
    #[case(0, "0:00")]
    #[case(3600, "1:00")]
    #[case(2700, "0:45")]
    #[case(11 * 3600 + 5 * 60 + 30, "11:05")]
    fn test_format_clock(#[case] seconds: u64, #[case] expected: &str) {
        assert_eq!(format_clock(seconds), expected);
    }

    #[rstest]
    #[case(0, "0.00")]
    #[case(5400, "1.50")]
    #[case(1200, "0.33")]
    fn test_format_hours(#[case] seconds: u64, #[case] expected: &str) {
        assert_eq!(format_hours(seconds), expected);
    }
}
