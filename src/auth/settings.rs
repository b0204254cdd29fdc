// Refresh policy settings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SECONDS_PER_DAY: u64 = 24 * 3600;

/// Default refresh window: seven days
pub const DEFAULT_REFRESH_WINDOW_DAYS: u64 = 7;

/// Maximum age of `orig_iat` before refresh is rejected.
///
/// Accepts either plain seconds or a days/seconds span; both normalise to
/// total whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefreshWindow {
    Seconds(u64),
    Span {
        #[serde(default)]
        days: u64,
        #[serde(default)]
        seconds: u64,
    },
}

impl RefreshWindow {
    pub fn total_seconds(&self) -> u64 {
        match *self {
            RefreshWindow::Seconds(seconds) => seconds,
            RefreshWindow::Span { days, seconds } => days
                .saturating_mul(SECONDS_PER_DAY)
                .saturating_add(seconds),
        }
    }
}

impl Default for RefreshWindow {
    fn default() -> Self {
        RefreshWindow::Span {
            days: DEFAULT_REFRESH_WINDOW_DAYS,
            seconds: 0,
        }
    }
}

impl fmt::Display for RefreshWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RefreshWindow::Seconds(seconds) => write!(f, "{}", seconds),
            RefreshWindow::Span { days, seconds } => write!(f, "{}d{}s", days, seconds),
        }
    }
}

impl FromStr for RefreshWindow {
    type Err = String;

    /// Parse `3600`, `90s`, `7d` or `1d3600s` (whitespace between parts allowed)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("refresh window cannot be empty".to_string());
        }

        if let Ok(seconds) = trimmed.parse::<u64>() {
            return Ok(RefreshWindow::Seconds(seconds));
        }

        let mut days: Option<u64> = None;
        let mut seconds: Option<u64> = None;
        let mut digits = String::new();

        for c in trimmed.chars() {
            match c {
                '0'..='9' => digits.push(c),
                'd' | 's' => {
                    if digits.is_empty() {
                        return Err(format!("invalid refresh window: {}", s));
                    }
                    let value: u64 = digits
                        .parse()
                        .map_err(|_| format!("invalid refresh window: {}", s))?;
                    digits.clear();

                    // Days must come before seconds, each at most once
                    if seconds.is_some() || (c == 'd' && days.is_some()) {
                        return Err(format!("invalid refresh window: {}", s));
                    }
                    if c == 'd' {
                        days = Some(value);
                    } else {
                        seconds = Some(value);
                    }
                }
                c if c.is_whitespace() && digits.is_empty() => {}
                _ => return Err(format!("invalid refresh window: {}", s)),
            }
        }

        if !digits.is_empty() {
            return Err(format!("invalid refresh window: {}", s));
        }

        Ok(RefreshWindow::Span {
            days: days.unwrap_or(0),
            seconds: seconds.unwrap_or(0),
        })
    }
}

/// Refresh policy shared by issuance and refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Stamp `orig_iat` on issuance and carry it forward on refresh
    #[serde(default)]
    pub allow_refresh: bool,

    #[serde(default)]
    pub refresh_window: RefreshWindow,
}

impl AuthSettings {
    pub fn new(allow_refresh: bool, refresh_window: RefreshWindow) -> Self {
        Self {
            allow_refresh,
            refresh_window,
        }
    }

    /// Refresh window as signed seconds, clamped for timestamp arithmetic
    pub fn refresh_window_seconds(&self) -> i64 {
        i64::try_from(self.refresh_window.total_seconds()).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_total_seconds() {
        assert_eq!(RefreshWindow::Seconds(3600).total_seconds(), 3600);
        assert_eq!(
            RefreshWindow::Span {
                days: 1,
                seconds: 30
            }
            .total_seconds(),
            86_430
        );
        assert_eq!(RefreshWindow::default().total_seconds(), 7 * 86_400);
    }

    #[test]
    fn test_parse_plain_seconds() {
        assert_eq!("3600".parse(), Ok(RefreshWindow::Seconds(3600)));
        assert_eq!(" 42 ".parse(), Ok(RefreshWindow::Seconds(42)));
    }

    #[test]
    fn test_parse_structured() {
        assert_eq!(
            "7d".parse(),
            Ok(RefreshWindow::Span {
                days: 7,
                seconds: 0
            })
        );
        assert_eq!(
            "90s".parse(),
            Ok(RefreshWindow::Span {
                days: 0,
                seconds: 90
            })
        );
        assert_eq!(
            "1d 3600s".parse(),
            Ok(RefreshWindow::Span {
                days: 1,
                seconds: 3600
            })
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<RefreshWindow>().is_err());
        assert!("d".parse::<RefreshWindow>().is_err());
        assert!("7h".parse::<RefreshWindow>().is_err());
        assert!("1d2d".parse::<RefreshWindow>().is_err());
        assert!("30s1d".parse::<RefreshWindow>().is_err());
        assert!("1d30".parse::<RefreshWindow>().is_err());
        assert!("-5".parse::<RefreshWindow>().is_err());
    }

    #[test]
    fn test_deserialize_integer_or_span() {
        let window: RefreshWindow = serde_json::from_str("3600").unwrap();
        assert_eq!(window.total_seconds(), 3600);

        let window: RefreshWindow = serde_json::from_str(r#"{"days": 2, "seconds": 5}"#).unwrap();
        assert_eq!(window.total_seconds(), 2 * 86_400 + 5);

        let window: RefreshWindow = serde_json::from_str(r#"{"days": 1}"#).unwrap();
        assert_eq!(window.total_seconds(), 86_400);
    }

    #[test]
    fn test_settings_defaults() {
        let settings = AuthSettings::default();
        assert!(!settings.allow_refresh);
        assert_eq!(settings.refresh_window_seconds(), 7 * 86_400);
    }

    #[test]
    fn test_display_parses_back() {
        let window = RefreshWindow::Span {
            days: 3,
            seconds: 12,
        };
        assert_eq!(window.to_string().parse(), Ok(window));
    }

    proptest! {
        #[test]
        fn prop_span_normalises_to_seconds(days in 0u64..10_000, seconds in 0u64..86_400) {
            let text = format!("{}d{}s", days, seconds);
            let window: RefreshWindow = text.parse().unwrap();
            prop_assert_eq!(window.total_seconds(), days * 86_400 + seconds);
        }
    }
}
