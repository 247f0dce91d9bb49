//! Frequency shorthand parsing.
//!
//! A frequency expression is one or more `<number><unit>` tokens in strictly
//! non-increasing unit order, e.g. `"6h2m"` or `"5.5d"`. Units are
//! `s`, `m`, `h`, `d` and `w`, with a day fixed at 24 hours and a week at
//! 7 days.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)([smhdw])").expect("frequency token pattern"));
static EXPRESSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?[smhdw])+$").expect("frequency expression pattern")
});

/// Errors from parsing or converting a frequency expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrequencyError {
    /// The input is not entirely made of `<number><unit>` tokens.
    #[error("invalid frequency expression '{0}'")]
    InvalidExpression(String),

    /// Components are not in non-increasing unit order, e.g. `"2m6h"`.
    #[error("frequency components out of order in '{0}'")]
    WrongOrder(String),

    /// The frequency has no cron schedule equivalent.
    #[error("frequency '{0}' has no cron equivalent")]
    Unconvertible(String),
}

/// Time unit of a frequency component, ordered by magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
}

impl Unit {
    /// Fixed magnitude of one unit.
    pub const fn duration(self) -> Duration {
        match self {
            Unit::Second => Duration::from_secs(1),
            Unit::Minute => Duration::from_secs(60),
            Unit::Hour => Duration::from_secs(60 * 60),
            Unit::Day => Duration::from_secs(24 * 60 * 60),
            Unit::Week => Duration::from_secs(7 * 24 * 60 * 60),
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "s" => Some(Unit::Second),
            "m" => Some(Unit::Minute),
            "h" => Some(Unit::Hour),
            "d" => Some(Unit::Day),
            "w" => Some(Unit::Week),
            _ => None,
        }
    }
}

/// One `<number><unit>` token of a frequency expression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyComponent {
    pub amount: f64,
    pub unit: Unit,
}

/// A parsed frequency expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frequency {
    components: Vec<FrequencyComponent>,
    expr: String,
}

impl Frequency {
    /// Parse a frequency expression. Matching is case-insensitive and the
    /// whole input must tokenize; any residue rejects the expression.
    pub fn parse(expr: &str) -> Result<Self, FrequencyError> {
        let lowered = expr.to_lowercase();
        if !EXPRESSION.is_match(&lowered) {
            return Err(FrequencyError::InvalidExpression(expr.to_string()));
        }

        let mut components = Vec::new();
        let mut highest = Duration::MAX;
        for captures in TOKEN.captures_iter(&lowered) {
            let amount: f64 = captures[1]
                .parse()
                .map_err(|_| FrequencyError::InvalidExpression(expr.to_string()))?;
            let unit = Unit::from_suffix(&captures[2])
                .ok_or_else(|| FrequencyError::InvalidExpression(expr.to_string()))?;

            if unit.duration() > highest {
                return Err(FrequencyError::WrongOrder(expr.to_string()));
            }
            highest = unit.duration();
            components.push(FrequencyComponent { amount, unit });
        }

        Ok(Self {
            components,
            expr: lowered,
        })
    }

    pub fn components(&self) -> &[FrequencyComponent] {
        &self.components
    }

    /// Total length of time the frequency represents. Saturates at
    /// `Duration::MAX` for amounts too large to represent.
    pub fn to_duration(&self) -> Duration {
        let seconds: f64 = self
            .components
            .iter()
            .map(|c| c.amount * c.unit.duration().as_secs_f64())
            .sum();
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
    }

    /// Cron schedule equivalent of the frequency.
    ///
    /// Defined only for single-component frequencies with a whole amount
    /// that fits the corresponding cron field: minutes 1–59, hours 1–23,
    /// days 1–31. Everything else (seconds, weeks, fractional amounts,
    /// compound expressions) fails rather than truncating.
    pub fn to_cron_expr(&self) -> Result<String, FrequencyError> {
        let unconvertible = || FrequencyError::Unconvertible(self.expr.clone());

        let [component] = self.components[..] else {
            return Err(unconvertible());
        };
        if component.amount.fract() != 0.0 || component.amount < 1.0 {
            return Err(unconvertible());
        }

        let n = component.amount as u64;
        match component.unit {
            Unit::Minute if n <= 59 => Ok(format!("*/{n} * * * *")),
            Unit::Hour if n <= 23 => Ok(format!("0 */{n} * * *")),
            Unit::Day if n <= 31 => Ok(format!("0 0 */{n} * *")),
            _ => Err(unconvertible()),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_component() {
        let freq = Frequency::parse("2m").unwrap();
        assert_eq!(
            freq.components(),
            &[FrequencyComponent {
                amount: 2.0,
                unit: Unit::Minute
            }]
        );
        assert_eq!(freq.to_duration(), Duration::from_secs(120));
    }

    #[test]
    fn parses_compound_expression() {
        let freq = Frequency::parse("6h2m").unwrap();
        assert_eq!(freq.to_duration(), Duration::from_secs(6 * 3600 + 120));
    }

    #[test]
    fn parses_fractional_amounts() {
        let freq = Frequency::parse("5.5d").unwrap();
        assert_eq!(freq.to_duration(), Duration::from_secs(132 * 3600));
    }

    #[test]
    fn oversized_amounts_saturate_instead_of_panicking() {
        let freq = Frequency::parse("1000000000000000w").unwrap();
        assert_eq!(freq.to_duration(), Duration::MAX);
    }

    #[test]
    fn parsing_is_case_insensitive() {
        let freq = Frequency::parse("10M").unwrap();
        assert_eq!(freq.components()[0].unit, Unit::Minute);
    }

    #[test]
    fn rejects_increasing_unit_order() {
        assert_eq!(
            Frequency::parse("2m6h"),
            Err(FrequencyError::WrongOrder("2m6h".to_string()))
        );
    }

    #[test]
    fn allows_repeated_units() {
        let freq = Frequency::parse("1h1h").unwrap();
        assert_eq!(freq.to_duration(), Duration::from_secs(7200));
    }

    #[test]
    fn rejects_residue_anywhere() {
        for bad in ["6hours", "fast", "", "1.5", "m5", "5m ", "x5m"] {
            assert_eq!(
                Frequency::parse(bad),
                Err(FrequencyError::InvalidExpression(bad.to_string())),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn converts_single_units_to_cron() {
        assert_eq!(
            Frequency::parse("5m").unwrap().to_cron_expr().unwrap(),
            "*/5 * * * *"
        );
        assert_eq!(
            Frequency::parse("2h").unwrap().to_cron_expr().unwrap(),
            "0 */2 * * *"
        );
        assert_eq!(
            Frequency::parse("3d").unwrap().to_cron_expr().unwrap(),
            "0 0 */3 * *"
        );
    }

    #[test]
    fn refuses_cron_conversion_instead_of_truncating() {
        for expr in ["30s", "1w", "1.5h", "6h2m", "90m", "0m"] {
            let freq = Frequency::parse(expr).unwrap();
            assert!(
                matches!(freq.to_cron_expr(), Err(FrequencyError::Unconvertible(_))),
                "expected '{expr}' to be unconvertible"
            );
        }
    }
}
