//! This module contains a common [`Duration`] struct which is able to parse
//! the duration format used by Velero and the Kubernetes API machinery, like
//! `10m`, `1h30m`, `1.5s` or `720h0m0s`.
//!
//! It renders durations the same way, so a value read from a resource is
//! written back unchanged, and it serializes as that string in YAML and JSON
//! documents.
//!
//! [`Duration`] implements [`Deref`], which enables us to use all associated
//! functions of [`std::time::Duration`] without re-implementing the public
//! functions on our own type.

use std::{
    borrow::Cow,
    cmp::Ordering,
    fmt::Display,
    num::ParseIntError,
    ops::{Add, AddAssign, Deref},
    str::FromStr,
};

use schemars::{JsonSchema, Schema, SchemaGenerator, json_schema};
use snafu::{OptionExt, ResultExt, Snafu};

/// Maximum number of fractional digits taken into account. Anything finer than
/// a millisecond is dropped anyway.
const MAX_FRACTION_DIGITS: usize = 9;

#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(module)]
pub enum DurationParseError {
    #[snafu(display("invalid input, either empty or contains non-ascii characters"))]
    InvalidInput,

    #[snafu(display("unexpected character {chr:?}"))]
    UnexpectedCharacter { chr: char },

    #[snafu(display("fragment with value {value:?} has no unit"))]
    NoUnit { value: String },

    #[snafu(display("invalid fragment order, {current} must be before {previous}"))]
    InvalidUnitOrdering {
        previous: DurationUnit,
        current: DurationUnit,
    },

    #[snafu(display("fragment unit {unit} was specified multiple times"))]
    DuplicateUnit { unit: DurationUnit },

    #[snafu(display("failed to parse fragment unit {unit:?}"))]
    ParseUnitError { unit: String },

    #[snafu(display("failed to parse fragment value {value:?} as number"))]
    ParseIntError { source: ParseIntError, value: String },

    #[snafu(display("duration {input:?} is too large"))]
    Overflow { input: String },
}

/// A duration with millisecond precision, written as `<value><unit>` fragments.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration(std::time::Duration);

impl FromStr for Duration {
    type Err = DurationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use duration_parse_error::*;
        let input = s.trim();

        // An empty or non-ascii input is invalid
        if input.is_empty() || !input.is_ascii() {
            return Err(DurationParseError::InvalidInput);
        }

        // A bare zero is the only value allowed without a unit
        if input == "0" {
            return Ok(Self::default());
        }

        let mut chars = input.char_indices().peekable();
        let mut millis: u128 = 0;
        let mut last_unit = None;

        let mut take_group = |f: fn(char) -> bool| {
            let &(from, _) = chars.peek()?;
            let mut to = None;

            while let Some((i, _)) = chars.next_if(|(_, c)| f(*c)) {
                to = Some(i);
            }

            to.map(|to| &input[from..=to])
        };

        while let Some(value) = take_group(|c| c.is_ascii_digit() || c == '.') {
            let Some(unit) = take_group(char::is_alphabetic) else {
                if let Some(&(_, chr)) = chars.peek() {
                    return UnexpectedCharacterSnafu { chr }.fail();
                }
                return NoUnitSnafu { value }.fail();
            };

            let unit = unit.parse::<DurationUnit>().ok().context(ParseUnitSnafu {
                unit: unit.to_string(),
            })?;

            // Check that the unit is smaller than the previous one, and that
            // it wasn't specified multiple times
            if let Some(last_unit) = last_unit {
                match unit.cmp(&last_unit) {
                    Ordering::Less => {
                        return InvalidUnitOrderingSnafu {
                            previous: last_unit,
                            current: unit,
                        }
                        .fail();
                    }
                    Ordering::Equal => return DuplicateUnitSnafu { unit }.fail(),
                    Ordering::Greater => (),
                }
            }

            let fragment = fragment_millis(value, unit)?;
            millis = millis.checked_add(fragment).context(OverflowSnafu { input })?;
            last_unit = Some(unit);
        }

        // Buffer must not contain any remaining data
        if let Some(&(_, chr)) = chars.peek() {
            return UnexpectedCharacterSnafu { chr }.fail();
        }

        let millis = u64::try_from(millis).ok().context(OverflowSnafu { input })?;
        Ok(Self(std::time::Duration::from_millis(millis)))
    }
}

/// Converts a single `<value>` fragment, which may carry a decimal fraction,
/// into whole milliseconds of the given unit.
fn fragment_millis(value: &str, unit: DurationUnit) -> Result<u128, DurationParseError> {
    use duration_parse_error::*;

    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    let whole_value = if whole.is_empty() && !fraction.is_empty() {
        0
    } else {
        whole
            .parse::<u128>()
            .context(ParseIntSnafu { value })?
    };

    let mut millis = whole_value
        .checked_mul(unit.millis())
        .context(OverflowSnafu { input: value })?;

    if !fraction.is_empty() {
        let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
        let numerator = fraction.parse::<u128>().context(ParseIntSnafu { value })?;
        let denominator = 10u128.pow(fraction.len() as u32);
        millis += numerator * unit.millis() / denominator;
    }

    Ok(millis)
}

impl Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use DurationUnit::*;

        let millis = self.0.as_millis();

        if millis == 0 {
            return write!(f, "0{}", Seconds);
        }

        if millis < Seconds.millis() {
            return write!(f, "{millis}{}", Milliseconds);
        }

        let hours = millis / Hours.millis();
        let minutes = millis % Hours.millis() / Minutes.millis();
        let seconds = millis % Minutes.millis() / Seconds.millis();
        let fraction = millis % Seconds.millis();

        if hours > 0 {
            write!(f, "{hours}{}", Hours)?;
        }

        if hours > 0 || minutes > 0 {
            write!(f, "{minutes}{}", Minutes)?;
        }

        write!(f, "{seconds}")?;

        if fraction > 0 {
            let digits = format!("{fraction:03}");
            write!(f, ".{}", digits.trim_end_matches('0'))?;
        }

        write!(f, "{}", Seconds)
    }
}

impl Deref for Duration {
    type Target = std::time::Duration;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<std::time::Duration> for Duration {
    fn from(value: std::time::Duration) -> Self {
        Self(value)
    }
}

impl From<Duration> for std::time::Duration {
    fn from(value: Duration) -> Self {
        value.0
    }
}

impl Add for Duration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, rhs: Self) {
        self.0.add_assign(rhs.0);
    }
}

impl JsonSchema for Duration {
    fn schema_name() -> Cow<'static, str> {
        "Duration".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "type": "string",
        })
    }
}

impl Duration {
    /// Creates a new [`Duration`] from the specified number of whole seconds.
    pub const fn from_secs(secs: u64) -> Self {
        Self(std::time::Duration::from_secs(secs))
    }

    /// Creates a new [`Duration`] from the specified number of whole milliseconds.
    pub const fn from_millis(millis: u64) -> Self {
        Self(std::time::Duration::from_millis(millis))
    }

    /// Creates a new [`Duration`] from the specified number of whole hours.
    pub const fn from_hours(hours: u64) -> Self {
        Self::from_secs(hours * 60 * 60)
    }
}

/// Defines supported [`DurationUnit`]s. Each fragment consists of a numeric
/// value followed by a [`DurationUnit`]. The order of variants **MATTERS**,
/// fragments must appear from the largest to the smallest unit.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    strum::EnumString,
    strum::Display,
    strum::AsRefStr,
    strum::EnumIter,
)]
pub enum DurationUnit {
    #[strum(serialize = "h")]
    Hours,

    #[strum(serialize = "m")]
    Minutes,

    #[strum(serialize = "s")]
    Seconds,

    #[strum(serialize = "ms")]
    Milliseconds,
}

impl DurationUnit {
    /// Returns the number of whole milliseconds in each supported
    /// [`DurationUnit`].
    fn millis(self) -> u128 {
        use DurationUnit::*;

        match self {
            Hours => 60 * Minutes.millis(),
            Minutes => 60 * Seconds.millis(),
            Seconds => 1000,
            Milliseconds => 1,
        }
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;
    use serde::{Deserialize, Serialize};

    use super::*;

    #[rstest]
    #[case("720h0m0s", 2_592_000_000)]
    #[case("1h30m", 5_400_000)]
    #[case("70m", 4_200_000)]
    #[case("10m", 600_000)]
    #[case("1.5s", 1_500)]
    #[case(".5h", 1_800_000)]
    #[case("1s500ms", 1_500)]
    #[case("250ms", 250)]
    #[case("0", 0)]
    #[case("0s", 0)]
    fn parse_as_millis(#[case] input: &str, #[case] output: u128) {
        let dur: Duration = input.parse().unwrap();
        assert_eq!(dur.as_millis(), output);
    }

    #[rstest]
    #[case("1d", DurationParseError::ParseUnitError { unit: "d".into() })]
    #[case("2h2", DurationParseError::NoUnit { value: "2".into() })]
    #[case("1ä", DurationParseError::InvalidInput)]
    #[case(" ", DurationParseError::InvalidInput)]
    #[case("1h-", DurationParseError::UnexpectedCharacter { chr: '-' })]
    fn parse_invalid(#[case] input: &str, #[case] expected_err: DurationParseError) {
        let err = Duration::from_str(input).unwrap_err();
        assert_eq!(err, expected_err);
    }

    #[rstest]
    #[case("15m2h", DurationParseError::InvalidUnitOrdering { previous: DurationUnit::Minutes, current: DurationUnit::Hours })]
    #[case("15h2h", DurationParseError::DuplicateUnit { unit: DurationUnit::Hours })]
    fn invalid_order_or_duplicate_unit(
        #[case] input: &str,
        #[case] expected_err: DurationParseError,
    ) {
        let err = Duration::from_str(input).unwrap_err();
        assert_eq!(err, expected_err);
    }

    #[rstest]
    #[case("720h", "720h0m0s")]
    #[case("70m", "1h10m0s")]
    #[case("10m", "10m0s")]
    #[case("1h30m", "1h30m0s")]
    #[case("90s", "1m30s")]
    #[case("1.5s", "1.5s")]
    #[case("1s20ms", "1.02s")]
    #[case("500ms", "500ms")]
    #[case("0", "0s")]
    fn to_string(#[case] input: &str, #[case] expected: &str) {
        let dur: Duration = input.parse().unwrap();
        assert_eq!(dur.to_string(), expected);
    }

    #[test]
    fn deserialize() {
        #[derive(Deserialize)]
        struct S {
            ttl: Duration,
        }

        let s: S = serde_yaml::from_str("ttl: 720h0m0s").unwrap();
        assert_eq!(s.ttl, Duration::from_hours(720));
    }

    #[test]
    fn serialize() {
        #[derive(Serialize)]
        struct S {
            ttl: Duration,
        }

        let s = S {
            ttl: "24h".parse().unwrap(),
        };
        assert_eq!(serde_json::to_string(&s).unwrap(), r#"{"ttl":"24h0m0s"}"#);
    }

    #[test]
    fn add_ops() {
        let mut dur1 = Duration::from_str("20s").unwrap();
        let dur2 = Duration::from_secs(10);

        let dur = dur1 + dur2;
        assert_eq!(dur.as_secs(), 30);

        dur1 += dur2;
        assert_eq!(dur1.as_secs(), 30);
    }
}
