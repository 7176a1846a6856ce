//! Units of measurement for channel axes.
//!
//! A `CSV-UNIT` record names one unit per channel with a short symbol (`V`, `A`, `Hz`, ...).
//! Every later `CSV-DATA` value on that channel is parsed against the assigned unit, which
//! is where SI prefixes (`1.5m` = 0.0015) and percent scaling are resolved.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit attached to a channel axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    /// Time in femtoseconds (X axis of every channel)
    Femtoseconds,
    Seconds,
    #[default]
    Volts,
    Amps,
    Watts,
    Hertz,
    Ohms,
    Celsius,
    /// Stored as a fraction: `50%` parses to 0.5
    Percent,
    Decibels,
    Dbm,
    /// Dimensionless; also the fallback for unrecognised tags
    Counts,
}

/// SI prefixes accepted as the last character of a numeric token.
const SI_PREFIXES: &[(char, f64)] = &[
    ('f', 1e-15),
    ('p', 1e-12),
    ('n', 1e-9),
    ('u', 1e-6),
    ('µ', 1e-6),
    ('m', 1e-3),
    ('k', 1e3),
    ('M', 1e6),
    ('G', 1e9),
    ('T', 1e12),
];

impl Unit {
    /// Resolve a unit tag as sent in a `CSV-UNIT` record.
    ///
    /// Unknown tags fall back to [`Unit::Counts`] so the channel keeps plotting raw numbers.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "fs" => Unit::Femtoseconds,
            "s" => Unit::Seconds,
            "V" | "v" => Unit::Volts,
            "A" | "a" => Unit::Amps,
            "W" | "w" => Unit::Watts,
            "Hz" | "hz" => Unit::Hertz,
            "Ω" | "ohm" | "ohms" => Unit::Ohms,
            "°C" | "degC" | "C" => Unit::Celsius,
            "%" => Unit::Percent,
            "dB" | "db" => Unit::Decibels,
            "dBm" | "dbm" => Unit::Dbm,
            "counts" | "" => Unit::Counts,
            other => {
                tracing::debug!(tag = other, "unrecognised unit tag, treating as counts");
                Unit::Counts
            }
        }
    }

    /// Canonical symbol, as used when displaying or re-serialising the unit.
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Femtoseconds => "fs",
            Unit::Seconds => "s",
            Unit::Volts => "V",
            Unit::Amps => "A",
            Unit::Watts => "W",
            Unit::Hertz => "Hz",
            Unit::Ohms => "Ω",
            Unit::Celsius => "°C",
            Unit::Percent => "%",
            Unit::Decibels => "dB",
            Unit::Dbm => "dBm",
            Unit::Counts => "counts",
        }
    }

    /// Parse a textual value in this unit.
    ///
    /// Accepts an optional trailing unit symbol and one SI prefix, e.g. `"3.3"`, `"3.3V"`,
    /// `"12mV"`, `"4.7k"`. Returns `None` if the token is not a number.
    pub fn parse_value(&self, text: &str) -> Option<f64> {
        let mut token = text.trim();
        if token.is_empty() {
            return None;
        }

        let symbol = self.symbol();
        if let Some(stripped) = token.strip_suffix(symbol) {
            token = stripped.trim_end();
        } else if *self == Unit::Ohms {
            token = token.strip_suffix("ohm").unwrap_or(token).trim_end();
        }

        let mut scale = 1.0;
        if let Ok(value) = token.parse::<f64>() {
            return Some(self.normalise(value));
        }
        if let Some(last) = token.chars().last() {
            if let Some((_, factor)) = SI_PREFIXES.iter().find(|(c, _)| *c == last) {
                scale = *factor;
                token = &token[..token.len() - last.len_utf8()];
            }
        }

        token
            .trim_end()
            .parse::<f64>()
            .ok()
            .map(|value| self.normalise(value * scale))
    }

    fn normalise(&self, value: f64) -> f64 {
        match self {
            Unit::Percent => value / 100.0,
            _ => value,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_resolve() {
        assert_eq!(Unit::from_tag("V"), Unit::Volts);
        assert_eq!(Unit::from_tag("A"), Unit::Amps);
        assert_eq!(Unit::from_tag(" Hz "), Unit::Hertz);
        assert_eq!(Unit::from_tag("dBm"), Unit::Dbm);
        assert_eq!(Unit::from_tag("°C"), Unit::Celsius);
        assert_eq!(Unit::from_tag("furlongs"), Unit::Counts);
    }

    #[test]
    fn test_plain_numbers() {
        assert_eq!(Unit::Volts.parse_value("1.5"), Some(1.5));
        assert_eq!(Unit::Volts.parse_value(" -2.25 "), Some(-2.25));
        assert_eq!(Unit::Counts.parse_value("1e3"), Some(1000.0));
    }

    #[test]
    fn test_si_prefix_and_symbol() {
        let mv = Unit::Volts.parse_value("12mV").unwrap();
        assert!((mv - 0.012).abs() < 1e-12);
        let k = Unit::Ohms.parse_value("4.7k").unwrap();
        assert!((k - 4700.0).abs() < 1e-9);
        assert_eq!(Unit::Dbm.parse_value("-15dBm"), Some(-15.0));
    }

    #[test]
    fn test_percent_is_fraction() {
        assert_eq!(Unit::Percent.parse_value("50"), Some(0.5));
        assert_eq!(Unit::Percent.parse_value("25%"), Some(0.25));
    }

    #[test]
    fn test_garbage_rejected() {
        assert_eq!(Unit::Volts.parse_value(""), None);
        assert_eq!(Unit::Volts.parse_value("abc"), None);
        assert_eq!(Unit::Volts.parse_value("1.2.3"), None);
    }
}
