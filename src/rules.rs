//! Pure value-producing rules: sequences, random character strings, and random ranges.
//!
//! Each producer here is either a pure function of an RNG, or a tiny piece of state (the
//! sequence counter) threaded through by the generator. Producers that need other columns'
//! cells (`copy`, `join`) or compiled regex automata are driven directly by
//! [`crate::gen::Generator`], since they don't fit this module's "one column, no neighbours"
//! shape.

use crate::{
    ast::{CharsetKind, Literal},
    error::Error,
    value::Value,
};
use chrono::{NaiveDate, NaiveDateTime};
use rand::{distributions::Uniform, prelude::Distribution, Rng};

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const ALNUM: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// A wrapping sequence counter, advancing by `step` each call and wrapping back to `start` once
/// it would pass `end`.
#[derive(Debug, Clone)]
pub struct SequenceState {
    current: i64,
    start: i64,
    end: i64,
    step: i64,
}

impl SequenceState {
    /// Creates a new counter starting at `start`.
    pub fn new(start: i64, end: i64, step: i64) -> Self {
        Self { current: start, start, end, step }
    }

    /// Returns the next value in the sequence, advancing the counter.
    pub fn advance(&mut self) -> i64 {
        let value = self.current;
        let span = self.end - self.start + 1;
        let advanced = self.current - self.start + self.step;
        self.current = self.start + advanced.rem_euclid(span);
        value
    }
}

/// Renders an integer as a decimal string, left-zero-padded to at least `digits` characters.
pub fn pad_digits(value: i64, digits: u32) -> String {
    let digits = digits as usize;
    if value < 0 {
        let magnitude = format!("{:0width$}", -value, width = digits.saturating_sub(1));
        format!("-{magnitude}")
    } else {
        format!("{value:0digits$}")
    }
}

/// Draws a random string of `length` characters from the given charset.
pub fn sample_charset(charset: &CharsetKind, length: u32, rng: &mut impl Rng) -> String {
    let alphabet: &[u8] = match charset {
        CharsetKind::Alphabet => ALPHABET,
        CharsetKind::Alnum => ALNUM,
        CharsetKind::Digits => DIGITS,
        CharsetKind::Literal(set) => set.as_bytes(),
    };
    if alphabet.is_empty() {
        return String::new();
    }
    let dist = Uniform::from(0..alphabet.len());
    (0..length).map(|_| alphabet[dist.sample(rng)] as char).collect()
}

/// Draws a uniformly distributed literal in `[lo, hi]`, inclusive. Integer if both operands are
/// integers, float otherwise.
pub fn sample_range(lo: &Literal, hi: &Literal, rng: &mut impl Rng) -> Result<Value, Error> {
    match (lo, hi) {
        (Literal::Int(lo), Literal::Int(hi)) => {
            if lo > hi {
                return Err(Error::Generation(format!("range {lo}..{hi} is inverted")));
            }
            Ok(Value::Int(rng.gen_range(*lo..=*hi)))
        }
        _ => {
            let lo = literal_as_f64(lo);
            let hi = literal_as_f64(hi);
            if lo > hi {
                return Err(Error::Generation(format!("range {lo}..{hi} is inverted")));
            }
            Ok(Value::Float(rng.gen_range(lo..=hi)))
        }
    }
}

fn literal_as_f64(literal: &Literal) -> f64 {
    match literal {
        Literal::Int(n) => *n as f64,
        Literal::Float(f) => *f,
        Literal::Str(_) => f64::NAN,
    }
}

/// Converts a parsed literal directly to a cell value.
pub fn literal_to_value(literal: &Literal) -> Value {
    match literal {
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(f) => Value::Float(*f),
        Literal::Str(s) => Value::Str(s.clone()),
    }
}

/// Draws a uniformly distributed calendar date in `[lo, hi]` (inclusive, `YYYY-MM-DD`), rendered
/// with `format`.
pub fn sample_date_range(lo: &str, hi: &str, format: &str, rng: &mut impl Rng) -> Result<String, Error> {
    let lo_date = NaiveDate::parse_from_str(lo, "%Y-%m-%d")
        .map_err(|_| Error::Generation(format!("'{lo}' is not a valid date")))?;
    let hi_date = NaiveDate::parse_from_str(hi, "%Y-%m-%d")
        .map_err(|_| Error::Generation(format!("'{hi}' is not a valid date")))?;
    if lo_date > hi_date {
        return Err(Error::Generation(format!("date_range {lo}..{hi} is inverted")));
    }
    let span_days = (hi_date - lo_date).num_days();
    let offset = rng.gen_range(0..=span_days);
    let date = lo_date + chrono::Duration::days(offset);
    Ok(date.format(format).to_string())
}

/// Draws a uniformly distributed date in `[lo, hi]` plus a uniformly distributed time of day,
/// rendered as timezone-naive ISO-8601 to the second.
pub fn sample_datetime(lo: &str, hi: &str, rng: &mut impl Rng) -> Result<String, Error> {
    let lo_date = NaiveDate::parse_from_str(lo, "%Y-%m-%d")
        .map_err(|_| Error::Generation(format!("'{lo}' is not a valid date")))?;
    let hi_date = NaiveDate::parse_from_str(hi, "%Y-%m-%d")
        .map_err(|_| Error::Generation(format!("'{hi}' is not a valid date")))?;
    if lo_date > hi_date {
        return Err(Error::Generation(format!("date_range {lo}..{hi} is inverted")));
    }
    let span_days = (hi_date - lo_date).num_days();
    let offset = rng.gen_range(0..=span_days);
    let date = lo_date + chrono::Duration::days(offset);
    let seconds_of_day = rng.gen_range(0..86_400);
    let time = chrono::NaiveTime::from_num_seconds_from_midnight_opt(seconds_of_day, 0).expect("seconds_of_day is in 0..86_400");
    let datetime = NaiveDateTime::new(date, time);
    Ok(datetime.format("%Y-%m-%dT%H:%M:%S").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn sequence_wraps_after_end() {
        let mut seq = SequenceState::new(1, 3, 1);
        assert_eq!(seq.advance(), 1);
        assert_eq!(seq.advance(), 2);
        assert_eq!(seq.advance(), 3);
        assert_eq!(seq.advance(), 1);
    }

    #[test]
    fn sequence_wraps_with_step() {
        let mut seq = SequenceState::new(0, 9, 3);
        let values: Vec<_> = (0..5).map(|_| seq.advance()).collect();
        assert_eq!(values, vec![0, 3, 6, 9, 2]);
    }

    #[test]
    fn pad_digits_left_pads() {
        assert_eq!(pad_digits(7, 3), "007");
        assert_eq!(pad_digits(1234, 2), "1234");
        assert_eq!(pad_digits(-5, 3), "-05");
    }

    #[test]
    fn sample_charset_respects_length() {
        let mut rng = rand_hc::Hc128Rng::seed_from_u64(1);
        let s = sample_charset(&CharsetKind::Digits, 6, &mut rng);
        assert_eq!(s.len(), 6);
        assert!(s.bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn sample_date_range_stays_in_bounds() {
        let mut rng = rand_hc::Hc128Rng::seed_from_u64(42);
        for _ in 0..20 {
            let date = sample_date_range("2020-01-01", "2020-01-05", "%Y-%m-%d", &mut rng).unwrap();
            assert!(date.as_str() >= "2020-01-01" && date.as_str() <= "2020-01-05");
        }
    }
}
