//! Input sources: random generation and text parsing.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::InputError;

/// Default number of generated values.
pub const DEFAULT_LEN: usize = 10_000;
/// Default exclusive upper bound for generated values.
pub const DEFAULT_MAX_VALUE: u32 = 10_000;

/// `len` uniform random values in `[0, max_value)`. The same seed always
/// gives the same array; `None` draws from the thread-local generator.
pub fn generate_array(len: usize, max_value: u32, seed: Option<u64>) -> Vec<u32> {
    let max_value = max_value.max(1);
    match seed {
        Some(seed) => {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..len).map(|_| rng.gen_range(0..max_value)).collect()
        }
        None => {
            let mut rng = rand::thread_rng();
            (0..len).map(|_| rng.gen_range(0..max_value)).collect()
        }
    }
}

/// Parse numbers separated by whitespace or commas. Lines starting with `#`
/// are skipped.
pub fn parse_values<T: FromStr>(text: &str) -> Result<Vec<T>, InputError> {
    let mut values = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.starts_with('#') {
            continue;
        }
        for token in line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
        {
            let value = token.parse().map_err(|_| InputError::InvalidNumber {
                line: line_no + 1,
                token: token.to_string(),
            })?;
            values.push(value);
        }
    }
    if values.is_empty() {
        return Err(InputError::Empty);
    }
    Ok(values)
}

/// Element type to read a text input as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueType {
    /// First of `i64`, `u64`, `f64` that holds every token.
    #[default]
    Auto,
    I64,
    U64,
    F64,
}

impl ValueType {
    pub const ALL: [ValueType; 4] = [ValueType::Auto, ValueType::I64, ValueType::U64, ValueType::F64];

    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Auto => "auto",
            ValueType::I64 => "i64",
            ValueType::U64 => "u64",
            ValueType::F64 => "f64",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ValueType::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown value type {s:?} (expected auto, i64, u64 or f64)"))
    }
}

/// Numbers read from text, kept in the type they were parsed as.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedValues {
    I64(Vec<i64>),
    U64(Vec<u64>),
    F64(Vec<f64>),
}

impl ParsedValues {
    pub fn len(&self) -> usize {
        match self {
            ParsedValues::I64(v) => v.len(),
            ParsedValues::U64(v) => v.len(),
            ParsedValues::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            ParsedValues::I64(_) => ValueType::I64,
            ParsedValues::U64(_) => ValueType::U64,
            ParsedValues::F64(_) => ValueType::F64,
        }
    }
}

/// Parse `text` as `value_type`. `Auto` prefers integers so that 64-bit
/// values keep every digit; floats are the fallback.
pub fn parse_typed(text: &str, value_type: ValueType) -> Result<ParsedValues, InputError> {
    match value_type {
        ValueType::I64 => parse_values(text).map(ParsedValues::I64),
        ValueType::U64 => parse_values(text).map(ParsedValues::U64),
        ValueType::F64 => parse_values(text).map(ParsedValues::F64),
        ValueType::Auto => parse_values(text)
            .map(ParsedValues::I64)
            .or_else(|_| parse_values(text).map(ParsedValues::U64))
            .or_else(|_| parse_values(text).map(ParsedValues::F64)),
    }
}
