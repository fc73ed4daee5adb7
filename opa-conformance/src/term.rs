/*
 * Copyright Cedar Contributors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *      https://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Structural terms: the canonical form of JSON documents used for every
//! comparison the harness makes.

use miette::Diagnostic;
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while reading a number literal.
#[derive(Debug, Clone, PartialEq, Eq, Diagnostic, Error)]
pub enum NumberError {
    /// The text is not a JSON number
    #[error("`{0}` is not a well-formed number")]
    Malformed(SmolStr),
    /// The exponent does not fit the canonical representation
    #[error("exponent of `{0}` is out of range")]
    #[diagnostic(help("exponents must fit in a signed 64-bit integer"))]
    ExponentOutOfRange(SmolStr),
}

/// Errors produced while parsing a document into a [`Term`].
#[derive(Debug, Diagnostic, Error)]
pub enum TermError {
    /// The text is not valid JSON
    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),
    /// A number literal could not be canonicalized
    #[error(transparent)]
    #[diagnostic(transparent)]
    Number(#[from] NumberError),
}

/// A number in canonical decimal form.
///
/// `Number { negative, digits, exponent }` represents
/// `(-1)^negative * digits * 10^exponent`, where `digits` holds the
/// significant decimal digits without leading or trailing zeros. Zero has
/// empty `digits`, `negative == false` and `exponent == 0`.
///
/// INVARIANT (Canonical): every numeric value has exactly one representation,
/// so the derived `PartialEq`/`Hash` are numeric equality and `1`, `1.0` and
/// `10e-1` are all the same `Number`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Number {
    negative: bool,
    digits: SmolStr,
    exponent: i64,
}

impl Number {
    /// The number zero
    pub fn zero() -> Self {
        Self {
            negative: false,
            digits: SmolStr::default(),
            exponent: 0,
        }
    }

    /// Is this number zero
    pub fn is_zero(&self) -> bool {
        self.digits.is_empty()
    }

    fn signum(&self) -> i8 {
        if self.is_zero() {
            0
        } else if self.negative {
            -1
        } else {
            1
        }
    }

    /// Position of the decimal point relative to the first significant digit:
    /// the value's magnitude is `0.digits * 10^point`.
    fn point(&self) -> i128 {
        // `SmolStr` lengths always fit in an i128
        self.digits.len() as i128 + i128::from(self.exponent)
    }

    fn cmp_magnitude(&self, other: &Self) -> Ordering {
        // both nonzero: the leading digit is significant, so the point
        // position decides first and the digit strings break ties
        self.point()
            .cmp(&other.point())
            .then_with(|| self.digits.as_str().cmp(other.digits.as_str()))
    }
}

impl Default for Number {
    fn default() -> Self {
        Self::zero()
    }
}

impl FromStr for Number {
    type Err = NumberError;

    /// Parse a JSON number literal, e.g. `-12`, `0.5`, `1E+3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || NumberError::Malformed(s.into());
        let out_of_range = || NumberError::ExponentOutOfRange(s.into());
        let is_digits = |t: &str| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit());

        let (negative, unsigned) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
            Some((mantissa, exponent)) => {
                let unsigned_exp = exponent
                    .strip_prefix(['+', '-'])
                    .unwrap_or(exponent);
                if !is_digits(unsigned_exp) {
                    return Err(malformed());
                }
                let exponent = exponent
                    .strip_prefix('+')
                    .unwrap_or(exponent)
                    .parse::<i64>()
                    .map_err(|_| out_of_range())?;
                (mantissa, exponent)
            }
            None => (unsigned, 0),
        };
        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((int_part, frac_part)) if is_digits(frac_part) => (int_part, frac_part),
            Some(_) => return Err(malformed()),
            None => (mantissa, ""),
        };
        if !is_digits(int_part) {
            return Err(malformed());
        }

        let all_digits = format!("{int_part}{frac_part}");
        let without_leading = all_digits.trim_start_matches('0');
        let significant = without_leading.trim_end_matches('0');
        if significant.is_empty() {
            return Ok(Self::zero());
        }
        let frac_len = i64::try_from(frac_part.len()).map_err(|_| out_of_range())?;
        let trailing_zeros = i64::try_from(without_leading.len() - significant.len())
            .map_err(|_| out_of_range())?;
        let exponent = exponent
            .checked_sub(frac_len)
            .and_then(|e| e.checked_add(trailing_zeros))
            .ok_or_else(out_of_range)?;
        Ok(Self {
            negative,
            digits: significant.into(),
            exponent,
        })
    }
}

impl From<i64> for Number {
    fn from(i: i64) -> Self {
        let abs = i.unsigned_abs().to_string();
        let significant = abs.trim_end_matches('0');
        if significant.is_empty() {
            return Self::zero();
        }
        Self {
            negative: i < 0,
            // at most 19 trailing zeros
            exponent: (abs.len() - significant.len()) as i64,
            digits: significant.into(),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.signum().cmp(&other.signum()) {
            Ordering::Equal => match self.signum() {
                0 => Ordering::Equal,
                s if s > 0 => self.cmp_magnitude(other),
                _ => other.cmp_magnitude(self),
            },
            ordering => ordering,
        }
    }
}

/// Largest point position printed without an exponent, as in ECMAScript
const MAX_PLAIN_POINT: i128 = 21;
/// Smallest point position printed without an exponent
const MIN_PLAIN_POINT: i128 = -6;

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }
        if self.negative {
            write!(f, "-")?;
        }
        let digits = self.digits.as_str();
        let point = self.point();
        let len = digits.len() as i128;
        if self.exponent >= 0 && point <= MAX_PLAIN_POINT {
            write!(f, "{digits}{}", "0".repeat(self.exponent.unsigned_abs() as usize))
        } else if self.exponent < 0 && point > 0 {
            // 0 < point < len
            let (int_part, frac_part) = digits.split_at(point as usize);
            write!(f, "{int_part}.{frac_part}")
        } else if point <= 0 && point > MIN_PLAIN_POINT {
            write!(f, "0.{}{digits}", "0".repeat(point.unsigned_abs() as usize))
        } else {
            let mut chars = digits.chars();
            let first = chars.next().unwrap_or('0');
            let rest = chars.as_str();
            if len > 1 {
                write!(f, "{first}.{rest}e{}", point - 1)
            } else {
                write!(f, "{first}e{}", point - 1)
            }
        }
    }
}

/// Canonical structural representation of a JSON document.
///
/// Equality is structural and independent of object key insertion order.
/// The derived total order is consistent with equality:
/// `null < boolean < number < string < array < object`, arrays compare
/// element-wise then by length, objects compare their key-sorted entries
/// (key first, then value) then by size.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Term {
    /// `null`
    Null,
    /// `true` or `false`
    Bool(bool),
    /// Any number, in canonical form
    Number(Number),
    /// String
    String(SmolStr),
    /// Array, order significant
    Array(Vec<Term>),
    /// Object, keyed on strings
    Object(BTreeMap<SmolStr, Term>),
}

impl Term {
    /// Parse a JSON document. Numbers keep their literal precision.
    pub fn from_json_str(s: &str) -> Result<Self, TermError> {
        let value: serde_json::Value = serde_json::from_str(s)?;
        Ok(Self::try_from(value)?)
    }

    /// Name of the term's kind, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Get the elements of an array term
    pub fn as_array(&self) -> Option<&[Term]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Get the entries of an object term
    pub fn as_object(&self) -> Option<&BTreeMap<SmolStr, Term>> {
        match self {
            Self::Object(entries) => Some(entries),
            _ => None,
        }
    }

    /// Replace an array by its canonical sorted form. Terms that are not
    /// arrays are handed back unchanged as the error.
    pub fn into_sorted_array(self) -> Result<Self, Self> {
        match self {
            Self::Array(mut items) => {
                items.sort();
                Ok(Self::Array(items))
            }
            other => Err(other),
        }
    }
}

impl TryFrom<serde_json::Value> for Term {
    type Error = NumberError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        Ok(match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            // with `arbitrary_precision`, this is the literal as written
            serde_json::Value::Number(n) => Self::Number(n.to_string().parse()?),
            serde_json::Value::String(s) => Self::String(s.into()),
            serde_json::Value::Array(items) => Self::Array(
                items
                    .into_iter()
                    .map(Self::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            serde_json::Value::Object(entries) => Self::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| Self::try_from(v).map(|v| (SmolStr::from(k), v)))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}

impl Serialize for Term {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => serde_json::Number::from_str(&n.to_string())
                .map_err(S::Error::custom)?
                .serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => serializer.collect_seq(items),
            Self::Object(entries) => serializer.collect_map(entries),
        }
    }
}

impl<'de> Deserialize<'de> for Term {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::try_from(value).map_err(D::Error::custom)
    }
}

impl FromStr for Term {
    type Err = TermError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json_str(s)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write_json_string(f, s),
            Self::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Object(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_json_string(f, k)?;
                    write!(f, ": {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

fn write_json_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let quoted = serde_json::to_string(s).map_err(|_| fmt::Error)?;
    f.write_str(&quoted)
}

impl From<bool> for Term {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Term {
    fn from(i: i64) -> Self {
        Self::Number(i.into())
    }
}

impl From<Number> for Term {
    fn from(n: Number) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Term {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}

impl From<String> for Term {
    fn from(s: String) -> Self {
        Self::String(s.into())
    }
}

impl From<Vec<Term>> for Term {
    fn from(items: Vec<Term>) -> Self {
        Self::Array(items)
    }
}

impl<K: Into<SmolStr>> FromIterator<(K, Term)> for Term {
    fn from_iter<T: IntoIterator<Item = (K, Term)>>(iter: T) -> Self {
        Self::Object(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
