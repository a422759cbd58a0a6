use std::{fmt, str::FromStr};

use crate::error::ParseError;

const SEPARATOR: char = ':';

/// Transition probabilities of a two-state Markov channel.
///
/// `p_down` is the probability a good channel turns bad on a tick,
/// `p_up` the probability a bad channel recovers.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RateSpec {
    p_down: f64,
    p_up: f64,
}

impl RateSpec {
    /// Creates a rate pair.
    pub fn new(p_down: f64, p_up: f64) -> Self {
        Self { p_down, p_up }
    }

    /// Parses `"pDown:pUp"`, or a bare `"v"` as `(0, v)`.
    pub fn parse(token: &str) -> Result<Self, ParseError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ParseError::Empty);
        }

        match token.split_once(SEPARATOR) {
            None => Ok(Self::new(0.0, parse_part(token)?)),
            Some((_, up)) if up.contains(SEPARATOR) => Err(ParseError::TooManySeparators),
            Some((down, up)) => Ok(Self::new(parse_part(down)?, parse_part(up)?)),
        }
    }

    /// Good to bad transition probability.
    pub fn p_down(&self) -> f64 {
        self.p_down
    }

    /// Bad to good transition probability.
    pub fn p_up(&self) -> f64 {
        self.p_up
    }

    /// Whether both rates lie in `[0, 1]`.
    pub fn is_probability(&self) -> bool {
        (0.0..=1.0).contains(&self.p_down) && (0.0..=1.0).contains(&self.p_up)
    }
}

fn parse_part(part: &str) -> Result<f64, ParseError> {
    let part = part.trim();
    let value: f64 = part.parse().map_err(|_| ParseError::InvalidNumber {
        part: part.to_owned(),
    })?;

    if !value.is_finite() {
        return Err(ParseError::NonFinite {
            part: part.to_owned(),
        });
    }

    Ok(value)
}

impl FromStr for RateSpec {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.p_down, self.p_up)
    }
}
