//! Score values that can be absent
//!
//! Upstream scoring tools do not provide a score for every variant and not every
//! gene is scorable in every sample. Instead of comparing strings against a
//! placeholder token, every score is tagged as either present or absent.
//!
//! Absent scores always sort *lower* than any numeric score, and two absent
//! scores compare equal.
use std::cmp::Ordering;
use std::fmt::Display;

use crate::{ScoreError, ScoreResult, MISSING_MARKER, NOT_AVAILABLE, SCORE_DECIMALS};

/// The composite score of a single variant
///
/// # Examples
///
/// ```
/// use genescore::Score;
///
/// let mut scores = vec![Score::Value(0.8), Score::Missing, Score::Value(0.2)];
/// scores.sort();
/// assert_eq!(scores, vec![Score::Missing, Score::Value(0.2), Score::Value(0.8)]);
/// ```
#[derive(Debug, Clone, Copy)]
pub enum Score {
    /// None of the sub-scores of the variant were present
    Missing,
    /// The average of all present sub-scores
    Value(f64),
}

impl Score {
    /// Parses a score token, using `missing_marker` for absent values
    ///
    /// # Errors
    ///
    /// [`ScoreError::ParseFloatError`] if the token is neither the marker
    /// nor a finite number
    pub fn parse(token: &str, missing_marker: &str) -> ScoreResult<Self> {
        if token == missing_marker {
            Ok(Score::Missing)
        } else {
            parse_finite(token).map(Score::Value)
        }
    }

    /// Returns the numeric value, if present
    pub fn value(&self) -> Option<f64> {
        match self {
            Score::Missing => None,
            Score::Value(v) => Some(*v),
        }
    }

    /// Returns `true` if the score is absent
    pub fn is_missing(&self) -> bool {
        matches!(self, Score::Missing)
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Score::Missing, Score::Missing) => Ordering::Equal,
            (Score::Missing, Score::Value(_)) => Ordering::Less,
            (Score::Value(_), Score::Missing) => Ordering::Greater,
            (Score::Value(a), Score::Value(b)) => a.total_cmp(b),
        }
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Score::Missing => write!(f, "{MISSING_MARKER}"),
            Score::Value(v) => write!(f, "{v:.SCORE_DECIMALS$}"),
        }
    }
}

/// The score of one gene in one sample
///
/// `Missing` and `NotApplicable` are distinct: `Missing` means there was no
/// data, `NotApplicable` means the gene cannot be scored under the selected
/// inheritance model (e.g. a single variant in the recessive model).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeneScore {
    /// The aggregated score of the gene
    Value(f64),
    /// The gene has variants, but none of them carried a score
    Missing,
    /// The gene is not scorable under the inheritance model
    NotApplicable,
}

impl GeneScore {
    /// Parses a gene score token
    ///
    /// `N/A` is [`GeneScore::NotApplicable`], `.` is [`GeneScore::Missing`]
    ///
    /// # Errors
    ///
    /// [`ScoreError::ParseFloatError`] for any other non-numeric token
    pub fn parse(token: &str) -> ScoreResult<Self> {
        match token {
            NOT_AVAILABLE => Ok(GeneScore::NotApplicable),
            MISSING_MARKER => Ok(GeneScore::Missing),
            value => parse_finite(value).map(GeneScore::Value),
        }
    }

    /// Returns the numeric value, if the gene was scored
    pub fn value(&self) -> Option<f64> {
        match self {
            GeneScore::Value(v) => Some(*v),
            _ => None,
        }
    }
}

impl Display for GeneScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeneScore::Value(v) => write!(f, "{v:.SCORE_DECIMALS$}"),
            GeneScore::Missing => write!(f, "{MISSING_MARKER}"),
            GeneScore::NotApplicable => write!(f, "{NOT_AVAILABLE}"),
        }
    }
}

/// Parses a number and rejects `NaN` and infinite values
pub(crate) fn parse_finite(token: &str) -> ScoreResult<f64> {
    let value = token.parse::<f64>()?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ScoreError::ParseFloatError)
    }
}

/// Formats an optional matrix value, `N/A` if absent
pub(crate) fn format_cell(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.SCORE_DECIMALS$}"),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Rounds a score to the value of its text form with `SCORE_DECIMALS` digits
///
/// Parsing the written score yields the same value. Negative zero becomes `0.0`.
pub(crate) fn quantize(value: f64) -> f64 {
    let rounded = format!("{value:.SCORE_DECIMALS$}")
        .parse::<f64>()
        .unwrap_or(value);
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
