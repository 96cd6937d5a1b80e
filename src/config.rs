//! Configuration of input layouts, inheritance models and frequencies
use std::fmt::Display;
use std::str::FromStr;

use crate::{
    ScoreError, ScoreResult, DEFAULT_AVERAGE_COLUMN, DEFAULT_GENE_COLUMN, DEFAULT_SCORE_COLUMNS,
    MISSING_MARKER,
};

/// Column layout of scored variant files
///
/// The positions of the algorithm sub-scores are a property of the upstream
/// scoring tool. The default layout has the gene name in column `4` and the
/// four rank scores in columns `6`, `9`, `13` and `15` (0-based).
///
/// # Examples
///
/// ```
/// use genescore::ColumnLayout;
///
/// let layout = ColumnLayout::default()
///     .with_score_columns([5, 8, 12, 14])
///     .with_missing_marker("NA");
///
/// assert_eq!(layout.gene_column(), 4);
/// assert_eq!(layout.score_columns(), &[5, 8, 12, 14]);
/// assert_eq!(layout.min_fields(), 15);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    gene: usize,
    scores: [usize; 4],
    average: usize,
    missing_marker: String,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            gene: DEFAULT_GENE_COLUMN,
            scores: DEFAULT_SCORE_COLUMNS,
            average: DEFAULT_AVERAGE_COLUMN,
            missing_marker: MISSING_MARKER.to_string(),
        }
    }
}

impl ColumnLayout {
    /// Sets the column of the gene name
    #[must_use]
    pub fn with_gene_column(mut self, column: usize) -> Self {
        self.gene = column;
        self
    }

    /// Sets the columns of the four algorithm sub-scores
    #[must_use]
    pub fn with_score_columns(mut self, columns: [usize; 4]) -> Self {
        self.scores = columns;
        self
    }

    /// Sets the column at which the composite score is inserted
    /// into averaged files
    #[must_use]
    pub fn with_average_column(mut self, column: usize) -> Self {
        self.average = column;
        self
    }

    /// Sets the token the scoring tool uses for absent sub-scores
    #[must_use]
    pub fn with_missing_marker(mut self, marker: &str) -> Self {
        self.missing_marker = marker.to_string();
        self
    }

    /// The column of the gene name
    pub fn gene_column(&self) -> usize {
        self.gene
    }

    /// The columns of the algorithm sub-scores
    pub fn score_columns(&self) -> &[usize; 4] {
        &self.scores
    }

    /// The column of the composite score in averaged files
    pub fn average_column(&self) -> usize {
        self.average
    }

    /// The token for absent sub-scores
    pub fn missing_marker(&self) -> &str {
        &self.missing_marker
    }

    /// The minimum number of fields a scored variant row must have
    pub fn min_fields(&self) -> usize {
        self.scores
            .iter()
            .copied()
            .chain(std::iter::once(self.gene))
            .max()
            .unwrap_or(self.gene)
            + 1
    }

    /// The minimum number of fields an averaged variant row must have
    pub(crate) fn min_averaged_fields(&self) -> usize {
        self.averaged_gene_column().max(self.average) + 1
    }

    /// The column of the gene name inside averaged files
    ///
    /// The composite score is inserted before the trailing columns,
    /// which shifts the gene column if it comes after the insertion point.
    pub(crate) fn averaged_gene_column(&self) -> usize {
        if self.gene >= self.average {
            self.gene + 1
        } else {
            self.gene
        }
    }
}

/// The inheritance model used to aggregate variant scores per gene
///
/// # Examples
///
/// ```
/// use genescore::InheritanceModel;
///
/// let model: InheritanceModel = "recessive_model".parse().unwrap();
/// assert_eq!(model, InheritanceModel::Recessive);
/// assert_eq!(model.to_string(), "recessive_model");
///
/// assert!("additive".parse::<InheritanceModel>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InheritanceModel {
    /// Sum of the two highest variant scores, requires two variants
    Recessive,
    /// Highest variant score
    Dominant,
}

impl FromStr for InheritanceModel {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let selector = s.trim().to_lowercase();
        match (selector.contains("recessive"), selector.contains("dominant")) {
            (true, false) => Ok(InheritanceModel::Recessive),
            (false, true) => Ok(InheritanceModel::Dominant),
            _ => Err(ScoreError::InvalidModel(s.to_string())),
        }
    }
}

impl Display for InheritanceModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InheritanceModel::Recessive => write!(f, "recessive_model"),
            InheritanceModel::Dominant => write!(f, "dominant_model"),
        }
    }
}

/// Frequency at which pathogenic variants were injected into the cases
///
/// # Examples
///
/// ```
/// use genescore::Frequency;
///
/// let frequencies = Frequency::parse_list("0.02 0.05\n0.1\n").unwrap();
/// let labels: Vec<String> = frequencies.iter().map(|f| f.label()).collect();
/// assert_eq!(labels, vec!["2%", "5%", "10%"]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frequency(f64);

impl Frequency {
    /// Constructs a new `Frequency`
    ///
    /// # Errors
    ///
    /// [`ScoreError::InvalidInput`] if the value is not within `0.0..=1.0`
    pub fn new(value: f64) -> ScoreResult<Self> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ScoreError::InvalidInput(format!(
                "frequency {value} is not within 0 and 1"
            )))
        }
    }

    /// Parses all whitespace separated frequencies of a text
    ///
    /// # Errors
    ///
    /// [`ScoreError::InvalidInput`] if any token is not a valid frequency
    pub fn parse_list(text: &str) -> ScoreResult<Vec<Self>> {
        text.split_whitespace()
            .map(|token| {
                token
                    .parse::<f64>()
                    .map_err(|_| ScoreError::InvalidInput(format!("invalid frequency '{token}'")))
                    .and_then(Frequency::new)
            })
            .collect()
    }

    /// The frequency as fraction
    pub fn value(&self) -> f64 {
        self.0
    }

    /// The frequency as integer percentage, used to name per-frequency outputs
    pub fn label(&self) -> String {
        format!("{:.0}%", self.0 * 100.0)
    }
}

impl Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
