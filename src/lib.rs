//! Gene-level pathogenicity burden scoring and case/control comparison
//!
//! `genescore` evaluates whether a gene carries a different burden of
//! pathogenic variants in a case cohort compared to a matched control cohort.
//! The pipeline runs strictly forward:
//!
//! 1. [`variant`]: each scored variant gets a composite score, the mean of
//!    its (present) algorithm sub-scores
//! 2. [`gene`]: the composite scores of one sample are reduced to one score
//!    per gene under an [`InheritanceModel`]
//! 3. [`matrix`]: the per-sample gene scores of a cohort are merged into a
//!    gene x sample [`GeneScoreMatrix`]
//! 4. [`stats`]: one case row and the matching control row are compared with
//!    the two-part rank-sum test
//! 5. [`ranking`]: the per-gene results are ordered by ascending p-value
//!
//! # Examples
//!
//! ```
//! use genescore::{GeneScoreMatrix, TwoPartTest, GeneRanker, GeneScore};
//!
//! let mut case = GeneScoreMatrix::builder();
//! case.add_sample("case1", [("GBA1", GeneScore::Value(1.0))]);
//! case.add_sample("case2", [("GBA1", GeneScore::Value(2.0))]);
//! case.add_sample("case3", [("GBA1", GeneScore::Value(3.0))]);
//! let case = case.build();
//!
//! let mut control = GeneScoreMatrix::builder();
//! control.add_sample("ctrl1", [("GBA1", GeneScore::Value(4.0))]);
//! control.add_sample("ctrl2", [("GBA1", GeneScore::Value(5.0))]);
//! control.add_sample("ctrl3", [("GBA1", GeneScore::Value(6.0))]);
//! let control = control.build();
//!
//! let statistics = TwoPartTest::new().compare(&case, &control);
//! let ranking = GeneRanker::new().rank(&statistics);
//!
//! let top = ranking.get(0).unwrap();
//! assert_eq!(top.gene(), "GBA1");
//! assert!((top.pvalue() - 0.1455).abs() < 1e-3);
//! ```
use std::num::ParseFloatError;

use thiserror::Error;

pub mod config;
pub mod gene;
pub mod matrix;
pub mod ranking;
pub mod run;
pub mod score;
pub mod stats;
pub mod variant;
mod utils;

pub use config::{ColumnLayout, Frequency, InheritanceModel};
pub use gene::{GeneAggregator, SampleGeneScores};
pub use matrix::{GeneScoreMatrix, MatrixBuilder};
pub use ranking::{GeneRanker, RankedResult, RankedResults};
pub use run::{run_unit, RunConfig, UnitReport};
pub use score::{GeneScore, Score};
pub use stats::{StatisticMatrix, StatisticRow, TwoPartTest};
pub use utils::sample_name;
pub use variant::{AveragedSample, SampleScoreFile, VariantRecord};

/// Token used by the upstream scoring tool for an absent sub-score
pub const MISSING_MARKER: &str = ".";

/// Token for an absent gene score in gene score files and matrices
pub const NOT_AVAILABLE: &str = "N/A";

/// Number of fractional digits of every score written to text
pub const SCORE_DECIMALS: usize = 6;

const DEFAULT_GENE_COLUMN: usize = 4;
const DEFAULT_AVERAGE_COLUMN: usize = 5;
const DEFAULT_SCORE_COLUMNS: [usize; 4] = [6, 9, 13, 15];
const DEFAULT_VARIANTS_PER_GENE: usize = 4;

/// Errors of the scoring and statistics pipeline
#[derive(Error, Debug)]
pub enum ScoreError {
    /// A file could not be opened or read
    #[error("cannot open file {0}")]
    CannotOpenFile(String),
    /// A data row has too few fields or a non-numeric score
    #[error("malformed row {line} in sample {sample}: {reason}")]
    MalformedRow {
        /// Name of the sample the row belongs to
        sample: String,
        /// 1-based line number inside the input
        line: usize,
        /// Description of the problem
        reason: String,
    },
    /// The inheritance model selector is neither recessive nor dominant
    #[error("invalid inheritance model '{0}', expected 'recessive_model' or 'dominant_model'")]
    InvalidModel(String),
    /// The input data is not usable at all
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A value could not be parsed as a number
    #[error("unable to parse float")]
    ParseFloatError,
}

impl From<ParseFloatError> for ScoreError {
    fn from(_: ParseFloatError) -> Self {
        ScoreError::ParseFloatError
    }
}

/// Shortcut for `Result<T, ScoreError>`
pub type ScoreResult<T> = Result<T, ScoreError>;
