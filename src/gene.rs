//! Aggregation of variant scores into one score per gene
//!
//! All composite scores of a sample are grouped by their gene. Each group
//! is then reduced to a single [`GeneScore`] according to the
//! [`InheritanceModel`]:
//!
//! - **Dominant**: the highest composite score of the gene
//! - **Recessive**: the sum of the two highest composite scores. Genes with
//!   fewer than two variants, or where one of the two highest scores is
//!   missing, are [`GeneScore::NotApplicable`]
//!
//! Variants in cis (on the same haplotype) are not collapsed before the
//! two highest scores are summed.
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::score::{quantize, GeneScore, Score};
use crate::utils::sample_name;
use crate::variant::AveragedSample;
use crate::{InheritanceModel, ScoreError, ScoreResult, DEFAULT_VARIANTS_PER_GENE};

type VariantScores = SmallVec<[Score; DEFAULT_VARIANTS_PER_GENE]>;

/// Returns the highest score
///
/// A gene without any variant is [`GeneScore::NotApplicable`],
/// a gene whose variants are all missing is [`GeneScore::Missing`]
///
/// # Examples
///
/// ```
/// use genescore::{GeneScore, Score};
/// use genescore::gene::dominant_score;
///
/// let scores = [Score::Value(0.2), Score::Value(0.9), Score::Value(0.1)];
/// assert_eq!(dominant_score(&scores), GeneScore::Value(0.9));
/// ```
pub fn dominant_score(scores: &[Score]) -> GeneScore {
    match scores.iter().max() {
        None => GeneScore::NotApplicable,
        Some(Score::Missing) => GeneScore::Missing,
        Some(Score::Value(v)) => GeneScore::Value(quantize(*v)),
    }
}

/// Returns the sum of the two highest scores
///
/// # Examples
///
/// ```
/// use genescore::{GeneScore, Score};
/// use genescore::gene::recessive_score;
///
/// let scores = [Score::Value(0.5), Score::Value(0.8), Score::Missing];
/// let value = recessive_score(&scores).value().unwrap();
/// assert!((value - 1.3).abs() < 1e-9);
///
/// assert_eq!(recessive_score(&[Score::Value(0.5)]), GeneScore::NotApplicable);
/// ```
pub fn recessive_score(scores: &[Score]) -> GeneScore {
    if scores.len() < 2 {
        return GeneScore::NotApplicable;
    }
    let mut sorted: VariantScores = scores.iter().copied().collect();
    sorted.sort_unstable();
    match (sorted[sorted.len() - 1], sorted[sorted.len() - 2]) {
        (Score::Value(first), Score::Value(second)) => {
            GeneScore::Value(quantize(first + second))
        }
        _ => GeneScore::NotApplicable,
    }
}

/// Reduces the composite scores of a sample to one score per gene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneAggregator {
    model: InheritanceModel,
}

impl GeneAggregator {
    /// Constructs a new `GeneAggregator` for the inheritance model
    pub fn new(model: InheritanceModel) -> Self {
        Self { model }
    }

    /// Constructs a new `GeneAggregator` from a model selector, e.g. `recessive_model`
    ///
    /// # Errors
    ///
    /// [`ScoreError::InvalidModel`] if the selector is neither recessive nor dominant
    ///
    /// # Examples
    ///
    /// ```
    /// use genescore::GeneAggregator;
    ///
    /// assert!(GeneAggregator::from_selector("dominant_model").is_ok());
    /// assert!(GeneAggregator::from_selector("codominant?").is_err());
    /// ```
    pub fn from_selector(selector: &str) -> ScoreResult<Self> {
        Ok(Self::new(selector.parse()?))
    }

    /// The inheritance model of the aggregator
    pub fn model(&self) -> InheritanceModel {
        self.model
    }

    /// Reduces the scores of a single gene
    pub fn gene_score(&self, scores: &[Score]) -> GeneScore {
        match self.model {
            InheritanceModel::Recessive => recessive_score(scores),
            InheritanceModel::Dominant => dominant_score(scores),
        }
    }

    /// Calculates the score of every gene of the sample
    ///
    /// Genes are returned in the order in which they first appear in the sample.
    ///
    /// # Examples
    ///
    /// ```
    /// use genescore::{AveragedSample, GeneAggregator, GeneScore, InheritanceModel, Score};
    ///
    /// let sample = AveragedSample::new(
    ///     "S01",
    ///     vec![
    ///         ("GBA1", Score::Value(0.2)),
    ///         ("KRAS", Score::Value(0.4)),
    ///         ("GBA1", Score::Value(0.9)),
    ///     ],
    /// );
    ///
    /// let genes = GeneAggregator::new(InheritanceModel::Dominant).aggregate(&sample);
    /// assert_eq!(genes.get("GBA1"), Some(GeneScore::Value(0.9)));
    /// assert_eq!(genes.get("KRAS"), Some(GeneScore::Value(0.4)));
    /// ```
    pub fn aggregate(&self, sample: &AveragedSample) -> SampleGeneScores {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<(&str, VariantScores)> = Vec::new();
        for (gene, score) in sample.iter() {
            match index.get(gene) {
                Some(idx) => groups[*idx].1.push(score),
                None => {
                    index.insert(gene, groups.len());
                    let mut scores = VariantScores::new();
                    scores.push(score);
                    groups.push((gene, scores));
                }
            }
        }

        let genes: Vec<(String, GeneScore)> = groups
            .into_iter()
            .map(|(gene, scores)| (gene.to_string(), self.gene_score(&scores)))
            .collect();
        debug!(
            "Sample {}: {} genes scored under {}",
            sample.name(),
            genes.len(),
            self.model
        );
        SampleGeneScores {
            sample: sample.name().to_string(),
            gene_header: sample.gene_header().to_string(),
            genes,
        }
    }
}

/// The gene scores of a single sample
///
/// The text form has a header line starting with `#`, followed by one
/// `gene<TAB>score` line per gene:
///
/// ```text
/// #gene   geneScore
/// GBA1    1.300000
/// KRAS    N/A
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleGeneScores {
    sample: String,
    gene_header: String,
    genes: Vec<(String, GeneScore)>,
}

impl SampleGeneScores {
    /// Parses a gene score file
    ///
    /// Lines starting with `#` are skipped. Lines without a gene and score, or
    /// with an invalid score, are skipped with a warning.
    ///
    /// # Errors
    ///
    /// [`ScoreError::InvalidInput`] if the input cannot be read
    pub fn from_reader<R: BufRead>(sample: &str, reader: R) -> ScoreResult<Self> {
        let mut gene_header = String::from("gene");
        let mut genes = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|_| {
                ScoreError::InvalidInput(format!("invalid data in gene scores of {sample}"))
            })?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(header) = line.strip_prefix('#') {
                if let Some(name) = header.split_whitespace().next() {
                    gene_header = name.to_string();
                }
                continue;
            }
            let mut cols = line.split_whitespace();
            let (Some(gene), Some(score)) = (cols.next(), cols.next()) else {
                warn!(
                    "Skipping row: {}",
                    ScoreError::MalformedRow {
                        sample: sample.to_string(),
                        line: idx + 1,
                        reason: "gene score lines need a gene and a score".to_string(),
                    }
                );
                continue;
            };
            match GeneScore::parse(score) {
                Ok(score) => genes.push((gene.to_string(), score)),
                Err(_) => warn!(
                    "Skipping row: {}",
                    ScoreError::MalformedRow {
                        sample: sample.to_string(),
                        line: idx + 1,
                        reason: format!("invalid score '{score}' for gene {gene}"),
                    }
                ),
            }
        }
        Ok(Self {
            sample: sample.to_string(),
            gene_header,
            genes,
        })
    }

    /// Parses a gene score file from disk, the sample name is derived from the file name
    ///
    /// # Errors
    ///
    /// - [`ScoreError::CannotOpenFile`] if the file cannot be opened
    /// - See [`SampleGeneScores::from_reader`]
    pub fn from_path<P: AsRef<Path>>(path: P) -> ScoreResult<Self> {
        let filename = path.as_ref().display().to_string();
        let file = File::open(path.as_ref()).map_err(|_| ScoreError::CannotOpenFile(filename))?;
        Self::from_reader(&sample_name(path), BufReader::new(file))
    }

    /// Writes the gene scores in their text form
    ///
    /// # Errors
    ///
    /// [`ScoreError::InvalidInput`] if writing fails
    pub fn write<W: Write>(&self, mut writer: W) -> ScoreResult<()> {
        let to_err = |err: std::io::Error| {
            ScoreError::InvalidInput(format!(
                "unable to write gene scores of {}: {err}",
                self.sample
            ))
        };
        writeln!(writer, "#{}\tgeneScore", self.gene_header).map_err(to_err)?;
        for (gene, score) in &self.genes {
            writeln!(writer, "{gene}\t{score}").map_err(to_err)?;
        }
        Ok(())
    }

    /// The name of the sample
    pub fn sample(&self) -> &str {
        &self.sample
    }

    /// The number of genes
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// Returns `true` if the sample has no genes
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Returns the score of the gene, `None` if the gene is not present
    pub fn get(&self, gene: &str) -> Option<GeneScore> {
        self.genes
            .iter()
            .find(|(name, _)| name == gene)
            .map(|(_, score)| *score)
    }

    /// Returns an iterator of `(gene, score)` pairs in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, GeneScore)> + '_ {
        self.genes.iter().map(|(gene, score)| (gene.as_str(), *score))
    }
}
