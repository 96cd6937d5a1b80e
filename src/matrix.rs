//! A gene x sample matrix of gene scores for a whole cohort
//!
//! Imagine the following cohort of three samples
//!
//! | gene  | S01      | S02      | S03      |
//! |:----- | --------:| --------:| --------:|
//! | GBA1  | 1.300000 | N/A      | 0.900000 |
//! | KRAS  | N/A      | 0.400000 | N/A      |
//!
//! Genes are kept in the order in which they first appear across the samples.
//! Every row has exactly one slot per sample, samples without a score for a
//! gene hold `N/A` in that slot.
//!
//! ```
//! use genescore::{GeneScore, GeneScoreMatrix};
//!
//! let mut builder = GeneScoreMatrix::builder();
//! builder.add_sample("S01", [("GBA1", GeneScore::Value(1.3))]);
//! builder.add_sample("S02", [("KRAS", GeneScore::Value(0.4))]);
//! builder.add_sample("S03", [("GBA1", GeneScore::Value(0.9))]);
//! let matrix = builder.build();
//!
//! assert_eq!(matrix.dim(), (2, 3));
//! assert_eq!(matrix.row("KRAS").unwrap(), &[None, Some(0.4), None]);
//! ```
use std::collections::HashMap;
use std::fmt::Debug;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::gene::SampleGeneScores;
use crate::score::{format_cell, parse_finite, GeneScore};
use crate::{ScoreError, ScoreResult, MISSING_MARKER, NOT_AVAILABLE};

const HEADER_PREFIX: &str = "#geneName";

/// Builds a [`GeneScoreMatrix`] from the gene scores of one sample after the other
///
/// The builder is scoped to a single matrix and consumed by [`MatrixBuilder::build`].
#[derive(Debug, Default)]
pub struct MatrixBuilder {
    samples: Vec<String>,
    genes: Vec<String>,
    rows: Vec<Vec<Option<f64>>>,
    index: HashMap<String, usize>,
}

impl MatrixBuilder {
    /// Constructs a new, empty `MatrixBuilder`
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of samples added so far
    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    /// Adds the next sample of the cohort
    ///
    /// The sample occupies the next column. Genes that are new to the matrix
    /// get `N/A` for all previous samples. If a gene is listed more than once
    /// for the same sample, only the first score is kept.
    pub fn add_sample<I, S>(&mut self, name: &str, scores: I) -> &mut Self
    where
        I: IntoIterator<Item = (S, GeneScore)>,
        S: AsRef<str>,
    {
        let column = self.samples.len();
        for (gene, score) in scores {
            let gene = gene.as_ref();
            let idx = match self.index.get(gene) {
                Some(idx) => *idx,
                None => {
                    let idx = self.genes.len();
                    self.index.insert(gene.to_string(), idx);
                    self.genes.push(gene.to_string());
                    self.rows.push(Vec::with_capacity(column + 1));
                    idx
                }
            };
            let row = &mut self.rows[idx];
            if row.len() > column {
                warn!(
                    "Gene {} is listed more than once in sample {}, keeping the first score",
                    gene, name
                );
                continue;
            }
            row.resize(column, None);
            row.push(score.value());
        }
        self.samples.push(name.to_string());
        self
    }

    /// Adds the gene scores of the next sample of the cohort
    pub fn add_gene_scores(&mut self, sample: &SampleGeneScores) -> &mut Self {
        self.add_sample(sample.sample(), sample.iter())
    }

    /// Pads all rows to the full number of samples and returns the matrix
    pub fn build(mut self) -> GeneScoreMatrix {
        let n_samples = self.samples.len();
        for row in &mut self.rows {
            row.resize(n_samples, None);
        }
        debug!(
            "Built gene score matrix with {} genes and {} samples",
            self.genes.len(),
            n_samples
        );
        GeneScoreMatrix {
            samples: self.samples,
            genes: self.genes,
            rows: self.rows,
            index: self.index,
        }
    }
}

/// Gene scores of a cohort, one row per gene and one column per sample
///
/// The text form starts with a header listing the samples, followed by one
/// line per gene:
///
/// ```text
/// #geneName   S01       S02       S03
/// GBA1        1.300000  N/A       0.900000
/// KRAS        N/A       0.400000  N/A
/// ```
#[derive(Default, Clone, PartialEq)]
pub struct GeneScoreMatrix {
    samples: Vec<String>,
    genes: Vec<String>,
    rows: Vec<Vec<Option<f64>>>,
    index: HashMap<String, usize>,
}

impl GeneScoreMatrix {
    /// Returns a new [`MatrixBuilder`]
    pub fn builder() -> MatrixBuilder {
        MatrixBuilder::new()
    }

    /// Builds the matrix from the gene scores of all samples of a cohort, in order
    pub fn from_gene_scores<'a, I: IntoIterator<Item = &'a SampleGeneScores>>(samples: I) -> Self {
        let mut builder = MatrixBuilder::new();
        for sample in samples {
            builder.add_gene_scores(sample);
        }
        builder.build()
    }

    /// The names of all samples, in column order
    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    /// The number of samples (columns)
    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    /// The names of all genes, in row order
    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    /// The number of genes (rows)
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// Returns `true` if the matrix does not contain any gene
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Returns a Tuple with number of genes and number of samples
    pub fn dim(&self) -> (usize, usize) {
        (self.genes.len(), self.samples.len())
    }

    /// Returns the scores of the gene, `None` if the gene is not in the matrix
    pub fn row(&self, gene: &str) -> Option<&[Option<f64>]> {
        self.index.get(gene).map(|idx| self.rows[*idx].as_slice())
    }

    /// Iterates the rows of the matrix as `(gene, scores)`
    pub fn rows(&self) -> Rows<'_> {
        Rows {
            genes: self.genes.iter(),
            rows: self.rows.iter(),
        }
    }

    /// Writes the matrix in its text form, one line at a time
    ///
    /// # Errors
    ///
    /// [`ScoreError::InvalidInput`] if writing fails
    pub fn write<W: Write>(&self, mut writer: W) -> ScoreResult<()> {
        let to_err =
            |err: std::io::Error| ScoreError::InvalidInput(format!("unable to write matrix: {err}"));
        let mut header = String::from(HEADER_PREFIX);
        for sample in &self.samples {
            header.push('\t');
            header.push_str(sample);
        }
        writeln!(writer, "{header}").map_err(to_err)?;

        for (gene, row) in self.rows() {
            let mut line = String::from(gene);
            for value in row {
                line.push('\t');
                line.push_str(&format_cell(*value));
            }
            writeln!(writer, "{line}").map_err(to_err)?;
        }
        Ok(())
    }

    /// Parses a matrix from its text form
    ///
    /// `N/A` and `.` are absent values. Rows shorter than the header are
    /// padded with absent values, longer rows are truncated. Rows with
    /// non-numeric values are skipped with a warning.
    ///
    /// # Errors
    ///
    /// [`ScoreError::InvalidInput`] if the input cannot be read or has no header
    pub fn from_reader<R: BufRead>(reader: R) -> ScoreResult<Self> {
        let mut lines = reader.lines();
        let samples: Vec<String> = match lines.next() {
            Some(Ok(line)) if line.starts_with('#') => {
                line.split_whitespace().skip(1).map(str::to_string).collect()
            }
            _ => {
                return Err(ScoreError::InvalidInput(
                    "gene score matrix must start with a '#geneName' header".to_string(),
                ))
            }
        };

        let mut builder = MatrixBuilder::new();
        builder.samples = samples;
        let n_samples = builder.samples.len();
        for (idx, line) in lines.enumerate() {
            let line = line.map_err(|_| {
                ScoreError::InvalidInput("invalid data in gene score matrix".to_string())
            })?;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let mut cols = line.split_whitespace();
            let Some(gene) = cols.next() else {
                continue;
            };
            let row = match parse_row(cols) {
                Ok(row) => row,
                Err(err) => {
                    warn!("Skipping line {} of gene score matrix: {}", idx + 2, err);
                    continue;
                }
            };
            if row.len() > n_samples {
                warn!(
                    "Gene {} has {} values for {} samples, truncating",
                    gene,
                    row.len(),
                    n_samples
                );
            }
            if builder.index.contains_key(gene) {
                warn!("Gene {} is listed more than once, keeping the first row", gene);
                continue;
            }
            builder.index.insert(gene.to_string(), builder.genes.len());
            builder.genes.push(gene.to_string());
            let mut row = row;
            row.truncate(n_samples);
            builder.rows.push(row);
        }
        Ok(builder.build())
    }

    /// Parses a matrix from disk
    ///
    /// # Errors
    ///
    /// - [`ScoreError::CannotOpenFile`] if the file cannot be opened
    /// - See [`GeneScoreMatrix::from_reader`]
    pub fn from_path<P: AsRef<Path>>(path: P) -> ScoreResult<Self> {
        let filename = path.as_ref().display().to_string();
        let file = File::open(path).map_err(|_| ScoreError::CannotOpenFile(filename))?;
        Self::from_reader(BufReader::new(file))
    }
}

fn parse_row<'a, I: Iterator<Item = &'a str>>(cols: I) -> ScoreResult<Vec<Option<f64>>> {
    cols.map(|value| match value {
        NOT_AVAILABLE | MISSING_MARKER => Ok(None),
        value => parse_finite(value).map(Some),
    })
    .collect()
}

impl Debug for GeneScoreMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "[{}]", self.samples.join(", "))?;
        for (gene, row) in self.rows() {
            let v: Vec<String> = row.iter().map(|value| format_cell(*value)).collect();
            writeln!(f, "{gene}: [{}]", v.join(", "))?;
        }
        Ok(())
    }
}

/// Iterates the rows of a [`GeneScoreMatrix`] in first-seen gene order
pub struct Rows<'a> {
    genes: std::slice::Iter<'a, String>,
    rows: std::slice::Iter<'a, Vec<Option<f64>>>,
}

impl<'a> Iterator for Rows<'a> {
    type Item = (&'a str, &'a [Option<f64>]);
    fn next(&mut self) -> Option<Self::Item> {
        match (self.genes.next(), self.rows.next()) {
            (Some(gene), Some(row)) => Some((gene.as_str(), row.as_slice())),
            _ => None,
        }
    }
}

impl<'a> IntoIterator for &'a GeneScoreMatrix {
    type Item = (&'a str, &'a [Option<f64>]);
    type IntoIter = Rows<'a>;
    fn into_iter(self) -> Self::IntoIter {
        self.rows()
    }
}
