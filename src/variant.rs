//! Scored variants of a single sample and their composite scores
//!
//! Each scored variant line contains several algorithm sub-scores. The
//! composite score of a variant is the arithmetic mean of all sub-scores that
//! are present. If none of them is present, the composite score is
//! [`Score::Missing`] (and not `0`).
//!
//! ```text
//! #chr  start  end  ref  gene   func  svm  x  x  lr   x  x  x  vest x  cadd
//! 1     100    100  A    GBA1   exon  0.2  .  .  0.4  .  .  .  .    .  0.6
//! ```
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::score::{quantize, Score};
use crate::utils::{f64_from_usize, sample_name};
use crate::{ColumnLayout, ScoreError, ScoreResult};

const AVERAGE_HEADER: &str = "average_score";

/// Calculates the mean of all present scores
///
/// Returns [`Score::Missing`] if no score is present. The mean is rounded
/// to the value of its written form with six decimals.
///
/// # Examples
///
/// ```
/// use genescore::Score;
/// use genescore::variant::average;
///
/// let scores = [Score::Value(0.2), Score::Missing, Score::Value(0.4)];
/// assert!((average(scores).value().unwrap() - 0.3).abs() < 1e-9);
///
/// assert_eq!(average([Score::Missing, Score::Missing]), Score::Missing);
/// ```
pub fn average<I: IntoIterator<Item = Score>>(scores: I) -> Score {
    let (sum, count) = scores
        .into_iter()
        .filter_map(|score| score.value())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        Score::Missing
    } else {
        Score::Value(quantize(sum / f64_from_usize(count)))
    }
}

/// Calculates the composite score of a raw variant row
///
/// # Errors
///
/// - [`ScoreError::InvalidInput`] if the row has fewer fields than the layout requires
/// - [`ScoreError::ParseFloatError`] if a sub-score is neither numeric nor the missing marker
pub fn composite_score<S: AsRef<str>>(fields: &[S], layout: &ColumnLayout) -> ScoreResult<Score> {
    if fields.len() < layout.min_fields() {
        return Err(ScoreError::InvalidInput(format!(
            "expected at least {} fields, found {}",
            layout.min_fields(),
            fields.len()
        )));
    }
    let mut scores = [Score::Missing; 4];
    for (score, column) in scores.iter_mut().zip(layout.score_columns()) {
        *score = Score::parse(fields[*column].as_ref(), layout.missing_marker())?;
    }
    Ok(average(scores))
}

/// Returns the fields with `value` inserted at `column`
///
/// If the row is shorter than `column`, the value is appended at the end.
fn insert_column<S: AsRef<str>>(fields: &[S], column: usize, value: &str) -> String {
    let split = column.min(fields.len());
    fields[..split]
        .iter()
        .map(|f| f.as_ref())
        .chain(std::iter::once(value))
        .chain(fields[split..].iter().map(|f| f.as_ref()))
        .collect::<Vec<&str>>()
        .join("\t")
}

/// A single scored variant
///
/// The record keeps all raw fields of the line. It is immutable
/// after parsing and owned by the [`SampleScoreFile`] it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRecord {
    fields: Vec<String>,
}

impl VariantRecord {
    /// Splits a whitespace separated line into a record
    pub fn from_line(line: &str) -> Self {
        Self {
            fields: line.split_whitespace().map(str::to_string).collect(),
        }
    }

    /// All raw fields of the record
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// The number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the record does not have any fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The gene name of the variant, `None` if the row is too short
    pub fn gene(&self, layout: &ColumnLayout) -> Option<&str> {
        self.fields.get(layout.gene_column()).map(String::as_str)
    }

    /// The composite score of the variant
    ///
    /// # Errors
    ///
    /// See [`composite_score`]
    pub fn composite_score(&self, layout: &ColumnLayout) -> ScoreResult<Score> {
        composite_score(&self.fields, layout)
    }

    /// The tab separated row of the averaged file
    ///
    /// The leading columns are kept, followed by the composite score
    /// and then the remaining columns
    ///
    /// # Errors
    ///
    /// See [`composite_score`]
    pub fn averaged_line(&self, layout: &ColumnLayout) -> ScoreResult<String> {
        let score = self.composite_score(layout)?;
        Ok(insert_column(
            &self.fields,
            layout.average_column(),
            &score.to_string(),
        ))
    }
}

/// All scored variants of one individual
#[derive(Debug, Clone)]
pub struct SampleScoreFile {
    name: String,
    header: Vec<String>,
    records: Vec<VariantRecord>,
}

impl SampleScoreFile {
    /// Parses the scored variants of a sample
    ///
    /// The first line is the header. Rows with fewer fields than
    /// the layout requires are skipped with a warning.
    ///
    /// # Errors
    ///
    /// [`ScoreError::InvalidInput`] if the input cannot be read or has no header
    pub fn from_reader<R: BufRead>(name: &str, reader: R, layout: &ColumnLayout) -> ScoreResult<Self> {
        let mut lines = reader.lines();
        let header = match lines.next() {
            Some(Ok(line)) => line.split_whitespace().map(str::to_string).collect(),
            _ => {
                return Err(ScoreError::InvalidInput(format!(
                    "scored variants of sample {name} must contain a header"
                )))
            }
        };

        let mut records = Vec::new();
        for (idx, line) in lines.enumerate() {
            let line = line.map_err(|_| {
                ScoreError::InvalidInput(format!("invalid data in scored variants of {name}"))
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let record = VariantRecord::from_line(&line);
            if record.len() < layout.min_fields() {
                let err = ScoreError::MalformedRow {
                    sample: name.to_string(),
                    line: idx + 2,
                    reason: format!(
                        "{} fields, at least {} required",
                        record.len(),
                        layout.min_fields()
                    ),
                };
                warn!("Skipping row: {}", err);
                continue;
            }
            records.push(record);
        }
        debug!("Sample {}: {} variants", name, records.len());
        Ok(Self {
            name: name.to_string(),
            header,
            records,
        })
    }

    /// Parses the scored variants from a file, the sample name is derived from the file name
    ///
    /// # Errors
    ///
    /// - [`ScoreError::CannotOpenFile`] if the file cannot be opened
    /// - See [`SampleScoreFile::from_reader`]
    pub fn from_path<P: AsRef<Path>>(path: P, layout: &ColumnLayout) -> ScoreResult<Self> {
        let filename = path.as_ref().display().to_string();
        let file = File::open(path.as_ref()).map_err(|_| ScoreError::CannotOpenFile(filename))?;
        Self::from_reader(&sample_name(path), BufReader::new(file), layout)
    }

    /// The name of the sample
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The header fields
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// The number of variants
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the sample has no variants
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns an iterator of the [`VariantRecord`]s
    pub fn iter(&self) -> std::slice::Iter<'_, VariantRecord> {
        self.records.iter()
    }

    /// Calculates the composite score of every variant
    ///
    /// Rows with non-numeric sub-scores are skipped with a warning
    pub fn averaged(&self, layout: &ColumnLayout) -> AveragedSample {
        let gene_header = self
            .header
            .get(layout.gene_column())
            .map_or_else(|| "gene".to_string(), |h| h.trim_start_matches('#').to_string());
        let mut variants = Vec::with_capacity(self.records.len());
        for (idx, record) in self.records.iter().enumerate() {
            let Some(gene) = record.gene(layout) else {
                continue;
            };
            match record.composite_score(layout) {
                Ok(score) => variants.push((gene.to_string(), score)),
                Err(err) => warn!(
                    "Skipping variant {} of sample {}: {}",
                    idx + 1,
                    self.name,
                    err
                ),
            }
        }
        AveragedSample {
            name: self.name.clone(),
            gene_header,
            variants,
        }
    }

    /// Writes the averaged file of the sample
    ///
    /// Returns the number of written variant rows. Rows with non-numeric
    /// sub-scores are skipped with a warning.
    ///
    /// # Errors
    ///
    /// [`ScoreError::InvalidInput`] if writing fails
    pub fn write_averaged<W: Write>(&self, layout: &ColumnLayout, mut writer: W) -> ScoreResult<usize> {
        let header = insert_column(&self.header, layout.average_column(), AVERAGE_HEADER);
        write_line(&mut writer, &header)?;
        let mut written = 0;
        for (idx, record) in self.records.iter().enumerate() {
            match record.averaged_line(layout) {
                Ok(line) => {
                    write_line(&mut writer, &line)?;
                    written += 1;
                }
                Err(err) => warn!(
                    "Skipping variant {} of sample {}: {}",
                    idx + 1,
                    self.name,
                    err
                ),
            }
        }
        Ok(written)
    }
}

impl<'a> IntoIterator for &'a SampleScoreFile {
    type Item = &'a VariantRecord;
    type IntoIter = std::slice::Iter<'a, VariantRecord>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The composite scores of all variants of one sample, together with their gene
#[derive(Debug, Clone, Default)]
pub struct AveragedSample {
    name: String,
    gene_header: String,
    variants: Vec<(String, Score)>,
}

impl AveragedSample {
    /// Constructs an `AveragedSample` from `(gene, composite score)` pairs
    pub fn new<S: Into<String>>(name: &str, variants: Vec<(S, Score)>) -> Self {
        Self {
            name: name.to_string(),
            gene_header: "gene".to_string(),
            variants: variants.into_iter().map(|(g, s)| (g.into(), s)).collect(),
        }
    }

    /// Parses an averaged file, as written by [`SampleScoreFile::write_averaged`]
    ///
    /// The first line is the header. Rows that are too short or have
    /// a non-numeric composite score are skipped with a warning.
    ///
    /// # Errors
    ///
    /// [`ScoreError::InvalidInput`] if the input cannot be read or has no header
    pub fn from_reader<R: BufRead>(name: &str, reader: R, layout: &ColumnLayout) -> ScoreResult<Self> {
        let gene_column = layout.averaged_gene_column();
        let mut lines = reader.lines();
        let gene_header = match lines.next() {
            Some(Ok(line)) => line
                .split_whitespace()
                .nth(gene_column)
                .unwrap_or("gene")
                .trim_start_matches('#')
                .to_string(),
            _ => {
                return Err(ScoreError::InvalidInput(format!(
                    "averaged variants of sample {name} must contain a header"
                )))
            }
        };

        let mut variants = Vec::new();
        for (idx, line) in lines.enumerate() {
            let line = line.map_err(|_| {
                ScoreError::InvalidInput(format!("invalid data in averaged variants of {name}"))
            })?;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_averaged_line(&line, layout) {
                Ok(variant) => variants.push(variant),
                Err(reason) => {
                    let err = ScoreError::MalformedRow {
                        sample: name.to_string(),
                        line: idx + 2,
                        reason: reason.to_string(),
                    };
                    warn!("Skipping row: {}", err);
                }
            }
        }
        Ok(Self {
            name: name.to_string(),
            gene_header,
            variants,
        })
    }

    /// Parses an averaged file from disk
    ///
    /// # Errors
    ///
    /// - [`ScoreError::CannotOpenFile`] if the file cannot be opened
    /// - See [`AveragedSample::from_reader`]
    pub fn from_path<P: AsRef<Path>>(path: P, layout: &ColumnLayout) -> ScoreResult<Self> {
        let filename = path.as_ref().display().to_string();
        let file = File::open(path.as_ref()).map_err(|_| ScoreError::CannotOpenFile(filename))?;
        Self::from_reader(&sample_name(path), BufReader::new(file), layout)
    }

    /// The name of the sample
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The header of the gene name column
    pub fn gene_header(&self) -> &str {
        &self.gene_header
    }

    /// The number of variants
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Returns `true` if the sample has no variants
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Returns an iterator of `(gene, composite score)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, Score)> {
        self.variants.iter().map(|(gene, score)| (gene.as_str(), *score))
    }
}

fn parse_averaged_line(line: &str, layout: &ColumnLayout) -> ScoreResult<(String, Score)> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let gene_column = layout.averaged_gene_column();
    let min_fields = layout.min_averaged_fields();
    if fields.len() < min_fields {
        return Err(ScoreError::InvalidInput(format!(
            "{} fields, at least {} required",
            fields.len(),
            min_fields
        )));
    }
    let score = Score::parse(fields[layout.average_column()], layout.missing_marker())?;
    Ok((fields[gene_column].to_string(), score))
}

fn write_line<W: Write>(writer: &mut W, line: &str) -> ScoreResult<()> {
    writeln!(writer, "{line}")
        .map_err(|err| ScoreError::InvalidInput(format!("unable to write output: {err}")))
}
