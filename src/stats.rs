//! The two-part rank-sum test of case versus control gene scores
//!
//! For each gene the test combines two components:
//!
//! - **B**, a two-proportion z-statistic on the fraction of samples *without*
//!   a gene score, testing whether the gene is scored more often in cases
//! - **W**, the normal approximation of the Wilcoxon rank sum of all
//!   present scores, testing whether the scores are higher in cases
//!
//! The combined statistic `X2 = B² + W²` is chi-square distributed with
//! two degrees of freedom under the null hypothesis of no difference between
//! cases and controls.
//!
//! Both cohorts are assumed to have the same size `n1 = n2`, which is the
//! length of the case row. Missing trailing control values are treated as `N/A`.
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::matrix::GeneScoreMatrix;
use crate::utils::f64_from_usize;
use crate::{ScoreError, ScoreResult};

pub mod pvalue;
mod rank_sum;

pub use rank_sum::{mid_ranks, rank_sum};

use pvalue::{ChiSquaredDf2, PValue};

const HEADER: &str = "#Gene\tRS\tB\tW\tX2\tn1\tn2\tm1\tm2";

/// The two-part test result of a single gene
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticRow {
    gene: String,
    rs: f64,
    b: f64,
    w: f64,
    x2: f64,
    n1: usize,
    n2: usize,
    m1: usize,
    m2: usize,
    pvalue: f64,
}

impl StatisticRow {
    /// The gene name
    pub fn gene(&self) -> &str {
        &self.gene
    }

    /// Sum of the mid-ranks of the present case scores
    pub fn rs(&self) -> f64 {
        self.rs
    }

    /// The proportion component
    pub fn b(&self) -> f64 {
        self.b
    }

    /// The rank component
    pub fn w(&self) -> f64 {
        self.w
    }

    /// The combined statistic `B² + W²`
    pub fn x2(&self) -> f64 {
        self.x2
    }

    /// The number of cases
    pub fn n1(&self) -> usize {
        self.n1
    }

    /// The number of controls
    pub fn n2(&self) -> usize {
        self.n2
    }

    /// The number of cases without a score
    pub fn m1(&self) -> usize {
        self.m1
    }

    /// The number of controls without a score
    pub fn m2(&self) -> usize {
        self.m2
    }

    /// The p-value of the combined statistic
    pub fn pvalue(&self) -> f64 {
        self.pvalue
    }

    /// The tab separated row of the statistic matrix
    fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.gene, self.rs, self.b, self.w, self.x2, self.n1, self.n2, self.m1, self.m2
        )
    }

    fn from_line<P: PValue>(line: &str, pvalue: &P) -> ScoreResult<Self> {
        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.len() != 9 {
            return Err(ScoreError::InvalidInput(format!(
                "statistic rows need 9 columns, found {}",
                cols.len()
            )));
        }
        let count = |token: &str| {
            token
                .parse::<f64>()
                .ok()
                .filter(|v| *v >= 0.0 && v.fract() == 0.0)
                .map(|v| v as usize)
                .ok_or_else(|| ScoreError::InvalidInput(format!("invalid count '{token}'")))
        };
        let x2 = cols[4].parse::<f64>()?;
        Ok(Self {
            gene: cols[0].to_string(),
            rs: cols[1].parse()?,
            b: cols[2].parse()?,
            w: cols[3].parse()?,
            x2,
            n1: count(cols[5])?,
            n2: count(cols[6])?,
            m1: count(cols[7])?,
            m2: count(cols[8])?,
            pvalue: pvalue.sf(x2),
        })
    }
}

/// The two-part rank-sum test
///
/// # Examples
///
/// ```
/// use genescore::TwoPartTest;
///
/// let test = TwoPartTest::new();
/// let case = [Some(1.0), Some(2.0), Some(3.0)];
/// let control = [Some(4.0), Some(5.0), Some(6.0)];
///
/// let row = test.compute("GBA1", &case, Some(&control));
/// assert_eq!(row.rs(), 6.0);
/// assert_eq!(row.b(), 0.0);
/// assert!((row.w() + 1.964).abs() < 1e-3);
/// assert!((row.x2() - 3.857).abs() < 1e-3);
/// assert!((row.pvalue() - 0.1454).abs() < 1e-3);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoPartTest<P = ChiSquaredDf2> {
    pvalue: P,
}

impl TwoPartTest<ChiSquaredDf2> {
    /// Constructs a new test using the closed-form chi-square (df = 2) p-value
    pub fn new() -> Self {
        Self {
            pvalue: ChiSquaredDf2,
        }
    }
}

impl<P: PValue> TwoPartTest<P> {
    /// Constructs a new test with a custom p-value function
    pub fn with_pvalue(pvalue: P) -> Self {
        Self { pvalue }
    }

    /// The p-value function of the test
    pub fn pvalue_function(&self) -> &P {
        &self.pvalue
    }

    /// Compares the case row of a gene with its control row
    ///
    /// `None` values are samples without a score. If `control` is `None`,
    /// the gene was not seen in any control and all controls count as
    /// missing. The control cohort has the same size as the case cohort,
    /// shorter control rows are padded, longer ones truncated.
    pub fn compute(
        &self,
        gene: &str,
        case: &[Option<f64>],
        control: Option<&[Option<f64>]>,
    ) -> StatisticRow {
        let n1 = case.len();
        let n2 = n1;

        let control = control.unwrap_or(&[]);
        if control.len() > n2 {
            warn!(
                "Gene {} has {} control values for {} cases, ignoring the surplus",
                gene,
                control.len(),
                n2
            );
        }
        let case_values: Vec<f64> = case.iter().flatten().copied().collect();
        let control_values: Vec<f64> = control.iter().take(n2).flatten().copied().collect();
        let m1 = n1 - case_values.len();
        let m2 = n2 - control_values.len();

        let rs = rank_sum(&case_values, &control_values);
        let b = proportion_component(n1, n2, m1, m2);
        let w = rank_component(rs, n1 - m1, n2 - m2);
        let x2 = b * b + w * w;

        debug!(
            "Gene:{}\tRS: {}, B: {}, W: {}, X2: {}, n1: {}, n2: {}, m1: {}, m2: {}",
            gene, rs, b, w, x2, n1, n2, m1, m2
        );
        StatisticRow {
            gene: gene.to_string(),
            rs,
            b,
            w,
            x2,
            n1,
            n2,
            m1,
            m2,
            pvalue: self.pvalue.sf(x2),
        }
    }

    /// Tests every gene of the case matrix against the control matrix
    ///
    /// Rows are returned in the row order of the case matrix. Genes that are
    /// absent from the control matrix are compared with an all-missing control row.
    pub fn compare(&self, case: &GeneScoreMatrix, control: &GeneScoreMatrix) -> StatisticMatrix {
        let rows = case
            .rows()
            .map(|(gene, values)| {
                let control_row = control.row(gene);
                if control_row.is_none() {
                    debug!("Gene {} is not present in the controls", gene);
                }
                self.compute(gene, values, control_row)
            })
            .collect();
        StatisticMatrix { rows }
    }
}

/// Two-proportion z-statistic on the fraction of missing scores
///
/// Returns `0` if no sample, or every sample, is missing a score
fn proportion_component(n1: usize, n2: usize, m1: usize, m2: usize) -> f64 {
    if (m1 == 0 && m2 == 0) || (m1 == n1 && m2 == n2) {
        return 0.0;
    }
    let (n1, n2, m1, m2) = (
        f64_from_usize(n1),
        f64_from_usize(n2),
        f64_from_usize(m1),
        f64_from_usize(m2),
    );
    let p1 = m1 / n1;
    let p2 = m2 / n2;
    let p = (m1 + m2) / (n1 + n2);
    (p1 - p2) / (p * (1.0 - p) * (n1 + n2) / (n1 * n2)).sqrt()
}

/// Normal approximation of the Wilcoxon rank sum of `a` case and `b` control scores
///
/// Returns `0` if either group has no scores
fn rank_component(rs: f64, a: usize, b: usize) -> f64 {
    if a == 0 || b == 0 {
        return 0.0;
    }
    let (a, b) = (f64_from_usize(a), f64_from_usize(b));
    let expected = a * (a + b + 1.0) / 2.0;
    let variance = a * b * (a + b + 1.0) / 12.0;
    (rs - expected) / variance.sqrt()
}

/// The two-part test results of all genes of a case/control comparison
///
/// The text form has one line per gene, without the p-value:
///
/// ```text
/// #Gene   RS  B   W       X2      n1  n2  m1  m2
/// GBA1    6   0   -1.96   3.857   3   3   0   0
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticMatrix {
    rows: Vec<StatisticRow>,
}

impl StatisticMatrix {
    /// The number of genes
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if there are no results
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the result of the gene
    pub fn get(&self, gene: &str) -> Option<&StatisticRow> {
        self.rows.iter().find(|row| row.gene == gene)
    }

    /// Returns an iterator of all results, in case matrix order
    pub fn iter(&self) -> std::slice::Iter<'_, StatisticRow> {
        self.rows.iter()
    }

    /// Writes the results in their text form, one line at a time
    ///
    /// # Errors
    ///
    /// [`ScoreError::InvalidInput`] if writing fails
    pub fn write<W: Write>(&self, mut writer: W) -> ScoreResult<()> {
        let to_err = |err: std::io::Error| {
            ScoreError::InvalidInput(format!("unable to write statistic matrix: {err}"))
        };
        writeln!(writer, "{HEADER}").map_err(to_err)?;
        for row in &self.rows {
            writeln!(writer, "{}", row.to_line()).map_err(to_err)?;
        }
        Ok(())
    }

    /// Parses stored results, the p-value is recalculated with `pvalue`
    ///
    /// Lines starting with `#` are skipped, invalid lines are skipped with a warning.
    ///
    /// # Errors
    ///
    /// [`ScoreError::InvalidInput`] if the input cannot be read
    pub fn from_reader<R: BufRead, P: PValue>(reader: R, pvalue: &P) -> ScoreResult<Self> {
        let mut rows = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|_| {
                ScoreError::InvalidInput("invalid data in statistic matrix".to_string())
            })?;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            match StatisticRow::from_line(&line, pvalue) {
                Ok(row) => rows.push(row),
                Err(err) => warn!("Skipping line {} of statistic matrix: {}", idx + 1, err),
            }
        }
        Ok(Self { rows })
    }

    /// Parses stored results from disk
    ///
    /// # Errors
    ///
    /// - [`ScoreError::CannotOpenFile`] if the file cannot be opened
    /// - See [`StatisticMatrix::from_reader`]
    pub fn from_path<Q: AsRef<Path>, P: PValue>(path: Q, pvalue: &P) -> ScoreResult<Self> {
        let filename = path.as_ref().display().to_string();
        let file = File::open(path).map_err(|_| ScoreError::CannotOpenFile(filename))?;
        Self::from_reader(BufReader::new(file), pvalue)
    }
}

impl<'a> IntoIterator for &'a StatisticMatrix {
    type Item = &'a StatisticRow;
    type IntoIter = std::slice::Iter<'a, StatisticRow>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<StatisticRow> for StatisticMatrix {
    fn from_iter<I: IntoIterator<Item = StatisticRow>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::GeneScore;

    fn present(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn separated_cohorts() {
        let row = TwoPartTest::new().compute(
            "GBA1",
            &present(&[1.0, 2.0, 3.0]),
            Some(&present(&[4.0, 5.0, 6.0])),
        );
        assert!((row.rs() - 6.0).abs() < f64::EPSILON);
        assert!(row.b().abs() < f64::EPSILON);
        assert!((row.w() - (-4.5 / (63.0f64 / 12.0).sqrt())).abs() < 1e-12);
        assert!((row.w() + 1.963_961).abs() < 1e-6);
        assert!((row.x2() - 20.25 / 5.25).abs() < 1e-12);
        assert!((row.pvalue() - (-row.x2() / 2.0).exp()).abs() < 1e-12);
        assert!((row.pvalue() - 0.145_37).abs() < 1e-4);
        assert_eq!((row.n1(), row.n2(), row.m1(), row.m2()), (3, 3, 0, 0));
    }

    #[test]
    fn ties_use_mid_ranks() {
        let row = TwoPartTest::new().compute(
            "GBA1",
            &present(&[2.0, 2.0]),
            Some(&present(&[3.0, 2.0])),
        );
        // combined [2, 2, 3, 2] => 2 has rank 2
        assert!((row.rs() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn signed_zeros_are_ties() {
        let row = TwoPartTest::new().compute("G", &[Some(0.0)], Some(&[Some(-0.0)]));
        assert!((row.rs() - 1.5).abs() < f64::EPSILON);
        assert!(row.w().abs() < f64::EPSILON);
    }

    #[test]
    fn gene_absent_in_controls() {
        let row = TwoPartTest::new().compute("GBA1", &[Some(0.5), None, Some(0.7), None], None);
        assert_eq!((row.n1(), row.n2(), row.m1(), row.m2()), (4, 4, 2, 4));
        assert!(row.rs().abs() > 0.0);
        assert!(row.w().abs() < f64::EPSILON);
        // p1 = 0.5, p2 = 1, p = 0.75
        let expected_b = -0.5 / (0.75f64 * 0.25 * 8.0 / 16.0).sqrt();
        assert!((row.b() - expected_b).abs() < 1e-12);
        assert!((row.x2() - expected_b * expected_b).abs() < 1e-12);
    }

    #[test]
    fn all_missing_is_degenerate() {
        let row = TwoPartTest::new().compute("GBA1", &[None, None, None], Some(&[None, None, None]));
        assert!(row.rs().abs() < f64::EPSILON);
        assert!(row.b().abs() < f64::EPSILON);
        assert!(row.w().abs() < f64::EPSILON);
        assert!(row.x2().abs() < f64::EPSILON);
        assert!((row.pvalue() - 1.0).abs() < f64::EPSILON);
        assert_eq!((row.m1(), row.m2()), (3, 3));
    }

    #[test]
    fn all_present_has_no_proportion_component() {
        let row = TwoPartTest::new().compute(
            "GBA1",
            &present(&[0.1, 0.2]),
            Some(&present(&[0.1, 0.2])),
        );
        assert!(row.b().abs() < f64::EPSILON);
        assert!(row.w().abs() < 1e-12);
        assert!((row.pvalue() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn short_control_row_is_padded() {
        let short = TwoPartTest::new().compute(
            "GBA1",
            &present(&[0.9, 0.8, 0.7]),
            Some(&[Some(0.1)]),
        );
        let padded = TwoPartTest::new().compute(
            "GBA1",
            &present(&[0.9, 0.8, 0.7]),
            Some(&[Some(0.1), None, None]),
        );
        assert_eq!(short, padded);
        assert_eq!(short.m2(), 2);
    }

    #[test]
    fn long_control_row_is_truncated() {
        let row = TwoPartTest::new().compute(
            "GBA1",
            &[Some(0.9), None],
            Some(&[Some(0.1), None, Some(0.3), Some(0.4)]),
        );
        assert_eq!((row.n2(), row.m2()), (2, 1));
    }

    #[test]
    fn empty_case_row() {
        let row = TwoPartTest::new().compute("GBA1", &[], None);
        assert_eq!((row.n1(), row.n2(), row.m1(), row.m2()), (0, 0, 0, 0));
        assert!(row.x2().abs() < f64::EPSILON);
        assert!(row.pvalue().is_finite());
    }

    #[test]
    fn compare_matrices() {
        let mut case = GeneScoreMatrix::builder();
        case.add_sample("c1", [("A", GeneScore::Value(1.0)), ("B", GeneScore::Value(0.5))]);
        case.add_sample("c2", [("A", GeneScore::Value(2.0))]);
        case.add_sample("c3", [("A", GeneScore::Value(3.0))]);
        let case = case.build();

        let mut control = GeneScoreMatrix::builder();
        control.add_sample("k1", [("A", GeneScore::Value(4.0))]);
        control.add_sample("k2", [("A", GeneScore::Value(5.0))]);
        control.add_sample("k3", [("A", GeneScore::Value(6.0))]);
        let control = control.build();

        let stats = TwoPartTest::new().compare(&case, &control);
        assert_eq!(stats.len(), 2);
        let genes: Vec<&str> = stats.iter().map(StatisticRow::gene).collect();
        assert_eq!(genes, vec!["A", "B"]);
        assert!((stats.get("A").unwrap().x2() - 20.25 / 5.25).abs() < 1e-12);
        assert_eq!(stats.get("B").unwrap().m2(), 3);
    }

    #[test]
    fn custom_pvalue_function() {
        struct Constant;
        impl PValue for Constant {
            fn sf(&self, _: f64) -> f64 {
                0.5
            }
        }
        let row = TwoPartTest::with_pvalue(Constant).compute("A", &[Some(1.0)], None);
        assert!((row.pvalue() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn text_form() {
        let stats: StatisticMatrix = [TwoPartTest::new().compute(
            "GBA1",
            &present(&[1.0, 2.0, 3.0]),
            Some(&present(&[4.0, 5.0, 6.0])),
        )]
        .into_iter()
        .collect();
        let mut out = Vec::new();
        stats.write(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "#Gene\tRS\tB\tW\tX2\tn1\tn2\tm1\tm2");
        let line = lines.next().unwrap();
        assert!(line.starts_with("GBA1\t6\t0\t-1.96"));
        assert!(line.ends_with("\t3\t3\t0\t0"));

        let parsed = StatisticMatrix::from_reader(text.as_bytes(), &ChiSquaredDf2).unwrap();
        assert_eq!(parsed, stats);
    }

    #[test]
    fn parse_skips_invalid_rows() {
        let text = "#Gene\tRS\tB\tW\tX2\tn1\tn2\tm1\tm2\nA\t6\t0\t0\t0\t3\t3\t0\t0\nB\t1\t2\nC\t1\t0\t0\t0\t3\t3\t-1\t0\n";
        let parsed = StatisticMatrix::from_reader(text.as_bytes(), &ChiSquaredDf2).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!((parsed.get("A").unwrap().pvalue() - 1.0).abs() < f64::EPSILON);
    }
}
