//! Ordering of the test results by significance
use std::io::Write;

use crate::stats::StatisticRow;
use crate::{ScoreError, ScoreResult};

/// A gene and the p-value of its two-part test
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    gene: String,
    pvalue: f64,
}

impl RankedResult {
    /// Constructs a new `RankedResult`
    pub fn new<S: Into<String>>(gene: S, pvalue: f64) -> Self {
        Self {
            gene: gene.into(),
            pvalue,
        }
    }

    /// The gene name
    pub fn gene(&self) -> &str {
        &self.gene
    }

    /// The p-value
    pub fn pvalue(&self) -> f64 {
        self.pvalue
    }
}

/// Genes ordered by ascending p-value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedResults {
    results: Vec<RankedResult>,
}

impl RankedResults {
    /// Returns the result at 0-based position `idx`
    pub fn get(&self, idx: usize) -> Option<&RankedResult> {
        self.results.get(idx)
    }

    /// Returns an iterator of the results, most significant first
    pub fn iter(&self) -> std::slice::Iter<'_, RankedResult> {
        self.results.iter()
    }

    /// The number of ranked genes
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns `true` if there are no results
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Returns the 1-based rank of the gene
    ///
    /// Used to check at which position a known disease gene was recovered.
    ///
    /// # Examples
    ///
    /// ```
    /// use genescore::{RankedResult, RankedResults};
    ///
    /// let ranking: RankedResults = vec![
    ///     RankedResult::new("GBA1", 0.01),
    ///     RankedResult::new("KRAS", 0.2),
    /// ]
    /// .into_iter()
    /// .collect();
    ///
    /// assert_eq!(ranking.position("KRAS"), Some(2));
    /// assert_eq!(ranking.position("TP53"), None);
    /// ```
    pub fn position(&self, gene: &str) -> Option<usize> {
        self.results
            .iter()
            .position(|result| result.gene == gene)
            .map(|idx| idx + 1)
    }

    /// Writes the ranking as `gene<TAB>p-value` lines
    ///
    /// # Errors
    ///
    /// [`ScoreError::InvalidInput`] if writing fails
    pub fn write<W: Write>(&self, mut writer: W) -> ScoreResult<()> {
        let to_err =
            |err: std::io::Error| ScoreError::InvalidInput(format!("unable to write ranking: {err}"));
        writeln!(writer, "#Gene\tp-value").map_err(to_err)?;
        for result in &self.results {
            writeln!(writer, "{}\t{:e}", result.gene, result.pvalue).map_err(to_err)?;
        }
        Ok(())
    }
}

impl FromIterator<RankedResult> for RankedResults {
    fn from_iter<I: IntoIterator<Item = RankedResult>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RankedResults {
    type Item = &'a RankedResult;
    type IntoIter = std::slice::Iter<'a, RankedResult>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for RankedResults {
    type Item = RankedResult;
    type IntoIter = std::vec::IntoIter<RankedResult>;
    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

/// Orders the test results of all genes by ascending p-value
///
/// Gene names can contain several genes joined by `;`, e.g. for variants
/// in overlapping genes. By default such names are split and every gene
/// is ranked on its own with the p-value of the compound name.
///
/// # Examples
///
/// ```
/// use genescore::{GeneRanker, TwoPartTest};
///
/// let test = TwoPartTest::new();
/// let rows = vec![
///     test.compute("A", &[Some(1.0), None], Some(&[None, None])),
///     test.compute("B;C", &[Some(1.0), Some(2.0)], Some(&[None, None])),
/// ];
///
/// let ranking = GeneRanker::new().rank(&rows);
/// let genes: Vec<&str> = ranking.iter().map(|r| r.gene()).collect();
/// assert_eq!(genes, vec!["B", "C", "A"]);
///
/// let ranking = GeneRanker::new().split_compound(false).rank(&rows);
/// assert_eq!(ranking.get(0).unwrap().gene(), "B;C");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneRanker {
    split_compound: bool,
}

impl Default for GeneRanker {
    fn default() -> Self {
        Self {
            split_compound: true,
        }
    }
}

impl GeneRanker {
    /// Constructs a new `GeneRanker` that splits compound gene names
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether compound gene names are split on `;`
    #[must_use]
    pub fn split_compound(mut self, split: bool) -> Self {
        self.split_compound = split;
        self
    }

    /// Ranks the results by ascending p-value
    ///
    /// The sort is stable, genes with equal p-values keep their input order.
    pub fn rank<'a, I>(&self, rows: I) -> RankedResults
    where
        I: IntoIterator<Item = &'a StatisticRow>,
    {
        let mut results: Vec<RankedResult> = Vec::new();
        for row in rows {
            if self.split_compound {
                results.extend(
                    row.gene()
                        .split(';')
                        .map(str::trim)
                        .filter(|gene| !gene.is_empty())
                        .map(|gene| RankedResult::new(gene, row.pvalue())),
                );
            } else {
                results.push(RankedResult::new(row.gene(), row.pvalue()));
            }
        }
        results.sort_by(|a, b| a.pvalue.total_cmp(&b.pvalue));
        RankedResults { results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::pvalue::PValue;
    use crate::stats::TwoPartTest;

    /// Returns the statistic itself as p-value
    struct Identity;
    impl PValue for Identity {
        fn sf(&self, statistic: f64) -> f64 {
            statistic
        }
    }

    /// A row with `X2 = B²`, with `missing` of 4 cases missing and all controls missing
    fn row(gene: &str, missing: usize) -> StatisticRow {
        let case: Vec<Option<f64>> = (0..4)
            .map(|idx| if idx < missing { None } else { Some(1.0) })
            .collect();
        TwoPartTest::with_pvalue(Identity).compute(gene, &case, None)
    }

    #[test]
    fn ascending_pvalues() {
        let rows = vec![row("A", 3), row("B", 0), row("C", 1)];
        let ranking = GeneRanker::new().rank(&rows);
        let genes: Vec<&str> = ranking.iter().map(RankedResult::gene).collect();
        assert_eq!(genes, vec!["A", "C", "B"]);
        assert_eq!(ranking.position("B"), Some(3));
    }

    #[test]
    fn ties_keep_input_order() {
        let rows = vec![row("B", 2), row("A", 2), row("C", 2)];
        let ranking = GeneRanker::new().rank(&rows);
        let genes: Vec<&str> = ranking.iter().map(RankedResult::gene).collect();
        assert_eq!(genes, vec!["B", "A", "C"]);
    }

    /// Maps the statistics of `row` with 3, 1 and 0 missing cases to 0.3, 0.2 and 0.01
    struct Lookup;
    impl PValue for Lookup {
        fn sf(&self, statistic: f64) -> f64 {
            if statistic < 2.0 {
                0.3
            } else if statistic < 6.0 {
                0.2
            } else {
                0.01
            }
        }
    }

    #[test]
    fn explicit_pvalues() {
        let case = |missing: usize| -> Vec<Option<f64>> {
            (0..4)
                .map(|idx| if idx < missing { None } else { Some(1.0) })
                .collect()
        };
        let test = TwoPartTest::with_pvalue(Lookup);
        let rows = vec![
            test.compute("A", &case(3), None),
            test.compute("B", &case(0), None),
            test.compute("C", &case(1), None),
        ];
        let pvalues: Vec<f64> = rows.iter().map(StatisticRow::pvalue).collect();
        assert_eq!(pvalues, vec![0.3, 0.01, 0.2]);

        let ranking = GeneRanker::new().rank(&rows);
        let genes: Vec<&str> = ranking.iter().map(RankedResult::gene).collect();
        assert_eq!(genes, vec!["B", "C", "A"]);
        let pvalues: Vec<f64> = ranking.iter().map(RankedResult::pvalue).collect();
        assert_eq!(pvalues, vec![0.01, 0.2, 0.3]);
    }

    #[test]
    fn compound_names_share_pvalue() {
        let rows = vec![row("A", 1), row("B; C;", 3)];
        let ranking = GeneRanker::new().rank(&rows);
        assert_eq!(ranking.len(), 3);
        assert_eq!(ranking.position("B"), Some(1));
        assert_eq!(ranking.position("C"), Some(2));
        assert_eq!(ranking.position("A"), Some(3));
        assert_eq!(ranking.get(0).unwrap().pvalue(), ranking.get(1).unwrap().pvalue());

        let ranking = GeneRanker::new().split_compound(false).rank(&rows);
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking.position("B; C;"), Some(1));
    }

    #[test]
    fn empty_input() {
        let ranking = GeneRanker::new().rank(&Vec::<StatisticRow>::new());
        assert!(ranking.is_empty());
        assert!(ranking.get(0).is_none());
    }

    #[test]
    fn text_form() {
        let ranking: RankedResults = [RankedResult::new("GBA1", 0.000_12)].into_iter().collect();
        let mut out = Vec::new();
        ranking.write(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "#Gene\tp-value\nGBA1\t1.2e-4\n");
    }
}
