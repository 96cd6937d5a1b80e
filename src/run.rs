//! Execution of one complete (frequency, inheritance model) unit of work
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::config::{ColumnLayout, Frequency, InheritanceModel};
use crate::gene::GeneAggregator;
use crate::matrix::GeneScoreMatrix;
use crate::ranking::{GeneRanker, RankedResults};
use crate::stats::pvalue::{ChiSquaredDf2, PValue};
use crate::stats::{StatisticMatrix, TwoPartTest};
use crate::variant::SampleScoreFile;
use crate::{ScoreError, ScoreResult};

/// Settings shared by all units of a run
///
/// # Examples
///
/// ```
/// use genescore::{ColumnLayout, InheritanceModel, RunConfig};
///
/// let config = RunConfig::new(InheritanceModel::Dominant)
///     .with_layout(ColumnLayout::default().with_gene_column(3))
///     .with_split_compound(false);
/// assert_eq!(config.model(), InheritanceModel::Dominant);
/// assert_eq!(config.layout().gene_column(), 3);
/// ```
#[derive(Clone)]
pub struct RunConfig {
    layout: ColumnLayout,
    model: InheritanceModel,
    pvalue: Arc<dyn PValue + Send + Sync>,
    split_compound: bool,
}

impl RunConfig {
    /// Constructs a new `RunConfig` with the default layout and the closed-form p-value
    pub fn new(model: InheritanceModel) -> Self {
        Self {
            layout: ColumnLayout::default(),
            model,
            pvalue: Arc::new(ChiSquaredDf2),
            split_compound: true,
        }
    }

    /// Sets the column layout of the input files
    #[must_use]
    pub fn with_layout(mut self, layout: ColumnLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Sets the inheritance model
    #[must_use]
    pub fn with_model(mut self, model: InheritanceModel) -> Self {
        self.model = model;
        self
    }

    /// Sets the p-value function of the two-part test
    #[must_use]
    pub fn with_pvalue<P: PValue + Send + Sync + 'static>(mut self, pvalue: P) -> Self {
        self.pvalue = Arc::new(pvalue);
        self
    }

    /// Sets whether compound gene names are split for the ranking
    #[must_use]
    pub fn with_split_compound(mut self, split: bool) -> Self {
        self.split_compound = split;
        self
    }

    /// The column layout of the input files
    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    /// The inheritance model
    pub fn model(&self) -> InheritanceModel {
        self.model
    }

    /// Whether compound gene names are split for the ranking
    pub fn split_compound(&self) -> bool {
        self.split_compound
    }
}

impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("layout", &self.layout)
            .field("model", &self.model)
            .field("split_compound", &self.split_compound)
            .finish_non_exhaustive()
    }
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Runs one unit of work for the case and control cohort of a frequency
///
/// Every sample is averaged and scored per gene, both cohorts are merged into
/// gene score matrices, and each case gene is tested against the controls.
/// Units share no state, so several units can run in parallel.
///
/// ```mermaid
/// flowchart LR
///     A[SampleScoreFile] -->|averaged| B[AveragedSample]
///     B -->|GeneAggregator| C[SampleGeneScores]
///     C -->|MatrixBuilder| D[case GeneScoreMatrix]
///     C -->|MatrixBuilder| E[control GeneScoreMatrix]
///     D --> F{TwoPartTest}
///     E --> F
///     F --> G[StatisticMatrix]
///     G -->|GeneRanker| H[RankedResults]
/// ```
///
/// # Errors
///
/// [`ScoreError::InvalidInput`] if the case cohort is empty
///
/// # Examples
///
/// ```
/// use genescore::{run_unit, Frequency, InheritanceModel, RunConfig, SampleScoreFile};
///
/// let header = "#c0\tc1\tc2\tc3\tgene\tc5\ts1\tc7\tc8\ts2\tc10\tc11\tc12\ts3\tc14\ts4\n";
/// let sample = |name: &str, gene: &str, score: &str| {
///     let line = format!("a\tb\tc\td\t{gene}\tf\t{score}\th\ti\t.\tk\tl\tm\t.\to\t.\n");
///     let text = format!("{header}{line}");
///     SampleScoreFile::from_reader(name, text.as_bytes(), &Default::default()).unwrap()
/// };
///
/// let cases = vec![sample("c1", "GBA1", "0.9"), sample("c2", "GBA1", "0.8")];
/// let controls = vec![sample("k1", "KRAS", "0.1"), sample("k2", "GBA1", "0.1")];
///
/// let config = RunConfig::new(InheritanceModel::Dominant);
/// let report = run_unit(Frequency::new(0.05).unwrap(), &cases, &controls, &config).unwrap();
///
/// assert_eq!(report.case_matrix().len(), 1);
/// assert_eq!(report.control_matrix().len(), 2);
/// assert_eq!(report.ranking().position("GBA1"), Some(1));
/// ```
pub fn run_unit(
    frequency: Frequency,
    case: &[SampleScoreFile],
    control: &[SampleScoreFile],
    config: &RunConfig,
) -> ScoreResult<UnitReport> {
    if case.is_empty() {
        return Err(ScoreError::InvalidInput(format!(
            "no case samples for frequency {} under {}",
            frequency, config.model
        )));
    }
    info!(
        "Starting unit {} {}: {} cases, {} controls",
        frequency,
        config.model,
        case.len(),
        control.len()
    );

    let aggregator = GeneAggregator::new(config.model);
    let cohort_matrix = |samples: &[SampleScoreFile]| {
        let mut builder = GeneScoreMatrix::builder();
        for sample in samples {
            let genes = aggregator.aggregate(&sample.averaged(&config.layout));
            builder.add_gene_scores(&genes);
        }
        builder.build()
    };
    let case_matrix = cohort_matrix(case);
    let control_matrix = cohort_matrix(control);

    let test = TwoPartTest::with_pvalue(Arc::clone(&config.pvalue));
    let statistics = test.compare(&case_matrix, &control_matrix);
    let ranking = GeneRanker::new()
        .split_compound(config.split_compound)
        .rank(&statistics);

    info!(
        "Finished unit {} {}: {} genes tested",
        frequency,
        config.model,
        statistics.len()
    );
    Ok(UnitReport {
        frequency,
        model: config.model,
        case_matrix,
        control_matrix,
        statistics,
        ranking,
    })
}

/// All results of one unit of work
#[derive(Debug, Clone)]
pub struct UnitReport {
    frequency: Frequency,
    model: InheritanceModel,
    case_matrix: GeneScoreMatrix,
    control_matrix: GeneScoreMatrix,
    statistics: StatisticMatrix,
    ranking: RankedResults,
}

impl UnitReport {
    /// The variant frequency of the unit
    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// The inheritance model of the unit
    pub fn model(&self) -> InheritanceModel {
        self.model
    }

    /// The gene score matrix of the cases
    pub fn case_matrix(&self) -> &GeneScoreMatrix {
        &self.case_matrix
    }

    /// The gene score matrix of the controls
    pub fn control_matrix(&self) -> &GeneScoreMatrix {
        &self.control_matrix
    }

    /// The two-part test result of every case gene
    pub fn statistics(&self) -> &StatisticMatrix {
        &self.statistics
    }

    /// The genes by ascending p-value
    pub fn ranking(&self) -> &RankedResults {
        &self.ranking
    }

    /// File name of the case gene score matrix, e.g. `case_dominant_model.geneScoreMatrix`
    pub fn case_matrix_file_name(&self) -> String {
        format!("case_{}.geneScoreMatrix", self.model)
    }

    /// File name of the control gene score matrix
    pub fn control_matrix_file_name(&self) -> String {
        format!("control_{}.geneScoreMatrix", self.model)
    }

    /// File name of the statistic matrix, e.g. `dominant_model.statisticMatrix`
    pub fn statistics_file_name(&self) -> String {
        format!("{}.statisticMatrix", self.model)
    }

    /// File name of the ranking, e.g. `5%_dominant_model.txt`
    pub fn ranking_file_name(&self) -> String {
        format!("{}_{}.txt", self.frequency.label(), self.model)
    }

    /// Writes all outputs into `dir`
    ///
    /// The matrices and statistics go into a sub-directory named by the
    /// frequency label, the ranking into `dir` itself. Returns the paths of
    /// all written files.
    ///
    /// # Errors
    ///
    /// - [`ScoreError::CannotOpenFile`] if a directory or file cannot be created
    /// - [`ScoreError::InvalidInput`] if writing fails
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> ScoreResult<Vec<PathBuf>> {
        let dir = dir.as_ref();
        let unit_dir = dir.join(self.frequency.label());
        fs::create_dir_all(&unit_dir)
            .map_err(|_| ScoreError::CannotOpenFile(unit_dir.display().to_string()))?;

        let case_path = unit_dir.join(self.case_matrix_file_name());
        self.case_matrix.write(create(&case_path)?)?;

        let control_path = unit_dir.join(self.control_matrix_file_name());
        self.control_matrix.write(create(&control_path)?)?;

        let statistics_path = unit_dir.join(self.statistics_file_name());
        self.statistics.write(create(&statistics_path)?)?;

        let ranking_path = dir.join(self.ranking_file_name());
        self.ranking.write(create(&ranking_path)?)?;

        info!("Saved unit {} {} to {}", self.frequency, self.model, dir.display());
        Ok(vec![case_path, control_path, statistics_path, ranking_path])
    }
}

fn create(path: &Path) -> ScoreResult<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|_| ScoreError::CannotOpenFile(path.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::pvalue::StatrsChiSquared;

    const HEADER: &str = "#c0\tc1\tc2\tc3\tgene\tc5\ts1\tc7\tc8\ts2\tc10\tc11\tc12\ts3\tc14\ts4";

    fn sample(name: &str, variants: &[(&str, &str)]) -> SampleScoreFile {
        let mut text = format!("{HEADER}\n");
        for (gene, score) in variants {
            text.push_str(&format!(
                "a\tb\tc\td\t{gene}\tf\t{score}\th\ti\t{score}\tk\tl\tm\t.\to\t.\n"
            ));
        }
        SampleScoreFile::from_reader(name, text.as_bytes(), &ColumnLayout::default()).unwrap()
    }

    fn cohorts() -> (Vec<SampleScoreFile>, Vec<SampleScoreFile>) {
        let cases = vec![
            sample("c1", &[("GBA1", "0.9"), ("GBA1", "0.7"), ("KRAS", "0.2")]),
            sample("c2", &[("GBA1", "0.8"), ("GBA1", "0.6")]),
            sample("c3", &[("GBA1", "0.95"), ("GBA1", "0.9"), ("TP53", "0.3")]),
        ];
        let controls = vec![
            sample("k1", &[("KRAS", "0.3"), ("KRAS", "0.2")]),
            sample("k2", &[("GBA1", "0.1")]),
            sample("k3", &[("TP53", "0.1"), ("TP53", "0.4")]),
        ];
        (cases, controls)
    }

    #[test]
    fn dominant_unit() {
        let (cases, controls) = cohorts();
        let config = RunConfig::new(InheritanceModel::Dominant);
        let report = run_unit(Frequency::new(0.1).unwrap(), &cases, &controls, &config).unwrap();

        assert_eq!(report.case_matrix().genes(), &["GBA1", "KRAS", "TP53"]);
        assert_eq!(report.case_matrix().n_samples(), 3);
        assert_eq!(report.control_matrix().n_samples(), 3);
        assert_eq!(
            report.case_matrix().row("GBA1").unwrap(),
            &[Some(0.9), Some(0.8), Some(0.95)]
        );
        assert_eq!(report.statistics().len(), 3);
        assert_eq!(report.ranking().position("GBA1"), Some(1));
        assert_eq!(report.ranking_file_name(), "10%_dominant_model.txt");
    }

    #[test]
    fn recessive_unit() {
        let (cases, controls) = cohorts();
        let config = RunConfig::new(InheritanceModel::Recessive);
        let report = run_unit(Frequency::new(0.1).unwrap(), &cases, &controls, &config).unwrap();

        let gba1 = report.case_matrix().row("GBA1").unwrap();
        assert!((gba1[0].unwrap() - 1.6).abs() < 1e-9);
        assert!((gba1[1].unwrap() - 1.4).abs() < 1e-9);
        assert!((gba1[2].unwrap() - 1.85).abs() < 1e-9);
        assert_eq!(report.case_matrix().row("KRAS").unwrap(), &[None::<f64>, None, None]);

        let gba1 = report.statistics().get("GBA1").unwrap();
        assert_eq!((gba1.m1(), gba1.m2()), (0, 3));
        assert_eq!(report.case_matrix_file_name(), "case_recessive_model.geneScoreMatrix");
        assert_eq!(report.statistics_file_name(), "recessive_model.statisticMatrix");
    }

    #[test]
    fn custom_pvalue_function() {
        let (cases, controls) = cohorts();
        let closed = run_unit(
            Frequency::new(0.1).unwrap(),
            &cases,
            &controls,
            &RunConfig::new(InheritanceModel::Dominant),
        )
        .unwrap();
        let statrs = run_unit(
            Frequency::new(0.1).unwrap(),
            &cases,
            &controls,
            &RunConfig::new(InheritanceModel::Dominant)
                .with_pvalue(StatrsChiSquared::new(2.0).unwrap()),
        )
        .unwrap();
        for (a, b) in closed.ranking().iter().zip(statrs.ranking().iter()) {
            assert_eq!(a.gene(), b.gene());
            assert!((a.pvalue() - b.pvalue()).abs() < 1e-9);
        }
    }

    #[test]
    fn empty_cases() {
        let (_, controls) = cohorts();
        let config = RunConfig::new(InheritanceModel::Dominant);
        let err = run_unit(Frequency::new(0.1).unwrap(), &[], &controls, &config).unwrap_err();
        assert!(err.to_string().contains("10%"));
        assert!(err.to_string().contains("dominant_model"));
    }

    #[test]
    fn empty_controls() {
        let (cases, _) = cohorts();
        let config = RunConfig::new(InheritanceModel::Dominant);
        let report = run_unit(Frequency::new(0.1).unwrap(), &cases, &[], &config).unwrap();
        assert!(report.control_matrix().is_empty());
        let gba1 = report.statistics().get("GBA1").unwrap();
        assert_eq!((gba1.n2(), gba1.m2()), (3, 3));
    }
}
