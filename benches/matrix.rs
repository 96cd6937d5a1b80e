use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rayon::prelude::*;

use genescore::{AveragedSample, GeneAggregator, GeneScoreMatrix, InheritanceModel, SampleGeneScores, Score};

const N_SAMPLES: usize = 200;
const N_GENES: usize = 1_000;

/// Three variants per gene, every fifth variant without a score
fn averaged_sample(idx: usize) -> AveragedSample {
    let variants: Vec<(String, Score)> = (0..N_GENES * 3)
        .map(|variant| {
            let gene = format!("GENE{}", (variant * 31 + idx) % N_GENES);
            let score = if (variant + idx) % 5 == 0 {
                Score::Missing
            } else {
                Score::Value(((variant * 17 + idx) % 100) as f64 / 100.0)
            };
            (gene, score)
        })
        .collect();
    AveragedSample::new(&format!("S{idx}"), variants)
}

fn gene_scores(samples: &[AveragedSample], model: InheritanceModel) -> Vec<SampleGeneScores> {
    let aggregator = GeneAggregator::new(model);
    samples.iter().map(|sample| aggregator.aggregate(sample)).collect()
}

fn gene_scores_parallel(samples: &[AveragedSample], model: InheritanceModel) -> Vec<SampleGeneScores> {
    let aggregator = GeneAggregator::new(model);
    samples.par_iter().map(|sample| aggregator.aggregate(sample)).collect()
}

fn aggregate_benchmark(c: &mut Criterion) {
    let samples: Vec<AveragedSample> = (0..N_SAMPLES).map(averaged_sample).collect();

    c.bench_function("recessive 200 samples", |b| {
        b.iter(|| gene_scores(black_box(&samples), InheritanceModel::Recessive))
    });

    c.bench_function("recessive-parallel 200 samples", |b| {
        b.iter(|| gene_scores_parallel(black_box(&samples), InheritanceModel::Recessive))
    });
}

fn matrix_benchmark(c: &mut Criterion) {
    let samples: Vec<AveragedSample> = (0..N_SAMPLES).map(averaged_sample).collect();
    let genes = gene_scores(&samples, InheritanceModel::Dominant);

    c.bench_function("build matrix", |b| {
        b.iter(|| GeneScoreMatrix::from_gene_scores(black_box(&genes)))
    });

    let matrix = GeneScoreMatrix::from_gene_scores(&genes);
    let mut text = Vec::new();
    matrix.write(&mut text).unwrap();

    c.bench_function("parse matrix", |b| {
        b.iter(|| GeneScoreMatrix::from_reader(black_box(text.as_slice())).unwrap())
    });
}

criterion_group!(matrix, aggregate_benchmark, matrix_benchmark);
criterion_main!(matrix);
