use std::io::{self, BufWriter};
use std::process;

use genescore::stats::pvalue::{ChiSquaredDf2, PValue, StatrsChiSquared};
use genescore::{GeneRanker, StatisticMatrix};

/// Re-ranks a stored statistic matrix and prints the ranking to stdout
fn rank<P: PValue>(path: &str, pvalue: &P, top: usize) {
    let statistics = StatisticMatrix::from_path(path, pvalue).unwrap();
    let ranking = GeneRanker::new().rank(&statistics);
    eprintln!("{} genes in {}", ranking.len(), path);

    let top: genescore::RankedResults = ranking.into_iter().take(top).collect();
    top.write(BufWriter::new(io::stdout().lock())).unwrap();
}

fn main() {
    simple_logger::init_with_env().unwrap();

    let mut args = std::env::args();
    if args.len() < 2 {
        println!("Rank the genes of a statistic matrix by p-value\n\n");
        println!("Usage\nrank_statistics <STATISTIC MATRIX> [N RESULTS] [DEGREES OF FREEDOM]");
        println!("\nrank_statistics results/10%/recessive_model.statisticMatrix 20\n");
        process::exit(1)
    }
    let path = args.nth(1).unwrap();
    let top = args
        .next()
        .map(|arg| arg.parse::<usize>().unwrap_or(10))
        .unwrap_or(10);

    match args.next().map(|arg| arg.parse::<f64>().unwrap()) {
        Some(freedom) => rank(&path, &StatrsChiSquared::new(freedom).unwrap(), top),
        None => rank(&path, &ChiSquaredDf2, top),
    }
}
