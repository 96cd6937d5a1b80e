use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use rayon::prelude::*;

use genescore::{
    run_unit, ColumnLayout, Frequency, InheritanceModel, RunConfig, SampleScoreFile,
};

/// Reads every score file of a directory, in file name order
fn read_cohort(dir: &Path, layout: &ColumnLayout) -> Vec<SampleScoreFile> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();
    paths
        .iter()
        .map(|path| SampleScoreFile::from_path(path, layout).unwrap())
        .collect()
}

fn main() {
    simple_logger::init_with_env().unwrap();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 5 {
        println!("Score, compare and rank all genes for every variant frequency\n\n");
        println!("Usage\nrun_units <CASE DIR> <CONTROL DIR> <FREQUENCY FILE> <OUTPUT DIR> [MODEL] [TARGET GENE]");
        println!("\n<CASE DIR> contains one sub-directory per frequency, e.g. `5%`");
        println!("\nrun_units cases/ controls/ frequencies.txt results/ dominant_model GBA1\n");
        process::exit(1)
    }
    let case_root = Path::new(&args[1]);
    let control_dir = Path::new(&args[2]);
    let frequencies =
        Frequency::parse_list(&fs::read_to_string(&args[3]).unwrap()).unwrap();
    let out_dir = Path::new(&args[4]);
    let model: InheritanceModel = args
        .get(5)
        .map_or("recessive_model", String::as_str)
        .parse()
        .unwrap();
    let target = args.get(6).cloned();

    let config = RunConfig::new(model);
    let controls = read_cohort(control_dir, config.layout());

    let positions: Vec<(String, usize, Option<usize>)> = frequencies
        .par_iter()
        .map(|frequency| {
            let cases = read_cohort(&case_root.join(frequency.label()), config.layout());
            let report = run_unit(*frequency, &cases, &controls, &config).unwrap();
            report.save(out_dir).unwrap();
            let position = target
                .as_ref()
                .and_then(|gene| report.ranking().position(gene));
            (frequency.label(), report.ranking().len(), position)
        })
        .collect();

    for (label, genes, position) in positions {
        match (&target, position) {
            (Some(gene), Some(rank)) => println!("{label}\t{genes} genes\t{gene} at {rank}"),
            (Some(gene), None) => println!("{label}\t{genes} genes\t{gene} not ranked"),
            (None, _) => println!("{label}\t{genes} genes"),
        }
    }
}
