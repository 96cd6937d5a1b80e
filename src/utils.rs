//! Utility methods
use std::path::Path;

/// Derives the sample name from a file name
///
/// The sample name is everything up to the first `.` of the file name,
/// so `S01.score.out.avgScore` and `S01.genescore` both belong to `S01`.
///
/// # Examples
///
/// ```
/// use genescore::sample_name;
///
/// assert_eq!(sample_name("/data/case/2%/S01.score.out.avgScore"), "S01");
/// assert_eq!(sample_name("S02"), "S02");
/// ```
pub fn sample_name<P: AsRef<Path>>(path: P) -> String {
    let file_name = path
        .as_ref()
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    match file_name.split_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => file_name,
    }
}

/// We frequently divide counts of samples and need `f64` values.
/// Sample counts never come close to `u32::MAX`, so this method
/// panics in case of overflows instead of silently losing precision.
pub(crate) fn f64_from_usize(n: usize) -> f64 {
    let intermediate: u32 = n
        .try_into()
        .expect("cannot safely create f64 from large usize");
    intermediate.into()
}
