//! Tie-corrected ranks and the Wilcoxon rank sum
use crate::utils::f64_from_usize;

/// Returns the 1-based mid-rank of every value
///
/// Equal values receive the average of the positions they occupy
/// in the ascending order. The ranks are returned in input order.
///
/// # Examples
///
/// ```
/// use genescore::stats::mid_ranks;
///
/// assert_eq!(mid_ranks(&[3.0, 2.0, 2.0]), vec![3.0, 1.5, 1.5]);
/// ```
pub fn mid_ranks(values: &[f64]) -> Vec<f64> {
    let mut indexed: Vec<(usize, f64)> = values.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| a.1.total_cmp(&b.1));

    let n = indexed.len();
    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        // -0.0 and 0.0 form one tie group
        while j < n && indexed[j].1 == indexed[i].1 {
            j += 1;
        }
        // positions i+1 ..= j share the average rank
        let rank = f64_from_usize(i + j + 1) / 2.0;
        for (idx, _) in &indexed[i..j] {
            ranks[*idx] = rank;
        }
        i = j;
    }
    ranks
}

/// Returns the sum of the mid-ranks of the `case` values within `case` and `control`
///
/// Returns `0` if both groups are empty.
///
/// # Examples
///
/// ```
/// use genescore::stats::rank_sum;
///
/// assert_eq!(rank_sum(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), 6.0);
/// assert_eq!(rank_sum(&[2.0], &[2.0, 3.0]), 1.5);
/// ```
pub fn rank_sum(case: &[f64], control: &[f64]) -> f64 {
    if case.is_empty() && control.is_empty() {
        return 0.0;
    }
    let combined: Vec<f64> = case.iter().chain(control.iter()).copied().collect();
    mid_ranks(&combined).iter().take(case.len()).sum()
}
