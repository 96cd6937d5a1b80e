//! Survival functions to turn a test statistic into a p-value
//!
//! The combined two-part statistic follows a chi-square distribution with
//! two degrees of freedom under the null hypothesis. Its survival function has
//! the closed form `exp(-x / 2)`, so no numerical library is needed for the
//! default case. Other distributions can be plugged in by implementing [`PValue`].
use std::sync::Arc;

use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::{ScoreError, ScoreResult};

/// Trait for the upper-tail probability of a test statistic
pub trait PValue {
    /// Returns `P(X >= statistic)` under the null distribution
    fn sf(&self, statistic: f64) -> f64;
}

/// Chi-square survival function with two degrees of freedom
///
/// # Examples
///
/// ```
/// use genescore::stats::pvalue::{ChiSquaredDf2, PValue};
///
/// let p = ChiSquaredDf2.sf(3.858);
/// assert!((p - 0.1453).abs() < 1e-3);
/// assert!((ChiSquaredDf2.sf(0.0) - 1.0).abs() < f64::EPSILON);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChiSquaredDf2;

impl PValue for ChiSquaredDf2 {
    fn sf(&self, statistic: f64) -> f64 {
        if statistic <= 0.0 {
            return 1.0;
        }
        (-statistic / 2.0).exp()
    }
}

/// Chi-square survival function with arbitrary degrees of freedom
///
/// Uses the chi-square distribution of `statrs`
///
/// # Examples
///
/// ```
/// use genescore::stats::pvalue::{ChiSquaredDf2, PValue, StatrsChiSquared};
///
/// let df2 = StatrsChiSquared::new(2.0).unwrap();
/// assert!((df2.sf(3.858) - ChiSquaredDf2.sf(3.858)).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatrsChiSquared {
    distribution: ChiSquared,
}

impl StatrsChiSquared {
    /// Constructs a chi-square distribution with `freedom` degrees of freedom
    ///
    /// # Errors
    ///
    /// [`ScoreError::InvalidInput`] if `freedom` is not positive
    pub fn new(freedom: f64) -> ScoreResult<Self> {
        ChiSquared::new(freedom)
            .map(|distribution| Self { distribution })
            .map_err(|err| {
                ScoreError::InvalidInput(format!("invalid degrees of freedom {freedom}: {err}"))
            })
    }

    /// The degrees of freedom of the distribution
    pub fn freedom(&self) -> f64 {
        self.distribution.freedom()
    }
}

impl PValue for StatrsChiSquared {
    fn sf(&self, statistic: f64) -> f64 {
        if statistic <= 0.0 {
            return 1.0;
        }
        self.distribution.sf(statistic)
    }
}

impl<T: PValue + ?Sized> PValue for &T {
    fn sf(&self, statistic: f64) -> f64 {
        (**self).sf(statistic)
    }
}

impl<T: PValue + ?Sized> PValue for Arc<T> {
    fn sf(&self, statistic: f64) -> f64 {
        (**self).sf(statistic)
    }
}

impl<T: PValue + ?Sized> PValue for Box<T> {
    fn sf(&self, statistic: f64) -> f64 {
        (**self).sf(statistic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_form_values() {
        assert!((ChiSquaredDf2.sf(2.0) - (-1.0f64).exp()).abs() < 1e-12);
        assert!((ChiSquaredDf2.sf(13.815_510_557_964_274) - 0.001).abs() < 1e-9);
        assert!((ChiSquaredDf2.sf(-1.0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn statrs_matches_closed_form() {
        let df2 = StatrsChiSquared::new(2.0).unwrap();
        for x in [0.1, 1.0, 3.858, 10.0, 25.0] {
            assert!((df2.sf(x) - ChiSquaredDf2.sf(x)).abs() < 1e-9, "x = {x}");
        }
        assert!((df2.freedom() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn statrs_other_freedom() {
        let df1 = StatrsChiSquared::new(1.0).unwrap();
        // P(X >= 3.841) for one degree of freedom is 0.05
        assert!((df1.sf(3.841_458_820_694_124) - 0.05).abs() < 1e-6);
        assert!(StatrsChiSquared::new(0.0).is_err());
        assert!(StatrsChiSquared::new(-1.0).is_err());
    }

    #[test]
    fn dynamic_dispatch() {
        let functions: Vec<Box<dyn PValue>> = vec![
            Box::new(ChiSquaredDf2),
            Box::new(StatrsChiSquared::new(2.0).unwrap()),
        ];
        for f in &functions {
            assert!((f.sf(2.0) - (-1.0f64).exp()).abs() < 1e-9);
        }
        let shared: Arc<dyn PValue> = Arc::new(ChiSquaredDf2);
        assert!((shared.sf(0.0) - 1.0).abs() < f64::EPSILON);
    }
}
