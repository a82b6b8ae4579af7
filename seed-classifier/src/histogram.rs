use itertools::Itertools;
use ndarray_stats::histogram::{Bins, Edges};
use noisy_float::types::N64;
use seed_validation_common::Real;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq)]
pub enum HistogramError {
    #[error("Histogram {0} needs at least two strictly increasing edges")]
    InvalidEdges(String),
    #[error("Histograms {0} and {1} have different bin edges")]
    IncompatibleBinning(String, String),
    #[error("Histogram family {family} has no category {category}, it has {len}")]
    UnknownCategory {
        family: String,
        category: usize,
        len: usize,
    },
    #[error("Histogram family {family} needs at least one category")]
    EmptyFamily { family: String },
}

/// One bin of a histogram, or of a ratio of two histograms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bin {
    pub low: Real,
    pub high: Real,
    pub value: Real,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinLocation {
    Underflow,
    Bin(usize),
    Overflow,
}

/// A one dimensional histogram with fixed edges.
///
/// Bins include their lower edge and exclude their upper edge, so a value equal
/// to the last edge goes to the overflow. Contents only ever grow.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    name: String,
    bins: Bins<N64>,
    values: Vec<Real>,
    underflow: Real,
    overflow: Real,
    entries: u64,
}

impl Histogram {
    /// The edges must be strictly increasing and not NaN.
    pub fn new(name: impl Into<String>, edges: Vec<Real>) -> Result<Self, HistogramError> {
        let name = name.into();
        if edges.len() < 2 || !edges.iter().tuple_windows().all(|(low, high)| low < high) {
            return Err(HistogramError::InvalidEdges(name));
        }
        let Some(edges) = edges.into_iter().map(N64::try_new).collect::<Option<Vec<_>>>() else {
            return Err(HistogramError::InvalidEdges(name));
        };
        let bins = Bins::new(Edges::from(edges));
        Ok(Self {
            name,
            values: vec![0.0; bins.len()],
            bins,
            underflow: 0.0,
            overflow: 0.0,
            entries: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Real] {
        &self.values
    }

    pub fn value(&self, bin: usize) -> Option<Real> {
        self.values.get(bin).copied()
    }

    pub fn underflow(&self) -> Real {
        self.underflow
    }

    pub fn overflow(&self) -> Real {
        self.overflow
    }

    /// Number of fills, whatever their weight.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Sum of the in-range bins.
    pub fn integral(&self) -> Real {
        self.values.iter().sum()
    }

    /// NaN values land in the underflow.
    pub fn find_bin(&self, value: Real) -> BinLocation {
        let Some(value) = N64::try_new(value) else {
            return BinLocation::Underflow;
        };
        match self.bins.index_of(&value) {
            Some(bin) => BinLocation::Bin(bin),
            None if value < self.bins.index(0).start => BinLocation::Underflow,
            None => BinLocation::Overflow,
        }
    }

    pub fn fill(&mut self, value: Real) {
        self.fill_weighted(value, 1.0)
    }

    /// Adds `weight` to the bin containing `value`.
    /// Negative and NaN weights are refused, as they would decrement the contents.
    pub fn fill_weighted(&mut self, value: Real, weight: Real) {
        if weight.is_nan() || weight < 0.0 {
            warn!("Refusing weight {weight} for histogram {}", self.name);
            return;
        }
        self.entries += 1;
        let slot = match self.find_bin(value) {
            BinLocation::Underflow => &mut self.underflow,
            BinLocation::Overflow => &mut self.overflow,
            BinLocation::Bin(bin) => match self.values.get_mut(bin) {
                Some(slot) => slot,
                None => return,
            },
        };
        *slot += weight;
    }

    /// Iterates over the `(low, high, value)` triples in edge order.
    pub fn bins(&self) -> impl Iterator<Item = Bin> + '_ {
        self.values.iter().enumerate().map(|(bin, &value)| {
            let range = self.bins.index(bin);
            Bin {
                low: range.start.raw(),
                high: range.end.raw(),
                value,
            }
        })
    }

    fn check_binning(&self, other: &Histogram) -> Result<(), HistogramError> {
        if self.bins == other.bins {
            Ok(())
        } else {
            Err(HistogramError::IncompatibleBinning(
                self.name.clone(),
                other.name.clone(),
            ))
        }
    }

    /// Adds the contents of `other`, which must have the same edges.
    pub fn merge(&mut self, other: &Histogram) -> Result<(), HistogramError> {
        self.check_binning(other)?;
        for (value, other) in self.values.iter_mut().zip(&other.values) {
            *value += other;
        }
        self.underflow += other.underflow;
        self.overflow += other.overflow;
        self.entries += other.entries;
        Ok(())
    }

    /// Divides this histogram bin by bin by `denominator`.
    /// Bins with an empty denominator have an undefined (NaN) ratio.
    pub fn ratio(&self, denominator: &Histogram) -> Result<Vec<Bin>, HistogramError> {
        self.check_binning(denominator)?;
        Ok(self
            .bins()
            .zip(&denominator.values)
            .map(|(bin, &denominator)| Bin {
                value: if denominator == 0.0 {
                    Real::NAN
                } else {
                    bin.value / denominator
                },
                ..bin
            })
            .collect())
    }

    /// Fraction of the integral of `total` held by this histogram, NaN if `total` is empty.
    pub fn share_of(&self, total: &Histogram) -> Real {
        let total = total.integral();
        if total == 0.0 {
            Real::NAN
        } else {
            self.integral() / total
        }
    }
}

/// Histograms with common edges, one per category, addressed by category index.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramFamily {
    name: String,
    histograms: Vec<Histogram>,
}

impl HistogramFamily {
    /// Creates one histogram named `<name>_<label>` per label.
    pub fn new<S: AsRef<str>>(
        name: &str,
        labels: &[S],
        edges: &[Real],
    ) -> Result<Self, HistogramError> {
        if labels.is_empty() {
            return Err(HistogramError::EmptyFamily {
                family: name.to_owned(),
            });
        }
        let histograms = labels
            .iter()
            .map(|label| Histogram::new(format!("{name}_{}", label.as_ref()), edges.to_vec()))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            name: name.to_owned(),
            histograms,
        })
    }

    pub fn get(&self, category: usize) -> Option<&Histogram> {
        self.histograms.get(category)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Histogram> + '_ {
        self.histograms.iter()
    }

    pub fn fill_weighted(
        &mut self,
        category: usize,
        value: Real,
        weight: Real,
    ) -> Result<(), HistogramError> {
        let len = self.histograms.len();
        self.histograms
            .get_mut(category)
            .ok_or_else(|| HistogramError::UnknownCategory {
                family: self.name.clone(),
                category,
                len,
            })?
            .fill_weighted(value, weight);
        Ok(())
    }

    pub fn merge(&mut self, other: &HistogramFamily) -> Result<(), HistogramError> {
        if self.histograms.len() != other.histograms.len() {
            return Err(HistogramError::IncompatibleBinning(
                self.name.clone(),
                other.name.clone(),
            ));
        }
        for (histogram, other) in self.histograms.iter_mut().zip(&other.histograms) {
            histogram.merge(other)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn histogram() -> Histogram {
        Histogram::new("test", vec![0.0, 1.0, 2.0, 4.0]).expect("edges are valid")
    }

    #[test]
    fn invalid_edges() {
        assert!(Histogram::new("a", vec![]).is_err());
        assert!(Histogram::new("a", vec![1.0]).is_err());
        assert!(Histogram::new("a", vec![1.0, 1.0]).is_err());
        assert!(Histogram::new("a", vec![0.0, Real::NAN, 1.0]).is_err());
        assert_eq!(
            Histogram::new("a", vec![2.0, 1.0]),
            Err(HistogramError::InvalidEdges("a".to_owned()))
        );
    }

    #[test]
    fn find_bin_edges() {
        let hist = histogram();
        assert_eq!(hist.find_bin(-0.1), BinLocation::Underflow);
        assert_eq!(hist.find_bin(0.0), BinLocation::Bin(0));
        assert_eq!(hist.find_bin(0.99), BinLocation::Bin(0));
        assert_eq!(hist.find_bin(1.0), BinLocation::Bin(1));
        assert_eq!(hist.find_bin(3.99), BinLocation::Bin(2));
        assert_eq!(hist.find_bin(4.0), BinLocation::Overflow);
        assert_eq!(hist.find_bin(Real::NAN), BinLocation::Underflow);
        assert_eq!(hist.find_bin(Real::INFINITY), BinLocation::Overflow);
        assert_eq!(hist.find_bin(Real::NEG_INFINITY), BinLocation::Underflow);
    }

    #[test]
    fn fill_accumulates() {
        let mut hist = histogram();
        hist.fill(0.5);
        hist.fill(0.5);
        hist.fill_weighted(2.5, 3.0);
        hist.fill(10.0);
        hist.fill(-1.0);
        assert_eq!(hist.values(), &[2.0, 0.0, 3.0]);
        assert_eq!(hist.overflow(), 1.0);
        assert_eq!(hist.underflow(), 1.0);
        assert_eq!(hist.entries(), 5);
        assert_eq!(hist.integral(), 5.0);
    }

    #[test]
    fn zero_weight_counts_an_entry_only() {
        let mut hist = histogram();
        hist.fill_weighted(1.5, 0.0);
        assert_eq!(hist.entries(), 1);
        assert_eq!(hist.integral(), 0.0);
    }

    #[test]
    fn negative_weight_refused() {
        let mut hist = histogram();
        hist.fill(1.5);
        hist.fill_weighted(1.5, -1.0);
        hist.fill_weighted(1.5, Real::NAN);
        assert_eq!(hist.value(1), Some(1.0));
        assert_eq!(hist.entries(), 1);
    }

    #[test]
    fn bins_are_edge_triples() {
        let mut hist = histogram();
        hist.fill(1.5);
        let bins = hist.bins().collect::<Vec<_>>();
        assert_eq!(
            bins,
            vec![
                Bin {
                    low: 0.0,
                    high: 1.0,
                    value: 0.0
                },
                Bin {
                    low: 1.0,
                    high: 2.0,
                    value: 1.0
                },
                Bin {
                    low: 2.0,
                    high: 4.0,
                    value: 0.0
                },
            ]
        );
    }

    #[test]
    fn merge_adds() {
        let mut first = histogram();
        let mut second = histogram();
        first.fill(0.5);
        second.fill(0.5);
        second.fill(5.0);
        first.merge(&second).expect("same binning");
        assert_eq!(first.values(), &[2.0, 0.0, 0.0]);
        assert_eq!(first.overflow(), 1.0);
        assert_eq!(first.entries(), 3);
    }

    #[test]
    fn merge_refuses_other_binning() {
        let mut first = histogram();
        let second = Histogram::new("other", vec![0.0, 1.0]).expect("edges are valid");
        assert_eq!(
            first.merge(&second),
            Err(HistogramError::IncompatibleBinning(
                "test".to_owned(),
                "other".to_owned()
            ))
        );
    }

    #[test]
    fn ratio_with_empty_denominator() {
        let mut numerator = histogram();
        let mut denominator = histogram();
        numerator.fill(0.5);
        denominator.fill(0.5);
        denominator.fill(0.5);
        denominator.fill(1.5);
        let ratio = numerator.ratio(&denominator).expect("same binning");
        assert_approx_eq!(ratio[0].value, 0.5);
        assert_eq!(ratio[1].value, 0.0);
        assert!(ratio[2].value.is_nan());
        assert_eq!((ratio[2].low, ratio[2].high), (2.0, 4.0));
    }

    #[test]
    fn share_of_empty_total() {
        let numerator = histogram();
        let total = histogram();
        assert!(numerator.share_of(&total).is_nan());
    }

    #[test]
    fn family_names_and_fills() {
        let mut family =
            HistogramFamily::new("pt", &["a", "b"], &[0.0, 1.0, 2.0]).expect("valid family");
        assert_eq!(family.iter().count(), 2);
        assert_eq!(family.get(1).map(Histogram::name), Some("pt_b"));
        family.fill_weighted(1, 0.5, 1.0).expect("category exists");
        assert_eq!(family.get(1).and_then(|h| h.value(0)), Some(1.0));
        assert_eq!(
            family.fill_weighted(2, 0.5, 1.0),
            Err(HistogramError::UnknownCategory {
                family: "pt".to_owned(),
                category: 2,
                len: 2
            })
        );
    }

    #[test]
    fn empty_family() {
        let labels: [&str; 0] = [];
        assert!(HistogramFamily::new("pt", &labels, &[0.0, 1.0]).is_err());
    }
}
