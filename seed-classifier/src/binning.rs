//! Bin edges used by every histogram of a run, and the pseudorapidity bands
//! used to break the totals down by detector region.
use seed_validation_common::Real;

/// Number of bins in both the momentum and the pseudorapidity histograms.
pub const BIN_COUNT: usize = 50;

/// Lowest momentum edge, in GeV.
pub const MOMENTUM_LOW_EDGE: Real = 0.5;

/// Pseudorapidity histograms cover `[-ETA_LIMIT, ETA_LIMIT]`.
pub const ETA_LIMIT: Real = 2.5;

/// Edges of the `|eta|` bands: barrel, outer barrel, barrel/endcap gap,
/// inner endcap and outer endcap.
pub const ETA_BAND_EDGES: [Real; 6] = [0.0, 1.0, 1.444, 1.556, 2.0, 2.5];
pub const ETA_BAND_COUNT: usize = ETA_BAND_EDGES.len() - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum BinningKind {
    /// Logarithmic bins from 0.5 GeV to 200 GeV.
    #[strum(to_string = "momentum")]
    Momentum,
    /// Uniform bins over `[-2.5, 2.5]`.
    #[strum(to_string = "pseudorapidity")]
    Pseudorapidity,
}

/// Returns the `count + 1` edges of `count` bins of the given kind.
///
/// The momentum edges are `0.5` followed by
/// `10^(log10(5) - 1 + i * (log10(2) + 2 - log10(5) + 1) / count)` for `i` in `1..=count`,
/// evaluated in exactly that order so that the edges are reproducible bit for bit.
pub fn edges(count: usize, kind: BinningKind) -> Vec<Real> {
    match kind {
        BinningKind::Momentum => std::iter::once(MOMENTUM_LOW_EDGE)
            .chain((1..=count).map(|i| {
                let exponent = Real::log10(5.0) - 1.0
                    + i as Real * (Real::log10(2.0) + 2.0 - Real::log10(5.0) + 1.0)
                        / count as Real;
                Real::powf(10.0, exponent)
            }))
            .collect(),
        BinningKind::Pseudorapidity => {
            let width = 2.0 * ETA_LIMIT / count as Real;
            (0..=count).map(|i| -ETA_LIMIT + i as Real * width).collect()
        }
    }
}

/// Returns the index of the band containing `|eta|`.
/// Values on or beyond the last edge belong to the last band.
pub fn eta_band(eta: Real) -> usize {
    let abs_eta = eta.abs();
    ETA_BAND_EDGES
        .iter()
        .skip(1)
        .position(|&upper| abs_eta < upper)
        .unwrap_or(ETA_BAND_COUNT - 1)
}

/// Label of the band, e.g. `1.444-1.556`.
pub fn eta_band_label(band: usize) -> Option<String> {
    let low = ETA_BAND_EDGES.get(band)?;
    let high = ETA_BAND_EDGES.get(band + 1)?;
    Some(format!("{low:.3}-{high:.3}"))
}
