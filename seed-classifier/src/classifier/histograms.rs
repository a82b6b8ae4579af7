use super::policy::{ClassifierConfig, DrivenType};
use crate::{
    binning::{self, BinningKind, ETA_BAND_COUNT},
    histogram::{Histogram, HistogramError, HistogramFamily},
};
use seed_validation_common::{AlgorithmCode, Real};

/// A simulated electron on its way into the histograms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Filing {
    pub(crate) pt: Real,
    pub(crate) eta: Real,
    pub(crate) algorithm: AlgorithmCode,
    pub(crate) algorithm_weight: Real,
    pub(crate) driven_type: DrivenType,
    pub(crate) driven_weight: Real,
}

/// Every histogram filled by one classifier run.
///
/// The `*_all` histograms count every filed electron with weight one and are the
/// denominators of the category families.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedHistograms {
    eta_pt_threshold: Real,
    pub pt_all: Histogram,
    pub eta_all: Histogram,
    pub pt_by_algorithm: HistogramFamily,
    pub eta_by_algorithm: HistogramFamily,
    pub pt_by_driven_type: HistogramFamily,
    pub eta_by_driven_type: HistogramFamily,
    pub pt_by_eta_band: Option<HistogramFamily>,
}

impl SeedHistograms {
    pub fn new(config: &ClassifierConfig) -> Result<Self, HistogramError> {
        let pt_edges = binning::edges(config.bin_count, BinningKind::Momentum);
        let eta_edges = binning::edges(config.bin_count, BinningKind::Pseudorapidity);
        let driven_labels = DrivenType::ALL.map(|driven_type| driven_type.to_string());
        let pt_by_eta_band = if config.eta_bands {
            let labels = (0..ETA_BAND_COUNT)
                .map(|band| format!("eta_band_{band}"))
                .collect::<Vec<_>>();
            Some(HistogramFamily::new("pt_all", &labels, &pt_edges)?)
        } else {
            None
        };
        Ok(Self {
            eta_pt_threshold: config.eta_pt_threshold,
            pt_all: Histogram::new("pt_all", pt_edges.clone())?,
            eta_all: Histogram::new("eta_all", eta_edges.clone())?,
            pt_by_algorithm: HistogramFamily::new("pt", &config.algorithm_names, &pt_edges)?,
            eta_by_algorithm: HistogramFamily::new("eta", &config.algorithm_names, &eta_edges)?,
            pt_by_driven_type: HistogramFamily::new("pt", &driven_labels, &pt_edges)?,
            eta_by_driven_type: HistogramFamily::new("eta", &driven_labels, &eta_edges)?,
            pt_by_eta_band,
        })
    }

    pub(crate) fn file(&mut self, filing: &Filing) -> Result<(), HistogramError> {
        self.pt_all.fill(filing.pt);
        self.pt_by_algorithm
            .fill_weighted(filing.algorithm, filing.pt, filing.algorithm_weight)?;
        self.pt_by_driven_type.fill_weighted(
            filing.driven_type.index(),
            filing.pt,
            filing.driven_weight,
        )?;
        if filing.pt > self.eta_pt_threshold {
            self.eta_all.fill(filing.eta);
            self.eta_by_algorithm.fill_weighted(
                filing.algorithm,
                filing.eta,
                filing.algorithm_weight,
            )?;
            self.eta_by_driven_type.fill_weighted(
                filing.driven_type.index(),
                filing.eta,
                filing.driven_weight,
            )?;
        }
        if let Some(bands) = &mut self.pt_by_eta_band {
            bands.fill_weighted(binning::eta_band(filing.eta), filing.pt, 1.0)?;
        }
        Ok(())
    }

    pub fn merge(&mut self, other: &SeedHistograms) -> Result<(), HistogramError> {
        self.pt_all.merge(&other.pt_all)?;
        self.eta_all.merge(&other.eta_all)?;
        self.pt_by_algorithm.merge(&other.pt_by_algorithm)?;
        self.eta_by_algorithm.merge(&other.eta_by_algorithm)?;
        self.pt_by_driven_type.merge(&other.pt_by_driven_type)?;
        self.eta_by_driven_type.merge(&other.eta_by_driven_type)?;
        match (&mut self.pt_by_eta_band, &other.pt_by_eta_band) {
            (Some(bands), Some(other)) => bands.merge(other),
            (None, None) => Ok(()),
            _ => Err(HistogramError::IncompatibleBinning(
                "pt_all_eta_band".to_owned(),
                "pt_all_eta_band".to_owned(),
            )),
        }
    }

    /// Every histogram, totals first.
    pub fn iter(&self) -> impl Iterator<Item = &Histogram> + '_ {
        [&self.pt_all, &self.eta_all]
            .into_iter()
            .chain(self.category_families().flat_map(|(family, _)| family.iter()))
    }

    /// Each category family together with the total it divides into.
    pub fn category_families(&self) -> impl Iterator<Item = (&HistogramFamily, &Histogram)> + '_ {
        [
            (&self.pt_by_algorithm, &self.pt_all),
            (&self.eta_by_algorithm, &self.eta_all),
            (&self.pt_by_driven_type, &self.pt_all),
            (&self.eta_by_driven_type, &self.eta_all),
        ]
        .into_iter()
        .chain(self.pt_by_eta_band.as_ref().map(|bands| (bands, &self.pt_all)))
    }
}
