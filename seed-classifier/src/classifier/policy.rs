use crate::binning::{BIN_COUNT, ETA_LIMIT};
use seed_validation_common::{Real, metrics::matches_filed::PolicyKind};

/// Names of the seeding steps, indexed by algorithm code.
pub const DEFAULT_ALGORITHM_NAMES: [&str; 7] = [
    "initialStepSeeds",
    "highPtTripletStepSeeds",
    "mixedTripletStepSeeds",
    "pixelLessStepSeeds",
    "tripletElectronSeeds",
    "pixelPairElectronSeeds",
    "stripPairElectronSeeds",
];

/// Pseudorapidity histograms are only filled above this transverse momentum, in GeV.
pub const DEFAULT_ETA_PT_THRESHOLD: Real = 10.0;

/// Decides which simulated electrons are filed, and with which weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchingPolicy {
    /// Tracks from ECAL-driven seeds matched to an electron.
    /// Gives the fraction of reconstructed electrons per seeding step.
    SeedType,
    /// Tracks matched to an electron, whatever the seed driven type.
    /// The driven type picks the category.
    DrivenFraction,
    /// Prompt simulated electrons within `max_abs_eta`, weighted by whether
    /// they were reconstructed from an ECAL-driven seed.
    Efficiency { max_abs_eta: Real },
}

impl MatchingPolicy {
    pub fn efficiency() -> Self {
        Self::Efficiency {
            max_abs_eta: ETA_LIMIT,
        }
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::SeedType => PolicyKind::SeedType,
            Self::DrivenFraction => PolicyKind::DrivenFraction,
            Self::Efficiency { .. } => PolicyKind::Efficiency,
        }
    }

    /// Whether the vertex and track links of simulated particles are followed.
    pub fn uses_truth_links(&self) -> bool {
        matches!(self, Self::Efficiency { .. })
    }

    /// What the ratio of a category to the total measures.
    pub fn ratio_kind(&self) -> RatioKind {
        match self {
            Self::SeedType | Self::DrivenFraction => RatioKind::Fraction,
            Self::Efficiency { .. } => RatioKind::Efficiency,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum RatioKind {
    #[strum(to_string = "fraction")]
    Fraction,
    #[strum(to_string = "efficiency")]
    Efficiency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum DrivenType {
    #[strum(to_string = "ecal_driven")]
    EcalDriven,
    #[strum(to_string = "trk_driven")]
    TrkDriven,
}

impl DrivenType {
    pub const ALL: [DrivenType; 2] = [Self::EcalDriven, Self::TrkDriven];

    pub fn from_ecal_driven(ecal_driven: bool) -> Self {
        if ecal_driven {
            Self::EcalDriven
        } else {
            Self::TrkDriven
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::EcalDriven => 0,
            Self::TrkDriven => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    pub policy: MatchingPolicy,
    /// One category per algorithm code, in code order.
    pub algorithm_names: Vec<String>,
    /// Also break the total transverse momentum down by `|eta|` band.
    pub eta_bands: bool,
    pub eta_pt_threshold: Real,
    pub bin_count: usize,
}

impl ClassifierConfig {
    pub fn new(policy: MatchingPolicy) -> Self {
        Self {
            policy,
            algorithm_names: DEFAULT_ALGORITHM_NAMES.map(str::to_owned).to_vec(),
            eta_bands: false,
            eta_pt_threshold: DEFAULT_ETA_PT_THRESHOLD,
            bin_count: BIN_COUNT,
        }
    }

    pub fn with_eta_bands(self, eta_bands: bool) -> Self {
        Self { eta_bands, ..self }
    }

    pub fn with_algorithm_names(self, algorithm_names: Vec<String>) -> Self {
        Self {
            algorithm_names,
            ..self
        }
    }

    pub fn with_eta_pt_threshold(self, eta_pt_threshold: Real) -> Self {
        Self {
            eta_pt_threshold,
            ..self
        }
    }
}
