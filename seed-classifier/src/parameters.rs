use clap::{Parser, Subcommand};
use seed_classifier::{binning::ETA_LIMIT, classifier::MatchingPolicy};
use seed_validation_common::Real;

#[derive(Debug, Clone, Parser)]
pub(crate) struct EfficiencyParameters {
    /// Simulated electrons with a larger |eta| are not counted at all.
    #[clap(long, default_value_t = ETA_LIMIT)]
    pub(crate) max_abs_eta: Real,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Mode {
    #[clap(
        about = "Fraction of electrons matched to ECAL-driven seeds, per seeding step."
    )]
    SeedType,
    #[clap(
        about = "Fraction of electrons matched to seeds, per seeding step and per ECAL or tracker driven seed."
    )]
    DrivenFraction,
    #[clap(
        about = "Efficiency of prompt simulated electrons to be reconstructed from an ECAL-driven seed."
    )]
    Efficiency(EfficiencyParameters),
}

impl Mode {
    pub(crate) fn policy(&self) -> MatchingPolicy {
        match self {
            Mode::SeedType => MatchingPolicy::SeedType,
            Mode::DrivenFraction => MatchingPolicy::DrivenFraction,
            Mode::Efficiency(parameters) => MatchingPolicy::Efficiency {
                max_abs_eta: parameters.max_abs_eta,
            },
        }
    }
}
