//! Matching of reconstructed tracks and seeds to simulated electrons.
mod histograms;
mod policy;

pub use histograms::SeedHistograms;
pub use policy::{
    ClassifierConfig, DEFAULT_ALGORITHM_NAMES, DEFAULT_ETA_PT_THRESHOLD, DrivenType,
    MatchingPolicy, RatioKind,
};

use crate::{
    event::{Event, EventError},
    histogram::HistogramError,
};
use histograms::Filing;
use seed_validation_common::{AlgorithmCode, Index, Real, is_electron};
use std::{collections::HashSet, ops::AddAssign};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error, PartialEq)]
pub enum ClassifierError {
    #[error("{0}")]
    Event(#[from] EventError),
    #[error("{0}")]
    Histogram(#[from] HistogramError),
}

/// What happened to the candidates of one event, or of many.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EventSummary {
    /// Simulated electrons filed into the histograms.
    pub filed: usize,
    /// Tracks skipped because their leading truth match was already filed in the event.
    pub duplicates: usize,
    /// Candidates which failed the policy's selection.
    pub rejected: usize,
}

impl AddAssign for EventSummary {
    fn add_assign(&mut self, other: Self) {
        self.filed += other.filed;
        self.duplicates += other.duplicates;
        self.rejected += other.rejected;
    }
}

/// Streams events into a set of histograms according to a [MatchingPolicy].
#[derive(Debug, Clone)]
pub struct Classifier {
    config: ClassifierConfig,
    histograms: SeedHistograms,
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Result<Self, ClassifierError> {
        let histograms = SeedHistograms::new(&config)?;
        Ok(Self { config, histograms })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn histograms(&self) -> &SeedHistograms {
        &self.histograms
    }

    /// Adds the histograms of a classifier run over other events.
    pub fn merge(&mut self, other: &Classifier) -> Result<(), ClassifierError> {
        Ok(self.histograms.merge(&other.histograms)?)
    }

    /// Files the simulated electrons of one event.
    ///
    /// An error leaves the histograms partially filled with this event, so the run
    /// should be abandoned.
    pub fn process_event(&mut self, event: &Event) -> Result<EventSummary, ClassifierError> {
        event.validate(self.config.policy.uses_truth_links())?;
        let summary = match self.config.policy {
            MatchingPolicy::SeedType => self.classify_tracks(event, true)?,
            MatchingPolicy::DrivenFraction => self.classify_tracks(event, false)?,
            MatchingPolicy::Efficiency { max_abs_eta } => {
                self.classify_truth(event, max_abs_eta)?
            }
        };
        trace!(?summary, "Event classified");
        Ok(summary)
    }

    fn check_algorithm(&self, code: AlgorithmCode) -> Result<(), EventError> {
        let categories = self.config.algorithm_names.len();
        if code < categories {
            Ok(())
        } else {
            Err(EventError::UnknownAlgorithm { code, categories })
        }
    }

    /// Files each simulated electron once per event, for the first track whose
    /// leading truth match it is.
    ///
    /// Only the first track is kept even when the electron legitimately seeded
    /// several candidates, so later seeds of the same electron go uncounted.
    fn classify_tracks(
        &mut self,
        event: &Event,
        require_ecal_driven: bool,
    ) -> Result<EventSummary, ClassifierError> {
        let mut summary = EventSummary::default();
        let mut used_truth_indices = HashSet::<Index>::new();

        for (seed_index, sim_indices) in event.tracks() {
            let Some(&lead_truth) = sim_indices.first() else {
                continue;
            };
            if used_truth_indices.contains(&lead_truth) {
                summary.duplicates += 1;
                continue;
            }
            let seed = event.seed(seed_index)?;
            let particle = event.sim_particle(lead_truth)?;
            if (require_ecal_driven && !seed.ecal_driven) || !is_electron(particle.pdg_id) {
                summary.rejected += 1;
                continue;
            }
            used_truth_indices.insert(lead_truth);
            self.check_algorithm(seed.algorithm)?;

            self.histograms.file(&Filing {
                pt: particle.momentum.pt(),
                eta: particle.momentum.eta(),
                algorithm: seed.algorithm,
                algorithm_weight: 1.0,
                driven_type: DrivenType::from_ecal_driven(seed.ecal_driven),
                driven_weight: 1.0,
            })?;
            summary.filed += 1;
        }
        Ok(summary)
    }

    /// Files every prompt simulated electron within the acceptance, weighted by
    /// whether its first reconstructed track came from an ECAL-driven seed.
    ///
    /// Electrons outside the acceptance are not counted, not even in the totals.
    fn classify_truth(
        &mut self,
        event: &Event,
        max_abs_eta: Real,
    ) -> Result<EventSummary, ClassifierError> {
        let mut summary = EventSummary::default();

        for sim_index in 0..event.sim_count() {
            let particle = event.sim_particle(sim_index)?;
            if !is_electron(particle.pdg_id) {
                continue;
            }
            let eta = particle.momentum.eta();
            if !event.is_prompt(sim_index)? || eta.abs() > max_abs_eta {
                summary.rejected += 1;
                continue;
            }

            let mut filing = Filing {
                pt: particle.momentum.pt(),
                eta,
                algorithm: 0,
                algorithm_weight: 0.0,
                driven_type: DrivenType::EcalDriven,
                driven_weight: 0.0,
            };
            if let Some(track) = event.first_track(sim_index)? {
                let seed = event.seed(event.track_seed(track)?)?;
                filing.driven_type = DrivenType::from_ecal_driven(seed.ecal_driven);
                filing.driven_weight = 1.0;
                if seed.ecal_driven {
                    self.check_algorithm(seed.algorithm)?;
                    filing.algorithm = seed.algorithm;
                    filing.algorithm_weight = 1.0;
                }
            }
            self.histograms.file(&filing)?;
            summary.filed += 1;
        }
        Ok(summary)
    }
}
