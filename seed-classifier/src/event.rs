use crate::kinematics::FourMomentum;
use seed_validation_common::{AlgorithmCode, Index, PdgId, Real};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Violations of the per-event field contract. All of these are fatal.
#[derive(Debug, Error, PartialEq)]
pub enum EventError {
    #[error("{first} has {first_len} entries but {second} has {second_len}")]
    LengthMismatch {
        first: &'static str,
        first_len: usize,
        second: &'static str,
        second_len: usize,
    },
    #[error("Index {index} out of range for {sequence} of length {len}")]
    IndexOutOfRange {
        sequence: &'static str,
        index: Index,
        len: usize,
    },
    #[error("Algorithm code {code} has no category, {categories} categories are configured")]
    UnknownAlgorithm {
        code: AlgorithmCode,
        categories: usize,
    },
}

/// One record of the tracking ntuple.
///
/// Every field is a column of the ntuple; fields with the same prefix are
/// parallel sequences and must have the same length.
/// The truth-link columns (`sim_parentVtxIdx`, `sim_trkIdx` and `simvtx_sourceSimIdx`)
/// are only required when classifying against truth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "trk_seedIdx")]
    pub track_seed_index: Vec<Index>,
    /// Matched simulated particles of each track, best match first.
    #[serde(rename = "trk_simTrkIdx")]
    pub track_sim_indices: Vec<Vec<Index>>,

    #[serde(rename = "see_ecalDriven")]
    pub seed_ecal_driven: Vec<bool>,
    #[serde(rename = "see_algoOriginal")]
    pub seed_algorithm: Vec<AlgorithmCode>,

    #[serde(rename = "sim_pdgId")]
    pub sim_pdg_id: Vec<PdgId>,
    pub sim_px: Vec<Real>,
    pub sim_py: Vec<Real>,
    pub sim_pz: Vec<Real>,
    #[serde(rename = "sim_parentVtxIdx", default)]
    pub sim_parent_vertex: Vec<Index>,
    #[serde(rename = "sim_trkIdx", default)]
    pub sim_track_indices: Vec<Vec<Index>>,

    /// Simulated particles which produced each vertex. Empty for primary vertices.
    #[serde(rename = "simvtx_sourceSimIdx", default)]
    pub vertex_source_sim_indices: Vec<Vec<Index>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seed {
    pub ecal_driven: bool,
    pub algorithm: AlgorithmCode,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimParticle {
    pub pdg_id: PdgId,
    pub momentum: FourMomentum,
}

fn check_length(
    first: &'static str,
    first_len: usize,
    second: &'static str,
    second_len: usize,
) -> Result<(), EventError> {
    if first_len == second_len {
        Ok(())
    } else {
        Err(EventError::LengthMismatch {
            first,
            first_len,
            second,
            second_len,
        })
    }
}

fn get<'a, T>(sequence: &'static str, values: &'a [T], index: Index) -> Result<&'a T, EventError> {
    values.get(index).ok_or(EventError::IndexOutOfRange {
        sequence,
        index,
        len: values.len(),
    })
}

impl Event {
    /// Checks that parallel sequences have matching lengths.
    /// Indices are checked when they are followed.
    pub fn validate(&self, with_truth_links: bool) -> Result<(), EventError> {
        check_length(
            "trk_seedIdx",
            self.track_seed_index.len(),
            "trk_simTrkIdx",
            self.track_sim_indices.len(),
        )?;
        check_length(
            "see_ecalDriven",
            self.seed_ecal_driven.len(),
            "see_algoOriginal",
            self.seed_algorithm.len(),
        )?;
        let sim_count = self.sim_count();
        check_length("sim_pdgId", sim_count, "sim_px", self.sim_px.len())?;
        check_length("sim_pdgId", sim_count, "sim_py", self.sim_py.len())?;
        check_length("sim_pdgId", sim_count, "sim_pz", self.sim_pz.len())?;
        if with_truth_links {
            check_length(
                "sim_pdgId",
                sim_count,
                "sim_parentVtxIdx",
                self.sim_parent_vertex.len(),
            )?;
            check_length(
                "sim_pdgId",
                sim_count,
                "sim_trkIdx",
                self.sim_track_indices.len(),
            )?;
        }
        Ok(())
    }

    pub fn track_count(&self) -> usize {
        self.track_seed_index.len()
    }

    pub fn sim_count(&self) -> usize {
        self.sim_pdg_id.len()
    }

    /// Iterates over the seed index and truth matches of each track, in storage order.
    pub fn tracks(&self) -> impl Iterator<Item = (Index, &[Index])> + '_ {
        self.track_seed_index
            .iter()
            .copied()
            .zip(self.track_sim_indices.iter().map(Vec::as_slice))
    }

    pub fn track_seed(&self, track: Index) -> Result<Index, EventError> {
        get("trk_seedIdx", &self.track_seed_index, track).copied()
    }

    pub fn seed(&self, seed: Index) -> Result<Seed, EventError> {
        Ok(Seed {
            ecal_driven: *get("see_ecalDriven", &self.seed_ecal_driven, seed)?,
            algorithm: *get("see_algoOriginal", &self.seed_algorithm, seed)?,
        })
    }

    pub fn sim_particle(&self, sim: Index) -> Result<SimParticle, EventError> {
        Ok(SimParticle {
            pdg_id: *get("sim_pdgId", &self.sim_pdg_id, sim)?,
            momentum: FourMomentum::electron(
                *get("sim_px", &self.sim_px, sim)?,
                *get("sim_py", &self.sim_py, sim)?,
                *get("sim_pz", &self.sim_pz, sim)?,
            ),
        })
    }

    /// A particle is prompt when its parent vertex was not produced by another particle.
    pub fn is_prompt(&self, sim: Index) -> Result<bool, EventError> {
        let vertex = *get("sim_parentVtxIdx", &self.sim_parent_vertex, sim)?;
        Ok(get("simvtx_sourceSimIdx", &self.vertex_source_sim_indices, vertex)?.is_empty())
    }

    /// The first reconstructed track matched to the particle, if any.
    pub fn first_track(&self, sim: Index) -> Result<Option<Index>, EventError> {
        Ok(get("sim_trkIdx", &self.sim_track_indices, sim)?
            .first()
            .copied())
    }
}

#[cfg(test)]
impl Event {
    /// Adds a vertex, returning its index.
    pub(crate) fn push_vertex(&mut self, sources: Vec<Index>) -> Index {
        self.vertex_source_sim_indices.push(sources);
        self.vertex_source_sim_indices.len() - 1
    }

    /// Adds a simulated particle at the given vertex, returning its index.
    pub(crate) fn push_sim(&mut self, pdg_id: PdgId, momentum: FourMomentum, vertex: Index) -> Index {
        self.sim_pdg_id.push(pdg_id);
        self.sim_px.push(momentum.px);
        self.sim_py.push(momentum.py);
        self.sim_pz.push(momentum.pz);
        self.sim_parent_vertex.push(vertex);
        self.sim_track_indices.push(Vec::new());
        self.sim_count() - 1
    }

    pub(crate) fn push_seed(&mut self, ecal_driven: bool, algorithm: AlgorithmCode) -> Index {
        self.seed_ecal_driven.push(ecal_driven);
        self.seed_algorithm.push(algorithm);
        self.seed_ecal_driven.len() - 1
    }

    /// Adds a track built from `seed`, matched to `sims` in order of quality,
    /// and links it back from the first simulated particle it matches.
    pub(crate) fn push_track(&mut self, seed: Index, sims: Vec<Index>) -> Index {
        let track = self.track_count();
        if let Some(links) = sims
            .first()
            .and_then(|&sim| self.sim_track_indices.get_mut(sim))
        {
            links.push(track);
        }
        self.track_seed_index.push(seed);
        self.track_sim_indices.push(sims);
        track
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    const JSON_EVENT: &str = r#"
    {
        "trk_seedIdx": [0, 1],
        "trk_simTrkIdx": [[0], []],
        "see_ecalDriven": [true, false],
        "see_algoOriginal": [4, 0],
        "sim_pdgId": [-11, 211],
        "sim_px": [20.0, 1.0],
        "sim_py": [0.0, 1.0],
        "sim_pz": [10.0, 0.0],
        "sim_parentVtxIdx": [0, 1],
        "sim_trkIdx": [[0], []],
        "simvtx_sourceSimIdx": [[], [0]]
    }
    "#;

    fn event() -> Event {
        serde_json::from_str(JSON_EVENT).expect("event should decode")
    }

    #[test]
    fn decode_branch_names() {
        let event = event();
        assert!(event.validate(true).is_ok());
        assert_eq!(event.track_count(), 2);
        assert_eq!(event.sim_count(), 2);
        let tracks = event
            .tracks()
            .map(|(seed, sims)| (seed, sims.to_vec()))
            .collect::<Vec<_>>();
        assert_eq!(tracks, vec![(0, vec![0]), (1, vec![])]);
    }

    #[test]
    fn truth_links_are_optional() {
        let event: Event = serde_json::from_str(
            r#"{"trk_seedIdx": [], "trk_simTrkIdx": [], "see_ecalDriven": [],
                "see_algoOriginal": [], "sim_pdgId": [11], "sim_px": [1.0],
                "sim_py": [0.0], "sim_pz": [0.0]}"#,
        )
        .expect("event should decode");
        assert!(event.validate(false).is_ok());
        assert_eq!(
            event.validate(true),
            Err(EventError::LengthMismatch {
                first: "sim_pdgId",
                first_len: 1,
                second: "sim_parentVtxIdx",
                second_len: 0,
            })
        );
    }

    #[test]
    fn mismatched_lengths() {
        let mut event = event();
        event.sim_pz.pop();
        assert!(matches!(
            event.validate(false),
            Err(EventError::LengthMismatch { second: "sim_pz", .. })
        ));
    }

    #[test]
    fn seed_and_particle_views() {
        let event = event();
        assert_eq!(
            event.seed(0),
            Ok(Seed {
                ecal_driven: true,
                algorithm: 4
            })
        );
        let particle = event.sim_particle(0).expect("particle exists");
        assert_eq!(particle.pdg_id, -11);
        assert_approx_eq!(particle.momentum.pt(), 20.0);
    }

    #[test]
    fn out_of_range_index() {
        let event = event();
        assert_eq!(
            event.seed(2),
            Err(EventError::IndexOutOfRange {
                sequence: "see_ecalDriven",
                index: 2,
                len: 2
            })
        );
        assert!(event.sim_particle(5).is_err());
        assert!(event.track_seed(2).is_err());
    }

    #[test]
    fn prompt_particles() {
        let event = event();
        assert_eq!(event.is_prompt(0), Ok(true));
        assert_eq!(event.is_prompt(1), Ok(false));
    }

    #[test]
    fn first_track_of_particle() {
        let event = event();
        assert_eq!(event.first_track(0), Ok(Some(0)));
        assert_eq!(event.first_track(1), Ok(None));
    }

    #[test]
    fn builder_links_tracks() {
        let mut event = Event::default();
        let vertex = event.push_vertex(Vec::new());
        let sim = event.push_sim(
            11,
            FourMomentum::electron_from_pt_eta_phi(15.0, -1.2, 0.0),
            vertex,
        );
        let seed = event.push_seed(false, 3);
        let track = event.push_track(seed, vec![sim]);
        assert!(event.validate(true).is_ok());
        assert_eq!(event.first_track(sim), Ok(Some(track)));
        let particle = event.sim_particle(sim).expect("particle exists");
        assert_approx_eq!(particle.momentum.pt(), 15.0, 1e-9);
        assert_approx_eq!(particle.momentum.eta(), -1.2, 1e-9);
    }
}
