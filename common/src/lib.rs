pub mod metrics;
pub mod tracer;

/// Index into one of the parallel per-event sequences.
pub type Index = usize;

/// Particle Data Group code of a simulated particle.
pub type PdgId = i32;

/// Code of the algorithm which originally produced a seed.
pub type AlgorithmCode = usize;

/// Energies and momenta are in GeV.
pub type Real = f64;

pub const ELECTRON_PDG_ID: PdgId = 11;

pub const DEFAULT_PROGRESS_INTERVAL: usize = 1000;

pub fn is_electron(pdg_id: PdgId) -> bool {
    pdg_id.abs() == ELECTRON_PDG_ID
}
