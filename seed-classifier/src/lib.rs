//! Classifies simulated electrons by the seeds their reconstructed tracks were
//! built from, and fills fraction and efficiency histograms in transverse
//! momentum and pseudorapidity.
pub mod binning;
pub mod classifier;
pub mod event;
pub mod histogram;
pub mod kinematics;
pub mod output;
pub mod processing;
pub mod source;
