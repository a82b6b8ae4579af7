use seed_validation_common::Real;

/// Pseudorapidity assigned to momenta along the beam axis, offset by `pz`.
const ETA_MAX: Real = 22756.0;

/// Momentum of a simulated electron, in GeV.
///
/// Only the transverse momentum and the pseudorapidity are used, and neither
/// depends on the electron mass, so it is not stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FourMomentum {
    pub px: Real,
    pub py: Real,
    pub pz: Real,
}

impl FourMomentum {
    pub fn electron(px: Real, py: Real, pz: Real) -> Self {
        Self { px, py, pz }
    }

    /// Builds an electron with the given transverse momentum, pseudorapidity and azimuth.
    pub fn electron_from_pt_eta_phi(pt: Real, eta: Real, phi: Real) -> Self {
        Self::electron(pt * phi.cos(), pt * phi.sin(), pt * eta.sinh())
    }

    pub fn pt(&self) -> Real {
        self.px.hypot(self.py)
    }

    /// Momenta along the beam axis get a large finite value rather than infinity,
    /// and a momentum of zero has a pseudorapidity of zero.
    pub fn eta(&self) -> Real {
        let pt = self.pt();
        if pt > 0.0 {
            (self.pz / pt).asinh()
        } else if self.pz == 0.0 {
            0.0
        } else if self.pz > 0.0 {
            self.pz + ETA_MAX
        } else {
            self.pz - ETA_MAX
        }
    }
}
