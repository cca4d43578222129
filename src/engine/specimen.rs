//! Deterministic one-dimensional damage model of a hyperboloid specimen.
//!
//! This is not a contact-mechanics engine. It reproduces the shape of a
//! quasi-brittle strain-stress response (linear rise, peak, exponential
//! softening) so the controller can be driven end to end without an external
//! physics engine. Damage is tracked separately for tension and compression
//! and is irreversible within a loading history.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::LoadTestResult;

use super::{Axis, Scalar, SteppingEngine};

/// Material and geometry parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecimenParams {
    /// Young's modulus.
    pub young: f64,
    /// Tensile strength.
    pub sigma_t: f64,
    /// Softening strain as a multiple of the crack-onset strain.
    pub rel_ductility: f64,
    /// Compressive strength as a multiple of tensile strength.
    pub compression_ratio: f64,
    /// Specimen length along the loading axis.
    pub length: f64,
    /// Simulated time per step.
    pub dt: f64,
}

impl Default for SpecimenParams {
    fn default() -> Self {
        Self {
            young: 24e9,
            sigma_t: 3.5e6,
            rel_ductility: 30.0,
            compression_ratio: 10.0,
            length: 0.2,
            dt: 1e-6,
        }
    }
}

/// Complete restorable state of the specimen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpecimenState {
    /// Simulated time.
    pub time: f64,
    /// Completed steps.
    pub iteration: u64,
    /// Axial strain.
    pub strain: f64,
    /// Imposed strain rate.
    pub strain_rate: f64,
    /// Largest tensile strain reached.
    pub kappa_tension: f64,
    /// Largest compressive strain magnitude reached.
    pub kappa_compression: f64,
}

/// Stand-in stepping engine.
#[derive(Debug, Clone)]
pub struct SyntheticSpecimen {
    params: SpecimenParams,
    state: SpecimenState,
    end_radius: f64,
    waist_radius: f64,
    // Hyperboloid shape constant: r(z) = waist * sqrt(1 + (z / c)^2).
    shape_c: f64,
}

impl SyntheticSpecimen {
    /// Build an unloaded specimen. Diameter is half the length, the waist is
    /// 4/5 of the end width.
    #[must_use]
    pub fn new(params: SpecimenParams) -> Self {
        let end_radius = 0.25 * params.length;
        let waist_radius = 0.2 * params.length;
        let half = 0.5 * params.length;
        let shape_c = half / ((end_radius / waist_radius).powi(2) - 1.0).sqrt();
        Self {
            params,
            state: SpecimenState {
                time: 0.0,
                iteration: 0,
                strain: 0.0,
                strain_rate: 0.0,
                kappa_tension: 0.0,
                kappa_compression: 0.0,
            },
            end_radius,
            waist_radius,
            shape_c,
        }
    }

    /// Parameters in use.
    #[must_use]
    pub const fn params(&self) -> &SpecimenParams {
        &self.params
    }

    fn onset_strain(&self) -> f64 {
        self.params.sigma_t / self.params.young
    }

    fn damage(onset: f64, ductility: f64, kappa: f64) -> f64 {
        if kappa <= onset {
            return 0.0;
        }
        let softening = ductility * onset;
        1.0 - (onset / kappa) * (-(kappa - onset) / softening).exp()
    }

    /// Material stress at the current strain.
    fn stress(&self) -> f64 {
        let s = &self.state;
        let onset = self.onset_strain();
        if s.strain >= 0.0 {
            let omega = Self::damage(onset, self.params.rel_ductility, s.kappa_tension);
            self.params.young * s.strain * (1.0 - omega)
        } else {
            let omega = Self::damage(
                onset * self.params.compression_ratio,
                self.params.rel_ductility,
                s.kappa_compression,
            );
            self.params.young * s.strain * (1.0 - omega)
        }
    }

    fn radius_at(&self, z: f64) -> f64 {
        let half = 0.5 * self.params.length;
        if z.abs() > half {
            return 0.0;
        }
        self.waist_radius * (1.0 + (z / self.shape_c).powi(2)).sqrt()
    }

    /// Axial force: equilibrium carries the waist force through every section.
    fn axial_force(&self) -> f64 {
        self.stress() * PI * self.waist_radius.powi(2)
    }
}

impl SteppingEngine for SyntheticSpecimen {
    type State = SpecimenState;

    fn step(&mut self) -> LoadTestResult<()> {
        let s = &mut self.state;
        s.time += self.params.dt;
        s.iteration += 1;
        s.strain += s.strain_rate * self.params.dt;
        if s.strain > 0.0 {
            s.kappa_tension = s.kappa_tension.max(s.strain);
        } else {
            s.kappa_compression = s.kappa_compression.max(-s.strain);
        }
        Ok(())
    }

    fn time(&self) -> f64 {
        self.state.time
    }

    fn iteration(&self) -> u64 {
        self.state.iteration
    }

    fn read_scalar(&self, scalar: Scalar) -> f64 {
        match scalar {
            Scalar::Strain => self.state.strain,
            Scalar::AverageStress => self.stress(),
        }
    }

    fn loading_axis(&self) -> Axis {
        Axis::Z
    }

    fn extent(&self, axis: Axis) -> (f64, f64) {
        match axis {
            Axis::Z => (-0.5 * self.params.length, 0.5 * self.params.length),
            Axis::X | Axis::Y => (-self.end_radius, self.end_radius),
        }
    }

    fn section_area(&self, position: f64, axis: Axis) -> f64 {
        match axis {
            Axis::Z => PI * self.radius_at(position).powi(2),
            // Longitudinal cut through the hyperboloid, approximated as a rectangle.
            Axis::X | Axis::Y => {
                let half_width = (self.end_radius.powi(2) - position.powi(2)).max(0.0).sqrt();
                2.0 * half_width * self.params.length
            }
        }
    }

    fn section_force(&self, position: f64, axis: Axis) -> f64 {
        match axis {
            Axis::Z if self.radius_at(position) > 0.0 => self.axial_force(),
            _ => 0.0,
        }
    }

    fn set_strain_rate(&mut self, rate: f64) {
        self.state.strain_rate = rate;
    }

    fn capture(&self) -> Self::State {
        self.state
    }

    fn restore(&mut self, state: &Self::State) {
        self.state = *state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_until_softened(specimen: &mut SyntheticSpecimen, max_steps: u64) -> (f64, f64) {
        let mut peak: f64 = 0.0;
        let mut last = 0.0;
        for _ in 0..max_steps {
            specimen.step().unwrap();
            last = specimen.read_scalar(Scalar::AverageStress);
            if last.abs() > peak.abs() {
                peak = last;
            }
            if peak != 0.0 && (last / peak).abs() < 0.5 {
                break;
            }
        }
        (peak, last)
    }

    #[test]
    fn tension_peaks_near_strength_then_softens() {
        let params = SpecimenParams::default();
        let mut specimen = SyntheticSpecimen::new(params);
        specimen.set_strain_rate(0.1);
        let (peak, last) = run_until_softened(&mut specimen, 200_000);
        assert!(peak > 0.9 * params.sigma_t && peak <= params.sigma_t * 1.0001);
        assert!((last / peak).abs() < 0.5);
    }

    #[test]
    fn compression_is_stronger_than_tension() {
        let params = SpecimenParams::default();
        let mut specimen = SyntheticSpecimen::new(params);
        specimen.set_strain_rate(-1.0);
        let (peak, _) = run_until_softened(&mut specimen, 200_000);
        assert!(peak < -5.0 * params.sigma_t);
    }

    #[test]
    fn sections_carry_same_force_and_waist_is_narrowest() {
        let mut specimen = SyntheticSpecimen::new(SpecimenParams::default());
        specimen.set_strain_rate(0.1);
        for _ in 0..100 {
            specimen.step().unwrap();
        }
        let f_waist = specimen.section_force(0.0, Axis::Z);
        let f_quarter = specimen.section_force(0.05, Axis::Z);
        assert!((f_waist - f_quarter).abs() < 1e-9);
        assert!(specimen.section_area(0.0, Axis::Z) < specimen.section_area(0.05, Axis::Z));
        assert_eq!(specimen.section_force(1.0, Axis::Z), 0.0);
    }

    #[test]
    fn end_radius_matches_geometry() {
        let specimen = SyntheticSpecimen::new(SpecimenParams::default());
        let r_end = specimen.radius_at(0.1);
        assert!((r_end - 0.05).abs() < 1e-12);
    }
}
