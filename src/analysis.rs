use anyhow::Context;
use ndarray::s;

use crate::{
    error::BandcharError,
    types::{
        Cube,
        Matrix,
        Result,
        Vector,
    },
    vasp_parsers::procar::Procar,
};


/// Band energies of both spin channels at a single k-point.
#[derive(Clone, Debug)]
pub struct SpinBands {
    pub up:   Vector<f64>,
    pub down: Vector<f64>,
}

impl SpinBands {
    pub fn new(up: Vector<f64>, down: Vector<f64>) -> Result<Self> {
        if up.is_empty() || down.is_empty() {
            return Err(BandcharError::InsufficientData(
                "a spin channel holds no bands".to_string()).into());
        }
        if up.len() != down.len() {
            return Err(BandcharError::InsufficientData(format!(
                "spin channels hold {} and {} bands", up.len(), down.len())).into());
        }
        Ok(Self { up, down })
    }

    pub fn from_procar(procar: &Procar, ikpoint: usize) -> Result<Self> {
        let pdos = &procar.pdos;
        if pdos.nspin != 2 {
            return Err(BandcharError::InsufficientData(format!(
                "spin-polarized data required, PROCAR holds {} spin channel(s)",
                pdos.nspin)).into());
        }
        if ikpoint >= pdos.nkpoints as usize {
            return Err(BandcharError::InsufficientData(format!(
                "k-point {} requested where the file holds {}",
                ikpoint + 1, pdos.nkpoints)).into());
        }
        Self::new(
            pdos.eigvals.slice(s![0, ikpoint, ..]).to_owned(),
            pdos.eigvals.slice(s![1, ikpoint, ..]).to_owned(),
        )
    }

    /// Splits one flat list into the up and down channel, first half up.
    pub fn from_concatenated(values: &Vector<f64>) -> Result<Self> {
        let n = values.len();
        if n == 0 {
            return Err(BandcharError::InsufficientData(
                "no band energies given".to_string()).into());
        }
        if n % 2 != 0 {
            return Err(BandcharError::InsufficientData(format!(
                "an odd number of values ({}) cannot split into two spin channels", n)).into());
        }
        Self::new(
            values.slice(s![.. n/2]).to_owned(),
            values.slice(s![n/2 ..]).to_owned(),
        )
    }

    pub fn nbands(&self) -> usize {
        self.up.len()
    }

    /// Index of the highest spin-up band below the Fermi energy.
    pub fn homo_index(&self, efermi: f64) -> Result<usize> {
        let occupied = self.up.iter().filter(|e| **e < efermi).count();
        if occupied == 0 {
            return Err(BandcharError::InsufficientData(format!(
                "no spin-up band lies below the Fermi energy {} eV", efermi)).into());
        }
        Ok(occupied - 1)
    }

    /// Band energies with `e0` subtracted from both channels.
    pub fn shifted(&self, e0: f64) -> (Vector<f64>, Vector<f64>) {
        (&self.up - e0, &self.down - e0)
    }
}


/// Gaps around the spin-up HOMO.
///
/// `band_gap` stays within the up channel, the spin-flip gaps reach into
/// the down channel one band below and above the HOMO index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GapReport {
    pub homo_index:      usize,
    pub homo_energy:     f64,
    pub band_gap:        f64,
    pub spin_flip_below: f64,
    pub spin_flip_above: f64,
}

impl GapReport {
    pub fn new(bands: &SpinBands, efermi: f64) -> Result<Self> {
        let h = bands.homo_index(efermi)?;
        if h == 0 {
            return Err(BandcharError::InsufficientData(
                "the HOMO is the lowest band in the file, \
                 the spin-flip gap below it is undefined".to_string()).into());
        }
        if h + 1 >= bands.nbands() {
            return Err(BandcharError::InsufficientData(
                "the HOMO is the highest band in the file, \
                 no band above it is available".to_string()).into());
        }

        let homo_energy = bands.up[h];
        Ok(Self {
            homo_index:      h,
            homo_energy,
            band_gap:        bands.up[h + 1]   - homo_energy,
            spin_flip_below: bands.down[h - 1] - homo_energy,
            spin_flip_above: bands.down[h + 1] - homo_energy,
        })
    }
}


/// Over-ions orbital projections at a single k-point.
///
/// `weights` is indexed `[ispin, iband, iorbit]` and the last `nlm` entry
/// is the over-orbitals `tot` column.
#[derive(Clone, Debug)]
pub struct OrbitalWeights {
    pub nlm:     Vec<String>,
    pub weights: Cube<f64>,
}

impl OrbitalWeights {
    pub fn from_procar(procar: &Procar, ikpoint: usize) -> Result<Self> {
        let pdos = &procar.pdos;
        if ikpoint >= pdos.nkpoints as usize {
            return Err(BandcharError::InsufficientData(format!(
                "k-point {} requested where the file holds {}",
                ikpoint + 1, pdos.nkpoints)).into());
        }
        let nions = pdos.nions as usize;
        Ok(Self {
            nlm:     pdos.nlm.clone(),
            weights: pdos.projected.slice(s![.., ikpoint, .., nions, ..]).to_owned(),
        })
    }

    pub fn orbital_index(&self, name: &str) -> Result<usize> {
        self.nlm.iter().position(|n| n == name)
            .ok_or_else(|| anyhow::Error::from(
                BandcharError::NotFound(format!("orbital {:?}", name))))
            .with_context(|| format!("this PROCAR provides: {}", self.nlm.join(" ")))
    }

    /// Fraction of each band's total projection carried by one orbital.
    ///
    /// A band whose `tot` column is exactly zero has no defined character,
    /// that is reported as an error instead of dividing through.
    pub fn character(&self, iorbit: usize) -> Result<Matrix<f64>> {
        let (nspin, nbands, norbits) = self.weights.dim();
        if iorbit >= norbits {
            return Err(BandcharError::NotFound(
                format!("orbital column {}", iorbit)).into());
        }

        let itot = norbits - 1;
        let mut character = Matrix::<f64>::zeros((nspin, nbands));
        for ispin in 0 .. nspin {
            for iband in 0 .. nbands {
                let total = self.weights[[ispin, iband, itot]];
                if total == 0.0 {
                    return Err(BandcharError::DivideByZero {
                        ispin: ispin + 1,
                        iband: iband + 1,
                    }.into());
                }
                character[[ispin, iband]] = self.weights[[ispin, iband, iorbit]] / total;
            }
        }
        Ok(character)
    }
}
