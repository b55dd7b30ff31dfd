use std::path::Path;

use anyhow::Context;
use regex::Regex;

use crate::{
    error::BandcharError,
    types::Result,
    vasp_parsers::read_txt_maybe_compressed,
};

/// Scalar metadata taken from OUTCAR. Only the fields this tool consumes
/// are kept.
///
/// `E-fermi` and `TOTEN` appear once per ionic step, the values here are
/// the last printed ones.
#[derive(Clone, Debug, PartialEq)]
pub struct Outcar {
    pub ispin:  i32,
    pub nions:  i32,
    pub nkpts:  i32,
    pub nbands: i32,
    pub efermi: f64,
    pub toten:  f64,
}

impl Outcar {
    pub fn from_file(path: &(impl AsRef<Path> + ?Sized)) -> Result<Self> {
        let context = read_txt_maybe_compressed(path.as_ref())?;
        Self::from_context(&context)
            .with_context(|| format!("Parsing OUTCAR file {:?} failed", path.as_ref()))
    }

    fn from_context(context: &str) -> Result<Self> {
        let ispin           = Self::parse_ispin(context)?;
        let nions           = Self::parse_nions(context)?;
        let (nkpts, nbands) = Self::parse_nkpts_nbands(context)?;
        let efermi          = Self::parse_efermi(context)?;
        let toten           = Self::parse_toten(context)?;

        Ok(Self { ispin, nions, nkpts, nbands, efermi, toten })
    }

    fn parse_ispin(context: &str) -> Result<i32> {
        Ok(Regex::new(r"ISPIN  =      (\d)")
            .unwrap()
            .captures(context)
            .ok_or_else(|| BandcharError::NotFound("ISPIN field in OUTCAR".to_string()))?
            .get(1)
            .unwrap()
            .as_str()
            .parse::<i32>()
            .map_err(|e| BandcharError::Parse(format!("invalid ISPIN value: {}", e)))?)
    }

    fn parse_nions(context: &str) -> Result<i32> {
        Ok(Regex::new(r"NIONS = \s+(\d+)")
            .unwrap()
            .captures(context)
            .ok_or_else(|| BandcharError::NotFound("NIONS field in OUTCAR".to_string()))?
            .get(1)
            .unwrap()
            .as_str()
            .parse::<i32>()
            .map_err(|e| BandcharError::Parse(format!("invalid NIONS value: {}", e)))?)
    }

    fn parse_nkpts_nbands(context: &str) -> Result<(i32, i32)> {
        let caps = Regex::new(r"NKPTS = \s*(\d+) .* NBANDS= \s*(\d+)")
            .unwrap()
            .captures(context)
            .ok_or_else(|| BandcharError::NotFound("NKPTS/NBANDS fields in OUTCAR".to_string()))?;
        let nkpts = caps.get(1).unwrap().as_str().parse::<i32>()
            .map_err(|e| BandcharError::Parse(format!("invalid NKPTS value: {}", e)))?;
        let nbands = caps.get(2).unwrap().as_str().parse::<i32>()
            .map_err(|e| BandcharError::Parse(format!("invalid NBANDS value: {}", e)))?;
        Ok((nkpts, nbands))
    }

    // The last occurrence wins: VASP prints one E-fermi per ionic step and
    // only the final one belongs to the converged charge density.
    fn parse_efermi(context: &str) -> Result<f64> {
        Ok(Regex::new(r" E-fermi : \s*([-+]?[0-9]+[.]?[0-9]*)")
            .unwrap()
            .captures_iter(context)
            .last()
            .ok_or_else(|| BandcharError::NotFound("E-fermi in OUTCAR".to_string()))?
            .get(1)
            .unwrap()
            .as_str()
            .parse::<f64>()
            .map_err(|e| BandcharError::Parse(format!("invalid E-fermi value: {}", e)))?)
    }

    // Two spaces after `free` select the end-of-ionic-step lines; the
    // single-space variant printed inside the SCF loop is skipped.
    fn parse_toten(context: &str) -> Result<f64> {
        Ok(Regex::new(r"free  energy   TOTEN  = \s*([-+]?[0-9]+[.]?[0-9]*([eE][-+]?[0-9]+)?) eV")
            .unwrap()
            .captures_iter(context)
            .last()
            .ok_or_else(|| BandcharError::NotFound("TOTEN in OUTCAR".to_string()))?
            .get(1)
            .unwrap()
            .as_str()
            .parse::<f64>()
            .map_err(|e| BandcharError::Parse(format!("invalid TOTEN value: {}", e)))?)
    }
}
