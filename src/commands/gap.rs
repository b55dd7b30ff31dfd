use std::path::PathBuf;

use anyhow::bail;
use clap::Args;
use log::{
    info,
    warn,
};

use crate::{
    analysis::{
        GapReport,
        SpinBands,
    },
    cli::OptProcess,
    commands::common::{
        format_gap_report,
        parse_file_pair,
    },
    types::Result,
};


#[derive(Debug, Args)]
/// Print the band gap and the spin-flip gaps around the HOMO at one k-point.
///
/// The HOMO is the highest spin-up band below the Fermi energy. Besides the
/// plain gap to the next spin-up band, the energies of the spin-down bands
/// right below and above the HOMO index are reported relative to the HOMO.
pub struct Gap {
    #[arg(short = 'p', long, default_value = "./PROCAR")]
    /// PROCAR file name, provides the band energies.
    procar: PathBuf,

    #[arg(short = 'o', long, default_value = "./OUTCAR")]
    /// OUTCAR file name, provides the Fermi energy and the total energy.
    outcar: PathBuf,

    #[arg(short = 'k', long, default_value_t = 1)]
    /// One selected k-point index, count starts from 1.
    ///
    /// Example: --ikpoint 2
    ikpoint: usize,

    #[arg(long)]
    /// Override the Fermi energy read from OUTCAR, in eV.
    efermi: Option<f64>,
}


impl OptProcess for Gap {
    fn process(&self) -> Result<()> {
        if self.ikpoint == 0 {
            bail!("K-point indices count from 1");
        }

        let (procar, outcar) = parse_file_pair(&self.procar, &self.outcar)?;

        if outcar.ispin != 2 {
            warn!("OUTCAR reports ISPIN = {}, a spin-polarized calculation is expected",
                  outcar.ispin);
        }

        let efermi = self.efermi.unwrap_or(outcar.efermi);
        if self.efermi.is_some() {
            info!("Overriding the Fermi energy from OUTCAR ({} eV) with {} eV",
                  outcar.efermi, efermi);
        }

        let bands  = SpinBands::from_procar(&procar, self.ikpoint - 1)?;
        let report = GapReport::new(&bands, efermi)?;

        println!("{}", format_gap_report(&report, efermi, outcar.toten));

        Ok(())
    }
}
