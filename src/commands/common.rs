use std::{
    fs,
    io::Write,
    path::Path,
};

use anyhow::{
    anyhow,
    bail,
    Context,
};
use colored::Colorize;
use log::info;
use ndarray::Array1;

use crate::{
    analysis::GapReport,
    types::Result,
    vasp_parsers::{
        outcar::Outcar,
        procar::Procar,
    },
};


/// Parses the PROCAR/OUTCAR pair, both files in parallel.
pub fn parse_file_pair(procar_path: &Path, outcar_path: &Path) -> Result<(Procar, Outcar)> {
    let mut procar: Result<Procar> = Err(anyhow!(""));
    let mut outcar: Result<Outcar> = Err(anyhow!(""));

    rayon::scope(|s| {
        s.spawn(|_| {
            info!("Reading band projections from {:?}", procar_path);
            procar = Procar::from_file(procar_path);
        });
        s.spawn(|_| {
            info!("Reading {:?}", outcar_path);
            outcar = Outcar::from_file(outcar_path);
        });
    });

    let procar = procar.context(format!("Parse file {:?} failed.", procar_path))?;
    let outcar = outcar.context(format!("Parse file {:?} failed.", outcar_path))?;

    Ok((procar, outcar))
}


/// Console block with the HOMO position, the gaps around it and the two
/// energies echoed from OUTCAR.
///
/// The Fermi and total energy keep their shortest decimal form, the
/// derived gaps are printed with fixed precision.
pub fn format_gap_report(report: &GapReport, efermi: f64, toten: f64) -> String {
    let mut output = String::with_capacity(512);
    output.push_str("----------------------------------------------------------------\n");
    output.push_str(&format!("     HOMO is spin-up band {} at {} eV\n",
                             format!("{}", report.homo_index + 1).bright_yellow(),
                             format!("{:12.6}", report.homo_energy).bright_cyan()));
    output.push_str(&format!("         band gap above HOMO:  {} eV\n",
                             format!("{:12.6}", report.band_gap).bright_cyan()));
    output.push_str(&format!("    spin-flip gap below HOMO:  {} eV\n",
                             format!("{:12.6}", report.spin_flip_below).bright_cyan()));
    output.push_str(&format!("    spin-flip gap above HOMO:  {} eV\n",
                             format!("{:12.6}", report.spin_flip_above).bright_cyan()));
    output.push_str(&format!("                Fermi energy:  {} eV\n",
                             format!("{:>12}", efermi).bright_blue()));
    output.push_str(&format!("         total energy(TOTEN):  {} eV\n",
                             format!("{:>12}", toten).bright_blue()));
    output.push_str("----------------------------------------------------------------");
    output
}


pub fn write_array_to_txt(file_name: &(impl AsRef<Path> + ?Sized),
                          ys: Vec<&Array1<f64>>,
                          comment: &str) -> Result<()> {
    let first = ys.first().context("At least one data column is needed")?;
    let nrow = first.len();

    if nrow == 0 || !ys.iter().all(|y| y.len() == nrow) {
        bail!("Data columns are empty or don't have consistent lengths");
    }

    let mut f = fs::OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(file_name)?;

    writeln!(f, "# {}", comment.trim())?;

    for irow in 0 .. nrow {
        let mut line = String::with_capacity(ys.len() * 17);
        for col in ys.iter() {
            line.push_str(&format!("  {:15.6}", col[irow]));
        }
        line.push('\n');
        f.write_all(line.as_bytes())?;
    }

    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;
    use tempdir::TempDir;

    #[test]
    fn test_write_array_to_txt() {
        let tmpdir = TempDir::new("bandchar_txt").unwrap();
        let path = tmpdir.path().join("columns.txt");

        let a = arr1(&[-2.0, 0.0, 3.0]);
        let b = arr1(&[0.4, 0.9, 0.1]);
        write_array_to_txt(&path, vec![&a, &b], "E(eV) character").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines = content.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "# E(eV) character");
        assert!(lines[1].contains("-2.000000"));
        assert!(lines[1].contains("0.400000"));
    }

    #[test]
    fn test_write_array_rejects_ragged_columns() {
        let tmpdir = TempDir::new("bandchar_txt").unwrap();
        let path = tmpdir.path().join("columns.txt");

        let a = arr1(&[1.0, 2.0]);
        let b = arr1(&[1.0]);
        assert!(write_array_to_txt(&path, vec![&a, &b], "ragged").is_err());
        assert!(write_array_to_txt(&path, vec![], "empty").is_err());
    }

    #[test]
    fn test_format_gap_report_echoes_outcar_energies() {
        let report = GapReport {
            homo_index:      1,
            homo_energy:     -1.0,
            band_gap:        3.0,
            spin_flip_below: -1.5,
            spin_flip_above: 3.5,
        };
        let text = format_gap_report(&report, 1.23, -500.456);

        assert!(text.contains("HOMO is spin-up band"));
        assert!(text.contains("-1.000000"));
        assert!(text.contains("3.000000"));
        assert!(text.contains("-1.500000"));
        assert!(text.contains("3.500000"));
        assert!(text.contains("1.23"));
        assert!(text.contains("-500.456"));
    }
}
