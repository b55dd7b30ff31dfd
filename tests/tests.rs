use std::fs;
use std::io::Write;
use std::path::PathBuf;

use approx::assert_relative_eq;
use flate2::{
    write::GzEncoder,
    Compression,
};
use ndarray::arr1;
use tempdir::TempDir;

use bandchar::{
    analysis::{
        GapReport,
        OrbitalWeights,
        SpinBands,
    },
    plot::BandScatter,
    settings::{
        Colormap,
        PlotStyle,
    },
    types::Result,
    BandcharError,
    Outcar,
    Procar,
};

// #[macro_export]
macro_rules! get_fpath_in_current_dir {
    ($fname:expr) => {{
        let mut path = PathBuf::from(file!());
        path.pop();
        path.push($fname);
        path
    }}
}

#[test]
fn test_read_procar() -> Result<()> {
    let fname = get_fpath_in_current_dir!("PROCAR_fe_gamma");
    let procar = Procar::from_file(&fname)?;

    assert_eq!(procar.pdos.nspin, 2);
    assert_eq!(procar.pdos.nkpoints, 1);
    assert_eq!(procar.pdos.nbands, 4);
    assert_eq!(procar.pdos.nions, 2);
    assert_eq!(procar.pdos.nlm.len(), 10);
    assert_eq!(procar.pdos.nlm.last().map(String::as_str), Some("tot"));

    assert_eq!(procar.kpoints.nkpoints, 1);
    assert_eq!(procar.kpoints.weights[0], 1.0);
    assert_eq!(procar.kpoints.kpointlist.row(0).to_vec(), vec![0.0, 0.0, 0.0]);

    assert_eq!(procar.pdos.eigvals[[0, 0, 0]], -3.0);
    assert_eq!(procar.pdos.eigvals[[0, 0, 1]], -1.0);
    assert_eq!(procar.pdos.eigvals[[1, 0, 0]], -2.5);
    assert_eq!(procar.pdos.eigvals[[1, 0, 3]],  4.5);
    assert_eq!(procar.pdos.occupations[[0, 0, 1]], 1.0);
    assert_eq!(procar.pdos.occupations[[0, 0, 2]], 0.0);

    // the trailing ion row holds the over-ions totals
    assert_eq!(procar.pdos.projected[[0, 0, 0, 2, 6]], 0.2);
    assert_eq!(procar.pdos.projected[[0, 0, 0, 2, 9]], 0.5);
    assert_eq!(procar.pdos.projected[[1, 0, 1, 2, 6]], 0.3);
    Ok(())
}


#[test]
fn test_read_procar_gz() -> Result<()> {
    let raw = fs::read(get_fpath_in_current_dir!("PROCAR_fe_gamma"))?;

    let tmpdir = TempDir::new("bandchar_gz")?;
    let gzpath = tmpdir.path().join("PROCAR_fe_gamma.gz");
    let mut encoder = GzEncoder::new(fs::File::create(&gzpath)?, Compression::default());
    encoder.write_all(&raw)?;
    encoder.finish()?;

    let procar = Procar::from_file(&gzpath)?;
    assert_eq!(procar.pdos.nbands, 4);
    assert_eq!(procar.pdos.eigvals[[1, 0, 0]], -2.5);
    Ok(())
}


#[test]
fn test_read_outcar() -> Result<()> {
    let fname = get_fpath_in_current_dir!("OUTCAR_fe_gamma");
    let outcar = Outcar::from_file(&fname)?;

    assert_eq!(outcar.ispin, 2);
    assert_eq!(outcar.nions, 2);
    assert_eq!(outcar.nkpts, 1);
    assert_eq!(outcar.nbands, 4);
    assert_eq!(outcar.efermi, 1.23);
    assert_eq!(outcar.toten, -500.456);
    Ok(())
}


#[test]
fn test_gap_report_from_files() -> Result<()> {
    let procar = Procar::from_file(&get_fpath_in_current_dir!("PROCAR_fe_gamma"))?;
    let outcar = Outcar::from_file(&get_fpath_in_current_dir!("OUTCAR_fe_gamma"))?;

    let bands = SpinBands::from_procar(&procar, 0)?;
    let report = GapReport::new(&bands, outcar.efermi)?;

    assert_eq!(report.homo_index, 1);
    assert_eq!(report.homo_energy, -1.0);
    assert_eq!(report.band_gap, 3.0);
    assert_eq!(report.spin_flip_below, -1.5);
    assert_eq!(report.spin_flip_above, 3.5);

    let (up, down) = bands.shifted(report.homo_energy);
    assert_eq!(up[report.homo_index], 0.0);
    assert_eq!(down.to_vec(), vec![-1.5, 0.5, 3.5, 5.5]);
    Ok(())
}


#[test]
fn test_character_normalization() -> Result<()> {
    let procar = Procar::from_file(&get_fpath_in_current_dir!("PROCAR_fe_gamma"))?;
    let weights = OrbitalWeights::from_procar(&procar, 0)?;

    let iorbit = weights.orbital_index("dz2")?;
    assert_eq!(iorbit, 6);

    let character = weights.character(iorbit)?;
    assert_eq!(character.dim(), (2, 4));
    assert_relative_eq!(character[[0, 0]], 0.4,        epsilon = 1e-12);
    assert_relative_eq!(character[[0, 1]], 0.6 / 0.65, epsilon = 1e-12);
    assert_relative_eq!(character[[0, 2]], 0.1 / 0.6,  epsilon = 1e-12);
    assert_eq!(character[[0, 3]], 0.0);
    assert_relative_eq!(character[[1, 0]], 0.5,        epsilon = 1e-12);
    assert_relative_eq!(character[[1, 2]], 0.1,        epsilon = 1e-12);
    Ok(())
}


#[test]
fn test_character_zero_total_from_file() -> Result<()> {
    let tmpdir = TempDir::new("bandchar_zero")?;
    let path = tmpdir.path().join("PROCAR");
    fs::write(&path, "\
PROCAR lm decomposed
# of k-points:    1         # of bands:    2         # of ions:    1

 k-point     1 :    0.00000000 0.00000000 0.00000000     weight = 1.00000000

band     1 # energy   -1.00000000 # occ.  1.00000000

ion      s     py     pz     px    dxy    dyz    dz2    dxz    dx2    tot
  1  0.400  0.000  0.000  0.000  0.000  0.000  0.100  0.000  0.000  0.500

band     2 # energy    2.00000000 # occ.  0.00000000

ion      s     py     pz     px    dxy    dyz    dz2    dxz    dx2    tot
  1  0.000  0.000  0.000  0.000  0.000  0.000  0.000  0.000  0.000  0.000
")?;

    let procar  = Procar::from_file(&path)?;
    let weights = OrbitalWeights::from_procar(&procar, 0)?;
    let err = weights.character(weights.orbital_index("dz2")?).unwrap_err();

    match err.downcast_ref::<BandcharError>() {
        Some(BandcharError::DivideByZero { ispin, iband }) => {
            assert_eq!((*ispin, *iband), (1, 2));
        }
        other => panic!("unexpected error kind: {:?}", other),
    }
    Ok(())
}


#[test]
fn test_missing_input_is_not_found() {
    let err = Procar::from_file("no_such_PROCAR").unwrap_err();
    assert!(matches!(err.downcast_ref::<BandcharError>(),
                     Some(BandcharError::NotFound(_))));
}


// Needs fonts installed: cargo test -- --ignored
#[test]
#[ignore]
fn test_render_figure() -> Result<()> {
    let procar = Procar::from_file(&get_fpath_in_current_dir!("PROCAR_fe_gamma"))?;
    let outcar = Outcar::from_file(&get_fpath_in_current_dir!("OUTCAR_fe_gamma"))?;

    let bands  = SpinBands::from_procar(&procar, 0)?;
    let report = GapReport::new(&bands, outcar.efermi)?;
    let weights = OrbitalWeights::from_procar(&procar, 0)?;
    let character = weights.character(weights.orbital_index("dz2")?)?;
    let (up, down) = bands.shifted(report.homo_energy);

    let scatter = BandScatter::new(up, down,
                                   character.row(0).to_owned(),
                                   character.row(1).to_owned())?;

    let tmpdir = TempDir::new("bandchar_render")?;
    let target = tmpdir.path().join("band_character.png");
    let style = PlotStyle {
        figwidth:  2.0,
        figheight: 3.0,
        dpi:       150,
        ..Default::default()
    };
    scatter.render((-2.5, 5.0), &style, &target)?;

    assert!(target.is_file());
    assert!(fs::metadata(&target)?.len() > 0);
    assert!(!tmpdir.path().join("band_character.part.png").exists());
    Ok(())
}


#[test]
fn test_render_rejects_empty_channel() {
    let err = BandScatter::new(arr1(&[]), arr1(&[]), arr1(&[]), arr1(&[]))
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<BandcharError>(),
                     Some(BandcharError::InsufficientData(_))));
}


#[test]
fn test_style_from_file() -> Result<()> {
    let tmpdir = TempDir::new("bandchar_style")?;
    let path = tmpdir.path().join("style.toml");
    fs::write(&path, "dpi = 100\ncolormap = \"copper\"\n")?;

    let style = PlotStyle::from_file(Some(&path))?;
    assert_eq!(style.dpi, 100);
    assert_eq!(style.colormap, Colormap::Copper);
    assert_eq!(style.figwidth, 3.0);
    Ok(())
}
