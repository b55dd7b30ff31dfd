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
        OrbitalWeights,
        SpinBands,
    },
    cli::OptProcess,
    commands::common::{
        format_gap_report,
        parse_file_pair,
        write_array_to_txt,
    },
    plot::{
        BandScatter,
        X_DOWN,
        X_MAX,
        X_MIN,
        X_UP,
    },
    settings::PlotStyle,
    types::{
        Result,
        Vector,
    },
};


#[derive(Debug, Args)]
/// Plot the band energies of both spin channels at one k-point, colored
/// by the weight of a selected orbital.
///
/// Requires a spin-polarized calculation (ISPIN = 2) with LORBIT = 11.
/// The plotted energies are shifted so that the spin-up HOMO lies at zero,
/// marker colors encode the selected orbital's share of the band's total
/// projection on a fixed [0, 1] scale.
pub struct Band {
    #[arg(short = 'p', long, default_value = "./PROCAR")]
    /// PROCAR file name, provides the band energies and orbital projections.
    procar: PathBuf,

    #[arg(short = 'o', long, default_value = "./OUTCAR")]
    /// OUTCAR file name, provides the Fermi energy and the total energy.
    outcar: PathBuf,

    #[arg(short = 'k', long, default_value_t = 1)]
    /// One selected k-point index, count starts from 1.
    ///
    /// Example: --ikpoint 2
    ikpoint: usize,

    #[arg(long, default_value = "dz2")]
    /// Orbital whose character colors the markers.
    ///
    /// Example: --orbital px
    orbital: String,

    #[arg(long, num_args(2), allow_hyphen_values = true,
          value_names = ["EMIN", "EMAX"],
          default_values_t = [-2.5, 5.0])]
    /// Energy window of the plot relative to the HOMO, in eV.
    erange: Vec<f64>,

    #[arg(long)]
    /// Override the Fermi energy read from OUTCAR, in eV.
    efermi: Option<f64>,

    #[arg(long, default_value = "./band_character.png")]
    /// Write the figure to this path.
    pngout: PathBuf,

    #[arg(long)]
    /// Override the figure resolution in dots per inch.
    dpi: Option<u32>,

    #[arg(long, default_value = "./band_character.txt")]
    /// Write the raw plot data as txt file in order to replot it with more advanced tools.
    txtout: PathBuf,

    #[arg(long)]
    /// Also write the plot to html and view it in the web browser.
    htmlout: Option<PathBuf>,

    #[arg(long)]
    /// Open default browser to see the html plot immediately.
    show: bool,

    #[arg(long = "no-print-energies")]
    /// Don't print the HOMO position and gap summary.
    no_print_energies: bool,

    #[arg(long)]
    /// Load the plot style from this TOML file.
    style: Option<PathBuf>,

    #[arg(long)]
    /// Print a plot style template to stdout and exit.
    gen_template: bool,
}


impl Band {
    fn html_plot(&self,
                 up: &Vector<f64>, down: &Vector<f64>,
                 up_character: &Vector<f64>, down_character: &Vector<f64>,
                 window: (f64, f64), style: &PlotStyle) -> plotly::Plot {
        let to_colors = |character: &Vector<f64>| {
            character.iter()
                .map(|c| {
                    let color = style.colormap.color_at(*c);
                    plotly::common::color::Rgb::new(color.0, color.1, color.2)
                })
                .collect::<Vec<_>>()
        };

        let trace_up = plotly::Scatter::from_array(
                Vector::from_elem(up.len(), X_UP), up.to_owned())
            .mode(plotly::common::Mode::Markers)
            .name("Spin Up")
            .marker(plotly::common::Marker::new()
                    .size(10)
                    .color_array(to_colors(up_character)));
        let trace_down = plotly::Scatter::from_array(
                Vector::from_elem(down.len(), X_DOWN), down.to_owned())
            .mode(plotly::common::Mode::Markers)
            .name("Spin Down")
            .marker(plotly::common::Marker::new()
                    .size(10)
                    .color_array(to_colors(down_character)));

        let mut plot = plotly::Plot::new();
        plot.add_trace(trace_up);
        plot.add_trace(trace_down);
        plot.use_local_plotly();

        let layout = plotly::Layout::new()
            .title(plotly::common::Title::new(
                    &format!("Orbital character: {}", self.orbital)))
            .y_axis(plotly::layout::Axis::new()
                    .title(plotly::common::Title::new("Energies (eV)"))
                    .range(vec![window.0, window.1])
                    .zero_line(true))
            .x_axis(plotly::layout::Axis::new()
                    .range(vec![X_MIN, X_MAX])
                    .zero_line(false));
        plot.set_layout(layout);

        plot
    }
}


impl OptProcess for Band {
    fn process(&self) -> Result<()> {
        if self.gen_template {
            print!("{}", PlotStyle::template()?);
            return Ok(());
        }

        if self.ikpoint == 0 {
            bail!("K-point indices count from 1");
        }
        let window = (self.erange[0], self.erange[1]);
        if window.0 >= window.1 {
            bail!("Invalid energy range [{}, {}]: EMIN must lie below EMAX",
                  window.0, window.1);
        }

        let mut style = PlotStyle::from_file(self.style.as_deref())?;
        if let Some(dpi) = self.dpi {
            style.dpi = dpi;
        }

        let (procar, outcar) = parse_file_pair(&self.procar, &self.outcar)?;

        if outcar.ispin != 2 {
            warn!("OUTCAR reports ISPIN = {}, a spin-polarized calculation is expected",
                  outcar.ispin);
        }
        if procar.pdos.nkpoints as i32 != outcar.nkpts
            || procar.pdos.nbands as i32 != outcar.nbands {
            warn!("PROCAR and OUTCAR disagree on the table size: \
                   {} k-points x {} bands vs {} x {}",
                  procar.pdos.nkpoints, procar.pdos.nbands,
                  outcar.nkpts, outcar.nbands);
        }

        let efermi = self.efermi.unwrap_or(outcar.efermi);
        if self.efermi.is_some() {
            info!("Overriding the Fermi energy from OUTCAR ({} eV) with {} eV",
                  outcar.efermi, efermi);
        }

        let ikpoint = self.ikpoint - 1;
        let bands  = SpinBands::from_procar(&procar, ikpoint)?;
        let report = GapReport::new(&bands, efermi)?;

        if !self.no_print_energies {
            println!("{}", format_gap_report(&report, efermi, outcar.toten));
        }

        let weights = OrbitalWeights::from_procar(&procar, ikpoint)?;
        let iorbit = weights.orbital_index(&self.orbital)?;
        let character = weights.character(iorbit)?;
        let up_character   = character.row(0).to_owned();
        let down_character = character.row(1).to_owned();

        let (up, down) = bands.shifted(report.homo_energy);

        info!("Writing raw plot data to {:?}", self.txtout);
        write_array_to_txt(
            &self.txtout,
            vec![&up, &up_character, &down, &down_character],
            "E_up-E_HOMO(eV) character_up E_dn-E_HOMO(eV) character_dn")?;

        if let Some(htmlout) = self.htmlout.as_ref() {
            let plot = self.html_plot(&up, &down, &up_character, &down_character,
                                      window, &style);
            info!("Writing to {:?}", htmlout);
            plot.to_html(htmlout);

            if self.show {
                plot.show();
            }
        } else if self.show {
            warn!("`--show` does nothing without `--htmlout`");
        }

        let scatter = BandScatter::new(up, down, up_character, down_character)?;
        info!("Writing figure to {:?}", self.pngout);
        scatter.render(window, &style, &self.pngout)?;

        Ok(())
    }
}
