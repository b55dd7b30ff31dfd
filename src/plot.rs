use std::{
    fs,
    path::Path,
};

use anyhow::{
    bail,
    Context,
};
use itertools::izip;
use plotters::prelude::*;
use plotters::style::text_anchor::{
    HPos,
    Pos,
    VPos,
};

use crate::{
    error::BandcharError,
    settings::PlotStyle,
    types::{
        Result,
        Vector,
    },
};


/// X positions of the two scatter columns, in data units.
pub const X_UP:   f64 = 0.0;
pub const X_DOWN: f64 = 0.01;

/// X view limits framing the two columns.
pub const X_MIN: f64 = -0.005;
pub const X_MAX: f64 =  0.015;

fn pt_to_px(pt: f64, dpi: u32) -> u32 {
    (pt * dpi as f64 / 72.0).round() as u32
}


/// Scatter data of one figure: band energies and matching orbital
/// character of both spin channels, energies already shifted so the
/// HOMO sits at zero.
#[derive(Debug)]
pub struct BandScatter {
    up_energies:    Vector<f64>,
    down_energies:  Vector<f64>,
    up_character:   Vector<f64>,
    down_character: Vector<f64>,
}

impl BandScatter {
    pub fn new(up_energies:   Vector<f64>,
               down_energies: Vector<f64>,
               up_character:   Vector<f64>,
               down_character: Vector<f64>) -> Result<Self> {
        if up_energies.is_empty() || down_energies.is_empty() {
            return Err(BandcharError::InsufficientData(
                "nothing to plot, a spin channel holds no bands".to_string()).into());
        }
        if up_energies.len() != up_character.len()
            || down_energies.len() != down_character.len() {
            return Err(BandcharError::InsufficientData(format!(
                "energies and characters disagree in length: {}/{} up, {}/{} down",
                up_energies.len(), up_character.len(),
                down_energies.len(), down_character.len())).into());
        }
        Ok(Self { up_energies, down_energies, up_character, down_character })
    }

    /// Writes the figure to `path`.
    ///
    /// The image is drawn into a `.part.png` sibling first and renamed
    /// over `path` when complete, a failed render leaves no file behind.
    pub fn render(&self, window: (f64, f64), style: &PlotStyle, path: &Path) -> Result<()> {
        if window.0 >= window.1 {
            return Err(BandcharError::InsufficientData(format!(
                "empty energy window [{}, {}]", window.0, window.1)).into());
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if ext != "png" {
            bail!("Only .png output is supported, got {:?}", path);
        }

        let tmp = path.with_extension("part.png");
        if let Err(e) = self.draw(window, style, &tmp) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        fs::rename(&tmp, path)
            .with_context(|| format!("Moving finished plot to {:?} failed", path))
    }

    fn draw(&self, window: (f64, f64), style: &PlotStyle, path: &Path) -> Result<()> {
        let width_px    = (style.figwidth  * style.dpi as f64).round() as u32;
        let height_px   = (style.figheight * style.dpi as f64).round() as u32;
        let font_px     = pt_to_px(style.font_size_pt, style.dpi).max(1);
        let stroke_px   = pt_to_px(style.marker_stroke_pt, style.dpi).max(1);
        let hairline_px = pt_to_px(1.0, style.dpi).max(1);
        let cbar_px     = (width_px as f64 * style.colorbar_frac).round() as u32;

        let root = BitMapBackend::new(path, (width_px, height_px)).into_drawing_area();
        root.fill(&WHITE)?;
        let (main, cbar) = root.split_horizontally(width_px.saturating_sub(cbar_px) as i32);

        let label_font = (style.font_family.as_str(), font_px as i32).into_font();

        let mut chart = ChartBuilder::on(&main)
            .margin((font_px / 2) as i32)
            .x_label_area_size((font_px * 2) as i32)
            .y_label_area_size((font_px * 3) as i32)
            .build_cartesian_2d(X_MIN .. X_MAX, window.0 .. window.1)?;

        chart.configure_mesh()
            .disable_mesh()
            .x_labels(0)
            .y_desc("Energies (eV)")
            .axis_desc_style(label_font.clone())
            .label_style(label_font.clone())
            .draw()?;

        // dashed reference line at the shifted HOMO energy
        if window.0 < 0.0 && window.1 > 0.0 {
            let ndash = 24;
            let step = (X_MAX - X_MIN) / ndash as f64;
            chart.draw_series((0 .. ndash).step_by(2).map(|i| {
                let x0 = X_MIN + step * i as f64;
                PathElement::new(vec![(x0, 0.0), (x0 + step, 0.0)],
                                 BLACK.mix(0.8).stroke_width(hairline_px))
            }))?;
        }

        let halfwidth = style.marker_halfwidth;
        for (energies, character, x) in [
            (&self.up_energies,   &self.up_character,   X_UP),
            (&self.down_energies, &self.down_character, X_DOWN),
        ] {
            chart.draw_series(
                izip!(energies.iter(), character.iter())
                    .filter(|(e, _)| **e >= window.0 && **e <= window.1)
                    .map(|(e, c)| {
                        let marker = style.colormap.color_at(*c).stroke_width(stroke_px);
                        PathElement::new(vec![(x - halfwidth, *e), (x + halfwidth, *e)], marker)
                    }),
            )?;
        }

        // column labels go below the x axis, anchored on the column centers
        let text_style = TextStyle::from(label_font.clone())
            .pos(Pos::new(HPos::Center, VPos::Top));
        for (label, x) in [("Spin Up", X_UP), ("Spin Down", X_DOWN)] {
            let (px, py) = chart.backend_coord(&(x, window.0));
            root.draw(&Text::new(label, (px, py + (font_px / 4) as i32),
                                 text_style.clone()))?;
        }

        let mut bar = ChartBuilder::on(&cbar)
            .margin((font_px / 2) as i32)
            .set_label_area_size(LabelAreaPosition::Right, (font_px * 2) as i32)
            .set_label_area_size(LabelAreaPosition::Bottom, (font_px * 2) as i32)
            .build_cartesian_2d(0.0f64 .. 1.0, 0.0f64 .. 1.0)?;

        bar.configure_mesh()
            .disable_mesh()
            .x_labels(0)
            .y_labels(6)
            .label_style(label_font)
            .draw()?;

        let nslab = 128;
        bar.draw_series((0 .. nslab).map(|i| {
            let y0 = i as f64 / nslab as f64;
            let y1 = (i + 1) as f64 / nslab as f64;
            Rectangle::new([(0.0, y0), (1.0, y1)],
                           style.colormap.color_at((y0 + y1) / 2.0).filled())
        }))?;

        root.present()?;
        Ok(())
    }
}
