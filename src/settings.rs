use std::path::Path;

use anyhow::Context;
use directories::ProjectDirs;
use figment::{
    providers::{
        Format,
        Serialized,
        Toml,
    },
    Figment,
};
use plotters::style::{
    colors::colormaps::{
        BlackWhite,
        Bone,
        ColorMap,
        Copper,
        ViridisRGB,
    },
    RGBColor,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    error::BandcharError,
    types::Result,
};


/// Color scale for the orbital character.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    Viridis,
    Bone,
    Copper,
    Greyscale,
}

impl Colormap {
    /// Out-of-range values are clamped here and only here, the numeric
    /// outputs keep them as computed.
    pub fn color_at(self, value: f64) -> RGBColor {
        let h = value.clamp(0.0, 1.0);
        match self {
            Colormap::Viridis   => (ViridisRGB {}).get_color(h),
            Colormap::Bone      => (Bone {}).get_color(h),
            Colormap::Copper    => (Copper {}).get_color(h),
            Colormap::Greyscale => (BlackWhite {}).get_color(h),
        }
    }
}


/// Figure geometry and typography.
///
/// Lengths follow the conventions of the output: `figwidth` and
/// `figheight` are inches, `*_pt` fields are printer's points scaled by
/// `dpi`, `marker_halfwidth` is in the data units of the x axis.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlotStyle {
    pub figwidth:         f64,
    pub figheight:        f64,
    pub dpi:              u32,
    pub marker_halfwidth: f64,
    pub marker_stroke_pt: f64,
    pub font_family:      String,
    pub font_size_pt:     f64,
    pub colormap:         Colormap,
    pub colorbar_frac:    f64,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            figwidth:         3.0,
            figheight:        5.0,
            dpi:              400,
            marker_halfwidth: 0.002,
            marker_stroke_pt: 3.0,
            font_family:      "sans-serif".to_string(),
            font_size_pt:     12.0,
            colormap:         Colormap::Viridis,
            colorbar_frac:    0.2,
        }
    }
}

impl PlotStyle {
    /// Layered style: built-in defaults, then the user's
    /// `style.toml` from the config directory, then an explicit file.
    pub fn from_file(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(dirs) = ProjectDirs::from("", "", "bandchar") {
            let user_style = dirs.config_dir().join("style.toml");
            if user_style.is_file() {
                figment = figment.merge(Toml::file(&user_style));
            }
        }

        if let Some(path) = path {
            // Toml::file skips missing files silently, an explicitly
            // requested style must not.
            if !path.is_file() {
                return Err(BandcharError::NotFound(format!("style file {:?}", path)).into());
            }
            figment = figment.merge(Toml::file(path));
        }

        figment.extract().context("Invalid plot style configuration")
    }

    /// TOML rendition of the default style, ready to edit.
    pub fn template() -> Result<String> {
        toml::to_string_pretty(&Self::default())
            .context("Serializing the default style failed")
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_style() {
        let style = PlotStyle::default();
        assert_eq!(style.dpi, 400);
        assert_eq!(style.colormap, Colormap::Viridis);
        assert_eq!(style.figwidth, 3.0);
        assert_eq!(style.figheight, 5.0);
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let style: PlotStyle = Figment::from(Serialized::defaults(PlotStyle::default()))
            .merge(Toml::string("dpi = 100\ncolormap = \"copper\"\n"))
            .extract()
            .unwrap();
        assert_eq!(style.dpi, 100);
        assert_eq!(style.colormap, Colormap::Copper);
        assert_eq!(style.font_size_pt, 12.0);
        assert_eq!(style.figheight, 5.0);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let res = Figment::from(Serialized::defaults(PlotStyle::default()))
            .merge(Toml::string("pointsize = 3\n"))
            .extract::<PlotStyle>();
        assert!(res.is_err());
    }

    #[test]
    fn test_color_lookup_clamps() {
        let cm = Colormap::Viridis;
        let below = cm.color_at(-0.5);
        let lo    = cm.color_at(0.0);
        let above = cm.color_at(1.5);
        let hi    = cm.color_at(1.0);
        assert_eq!((below.0, below.1, below.2), (lo.0, lo.1, lo.2));
        assert_eq!((above.0, above.1, above.2), (hi.0, hi.1, hi.2));
    }

    #[test]
    fn test_template_round_trips() {
        let text = PlotStyle::template().unwrap();
        let style: PlotStyle = toml::from_str(&text).unwrap();
        assert_eq!(style.dpi, PlotStyle::default().dpi);
        assert_eq!(style.colormap, PlotStyle::default().colormap);
    }

    #[test]
    fn test_missing_style_file_is_reported() {
        let err = PlotStyle::from_file(Some(Path::new("no_such_style.toml"))).unwrap_err();
        assert!(matches!(err.downcast_ref::<BandcharError>(),
                         Some(BandcharError::NotFound(_))));
    }
}
