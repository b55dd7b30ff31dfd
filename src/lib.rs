pub mod analysis;
pub mod cli;
pub mod commands;
pub mod error;
pub mod plot;
pub mod settings;
pub mod types;
pub mod vasp_parsers;

pub use cli::OptProcess;
pub use error::BandcharError;
pub use types::Result;

pub use vasp_parsers::outcar::Outcar;
pub use vasp_parsers::procar::Procar;

pub use analysis::{
    GapReport,
    OrbitalWeights,
    SpinBands,
};
