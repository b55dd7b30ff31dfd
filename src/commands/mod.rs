pub mod band;
pub mod common;
pub mod gap;
