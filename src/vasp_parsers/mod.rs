pub mod outcar;
pub mod procar;

use std::{
    fs,
    io::Read,
    path::Path,
};

use flate2::read::GzDecoder;

use crate::{
    error::BandcharError,
    types::Result,
};

/// Loads a text artifact, transparently inflating gzipped payloads.
/// Compression is detected from the magic bytes, not from the file name.
pub(crate) fn read_txt_maybe_compressed(path: &Path) -> Result<String> {
    let raw = fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => BandcharError::NotFound(format!("input file {:?}", path)),
        _ => BandcharError::Parse(format!("cannot read {:?}: {}", path, e)),
    })?;

    if raw.starts_with(&[0x1f, 0x8b]) {
        let mut content = String::new();
        GzDecoder::new(&raw[..])
            .read_to_string(&mut content)
            .map_err(|e| BandcharError::Parse(format!("cannot inflate {:?}: {}", path, e)))?;
        Ok(content)
    } else {
        Ok(String::from_utf8(raw)
            .map_err(|e| BandcharError::Parse(format!("{:?} is not valid text: {}", path, e)))?)
    }
}
