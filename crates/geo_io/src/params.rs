//! Params file loader. Every omitted field takes its default; unknown fields
//! are rejected so a typo never silently falls back to a default.

use std::fs;
use std::path::Path;

use geo_core::Params;

use crate::IoError;

pub fn parse_params(text: &str) -> Result<Params, IoError> {
    let params: Params = serde_json::from_str(text)?;
    params.validate()?;
    Ok(params)
}

pub fn load_params(path: &Path) -> Result<Params, IoError> {
    let text = fs::read_to_string(path)
        .map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    parse_params(&text)
}
