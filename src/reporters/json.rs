//! JSON reporter
//!
//! Pretty-printed JSON of the result as-is, for piping to jq or other tools.

use anyhow::Result;
use serde::Serialize;

pub fn render<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
