//! Diff command - structural diff of two spec files

use super::{load_spec, Context};
use crate::diff::compute_spec_diff;
use anyhow::Result;
use std::path::Path;

pub fn run(ctx: &Context, original: &Path, modified: &Path) -> Result<()> {
    let original = load_spec(original)?;
    let modified = load_spec(modified)?;
    ctx.print(&compute_spec_diff(&original, &modified))
}
