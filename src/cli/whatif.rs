//! What-if command

use super::{load_spec, Context, WhatIfChange};
use crate::spec::NodeType;
use crate::store::UsageEventType;
use crate::whatif::{analyze_what_if_add, analyze_what_if_remove};
use anyhow::Result;
use std::path::Path;

pub async fn run(ctx: &Context, spec_path: &Path, change: WhatIfChange) -> Result<()> {
    let spec = load_spec(spec_path)?;
    let (result, node_type) = match change {
        WhatIfChange::Add { node_type } => {
            let node_type: NodeType = node_type.parse().map_err(anyhow::Error::msg)?;
            (analyze_what_if_add(&spec, node_type.clone()), Some(node_type))
        }
        WhatIfChange::Remove { node_id } => {
            let node_type = spec.node(&node_id).map(|n| n.node_type.clone());
            (analyze_what_if_remove(&spec, &node_id), node_type)
        }
    };
    ctx.print(&result)?;

    let node_types = node_type
        .map(|t| t.as_str().to_string())
        .into_iter()
        .collect();
    ctx.record_usage(UsageEventType::WhatIf, node_types, Vec::new()).await
}
