//! Feedback, usage and interaction commands

use super::{load_spec, Context};
use crate::learning::Correction;
use crate::store::{
    DiagramSource, InteractionAction, InteractionFilter, UsageEvent, UsageEventType,
};
use anyhow::Result;
use console::style;
use std::path::Path;

pub async fn record_feedback(
    ctx: &Context,
    original: &Path,
    modified: Option<&Path>,
    source: &str,
    rating: Option<u8>,
) -> Result<()> {
    let source: DiagramSource = source.parse().map_err(anyhow::Error::msg)?;
    let mut correction = Correction::new(source, load_spec(original)?, &ctx.session);
    if let Some(path) = modified {
        correction = correction.modified(load_spec(path)?);
    }
    if let Some(rating) = rating {
        correction = correction.rated(rating);
    }

    let learning = ctx.learning()?;
    let record = learning.record_correction(correction).await?;

    if ctx.format == crate::reporters::OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }
    println!(
        "{} Recorded feedback {} ({} store)",
        style("✓").green(),
        style(&record.id).cyan(),
        learning.stores().backend()
    );
    println!(
        "  detected {}  fixed {}  ignored {}  diff operations {}",
        record.detected_anti_patterns.len(),
        style(record.fixed_anti_patterns.len()).green(),
        style(record.ignored_anti_patterns.len()).yellow(),
        record.spec_diff.operations.len()
    );
    Ok(())
}

pub async fn list_feedback(ctx: &Context, limit: Option<usize>) -> Result<()> {
    let stores = ctx.stores()?;
    let mut records = stores.feedback.get_all().await;
    if let Some(limit) = limit {
        let skip = records.len().saturating_sub(limit);
        records.drain(..skip);
    }
    ctx.print(&records)
}

pub async fn delete_feedback(ctx: &Context, id: &str) -> Result<()> {
    let stores = ctx.stores()?;
    if stores.feedback.delete(id).await? {
        println!("{} Deleted {}", style("✓").green(), id);
    } else {
        println!("No feedback record with id {}", id);
    }
    Ok(())
}

pub async fn record_usage(
    ctx: &Context,
    event_type: &str,
    success: bool,
    confidence: f64,
    prompt: Option<&str>,
    spec: Option<&Path>,
) -> Result<()> {
    let event_type: UsageEventType = event_type.parse().map_err(anyhow::Error::msg)?;
    let mut event = UsageEvent::new(event_type, success, &ctx.session).with_confidence(confidence);
    if let Some(prompt) = prompt {
        event = event.with_prompt(prompt);
    }
    if let Some(path) = spec {
        event.node_types = load_spec(path)?
            .node_types()
            .iter()
            .map(|t| t.as_str().to_string())
            .collect();
    }

    let stores = ctx.stores()?;
    stores.usage.save(&event).await;
    println!(
        "{} Recorded {} event ({} total)",
        style("✓").green(),
        event.event_type.as_str(),
        stores.usage.count().await
    );
    Ok(())
}

pub async fn record_interaction(ctx: &Context, anti_pattern_id: &str, action: &str) -> Result<()> {
    let action: InteractionAction = action.parse().map_err(anyhow::Error::msg)?;
    let learning = ctx.learning()?;
    learning
        .record_interaction(anti_pattern_id, action, &ctx.session)
        .await;
    println!(
        "{} Recorded {:?} for {}",
        style("✓").green(),
        action,
        style(anti_pattern_id).cyan()
    );
    Ok(())
}

pub async fn list_interactions(
    ctx: &Context,
    anti_pattern: Option<String>,
    action: Option<&str>,
) -> Result<()> {
    let action = action
        .map(|a| a.parse::<InteractionAction>())
        .transpose()
        .map_err(anyhow::Error::msg)?;
    let filter = InteractionFilter {
        anti_pattern_id: anti_pattern,
        action,
        ..Default::default()
    };
    let stores = ctx.stores()?;
    ctx.print(&stores.calibration.get_interactions(&filter).await)
}
