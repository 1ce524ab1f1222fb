//! CLI command definitions and handlers

mod audit;
mod diff;
mod init;
mod learning;
mod whatif;

use crate::config::{load_project_config, ProjectConfig, StoreBackend};
use crate::learning::LearningLoop;
use crate::reporters::{self, OutputFormat, TextReport};
use crate::store::{Stores, UsageEvent, UsageEventType};
use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// topoguard - Infrastructure topology auditor
///
/// Runs locally. Feedback and calibration data stay on this machine.
#[derive(Parser, Debug)]
#[command(name = "topoguard")]
#[command(
    version,
    about = "Audit infrastructure topologies for security and compliance gaps, and learn which warnings matter",
    after_help = "\
Examples:
  topoguard audit spec.json                       Security audit with score and grade
  topoguard audit spec.json --calibrated          Apply learned severity calibration
  topoguard compliance spec.json -F pci-dss       One compliance framework
  topoguard what-if spec.json remove lb-1         Predict the impact of a change
  topoguard diff generated.json edited.json       Structural diff of two specs
  topoguard feedback record gen.json --modified edited.json --rating 4
  topoguard calibrate                             Show calibrated severities"
)]
pub struct Cli {
    /// Directory holding topoguard.toml (default: current directory)
    #[arg(long, global = true, default_value = ".")]
    pub config_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(
        long,
        global = true,
        default_value = "warn",
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    pub log_level: String,

    /// Output format: text, json
    #[arg(
        long,
        short = 'f',
        global = true,
        default_value = "text",
        value_parser = ["text", "json"]
    )]
    pub format: String,

    /// Override the configured store backend
    #[arg(
        long,
        global = true,
        env = "TOPOGUARD_STORE",
        value_parser = ["auto", "persistent", "memory"]
    )]
    pub store: Option<String>,

    /// Session id recorded with feedback, usage and interactions
    #[arg(long, global = true, env = "TOPOGUARD_SESSION", default_value = "cli")]
    pub session: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write an example topoguard.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Run the security audit over a spec
    Audit {
        /// InfraSpec JSON file
        spec: PathBuf,

        /// Apply severity calibration learned from past interactions
        #[arg(long)]
        calibrated: bool,

        /// Exit with code 1 if findings at this severity or higher exist
        #[arg(long, value_parser = ["critical", "high", "medium", "low", "info"])]
        fail_on: Option<String>,
    },

    /// Check a spec against compliance frameworks
    Compliance {
        /// InfraSpec JSON file
        spec: PathBuf,

        /// isms-p, iso27001, pci-dss, gdpr, hipaa, k-isms (default: all)
        #[arg(long, short = 'F')]
        framework: Option<String>,
    },

    /// Predict the impact of adding or removing one node
    WhatIf {
        /// InfraSpec JSON file
        spec: PathBuf,

        #[command(subcommand)]
        change: WhatIfChange,
    },

    /// Structural diff of two specs
    Diff {
        original: PathBuf,
        modified: PathBuf,
    },

    /// Record and inspect diagram feedback
    Feedback {
        #[command(subcommand)]
        action: FeedbackAction,
    },

    /// Record and inspect usage events
    Usage {
        #[command(subcommand)]
        action: UsageAction,
    },

    /// Record and inspect responses to individual findings
    Interaction {
        #[command(subcommand)]
        action: InteractionCommand,
    },

    /// Show severity calibration computed from recorded interactions
    Calibrate,
}

#[derive(Subcommand, Debug)]
pub enum WhatIfChange {
    /// Add a node of this type (e.g. waf, firewall, load-balancer)
    Add { node_type: String },
    /// Remove the node with this id
    Remove { node_id: String },
}

#[derive(Subcommand, Debug)]
pub enum FeedbackAction {
    /// Record a generated spec and, optionally, the user's edit of it
    Record {
        /// Spec as generated
        original: PathBuf,

        /// Spec after the user's edits
        #[arg(long)]
        modified: Option<PathBuf>,

        /// local-parser, llm-modify, template
        #[arg(long, default_value = "local-parser")]
        source: String,

        /// 1 to 5
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: Option<u8>,
    },
    /// List stored feedback records, newest last
    List {
        /// Only the most recent N
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Summary over all feedback
    Stats,
    /// Delete one record by id
    Delete { id: String },
    /// Delete every feedback record
    Clear {
        /// Required; clearing cannot be undone
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum UsageAction {
    /// Record one usage event
    Record {
        /// generate, modify, template, audit, compliance, what-if, export
        event_type: String,

        /// Mark the event as failed
        #[arg(long)]
        failed: bool,

        /// Parser or model confidence (0.0-1.0)
        #[arg(long, default_value = "1.0")]
        confidence: f64,

        #[arg(long)]
        prompt: Option<String>,

        /// Spec the event concerned; its node types are recorded
        #[arg(long)]
        spec: Option<PathBuf>,
    },
    /// Summary over all usage events
    Stats,
    /// Delete every usage event
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum InteractionCommand {
    /// Record that a finding was shown, ignored or fixed
    Record {
        /// Finding id, e.g. NET-001
        anti_pattern_id: String,
        /// shown, ignored, fixed
        action: String,
    },
    /// List recorded interactions
    List {
        #[arg(long)]
        anti_pattern: Option<String>,
        /// shown, ignored, fixed
        #[arg(long)]
        action: Option<String>,
    },
    /// Delete every interaction
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

/// Settings every command shares, resolved once from flags and config
pub(crate) struct Context {
    pub config: ProjectConfig,
    pub format: OutputFormat,
    pub session: String,
}

impl Context {
    fn new(cli: &Cli) -> Result<Self> {
        let mut config = load_project_config(&cli.config_dir);
        if let Some(backend) = &cli.store {
            config.store.backend = backend
                .parse::<StoreBackend>()
                .map_err(anyhow::Error::msg)?;
        }
        Ok(Self {
            config,
            format: cli.format.parse()?,
            session: cli.session.clone(),
        })
    }

    pub fn stores(&self) -> Result<Stores> {
        Stores::open(&self.config.store, &self.config.retention)
            .context("Failed to open learning store")
    }

    pub fn learning(&self) -> Result<LearningLoop> {
        Ok(LearningLoop::new(self.stores()?, &self.config))
    }

    /// Usage telemetry for one command run
    pub async fn record_usage(
        &self,
        event_type: UsageEventType,
        node_types: Vec<String>,
        anti_pattern_ids: Vec<String>,
    ) -> Result<()> {
        let stores = self.stores()?;
        stores
            .usage
            .save(&UsageEvent {
                node_types,
                anti_pattern_ids,
                ..UsageEvent::new(event_type, true, &self.session)
            })
            .await;
        Ok(())
    }

    pub fn print<T: Serialize + TextReport + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", reporters::report(value, self.format)?);
        Ok(())
    }
}

pub(crate) fn load_spec(path: &Path) -> Result<crate::spec::InfraSpec> {
    crate::spec::InfraSpec::load(path)
        .with_context(|| format!("Failed to load spec from {}", path.display()))
}

/// Refuse destructive commands without `--yes`
fn confirm(yes: bool, what: &str) -> Result<()> {
    if !yes {
        anyhow::bail!("Refusing to clear {} without --yes", what);
    }
    Ok(())
}

/// Run the CLI with parsed arguments
pub async fn run(cli: Cli) -> Result<()> {
    let ctx = Context::new(&cli)?;

    match cli.command {
        Commands::Init { force } => init::run(&cli.config_dir, force),

        Commands::Audit {
            spec,
            calibrated,
            fail_on,
        } => audit::run_audit(&ctx, &spec, calibrated, fail_on.as_deref()).await,

        Commands::Compliance { spec, framework } => {
            audit::run_compliance(&ctx, &spec, framework.as_deref()).await
        }

        Commands::WhatIf { spec, change } => whatif::run(&ctx, &spec, change).await,

        Commands::Diff { original, modified } => diff::run(&ctx, &original, &modified),

        Commands::Feedback { action } => match action {
            FeedbackAction::Record {
                original,
                modified,
                source,
                rating,
            } => {
                learning::record_feedback(&ctx, &original, modified.as_deref(), &source, rating)
                    .await
            }
            FeedbackAction::List { limit } => learning::list_feedback(&ctx, limit).await,
            FeedbackAction::Stats => {
                let stores = ctx.stores()?;
                ctx.print(&stores.feedback.stats().await)
            }
            FeedbackAction::Delete { id } => learning::delete_feedback(&ctx, &id).await,
            FeedbackAction::Clear { yes } => {
                confirm(yes, "feedback")?;
                ctx.stores()?.feedback.clear().await?;
                println!("Cleared feedback");
                Ok(())
            }
        },

        Commands::Usage { action } => match action {
            UsageAction::Record {
                event_type,
                failed,
                confidence,
                prompt,
                spec,
            } => {
                learning::record_usage(
                    &ctx,
                    &event_type,
                    !failed,
                    confidence,
                    prompt.as_deref(),
                    spec.as_deref(),
                )
                .await
            }
            UsageAction::Stats => {
                let stores = ctx.stores()?;
                ctx.print(&stores.usage.stats().await)
            }
            UsageAction::Clear { yes } => {
                confirm(yes, "usage events")?;
                ctx.stores()?.usage.clear().await;
                println!("Cleared usage events");
                Ok(())
            }
        },

        Commands::Interaction { action } => match action {
            InteractionCommand::Record {
                anti_pattern_id,
                action,
            } => learning::record_interaction(&ctx, &anti_pattern_id, &action).await,
            InteractionCommand::List {
                anti_pattern,
                action,
            } => learning::list_interactions(&ctx, anti_pattern, action.as_deref()).await,
            InteractionCommand::Clear { yes } => {
                confirm(yes, "interactions")?;
                ctx.stores()?.calibration.clear().await;
                println!("Cleared interactions");
                Ok(())
            }
        },

        Commands::Calibrate => {
            let learning = ctx.learning()?;
            ctx.print(&learning.recalibrate().await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_what_if() {
        let cli =
            Cli::try_parse_from(["topoguard", "what-if", "spec.json", "remove", "lb-1"]).unwrap();
        match cli.command {
            Commands::WhatIf {
                change: WhatIfChange::Remove { node_id },
                ..
            } => assert_eq!(node_id, "lb-1"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_rating_range_enforced() {
        let args = |rating: &str| {
            let argv = ["topoguard", "feedback", "record", "a.json"];
            Cli::try_parse_from(argv.into_iter().chain(["--rating", rating]))
        };
        assert!(args("6").is_err());
        assert!(args("0").is_err());
        assert!(args("5").is_ok());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "topoguard", "calibrate", "--format", "json", "--store", "memory",
        ])
        .unwrap();
        assert_eq!(cli.format, "json");
        assert_eq!(cli.store.as_deref(), Some("memory"));
    }
}
