//! Audit and compliance commands

use super::{load_spec, Context};
use crate::audit::SecurityAudit;
use crate::compliance::{check_all_frameworks, check_compliance, ComplianceFramework};
use crate::models::{Finding, Severity};
use crate::spec::InfraSpec;
use crate::store::UsageEventType;
use anyhow::Result;
use std::path::Path;

/// Whether any finding reaches the `--fail-on` threshold
fn meets_threshold(findings: &[Finding], threshold: Severity) -> bool {
    findings.iter().any(|f| f.severity >= threshold)
}

fn check_fail_threshold(fail_on: Option<&str>, findings: &[Finding]) -> Result<()> {
    if let Some(threshold) = fail_on {
        let severity: Severity = threshold.parse().map_err(anyhow::Error::msg)?;
        if meets_threshold(findings, severity) {
            eprintln!("Failing due to --fail-on={} threshold", threshold);
            std::process::exit(1);
        }
    }
    Ok(())
}

pub async fn run_audit(
    ctx: &Context,
    spec_path: &Path,
    calibrated: bool,
    fail_on: Option<&str>,
) -> Result<()> {
    let spec = load_spec(spec_path)?;

    if calibrated {
        let learning = ctx.learning()?;
        let result = learning.calibrated_audit(&spec, &ctx.session).await;
        ctx.print(&result)?;
        return check_fail_threshold(fail_on, &result.actionable);
    }

    let result = SecurityAudit::new(&ctx.config.audit).run(&spec);
    ctx.print(&result)?;
    record_usage(ctx, &spec, UsageEventType::Audit, result.finding_ids()).await?;
    check_fail_threshold(fail_on, &result.findings)
}

async fn record_usage(
    ctx: &Context,
    spec: &InfraSpec,
    event_type: UsageEventType,
    anti_pattern_ids: Vec<String>,
) -> Result<()> {
    let node_types = spec
        .node_types()
        .iter()
        .map(|t| t.as_str().to_string())
        .collect();
    ctx.record_usage(event_type, node_types, anti_pattern_ids).await
}

pub async fn run_compliance(
    ctx: &Context,
    spec_path: &Path,
    framework: Option<&str>,
) -> Result<()> {
    let spec = load_spec(spec_path)?;
    let findings = match framework {
        Some(name) => {
            let framework: ComplianceFramework = name.parse().map_err(anyhow::Error::msg)?;
            let report = check_compliance(&spec, framework);
            ctx.print(&report)?;
            report.findings
        }
        None => {
            let reports = check_all_frameworks(&spec);
            ctx.print(&reports)?;
            reports.into_iter().flat_map(|r| r.findings).collect()
        }
    };
    let ids = findings.into_iter().map(|f| f.id).collect();
    record_usage(ctx, &spec, UsageEventType::Compliance, ids).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::finding;

    #[test]
    fn test_threshold() {
        let findings = vec![finding("A", Severity::Medium), finding("B", Severity::Low)];
        assert!(meets_threshold(&findings, Severity::Medium));
        assert!(meets_threshold(&findings, Severity::Low));
        assert!(!meets_threshold(&findings, Severity::High));
        assert!(!meets_threshold(&[], Severity::Info));
    }
}
