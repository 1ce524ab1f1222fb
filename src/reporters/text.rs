//! Text (terminal) reporter with colors and formatting

use crate::audit::SecurityAuditResult;
use crate::calibrate::{AntiPatternCalibration, CalibratedSeverity};
use crate::compliance::{CheckStatus, ComplianceReport};
use crate::diff::{DiffOperation, SpecDiff};
use crate::learning::CalibratedAudit;
use crate::models::{Finding, FindingsSummary, Severity};
use crate::store::{AntiPatternInteraction, FeedbackRecord, FeedbackStats, Tally, UsageStats};
use crate::whatif::{ImpactKind, WhatIfResult};
use console::{style, StyledObject};
use std::collections::BTreeMap;
use std::fmt::Write;

const RULE: &str = "──────────────────────────────────────";

/// Plain terminal rendering of a result
pub trait TextReport {
    fn render_text(&self) -> String;
}

fn severity_tag(severity: Severity) -> StyledObject<&'static str> {
    let tag = match severity {
        Severity::Critical => "[C]",
        Severity::High => "[H]",
        Severity::Medium => "[M]",
        Severity::Low => "[L]",
        Severity::Info => "[I]",
    };
    match severity {
        Severity::Critical => style(tag).red().bold(),
        Severity::High => style(tag).red(),
        Severity::Medium => style(tag).yellow(),
        Severity::Low => style(tag).blue(),
        Severity::Info => style(tag).dim(),
    }
}

fn grade_style(grade: &str) -> StyledObject<&str> {
    match grade {
        "A" | "B" => style(grade).green().bold(),
        "C" => style(grade).yellow().bold(),
        _ => style(grade).red().bold(),
    }
}

fn header(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{}", style(title).bold());
    let _ = writeln!(out, "{}", style(RULE).dim());
}

fn summary_line(summary: &FindingsSummary) -> String {
    let parts: Vec<String> = [
        (summary.critical, "critical"),
        (summary.high, "high"),
        (summary.medium, "medium"),
        (summary.low, "low"),
        (summary.info, "info"),
    ]
    .iter()
    .filter(|(n, _)| *n > 0)
    .map(|(n, label)| format!("{} {}", n, label))
    .collect();
    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join(", ")
    }
}

fn write_findings(out: &mut String, findings: &[Finding]) {
    for finding in findings {
        let _ = writeln!(
            out,
            "  {} {} {}",
            severity_tag(finding.severity),
            style(&finding.id).cyan(),
            finding.title
        );
        if !finding.affected_nodes.is_empty() {
            let _ = writeln!(
                out,
                "      {} {}",
                style("nodes:").dim(),
                finding.affected_nodes.join(", ")
            );
        }
        let _ = writeln!(
            out,
            "      {} {}",
            style("fix:").dim(),
            finding.recommendation
        );
    }
}

impl TextReport for SecurityAuditResult {
    fn render_text(&self) -> String {
        let mut out = String::new();
        header(&mut out, "Security Audit");
        let _ = writeln!(
            out,
            "Score: {}  Grade: {}  Nodes: {}  Connections: {}  Rules: {}\n",
            style(format!("{}/100", self.score)).bold(),
            grade_style(&self.grade),
            self.node_count,
            self.connection_count,
            self.rules_evaluated
        );
        let _ = writeln!(
            out,
            "{} ({})",
            style("FINDINGS").bold(),
            summary_line(&self.summary)
        );
        if self.findings.is_empty() {
            let _ = writeln!(out, "  {} No issues found", style("✓").green());
        }
        write_findings(&mut out, &self.findings);
        out
    }
}

impl TextReport for CalibratedAudit {
    fn render_text(&self) -> String {
        let mut out = String::new();
        header(&mut out, "Security Audit (calibrated)");
        let _ = writeln!(
            out,
            "Score: {}  Grade: {}  Nodes: {}  Connections: {}\n",
            style(format!("{}/100", self.audit.score)).bold(),
            grade_style(&self.audit.grade),
            self.audit.node_count,
            self.audit.connection_count
        );
        let _ = writeln!(
            out,
            "{} ({})",
            style("ACTIONABLE").bold(),
            summary_line(&self.actionable_summary)
        );
        write_findings(&mut out, &self.actionable);
        if !self.suppressed.is_empty() {
            let _ = writeln!(
                out,
                "\n{} {} finding(s) users consistently ignore:",
                style("SUPPRESSED").bold(),
                self.suppressed.len()
            );
            for finding in &self.suppressed {
                let _ = writeln!(
                    out,
                    "  {} {}",
                    style(&finding.id).dim(),
                    style(&finding.title).dim()
                );
            }
        }
        out
    }
}

fn status_tag(status: CheckStatus) -> StyledObject<&'static str> {
    match status {
        CheckStatus::Pass => style("PASS").green(),
        CheckStatus::Fail => style("FAIL").red().bold(),
        CheckStatus::Partial => style("PART").yellow(),
        CheckStatus::NotApplicable => style("N/A ").dim(),
    }
}

impl TextReport for ComplianceReport {
    fn render_text(&self) -> String {
        let mut out = String::new();
        header(&mut out, &self.framework_name);
        let _ = writeln!(
            out,
            "Score: {}  Passed: {}  Failed: {}  Partial: {}  N/A: {}\n",
            style(format!("{}/100", self.score)).bold(),
            self.tally.passed,
            self.tally.failed,
            self.tally.partial,
            self.tally.not_applicable
        );
        for check in &self.checks {
            let _ = writeln!(
                out,
                "  {} {:<22} {}",
                status_tag(check.status),
                style(&check.id).cyan(),
                check.title
            );
        }
        out
    }
}

impl TextReport for Vec<ComplianceReport> {
    fn render_text(&self) -> String {
        let mut out = String::new();
        for report in self {
            out.push_str(&report.render_text());
        }
        header(&mut out, "Summary");
        for report in self {
            let _ = writeln!(
                out,
                "  {:<14} {:>3}/100  ({} findings)",
                report.framework_name,
                report.score,
                report.findings.len()
            );
        }
        out
    }
}

impl TextReport for WhatIfResult {
    fn render_text(&self) -> String {
        let mut out = String::new();
        header(&mut out, "What-If Analysis");
        let change = match &self.change {
            crate::whatif::ChangeDescriptor::Add { node_type } => format!("add {}", node_type),
            crate::whatif::ChangeDescriptor::Remove { node_id, node_type } => match node_type {
                Some(t) => format!("remove {} ({})", node_id, t),
                None => format!("remove {} (not in spec)", node_id),
            },
        };
        let delta = if self.risk_delta > 0 {
            style(format!("+{}", self.risk_delta)).green().bold()
        } else if self.risk_delta < 0 {
            style(self.risk_delta.to_string()).red().bold()
        } else {
            style(self.risk_delta.to_string()).dim()
        };
        let _ = writeln!(
            out,
            "Change: {}  Risk delta: {}\n",
            style(change).cyan(),
            delta
        );

        if self.impacts.is_empty() {
            let _ = writeln!(out, "  No predicted impact");
        }
        for impact in &self.impacts {
            let marker = match impact.kind {
                ImpactKind::Improvement => style("▲").green(),
                ImpactKind::Regression => style("▼").red(),
                ImpactKind::Neutral => style("•").dim(),
            };
            let _ = writeln!(
                out,
                "  {} {} {:?}: {}",
                marker,
                severity_tag(impact.severity),
                impact.category,
                impact.description
            );
        }
        if !self.recommendations.is_empty() {
            let _ = writeln!(out, "\n{}", style("RECOMMENDATIONS").bold());
            for rec in &self.recommendations {
                let _ = writeln!(out, "  - {}", rec);
            }
        }
        out
    }
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("∅")
}

impl TextReport for SpecDiff {
    fn render_text(&self) -> String {
        let mut out = String::new();
        header(&mut out, "Spec Diff");
        if self.is_empty() {
            let _ = writeln!(out, "  {} No differences", style("✓").green());
            return out;
        }
        let _ = writeln!(
            out,
            "Nodes: +{} -{} ~{}  Connections: +{} -{} ~{}\n",
            self.nodes_added,
            self.nodes_removed,
            self.nodes_modified,
            self.connections_added,
            self.connections_removed,
            self.connections_modified
        );
        for op in &self.operations {
            let line = match op {
                DiffOperation::AddNode { node } => {
                    format!(
                        "{} node {} ({})",
                        style("+").green(),
                        node.id,
                        node.node_type
                    )
                }
                DiffOperation::RemoveNode { node } => {
                    format!("{} node {} ({})", style("-").red(), node.id, node.node_type)
                }
                DiffOperation::ModifyNode {
                    node_id,
                    field,
                    old_value,
                    new_value,
                } => format!(
                    "{} node {} {:?}: {} → {}",
                    style("~").yellow(),
                    node_id,
                    field,
                    opt(old_value),
                    opt(new_value)
                ),
                DiffOperation::AddConnection { connection } => {
                    format!("{} edge {}", style("+").green(), connection.key())
                }
                DiffOperation::RemoveConnection { connection } => {
                    format!("{} edge {}", style("-").red(), connection.key())
                }
                DiffOperation::ModifyConnection {
                    key,
                    field,
                    old_value,
                    new_value,
                } => format!(
                    "{} edge {} {:?}: {} → {}",
                    style("~").yellow(),
                    key,
                    field,
                    opt(old_value),
                    opt(new_value)
                ),
            };
            let _ = writeln!(out, "  {}", line);
        }
        if !self.placement_changes.is_empty() {
            let _ = writeln!(out, "\n{}", style("PLACEMENT").bold());
            for change in &self.placement_changes {
                let tier = |t: &Option<crate::spec::Tier>| {
                    t.map(|t| t.as_str()).unwrap_or("unplaced").to_string()
                };
                let _ = writeln!(
                    out,
                    "  {} ({}): {} → {}",
                    change.node_id,
                    change.node_type,
                    tier(&change.from_tier),
                    tier(&change.to_tier)
                );
            }
        }
        out
    }
}

fn calibrated_tag(severity: CalibratedSeverity) -> StyledObject<String> {
    let s = severity.to_string();
    match severity {
        CalibratedSeverity::Critical => style(s).red().bold(),
        CalibratedSeverity::High => style(s).red(),
        CalibratedSeverity::Medium => style(s).yellow(),
        CalibratedSeverity::Suppressed => style(s).dim(),
    }
}

impl TextReport for BTreeMap<String, AntiPatternCalibration> {
    fn render_text(&self) -> String {
        let mut out = String::new();
        header(&mut out, "Severity Calibration");
        if self.is_empty() {
            let _ = writeln!(out, "  No interactions recorded yet");
            return out;
        }
        let _ = writeln!(
            out,
            "  {:<18} {:>6} {:>8} {:>6}  {:<9} {}",
            "ID", "SHOWN", "IGNORED", "FIXED", "ORIGINAL", "CALIBRATED"
        );
        for c in self.values() {
            let marker = if c.is_adjusted() { "↓" } else { " " };
            let _ = writeln!(
                out,
                "  {:<18} {:>6} {:>7.0}% {:>5.0}%  {:<9} {} {}",
                c.anti_pattern_id,
                c.total_shown,
                c.ignore_rate * 100.0,
                c.fix_rate * 100.0,
                c.original_severity.to_string(),
                marker,
                calibrated_tag(c.calibrated_severity)
            );
        }
        out
    }
}

fn write_tallies(out: &mut String, label: &str, tallies: &[Tally]) {
    if tallies.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{}", style(label).bold());
    for t in tallies {
        let _ = writeln!(out, "  {:<18} {}", t.id, t.count);
    }
}

impl TextReport for FeedbackStats {
    fn render_text(&self) -> String {
        let mut out = String::new();
        header(&mut out, "Feedback");
        let rating = self
            .average_rating
            .map(|r| format!("{:.1}", r))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "Records: {}  Modified: {}  Rated: {}  Avg rating: {}  Placement changes: {}",
            self.total, self.modified, self.rated, rating, self.placement_changes
        );
        for (source, n) in &self.by_source {
            let _ = writeln!(out, "  {:<14} {}", source, n);
        }
        write_tallies(&mut out, "MOST IGNORED", &self.top_ignored);
        write_tallies(&mut out, "MOST FIXED", &self.top_fixed);
        out
    }
}

impl TextReport for UsageStats {
    fn render_text(&self) -> String {
        let mut out = String::new();
        header(&mut out, "Usage");
        let _ = writeln!(
            out,
            "Events: {}  Success: {:.0}%  Avg confidence: {:.2}  Sessions: {}",
            self.total,
            self.success_rate * 100.0,
            self.average_confidence,
            self.sessions
        );
        for (kind, n) in &self.by_type {
            let _ = writeln!(out, "  {:<14} {}", kind, n);
        }
        write_tallies(&mut out, "TOP NODE TYPES", &self.top_node_types);
        out
    }
}

impl TextReport for Vec<FeedbackRecord> {
    fn render_text(&self) -> String {
        let mut out = String::new();
        header(&mut out, "Feedback Records");
        if self.is_empty() {
            let _ = writeln!(out, "  No feedback recorded");
        }
        for r in self {
            let rating = r
                .user_rating
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "  {} {} {:<12} rating {}  fixed {}  ignored {}",
                style(&r.id[..8.min(r.id.len())]).cyan(),
                r.timestamp.format("%Y-%m-%d %H:%M"),
                r.diagram_source.as_str(),
                rating,
                r.fixed_anti_patterns.len(),
                r.ignored_anti_patterns.len()
            );
        }
        out
    }
}

impl TextReport for Vec<AntiPatternInteraction> {
    fn render_text(&self) -> String {
        let mut out = String::new();
        header(&mut out, "Interactions");
        if self.is_empty() {
            let _ = writeln!(out, "  No interactions recorded");
        }
        for i in self {
            let _ = writeln!(
                out,
                "  {} {:<18} {:?}  {}",
                i.timestamp.format("%Y-%m-%d %H:%M"),
                i.anti_pattern_id,
                i.action,
                style(&i.session_id).dim()
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::run_security_audit;
    use crate::compliance::check_all_frameworks;
    use crate::diff::compute_spec_diff;
    use crate::reporters::tests::exposed_spec;
    use crate::spec::{NodeSpec, NodeType, Tier};
    use crate::whatif::analyze_what_if_remove;

    #[test]
    fn test_audit_text_lists_findings() {
        let text = run_security_audit(&exposed_spec()).render_text();
        assert!(text.contains("Security Audit"));
        assert!(text.contains("NET-001"));
        assert!(text.contains("Grade"));
    }

    #[test]
    fn test_compliance_summary_has_every_framework() {
        let text = check_all_frameworks(&exposed_spec()).render_text();
        for name in ["ISMS-P", "PCI-DSS", "HIPAA", "GDPR"] {
            assert!(text.contains(name), "missing {}", name);
        }
    }

    #[test]
    fn test_diff_text() {
        let original = exposed_spec();
        let mut modified = exposed_spec().with_node(NodeSpec::new("fw", NodeType::Firewall));
        modified.nodes[1].tier = Some(Tier::Dmz);
        let text = compute_spec_diff(&original, &modified).render_text();
        assert!(text.contains("node fw"));
        assert!(text.contains("PLACEMENT"));
        assert!(compute_spec_diff(&original, &original)
            .render_text()
            .contains("No differences"));
    }

    #[test]
    fn test_what_if_missing_node() {
        let text = analyze_what_if_remove(&exposed_spec(), "ghost").render_text();
        assert!(text.contains("not in spec"));
        assert!(text.contains("No predicted impact"));
    }

    #[test]
    fn test_empty_calibrations() {
        let text = BTreeMap::<String, AntiPatternCalibration>::new().render_text();
        assert!(text.contains("No interactions"));
    }
}
