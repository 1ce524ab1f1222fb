//! Per-framework check catalogs
//!
//! Each entry maps a framework requirement onto a shared control
//! evaluator. Check ids are `<FRAMEWORK>-<control>` and double as finding
//! ids, so they must stay stable across releases.

use super::controls::{self, Control};
use super::{ComplianceCheck, ComplianceFramework};
use crate::models::Severity;

/// id, control, title, recommendation, severity, evaluator
struct Row(
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    Severity,
    Control,
);

fn build(framework: ComplianceFramework, rows: &[Row]) -> Vec<ComplianceCheck> {
    rows.iter()
        .map(|row| ComplianceCheck {
            framework,
            id: row.0,
            control: row.1,
            title: row.2,
            recommendation: row.3,
            severity: row.4,
            evaluate: row.5,
        })
        .collect()
}

pub(super) fn checks_for(framework: ComplianceFramework) -> Vec<ComplianceCheck> {
    use ComplianceFramework::*;
    match framework {
        IsmsP => build(framework, ISMS_P),
        Iso27001 => build(framework, ISO_27001),
        PciDss => build(framework, PCI_DSS),
        Gdpr => build(framework, GDPR),
        Hipaa => build(framework, HIPAA),
        KIsms => build(framework, K_ISMS),
    }
}

const ISMS_P: &[Row] = &[
    Row(
        "ISMS-P-2.5.1",
        "2.5.1",
        "User account management",
        "Manage user accounts through a central identity provider with MFA.",
        Severity::High,
        controls::access_control,
    ),
    Row(
        "ISMS-P-2.5.5",
        "2.5.5",
        "Privileged access management",
        "Control administrator access through PAM.",
        Severity::Medium,
        controls::privileged_access,
    ),
    Row(
        "ISMS-P-2.6.1",
        "2.6.1",
        "Network access control",
        "Protect the external boundary with a firewall.",
        Severity::Critical,
        controls::perimeter_firewall,
    ),
    Row(
        "ISMS-P-2.6.2",
        "2.6.2",
        "Network segregation",
        "Separate the network into zones by service and importance.",
        Severity::Medium,
        controls::segmentation,
    ),
    Row(
        "ISMS-P-2.7.1",
        "2.7.1",
        "Application of cryptography",
        "Encrypt personal information in storage and in transit.",
        Severity::High,
        controls::data_encryption,
    ),
    Row(
        "ISMS-P-2.9.3",
        "2.9.3",
        "Backup and recovery",
        "Back up critical data and test recovery.",
        Severity::High,
        controls::backup,
    ),
    Row(
        "ISMS-P-2.9.4",
        "2.9.4",
        "Log and access record management",
        "Collect and review security logs centrally.",
        Severity::Medium,
        controls::logging,
    ),
    Row(
        "ISMS-P-2.10.1",
        "2.10.1",
        "Security system operation",
        "Operate intrusion detection on the perimeter.",
        Severity::Medium,
        controls::intrusion_detection,
    ),
];

const ISO_27001: &[Row] = &[
    Row(
        "ISO27001-A.8.2",
        "A.8.2",
        "Privileged access rights",
        "Restrict and manage privileged access rights.",
        Severity::Medium,
        controls::privileged_access,
    ),
    Row(
        "ISO27001-A.8.5",
        "A.8.5",
        "Secure authentication",
        "Use central authentication with MFA.",
        Severity::High,
        controls::access_control,
    ),
    Row(
        "ISO27001-A.8.12",
        "A.8.12",
        "Data leakage prevention",
        "Apply DLP to systems processing sensitive information.",
        Severity::Medium,
        controls::data_loss_prevention,
    ),
    Row(
        "ISO27001-A.8.13",
        "A.8.13",
        "Information backup",
        "Maintain backup copies of information.",
        Severity::High,
        controls::backup,
    ),
    Row(
        "ISO27001-A.8.14",
        "A.8.14",
        "Redundancy of processing facilities",
        "Deploy redundant load balancing for public services.",
        Severity::Medium,
        controls::availability,
    ),
    Row(
        "ISO27001-A.8.15",
        "A.8.15",
        "Logging",
        "Produce, store and analyse logs of activities.",
        Severity::Medium,
        controls::logging,
    ),
    Row(
        "ISO27001-A.8.16",
        "A.8.16",
        "Monitoring activities",
        "Monitor networks for anomalous behaviour with IDS/IPS.",
        Severity::Medium,
        controls::intrusion_detection,
    ),
    Row(
        "ISO27001-A.8.20",
        "A.8.20",
        "Networks security",
        "Secure networks with perimeter firewalls.",
        Severity::Critical,
        controls::perimeter_firewall,
    ),
    Row(
        "ISO27001-A.8.22",
        "A.8.22",
        "Segregation of networks",
        "Segregate groups of services into network zones.",
        Severity::Medium,
        controls::segmentation,
    ),
    Row(
        "ISO27001-A.8.24",
        "A.8.24",
        "Use of cryptography",
        "Encrypt data store traffic.",
        Severity::High,
        controls::data_encryption,
    ),
];

const PCI_DSS: &[Row] = &[
    Row(
        "PCI-DSS-1.2",
        "1.2",
        "Network security controls",
        "Install and maintain firewalls at the network boundary.",
        Severity::Critical,
        controls::perimeter_firewall,
    ),
    Row(
        "PCI-DSS-1.3",
        "1.3",
        "Restrict access to the cardholder data environment",
        "Keep cardholder data stores unreachable from untrusted networks.",
        Severity::Critical,
        controls::data_isolation,
    ),
    Row(
        "PCI-DSS-1.4",
        "1.4",
        "Segmentation between trusted and untrusted networks",
        "Assign every system to a network segment.",
        Severity::Medium,
        controls::segmentation,
    ),
    Row(
        "PCI-DSS-3.6",
        "3.6",
        "Cryptographic key management",
        "Manage keys protecting stored account data with a KMS.",
        Severity::Medium,
        controls::key_management,
    ),
    Row(
        "PCI-DSS-4.2",
        "4.2",
        "Strong cryptography in transit",
        "Encrypt cardholder data sent over open, public networks.",
        Severity::High,
        controls::transit_encryption,
    ),
    Row(
        "PCI-DSS-6.4",
        "6.4",
        "Public-facing web applications are protected",
        "Deploy a WAF in front of public-facing web applications.",
        Severity::High,
        controls::web_protection,
    ),
    Row(
        "PCI-DSS-7.2",
        "7.2",
        "Access to system components is defined and assigned",
        "Assign access through a central identity provider.",
        Severity::High,
        controls::access_control,
    ),
    Row(
        "PCI-DSS-8.4",
        "8.4",
        "Multi-factor authentication",
        "Require MFA for all access into the cardholder data environment.",
        Severity::High,
        controls::multi_factor,
    ),
    Row(
        "PCI-DSS-10.2",
        "10.2",
        "Audit logs",
        "Implement audit logs to reconstruct events.",
        Severity::Medium,
        controls::logging,
    ),
    Row(
        "PCI-DSS-11.5",
        "11.5",
        "Network intrusions are detected",
        "Use intrusion detection or prevention at the perimeter.",
        Severity::Medium,
        controls::intrusion_detection,
    ),
];

const GDPR: &[Row] = &[
    Row(
        "GDPR-Art.5.1f",
        "Art. 5(1)(f)",
        "Integrity and confidentiality",
        "Prevent unauthorised disclosure of personal data with DLP.",
        Severity::Medium,
        controls::data_loss_prevention,
    ),
    Row(
        "GDPR-Art.25",
        "Art. 25",
        "Data protection by design",
        "Keep personal data stores in internal tiers behind inspection.",
        Severity::High,
        controls::data_isolation,
    ),
    Row(
        "GDPR-Art.32.1a",
        "Art. 32(1)(a)",
        "Encryption of personal data",
        "Encrypt personal data at rest and in transit.",
        Severity::High,
        controls::data_encryption,
    ),
    Row(
        "GDPR-Art.32.1b",
        "Art. 32(1)(b)",
        "Ongoing confidentiality of processing systems",
        "Restrict access through central authentication with MFA.",
        Severity::High,
        controls::access_control,
    ),
    Row(
        "GDPR-Art.32.1c",
        "Art. 32(1)(c)",
        "Restore availability after an incident",
        "Back up personal data and test restores.",
        Severity::High,
        controls::backup,
    ),
    Row(
        "GDPR-Art.33",
        "Art. 33",
        "Breach detection and notification",
        "Centralise security logs so breaches are detected in time.",
        Severity::Medium,
        controls::logging,
    ),
];

const HIPAA: &[Row] = &[
    Row(
        "HIPAA-164.308.a.7",
        "164.308(a)(7)",
        "Contingency plan",
        "Back up ePHI and keep a disaster recovery plan.",
        Severity::High,
        controls::backup,
    ),
    Row(
        "HIPAA-164.312.a.1",
        "164.312(a)(1)",
        "Access control",
        "Grant access to ePHI only through a central identity provider.",
        Severity::High,
        controls::access_control,
    ),
    Row(
        "HIPAA-164.312.a.2.iv",
        "164.312(a)(2)(iv)",
        "Encryption and decryption",
        "Encrypt ePHI data stores and their connections.",
        Severity::High,
        controls::data_encryption,
    ),
    Row(
        "HIPAA-164.312.b",
        "164.312(b)",
        "Audit controls",
        "Record and examine activity in systems containing ePHI.",
        Severity::Medium,
        controls::logging,
    ),
    Row(
        "HIPAA-164.312.c.1",
        "164.312(c)(1)",
        "Integrity",
        "Protect ePHI stores from exposure to untrusted networks.",
        Severity::High,
        controls::data_isolation,
    ),
    Row(
        "HIPAA-164.312.d",
        "164.312(d)",
        "Person or entity authentication",
        "Verify identity with MFA.",
        Severity::High,
        controls::multi_factor,
    ),
    Row(
        "HIPAA-164.312.e.1",
        "164.312(e)(1)",
        "Transmission security",
        "Encrypt ePHI transmitted over public networks.",
        Severity::High,
        controls::transit_encryption,
    ),
];

const K_ISMS: &[Row] = &[
    Row(
        "K-ISMS-9.1",
        "9.1",
        "Access control policy",
        "Control access through central authentication.",
        Severity::High,
        controls::access_control,
    ),
    Row(
        "K-ISMS-10.1",
        "10.1",
        "Network access",
        "Protect external connections with a firewall.",
        Severity::Critical,
        controls::perimeter_firewall,
    ),
    Row(
        "K-ISMS-10.2",
        "10.2",
        "Network segregation",
        "Segregate internal networks by zone.",
        Severity::Medium,
        controls::segmentation,
    ),
    Row(
        "K-ISMS-10.5",
        "10.5",
        "Endpoint access control",
        "Admit only approved endpoints via NAC.",
        Severity::Low,
        controls::endpoint_control,
    ),
    Row(
        "K-ISMS-11.1",
        "11.1",
        "Cryptographic controls",
        "Encrypt important information in storage and transit.",
        Severity::High,
        controls::data_encryption,
    ),
    Row(
        "K-ISMS-12.2",
        "12.2",
        "Intrusion detection",
        "Operate IDS/IPS against external threats.",
        Severity::Medium,
        controls::intrusion_detection,
    ),
    Row(
        "K-ISMS-12.4",
        "12.4",
        "Log management",
        "Retain and review security logs.",
        Severity::Medium,
        controls::logging,
    ),
    Row(
        "K-ISMS-13.1",
        "13.1",
        "Backup",
        "Back up important data regularly.",
        Severity::High,
        controls::backup,
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_check_ids_unique_across_frameworks() {
        let mut seen = HashSet::new();
        for fw in ComplianceFramework::all() {
            let checks = checks_for(*fw);
            assert!(!checks.is_empty());
            for check in checks {
                assert!(seen.insert(check.id), "duplicate check id {}", check.id);
            }
        }
    }
}
