use crate::audit::security_rules;
use crate::compliance::ComplianceFramework;
use crate::config::AuditConfig;
use crate::models::Severity;
use rustc_hash::FxHashMap;

/// Original severity of every known anti-pattern id
///
/// Passed into calibration explicitly; ids it does not know are treated
/// as medium.
#[derive(Debug, Clone, Default)]
pub struct SeverityCatalog {
    severities: FxHashMap<String, Severity>,
}

impl SeverityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Security rules plus every compliance check
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for rule in security_rules() {
            catalog.insert(rule.id, rule.severity);
        }
        for framework in ComplianceFramework::all() {
            for check in framework.checks() {
                catalog.insert(check.id, check.severity);
            }
        }
        catalog
    }

    /// Built-in catalog with the project's audit severity overrides applied
    pub fn with_overrides(config: &AuditConfig) -> Self {
        let mut catalog = Self::builtin();
        for (id, severity) in &config.severity_overrides {
            catalog.insert(&id.to_uppercase(), *severity);
        }
        catalog
    }

    pub fn insert(&mut self, id: &str, severity: Severity) {
        self.severities.insert(id.to_string(), severity);
    }

    pub fn severity_of(&self, id: &str) -> Severity {
        self.severities.get(id).copied().unwrap_or(Severity::Medium)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.severities.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.severities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.severities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_rules_and_checks() {
        let catalog = SeverityCatalog::builtin();
        assert_eq!(catalog.severity_of("NET-001"), Severity::Critical);
        assert_eq!(catalog.severity_of("PCI-DSS-6.4"), Severity::High);
        assert!(catalog.contains("HIPAA-164.312.b"));
    }

    #[test]
    fn test_unknown_defaults_to_medium() {
        assert_eq!(
            SeverityCatalog::new().severity_of("CUSTOM-9"),
            Severity::Medium
        );
    }

    #[test]
    fn test_overrides() {
        let mut config = AuditConfig::default();
        config.severity_overrides.insert("net-001".into(), Severity::Low);
        assert_eq!(
            SeverityCatalog::with_overrides(&config).severity_of("NET-001"),
            Severity::Low
        );
    }
}
