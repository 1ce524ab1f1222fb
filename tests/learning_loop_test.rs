//! Learning loop over real stores: retention, persistence and calibration

use chrono::{Duration, Utc};
use tempfile::TempDir;
use topoguard::calibrate::CalibratedSeverity;
use topoguard::config::{ProjectConfig, RetentionConfig, StoreBackend, StoreConfig};
use topoguard::learning::{Correction, LearningLoop};
use topoguard::spec::{FlowType, InfraSpec, NodeSpec, NodeType};
use topoguard::store::{
    AntiPatternInteraction, BackendKind, DiagramSource, FeedbackRecord, InteractionAction,
    InteractionFilter, Stores,
};

fn exposed() -> InfraSpec {
    InfraSpec::new()
        .with_node(NodeSpec::new("inet", NodeType::Internet))
        .with_node(NodeSpec::new("web", NodeType::WebServer))
        .connect("inet", "web", FlowType::Request)
}

fn with_firewall() -> InfraSpec {
    exposed()
        .with_node(NodeSpec::new("fw", NodeType::Firewall))
        .connect("inet", "fw", FlowType::Request)
}

fn persistent_config(dir: &TempDir) -> ProjectConfig {
    ProjectConfig {
        store: StoreConfig {
            backend: StoreBackend::Persistent,
            path: Some(dir.path().join("learning.redb")),
        },
        ..ProjectConfig::default()
    }
}

#[tokio::test]
async fn test_interaction_cap_drops_oldest() {
    let retention = RetentionConfig {
        interaction_cap: 4,
        ..RetentionConfig::default()
    };
    let stores = Stores::in_memory(&retention);
    let start = Utc::now() - Duration::hours(1);
    for i in 0..7 {
        let interaction = AntiPatternInteraction::new("NET-002", InteractionAction::Shown, "s")
            .with_timestamp(start + Duration::seconds(i));
        stores.calibration.record_interaction(&interaction).await;
    }

    let kept = stores
        .calibration
        .get_interactions(&InteractionFilter::default())
        .await;
    assert_eq!(kept.len(), 4);
    let cutoff = start + Duration::seconds(3);
    assert!(kept.iter().all(|i| i.timestamp >= cutoff));
}

#[tokio::test]
async fn test_feedback_cap_drops_oldest() {
    let dir = TempDir::new().unwrap();
    let retention = RetentionConfig {
        feedback_cap: 2,
        ..RetentionConfig::default()
    };
    let stores = Stores::persistent(&dir.path().join("db.redb"), &retention).unwrap();
    let start = Utc::now() - Duration::hours(1);
    let mut ids = Vec::new();
    for i in 0..4 {
        let record = FeedbackRecord::new(DiagramSource::LocalParser, exposed(), "s")
            .with_timestamp(start + Duration::minutes(i));
        stores.feedback.save(&record).await.unwrap();
        ids.push(record.id);
    }

    assert_eq!(stores.feedback.count().await, 2);
    assert!(stores.feedback.get(&ids[0]).await.is_none());
    assert!(stores.feedback.get(&ids[1]).await.is_none());
    assert!(stores.feedback.get(&ids[3]).await.is_some());
}

#[tokio::test]
async fn test_corrections_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let config = persistent_config(&dir);
    {
        let stores = Stores::open(&config.store, &config.retention).unwrap();
        assert_eq!(stores.backend(), BackendKind::Persistent);
        let learning = LearningLoop::new(stores, &config);
        let record = learning
            .record_correction(
                Correction::new(DiagramSource::LlmModify, exposed(), "s1")
                    .modified(with_firewall())
                    .rated(5),
            )
            .await
            .unwrap();
        assert!(record.fixed_anti_patterns.contains(&"NET-001".to_string()));
    }

    let stores = Stores::open(&config.store, &config.retention).unwrap();
    let feedback = stores.feedback.by_session("s1").await;
    assert_eq!(feedback.len(), 1);
    assert_eq!(feedback[0].user_rating, Some(5));

    let fixed = stores
        .calibration
        .get_interactions(&InteractionFilter {
            action: Some(InteractionAction::Fixed),
            ..InteractionFilter::default()
        })
        .await;
    assert!(fixed.iter().any(|i| i.anti_pattern_id == "NET-001"));
}

#[tokio::test]
async fn test_auto_backend_keeps_working_when_disk_is_unusable() {
    let dir = TempDir::new().unwrap();
    let blocked = dir.path().join("learning.redb");
    std::fs::create_dir_all(&blocked).unwrap();
    let config = ProjectConfig {
        store: StoreConfig {
            backend: StoreBackend::Auto,
            path: Some(blocked),
        },
        ..ProjectConfig::default()
    };

    let stores = Stores::open(&config.store, &config.retention).unwrap();
    assert_eq!(stores.backend(), BackendKind::Memory);
    let learning = LearningLoop::new(stores, &config);
    learning
        .record_correction(Correction::new(DiagramSource::Template, exposed(), "s"))
        .await
        .unwrap();
    assert_eq!(learning.stores().feedback.count().await, 1);
}

#[tokio::test]
async fn test_repeatedly_ignored_finding_is_suppressed_but_scored() {
    let learning = LearningLoop::new(
        Stores::in_memory(&RetentionConfig::default()),
        &ProjectConfig::default(),
    );
    for _ in 0..6 {
        learning
            .record_interaction("NET-002", InteractionAction::Shown, "s")
            .await;
        learning
            .record_interaction("NET-002", InteractionAction::Ignored, "s")
            .await;
    }

    let calibrations = learning.recalibrate().await;
    assert_eq!(
        calibrations["NET-002"].calibrated_severity,
        CalibratedSeverity::Suppressed
    );

    let result = learning.calibrated_audit(&exposed(), "s").await;
    assert!(result.suppressed.iter().any(|f| f.id == "NET-002"));
    assert!(result.actionable.iter().all(|f| f.id != "NET-002"));
    // The raw audit still carries every finding
    assert!(result.audit.has_finding("NET-002"));
    assert_eq!(learning.stores().usage.count().await, 1);
}
