//! End-to-end tests: the full veto stack as the reconciliation loop sees it.

use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use std::sync::Arc;
use tollgate_types::{Application, MutableClock, ResourceId, ResourceRef, ResourceStatus};
use tollgate_veto::memory::{
    InMemoryApplicationVetoRepository, InMemoryConstraintSource, InMemoryDeploymentHistory,
    InMemoryDiffFingerprintRepository, InMemoryResourceRepository, InMemoryUnhappyVetoRepository,
};
use tollgate_veto::{
    ApplicationVeto, DeployWindowVeto, EvaluationMode, StaticConfigService, UnhappyVeto, Veto,
    VetoEnforcer, VetoEnforcerBuilder, VetoMessage,
};
use tollgate_window::TimeWindowConstraint;

struct Stack {
    resources: Arc<InMemoryResourceRepository>,
    diffs: Arc<InMemoryDiffFingerprintRepository>,
    markers: Arc<InMemoryUnhappyVetoRepository>,
    constraints: Arc<InMemoryConstraintSource>,
    clock: Arc<MutableClock>,
    unhappy: Arc<UnhappyVeto>,
    enforcer: VetoEnforcer,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("tollgate_veto=debug")
        .with_test_writer()
        .try_init();
}

fn stack(mode: EvaluationMode) -> Stack {
    init_tracing();
    let resources = Arc::new(InMemoryResourceRepository::new());
    let diffs = Arc::new(InMemoryDiffFingerprintRepository::new());
    let markers = Arc::new(InMemoryUnhappyVetoRepository::new());
    let constraints = Arc::new(InMemoryConstraintSource::new());
    let history = Arc::new(InMemoryDeploymentHistory::new());
    let config = Arc::new(StaticConfigService::new());
    // Wednesday morning
    let clock = Arc::new(MutableClock::new(
        Utc.with_ymd_and_hms(2020, 3, 25, 10, 0, 0).unwrap(),
    ));

    let unhappy = Arc::new(UnhappyVeto::new(
        resources.clone(),
        diffs.clone(),
        markers.clone(),
        config,
        clock.clone(),
    ));

    let enforcer = VetoEnforcerBuilder::new()
        .add_veto(Arc::new(ApplicationVeto::new(Arc::new(
            InMemoryApplicationVetoRepository::new(),
        ))))
        .add_veto(unhappy.clone())
        .add_veto(Arc::new(DeployWindowVeto::new(
            constraints.clone(),
            history,
            clock.clone(),
        )))
        .with_evaluation_mode(mode)
        .build();

    Stack {
        resources,
        diffs,
        markers,
        constraints,
        clock,
        unhappy,
        enforcer,
    }
}

fn message(value: serde_json::Value) -> VetoMessage {
    value.as_object().cloned().expect("object message")
}

#[tokio::test]
async fn healthy_resource_passes_every_veto() {
    let s = stack(EvaluationMode::FirstDenyWins);
    let resource = ResourceRef::new("ec2:cluster:prod:fnord-main", "fnord");
    s.resources.set_status(resource.id.clone(), ResourceStatus::Happy);

    let response = s.enforcer.can_check(&resource).await.unwrap();
    assert!(response.is_allowed());
    assert_eq!(
        s.enforcer.veto_names(),
        vec!["ApplicationVeto", "UnhappyVeto", "DeployWindowVeto"]
    );
}

#[tokio::test]
async fn opted_out_application_is_denied_first() {
    let s = stack(EvaluationMode::FirstDenyWins);
    let resource = ResourceRef::new("ec2:cluster:prod:fnord-main", "fnord");
    s.resources.set_status(resource.id.clone(), ResourceStatus::Unhappy);
    s.diffs.set_count(resource.id.clone(), 9);

    s.enforcer
        .pass_message(
            "ApplicationVeto",
            &message(json!({ "application": "fnord", "optedOut": true })),
        )
        .await
        .unwrap();

    let response = s.enforcer.can_check(&resource).await.unwrap();
    assert!(response.is_denied());
    assert_eq!(response.veto_name, "ApplicationVeto");
    // The unhappy veto was never consulted, so no marker exists
    assert!(s.markers.is_empty());
}

#[tokio::test]
async fn evaluate_all_reports_every_denial() {
    let s = stack(EvaluationMode::EvaluateAll);
    let resource = ResourceRef::new("ec2:cluster:prod:fnord-main", "fnord");
    s.resources.set_status(resource.id.clone(), ResourceStatus::Unhappy);
    s.diffs.set_count(resource.id.clone(), 9);
    s.constraints.insert(
        Application::new("fnord"),
        serde_json::from_value::<TimeWindowConstraint>(json!({
            "windows": [{ "days": "weekends" }]
        }))
        .unwrap(),
    );

    let response = s.enforcer.can_check(&resource).await.unwrap();
    assert!(response.is_denied());
    assert_eq!(response.veto_name, "UnhappyVeto,DeployWindowVeto");
    assert!(response.veto_artifact);
    assert_eq!(response.suggested_status, Some(ResourceStatus::Unhappy));

    let rejections = s.enforcer.current_rejections().await.unwrap();
    assert_eq!(rejections["UnhappyVeto"], vec![resource.id.to_string()]);
    assert_eq!(rejections["DeployWindowVeto"], vec!["fnord"]);
    assert!(rejections["ApplicationVeto"].is_empty());
}

#[tokio::test]
async fn unhappy_resource_is_rechecked_once_per_waiting_time() {
    let s = stack(EvaluationMode::FirstDenyWins);
    let resource = ResourceRef::new("titus:cluster:prod:fnord-api", "fnord");
    s.resources.set_status(resource.id.clone(), ResourceStatus::Unhappy);
    s.diffs.set_count(resource.id.clone(), 6);

    let mut allowed_minutes = Vec::new();
    for minute in 0..35 {
        if s.enforcer.can_check(&resource).await.unwrap().is_allowed() {
            allowed_minutes.push(minute);
        }
        s.clock.advance(Duration::minutes(1));
    }

    // Marked at 0, expires at 10, re-marked at 11, expires at 21, ...
    assert_eq!(allowed_minutes, vec![10, 21, 32]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checks_consume_an_expired_marker_once() {
    let s = stack(EvaluationMode::FirstDenyWins);
    let id = ResourceId::new("ec2:cluster:prod:fnord-main");
    let app = Application::new("fnord");
    s.resources.set_status(id.clone(), ResourceStatus::Unhappy);
    s.diffs.set_count(id.clone(), 6);

    assert!(s.unhappy.check(&id, &app).await.unwrap().is_denied());
    s.clock.advance(Duration::minutes(11));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let veto = s.unhappy.clone();
        let (id, app) = (id.clone(), app.clone());
        handles.push(tokio::spawn(async move {
            veto.check(&id, &app).await.unwrap().is_allowed()
        }));
    }

    let mut allowed = 0;
    for handle in handles {
        if handle.await.unwrap() {
            allowed += 1;
        }
    }

    // Exactly one caller consumed the expired marker; a later caller
    // re-marked the resource.
    assert_eq!(allowed, 1);
    assert_eq!(s.markers.len(), 1);
}

#[tokio::test]
async fn different_resources_do_not_interfere() {
    let s = stack(EvaluationMode::FirstDenyWins);
    let broken = ResourceRef::new("ec2:cluster:prod:broken", "fnord");
    let fine = ResourceRef::new("ec2:cluster:prod:fine", "fnord");
    s.resources.set_status(broken.id.clone(), ResourceStatus::Unhappy);
    s.diffs.set_count(broken.id.clone(), 20);
    s.resources.set_status(fine.id.clone(), ResourceStatus::Unhappy);
    s.diffs.set_count(fine.id.clone(), 1);

    let (a, b) = tokio::join!(s.enforcer.can_check(&broken), s.enforcer.can_check(&fine));
    assert!(a.unwrap().is_denied());
    assert!(b.unwrap().is_allowed());
}

#[tokio::test]
async fn unknown_resource_is_not_allowed() {
    let s = stack(EvaluationMode::FirstDenyWins);
    let resource = ResourceRef::new("ec2:cluster:prod:ghost", "fnord");

    assert!(s.enforcer.can_check(&resource).await.is_err());
    assert!(!s.enforcer.is_allowed(&resource).await);
}
