//! Veto enforcer
//!
//! The enforcer provides a single entry point for the reconciliation
//! loop: a resource check is allowed only if every registered veto allows
//! it. It holds no state beyond the ordered list of vetoes.

use crate::error::{Result, VetoError};
use crate::veto::{Veto, VetoMessage};
use std::collections::BTreeMap;
use std::sync::Arc;
use tollgate_types::{Application, ResourceId, ResourceRef, VetoResponse};
use tracing::{debug, warn};

/// Name reported when every veto allows
pub const ALLOW_ALL: &str = "all";

/// How the enforcer walks its vetoes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvaluationMode {
    /// Stop at the first denial and return it
    #[default]
    FirstDenyWins,

    /// Check every veto and merge all denials into one response
    EvaluateAll,
}

/// Aggregates an ordered list of vetoes
#[derive(Debug, Clone)]
pub struct VetoEnforcer {
    vetoes: Vec<Arc<dyn Veto>>,
    evaluation_mode: EvaluationMode,
    emit_audit_events: bool,
}

impl VetoEnforcer {
    /// Create an enforcer over `vetoes`, checked in order
    pub fn new(vetoes: Vec<Arc<dyn Veto>>) -> Self {
        Self {
            vetoes,
            evaluation_mode: EvaluationMode::default(),
            emit_audit_events: true,
        }
    }

    /// Set the evaluation mode
    pub fn with_evaluation_mode(mut self, mode: EvaluationMode) -> Self {
        self.evaluation_mode = mode;
        self
    }

    /// Set whether denials are logged
    pub fn with_emit_audit_events(mut self, emit: bool) -> Self {
        self.emit_audit_events = emit;
        self
    }

    pub fn evaluation_mode(&self) -> EvaluationMode {
        self.evaluation_mode
    }

    /// Names of the registered vetoes, in check order
    pub fn veto_names(&self) -> Vec<String> {
        self.vetoes.iter().map(|v| v.name().to_string()).collect()
    }

    /// Look up a veto by name
    pub fn find(&self, name: &str) -> Option<&Arc<dyn Veto>> {
        self.vetoes.iter().find(|v| v.name() == name)
    }

    /// Decide whether the reconciler may act on `resource` now
    pub async fn can_check(&self, resource: &ResourceRef) -> Result<VetoResponse> {
        self.can_check_id(&resource.id, &resource.application).await
    }

    /// Decide by resource id and owning application
    pub async fn can_check_id(
        &self,
        resource_id: &ResourceId,
        application: &Application,
    ) -> Result<VetoResponse> {
        let mut denials = Vec::new();

        for veto in &self.vetoes {
            let response = veto.check(resource_id, application).await?;
            if response.is_allowed() {
                continue;
            }
            if self.evaluation_mode == EvaluationMode::FirstDenyWins {
                self.log_denial(resource_id, &response);
                return Ok(response);
            }
            denials.push(response);
        }

        if denials.is_empty() {
            debug!(resource_id = %resource_id, "All vetoes allow resource check");
            return Ok(VetoResponse::allow(ALLOW_ALL));
        }

        let merged = merge_denials(denials);
        self.log_denial(resource_id, &merged);
        Ok(merged)
    }

    /// Conservative convenience: an error from any veto counts as a denial
    pub async fn is_allowed(&self, resource: &ResourceRef) -> bool {
        match self.can_check(resource).await {
            Ok(response) => response.is_allowed(),
            Err(e) => {
                warn!(
                    resource_id = %resource.id,
                    error = %e,
                    "Veto check failed, treating as denied"
                );
                false
            }
        }
    }

    /// Route a message to the named veto
    pub async fn pass_message(&self, veto_name: &str, message: &VetoMessage) -> Result<()> {
        let veto = self
            .find(veto_name)
            .ok_or_else(|| VetoError::UnknownVeto(veto_name.to_string()))?;
        veto.pass_message(message).await
    }

    /// Current rejections of every veto, keyed by veto name
    pub async fn current_rejections(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let mut all = BTreeMap::new();
        for veto in &self.vetoes {
            all.insert(veto.name().to_string(), veto.current_rejections().await?);
        }
        Ok(all)
    }

    /// Current rejections for one application, keyed by veto name
    pub async fn current_rejections_by_app(
        &self,
        application: &Application,
    ) -> Result<BTreeMap<String, Vec<String>>> {
        let mut all = BTreeMap::new();
        for veto in &self.vetoes {
            all.insert(
                veto.name().to_string(),
                veto.current_rejections_by_app(application).await?,
            );
        }
        Ok(all)
    }

    fn log_denial(&self, resource_id: &ResourceId, response: &VetoResponse) {
        if !self.emit_audit_events {
            return;
        }
        warn!(
            resource_id = %resource_id,
            veto = %response.veto_name,
            reason = response.message.as_deref().unwrap_or(""),
            veto_artifact = response.veto_artifact,
            "Resource check vetoed"
        );
    }
}

/// Fold several denials into one response
fn merge_denials(denials: Vec<VetoResponse>) -> VetoResponse {
    if denials.len() == 1 {
        return denials.into_iter().next().unwrap_or_else(|| VetoResponse::allow(ALLOW_ALL));
    }

    let veto_name = denials
        .iter()
        .map(|d| d.veto_name.as_str())
        .collect::<Vec<_>>()
        .join(",");
    let message = denials
        .iter()
        .filter_map(|d| d.message.as_deref())
        .collect::<Vec<_>>()
        .join("; ");
    let veto_artifact = denials.iter().any(|d| d.veto_artifact);
    let suggested_status = denials.iter().find_map(|d| d.suggested_status);

    let mut merged = VetoResponse::deny(veto_name, message).with_veto_artifact(veto_artifact);
    merged.suggested_status = suggested_status;
    merged
}

/// Builder for VetoEnforcer
#[derive(Debug, Default)]
pub struct VetoEnforcerBuilder {
    vetoes: Vec<Arc<dyn Veto>>,
    evaluation_mode: EvaluationMode,
    emit_audit_events: Option<bool>,
}

impl VetoEnforcerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a veto; vetoes are checked in the order they are added
    pub fn add_veto(mut self, veto: Arc<dyn Veto>) -> Self {
        self.vetoes.push(veto);
        self
    }

    /// Set the evaluation mode
    pub fn with_evaluation_mode(mut self, mode: EvaluationMode) -> Self {
        self.evaluation_mode = mode;
        self
    }

    /// Set whether denials are logged
    pub fn with_emit_audit_events(mut self, emit: bool) -> Self {
        self.emit_audit_events = Some(emit);
        self
    }

    /// Build the enforcer
    pub fn build(self) -> VetoEnforcer {
        VetoEnforcer {
            vetoes: self.vetoes,
            evaluation_mode: self.evaluation_mode,
            emit_audit_events: self.emit_audit_events.unwrap_or(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tollgate_types::ResourceStatus;

    /// Veto whose verdict can be flipped from the test
    #[derive(Debug)]
    struct DummyVeto {
        name: String,
        allow: AtomicBool,
        artifact: bool,
        calls: AtomicUsize,
    }

    impl DummyVeto {
        fn new(name: &str, allow: bool) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                allow: AtomicBool::new(allow),
                artifact: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn with_artifact(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                allow: AtomicBool::new(false),
                artifact: true,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Veto for DummyVeto {
        fn name(&self) -> &str {
            &self.name
        }

        async fn check(&self, _: &ResourceId, _: &Application) -> Result<VetoResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.allow.load(Ordering::SeqCst) {
                Ok(VetoResponse::allow(&self.name))
            } else {
                Ok(VetoResponse::deny(&self.name, format!("{} says no", self.name))
                    .with_veto_artifact(self.artifact)
                    .with_suggested_status(ResourceStatus::Vetoed))
            }
        }

        async fn pass_message(&self, message: &VetoMessage) -> Result<()> {
            let allow = message
                .get("allow")
                .and_then(|v| v.as_bool())
                .ok_or_else(|| VetoError::InvalidMessage {
                    veto: self.name.clone(),
                    reason: "missing allow".into(),
                })?;
            self.allow.store(allow, Ordering::SeqCst);
            Ok(())
        }

        async fn current_rejections(&self) -> Result<Vec<String>> {
            Ok(if self.allow.load(Ordering::SeqCst) {
                vec![]
            } else {
                vec!["everything".into()]
            })
        }

        async fn current_rejections_by_app(&self, app: &Application) -> Result<Vec<String>> {
            Ok(if self.allow.load(Ordering::SeqCst) {
                vec![]
            } else {
                vec![app.to_string()]
            })
        }
    }

    /// Veto whose collaborator is down
    #[derive(Debug)]
    struct BrokenVeto;

    #[async_trait]
    impl Veto for BrokenVeto {
        fn name(&self) -> &str {
            "BrokenVeto"
        }

        async fn check(&self, _: &ResourceId, _: &Application) -> Result<VetoResponse> {
            Err(VetoError::repository("status store unavailable"))
        }

        async fn pass_message(&self, _: &VetoMessage) -> Result<()> {
            Ok(())
        }

        async fn current_rejections(&self) -> Result<Vec<String>> {
            Ok(vec![])
        }

        async fn current_rejections_by_app(&self, _: &Application) -> Result<Vec<String>> {
            Ok(vec![])
        }
    }

    fn resource() -> ResourceRef {
        ResourceRef::new("ec2:cluster:prod:fnord-main", "fnord")
    }

    #[tokio::test]
    async fn test_all_allow() {
        let enforcer = VetoEnforcer::new(vec![
            DummyVeto::new("a", true) as Arc<dyn Veto>,
            DummyVeto::new("b", true),
        ]);

        let response = enforcer.can_check(&resource()).await.unwrap();
        assert!(response.is_allowed());
        assert_eq!(response.veto_name, ALLOW_ALL);
    }

    #[tokio::test]
    async fn test_empty_enforcer_allows() {
        let enforcer = VetoEnforcer::new(vec![]);
        assert!(enforcer.can_check(&resource()).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn test_single_denial_denies() {
        let deny = DummyVeto::new("deny", false);
        let after = DummyVeto::new("after", true);
        let enforcer = VetoEnforcer::new(vec![
            DummyVeto::new("allow", true) as Arc<dyn Veto>,
            deny.clone(),
            after.clone(),
        ]);

        let response = enforcer.can_check(&resource()).await.unwrap();
        assert!(response.is_denied());
        assert_eq!(response.veto_name, "deny");
        assert_eq!(deny.calls(), 1);
        // First denial short-circuits
        assert_eq!(after.calls(), 0);
    }

    #[tokio::test]
    async fn test_evaluate_all_merges_denials() {
        let after = DummyVeto::new("after", true);
        let enforcer = VetoEnforcerBuilder::new()
            .add_veto(DummyVeto::new("first", false))
            .add_veto(DummyVeto::with_artifact("second"))
            .add_veto(after.clone())
            .with_evaluation_mode(EvaluationMode::EvaluateAll)
            .with_emit_audit_events(false)
            .build();

        let response = enforcer.can_check(&resource()).await.unwrap();
        assert!(response.is_denied());
        assert_eq!(response.veto_name, "first,second");
        assert_eq!(
            response.message.as_deref(),
            Some("first says no; second says no")
        );
        assert!(response.veto_artifact);
        assert_eq!(response.suggested_status, Some(ResourceStatus::Vetoed));
        assert_eq!(after.calls(), 1);
    }

    #[tokio::test]
    async fn test_evaluate_all_single_denial_is_unchanged() {
        let enforcer = VetoEnforcer::new(vec![
            DummyVeto::new("allow", true) as Arc<dyn Veto>,
            DummyVeto::new("deny", false),
        ])
        .with_evaluation_mode(EvaluationMode::EvaluateAll);

        let response = enforcer.can_check(&resource()).await.unwrap();
        assert_eq!(response.veto_name, "deny");
        assert_eq!(response.message.as_deref(), Some("deny says no"));
    }

    #[tokio::test]
    async fn test_errors_propagate_and_is_allowed_is_conservative() {
        let enforcer = VetoEnforcer::new(vec![
            DummyVeto::new("allow", true) as Arc<dyn Veto>,
            Arc::new(BrokenVeto),
        ]);

        assert!(matches!(
            enforcer.can_check(&resource()).await,
            Err(VetoError::Repository { .. })
        ));
        assert!(!enforcer.is_allowed(&resource()).await);
    }

    #[tokio::test]
    async fn test_pass_message_routes_by_name() {
        let toggle = DummyVeto::new("toggle", true);
        let enforcer = VetoEnforcer::new(vec![toggle.clone() as Arc<dyn Veto>]);

        let mut message = VetoMessage::new();
        message.insert("allow".into(), serde_json::Value::Bool(false));
        enforcer.pass_message("toggle", &message).await.unwrap();
        assert!(!enforcer.is_allowed(&resource()).await);

        assert!(matches!(
            enforcer.pass_message("nope", &message).await,
            Err(VetoError::UnknownVeto(_))
        ));
    }

    #[tokio::test]
    async fn test_rejections_keyed_by_veto() {
        let enforcer = VetoEnforcer::new(vec![
            DummyVeto::new("allow", true) as Arc<dyn Veto>,
            DummyVeto::new("deny", false),
        ]);

        assert_eq!(enforcer.veto_names(), vec!["allow", "deny"]);

        let all = enforcer.current_rejections().await.unwrap();
        assert!(all["allow"].is_empty());
        assert_eq!(all["deny"], vec!["everything"]);

        let by_app = enforcer
            .current_rejections_by_app(&Application::new("fnord"))
            .await
            .unwrap();
        assert_eq!(by_app["deny"], vec!["fnord"]);
    }
}
