//! Veto commands
//!
//! `dry-run` assembles the full veto stack over in-memory repositories
//! seeded from a fixture file and reports the enforcer's verdict for each
//! resource, without touching any live system.

use crate::commands::read_document;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{self, print_json, print_warning, OutputFormat};
use chrono::{DateTime, Utc};
use clap::{Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tabled::Tabled;
use tollgate_types::{MutableClock, ResourceRef, ResourceStatus};
use tollgate_veto::memory::{
    InMemoryApplicationVetoRepository, InMemoryConstraintSource, InMemoryDeploymentHistory,
    InMemoryDiffFingerprintRepository, InMemoryResourceRepository, InMemoryUnhappyVetoRepository,
};
use tollgate_veto::{
    ApplicationVeto, DeployWindowVeto, EvaluationMode, UnhappyVeto, VetoEnforcer,
    VetoEnforcerBuilder, VetoMessage,
};
use tollgate_window::constraint::TimeWindowConstraintConfig;
use tollgate_window::TimeWindowConstraint;
use tracing::{debug, info};

/// Veto subcommands
#[derive(Subcommand)]
pub enum VetoCommands {
    /// Evaluate every resource in a fixture against the full veto stack
    DryRun {
        /// Fixture file (YAML, JSON or TOML)
        file: PathBuf,

        /// How the enforcer combines policies
        #[arg(long, value_enum, default_value_t = Mode::FirstDenyWins)]
        mode: Mode,

        /// Also list what each policy currently rejects
        #[arg(long)]
        rejections: bool,
    },
}

/// Enforcer evaluation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Stop at the first denial
    FirstDenyWins,
    /// Consult every policy and merge denials
    EvaluateAll,
}

impl From<Mode> for EvaluationMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::FirstDenyWins => EvaluationMode::FirstDenyWins,
            Mode::EvaluateAll => EvaluationMode::EvaluateAll,
        }
    }
}

/// Static world a dry run is evaluated against
///
/// ```yaml
/// now: 2020-03-25T10:00:00Z
/// config:
///   veto.unhappy.max-diff-count: 3
/// optedOut: [legacy]
/// constraints:
///   fnord:
///     windows: [{ days: weekdays, hours: 9-17 }]
///     tz: America/Los_Angeles
/// resources:
///   - id: ec2:cluster:prod:fnord-main
///     application: fnord
///     status: UNHAPPY
///     diffCount: 6
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    /// Instant the checks run at (defaults to now)
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,

    /// Dynamic configuration, layered over the CLI config
    #[serde(default)]
    pub config: BTreeMap<String, Value>,

    /// Applications opted out of actuation
    #[serde(default)]
    pub opted_out: Vec<String>,

    /// Deployment windows per application
    #[serde(default)]
    pub constraints: BTreeMap<String, TimeWindowConstraintConfig>,

    pub resources: Vec<FixtureResource>,
}

/// One resource in a [`Fixture`]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureResource {
    pub id: String,
    pub application: String,
    pub status: ResourceStatus,

    /// Consecutive times the same diff has been seen
    #[serde(default)]
    pub diff_count: u32,

    /// Past deploys of this resource
    #[serde(default)]
    pub deploys: Vec<DateTime<Utc>>,
}

/// Table row for one verdict
#[derive(Debug, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct VerdictRow {
    resource: String,
    application: String,
    status: String,
    allowed: bool,
    veto: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct RejectionRow<'a> {
    veto: &'a str,
    rejected: &'a [String],
}

/// Execute a veto command
pub async fn execute(
    command: VetoCommands,
    config: &CliConfig,
    format: OutputFormat,
) -> CliResult<()> {
    match command {
        VetoCommands::DryRun {
            file,
            mode,
            rejections,
        } => {
            let fixture: Fixture = read_document(&file)?;
            let (enforcer, verdicts) = dry_run(fixture, config, mode.into()).await?;
            output::print_output(verdicts, format);

            if rejections {
                let current = enforcer.current_rejections().await?;
                match format {
                    OutputFormat::Json => {
                        let rows: Vec<_> = current
                            .iter()
                            .map(|(veto, rejected)| RejectionRow { veto, rejected })
                            .collect();
                        print_json(&rows);
                    }
                    OutputFormat::Table => {
                        for (veto, rejected) in &current {
                            if rejected.is_empty() {
                                println!("{veto}: none");
                            } else {
                                print_warning(&format!("{veto}: {}", rejected.join(", ")));
                            }
                        }
                    }
                }
            }
            Ok(())
        }
    }
}

/// Build the veto stack for `fixture` and check every resource in order
///
/// Returns the enforcer as well so callers can inspect state the checks
/// left behind.
pub async fn dry_run(
    fixture: Fixture,
    config: &CliConfig,
    mode: EvaluationMode,
) -> CliResult<(VetoEnforcer, Vec<VerdictRow>)> {
    let now = fixture.now.unwrap_or_else(Utc::now);
    let clock = Arc::new(MutableClock::new(now));

    let dynamic = Arc::new(config.dynamic_config()?);
    for (key, value) in fixture.config {
        dynamic.set(key, value);
    }

    let resources = Arc::new(InMemoryResourceRepository::new());
    let diffs = Arc::new(InMemoryDiffFingerprintRepository::new());
    let history = Arc::new(InMemoryDeploymentHistory::new());
    for resource in &fixture.resources {
        let reference = ResourceRef::new(resource.id.clone(), resource.application.clone());
        resources.set_status(reference.id.clone(), resource.status);
        diffs.set_count(reference.id.clone(), resource.diff_count);
        for deploy in &resource.deploys {
            history.record_deploy(reference.id.clone(), *deploy);
        }
    }

    let constraints = Arc::new(InMemoryConstraintSource::new());
    for (application, mut raw) in fixture.constraints {
        if raw.tz.is_none() {
            raw.tz = config.default_timezone.clone();
        }
        let constraint = TimeWindowConstraint::try_from(raw).map_err(|e| {
            CliError::InvalidInput(format!("constraint for {application}: {e}"))
        })?;
        constraints.insert(application.as_str().into(), constraint);
    }

    let enforcer = VetoEnforcerBuilder::new()
        .add_veto(Arc::new(ApplicationVeto::new(Arc::new(
            InMemoryApplicationVetoRepository::new(),
        ))))
        .add_veto(Arc::new(UnhappyVeto::new(
            resources,
            diffs,
            Arc::new(InMemoryUnhappyVetoRepository::new()),
            dynamic,
            clock.clone(),
        )))
        .add_veto(Arc::new(DeployWindowVeto::new(constraints, history, clock)))
        .with_evaluation_mode(mode)
        .build();

    for application in &fixture.opted_out {
        let mut message = VetoMessage::new();
        message.insert("application".into(), Value::from(application.as_str()));
        message.insert("optedOut".into(), Value::Bool(true));
        enforcer.pass_message("ApplicationVeto", &message).await?;
    }

    info!(
        resources = fixture.resources.len(),
        vetoes = ?enforcer.veto_names(),
        at = %now,
        "Starting dry run"
    );

    let mut verdicts = Vec::with_capacity(fixture.resources.len());
    for resource in fixture.resources {
        let reference = ResourceRef::new(resource.id, resource.application);
        let response = enforcer.can_check(&reference).await?;
        debug!(resource = %reference, allowed = response.allowed, "Checked resource");
        verdicts.push(VerdictRow {
            resource: reference.id.to_string(),
            application: reference.application.to_string(),
            status: resource.status.to_string(),
            allowed: response.allowed,
            veto: response.veto_name,
            message: response.message.unwrap_or_default(),
        });
    }

    Ok((enforcer, verdicts))
}
