//! Apply a desired-state file

use std::path::{Path, PathBuf};

use ad_provider::{AttributeChange, PlanAction, ProviderResult, ProviderService};
use clap::Args;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::{confirm, connect, state_path};
use crate::error::{CliError, CliResult};
use crate::models::{DesiredState, StateFile};

/// Apply a desired-state file
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Path to desired-state file
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,

    /// Path to state file
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Preview changes without applying
    #[arg(long)]
    pub dry_run: bool,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// What applying does to one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Create,
    Update,
    Replace,
    Delete,
    Unchanged,
}

impl StepAction {
    pub fn symbol(&self) -> &'static str {
        match self {
            StepAction::Create => "+",
            StepAction::Update => "~",
            StepAction::Replace => "-/+",
            StepAction::Delete => "-",
            StepAction::Unchanged => " ",
        }
    }

    fn color(&self) -> &'static str {
        match self {
            StepAction::Create => "\x1b[32m",
            StepAction::Update => "\x1b[33m",
            StepAction::Replace | StepAction::Delete => "\x1b[31m",
            StepAction::Unchanged => "",
        }
    }

    fn past_tense(&self) -> &'static str {
        match self {
            StepAction::Create => "Created",
            StepAction::Update => "Updated",
            StepAction::Replace => "Replaced",
            StepAction::Delete => "Deleted",
            StepAction::Unchanged => "Unchanged",
        }
    }
}

impl From<PlanAction> for StepAction {
    fn from(action: PlanAction) -> Self {
        match action {
            PlanAction::Create => StepAction::Create,
            PlanAction::Update => StepAction::Update,
            PlanAction::Replace => StepAction::Replace,
            PlanAction::NoOp => StepAction::Unchanged,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Planned,
    Success,
    Failed,
    Skipped,
}

/// One planned step.
#[derive(Debug, Clone, Serialize)]
pub struct Step {
    pub resource_type: String,
    pub name: String,
    pub action: StepAction,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<AttributeChange>,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    prior: Option<Value>,
    #[serde(skip)]
    planned: Value,
}

impl Step {
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct ApplySummary {
    pub created: usize,
    pub updated: usize,
    pub replaced: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize)]
pub struct ApplyResult {
    pub dry_run: bool,
    pub steps: Vec<Step>,
    pub summary: ApplySummary,
}

impl ApplyResult {
    pub fn new(dry_run: bool, steps: Vec<Step>) -> Self {
        let summary = summarize(&steps);
        Self {
            dry_run,
            steps,
            summary,
        }
    }
}

/// Count steps by action. Failed steps count only as failures and skipped
/// steps not at all.
pub fn summarize(steps: &[Step]) -> ApplySummary {
    let mut summary = ApplySummary::default();
    for step in steps {
        match step.status {
            StepStatus::Failed => {
                summary.failed += 1;
                continue;
            }
            StepStatus::Skipped => continue,
            StepStatus::Planned | StepStatus::Success => {}
        }
        match step.action {
            StepAction::Create => summary.created += 1,
            StepAction::Update => summary.updated += 1,
            StepAction::Replace => summary.replaced += 1,
            StepAction::Delete => summary.deleted += 1,
            StepAction::Unchanged => summary.unchanged += 1,
        }
    }
    summary
}

/// Execute the apply command
pub async fn execute(args: ApplyArgs) -> CliResult<()> {
    let desired = DesiredState::load(&args.file)?;
    let path = state_path(args.state);
    let mut state = StateFile::load(&path)?;

    let provider = connect(&desired).await?;
    let mut steps = plan_steps(&provider, &desired, &state).await?;

    if !steps.iter().any(|s| s.action != StepAction::Unchanged) {
        refresh_unchanged(&steps, &mut state);
        state.save(&path)?;
        if args.json {
            let result = ApplyResult::new(args.dry_run, steps);
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!("No changes required. Directory matches the desired state.");
        }
        provider.shutdown().await?;
        return Ok(());
    }

    if !args.json {
        print_planned_changes(&steps, args.dry_run);
    }

    if args.dry_run {
        if args.json {
            let result = ApplyResult::new(true, steps);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        provider.shutdown().await?;
        return Ok(());
    }

    let pending = steps
        .iter()
        .filter(|s| s.action != StepAction::Unchanged)
        .count();
    if !confirm(format!("Apply {pending} change(s)?"), args.yes)? {
        println!("Cancelled.");
        provider.shutdown().await?;
        return Ok(());
    }

    let failure = apply_steps(&provider, &mut steps, &mut state, &path).await?;
    provider.shutdown().await?;

    let result = ApplyResult::new(false, steps);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_apply_results(&result);
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Plan every declared resource against refreshed state, then deletions of
/// recorded resources that are no longer declared.
pub async fn plan_steps(
    provider: &impl ProviderService,
    desired: &DesiredState,
    state: &StateFile,
) -> CliResult<Vec<Step>> {
    let mut steps = Vec::new();

    for decl in &desired.resources {
        let prior = match state.get(&decl.address()) {
            Some(entry) => {
                provider
                    .read(&decl.resource_type, entry.state.clone())
                    .await?
            }
            None => None,
        };

        let plan = provider
            .plan(
                &decl.resource_type,
                prior.clone(),
                Value::Object(decl.config.clone()),
            )
            .await?;

        steps.push(Step {
            resource_type: decl.resource_type.clone(),
            name: decl.name.clone(),
            action: plan.action.into(),
            changes: plan.changes,
            status: StepStatus::Planned,
            error: None,
            prior,
            planned: plan.planned_state,
        });
    }

    for entry in state.undeclared(desired).into_iter().rev() {
        steps.push(Step {
            resource_type: entry.resource_type.clone(),
            name: entry.name.clone(),
            action: StepAction::Delete,
            changes: Vec::new(),
            status: StepStatus::Planned,
            error: None,
            prior: Some(entry.state.clone()),
            planned: Value::Null,
        });
    }

    Ok(steps)
}

/// Record refreshed state of unchanged resources.
fn refresh_unchanged(steps: &[Step], state: &mut StateFile) {
    for step in steps {
        if step.action != StepAction::Unchanged {
            continue;
        }
        if let Some(prior) = &step.prior {
            state.upsert(&step.resource_type, &step.name, prior.clone());
        }
    }
}

/// Run steps in order, saving state after each. Stops at the first failure
/// and returns it; later steps are marked skipped.
async fn apply_steps(
    provider: &impl ProviderService,
    steps: &mut [Step],
    state: &mut StateFile,
    path: &Path,
) -> CliResult<Option<CliError>> {
    refresh_unchanged(steps, state);
    state.save(path)?;

    let mut failure = None;
    for step in steps.iter_mut() {
        if step.action == StepAction::Unchanged {
            continue;
        }
        if failure.is_some() {
            step.status = StepStatus::Skipped;
            continue;
        }

        match apply_step(provider, step, state).await {
            Ok(()) => {
                step.status = StepStatus::Success;
                info!(address = %step.address(), action = ?step.action, "Step applied");
            }
            Err(e) => {
                warn!(address = %step.address(), error = %e, "Step failed");
                step.status = StepStatus::Failed;
                step.error = Some(e.to_string());
                failure = Some(CliError::from(e));
            }
        }
        state.save(path)?;
    }

    Ok(failure)
}

async fn apply_step(
    provider: &impl ProviderService,
    step: &Step,
    state: &mut StateFile,
) -> ProviderResult<()> {
    let address = step.address();
    let resource_type = step.resource_type.as_str();

    match step.action {
        StepAction::Create => {
            let new_state = provider.create(resource_type, step.planned.clone()).await?;
            state.upsert(resource_type, &step.name, new_state);
        }
        StepAction::Update => {
            let prior = step.prior.clone().unwrap_or(Value::Null);
            let new_state = provider
                .update(resource_type, prior, step.planned.clone())
                .await?;
            state.upsert(resource_type, &step.name, new_state);
        }
        StepAction::Replace => {
            if let Some(prior) = step.prior.clone() {
                provider.delete(resource_type, prior).await?;
            }
            state.remove(&address);
            let new_state = provider.create(resource_type, step.planned.clone()).await?;
            state.upsert(resource_type, &step.name, new_state);
        }
        StepAction::Delete => {
            if let Some(prior) = step.prior.clone() {
                provider.delete(resource_type, prior).await?;
            }
            state.remove(&address);
        }
        StepAction::Unchanged => {}
    }
    Ok(())
}

fn print_planned_changes(steps: &[Step], dry_run: bool) {
    if dry_run {
        println!("Dry run - no changes will be made.");
        println!();
        println!("Would apply:");
    } else {
        println!("Planning changes:");
    }

    let reset = "\x1b[0m";
    for step in steps {
        if step.action == StepAction::Unchanged {
            continue;
        }

        println!(
            "  {}{}{reset} {}",
            step.action.color(),
            step.action.symbol(),
            step.address()
        );
        for change in &step.changes {
            let forces = if change.forces_replacement {
                " (forces replacement)"
            } else {
                ""
            };
            println!(
                "      {}: {} -> {}{forces}",
                change.name, change.before, change.after
            );
        }
    }

    let summary = summarize(steps);
    println!();
    println!(
        "Plan: {} to create, {} to update, {} to replace, {} to delete.",
        summary.created, summary.updated, summary.replaced, summary.deleted
    );
}

fn print_apply_results(result: &ApplyResult) {
    println!("Applying changes...");

    let reset = "\x1b[0m";
    for step in &result.steps {
        let (symbol, color, label) = match step.status {
            StepStatus::Success => ("✓", "\x1b[32m", step.action.past_tense()),
            StepStatus::Failed => ("✗", "\x1b[31m", "Failed"),
            StepStatus::Skipped => ("-", "\x1b[33m", "Skipped"),
            StepStatus::Planned => continue,
        };

        print!("  {color}{symbol}{reset} {label} {}", step.address());
        if let Some(ref error) = step.error {
            print!(": {error}");
        }
        println!();
    }

    let summary = &result.summary;
    println!();
    println!(
        "Apply complete: {} created, {} updated, {} replaced, {} deleted, {} failed.",
        summary.created, summary.updated, summary.replaced, summary.deleted, summary.failed
    );
}
