//! The reconciliation state machine.
//!
//! One run moves through
//!
//! ```text
//! Resolving -> LookedUp -> { NoOp | Creating | Updating | Deleting } -> Done
//! ```
//!
//! and any phase may end in `Failed`. Every reference is resolved before the
//! lookup, so an unresolvable token never costs a write. At most one write is
//! issued per run, and none in dry-run.

use std::fmt;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::diff::{ChangeSet, diff};
use crate::error::{Operation, ReconcileError};
use crate::lookup::LookupEngine;
use crate::normalize::{merge_maps, normalize_desired, normalize_remote};
use crate::object::RemoteObject;
use crate::params::{DesiredState, Parameters, TargetState};
use crate::reference::ReferenceResolver;
use crate::report::{Action, Outcome, Reporter, serialize_object};
use crate::spec::ResourceSpec;
use crate::transport::Transport;

/// Phases of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Resolving,
    LookedUp,
    NoOp,
    Creating,
    Updating,
    Deleting,
    Done,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolving => "resolving",
            Self::LookedUp => "looked_up",
            Self::NoOp => "no_op",
            Self::Creating => "creating",
            Self::Updating => "updating",
            Self::Deleting => "deleting",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl From<Action> for Phase {
    fn from(action: Action) -> Self {
        match action {
            Action::NoOp => Self::NoOp,
            Action::Create => Self::Creating,
            Action::Update => Self::Updating,
            Action::Delete => Self::Deleting,
        }
    }
}

/// Picks the action for a target state, whether an object exists, and the
/// computed changes.
///
/// | state   | exists | changes   | action |
/// |---------|--------|-----------|--------|
/// | present | no     | -         | Create |
/// | present | yes    | empty     | NoOp   |
/// | present | yes    | non-empty | Update |
/// | absent  | yes    | -         | Delete |
/// | absent  | no     | -         | NoOp   |
#[must_use]
pub fn decide(state: TargetState, exists: bool, changes: &ChangeSet) -> Action {
    match (state, exists) {
        (TargetState::Present, false) => Action::Create,
        (TargetState::Present, true) if changes.is_empty() => Action::NoOp,
        (TargetState::Present, true) => Action::Update,
        (TargetState::Absent, true) => Action::Delete,
        (TargetState::Absent, false) => Action::NoOp,
    }
}

/// Drives one resource instance to its desired state.
pub struct Reconciler<'a> {
    transport: &'a dyn Transport,
    spec: &'a ResourceSpec,
}

impl<'a> Reconciler<'a> {
    /// Creates a reconciler for one resource kind.
    pub fn new(transport: &'a dyn Transport, spec: &'a ResourceSpec) -> Self {
        Self { transport, spec }
    }

    /// Validates `params` and reconciles.
    ///
    /// # Errors
    ///
    /// Parameter validation errors, then anything [`Reconciler::reconcile`]
    /// returns.
    pub async fn apply(&self, params: Parameters) -> Result<Outcome, ReconcileError> {
        let desired = DesiredState::from_parameters(self.spec, params).inspect_err(|e| {
            warn!(
                resource_kind = %self.spec.name,
                phase = %Phase::Failed,
                category = %e.category(),
                error = %e,
                "Invalid parameters"
            );
        })?;
        self.reconcile(&desired).await
    }

    /// Runs the state machine once.
    ///
    /// # Errors
    ///
    /// The first failure of any phase. No write has been issued when a
    /// resolution or lookup error is returned.
    pub async fn reconcile(&self, desired: &DesiredState) -> Result<Outcome, ReconcileError> {
        let key = desired.display_key(self.spec);
        let result = self.run(desired, &key).await;
        match &result {
            Ok(outcome) => debug!(
                resource_kind = %self.spec.name,
                name = %key,
                phase = %Phase::Done,
                changed = outcome.changed,
                "Reconciliation finished"
            ),
            Err(e) => warn!(
                resource_kind = %self.spec.name,
                name = %key,
                phase = %Phase::Failed,
                category = %e.category(),
                error = %e,
                "Reconciliation failed"
            ),
        }
        result
    }

    fn enter(&self, phase: Phase, key: &str) {
        debug!(resource_kind = %self.spec.name, name = %key, phase = %phase, "Entering phase");
    }

    async fn run(&self, desired: &DesiredState, key: &str) -> Result<Outcome, ReconcileError> {
        self.enter(Phase::Resolving, key);
        let resolved = ReferenceResolver::new(self.transport)
            .resolve_all(self.spec, desired.data())
            .await?;
        let filter = LookupEngine::build_filter(self.spec, &resolved, desired.query_params())?;
        let existing = LookupEngine::new(self.transport)
            .find(self.spec, &filter)
            .await?;
        self.enter(Phase::LookedUp, key);

        let reporter = Reporter::new(self.spec, key, desired.is_dry_run());
        let current = existing.as_ref().map(|o| normalize_remote(self.spec, o));
        let wanted = normalize_desired(self.spec, &resolved, current.as_ref());
        let changes = match desired.state() {
            TargetState::Present => diff(&wanted, current.as_ref()),
            TargetState::Absent => ChangeSet::default(),
        };

        let action = decide(desired.state(), existing.is_some(), &changes);
        self.enter(action.into(), key);

        match (action, existing) {
            (Action::Create, _) => {
                let payload = wanted.to_payload();
                if desired.is_dry_run() {
                    return Ok(reporter.created(Value::Object(payload), changes));
                }
                let created = self
                    .transport
                    .create(&self.spec.endpoint, &payload)
                    .await
                    .map_err(|e| {
                        ReconcileError::from_transport(Operation::Create, &self.spec.name, e)
                    })?;
                info!(
                    resource_kind = %self.spec.name,
                    name = %key,
                    id = %created.id,
                    "Created object"
                );
                Ok(reporter.created(serialize_object(self.spec, &created), changes))
            }
            (Action::Update, Some(existing)) => {
                let payload = changes.after();
                if desired.is_dry_run() {
                    let preview = match serialize_object(self.spec, &existing) {
                        Value::Object(current) => Value::Object(merge_maps(&current, &payload)),
                        other => other,
                    };
                    return Ok(reporter.updated(preview, changes));
                }
                let updated = self
                    .transport
                    .update(&self.spec.endpoint, &existing.id, &payload)
                    .await
                    .map_err(|e| {
                        ReconcileError::from_transport(Operation::Update, &self.spec.name, e)
                    })?;
                info!(
                    resource_kind = %self.spec.name,
                    name = %key,
                    id = %updated.id,
                    fields = ?changes.fields(),
                    "Updated object"
                );
                Ok(reporter.updated(serialize_object(self.spec, &updated), changes))
            }
            (Action::Delete, Some(existing)) => {
                let snapshot = serialize_object(self.spec, &existing);
                if !desired.is_dry_run() {
                    self.delete(&existing).await?;
                    info!(
                        resource_kind = %self.spec.name,
                        name = %key,
                        id = %existing.id,
                        "Deleted object"
                    );
                }
                Ok(reporter.deleted(snapshot))
            }
            (_, Some(existing)) => Ok(reporter.unchanged(serialize_object(self.spec, &existing))),
            (_, None) => Ok(reporter.absent()),
        }
    }

    async fn delete(&self, existing: &RemoteObject) -> Result<(), ReconcileError> {
        self.transport
            .delete(&self.spec.endpoint, &existing.id)
            .await
            .map_err(|e| ReconcileError::from_transport(Operation::Delete, &self.spec.name, e))
    }
}
