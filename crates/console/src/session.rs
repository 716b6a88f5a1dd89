//! One details-screen session: load, edit, optionally save or discard.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::broadcast::error::TryRecvError;

use hrdesk_client::{ActiveInterviewers, HrApi, HttpEntityStore, Resource};
use hrdesk_core::controller::{ControllerPorts, ViewModel};
use hrdesk_core::form::FormChange;
use hrdesk_core::mode::Mode;
use hrdesk_core::ports::{DraftStore, ReferenceSource};
use hrdesk_core::types::DbId;
use hrdesk_core::{ControllerOptions, CoreError, DetailController, SaveOutcome, ScreenSpec};
use hrdesk_events::{Notification, NotificationBus};
use hrdesk_store::FileDraftStore;

use crate::cli::{Cli, FieldAssignment};
use crate::config::ConsoleConfig;

/// Final action requested for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalAction {
    Keep,
    Save,
    Discard,
}

/// Everything a session needs, independent of where it came from.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub screen: ScreenSpec,
    pub entity_id: Option<DbId>,
    pub edits: Vec<FieldAssignment>,
    pub members: Option<Vec<DbId>>,
    pub action: FinalAction,
}

impl SessionRequest {
    pub fn from_cli(cli: Cli) -> Result<Self, CoreError> {
        let action = if cli.save {
            FinalAction::Save
        } else if cli.discard {
            FinalAction::Discard
        } else {
            FinalAction::Keep
        };
        Ok(Self {
            screen: hrdesk_core::screens::by_name(cli.screen.name())?,
            entity_id: cli.target.0,
            edits: cli.edits,
            members: cli.members,
            action,
        })
    }

    fn has_edits(&self) -> bool {
        !self.edits.is_empty() || self.members.is_some()
    }
}

/// What the session prints.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub screen: String,
    pub view: ViewModel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub notifications: Vec<Notification>,
}

/// Wire the HTTP store, the draft file, and the bus into controller ports.
pub fn build_ports(
    config: &ConsoleConfig,
    screen_name: &str,
    bus: &NotificationBus,
    request: &SessionRequest,
) -> anyhow::Result<ControllerPorts> {
    let resource = Resource::for_screen(screen_name)
        .ok_or_else(|| anyhow::anyhow!("No API resource for screen '{screen_name}'"))?;
    let api = HrApi::new(config.api_url.clone(), config.request_timeout())?;

    let references: Option<Arc<dyn ReferenceSource>> = resource
        .relation_field
        .map(|_| Arc::new(ActiveInterviewers::new(api.clone())) as Arc<dyn ReferenceSource>);
    let drafts: Arc<dyn DraftStore> = Arc::new(FileDraftStore::open(config.draft_path())?);

    Ok(ControllerPorts {
        store: Arc::new(HttpEntityStore::new(api, resource)),
        references,
        drafts,
        notifier: Arc::new(bus.scoped(request.screen.namespace.clone(), request.entity_id)),
    })
}

/// Run one session against the given ports.
///
/// Errors from individual steps are collected into the report; the session
/// still prints the final view model.
pub async fn run(
    request: SessionRequest,
    ports: ControllerPorts,
    options: ControllerOptions,
    bus: &NotificationBus,
) -> SessionReport {
    let mut rx = bus.subscribe();
    let namespace = request.screen.namespace.clone();
    let mut errors = Vec::new();
    let mut outcome = None;

    let mut controller = DetailController::new(
        request.screen.clone(),
        request.entity_id,
        ports,
        options,
    );

    let loaded = match controller.load().await {
        Ok(()) => true,
        Err(e) => {
            errors.push(format!("load: {e}"));
            false
        }
    };

    if loaded && request.has_edits() {
        if controller.mode() == Mode::View {
            if let Err(e) = controller.on_edit_requested() {
                errors.push(format!("edit: {e}"));
            }
        }
        apply_edits(&mut controller, &request);
        if let Err(e) = controller.flush_draft() {
            errors.push(format!("draft: {e}"));
        }
    }

    if loaded {
        match request.action {
            FinalAction::Keep => {}
            FinalAction::Save => {
                let saved = controller.on_save_requested().await;
                if let Some(e) = save_error(&saved) {
                    errors.push(format!("save: {e}"));
                }
                outcome = Some(describe(&saved));
            }
            FinalAction::Discard => match controller.on_discard_requested() {
                Ok(()) => outcome = Some(json!({ "status": "discarded" })),
                Err(e) => errors.push(format!("discard: {e}")),
            },
        }
    }

    let mut notifications = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(n) => notifications.push(n),
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Notification receiver lagged");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }

    SessionReport {
        screen: namespace,
        view: controller.view_model(),
        outcome,
        errors,
        notifications,
    }
}

fn apply_edits(controller: &mut DetailController, request: &SessionRequest) {
    for edit in &request.edits {
        if controller.screen().field(&edit.name).is_none() {
            tracing::warn!(field = %edit.name, "Ignoring edit of unknown field");
            continue;
        }
        controller.on_form_change(
            FormChange::set_field(edit.name.clone(), edit.value.clone()),
            Instant::now(),
        );
    }
    if let Some(members) = &request.members {
        if controller.screen().has_relation() {
            controller.on_form_change(
                FormChange::set_relations(members.iter().copied()),
                Instant::now(),
            );
        } else {
            tracing::warn!("Screen has no relation collection; --members ignored");
        }
    }
}

/// Why a save did not fully succeed, if it did not.
///
/// `NoChanges` is not an error; there was nothing to save.
pub fn save_error(outcome: &SaveOutcome) -> Option<String> {
    match outcome {
        SaveOutcome::NoChanges | SaveOutcome::Created { .. } | SaveOutcome::Updated { .. } => None,
        SaveOutcome::NotEditing => Some("screen is not in an editing mode".to_string()),
        SaveOutcome::Invalid(message) | SaveOutcome::Failed(message) => Some(message.clone()),
        SaveOutcome::PartiallySynced { failures, .. } => Some(format!(
            "{} member change(s) failed",
            failures.len()
        )),
    }
}

/// JSON summary of a save outcome.
pub fn describe(outcome: &SaveOutcome) -> Value {
    match outcome {
        SaveOutcome::NoChanges => json!({ "status": "no_changes" }),
        SaveOutcome::NotEditing => json!({ "status": "not_editing" }),
        SaveOutcome::Invalid(message) => json!({ "status": "invalid", "message": message }),
        SaveOutcome::Created { id } => json!({ "status": "created", "id": id }),
        SaveOutcome::Updated { id } => json!({ "status": "updated", "id": id }),
        SaveOutcome::PartiallySynced { id, failures } => {
            json!({ "status": "partially_synced", "id": id, "failures": failures })
        }
        SaveOutcome::Failed(message) => json!({ "status": "failed", "message": message }),
    }
}
