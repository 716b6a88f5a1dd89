//! [`DetailController`]: the draft-reconciliation state controller.
//!
//! One controller drives one details screen for one entity. It reconciles
//! the server's copy of the entity with any draft left from an unsaved
//! session, tracks dirtiness against a baseline, gates the save action, and
//! on save issues the field update and the relation add/remove batch.
//!
//! The controller never blocks the host while awaiting I/O; instead the form
//! and every action are disabled for the duration of a save.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::draft::{DraftDebouncer, DraftPersistence, DraftRecord, DraftWrite, DEFAULT_DEBOUNCE};
use crate::error::CoreError;
use crate::form::{FormChange, FormEdit, FormState, FormSurface};
use crate::mode::{Mode, ModeState};
use crate::ports::{DraftStore, EntityPayload, Notifier, ReferenceSource, RemoteEntityStore};
use crate::relation::{self, RelationDiff, RelationFailure, RelationSyncReport};
use crate::restore;
use crate::screens::ScreenSpec;
use crate::snapshot::{self, RelationOrder, Snapshot};
use crate::types::{DbId, FieldMap};

// ---------------------------------------------------------------------------
// Configuration and collaborators
// ---------------------------------------------------------------------------

/// Tunables for a controller instance.
#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    /// Delay between the last form change and the draft write.
    pub debounce: Duration,
    /// Overrides the screen's relation order policy when set.
    pub relation_order: Option<RelationOrder>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            relation_order: None,
        }
    }
}

/// The external collaborators a controller talks to.
#[derive(Clone)]
pub struct ControllerPorts {
    pub store: Arc<dyn RemoteEntityStore>,
    /// Reference list used to validate restored relation ids.
    pub references: Option<Arc<dyn ReferenceSource>>,
    pub drafts: Arc<dyn DraftStore>,
    pub notifier: Arc<dyn Notifier>,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Where the initial load stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Pending,
    Ready,
    Failed,
}

/// Result of applying a form change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// The surface is disabled or the value did not change.
    Ignored,
    /// The value changed; no draft write was scheduled.
    Applied,
    /// The value changed and a debounced draft write is pending.
    DraftScheduled,
}

/// Result of a save request.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Nothing differs from the baseline and no draft is pending. No
    /// network call was made.
    NoChanges,
    /// The screen is not in an editing mode, or a save is already running.
    NotEditing,
    /// Local validation failed. No network call was made.
    Invalid(String),
    Created { id: DbId },
    Updated { id: DbId },
    /// Fields were saved but some relation calls failed. The failed calls
    /// are replayed by the next save.
    PartiallySynced {
        id: DbId,
        failures: Vec<RelationFailure>,
    },
    /// The create or update call failed.
    Failed(String),
}

/// What the hosting view binds to.
#[derive(Debug, Clone, Serialize)]
pub struct ViewModel {
    pub entity_id: Option<DbId>,
    pub mode: Mode,
    pub load_state: LoadState,
    pub is_editing: bool,
    pub is_dirty: bool,
    pub form_enabled: bool,
    pub visible_action_keys: Vec<&'static str>,
    pub disabled_action_keys: Vec<&'static str>,
    pub form_state: FormState,
    pub dropped_relation_ids: Vec<DbId>,
}

// ---------------------------------------------------------------------------
// DetailController
// ---------------------------------------------------------------------------

pub struct DetailController {
    screen: Arc<ScreenSpec>,
    entity_id: Option<DbId>,
    store: Arc<dyn RemoteEntityStore>,
    references: Option<Arc<dyn ReferenceSource>>,
    drafts: DraftPersistence,
    notifier: Arc<dyn Notifier>,
    form: FormSurface,
    baseline: Snapshot,
    persisted_relation_ids: Vec<DbId>,
    state: ModeState,
    debouncer: DraftDebouncer,
    load_state: LoadState,
    dropped_relation_ids: Vec<DbId>,
}

impl DetailController {
    /// Create a controller for `entity_id` (`None` for a new entity).
    ///
    /// The controller starts disabled in `View`; call [`load`](Self::load)
    /// before anything else.
    pub fn new(
        mut screen: ScreenSpec,
        entity_id: Option<DbId>,
        ports: ControllerPorts,
        options: ControllerOptions,
    ) -> Self {
        if let Some(order) = options.relation_order {
            screen.relation_order = order;
        }
        let screen = Arc::new(screen);
        let form = FormSurface::new(&screen);
        let baseline = snapshot::capture_baseline(&screen, form.state());

        Self {
            drafts: DraftPersistence::new(Arc::clone(&screen), ports.drafts),
            screen,
            entity_id,
            store: ports.store,
            references: ports.references,
            notifier: ports.notifier,
            form,
            baseline,
            persisted_relation_ids: Vec::new(),
            state: ModeState::view(),
            debouncer: DraftDebouncer::new(options.debounce),
            load_state: LoadState::Pending,
            dropped_relation_ids: Vec::new(),
        }
    }

    // ---- accessors ----

    pub fn screen(&self) -> &ScreenSpec {
        &self.screen
    }

    pub fn entity_id(&self) -> Option<DbId> {
        self.entity_id
    }

    pub fn mode(&self) -> Mode {
        self.state.mode()
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn is_editing(&self) -> bool {
        self.state.is_editing()
    }

    pub fn is_form_enabled(&self) -> bool {
        self.form.is_enabled()
    }

    pub fn save_enabled(&self) -> bool {
        self.state.save_enabled() && !self.state.is_busy()
    }

    pub fn form_state(&self) -> &FormState {
        self.form.state()
    }

    pub fn baseline(&self) -> &Snapshot {
        &self.baseline
    }

    /// Relation ids the server is known to hold for this entity.
    pub fn persisted_relation_ids(&self) -> &[DbId] {
        &self.persisted_relation_ids
    }

    /// Relation ids removed from the restored draft as stale.
    pub fn dropped_relation_ids(&self) -> &[DbId] {
        &self.dropped_relation_ids
    }

    pub fn is_dirty(&self) -> bool {
        snapshot::is_dirty(&self.screen, self.form.state(), &self.baseline)
    }

    pub fn disabled_action_keys(&self) -> Vec<&'static str> {
        self.state
            .disabled_actions()
            .iter()
            .map(|key| key.as_str())
            .collect()
    }

    pub fn visible_action_keys(&self) -> Vec<&'static str> {
        self.state
            .visible_actions()
            .iter()
            .map(|key| key.as_str())
            .collect()
    }

    /// When the pending draft write becomes due, if one is pending.
    pub fn draft_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    pub fn view_model(&self) -> ViewModel {
        ViewModel {
            entity_id: self.entity_id,
            mode: self.mode(),
            load_state: self.load_state,
            is_editing: self.is_editing(),
            is_dirty: self.is_dirty(),
            form_enabled: self.form.is_enabled(),
            visible_action_keys: self.visible_action_keys(),
            disabled_action_keys: self.disabled_action_keys(),
            form_state: self.form.state().clone(),
            dropped_relation_ids: self.dropped_relation_ids.clone(),
        }
    }

    // ---- load ----

    /// Fetch the entity, overlay any stored draft, and pick the initial mode.
    ///
    /// - No entity id: `Add` with a blank baseline (a `new` draft is
    ///   overlaid if one exists).
    /// - Fetched with a non-empty draft: the draft is overlaid and the
    ///   controller enters `Edit`; Save is enabled only if the draft differs
    ///   from the fetched state.
    /// - Fetched without a draft: `View`.
    ///
    /// A failed load is logged, reported to the notifier, and returned.
    pub async fn load(&mut self) -> Result<(), CoreError> {
        self.load_state = LoadState::Pending;
        self.form.disable();

        let restored = match restore::restore(
            self.entity_id,
            self.store.as_ref(),
            self.references.as_deref(),
            &self.drafts,
        )
        .await
        {
            Ok(restored) => restored,
            Err(e) => {
                tracing::error!(
                    namespace = %self.screen.namespace,
                    entity_id = ?self.entity_id,
                    error = %e,
                    "Failed to load entity",
                );
                self.load_state = LoadState::Failed;
                self.notifier.error(&format!(
                    "Failed to load {}: {e}",
                    self.screen.entity_label.to_lowercase()
                ));
                return Err(e);
            }
        };

        let fetched = match &restored.entity {
            Some(dto) => FormState::new(dto.fields.clone(), dto.relation_ids.clone()),
            None => FormState::blank(&self.screen),
        };
        self.persisted_relation_ids = restored
            .entity
            .as_ref()
            .map(|dto| dto.relation_ids.clone())
            .unwrap_or_default();
        self.dropped_relation_ids = restored.dropped_relation_ids;

        self.form.apply(&self.screen, FormEdit::Replace(fetched));
        self.baseline = snapshot::capture_baseline(&self.screen, self.form.state());

        let draft = restored.draft.filter(|d| !self.drafts.is_empty(d));
        let has_draft = draft.is_some();
        if let Some(record) = &draft {
            let overlaid = self.overlay(record);
            self.form.apply(&self.screen, FormEdit::Replace(overlaid));
        }

        self.state = match (restored.entity.is_some(), has_draft) {
            (false, _) => {
                let mut state = ModeState::add();
                state.set_save_enabled(self.is_dirty());
                state
            }
            (true, true) => ModeState::restored_edit(self.is_dirty()),
            (true, false) => ModeState::view(),
        };

        if self.state.is_editing() {
            self.form.enable();
        }
        self.form.mark_loaded();
        self.load_state = LoadState::Ready;

        tracing::info!(
            namespace = %self.screen.namespace,
            entity_id = ?self.entity_id,
            mode = %self.mode(),
            restored_draft = has_draft,
            "Details screen loaded",
        );
        Ok(())
    }

    /// Fetched form value with the draft's declared fields and relation
    /// selection laid over it.
    fn overlay(&self, draft: &DraftRecord) -> FormState {
        let mut state = self.form.state().clone();
        for (name, value) in &draft.fields {
            if let Some(spec) = self.screen.field(name) {
                state.fields.insert(name.clone(), spec.normalize(value));
            }
        }
        if self.screen.has_relation() {
            state.relation_ids = draft.relation_ids.clone();
        }
        state
    }

    // ---- edit ----

    /// View → Edit. The baseline becomes the current form value and Save
    /// stays disabled until something changes.
    pub fn on_edit_requested(&mut self) -> Result<(), CoreError> {
        if self.load_state != LoadState::Ready {
            return Err(CoreError::Conflict(
                "Cannot edit before the screen has loaded".into(),
            ));
        }
        self.state.begin_edit()?;
        self.baseline = snapshot::capture_baseline(&self.screen, self.form.state());
        self.form.enable();
        tracing::debug!(entity_id = ?self.entity_id, "Entered edit mode");
        Ok(())
    }

    /// Apply a form change.
    ///
    /// User changes to a disabled surface are ignored. A user change made
    /// after load while editing schedules a debounced draft write (unless
    /// every meaningful field is blank) and recomputes Save enablement.
    /// System changes only update the value.
    pub fn on_form_change(&mut self, change: FormChange, now: Instant) -> ChangeOutcome {
        let from_user = change.is_user();
        if from_user && !self.form.is_enabled() {
            return ChangeOutcome::Ignored;
        }
        if !self.form.apply(&self.screen, change.edit) {
            return ChangeOutcome::Ignored;
        }
        if !from_user
            || !self.form.is_loaded()
            || !self.state.is_editing()
            || self.state.is_busy()
        {
            return ChangeOutcome::Applied;
        }

        let record = DraftRecord::from_form(self.form.state());
        let outcome = if self.drafts.is_empty(&record) {
            self.debouncer.cancel();
            ChangeOutcome::Applied
        } else {
            self.debouncer.schedule(record, now);
            ChangeOutcome::DraftScheduled
        };
        self.refresh_save_enabled();
        outcome
    }

    // ---- drafts ----

    /// Write the pending draft if its debounce deadline has passed.
    pub fn poll_draft(&mut self, now: Instant) -> Result<Option<DraftWrite>, CoreError> {
        match self.debouncer.take_due(now) {
            Some(record) => self.write_draft(&record).map(Some),
            None => Ok(None),
        }
    }

    /// Write the pending draft immediately.
    pub fn flush_draft(&mut self) -> Result<Option<DraftWrite>, CoreError> {
        match self.debouncer.take() {
            Some(record) => self.write_draft(&record).map(Some),
            None => Ok(None),
        }
    }

    /// Wait for the pending draft's deadline, then write it.
    pub async fn settle_draft(&mut self) -> Result<Option<DraftWrite>, CoreError> {
        if let Some(deadline) = self.debouncer.deadline() {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
        }
        self.flush_draft()
    }

    fn write_draft(&mut self, record: &DraftRecord) -> Result<DraftWrite, CoreError> {
        let outcome = self.drafts.write(self.entity_id, record)?;
        self.refresh_save_enabled();
        Ok(outcome)
    }

    /// A stored draft whose content differs from the baseline.
    fn draft_diverges(&self) -> bool {
        match self.drafts.read(self.entity_id) {
            Ok(Some(record)) => {
                !self.drafts.is_empty(&record)
                    && snapshot::is_dirty(&self.screen, &record.to_form_state(), &self.baseline)
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read draft for save gating");
                false
            }
        }
    }

    fn refresh_save_enabled(&mut self) {
        let enabled = self.is_dirty() || self.draft_diverges();
        self.state.set_save_enabled(enabled);
    }

    // ---- save ----

    /// Validate and persist the form.
    ///
    /// Makes no network call when nothing changed or validation fails. A new
    /// entity is created in one call with its relation ids inline; an
    /// existing one gets a field update plus one add/remove call per
    /// relation difference, run concurrently.
    pub async fn on_save_requested(&mut self) -> SaveOutcome {
        if !self.state.is_editing() || self.state.is_busy() || self.load_state != LoadState::Ready
        {
            return SaveOutcome::NotEditing;
        }
        if !self.is_dirty() && !self.draft_diverges() {
            return SaveOutcome::NoChanges;
        }

        let fields = self.screen.normalize_fields(&self.form.state().fields);
        if let Err(e) = self.screen.validate(&fields) {
            let message = match e {
                CoreError::Validation(msg) => msg,
                other => other.to_string(),
            };
            self.notifier.error(&message);
            self.state.set_save_enabled(false);
            return SaveOutcome::Invalid(message);
        }

        if let Err(e) = self.state.begin_save() {
            tracing::warn!(error = %e, "Save rejected");
            return SaveOutcome::NotEditing;
        }
        self.form.disable();

        match self.entity_id {
            None => self.create(fields).await,
            Some(id) => self.update(id, fields).await,
        }
    }

    async fn create(&mut self, fields: FieldMap) -> SaveOutcome {
        let selected = self.form.state().relation_ids.clone();
        let payload = EntityPayload {
            fields,
            relation_ids: self.screen.has_relation().then(|| selected.clone()),
        };

        match self.store.create(&payload).await {
            Ok(dto) => {
                self.entity_id = Some(dto.id);
                self.persisted_relation_ids = selected;
                // The draft was kept under the `new` key.
                self.finish_saved(None);
                self.notifier
                    .success(&format!("{} created", self.screen.entity_label));
                tracing::info!(entity_id = dto.id, namespace = %self.screen.namespace, "Entity created");
                SaveOutcome::Created { id: dto.id }
            }
            Err(e) => self.fail_save(&e, None),
        }
    }

    async fn update(&mut self, id: DbId, fields: FieldMap) -> SaveOutcome {
        let diff = if self.screen.has_relation() {
            RelationDiff::compute(&self.persisted_relation_ids, &self.form.state().relation_ids)
        } else {
            RelationDiff::default()
        };
        let payload = EntityPayload {
            fields,
            relation_ids: None,
        };

        let store = self.store.as_ref();
        let (update_result, report) = tokio::join!(
            store.update(id, &payload),
            relation::sync_relations(store, id, &diff),
        );
        self.persisted_relation_ids = report.apply_to(&self.persisted_relation_ids);

        match update_result {
            Ok(_) if report.is_complete() => {
                self.finish_saved(Some(id));
                self.notifier
                    .success(&format!("{} saved", self.screen.entity_label));
                tracing::info!(
                    entity_id = id,
                    added = diff.to_add.len(),
                    removed = diff.to_remove.len(),
                    "Entity updated",
                );
                SaveOutcome::Updated { id }
            }
            Ok(_) => {
                // Fields are saved; relations are only as far as the calls
                // that succeeded. The baseline reflects that, so the form
                // stays dirty and the next save replays the failures.
                let saved = FormState::new(
                    self.form.state().fields.clone(),
                    self.persisted_relation_ids.clone(),
                );
                self.baseline = snapshot::capture_baseline(&self.screen, &saved);
                self.state.save_failed(true);
                self.form.enable();
                self.notifier.error(&relation_failure_message(&report));
                if let Err(e) = self.flush_draft() {
                    tracing::warn!(error = %e, "Failed to persist draft after partial save");
                }
                SaveOutcome::PartiallySynced {
                    id,
                    failures: report.failures,
                }
            }
            Err(e) => self.fail_save(&e, Some(&report)),
        }
    }

    fn finish_saved(&mut self, draft_entity_id: Option<DbId>) {
        self.baseline = snapshot::capture_baseline(&self.screen, self.form.state());
        self.state.save_succeeded();
        self.form.disable();
        self.debouncer.cancel();
        if let Err(e) = self.drafts.clear(draft_entity_id) {
            tracing::warn!(error = %e, "Failed to clear draft after save");
        }
    }

    fn fail_save(&mut self, error: &CoreError, report: Option<&RelationSyncReport>) -> SaveOutcome {
        tracing::error!(
            entity_id = ?self.entity_id,
            namespace = %self.screen.namespace,
            error = %error,
            "Save failed",
        );
        let mut message = format!(
            "Failed to save {}: {error}",
            self.screen.entity_label.to_lowercase()
        );
        if let Some(report) = report.filter(|r| !r.is_complete()) {
            message.push_str(&format!(
                " ({} member change(s) also failed)",
                report.failures.len()
            ));
        }

        self.state.save_failed(true);
        self.form.enable();
        if let Err(e) = self.flush_draft() {
            tracing::warn!(error = %e, "Failed to persist draft after failed save");
        }
        self.notifier.error(&message);
        SaveOutcome::Failed(message)
    }

    // ---- discard ----

    /// Drop unsaved edits: clear the draft and restore the baseline value.
    ///
    /// `Edit` returns to `View`; `Add` stays in `Add` with a reset form.
    /// A no-op in `View`.
    pub fn on_discard_requested(&mut self) -> Result<(), CoreError> {
        if self.state.is_busy() {
            return Err(CoreError::Conflict("A save is already in progress".into()));
        }
        if !self.state.is_editing() {
            return Ok(());
        }

        self.debouncer.cancel();
        self.drafts.clear(self.entity_id)?;
        let baseline = self.baseline.to_form_state();
        self.form.apply(&self.screen, FormEdit::Replace(baseline));
        self.state.discard();
        if self.state.mode() == Mode::View {
            self.form.disable();
        }
        tracing::debug!(entity_id = ?self.entity_id, "Discarded unsaved changes");
        Ok(())
    }
}

fn relation_failure_message(report: &RelationSyncReport) -> String {
    let ids: Vec<String> = report
        .failures
        .iter()
        .map(|f| f.child_id.to_string())
        .collect();
    format!(
        "Saved, but {} member change(s) failed ({}). Save again to retry.",
        report.failures.len(),
        ids.join(", ")
    )
}
