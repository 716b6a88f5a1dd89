//! View / Edit / Add mode machine and action enablement.
//!
//! ```text
//!   View --edit--> Edit --save ok--> View
//!                  Edit --save failed--> Edit
//!   (no id) -> Add --create ok--> View
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Interaction mode of a details screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Fields disabled; only the edit action is offered.
    View,
    /// Fields enabled; save is offered once something changed.
    Edit,
    /// Like `Edit`, but the entity does not exist yet and save creates it.
    Add,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
            Self::Add => "add",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action buttons a details screen can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKey {
    Edit,
    Save,
    Discard,
}

impl ActionKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Save => "save",
            Self::Discard => "discard",
        }
    }
}

/// Current mode plus the save-enabled and in-flight flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeState {
    mode: Mode,
    save_enabled: bool,
    busy: bool,
}

impl ModeState {
    pub fn view() -> Self {
        Self {
            mode: Mode::View,
            save_enabled: false,
            busy: false,
        }
    }

    pub fn add() -> Self {
        Self {
            mode: Mode::Add,
            ..Self::view()
        }
    }

    /// Edit mode entered from a restored draft.
    pub fn restored_edit(save_enabled: bool) -> Self {
        Self {
            mode: Mode::Edit,
            save_enabled,
            busy: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// `true` in `Edit` and `Add`.
    pub fn is_editing(&self) -> bool {
        matches!(self.mode, Mode::Edit | Mode::Add)
    }

    pub fn save_enabled(&self) -> bool {
        self.save_enabled
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn set_save_enabled(&mut self, enabled: bool) {
        self.save_enabled = enabled && self.is_editing();
    }

    /// View → Edit. Save starts disabled.
    pub fn begin_edit(&mut self) -> Result<(), CoreError> {
        if self.busy {
            return Err(CoreError::Conflict("A save is already in progress".into()));
        }
        match self.mode {
            Mode::View => {
                self.mode = Mode::Edit;
                self.save_enabled = false;
                Ok(())
            }
            other => Err(CoreError::Conflict(format!(
                "Cannot start editing while in {other} mode"
            ))),
        }
    }

    /// Mark a save as in flight. Only valid while editing.
    pub fn begin_save(&mut self) -> Result<(), CoreError> {
        if self.busy {
            return Err(CoreError::Conflict("A save is already in progress".into()));
        }
        if !self.is_editing() {
            return Err(CoreError::Conflict(format!(
                "Cannot save while in {} mode",
                self.mode
            )));
        }
        self.busy = true;
        Ok(())
    }

    /// Saved: back to View.
    pub fn save_succeeded(&mut self) {
        self.mode = Mode::View;
        self.busy = false;
        self.save_enabled = false;
    }

    /// Save rejected: stay in the editing mode the save started from.
    pub fn save_failed(&mut self, save_enabled: bool) {
        self.busy = false;
        self.save_enabled = save_enabled;
    }

    /// Discard: Edit returns to View; Add stays in Add with Save disabled.
    pub fn discard(&mut self) {
        if self.mode == Mode::Edit {
            self.mode = Mode::View;
        }
        self.save_enabled = false;
    }

    pub fn visible_actions(&self) -> Vec<ActionKey> {
        match self.mode {
            Mode::View => vec![ActionKey::Edit],
            Mode::Edit | Mode::Add => vec![ActionKey::Save, ActionKey::Discard],
        }
    }

    pub fn disabled_actions(&self) -> Vec<ActionKey> {
        if self.busy {
            return self.visible_actions();
        }
        match self.mode {
            Mode::View => Vec::new(),
            Mode::Edit | Mode::Add => {
                if self.save_enabled {
                    Vec::new()
                } else {
                    vec![ActionKey::Save]
                }
            }
        }
    }
}
