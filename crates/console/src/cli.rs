//! Command-line arguments.

use clap::{Parser, ValueEnum};
use serde_json::Value;

use hrdesk_core::types::DbId;

/// Which details screen to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScreenArg {
    Team,
    Template,
    Policy,
}

impl ScreenArg {
    pub fn name(self) -> &'static str {
        match self {
            Self::Team => "team",
            Self::Template => "template",
            Self::Policy => "policy",
        }
    }
}

/// One `field=value` edit.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAssignment {
    pub name: String,
    pub value: Value,
}

/// Parse `field=value`. The value is passed through as a string; the screen
/// coerces it to the field's kind.
pub fn parse_assignment(raw: &str) -> Result<FieldAssignment, String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing field name in '{raw}'"));
    }
    Ok(FieldAssignment {
        name: name.to_string(),
        value: Value::String(value.to_string()),
    })
}

/// Entity to open: an id, or `None` for `new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target(pub Option<DbId>);

pub fn parse_target(raw: &str) -> Result<Target, String> {
    if raw.eq_ignore_ascii_case("new") {
        return Ok(Target(None));
    }
    raw.parse::<DbId>()
        .map(|id| Target(Some(id)))
        .map_err(|_| format!("expected a numeric id or 'new', got '{raw}'"))
}

#[derive(Debug, Parser)]
#[command(name = "hrdesk-console")]
#[command(about = "Drive one hrdesk details screen from the command line")]
#[command(
    after_help = "Environment:\n  HRDESK_API_URL               REST API base URL\n  HRDESK_DRAFT_FILE            Draft file path\n  HRDESK_DRAFT_DEBOUNCE_MS     Draft write debounce\n  HRDESK_RELATION_ORDER        insensitive | significant\n  HRDESK_REQUEST_TIMEOUT_SECS  HTTP request timeout\n  RUST_LOG                     Log filter"
)]
pub struct Cli {
    #[arg(value_enum)]
    pub screen: ScreenArg,

    /// Entity id, or `new`.
    #[arg(value_parser = parse_target)]
    pub target: Target,

    /// Field edits as `field=value`.
    #[arg(value_parser = parse_assignment)]
    pub edits: Vec<FieldAssignment>,

    /// Replace the relation selection (interviewer team members).
    #[arg(long, value_delimiter = ',', num_args = 0..)]
    pub members: Option<Vec<DbId>>,

    /// Save after applying the edits.
    #[arg(long, conflicts_with = "discard")]
    pub save: bool,

    /// Discard the edits and the stored draft.
    #[arg(long)]
    pub discard: bool,
}
