/// Entity and relation identifiers are server-assigned integers.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Flat field map of an entity or form, keyed by field name.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;
