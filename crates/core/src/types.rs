/// Internal numeric id for users and other owned entities.
pub type DbId = i64;

/// UTC timestamp used throughout the workspace.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
