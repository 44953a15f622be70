/// Job and command identifiers are opaque strings assigned upstream.
pub type JobId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
