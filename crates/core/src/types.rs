/// Backend primary keys (lines, alerts, products) are integer ids.
pub type DbId = i64;

/// Production stage number. Stages are numbered `1..=STAGE_COUNT`; `0`
/// means a product has not started any stage yet.
pub type StageId = u8;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Number of stages every product passes through.
pub const STAGE_COUNT: usize = 5;
