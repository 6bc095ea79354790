/// All entity identifiers are UUIDs assigned by the generation backend
/// (or locally for freshly created characters).
pub type EntityId = uuid::Uuid;

pub type ProjectId = EntityId;
pub type ChapterId = EntityId;
pub type PageId = EntityId;
pub type PanelId = EntityId;
pub type CharacterId = EntityId;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
