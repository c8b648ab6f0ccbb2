pub mod api;
pub mod models;

/// Current time as unix seconds. All persisted timestamps use this unit.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
