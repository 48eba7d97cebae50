use crate::SettingsDb;

fn test_db() -> SettingsDb {
    SettingsDb::open_in_memory().expect("Failed to create test DB")
}
