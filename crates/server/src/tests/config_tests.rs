use super::{load_settings_with, normalize_database_url, Settings};

use std::{
    collections::HashMap,
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_apply_without_file_or_env() {
    let settings = load_settings_with(None, env_from(&[]));
    let defaults = Settings::default();
    assert_eq!(settings.server_bind, defaults.server_bind);
    assert_eq!(settings.contact_base_url, "https://wa.me/");
    assert_eq!(settings.max_body_bytes, 16 * 1024);
}

#[test]
fn file_values_are_overridden_by_app_env() {
    let file = r#"
        bind_addr = "0.0.0.0:9000"
        public_base_url = "https://love.example.com/p"
        max_body_bytes = 4096
    "#;
    let settings = load_settings_with(
        Some(file),
        env_from(&[
            ("SERVER_BIND", "0.0.0.0:9001"),
            ("APP__BIND_ADDR", "0.0.0.0:9002"),
            ("APP__DATABASE_URL", "sqlite::memory:"),
        ]),
    );
    assert_eq!(settings.server_bind, "0.0.0.0:9002");
    assert_eq!(settings.public_base_url, "https://love.example.com/p");
    assert_eq!(settings.database_url, "sqlite::memory:");
    assert_eq!(settings.max_body_bytes, 4096);
}

#[test]
fn malformed_file_and_env_values_are_ignored() {
    let settings = load_settings_with(
        Some("this is = not [toml"),
        env_from(&[("APP__MAX_BODY_BYTES", "lots")]),
    );
    assert_eq!(settings.max_body_bytes, Settings::default().max_body_bytes);
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
    assert_eq!(
        normalize_database_url("sqlite:./data/test.db"),
        "sqlite://./data/test.db"
    );
    assert_eq!(normalize_database_url("  "), Settings::default().database_url);
}

#[test]
fn keeps_full_urls_untouched() {
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(
        normalize_database_url(" sqlite://./data/p.db?mode=rwc "),
        "sqlite://./data/p.db?mode=rwc"
    );
}

#[tokio::test]
async fn normalized_path_opens_in_a_fresh_directory() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();

    let temp_root = env::temp_dir().join(format!("proposal_server_open_test_{suffix}"));
    let db_path = temp_root.join("nested").join("server.db");

    let database_url = normalize_database_url(db_path.to_string_lossy().as_ref());
    let storage = storage::Storage::new(&database_url).await.expect("open sqlite");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should be created: {}",
        db_path.display()
    );

    fs::remove_dir_all(temp_root).expect("cleanup");
}
