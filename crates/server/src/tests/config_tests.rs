use std::collections::HashMap;

use super::*;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn file_uses_bind_addr_key() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(DEFAULT_CONFIG_FILE);
    fs::write(
        &path,
        "bind_addr = \"0.0.0.0:9000\"\napi_token = \"s3cret\"\n",
    )
    .expect("write");

    let raw = fs::read_to_string(&path).expect("read");
    let mut settings = Settings::default();
    apply_file(&mut settings, toml::from_str(&raw).expect("toml"));

    assert_eq!(settings.server_bind, "0.0.0.0:9000");
    assert_eq!(settings.api_token.as_deref(), Some("s3cret"));
    assert_eq!(settings.max_attachment_bytes, Settings::default().max_attachment_bytes);
}

#[test]
fn prefixed_env_overrides_plain_env() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env_from(&[
            ("SERVER_BIND", "127.0.0.1:1"),
            ("APP__BIND_ADDR", "127.0.0.1:2"),
            ("APP__MAX_ATTACHMENT_BYTES", "1024"),
        ]),
    )
    .expect("env");

    assert_eq!(settings.server_bind, "127.0.0.1:2");
    assert_eq!(settings.max_attachment_bytes, 1024);
}

#[test]
fn blank_token_disables_authentication() {
    let mut settings = Settings {
        api_token: Some("from-file".into()),
        ..Settings::default()
    };
    apply_env(&mut settings, env_from(&[("APP__API_TOKEN", "  ")])).expect("env");

    assert_eq!(settings.api_token, None);
}

#[test]
fn malformed_limit_is_reported() {
    let mut settings = Settings::default();
    let err = apply_env(
        &mut settings,
        env_from(&[("APP__MAX_ATTACHMENT_BYTES", "big")]),
    )
    .expect_err("not a number");
    assert!(err.to_string().contains("big"));
}

#[test]
fn missing_file_keeps_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings =
        load_settings_with(dir.path().join("absent.toml"), env_from(&[])).expect("settings");
    assert_eq!(settings, Settings::default());
}
