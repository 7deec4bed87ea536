use super::*;

#[test]
fn defaults_resolve_without_any_source() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.server.graceful_shutdown, Duration::from_secs(30));
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert!(settings.cache.enabled);
    assert_eq!(settings.cache.ttl, Duration::from_secs(60));
    assert_eq!(settings.cache.sweep_interval, Duration::from_secs(30));
    assert_eq!(settings.cache.consume_batch_limit.get(), 100);
    assert_eq!(settings.storage.upload_dir, PathBuf::from("uploads"));
    assert!(settings.storage.users.is_empty());
}

#[test]
fn cache_defaults_follow_cache_config() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
    let loaded = CacheConfig::from(&settings.cache);
    let defaults = CacheConfig::default();

    assert_eq!(loaded.enabled, defaults.enabled);
    assert_eq!(loaded.ttl_ms, defaults.ttl_ms);
    assert_eq!(loaded.sweep_interval_ms, defaults.sweep_interval_ms);
    assert_eq!(loaded.consume_batch_limit, defaults.consume_batch_limit);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.cache.ttl_ms = Some(5_000);

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        cache_ttl_ms: Some(250),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.cache.ttl, Duration::from_millis(250));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_ttl_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.ttl_ms = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero ttl");
    assert!(matches!(err, LoadError::Invalid { key: "cache.ttl_ms", .. }));
}

#[test]
fn zero_batch_limit_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.consume_batch_limit = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero batch limit");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.consume_batch_limit",
            ..
        }
    ));
}

#[test]
fn invalid_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());

    let err = Settings::from_raw(raw).expect_err("bad level");
    assert!(matches!(err, LoadError::Invalid { key: "logging.level", .. }));
}

#[test]
fn storage_users_are_trimmed_and_deduplicated() {
    let mut raw = RawSettings::default();
    raw.storage.users = Some(vec![
        " alice".to_string(),
        "bob".to_string(),
        "alice".to_string(),
    ]);

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.storage.users, vec!["alice", "bob"]);
}

#[test]
fn blank_storage_user_is_rejected() {
    let mut raw = RawSettings::default();
    raw.storage.users = Some(vec!["alice".to_string(), "  ".to_string()]);

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["docshelf"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "docshelf",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--cache-enabled",
        "false",
        "--storage-users",
        "alice,bob",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(serve.overrides.cache_enabled, Some(false));
            assert_eq!(
                serve.overrides.storage_users,
                Some(vec!["alice".to_string(), "bob".to_string()])
            );
        }
    }
}

#[test]
fn config_file_sections_deserialize() {
    let raw: RawSettings = Config::builder()
        .add_source(config::File::from_str(
            r#"
                [server]
                port = 9000

                [cache]
                enabled = false
                sweep_interval_ms = 500

                [storage]
                upload_dir = "/srv/docs"
                users = ["carol"]
            "#,
            config::FileFormat::Toml,
        ))
        .build()
        .expect("config builds")
        .try_deserialize()
        .expect("raw settings deserialize");

    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 9000);
    assert!(!settings.cache.enabled);
    assert_eq!(settings.cache.sweep_interval, Duration::from_millis(500));
    assert_eq!(settings.storage.upload_dir, PathBuf::from("/srv/docs"));
    assert_eq!(settings.storage.users, vec!["carol"]);
}
