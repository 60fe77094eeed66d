use crate::config::*;
use crate::error::{BridgeError, BridgeExpectedError};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_parse_full_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(
        &path,
        r#"{
            "download_directory": "/music",
            "numbering": "playlist_order",
            "name_order": "artist_track",
            "max_workers": 5,
            "legacy_matching": false,
            "cookies_file": "/tmp/cookies.txt",
            "state_directory": "/state"
        }"#,
    )
    .unwrap();

    let config = Config::parse(Some(&path)).unwrap();
    assert_eq!(config.naming.download_directory, PathBuf::from("/music"));
    assert_eq!(config.naming.numbering, Numbering::PlaylistOrder);
    assert_eq!(config.naming.name_order, NameOrder::ArtistTrack);
    assert_eq!(config.max_workers, 5);
    assert!(!config.legacy_matching);
    assert_eq!(config.cookies_file, Some(PathBuf::from("/tmp/cookies.txt")));
    assert_eq!(config.playlists_path(), PathBuf::from("/state/playlists.json"));
    assert_eq!(config.subgroups_path(), PathBuf::from("/state/microplaylists.json"));
}

#[test]
fn test_parse_minimal_config_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(&path, r#"{"download_directory": ""}"#).unwrap();

    let config = Config::parse(Some(&path)).unwrap();
    assert_eq!(config.naming.numbering, Numbering::None);
    assert_eq!(config.naming.name_order, NameOrder::TrackArtist);
    assert_eq!(config.max_workers, DEFAULT_MAX_WORKERS);
    assert!(config.legacy_matching);
    assert!(matches!(
        config.download_directory(),
        Err(BridgeError::Expected(BridgeExpectedError::DownloadDirectoryNotSet))
    ));
}

#[test]
fn test_parse_expands_home() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(&path, r#"{"download_directory": "~/Music"}"#).unwrap();

    let config = Config::parse(Some(&path)).unwrap();
    let home = dirs::home_dir().unwrap();
    assert_eq!(config.naming.download_directory, home.join("Music"));
}

#[test]
fn test_parse_missing_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nope.json");
    match Config::parse(Some(&path)) {
        Err(BridgeError::Expected(BridgeExpectedError::ConfigNotFound { path: p })) => assert_eq!(p, path),
        other => panic!("expected ConfigNotFound, got {other:?}"),
    }
}

#[test]
fn test_parse_invalid_values() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");

    fs::write(&path, r#"{"numbering": "alphabetical"}"#).unwrap();
    match Config::parse(Some(&path)) {
        Err(BridgeError::Expected(BridgeExpectedError::InvalidConfigValue { key, .. })) => assert_eq!(key, "numbering"),
        other => panic!("expected InvalidConfigValue, got {other:?}"),
    }

    fs::write(&path, r#"{"max_workers": 0}"#).unwrap();
    match Config::parse(Some(&path)) {
        Err(BridgeError::Expected(BridgeExpectedError::InvalidConfigValue { key, .. })) => assert_eq!(key, "max_workers"),
        other => panic!("expected InvalidConfigValue, got {other:?}"),
    }

    fs::write(&path, r#"{"legacy_matching": "yes"}"#).unwrap();
    assert!(Config::parse(Some(&path)).is_err());

    fs::write(&path, "not json").unwrap();
    assert!(matches!(Config::parse(Some(&path)), Err(BridgeError::Expected(BridgeExpectedError::ConfigDecode(_)))));
}

#[test]
fn test_load_or_create_writes_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.json");

    let config = Config::load_or_create(&path).unwrap();
    assert!(path.exists());
    assert_eq!(config.naming, NamingConfig::default());

    let reread = Config::parse(Some(&path)).unwrap();
    assert_eq!(reread, config);
}

#[test]
fn test_load_or_create_recovers_from_corruption() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(&path, "{ broken").unwrap();

    let config = Config::load_or_create(&path).unwrap();
    assert_eq!(config.max_workers, DEFAULT_MAX_WORKERS);
    // The corrupt document is left for the user to inspect.
    assert_eq!(fs::read_to_string(&path).unwrap(), "{ broken");
}

#[test]
fn test_save_and_reparse() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    let mut config = Config::default();
    config.naming.download_directory = temp_dir.path().join("music");
    config.naming.numbering = Numbering::ReleaseYear;
    config.cookies_file = Some(temp_dir.path().join("cookies.txt"));
    config.save(&path).unwrap();

    assert_eq!(Config::parse(Some(&path)).unwrap(), config);
}

#[test]
fn test_apply_settings_update() {
    let mut config = Config::default();
    config
        .apply(SettingsUpdate {
            numbering: Some(Numbering::PlaylistOrder),
            download_directory: Some(PathBuf::from("/new")),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(config.naming.numbering, Numbering::PlaylistOrder);
    assert_eq!(config.naming.name_order, NameOrder::TrackArtist);
    assert_eq!(config.naming.download_directory, PathBuf::from("/new"));

    let err = config.apply(SettingsUpdate { max_workers: Some(0), ..Default::default() });
    assert!(err.is_err());
    assert_eq!(config.max_workers, DEFAULT_MAX_WORKERS);
}

#[test]
fn test_enum_round_trip_strings() {
    for numbering in [Numbering::None, Numbering::PlaylistOrder, Numbering::ReleaseYear] {
        assert_eq!(numbering.as_str().parse::<Numbering>().unwrap(), numbering);
    }
    for order in [NameOrder::TrackArtist, NameOrder::ArtistTrack] {
        assert_eq!(order.to_string().parse::<NameOrder>().unwrap(), order);
    }
}
