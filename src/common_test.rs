use crate::common::*;

#[test]
fn test_strip_channel_suffix() {
    assert_eq!(strip_channel_suffix("Artist - Topic"), "Artist");
    assert_eq!(strip_channel_suffix("  Artist  "), "Artist");
    assert_eq!(strip_channel_suffix("Plain"), "Plain");
}

#[test]
fn test_canonical_artist_case_folds() {
    assert_eq!(canonical_artist("Daft Punk - Topic"), "daft punk");
    assert_eq!(canonical_artist("DAFT PUNK"), "daft punk");
    assert_eq!(canonical_artist("Daft Punk - TOPIC"), "daft punk");
}

#[test]
fn test_sanitize_replaces_each_illegal_char() {
    assert_eq!(sanitize(r#"a\b/c*d?e:f"g<h>i|j"#), "a_b_c_d_e_f_g_h_i_j");
    assert_eq!(sanitize("AC/DC"), "AC_DC");
    assert_eq!(sanitize("??"), "__");
    assert_eq!(sanitize("Fine (Remix), Pt. 2"), "Fine (Remix), Pt. 2");
}

#[test]
fn test_sanitize_legacy() {
    assert_eq!(sanitize_legacy("What's Up?_Artist"), "Whats Up_Artist");
    assert_eq!(sanitize_legacy("Song (Live), Pt. 1-2 "), "Song (Live), Pt. 1-2");
    assert_eq!(sanitize_legacy("Café"), "Café");
}

#[test]
fn test_track_artist_names_skip_empty() {
    let track = Track::new("v1", "Song", &["Artist - Topic", " ", "Guest"]);
    assert_eq!(track.artist_names(), vec!["Artist".to_string(), "Guest".to_string()]);
    assert_eq!(track.artists_display(), "Artist, Guest");
    assert_eq!(track.artist_keys().into_iter().collect::<Vec<_>>(), vec!["artist".to_string(), "guest".to_string()]);
}

#[test]
fn test_track_deserializes_fetch_record() {
    let json = r#"{
        "videoId": "abc",
        "title": "Song",
        "artists": [{"name": "Artist - Topic", "id": "UC1"}, {"id": "UC2"}],
        "year": 2019,
        "duration": "3:21"
    }"#;
    let track: Track = serde_json::from_str(json).unwrap();
    assert_eq!(track.video_id, "abc");
    assert_eq!(track.year, Some("2019".to_string()));
    assert_eq!(track.artist_names(), vec!["Artist".to_string()]);

    let track: Track = serde_json::from_str(r#"{"videoId": "x", "year": ""}"#).unwrap();
    assert_eq!(track.year, None);
    assert_eq!(track.title, "");
    assert!(track.artists.is_empty());
}

#[test]
fn test_track_serializes_video_id_key() {
    let track = Track::new("abc", "Song", &["A"]);
    let value = serde_json::to_value(&track).unwrap();
    assert_eq!(value["videoId"], "abc");
    assert!(value.get("year").is_none());
}

#[test]
fn test_playlist_position_of() {
    let playlist = Playlist {
        id: "p".to_string(),
        title: "P".to_string(),
        is_private: false,
        tracks: vec![Track::new("a", "A", &[]), Track::new("b", "B", &[]), Track::new("a", "A", &[])],
    };
    assert_eq!(playlist.position_of("a"), Some(1));
    assert_eq!(playlist.position_of("b"), Some(2));
    assert_eq!(playlist.position_of("z"), None);
    assert_eq!(playlist.video_ids().len(), 2);
}

#[test]
fn test_uniq() {
    let input = vec![1, 2, 2, 3, 1, 4, 3];
    assert_eq!(uniq(input), vec![1, 2, 3, 4]);
}
