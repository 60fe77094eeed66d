use crate::config::{NameOrder, NamingConfig, Numbering};
use crate::file_index::FileIndex;
use crate::matcher::Resolver;
use crate::microplaylists::{SubGroup, SubGroupDefs};
use crate::reformat::*;
use crate::testing;
use std::collections::BTreeMap;

#[test]
fn test_reformat_migrates_legacy_and_numbering() {
    let temp_dir = testing::init();
    let root = temp_dir.path().join("music");
    let legacy = testing::touch(&root.join("Mix").join("Whats Up_4 Non Blondes.mp3"));
    let plain = testing::touch(&root.join("Mix").join("Zed_Z.mp3"));
    let grouped = testing::touch(&root.join("Mix").join("Bees").join("9_Buzz_B.mp3"));

    let playlist = testing::playlist(
        "p1",
        "Mix",
        vec![
            testing::track("1", "What's Up?", &["4 Non Blondes - Topic"]),
            testing::track("2", "Zed", &["Z"]),
            testing::track("3", "Buzz", &["B"]),
            testing::track("4", "Missing", &["M"]),
        ],
    );
    let playlists: BTreeMap<String, _> = [("p1".to_string(), playlist)].into_iter().collect();
    let mut defs = SubGroupDefs::new();
    defs.insert("p1".to_string(), vec![SubGroup::new("Bees", &["B"])]);

    let current = NamingConfig { numbering: Numbering::None, name_order: NameOrder::TrackArtist, download_directory: root.clone() };
    let target = NamingConfig { numbering: Numbering::PlaylistOrder, ..current.clone() };
    let index = FileIndex::build(&root);
    let report = reformat(&Resolver::new(&current, &index, true), &target, &playlists, &defs);

    assert_eq!(report, ReformatReport { renamed: 3, unchanged: 0, collisions: 0, failed: 0 });
    assert!(!legacy.exists());
    assert!(!plain.exists());
    assert!(!grouped.exists());
    assert!(root.join("Mix").join("1_What's Up__4 Non Blondes.mp3").exists());
    assert!(root.join("Mix").join("2_Zed_Z.mp3").exists());
    assert!(root.join("Mix").join("Bees").join("3_Buzz_B.mp3").exists());

    // Running again changes nothing.
    let index = FileIndex::build(&root);
    let report = reformat(&Resolver::new(&target, &index, true), &target, &playlists, &defs);
    assert_eq!(report, ReformatReport { renamed: 0, unchanged: 3, collisions: 0, failed: 0 });
}

#[test]
fn test_reformat_never_overwrites() {
    let temp_dir = testing::init();
    let root = temp_dir.path().join("music");
    let old = testing::touch(&root.join("Mix").join("Song_A.mp3"));
    let squatter = root.join("Mix").join("A_Song.mp3");
    std::fs::write(&squatter, b"something else").unwrap();

    let playlist = testing::playlist("p1", "Mix", vec![testing::track("1", "Song", &["A"])]);
    let playlists: BTreeMap<String, _> = [("p1".to_string(), playlist)].into_iter().collect();
    let current = NamingConfig { numbering: Numbering::None, name_order: NameOrder::TrackArtist, download_directory: root.clone() };
    let target = NamingConfig { name_order: NameOrder::ArtistTrack, ..current.clone() };
    let index = FileIndex::build(&root);

    let report = reformat(&Resolver::new(&current, &index, false), &target, &playlists, &SubGroupDefs::new());
    assert_eq!(report, ReformatReport { renamed: 0, unchanged: 0, collisions: 1, failed: 0 });
    assert!(old.exists());
    assert_eq!(std::fs::read(&squatter).unwrap(), b"something else");
}
