use crate::config::{NameOrder, NamingConfig, Numbering};
use crate::file_index::FileIndex;
use crate::matcher::Resolver;
use crate::microplaylists::{classify, SubGroup, SubGroupDefs};
use crate::testing;
use crate::view::*;
use std::collections::BTreeMap;

#[test]
fn test_view_layout_and_status() {
    let temp_dir = testing::init();
    let root = temp_dir.path().join("music");
    testing::touch(&root.join("Mix").join("Beta").join("Two_B, A.mp3"));
    testing::touch(&root.join("Mix").join("3_Three_C.mp3"));

    let playlist = testing::playlist(
        "p1",
        "Mix",
        vec![testing::track("1", "One", &["A"]), testing::track("2", "Two", &["B", "A"]), testing::track("3", "Three", &["C"])],
    );
    let playlists: BTreeMap<String, _> = [("p1".to_string(), playlist)].into_iter().collect();
    let mut defs = SubGroupDefs::new();
    defs.insert("p1".to_string(), vec![SubGroup::new("Beta", &["B"]), SubGroup::new("Alpha", &["a"])]);

    let naming = NamingConfig { numbering: Numbering::None, name_order: NameOrder::TrackArtist, download_directory: root.clone() };
    let index = FileIndex::build(&root);
    let resolver = Resolver::new(&naming, &index, true);
    let classification = classify(&playlists, &defs);
    let playlist = &playlists["p1"];
    let view = PlaylistView::build(playlist, &defs["p1"], &classification, &resolver);

    assert_eq!(view.items.len(), 3);
    match &view.items[0] {
        ViewItem::SubGroupFolder { name, tracks } => {
            assert_eq!(name, "Alpha");
            let ids: Vec<&str> = tracks.iter().map(|r| r.track.video_id.as_str()).collect();
            assert_eq!(ids, vec!["1", "2"]);
            assert!(tracks.iter().all(|r| r.status == TrackStatus::NotDownloaded));
        }
        other => panic!("expected folder, got {other:?}"),
    }
    match &view.items[1] {
        ViewItem::SubGroupFolder { name, tracks } => {
            assert_eq!(name, "Beta");
            assert_eq!(tracks.len(), 1);
            assert_eq!(tracks[0].status, TrackStatus::Downloaded(root.join("Mix").join("Beta").join("Two_B, A.mp3")));
        }
        other => panic!("expected folder, got {other:?}"),
    }
    match &view.items[2] {
        ViewItem::Track(row) => {
            assert_eq!(row.track.video_id, "3");
            assert_eq!(row.sub_group, None);
            assert_eq!(row.status.label(), "Downloaded");
        }
        other => panic!("expected track, got {other:?}"),
    }
    assert_eq!(view.rows().count(), 4);
    assert_eq!(view.downloaded_count(), 2);
}
