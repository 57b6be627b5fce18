use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use scm_catalog::test_utils::{Request, ScriptedSource, game_body, index_body, song_body};
use scm_catalog::{
    CacheKey, CacheStore, CatalogError, CatalogSynchronizer, Endpoints, ManifestCompiler,
    ManifestOptions, Outcome, SongResolution, StalenessPolicy, SyncEvent, SyncOptions,
    init_test_tracing,
};
use tempfile::tempdir;

/// A(banner, 2 songs), B(no banner, no songs), C(no banner, 1 song)
fn scripted_catalog() -> Arc<ScriptedSource> {
    let source = Arc::new(ScriptedSource::new());
    source.set_index(index_body(&[(1, "A", 2), (2, "B", 0), (3, "C", 1)]));
    source.set_game(
        1,
        game_body(
            "A",
            true,
            &[(11, "A one", Some("alice")), (12, "A two", None)],
        ),
    );
    source.set_game(2, game_body("B", false, &[]));
    source.set_game(3, game_body("C", false, &[(31, "C one", Some("carol"))]));
    source.set_song(11, song_body("A one", Some("alice")));
    source.set_song(12, song_body("A two", None));
    source.set_song(31, song_body("C one", Some("carol")));
    source
}

fn synchronizer(
    source: &Arc<ScriptedSource>,
    root: &Path,
    songs: SongResolution,
) -> CatalogSynchronizer<Arc<ScriptedSource>> {
    CatalogSynchronizer::new(Arc::clone(source), CacheStore::new(root)).with_options(SyncOptions {
        songs,
        concurrency: 1,
    })
}

fn snapshot_files(root: &Path) -> BTreeMap<PathBuf, String> {
    fn walk(dir: &Path, root: &Path, files: &mut BTreeMap<PathBuf, String>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(&path, root, files);
            } else {
                let relative = path.strip_prefix(root).unwrap().to_path_buf();
                files.insert(relative, std::fs::read_to_string(&path).unwrap());
            }
        }
    }

    let mut files = BTreeMap::new();
    walk(root, root, &mut files);
    files
}

#[tokio::test]
async fn empty_cache_fetches_every_resource_once() {
    init_test_tracing!();
    let dir = tempdir().unwrap();
    let source = scripted_catalog();

    let report = synchronizer(&source, dir.path(), SongResolution::Eager)
        .synchronize()
        .await
        .unwrap();

    assert_eq!(
        source.calls(),
        vec![
            Request::Index,
            Request::Game(1),
            Request::Game(2),
            Request::Game(3),
            Request::Song(11),
            Request::Song(12),
            Request::Song(31),
        ]
    );

    let summary = &report.summary;
    assert!(!summary.catalog_reused);
    assert_eq!(summary.games_fetched, 3);
    assert_eq!(summary.games_reused, 0);
    assert_eq!(summary.songs_fetched, 3);
    assert_eq!(summary.total_songs, 3);
    assert_eq!(summary.games_with_banner, 1);

    let files = snapshot_files(dir.path());
    let names: Vec<_> = files.keys().cloned().collect();
    assert_eq!(
        names,
        vec![
            PathBuf::from("1/11/data.json"),
            PathBuf::from("1/12/data.json"),
            PathBuf::from("1/data.json"),
            PathBuf::from("2/data.json"),
            PathBuf::from("3/31/data.json"),
            PathBuf::from("3/data.json"),
            PathBuf::from("index.json"),
        ]
    );
}

#[tokio::test]
async fn lazy_mode_never_touches_song_details() {
    let dir = tempdir().unwrap();
    let source = scripted_catalog();

    let report = synchronizer(&source, dir.path(), SongResolution::Lazy)
        .synchronize()
        .await
        .unwrap();

    assert!(
        !source
            .calls()
            .iter()
            .any(|request| matches!(request, Request::Song(_)))
    );
    assert_eq!(report.summary.songs_fetched, 0);
    assert!(!dir.path().join("1/11/data.json").exists());
}

#[tokio::test]
async fn second_run_is_idempotent_and_fetch_free() {
    let dir = tempdir().unwrap();
    let source = scripted_catalog();
    let sync = synchronizer(&source, dir.path(), SongResolution::Eager);

    let first = sync.synchronize().await.unwrap();
    let files_after_first = snapshot_files(dir.path());
    source.clear_calls();

    let second = sync.synchronize().await.unwrap();

    assert!(source.calls().is_empty());
    assert_eq!(first.games, second.games);
    assert_eq!(files_after_first, snapshot_files(dir.path()));
    assert!(second.summary.catalog_reused);
    assert_eq!(second.summary.games_reused, 3);
    assert_eq!(second.summary.songs_reused, 3);
}

#[tokio::test]
async fn cached_tree_is_reused_at_every_level_without_a_remote() {
    let dir = tempdir().unwrap();
    let source = scripted_catalog();
    let first = synchronizer(&source, dir.path(), SongResolution::Eager)
        .synchronize()
        .await
        .unwrap();

    // Nothing is scripted here: any fetch would fail the run.
    let offline = Arc::new(ScriptedSource::new());
    let second = synchronizer(&offline, dir.path(), SongResolution::Eager)
        .synchronize()
        .await
        .unwrap();

    assert!(offline.calls().is_empty());
    assert_eq!(first.games, second.games);
    assert_eq!(second.summary.songs_failed, 0);
}

#[tokio::test]
async fn game_is_refetched_only_when_name_or_count_changed() {
    let dir = tempdir().unwrap();
    let source = scripted_catalog();
    let sync = synchronizer(&source, dir.path(), SongResolution::Lazy);
    sync.synchronize().await.unwrap();

    // A newer index: A renamed, B gained a song, C untouched.
    let store = CacheStore::new(dir.path());
    store
        .save(
            &CacheKey::Catalog,
            &index_body(&[(1, "A (Deluxe)", 2), (2, "B", 1), (3, "C", 1)]),
        )
        .unwrap();
    source.set_game(
        1,
        game_body(
            "A (Deluxe)",
            true,
            &[(11, "A one", Some("alice")), (12, "A two", None)],
        ),
    );
    source.set_game(2, game_body("B", false, &[(21, "B one", None)]));
    source.clear_calls();

    let report = sync.synchronize().await.unwrap();

    assert_eq!(source.calls(), vec![Request::Game(1), Request::Game(2)]);
    assert_eq!(report.games[0].name, "A (Deluxe)");
    assert_eq!(report.games[1].songs.len(), 1);
    assert_eq!(report.summary.games_fetched, 2);
    assert_eq!(report.summary.games_reused, 1);
}

#[tokio::test]
async fn song_is_refetched_when_uploader_changed() {
    let dir = tempdir().unwrap();
    let source = scripted_catalog();
    let sync = synchronizer(&source, dir.path(), SongResolution::Eager);
    sync.synchronize().await.unwrap();

    let store = CacheStore::new(dir.path());
    store
        .save(
            &CacheKey::Game(3),
            &game_body("C", false, &[(31, "C one", Some("dave"))]),
        )
        .unwrap();
    source.set_song(31, song_body("C one", Some("dave")));
    source.clear_calls();

    sync.synchronize().await.unwrap();

    assert_eq!(source.calls(), vec![Request::Song(31)]);
    let cached = std::fs::read_to_string(dir.path().join("3/31/data.json")).unwrap();
    assert!(cached.contains("dave"));
}

#[tokio::test]
async fn corrupt_snapshot_forces_refresh() {
    let dir = tempdir().unwrap();
    let source = scripted_catalog();
    let sync = synchronizer(&source, dir.path(), SongResolution::Lazy);
    sync.synchronize().await.unwrap();

    std::fs::write(dir.path().join("3/data.json"), "{\"game_name\": \"C\", ").unwrap();
    source.clear_calls();

    let report = sync.synchronize().await.unwrap();

    assert_eq!(source.calls(), vec![Request::Game(3)]);
    assert_eq!(report.games[2].songs.len(), 1);
    let repaired = std::fs::read_to_string(dir.path().join("3/data.json")).unwrap();
    assert!(serde_json::from_str::<serde_json::Value>(&repaired).is_ok());
}

#[tokio::test]
async fn ignoring_the_cache_refetches_everything() {
    let dir = tempdir().unwrap();
    let source = scripted_catalog();
    synchronizer(&source, dir.path(), SongResolution::Lazy)
        .synchronize()
        .await
        .unwrap();
    source.clear_calls();

    synchronizer(&source, dir.path(), SongResolution::Lazy)
        .with_policy(StalenessPolicy::ignoring_cache())
        .synchronize()
        .await
        .unwrap();

    assert_eq!(
        source.calls(),
        vec![
            Request::Index,
            Request::Game(1),
            Request::Game(2),
            Request::Game(3)
        ]
    );
}

#[tokio::test]
async fn game_failure_aborts_before_later_games() {
    let dir = tempdir().unwrap();
    let source = scripted_catalog();
    source.fail(Request::Game(2));

    let err = synchronizer(&source, dir.path(), SongResolution::Eager)
        .synchronize()
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::Aborted { .. }));
    assert!(err.is_remote());
    assert_eq!(
        source.calls(),
        vec![Request::Index, Request::Game(1), Request::Game(2)]
    );
    // Work done before the failure stays on disk.
    assert!(dir.path().join("index.json").exists());
    assert!(dir.path().join("1/data.json").exists());
    assert!(!dir.path().join("3/data.json").exists());
}

#[tokio::test]
async fn index_failure_aborts_the_run() {
    let dir = tempdir().unwrap();
    let source = Arc::new(ScriptedSource::new());
    source.fail(Request::Index);

    let err = synchronizer(&source, dir.path(), SongResolution::Lazy)
        .synchronize()
        .await
        .unwrap_err();

    assert!(err.is_remote());
    assert_eq!(source.calls(), vec![Request::Index]);
}

#[tokio::test]
async fn malformed_game_detail_is_fatal() {
    let dir = tempdir().unwrap();
    let source = scripted_catalog();
    source.set_game(1, "<html>");

    let err = synchronizer(&source, dir.path(), SongResolution::Lazy)
        .synchronize()
        .await
        .unwrap_err();

    assert!(err.is_remote());
    assert!(!dir.path().join("1/data.json").exists());
}

#[tokio::test]
async fn song_failure_does_not_stop_the_run() {
    let dir = tempdir().unwrap();
    let source = scripted_catalog();
    source.fail(Request::Song(12));

    let report = synchronizer(&source, dir.path(), SongResolution::Eager)
        .synchronize()
        .await
        .unwrap();

    assert_eq!(
        source.calls(),
        vec![
            Request::Index,
            Request::Game(1),
            Request::Game(2),
            Request::Game(3),
            Request::Song(11),
            Request::Song(12),
            Request::Song(31),
        ]
    );
    assert_eq!(report.summary.songs_failed, 1);
    assert_eq!(report.summary.songs_fetched, 2);
    assert_eq!(report.games[0].songs[1].name, "A two");
    assert!(!dir.path().join("1/12/data.json").exists());
    assert!(dir.path().join("3/31/data.json").exists());
}

#[tokio::test]
async fn concurrent_resolution_keeps_catalog_order() {
    let dir = tempdir().unwrap();
    let source = scripted_catalog();

    let report = CatalogSynchronizer::new(Arc::clone(&source), CacheStore::new(dir.path()))
        .with_options(SyncOptions {
            songs: SongResolution::Eager,
            concurrency: 8,
        })
        .synchronize()
        .await
        .unwrap();

    let ids: Vec<u64> = report.games.iter().map(|g| g.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    let song_ids: Vec<u64> = report.games[0].songs.iter().map(|s| s.id).collect();
    assert_eq!(song_ids, vec![11, 12]);
    assert_eq!(report.summary.songs_fetched, 3);
}

#[tokio::test]
async fn events_report_every_resolution() {
    let dir = tempdir().unwrap();
    let source = scripted_catalog();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);

    synchronizer(&source, dir.path(), SongResolution::Eager)
        .on_event(Arc::new(move |event: SyncEvent| sink.lock().unwrap().push(event)))
        .synchronize()
        .await
        .unwrap();

    let events = events.lock().unwrap();
    let fetched = events
        .iter()
        .filter(|event| {
            matches!(
                event,
                SyncEvent::Resolved {
                    outcome: Outcome::Fetched,
                    ..
                }
            )
        })
        .count();
    assert_eq!(fetched, 1 + 3 + 3);
    assert!(matches!(events.first(), Some(SyncEvent::StageStarted { .. })));
    assert!(matches!(events.last(), Some(SyncEvent::StageFinished { .. })));
}

#[tokio::test]
async fn synchronized_tree_compiles_to_canonical_manifest() {
    let dir = tempdir().unwrap();
    let source = scripted_catalog();
    let report = synchronizer(&source, dir.path(), SongResolution::Lazy)
        .synchronize()
        .await
        .unwrap();

    let compiler = ManifestCompiler::new(
        Endpoints::default(),
        dir.path(),
        ManifestOptions {
            inline_song_metadata: true,
            name_output_files: true,
        },
    );
    let manifest = compiler.compile(&report.games);

    let urls: Vec<String> = manifest.entries().map(|e| e.url.to_string()).collect();
    assert_eq!(
        urls,
        vec![
            "https://smashcustommusic.net/logos/1.png",
            "https://smashcustommusic.net/brstm/11?noIncrement=1",
            "https://smashcustommusic.net/json/song/11",
            "https://smashcustommusic.net/brstm/12?noIncrement=1",
            "https://smashcustommusic.net/json/song/12",
            "https://smashcustommusic.net/brstm/31?noIncrement=1",
            "https://smashcustommusic.net/json/song/31",
        ]
    );

    let audio_dir = manifest.entries().nth(1).unwrap().dir.clone();
    assert_eq!(audio_dir, dir.path().join("1").join("11"));
    assert_eq!(
        manifest.entries().nth(1).unwrap().out.as_deref(),
        Some("A one.brstm")
    );
}
