//! Manifest Store Integration Tests
//!
//! Exercises the durable invariants: key == checksum, total_records sync,
//! last-write-wins idempotence, and atomic commits.

use std::path::PathBuf;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tempfile::TempDir;

use siphon::download::DownloadRecord;
use siphon::manifest::{ManifestError, ManifestStore, Process};
use siphon::source::{Connection, Source};

fn test_source() -> Source {
    Source {
        source_id: "spansh".to_string(),
        dataset: "systems".to_string(),
        expected_format: "json".to_string(),
        compression: "gzip".to_string(),
        connection: Connection {
            url: "https://example.com/galaxy.json.gz".to_string(),
            method: "GET".to_string(),
            timeout_secs: 7200,
            retry_policy: None,
            headers: Default::default(),
        },
    }
}

/// Write real bytes to disk and build a verified event from them.
fn event_for(dir: &TempDir, name: &str, content: &[u8]) -> DownloadRecord {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();

    DownloadRecord::new(
        &path,
        hex::encode(Sha256::digest(content)),
        Utc::now(),
        Utc::now(),
        "gzip".to_string(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_add_record_syncs_metadata_and_persists() {
    let temp = TempDir::new().unwrap();
    let store = ManifestStore::new(temp.path().join("manifests"), "1.0".to_string()).unwrap();

    let mut manifest = store.load(Process::Downloads).await.unwrap();
    let event = event_for(&temp, "dump-a.json.gz", b"first payload");

    store
        .add_record(&mut manifest, &test_source(), &event, None)
        .await
        .unwrap();

    assert_eq!(manifest.metadata.total_records, 1);
    assert!(manifest.metadata.ts_updated.is_some());

    let reloaded = store.load(Process::Downloads).await.unwrap();
    assert_eq!(reloaded.len(), 1);
    let record = reloaded.get(&event.sha256).unwrap();
    assert_eq!(record.checksum, event.sha256);
    assert_eq!(record.file_size, event.file_size_bytes);
    assert_eq!(record.file_version, "1.0");
}

#[tokio::test]
async fn test_same_digest_overwrites_in_place() {
    let temp = TempDir::new().unwrap();
    let store = ManifestStore::new(temp.path().join("manifests"), "1.0".to_string()).unwrap();

    let mut manifest = store.load(Process::Downloads).await.unwrap();

    // Same bytes downloaded twice to different paths: same digest key.
    let event_one = event_for(&temp, "dump-run1.json.gz", b"identical payload");
    let event_two = event_for(&temp, "dump-run2.json.gz", b"identical payload");
    assert_eq!(event_one.sha256, event_two.sha256);

    store
        .add_record(&mut manifest, &test_source(), &event_one, None)
        .await
        .unwrap();
    let first_updated = manifest.metadata.ts_updated.unwrap();

    store
        .add_record(&mut manifest, &test_source(), &event_two, None)
        .await
        .unwrap();

    // Last write wins: one record, refreshed timestamp, new path.
    assert_eq!(manifest.metadata.total_records, 1);
    assert!(manifest.metadata.ts_updated.unwrap() >= first_updated);

    let reloaded = store.load(Process::Downloads).await.unwrap();
    assert_eq!(reloaded.len(), 1);
    assert_eq!(
        reloaded.get(&event_one.sha256).unwrap().file_path,
        event_two.file_path
    );
}

#[tokio::test]
async fn test_distinct_digests_accumulate() {
    let temp = TempDir::new().unwrap();
    let store = ManifestStore::new(temp.path().join("manifests"), "1.0".to_string()).unwrap();

    let mut manifest = store.load(Process::Downloads).await.unwrap();

    for (name, content) in [
        ("dump-a.json.gz", b"payload a".as_slice()),
        ("dump-b.json.gz", b"payload b".as_slice()),
    ] {
        let event = event_for(&temp, name, content);
        store
            .add_record(&mut manifest, &test_source(), &event, None)
            .await
            .unwrap();
    }

    assert_eq!(manifest.metadata.total_records, 2);

    let reloaded = store.load(Process::Downloads).await.unwrap();
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.metadata.total_records, 2);
}

#[tokio::test]
async fn test_every_commit_leaves_complete_json() {
    let temp = TempDir::new().unwrap();
    let store = ManifestStore::new(temp.path().join("manifests"), "1.0".to_string()).unwrap();
    let path = store.manifest_path(Process::Downloads);

    let mut manifest = store.load(Process::Downloads).await.unwrap();

    for i in 0..5 {
        let content = format!("payload {}", i);
        let event = event_for(&temp, &format!("dump-{}.json.gz", i), content.as_bytes());
        store
            .add_record(&mut manifest, &test_source(), &event, None)
            .await
            .unwrap();

        // The rename target is always a complete, parseable document whose
        // counters agree with its record map.
        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let records = on_disk["records"].as_object().unwrap();
        assert_eq!(
            on_disk["metadata"]["total_records"].as_u64().unwrap(),
            records.len() as u64
        );
    }

    // No temp files left behind in the manifest directory.
    let leftovers: Vec<PathBuf> = std::fs::read_dir(temp.path().join("manifests"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p != &path)
        .collect();
    assert!(leftovers.is_empty(), "stray files: {:?}", leftovers);
}

#[tokio::test]
async fn test_corrupt_manifest_is_rejected_not_repaired() {
    let temp = TempDir::new().unwrap();
    let manifests = temp.path().join("manifests");
    std::fs::create_dir_all(&manifests).unwrap();
    let store = ManifestStore::new(manifests.clone(), "1.0".to_string()).unwrap();

    // A record filed under the wrong digest key.
    let doc = serde_json::json!({
        "metadata": {
            "process": "downloads",
            "version": "1.0",
            "total_records": 1,
            "ts_created": "2026-03-07T14:30:05Z",
            "ts_updated": null
        },
        "records": {
            "0000000000000000000000000000000000000000000000000000000000000000": {
                "source_id": "spansh",
                "dataset": "systems",
                "checksum": "1111111111111111111111111111111111111111111111111111111111111111",
                "file_path": "/data/dump.json.gz",
                "file_size": 10240,
                "file_version": "1.0"
            }
        }
    });
    std::fs::write(
        store.manifest_path(Process::Downloads),
        serde_json::to_string_pretty(&doc).unwrap(),
    )
    .unwrap();

    let err = store.load(Process::Downloads).await.unwrap_err();
    assert!(matches!(err, ManifestError::KeyMismatch { .. }));
}
