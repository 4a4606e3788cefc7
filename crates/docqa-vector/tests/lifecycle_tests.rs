use std::fs;

use docqa_core::chunker::Chunker;
use docqa_core::traits::Embedder;
use docqa_core::types::Document;
use docqa_core::Error;
use docqa_embed::HashEmbedder;
use docqa_vector::{build_index, BuiltIndex, IndexStore};
use tempfile::TempDir;

fn built(embedder: &HashEmbedder, texts: &[&str]) -> BuiltIndex {
    let docs: Vec<Document> = texts.iter().enumerate().map(|(i, t)| Document::new(*t, format!("doc{i}.txt"))).collect();
    build_index(Chunker::default().split_documents(&docs), embedder).expect("build")
}

#[test]
fn build_rejects_an_empty_corpus() {
    let embedder = HashEmbedder::new(32, 1024);
    assert!(matches!(build_index(Vec::new(), &embedder), Err(Error::EmptyCorpus)));
}

#[tokio::test]
async fn load_without_index_is_missing() {
    let tmp = TempDir::new().unwrap();
    let store = IndexStore::new(tmp.path().join("idx"));
    assert!(matches!(store.load("hash-xxh64:d32", 32).await, Err(Error::IndexMissing(_))));
    assert!(store.status().await.unwrap().is_none());
}

#[tokio::test]
async fn rebuild_replaces_the_whole_index() {
    let embedder = HashEmbedder::new(64, 1024);
    let tmp = TempDir::new().unwrap();
    let store = IndexStore::new(tmp.path());

    let v1 = store.persist(&built(&embedder, &["alpha bravo", "charlie delta"])).await.unwrap();
    let v2 = store.persist(&built(&embedder, &["echo foxtrot"])).await.unwrap();
    assert_ne!(v1, v2);

    let index = store.load(embedder.model_id(), embedder.dim()).await.unwrap();
    assert_eq!(index.version(), v2);
    assert_eq!(index.len(), 1, "no rows carried over from the previous build");
    let hits = index.search(&embedder.embed("alpha").unwrap(), 3).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].chunk.content, "echo foxtrot");

    let (active, manifest) = store.status().await.unwrap().expect("status");
    assert_eq!(active, v2);
    assert_eq!(manifest.chunk_count, 1);
}

#[tokio::test]
async fn interrupted_persist_leaves_previous_index_visible() {
    let embedder = HashEmbedder::new(64, 1024);
    let tmp = TempDir::new().unwrap();
    let store = IndexStore::new(tmp.path());
    let v1 = store.persist(&built(&embedder, &["alpha bravo"])).await.unwrap();

    // A writer that died mid-write: half a staging dir, plus a finished
    // version whose pointer flip never happened.
    let staging = tmp.path().join(".staging-crashed");
    fs::create_dir_all(staging.join("chunks.lance")).unwrap();
    fs::write(staging.join("manifest.json"), b"{\"format_version\":").unwrap();
    let orphan = store.version_dir("orphan");
    fs::create_dir_all(&orphan).unwrap();
    fs::write(orphan.join("manifest.json"), b"garbage").unwrap();

    let index = store.load(embedder.model_id(), embedder.dim()).await.expect("old index still loads");
    assert_eq!(index.version(), v1);
    assert_eq!(index.search(&embedder.embed("bravo").unwrap(), 1).await.unwrap()[0].chunk.content, "alpha bravo");

    // the next writer cleans up after the crashed one
    store.persist(&built(&embedder, &["charlie"])).await.unwrap();
    assert!(!staging.exists());
    assert!(!orphan.exists());
}

#[tokio::test]
async fn concurrent_persists_are_serialised() {
    let embedder = HashEmbedder::new(64, 1024);
    let tmp = TempDir::new().unwrap();
    let a = built(&embedder, &["alpha bravo", "charlie"]);
    let b = built(&embedder, &["delta echo foxtrot"]);
    let store_a = IndexStore::new(tmp.path());
    let store_b = IndexStore::new(tmp.path());

    let (ra, rb) = tokio::join!(store_a.persist(&a), store_b.persist(&b));
    ra.unwrap();
    rb.unwrap();

    let index = store_a.load(embedder.model_id(), embedder.dim()).await.unwrap();
    assert!(index.len() == 1 || index.len() == 2);
    let hits = index.search(&embedder.embed("alpha delta").unwrap(), 5).await.unwrap();
    assert_eq!(hits.len(), index.len(), "rows come from exactly one build");
}

#[tokio::test]
async fn unreadable_manifest_is_corrupt() {
    let embedder = HashEmbedder::new(64, 1024);
    let tmp = TempDir::new().unwrap();
    let store = IndexStore::new(tmp.path());
    let version = store.persist(&built(&embedder, &["alpha"])).await.unwrap();
    fs::write(store.version_dir(&version).join("manifest.json"), b"not json").unwrap();

    assert!(matches!(store.load(embedder.model_id(), embedder.dim()).await, Err(Error::IndexCorrupt(_))));
}

#[tokio::test]
async fn missing_table_is_corrupt() {
    let embedder = HashEmbedder::new(64, 1024);
    let tmp = TempDir::new().unwrap();
    let store = IndexStore::new(tmp.path());
    let version = store.persist(&built(&embedder, &["alpha"])).await.unwrap();
    fs::remove_dir_all(store.version_dir(&version).join("chunks.lance")).unwrap();

    assert!(matches!(store.load(embedder.model_id(), embedder.dim()).await, Err(Error::IndexCorrupt(_))));
}

#[tokio::test]
async fn malformed_pointer_is_corrupt() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("CURRENT"), "../../etc\n").unwrap();
    let store = IndexStore::new(tmp.path());
    assert!(matches!(store.load("hash-xxh64:d8", 8).await, Err(Error::IndexCorrupt(_))));
}

#[tokio::test]
async fn embedder_with_other_dimension_cannot_load() {
    let small = HashEmbedder::new(32, 1024);
    let large = HashEmbedder::new(48, 1024);
    let tmp = TempDir::new().unwrap();
    let store = IndexStore::new(tmp.path());
    store.persist(&built(&small, &["alpha bravo"])).await.unwrap();

    assert!(matches!(store.load(large.model_id(), large.dim()).await, Err(Error::IndexCorrupt(_))));

    let index = store.load(small.model_id(), small.dim()).await.unwrap();
    let wrong = large.embed("alpha").unwrap();
    assert!(matches!(
        index.search(&wrong, 1).await,
        Err(Error::DimensionMismatch { expected: 32, actual: 48 })
    ));
}
