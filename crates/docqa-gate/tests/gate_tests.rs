use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use docqa_core::chunker::Chunker;
use docqa_core::config::{IndexConfig, Settings};
use docqa_core::traits::{DocumentSource, Embedder};
use docqa_core::types::Document;
use docqa_core::{Error, Result};
use docqa_embed::HashEmbedder;
use docqa_gate::{refusal, GateState, RetrievalGate, UNCLEAR_QUESTION};
use docqa_vector::{build_index, IndexStore};
use tempfile::TempDir;

const SHIPPING: &str = "Shipping takes 5-7 business days domestically.";

/// Three-axis embedder: shipping words, weather words, everything else.
///
/// Stands in for a semantic model: answering "How long does shipping take?"
/// from the shipping sentence needs paraphrase similarity, which the
/// vocabulary-based `HashEmbedder` does not give (it scores about 0.17 there).
struct ConceptEmbedder;

impl Embedder for ConceptEmbedder {
    fn model_id(&self) -> &str {
        "concept:d3"
    }

    fn dim(&self) -> usize {
        3
    }

    fn max_len(&self) -> usize {
        512
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| concept_vector(t)).collect())
    }
}

fn concept_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 3];
    for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
        let axis = match word.to_lowercase().as_str() {
            "shipping" | "takes" | "take" | "long" | "days" | "business" | "domestically" | "delivery" => 0,
            "weather" | "today" | "rain" => 1,
            _ => 2,
        };
        v[axis] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return vec![0.0, 0.0, 1.0];
    }
    v.iter().map(|x| x / norm).collect()
}

/// Source whose contents can change between requests and which counts fetches.
#[derive(Clone, Default)]
struct CountingSource {
    documents: Arc<Mutex<Vec<Document>>>,
    fetches: Arc<AtomicUsize>,
}

impl CountingSource {
    fn with(documents: Vec<Document>) -> Self {
        let source = Self::default();
        *source.documents.lock().unwrap() = documents;
        source
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl DocumentSource for CountingSource {
    fn fetch_documents(&self) -> Vec<Document> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.documents.lock().unwrap().clone()
    }
}

fn settings(tmp: &TempDir) -> Settings {
    Settings {
        index: IndexConfig { dir: tmp.path().join("vector_index").to_string_lossy().into_owned() },
        ..Settings::default()
    }
}

fn shipping_source() -> CountingSource {
    CountingSource::with(vec![Document::new(SHIPPING, "shipping.txt")])
}

#[tokio::test]
async fn answers_from_matching_document() {
    let tmp = TempDir::new().unwrap();
    let source = shipping_source();
    let mut gate = RetrievalGate::new(source.clone(), Box::new(ConceptEmbedder), &settings(&tmp)).unwrap();
    assert_eq!(gate.state(), GateState::NoIndex);

    let answer = gate.answer("How long does shipping take?").await.expect("answer");

    assert!(answer.response.contains(SHIPPING), "got {}", answer.response);
    assert!(answer.response.starts_with("**Answer:** "));
    let matched = answer.matched.expect("matched chunk");
    assert_eq!(matched.source_label, "shipping.txt");
    assert_eq!(gate.state(), GateState::IndexReady);
    assert_eq!(source.fetches(), 1, "first query builds the index");
}

#[tokio::test]
async fn refuses_unrelated_question() {
    let tmp = TempDir::new().unwrap();
    let mut gate = RetrievalGate::new(shipping_source(), Box::new(ConceptEmbedder), &settings(&tmp)).unwrap();

    let answer = gate.answer("What is the weather today?").await.expect("answer");

    assert_eq!(answer.response, refusal("What is the weather today?"));
    assert!(answer.response.contains("'what is the weather today?'"));
    assert!(answer.matched.is_none());
}

#[tokio::test]
async fn empty_source_is_an_error_not_a_refusal() {
    let tmp = TempDir::new().unwrap();
    let source = CountingSource::default();
    let mut gate = RetrievalGate::new(source.clone(), Box::new(ConceptEmbedder), &settings(&tmp)).unwrap();

    let err = gate.ask("How long does shipping take?").await.expect_err("no documents");

    assert!(matches!(err, Error::EmptyCorpus), "got {err:?}");
    assert_eq!(gate.state(), GateState::Error);
    assert!(!gate.store().exists(), "nothing persisted");

    // the failure is not sticky: once documents appear the next request recovers
    *source.documents.lock().unwrap() = vec![Document::new(SHIPPING, "shipping.txt")];
    let reply = gate.ask("How long does shipping take?").await.expect("recovered");
    assert!(reply.response.contains(SHIPPING));
    assert_eq!(gate.state(), GateState::IndexReady);
}

#[tokio::test]
async fn whitespace_only_documents_are_an_empty_corpus() {
    let tmp = TempDir::new().unwrap();
    let source = CountingSource::with(vec![Document::new("  \n\n  ", "blank.txt")]);
    let mut gate = RetrievalGate::new(source, Box::new(ConceptEmbedder), &settings(&tmp)).unwrap();

    let err = gate.answer("How long does shipping take?").await.expect_err("blank corpus");
    assert!(matches!(err, Error::EmptyCorpus), "got {err:?}");
}

#[tokio::test]
async fn existing_index_is_reused() {
    let tmp = TempDir::new().unwrap();
    let source = shipping_source();
    let mut gate = RetrievalGate::new(source.clone(), Box::new(ConceptEmbedder), &settings(&tmp)).unwrap();

    gate.answer("How long does shipping take?").await.unwrap();
    gate.answer("How long does delivery take?").await.unwrap();
    gate.answer("What is the weather today?").await.unwrap();

    assert_eq!(source.fetches(), 1);
}

#[tokio::test]
async fn corrupt_index_triggers_exactly_one_rebuild() {
    let tmp = TempDir::new().unwrap();
    let source = shipping_source();
    let mut gate = RetrievalGate::new(source.clone(), Box::new(ConceptEmbedder), &settings(&tmp)).unwrap();
    gate.answer("How long does shipping take?").await.unwrap();
    assert_eq!(source.fetches(), 1);

    let (version, _) = gate.store().status().await.unwrap().expect("active version");
    std::fs::write(gate.store().version_dir(&version).join("manifest.json"), "{ not json").unwrap();

    let answer = gate.answer("How long does shipping take?").await.expect("rebuilt and answered");
    assert!(answer.matched.is_some());
    assert_eq!(source.fetches(), 2, "one rebuild for the corrupt index");
    assert_eq!(gate.state(), GateState::IndexReady);

    gate.answer("How long does shipping take?").await.unwrap();
    assert_eq!(source.fetches(), 2, "healthy index is not rebuilt again");
}

#[tokio::test]
async fn index_from_another_embedder_is_rebuilt() {
    let tmp = TempDir::new().unwrap();
    let settings = settings(&tmp);

    let hash = HashEmbedder::new(64, 4096);
    let chunks = Chunker::default().split_documents(&[Document::new(SHIPPING, "shipping.txt")]);
    IndexStore::new(&settings.index.dir).persist(&build_index(chunks, &hash).unwrap()).await.unwrap();

    let source = shipping_source();
    let mut gate = RetrievalGate::new(source.clone(), Box::new(ConceptEmbedder), &settings).unwrap();
    let answer = gate.answer("How long does shipping take?").await.expect("answer");

    assert!(answer.matched.is_some());
    assert_eq!(source.fetches(), 1);
    let (_, manifest) = gate.store().status().await.unwrap().unwrap();
    assert_eq!(manifest.embedder_id, "concept:d3");
    assert_eq!(manifest.dim, 3);
}

#[tokio::test]
async fn failed_rebuild_leaves_previous_index_and_error_state() {
    let tmp = TempDir::new().unwrap();
    let source = shipping_source();
    let mut gate = RetrievalGate::new(source.clone(), Box::new(ConceptEmbedder), &settings(&tmp)).unwrap();
    let first = gate.rebuild().await.expect("rebuild");
    assert_eq!(gate.state(), GateState::IndexReady);

    source.documents.lock().unwrap().clear();
    let err = gate.rebuild().await.expect_err("empty source");
    assert!(matches!(err, Error::EmptyCorpus));
    assert_eq!(gate.state(), GateState::Error);

    let (active, _) = gate.store().status().await.unwrap().unwrap();
    assert_eq!(active, first, "failed rebuild does not replace the active index");
    let answer = gate.answer("How long does shipping take?").await.expect("old index still serves");
    assert!(answer.matched.is_some());
}

#[tokio::test]
async fn unclear_question_never_touches_the_index() {
    let tmp = TempDir::new().unwrap();
    let source = shipping_source();
    let mut gate = RetrievalGate::new(source.clone(), Box::new(ConceptEmbedder), &settings(&tmp)).unwrap();

    for question in ["hi", "", "¿dónde está mi pedido?"] {
        let reply = gate.ask(question).await.expect("ask");
        assert_eq!(reply.response, UNCLEAR_QUESTION);
        assert_eq!(reply.question, question);
    }
    assert_eq!(source.fetches(), 0);
    assert_eq!(gate.state(), GateState::NoIndex);
}

#[tokio::test]
async fn invalid_settings_are_rejected() {
    let tmp = TempDir::new().unwrap();
    let mut settings = settings(&tmp);
    settings.retrieval.threshold = 1.5;
    assert!(matches!(
        RetrievalGate::new(shipping_source(), Box::new(ConceptEmbedder), &settings),
        Err(Error::InvalidConfig(_))
    ));
}

fn hash_embedder() -> Box<HashEmbedder> {
    Box::new(HashEmbedder::new(384, 8192))
}

#[tokio::test]
async fn hash_backend_refuses_unrelated_question() {
    let tmp = TempDir::new().unwrap();
    let mut gate = RetrievalGate::new(shipping_source(), hash_embedder(), &settings(&tmp)).unwrap();

    let reply = gate.ask("What is the weather today?").await.expect("ask");

    assert_eq!(reply.response, refusal("What is the weather today?"));
    assert_eq!(gate.state(), GateState::IndexReady);
}

#[tokio::test]
async fn punctuation_only_document_does_not_break_the_corpus() {
    let tmp = TempDir::new().unwrap();
    let source = CountingSource::with(vec![
        Document::new(SHIPPING, "shipping.txt"),
        Document::new("-----", "divider.txt"),
    ]);
    let mut gate = RetrievalGate::new(source, hash_embedder(), &settings(&tmp)).unwrap();

    let answer = gate.answer("Shipping takes how many business days domestically?").await.expect("answer");
    let matched = answer.matched.expect("shipping chunk matched");
    assert_eq!(matched.source_label, "shipping.txt");
    assert_eq!(gate.state(), GateState::IndexReady);

    let (_, manifest) = gate.store().status().await.unwrap().unwrap();
    assert_eq!(manifest.chunk_count, 2, "divider is indexed too");

    let reply = gate.ask("???").await.expect("symbol-only question is answered, not an error");
    assert_ne!(reply.response, UNCLEAR_QUESTION);
}
