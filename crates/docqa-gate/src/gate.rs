use docqa_core::chunker::Chunker;
use docqa_core::config::{RetrievalConfig, Settings};
use docqa_core::traits::{DocumentSource, Embedder};
use docqa_core::types::{Answer, AskResponse};
use docqa_core::{Error, Result};
use docqa_vector::{build_index, IndexStore, VectorIndex};

use crate::decision::decide;
use crate::question::{is_clear_question, UNCLEAR_QUESTION};
use crate::state::GateState;

/// Owns the index lifecycle and answers queries against it.
///
/// Every query loads the active index. A load failure, whether the index is
/// absent or unusable, leads to exactly one rebuild from the document source
/// within that request; if the rebuild fails the caller gets the error.
pub struct RetrievalGate<S: DocumentSource> {
    source: S,
    embedder: Box<dyn Embedder>,
    chunker: Chunker,
    store: IndexStore,
    retrieval: RetrievalConfig,
    state: GateState,
}

impl<S: DocumentSource> RetrievalGate<S> {
    pub fn new(source: S, embedder: Box<dyn Embedder>, settings: &Settings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            source,
            embedder,
            chunker: Chunker::new(settings.chunking)?,
            store: IndexStore::new(&settings.index.dir),
            retrieval: settings.retrieval,
            state: GateState::NoIndex,
        })
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// The `ask` operation: validates the question, then answers it.
    pub async fn ask(&mut self, question: &str) -> Result<AskResponse> {
        let response = if is_clear_question(question) {
            self.answer(question).await?.response
        } else {
            tracing::info!(question, "rejected unclear question");
            UNCLEAR_QUESTION.to_string()
        };
        Ok(AskResponse { question: question.to_string(), response })
    }

    pub async fn answer(&mut self, query: &str) -> Result<Answer> {
        let index = self.ensure_ready().await?;
        let vector = self.embedder.embed(query)?;
        let hits = index.search(&vector, self.retrieval.k).await?;
        let answer = decide(query, &hits, self.retrieval.threshold);
        tracing::info!(
            query,
            top_score = hits.first().map(|h| h.score),
            matched = answer.matched.is_some(),
            "answered query"
        );
        Ok(answer)
    }

    /// Rebuilds the index from the document source regardless of its current health.
    pub async fn rebuild(&mut self) -> Result<String> {
        self.transition(GateState::Rebuilding);
        match self.rebuild_and_load().await {
            Ok((version, _)) => {
                self.transition(GateState::IndexReady);
                Ok(version)
            }
            Err(e) => self.fail(e),
        }
    }

    async fn ensure_ready(&mut self) -> Result<VectorIndex> {
        let load_error = match self.load().await {
            Ok(index) => {
                self.transition(GateState::IndexReady);
                return Ok(index);
            }
            Err(e) if e.is_index_failure() => e,
            Err(e) => return self.fail(e),
        };

        match &load_error {
            Error::IndexMissing(_) => self.transition(GateState::NoIndex),
            _ => tracing::warn!(error = %load_error, "index failed to load"),
        }
        self.transition(GateState::Rebuilding);
        match self.rebuild_and_load().await {
            Ok((_, index)) => {
                self.transition(GateState::IndexReady);
                Ok(index)
            }
            Err(e) => self.fail(e),
        }
    }

    async fn load(&self) -> Result<VectorIndex> {
        self.store.load(self.embedder.model_id(), self.embedder.dim()).await
    }

    async fn rebuild_and_load(&self) -> Result<(String, VectorIndex)> {
        let documents = self.source.fetch_documents();
        if documents.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        let chunks = self.chunker.split_documents(&documents);
        tracing::info!(documents = documents.len(), chunks = chunks.len(), "rebuilding index");
        let built = build_index(chunks, self.embedder.as_ref())?;
        let version = self.store.persist(&built).await?;
        let index = self.load().await?;
        Ok((version, index))
    }

    fn transition(&mut self, next: GateState) {
        if self.state != next {
            tracing::info!(from = %self.state, to = %next, "gate state");
            self.state = next;
        }
    }

    fn fail<T>(&mut self, error: Error) -> Result<T> {
        tracing::error!(%error, "retrieval gate failed");
        self.transition(GateState::Error);
        Err(error)
    }
}
