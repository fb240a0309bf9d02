//! End-to-end retrieval over indexed filings: chunk, embed and store on the
//! way in; fetch, fuse and rerank on the way out.

use crate::chunking::{self, DocumentChunker};
use crate::embeddings::{self, EmbeddingProvider};
use crate::rerank::{RerankCandidate, Reranker};
use crate::search::HybridSearcher;
use crate::types::{Chunk, ChunkMetadata, IndexReport, RankedResult};
use crate::vectordb::{InMemoryVectorStore, MetadataFilter, VectorStore};
use crate::{llm, Config, Error, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

pub struct FilingRetriever {
    chunker: DocumentChunker,
    embedding: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    searcher: HybridSearcher,
    reranker: Option<Reranker>,
    fetch_multiplier: usize,
    min_document_chars: usize,
}

impl FilingRetriever {
    pub fn new(
        config: &Config,
        embedding: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        reranker: Option<Reranker>,
    ) -> Self {
        Self {
            chunker: DocumentChunker::from_config(&config.chunking),
            embedding,
            store,
            searcher: HybridSearcher::from_config(&config.search),
            reranker,
            fetch_multiplier: config.search.fetch_multiplier.max(1),
            min_document_chars: config.chunking.min_document_chars,
        }
    }

    /// Build providers from config on top of an in-memory store
    pub async fn from_config(config: &Config) -> Result<Self> {
        let embedding = embeddings::from_config(&config.embedding).await?;
        info!(
            "[INDEX] Using {} embeddings (dimension {})",
            embedding.provider_name(),
            embedding.dimension()
        );

        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new(embedding.dimension()));

        let reranker = if config.rerank.enabled {
            let llm = if config.rerank.use_llm {
                match llm::from_config(&config.llm) {
                    Ok(provider) => Some(provider),
                    Err(e) => {
                        warn!("[RERANK] LLM provider unavailable: {}", e);
                        None
                    }
                }
            } else {
                None
            };
            Some(Reranker::from_config(&config.rerank, llm))
        } else {
            None
        };

        Ok(Self::new(config, embedding, store, reranker))
    }

    pub fn embedding(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding
    }

    pub fn reranker(&self) -> Option<&Reranker> {
        self.reranker.as_ref()
    }

    /// Chunk, embed and store one document, replacing anything previously
    /// indexed under the same source key.
    ///
    /// The metadata must carry a ticker or a source path.
    pub async fn index_document(&self, text: &str, metadata: &ChunkMetadata) -> Result<IndexReport> {
        let chunks = self.chunker.chunk_text(text, metadata);
        self.store_chunks(chunks, metadata).await
    }

    /// Same as [`index_document`](Self::index_document) for a text or HTML
    /// file on disk. Files with too little text are rejected before the
    /// index is touched.
    pub async fn index_file(&self, path: &Path, metadata: &ChunkMetadata) -> Result<IndexReport> {
        let file_path = path.to_path_buf();
        let text = tokio::task::spawn_blocking(move || chunking::read_document(&file_path))
            .await??
            .ok_or_else(|| Error::InvalidInput(format!("File not found: {}", path.display())))?;

        let extracted_chars = chunking::clean_text(&text).chars().count();
        if extracted_chars < self.min_document_chars {
            warn!(
                "[INDEX] Only {} chars of text in {}, expected at least {}",
                extracted_chars,
                path.display(),
                self.min_document_chars
            );
            return Err(Error::InvalidInput(format!(
                "Extracted only {} characters of text from {} (minimum {})",
                extracted_chars,
                path.display(),
                self.min_document_chars
            )));
        }

        let file_metadata = chunking::file_metadata(path, metadata);
        let chunks = self.chunker.chunk_text(&text, &file_metadata);
        self.store_chunks(chunks, &file_metadata).await
    }

    async fn store_chunks(&self, chunks: Vec<Chunk>, metadata: &ChunkMetadata) -> Result<IndexReport> {
        let start = Instant::now();
        let replace_filter = MetadataFilter::for_document(metadata).ok_or_else(|| {
            Error::InvalidInput("A ticker or source is required to index a document".to_string())
        })?;
        let source_key = metadata.source_key().map(str::to_string);

        if chunks.is_empty() {
            info!("[INDEX] No chunks produced for {:?}", source_key);
            return Ok(IndexReport {
                source_key,
                chunks_indexed: 0,
                chunks_replaced: 0,
                total_chars: 0,
                elapsed_secs: start.elapsed().as_secs_f64(),
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let total_chars = texts.iter().map(|t| t.chars().count()).sum();

        info!("[INDEX] Embedding {} chunks for {:?}", chunks.len(), source_key);
        let embeddings = self.embedding.embed_batch(&texts).await?;
        check_embeddings(&embeddings, chunks.len(), self.store.dimension())?;

        // Old passages go only once the new ones are embedded and checked
        let chunks_replaced = self.store.delete(&replace_filter).await?;

        let chunks_indexed = chunks.len();
        self.store.add_chunks(chunks, embeddings).await?;

        let elapsed_secs = start.elapsed().as_secs_f64();
        info!(
            "[INDEX] Indexed {} chunks ({} chars, {} replaced) for {:?} in {:.2}s",
            chunks_indexed,
            total_chars,
            chunks_replaced,
            source_key,
            elapsed_secs
        );

        Ok(IndexReport {
            source_key,
            chunks_indexed,
            chunks_replaced,
            total_chars,
            elapsed_secs,
        })
    }

    /// Hybrid search over the passages matching `filter`, reranked when a
    /// reranker is configured
    pub async fn search(
        &self,
        query: &str,
        filter: &MetadataFilter,
        top_k: usize,
    ) -> Result<Vec<RankedResult>> {
        if top_k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let records = self.store.fetch(filter).await?;
        if records.is_empty() {
            info!("[SEARCH] No indexed passages match {:?}", filter);
            return Ok(Vec::new());
        }

        let query_embedding = self.embedding.embed(query).await?;

        let mut documents = Vec::with_capacity(records.len());
        let mut metadata = Vec::with_capacity(records.len());
        let mut vectors = Vec::with_capacity(records.len());
        for record in records {
            documents.push(record.chunk.content);
            metadata.push(record.chunk.metadata);
            vectors.push(record.vector);
        }

        let index = self.searcher.index(documents, metadata);
        let candidate_k = match self.reranker {
            Some(_) => top_k.saturating_mul(self.fetch_multiplier),
            None => top_k,
        };
        let hits = index.search(query, &query_embedding, &vectors, candidate_k);

        info!(
            "[SEARCH] {} fused candidates from {} passages for \"{}\"",
            hits.len(),
            index.len(),
            query
        );

        let ranked = match &self.reranker {
            Some(reranker) => {
                let candidates = hits.into_iter().map(RerankCandidate::from).collect();
                reranker.rerank(query, candidates, top_k).await
            }
            None => hits.into_iter().take(top_k).map(RankedResult::from).collect(),
        };

        Ok(ranked)
    }

    pub async fn delete(&self, filter: &MetadataFilter) -> Result<usize> {
        self.store.delete(filter).await
    }

    pub async fn count(&self) -> Result<usize> {
        self.store.count().await
    }
}

/// One vector per chunk, each of the store's dimension
fn check_embeddings(embeddings: &[Vec<f32>], chunk_count: usize, dimension: usize) -> Result<()> {
    if embeddings.len() != chunk_count {
        return Err(Error::Embedding(format!(
            "Provider returned {} embeddings for {} chunks",
            embeddings.len(),
            chunk_count
        )));
    }

    if let Some((position, vector)) = embeddings
        .iter()
        .enumerate()
        .find(|(_, vector)| vector.len() != dimension)
    {
        return Err(Error::Embedding(format!(
            "Embedding {} has dimension {}, index expects {}",
            position,
            vector.len(),
            dimension
        )));
    }

    Ok(())
}
