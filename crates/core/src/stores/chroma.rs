use crate::error::StoreError;
use crate::ingest::ChunkRecord;
use crate::stores::{CollectionHandle, RetrievedChunk};
use crate::traits::ChunkStore;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use url::Url;

/// Client for a Chroma-compatible REST store. Embeddings are computed
/// server-side; this client only moves documents, ids, and query text.
pub struct ChromaStore {
    endpoint: String,
    client: Client,
}

impl ChromaStore {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, StoreError> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Url::parse(&endpoint)?;

        Ok(Self {
            endpoint,
            client: Client::new(),
        })
    }

    fn collections_url(&self) -> String {
        format!("{}/api/v1/collections", self.endpoint)
    }
}

fn backend_error(details: impl Into<String>) -> StoreError {
    StoreError::BackendResponse {
        backend: "chroma".to_string(),
        details: details.into(),
    }
}

fn parse_collection(value: &Value, requested_name: &str) -> Result<CollectionHandle, StoreError> {
    let id = value
        .pointer("/id")
        .and_then(Value::as_str)
        .ok_or_else(|| backend_error("collection response missing id"))?;

    let name = value
        .pointer("/name")
        .and_then(Value::as_str)
        .unwrap_or(requested_name);

    Ok(CollectionHandle {
        id: id.to_string(),
        name: name.to_string(),
    })
}

fn parse_query_response(value: &Value) -> Vec<RetrievedChunk> {
    let documents = value
        .pointer("/documents/0")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let distances = value
        .pointer("/distances/0")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    documents
        .iter()
        .enumerate()
        .filter_map(|(position, document)| {
            document.as_str().map(|text| RetrievedChunk {
                text: text.to_string(),
                distance: distances
                    .get(position)
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0),
            })
        })
        .collect()
}

#[async_trait]
impl ChunkStore for ChromaStore {
    async fn find_collection(&self, name: &str) -> Result<Option<CollectionHandle>, StoreError> {
        let response = self
            .client
            .get(format!("{}/{}", self.collections_url(), name))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(backend_error(response.status().to_string()));
        }

        let parsed: Value = response.json().await?;
        Ok(Some(parse_collection(&parsed, name)?))
    }

    async fn create_collection(&self, name: &str) -> Result<CollectionHandle, StoreError> {
        let response = self
            .client
            .post(self.collections_url())
            .json(&json!({
                "name": name,
                "metadata": { "hnsw:space": "cosine" },
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response.status().to_string()));
        }

        let parsed: Value = response.json().await?;
        parse_collection(&parsed, name)
    }

    async fn add_chunks(
        &self,
        collection: &CollectionHandle,
        records: &[ChunkRecord],
    ) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let documents: Vec<&str> = records.iter().map(|record| record.text.as_str()).collect();
        let ids: Vec<&str> = records
            .iter()
            .map(|record| record.chunk_id.as_str())
            .collect();
        let metadatas: Vec<Value> = records
            .iter()
            .map(|record| json!({ "page_number": record.page_number }))
            .collect();

        let response = self
            .client
            .post(format!("{}/{}/add", self.collections_url(), collection.id))
            .json(&json!({
                "documents": documents,
                "ids": ids,
                "metadatas": metadatas,
            }))
            .send()
            .await?;

        // A duplicate id is rejected here and aborts the ingestion run.
        if !response.status().is_success() {
            return Err(backend_error(response.status().to_string()));
        }

        Ok(())
    }

    async fn query_chunks(
        &self,
        collection: &CollectionHandle,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, StoreError> {
        let response = self
            .client
            .post(format!(
                "{}/{}/query",
                self.collections_url(),
                collection.id
            ))
            .json(&json!({
                "query_texts": [question],
                "n_results": top_k,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response.status().to_string()));
        }

        let parsed: Value = response.json().await?;
        Ok(parse_query_response(&parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_endpoint_is_rejected() {
        assert!(ChromaStore::new("not a url").is_err());
        assert!(ChromaStore::new("http://localhost:8000/").is_ok());
    }

    #[test]
    fn collection_response_is_parsed() {
        let value = json!({ "id": "c9a1", "name": "knowledge-base" });
        let handle = parse_collection(&value, "knowledge-base").unwrap();
        assert_eq!(handle.id, "c9a1");
        assert_eq!(handle.name, "knowledge-base");
    }

    #[test]
    fn collection_response_without_id_is_an_error() {
        let value = json!({ "name": "knowledge-base" });
        assert!(parse_collection(&value, "knowledge-base").is_err());
    }

    #[test]
    fn query_response_zips_documents_with_distances() {
        let value = json!({
            "documents": [["[Page no. 1] \"a\"", "[Page no. 2] \"b\""]],
            "distances": [[0.12, 0.34]],
        });

        let hits = parse_query_response(&value);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "[Page no. 1] \"a\"");
        assert!((hits[0].distance - 0.12).abs() < 1e-9);
        assert!((hits[1].distance - 0.34).abs() < 1e-9);
    }

    #[test]
    fn query_response_without_hits_is_empty() {
        let value = json!({ "documents": [[]], "distances": [[]] });
        assert!(parse_query_response(&value).is_empty());
    }
}
