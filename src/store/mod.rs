//! Qdrant vector database integration
//!
//! This module wraps the Qdrant client and provides:
//! - Collection lifecycle with schema verification
//! - Batched point upsert and filtered delete
//! - Vector search, scroll, and count with payload filters

mod payload;

pub use payload::*;

use crate::config::Config;
use crate::error::{Error, Result};
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder,
    DeletePointsBuilder, Distance, FieldType, Filter, GetCollectionInfoResponse, PointId,
    PointStruct, Range, ScalarQuantizationBuilder, ScrollPointsBuilder, SearchPointsBuilder,
    UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Information about the backing collection
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub points_count: u64,
    pub vector_size: Option<u64>,
    pub status: String,
}

/// A search hit with its raw similarity score
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub id: String,
    pub score: f32,
    pub payload: ChunkPayload,
}

/// Qdrant store handle.
///
/// The expected vector dimension is injected at construction from the
/// resolved embedding configuration; swapping embedding models means building
/// a new handle.
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantStore {
    /// Connect to Qdrant using config
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::new(
            &config.qdrant_url,
            config.qdrant_api_key(),
            &config.collection_name,
            config.embedding.resolved_dimension(),
        )
        .await
    }

    /// Create a new store connection directly with URL and collection name
    pub async fn new(
        url: &str,
        api_key: Option<String>,
        collection: &str,
        dimension: usize,
    ) -> Result<Self> {
        debug!("Connecting to Qdrant at {}", url);

        let mut builder = Qdrant::from_url(url).skip_compatibility_check();
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            collection: collection.to_string(),
            dimension,
        })
    }

    /// Get the expected vector dimension for this store
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Get the collection name
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Ensure the collection exists with the expected vector size. Idempotent.
    ///
    /// An existing collection with a different or unreadable vector size is
    /// dropped and recreated; stored vectors do not survive a dimension
    /// change since no re-embedding path exists.
    pub async fn ensure_collection(&self) -> Result<()> {
        let exists = self.client.collection_exists(&self.collection).await?;

        if exists {
            match self.collection_vector_size().await? {
                Some(size) if size == self.dimension as u64 => {
                    debug!(
                        "Collection {} already exists with dimension {}",
                        self.collection, self.dimension
                    );
                    return Ok(());
                }
                Some(size) => {
                    warn!(
                        "Collection {} has vector size {}, expected {}; dropping and recreating",
                        self.collection, size, self.dimension
                    );
                }
                None => {
                    warn!(
                        "Collection {} has an unreadable vector config; dropping and recreating",
                        self.collection
                    );
                }
            }

            self.client.delete_collection(&self.collection).await?;
        }

        self.create_collection().await
    }

    /// Create the collection and its payload indexes
    async fn create_collection(&self) -> Result<()> {
        info!(
            "Creating collection {} with dimension {}",
            self.collection, self.dimension
        );

        let vectors_config = VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine);

        let created = self
            .client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(vectors_config)
                    .quantization_config(ScalarQuantizationBuilder::default()),
            )
            .await;

        if let Err(e) = created {
            // A concurrent caller may have won the creation race
            if e.to_string().to_lowercase().contains("already exists") {
                debug!("Collection {} was created concurrently", self.collection);
                return Ok(());
            }
            return Err(e.into());
        }

        self.create_payload_indexes().await?;

        info!("Collection {} created successfully", self.collection);
        Ok(())
    }

    /// Payload indexes backing the supported filters: exact match on url,
    /// range queries on timestamp
    async fn create_payload_indexes(&self) -> Result<()> {
        self.client
            .create_field_index(CreateFieldIndexCollectionBuilder::new(
                &self.collection,
                "url",
                FieldType::Keyword,
            ))
            .await?;

        self.client
            .create_field_index(CreateFieldIndexCollectionBuilder::new(
                &self.collection,
                "timestamp",
                FieldType::Integer,
            ))
            .await?;

        Ok(())
    }

    /// Check if the collection exists
    pub async fn collection_exists(&self) -> Result<bool> {
        let exists = self.client.collection_exists(&self.collection).await?;
        Ok(exists)
    }

    /// Delete the collection if it exists
    pub async fn delete_collection(&self) -> Result<bool> {
        let exists = self.client.collection_exists(&self.collection).await?;

        if !exists {
            return Ok(false);
        }

        info!("Deleting collection {}", self.collection);
        self.client.delete_collection(&self.collection).await?;
        Ok(true)
    }

    /// Reset the collection (delete and recreate)
    pub async fn reset_collection(&self) -> Result<()> {
        if self.client.collection_exists(&self.collection).await? {
            info!("Deleting existing collection {}", self.collection);
            self.client.delete_collection(&self.collection).await?;
        }

        self.create_collection().await
    }

    /// Get collection info (point count, vector size, status)
    pub async fn collection_info(&self) -> Result<Option<CollectionInfo>> {
        if !self.client.collection_exists(&self.collection).await? {
            return Ok(None);
        }

        let info = self.client.collection_info(&self.collection).await?;
        let vector_size = extract_vector_size(&info);

        if let Some(result) = info.result {
            Ok(Some(CollectionInfo {
                points_count: result.points_count.unwrap_or(0),
                vector_size,
                status: format!("{:?}", result.status()),
            }))
        } else {
            Ok(None)
        }
    }

    async fn collection_vector_size(&self) -> Result<Option<u64>> {
        let info = self.client.collection_info(&self.collection).await?;
        Ok(extract_vector_size(&info))
    }

    /// Upsert chunk records, waiting for durability before returning
    pub async fn upsert_records(&self, records: Vec<ChunkRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        if let Some(mismatch) = records.iter().find(|r| r.vector.len() != self.dimension) {
            return Err(Error::Store(format!(
                "vector dimension mismatch for collection '{}': expected {}, got {}",
                self.collection,
                self.dimension,
                mismatch.vector.len()
            )));
        }

        debug!(
            "Upserting {} records to collection {}",
            records.len(),
            self.collection
        );

        let points: Vec<PointStruct> = records.into_iter().map(|r| r.to_point_struct()).collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await?;

        Ok(())
    }

    /// Count points matching the filter
    pub async fn count(&self, filter: Option<Filter>) -> Result<u64> {
        let mut builder = CountPointsBuilder::new(&self.collection).exact(true);
        if let Some(f) = filter {
            builder = builder.filter(f);
        }

        let response = self.client.count(builder).await?;
        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    /// Delete every point matching the filter, waiting for durability
    pub async fn delete_by_filter(&self, filter: Filter) -> Result<()> {
        debug!("Deleting points from collection {} by filter", self.collection);

        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(filter)
                    .wait(true),
            )
            .await?;

        Ok(())
    }

    /// Search for similar vectors.
    ///
    /// `score_threshold` is the store-native (raw cosine) threshold. Results
    /// come back in store rank order; a record with a payload that does not
    /// decode fails the whole call.
    pub async fn search(
        &self,
        query_vector: Vec<f32>,
        limit: usize,
        score_threshold: Option<f32>,
        filter: Option<Filter>,
    ) -> Result<Vec<ScoredChunk>> {
        debug!(
            "Searching collection {} with limit {}",
            self.collection, limit
        );

        let mut builder = SearchPointsBuilder::new(&self.collection, query_vector, limit as u64)
            .with_payload(true);

        if let Some(threshold) = score_threshold {
            builder = builder.score_threshold(threshold);
        }
        if let Some(f) = filter {
            builder = builder.filter(f);
        }

        let response = self.client.search_points(builder).await?;

        let mut results = Vec::with_capacity(response.result.len());
        for point in response.result {
            let id = point_id_to_string(point.id.clone());
            let payload = decode_payload(&id, point.payload)?;
            results.push(ScoredChunk {
                id,
                score: point.score,
                payload,
            });
        }

        Ok(results)
    }

    /// Fetch all payloads matching the filter, scrolling through pages
    pub async fn scroll_payloads(
        &self,
        filter: Option<Filter>,
    ) -> Result<Vec<(String, ChunkPayload)>> {
        let mut all = Vec::new();
        let mut offset: Option<PointId> = None;
        let batch_size = 256u32;

        loop {
            let mut builder = ScrollPointsBuilder::new(&self.collection)
                .limit(batch_size)
                .with_payload(true)
                .with_vectors(false);

            if let Some(ref f) = filter {
                builder = builder.filter(f.clone());
            }
            if let Some(ref o) = offset {
                builder = builder.offset(o.clone());
            }

            let response = self.client.scroll(builder).await?;
            if response.result.is_empty() {
                break;
            }

            for point in response.result {
                let id = point_id_to_string(point.id.clone());
                let payload = decode_payload(&id, point.payload)?;
                all.push((id, payload));
            }

            offset = response.next_page_offset;
            if offset.is_none() {
                break;
            }
        }

        Ok(all)
    }
}

/// Exact-match filter on the document url
pub fn url_filter(url: &str) -> Filter {
    Filter {
        must: vec![Condition::matches("url", url.to_string())],
        should: vec![],
        must_not: vec![],
        min_should: None,
    }
}

/// Filter selecting only canonical records (chunk_index == 0)
pub fn canonical_filter() -> Filter {
    Filter {
        must: vec![Condition::matches("chunk_index", 0i64)],
        should: vec![],
        must_not: vec![],
        min_should: None,
    }
}

/// Inclusive range condition on the timestamp payload field
pub fn timestamp_range_condition(after: Option<i64>, before: Option<i64>) -> Condition {
    Condition::range(
        "timestamp",
        Range {
            lt: None,
            gt: None,
            gte: after.map(|t| t as f64),
            lte: before.map(|t| t as f64),
        },
    )
}

fn extract_vector_size(info: &GetCollectionInfoResponse) -> Option<u64> {
    let result = info.result.as_ref()?;
    let config = result.config.as_ref()?;
    let params = config.params.as_ref()?;
    let vectors_config = params.vectors_config.as_ref()?;

    match vectors_config.config.as_ref()? {
        qdrant_client::qdrant::vectors_config::Config::Params(params) => Some(params.size),
        // Named-vector schemas are never written by this tool; treat as unreadable
        qdrant_client::qdrant::vectors_config::Config::ParamsMap(_) => None,
    }
}

/// Convert PointId to string
fn point_id_to_string(id: Option<PointId>) -> String {
    match id {
        Some(PointId {
            point_id_options: Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(uuid)),
        }) => uuid,
        Some(PointId {
            point_id_options: Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(num)),
        }) => num.to_string(),
        _ => String::new(),
    }
}

/// Decode a stored payload, failing with the record id on malformed data
fn decode_payload(id: &str, payload: HashMap<String, QdrantValue>) -> Result<ChunkPayload> {
    let map: Map<String, Value> = payload
        .into_iter()
        .map(|(k, v)| (k, json_from_qdrant_value(v)))
        .collect();

    serde_json::from_value(Value::Object(map))
        .map_err(|e| Error::Store(format!("malformed payload on record '{}': {}", id, e)))
}

/// Convert Qdrant value to serde_json Value
fn json_from_qdrant_value(v: QdrantValue) -> Value {
    use qdrant_client::qdrant::value::Kind;

    match v.kind {
        Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::Number(i.into()),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => Value::Array(
            list.values
                .into_iter()
                .map(json_from_qdrant_value)
                .collect(),
        ),
        Some(Kind::StructValue(s)) => Value::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, json_from_qdrant_value(v)))
                .collect(),
        ),
        None => Value::Null,
    }
}
