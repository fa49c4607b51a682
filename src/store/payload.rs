//! Payload schema for Qdrant points

use crate::error::{Error, Result};
use qdrant_client::qdrant::{PointStruct, Value as QdrantValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// Type discriminator stored with every chunk record
pub const RECORD_KIND: &str = "content_chunk";

/// A record ready to be upserted to Qdrant
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

impl ChunkRecord {
    /// Convert to qdrant-client PointStruct
    pub fn to_point_struct(self) -> PointStruct {
        let payload_map = self.payload.to_qdrant_payload();
        PointStruct::new(self.id.to_string(), self.vector, payload_map)
    }
}

/// Payload stored with each chunk in Qdrant.
///
/// Every record carries the full document attributes; the `chunk_index == 0`
/// record is the canonical one used for document listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
    /// Document URL (the document key)
    pub url: String,

    /// Document title
    pub title: String,

    /// Domain derived from the URL host
    pub domain: String,

    /// Ingestion time as epoch seconds (UTC)
    pub timestamp: i64,

    /// Content type of the source document
    pub content_type: String,

    /// Whitespace-delimited word count of the whole document
    pub word_count: usize,

    /// Whether the document looks like it contains code
    pub has_code: bool,

    /// Chunk text
    pub content: String,

    /// Chunk index within the document (0-based, contiguous)
    pub chunk_index: usize,

    /// Total chunks for this document
    pub total_chunks: usize,

    /// Chunk start offset in the original text
    pub start_position: usize,

    /// Chunk end offset in the original text
    pub end_position: usize,

    /// Whether this chunk is a fenced code block
    pub is_code_block: bool,

    /// Page number for paginated sources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<usize>,

    /// Paragraph index for structured sources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paragraph_index: Option<usize>,

    /// Record type discriminator
    #[serde(rename = "type")]
    pub kind: String,
}

impl ChunkPayload {
    /// Convert to Qdrant payload format
    pub fn to_qdrant_payload(self) -> HashMap<String, QdrantValue> {
        let mut map = HashMap::new();

        map.insert("url".to_string(), string_to_qdrant(&self.url));
        map.insert("title".to_string(), string_to_qdrant(&self.title));
        map.insert("domain".to_string(), string_to_qdrant(&self.domain));
        map.insert("timestamp".to_string(), int_to_qdrant(self.timestamp));
        map.insert(
            "content_type".to_string(),
            string_to_qdrant(&self.content_type),
        );
        map.insert(
            "word_count".to_string(),
            int_to_qdrant(self.word_count as i64),
        );
        map.insert("has_code".to_string(), bool_to_qdrant(self.has_code));
        map.insert("content".to_string(), string_to_qdrant(&self.content));
        map.insert(
            "chunk_index".to_string(),
            int_to_qdrant(self.chunk_index as i64),
        );
        map.insert(
            "total_chunks".to_string(),
            int_to_qdrant(self.total_chunks as i64),
        );
        map.insert(
            "start_position".to_string(),
            int_to_qdrant(self.start_position as i64),
        );
        map.insert(
            "end_position".to_string(),
            int_to_qdrant(self.end_position as i64),
        );
        map.insert(
            "is_code_block".to_string(),
            bool_to_qdrant(self.is_code_block),
        );
        map.insert("type".to_string(), string_to_qdrant(&self.kind));

        if let Some(page) = self.page_number {
            map.insert("page_number".to_string(), int_to_qdrant(page as i64));
        }

        if let Some(paragraph) = self.paragraph_index {
            map.insert("paragraph_index".to_string(), int_to_qdrant(paragraph as i64));
        }

        map
    }
}

fn string_to_qdrant(s: &str) -> QdrantValue {
    QdrantValue {
        kind: Some(qdrant_client::qdrant::value::Kind::StringValue(s.to_string())),
    }
}

fn int_to_qdrant(i: i64) -> QdrantValue {
    QdrantValue {
        kind: Some(qdrant_client::qdrant::value::Kind::IntegerValue(i)),
    }
}

fn bool_to_qdrant(b: bool) -> QdrantValue {
    QdrantValue {
        kind: Some(qdrant_client::qdrant::value::Kind::BoolValue(b)),
    }
}

/// Strict payload decoding. A stored record that does not parse is a store
/// error surfaced to the caller, never a silently defaulted record.
impl TryFrom<Map<String, Value>> for ChunkPayload {
    type Error = Error;

    fn try_from(map: Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(map))
            .map_err(|e| Error::Store(format!("malformed chunk payload: {}", e)))
    }
}

/// Test fixture shared across the store module
#[cfg(test)]
pub(crate) fn sample_payload() -> ChunkPayload {
    ChunkPayload {
        url: "https://example.com/guide".to_string(),
        title: "Guide".to_string(),
        domain: "example.com".to_string(),
        timestamp: 1_700_000_000,
        content_type: "text/html".to_string(),
        word_count: 42,
        has_code: true,
        content: "Some chunk text.".to_string(),
        chunk_index: 0,
        total_chunks: 3,
        start_position: 0,
        end_position: 16,
        is_code_block: false,
        page_number: None,
        paragraph_index: None,
        kind: RECORD_KIND.to_string(),
    }
}
