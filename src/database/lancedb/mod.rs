// LanceDB table layout for embedded chunks and the Arrow conversions in both directions


pub mod vector_store;

use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, StringArray, UInt32Array, UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::{RetrievedMatch, StoredChunk};
use crate::crawler::domain::PageUrl;
use crate::embeddings::chunking::Chunk;
use crate::{RagError, Result};

/// Name of the chunk table inside the vectors directory
pub const TABLE_NAME: &str = "handbook_chunks";

/// Arrow schema of the chunk table for vectors of `vector_dim` dimensions
#[inline]
pub fn chunk_schema(vector_dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                vector_dim as i32,
            ),
            false,
        ),
        Field::new("source_url", DataType::Utf8, false),
        Field::new("section_title", DataType::Utf8, false),
        Field::new("content", DataType::Utf8, false),
        Field::new("start_char", DataType::UInt64, false),
        Field::new("end_char", DataType::UInt64, false),
        Field::new("chunk_index", DataType::UInt32, false),
        Field::new("total_chunks", DataType::UInt32, false),
        Field::new("token_count", DataType::UInt32, false),
        Field::new("created_at", DataType::Utf8, false),
    ]))
}

/// Build a record batch from chunks that all carry `vector_dim`-dimension vectors
#[inline]
pub fn to_record_batch(records: &[StoredChunk], vector_dim: usize) -> Result<RecordBatch> {
    let len = records.len();
    let created_at = Utc::now().to_rfc3339();

    let mut ids = Vec::with_capacity(len);
    let mut flat_values = Vec::with_capacity(len * vector_dim);
    let mut source_urls = Vec::with_capacity(len);
    let mut section_titles = Vec::with_capacity(len);
    let mut contents = Vec::with_capacity(len);
    let mut start_chars = Vec::with_capacity(len);
    let mut end_chars = Vec::with_capacity(len);
    let mut chunk_indices = Vec::with_capacity(len);
    let mut total_chunks = Vec::with_capacity(len);
    let mut token_counts = Vec::with_capacity(len);
    let mut created_ats = Vec::with_capacity(len);

    for record in records {
        if record.vector.len() != vector_dim {
            return Err(RagError::Index(format!(
                "vector dimension {} does not match table dimension {}",
                record.vector.len(),
                vector_dim
            )));
        }

        let chunk = &record.chunk;
        ids.push(Uuid::new_v4().to_string());
        flat_values.extend_from_slice(&record.vector);
        source_urls.push(chunk.source_url().as_str());
        section_titles.push(chunk.section_title());
        contents.push(chunk.content());
        start_chars.push(chunk.start_char() as u64);
        end_chars.push(chunk.end_char() as u64);
        chunk_indices.push(chunk.chunk_index() as u32);
        total_chunks.push(chunk.total_chunks() as u32);
        token_counts.push(chunk.token_count() as u32);
        created_ats.push(created_at.as_str());
    }

    let field = Arc::new(Field::new("item", DataType::Float32, false));
    let vector_array = FixedSizeListArray::try_new(
        field,
        vector_dim as i32,
        Arc::new(Float32Array::from(flat_values)),
        None,
    )
    .map_err(|e| RagError::Index(format!("Failed to create vector array: {}", e)))?;

    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(vector_array),
        Arc::new(StringArray::from(source_urls)),
        Arc::new(StringArray::from(section_titles)),
        Arc::new(StringArray::from(contents)),
        Arc::new(UInt64Array::from(start_chars)),
        Arc::new(UInt64Array::from(end_chars)),
        Arc::new(UInt32Array::from(chunk_indices)),
        Arc::new(UInt32Array::from(total_chunks)),
        Arc::new(UInt32Array::from(token_counts)),
        Arc::new(StringArray::from(created_ats)),
    ];

    RecordBatch::try_new(chunk_schema(vector_dim), arrays)
        .map_err(|e| RagError::Index(format!("Failed to create record batch: {}", e)))
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Index(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| RagError::Index(format!("Invalid {} column type", name)))
}

/// Rebuild matches from a vector search result batch, which must carry `_distance`
#[inline]
pub fn matches_from_batch(batch: &RecordBatch) -> Result<Vec<RetrievedMatch>> {
    let source_urls = column::<StringArray>(batch, "source_url")?;
    let section_titles = column::<StringArray>(batch, "section_title")?;
    let contents = column::<StringArray>(batch, "content")?;
    let start_chars = column::<UInt64Array>(batch, "start_char")?;
    let end_chars = column::<UInt64Array>(batch, "end_char")?;
    let chunk_indices = column::<UInt32Array>(batch, "chunk_index")?;
    let total_chunks = column::<UInt32Array>(batch, "total_chunks")?;

    let distances = column::<Float32Array>(batch, "_distance")?;

    let mut matches = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let url = PageUrl::parse(source_urls.value(row))
            .map_err(|e| RagError::InvalidRecord(format!("{:#}", e)))?;

        let chunk = Chunk::new(
            url,
            section_titles.value(row),
            contents.value(row).to_string(),
            start_chars.value(row) as usize,
            chunk_indices.value(row) as usize,
            total_chunks.value(row) as usize,
        )?;

        if chunk.end_char() as u64 != end_chars.value(row) {
            return Err(RagError::InvalidRecord(format!(
                "stored end_char {} disagrees with content length for {}",
                end_chars.value(row),
                chunk.source_url()
            )));
        }

        if distances.is_null(row) {
            return Err(RagError::Index(format!(
                "search result for {} has no distance",
                chunk.source_url()
            )));
        }
        let distance = distances.value(row);
        matches.push(RetrievedMatch { chunk, distance });
    }

    Ok(matches)
}
