#[cfg(test)]
mod tests;

use arrow::array::RecordBatchIterator;
use arrow::datatypes::DataType;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::{
    Connection, Table,
    query::{ExecutableQuery, QueryBase},
};
use std::path::Path;
use tracing::{debug, info};

use super::{TABLE_NAME, chunk_schema, matches_from_batch, to_record_batch};
use crate::database::{RetrievedMatch, StoredChunk, VectorStore};
use crate::{RagError, Result};

/// Persistent vector store backed by a LanceDB directory
///
/// The chunk table is created on the first insert, sized to the dimension
/// of the first vector seen. Later inserts must match that dimension.
pub struct LanceStore {
    connection: Connection,
    vector_dimension: Option<usize>,
}

impl LanceStore {
    /// Open (or create) the database directory at `path`
    #[inline]
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db_path = path.as_ref();
        debug!("Opening LanceDB at path: {:?}", db_path);

        std::fs::create_dir_all(db_path)?;

        let uri = db_path.to_string_lossy().into_owned();
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| RagError::Index(format!("Failed to connect to LanceDB: {}", e)))?;

        let mut store = Self {
            connection,
            vector_dimension: None,
        };

        if let Some(table) = store.open_existing().await? {
            let dim = detect_vector_dimension(&table).await?;
            info!("Opened chunk table with {} dimensions", dim);
            store.vector_dimension = Some(dim);
        }

        Ok(store)
    }

    /// Dimension of stored vectors, once the table exists
    #[inline]
    pub fn vector_dimension(&self) -> Option<usize> {
        self.vector_dimension
    }

    async fn table_exists(&self) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Index(format!("Failed to list tables: {}", e)))?;

        Ok(table_names.iter().any(|name| name == TABLE_NAME))
    }

    async fn open_existing(&self) -> Result<Option<Table>> {
        if !self.table_exists().await? {
            return Ok(None);
        }

        let table = self
            .connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| RagError::Index(format!("Failed to open table: {}", e)))?;

        Ok(Some(table))
    }

    async fn create_table(&mut self, vector_dim: usize) -> Result<()> {
        info!("Creating chunk table with {} dimensions", vector_dim);

        self.connection
            .create_empty_table(TABLE_NAME, chunk_schema(vector_dim))
            .execute()
            .await
            .map_err(|e| RagError::Index(format!("Failed to create table: {}", e)))?;

        self.vector_dimension = Some(vector_dim);
        Ok(())
    }
}

async fn detect_vector_dimension(table: &Table) -> Result<usize> {
    let schema = table
        .schema()
        .await
        .map_err(|e| RagError::Index(format!("Failed to get table schema: {}", e)))?;

    for field in schema.fields() {
        if field.name() == "vector" {
            if let DataType::FixedSizeList(_, size) = field.data_type() {
                return Ok(*size as usize);
            }
        }
    }

    Err(RagError::Index(
        "Could not find vector column or determine dimension".to_string(),
    ))
}

#[async_trait]
impl VectorStore for LanceStore {
    async fn count(&self) -> Result<usize> {
        let Some(table) = self.open_existing().await? else {
            return Ok(0);
        };

        table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Index(format!("Failed to count rows: {}", e)))
    }

    async fn add(&mut self, records: Vec<StoredChunk>) -> Result<()> {
        let Some(first) = records.first() else {
            debug!("No chunks to store");
            return Ok(());
        };

        let vector_dim = match self.vector_dimension {
            Some(dim) => dim,
            None => {
                let dim = first.vector.len();
                if dim == 0 {
                    return Err(RagError::Index("Cannot store empty vectors".to_string()));
                }
                self.create_table(dim).await?;
                dim
            }
        };

        let batch = to_record_batch(&records, vector_dim)?;

        let table = self
            .open_existing()
            .await?
            .ok_or_else(|| RagError::Index(format!("Table {} disappeared", TABLE_NAME)))?;

        let schema = batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RagError::Index(format!("Failed to insert chunks: {}", e)))?;

        debug!("Stored {} chunks", records.len());
        Ok(())
    }

    async fn nearest(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedMatch>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let Some(table) = self.open_existing().await? else {
            return Ok(Vec::new());
        };

        if let Some(dim) = self.vector_dimension {
            if dim != vector.len() {
                return Err(RagError::Index(format!(
                    "query dimension {} does not match table dimension {}",
                    vector.len(),
                    dim
                )));
            }
        }

        let mut results = table
            .vector_search(vector)
            .map_err(|e| RagError::Index(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(k)
            .execute()
            .await
            .map_err(|e| RagError::Index(format!("Failed to execute search: {}", e)))?;

        let mut matches = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| RagError::Index(format!("Failed to read result stream: {}", e)))?
        {
            matches.extend(matches_from_batch(&batch)?);
        }

        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        matches.truncate(k);

        debug!("Search returned {} matches", matches.len());
        Ok(matches)
    }

    async fn clear(&mut self) -> Result<()> {
        if self.table_exists().await? {
            info!("Dropping chunk table");
            self.connection
                .drop_table(TABLE_NAME)
                .await
                .map_err(|e| RagError::Index(format!("Failed to drop table: {}", e)))?;
        }

        self.vector_dimension = None;
        Ok(())
    }
}
