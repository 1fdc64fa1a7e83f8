
use super::EmbeddingRecord;
use crate::config::Config;
use crate::loader::DocumentMetadata;
use crate::{RagError, Result};
use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use itertools::{Itertools, izip};
use lancedb::{
    Connection, Table,
    query::{ExecutableQuery, QueryBase},
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Vector database store using LanceDB for similarity search
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    vector_dimension: Option<usize>,
}

/// Search result from vector similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
    /// L2 distance to the query vector, smaller is nearer
    pub distance: f32,
}

impl VectorStore {
    /// Open the store configured for this application
    ///
    /// Drops the existing table first when `store.reset_on_start` is set.
    #[inline]
    pub async fn from_config(config: &Config) -> Result<Self> {
        let mut store =
            Self::open(&config.vector_database_path(), &config.store.table_name).await?;
        if config.store.reset_on_start {
            store.reset().await?;
        }
        Ok(store)
    }

    /// Connect to the LanceDB database at `db_path`
    ///
    /// # Arguments
    /// * `db_path` - Directory holding the database, created if missing
    /// * `table_name` - Table the records are kept in
    #[inline]
    pub async fn open(db_path: &Path, table_name: &str) -> Result<Self> {
        debug!("Initializing LanceDB at path: {:?}", db_path);

        std::fs::create_dir_all(db_path).map_err(|e| {
            RagError::Store(format!("Failed to create vector database directory: {}", e))
        })?;

        let uri = db_path.to_string_lossy();
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to connect to LanceDB: {}", e)))?;

        let mut store = Self {
            connection,
            table_name: table_name.to_string(),
            vector_dimension: None,
        };

        if store.table_exists().await? {
            let dim = store.detect_existing_vector_dimension().await?;
            info!("Opened existing table {} with {} dimensions", table_name, dim);
            store.vector_dimension = Some(dim);
        }

        Ok(store)
    }

    #[inline]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

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
            .map_err(|e| RagError::Store(format!("Failed to list tables: {}", e)))?;
        Ok(table_names.contains(&self.table_name))
    }

    async fn open_table(&self) -> Result<Table> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to open table: {}", e)))
    }

    /// Detect vector dimension from existing table schema
    async fn detect_existing_vector_dimension(&self) -> Result<usize> {
        let schema = self
            .open_table()
            .await?
            .schema()
            .await
            .map_err(|e| RagError::Store(format!("Failed to get table schema: {}", e)))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return Ok(*size as usize);
                }
            }
        }

        Err(RagError::Store(
            "Could not find vector column or determine dimension".to_string(),
        ))
    }

    /// Create schema with the specified vector dimension
    fn create_schema(vector_dim: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    vector_dim as i32,
                ),
                false,
            ),
            Field::new("text", DataType::Utf8, false),
            Field::new("source", DataType::Utf8, false),
            Field::new("page", DataType::UInt32, true),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    /// Insert one record per index of the four parallel sequences
    ///
    /// Records whose id is already stored are replaced.
    #[inline]
    pub async fn add_documents(
        &mut self,
        texts: &[String],
        metadatas: &[DocumentMetadata],
        ids: &[String],
        vectors: &[Vec<f32>],
    ) -> Result<()> {
        check_lengths(texts, metadatas, ids, vectors)?;

        let records = izip!(texts, metadatas, ids, vectors)
            .map(|(text, metadata, id, vector)| {
                EmbeddingRecord::new(id.clone(), text.clone(), vector.clone(), metadata.clone())
            })
            .collect();

        self.store_embeddings_batch(records).await
    }

    /// Make the four parallel sequences the whole contents of the store
    ///
    /// Records from earlier documents are removed even where the new document
    /// has fewer chunks.
    #[inline]
    pub async fn replace_documents(
        &mut self,
        texts: &[String],
        metadatas: &[DocumentMetadata],
        ids: &[String],
        vectors: &[Vec<f32>],
    ) -> Result<()> {
        check_lengths(texts, metadatas, ids, vectors)?;
        self.reset().await?;
        self.add_documents(texts, metadatas, ids, vectors).await
    }

    /// Store multiple embeddings in a batch, replacing rows with the same ids
    #[inline]
    pub async fn store_embeddings_batch(&mut self, records: Vec<EmbeddingRecord>) -> Result<()> {
        if records.is_empty() {
            debug!("No embeddings to store");
            return Ok(());
        }

        let vector_dim = records[0].vector.len();
        if vector_dim == 0 {
            return Err(RagError::Store("Cannot store empty vectors".to_string()));
        }
        if let Some(record) = records.iter().find(|r| r.vector.len() != vector_dim) {
            return Err(RagError::Store(format!(
                "Inconsistent vector dimensions: {} has {}, expected {}",
                record.id,
                record.vector.len(),
                vector_dim
            )));
        }

        debug!("Storing batch of {} embeddings", records.len());
        self.ensure_table(vector_dim).await?;

        let table = self.open_table().await?;
        Self::delete_ids(&table, &records).await?;

        let record_batch = Self::create_record_batch(&records, vector_dim)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to insert embeddings: {}", e)))?;

        info!("Successfully stored {} embeddings", records.len());
        Ok(())
    }

    /// Create the table at `vector_dim`, recreating it if the dimension changed
    async fn ensure_table(&mut self, vector_dim: usize) -> Result<()> {
        match self.vector_dimension {
            Some(dim) if dim == vector_dim => return Ok(()),
            Some(dim) => {
                warn!(
                    "Vector dimension changed from {} to {}, recreating table",
                    dim, vector_dim
                );
                self.drop_table_if_exists().await?;
            }
            None => {}
        }

        self.connection
            .create_empty_table(&self.table_name, Self::create_schema(vector_dim))
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to create table: {}", e)))?;

        self.vector_dimension = Some(vector_dim);
        info!(
            "Created table {} with {} dimensions",
            self.table_name, vector_dim
        );
        Ok(())
    }

    async fn delete_ids(table: &Table, records: &[EmbeddingRecord]) -> Result<()> {
        let id_list = records
            .iter()
            .map(|r| format!("'{}'", r.id.replace('\'', "''")))
            .join(", ");
        let predicate = format!("id IN ({})", id_list);

        table
            .delete(&predicate)
            .await
            .map_err(|e| RagError::Store(format!("Failed to replace existing records: {}", e)))?;
        Ok(())
    }

    /// Create a RecordBatch from embedding records
    fn create_record_batch(records: &[EmbeddingRecord], vector_dim: usize) -> Result<RecordBatch> {
        let len = records.len();

        let mut ids = Vec::with_capacity(len);
        let mut texts = Vec::with_capacity(len);
        let mut sources = Vec::with_capacity(len);
        let mut pages = Vec::with_capacity(len);
        let mut created_ats = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * vector_dim);

        for record in records {
            ids.push(record.id.as_str());
            texts.push(record.text.as_str());
            sources.push(record.metadata.source.as_str());
            pages.push(record.metadata.page);
            created_ats.push(record.created_at.as_str());
            flat_values.extend_from_slice(&record.vector);
        }

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let vector_array =
            FixedSizeListArray::try_new(field, vector_dim as i32, Arc::new(values_array), None)
                .map_err(|e| RagError::Store(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(texts)),
            Arc::new(StringArray::from(sources)),
            Arc::new(UInt32Array::from(pages)),
            Arc::new(StringArray::from(created_ats)),
        ];

        RecordBatch::try_new(Self::create_schema(vector_dim), arrays)
            .map_err(|e| RagError::Store(format!("Failed to create record batch: {}", e)))
    }

    /// Return up to `n_results` stored chunks ordered by distance to `query_vector`
    ///
    /// An empty store yields an empty list.
    #[inline]
    pub async fn query_documents(
        &self,
        query_vector: &[f32],
        n_results: usize,
    ) -> Result<Vec<SearchResult>> {
        debug!("Searching for similar vectors with limit: {}", n_results);

        let Some(dim) = self.vector_dimension else {
            debug!("Table {} does not exist yet", self.table_name);
            return Ok(Vec::new());
        };

        if query_vector.len() != dim {
            return Err(RagError::Store(format!(
                "Query vector has {} dimensions, stored vectors have {}",
                query_vector.len(),
                dim
            )));
        }

        let table = self.open_table().await?;
        let row_count = table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Store(format!("Failed to count rows: {}", e)))?;
        if row_count == 0 || n_results == 0 {
            return Ok(Vec::new());
        }

        let mut results = table
            .vector_search(query_vector)
            .map_err(|e| RagError::Store(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(n_results)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to execute search: {}", e)))?;

        let mut search_results = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| RagError::Store(format!("Failed to read result stream: {}", e)))?
        {
            search_results.extend(Self::parse_search_batch(&batch)?);
        }

        search_results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        search_results.truncate(n_results);

        debug!("Found {} search results", search_results.len());
        Ok(search_results)
    }

    /// Parse a single record batch from search results
    fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>> {
        let ids = string_column(batch, "id")?;
        let texts = string_column(batch, "text")?;
        let sources = string_column(batch, "source")?;

        let pages = batch
            .column_by_name("page")
            .ok_or_else(|| RagError::Store("Missing page column".to_string()))?
            .as_any()
            .downcast_ref::<UInt32Array>()
            .ok_or_else(|| RagError::Store("Invalid page column type".to_string()))?;

        let distances = batch
            .column_by_name("_distance")
            .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

        let results = (0..batch.num_rows())
            .map(|row| SearchResult {
                id: ids.value(row).to_string(),
                text: texts.value(row).to_string(),
                metadata: DocumentMetadata {
                    source: sources.value(row).to_string(),
                    page: (!pages.is_null(row)).then(|| pages.value(row)),
                },
                distance: distances.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) }),
            })
            .collect();

        Ok(results)
    }

    /// Get the total number of embeddings stored
    #[inline]
    pub async fn count(&self) -> Result<usize> {
        if self.vector_dimension.is_none() {
            return Ok(0);
        }

        self.open_table()
            .await?
            .count_rows(None)
            .await
            .map_err(|e| RagError::Store(format!("Failed to count rows: {}", e)))
    }

    /// Remove every stored record
    #[inline]
    pub async fn reset(&mut self) -> Result<()> {
        self.drop_table_if_exists().await?;
        self.vector_dimension = None;
        Ok(())
    }

    /// Drop the embeddings table if it exists
    async fn drop_table_if_exists(&self) -> Result<()> {
        if self.table_exists().await? {
            info!("Dropping existing table {}", self.table_name);
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| RagError::Store(format!("Failed to drop table: {}", e)))?;
        }

        Ok(())
    }
}

fn check_lengths(
    texts: &[String],
    metadatas: &[DocumentMetadata],
    ids: &[String],
    vectors: &[Vec<f32>],
) -> Result<()> {
    if texts.len() != metadatas.len() || texts.len() != ids.len() || texts.len() != vectors.len() {
        return Err(RagError::Store(format!(
            "Mismatched input lengths: {} texts, {} metadatas, {} ids, {} vectors",
            texts.len(),
            metadatas.len(),
            ids.len(),
            vectors.len()
        )));
    }
    Ok(())
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Store(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| RagError::Store(format!("Invalid {} column type", name)))
}
