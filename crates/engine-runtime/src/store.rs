use crate::error::{ExecutionError, Result};
use async_trait::async_trait;
use model::{core::identifiers::EntityType, records::row::RowData};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Source of rows for query roots.
#[async_trait]
pub trait QueryStore: Send + Sync {
    /// Every row of `entity`, in storage order.
    async fn rows(&self, entity: &EntityType) -> Result<Vec<RowData>>;
}

/// Rows kept in memory, one table per entity type.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<HashMap<EntityType, Vec<RowData>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `entity` known with no rows.
    pub async fn create_table(&self, entity: EntityType) {
        self.tables.write().await.entry(entity).or_default();
    }

    pub async fn insert(&self, row: RowData) {
        self.tables
            .write()
            .await
            .entry(row.entity.clone())
            .or_default()
            .push(row);
    }

    pub async fn extend(&self, rows: impl IntoIterator<Item = RowData>) {
        let mut tables = self.tables.write().await;
        for row in rows {
            tables.entry(row.entity.clone()).or_default().push(row);
        }
    }
}

#[async_trait]
impl QueryStore for InMemoryStore {
    async fn rows(&self, entity: &EntityType) -> Result<Vec<RowData>> {
        self.tables
            .read()
            .await
            .get(entity)
            .cloned()
            .ok_or_else(|| ExecutionError::UnknownEntity(entity.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::value::Value;

    #[tokio::test]
    async fn test_rows_per_entity() {
        let store = InMemoryStore::new();
        let user = EntityType::from("User");
        store
            .extend([
                RowData::new(user.clone(), [("id", Value::Int(1))]),
                RowData::new(user.clone(), [("id", Value::Int(2))]),
            ])
            .await;
        store.create_table(EntityType::from("Article")).await;

        assert_eq!(store.rows(&user).await.unwrap().len(), 2);
        assert!(store.rows(&EntityType::from("Article")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_entity() {
        let store = InMemoryStore::new();
        let err = store.rows(&EntityType::from("Ghost")).await.unwrap_err();
        assert!(matches!(err, ExecutionError::UnknownEntity(_)));
    }
}
