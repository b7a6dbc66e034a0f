use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Mutation, TransactionStore, sorted_by_creation};
use crate::error::EscrowError;
use crate::schema::Transaction;

/// Volatile store; everything is lost when the process exits.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    transactions: Arc<RwLock<HashMap<String, Transaction>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for InMemoryStore {
    async fn insert(&self, tx: Transaction) -> Result<(), EscrowError> {
        let mut transactions = self.transactions.write().await;
        match transactions.entry(tx.id.clone()) {
            Entry::Occupied(entry) => Err(EscrowError::DuplicateId(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(tx);
                Ok(())
            }
        }
    }

    async fn get(&self, tx_id: &str) -> Result<Transaction, EscrowError> {
        let transactions = self.transactions.read().await;
        transactions
            .get(tx_id)
            .cloned()
            .ok_or_else(|| EscrowError::NotFound(tx_id.to_string()))
    }

    async fn update(&self, tx_id: &str, mutation: Mutation) -> Result<Transaction, EscrowError> {
        let mut transactions = self.transactions.write().await;
        let stored = transactions
            .get_mut(tx_id)
            .ok_or_else(|| EscrowError::NotFound(tx_id.to_string()))?;

        let mut updated = stored.clone();
        mutation(&mut updated)?;
        *stored = updated.clone();
        Ok(updated)
    }

    async fn list(&self) -> Result<Vec<Transaction>, EscrowError> {
        let transactions = self.transactions.read().await;
        Ok(sorted_by_creation(transactions.values().cloned().collect()))
    }
}
