use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;

use super::{Mutation, TransactionStore, sorted_by_creation};
use crate::error::EscrowError;
use crate::schema::Transaction;

/// Store persisted as a single JSON object (`id -> transaction`) on disk.
///
/// The whole map lives in memory. Every successful mutation rewrites the file
/// through a sibling `.tmp` file that is then renamed over the store file.
pub struct JsonFileStore {
    path: PathBuf,
    transactions: Mutex<HashMap<String, Transaction>>,
}

impl JsonFileStore {
    /// Load the store from disk, creating the file if it doesn't exist.
    pub async fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_buf = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(&path_buf)
            .await
            .with_context(|| format!("Failed to open `{}` for reading", path_buf.display()))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .await
            .with_context(|| format!("Failed to read contents of `{}`", path_buf.display()))?;

        let transactions: HashMap<String, Transaction> = if contents.trim().is_empty() {
            HashMap::new()
        } else {
            serde_json::from_str(&contents)
                .with_context(|| format!("Invalid JSON in `{}`", path_buf.display()))?
        };
        log::info!(
            "Loaded {} transactions from `{}`",
            transactions.len(),
            path_buf.display()
        );

        Ok(JsonFileStore {
            path: path_buf,
            transactions: Mutex::new(transactions),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, transactions: &HashMap<String, Transaction>) -> anyhow::Result<()> {
        let data =
            serde_json::to_vec_pretty(transactions).context("Failed to serialize transactions")?;

        let mut tmp_path = self.path.clone().into_os_string();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)
            .await
            .with_context(|| format!("Could not open file `{}`", tmp_path.display()))?;
        file.write_all(&data)
            .await
            .context("Failed to write to temp file")?;
        file.flush().await.context("Failed to flush temp file")?;
        file.sync_all().await.context("Failed to sync temp file")?;
        drop(file);

        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace `{}`", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl TransactionStore for JsonFileStore {
    async fn insert(&self, tx: Transaction) -> Result<(), EscrowError> {
        let mut guard = self.transactions.lock().await;
        if guard.contains_key(&tx.id) {
            return Err(EscrowError::DuplicateId(tx.id));
        }

        let id = tx.id.clone();
        guard.insert(id.clone(), tx);
        if let Err(e) = self.persist(&guard).await {
            guard.remove(&id);
            return Err(e.context(format!("Failed to persist transaction {id}")).into());
        }
        Ok(())
    }

    async fn get(&self, tx_id: &str) -> Result<Transaction, EscrowError> {
        let guard = self.transactions.lock().await;
        guard
            .get(tx_id)
            .cloned()
            .ok_or_else(|| EscrowError::NotFound(tx_id.to_string()))
    }

    async fn update(&self, tx_id: &str, mutation: Mutation) -> Result<Transaction, EscrowError> {
        let mut guard = self.transactions.lock().await;
        let previous = guard
            .get(tx_id)
            .cloned()
            .ok_or_else(|| EscrowError::NotFound(tx_id.to_string()))?;

        let mut updated = previous.clone();
        mutation(&mut updated)?;
        guard.insert(tx_id.to_string(), updated.clone());

        if let Err(e) = self.persist(&guard).await {
            guard.insert(tx_id.to_string(), previous);
            return Err(e
                .context(format!("Failed to persist update of transaction {tx_id}"))
                .into());
        }
        Ok(updated)
    }

    async fn list(&self) -> Result<Vec<Transaction>, EscrowError> {
        let guard = self.transactions.lock().await;
        Ok(sorted_by_creation(guard.values().cloned().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{NewTransaction, TransactionStatus};
    use crate::store::mutation;
    use tempfile::tempdir;

    fn sample(id: &str) -> Transaction {
        Transaction::new(
            id.to_string(),
            "hash".to_string(),
            NewTransaction {
                product_name: "Guitar".to_string(),
                price: 3500.0,
                phone_number: "0899999999".to_string(),
                description: None,
            },
        )
    }

    #[tokio::test]
    async fn open_creates_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        assert!(path.exists());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let store = JsonFileStore::open(&path).await.unwrap();
            store.insert(sample("TX-1")).await.unwrap();
            store
                .update(
                    "TX-1",
                    mutation(|tx| {
                        tx.status = TransactionStatus::Paid;
                        Ok(())
                    }),
                )
                .await
                .unwrap();
        }

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let tx = reopened.get("TX-1").await.unwrap();
        assert_eq!(tx.status, TransactionStatus::Paid);
        assert_eq!(tx.pin_hash, "hash");
    }

    #[tokio::test]
    async fn invalid_json_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let err = JsonFileStore::open(&path).await.err().unwrap();
        assert!(format!("{err:#}").contains("Invalid JSON"));
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("store.json"))
            .await
            .unwrap();
        store.insert(sample("TX-1")).await.unwrap();
        assert!(matches!(
            store.insert(sample("TX-1")).await,
            Err(EscrowError::DuplicateId(_))
        ));
    }

    #[tokio::test]
    async fn failed_mutation_is_not_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        store.insert(sample("TX-1")).await.unwrap();
        let on_disk = tokio::fs::read(&path).await.unwrap();

        let result = store
            .update(
                "TX-1",
                mutation(|tx| {
                    tx.status = TransactionStatus::Paid;
                    Err(EscrowError::Validation("rejected".to_string()))
                }),
            )
            .await;
        assert!(matches!(result, Err(EscrowError::Validation(_))));

        assert_eq!(
            store.get("TX-1").await.unwrap().status,
            TransactionStatus::Created
        );
        assert_eq!(tokio::fs::read(&path).await.unwrap(), on_disk);

        drop(store);
        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get("TX-1").await.unwrap().status,
            TransactionStatus::Created
        );
    }
}
