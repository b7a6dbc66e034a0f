mod file;
mod memory;

pub use file::*;
pub use memory::*;

use async_trait::async_trait;

use crate::error::EscrowError;
use crate::schema::Transaction;

/// In-place change applied to a stored transaction under the store lock.
/// Returning an error aborts the change and leaves the record untouched.
pub type Mutation = Box<dyn FnOnce(&mut Transaction) -> Result<(), EscrowError> + Send>;

/// Boxes a closure as a [`Mutation`].
pub fn mutation<F>(f: F) -> Mutation
where
    F: FnOnce(&mut Transaction) -> Result<(), EscrowError> + Send + 'static,
{
    Box::new(f)
}

/// Backend holding transaction records keyed by id.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Fails with [`EscrowError::DuplicateId`] when the id is already taken.
    async fn insert(&self, tx: Transaction) -> Result<(), EscrowError>;

    async fn get(&self, tx_id: &str) -> Result<Transaction, EscrowError>;

    /// Applies `mutation` atomically and returns the updated record.
    async fn update(&self, tx_id: &str, mutation: Mutation) -> Result<Transaction, EscrowError>;

    /// All records, oldest first.
    async fn list(&self) -> Result<Vec<Transaction>, EscrowError>;
}

pub(crate) fn sorted_by_creation(mut transactions: Vec<Transaction>) -> Vec<Transaction> {
    transactions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    transactions
}
