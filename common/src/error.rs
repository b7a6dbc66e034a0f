use thiserror::Error;

use crate::schema::TransactionStatus;

#[derive(Error, Debug)]
pub enum EscrowError {
    #[error("Transaction `{0}` not found")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("Invalid PIN for transaction `{0}`")]
    InvalidPin(String),
    #[error("Too many failed PIN attempts for transaction `{0}`")]
    PinLocked(String),
    #[error("Transaction `{id}` is {status}, cannot {action}")]
    InvalidState {
        id: String,
        status: TransactionStatus,
        action: &'static str,
    },
    #[error("Transaction id `{0}` already exists")]
    DuplicateId(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
