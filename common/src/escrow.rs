use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::error::EscrowError;
use crate::helpers::{generate_pin, generate_tx_id};
use crate::schema::{
    NewTransaction, ReleaseTrigger, ShippingInfo, Transaction, TransactionStatus, hash_pin,
    verify_pin,
};
use crate::store::{TransactionStore, mutation};

pub const DEFAULT_AUTO_RELEASE_HOURS: i64 = 48;

/// Wrong PINs accepted before confirmation is locked for a transaction.
pub const MAX_PIN_ATTEMPTS: u32 = 5;

const MAX_ID_ATTEMPTS: usize = 5;

/// Result of a successful create; the only place the plaintext PIN appears.
#[derive(Debug, Clone)]
pub struct CreatedTransaction {
    pub id: String,
    pub pin: String,
}

/// Lifecycle rules on top of an injected [`TransactionStore`].
///
/// `CREATED`, `PAID` and `SHIPPED` may follow each other in any order.
/// `RELEASED` is terminal.
#[derive(Clone)]
pub struct Escrow {
    store: Arc<dyn TransactionStore>,
    auto_release_after: Duration,
}

impl Escrow {
    pub fn new(store: Arc<dyn TransactionStore>, auto_release_after: Duration) -> Self {
        Escrow {
            store,
            auto_release_after,
        }
    }

    pub fn auto_release_after(&self) -> Duration {
        self.auto_release_after
    }

    pub async fn create(&self, data: NewTransaction) -> Result<CreatedTransaction, EscrowError> {
        data.validate()?;

        let pin = generate_pin();
        let pin_hash = {
            let pin = pin.clone();
            tokio::task::spawn_blocking(move || hash_pin(&pin))
                .await
                .map_err(|e| anyhow::anyhow!("PIN hashing task failed: {e}"))??
        };

        let mut last_id = String::new();
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let id = generate_tx_id();
            let tx = Transaction::new(id.clone(), pin_hash.clone(), data.clone());
            match self.store.insert(tx).await {
                Ok(()) => {
                    log::info!(
                        "Transaction {} created: product={} amount={}",
                        id,
                        data.product_name,
                        data.price
                    );
                    return Ok(CreatedTransaction { id, pin });
                }
                Err(EscrowError::DuplicateId(id)) => {
                    log::warn!(
                        "Generated id {} already taken (attempt {}/{})",
                        id,
                        attempt,
                        MAX_ID_ATTEMPTS
                    );
                    last_id = id;
                }
                Err(e) => return Err(e),
            }
        }

        log::error!(
            "Could not allocate a unique transaction id after {} attempts",
            MAX_ID_ATTEMPTS
        );
        Err(EscrowError::DuplicateId(last_id))
    }

    pub async fn get(&self, tx_id: &str) -> Result<Transaction, EscrowError> {
        self.store.get(tx_id).await
    }

    pub async fn list(&self) -> Result<Vec<Transaction>, EscrowError> {
        self.store.list().await
    }

    /// Simulated buyer payment. Repeat calls succeed and keep the first `paid_at`.
    pub async fn mark_paid(&self, tx_id: &str) -> Result<Transaction, EscrowError> {
        let now = Utc::now();
        let tx = self
            .store
            .update(
                tx_id,
                mutation(move |tx| {
                    ensure_not_released(tx, "record a payment")?;
                    tx.mark_paid(now);
                    Ok(())
                }),
            )
            .await?;
        log::info!("Transaction {} marked as paid", tx.id);
        Ok(tx)
    }

    /// Records shipment regardless of the current status and (re)starts the
    /// auto-release countdown.
    pub async fn attach_shipment(
        &self,
        tx_id: &str,
        shipping_info: ShippingInfo,
    ) -> Result<Transaction, EscrowError> {
        let now = Utc::now();
        let window = self.auto_release_after;
        let tx = self
            .store
            .update(
                tx_id,
                mutation(move |tx| {
                    ensure_not_released(tx, "record a shipment")?;
                    tx.attach_shipment(shipping_info, now, window);
                    Ok(())
                }),
            )
            .await?;
        log::info!(
            "Transaction {} shipped, auto release at {:?}",
            tx.id,
            tx.auto_release_at
        );
        Ok(tx)
    }

    /// Buyer confirms receipt with the PIN handed out at creation.
    ///
    /// Every attempt is counted before the PIN is checked; a correct PIN
    /// clears the counter. After [`MAX_PIN_ATTEMPTS`] misses the transaction
    /// only releases through the auto-release window.
    pub async fn confirm_receipt(
        &self,
        tx_id: &str,
        pin: &str,
    ) -> Result<Transaction, EscrowError> {
        let current = self
            .store
            .update(
                tx_id,
                mutation(|tx| {
                    if tx.failed_pin_attempts >= MAX_PIN_ATTEMPTS {
                        return Err(EscrowError::PinLocked(tx.id.clone()));
                    }
                    tx.failed_pin_attempts += 1;
                    Ok(())
                }),
            )
            .await?;

        let matches = {
            let pin = pin.trim().to_string();
            let pin_hash = current.pin_hash.clone();
            tokio::task::spawn_blocking(move || verify_pin(&pin, &pin_hash))
                .await
                .map_err(|e| anyhow::anyhow!("PIN verification task failed: {e}"))??
        };
        if !matches {
            log::warn!(
                "Wrong PIN for transaction {} ({}/{} attempts)",
                tx_id,
                current.failed_pin_attempts,
                MAX_PIN_ATTEMPTS
            );
            return Err(EscrowError::InvalidPin(tx_id.to_string()));
        }

        self.store
            .update(
                tx_id,
                mutation(|tx| {
                    tx.failed_pin_attempts = 0;
                    Ok(())
                }),
            )
            .await?;

        let now = Utc::now();
        let tx = self
            .store
            .update(
                tx_id,
                mutation(move |tx| {
                    if tx.status != TransactionStatus::Shipped {
                        return Err(EscrowError::InvalidState {
                            id: tx.id.clone(),
                            status: tx.status,
                            action: "confirm receipt",
                        });
                    }
                    tx.release(ReleaseTrigger::BuyerConfirmed, now);
                    Ok(())
                }),
            )
            .await?;
        log::info!("Transaction {} released by buyer confirmation", tx.id);
        Ok(tx)
    }

    /// Releases every shipped transaction whose window has elapsed at `now`.
    /// Returns the ids that were released.
    pub async fn release_due(&self, now: DateTime<Utc>) -> Result<Vec<String>, EscrowError> {
        let due: Vec<String> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|tx| tx.is_release_due(now))
            .map(|tx| tx.id)
            .collect();

        let mut released = Vec::with_capacity(due.len());
        for tx_id in due {
            let result = self
                .store
                .update(
                    &tx_id,
                    mutation(move |tx| {
                        // state may have moved since the listing
                        if !tx.is_release_due(now) {
                            return Err(EscrowError::InvalidState {
                                id: tx.id.clone(),
                                status: tx.status,
                                action: "auto release",
                            });
                        }
                        tx.release(ReleaseTrigger::AutoRelease, now);
                        Ok(())
                    }),
                )
                .await;

            match result {
                Ok(tx) => {
                    log::info!("Transaction {} auto released", tx.id);
                    released.push(tx.id);
                }
                Err(EscrowError::InvalidState { .. }) => {
                    log::debug!("Transaction {} no longer due for release", tx_id);
                }
                Err(e) => {
                    log::error!("Failed to auto release transaction {}: {}", tx_id, e);
                }
            }
        }

        Ok(released)
    }
}

fn ensure_not_released(tx: &Transaction, action: &'static str) -> Result<(), EscrowError> {
    if tx.is_released() {
        return Err(EscrowError::InvalidState {
            id: tx.id.clone(),
            status: tx.status,
            action,
        });
    }
    Ok(())
}
