use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EscrowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Created,
    Paid,
    Shipped,
    Released,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Created => "CREATED",
            TransactionStatus::Paid => "PAID",
            TransactionStatus::Shipped => "SHIPPED",
            TransactionStatus::Released => "RELEASED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What moved a transaction to `RELEASED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReleaseTrigger {
    BuyerConfirmed,
    AutoRelease,
}

/// Courier and payout details recorded by the seller on shipment.
/// Bank fields are kept as supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub courier: String,
    pub tracking_number: String,
    pub bank_name: String,
    pub account_name: String,
    pub account_number: String,
}

/// Seller input for a new escrow transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub product_name: String,
    pub price: f64,
    pub phone_number: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewTransaction {
    /// Only the name length and price are checked; other fields are kept verbatim.
    pub fn validate(&self) -> Result<(), EscrowError> {
        if self.product_name.chars().count() < 3 {
            return Err(EscrowError::Validation(
                "Product name must be at least 3 characters.".into(),
            ));
        }

        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(EscrowError::Validation(
                "Price must be a number greater than zero.".into(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub pin_hash: String,
    pub product: String,
    pub amount: f64,
    pub phone: String,
    pub description: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shipping_info: Option<ShippingInfo>,
    #[serde(default)]
    pub auto_release_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub released_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub release_trigger: Option<ReleaseTrigger>,
    #[serde(default)]
    pub failed_pin_attempts: u32,
}

impl Transaction {
    pub fn new(id: String, pin_hash: String, data: NewTransaction) -> Self {
        Transaction {
            id,
            pin_hash,
            product: data.product_name,
            amount: data.price,
            phone: data.phone_number,
            description: data.description,
            status: TransactionStatus::Created,
            created_at: Utc::now(),
            paid_at: None,
            shipped_at: None,
            shipping_info: None,
            auto_release_at: None,
            released_at: None,
            release_trigger: None,
            failed_pin_attempts: 0,
        }
    }

    pub fn is_released(&self) -> bool {
        self.status == TransactionStatus::Released
    }

    /// Shipped and past its auto-release time.
    pub fn is_release_due(&self, now: DateTime<Utc>) -> bool {
        self.status == TransactionStatus::Shipped
            && self.auto_release_at.is_some_and(|at| at <= now)
    }

    pub fn mark_paid(&mut self, now: DateTime<Utc>) {
        self.status = TransactionStatus::Paid;
        // first payment wins
        self.paid_at.get_or_insert(now);
    }

    pub fn attach_shipment(
        &mut self,
        shipping_info: ShippingInfo,
        now: DateTime<Utc>,
        auto_release_after: chrono::Duration,
    ) {
        self.status = TransactionStatus::Shipped;
        self.shipping_info = Some(shipping_info);
        self.shipped_at = Some(now);
        self.auto_release_at = Some(now + auto_release_after);
    }

    pub fn release(&mut self, trigger: ReleaseTrigger, now: DateTime<Utc>) {
        self.status = TransactionStatus::Released;
        self.released_at = Some(now);
        self.release_trigger = Some(trigger);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shoes() -> NewTransaction {
        NewTransaction {
            product_name: "Shoes".to_string(),
            price: 500.0,
            phone_number: "0811111111".to_string(),
            description: None,
        }
    }

    #[test]
    fn accepts_valid_input() {
        assert!(shoes().validate().is_ok());
    }

    #[test]
    fn phone_number_is_free_form() {
        for phone in ["(081) 111-1111", "081.111.1111", "N/A", ""] {
            let mut data = shoes();
            data.phone_number = phone.to_string();
            assert!(data.validate().is_ok(), "phone {phone:?} should be accepted");
        }
    }

    #[test]
    fn product_name_length_counts_raw_characters() {
        let mut data = shoes();
        data.product_name = " ab ".to_string();
        assert!(data.validate().is_ok());

        data.product_name = "ab".to_string();
        assert!(matches!(data.validate(), Err(EscrowError::Validation(_))));
    }

    #[test]
    fn rejects_non_positive_price() {
        for price in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let mut data = shoes();
            data.price = price;
            assert!(
                matches!(data.validate(), Err(EscrowError::Validation(_))),
                "price {price} should be rejected"
            );
        }
    }

    #[test]
    fn status_serializes_upper_case() {
        let json = serde_json::to_string(&TransactionStatus::Shipped).unwrap();
        assert_eq!(json, "\"SHIPPED\"");
        let trigger = serde_json::to_string(&ReleaseTrigger::BuyerConfirmed).unwrap();
        assert_eq!(trigger, "\"BUYER_CONFIRMED\"");
    }

    #[test]
    fn second_payment_keeps_first_timestamp() {
        let mut tx = Transaction::new("TX-1".into(), "hash".into(), shoes());
        let first = Utc::now();
        tx.mark_paid(first);
        tx.mark_paid(first + chrono::Duration::minutes(5));
        assert_eq!(tx.status, TransactionStatus::Paid);
        assert_eq!(tx.paid_at, Some(first));
    }

    #[test]
    fn shipment_schedules_auto_release() {
        let mut tx = Transaction::new("TX-1".into(), "hash".into(), shoes());
        let now = Utc::now();
        let info = ShippingInfo {
            courier: "Kerry".into(),
            tracking_number: "KR123".into(),
            bank_name: "KBank".into(),
            account_name: "Somchai".into(),
            account_number: "123-4-56789-0".into(),
        };
        tx.attach_shipment(info, now, chrono::Duration::hours(48));

        assert_eq!(tx.auto_release_at, Some(now + chrono::Duration::hours(48)));
        assert!(!tx.is_release_due(now));
        assert!(tx.is_release_due(now + chrono::Duration::hours(48)));
    }
}
