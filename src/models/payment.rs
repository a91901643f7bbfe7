use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PaymentStatus::Pending),
            "succeeded" => Some(PaymentStatus::Succeeded),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of the money taken for one subscription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub amount: i64,
    pub paid_at: DateTime<Utc>,
    pub status: PaymentStatus,
}

impl Payment {
    pub fn new(subscription_id: Uuid, amount: i64, status: PaymentStatus, paid_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            subscription_id,
            amount,
            paid_at,
            status,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.status == PaymentStatus::Succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_creation() {
        let subscription_id = Uuid::new_v4();
        let payment = Payment::new(subscription_id, 3000, PaymentStatus::Succeeded, Utc::now());
        assert_eq!(payment.subscription_id, subscription_id);
        assert_ne!(payment.id, subscription_id);
        assert!(payment.is_settled());
    }

    #[test]
    fn test_status_round_trip_literals() {
        for status in [PaymentStatus::Pending, PaymentStatus::Succeeded, PaymentStatus::Failed] {
            assert_eq!(PaymentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(serde_json::to_string(&PaymentStatus::Succeeded).unwrap(), "\"succeeded\"");
    }
}
