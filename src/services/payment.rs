use std::sync::Arc;
use uuid::Uuid;

use crate::errors::LedgerError;
use crate::models::payment::{Payment, PaymentStatus};
use crate::services::clock::Clock;

/// Where money would actually move. A real processor confirms
/// asynchronously; that reconciliation is not handled here.
pub trait PaymentGateway: Send + Sync {
    fn charge(&self, subscription_id: Uuid, amount: i64) -> PaymentStatus;
}

/// Settles every charge on the spot.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantSettlement;

impl PaymentGateway for InstantSettlement {
    fn charge(&self, _subscription_id: Uuid, _amount: i64) -> PaymentStatus {
        PaymentStatus::Succeeded
    }
}

#[derive(Clone)]
pub struct PaymentRecorder {
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
}

impl PaymentRecorder {
    pub fn new(gateway: Arc<dyn PaymentGateway>, clock: Arc<dyn Clock>) -> Self {
        Self { gateway, clock }
    }

    /// Builds the payment row for `subscription_id`.
    ///
    /// Nothing is persisted here: the caller writes the returned payment in
    /// the same atomic unit as its subscription.
    pub fn record_payment(&self, subscription_id: Uuid, amount: i64) -> Result<Payment, LedgerError> {
        let status = self.gateway.charge(subscription_id, amount);
        if status != PaymentStatus::Succeeded {
            log::warn!(
                "payment_declined subscription_id={} amount_cents={} status={}",
                subscription_id, amount, status
            );
            return Err(LedgerError::PaymentDeclined { subscription_id });
        }

        let payment = Payment::new(subscription_id, amount, status, self.clock.now());
        log::debug!(
            "payment_recorded payment_id={} subscription_id={} amount_cents={}",
            payment.id, subscription_id, amount
        );
        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clock::ManualClock;
    use chrono::Utc;

    struct Decline;

    impl PaymentGateway for Decline {
        fn charge(&self, _subscription_id: Uuid, _amount: i64) -> PaymentStatus {
            PaymentStatus::Failed
        }
    }

    #[test]
    fn test_instant_settlement_records_succeeded_payment() {
        let now = Utc::now();
        let recorder = PaymentRecorder::new(Arc::new(InstantSettlement), Arc::new(ManualClock::new(now)));
        let subscription_id = Uuid::new_v4();

        let payment = recorder.record_payment(subscription_id, 3000).unwrap();
        assert_eq!(payment.subscription_id, subscription_id);
        assert_eq!(payment.amount, 3000);
        assert_eq!(payment.status, PaymentStatus::Succeeded);
        assert_eq!(payment.paid_at, now);
    }

    #[test]
    fn test_declined_charge_is_an_error() {
        let recorder = PaymentRecorder::new(Arc::new(Decline), Arc::new(ManualClock::new(Utc::now())));
        let err = recorder.record_payment(Uuid::new_v4(), 3000).unwrap_err();
        assert!(matches!(err, LedgerError::PaymentDeclined { .. }));
    }
}
