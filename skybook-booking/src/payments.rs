use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use skybook_core::{bounded, check_money_scale, CoreError, CoreResult, NewPayment, Payment, PaymentStatus, Store};

#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub booking_id: i64,
    pub user_id: i64,
    pub amount: Decimal,
    pub payment_status: PaymentStatus,
    /// Defaults to the time of recording.
    pub payment_date: Option<DateTime<Utc>>,
}

/// Payment attempts recorded against bookings.
///
/// Payment status never drives booking status.
#[derive(Clone)]
pub struct PaymentLedger {
    store: Arc<dyn Store>,
    timeout: Duration,
}

impl PaymentLedger {
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn add_payment(&self, request: PaymentRequest) -> CoreResult<Payment> {
        if request.amount <= Decimal::ZERO {
            return Err(CoreError::ValidationError("amount must be greater than 0".to_string()));
        }
        check_money_scale("amount", request.amount)?;
        let payment = NewPayment {
            booking_id: request.booking_id,
            user_id: request.user_id,
            amount: request.amount,
            payment_status: request.payment_status,
            payment_date: request.payment_date.unwrap_or_else(Utc::now),
        };

        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.get_booking(payment.booking_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Booking {}", payment.booking_id)))?;
            tx.get_user(payment.user_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("User {}", payment.user_id)))?;
            let created = tx.insert_payment(&payment).await?;
            tx.commit().await?;
            info!(
                payment_id = created.payment_id,
                booking_id = created.booking_id,
                status = %created.payment_status,
                "Payment recorded"
            );
            Ok(created)
        })
        .await
    }

    pub async fn get_payment(&self, payment_id: i64) -> CoreResult<Payment> {
        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.get_payment(payment_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Payment {}", payment_id)))
        })
        .await
    }

    /// The only operation that changes `payment_status`.
    pub async fn update_payment_status(&self, payment_id: i64, status: PaymentStatus) -> CoreResult<Payment> {
        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let updated = tx
                .set_payment_status(payment_id, status)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Payment {}", payment_id)))?;
            tx.commit().await?;
            info!(payment_id, status = %status, "Payment status updated");
            Ok(updated)
        })
        .await
    }

    pub async fn delete_payment(&self, payment_id: i64) -> CoreResult<()> {
        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            if !tx.delete_payment(payment_id).await? {
                return Err(CoreError::NotFound(format!("Payment {}", payment_id)));
            }
            tx.commit().await?;
            info!(payment_id, "Payment deleted");
            Ok(())
        })
        .await
    }

    /// Payments for a booking in payment-date order.
    pub async fn payments_for_booking(&self, booking_id: i64) -> CoreResult<Vec<Payment>> {
        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.get_booking(booking_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Booking {}", booking_id)))?;
            Ok(tx.booking_payments(booking_id).await?)
        })
        .await
    }
}
