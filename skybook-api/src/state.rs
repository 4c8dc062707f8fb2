use std::sync::Arc;
use std::time::Duration;

use skybook_booking::{BookingLedger, PaymentLedger, Reconciler, SeatInventory};
use skybook_catalog::{FlightCatalog, RouteCatalog};
use skybook_core::Store;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
    /// Lower-cased emails that register as ADMIN.
    pub admin_emails: Vec<String>,
}

impl AuthConfig {
    pub fn new(secret: impl Into<String>, expiration: u64, admin_emails: &[String]) -> Self {
        Self {
            secret: secret.into(),
            expiration,
            admin_emails: admin_emails.iter().map(|e| e.trim().to_lowercase()).collect(),
        }
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|e| *e == email)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub flights: FlightCatalog,
    pub routes: RouteCatalog,
    pub inventory: SeatInventory,
    pub ledger: BookingLedger,
    pub payments: PaymentLedger,
    pub reconciler: Reconciler,
    pub auth: AuthConfig,
    /// Upper bound for one unit of work against the store.
    pub timeout: Duration,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, auth: AuthConfig, timeout: Duration) -> Self {
        Self {
            flights: FlightCatalog::new(store.clone(), timeout),
            routes: RouteCatalog::new(store.clone(), timeout),
            inventory: SeatInventory::new(store.clone(), timeout),
            ledger: BookingLedger::new(store.clone(), timeout),
            payments: PaymentLedger::new(store.clone(), timeout),
            reconciler: Reconciler::new(store.clone(), timeout),
            store,
            auth,
            timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_email_match_ignores_case_and_spaces() {
        let auth = AuthConfig::new("secret", 60, &[" Ops@Skybook.test ".to_string()]);
        assert!(auth.is_admin_email("ops@skybook.test"));
        assert!(auth.is_admin_email("  OPS@SKYBOOK.TEST"));
        assert!(!auth.is_admin_email("ops@skybook.dev"));
    }
}
