pub mod inventory;
pub mod ledger;
pub mod payments;
pub mod reconcile;

pub use inventory::{ReleasedSeats, ReservedSeats, SeatInventory};
pub use ledger::{BookingChange, BookingLedger, BookingRequest, CancelledBooking, PartialCancellation};
pub use payments::{PaymentLedger, PaymentRequest};
pub use reconcile::{ReconciliationReport, Reconciler};
