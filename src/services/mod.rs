pub mod checkout;
pub mod payments;
pub mod recurrence;
pub mod subscriptions;
