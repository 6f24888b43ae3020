//! Business logic between the HTTP handlers and the store.
//!
//! Handlers validate transport concerns and delegate here; these functions own
//! the domain rules (stage transitions, notification evaluation, aggregates)
//! and return `AppError` for the handler to map onto a response.

pub mod dashboard;
pub mod deals;
pub mod notifications;
pub mod tasks;
