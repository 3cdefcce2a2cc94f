//! Core library for the payment-gated job application portal.
//!
//! Applicants pay a fixed fee through Paystack, receive a time-limited access
//! grant recorded in the access ledger, and may then submit the application
//! form. The workflow modules hold all business logic behind storage and
//! gateway traits so they can be exercised without a network or database.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
