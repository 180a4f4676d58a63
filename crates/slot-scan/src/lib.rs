//! # Slot Scan
//!
//! This crate polls the CoWIN appointment API for vaccination sessions matching a
//! user's criteria and emails a report whenever something is available.
//! It resolves state and district names, queries the calendar endpoints, filters
//! sessions and formats the matches.

/// Criteria, location query, error taxonomy and cycle outcomes
mod scan_types;
pub use scan_types::*;

/// HTTP client and response models for the CoWIN API
pub mod cowin_client;
pub use cowin_client::{CalendarResponse, CowinClient};

/// State and district name resolution
mod location_resolver;
pub use location_resolver::LocationResolver;

/// Session filtering against the search criteria
pub mod filter;

/// Text report of matching sessions
mod report;
pub use report::*;

/// Polling loop
mod executor;
pub use executor::*;

/// Report delivery through an email service
mod notification_service;
pub use notification_service::NotificationServiceImpl;

/// SMTP and logging email services
mod email_service;
pub use email_service::*;
