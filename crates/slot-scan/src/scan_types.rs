use std::fmt;

use chrono::NaiveDate;

use crate::executor::NotificationError;

/// Date format used by the CoWIN API and the command line (`DD-MM-YYYY`)
pub const API_DATE_FORMAT: &str = "%d-%m-%Y";

/// Where to look for appointments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationQuery {
    /// Search a single postal (PIN) code
    PostalCode(String),
    /// Search a whole district, resolved from its state and district names
    District {
        /// Human readable state name, e.g. "Karnataka"
        state: String,
        /// Human readable district name, e.g. "BBMP"
        district: String,
    },
}

/// Which dose the user is looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dose {
    /// First dose
    #[default]
    First,
    /// Second dose
    Second,
}

impl TryFrom<u8> for Dose {
    type Error = ScanError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Dose::First),
            2 => Ok(Dose::Second),
            other => Err(ScanError::Config(format!(
                "dose must be 1 or 2, got {}",
                other
            ))),
        }
    }
}

/// Vaccine brand preference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaccinePreference {
    /// COVISHIELD
    Covishield,
    /// COVAXIN
    Covaxin,
}

impl VaccinePreference {
    /// Name as the API spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            VaccinePreference::Covishield => "covishield",
            VaccinePreference::Covaxin => "covaxin",
        }
    }
}

/// Fee preference, evaluated per center
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeePreference {
    /// Only free centers
    Free,
    /// Only paid centers
    Paid,
}

impl FeePreference {
    /// Name as the API spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            FeePreference::Free => "free",
            FeePreference::Paid => "paid",
        }
    }
}

/// Eligibility and preference filter applied to every poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    /// Age of the person looking for a slot
    pub age: u32,
    /// Dose number
    pub dose: Dose,
    /// Minimum number of free doses a session must have
    pub quantity: u32,
    /// Vaccine brand, `None` accepts any
    pub vaccine: Option<VaccinePreference>,
    /// Fee type, `None` accepts any
    pub fee: Option<FeePreference>,
    /// First day of the week to query
    pub date: NaiveDate,
}

impl SearchCriteria {
    /// Criteria with the default dose, quantity and no preferences
    pub fn new(age: u32, date: NaiveDate) -> Self {
        Self {
            age,
            dose: Dose::First,
            quantity: 1,
            vaccine: None,
            fee: None,
            date,
        }
    }

    /// Target date formatted for the API
    pub fn api_date(&self) -> String {
        self.date.format(API_DATE_FORMAT).to_string()
    }

    /// Reject criteria the filter cannot evaluate
    pub fn check(&self) -> Result<(), ScanError> {
        if self.age == 0 {
            return Err(ScanError::Config("age must be greater than 0".to_string()));
        }
        if !(1..=5).contains(&self.quantity) {
            return Err(ScanError::Config(format!(
                "minimum capacity must be between 1 and 5, got {}",
                self.quantity
            )));
        }
        Ok(())
    }
}

/// Kind of location name that failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationKind {
    /// State name
    State,
    /// District name
    District,
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationKind::State => write!(f, "state"),
            LocationKind::District => write!(f, "district"),
        }
    }
}

/// Custom error type for scan operations
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Invalid or missing user input
    #[error("Configuration error: {0}")]
    Config(String),

    /// A state or district name did not match any listed entry
    #[error("Invalid {kind} name: {name:?} did not match any {kind} returned by the API")]
    NotFound {
        /// Which lookup failed
        kind: LocationKind,
        /// The name as the user supplied it
        name: String,
    },

    /// Network failure or an unusable HTTP status
    #[error("Request to {endpoint} failed: {message}")]
    Transient {
        /// Endpoint path that was queried
        endpoint: String,
        /// What went wrong
        message: String,
    },

    /// The response body did not match the expected schema
    #[error("Unexpected response from {endpoint}: {source}")]
    Schema {
        /// Endpoint path that was queried
        endpoint: String,
        /// Decoder error
        #[source]
        source: serde_json::Error,
    },

    /// The notification could not be delivered
    #[error("Notification failed: {0}")]
    Notify(#[from] NotificationError),
}

impl ScanError {
    /// Whether this error must stop the polling loop
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ScanError::Transient { .. })
    }
}

/// Result of one query, filter and notify cycle
#[derive(Debug)]
pub enum CycleOutcome {
    /// Matching sessions were found and the notification was delivered
    Matched {
        /// Number of matching sessions in the report
        sessions: usize,
    },
    /// The API answered but nothing satisfied the criteria
    Empty,
    /// No data this cycle; try again on the next tick
    TransientFailure(ScanError),
    /// The loop must stop
    FatalFailure(ScanError),
}

impl From<ScanError> for CycleOutcome {
    fn from(err: ScanError) -> Self {
        if err.is_fatal() {
            CycleOutcome::FatalFailure(err)
        } else {
            CycleOutcome::TransientFailure(err)
        }
    }
}
