use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::cowin_client::{
    CALENDAR_BY_DISTRICT_PATH, CALENDAR_BY_PIN_PATH, CalendarResponse, CowinClient,
};
use crate::filter::find_matches;
use crate::location_resolver::LocationResolver;
use crate::report::MatchReport;
use crate::scan_types::*;

/// Default time between two polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Tuning for the polling loop
#[derive(Debug, Clone)]
pub struct ScanExecutorConfig {
    /// Time between the start of two cycles (default: 30 seconds)
    pub poll_interval: Duration,
}

impl Default for ScanExecutorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Trait for delivering a non-empty report
#[async_trait::async_trait]
pub trait NotificationService: Send + Sync {
    /// Deliver the rendered report of `sessions` matching sessions
    async fn send_availability_notification(
        &self,
        report: &str,
        sessions: usize,
    ) -> Result<(), NotificationError>;
}

/// Errors raised while delivering a report
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// The mail transport failed or rejected the message
    #[error("Email error: {0}")]
    Email(String),
    /// Sender or recipient is not a valid mailbox
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Query shape, fixed for the whole run
enum SearchTarget {
    PostalCode(String),
    District(LocationResolver),
}

/// Runs the resolve, query, filter and notify cycle on a fixed timer
pub struct ScanExecutor {
    client: Arc<CowinClient>,
    target: SearchTarget,
    criteria: SearchCriteria,
    notification_service: Arc<dyn NotificationService>,
    config: ScanExecutorConfig,
}

impl ScanExecutor {
    /// Build an executor; criteria and interval are checked here, before any request
    pub fn new(
        client: Arc<CowinClient>,
        location: LocationQuery,
        criteria: SearchCriteria,
        notification_service: Arc<dyn NotificationService>,
        config: Option<ScanExecutorConfig>,
    ) -> Result<Self, ScanError> {
        let config = config.unwrap_or_default();
        criteria.check()?;
        if config.poll_interval.is_zero() {
            return Err(ScanError::Config(
                "poll interval must be greater than 0".to_string(),
            ));
        }

        let target = match location {
            LocationQuery::PostalCode(pincode) => SearchTarget::PostalCode(pincode),
            LocationQuery::District { state, district } => {
                SearchTarget::District(LocationResolver::new(client.clone(), &state, &district))
            }
        };

        Ok(Self {
            client,
            target,
            criteria,
            notification_service,
            config,
        })
    }

    /// Run one cycle now, then one per interval, until a fatal error
    pub async fn start(&self) -> Result<(), ScanError> {
        let wait = self.config.poll_interval.as_secs_f64();
        info!(
            "Starting availability search for {}, polling every {} seconds",
            self.target_description(),
            wait
        );

        // The first tick completes immediately
        let mut poll_interval = interval(self.config.poll_interval);
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            poll_interval.tick().await;

            match self.run_cycle().await {
                CycleOutcome::Matched { sessions } => {
                    info!("Notified about {} sessions, rechecking after {} seconds", sessions, wait);
                }
                CycleOutcome::Empty => {
                    info!("No slots available, rechecking after {} seconds", wait);
                }
                CycleOutcome::TransientFailure(e) => {
                    warn!("{}, rechecking after {} seconds", e, wait);
                }
                CycleOutcome::FatalFailure(e) => {
                    error!("Stopping availability search: {}", e);
                    return Err(e);
                }
            }
        }
    }

    /// Query, filter and notify once
    pub async fn run_cycle(&self) -> CycleOutcome {
        let (endpoint, response) = match self.query_calendar().await {
            Ok(queried) => queried,
            Err(e) => return e.into(),
        };

        let appointments = match response {
            CalendarResponse::Available(appointments) => appointments,
            CalendarResponse::Unavailable(status) => {
                return CycleOutcome::TransientFailure(ScanError::Transient {
                    endpoint: endpoint.to_string(),
                    message: format!("HTTP {}", status),
                });
            }
        };
        debug!("Received {} centers", appointments.centers.len());

        let report = MatchReport::new(find_matches(&appointments, &self.criteria));
        if report.is_empty() {
            return CycleOutcome::Empty;
        }

        info!("Found {} available sessions, sending notification", report.len());
        match self
            .notification_service
            .send_availability_notification(&report.render(), report.len())
            .await
        {
            Ok(()) => CycleOutcome::Matched {
                sessions: report.len(),
            },
            Err(e) => CycleOutcome::FatalFailure(e.into()),
        }
    }

    async fn query_calendar(&self) -> Result<(&'static str, CalendarResponse), ScanError> {
        let date = self.criteria.api_date();
        match &self.target {
            SearchTarget::PostalCode(pincode) => {
                let response = self.client.calendar_by_pin(pincode, &date).await?;
                Ok((CALENDAR_BY_PIN_PATH, response))
            }
            SearchTarget::District(resolver) => {
                let district_id = resolver.district_id().await?;
                let response = self.client.calendar_by_district(district_id, &date).await?;
                Ok((CALENDAR_BY_DISTRICT_PATH, response))
            }
        }
    }

    fn target_description(&self) -> String {
        match &self.target {
            SearchTarget::PostalCode(pincode) => format!("pin code {}", pincode),
            SearchTarget::District(_) => "district".to_string(),
        }
    }
}
