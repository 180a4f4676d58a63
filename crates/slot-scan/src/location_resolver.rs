use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use crate::cowin_client::CowinClient;
use crate::scan_types::{LocationKind, ScanError};

/// Resolves state and district names to the numeric IDs the calendar API expects.
///
/// Both listings are static for the lifetime of a polling session, so the IDs are
/// looked up once and kept. A failed lookup leaves the cell empty and is retried on
/// the next call.
pub struct LocationResolver {
    client: Arc<CowinClient>,
    state_name: String,
    district_name: String,
    state_id: OnceCell<u32>,
    district_id: OnceCell<u32>,
}

impl LocationResolver {
    /// Create a resolver for one state/district pair
    pub fn new(client: Arc<CowinClient>, state_name: &str, district_name: &str) -> Self {
        Self {
            client,
            state_name: state_name.to_string(),
            district_name: district_name.to_string(),
            state_id: OnceCell::new(),
            district_id: OnceCell::new(),
        }
    }

    /// District ID for the configured names, hitting the API only until it is known
    pub async fn district_id(&self) -> Result<u32, ScanError> {
        let state_id = *self
            .state_id
            .get_or_try_init(|| self.resolve_state(&self.state_name))
            .await?;

        self.district_id
            .get_or_try_init(|| self.resolve_district(state_id, &self.district_name))
            .await
            .copied()
    }

    /// Look up a state by name, ignoring case
    pub async fn resolve_state(&self, name: &str) -> Result<u32, ScanError> {
        let states = self.client.list_states().await?;

        let state = states
            .states
            .iter()
            .find(|s| names_match(&s.state_name, name))
            .ok_or_else(|| ScanError::NotFound {
                kind: LocationKind::State,
                name: name.to_string(),
            })?;

        info!(
            "State Details - ID: {}, Name: {}",
            state.state_id, state.state_name
        );
        Ok(state.state_id)
    }

    /// Look up a district of `state_id` by name, ignoring case
    pub async fn resolve_district(&self, state_id: u32, name: &str) -> Result<u32, ScanError> {
        let districts = self.client.list_districts(state_id).await?;

        let district = districts
            .districts
            .iter()
            .find(|d| names_match(&d.district_name, name))
            .ok_or_else(|| ScanError::NotFound {
                kind: LocationKind::District,
                name: name.to_string(),
            })?;

        info!(
            "District Details - ID: {}, Name: {}",
            district.district_id, district.district_name
        );
        Ok(district.district_id)
    }
}

/// Whole-string comparison; partial names never match
fn names_match(listed: &str, wanted: &str) -> bool {
    listed.to_lowercase() == wanted.to_lowercase()
}
