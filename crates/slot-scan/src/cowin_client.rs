use std::time::Duration;

use rand::seq::IndexedRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};

use crate::scan_types::ScanError;

/// Public CoWIN API, see https://apisetu.gov.in/public/api/cowin
pub const DEFAULT_BASE_URL: &str = "https://cdn-api.co-vin.in/api";

/// State listing, relative to the base URL
pub const LIST_STATES_PATH: &str = "/v2/admin/location/states";
/// Seven-day calendar for a pin code, queried with `pincode` and `date`
pub const CALENDAR_BY_PIN_PATH: &str = "/v2/appointment/sessions/calendarByPin";
/// Seven-day calendar for a district, queried with `district_id` and `date`
pub const CALENDAR_BY_DISTRICT_PATH: &str = "/v2/appointment/sessions/calendarByDistrict";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The API rejects requests that do not look like they come from a browser
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/90.0.4430.93 Safari/537.36 Edg/90.0.818.51",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
];

/// Response of the list-states endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct StateList {
    /// All states, in API order
    pub states: Vec<State>,
}

/// One entry of the state listing
#[derive(Debug, Clone, Deserialize)]
pub struct State {
    /// ID used by the district listing
    pub state_id: u32,
    /// Display name, e.g. "Delhi"
    pub state_name: String,
}

/// Response of the list-districts endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct DistrictList {
    /// Districts of the requested state
    pub districts: Vec<District>,
}

/// One entry of the district listing
#[derive(Debug, Clone, Deserialize)]
pub struct District {
    /// ID used by the district calendar
    pub district_id: u32,
    /// Display name, e.g. "South East Delhi"
    pub district_name: String,
}

/// Calendar response: every center with sessions in the 7 days from the queried date
#[derive(Debug, Clone, Deserialize)]
pub struct Appointments {
    /// Centers with at least one session
    pub centers: Vec<Center>,
}

/// A vaccination site
#[derive(Debug, Clone, Deserialize)]
pub struct Center {
    /// Stable center ID
    pub center_id: u64,
    /// Center name
    pub name: String,
    /// State the center is in
    #[serde(default)]
    pub state_name: String,
    /// District the center is in
    #[serde(default)]
    pub district_name: String,
    /// Empty when the API omits it
    #[serde(default)]
    pub block_name: String,
    /// Six-digit postal code
    pub pincode: u32,
    /// Latitude
    #[serde(default)]
    pub lat: f64,
    /// Longitude
    #[serde(default)]
    pub long: f64,
    /// Opening time, e.g. "09:00:00"
    #[serde(default)]
    pub from: String,
    /// Closing time
    #[serde(default)]
    pub to: String,
    /// "Free" or "Paid"
    pub fee_type: String,
    /// Prices, only listed for paid centers
    #[serde(default)]
    pub vaccine_fees: Vec<VaccineFee>,
    /// One entry per day and vaccine
    pub sessions: Vec<Session>,
}

/// Price of one vaccine at a paid center
#[derive(Debug, Clone, Deserialize)]
pub struct VaccineFee {
    /// Vaccine name as the API spells it
    pub vaccine: String,
    /// Price in rupees
    pub fee: String,
}

/// Appointment availability at a center for one day
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    /// Opaque session ID
    pub session_id: String,
    /// DD-MM-YYYY
    pub date: String,
    /// Doses left across both doses
    pub available_capacity: u32,
    /// Doses left for first-dose bookings
    pub available_capacity_dose1: u32,
    /// Doses left for second-dose bookings
    pub available_capacity_dose2: u32,
    /// Youngest age admitted
    pub min_age_limit: u32,
    /// e.g. "COVISHIELD"
    pub vaccine: String,
    /// Time windows, e.g. "10:00AM-12:00PM"
    #[serde(default)]
    pub slots: Vec<String>,
}

/// Result of a calendar query
#[derive(Debug)]
pub enum CalendarResponse {
    /// The API answered with data
    Available(Appointments),
    /// The API answered with a non-success status; no data this cycle
    Unavailable(StatusCode),
}

/// Raw outcome of a GET before decoding
enum RawResponse {
    Body(String),
    Status(StatusCode),
}

/// Client for the CoWIN public appointment API
pub struct CowinClient {
    client: Client,
    base_url: String,
}

impl CowinClient {
    /// Create a new client, defaulting to the public API when no base URL is given
    pub fn new(base_url: Option<String>) -> Result<Self, ScanError> {
        let user_agent = USER_AGENTS
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("hi_IN"));

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ScanError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self { client, base_url })
    }

    /// List every state known to the API
    pub async fn list_states(&self) -> Result<StateList, ScanError> {
        self.fetch_listing(LIST_STATES_PATH).await
    }

    /// List the districts of a state
    pub async fn list_districts(&self, state_id: u32) -> Result<DistrictList, ScanError> {
        let path = format!("/v2/admin/location/districts/{}", state_id);
        self.fetch_listing(&path).await
    }

    /// Week of sessions for a postal code starting at `date` (DD-MM-YYYY)
    pub async fn calendar_by_pin(
        &self,
        pincode: &str,
        date: &str,
    ) -> Result<CalendarResponse, ScanError> {
        let params = [("pincode", pincode.to_string()), ("date", date.to_string())];
        self.fetch_calendar(CALENDAR_BY_PIN_PATH, &params).await
    }

    /// Week of sessions for a district starting at `date` (DD-MM-YYYY)
    pub async fn calendar_by_district(
        &self,
        district_id: u32,
        date: &str,
    ) -> Result<CalendarResponse, ScanError> {
        let params = [
            ("district_id", district_id.to_string()),
            ("date", date.to_string()),
        ];
        self.fetch_calendar(CALENDAR_BY_DISTRICT_PATH, &params).await
    }

    /// Listings are required to make progress, so a bad status is an error
    async fn fetch_listing<T: DeserializeOwned>(&self, path: &str) -> Result<T, ScanError> {
        match self.get(path, &[]).await? {
            RawResponse::Body(body) => decode(path, &body),
            RawResponse::Status(status) => Err(ScanError::Transient {
                endpoint: path.to_string(),
                message: format!("HTTP {}", status),
            }),
        }
    }

    async fn fetch_calendar(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<CalendarResponse, ScanError> {
        match self.get(path, params).await? {
            RawResponse::Body(body) => decode(path, &body).map(CalendarResponse::Available),
            RawResponse::Status(status) => Ok(CalendarResponse::Unavailable(status)),
        }
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<RawResponse, ScanError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Querying endpoint: {} {:?}", url, params);

        let transient = |e: reqwest::Error| ScanError::Transient {
            endpoint: path.to_string(),
            message: e.to_string(),
        };

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(transient)?;

        let status = response.status();
        let body = response.text().await.map_err(transient)?;
        trace!("Response from {}: {}", path, body);

        if !status.is_success() {
            warn!("Request to {} failed with status {}", path, status);
            return Ok(RawResponse::Status(status));
        }

        Ok(RawResponse::Body(body))
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: &str) -> Result<T, ScanError> {
    serde_json::from_str(body).map_err(|source| ScanError::Schema {
        endpoint: endpoint.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const CALENDAR_BODY: &str = r#"{
        "centers": [{
            "center_id": 1234,
            "name": "District General Hostpital",
            "state_name": "Kerala",
            "district_name": "Kollam",
            "block_name": "Chadayamangalam",
            "pincode": 691520,
            "lat": 28,
            "long": 77,
            "from": "09:00:00",
            "to": "18:00:00",
            "fee_type": "Free",
            "sessions": [{
                "session_id": "3fa85f64-5717-4562-b3fc-2c963f66afa6",
                "date": "31-05-2021",
                "available_capacity": 50,
                "available_capacity_dose1": 25,
                "available_capacity_dose2": 25,
                "min_age_limit": 18,
                "vaccine": "COVISHIELD",
                "slots": ["FORENOON", "AFTERNOON"]
            }]
        }]
    }"#;

    #[tokio::test]
    async fn test_calendar_by_pin_decodes_centers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", CALENDAR_BY_PIN_PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("pincode".into(), "691520".into()),
                Matcher::UrlEncoded("date".into(), "31-05-2021".into()),
            ]))
            .match_header("accept-language", "hi_IN")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(CALENDAR_BODY)
            .create_async()
            .await;

        let client = CowinClient::new(Some(server.url())).unwrap();
        let response = client.calendar_by_pin("691520", "31-05-2021").await.unwrap();

        mock.assert_async().await;
        match response {
            CalendarResponse::Available(appointments) => {
                assert_eq!(appointments.centers.len(), 1);
                let center = &appointments.centers[0];
                assert_eq!(center.center_id, 1234);
                assert!(center.vaccine_fees.is_empty());
                assert_eq!(center.sessions[0].available_capacity_dose1, 25);
                assert_eq!(center.sessions[0].slots.len(), 2);
            }
            other => panic!("expected data, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bad_status_means_no_data() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", CALENDAR_BY_DISTRICT_PATH)
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body("Forbidden")
            .create_async()
            .await;

        let client = CowinClient::new(Some(server.url())).unwrap();
        let response = client.calendar_by_district(395, "31-05-2021").await.unwrap();

        assert!(matches!(
            response,
            CalendarResponse::Unavailable(StatusCode::FORBIDDEN)
        ));
    }

    #[tokio::test]
    async fn test_malformed_body_is_schema_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", CALENDAR_BY_DISTRICT_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"centers": [{"center_id": "not-a-number"}]}"#)
            .create_async()
            .await;

        let client = CowinClient::new(Some(server.url())).unwrap();
        let err = client
            .calendar_by_district(395, "31-05-2021")
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::Schema { ref endpoint, .. } if endpoint == CALENDAR_BY_DISTRICT_PATH));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_listing_bad_status_is_transient() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", LIST_STATES_PATH)
            .with_status(500)
            .create_async()
            .await;

        let client = CowinClient::new(Some(server.url())).unwrap();
        let err = client.list_states().await.unwrap_err();

        assert!(matches!(err, ScanError::Transient { .. }));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transient() {
        // Port 9 (discard) is not expected to accept HTTP connections
        let client = CowinClient::new(Some("http://127.0.0.1:9".to_string())).unwrap();
        let err = client.list_states().await.unwrap_err();

        assert!(matches!(err, ScanError::Transient { .. }));
    }
}
