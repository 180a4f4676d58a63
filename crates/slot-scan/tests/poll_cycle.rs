use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use mockito::Matcher;
use slot_scan::*;

const FIXTURE: &str = include_str!("fixtures/calendar_two_centers.json");

#[derive(Default)]
struct CapturingEmailService {
    bodies: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl EmailService for CapturingEmailService {
    async fn send_email(
        &self,
        _to: &str,
        _subject: &str,
        body: &str,
    ) -> Result<String, NotificationError> {
        self.bodies.lock().unwrap().push(body.to_string());
        Ok("captured".to_string())
    }
}

fn strict_criteria() -> SearchCriteria {
    SearchCriteria {
        age: 45,
        dose: Dose::First,
        quantity: 1,
        vaccine: Some(VaccinePreference::Covishield),
        fee: Some(FeePreference::Free),
        date: NaiveDate::from_ymd_opt(2021, 5, 10).unwrap(),
    }
}

fn build_executor(
    server: &mockito::ServerGuard,
    location: LocationQuery,
    criteria: SearchCriteria,
    email: Arc<CapturingEmailService>,
) -> ScanExecutor {
    let client = Arc::new(CowinClient::new(Some(server.url())).unwrap());
    let notifier = Arc::new(NotificationServiceImpl::new("me@example.com", email));
    ScanExecutor::new(
        client,
        location,
        criteria,
        notifier,
        Some(ScanExecutorConfig {
            poll_interval: Duration::from_millis(20),
        }),
    )
    .unwrap()
}

#[tokio::test]
async fn test_only_free_covishield_center_is_reported() {
    let mut server = mockito::Server::new_async().await;
    let calendar = server
        .mock("GET", "/v2/appointment/sessions/calendarByPin")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("pincode".into(), "110076".into()),
            Matcher::UrlEncoded("date".into(), "10-05-2021".into()),
        ]))
        .with_header("content-type", "application/json")
        .with_body(FIXTURE)
        .expect(1)
        .create_async()
        .await;

    let email = Arc::new(CapturingEmailService::default());
    let executor = build_executor(
        &server,
        LocationQuery::PostalCode("110076".to_string()),
        strict_criteria(),
        email.clone(),
    );

    let outcome = executor.run_cycle().await;
    assert!(matches!(outcome, CycleOutcome::Matched { sessions: 1 }));
    calendar.assert_async().await;

    let bodies = email.bodies.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    let report = &bodies[0];
    assert_eq!(report.matches(SEPARATOR).count(), 1);
    assert_eq!(report.lines().filter(|l| l.starts_with("Center ")).count(), 1);
    assert!(report.contains("MCD Dispensary Jasola"));
    assert!(!report.contains("Apollo"));
    assert!(report.contains("01:00PM-03:00PM"));
}

#[tokio::test]
async fn test_no_preferences_reports_every_open_session() {
    let mut server = mockito::Server::new_async().await;
    let _calendar = server
        .mock("GET", "/v2/appointment/sessions/calendarByPin")
        .match_query(Matcher::Any)
        .with_body(FIXTURE)
        .create_async()
        .await;

    let email = Arc::new(CapturingEmailService::default());
    let mut criteria = strict_criteria();
    criteria.vaccine = None;
    criteria.fee = None;
    let executor = build_executor(
        &server,
        LocationQuery::PostalCode("110076".to_string()),
        criteria,
        email.clone(),
    );

    assert!(matches!(
        executor.run_cycle().await,
        CycleOutcome::Matched { sessions: 2 }
    ));

    let bodies = email.bodies.lock().unwrap();
    let report = &bodies[0];
    // API order is preserved: the paid center comes first
    let apollo = report.find("Apollo").unwrap();
    let jasola = report.find("MCD Dispensary Jasola").unwrap();
    assert!(apollo < jasola);
    assert!(report.contains("1250"));
}

#[tokio::test]
async fn test_nothing_eligible_sends_nothing() {
    let mut server = mockito::Server::new_async().await;
    let _calendar = server
        .mock("GET", "/v2/appointment/sessions/calendarByPin")
        .match_query(Matcher::Any)
        .with_body(FIXTURE)
        .create_async()
        .await;

    let email = Arc::new(CapturingEmailService::default());
    let mut criteria = strict_criteria();
    criteria.dose = Dose::Second;
    let executor = build_executor(
        &server,
        LocationQuery::PostalCode("110076".to_string()),
        criteria,
        email.clone(),
    );

    assert!(matches!(executor.run_cycle().await, CycleOutcome::Empty));
    assert!(email.bodies.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_district_search_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    let states = server
        .mock("GET", "/v2/admin/location/states")
        .with_body(r#"{"states": [{"state_id": 9, "state_name": "Delhi"}], "ttl": 24}"#)
        .expect(1)
        .create_async()
        .await;
    let districts = server
        .mock("GET", "/v2/admin/location/districts/9")
        .with_body(r#"{"districts": [{"district_id": 144, "district_name": "South East Delhi"}], "ttl": 24}"#)
        .expect(1)
        .create_async()
        .await;
    let calendar = server
        .mock("GET", "/v2/appointment/sessions/calendarByDistrict")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("district_id".into(), "144".into()),
            Matcher::UrlEncoded("date".into(), "10-05-2021".into()),
        ]))
        .with_body(FIXTURE)
        .expect(3)
        .create_async()
        .await;

    let email = Arc::new(CapturingEmailService::default());
    let executor = build_executor(
        &server,
        LocationQuery::District {
            state: "DELHI".to_string(),
            district: "south east delhi".to_string(),
        },
        strict_criteria(),
        email.clone(),
    );

    for _ in 0..3 {
        assert!(matches!(
            executor.run_cycle().await,
            CycleOutcome::Matched { sessions: 1 }
        ));
    }

    states.assert_async().await;
    districts.assert_async().await;
    calendar.assert_async().await;
    assert_eq!(email.bodies.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_unknown_district_aborts_before_calendar() {
    let mut server = mockito::Server::new_async().await;
    let _states = server
        .mock("GET", "/v2/admin/location/states")
        .with_body(r#"{"states": [{"state_id": 9, "state_name": "Delhi"}]}"#)
        .create_async()
        .await;
    let districts = server
        .mock("GET", "/v2/admin/location/districts/9")
        .with_body(r#"{"districts": [{"district_id": 144, "district_name": "South East Delhi"}]}"#)
        .expect(1)
        .create_async()
        .await;
    let calendar = server
        .mock("GET", "/v2/appointment/sessions/calendarByDistrict")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let executor = build_executor(
        &server,
        LocationQuery::District {
            state: "Delhi".to_string(),
            district: "South".to_string(),
        },
        strict_criteria(),
        Arc::new(CapturingEmailService::default()),
    );

    let err = executor.start().await.unwrap_err();
    assert!(err.is_fatal());
    assert!(err.to_string().contains("South"));

    districts.assert_async().await;
    calendar.assert_async().await;
}
