// Integration tests for the recommendation service

use actix_web::{test, web, App};
use chrono::{Duration, TimeZone, Utc};
use intern_match::core::EngineError;
use intern_match::models::{
    Candidate, CandidatePreferences, DateRange, DistancePreference, Education, Internship,
    Location, MatchingPolicy, Outcome, RecommendationEvent, Skill, WorkType,
};
use intern_match::routes::{configure_routes, AppState};
use intern_match::services::{
    BatchOptions, CandidateInput, InMemoryStore, ManualClock, RecommendationService,
    ServiceOptions,
};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

// Bengaluru
const BASE_LAT: f64 = 12.9716;
const BASE_LON: f64 = 77.5946;
// Roughly one kilometre of latitude
const KM: f64 = 1.0 / 111.195;

fn location(lat: f64, lon: f64) -> Location {
    Location {
        lat,
        lon,
        district: "Bengaluru Urban".to_string(),
        state: "Karnataka".to_string(),
    }
}

fn create_test_candidate(id: &str, lat: f64, lon: f64) -> Candidate {
    Candidate::new(
        id,
        vec![
            Skill::new("python", 1.0),
            Skill::new("sql", 0.9),
            Skill::new("react", 0.8),
        ],
        location(lat, lon),
        Education::default(),
        CandidatePreferences {
            distance_pref: DistancePreference::Local,
            ..CandidatePreferences::default()
        },
    )
}

fn create_test_internship(id: &str, skills: &[&str], km_north: f64, work_type: WorkType) -> Internship {
    Internship {
        id: id.to_string(),
        title: format!("Intern {}", id),
        required_skills: skills.iter().map(|s| Skill::new(*s, 1.0)).collect(),
        location: location(BASE_LAT + km_north * KM, BASE_LON),
        stipend: 12000.0,
        duration_months: 3,
        sector: "technology".to_string(),
        work_type,
        capacity: 5,
    }
}

fn catalog() -> Vec<Internship> {
    vec![
        create_test_internship("i_near", &["python", "sql"], 5.0, WorkType::Onsite),
        create_test_internship("i_mid", &["django", "flask"], 30.0, WorkType::Onsite),
        create_test_internship("i_far", &["python"], 150.0, WorkType::Onsite),
        create_test_internship("i_remote", &["python"], 1500.0, WorkType::Remote),
        create_test_internship("i_none", &["autocad"], 2.0, WorkType::Onsite),
    ]
}

fn create_service(options: ServiceOptions) -> (Arc<ManualClock>, RecommendationService) {
    let store = Arc::new(InMemoryStore::with_data(
        vec![
            create_test_candidate("c1", BASE_LAT, BASE_LON),
            // Delhi
            create_test_candidate("c2", 28.6139, 77.2090),
        ],
        catalog(),
    ));
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap()));
    let service = RecommendationService::with_clock(store, MatchingPolicy::default(), options, clock.clone());
    (clock, service)
}

#[tokio::test]
async fn test_integration_end_to_end_recommendations() {
    let (_, service) = create_service(ServiceOptions::default());

    let generated = assert_ok!(
        service
            .generate_recommendations(CandidateInput::Id("c1".to_string()), Some(10), false)
            .await
    );
    let recs = &generated.recommendations;

    let ids: Vec<&str> = recs.matches.iter().map(|m| m.internship_id.as_str()).collect();
    assert!(ids.contains(&"i_near"));
    assert!(ids.contains(&"i_mid"));
    // Beyond twice the local cutoff, remote or not
    assert!(!ids.contains(&"i_far"));
    assert!(!ids.contains(&"i_remote"));
    // No skill overlap
    assert!(!ids.contains(&"i_none"));
    assert_eq!(recs.total_considered, 5);

    for pair in recs.matches.windows(2) {
        assert!(pair[0].match_score >= pair[1].match_score);
    }
    for m in &recs.matches {
        assert!(m.match_score <= 100);
        assert!(!m.explanation.is_empty());
        for pair in m.explanation.windows(2) {
            assert!(pair[0].contribution >= pair[1].contribution);
        }
    }

    let near = recs.matches.iter().find(|m| m.internship_id == "i_near").unwrap();
    let mid = recs.matches.iter().find(|m| m.internship_id == "i_mid").unwrap();
    assert!(near.match_score > mid.match_score);
    assert!(mid.missing_skills.is_empty());
}

#[tokio::test]
async fn test_integration_limit_truncates() {
    let (_, service) = create_service(ServiceOptions::default());

    let generated = assert_ok!(
        service
            .generate_recommendations(CandidateInput::Id("c1".to_string()), Some(1), false)
            .await
    );
    assert_eq!(generated.recommendations.matches.len(), 1);
}

#[tokio::test]
async fn test_integration_ad_hoc_profile_not_cached() {
    let (_, service) = create_service(ServiceOptions::default());
    let profile = create_test_candidate("adhoc_1", BASE_LAT, BASE_LON);

    let first = assert_ok!(
        service
            .generate_recommendations(CandidateInput::Profile(profile.clone()), None, false)
            .await
    );
    let second = assert_ok!(
        service
            .generate_recommendations(CandidateInput::Profile(profile), None, false)
            .await
    );

    assert!(!first.cached);
    assert!(!second.cached);
    assert_eq!(first.recommendations.matches, second.recommendations.matches);
    assert_eq!(service.cache_stats().computations, 0);
}

#[tokio::test]
async fn test_integration_cache_lifecycle() {
    let (clock, service) = create_service(ServiceOptions::default());

    let first = assert_ok!(service.get_cached_recommendations("c1", None, false).await);
    let second = assert_ok!(service.get_cached_recommendations("c1", None, false).await);
    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.recommendations, second.recommendations);

    let forced = assert_ok!(service.get_cached_recommendations("c1", None, true).await);
    assert!(!forced.cached);

    clock.advance(Duration::seconds(301));
    let expired = assert_ok!(service.get_cached_recommendations("c1", None, false).await);
    assert!(!expired.cached);

    assert_eq!(assert_ok!(service.invalidate_candidate("c1").await), 1);
    let after_invalidate = assert_ok!(service.get_cached_recommendations("c1", None, false).await);
    assert!(!after_invalidate.cached);

    assert_eq!(service.cache_stats().computations, 4);
}

#[tokio::test]
async fn test_integration_batch_isolates_failures() {
    let (_, service) = create_service(ServiceOptions::default());
    let ids = vec!["c1".to_string(), "ghost".to_string(), " c1 ".to_string(), "c2".to_string()];

    let report = assert_ok!(service.batch_recommendations(&ids, Some(3)).await);

    assert_eq!(report.summary.requested, 4);
    assert_eq!(report.summary.unique, 3);
    assert_eq!(report.summary.successful, 2);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.successes[0].candidate_id, "c1");
    assert_eq!(report.successes[1].candidate_id, "c2");
    assert_eq!(report.failures[0].candidate_id, "ghost");
    assert_eq!(report.failures[0].code, "candidate_not_found");
}

#[tokio::test]
async fn test_integration_batch_size_limits() {
    let (_, service) = create_service(ServiceOptions {
        batch: BatchOptions {
            max_size: 3,
            ..BatchOptions::default()
        },
        ..ServiceOptions::default()
    });

    let too_many: Vec<String> = (0..4).map(|i| format!("c{}", i)).collect();
    let err = assert_err!(service.batch_recommendations(&too_many, None).await);
    assert!(matches!(err, EngineError::BatchTooLarge { size: 4, max: 3 }));

    let err = assert_err!(service.batch_recommendations(&[], None).await);
    assert!(matches!(err, EngineError::BatchEmpty));
}

#[tokio::test]
async fn test_integration_similar_candidates() {
    let (_, service) = create_service(ServiceOptions::default());

    let ranked = assert_ok!(service.get_similar_candidates("i_near", None).await);

    // The Delhi candidate is far away but reverse matching keeps them
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].candidate_id, "c1");
    assert_eq!(ranked[1].candidate_id, "c2");
    assert!(ranked[0].result.match_score > ranked[1].result.match_score);

    let err = assert_err!(service.get_similar_candidates("i_missing", None).await);
    assert!(matches!(err, EngineError::InternshipNotFound(_)));
}

fn event(outcome: Outcome, score: u8, missing: &[&str], day: u32) -> RecommendationEvent {
    RecommendationEvent {
        id: Uuid::new_v4(),
        candidate_id: "c1".to_string(),
        internship_id: "i_near".to_string(),
        outcome,
        match_score: score,
        skill_overlap: 0.5,
        distance_km: 12.0,
        missing_skills: missing.iter().map(|s| s.to_string()).collect(),
        occurred_at: Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap(),
    }
}

#[tokio::test]
async fn test_integration_performance_report() {
    let (_, service) = create_service(ServiceOptions::default());

    for e in [
        event(Outcome::Applied, 80, &[], 1),
        event(Outcome::Accepted, 90, &[], 2),
        event(Outcome::Dropped, 40, &["docker", "aws"], 3),
        event(Outcome::Dropped, 30, &["docker"], 20),
    ] {
        assert_ok!(service.record_outcome(e).await);
    }

    let range = DateRange {
        from: Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
        to: Some(Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap()),
    };
    let report = assert_ok!(service.performance_report(range).await);

    assert_eq!(report.total_events, 3);
    assert_eq!(report.by_outcome[&Outcome::Dropped].count, 1);
    assert_eq!(report.by_outcome[&Outcome::Accepted].average_match_score, 90.0);
    assert_eq!(report.top_missing_skills.len(), 2);
    assert_eq!(report.top_missing_skills[0].skill, "aws");

    let inverted = DateRange {
        from: range.to,
        to: range.from,
    };
    let err = assert_err!(service.performance_report(inverted).await);
    assert_eq!(err.code(), "validation_error");
}

fn app_state() -> AppState {
    let (_, service) = create_service(ServiceOptions::default());
    AppState {
        service: Arc::new(service),
    }
}

#[actix_web::test]
async fn test_http_generate_and_cached_lookup() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state()))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/recommendations")
        .set_json(serde_json::json!({ "candidateId": "c1", "limit": 3 }))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["meta"]["cached"], false);
    assert_eq!(body["data"]["candidateId"], "c1");

    let req = test::TestRequest::get()
        .uri("/api/v1/recommendations/c1?limit=3")
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["meta"]["cached"], true);

    let req = test::TestRequest::delete()
        .uri("/api/v1/recommendations/c1/cache")
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["invalidated"], 1);
}

#[actix_web::test]
async fn test_http_error_statuses() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state()))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/recommendations/ghost").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let req = test::TestRequest::post()
        .uri("/api/v1/recommendations")
        .set_json(serde_json::json!({ "limit": 3 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::post()
        .uri("/api/v1/recommendations")
        .set_json(serde_json::json!({ "candidateId": "c1", "limit": 25 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let ids: Vec<String> = (0..51).map(|i| format!("c{}", i)).collect();
    let req = test::TestRequest::post()
        .uri("/api/v1/recommendations/batch")
        .set_json(serde_json::json!({ "candidateIds": ids }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "batch_too_large");
}

#[actix_web::test]
async fn test_http_literal_routes_not_shadowed() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state()))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/recommendations/performance")
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["totalEvents"], 0);

    let req = test::TestRequest::post()
        .uri("/api/v1/recommendations/events")
        .set_json(serde_json::json!({
            "candidateId": "c1",
            "internshipId": "i_near",
            "outcome": "applied",
            "matchScore": 72
        }))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);

    let req = test::TestRequest::get()
        .uri("/api/v1/recommendations/internship/i_near/candidates?limit=1")
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["meta"]["count"], 1);

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");
}
