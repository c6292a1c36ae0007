//! Router tests that reach the database: rating gates, attendee capacity and
//! deletes of rows that are still referenced. Run with a reachable
//! `DATABASE_URL`: `cargo test -- --ignored`.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use crowdvibe_server::config::Config;
use crowdvibe_server::handlers::context::PROFILE_ID_HEADER;
use crowdvibe_server::models::{
    Event, EventAttendance, EventAttendanceFields, EventFields, Profile, ProfileFields,
};
use crowdvibe_server::routes::create_routes;
use crowdvibe_server::state::AppState;
use crowdvibe_server::utils::validate::parse_date_time;

fn app(pool: PgPool) -> Router {
    create_routes(AppState::new(pool), &Config::from_lookup(|_| None))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    profile: Uuid,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(PROFILE_ID_HEADER, profile.to_string());
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn insert_profile(pool: &PgPool, username: &str) -> Profile {
    let profile = Profile::new(ProfileFields {
        id: Uuid::new_v4(),
        activation_token: None,
        bio: None,
        email: format!("{}@crowdvibe.example", username),
        first_name: "Pat".to_string(),
        hash: "a".repeat(128),
        image: None,
        last_name: "Doe".to_string(),
        salt: "b".repeat(64),
        username: username.to_string(),
    })
    .unwrap();
    profile.insert(pool).await.unwrap();
    profile
}

async fn insert_event(pool: &PgPool, owner: Uuid, attendee_limit: Option<i32>) -> Event {
    let start = parse_date_time("2024-06-01 20:00:00").unwrap();
    let event = Event::new(EventFields {
        id: Uuid::new_v4(),
        profile_id: owner,
        attendee_limit,
        detail: "rooftop, bring a jacket".to_string(),
        end_date_time: start + Duration::hours(4),
        image: None,
        lat: 35.084319,
        long: -106.619781,
        name: "Rooftop party".to_string(),
        price: Decimal::ZERO,
        start_date_time: start,
    })
    .unwrap();
    event.insert(pool).await.unwrap();
    event
}

async fn insert_attendance(
    pool: &PgPool,
    event_id: Uuid,
    profile_id: Uuid,
    check_in: bool,
) -> EventAttendance {
    let attendance = EventAttendance::new(EventAttendanceFields {
        id: Uuid::new_v4(),
        event_id,
        profile_id,
        check_in,
        number_attending: 1,
    })
    .unwrap();
    attendance.insert(pool).await.unwrap();
    attendance
}

fn rating_body(score: i32, ratee: Uuid, attendance: Uuid) -> Value {
    json!({
        "ratingScore": score,
        "ratingRateeProfileId": ratee.to_string(),
        "ratingEventAttendanceId": attendance.to_string(),
    })
}

#[sqlx::test]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_rating_submission_gates(pool: PgPool) {
    let owner = insert_profile(&pool, "host").await;
    let rater = insert_profile(&pool, "rater").await;
    let ratee = insert_profile(&pool, "ratee").await;
    let event = insert_event(&pool, owner.id(), None).await;
    let mut rater_attendance = insert_attendance(&pool, event.id(), rater.id(), false).await;
    let ratee_attendance = insert_attendance(&pool, event.id(), ratee.id(), true).await;
    let app = app(pool.clone());

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/ratings",
        rater.id(),
        Some(rating_body(70, ratee.id(), Uuid::new_v4())),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/ratings",
        rater.id(),
        Some(rating_body(70, ratee.id(), ratee_attendance.id())),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    rater_attendance.set_check_in(true);
    rater_attendance.update(&pool).await.unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/ratings",
        rater.id(),
        Some(rating_body(70, ratee.id(), ratee_attendance.id())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Rating was submitted successfully.");
    assert_eq!(body["data"]["ratingRateeProfileId"], ratee.id().to_string());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/ratings",
        rater.id(),
        Some(rating_body(40, ratee.id(), ratee_attendance.id())),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[sqlx::test]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_rating_must_name_the_attendee(pool: PgPool) {
    let owner = insert_profile(&pool, "host").await;
    let rater = insert_profile(&pool, "rater").await;
    let bystander = insert_profile(&pool, "bystander").await;
    let event = insert_event(&pool, owner.id(), None).await;
    let rater_attendance = insert_attendance(&pool, event.id(), rater.id(), true).await;
    let app = app(pool.clone());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/ratings",
        rater.id(),
        Some(rating_body(70, bystander.id(), rater_attendance.id())),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "rated profile does not match the event attendance"
    );

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/ratings",
        rater.id(),
        Some(rating_body(70, rater.id(), rater_attendance.id())),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "you cannot rate yourself");

    let (_, body) = send(
        &app,
        Method::GET,
        &format!("/api/ratings?raterProfileId={}", rater.id()),
        rater.id(),
        None,
    )
    .await;
    assert_eq!(body["data"], json!([]));
}

#[sqlx::test]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_attendee_limit_is_enforced(pool: PgPool) {
    let owner = insert_profile(&pool, "host").await;
    let first = insert_profile(&pool, "first").await;
    let second = insert_profile(&pool, "second").await;
    let event = insert_event(&pool, owner.id(), Some(10)).await;
    let app = app(pool.clone());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/event-attendances",
        first.id(),
        Some(json!({
            "eventAttendanceEventId": event.id().to_string(),
            "eventAttendanceNumberAttending": 8,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let attendance_id = body["data"]["eventAttendanceId"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/event-attendances",
        second.id(),
        Some(json!({
            "eventAttendanceEventId": event.id().to_string(),
            "eventAttendanceNumberAttending": 3,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "event is full: 8 of 10 places taken");

    // growing a group counts its old head count as released
    let uri = format!("/api/event-attendances/{}", attendance_id);
    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        first.id(),
        Some(json!({ "eventAttendanceNumberAttending": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["eventAttendanceNumberAttending"], 10);

    let (status, _) = send(
        &app,
        Method::PUT,
        &uri,
        first.id(),
        Some(json!({ "eventAttendanceNumberAttending": 11 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        EventAttendance::total_attending(&pool, event.id())
            .await
            .unwrap(),
        10
    );
}

#[sqlx::test]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_attendee_limit_cannot_drop_below_attendance(pool: PgPool) {
    let owner = insert_profile(&pool, "host").await;
    let guest = insert_profile(&pool, "guest").await;
    let event = insert_event(&pool, owner.id(), Some(10)).await;
    insert_attendance(&pool, event.id(), guest.id(), false).await;
    insert_attendance(&pool, event.id(), owner.id(), false).await;
    let app = app(pool.clone());

    let update = |limit: i32| {
        json!({
            "eventAttendeeLimit": limit,
            "eventDetail": event.detail(),
            "eventName": event.name(),
            "eventLat": event.lat(),
            "eventLong": event.long(),
            "eventStartDateTime": event.start_date_time().timestamp_millis(),
            "eventEndDateTime": event.end_date_time().timestamp_millis(),
        })
    };
    let uri = format!("/api/events/{}", event.id());

    let (status, _) = send(&app, Method::PUT, &uri, owner.id(), Some(update(1))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, Method::PUT, &uri, owner.id(), Some(update(2))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["eventAttendeeLimit"], 2);
}

#[sqlx::test]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_deleting_a_referenced_row_is_a_conflict(pool: PgPool) {
    let owner = insert_profile(&pool, "host").await;
    let guest = insert_profile(&pool, "guest").await;
    let event = insert_event(&pool, owner.id(), None).await;
    let attendance = insert_attendance(&pool, event.id(), guest.id(), false).await;
    let app = app(pool.clone());

    let event_uri = format!("/api/events/{}", event.id());
    let (status, body) = send(&app, Method::DELETE, &event_uri, owner.id(), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
    assert_eq!(body["message"], "record is still referenced");
    assert!(Event::get_by_id(&pool, event.id()).await.unwrap().is_some());

    let attendance_uri = format!("/api/event-attendances/{}", attendance.id());
    let (status, _) = send(&app, Method::DELETE, &attendance_uri, guest.id(), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::DELETE, &event_uri, owner.id(), None).await;
    assert_eq!(status, StatusCode::OK);
}
