//! BDD step definitions for polling and seat alerts

use std::sync::Arc;
use std::time::Duration;

use cucumber::{given, then, when};
use tokio_util::sync::CancellationToken;

use seatwatch::alert::AlertSink;
use seatwatch::catalog::CourseCatalogClient;
use seatwatch::config::AlertReset;
use seatwatch::dispatch::AlertDispatcher;
use seatwatch::io::HttpResponse;
use seatwatch::monitor::MonitorTarget;
use seatwatch::poller::Poller;
use seatwatch::state::new_state_handle;

use crate::world::SeatWatchWorld;

fn build_poller(world: &mut SeatWatchWorld) {
    if world.poller.is_some() {
        return;
    }

    let reader = world.reader.clone().expect("no credential held");
    let state = new_state_handle(&world.targets, 50);
    let sink: Arc<dyn AlertSink> = world.sink.clone();
    let (alerts, _handle) =
        AlertDispatcher::spawn(vec![sink], 8, state.clone(), CancellationToken::new());
    let source = Arc::new(CourseCatalogClient::new(
        "http://api.test/v1",
        "AvailableSeats",
        world.http.clone(),
    ));

    world.poller = Some(Poller::new(
        source,
        reader,
        world.targets.clone(),
        state.clone(),
        alerts,
        AlertReset::WhenClosed,
        Duration::from_secs(60),
    ));
    world.state = Some(state);
}

fn course(course_id: u32) -> MonitorTarget {
    MonitorTarget {
        term: 1770,
        course_id,
    }
}

#[given(expr = "class {int} in term {int} is monitored")]
fn class_is_monitored(world: &mut SeatWatchWorld, course_id: u32, term: u32) {
    world.targets.push(MonitorTarget { term, course_id });
}

#[given(expr = "class {int} reports {int} open seats")]
fn class_reports_seats(world: &mut SeatWatchWorld, course_id: u32, seats: i32) {
    world.http.push_class_response(
        course_id,
        Ok(HttpResponse {
            status: 200,
            body: format!(
                r#"{{"getSOCSectionListByNbrResponse": {{"ClassOffered": {{"ClassNumber": "{}", "AvailableSeats": "{}"}}}}}}"#,
                course_id, seats
            ),
        }),
    );
}

#[given(expr = "class {int} responds with status {int}")]
fn class_responds_with_status(world: &mut SeatWatchWorld, course_id: u32, status: u16) {
    world.http.push_class_response(
        course_id,
        Ok(HttpResponse {
            status,
            body: "Internal Server Error".to_string(),
        }),
    );
}

#[given(expr = "class {int} is unreachable")]
fn class_is_unreachable(world: &mut SeatWatchWorld, course_id: u32) {
    world
        .http
        .push_class_response(course_id, Err("connection refused".to_string()));
}

#[given(expr = "class {int} returns body {string}")]
fn class_returns_body(world: &mut SeatWatchWorld, course_id: u32, body: String) {
    world
        .http
        .push_class_response(course_id, Ok(HttpResponse { status: 200, body }));
}

#[when(expr = "the classes are polled {int} time(s)")]
async fn classes_are_polled(world: &mut SeatWatchWorld, cycles: usize) {
    build_poller(world);
    let poller = world.poller.as_ref().expect("poller not built");
    for _ in 0..cycles {
        world.last_snapshots = poller.run_cycle().await;
    }
}

#[then(expr = "the last poll should report {int} open seats for class {int}")]
fn last_poll_reports(world: &mut SeatWatchWorld, seats: i32, course_id: u32) {
    let snapshot = world
        .last_snapshots
        .iter()
        .find(|s| s.target == course(course_id))
        .expect("class missing from last poll");
    assert_eq!(snapshot.open_seats, seats);
}

#[then(expr = "the last poll should have no result for class {int}")]
fn last_poll_has_no_result(world: &mut SeatWatchWorld, course_id: u32) {
    assert!(world
        .last_snapshots
        .iter()
        .all(|s| s.target != course(course_id)));
}

#[then(expr = "{int} alert(s) should have been raised for class {int}")]
async fn alerts_raised(world: &mut SeatWatchWorld, expected: u32, course_id: u32) {
    let state = world.state.as_ref().expect("poller not built");
    let raised = state
        .read()
        .await
        .targets
        .iter()
        .find(|s| s.target == course(course_id))
        .map(|s| s.alerts_raised)
        .expect("class not monitored");
    assert_eq!(raised, expected);
}

#[then(expr = "an alert mentioning {string} should be delivered")]
async fn alert_delivered(world: &mut SeatWatchWorld, text: String) {
    for _ in 0..100 {
        if !world.sink.alerts.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let alerts = world.sink.alerts.lock().unwrap();
    assert_eq!(alerts.len(), 1, "delivered: {:?}", *alerts);
    assert!(alerts[0].message.contains(&text), "{}", alerts[0].message);
}

#[then(expr = "class {int} should have {int} consecutive error(s)")]
async fn consecutive_errors(world: &mut SeatWatchWorld, course_id: u32, expected: u32) {
    let state = world.state.as_ref().expect("poller not built");
    assert_eq!(
        state.read().await.consecutive_errors(&course(course_id)),
        expected
    );
}

#[then(expr = "every seat query should use bearer token {string}")]
fn seat_queries_use_token(world: &mut SeatWatchWorld, token: String) {
    let requests = world.http.class_requests.lock().unwrap();
    assert!(!requests.is_empty(), "no seat queries made");
    let expected = format!("Bearer {}", token);
    for request in requests.iter() {
        assert_eq!(request.authorization, expected);
        assert!(request.url.starts_with("http://api.test/v1/Terms/1770/Classes/"));
    }
}
