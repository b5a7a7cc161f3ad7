// ABOUTME: Tests for manual rollback and the rollback coordinator.
// ABOUTME: Uses staged release directories and a scripted service controller.

mod support;

use std::time::Duration;

use releasekit::deploy::{RollbackCoordinator, RollbackError, manual_rollback};
use releasekit::service::ServiceSettings;
use support::{AppFixture, FakeController, init_tracing, version};

fn service() -> ServiceSettings {
    ServiceSettings {
        name: "demo".to_string(),
        restart_timeout: Duration::from_secs(1),
        settle: Duration::ZERO,
    }
}

#[tokio::test]
async fn manual_rollback_targets_next_older_release() {
    init_tracing();
    let app = AppFixture::new();
    app.stage_releases(&["v1", "v2", "v3"]);
    app.point_current("v3");
    let controller = FakeController::default();

    let rollback = manual_rollback(
        &app.store(),
        &app.pointer(),
        &controller,
        Some(&service()),
    )
    .await
    .unwrap();

    assert_eq!(rollback.from, version("v3"));
    assert_eq!(rollback.to, version("v2"));
    assert_eq!(app.current().as_deref(), Some("v2"));
    assert_eq!(controller.restart_count(), 1);
}

#[tokio::test]
async fn repeated_manual_rollback_walks_back() {
    let app = AppFixture::new();
    app.stage_releases(&["v1", "v2", "v3"]);
    app.point_current("v3");
    let controller = FakeController::default();

    for expected in ["v2", "v1"] {
        manual_rollback(&app.store(), &app.pointer(), &controller, None)
            .await
            .unwrap();
        assert_eq!(app.current().as_deref(), Some(expected));
    }

    let err = manual_rollback(&app.store(), &app.pointer(), &controller, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RollbackError::NoPreviousVersion));
    assert_eq!(app.current().as_deref(), Some("v1"));
    assert_eq!(controller.restart_count(), 0);
}

#[tokio::test]
async fn manual_rollback_without_current_fails() {
    let app = AppFixture::new();
    app.stage_releases(&["v1", "v2"]);
    let controller = FakeController::default();

    let err = manual_rollback(&app.store(), &app.pointer(), &controller, None)
        .await
        .unwrap_err();

    assert!(matches!(err, RollbackError::NoPreviousVersion));
    assert!(app.current().is_none());
}

#[tokio::test]
async fn manual_rollback_reports_restart_failure() {
    let app = AppFixture::new();
    app.stage_releases(&["v1", "v2"]);
    app.point_current("v2");
    let controller = FakeController::failing();

    let err = manual_rollback(
        &app.store(),
        &app.pointer(),
        &controller,
        Some(&service()),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, RollbackError::Restart(_)));
    // The pointer already moved; the service is what failed.
    assert_eq!(app.current().as_deref(), Some("v1"));
}

#[tokio::test]
async fn coordinator_fails_closed_without_previous() {
    let app = AppFixture::new();
    app.stage_releases(&["v1"]);
    app.point_current("v1");
    let (store, pointer) = (app.store(), app.pointer());
    let controller = FakeController::default();

    let err = RollbackCoordinator::new(&store, &pointer, &controller, None)
        .rollback(None)
        .await
        .unwrap_err();

    assert!(matches!(err, RollbackError::NoPreviousVersion));
    assert_eq!(app.current().as_deref(), Some("v1"));
}

#[tokio::test]
async fn coordinator_refuses_missing_release() {
    let app = AppFixture::new();
    app.stage_releases(&["v2"]);
    app.point_current("v2");
    let (store, pointer) = (app.store(), app.pointer());
    let controller = FakeController::default();

    let err = RollbackCoordinator::new(&store, &pointer, &controller, Some(&service()))
        .rollback(Some(&version("v1")))
        .await
        .unwrap_err();

    assert!(matches!(err, RollbackError::MissingRelease(v) if v == version("v1")));
    assert_eq!(app.current().as_deref(), Some("v2"));
    assert_eq!(controller.restart_count(), 0);
}
