use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use storage_dashboard::controller::PaymentField;
use storage_dashboard::models::PLANS;
use storage_dashboard::services::purchase::PurchasePhase;
use storage_dashboard::services::upload::UploadPhase;
use storage_dashboard::{ApiClient, AppError, Config, DashboardController, Role, SessionContext};

const MB: u64 = 1024 * 1024;

fn controller_for(server: &MockServer) -> DashboardController {
    let config = Config {
        api_base_url: server.uri(),
        upload_tick_millis: 5,
        ..Default::default()
    };
    let client = ApiClient::new(&config).unwrap();
    DashboardController::new(config, client, SessionContext::new("alice", "tok", Role::User))
}

fn file_json(name: &str, size: &str, timestamp: &str) -> serde_json::Value {
    json!({
        "id": name,
        "name": name,
        "size": size,
        "timestamp": timestamp,
        "extension": name.rsplit('.').next().unwrap_or("FILE").to_uppercase()
    })
}

async fn mock_quota(server: &MockServer, used: f64, total: f64, times: Option<u64>) {
    let mock = Mock::given(method("GET"))
        .and(path("/api/get-user-quota/alice"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"used": used, "total": total})),
        );
    match times {
        Some(n) => mock.up_to_n_times(n).mount(server).await,
        None => mock.mount(server).await,
    }
}

async fn mock_files(server: &MockServer, files: serde_json::Value, times: Option<u64>) {
    let mock = Mock::given(method("POST"))
        .and(path("/api/get-user-files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": files })));
    match times {
        Some(n) => mock.up_to_n_times(n).mount(server).await,
        None => mock.mount(server).await,
    }
}

#[tokio::test]
async fn colliding_upload_is_renamed_admitted_and_confirmed() {
    let server = MockServer::start().await;

    // First refresh sees one file and plenty of room; the post-upload
    // reconciliation sees the server's view with the renamed copy on top.
    mock_quota(&server, 100.0, 2048.0, Some(1)).await;
    mock_files(
        &server,
        json!([file_json("report.pdf", "25.00", "2026-08-01T10:00:00Z")]),
        Some(1),
    )
    .await;
    mock_quota(&server, 150.0, 2048.0, None).await;
    mock_files(
        &server,
        json!([
            file_json("report (1).pdf", "50.00", "2026-08-02T10:00:00Z"),
            file_json("report.pdf", "25.00", "2026-08-01T10:00:00Z"),
        ]),
        None,
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/api/grpc-call"))
        .and(body_partial_json(json!({
            "command": "upload_file",
            "params": {"username": "alice", "file_name": "report (1).pdf", "file_size_mb": 50.0}
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"result": "Upload successful", "type": "SUCCESS"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut ctl = controller_for(&server);
    ctl.refresh().await.unwrap();

    ctl.upload_named("report.pdf", 50 * MB).await.unwrap();

    let snap = ctl.snapshot();
    assert_eq!(snap.upload_phase, UploadPhase::Idle);
    assert_eq!(snap.quota.used_mb, 150.0);
    let names: Vec<_> = snap.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["report (1).pdf", "report.pdf"]);
}

#[tokio::test]
async fn oversized_upload_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    mock_quota(&server, 1800.0, 2048.0, None).await;
    mock_files(&server, json!([]), None).await;

    // The quota gate must refuse locally; the upload endpoint stays cold.
    Mock::given(method("POST"))
        .and(path("/api/grpc-call"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"type": "SUCCESS"})))
        .expect(0)
        .mount(&server)
        .await;

    let mut ctl = controller_for(&server);
    ctl.refresh().await.unwrap();

    let err = ctl.upload_named("video.mp4", 300 * MB).await.unwrap_err();
    match err {
        AppError::QuotaExceeded(ctx) => {
            assert_eq!(ctx.file_size_mb, 300.0);
            assert_eq!(ctx.available_mb, 248.0);
        }
        other => panic!("expected QuotaExceeded, got {:?}", other),
    }

    let snap = ctl.snapshot();
    assert_eq!(snap.upload_phase, UploadPhase::Rejected);
    let ctx = snap.quota_exceeded.expect("rejection context published");
    assert_eq!(ctx.file_name, "video.mp4");
}

#[tokio::test]
async fn failed_upload_rolls_back_to_the_authoritative_snapshot() {
    let server = MockServer::start().await;
    mock_quota(&server, 100.0, 2048.0, None).await;
    mock_files(
        &server,
        json!([file_json("report.pdf", "25.00", "2026-08-01T10:00:00Z")]),
        None,
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/grpc-call"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"result": "gRPC Error: node down", "type": "ERROR"})),
        )
        .mount(&server)
        .await;

    let mut ctl = controller_for(&server);
    ctl.refresh().await.unwrap();
    let before = ctl.snapshot();

    let err = ctl.upload_named("notes.txt", 10 * MB).await.unwrap_err();
    assert!(matches!(err, AppError::RemoteRejected(_)));

    let after = ctl.snapshot();
    assert_eq!(after.files, before.files);
    assert_eq!(after.quota, before.quota);
    assert_eq!(after.upload_phase, UploadPhase::Failed);
}

#[tokio::test]
async fn repeated_loads_with_unchanged_data_are_idempotent() {
    let server = MockServer::start().await;
    mock_files(
        &server,
        json!([
            file_json("b.txt", "1.00", "2026-08-02T10:00:00Z"),
            file_json("a.txt", "2.00", "2026-08-03T10:00:00Z"),
        ]),
        None,
    )
    .await;

    let mut ctl = controller_for(&server);
    ctl.refresh_files().await.unwrap();
    let first = ctl.snapshot().files;
    ctl.refresh_files().await.unwrap();
    let second = ctl.snapshot().files;

    assert_eq!(first, second);
    // Newest first regardless of wire order.
    assert_eq!(first[0].name, "a.txt");
}

#[tokio::test]
async fn failed_load_shows_empty_not_stale() {
    let server = MockServer::start().await;
    mock_files(
        &server,
        json!([file_json("a.txt", "1.00", "2026-08-01T10:00:00Z")]),
        Some(1),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/get-user-files"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let mut ctl = controller_for(&server);
    ctl.refresh_files().await.unwrap();
    assert_eq!(ctl.snapshot().files.len(), 1);

    assert!(ctl.refresh_files().await.is_err());
    assert!(ctl.snapshot().files.is_empty());
}

#[tokio::test]
async fn declined_rename_leaves_local_state_untouched() {
    let server = MockServer::start().await;
    // Exactly one files fetch: the initial load. A declined rename must not
    // trigger a reconciling load, and must not edit the row locally.
    mock_files(
        &server,
        json!([file_json("a.txt", "1.00", "2026-08-01T10:00:00Z")]),
        Some(1),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/rename-file"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": false, "error": "File not found"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut ctl = controller_for(&server);
    ctl.refresh_files().await.unwrap();

    let err = ctl.rename_file("a.txt", "b.txt").await.unwrap_err();
    assert!(matches!(err, AppError::RemoteRejected(_)));
    assert_eq!(ctl.snapshot().files[0].name, "a.txt");
}

#[tokio::test]
async fn rename_resolves_collisions_against_visible_names() {
    let server = MockServer::start().await;
    mock_files(
        &server,
        json!([
            file_json("a.txt", "1.00", "2026-08-02T10:00:00Z"),
            file_json("b.txt", "1.00", "2026-08-01T10:00:00Z"),
        ]),
        None,
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/rename-file"))
        .and(body_partial_json(json!({
            "file_id": "b.txt",
            "new_file_name": "a (1).txt"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let mut ctl = controller_for(&server);
    ctl.refresh_files().await.unwrap();

    let final_name = ctl.rename_file("b.txt", "a.txt").await.unwrap();
    assert_eq!(final_name, "a (1).txt");
}

#[tokio::test]
async fn empty_rename_is_refused_client_side() {
    let server = MockServer::start().await;
    mock_files(
        &server,
        json!([file_json("a.txt", "1.00", "2026-08-01T10:00:00Z")]),
        None,
    )
    .await;

    let mut ctl = controller_for(&server);
    ctl.refresh_files().await.unwrap();

    let err = ctl.rename_file("a.txt", "   ").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn declined_delete_converges_on_the_server_view() {
    let server = MockServer::start().await;
    mock_quota(&server, 0.0, 2048.0, None).await;
    // The server already dropped the record (a faster delete won); the
    // decline still reconciles, so the row does not reappear or duplicate.
    mock_files(
        &server,
        json!([file_json("a.txt", "1.00", "2026-08-01T10:00:00Z")]),
        Some(1),
    )
    .await;
    mock_files(&server, json!([]), None).await;
    Mock::given(method("POST"))
        .and(path("/api/delete-file"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": false, "error": "File not found"})),
        )
        .mount(&server)
        .await;

    let mut ctl = controller_for(&server);
    ctl.refresh_files().await.unwrap();

    let err = ctl.delete_file("a.txt").await.unwrap_err();
    assert!(matches!(err, AppError::RemoteRejected(_)));
    assert!(ctl.snapshot().files.is_empty());

    // A second delete of the same id is a local no-op.
    ctl.delete_file("a.txt").await.unwrap();
    assert!(ctl.snapshot().files.is_empty());
}

#[tokio::test]
async fn successful_delete_reconciles_files_and_quota() {
    let server = MockServer::start().await;
    mock_quota(&server, 50.0, 2048.0, Some(1)).await;
    mock_quota(&server, 0.0, 2048.0, None).await;
    mock_files(
        &server,
        json!([file_json("a.txt", "50.00", "2026-08-01T10:00:00Z")]),
        Some(1),
    )
    .await;
    mock_files(&server, json!([]), None).await;
    Mock::given(method("POST"))
        .and(path("/api/delete-file"))
        .and(body_partial_json(json!({"file_id": "a.txt", "file_size_mb": 50.0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let mut ctl = controller_for(&server);
    ctl.refresh().await.unwrap();

    ctl.delete_file("a.txt").await.unwrap();
    let snap = ctl.snapshot();
    assert!(snap.files.is_empty());
    assert_eq!(snap.quota.used_mb, 0.0);
}

#[tokio::test]
async fn quota_refresh_with_room_dissolves_the_exceeded_dialog() {
    let server = MockServer::start().await;
    mock_quota(&server, 1800.0, 2048.0, Some(1)).await;
    mock_quota(&server, 1800.0, 5120.0, None).await;
    mock_files(&server, json!([]), None).await;

    let mut ctl = controller_for(&server);
    ctl.refresh().await.unwrap();

    assert!(ctl.upload_named("big.bin", 300 * MB).await.is_err());
    assert!(ctl.snapshot().quota_exceeded.is_some());

    // An admin approved more storage; the next poll notices the file fits.
    ctl.refresh_quota().await.unwrap();
    let snap = ctl.snapshot();
    assert!(snap.quota_exceeded.is_none());
    assert_eq!(snap.upload_phase, UploadPhase::Idle);
}

#[tokio::test]
async fn purchase_flow_submits_and_resets() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/request-storage"))
        .and(body_partial_json(json!({
            "username": "alice",
            "additional_storage_gb": 3,
            "price": 30000,
            "payment_details": {
                "cardNumber": "4111 1111 1111 1111",
                "cardName": "Jane Doe",
                "expiryDate": "12/26",
                "country": "Cameroon"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "Payment request submitted successfully"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut ctl = controller_for(&server);
    ctl.open_purchase();
    ctl.select_plan(PLANS[1]);
    ctl.set_payment_field(PaymentField::CardNumber, "4111111111111111");
    ctl.set_payment_field(PaymentField::CardName, "Jane Doe");
    ctl.set_payment_field(PaymentField::Expiry, "1226");
    ctl.set_payment_field(PaymentField::Cvv, "123");
    ctl.set_payment_field(PaymentField::BillingAddress, "123 Main St");

    ctl.submit_purchase().await.unwrap();

    let snap = ctl.snapshot();
    assert_eq!(snap.purchase_phase, PurchasePhase::Closed);
    assert!(snap.selected_plan.is_none());
    assert_eq!(snap.payment_draft.card_number, "");
    // The quota is untouched until an admin approves and a refresh lands.
    assert_eq!(snap.quota.used_mb, 0.0);
    assert_eq!(snap.quota.total_mb, 2048.0);
}

#[tokio::test]
async fn declined_purchase_keeps_the_draft_for_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/request-storage"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"result": "Payment request failed"})),
        )
        .mount(&server)
        .await;

    let mut ctl = controller_for(&server);
    ctl.open_purchase();
    ctl.select_plan(PLANS[0]);
    ctl.set_payment_field(PaymentField::CardNumber, "4111111111111111");
    ctl.set_payment_field(PaymentField::CardName, "Jane Doe");
    ctl.set_payment_field(PaymentField::Expiry, "1226");
    ctl.set_payment_field(PaymentField::Cvv, "123");
    ctl.set_payment_field(PaymentField::BillingAddress, "123 Main St");

    let err = ctl.submit_purchase().await.unwrap_err();
    assert!(matches!(err, AppError::RemoteRejected(_)));

    let snap = ctl.snapshot();
    assert_eq!(snap.purchase_phase, PurchasePhase::PaymentEntry);
    assert_eq!(snap.payment_draft.card_name, "Jane Doe");
    assert_eq!(snap.payment_draft.card_number, "4111 1111 1111 1111");
}

#[tokio::test]
async fn polling_converges_and_stops_on_cancel() {
    let server = MockServer::start().await;
    mock_quota(&server, 10.0, 2048.0, None).await;
    mock_files(&server, json!([]), None).await;

    let config = Config {
        api_base_url: server.uri(),
        poll_interval_secs: 1,
        ..Default::default()
    };
    let client = ApiClient::new(&config).unwrap();
    let ctl = Arc::new(Mutex::new(DashboardController::new(
        config,
        client,
        SessionContext::new("alice", "tok", Role::User),
    )));

    let mut snapshots = ctl.lock().await.subscribe();
    let cancel = DashboardController::start_polling(&ctl).await;

    // Wait for the first background pass to land.
    tokio::time::timeout(std::time::Duration::from_secs(5), snapshots.changed())
        .await
        .expect("poll tick within the timeout")
        .unwrap();
    assert_eq!(snapshots.borrow_and_update().quota.used_mb, 10.0);

    cancel.cancel();
}

#[tokio::test]
async fn upload_from_disk_reads_the_real_size() {
    let server = MockServer::start().await;
    mock_quota(&server, 0.0, 2048.0, None).await;
    mock_files(&server, json!([]), None).await;
    Mock::given(method("POST"))
        .and(path("/api/grpc-call"))
        .and(body_partial_json(json!({
            "params": {"file_name": "payload.bin", "file_size_mb": 2.0}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"type": "SUCCESS"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payload.bin");
    tokio::fs::write(&path, vec![0u8; 2 * MB as usize]).await.unwrap();

    let mut ctl = controller_for(&server);
    ctl.refresh().await.unwrap();
    ctl.upload_path(&path).await.unwrap();
}

#[tokio::test]
async fn logout_clears_the_persisted_session() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let session_file = dir.path().join("session.json");

    let session = SessionContext::new("alice", "tok", Role::User);
    session.persist(&session_file).await.unwrap();

    let config = Config {
        api_base_url: server.uri(),
        session_file: session_file.to_string_lossy().into_owned(),
        ..Default::default()
    };
    let client = ApiClient::new(&config).unwrap();
    let mut ctl = DashboardController::new(config, client, session);

    ctl.logout().await.unwrap();
    assert!(SessionContext::restore(&session_file).await.is_none());
}
