//! Integration tests for uploads, history, dashboard and report endpoints.

mod common;

use axum::http::StatusCode;
use common::{
    body_bytes, body_json, delete_auth, get, get_auth, multipart_body, post_multipart, token,
    upload_csv, PLANT_CSV,
};

/// Upload `PLANT_CSV` `n` times as `upload_{i}.csv`, returning the snapshot ids.
async fn upload_n(app: &axum::Router, token: &str, n: usize) -> Vec<i64> {
    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        let response = upload_csv(app.clone(), token, &format!("upload_{i}.csv"), PLANT_CSV).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        ids.push(body_json(response).await["data"]["id"].as_i64().unwrap());
    }
    ids
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_returns_201_with_summary() {
    let (app, store) = common::build_test_app();
    let response = upload_csv(app, &token(1), "plant.csv", PLANT_CSV).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let data = &json["data"];

    assert!(data["id"].is_i64());
    assert_eq!(data["file_name"], "plant.csv");
    assert_eq!(data["total_records"], 3);
    let avg_pressure = data["avg_pressure"].as_f64().unwrap();
    assert!((avg_pressure - 17.0 / 3.0).abs() < 1e-9);
    assert_eq!(data["avg_temperature"], 135.0);
    assert!(data["uploaded_at"].is_string());
    assert!(data.get("owner_id").is_none(), "owner id must not leak");
    assert_eq!(data["warnings"], serde_json::json!([]));

    assert_eq!(store.snapshot_count().unwrap(), 1);
    assert_eq!(store.row_count().unwrap(), 3);
}

#[tokio::test]
async fn upload_reports_coerced_cells_as_warnings() {
    let (app, _) = common::build_test_app();
    let csv = "Equipment Name,Type,Pressure\nPump A,Pump,high\nValve B,Valve,4\n";
    let response = upload_csv(app, &token(1), "messy.csv", csv).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let warnings = json["data"]["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["row_index"], 0);
    assert_eq!(warnings[0]["value"], "high");
}

#[tokio::test]
async fn upload_strips_client_path_from_file_name() {
    let (app, _) = common::build_test_app();
    let response = upload_csv(app, &token(1), "exports/2024/plant.csv", PLANT_CSV).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["data"]["file_name"], "plant.csv");
}

#[tokio::test]
async fn upload_without_file_field_returns_400() {
    let (app, store) = common::build_test_app();
    let body = multipart_body("attachment", "plant.csv", PLANT_CSV.as_bytes());
    let response = post_multipart(app, &token(1), body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "No file provided");
    assert_eq!(store.snapshot_count().unwrap(), 0);
}

#[tokio::test]
async fn unparseable_upload_returns_400_and_stores_nothing() {
    let (app, store) = common::build_test_app();
    upload_n(&app, &token(1), 2).await;

    let response = upload_csv(app, &token(1), "broken.csv", "name,type\n\"Pump,Pump\n").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "PARSE_ERROR");
    assert_eq!(store.snapshot_count().unwrap(), 2);
}

#[tokio::test]
async fn empty_upload_returns_parse_error() {
    let (app, _) = common::build_test_app();
    let response = upload_csv(app, &token(1), "empty.csv", "").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "PARSE_ERROR");
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let (app, store) = common::build_test_app();
    let mut csv = String::from("Equipment Name,Pressure\n");
    while csv.len() <= common::test_config().max_upload_bytes {
        csv.push_str("Pump,1.0\n");
    }
    let response = upload_csv(app, &token(1), "huge.csv", &csv).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(store.snapshot_count().unwrap(), 0);
}

#[tokio::test]
async fn upload_without_token_returns_401() {
    let (app, _) = common::build_test_app();
    let response = post_multipart(app, "not-a-jwt", multipart_body("file", "a.csv", b"x\n1\n")).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

// ---------------------------------------------------------------------------
// History and retention
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sixth_upload_evicts_oldest() {
    let (app, store) = common::build_test_app();
    let ids = upload_n(&app, &token(1), 6).await;

    let response = get_auth(app.clone(), "/api/v1/history", &token(1)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let listed: Vec<i64> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_i64().unwrap())
        .collect();

    let expected: Vec<i64> = ids[1..].iter().rev().copied().collect();
    assert_eq!(listed, expected);
    assert_eq!(store.snapshot_count().unwrap(), 5);
    assert_eq!(store.row_count().unwrap(), 15);

    let response = get_auth(app, &format!("/api/v1/uploads/{}", ids[0]), &token(1)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn history_respects_limit() {
    let (app, _) = common::build_test_app();
    let ids = upload_n(&app, &token(1), 3).await;

    let response = get_auth(app, "/api/v1/history?limit=2", &token(1)).await;
    let json = body_json(response).await;
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["id"].as_i64().unwrap(), ids[2]);
    assert_eq!(data[1]["id"].as_i64().unwrap(), ids[1]);
}

#[tokio::test]
async fn history_limit_out_of_range_returns_validation_error() {
    let (app, _) = common::build_test_app();

    for uri in ["/api/v1/history?limit=0", "/api/v1/history?limit=6"] {
        let response = get_auth(app.clone(), uri, &token(1)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn history_is_empty_for_new_owner() {
    let (app, _) = common::build_test_app();
    let response = get_auth(app, "/api/v1/history", &token(9)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"], serde_json::json!([]));
}

#[tokio::test]
async fn retention_is_per_owner() {
    let (app, store) = common::build_test_app();
    upload_n(&app, &token(1), 5).await;
    upload_n(&app, &token(2), 2).await;
    upload_n(&app, &token(1), 1).await;

    let response = get_auth(app, "/api/v1/history", &token(2)).await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 2);
    assert_eq!(store.snapshot_count().unwrap(), 7);
}

// ---------------------------------------------------------------------------
// Snapshot resources and owner scoping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rows_are_listed_in_file_order() {
    let (app, _) = common::build_test_app();
    let id = upload_n(&app, &token(1), 1).await[0];

    let response = get_auth(app, &format!("/api/v1/uploads/{id}/rows"), &token(1)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let rows = json["data"].as_array().unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["Pump A", "Valve B", "Reactor C"]);
    assert_eq!(rows[0]["equipment_id"], "EQ-0");
    assert_eq!(rows[2]["type"], "Reactor");
    assert_eq!(rows[1]["flowrate"], 80.0);
}

#[tokio::test]
async fn other_owners_snapshot_is_not_found() {
    let (app, _) = common::build_test_app();
    let id = upload_n(&app, &token(1), 1).await[0];

    for uri in [
        format!("/api/v1/uploads/{id}"),
        format!("/api/v1/uploads/{id}/rows"),
        format!("/api/v1/uploads/{id}/report"),
    ] {
        let response = get_auth(app.clone(), &uri, &token(2)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body_json(response).await["code"], "NOT_FOUND");
    }

    let response = delete_auth(app, &format!("/api/v1/uploads/{id}"), &token(2)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_snapshot_and_rows() {
    let (app, store) = common::build_test_app();
    let ids = upload_n(&app, &token(1), 2).await;

    let response = delete_auth(app.clone(), &format!("/api/v1/uploads/{}", ids[0]), &token(1)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(store.snapshot_count().unwrap(), 1);
    assert_eq!(store.row_count().unwrap(), 3);

    let response = delete_auth(app, &format!("/api/v1/uploads/{}", ids[0]), &token(1)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dashboard_without_uploads_returns_204() {
    let (app, _) = common::build_test_app();
    let response = get_auth(app, "/api/v1/dashboard", &token(1)).await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn dashboard_shows_latest_upload() {
    let (app, _) = common::build_test_app();
    upload_n(&app, &token(1), 1).await;
    let csv = "Equipment Name,Type,Flowrate\nP1,Pump,1\nP2,Pump,2\nV1,Valve,3\n";
    let response = upload_csv(app.clone(), &token(1), "latest.csv", csv).await;
    let latest_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = get_auth(app, "/api/v1/dashboard", &token(1)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["summary"]["id"].as_i64().unwrap(), latest_id);
    assert_eq!(data["summary"]["avg_flowrate"], 2.0);
    assert_eq!(
        data["distribution"],
        serde_json::json!([{"type": "Pump", "count": 2}, {"type": "Valve", "count": 1}])
    );
    assert_eq!(data["equipment_list"].as_array().unwrap().len(), 3);
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[tokio::test]
async fn report_is_a_pdf_attachment() {
    let (app, _) = common::build_test_app();
    let id = upload_n(&app, &token(1), 1).await[0];

    let response = get_auth(app, &format!("/api/v1/uploads/{id}/report"), &token(1)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/pdf");
    assert_eq!(
        response.headers()["content-disposition"],
        format!("attachment; filename=\"report_{id}.pdf\"").as_str()
    );

    let bytes = body_bytes(response).await;
    assert!(bytes.starts_with(b"%PDF-1.4"));
    assert!(bytes.trim_ascii_end().ends_with(b"%%EOF"));
}

#[tokio::test]
async fn latest_report_follows_newest_upload() {
    let (app, _) = common::build_test_app();
    let ids = upload_n(&app, &token(1), 2).await;

    let response = get_auth(app, "/api/v1/report/latest", &token(1)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-disposition"],
        format!("attachment; filename=\"report_{}.pdf\"", ids[1]).as_str()
    );
}

#[tokio::test]
async fn latest_report_without_uploads_returns_404() {
    let (app, _) = common::build_test_app();
    let response = get_auth(app, "/api/v1/report/latest", &token(1)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn report_requires_token() {
    let (app, _) = common::build_test_app();
    let response = get(app, "/api/v1/report/latest").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
