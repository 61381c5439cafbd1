//! Router-level tests against an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use fibreflow_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use super::*;

async fn app() -> Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  router(AppState::new(Arc::new(store)))
}

async fn send_raw(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  (status, bytes.to_vec())
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let builder = Request::builder().method(method).uri(uri);
  let req = match body {
    Some(b) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(b.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };
  let (status, bytes) = send_raw(app, req).await;
  let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
  (status, value)
}

async fn create(app: &Router, uri: &str, body: Value) -> Value {
  let (status, resp) = send(app, "POST", uri, Some(body)).await;
  assert_eq!(status, StatusCode::CREATED, "POST {uri}: {resp}");
  assert_eq!(resp["success"], true);
  resp["data"].clone()
}

async fn new_project(app: &Router, code: &str) -> String {
  let project = create(app, "/api/projects", json!({ "project_code": code, "name": "Lawley" })).await;
  project["id"].as_str().unwrap().to_owned()
}

// ── CRUD ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn post_then_get_by_id_returns_the_record() {
  let app = app().await;
  let client = create(
    &app,
    "/api/clients",
    json!({ "company_name": "Velocity Fibre", "email": "ops@velocity.example", "status": "prospect" }),
  )
  .await;
  let id = client["id"].as_str().unwrap();

  let (status, resp) = send(&app, "GET", &format!("/api/clients?id={id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(resp["data"]["company_name"], "Velocity Fibre");
  assert_eq!(resp["data"]["status"], "prospect");

  let (_, resp) = send(&app, "GET", "/api/clients", None).await;
  assert_eq!(resp["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn partial_update_changes_only_supplied_fields() {
  let app = app().await;
  let client = create(
    &app,
    "/api/clients",
    json!({ "company_name": "Velocity Fibre", "city": "Johannesburg" }),
  )
  .await;
  let id = client["id"].as_str().unwrap();

  let (status, resp) =
    send(&app, "PUT", &format!("/api/clients?id={id}"), Some(json!({ "phone": "011 555 0101" })))
      .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(resp["data"]["phone"], "011 555 0101");
  assert_eq!(resp["data"]["city"], "Johannesburg");
  assert_eq!(resp["data"]["company_name"], "Velocity Fibre");

  let (status, resp) =
    send(&app, "PATCH", &format!("/api/clients?id={id}"), Some(json!({ "city": "Pretoria" }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(resp["data"]["city"], "Pretoria");
  assert_eq!(resp["data"]["phone"], "011 555 0101");
}

#[tokio::test]
async fn delete_then_get_is_404() {
  let app = app().await;
  let client = create(&app, "/api/clients", json!({ "company_name": "Gone Ltd" })).await;
  let id = client["id"].as_str().unwrap();

  let (status, resp) = send(&app, "DELETE", &format!("/api/clients?id={id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(resp["success"], true);

  let (status, resp) = send(&app, "GET", &format!("/api/clients?id={id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(resp["success"], false);
  assert!(resp["error"].as_str().unwrap().contains(id));

  let (status, _) = send(&app, "DELETE", &format!("/api/clients?id={id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn request_errors_use_the_envelope() {
  let app = app().await;

  let (status, resp) = send(&app, "PUT", "/api/clients", Some(json!({ "city": "Durban" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(resp, json!({ "success": false, "error": "id is required" }));

  let (status, resp) =
    send(&app, "POST", "/api/clients", Some(json!({ "company_name": "X", "email": "nope" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(resp["success"], false);

  let req = Request::builder()
    .method("POST")
    .uri("/api/clients")
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from("{not json"))
    .unwrap();
  let (status, bytes) = send_raw(&app, req).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let resp: Value = serde_json::from_slice(&bytes).unwrap();
  assert_eq!(resp["success"], false);

  let (status, _) = send(&app, "GET", "/api/clients?id=not-a-uuid", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_unique_key_is_409() {
  let app = app().await;
  create(&app, "/api/clients", json!({ "company_name": "Velocity Fibre" })).await;
  let (status, resp) =
    send(&app, "POST", "/api/clients", Some(json!({ "company_name": "Velocity Fibre" }))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(resp["success"], false);
}

#[tokio::test]
async fn unknown_method_is_405_and_unknown_path_404() {
  let app = app().await;

  let (status, resp) = send(&app, "DELETE", "/api/staff/export", None).await;
  assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
  assert_eq!(resp, json!({ "success": false, "error": "method not allowed" }));

  let (status, resp) = send(&app, "GET", "/api/nowhere", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(resp["success"], false);
}

// ── SOW ──────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn importing_a_pole_twice_leaves_one_updated_row() {
  let app = app().await;
  let project_id = new_project(&app, "LAW-001").await;

  let (status, resp) = send(
    &app,
    "POST",
    "/api/sow/poles",
    Some(json!({
      "project_id": project_id,
      "poles": [
        { "Pole Number": "LAW.P.A001", "Status": "planned", "Height": "7,5" },
        { "pole_number": "LAW.P.A002" },
      ],
    })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{resp}");
  assert_eq!(resp["data"]["upserted"], 2);

  let (_, resp) = send(
    &app,
    "POST",
    "/api/sow/poles",
    Some(json!({
      "project_id": project_id,
      "poles": [{ "label_1": "LAW.P.A001", "status": "installed" }],
    })),
  )
  .await;
  assert_eq!(resp["data"]["upserted"], 1);

  let (status, resp) =
    send(&app, "GET", &format!("/api/sow/poles?project_id={project_id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  let poles = resp["data"].as_array().unwrap();
  assert_eq!(poles.len(), 2);
  let a001 = poles.iter().find(|p| p["pole_number"] == "LAW.P.A001").unwrap();
  assert_eq!(a001["status"], "installed");
  assert_eq!(a001["height"], 7.5);
}

#[tokio::test]
async fn import_reports_row_errors_and_duplicates() {
  let app = app().await;
  let project_id = new_project(&app, "LAW-002").await;

  let (_, resp) = send(
    &app,
    "POST",
    "/api/sow/drops",
    Some(json!({
      "project_id": project_id,
      "drops": [
        { "drop_number": "DR1", "address": "1 Main Rd" },
        { "address": "no key" },
        { "drop_number": "DR1", "address": "1 Main Road" },
      ],
    })),
  )
  .await;
  let report = &resp["data"];
  assert_eq!(report["total"], 3);
  assert_eq!(report["upserted"], 1);
  assert_eq!(report["failed"], 1);
  assert_eq!(report["duplicates"], 1);
  assert_eq!(report["batches"], 1);
  assert_eq!(report["errors"][0]["row"], 1);
}

#[tokio::test]
async fn csv_upload_is_imported_and_fingerprinted() {
  let app = app().await;
  let project_id = new_project(&app, "LAW-003").await;
  let csv = "Segment ID,From,To,Length\nF1,P1,P2,120.5\nF2,P2,P3,80\n";

  let req = Request::builder()
    .method("POST")
    .uri(format!("/api/sow/fibre/import?project_id={project_id}&format=csv"))
    .header("x-actor", "planner@example.com")
    .body(Body::from(csv))
    .unwrap();
  let (status, bytes) = send_raw(&app, req).await;
  let resp: Value = serde_json::from_slice(&bytes).unwrap();
  assert_eq!(status, StatusCode::OK, "{resp}");
  assert_eq!(resp["data"]["upserted"], 2);

  let (_, resp) = send(&app, "GET", &format!("/api/sow/summary?project_id={project_id}"), None).await;
  assert_eq!(resp["data"]["fibre_segments"], 2);
  assert_eq!(resp["data"]["fibre_length"], 200.5);

  let (_, resp) = send(&app, "GET", "/api/audit?entity_type=sow_fibre", None).await;
  let entry = &resp["data"][0];
  assert_eq!(entry["action"], "import");
  assert_eq!(entry["actor"], "planner@example.com");
  assert_eq!(entry["details"]["sha256"], imports::fingerprint(csv.as_bytes()));
}

#[tokio::test]
async fn sow_requests_need_an_existing_project() {
  let app = app().await;

  let (status, resp) = send(&app, "GET", "/api/sow/poles", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(resp["error"], "project_id is required");

  let missing = uuid::Uuid::new_v4();
  let (status, _) = send(
    &app,
    "POST",
    "/api/sow/poles",
    Some(json!({ "project_id": missing, "poles": [{ "pole_number": "P1" }] })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = send(&app, "GET", &format!("/api/sow/cables?project_id={missing}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Contractors & RAG ────────────────────────────────────────────────────────

#[tokio::test]
async fn overdue_assignment_scores_financial_red() {
  let app = app().await;
  let project_id = new_project(&app, "LAW-004").await;
  let contractor = create(
    &app,
    "/api/contractors",
    json!({
      "company_name": "Trench Masters",
      "registration_number": "2019/123456/07",
      "insurance_coverage": 5000000.0,
      "insurance_expiry": "2099-01-01",
    }),
  )
  .await;
  let contractor_id = contractor["id"].as_str().unwrap();
  create(
    &app,
    "/api/contractors/assignments",
    json!({
      "contractor_id": contractor_id,
      "project_id": project_id,
      "status": "in_progress",
      "end_date": "2020-01-31",
    }),
  )
  .await;

  let (status, resp) = send(
    &app,
    "POST",
    "/api/contractors/rag/calculate",
    Some(json!({ "contractor_id": contractor_id })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{resp}");
  let result = &resp["data"][0];
  assert_eq!(result["scores"]["financial"], "red");
  assert_eq!(result["scores"]["overall"], "red");
  assert_eq!(result["changed"], true);

  let (_, resp) = send(&app, "GET", &format!("/api/contractors?id={contractor_id}"), None).await;
  assert_eq!(resp["data"]["rag"]["overall"], "red");

  let (_, resp) = send(
    &app,
    "GET",
    &format!("/api/contractors/rag/history?contractor_id={contractor_id}"),
    None,
  )
  .await;
  assert_eq!(resp["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn rag_calculation_without_body_covers_everyone() {
  let app = app().await;
  for i in 0..3 {
    create(
      &app,
      "/api/contractors",
      json!({ "company_name": format!("Crew {i}"), "registration_number": format!("REG-{i}") }),
    )
    .await;
  }
  let (status, resp) = send(&app, "POST", "/api/contractors/rag/calculate", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(resp["data"].as_array().unwrap().len(), 3);

  let (_, resp) = send(&app, "GET", "/api/contractors/analytics", None).await;
  assert_eq!(resp["data"]["total"], 3);
  // No cover at all is a compliance failure.
  assert_eq!(resp["data"]["rag"]["red"], 3);
}

#[tokio::test]
async fn rag_for_unknown_contractor_is_404() {
  let app = app().await;
  let (status, _) = send(
    &app,
    "POST",
    "/api/contractors/rag/calculate",
    Some(json!({ "contractor_id": uuid::Uuid::new_v4() })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Suppliers & RFQs ─────────────────────────────────────────────────────────

#[tokio::test]
async fn rfq_matches_are_ranked_scores_in_unit_range() {
  let app = app().await;
  let project_id = new_project(&app, "LAW-005").await;
  for (code, rating, perf, status) in [
    ("SUP-A", 4.5, 90.0, "active"),
    ("SUP-B", 2.0, 40.0, "active"),
    ("SUP-C", 5.0, 100.0, "blocked"),
  ] {
    create(
      &app,
      "/api/suppliers",
      json!({
        "name": format!("Supplier {code}"),
        "supplier_code": code,
        "categories": ["civils"],
        "certifications": ["ISO9001"],
        "rating": rating,
        "performance_score": perf,
        "status": status,
      }),
    )
    .await;
  }
  let rfq = create(
    &app,
    "/api/rfqs",
    json!({
      "project_id": project_id,
      "rfq_number": "RFQ-001",
      "title": "Trenching",
      "category": "civils",
      "required_certifications": ["ISO9001"],
    }),
  )
  .await;
  let rfq_id = rfq["id"].as_str().unwrap();

  let (status, resp) = send(&app, "GET", &format!("/api/rfqs/matches?id={rfq_id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  let matches = resp["data"].as_array().unwrap();
  assert_eq!(matches.len(), 2, "blocked supplier must be excluded");
  assert_eq!(matches[0]["supplier"]["supplier_code"], "SUP-A");
  for m in matches {
    let score = m["score"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&score), "score {score}");
  }

  let (_, resp) = send(&app, "GET", "/api/suppliers/search?category=civils&min_rating=3", None).await;
  assert_eq!(resp["data"].as_array().unwrap().len(), 2);

  let id = matches[0]["supplier"]["id"].as_str().unwrap();
  let (_, resp) = send(&app, "GET", &format!("/api/suppliers/benchmark?id={id}"), None).await;
  assert_eq!(resp["data"]["rank"], 2);
  assert_eq!(resp["data"]["peer_count"], 2);
}

// ── Staff ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn staff_import_then_export_csv() {
  let app = app().await;
  let (status, resp) = send(
    &app,
    "POST",
    "/api/staff/import",
    Some(json!({
      "staff": [
        { "Employee ID": "E001", "Full Name": "Thandi Nkosi", "Department": "Planning" },
        { "EmpNo": "E002", "First Name": "Pieter", "Last Name": "Botha" },
      ],
    })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{resp}");
  assert_eq!(resp["data"]["upserted"], 2);

  let req = Request::builder().method("GET").uri("/api/staff/export").body(Body::empty()).unwrap();
  let resp = app.clone().oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
  assert!(
    resp.headers()[header::CONTENT_TYPE]
      .to_str()
      .unwrap()
      .starts_with("text/csv")
  );
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let csv = std::str::from_utf8(&bytes).unwrap();
  let mut lines = csv.lines();
  assert_eq!(
    lines.next(),
    Some("Employee ID,Name,Email,Phone,Department,Position,Status,Join Date")
  );
  assert_eq!(csv.lines().count(), 3);
  assert!(csv.contains("Pieter Botha"));
}

#[tokio::test]
async fn staff_reimport_without_status_keeps_stored_status() {
  let app = app().await;
  let member = create(
    &app,
    "/api/staff",
    json!({ "employee_id": "E9", "name": "Lerato Mokoena", "status": "terminated" }),
  )
  .await;
  let id = member["id"].as_str().unwrap();

  let (status, resp) = send(
    &app,
    "POST",
    "/api/staff/import",
    Some(json!({
      "staff": [{ "Employee ID": "E9", "Name": "Lerato Mokoena", "Phone": "082 555 0199" }],
    })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{resp}");
  assert_eq!(resp["data"]["upserted"], 1);

  let (_, resp) = send(&app, "GET", &format!("/api/staff?id={id}"), None).await;
  assert_eq!(resp["data"]["status"], "terminated");
  assert_eq!(resp["data"]["phone"], "082 555 0199");
}

#[tokio::test]
async fn duplicate_staff_email_is_409() {
  let app = app().await;
  create(
    &app,
    "/api/staff",
    json!({ "employee_id": "E1", "name": "Thandi", "email": "same@example.com" }),
  )
  .await;
  let (status, resp) = send(
    &app,
    "POST",
    "/api/staff",
    Some(json!({ "employee_id": "E2", "name": "Sipho", "email": "same@example.com" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(resp["success"], false);
}

// ── Procurement ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_boq_number_is_409_in_any_project_or_version() {
  let app = app().await;
  let a = new_project(&app, "P-A").await;
  let b = new_project(&app, "P-B").await;
  create(&app, "/api/boqs", json!({ "project_id": a, "boq_number": "BOQ-001", "title": "Civils" }))
    .await;

  for body in [
    json!({ "project_id": b, "boq_number": "BOQ-001", "title": "Civils" }),
    json!({ "project_id": a, "boq_number": "BOQ-001", "title": "Civils", "version": 2 }),
  ] {
    let (status, resp) = send(&app, "POST", "/api/boqs", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT, "{resp}");
  }
}

// ── Audit, analytics, CORS ───────────────────────────────────────────────────

#[tokio::test]
async fn mutations_are_audited_with_the_actor() {
  let app = app().await;
  let req = Request::builder()
    .method("POST")
    .uri("/api/clients")
    .header(header::CONTENT_TYPE, "application/json")
    .header("X-Actor", "alice@example.com")
    .body(Body::from(json!({ "company_name": "Audited Co" }).to_string()))
    .unwrap();
  let (status, _) = send_raw(&app, req).await;
  assert_eq!(status, StatusCode::CREATED);

  let (_, resp) = send(&app, "GET", "/api/audit?entity_type=client", None).await;
  let entries = resp["data"].as_array().unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0]["action"], "create");
  assert_eq!(entries[0]["actor"], "alice@example.com");
}

#[tokio::test]
async fn dashboard_counts_records() {
  let app = app().await;
  create(&app, "/api/clients", json!({ "company_name": "Velocity Fibre" })).await;
  new_project(&app, "LAW-006").await;

  let (status, resp) = send(&app, "GET", "/api/analytics/dashboard", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(resp["data"]["clients"], 1);
  assert_eq!(resp["data"]["projects_by_status"]["planning"], 1);
}

#[tokio::test]
async fn cors_is_permissive_unless_origins_are_listed() {
  let app = app().await.layer(cors_layer(&[]).unwrap());
  let req = Request::builder()
    .method("GET")
    .uri("/api/clients")
    .header(header::ORIGIN, "https://app.example.com")
    .body(Body::empty())
    .unwrap();
  let resp = app.oneshot(req).await.unwrap();
  assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

  let app = app_with_origins(&["https://app.example.com".to_owned()]).await;
  let req = Request::builder()
    .method("GET")
    .uri("/api/clients")
    .header(header::ORIGIN, "https://evil.example.com")
    .body(Body::empty())
    .unwrap();
  let resp = app.oneshot(req).await.unwrap();
  assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());

  assert!(cors_layer(&["bad\norigin".to_owned()]).is_err());
}

async fn app_with_origins(origins: &[String]) -> Router {
  app().await.layer(cors_layer(origins).unwrap())
}
