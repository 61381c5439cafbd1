//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use fibreflow_core::{
  audit::{AuditAction, AuditQuery, NewAuditEntry},
  client::{ClientStatus, ClientUpdate, NewClient},
  contractor::{AssignmentStatus, AssignmentUpdate, NewAssignment, NewContractor, NewDocument},
  procurement::{BoqItem, BoqUpdate, NewBoq, NewRfq, RfqStatus, RfqUpdate},
  project::NewProject,
  rag::{self, RagStatus},
  sow::{NewCustomerDrop, NewFibreSegment, NewPole},
  staff::{NewStaff, StaffStatus},
  store::{
    AnalyticsStore, AuditStore, ClientStore, ContractorStore, ErrorClass, ListQuery,
    ProcurementStore, ProjectStore, SowStore, StaffStore, StoreError, SupplierStore,
  },
  supplier::{NewSupplier, SupplierUpdate},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

async fn project(s: &SqliteStore, code: &str) -> Uuid {
  s.create_project(NewProject::new(code, format!("{code} rollout")))
    .await
    .unwrap()
    .id
}

// ─── Clients ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_client() {
  let s = store().await;
  let created = s
    .create_client(NewClient {
      email: Some("ops@vumatel.example".into()),
      city: Some("Cape Town".into()),
      ..NewClient::new("Vumatel")
    })
    .await
    .unwrap();
  assert_eq!(created.status, ClientStatus::Active);

  let fetched = s.get_client(created.id).await.unwrap().unwrap();
  assert_eq!(fetched.company_name, "Vumatel");
  assert_eq!(fetched.email.as_deref(), Some("ops@vumatel.example"));
  assert_eq!(fetched.created_at, created.created_at);
}

#[tokio::test]
async fn partial_update_keeps_other_fields() {
  let s = store().await;
  let created = s
    .create_client(NewClient {
      email: Some("a@example.com".into()),
      phone: Some("021 555 0101".into()),
      ..NewClient::new("Openserve")
    })
    .await
    .unwrap();

  let updated = s
    .update_client(created.id, ClientUpdate {
      phone: Some("021 555 0199".into()),
      ..ClientUpdate::default()
    })
    .await
    .unwrap()
    .unwrap();

  assert_eq!(updated.phone.as_deref(), Some("021 555 0199"));
  assert_eq!(updated.email.as_deref(), Some("a@example.com"));
  assert_eq!(updated.company_name, "Openserve");
  assert!(updated.updated_at >= created.updated_at);
}

#[tokio::test]
async fn update_and_delete_missing_client() {
  let s = store().await;
  let id = Uuid::new_v4();
  assert!(s.update_client(id, ClientUpdate::default()).await.unwrap().is_none());
  assert!(!s.delete_client(id).await.unwrap());
}

#[tokio::test]
async fn delete_then_get_returns_none() {
  let s = store().await;
  let c = s.create_client(NewClient::new("Frogfoot")).await.unwrap();
  assert!(s.delete_client(c.id).await.unwrap());
  assert!(s.get_client(c.id).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_company_name_is_conflict() {
  let s = store().await;
  s.create_client(NewClient::new("Metrofibre")).await.unwrap();
  let err = s.create_client(NewClient::new("Metrofibre")).await.unwrap_err();
  assert_eq!(err.class(), ErrorClass::Conflict);
}

#[tokio::test]
async fn invalid_input_is_rejected_before_write() {
  let s = store().await;
  let err = s
    .create_client(NewClient { email: Some("not-an-email".into()), ..NewClient::new("X") })
    .await
    .unwrap_err();
  assert_eq!(err.class(), ErrorClass::Invalid);
  assert!(s.list_clients(&ListQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn list_clients_filters_by_text_and_status() {
  let s = store().await;
  s.create_client(NewClient::new("Alpha Fibre")).await.unwrap();
  s.create_client(NewClient { status: ClientStatus::Prospect, ..NewClient::new("Beta Fibre") })
    .await
    .unwrap();
  s.create_client(NewClient::new("Gamma Telecom")).await.unwrap();

  let fibre = s
    .list_clients(&ListQuery { text: Some("FIBRE".into()), ..ListQuery::default() })
    .await
    .unwrap();
  assert_eq!(fibre.len(), 2);

  let prospects = s
    .list_clients(&ListQuery { status: Some("prospect".into()), ..ListQuery::default() })
    .await
    .unwrap();
  assert_eq!(prospects.len(), 1);
  assert_eq!(prospects[0].company_name, "Beta Fibre");

  let page = s
    .list_clients(&ListQuery { limit: Some(1), offset: Some(1), ..ListQuery::default() })
    .await
    .unwrap();
  assert_eq!(page.len(), 1);
  assert_eq!(page[0].company_name, "Beta Fibre");
}

#[tokio::test]
async fn client_with_projects_cannot_be_deleted() {
  let s = store().await;
  let c = s.create_client(NewClient::new("Octotel")).await.unwrap();
  s.create_project(NewProject { client_id: Some(c.id), ..NewProject::new("OCT-1", "Octotel") })
    .await
    .unwrap();
  let err = s.delete_client(c.id).await.unwrap_err();
  assert_eq!(err.class(), ErrorClass::Conflict);
}

// ─── Staff ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn staff_upsert_updates_on_employee_id() {
  let s = store().await;
  let first = s
    .create_staff(NewStaff { email: Some("t@example.com".into()), ..NewStaff::new("E1", "Thandi") })
    .await
    .unwrap();

  let written = s
    .upsert_staff(vec![
      NewStaff { status: Some(StaffStatus::OnLeave), ..NewStaff::new("E1", "Thandi Nkosi") },
      NewStaff::new("E2", "Sipho Dlamini"),
    ])
    .await
    .unwrap();
  assert_eq!(written, 2);

  let all = s.list_staff(&ListQuery::default()).await.unwrap();
  assert_eq!(all.len(), 2);

  let e1 = s.get_staff(first.id).await.unwrap().unwrap();
  assert_eq!(e1.name, "Thandi Nkosi");
  assert_eq!(e1.status, StaffStatus::OnLeave);
  // Blank cells in the import keep the stored value.
  assert_eq!(e1.email.as_deref(), Some("t@example.com"));
}

#[tokio::test]
async fn staff_upsert_without_status_keeps_the_stored_one() {
  let s = store().await;
  let e9 = s
    .create_staff(NewStaff { status: Some(StaffStatus::Terminated), ..NewStaff::new("E9", "Lerato") })
    .await
    .unwrap();

  s.upsert_staff(vec![
    NewStaff { phone: Some("082 555 0199".into()), ..NewStaff::new("E9", "Lerato Mokoena") },
    NewStaff::new("E10", "Johan"),
  ])
  .await
  .unwrap();

  let e9 = s.get_staff(e9.id).await.unwrap().unwrap();
  assert_eq!(e9.status, StaffStatus::Terminated);
  assert_eq!(e9.phone.as_deref(), Some("082 555 0199"));

  let listed = s
    .list_staff(&ListQuery { text: Some("E10".into()), ..ListQuery::default() })
    .await
    .unwrap();
  assert_eq!(listed[0].status, StaffStatus::Active);
}

#[tokio::test]
async fn staff_email_is_unique_when_present() {
  let s = store().await;
  s.create_staff(NewStaff { email: Some("same@example.com".into()), ..NewStaff::new("E1", "A") })
    .await
    .unwrap();
  let err = s
    .create_staff(NewStaff { email: Some("same@example.com".into()), ..NewStaff::new("E2", "B") })
    .await
    .unwrap_err();
  assert_eq!(err.class(), ErrorClass::Conflict);

  // Any number of staff may have no email.
  s.create_staff(NewStaff::new("E3", "C")).await.unwrap();
  s.create_staff(NewStaff::new("E4", "D")).await.unwrap();
}

#[tokio::test]
async fn empty_staff_batch_is_a_no_op() {
  let s = store().await;
  assert_eq!(s.upsert_staff(vec![]).await.unwrap(), 0);
}

// ─── Contractors & RAG ───────────────────────────────────────────────────────

#[tokio::test]
async fn rag_inputs_aggregate_assignments_and_documents() {
  let s = store().await;
  let p = project(&s, "P-RAG").await;
  let c = s
    .create_contractor(NewContractor {
      insurance_coverage: 2_500_000.0,
      insurance_expiry: Some(date(2026, 1, 1)),
      ..NewContractor::new("Acme Civils", "2019/123456/07")
    })
    .await
    .unwrap();

  s.create_assignment(NewAssignment { end_date: Some(date(2025, 5, 1)), ..NewAssignment::new(c.id, p) })
    .await
    .unwrap();
  s.create_assignment(NewAssignment {
    status: AssignmentStatus::InProgress,
    end_date: Some(date(2025, 12, 1)),
    ..NewAssignment::new(c.id, p)
  })
  .await
  .unwrap();
  let done = s
    .create_assignment(NewAssignment {
      status: AssignmentStatus::Completed,
      quality_score: Some(80.0),
      safety_incidents: 1,
      ..NewAssignment::new(c.id, p)
    })
    .await
    .unwrap();
  s.update_assignment(done.id, AssignmentUpdate { safety_incidents: Some(2), ..Default::default() })
    .await
    .unwrap()
    .unwrap();
  s.create_document(NewDocument {
    contractor_id:   c.id,
    document_type:   "tax_clearance".into(),
    document_number: None,
    expiry_date:     Some(date(2025, 1, 31)),
    verified:        true,
  })
  .await
  .unwrap();

  let inputs = s.rag_inputs(c.id, date(2025, 6, 1)).await.unwrap().unwrap();
  assert_eq!(inputs.active_projects, 2);
  assert_eq!(inputs.overdue_projects, 1);
  assert_eq!(inputs.average_quality, Some(80.0));
  assert_eq!(inputs.safety_incidents, 2);
  assert_eq!(inputs.expired_documents, 1);
  assert_eq!(inputs.insurance_expiry, Some(date(2026, 1, 1)));

  let scores = rag::evaluate(&inputs, date(2025, 6, 1));
  assert_eq!(scores.financial, RagStatus::Red);
}

#[tokio::test]
async fn rag_inputs_for_missing_contractor() {
  let s = store().await;
  assert!(s.rag_inputs(Uuid::new_v4(), date(2025, 1, 1)).await.unwrap().is_none());
}

#[tokio::test]
async fn apply_rag_updates_contractor_and_appends_history() {
  let s = store().await;
  let c = s
    .create_contractor(NewContractor::new("Fibre Diggers", "2020/000001/07"))
    .await
    .unwrap();
  assert!(c.rag.is_none());

  let amber = rag::RagScores::from_parts(
    RagStatus::Green,
    RagStatus::Amber,
    RagStatus::Green,
    RagStatus::Green,
  );
  let first = s.apply_rag(c.id, amber).await.unwrap();
  assert_eq!(first.previous_overall, None);
  assert!(first.changed());

  let red = rag::RagScores::from_parts(
    RagStatus::Red,
    RagStatus::Amber,
    RagStatus::Green,
    RagStatus::Green,
  );
  let second = s.apply_rag(c.id, red).await.unwrap();
  assert_eq!(second.previous_overall, Some(RagStatus::Amber));
  assert!(second.turned_red());

  let stored = s.get_contractor(c.id).await.unwrap().unwrap();
  assert_eq!(stored.rag, Some(red));
  assert!(stored.rag_updated_at.is_some());

  let history = s.rag_history(c.id, 10).await.unwrap();
  assert_eq!(history.len(), 2);
  assert_eq!(history[0].id, second.id);
}

#[tokio::test]
async fn apply_rag_to_missing_contractor_is_not_found() {
  let s = store().await;
  let scores = rag::RagScores::from_parts(
    RagStatus::Green,
    RagStatus::Green,
    RagStatus::Green,
    RagStatus::Green,
  );
  let err = s.apply_rag(Uuid::new_v4(), scores).await.unwrap_err();
  assert_eq!(err.class(), ErrorClass::NotFound);
}

#[tokio::test]
async fn deleting_contractor_removes_dependents() {
  let s = store().await;
  let p = project(&s, "P-DEL").await;
  let c = s.create_contractor(NewContractor::new("Gone Ltd", "1")).await.unwrap();
  s.create_assignment(NewAssignment::new(c.id, p)).await.unwrap();
  assert!(s.delete_contractor(c.id).await.unwrap());
  assert!(s.list_assignments(c.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn assignment_for_unknown_project_is_conflict() {
  let s = store().await;
  let c = s.create_contractor(NewContractor::new("Orphan", "2")).await.unwrap();
  let err = s
    .create_assignment(NewAssignment::new(c.id, Uuid::new_v4()))
    .await
    .unwrap_err();
  assert_eq!(err.class(), ErrorClass::Conflict);
}

// ─── Suppliers ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn supplier_lists_round_trip_and_update() {
  let s = store().await;
  let sup = s
    .create_supplier(NewSupplier {
      categories: vec!["cable".into(), "poles".into()],
      certifications: vec!["ISO9001".into()],
      rating: 4.5,
      ..NewSupplier::new("Cables R Us", "CRU")
    })
    .await
    .unwrap();
  assert_eq!(sup.categories, ["cable", "poles"]);

  let updated = s
    .update_supplier(sup.id, SupplierUpdate { preferred: Some(true), ..Default::default() })
    .await
    .unwrap()
    .unwrap();
  assert!(updated.preferred);
  assert_eq!(updated.certifications, ["ISO9001"]);
  assert_eq!(updated.rating, 4.5);
}

#[tokio::test]
async fn paging_over_tied_names_visits_every_row_once() {
  let s = store().await;
  let mut suppliers = Vec::new();
  let mut contractors = Vec::new();
  for i in 0..5 {
    suppliers.push(s.create_supplier(NewSupplier::new("Same Name", format!("S{i}"))).await.unwrap().id);
    contractors
      .push(s.create_contractor(NewContractor::new("Same Name", format!("R{i}"))).await.unwrap().id);
  }

  let mut seen_suppliers = Vec::new();
  let mut seen_contractors = Vec::new();
  for offset in [0, 2, 4] {
    let page = ListQuery { limit: Some(2), offset: Some(offset), ..ListQuery::default() };
    seen_suppliers.extend(s.list_suppliers(&page).await.unwrap().into_iter().map(|x| x.id));
    seen_contractors.extend(s.list_contractors(&page).await.unwrap().into_iter().map(|x| x.id));
  }

  suppliers.sort();
  seen_suppliers.sort();
  assert_eq!(seen_suppliers, suppliers);
  contractors.sort();
  seen_contractors.sort();
  assert_eq!(seen_contractors, contractors);
}

// ─── Procurement ─────────────────────────────────────────────────────────────

fn item(qty: f64, price: f64) -> BoqItem {
  BoqItem {
    item_code:   "DUCT-110".into(),
    description: "110mm duct".into(),
    unit:        "m".into(),
    quantity:    qty,
    unit_price:  price,
  }
}

#[tokio::test]
async fn boq_total_follows_items() {
  let s = store().await;
  let p = project(&s, "P-BOQ").await;
  let boq = s
    .create_boq(NewBoq { items: vec![item(100.0, 45.0)], ..NewBoq::new(p, "BOQ-1", "Civils") })
    .await
    .unwrap();
  assert_eq!(boq.total_amount, 4_500.0);
  assert_eq!(boq.currency, "ZAR");

  let renamed = s
    .update_boq(boq.id, BoqUpdate { title: Some("Civils phase 1".into()), ..Default::default() })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(renamed.total_amount, 4_500.0);

  let repriced = s
    .update_boq(boq.id, BoqUpdate {
      items: Some(vec![item(100.0, 45.0), item(10.0, 10.0)]),
      ..Default::default()
    })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(repriced.total_amount, 4_600.0);
  assert_eq!(repriced.items.len(), 2);

  let listed = s.list_boqs(&ListQuery::for_project(p)).await.unwrap();
  assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn boq_number_is_unique_across_projects_and_versions() {
  let s = store().await;
  let a = project(&s, "P-A").await;
  let b = project(&s, "P-B").await;
  s.create_boq(NewBoq::new(a, "BOQ-001", "Civils")).await.unwrap();

  let err = s.create_boq(NewBoq::new(b, "BOQ-001", "Civils")).await.unwrap_err();
  assert_eq!(err.class(), ErrorClass::Conflict);

  let err = s
    .create_boq(NewBoq { version: 2, ..NewBoq::new(a, "BOQ-001", "Civils rev 2") })
    .await
    .unwrap_err();
  assert_eq!(err.class(), ErrorClass::Conflict);
}

#[tokio::test]
async fn rfq_award_requires_supplier() {
  let s = store().await;
  let p = project(&s, "P-RFQ").await;
  let rfq = s.create_rfq(NewRfq::new(p, "RFQ-1", "Poles")).await.unwrap();

  let err = s
    .update_rfq(rfq.id, RfqUpdate { status: Some(RfqStatus::Awarded), ..Default::default() })
    .await
    .unwrap_err();
  assert_eq!(err.class(), ErrorClass::Invalid);

  let sup = s.create_supplier(NewSupplier::new("PoleCo", "PC")).await.unwrap();
  let awarded = s
    .update_rfq(rfq.id, RfqUpdate {
      status: Some(RfqStatus::Awarded),
      awarded_supplier_id: Some(sup.id),
      ..Default::default()
    })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(awarded.status, RfqStatus::Awarded);
  assert_eq!(awarded.awarded_supplier_id, Some(sup.id));
}

// ─── SOW ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pole_upsert_updates_rather_than_duplicates() {
  let s = store().await;
  let p = project(&s, "P-SOW").await;

  s.upsert_poles(p, vec![NewPole {
    pole_number: "LAW.P.C001".into(),
    status: Some("planned".into()),
    latitude: Some(-26.1),
    ..NewPole::default()
  }])
  .await
  .unwrap();
  s.upsert_poles(p, vec![NewPole {
    pole_number: "LAW.P.C001".into(),
    status: Some("planted".into()),
    ..NewPole::default()
  }])
  .await
  .unwrap();

  let poles = s.list_poles(&ListQuery::for_project(p)).await.unwrap();
  assert_eq!(poles.len(), 1);
  assert_eq!(poles[0].status.as_deref(), Some("planted"));
  assert_eq!(poles[0].latitude, Some(-26.1));
}

#[tokio::test]
async fn same_pole_number_in_two_projects_is_two_rows() {
  let s = store().await;
  let a = project(&s, "P-A").await;
  let b = project(&s, "P-B").await;
  let pole = || vec![NewPole { pole_number: "P1".into(), ..NewPole::default() }];
  s.upsert_poles(a, pole()).await.unwrap();
  s.upsert_poles(b, pole()).await.unwrap();
  assert_eq!(s.list_poles(&ListQuery::for_project(a)).await.unwrap().len(), 1);
  assert_eq!(s.list_poles(&ListQuery::for_project(b)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn sow_lists_require_a_project() {
  let s = store().await;
  let p = project(&s, "P-REQ").await;
  s.upsert_drops(p, vec![NewCustomerDrop { drop_number: "D1".into(), ..Default::default() }])
    .await
    .unwrap();
  assert!(s.list_drops(&ListQuery::default()).await.unwrap().is_empty());
  assert_eq!(s.list_drops(&ListQuery::for_project(p)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn sow_summary_counts_and_sums_length() {
  let s = store().await;
  let p = project(&s, "P-SUM").await;
  let poles = (0..3).map(|i| NewPole { pole_number: format!("P{i}"), ..Default::default() });
  s.upsert_poles(p, poles.collect()).await.unwrap();
  s.upsert_fibre(p, vec![
    NewFibreSegment { segment_id: "S1".into(), length: Some(120.5), ..Default::default() },
    NewFibreSegment { segment_id: "S2".into(), length: None, ..Default::default() },
    NewFibreSegment {
      segment_id: "S3".into(),
      length: Some(79.5),
      fibre_count: Some(24),
      ..Default::default()
    },
  ])
  .await
  .unwrap();

  let summary = s.sow_summary(p).await.unwrap();
  assert_eq!(summary.poles, 3);
  assert_eq!(summary.drops, 0);
  assert_eq!(summary.fibre_segments, 3);
  assert_eq!(summary.fibre_length, 200.0);

  let fibre = s.list_fibre(&ListQuery::for_project(p)).await.unwrap();
  assert_eq!(fibre[2].fibre_count, Some(24));
}

#[tokio::test]
async fn sow_upsert_into_unknown_project_is_conflict() {
  let s = store().await;
  let err = s
    .upsert_poles(Uuid::new_v4(), vec![NewPole { pole_number: "P1".into(), ..Default::default() }])
    .await
    .unwrap_err();
  assert_eq!(err.class(), ErrorClass::Conflict);
}

// ─── Audit & analytics ───────────────────────────────────────────────────────

#[tokio::test]
async fn audit_entries_filter_and_order_newest_first() {
  let s = store().await;
  let id = Uuid::new_v4();
  s.record_audit(NewAuditEntry::new("client", Some(id), AuditAction::Create)).await.unwrap();
  s.record_audit(
    NewAuditEntry::new("client", Some(id), AuditAction::Update)
      .actor(Some("thandi".into()))
      .details(serde_json::json!({ "fields": ["phone"] })),
  )
  .await
  .unwrap();
  s.record_audit(NewAuditEntry::new("staff", None, AuditAction::Import)).await.unwrap();

  let entries = s
    .list_audit(&AuditQuery { entity_id: Some(id), ..AuditQuery::default() })
    .await
    .unwrap();
  assert_eq!(entries.len(), 2);
  assert_eq!(entries[0].action, AuditAction::Update);
  assert_eq!(entries[0].actor.as_deref(), Some("thandi"));
  assert_eq!(entries[0].details["fields"][0], "phone");

  let staff = s
    .list_audit(&AuditQuery { entity_type: Some("staff".into()), ..AuditQuery::default() })
    .await
    .unwrap();
  assert_eq!(staff.len(), 1);
}

#[tokio::test]
async fn dashboard_summary_counts_everything() {
  let s = store().await;
  s.create_client(NewClient::new("Vumatel")).await.unwrap();
  let p = project(&s, "P-DASH").await;
  s.create_staff(NewStaff::new("E1", "A")).await.unwrap();
  s.create_staff(NewStaff { status: Some(StaffStatus::Terminated), ..NewStaff::new("E2", "B") })
    .await
    .unwrap();
  let c = s.create_contractor(NewContractor::new("C", "R1")).await.unwrap();
  s.create_contractor(NewContractor::new("D", "R2")).await.unwrap();
  s.apply_rag(
    c.id,
    rag::RagScores::from_parts(RagStatus::Red, RagStatus::Green, RagStatus::Green, RagStatus::Green),
  )
  .await
  .unwrap();
  s.upsert_fibre(p, vec![NewFibreSegment {
    segment_id: "S1".into(),
    length: Some(50.0),
    ..Default::default()
  }])
  .await
  .unwrap();

  let d = s.dashboard_summary().await.unwrap();
  assert_eq!(d.clients, 1);
  assert_eq!(d.active_staff, 1);
  assert_eq!(d.contractors, 2);
  assert_eq!(d.projects_by_status["planning"], 1);
  assert_eq!(d.fibre_segments, 1);
  assert_eq!(d.fibre_length, 50.0);
  assert_eq!(d.rag.red, 1);
  assert_eq!(d.rag.unscored, 1);
}
