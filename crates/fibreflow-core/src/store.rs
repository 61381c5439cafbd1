//! Store traits and supporting query types.
//!
//! The traits are implemented by storage backends (e.g.
//! `fibreflow-store-sqlite`). Higher layers (`fibreflow-api`,
//! `fibreflow-server`) depend on these abstractions, not on any concrete
//! backend.
//!
//! Each area of the domain has its own trait; they share a single error type
//! through [`StoreBase`], and [`FibreStore`] bundles them for callers that
//! need the whole surface.

use std::future::Future;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  analytics::DashboardSummary,
  audit::{AuditEntry, AuditQuery, NewAuditEntry},
  client::{Client, ClientUpdate, NewClient},
  contractor::{
    Assignment, AssignmentUpdate, Contractor, ContractorDocument, ContractorUpdate,
    NewAssignment, NewContractor, NewDocument,
  },
  procurement::{Boq, BoqUpdate, NewBoq, NewRfq, Rfq, RfqUpdate},
  project::{NewProject, Project, ProjectUpdate},
  rag::{RagHistoryEntry, RagInputs, RagScores},
  sow::{
    CustomerDrop, FibreSegment, NewCustomerDrop, NewFibreSegment, NewPole, Pole, SowSummary,
  },
  staff::{NewStaff, Staff, StaffUpdate},
  supplier::{NewSupplier, Supplier, SupplierUpdate},
};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Coarse classification of a backend failure, used by the API layer to pick
/// a status code and by the retry wrapper to decide whether to try again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
  NotFound,
  /// A uniqueness or referential constraint was violated.
  Conflict,
  Invalid,
  /// Lock contention or a similar condition that may clear on retry.
  Transient,
  Internal,
}

pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn class(&self) -> ErrorClass;
}

// ─── Query type ──────────────────────────────────────────────────────────────

pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Parameters shared by the `list_*` operations. Filters a given area does
/// not support are ignored.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
  /// Case-insensitive substring over the area's name-like columns.
  pub text:       Option<String>,
  /// Exact match on the stored status string.
  pub status:     Option<String>,
  pub client_id:  Option<Uuid>,
  pub project_id: Option<Uuid>,
  pub limit:      Option<usize>,
  pub offset:     Option<usize>,
}

impl ListQuery {
  pub fn for_project(project_id: Uuid) -> Self {
    Self { project_id: Some(project_id), ..Self::default() }
  }

  pub fn limit(&self) -> usize { self.limit.unwrap_or(DEFAULT_LIST_LIMIT) }

  pub fn offset(&self) -> usize { self.offset.unwrap_or(0) }

  /// Clamp the limit to `max`.
  pub fn capped(mut self, max: usize) -> Self {
    self.limit = Some(self.limit().min(max));
    self
  }
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Common supertrait carrying the backend's error type.
///
/// All methods on the area traits return `Send` futures so they can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait StoreBase: Send + Sync {
  type Error: StoreError;
}

/// Update operations return `None` and delete operations return `false` when
/// the id does not exist.
pub trait ClientStore: StoreBase {
  fn create_client(
    &self,
    input: NewClient,
  ) -> impl Future<Output = Result<Client, Self::Error>> + Send + '_;

  fn get_client(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Client>, Self::Error>> + Send + '_;

  fn list_clients<'a>(
    &'a self,
    query: &'a ListQuery,
  ) -> impl Future<Output = Result<Vec<Client>, Self::Error>> + Send + 'a;

  fn update_client(
    &self,
    id: Uuid,
    update: ClientUpdate,
  ) -> impl Future<Output = Result<Option<Client>, Self::Error>> + Send + '_;

  fn delete_client(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

pub trait StaffStore: StoreBase {
  fn create_staff(
    &self,
    input: NewStaff,
  ) -> impl Future<Output = Result<Staff, Self::Error>> + Send + '_;

  fn get_staff(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Staff>, Self::Error>> + Send + '_;

  fn list_staff<'a>(
    &'a self,
    query: &'a ListQuery,
  ) -> impl Future<Output = Result<Vec<Staff>, Self::Error>> + Send + 'a;

  fn update_staff(
    &self,
    id: Uuid,
    update: StaffUpdate,
  ) -> impl Future<Output = Result<Option<Staff>, Self::Error>> + Send + '_;

  fn delete_staff(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Insert or update one batch keyed on `employee_id`, as a single
  /// statement. Returns the number of rows written.
  fn upsert_staff(
    &self,
    batch: Vec<NewStaff>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}

pub trait ContractorStore: StoreBase {
  fn create_contractor(
    &self,
    input: NewContractor,
  ) -> impl Future<Output = Result<Contractor, Self::Error>> + Send + '_;

  fn get_contractor(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Contractor>, Self::Error>> + Send + '_;

  fn list_contractors<'a>(
    &'a self,
    query: &'a ListQuery,
  ) -> impl Future<Output = Result<Vec<Contractor>, Self::Error>> + Send + 'a;

  fn update_contractor(
    &self,
    id: Uuid,
    update: ContractorUpdate,
  ) -> impl Future<Output = Result<Option<Contractor>, Self::Error>> + Send + '_;

  /// Assignments, documents and RAG history are removed with the contractor.
  fn delete_contractor(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Assignments ───────────────────────────────────────────────────────

  fn create_assignment(
    &self,
    input: NewAssignment,
  ) -> impl Future<Output = Result<Assignment, Self::Error>> + Send + '_;

  fn list_assignments(
    &self,
    contractor_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Assignment>, Self::Error>> + Send + '_;

  fn update_assignment(
    &self,
    id: Uuid,
    update: AssignmentUpdate,
  ) -> impl Future<Output = Result<Option<Assignment>, Self::Error>> + Send + '_;

  // ── Documents ─────────────────────────────────────────────────────────

  fn create_document(
    &self,
    input: NewDocument,
  ) -> impl Future<Output = Result<ContractorDocument, Self::Error>> + Send + '_;

  fn list_documents(
    &self,
    contractor_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ContractorDocument>, Self::Error>> + Send + '_;

  fn delete_document(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── RAG ───────────────────────────────────────────────────────────────

  /// Gather the aggregates the RAG rules need, as of `today`. Returns `None`
  /// if the contractor does not exist.
  fn rag_inputs(
    &self,
    contractor_id: Uuid,
    today: NaiveDate,
  ) -> impl Future<Output = Result<Option<RagInputs>, Self::Error>> + Send + '_;

  /// Store `scores` on the contractor and append a history row, atomically.
  fn apply_rag(
    &self,
    contractor_id: Uuid,
    scores: RagScores,
  ) -> impl Future<Output = Result<RagHistoryEntry, Self::Error>> + Send + '_;

  /// Newest first.
  fn rag_history(
    &self,
    contractor_id: Uuid,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<RagHistoryEntry>, Self::Error>> + Send + '_;
}

pub trait SupplierStore: StoreBase {
  fn create_supplier(
    &self,
    input: NewSupplier,
  ) -> impl Future<Output = Result<Supplier, Self::Error>> + Send + '_;

  fn get_supplier(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Supplier>, Self::Error>> + Send + '_;

  fn list_suppliers<'a>(
    &'a self,
    query: &'a ListQuery,
  ) -> impl Future<Output = Result<Vec<Supplier>, Self::Error>> + Send + 'a;

  fn update_supplier(
    &self,
    id: Uuid,
    update: SupplierUpdate,
  ) -> impl Future<Output = Result<Option<Supplier>, Self::Error>> + Send + '_;

  fn delete_supplier(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

pub trait ProjectStore: StoreBase {
  fn create_project(
    &self,
    input: NewProject,
  ) -> impl Future<Output = Result<Project, Self::Error>> + Send + '_;

  fn get_project(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Project>, Self::Error>> + Send + '_;

  fn list_projects<'a>(
    &'a self,
    query: &'a ListQuery,
  ) -> impl Future<Output = Result<Vec<Project>, Self::Error>> + Send + 'a;

  fn update_project(
    &self,
    id: Uuid,
    update: ProjectUpdate,
  ) -> impl Future<Output = Result<Option<Project>, Self::Error>> + Send + '_;

  fn delete_project(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

pub trait ProcurementStore: StoreBase {
  /// The stored total is computed from the items.
  fn create_boq(
    &self,
    input: NewBoq,
  ) -> impl Future<Output = Result<Boq, Self::Error>> + Send + '_;

  fn get_boq(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Boq>, Self::Error>> + Send + '_;

  fn list_boqs<'a>(
    &'a self,
    query: &'a ListQuery,
  ) -> impl Future<Output = Result<Vec<Boq>, Self::Error>> + Send + 'a;

  fn update_boq(
    &self,
    id: Uuid,
    update: BoqUpdate,
  ) -> impl Future<Output = Result<Option<Boq>, Self::Error>> + Send + '_;

  fn delete_boq(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn create_rfq(
    &self,
    input: NewRfq,
  ) -> impl Future<Output = Result<Rfq, Self::Error>> + Send + '_;

  fn get_rfq(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Rfq>, Self::Error>> + Send + '_;

  fn list_rfqs<'a>(
    &'a self,
    query: &'a ListQuery,
  ) -> impl Future<Output = Result<Vec<Rfq>, Self::Error>> + Send + 'a;

  fn update_rfq(
    &self,
    id: Uuid,
    update: RfqUpdate,
  ) -> impl Future<Output = Result<Option<Rfq>, Self::Error>> + Send + '_;

  fn delete_rfq(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

/// Scope-of-work records. Each `upsert_*` call writes one batch as a single
/// multi-row statement keyed on `(project_id, natural key)`; callers are
/// responsible for de-duplicating keys within the batch.
pub trait SowStore: StoreBase {
  fn upsert_poles(
    &self,
    project_id: Uuid,
    batch: Vec<NewPole>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  fn upsert_drops(
    &self,
    project_id: Uuid,
    batch: Vec<NewCustomerDrop>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  fn upsert_fibre(
    &self,
    project_id: Uuid,
    batch: Vec<NewFibreSegment>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// `query.project_id` is required; without it the result is empty.
  fn list_poles<'a>(
    &'a self,
    query: &'a ListQuery,
  ) -> impl Future<Output = Result<Vec<Pole>, Self::Error>> + Send + 'a;

  fn list_drops<'a>(
    &'a self,
    query: &'a ListQuery,
  ) -> impl Future<Output = Result<Vec<CustomerDrop>, Self::Error>> + Send + 'a;

  fn list_fibre<'a>(
    &'a self,
    query: &'a ListQuery,
  ) -> impl Future<Output = Result<Vec<FibreSegment>, Self::Error>> + Send + 'a;

  fn sow_summary(
    &self,
    project_id: Uuid,
  ) -> impl Future<Output = Result<SowSummary, Self::Error>> + Send + '_;
}

pub trait AuditStore: StoreBase {
  fn record_audit(
    &self,
    entry: NewAuditEntry,
  ) -> impl Future<Output = Result<AuditEntry, Self::Error>> + Send + '_;

  /// Newest first.
  fn list_audit<'a>(
    &'a self,
    query: &'a AuditQuery,
  ) -> impl Future<Output = Result<Vec<AuditEntry>, Self::Error>> + Send + 'a;
}

pub trait AnalyticsStore: StoreBase {
  fn dashboard_summary(
    &self,
  ) -> impl Future<Output = Result<DashboardSummary, Self::Error>> + Send + '_;
}

/// Everything the API needs from a backend.
pub trait FibreStore:
  ClientStore
  + StaffStore
  + ContractorStore
  + SupplierStore
  + ProjectStore
  + ProcurementStore
  + SowStore
  + AuditStore
  + AnalyticsStore
{
}

impl<T> FibreStore for T where
  T: ClientStore
    + StaffStore
    + ContractorStore
    + SupplierStore
    + ProjectStore
    + ProcurementStore
    + SowStore
    + AuditStore
    + AnalyticsStore
{
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn list_query_defaults_and_caps() {
    let q = ListQuery::default();
    assert_eq!(q.limit(), DEFAULT_LIST_LIMIT);
    assert_eq!(q.offset(), 0);

    let q = ListQuery { limit: Some(5000), ..ListQuery::default() }.capped(1000);
    assert_eq!(q.limit(), 1000);

    let q = ListQuery { limit: Some(10), ..ListQuery::default() }.capped(1000);
    assert_eq!(q.limit(), 10);
  }
}
