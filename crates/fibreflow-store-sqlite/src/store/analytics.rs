use fibreflow_core::{
  analytics::{DashboardSummary, RagDistribution},
  store::AnalyticsStore,
};

use super::SqliteStore;
use crate::Result;

impl AnalyticsStore for SqliteStore {
  async fn dashboard_summary(&self) -> Result<DashboardSummary> {
    let summary = self
      .conn
      .call(|conn| {
        let mut summary = conn.query_row(
          "SELECT
             (SELECT COUNT(*) FROM clients),
             (SELECT COUNT(*) FROM staff WHERE status = 'active'),
             (SELECT COUNT(*) FROM contractors),
             (SELECT COUNT(*) FROM suppliers),
             (SELECT COUNT(*) FROM sow_poles),
             (SELECT COUNT(*) FROM sow_drops),
             (SELECT COUNT(*) FROM sow_fibre),
             (SELECT COALESCE(SUM(length), 0.0) FROM sow_fibre)",
          [],
          |r| {
            Ok(DashboardSummary {
              clients: r.get(0)?,
              active_staff: r.get(1)?,
              contractors: r.get(2)?,
              suppliers: r.get(3)?,
              poles: r.get(4)?,
              drops: r.get(5)?,
              fibre_segments: r.get(6)?,
              fibre_length: r.get(7)?,
              ..DashboardSummary::default()
            })
          },
        )?;

        let mut stmt =
          conn.prepare("SELECT status, COUNT(*) FROM projects GROUP BY status ORDER BY status")?;
        let by_status = stmt
          .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, u64>(1)?)))?
          .collect::<rusqlite::Result<_>>()?;
        summary.projects_by_status = by_status;

        let mut stmt = conn.prepare(
          "SELECT rag_overall, COUNT(*) FROM contractors GROUP BY rag_overall",
        )?;
        let mut rag = RagDistribution::default();
        let rows = stmt
          .query_map([], |r| Ok((r.get::<_, Option<String>>(0)?, r.get::<_, u64>(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        for (status, n) in rows {
          match status.as_deref() {
            Some("green") => rag.green += n,
            Some("amber") => rag.amber += n,
            Some("red") => rag.red += n,
            _ => rag.unscored += n,
          }
        }
        summary.rag = rag;

        Ok(summary)
      })
      .await?;
    Ok(summary)
  }
}
