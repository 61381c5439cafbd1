use fibreflow_core::staff::Staff;

use crate::Result;

/// Column order of the staff CSV export.
pub const STAFF_EXPORT_HEADER: [&str; 8] = [
  "Employee ID",
  "Name",
  "Email",
  "Phone",
  "Department",
  "Position",
  "Status",
  "Join Date",
];

/// Render `staff` as CSV. The header names are accepted back by the staff
/// import, so an export can be edited and re-imported.
pub fn staff_csv(staff: &[Staff]) -> Result<Vec<u8>> {
  let mut writer = csv::Writer::from_writer(Vec::new());
  writer.write_record(STAFF_EXPORT_HEADER)?;
  for s in staff {
    let join_date = s.join_date.map(|d| d.format("%Y-%m-%d").to_string());
    writer.write_record([
      s.employee_id.as_str(),
      s.name.as_str(),
      s.email.as_deref().unwrap_or_default(),
      s.phone.as_deref().unwrap_or_default(),
      s.department.as_deref().unwrap_or_default(),
      s.position.as_deref().unwrap_or_default(),
      s.status.as_ref(),
      join_date.as_deref().unwrap_or_default(),
    ])?;
  }
  writer.into_inner().map_err(|e| e.into_error().into())
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, Utc};
  use fibreflow_core::{
    import::ImportRow,
    staff::{NewStaff, StaffStatus},
  };
  use uuid::Uuid;

  use super::*;
  use crate::{Format, read_records};

  fn staff(employee_id: &str, name: &str) -> Staff {
    Staff {
      id:          Uuid::new_v4(),
      employee_id: employee_id.into(),
      name:        name.into(),
      email:       None,
      phone:       None,
      department:  Some("Civils, North".into()),
      position:    None,
      status:      StaffStatus::OnLeave,
      join_date:   NaiveDate::from_ymd_opt(2023, 2, 1),
      manager_id:  None,
      created_at:  Utc::now(),
      updated_at:  Utc::now(),
    }
  }

  #[test]
  fn export_has_fixed_header_and_quotes_commas() {
    let bytes = staff_csv(&[staff("E1", "Thandi Nkosi")]).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    let mut lines = text.lines();
    assert_eq!(
      lines.next(),
      Some("Employee ID,Name,Email,Phone,Department,Position,Status,Join Date")
    );
    assert_eq!(lines.next(), Some("E1,Thandi Nkosi,,,\"Civils, North\",,on_leave,2023-02-01"));
  }

  #[test]
  fn export_reimports() {
    let bytes = staff_csv(&[staff("E7", "Sipho Dlamini")]).unwrap();
    let records = read_records(&bytes, Format::Csv).unwrap();
    let back = NewStaff::from_record(&records[0]).unwrap();
    assert_eq!(back.employee_id, "E7");
    assert_eq!(back.status, Some(StaffStatus::OnLeave));
    assert_eq!(back.join_date, NaiveDate::from_ymd_opt(2023, 2, 1));
    assert_eq!(back.department.as_deref(), Some("Civils, North"));
  }
}
