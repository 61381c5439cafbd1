//! `fibreflow`: command-line client for the FibreFlow API.
//!
//! # Usage
//!
//! ```text
//! fibreflow --url http://localhost:3000 clients
//! fibreflow import poles lawley-poles.xlsx --project 5f0c…
//! fibreflow export-staff -o staff.csv
//! fibreflow rag --contractor 9a1e…
//! fibreflow --config ~/.config/fibreflow/cli.toml dashboard
//! ```

mod client;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig, ImportKind};
use fibreflow_core::import::ImportReport;
use fibreflow_import::Format;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const DEFAULT_URL: &str = "http://localhost:3000";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "fibreflow", version, about = "Command-line client for the FibreFlow API")]
struct Args {
  /// Path to a TOML config file (url, actor).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the FibreFlow server (default: http://localhost:3000).
  #[arg(long, env = "FIBREFLOW_URL")]
  url: Option<String>,

  /// Name recorded against changes in the audit log.
  #[arg(long, env = "FIBREFLOW_ACTOR")]
  actor: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List clients.
  Clients,
  /// Upload a CSV or spreadsheet; the format comes from the file extension.
  Import {
    #[arg(value_enum)]
    kind:    ImportKind,
    file:    PathBuf,
    /// Project the SOW records belong to.
    #[arg(long)]
    project: Option<Uuid>,
  },
  /// Download the staff list as CSV.
  ExportStaff {
    /// Write to FILE instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
  },
  /// Recalculate contractor RAG scores.
  Rag {
    /// Only this contractor; everyone when omitted.
    #[arg(long)]
    contractor: Option<Uuid>,
  },
  /// Show the dashboard summary.
  Dashboard,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default, Debug)]
struct ConfigFile {
  #[serde(default)]
  url:   String,
  #[serde(default)]
  actor: String,
}

fn read_config(path: Option<&Path>) -> Result<ConfigFile> {
  let Some(path) = path else { return Ok(ConfigFile::default()) };
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("reading config file {}", path.display()))?;
  toml::from_str(&raw).context("parsing config file")
}

/// Flags and environment override the config file, which overrides defaults.
fn api_config(url: Option<String>, actor: Option<String>, file: ConfigFile) -> ApiConfig {
  let non_empty = |s: String| (!s.trim().is_empty()).then_some(s);
  ApiConfig {
    base_url: url
      .or_else(|| non_empty(file.url))
      .unwrap_or_else(|| DEFAULT_URL.to_string()),
    actor:    actor.or_else(|| non_empty(file.actor)),
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  let file_cfg = read_config(args.config.as_deref())?;
  let client = ApiClient::new(api_config(args.url, args.actor, file_cfg))?;

  match args.command {
    Command::Clients => clients(&client).await,
    Command::Import { kind, file, project } => import(&client, kind, &file, project).await,
    Command::ExportStaff { output } => export_staff(&client, output.as_deref()).await,
    Command::Rag { contractor } => rag(&client, contractor).await,
    Command::Dashboard => dashboard(&client).await,
  }
}

// ─── Commands ─────────────────────────────────────────────────────────────────

async fn clients(client: &ApiClient) -> Result<()> {
  let clients = client.list_clients().await?;
  for c in &clients {
    println!(
      "{}  {:<32}  {:<9}  {}",
      c.id,
      c.company_name,
      c.status.as_ref(),
      c.email.as_deref().unwrap_or("-")
    );
  }
  eprintln!("{} clients", clients.len());
  Ok(())
}

async fn import(
  client: &ApiClient,
  kind: ImportKind,
  file: &Path,
  project: Option<Uuid>,
) -> Result<()> {
  if kind.needs_project() && project.is_none() {
    bail!("--project is required for {kind:?} imports");
  }
  let format = Format::from_path(&file.to_string_lossy())
    .with_context(|| format!("cannot tell the format of {} from its extension", file.display()))?;
  let body =
    std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;

  tracing::info!(file = %file.display(), %format, bytes = body.len(), "uploading");
  let report = client.import_file(kind, format, project, body).await?;
  print_report(&report);
  Ok(())
}

fn print_report(report: &ImportReport) {
  println!(
    "imported {} of {} rows ({} failed, {} duplicates, {} batches)",
    report.upserted, report.total, report.failed, report.duplicates, report.batches
  );
  for issue in &report.errors {
    match (issue.row, issue.batch) {
      (Some(row), _) => println!("  row {}: {}", row + 1, issue.message),
      (None, Some(batch)) => println!("  batch {}: {}", batch + 1, issue.message),
      (None, None) => println!("  {}", issue.message),
    }
  }
}

async fn export_staff(client: &ApiClient, output: Option<&Path>) -> Result<()> {
  let csv = client.export_staff().await?;
  match output {
    Some(path) => {
      std::fs::write(path, &csv).with_context(|| format!("writing {}", path.display()))?;
      eprintln!("wrote {} bytes to {}", csv.len(), path.display());
    }
    None => {
      use std::io::Write as _;
      std::io::stdout().write_all(&csv).context("writing to stdout")?;
    }
  }
  Ok(())
}

async fn rag(client: &ApiClient, contractor: Option<Uuid>) -> Result<()> {
  let lines = client.calculate_rag(contractor).await?;
  println!(
    "{:<32}  {:<7}  {:<9}  {:<10}  {:<11}  {:<6}",
    "contractor", "overall", "financial", "compliance", "performance", "safety"
  );
  for line in &lines {
    let s = &line.scores;
    println!(
      "{:<32}  {:<7}  {:<9}  {:<10}  {:<11}  {:<6}{}",
      line.company_name,
      s.overall.to_string(),
      s.financial.to_string(),
      s.compliance.to_string(),
      s.performance.to_string(),
      s.safety.to_string(),
      if line.changed { "  (changed)" } else { "" }
    );
    tracing::debug!(contractor_id = %line.contractor_id, "scored");
  }
  Ok(())
}

async fn dashboard(client: &ApiClient) -> Result<()> {
  let d = client.dashboard().await?;
  println!("clients         {}", d.clients);
  println!("active staff    {}", d.active_staff);
  println!("contractors     {}", d.contractors);
  println!("suppliers       {}", d.suppliers);
  println!("projects");
  for (status, count) in &d.projects_by_status {
    println!("  {status:<14}{count}");
  }
  println!("poles           {}", d.poles);
  println!("drops           {}", d.drops);
  println!("fibre segments  {} ({:.1} m)", d.fibre_segments, d.fibre_length);
  println!(
    "rag             {} green, {} amber, {} red, {} unscored",
    d.rag.green, d.rag.amber, d.rag.red, d.rag.unscored
  );
  Ok(())
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory;

  use super::*;

  #[test]
  fn cli_definition_is_valid() { Args::command().debug_assert(); }

  #[test]
  fn flags_beat_config_file_which_beats_default() {
    let file = ConfigFile { url: "http://file:3000".into(), actor: "file-user".into() };
    let cfg = api_config(Some("http://flag:3000".into()), None, file);
    assert_eq!(cfg.base_url, "http://flag:3000");
    assert_eq!(cfg.actor.as_deref(), Some("file-user"));

    let cfg = api_config(None, None, ConfigFile::default());
    assert_eq!(cfg.base_url, DEFAULT_URL);
    assert_eq!(cfg.actor, None);
  }

  #[test]
  fn import_arguments_parse() {
    let args = Args::try_parse_from([
      "fibreflow",
      "import",
      "poles",
      "poles.xlsx",
      "--project",
      "00000000-0000-0000-0000-000000000000",
    ])
    .unwrap();
    match args.command {
      Command::Import { kind, file, project } => {
        assert_eq!(kind, ImportKind::Poles);
        assert_eq!(file, PathBuf::from("poles.xlsx"));
        assert_eq!(project, Some(Uuid::nil()));
      }
      other => panic!("unexpected command {other:?}"),
    }
  }
}
