//! SQL schema for the FibreFlow SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.
//!
//! Dates are `YYYY-MM-DD` text and timestamps RFC 3339 text, so string
//! comparison orders them correctly. List-valued columns hold JSON arrays.

/// Full schema DDL; idempotent thanks to `CREATE … IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS clients (
    id              TEXT PRIMARY KEY,
    company_name    TEXT NOT NULL UNIQUE,
    contact_person  TEXT,
    email           TEXT,
    phone           TEXT,
    address         TEXT,
    city            TEXT,
    province        TEXT,
    industry        TEXT,
    status          TEXT NOT NULL,
    notes           TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS staff (
    id           TEXT PRIMARY KEY,
    employee_id  TEXT NOT NULL UNIQUE,
    name         TEXT NOT NULL,
    email        TEXT UNIQUE,
    phone        TEXT,
    department   TEXT,
    position     TEXT,
    status       TEXT NOT NULL,
    join_date    TEXT,
    manager_id   TEXT REFERENCES staff(id) ON DELETE SET NULL,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    id                  TEXT PRIMARY KEY,
    project_code        TEXT NOT NULL UNIQUE,
    name                TEXT NOT NULL,
    client_id           TEXT REFERENCES clients(id),
    status              TEXT NOT NULL,
    start_date          TEXT,
    end_date            TEXT,
    budget              REAL,
    location            TEXT,
    project_manager_id  TEXT REFERENCES staff(id) ON DELETE SET NULL,
    description         TEXT,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS contractors (
    id                   TEXT PRIMARY KEY,
    company_name         TEXT NOT NULL,
    registration_number  TEXT NOT NULL UNIQUE,
    contact_person       TEXT,
    email                TEXT,
    phone                TEXT,
    business_type        TEXT,
    services             TEXT NOT NULL DEFAULT '[]',
    insurance_coverage   REAL NOT NULL DEFAULT 0,
    insurance_expiry     TEXT,
    bbbee_level          INTEGER CHECK (bbbee_level BETWEEN 1 AND 8),
    status               TEXT NOT NULL,
    rag_overall          TEXT,   -- 'green' | 'amber' | 'red'; NULL until scored
    rag_financial        TEXT,
    rag_compliance       TEXT,
    rag_performance      TEXT,
    rag_safety           TEXT,
    rag_updated_at       TEXT,
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS contractor_projects (
    id                TEXT PRIMARY KEY,
    contractor_id     TEXT NOT NULL REFERENCES contractors(id) ON DELETE CASCADE,
    project_id        TEXT NOT NULL REFERENCES projects(id),
    status            TEXT NOT NULL,
    start_date        TEXT,
    end_date          TEXT,
    quality_score     REAL,
    safety_incidents  INTEGER NOT NULL DEFAULT 0,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS contractor_documents (
    id               TEXT PRIMARY KEY,
    contractor_id    TEXT NOT NULL REFERENCES contractors(id) ON DELETE CASCADE,
    document_type    TEXT NOT NULL,
    document_number  TEXT,
    expiry_date      TEXT,
    verified         INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT NOT NULL
);

-- Append-only; one row per calculation.
CREATE TABLE IF NOT EXISTS contractor_rag_history (
    id                TEXT PRIMARY KEY,
    contractor_id     TEXT NOT NULL REFERENCES contractors(id) ON DELETE CASCADE,
    previous_overall  TEXT,
    overall           TEXT NOT NULL,
    financial         TEXT NOT NULL,
    compliance        TEXT NOT NULL,
    performance       TEXT NOT NULL,
    safety            TEXT NOT NULL,
    calculated_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS suppliers (
    id                 TEXT PRIMARY KEY,
    name               TEXT NOT NULL,
    supplier_code      TEXT NOT NULL UNIQUE,
    contact_person     TEXT,
    email              TEXT,
    phone              TEXT,
    city               TEXT,
    province           TEXT,
    country            TEXT,
    categories         TEXT NOT NULL DEFAULT '[]',
    certifications     TEXT NOT NULL DEFAULT '[]',
    rating             REAL NOT NULL DEFAULT 0,
    performance_score  REAL NOT NULL DEFAULT 0,
    status             TEXT NOT NULL,
    preferred          INTEGER NOT NULL DEFAULT 0,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS boqs (
    id            TEXT PRIMARY KEY,
    project_id    TEXT NOT NULL REFERENCES projects(id),
    boq_number    TEXT NOT NULL UNIQUE,
    title         TEXT NOT NULL,
    version       INTEGER NOT NULL DEFAULT 1,
    status        TEXT NOT NULL,
    currency      TEXT NOT NULL,
    items         TEXT NOT NULL DEFAULT '[]',
    total_amount  REAL NOT NULL DEFAULT 0,
    notes         TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS rfqs (
    id                       TEXT PRIMARY KEY,
    project_id               TEXT NOT NULL REFERENCES projects(id),
    rfq_number               TEXT NOT NULL UNIQUE,
    title                    TEXT NOT NULL,
    description              TEXT,
    category                 TEXT,
    required_certifications  TEXT NOT NULL DEFAULT '[]',
    boq_id                   TEXT REFERENCES boqs(id) ON DELETE SET NULL,
    status                   TEXT NOT NULL,
    due_date                 TEXT,
    invited_supplier_ids     TEXT NOT NULL DEFAULT '[]',
    awarded_supplier_id      TEXT REFERENCES suppliers(id),
    created_at               TEXT NOT NULL,
    updated_at               TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sow_poles (
    id           TEXT PRIMARY KEY,
    project_id   TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    pole_number  TEXT NOT NULL,
    status       TEXT,
    pole_type    TEXT,
    height       REAL,
    latitude     REAL,
    longitude    REAL,
    zone         TEXT,
    pon          TEXT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    UNIQUE (project_id, pole_number)
);

-- pole_number is informational; drops may be imported before their poles.
CREATE TABLE IF NOT EXISTS sow_drops (
    id            TEXT PRIMARY KEY,
    project_id    TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    drop_number   TEXT NOT NULL,
    pole_number   TEXT,
    address       TEXT,
    status        TEXT,
    cable_length  REAL,
    latitude      REAL,
    longitude     REAL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    UNIQUE (project_id, drop_number)
);

CREATE TABLE IF NOT EXISTS sow_fibre (
    id           TEXT PRIMARY KEY,
    project_id   TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    segment_id   TEXT NOT NULL,
    from_point   TEXT,
    to_point     TEXT,
    cable_type   TEXT,
    fibre_count  INTEGER,
    length       REAL,
    status       TEXT,
    contractor   TEXT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    UNIQUE (project_id, segment_id)
);

-- No foreign keys: entries outlive the rows they describe.
CREATE TABLE IF NOT EXISTS audit_log (
    id           TEXT PRIMARY KEY,
    entity_type  TEXT NOT NULL,
    entity_id    TEXT,
    action       TEXT NOT NULL,
    actor        TEXT,
    details      TEXT NOT NULL DEFAULT 'null',
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS projects_client_idx     ON projects(client_id);
CREATE INDEX IF NOT EXISTS assignments_contr_idx   ON contractor_projects(contractor_id);
CREATE INDEX IF NOT EXISTS documents_contr_idx     ON contractor_documents(contractor_id);
CREATE INDEX IF NOT EXISTS rag_history_contr_idx   ON contractor_rag_history(contractor_id, calculated_at);
CREATE INDEX IF NOT EXISTS boqs_project_idx        ON boqs(project_id);
CREATE INDEX IF NOT EXISTS rfqs_project_idx        ON rfqs(project_id);
CREATE INDEX IF NOT EXISTS sow_drops_pole_idx      ON sow_drops(project_id, pole_number);
CREATE INDEX IF NOT EXISTS audit_entity_idx        ON audit_log(entity_type, entity_id);
CREATE INDEX IF NOT EXISTS audit_created_idx       ON audit_log(created_at);

PRAGMA user_version = 1;
";
