// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Table definitions for the full entity set: printers, classes,
// class_members, jobs, documents, subscriptions, notifications,
// settings, device_cache.

pub const CREATE_TABLES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS printers (
    id                      TEXT PRIMARY KEY,
    name                    TEXT NOT NULL UNIQUE,
    device_uri              TEXT NOT NULL,
    ppd_name                TEXT,
    location                TEXT NOT NULL DEFAULT '',
    info                    TEXT NOT NULL DEFAULT '',
    geo_location            TEXT,
    organization            TEXT,
    organizational_unit     TEXT,
    state                   INTEGER NOT NULL DEFAULT 3,
    accepting               INTEGER NOT NULL DEFAULT 1,
    shared                  INTEGER NOT NULL DEFAULT 1,
    is_default              INTEGER NOT NULL DEFAULT 0,
    job_sheets_start        TEXT NOT NULL DEFAULT 'none',
    job_sheets_end          TEXT NOT NULL DEFAULT 'none',
    default_options         TEXT NOT NULL DEFAULT '[]',
    hold_new_jobs_reason    TEXT,
    created_at              TEXT NOT NULL,
    updated_at              TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS classes (
    id                  TEXT PRIMARY KEY,
    name                TEXT NOT NULL UNIQUE,
    info                TEXT NOT NULL DEFAULT '',
    location            TEXT NOT NULL DEFAULT '',
    state               INTEGER NOT NULL DEFAULT 3,
    accepting           INTEGER NOT NULL DEFAULT 1,
    is_default          INTEGER NOT NULL DEFAULT 0,
    job_sheets_start    TEXT NOT NULL DEFAULT 'none',
    job_sheets_end      TEXT NOT NULL DEFAULT 'none',
    default_options     TEXT NOT NULL DEFAULT '[]',
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS class_members (
    class_id    TEXT NOT NULL REFERENCES classes(id) ON DELETE CASCADE,
    printer_id  TEXT NOT NULL REFERENCES printers(id) ON DELETE CASCADE,
    ordinal     INTEGER NOT NULL,
    PRIMARY KEY (class_id, printer_id)
);

CREATE TABLE IF NOT EXISTS jobs (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    printer_id          TEXT NOT NULL REFERENCES printers(id) ON DELETE CASCADE,
    name                TEXT NOT NULL DEFAULT '',
    user_name           TEXT NOT NULL,
    submitted_at        TEXT NOT NULL,
    completed_at        TEXT,
    state               INTEGER NOT NULL,
    state_reason        TEXT NOT NULL DEFAULT 'none',
    options             TEXT NOT NULL DEFAULT '[]',
    impressions         INTEGER NOT NULL DEFAULT 0,
    priority            INTEGER NOT NULL DEFAULT 50,
    open_for_documents  INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_jobs_printer ON jobs(printer_id);
CREATE INDEX IF NOT EXISTS idx_jobs_user ON jobs(user_name);

CREATE TABLE IF NOT EXISTS documents (
    id          TEXT PRIMARY KEY,
    job_id      INTEGER NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
    ordinal     INTEGER NOT NULL,
    file_name   TEXT NOT NULL,
    mime_type   TEXT NOT NULL,
    spool_path  TEXT NOT NULL,
    size_bytes  INTEGER NOT NULL DEFAULT 0,
    UNIQUE(job_id, ordinal)
);

CREATE TABLE IF NOT EXISTS subscriptions (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    owner               TEXT NOT NULL,
    printer_id          TEXT REFERENCES printers(id) ON DELETE CASCADE,
    job_id              INTEGER REFERENCES jobs(id) ON DELETE CASCADE,
    events              TEXT NOT NULL DEFAULT '[]',
    lease_seconds       INTEGER NOT NULL DEFAULT 0,
    recipient_kind      TEXT NOT NULL,
    recipient_uri       TEXT,
    time_interval       INTEGER NOT NULL DEFAULT 0,
    user_data           BLOB,
    created_at          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notifications (
    seq             INTEGER NOT NULL,
    subscription_id INTEGER NOT NULL REFERENCES subscriptions(id) ON DELETE CASCADE,
    event           TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    attributes      TEXT NOT NULL DEFAULT '[]',
    PRIMARY KEY (subscription_id, seq)
);

CREATE TABLE IF NOT EXISTS settings (
    key     TEXT PRIMARY KEY,
    value   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS device_cache (
    uri         TEXT PRIMARY KEY,
    info        TEXT NOT NULL DEFAULT '',
    make        TEXT NOT NULL DEFAULT '',
    class       TEXT NOT NULL DEFAULT '',
    device_id   TEXT NOT NULL DEFAULT '',
    location    TEXT NOT NULL DEFAULT '',
    updated_at  TEXT NOT NULL
);
"#;
