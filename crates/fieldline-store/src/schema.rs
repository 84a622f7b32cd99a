// SPDX-License-Identifier: Apache-2.0

//! Document tables. Each row is one JSON document; `company_id` scopes every
//! query to one tenant, `status` is duplicated out of the body where list
//! filters need it. `users.email` is unique across all tenants.

pub(crate) const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS companies (
    id   TEXT PRIMARY KEY,
    body TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id         TEXT PRIMARY KEY,
    company_id TEXT NOT NULL,
    email      TEXT NOT NULL UNIQUE,
    token_hash TEXT,
    body       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_users_company ON users (company_id);
CREATE INDEX IF NOT EXISTS idx_users_token ON users (token_hash);

CREATE TABLE IF NOT EXISTS clients (
    id         TEXT PRIMARY KEY,
    company_id TEXT NOT NULL,
    body       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_clients_company ON clients (company_id);

CREATE TABLE IF NOT EXISTS quotes (
    id         TEXT PRIMARY KEY,
    company_id TEXT NOT NULL,
    status     TEXT NOT NULL,
    body       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_quotes_company ON quotes (company_id, status);

CREATE TABLE IF NOT EXISTS work_orders (
    id         TEXT PRIMARY KEY,
    company_id TEXT NOT NULL,
    status     TEXT NOT NULL,
    body       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_work_orders_company ON work_orders (company_id, status);

CREATE TABLE IF NOT EXISTS invoices (
    id         TEXT PRIMARY KEY,
    company_id TEXT NOT NULL,
    status     TEXT NOT NULL,
    body       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_invoices_company ON invoices (company_id, status);

CREATE TABLE IF NOT EXISTS expenses (
    id         TEXT PRIMARY KEY,
    company_id TEXT NOT NULL,
    body       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_expenses_company ON expenses (company_id);
";

pub(crate) const TABLE_CLIENTS: &str = "clients";
pub(crate) const TABLE_QUOTES: &str = "quotes";
pub(crate) const TABLE_WORK_ORDERS: &str = "work_orders";
pub(crate) const TABLE_INVOICES: &str = "invoices";
pub(crate) const TABLE_EXPENSES: &str = "expenses";

pub(crate) const TENANT_TABLES: [&str; 6] = [
    TABLE_CLIENTS,
    TABLE_QUOTES,
    TABLE_WORK_ORDERS,
    TABLE_INVOICES,
    TABLE_EXPENSES,
    "users",
];
