// SPDX-License-Identifier: Apache-2.0

use crate::schema::{
    TABLE_CLIENTS, TABLE_EXPENSES, TABLE_INVOICES, TABLE_QUOTES, TABLE_WORK_ORDERS, TENANT_TABLES,
};
use crate::{map_sqlite_err, Store, StoreError};
use fieldline_model::{
    ClientRecord, Company, CompanyId, DocumentId, Expense, Invoice, Quote, WorkOrder,
};
use rusqlite::params;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

pub type TenantCounts = BTreeMap<String, u64>;

fn encode<T: Serialize>(what: &'static str, doc: &T) -> Result<String, StoreError> {
    serde_json::to_string(doc).map_err(|e| StoreError::Backend(format!("encode {what}: {e}")))
}

fn decode<T: DeserializeOwned>(what: &'static str, raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Backend(format!("decode {what}: {e}")))
}

impl Store {
    async fn upsert_with_status(
        &self,
        table: &str,
        id: &DocumentId,
        company_id: &CompanyId,
        status: &str,
        body: &str,
    ) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO {table} (id, company_id, status, body) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(id) DO UPDATE SET company_id = excluded.company_id, \
             status = excluded.status, body = excluded.body"
        );
        let conn = self.lock().await;
        conn.execute(&sql, params![id.as_str(), company_id.as_str(), status, body])
            .map_err(|e| map_sqlite_err(table, e))?;
        Ok(())
    }

    async fn upsert_plain(
        &self,
        table: &str,
        id: &DocumentId,
        company_id: &CompanyId,
        body: &str,
    ) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO {table} (id, company_id, body) VALUES (?1, ?2, ?3) \
             ON CONFLICT(id) DO UPDATE SET company_id = excluded.company_id, \
             body = excluded.body"
        );
        let conn = self.lock().await;
        conn.execute(&sql, params![id.as_str(), company_id.as_str(), body])
            .map_err(|e| map_sqlite_err(table, e))?;
        Ok(())
    }

    async fn fetch_scoped<T: DeserializeOwned>(
        &self,
        table: &str,
        what: &'static str,
        company_id: &CompanyId,
        id: &DocumentId,
    ) -> Result<T, StoreError> {
        let sql = format!("SELECT body FROM {table} WHERE id = ?1 AND company_id = ?2");
        let conn = self.lock().await;
        let raw: String = conn
            .query_row(&sql, params![id.as_str(), company_id.as_str()], |row| {
                row.get(0)
            })
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(what),
                other => map_sqlite_err(table, other),
            })?;
        drop(conn);
        decode(what, &raw)
    }

    /// ULID ids sort lexicographically by creation time.
    async fn list_scoped<T: DeserializeOwned>(
        &self,
        table: &str,
        what: &'static str,
        company_id: &CompanyId,
        status: Option<&str>,
    ) -> Result<Vec<T>, StoreError> {
        let sql = match status {
            Some(_) => format!(
                "SELECT body FROM {table} WHERE company_id = ?1 AND status = ?2 ORDER BY id"
            ),
            None => format!("SELECT body FROM {table} WHERE company_id = ?1 ORDER BY id"),
        };
        let conn = self.lock().await;
        let mut stmt = conn.prepare(&sql).map_err(|e| map_sqlite_err(table, e))?;
        let raw_rows: Result<Vec<String>, rusqlite::Error> = match status {
            Some(status) => stmt
                .query_map(params![company_id.as_str(), status], |row| row.get(0))
                .map_err(|e| map_sqlite_err(table, e))?
                .collect(),
            None => stmt
                .query_map(params![company_id.as_str()], |row| row.get(0))
                .map_err(|e| map_sqlite_err(table, e))?
                .collect(),
        };
        let raw_rows = raw_rows.map_err(|e| map_sqlite_err(table, e))?;
        drop(stmt);
        drop(conn);
        raw_rows.iter().map(|raw| decode(what, raw)).collect()
    }

    async fn remove_scoped(
        &self,
        table: &str,
        what: &'static str,
        company_id: &CompanyId,
        id: &DocumentId,
    ) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {table} WHERE id = ?1 AND company_id = ?2");
        let conn = self.lock().await;
        let affected = conn
            .execute(&sql, params![id.as_str(), company_id.as_str()])
            .map_err(|e| map_sqlite_err(table, e))?;
        if affected == 0 {
            return Err(StoreError::NotFound(what));
        }
        Ok(())
    }

    pub async fn put_company(&self, company: &Company) -> Result<(), StoreError> {
        let body = encode("company", company)?;
        let conn = self.lock().await;
        conn.execute(
            "INSERT INTO companies (id, body) VALUES (?1, ?2) \
             ON CONFLICT(id) DO UPDATE SET body = excluded.body",
            params![company.id.as_str(), body],
        )
        .map_err(|e| map_sqlite_err("companies", e))?;
        Ok(())
    }

    pub async fn get_company(&self, id: &CompanyId) -> Result<Company, StoreError> {
        let conn = self.lock().await;
        let raw: String = conn
            .query_row(
                "SELECT body FROM companies WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound("company"),
                other => map_sqlite_err("companies", other),
            })?;
        drop(conn);
        decode("company", &raw)
    }

    pub async fn put_client(&self, client: &ClientRecord) -> Result<(), StoreError> {
        let body = encode("client", client)?;
        self.upsert_plain(TABLE_CLIENTS, &client.id, &client.company_id, &body)
            .await
    }

    pub async fn get_client(
        &self,
        company_id: &CompanyId,
        id: &DocumentId,
    ) -> Result<ClientRecord, StoreError> {
        self.fetch_scoped(TABLE_CLIENTS, "client", company_id, id).await
    }

    pub async fn list_clients(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<ClientRecord>, StoreError> {
        self.list_scoped(TABLE_CLIENTS, "client", company_id, None).await
    }

    pub async fn delete_client(
        &self,
        company_id: &CompanyId,
        id: &DocumentId,
    ) -> Result<(), StoreError> {
        self.remove_scoped(TABLE_CLIENTS, "client", company_id, id).await
    }

    pub async fn put_quote(&self, quote: &Quote) -> Result<(), StoreError> {
        let body = encode("quote", quote)?;
        self.upsert_with_status(
            TABLE_QUOTES,
            &quote.id,
            &quote.company_id,
            quote.status.as_str(),
            &body,
        )
        .await
    }

    pub async fn get_quote(
        &self,
        company_id: &CompanyId,
        id: &DocumentId,
    ) -> Result<Quote, StoreError> {
        self.fetch_scoped(TABLE_QUOTES, "quote", company_id, id).await
    }

    pub async fn list_quotes(
        &self,
        company_id: &CompanyId,
        status: Option<&str>,
    ) -> Result<Vec<Quote>, StoreError> {
        self.list_scoped(TABLE_QUOTES, "quote", company_id, status).await
    }

    pub async fn delete_quote(
        &self,
        company_id: &CompanyId,
        id: &DocumentId,
    ) -> Result<(), StoreError> {
        self.remove_scoped(TABLE_QUOTES, "quote", company_id, id).await
    }

    pub async fn put_work_order(&self, order: &WorkOrder) -> Result<(), StoreError> {
        let body = encode("work order", order)?;
        self.upsert_with_status(
            TABLE_WORK_ORDERS,
            &order.id,
            &order.company_id,
            order.status.as_str(),
            &body,
        )
        .await
    }

    pub async fn get_work_order(
        &self,
        company_id: &CompanyId,
        id: &DocumentId,
    ) -> Result<WorkOrder, StoreError> {
        self.fetch_scoped(TABLE_WORK_ORDERS, "work order", company_id, id).await
    }

    pub async fn list_work_orders(
        &self,
        company_id: &CompanyId,
        status: Option<&str>,
    ) -> Result<Vec<WorkOrder>, StoreError> {
        self.list_scoped(TABLE_WORK_ORDERS, "work order", company_id, status).await
    }

    pub async fn delete_work_order(
        &self,
        company_id: &CompanyId,
        id: &DocumentId,
    ) -> Result<(), StoreError> {
        self.remove_scoped(TABLE_WORK_ORDERS, "work order", company_id, id).await
    }

    pub async fn put_invoice(&self, invoice: &Invoice) -> Result<(), StoreError> {
        let body = encode("invoice", invoice)?;
        self.upsert_with_status(
            TABLE_INVOICES,
            &invoice.id,
            &invoice.company_id,
            invoice.status.as_str(),
            &body,
        )
        .await
    }

    pub async fn get_invoice(
        &self,
        company_id: &CompanyId,
        id: &DocumentId,
    ) -> Result<Invoice, StoreError> {
        self.fetch_scoped(TABLE_INVOICES, "invoice", company_id, id).await
    }

    pub async fn list_invoices(
        &self,
        company_id: &CompanyId,
        status: Option<&str>,
    ) -> Result<Vec<Invoice>, StoreError> {
        self.list_scoped(TABLE_INVOICES, "invoice", company_id, status).await
    }

    pub async fn delete_invoice(
        &self,
        company_id: &CompanyId,
        id: &DocumentId,
    ) -> Result<(), StoreError> {
        self.remove_scoped(TABLE_INVOICES, "invoice", company_id, id).await
    }

    pub async fn put_expense(&self, expense: &Expense) -> Result<(), StoreError> {
        let body = encode("expense", expense)?;
        self.upsert_plain(TABLE_EXPENSES, &expense.id, &expense.company_id, &body)
            .await
    }

    pub async fn get_expense(
        &self,
        company_id: &CompanyId,
        id: &DocumentId,
    ) -> Result<Expense, StoreError> {
        self.fetch_scoped(TABLE_EXPENSES, "expense", company_id, id).await
    }

    pub async fn list_expenses(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<Expense>, StoreError> {
        self.list_scoped(TABLE_EXPENSES, "expense", company_id, None).await
    }

    pub async fn delete_expense(
        &self,
        company_id: &CompanyId,
        id: &DocumentId,
    ) -> Result<(), StoreError> {
        self.remove_scoped(TABLE_EXPENSES, "expense", company_id, id).await
    }

    /// Per-collection document counts for one tenant (debug surface).
    pub async fn tenant_counts(&self, company_id: &CompanyId) -> Result<TenantCounts, StoreError> {
        let conn = self.lock().await;
        let mut counts = TenantCounts::new();
        for table in TENANT_TABLES {
            let sql = format!("SELECT COUNT(*) FROM {table} WHERE company_id = ?1");
            let n: i64 = conn
                .query_row(&sql, params![company_id.as_str()], |row| row.get(0))
                .map_err(|e| map_sqlite_err(table, e))?;
            counts.insert(table.to_string(), u64::try_from(n).unwrap_or(0));
        }
        Ok(counts)
    }
}
