// MySQL persistence for bills and their line items.
//
// Bill + items are written transactionally; the record is all-or-nothing.
// Updates replace the item rows wholesale, matching the engine's
// recompute-everything lifecycle. Queries are runtime-checked so the crate
// builds without a live schema.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

use crate::core::{AppError, Result};
use crate::modules::billing::models::{Bill, BillStatus, LineItem, PaymentMethod};
use crate::modules::billing::services::bill_number::DailySequence;

/// Repository seam for bill persistence
#[async_trait]
pub trait BillRepository: Send + Sync {
    async fn create(&self, bill: &Bill) -> Result<Bill>;

    /// Replaces the stored record; the bill number is part of the key and is
    /// never rewritten
    async fn update(&self, bill: &Bill) -> Result<Bill>;

    async fn find_by_number(
        &self,
        affiliate_id: &str,
        bill_number: &str,
    ) -> Result<Option<Bill>>;

    async fn list(&self, affiliate_id: &str, limit: i64, offset: i64) -> Result<Vec<Bill>>;
}

/// MySQL-backed bill repository
pub struct SqlBillRepository {
    pool: MySqlPool,
}

impl SqlBillRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn map_bill(row: &MySqlRow) -> Result<Bill> {
        let status: String = row.try_get("status")?;
        let payment_method: Option<String> = row.try_get("payment_method")?;

        Ok(Bill {
            id: Some(row.try_get::<String, _>("id")?),
            affiliate_id: row.try_get("affiliate_id")?,
            customer_id: row.try_get("customer_id")?,
            bill_number: row.try_get("bill_number")?,
            items: Vec::new(),
            subtotal: row.try_get("subtotal")?,
            item_discount_total: row.try_get("item_discount_total")?,
            additional_discount: row.try_get("additional_discount")?,
            grand_total: row.try_get("grand_total")?,
            status: BillStatus::from_str(&status).map_err(AppError::internal)?,
            payment_method: payment_method
                .map(|m| PaymentMethod::from_str(&m).map_err(AppError::internal))
                .transpose()?,
            remarks: row.try_get("remarks")?,
            created_at: Some(row.try_get::<DateTime<Utc>, _>("created_at")?),
            updated_at: Some(row.try_get::<DateTime<Utc>, _>("updated_at")?),
        })
    }

    fn map_item(row: &MySqlRow) -> Result<LineItem> {
        Ok(LineItem {
            name: row.try_get("name")?,
            quantity: row.try_get("quantity")?,
            unit_price: row.try_get("unit_price")?,
            discount: row.try_get("discount")?,
            net_amount: row.try_get("net_amount")?,
            inventory_ref: row.try_get("inventory_ref")?,
        })
    }

    async fn load_items(&self, bill_id: &str) -> Result<Vec<LineItem>> {
        let rows = sqlx::query(
            r#"
            SELECT name, quantity, unit_price, discount, net_amount, inventory_ref
            FROM bill_items
            WHERE bill_id = ?
            ORDER BY position
            "#,
        )
        .bind(bill_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::map_item).collect()
    }

    async fn insert_items(
        tx: &mut sqlx::Transaction<'_, sqlx::MySql>,
        bill_id: &str,
        items: &[LineItem],
    ) -> Result<()> {
        for (position, item) in items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO bill_items (
                    id, bill_id, position, name, quantity, unit_price,
                    discount, net_amount, inventory_ref
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(bill_id)
            .bind(position as i64)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.discount)
            .bind(item.net_amount)
            .bind(&item.inventory_ref)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl BillRepository for SqlBillRepository {
    async fn create(&self, bill: &Bill) -> Result<Bill> {
        let mut tx = self.pool.begin().await?;

        let id = bill.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO bills (
                id, affiliate_id, customer_id, bill_number, subtotal,
                item_discount_total, additional_discount, grand_total,
                status, payment_method, remarks, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&bill.affiliate_id)
        .bind(&bill.customer_id)
        .bind(&bill.bill_number)
        .bind(bill.subtotal)
        .bind(bill.item_discount_total)
        .bind(bill.additional_discount)
        .bind(bill.grand_total)
        .bind(bill.status.to_string())
        .bind(bill.payment_method.map(|m| m.to_string()))
        .bind(&bill.remarks)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::validation(format!(
                        "Bill number '{}' already exists",
                        bill.bill_number
                    ));
                }
            }
            AppError::Database(e)
        })?;

        Self::insert_items(&mut tx, &id, &bill.items).await?;

        tx.commit().await?;

        let mut created = bill.clone();
        created.id = Some(id);
        created.created_at = Some(now);
        created.updated_at = Some(now);
        Ok(created)
    }

    async fn update(&self, bill: &Bill) -> Result<Bill> {
        let id = bill
            .id
            .clone()
            .ok_or_else(|| AppError::internal("cannot update a bill without an id"))?;

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE bills SET
                customer_id = ?, subtotal = ?, item_discount_total = ?,
                additional_discount = ?, grand_total = ?, status = ?,
                payment_method = ?, remarks = ?, updated_at = ?
            WHERE id = ? AND affiliate_id = ?
            "#,
        )
        .bind(&bill.customer_id)
        .bind(bill.subtotal)
        .bind(bill.item_discount_total)
        .bind(bill.additional_discount)
        .bind(bill.grand_total)
        .bind(bill.status.to_string())
        .bind(bill.payment_method.map(|m| m.to_string()))
        .bind(&bill.remarks)
        .bind(now)
        .bind(&id)
        .bind(&bill.affiliate_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Bill '{}'", bill.bill_number)));
        }

        sqlx::query("DELETE FROM bill_items WHERE bill_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        Self::insert_items(&mut tx, &id, &bill.items).await?;

        tx.commit().await?;

        let mut updated = bill.clone();
        updated.updated_at = Some(now);
        Ok(updated)
    }

    async fn find_by_number(
        &self,
        affiliate_id: &str,
        bill_number: &str,
    ) -> Result<Option<Bill>> {
        let row = sqlx::query(
            r#"
            SELECT id, affiliate_id, customer_id, bill_number, subtotal,
                   item_discount_total, additional_discount, grand_total,
                   status, payment_method, remarks, created_at, updated_at
            FROM bills
            WHERE affiliate_id = ? AND bill_number = ?
            "#,
        )
        .bind(affiliate_id)
        .bind(bill_number)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let mut bill = Self::map_bill(&row)?;
                if let Some(id) = &bill.id {
                    bill.items = self.load_items(id).await?;
                }
                Ok(Some(bill))
            }
            None => Ok(None),
        }
    }

    async fn list(&self, affiliate_id: &str, limit: i64, offset: i64) -> Result<Vec<Bill>> {
        let rows = sqlx::query(
            r#"
            SELECT id, affiliate_id, customer_id, bill_number, subtotal,
                   item_discount_total, additional_discount, grand_total,
                   status, payment_method, remarks, created_at, updated_at
            FROM bills
            WHERE affiliate_id = ?
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(affiliate_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let mut bills = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut bill = Self::map_bill(row)?;
            if let Some(id) = &bill.id {
                bill.items = self.load_items(id).await?;
            }
            bills.push(bill);
        }

        Ok(bills)
    }
}

/// Durable per-day bill counter over MySQL.
///
/// Uses the `LAST_INSERT_ID(expr)` upsert idiom: the increment and the
/// readback happen on one connection, so concurrent creations on the same
/// day each observe a distinct value.
pub struct SqlDailySequence {
    pool: MySqlPool,
}

impl SqlDailySequence {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DailySequence for SqlDailySequence {
    async fn next_for(&self, day: NaiveDate) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;

        sqlx::query(
            r#"
            INSERT INTO bill_sequences (day, seq)
            VALUES (?, LAST_INSERT_ID(1))
            ON DUPLICATE KEY UPDATE seq = LAST_INSERT_ID(seq + 1)
            "#,
        )
        .bind(day)
        .execute(&mut *conn)
        .await?;

        let seq: u64 = sqlx::query_scalar("SELECT LAST_INSERT_ID()")
            .fetch_one(&mut *conn)
            .await?;

        Ok(seq)
    }
}
