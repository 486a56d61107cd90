// MySQL persistence for affiliate stock records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

use crate::core::{AppError, Result};
use crate::modules::inventory::models::StockItem;

/// Repository seam for stock persistence
#[async_trait]
pub trait StockRepository: Send + Sync {
    async fn create(&self, item: &StockItem) -> Result<StockItem>;

    async fn find_by_id(&self, affiliate_id: &str, id: &str) -> Result<Option<StockItem>>;

    async fn list(&self, affiliate_id: &str, limit: i64, offset: i64)
        -> Result<Vec<StockItem>>;

    /// Applies a signed quantity delta. Fails without changing anything when
    /// the result would go negative.
    async fn adjust_quantity(
        &self,
        affiliate_id: &str,
        id: &str,
        delta: Decimal,
    ) -> Result<StockItem>;
}

/// MySQL-backed stock repository
pub struct SqlStockRepository {
    pool: MySqlPool,
}

impl SqlStockRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn map_item(row: &MySqlRow) -> Result<StockItem> {
        Ok(StockItem {
            id: Some(row.try_get::<String, _>("id")?),
            affiliate_id: row.try_get("affiliate_id")?,
            name: row.try_get("name")?,
            quantity: row.try_get("quantity")?,
            unit_price: row.try_get("unit_price")?,
            created_at: Some(row.try_get::<DateTime<Utc>, _>("created_at")?),
            updated_at: Some(row.try_get::<DateTime<Utc>, _>("updated_at")?),
        })
    }
}

#[async_trait]
impl StockRepository for SqlStockRepository {
    async fn create(&self, item: &StockItem) -> Result<StockItem> {
        let id = item.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO stock_items (
                id, affiliate_id, name, quantity, unit_price, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&item.affiliate_id)
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let mut created = item.clone();
        created.id = Some(id);
        created.created_at = Some(now);
        created.updated_at = Some(now);
        Ok(created)
    }

    async fn find_by_id(&self, affiliate_id: &str, id: &str) -> Result<Option<StockItem>> {
        let row = sqlx::query(
            r#"
            SELECT id, affiliate_id, name, quantity, unit_price, created_at, updated_at
            FROM stock_items
            WHERE affiliate_id = ? AND id = ?
            "#,
        )
        .bind(affiliate_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::map_item).transpose()
    }

    async fn list(
        &self,
        affiliate_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<StockItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, affiliate_id, name, quantity, unit_price, created_at, updated_at
            FROM stock_items
            WHERE affiliate_id = ?
            ORDER BY name
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(affiliate_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::map_item).collect()
    }

    async fn adjust_quantity(
        &self,
        affiliate_id: &str,
        id: &str,
        delta: Decimal,
    ) -> Result<StockItem> {
        // The guard lives in the WHERE clause so the check and the write are
        // one atomic statement
        let result = sqlx::query(
            r#"
            UPDATE stock_items
            SET quantity = quantity + ?, updated_at = ?
            WHERE affiliate_id = ? AND id = ? AND quantity + ? >= 0
            "#,
        )
        .bind(delta)
        .bind(Utc::now())
        .bind(affiliate_id)
        .bind(id)
        .bind(delta)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish "missing" from "would go negative"
            return match self.find_by_id(affiliate_id, id).await? {
                Some(item) => Err(AppError::insufficient_stock(format!(
                    "'{}' has {} on hand, cannot remove {}",
                    item.name,
                    item.quantity,
                    -delta
                ))),
                None => Err(AppError::not_found(format!("Stock item '{}'", id))),
            };
        }

        self.find_by_id(affiliate_id, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Stock item '{}'", id)))
    }
}
