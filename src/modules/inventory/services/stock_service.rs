//! Stock availability checks and movements around bill creation.
//!
//! The availability check runs before the bill engine so a short stock
//! position rejects the request without touching bill state; deduction runs
//! only after the engine has accepted the bill. Movements spanning several
//! items undo themselves on a partial failure, so stock never ends up
//! half-applied.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::core::{money, AppError, Result};
use crate::modules::billing::models::{LineItem, LineItemInput};
use crate::modules::inventory::models::{CreateStockItemRequest, StockItem};
use crate::modules::inventory::repositories::StockRepository;

pub struct StockService {
    repo: Arc<dyn StockRepository>,
}

impl StockService {
    pub fn new(repo: Arc<dyn StockRepository>) -> Self {
        Self { repo }
    }

    pub async fn add_item(
        &self,
        affiliate_id: &str,
        request: CreateStockItemRequest,
    ) -> Result<StockItem> {
        if request.name.trim().is_empty() {
            return Err(AppError::validation("Stock item name cannot be empty"));
        }
        if request.quantity < Decimal::ZERO {
            return Err(AppError::validation("Stock quantity cannot be negative"));
        }
        if request.unit_price < Decimal::ZERO {
            return Err(AppError::validation("Stock unit price cannot be negative"));
        }

        self.repo
            .create(&StockItem {
                id: None,
                affiliate_id: affiliate_id.to_string(),
                name: request.name.trim().to_string(),
                quantity: request.quantity,
                unit_price: request.unit_price,
                created_at: None,
                updated_at: None,
            })
            .await
    }

    pub async fn get_item(&self, affiliate_id: &str, id: &str) -> Result<StockItem> {
        self.repo
            .find_by_id(affiliate_id, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Stock item '{}'", id)))
    }

    pub async fn list_items(
        &self,
        affiliate_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<StockItem>> {
        self.repo.list(affiliate_id, limit, offset).await
    }

    pub async fn adjust(
        &self,
        affiliate_id: &str,
        id: &str,
        delta: Decimal,
    ) -> Result<StockItem> {
        self.repo.adjust_quantity(affiliate_id, id, delta).await
    }

    /// Verify every stock-linked line item can be covered. Items without an
    /// inventory reference are free-form and skipped.
    pub async fn ensure_available(
        &self,
        affiliate_id: &str,
        items: &[LineItemInput],
    ) -> Result<()> {
        self.ensure_available_inner(affiliate_id, items, &HashMap::new())
            .await
    }

    /// Availability check for a bill update. Quantities held by the bill
    /// being replaced count as available again, so resubmitting the same
    /// items under tight stock is not rejected.
    pub async fn ensure_available_for_update(
        &self,
        affiliate_id: &str,
        items: &[LineItemInput],
        held: &[LineItem],
    ) -> Result<()> {
        let mut credit: HashMap<&str, Decimal> = HashMap::new();
        for item in held {
            if let Some(stock_id) = &item.inventory_ref {
                *credit.entry(stock_id.as_str()).or_insert(Decimal::ZERO) += item.quantity;
            }
        }

        self.ensure_available_inner(affiliate_id, items, &credit)
            .await
    }

    async fn ensure_available_inner(
        &self,
        affiliate_id: &str,
        items: &[LineItemInput],
        credit: &HashMap<&str, Decimal>,
    ) -> Result<()> {
        for input in items {
            let Some(stock_id) = &input.inventory_ref else {
                continue;
            };

            let wanted = money::or_zero(input.quantity);
            let stock = self.get_item(affiliate_id, stock_id).await?;
            let held = credit
                .get(stock_id.as_str())
                .copied()
                .unwrap_or(Decimal::ZERO);

            if stock.quantity + held < wanted {
                return Err(AppError::insufficient_stock(format!(
                    "'{}' has {} on hand, bill needs {}",
                    stock.name,
                    stock.quantity + held,
                    wanted
                )));
            }
        }

        Ok(())
    }

    /// Deduct the billed quantities from stock
    pub async fn deduct(&self, affiliate_id: &str, items: &[LineItem]) -> Result<()> {
        self.apply(affiliate_id, items, Decimal::NEGATIVE_ONE).await
    }

    /// Return previously deducted quantities, used when a bill's items are
    /// replaced on update or a write after deduction fails
    pub async fn release(&self, affiliate_id: &str, items: &[LineItem]) -> Result<()> {
        self.apply(affiliate_id, items, Decimal::ONE).await
    }

    // Applies signed movements item by item; when one fails, the movements
    // already made are undone before the error propagates
    async fn apply(&self, affiliate_id: &str, items: &[LineItem], sign: Decimal) -> Result<()> {
        let mut applied: Vec<(&str, Decimal)> = Vec::new();

        for item in items {
            let Some(stock_id) = &item.inventory_ref else {
                continue;
            };

            match self
                .repo
                .adjust_quantity(affiliate_id, stock_id, sign * item.quantity)
                .await
            {
                Ok(_) => applied.push((stock_id.as_str(), item.quantity)),
                Err(err) => {
                    for (stock_id, quantity) in applied.into_iter().rev() {
                        if let Err(undo_err) = self
                            .repo
                            .adjust_quantity(affiliate_id, stock_id, -sign * quantity)
                            .await
                        {
                            tracing::error!(
                                error = %undo_err,
                                stock_id,
                                "failed to undo a stock movement after a partial failure"
                            );
                        }
                    }
                    return Err(err);
                }
            }
        }

        Ok(())
    }
}
