use std::sync::Arc;

use chrono::Utc;

use crate::core::{AppError, Result};
use crate::modules::billing::models::{Bill, BillResponse, BillStatus, CreateBillRequest};
use crate::modules::billing::repositories::BillRepository;
use crate::modules::billing::services::bill_number::BillNumberAllocator;
use crate::modules::billing::services::breakdown::{self, BillBreakdown};
use crate::modules::billing::services::engine;
use crate::modules::inventory::services::StockService;

/// Service for bill business logic.
///
/// Each create/update is one synchronous normalize-and-validate pass over one
/// record: stock availability first, then the engine, then persistence.
/// Nothing is written when any step rejects.
pub struct BillService {
    bills: Arc<dyn BillRepository>,
    stock: Arc<StockService>,
    allocator: BillNumberAllocator,
}

impl BillService {
    pub fn new(
        bills: Arc<dyn BillRepository>,
        stock: Arc<StockService>,
        allocator: BillNumberAllocator,
    ) -> Self {
        Self {
            bills,
            stock,
            allocator,
        }
    }

    /// Create a new bill for an affiliate's customer
    pub async fn create_bill(
        &self,
        affiliate_id: &str,
        request: CreateBillRequest,
    ) -> Result<BillResponse> {
        // Stock shortfalls reject before any bill state exists
        self.stock
            .ensure_available(affiliate_id, &request.items)
            .await?;

        let computation =
            engine::normalize_and_validate(&request.items, request.additional_discount)?;

        // Assigned exactly once; update paths never come through here
        let bill_number = self.allocator.allocate(Utc::now().date_naive()).await;

        let bill = Bill {
            id: None,
            affiliate_id: affiliate_id.to_string(),
            customer_id: request.customer_id,
            bill_number,
            items: computation.items,
            subtotal: computation.subtotal,
            item_discount_total: computation.item_discount_total,
            additional_discount: computation.additional_discount,
            grand_total: computation.grand_total,
            status: BillStatus::Pending,
            payment_method: request.payment_method,
            remarks: request.remarks,
            created_at: None,
            updated_at: None,
        };

        bill.validate().map_err(AppError::Bill)?;

        self.stock.deduct(affiliate_id, &bill.items).await?;

        // A rejected write (e.g. a duplicate number out of the fallback
        // path) must hand the deducted quantities back
        let created = match self.bills.create(&bill).await {
            Ok(created) => created,
            Err(err) => {
                if let Err(undo_err) = self.stock.release(affiliate_id, &bill.items).await {
                    tracing::error!(
                        error = %undo_err,
                        bill_number = %bill.bill_number,
                        "failed to return stock after a rejected bill write"
                    );
                }
                return Err(err);
            }
        };

        tracing::info!(
            bill_number = %created.bill_number,
            grand_total = %created.grand_total,
            "bill created"
        );

        Ok(created.into())
    }

    /// Replace a bill's items and discount. The whole record is recomputed;
    /// the bill number is carried over untouched.
    pub async fn update_bill(
        &self,
        affiliate_id: &str,
        bill_number: &str,
        request: CreateBillRequest,
    ) -> Result<BillResponse> {
        let existing = self
            .bills
            .find_by_number(affiliate_id, bill_number)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Bill '{}'", bill_number)))?;

        // Quantities held by this bill count as available again, so an
        // update carrying the same items through tight stock is accepted
        self.stock
            .ensure_available_for_update(affiliate_id, &request.items, &existing.items)
            .await?;

        let computation =
            engine::normalize_and_validate(&request.items, request.additional_discount)?;

        let bill = Bill {
            id: existing.id.clone(),
            affiliate_id: existing.affiliate_id.clone(),
            customer_id: request.customer_id,
            bill_number: existing.bill_number.clone(),
            items: computation.items,
            subtotal: computation.subtotal,
            item_discount_total: computation.item_discount_total,
            additional_discount: computation.additional_discount,
            grand_total: computation.grand_total,
            status: existing.status,
            payment_method: request.payment_method.or(existing.payment_method),
            remarks: request.remarks.or(existing.remarks),
            created_at: existing.created_at,
            updated_at: None,
        };

        bill.validate().map_err(AppError::Bill)?;

        // Replaced wholesale: give back the old deduction, take the new one.
        // Any later failure restores the old deduction before propagating.
        self.stock.release(affiliate_id, &existing.items).await?;

        if let Err(err) = self.stock.deduct(affiliate_id, &bill.items).await {
            if let Err(undo_err) = self.stock.deduct(affiliate_id, &existing.items).await {
                tracing::error!(
                    error = %undo_err,
                    bill_number = %bill.bill_number,
                    "failed to restore stock after a rejected bill update"
                );
            }
            return Err(err);
        }

        let updated = match self.bills.update(&bill).await {
            Ok(updated) => updated,
            Err(err) => {
                if let Err(undo_err) = self.stock.release(affiliate_id, &bill.items).await {
                    tracing::error!(
                        error = %undo_err,
                        bill_number = %bill.bill_number,
                        "failed to restore stock after a rejected bill update"
                    );
                } else if let Err(undo_err) =
                    self.stock.deduct(affiliate_id, &existing.items).await
                {
                    tracing::error!(
                        error = %undo_err,
                        bill_number = %bill.bill_number,
                        "failed to restore stock after a rejected bill update"
                    );
                }
                return Err(err);
            }
        };

        tracing::info!(
            bill_number = %updated.bill_number,
            grand_total = %updated.grand_total,
            "bill updated"
        );

        Ok(updated.into())
    }

    pub async fn get_bill(
        &self,
        affiliate_id: &str,
        bill_number: &str,
    ) -> Result<BillResponse> {
        let bill = self
            .bills
            .find_by_number(affiliate_id, bill_number)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Bill '{}'", bill_number)))?;

        Ok(bill.into())
    }

    pub async fn list_bills(
        &self,
        affiliate_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BillResponse>> {
        let bills = self.bills.list(affiliate_id, limit, offset).await?;
        Ok(bills.into_iter().map(BillResponse::from).collect())
    }

    /// Display decomposition of a persisted bill
    pub async fn get_breakdown(
        &self,
        affiliate_id: &str,
        bill_number: &str,
    ) -> Result<BillBreakdown> {
        let bill = self
            .bills
            .find_by_number(affiliate_id, bill_number)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Bill '{}'", bill_number)))?;

        Ok(breakdown::breakdown(&bill))
    }
}
