// Service-level tests over in-memory repository fakes: bill-number
// immutability across updates, stock checks running before the engine,
// all-or-nothing rejection, and stock compensation when a write fails.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use billmate::billing::error::BillError;
use billmate::billing::models::{Bill, CreateBillRequest, LineItemInput};
use billmate::billing::repositories::BillRepository;
use billmate::billing::services::bill_number::{
    format_bill_number, BillNumberAllocator, DailySequence,
};
use billmate::billing::services::BillService;
use billmate::core::{AppError, Result};
use billmate::inventory::models::StockItem;
use billmate::inventory::repositories::StockRepository;
use billmate::inventory::services::StockService;

#[derive(Default)]
struct InMemoryBills {
    bills: Mutex<HashMap<String, Bill>>,
}

#[async_trait]
impl BillRepository for InMemoryBills {
    async fn create(&self, bill: &Bill) -> Result<Bill> {
        let mut bills = self.bills.lock().unwrap();
        if bills.contains_key(&bill.bill_number) {
            return Err(AppError::validation(format!(
                "Bill number '{}' already exists",
                bill.bill_number
            )));
        }

        let mut stored = bill.clone();
        stored.id = Some(format!("bill-{}", bills.len() + 1));
        stored.created_at = Some(Utc::now());
        stored.updated_at = stored.created_at;
        bills.insert(stored.bill_number.clone(), stored.clone());
        Ok(stored)
    }

    async fn update(&self, bill: &Bill) -> Result<Bill> {
        let mut bills = self.bills.lock().unwrap();
        if !bills.contains_key(&bill.bill_number) {
            return Err(AppError::not_found(format!("Bill '{}'", bill.bill_number)));
        }

        let mut stored = bill.clone();
        stored.updated_at = Some(Utc::now());
        bills.insert(stored.bill_number.clone(), stored.clone());
        Ok(stored)
    }

    async fn find_by_number(
        &self,
        affiliate_id: &str,
        bill_number: &str,
    ) -> Result<Option<Bill>> {
        let bills = self.bills.lock().unwrap();
        Ok(bills
            .get(bill_number)
            .filter(|b| b.affiliate_id == affiliate_id)
            .cloned())
    }

    async fn list(&self, affiliate_id: &str, _limit: i64, _offset: i64) -> Result<Vec<Bill>> {
        let bills = self.bills.lock().unwrap();
        Ok(bills
            .values()
            .filter(|b| b.affiliate_id == affiliate_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct InMemoryStock {
    items: Mutex<HashMap<String, StockItem>>,
}

impl InMemoryStock {
    fn with_item(id: &str, affiliate_id: &str, name: &str, quantity: Decimal) -> Arc<Self> {
        let stock = Self::default();
        stock.items.lock().unwrap().insert(
            id.to_string(),
            StockItem {
                id: Some(id.to_string()),
                affiliate_id: affiliate_id.to_string(),
                name: name.to_string(),
                quantity,
                unit_price: dec!(10),
                created_at: None,
                updated_at: None,
            },
        );
        Arc::new(stock)
    }

    fn quantity_of(&self, id: &str) -> Decimal {
        self.items.lock().unwrap().get(id).unwrap().quantity
    }
}

#[async_trait]
impl StockRepository for InMemoryStock {
    async fn create(&self, item: &StockItem) -> Result<StockItem> {
        let mut items = self.items.lock().unwrap();
        let mut stored = item.clone();
        let id = format!("stock-{}", items.len() + 1);
        stored.id = Some(id.clone());
        items.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, affiliate_id: &str, id: &str) -> Result<Option<StockItem>> {
        let items = self.items.lock().unwrap();
        Ok(items
            .get(id)
            .filter(|i| i.affiliate_id == affiliate_id)
            .cloned())
    }

    async fn list(
        &self,
        affiliate_id: &str,
        _limit: i64,
        _offset: i64,
    ) -> Result<Vec<StockItem>> {
        let items = self.items.lock().unwrap();
        Ok(items
            .values()
            .filter(|i| i.affiliate_id == affiliate_id)
            .cloned()
            .collect())
    }

    async fn adjust_quantity(
        &self,
        affiliate_id: &str,
        id: &str,
        delta: Decimal,
    ) -> Result<StockItem> {
        let mut items = self.items.lock().unwrap();
        let item = items
            .get_mut(id)
            .filter(|i| i.affiliate_id == affiliate_id)
            .ok_or_else(|| AppError::not_found(format!("Stock item '{}'", id)))?;

        if item.quantity + delta < Decimal::ZERO {
            return Err(AppError::insufficient_stock(format!(
                "'{}' has {} on hand, cannot remove {}",
                item.name, item.quantity, -delta
            )));
        }

        item.quantity += delta;
        Ok(item.clone())
    }
}

struct CountingSequence(AtomicU64);

#[async_trait]
impl DailySequence for CountingSequence {
    async fn next_for(&self, _day: NaiveDate) -> Result<u64> {
        Ok(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

// Wraps the in-memory repository so a single write can be made to fail,
// exercising the service's stock compensation paths
#[derive(Default)]
struct FlakyBills {
    inner: InMemoryBills,
    fail_create: AtomicBool,
    fail_update: AtomicBool,
}

#[async_trait]
impl BillRepository for FlakyBills {
    async fn create(&self, bill: &Bill) -> Result<Bill> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(AppError::validation(format!(
                "Bill number '{}' already exists",
                bill.bill_number
            )));
        }
        self.inner.create(bill).await
    }

    async fn update(&self, bill: &Bill) -> Result<Bill> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(AppError::internal("connection reset"));
        }
        self.inner.update(bill).await
    }

    async fn find_by_number(
        &self,
        affiliate_id: &str,
        bill_number: &str,
    ) -> Result<Option<Bill>> {
        self.inner.find_by_number(affiliate_id, bill_number).await
    }

    async fn list(&self, affiliate_id: &str, limit: i64, offset: i64) -> Result<Vec<Bill>> {
        self.inner.list(affiliate_id, limit, offset).await
    }
}

fn item(name: &str, quantity: Decimal, price: Decimal, stock_id: Option<&str>) -> LineItemInput {
    LineItemInput {
        name: name.to_string(),
        quantity: Some(quantity),
        unit_price: Some(price),
        discount: None,
        inventory_ref: stock_id.map(str::to_string),
    }
}

fn request(items: Vec<LineItemInput>, additional: Option<Decimal>) -> CreateBillRequest {
    CreateBillRequest {
        customer_id: "cust-1".to_string(),
        items,
        additional_discount: additional,
        payment_method: None,
        remarks: None,
    }
}

fn service(
    stock: Arc<InMemoryStock>,
    counter: u64,
) -> (BillService, Arc<InMemoryBills>) {
    let bills = Arc::new(InMemoryBills::default());
    let svc = BillService::new(
        bills.clone(),
        Arc::new(StockService::new(stock)),
        BillNumberAllocator::new(Arc::new(CountingSequence(AtomicU64::new(counter)))),
    );
    (svc, bills)
}

fn service_with_bills(
    bills: Arc<FlakyBills>,
    stock: Arc<InMemoryStock>,
) -> BillService {
    BillService::new(
        bills,
        Arc::new(StockService::new(stock)),
        BillNumberAllocator::new(Arc::new(CountingSequence(AtomicU64::new(0)))),
    )
}

#[tokio::test]
async fn test_create_assigns_daily_number_and_deducts_stock() {
    let stock = InMemoryStock::with_item("stock-rice", "aff-1", "Rice", dec!(10));
    let (svc, _) = service(stock.clone(), 0);

    let bill = svc
        .create_bill(
            "aff-1",
            request(
                vec![item("Rice", dec!(4), dec!(25), Some("stock-rice"))],
                None,
            ),
        )
        .await
        .unwrap();

    let today = Utc::now().date_naive();
    assert_eq!(bill.bill_number, format_bill_number(today, 1));
    assert_eq!(bill.subtotal, dec!(100));
    assert_eq!(bill.grand_total, dec!(100));
    assert_eq!(stock.quantity_of("stock-rice"), dec!(6));
}

#[tokio::test]
async fn test_update_preserves_bill_number() {
    let stock = InMemoryStock::with_item("stock-rice", "aff-1", "Rice", dec!(10));
    let (svc, _) = service(stock.clone(), 0);

    let created = svc
        .create_bill(
            "aff-1",
            request(
                vec![item("Rice", dec!(4), dec!(25), Some("stock-rice"))],
                None,
            ),
        )
        .await
        .unwrap();

    let updated = svc
        .update_bill(
            "aff-1",
            &created.bill_number,
            request(
                vec![item("Rice", dec!(2), dec!(25), Some("stock-rice"))],
                Some(dec!(5)),
            ),
        )
        .await
        .unwrap();

    // number carried over untouched, totals recomputed in full
    assert_eq!(updated.bill_number, created.bill_number);
    assert_eq!(updated.subtotal, dec!(50));
    assert_eq!(updated.grand_total, dec!(45));

    // old deduction released, new one taken: 10 - 4 + 4 - 2
    assert_eq!(stock.quantity_of("stock-rice"), dec!(8));
}

#[tokio::test]
async fn test_insufficient_stock_rejects_before_any_state_changes() {
    let stock = InMemoryStock::with_item("stock-rice", "aff-1", "Rice", dec!(3));
    let (svc, bills) = service(stock.clone(), 0);

    let err = svc
        .create_bill(
            "aff-1",
            request(
                vec![item("Rice", dec!(5), dec!(25), Some("stock-rice"))],
                None,
            ),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InsufficientStock(_)));
    assert!(bills.bills.lock().unwrap().is_empty());
    assert_eq!(stock.quantity_of("stock-rice"), dec!(3));
}

#[tokio::test]
async fn test_empty_bill_rejected_and_not_persisted() {
    let stock = InMemoryStock::with_item("stock-rice", "aff-1", "Rice", dec!(10));
    let (svc, bills) = service(stock, 0);

    let err = svc
        .create_bill("aff-1", request(vec![], None))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Bill(BillError::EmptyBill)));
    assert!(bills.bills.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_item_rejects_whole_bill() {
    let stock = InMemoryStock::with_item("stock-rice", "aff-1", "Rice", dec!(10));
    let (svc, bills) = service(stock.clone(), 0);

    let err = svc
        .create_bill(
            "aff-1",
            request(
                vec![
                    item("Rice", dec!(1), dec!(25), Some("stock-rice")),
                    item("Sugar", dec!(0), dec!(30), None),
                ],
                None,
            ),
        )
        .await
        .unwrap_err();

    // no partial acceptance: the valid first item is not billed either
    assert!(matches!(
        err,
        AppError::Bill(BillError::InvalidLineItem { index: 2, .. })
    ));
    assert!(bills.bills.lock().unwrap().is_empty());
    assert_eq!(stock.quantity_of("stock-rice"), dec!(10));
}

#[tokio::test]
async fn test_update_with_same_items_accepted_under_tight_stock() {
    // the whole stock is held by the bill being updated; resubmitting the
    // same quantities must not read as a shortfall
    let stock = InMemoryStock::with_item("stock-rice", "aff-1", "Rice", dec!(4));
    let (svc, _) = service(stock.clone(), 0);

    let created = svc
        .create_bill(
            "aff-1",
            request(
                vec![item("Rice", dec!(4), dec!(25), Some("stock-rice"))],
                None,
            ),
        )
        .await
        .unwrap();
    assert_eq!(stock.quantity_of("stock-rice"), dec!(0));

    let updated = svc
        .update_bill(
            "aff-1",
            &created.bill_number,
            request(
                vec![item("Rice", dec!(4), dec!(25), Some("stock-rice"))],
                Some(dec!(10)),
            ),
        )
        .await
        .unwrap();

    assert_eq!(updated.bill_number, created.bill_number);
    assert_eq!(updated.grand_total, dec!(90));
    assert_eq!(stock.quantity_of("stock-rice"), dec!(0));
}

#[tokio::test]
async fn test_rejected_bill_write_returns_stock() {
    let stock = InMemoryStock::with_item("stock-rice", "aff-1", "Rice", dec!(10));
    let bills = Arc::new(FlakyBills::default());
    bills.fail_create.store(true, Ordering::SeqCst);
    let svc = service_with_bills(bills.clone(), stock.clone());

    let err = svc
        .create_bill(
            "aff-1",
            request(
                vec![item("Rice", dec!(4), dec!(25), Some("stock-rice"))],
                None,
            ),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert!(bills.inner.bills.lock().unwrap().is_empty());
    assert_eq!(stock.quantity_of("stock-rice"), dec!(10));
}

#[tokio::test]
async fn test_rejected_update_write_restores_stock() {
    let stock = InMemoryStock::with_item("stock-rice", "aff-1", "Rice", dec!(10));
    let bills = Arc::new(FlakyBills::default());
    let svc = service_with_bills(bills.clone(), stock.clone());

    let created = svc
        .create_bill(
            "aff-1",
            request(
                vec![item("Rice", dec!(4), dec!(25), Some("stock-rice"))],
                None,
            ),
        )
        .await
        .unwrap();
    assert_eq!(stock.quantity_of("stock-rice"), dec!(6));

    bills.fail_update.store(true, Ordering::SeqCst);
    let err = svc
        .update_bill(
            "aff-1",
            &created.bill_number,
            request(
                vec![item("Rice", dec!(2), dec!(25), Some("stock-rice"))],
                None,
            ),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Internal(_)));

    // the old deduction stands, the attempted one does not
    assert_eq!(stock.quantity_of("stock-rice"), dec!(6));
    let stored = bills
        .find_by_number("aff-1", &created.bill_number)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.items[0].quantity, dec!(4));
}

#[tokio::test]
async fn test_partial_deduction_undone() {
    // both lines draw from the same stock item: each clears the availability
    // check alone, but the second deduction comes up short
    let stock = InMemoryStock::with_item("stock-rice", "aff-1", "Rice", dec!(5));
    let (svc, bills) = service(stock.clone(), 0);

    let err = svc
        .create_bill(
            "aff-1",
            request(
                vec![
                    item("Rice 5kg bag", dec!(4), dec!(25), Some("stock-rice")),
                    item("Rice loose", dec!(3), dec!(25), Some("stock-rice")),
                ],
                None,
            ),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InsufficientStock(_)));
    assert!(bills.bills.lock().unwrap().is_empty());
    assert_eq!(stock.quantity_of("stock-rice"), dec!(5));
}

#[tokio::test]
async fn test_breakdown_totals() {
    let stock = InMemoryStock::with_item("stock-rice", "aff-1", "Rice", dec!(10));
    let (svc, _) = service(stock, 0);

    let created = svc
        .create_bill(
            "aff-1",
            request(
                vec![
                    item("Rice", dec!(2), dec!(10), None),
                    LineItemInput {
                        name: "Oil".to_string(),
                        quantity: Some(dec!(1)),
                        unit_price: Some(dec!(5)),
                        discount: Some(dec!(1)),
                        inventory_ref: None,
                    },
                ],
                Some(dec!(2)),
            ),
        )
        .await
        .unwrap();

    let report = svc
        .get_breakdown("aff-1", &created.bill_number)
        .await
        .unwrap();

    assert_eq!(report.subtotal, dec!(25));
    assert_eq!(report.item_discount_total, dec!(1));
    assert_eq!(report.additional_discount, dec!(2));
    assert_eq!(report.total_discounts, dec!(3));
    assert_eq!(report.grand_total, dec!(22));
    assert_eq!(report.items[0].gross, dec!(20));
}
