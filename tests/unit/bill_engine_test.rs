// Property-based tests for the bill computation engine.
//
// Properties tested:
// 1. Idempotent recomputation: same items + discount -> identical derived fields
// 2. Non-negativity: subtotal and grand total never go negative
// 3. Aggregation: subtotal = sum of gross, item_discount_total = sum of discounts
// 4. Clamping at the bill level is independent of item-level clamping

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use billmate::billing::error::BillError;
use billmate::billing::models::LineItemInput;
use billmate::billing::services::engine::normalize_and_validate;

fn item(quantity: i64, price_cents: i64, discount_cents: i64) -> LineItemInput {
    LineItemInput {
        name: "Item".to_string(),
        quantity: Some(Decimal::from(quantity)),
        unit_price: Some(Decimal::new(price_cents, 2)),
        discount: Some(Decimal::new(discount_cents, 2)),
        inventory_ref: None,
    }
}

fn arb_items() -> impl Strategy<Value = Vec<LineItemInput>> {
    prop::collection::vec(
        (1i64..=1000, 0i64..=100_000, 0i64..=200_000)
            .prop_map(|(q, p, d)| item(q, p, d)),
        1..=8,
    )
}

proptest! {
    /// Property: recomputation yields identical derived fields every time
    #[test]
    fn test_idempotent_recomputation(
        items in arb_items(),
        additional_cents in 0i64..=500_000,
    ) {
        let additional = Some(Decimal::new(additional_cents, 2));

        let first = normalize_and_validate(&items, additional).unwrap();
        let second = normalize_and_validate(&items, additional).unwrap();

        prop_assert_eq!(first, second);
    }

    /// Property: all derived amounts are non-negative
    #[test]
    fn test_non_negativity(
        items in arb_items(),
        additional_cents in 0i64..=10_000_000,
    ) {
        let comp = normalize_and_validate(
            &items,
            Some(Decimal::new(additional_cents, 2)),
        )
        .unwrap();

        prop_assert!(comp.subtotal >= Decimal::ZERO);
        prop_assert!(comp.item_discount_total >= Decimal::ZERO);
        prop_assert!(comp.grand_total >= Decimal::ZERO);
        for line in &comp.items {
            prop_assert!(line.net_amount >= Decimal::ZERO);
        }
    }

    /// Property: subtotal and discount totals are the sums of their parts
    #[test]
    fn test_aggregation_sums(items in arb_items()) {
        let comp = normalize_and_validate(&items, None).unwrap();

        let gross_sum: Decimal = comp.items.iter().map(|i| i.gross()).sum();
        let discount_sum: Decimal = comp.items.iter().map(|i| i.discount).sum();

        prop_assert_eq!(comp.subtotal, gross_sum.round_dp(2));
        prop_assert_eq!(comp.item_discount_total, discount_sum.round_dp(2));
    }

    /// Property: grand total follows the clamped formula
    #[test]
    fn test_grand_total_formula(
        items in arb_items(),
        additional_cents in 0i64..=10_000_000,
    ) {
        let additional = Decimal::new(additional_cents, 2);
        let comp = normalize_and_validate(&items, Some(additional)).unwrap();

        let expected = (comp.subtotal - comp.item_discount_total - additional)
            .max(Decimal::ZERO);
        prop_assert_eq!(comp.grand_total, expected);
    }
}

#[test]
fn test_worked_example() {
    // [{2,10,0},{1,5,1}] + additional 2 -> subtotal 25, discounts 1, total 22
    let items = vec![item(2, 1000, 0), item(1, 500, 100)];
    let comp = normalize_and_validate(&items, Some(dec!(2))).unwrap();

    assert_eq!(comp.subtotal, dec!(25));
    assert_eq!(comp.item_discount_total, dec!(1));
    assert_eq!(comp.grand_total, dec!(22));
}

#[test]
fn test_empty_bill_rejected() {
    assert_eq!(
        normalize_and_validate(&[], None).unwrap_err(),
        BillError::EmptyBill
    );
}

#[test]
fn test_bill_level_clamp_to_zero() {
    // a bill can legitimately land on zero when discounts exceed gross
    let items = vec![item(1, 1000, 0)];
    let comp = normalize_and_validate(&items, Some(dec!(50))).unwrap();
    assert_eq!(comp.grand_total, dec!(0));
}

#[test]
fn test_invalid_item_position_reported() {
    let items = vec![item(1, 1000, 0), item(0, 1000, 0), item(1, 1000, 0)];
    let err = normalize_and_validate(&items, None).unwrap_err();
    assert!(matches!(err, BillError::InvalidLineItem { index: 2, .. }));
}
