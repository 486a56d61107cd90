// Property-based tests for line item normalization.
//
// Properties tested:
// 1. net = max(0, quantity * unit_price - discount)
// 2. net is always non-negative, even when the discount exceeds gross
// 3. normalization is a pure function (same input, same output)
// 4. invalid quantity/price rejects with the item's 1-based position

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use billmate::billing::error::BillError;
use billmate::billing::models::{LineItem, LineItemInput};

fn input(quantity: Decimal, unit_price: Decimal, discount: Decimal) -> LineItemInput {
    LineItemInput {
        name: "Item".to_string(),
        quantity: Some(quantity),
        unit_price: Some(unit_price),
        discount: Some(discount),
        inventory_ref: None,
    }
}

proptest! {
    /// Property: net amount equals the clamped gross-minus-discount
    #[test]
    fn test_net_amount_formula(
        quantity in 1i64..=10_000,
        price_cents in 0i64..=1_000_000,
        discount_cents in 0i64..=2_000_000,
    ) {
        let quantity = Decimal::from(quantity);
        let unit_price = Decimal::new(price_cents, 2);
        let discount = Decimal::new(discount_cents, 2);

        let (item, gross) = LineItem::normalize(&input(quantity, unit_price, discount), 1)
            .expect("valid inputs must normalize");

        let expected_gross = (quantity * unit_price).round_dp(2);
        prop_assert_eq!(gross, expected_gross);

        let expected_net = (expected_gross - discount).max(Decimal::ZERO);
        prop_assert_eq!(item.net_amount, expected_net);
    }

    /// Property: net amount never goes negative
    #[test]
    fn test_net_amount_non_negative(
        quantity in 1i64..=10_000,
        price_cents in 0i64..=1_000_000,
        discount_cents in 0i64..=10_000_000,
    ) {
        let (item, _) = LineItem::normalize(
            &input(
                Decimal::from(quantity),
                Decimal::new(price_cents, 2),
                Decimal::new(discount_cents, 2),
            ),
            1,
        )
        .expect("valid inputs must normalize");

        prop_assert!(item.net_amount >= Decimal::ZERO);
    }

    /// Property: normalization is deterministic
    #[test]
    fn test_normalization_pure(
        quantity in 1i64..=10_000,
        price_cents in 0i64..=1_000_000,
        discount_cents in 0i64..=1_000_000,
    ) {
        let raw = input(
            Decimal::from(quantity),
            Decimal::new(price_cents, 2),
            Decimal::new(discount_cents, 2),
        );

        let first = LineItem::normalize(&raw, 1).unwrap();
        let second = LineItem::normalize(&raw, 1).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Property: non-positive quantity always rejects, citing the position
    #[test]
    fn test_non_positive_quantity_rejected(
        quantity in -10_000i64..=0,
        position in 1usize..=50,
    ) {
        let err = LineItem::normalize(
            &input(Decimal::from(quantity), dec!(10), Decimal::ZERO),
            position,
        )
        .unwrap_err();

        let is_expected_err = matches!(
            err,
            BillError::InvalidLineItem { index, .. } if index == position
        );
        prop_assert!(is_expected_err, "unexpected error: {:?}", err);
    }
}

#[test]
fn test_clamping_example() {
    // qty=2, price=10, discount=100 -> gross=20, net=0 (not -80)
    let (item, gross) = LineItem::normalize(&input(dec!(2), dec!(10), dec!(100)), 1).unwrap();
    assert_eq!(gross, dec!(20));
    assert_eq!(item.net_amount, dec!(0));
}

#[test]
fn test_supplied_net_amount_is_ignored() {
    // net_amount is not part of the input type at all; whatever a caller
    // sends alongside the raw fields cannot reach the normalized record
    let raw: LineItemInput = serde_json::from_str(
        r#"{"name":"Rice","quantity":"2","unit_price":"10","net_amount":"9999"}"#,
    )
    .unwrap();

    let (item, _) = LineItem::normalize(&raw, 1).unwrap();
    assert_eq!(item.net_amount, dec!(20));
}
