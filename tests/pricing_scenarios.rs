//! Integration tests for discount resolution and line pricing.
//!
//! Each scenario prices a single line through the public API and checks every derived figure.

use std::sync::Arc;

use rust_decimal_macros::dec;
use testresult::TestResult;

use bike_distributor::prelude::*;

fn bike(price: rust_decimal::Decimal, entries: Vec<(i64, DiscountRule)>) -> TestResult<Arc<Bike>> {
    let schedule = DiscountSchedule::with_entries(entries)?;

    Ok(Arc::new(Bike::with_discounts(
        "Giant", "Defy 1", price, schedule,
    )?))
}

#[test]
fn percentage_tier_applies_from_its_threshold() -> TestResult {
    let defy = bike(dec!(1000), vec![(20, DiscountRule::percentage(dec!(0.1))?)])?;

    let single = Line::new(Arc::clone(&defy), 1)?;
    let bulk = Line::new(defy, 20)?;

    assert_eq!(single.total_amount(), dec!(1000.00));
    assert_eq!(bulk.total_amount(), dec!(18000.00));
    assert_eq!(bulk.unit_discount_amount(), dec!(100.00));

    Ok(())
}

#[test]
fn fixed_amount_tier_discounts_each_unit() -> TestResult {
    let dura_ace = bike(dec!(5000), vec![(1, DiscountRule::fixed_amount(dec!(234.00))?)])?;

    let line = Line::new(dura_ace, 1)?;

    assert_eq!(line.total_discount_amount(), dec!(234.00));
    assert_eq!(line.total_amount(), dec!(4766.00));

    Ok(())
}

#[test]
fn scripted_rule_returns_per_unit_discount() -> TestResult {
    let scripted = bike(
        dec!(1000),
        vec![(
            CATCH_ALL,
            DiscountRule::expression("quantity >= 20 ? bike.price * 0.2 : 0")?,
        )],
    )?;

    let line = Line::new(scripted, 21)?;

    assert_eq!(line.unit_discount_amount(), dec!(200.00));
    assert_eq!(line.total_discount_amount(), dec!(4200.00));
    assert_eq!(line.total_amount(), dec!(16800.00));

    Ok(())
}

#[test]
fn scripted_rule_with_switch_and_locals() -> TestResult {
    let script = r"
        // tiered by brand
        let rate = 0;
        switch (bike.brand) {
            case 'Giant':
                if (quantity >= 10) { rate = 0.15 } else { rate = 0.05 }
                break;
            default:
                rate = 0.01;
        }
        round(bike.price * rate, 2)
    ";
    let scripted = bike(dec!(999.99), vec![(CATCH_ALL, DiscountRule::expression(script)?)])?;

    let line = Line::new(scripted, 10)?;

    assert_eq!(line.unit_discount_amount(), dec!(150.00));
    assert_eq!(line.unit_discount_percentage(), dec!(0.15));
    assert_eq!(line.total_discount_amount(), dec!(1500.00));
    assert_eq!(line.total_amount(), dec!(8499.90));

    Ok(())
}

#[test]
fn bike_without_schedule_is_never_discounted() -> TestResult {
    let elite = Arc::new(Bike::new("Specialized", "Venge Elite", dec!(2000))?);

    for quantity in [1, 10, 1000] {
        let line = Line::new(Arc::clone(&elite), quantity)?;

        assert_eq!(line.total_discount_amount(), dec!(0.00));
        assert_eq!(line.total_amount(), line.total_price());
    }

    Ok(())
}

#[test]
fn positive_threshold_beats_catch_all() -> TestResult {
    let mixed = bike(
        dec!(1000),
        vec![
            (CATCH_ALL, DiscountRule::fixed_amount(dec!(10))?),
            (20, DiscountRule::percentage(dec!(0.1))?),
        ],
    )?;

    assert_eq!(Line::new(Arc::clone(&mixed), 19)?.unit_discount_amount(), dec!(10.00));
    assert_eq!(Line::new(mixed, 20)?.unit_discount_amount(), dec!(100.00));

    Ok(())
}

#[test]
fn highest_qualifying_threshold_wins() -> TestResult {
    let tiered = bike(
        dec!(1000),
        vec![
            (5, DiscountRule::percentage(dec!(0.05))?),
            (10, DiscountRule::percentage(dec!(0.1))?),
            (50, DiscountRule::percentage(dec!(0.2))?),
        ],
    )?;

    let cases = [(4, dec!(0)), (5, dec!(0.05)), (49, dec!(0.10)), (50, dec!(0.20))];

    for (quantity, expected) in cases {
        assert_eq!(
            Line::new(Arc::clone(&tiered), quantity)?.unit_discount_percentage(),
            expected
        );
    }

    Ok(())
}

#[test]
fn resolve_is_idempotent() -> TestResult {
    let schedule = DiscountSchedule::with_entries([
        (CATCH_ALL, DiscountRule::expression("1")?),
        (3, DiscountRule::percentage(dec!(0.3))?),
    ])?;

    for quantity in 1..=6 {
        assert_eq!(schedule.resolve(quantity)?, schedule.resolve(quantity)?);
    }

    Ok(())
}

#[test]
fn duplicate_thresholds_are_rejected() -> TestResult {
    let mut schedule = DiscountSchedule::new();
    schedule
        .add(CATCH_ALL, DiscountRule::expression("0")?)?
        .add(10, DiscountRule::percentage(dec!(0.1))?)?;

    assert_eq!(
        schedule.add(10, DiscountRule::fixed_amount(dec!(5))?).err(),
        Some(ValidationError::DuplicateThreshold(10))
    );
    assert_eq!(
        schedule.add(CATCH_ALL, DiscountRule::fixed_amount(dec!(5))?).err(),
        Some(ValidationError::DuplicateThreshold(CATCH_ALL))
    );

    Ok(())
}

#[test]
fn non_positive_quantities_are_rejected() -> TestResult {
    let defy = bike(dec!(1000), vec![(20, DiscountRule::percentage(dec!(0.1))?)])?;

    for quantity in [0, -1, i64::MIN] {
        assert_eq!(
            defy.discounts().map(|schedule| schedule.resolve(quantity)),
            Some(Err(ValidationError::InvalidQuantity(quantity)))
        );
        assert_eq!(
            Line::new(Arc::clone(&defy), quantity),
            Err(PricingError::Validation(ValidationError::InvalidQuantity(
                quantity
            )))
        );
    }

    Ok(())
}

#[test]
fn failing_script_aborts_the_line() -> TestResult {
    let broken = bike(dec!(1000), vec![(CATCH_ALL, DiscountRule::expression("'free'")?)])?;

    assert_eq!(
        Line::new(broken, 1),
        Err(PricingError::Expression(
            ExpressionEvaluationError::NonNumericResult("string")
        ))
    );

    Ok(())
}

#[test]
fn total_amount_never_drifts_from_total_price_less_discount() -> TestResult {
    let rates = [dec!(0.01), dec!(0.125), dec!(0.333), dec!(0.5), dec!(1)];
    let prices = [dec!(0.99), dec!(19.95), dec!(333.33), dec!(1234.567)];

    for rate in rates {
        for price in prices {
            let priced = bike(price, vec![(1, DiscountRule::percentage(rate)?)])?;

            for quantity in [1, 3, 7, 99] {
                let line = Line::new(Arc::clone(&priced), quantity)?;

                assert_eq!(
                    line.total_amount(),
                    line.total_price() - line.total_discount_amount()
                );
            }
        }
    }

    Ok(())
}

#[test]
fn deeply_nested_script_is_a_syntax_error() -> TestResult {
    let script = format!("{}bike.price{}", "(".repeat(5000), ")".repeat(5000));
    let nested = bike(dec!(1000), vec![(CATCH_ALL, DiscountRule::expression(script)?)])?;

    assert!(matches!(
        Line::new(nested, 1),
        Err(PricingError::Expression(ExpressionEvaluationError::Syntax(_)))
    ));

    Ok(())
}

#[test]
fn script_ending_in_assignment_discounts_the_line() -> TestResult {
    let scripted = bike(
        dec!(1000),
        vec![(
            CATCH_ALL,
            DiscountRule::expression("let d = 0; d = bike.price * 0.2")?,
        )],
    )?;

    assert_eq!(Line::new(scripted, 1)?.unit_discount_amount(), dec!(200.00));

    Ok(())
}
