//! Line items and monetary totals shared by quotations and invoices.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

/// One billable unit within a quotation or invoice. Owned exclusively by
/// its parent document; `total` is always derived, never caller-supplied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total: f64,
}

/// Caller-supplied line item. Any `total`/`subtotal` the caller sends is
/// ignored; totals are recomputed on every persist.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LineItemInput {
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TotalsError {
    #[error("line item quantity must be greater than zero")]
    NonPositiveQuantity,

    #[error("line item unit price cannot be negative")]
    NegativeUnitPrice,

    #[error("tax and discount cannot be negative")]
    NegativeAdjustment,

    #[error("discount exceeds subtotal plus tax")]
    DiscountExceedsTotal,
}

/// Recomputed monetary state for a quotation or invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentTotals {
    pub items: Vec<LineItem>,
    pub subtotal: f64,
    pub total_amount: f64,
}

/// Recompute per-item totals, the subtotal, and the document total.
///
/// `tax` and `discount` are flat amounts, not percentages. A discount that
/// drives the total negative is rejected rather than clamped.
pub fn compute_totals(
    items: &[LineItemInput],
    tax: f64,
    discount: f64,
) -> Result<DocumentTotals, TotalsError> {
    if tax < 0.0 || discount < 0.0 {
        return Err(TotalsError::NegativeAdjustment);
    }

    let mut computed = Vec::with_capacity(items.len());
    let mut subtotal = 0.0;

    for item in items {
        if item.quantity <= 0.0 {
            return Err(TotalsError::NonPositiveQuantity);
        }
        if item.unit_price < 0.0 {
            return Err(TotalsError::NegativeUnitPrice);
        }

        let total = item.quantity * item.unit_price;
        subtotal += total;
        computed.push(LineItem {
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            total,
        });
    }

    let total_amount = subtotal + tax - discount;
    if total_amount < 0.0 {
        return Err(TotalsError::DiscountExceedsTotal);
    }

    Ok(DocumentTotals {
        items: computed,
        subtotal,
        total_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(description: &str, quantity: f64, unit_price: f64) -> LineItemInput {
        LineItemInput {
            description: description.to_string(),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn totals_are_derived_from_items() {
        let totals = compute_totals(&[item("A", 2.0, 100.0)], 10.0, 5.0).unwrap();

        assert_eq!(totals.items.len(), 1);
        assert_eq!(totals.items[0].total, 200.0);
        assert_eq!(totals.subtotal, 200.0);
        assert_eq!(totals.total_amount, 205.0);
    }

    #[test]
    fn multiple_items_sum_into_subtotal() {
        let totals = compute_totals(
            &[item("design", 3.0, 50.0), item("hosting", 1.0, 25.5)],
            0.0,
            0.0,
        )
        .unwrap();

        assert_eq!(totals.subtotal, 175.5);
        assert_eq!(totals.total_amount, 175.5);
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let err = compute_totals(&[item("A", 0.0, 100.0)], 0.0, 0.0).unwrap_err();
        assert_eq!(err, TotalsError::NonPositiveQuantity);
    }

    #[test]
    fn negative_unit_price_is_rejected() {
        let err = compute_totals(&[item("A", 1.0, -1.0)], 0.0, 0.0).unwrap_err();
        assert_eq!(err, TotalsError::NegativeUnitPrice);
    }

    #[test]
    fn negative_tax_or_discount_is_rejected() {
        let err = compute_totals(&[item("A", 1.0, 10.0)], -1.0, 0.0).unwrap_err();
        assert_eq!(err, TotalsError::NegativeAdjustment);

        let err = compute_totals(&[item("A", 1.0, 10.0)], 0.0, -1.0).unwrap_err();
        assert_eq!(err, TotalsError::NegativeAdjustment);
    }

    #[test]
    fn discount_exceeding_subtotal_plus_tax_is_rejected() {
        let err = compute_totals(&[item("A", 1.0, 10.0)], 2.0, 13.0).unwrap_err();
        assert_eq!(err, TotalsError::DiscountExceedsTotal);
    }

    #[test]
    fn discount_equal_to_subtotal_plus_tax_is_allowed() {
        let totals = compute_totals(&[item("A", 1.0, 10.0)], 2.0, 12.0).unwrap();
        assert_eq!(totals.total_amount, 0.0);
    }
}
