use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::OrderError;
use super::value_objects::{Customer, OrderProduct, OrderStatus, SaleType};

// ============================================================================
// Order Aggregate - Domain Logic
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    // Identity
    pub id: Uuid,
    pub code: String,

    // Current State
    pub status: OrderStatus,
    pub sale_type: SaleType,
    pub products: Vec<OrderProduct>,
    pub total: i64,

    // Optional fields
    pub note: Option<String>,
    pub customer: Option<Customer>,
    pub shipping_address: Option<String>,
    pub table_number: Option<i32>,
    pub payment_receipt_url: Option<String>,
    pub payment_account_id: Option<String>,

    // Audit Trail
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// New order in `CREATED` with a fresh identifier and tracking code.
    ///
    /// Fails with `TotalOverflow` when the line items do not sum into an `i64`.
    pub fn new(sale_type: SaleType, products: Vec<OrderProduct>) -> Result<Self, OrderError> {
        let now = Utc::now();
        let mut order = Self {
            id: Uuid::new_v4(),
            code: generate_order_code(),
            status: OrderStatus::Created,
            sale_type,
            products,
            total: 0,
            note: None,
            customer: None,
            shipping_address: None,
            table_number: None,
            payment_receipt_url: None,
            payment_account_id: None,
            created_at: now,
            updated_at: now,
        };
        order.calculate_total()?;
        Ok(order)
    }

    /// Recomputes `total` from the line items. Leaves it untouched on overflow.
    pub fn calculate_total(&mut self) -> Result<i64, OrderError> {
        self.total = sum_line_totals(&self.products)?;
        Ok(self.total)
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.status.can_transition_to(next)
    }

    /// Products, address and customer are frozen once the order leaves the
    /// kitchen or reaches a terminal status.
    pub fn can_be_modified(&self) -> bool {
        !matches!(
            self.status,
            OrderStatus::OutForDelivery | OrderStatus::Delivered | OrderStatus::Cancelled
        )
    }

    pub fn update_status(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.can_transition_to(next) {
            return Err(OrderError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        self.touch();
        Ok(())
    }

    /// Replaces every line item and sends the order back to `VERIFIED`,
    /// whatever status it held before.
    pub fn replace_products(&mut self, products: Vec<OrderProduct>) -> Result<(), OrderError> {
        if !self.can_be_modified() {
            return Err(OrderError::OrderCannotBeModified(self.status));
        }
        if products.is_empty() {
            return Err(OrderError::NoProducts);
        }

        self.total = sum_line_totals(&products)?;
        self.products = products;
        self.status = OrderStatus::Verified;
        self.touch();
        Ok(())
    }

    pub fn regenerate_code(&mut self) {
        self.code = generate_order_code();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn sum_line_totals(products: &[OrderProduct]) -> Result<i64, OrderError> {
    products.iter().try_fold(0i64, |total, product| {
        product
            .line_total()
            .and_then(|line| total.checked_add(line))
            .ok_or(OrderError::TotalOverflow)
    })
}

/// `ORD-<unix nanos>-<8 hex chars>`
pub fn generate_order_code() -> String {
    let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let random = Uuid::new_v4().simple().to_string();
    format!("ORD-{}-{}", timestamp, &random[..8])
}

// ============================================================================
// Unit Tests
// ============================================================================
