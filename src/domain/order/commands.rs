use super::value_objects::{Customer, OrderProduct, OrderStatus, Patch, SaleType};

// ============================================================================
// Order Commands - Represent user intent
// ============================================================================

#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub sale_type: SaleType,
    pub products: Vec<OrderProduct>,
    pub note: Option<String>,
    pub customer: Option<Customer>,
    pub shipping_address: Option<String>,
    pub table_number: Option<i32>,
    pub payment_receipt_url: Option<String>,
    pub payment_account_id: Option<String>,
}

/// Status and payment bookkeeping. Never touches products, so business
/// validation is not re-run.
#[derive(Debug, Clone, Default)]
pub struct PartialUpdate {
    pub status: Option<OrderStatus>,
    pub note: Patch<String>,
    pub payment_receipt_url: Patch<String>,
    pub payment_account_id: Patch<String>,
}

/// Full modification. A non-empty product list sends the order back to
/// `VERIFIED`.
#[derive(Debug, Clone, Default)]
pub struct ModifyOrder {
    pub products: Option<Vec<OrderProduct>>,
    pub shipping_address: Option<String>,
    pub customer: Option<Customer>,
    pub note: Option<String>,
}
