use super::aggregate::Order;
use super::errors::OrderError;
use super::value_objects::{OrderProduct, SaleType};

// ============================================================================
// Order Business Rules
// ============================================================================
//
// Run on create and on full modification. The first violated rule is
// returned. Sale type and status are closed enums here; unknown wire values
// are rejected when parsed (`SaleType::from_str`, `OrderStatus::from_str`).
//
// ============================================================================

impl Order {
    pub fn validate(&self) -> Result<(), OrderError> {
        validate_products(&self.products)?;

        match self.sale_type {
            SaleType::Delivery => self.validate_delivery(),
            SaleType::OnSite => self.validate_on_site(),
        }
    }

    fn validate_delivery(&self) -> Result<(), OrderError> {
        let customer = self
            .customer
            .as_ref()
            .ok_or(OrderError::CustomerRequiredForDelivery)?;
        if customer.name.is_empty() {
            return Err(OrderError::CustomerNameRequired);
        }
        if customer.phone.is_empty() {
            return Err(OrderError::CustomerPhoneRequired);
        }
        if self.shipping_address.as_deref().map_or(true, str::is_empty) {
            return Err(OrderError::ShippingAddressRequired);
        }
        if self.table_number.is_some() {
            return Err(OrderError::TableNumberNotAllowedForDelivery);
        }
        Ok(())
    }

    fn validate_on_site(&self) -> Result<(), OrderError> {
        let table = self
            .table_number
            .ok_or(OrderError::TableNumberRequiredForOnSite)?;
        if table <= 0 {
            return Err(OrderError::InvalidTableNumber(table));
        }
        if self.shipping_address.is_some() {
            return Err(OrderError::ShippingAddressNotAllowedForOnSite);
        }
        Ok(())
    }
}

fn validate_products(products: &[OrderProduct]) -> Result<(), OrderError> {
    if products.is_empty() {
        return Err(OrderError::NoProducts);
    }

    for (i, product) in products.iter().enumerate() {
        if product.id.is_empty() {
            return Err(OrderError::InvalidProductId);
        }
        if product.name.is_empty() {
            return Err(OrderError::InvalidProductName);
        }
        if product.quantity < 1 {
            return Err(OrderError::InvalidProductQuantity(product.quantity));
        }
        if product.price < 0 {
            return Err(OrderError::InvalidProductPrice(product.price));
        }
        if products[i + 1..].iter().any(|other| other.id == product.id) {
            return Err(OrderError::DuplicateProduct(product.id.clone()));
        }
    }

    Ok(())
}
