use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::errors::OrderError;

// ============================================================================
// Order Value Objects
// ============================================================================

/// One product entry inside an order, priced at the moment it was ordered.
///
/// Prices are in minor currency units.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderProduct {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
    pub price: i64,
    pub quantity: i32,
}

impl OrderProduct {
    /// `price × quantity`, or `None` when it does not fit in an `i64`.
    pub fn line_total(&self) -> Option<i64> {
        self.price.checked_mul(i64::from(self.quantity))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Customer {
    pub identification: String,
    pub id_type: IdType,
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdType {
    #[serde(rename = "CC")]
    CitizenId,
    #[serde(rename = "CE")]
    ForeignerId,
    #[serde(rename = "PASSPORT")]
    Passport,
    #[serde(rename = "NIT")]
    TaxId,
}

impl FromStr for IdType {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CC" => Ok(IdType::CitizenId),
            "CE" => Ok(IdType::ForeignerId),
            "PASSPORT" => Ok(IdType::Passport),
            "NIT" => Ok(IdType::TaxId),
            other => Err(OrderError::InvalidIdType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleType {
    Delivery,
    OnSite,
}

impl SaleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleType::Delivery => "DELIVERY",
            SaleType::OnSite => "ON_SITE",
        }
    }
}

impl fmt::Display for SaleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SaleType {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DELIVERY" => Ok(SaleType::Delivery),
            "ON_SITE" => Ok(SaleType::OnSite),
            other => Err(OrderError::InvalidSaleType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    Verified,
    InProgress,
    OutForDelivery,
    Delivered,
    Cancelled,
}

// ============================================================================
// Status State Machine
// ============================================================================
//
// Adjacency table of every permitted transition. A pair that does not appear
// here is rejected, which makes DELIVERED and CANCELLED terminal and rules out
// self transitions.
//
// ============================================================================

const TRANSITIONS: &[(OrderStatus, &[OrderStatus])] = &[
    (
        OrderStatus::Created,
        &[OrderStatus::Verified, OrderStatus::InProgress, OrderStatus::Cancelled],
    ),
    (
        OrderStatus::Verified,
        &[OrderStatus::InProgress, OrderStatus::Cancelled],
    ),
    (
        OrderStatus::InProgress,
        // DELIVERED directly covers on-site orders
        &[OrderStatus::OutForDelivery, OrderStatus::Delivered, OrderStatus::Cancelled],
    ),
    (
        OrderStatus::OutForDelivery,
        &[OrderStatus::Delivered, OrderStatus::Cancelled],
    ),
    (OrderStatus::Delivered, &[]),
    (OrderStatus::Cancelled, &[]),
];

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Created,
        OrderStatus::Verified,
        OrderStatus::InProgress,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Verified => "VERIFIED",
            OrderStatus::InProgress => "IN_PROGRESS",
            OrderStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn allowed_transitions(&self) -> &'static [OrderStatus] {
        TRANSITIONS
            .iter()
            .find(|(from, _)| from == self)
            .map(|(_, to)| *to)
            .unwrap_or(&[])
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| OrderError::InvalidStatus(s.to_string()))
    }
}

// ============================================================================
// Patch - tri-state field update
// ============================================================================

/// Update instruction for a nullable field.
///
/// Deserializes from a JSON field that is missing (`Absent`), `null`
/// (`Clear`) or holds a value (`Set`). Fields must carry `#[serde(default)]`
/// for the missing case to resolve to `Absent`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Patch<T> {
    #[default]
    Absent,
    Clear,
    Set(T),
}

impl<T> Patch<T> {
    /// Applies the patch to `target`, leaving it untouched when absent.
    pub fn apply_to(self, target: &mut Option<T>) {
        match self {
            Patch::Absent => {}
            Patch::Clear => *target = None,
            Patch::Set(value) => *target = Some(value),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Patch::Set(v),
            None => Patch::Clear,
        }
    }
}

/// `Set` serializes as the value; `Absent` and `Clear` both as `null`.
impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Patch::Set(value) => serializer.serialize_some(value),
            Patch::Absent | Patch::Clear => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Patch::from)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
