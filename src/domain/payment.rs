use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::DomainError;
use super::page::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Other,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::Transfer,
        PaymentMethod::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Other => "other",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| DomainError::Validation(format!("unknown payment method '{s}'")))
    }
}

/// `Failed` and `Refunded` are representable but no operation produces them yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 4] = [
        PaymentStatus::Pending,
        PaymentStatus::Completed,
        PaymentStatus::Failed,
        PaymentStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::Validation(format!("unknown payment status '{s}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub cashier_id: Uuid,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub reference_number: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Longest `reference_number` the payments table accepts, in characters.
pub const MAX_REFERENCE_LEN: usize = 100;

/// Amount and method of a payment about to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentInput {
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub reference_number: Option<String>,
    pub note: Option<String>,
}

impl PaymentInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.amount_cents < 1 {
            return Err(DomainError::Validation(format!(
                "payment amount must be at least 1 cent, got {}",
                self.amount_cents
            )));
        }
        if let Some(reference) = &self.reference_number {
            let len = reference.chars().count();
            if len > MAX_REFERENCE_LEN {
                return Err(DomainError::Validation(format!(
                    "reference number must be at most {MAX_REFERENCE_LEN} characters, got {len}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub order_id: Option<Uuid>,
    pub cashier_id: Option<Uuid>,
    pub method: Option<PaymentMethod>,
    pub status: Option<PaymentStatus>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub page: Page,
}

impl PaymentFilter {
    pub fn for_order(order_id: Uuid) -> Self {
        Self {
            order_id: Some(order_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, payment: &Payment) -> bool {
        self.order_id.map_or(true, |o| payment.order_id == o)
            && self.cashier_id.map_or(true, |c| payment.cashier_id == c)
            && self.method.map_or(true, |m| payment.method == m)
            && self.status.map_or(true, |s| payment.status == s)
            && self.created_from.map_or(true, |from| payment.created_at >= from)
            && self.created_to.map_or(true, |to| payment.created_at <= to)
    }
}

/// Most recent first, ties broken by id.
pub fn newest_first(a: &Payment, b: &Payment) -> std::cmp::Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_and_status_parse_their_wire_names() {
        for method in PaymentMethod::ALL {
            assert_eq!(method.as_str().parse::<PaymentMethod>().unwrap(), method);
        }
        for status in PaymentStatus::ALL {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn serde_uses_snake_case_names() {
        let json = serde_json::to_string(&PaymentMethod::Transfer).unwrap();
        assert_eq!(json, "\"transfer\"");
        let status: PaymentStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(status, PaymentStatus::Completed);
    }

    #[test]
    fn input_requires_positive_amount() {
        let mut input = PaymentInput {
            amount_cents: 0,
            method: PaymentMethod::Cash,
            reference_number: None,
            note: None,
        };
        assert!(matches!(input.validate(), Err(DomainError::Validation(_))));
        input.amount_cents = 1;
        assert!(input.validate().is_ok());
    }

    #[test]
    fn input_limits_reference_number_length() {
        let mut input = PaymentInput {
            amount_cents: 500,
            method: PaymentMethod::Card,
            reference_number: Some("7".repeat(MAX_REFERENCE_LEN)),
            note: None,
        };
        assert!(input.validate().is_ok());

        input.reference_number = Some("7".repeat(MAX_REFERENCE_LEN + 1));
        assert!(matches!(input.validate(), Err(DomainError::Validation(_))));

        // Counted in characters, as Postgres counts VARCHAR length.
        input.reference_number = Some("é".repeat(MAX_REFERENCE_LEN));
        assert!(input.validate().is_ok());
    }
}
