use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Insufficient payment: expected {expected} cents, got {paid} cents")]
    InsufficientPayment { expected: i64, paid: i64 },
    #[error("Store error: {0}")]
    Store(String),
}

impl DomainError {
    pub fn order_not_found(id: uuid::Uuid) -> Self {
        DomainError::NotFound(format!("Order {id}"))
    }

    pub fn payment_not_found(id: uuid::Uuid) -> Self {
        DomainError::NotFound(format!("Payment {id}"))
    }

    pub fn product_not_found(id: uuid::Uuid) -> Self {
        DomainError::NotFound(format!("Product {id}"))
    }
}
