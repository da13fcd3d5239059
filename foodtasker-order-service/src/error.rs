use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("cannot obtain database connection: {0}")]
    Pool(String),
    #[error("cannot run migrations: {0}")]
    Migration(String),
}

/// Business rules that reject an otherwise well-formed request.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    #[error("Your last order must be completed first")]
    OutstandingOrder,
    #[error("You can only pick up one order at a time")]
    DriverBusy,
    #[error("This order has been picked up by another.")]
    AlreadyPicked,
    #[error("Order is not being cooked")]
    NotCooking,
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Conflict(#[from] Conflict),
    #[error("{0}")]
    NotFound(String),
    #[error("storage unavailable")]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }
}
