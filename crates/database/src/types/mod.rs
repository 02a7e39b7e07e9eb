//! Shared types for the database layer

pub mod errors;

pub use errors::{DatabaseError, NotificationError, UserError};

/// Result alias for general database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Result alias for user operations
pub type UserResult<T> = Result<T, UserError>;

/// Result alias for notification operations
pub type NotificationResult<T> = Result<T, NotificationError>;
