//! Repository implementations

pub mod notification_repository;
pub mod user_repository;

pub use notification_repository::NotificationRepository;
pub use user_repository::UserRepository;
