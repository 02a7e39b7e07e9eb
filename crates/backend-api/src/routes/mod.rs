pub mod account;
pub mod agreements;
pub mod auth;
pub mod events;
pub mod finances;
pub mod health;
pub mod invitations;
pub mod maintenance;
pub mod messages;
pub mod models;
pub mod notifications;
pub mod ratings;
pub mod reminders;
pub mod units;
