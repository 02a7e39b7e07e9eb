//! Entity definitions for the Enkel Utleie domain

pub mod agreement;
pub mod error_log;
pub mod event;
pub mod finance;
pub mod invitation;
pub mod maintenance;
pub mod message;
pub mod notification;
pub mod rating;
pub mod reminder;
pub mod unit;
pub mod user;
