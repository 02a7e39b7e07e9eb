pub mod access;
pub mod account;
pub mod invites;
pub mod tax;
