pub mod accounts;
pub mod ads;
pub mod health;
pub mod proposals;
