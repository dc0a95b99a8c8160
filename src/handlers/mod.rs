pub mod admin;
pub mod dashboard;
pub mod health;
pub mod payments;
pub mod trials;
pub mod users;
pub mod visitors;
