pub mod access_log;
pub mod client;
pub mod client_user;
pub mod payment;
pub mod session;
pub mod trial;
pub mod visitor;
