pub mod access;
pub mod background_tasks;
pub mod client;
pub mod demo_data;
pub mod geo;
pub mod payment;
pub mod trial;
pub mod visitor;
