pub mod diesel_store;
pub mod memory;
pub mod models;
pub mod system;
