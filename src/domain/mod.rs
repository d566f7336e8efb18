pub mod errors;
pub mod money;
pub mod order;
pub mod page;
pub mod payment;
pub mod ports;
pub mod principal;
pub mod summary;
