pub mod balances;
pub mod contracts;
pub mod lending;
pub mod quote;
pub mod shield;
