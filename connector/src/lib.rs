pub mod chain;
pub mod core;
pub mod error;
pub mod relayer;

pub use crate::core::coordinator::{
    CoordinatorHandle, CoordinatorOptions, PortfolioSnapshot, RevealCoordinator, SlotView,
    ENCRYPTED_PLACEHOLDER,
};
pub use crate::core::session::{SessionContext, SessionWallet};
pub use error::{Error, Result};
