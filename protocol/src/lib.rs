//! Domain types for the confidential balance reveal flow.
//!
//! Everything in this crate is pure data: ciphertext handles, token amounts,
//! the per-chain protocol registry, the decrypt request builder and the
//! reveal state machine. All I/O lives in the `shield-connector` crate.

pub mod amount;
pub mod handle;
pub mod registry;
pub mod request;
pub mod reveal;

pub use amount::AmountError;
pub use handle::CiphertextHandle;
pub use registry::{ProtocolRegistry, TokenSymbol, TrackedContract};
pub use request::{build_decryption_request, HandleContractPair};
pub use reveal::{Plaintext, RevealLedger, RevealState, SlotKey};
