//! Decrypt request builder.
//!
//! A decrypt request is always built fresh from the latest known handle per
//! slot: absent handles are filtered out, order of first appearance is kept
//! and each distinct handle appears exactly once.

use crate::handle::CiphertextHandle;
use alloy_primitives::Address;
use std::collections::HashSet;

/// One entry of a batch decryption request, scoped to the contract the
/// handle was fetched under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleContractPair {
    pub handle: CiphertextHandle,
    pub contract_address: Address,
}

/// Build the batch for a user-triggered reveal from the current set of
/// tracked handles.
pub fn build_decryption_request<I>(entries: I) -> Vec<HandleContractPair>
where
    I: IntoIterator<Item = (Address, Option<CiphertextHandle>)>,
{
    let mut seen = HashSet::new();
    let mut pairs = Vec::new();
    for (contract_address, handle) in entries {
        let Some(handle) = handle else {
            continue;
        };
        if !handle.is_initialized() {
            continue;
        }
        if seen.insert(handle) {
            pairs.push(HandleContractPair {
                handle,
                contract_address,
            });
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    fn handle(byte: u8) -> CiphertextHandle {
        CiphertextHandle::from(B256::repeat_byte(byte))
    }

    #[test]
    fn skips_absent_and_uninitialized_handles() {
        let contract = Address::repeat_byte(1);
        let pairs = build_decryption_request([
            (contract, None),
            (contract, Some(CiphertextHandle::UNINITIALIZED)),
            (contract, Some(handle(1))),
        ]);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].handle, handle(1));
    }

    #[test]
    fn deduplicates_by_handle_keeping_first_occurrence() {
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        let pairs = build_decryption_request([
            (a, Some(handle(1))),
            (b, Some(handle(2))),
            (b, Some(handle(1))),
        ]);
        assert_eq!(
            pairs,
            vec![
                HandleContractPair {
                    handle: handle(1),
                    contract_address: a
                },
                HandleContractPair {
                    handle: handle(2),
                    contract_address: b
                },
            ]
        );
    }

    #[test]
    fn empty_input_builds_empty_request() {
        let entries: Vec<(Address, Option<CiphertextHandle>)> = Vec::new();
        assert!(build_decryption_request(entries).is_empty());
    }
}
