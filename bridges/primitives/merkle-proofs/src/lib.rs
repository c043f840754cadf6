// Copyright (C) Parity Technologies (UK) Ltd.
// This file is part of Parity Bridges Common.

// Parity Bridges Common is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// Parity Bridges Common is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with Parity Bridges Common.  If not, see <http://www.gnu.org/licenses/>.

//! Proof primitives that the relayer uses to check what it is about to relay.
//!
//! Two kinds of proofs are supported:
//!
//! - proofs of BEEFY MMR leaf inclusion. The relay chain RPC returns them in the layout of the
//!   `ckb-merkle-mountain-range` crate. We convert them into the "simplified" form (a flat list
//!   of hashes and a bitfield with hashing order), which is what the destination chain verifies;
//! - proofs of message inclusion into the outbound queue commitment. The commitment is a binary
//!   Merkle tree where the last odd node of every level is promoted to the next level.
//!
//! All functions here are pure. The root that comes with the proof is only trusted after the
//! caller has compared it with the root read from the chain.

pub mod merkle;
pub mod mmr;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use merkle::{verify_merkle_proof, MerkleProof};
pub use mmr::{
	calculate_merkle_root, convert_to_simplified_mmr_proof, hash_leaf, BeefyMmrLeaf,
	SimplifiedMmrProof,
};

use sp_core::H256;

/// Errors that make a proof unprovable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	/// MMR with zero leaves can't prove anything.
	#[error("MMR proof is generated for an empty MMR")]
	EmptyMmr,
	/// The leaf index is outside of the tree.
	#[error("Leaf index {leaf_index} is out of range for tree with {leaf_count} leaves")]
	LeafIndexOutOfRange {
		/// Index of the leaf we're proving.
		leaf_index: u64,
		/// Number of leaves in the tree.
		leaf_count: u64,
	},
	/// We only support proofs of single leaf.
	#[error("Expected proof of a single leaf, got proof of {0} leaves")]
	UnexpectedLeavesCount(usize),
	/// Number of proof items doesn't match tree shape.
	#[error("Proof has {actual} items, while tree shape requires {expected}")]
	InvalidItemsCount {
		/// Number of items that the tree shape requires.
		expected: usize,
		/// Number of items in the proof.
		actual: usize,
	},
	/// Proof path is longer than the order bitfield can describe.
	#[error("Proof requires {0} hashing steps, which is more than supported")]
	ProofTooLong(usize),
	/// Position arithmetic went outside of the peak that must contain the leaf.
	#[error("Proof path has escaped the peak at position {0}")]
	PathEscapedPeak(u64),
	/// MMR positions of that many leaves don't fit into `u64`.
	#[error("MMR with {0} leaves is too large")]
	LeafCountOverflow(u64),
	/// The leaf and proof items lead to other root.
	#[error("Proof doesn't lead to the claimed root {0:?}")]
	MerkleRootMismatch(H256),
}

/// Hash of two nodes, concatenated in given order.
pub fn keccak_pair(left: &H256, right: &H256) -> H256 {
	let mut combined = [0u8; 64];
	combined[..32].copy_from_slice(left.as_bytes());
	combined[32..].copy_from_slice(right.as_bytes());
	H256(sp_crypto_hashing::keccak_256(&combined))
}

/// Keccak-256 hash of arbitrary data.
pub fn keccak(data: &[u8]) -> H256 {
	H256(sp_crypto_hashing::keccak_256(data))
}

#[cfg(test)]
mod tests {
	use super::*;
	use hex_literal::hex;

	#[test]
	fn keccak_matches_known_vectors() {
		assert_eq!(
			keccak(&[]),
			H256(hex!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")),
		);
		assert_eq!(
			keccak_pair(&H256::zero(), &H256::zero()),
			H256(hex!("ad3228b676f7d3cd4284a5443f17f1962b36e491b30a40b2405849e597ba5fb5")),
		);
	}

	#[test]
	fn keccak_pair_depends_on_operand_order() {
		let (a, b) = (H256::repeat_byte(1), H256::repeat_byte(2));
		assert_ne!(keccak_pair(&a, &b), keccak_pair(&b, &a));
		assert_eq!(keccak_pair(&a, &b), keccak(&[a.as_bytes(), b.as_bytes()].concat()));
	}
}
