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

//! Proofs of message inclusion into the outbound queue commitment.

use crate::Error;

use binary_merkle_tree::Leaf;
use codec::{Decode, Encode};
use sp_core::H256;
use sp_runtime::traits::Keccak256;

/// Proof of leaf inclusion into the binary Merkle tree, as it is returned by the
/// `OutboundQueueApi_prove_message` runtime API.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MerkleProof {
	/// Root of the tree, as claimed by the proof producer.
	pub root: H256,
	/// Sibling hashes, bottom-up. Levels where the node is promoted have no item.
	pub proof: Vec<H256>,
	/// Number of leaves in the tree.
	pub number_of_leaves: u64,
	/// Index of the proved leaf.
	pub leaf_index: u64,
	/// Hash of the proved leaf.
	pub leaf: H256,
}

impl MerkleProof {
	/// Returns true if the leaf and proof items lead to the claimed root.
	pub fn is_valid(&self) -> bool {
		verify_merkle_proof(self).is_ok()
	}
}

/// Check that the leaf and proof items lead to the root of the proof.
///
/// The caller must still compare `proof.root` with the root that it has read from the chain.
pub fn verify_merkle_proof(proof: &MerkleProof) -> Result<(), Error> {
	let out_of_range = || Error::LeafIndexOutOfRange {
		leaf_index: proof.leaf_index,
		leaf_count: proof.number_of_leaves,
	};
	if proof.leaf_index >= proof.number_of_leaves {
		return Err(out_of_range())
	}
	let number_of_leaves = usize::try_from(proof.number_of_leaves).map_err(|_| out_of_range())?;
	let leaf_index = usize::try_from(proof.leaf_index).map_err(|_| out_of_range())?;

	// the tree verifier folds over all given items, so extra items must be rejected here
	let expected = proof_items_count(proof.leaf_index, proof.number_of_leaves);
	if proof.proof.len() != expected {
		return Err(Error::InvalidItemsCount { expected, actual: proof.proof.len() })
	}

	let is_valid = binary_merkle_tree::verify_proof::<Keccak256, _, _>(
		&proof.root,
		proof.proof.iter().copied(),
		u32::try_from(number_of_leaves).map_err(|_| out_of_range())?,
		u32::try_from(leaf_index).map_err(|_| out_of_range())?,
		Leaf::Hash(proof.leaf),
	);
	if !is_valid {
		return Err(Error::MerkleRootMismatch(proof.root))
	}
	Ok(())
}

/// Number of proof items for the leaf at given position.
fn proof_items_count(mut position: u64, mut width: u64) -> usize {
	let mut count = 0;
	while width > 1 {
		let is_promoted = position % 2 == 0 && position == width - 1;
		if !is_promoted {
			count += 1;
		}
		position /= 2;
		width = width.div_ceil(2);
	}
	count
}
