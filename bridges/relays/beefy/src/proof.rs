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

//! Generation and verification of MMR leaf proofs.

use crate::{scanner::guarded, Error};

use bp_merkle_proofs::{convert_to_simplified_mmr_proof, BeefyMmrLeaf, SimplifiedMmrProof};
use codec::Decode;
use relay_substrate_client::{storage_keys, BlockNumber, Client, Error as ClientError, Hash, RawMmrProof};
use relay_utils::ExitSignal;

/// Convert MMR proof of the single leaf, returned by the node, into the simplified form.
pub(crate) fn convert_raw_proof(
	block: BlockNumber,
	raw_proof: &RawMmrProof,
) -> Result<SimplifiedMmrProof, Error> {
	let (leaves, proof) =
		raw_proof.decode().map_err(|e| Error::InvalidMmrProofEncoding(block, e))?;
	let (encoded_leaf, leaf_index) = match (&leaves[..], &proof.leaf_indices[..]) {
		([encoded_leaf], [leaf_index]) => (encoded_leaf, *leaf_index),
		_ => {
			return Err(Error::InvalidMmrProof(
				block,
				bp_merkle_proofs::Error::UnexpectedLeavesCount(
					leaves.len().max(proof.leaf_indices.len()),
				),
			))
		},
	};
	let leaf = BeefyMmrLeaf::decode(&mut &encoded_leaf.0[..])
		.map_err(|e| Error::InvalidMmrProofEncoding(block, e))?;

	convert_to_simplified_mmr_proof(
		raw_proof.block_hash,
		leaf_index,
		leaf,
		proof.leaf_count,
		&proof.items,
	)
	.map_err(|e| Error::InvalidMmrProof(block, e))
}

/// Generate proof of the MMR leaf, added at the commitment block, and verify it against the
/// MMR root stored at the same block.
pub(crate) async fn make_proof<C: Client>(
	client: &C,
	exit_signal: &ExitSignal,
	block: BlockNumber,
	block_hash: Hash,
) -> Result<SimplifiedMmrProof, Error> {
	let raw_proof = guarded(exit_signal, async {
		client
			.generate_mmr_proof(block, block_hash)
			.await
			.map_err(|e| ClientError::failed_to_generate_mmr_proof(block, block_hash, e))
	})
	.await?;
	let proof = convert_raw_proof(block, &raw_proof)?;

	let stored: Hash = guarded(
		exit_signal,
		client.required_storage_value(block_hash, storage_keys::mmr_root_hash_key(), "Mmr::RootHash"),
	)
	.await?;
	let computed = proof.root();
	if computed != stored {
		return Err(Error::MmrRootMismatch { block, computed, stored })
	}

	log::trace!(
		target: "bridge",
		"Verified MMR proof of block #{}: {} items, root {:?}",
		block,
		proof.merkle_proof_items.len(),
		computed,
	);

	Ok(proof)
}

#[cfg(test)]
mod tests {
	use super::*;
	use bp_merkle_proofs::{
		hash_leaf,
		test_utils::{test_leaf, TestMmr},
	};
	use codec::Encode;
	use sp_core::H256;
	use sp_mmr_primitives::{EncodableOpaqueLeaf, LeafProof};

	fn raw_proof(leaves: Vec<EncodableOpaqueLeaf>, proof: LeafProof<Hash>) -> RawMmrProof {
		RawMmrProof {
			block_hash: H256::repeat_byte(1),
			leaves: leaves.encode().into(),
			proof: proof.encode().into(),
		}
	}

	fn mmr(leaf_count: u32) -> TestMmr {
		let mut mmr = TestMmr::default();
		for number in 1..=leaf_count {
			mmr.push(hash_leaf(&test_leaf(number)));
		}
		mmr
	}

	#[test]
	fn raw_proof_is_converted_and_verified() {
		let mmr = mmr(7);
		let leaf = test_leaf(3);
		let simplified = convert_raw_proof(
			3,
			&raw_proof(
				vec![EncodableOpaqueLeaf(leaf.encode())],
				LeafProof { leaf_indices: vec![2], leaf_count: 7, items: mmr.gen_proof(2) },
			),
		)
		.unwrap();

		assert_eq!(simplified.leaf, leaf);
		assert_eq!(simplified.block_hash, H256::repeat_byte(1));
		assert_eq!(simplified.root(), mmr.root());
	}

	#[test]
	fn proof_of_multiple_leaves_is_rejected() {
		let mmr = mmr(7);
		let result = convert_raw_proof(
			3,
			&raw_proof(
				vec![EncodableOpaqueLeaf(test_leaf(3).encode()), EncodableOpaqueLeaf(test_leaf(4).encode())],
				LeafProof { leaf_indices: vec![2, 3], leaf_count: 7, items: mmr.gen_proof(2) },
			),
		);
		assert!(matches!(
			result,
			Err(Error::InvalidMmrProof(3, bp_merkle_proofs::Error::UnexpectedLeavesCount(2))),
		));
	}

	#[test]
	fn proof_with_wrong_items_count_is_rejected() {
		let mmr = mmr(7);
		let mut items = mmr.gen_proof(2);
		items.pop();
		let result = convert_raw_proof(
			3,
			&raw_proof(
				vec![EncodableOpaqueLeaf(test_leaf(3).encode())],
				LeafProof { leaf_indices: vec![2], leaf_count: 7, items },
			),
		);
		assert!(matches!(
			result,
			Err(Error::InvalidMmrProof(3, bp_merkle_proofs::Error::InvalidItemsCount { .. })),
		));
	}

	#[test]
	fn undecodable_leaf_is_rejected() {
		let mmr = mmr(7);
		let result = convert_raw_proof(
			3,
			&raw_proof(
				vec![EncodableOpaqueLeaf(vec![1, 2, 3])],
				LeafProof { leaf_indices: vec![2], leaf_count: 7, items: mmr.gen_proof(2) },
			),
		);
		assert!(matches!(result, Err(Error::InvalidMmrProofEncoding(3, _))));
	}
}
