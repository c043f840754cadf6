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

//! In-memory relay chain with BEEFY commitments at session boundaries.

use bp_merkle_proofs::{
	hash_leaf,
	test_utils::{test_leaf_with_next_set, TestMmr},
};
use codec::Encode;
use futures::{channel::oneshot, FutureExt};
use parking_lot::MutexGuard;
use relay_substrate_client::{
	storage_keys,
	test_client::{TestClient, TestClientData},
	BlockNumber, Hash, RawMmrProof,
};
use relay_utils::ExitSignal;
use sp_consensus_beefy::{
	ecdsa_crypto::{AuthorityId, Signature},
	known_payloads::MMR_ROOT_ID,
	mmr::BeefyAuthoritySet,
	Commitment, Payload, SignedCommitment, ValidatorSetId, VersionedFinalityProof,
	BEEFY_ENGINE_ID,
};
use sp_core::{ecdsa, H256};
use sp_mmr_primitives::{EncodableOpaqueLeaf, LeafProof};
use std::{collections::HashMap, time::Duration};

pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Authorities of given validator set.
pub fn authorities(set_id: ValidatorSetId) -> Vec<AuthorityId> {
	(0..3u8)
		.map(|index| AuthorityId::from(ecdsa::Public::from_raw([set_id as u8 * 3 + index; 33])))
		.collect()
}

/// Merkle root of given validator set.
pub fn authority_set_root(set_id: ValidatorSetId) -> H256 {
	H256::repeat_byte(0x10 + set_id as u8)
}

pub struct TestChainBuilder {
	best_block: BlockNumber,
	boundaries: Vec<(BlockNumber, ValidatorSetId)>,
	justifications: Vec<(BlockNumber, ValidatorSetId)>,
	best_beefy_blocks: Option<Vec<BlockNumber>>,
}

impl TestChainBuilder {
	/// Chain of blocks `0..=best_block`, all finalized by BEEFY.
	pub fn new(best_block: BlockNumber) -> Self {
		TestChainBuilder {
			best_block,
			boundaries: Vec::new(),
			justifications: Vec::new(),
			best_beefy_blocks: None,
		}
	}

	/// Start new session at given block. The session is handled by given validator set.
	pub fn with_boundary(mut self, block: BlockNumber, set_id: ValidatorSetId) -> Self {
		self.boundaries.push((block, set_id));
		self.justifications.push((block, set_id));
		self
	}

	/// Add BEEFY justification to the block that is not a session boundary.
	pub fn with_justification(mut self, block: BlockNumber, set_id: ValidatorSetId) -> Self {
		self.justifications.push((block, set_id));
		self
	}

	/// Best BEEFY-finalized blocks, returned by consecutive requests.
	pub fn with_best_beefy_blocks(mut self, blocks: &[BlockNumber]) -> Self {
		self.best_beefy_blocks = Some(blocks.to_vec());
		self
	}

	pub fn build(self) -> TestChain {
		let mut data = TestClientData::default();
		let mut mmr = TestMmr::default();
		let mut mmr_roots = HashMap::new();
		let (exit_signal_sender, exit_signal) = test_exit_signal();

		for number in 0..=self.best_block {
			let hash = data.push_block(vec![]);
			let session_index =
				self.boundaries.iter().filter(|(block, _)| *block <= number).count() as u32;
			let set_id = self
				.boundaries
				.iter()
				.filter(|(block, _)| *block <= number)
				.last()
				.map(|(_, set_id)| *set_id)
				.unwrap_or_default();

			data.set_storage(hash, storage_keys::current_session_index_key(), session_index);
			data.set_storage(hash, storage_keys::beefy_authorities_key(), authorities(set_id));
			data.set_storage(
				hash,
				storage_keys::beefy_mmr_authorities_key(),
				BeefyAuthoritySet { id: set_id, len: 3, keyset_commitment: authority_set_root(set_id) },
			);

			if number == 0 {
				continue
			}

			let leaf =
				test_leaf_with_next_set(number - 1, set_id + 1, authority_set_root(set_id + 1));
			let leaf_index = u64::from(number - 1);
			mmr.push(hash_leaf(&leaf));
			let root = mmr.root();
			mmr_roots.insert(hash, root);
			data.set_storage(hash, storage_keys::mmr_root_hash_key(), root);
			data.mmr_proofs.insert(
				(number, hash),
				RawMmrProof {
					block_hash: hash,
					leaves: vec![EncodableOpaqueLeaf(leaf.encode())].encode().into(),
					proof: LeafProof {
						leaf_indices: vec![leaf_index],
						leaf_count: mmr.leaf_count(),
						items: mmr.gen_proof(leaf_index),
					}
					.encode()
					.into(),
				},
			);
		}

		for (block, set_id) in &self.justifications {
			let hash = data.hash(*block);
			let signed_commitment = SignedCommitment {
				commitment: Commitment {
					payload: Payload::from_single_entry(MMR_ROOT_ID, mmr_roots[&hash].encode()),
					block_number: *block,
					validator_set_id: *set_id,
				},
				signatures: vec![Some(signature(*block)), None, Some(signature(*block + 1))],
			};
			data.justifications.insert(
				hash,
				vec![(
					BEEFY_ENGINE_ID,
					VersionedFinalityProof::<BlockNumber, Signature>::V1(signed_commitment).encode(),
				)],
			);
		}

		data.best_finalized_beefy_header_updates =
			self.best_beefy_blocks.unwrap_or_else(|| vec![self.best_block]).into();
		data.exit_signal_sender = Some(exit_signal_sender);

		TestChain { client: TestClient::from(data), mmr_roots, exit_signal }
	}
}

pub struct TestChain {
	client: TestClient,
	mmr_roots: HashMap<Hash, H256>,
	exit_signal: ExitSignal,
}

impl TestChain {
	pub fn client(&self) -> TestClient {
		self.client.clone()
	}

	pub fn data(&self) -> MutexGuard<'_, TestClientData> {
		self.client.data()
	}

	/// Exit signal that is fired when the client is asked for the best BEEFY-finalized block
	/// after all updates have been consumed.
	pub fn exit_signal(&self) -> ExitSignal {
		self.exit_signal.clone()
	}

	pub fn mmr_root(&self, at: Hash) -> H256 {
		self.mmr_roots[&at]
	}
}

pub fn test_exit_signal() -> (oneshot::Sender<()>, ExitSignal) {
	let (sender, receiver) = oneshot::channel();
	(sender, ExitSignal::new(receiver.map(|_| ())))
}

fn signature(seed: BlockNumber) -> Signature {
	Signature::from(ecdsa::Signature::from_raw([seed as u8; 65]))
}
