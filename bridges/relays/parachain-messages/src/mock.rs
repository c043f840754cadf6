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

//! In-memory relay chain, parachain and target chain.

use crate::{
	outbound_queue::PROVE_MESSAGE_METHOD, AuxiliaryDigestItem, ChannelId, DigestKind,
	OutboundQueueMessage, TargetClient,
};

use async_trait::async_trait;
use bp_merkle_proofs::{
	test_utils::{merkle_proof, merkle_root},
	MerkleProof,
};
use codec::{Compact, Encode};
use parking_lot::{Mutex, MutexGuard};
use relay_substrate_client::{
	storage_keys,
	test_client::{TestClient, TestClientData},
	BlockNumber, ParaHead, ParaId, PersistedValidationData,
};
use relay_utils::MaybeConnectionError;
use sp_core::H256;
use sp_runtime::DigestItem;
use std::{
	collections::{BTreeMap, HashMap},
	sync::Arc,
};

pub const PARA_ID: ParaId = ParaId(2000);
pub const CHANNEL_A: ChannelId = crate::PRIMARY_GOVERNANCE_CHANNEL;
pub const CHANNEL_B: ChannelId = crate::SECONDARY_GOVERNANCE_CHANNEL;

/// Relay chain blocks that are produced after the best parachain block.
const RELAY_CHAIN_EXTRA_BLOCKS: BlockNumber = 40;

pub fn test_message(channel_id: ChannelId, nonce: u64) -> OutboundQueueMessage {
	OutboundQueueMessage {
		channel_id,
		nonce,
		command: 0,
		params: nonce.encode(),
		max_dispatch_gas: 500_000,
		max_fee_per_gas: 1_000,
		reward: 1,
		id: H256::from_low_u64_be(nonce),
	}
}

/// Message as it is stored by the outbound queue pallet.
#[derive(Encode)]
struct CommittedMessage {
	channel_id: [u8; 32],
	nonce: Compact<u64>,
	command: u8,
	params: Vec<u8>,
	max_dispatch_gas: Compact<u64>,
	max_fee_per_gas: Compact<u128>,
	reward: Compact<u128>,
	id: [u8; 32],
}

impl From<&OutboundQueueMessage> for CommittedMessage {
	fn from(message: &OutboundQueueMessage) -> Self {
		let mut channel_id = [0u8; 32];
		channel_id.copy_from_slice(message.channel_id.as_bytes());
		CommittedMessage {
			channel_id,
			nonce: Compact(message.nonce),
			command: message.command,
			params: message.params.clone(),
			max_dispatch_gas: Compact(message.max_dispatch_gas),
			max_fee_per_gas: Compact(message.max_fee_per_gas),
			reward: Compact(message.reward),
			id: message.id.0,
		}
	}
}

#[derive(Debug, thiserror::Error)]
#[error("Target chain is unavailable")]
pub struct TestTargetError;

impl MaybeConnectionError for TestTargetError {
	fn is_connection_error(&self) -> bool {
		true
	}
}

#[derive(Debug, Default)]
pub struct TestTargetData {
	pub inbound_nonces: HashMap<ChannelId, u64>,
	pub is_connection_lost: bool,
}

#[derive(Clone, Debug, Default)]
pub struct TestTargetClient {
	data: Arc<Mutex<TestTargetData>>,
}

#[async_trait]
impl TargetClient for TestTargetClient {
	type Error = TestTargetError;

	async fn inbound_nonce(&self, channel: ChannelId) -> Result<u64, TestTargetError> {
		let data = self.data.lock();
		if data.is_connection_lost {
			return Err(TestTargetError)
		}
		Ok(data.inbound_nonces.get(&channel).copied().unwrap_or_default())
	}
}

pub struct TestChainsBuilder {
	best_para_block: BlockNumber,
	inclusion_delay: BlockNumber,
	digest_kind: DigestKind,
	messages: BTreeMap<BlockNumber, Vec<OutboundQueueMessage>>,
	delivered: HashMap<ChannelId, u64>,
}

impl TestChainsBuilder {
	/// Parachain of blocks `0..=best_para_block`. Parachain block `N` is built on top of relay
	/// chain block `N` and is included at relay chain block `N + 2`.
	pub fn new(best_para_block: BlockNumber) -> Self {
		TestChainsBuilder {
			best_para_block,
			inclusion_delay: 2,
			digest_kind: DigestKind::V1,
			messages: BTreeMap::new(),
			delivered: HashMap::new(),
		}
	}

	pub fn with_inclusion_delay(mut self, inclusion_delay: BlockNumber) -> Self {
		self.inclusion_delay = inclusion_delay;
		self
	}

	pub fn with_digest_kind(mut self, digest_kind: DigestKind) -> Self {
		self.digest_kind = digest_kind;
		self
	}

	/// Append messages with given nonces to the block commitment.
	pub fn with_messages(
		mut self,
		block: BlockNumber,
		channel: ChannelId,
		nonces: impl IntoIterator<Item = u64>,
	) -> Self {
		self.messages
			.entry(block)
			.or_default()
			.extend(nonces.into_iter().map(|nonce| test_message(channel, nonce)));
		self
	}

	pub fn with_delivered(mut self, channel: ChannelId, nonce: u64) -> Self {
		self.delivered.insert(channel, nonce);
		self
	}

	pub fn build(self) -> TestChains {
		let mut para = TestClientData::default();
		let mut generated = BTreeMap::<ChannelId, u64>::new();
		for number in 0..=self.best_para_block {
			let messages = self.messages.get(&number).cloned().unwrap_or_default();
			// tree leaves are hashes of ABI-encoded messages
			let leaves = messages.iter().map(|m| m.abi_encode()).collect::<Vec<_>>();
			let mut logs = vec![DigestItem::Other(b"unrelated".to_vec())];
			if !messages.is_empty() {
				let root = merkle_root(&leaves);
				logs.push(DigestItem::Other(match self.digest_kind {
					DigestKind::V1 => AuxiliaryDigestItem::Commitment(root).encode(),
					DigestKind::V2 => AuxiliaryDigestItem::CommitmentV2(root).encode(),
				}));
			}

			let parent_head =
				number.checked_sub(1).map(|p| ParaHead::from(&para.header(p))).unwrap_or_default();
			let hash = para.push_block(logs);
			para.set_storage(
				hash,
				storage_keys::validation_data_key(),
				PersistedValidationData {
					parent_head,
					relay_parent_number: number,
					relay_parent_storage_root: H256::repeat_byte(number as u8),
					max_pov_size: 5 * 1024 * 1024,
				},
			);

			for message in &messages {
				let nonce = generated.entry(message.channel_id).or_default();
				*nonce = (*nonce).max(message.nonce);
			}
			for (channel, nonce) in &generated {
				let key = storage_keys::outbound_queue_nonce_key(&channel.encode());
				para.set_storage(hash, key, *nonce);
			}

			if !messages.is_empty() {
				para.set_storage(
					hash,
					storage_keys::outbound_queue_messages_key(),
					messages.iter().map(CommittedMessage::from).collect::<Vec<_>>(),
				);
				for index in 0..leaves.len() as u64 {
					para.set_state_call(
						hash,
						PROVE_MESSAGE_METHOD,
						index,
						Some(merkle_proof(&leaves, index)),
					);
				}
			}
		}

		let mut relay = TestClientData::default();
		let other_paras = [ParaId(3000), ParaId(1000)];
		for number in 0..=self.best_para_block + RELAY_CHAIN_EXTRA_BLOCKS {
			let hash = relay.push_block(vec![]);
			let included = number.saturating_sub(self.inclusion_delay).min(self.best_para_block);
			relay.set_storage(
				hash,
				storage_keys::parachain_head_key(PARA_ID),
				ParaHead::from(&para.header(included)),
			);
			for para_id in other_paras {
				relay.set_storage(
					hash,
					storage_keys::parachain_head_key(para_id),
					ParaHead(vec![number as u8; 4]),
				);
			}
			relay.set_storage(
				hash,
				storage_keys::parachains_key(),
				vec![other_paras[0], PARA_ID, other_paras[1]],
			);
		}

		let target = TestTargetClient::default();
		target.data.lock().inbound_nonces = self.delivered;

		TestChains {
			relay: TestClient::from(relay),
			para: TestClient::from(para),
			target,
			messages: self.messages,
		}
	}
}

pub struct TestChains {
	relay: TestClient,
	para: TestClient,
	target: TestTargetClient,
	messages: BTreeMap<BlockNumber, Vec<OutboundQueueMessage>>,
}

impl TestChains {
	pub fn relay_client(&self) -> TestClient {
		self.relay.clone()
	}

	pub fn para_client(&self) -> TestClient {
		self.para.clone()
	}

	pub fn target_client(&self) -> TestTargetClient {
		self.target.clone()
	}

	pub fn relay_data(&self) -> MutexGuard<'_, TestClientData> {
		self.relay.data()
	}

	pub fn para_data(&self) -> MutexGuard<'_, TestClientData> {
		self.para.data()
	}

	pub fn target_data(&self) -> MutexGuard<'_, TestTargetData> {
		self.target.data.lock()
	}

	/// Replace proof of the message with given index at the parachain block.
	pub fn set_message_proof(&self, block: BlockNumber, index: u64, proof: Option<MerkleProof>) {
		let mut para = self.para_data();
		let hash = para.hash(block);
		para.set_state_call(hash, PROVE_MESSAGE_METHOD, index, proof);
	}

	/// Proof of the message with given index at the parachain block.
	pub fn message_proof(&self, block: BlockNumber, index: u64) -> MerkleProof {
		let leaves = self.messages[&block].iter().map(|m| m.abi_encode()).collect::<Vec<_>>();
		merkle_proof(&leaves, index)
	}
}
