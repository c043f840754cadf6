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

//! Scanner of parachain messages that are waiting to be relayed.
//!
//! The parachain outbound queue commits to the messages of every block with the Merkle root,
//! which is announced in the block digest. When the relay chain block is finalized by BEEFY,
//! the scanner compares nonces of every channel at both sides of the bridge. If the parachain
//! has generated more messages than the destination chain has received, it walks parachain
//! blocks backward, collecting verified proofs of all undelivered messages. Every parachain
//! block with collected proofs becomes a [`Task`], which also carries the relay chain block
//! where the parachain block has been included.

#![warn(missing_docs)]

use async_trait::async_trait;
use bp_merkle_proofs::{MerkleProof, SimplifiedMmrProof};
use codec::{Decode, Encode};
use hex_literal::hex;
use relay_substrate_client::{BlockNumber, Header, ParaHead, ParaId};
use relay_utils::MaybeConnectionError;
use serde::Deserialize;
use sp_core::H256;
use std::{collections::BTreeMap, fmt::Debug};

pub use error::Error;
pub use inclusion::find_inclusion_block;
pub use outbound_queue::{
	commitment_from_digest, AuxiliaryDigestItem, OutboundQueue, OutboundQueueMessage,
};
pub use scanner::ParachainScanner;

mod error;
mod inclusion;
mod outbound_queue;
mod scanner;

#[cfg(test)]
mod mock;

/// Identifier of the outbound queue channel.
#[derive(
	Clone, Copy, Debug, Decode, Default, Deserialize, Encode, Eq, Hash, Ord, PartialEq, PartialOrd,
)]
pub struct ChannelId(H256);

/// Channel of the governance messages that are processed first.
pub const PRIMARY_GOVERNANCE_CHANNEL: ChannelId =
	ChannelId::new(hex!("0000000000000000000000000000000000000000000000000000000000000001"));
/// Channel of the less important governance messages.
pub const SECONDARY_GOVERNANCE_CHANNEL: ChannelId =
	ChannelId::new(hex!("0000000000000000000000000000000000000000000000000000000000000002"));

impl ChannelId {
	/// Create channel id from raw bytes.
	pub const fn new(id: [u8; 32]) -> Self {
		ChannelId(H256(id))
	}

	/// Raw channel id.
	pub fn as_bytes(&self) -> &[u8] {
		self.0.as_bytes()
	}
}

impl From<ParaId> for ChannelId {
	/// Channel of the sibling parachain: `keccak256("para" ++ big_endian(para_id))`.
	fn from(para_id: ParaId) -> Self {
		let mut preimage = Vec::with_capacity(8);
		preimage.extend_from_slice(b"para");
		preimage.extend_from_slice(&para_id.0.to_be_bytes());
		ChannelId(bp_merkle_proofs::keccak(&preimage))
	}
}

impl From<H256> for ChannelId {
	fn from(id: H256) -> Self {
		ChannelId(id)
	}
}

/// Kind of the digest item, which carries the outbound queue commitment.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
pub enum DigestKind {
	/// `AuxiliaryDigestItem::Commitment`.
	#[default]
	V1,
	/// `AuxiliaryDigestItem::CommitmentV2`.
	V2,
}

/// Parameters of the parachain messages scanner.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct ParachainScanParams {
	/// Identifier of the parachain with the outbound queue.
	pub para_id: u32,
	/// Channels to scan.
	pub channels: Vec<ChannelId>,
	/// The parachain block must be included at the relay chain within this number of
	/// relay chain blocks after its relay parent.
	pub finalization_timeout: BlockNumber,
	/// Max number of parachain blocks, visited by the single backward walk.
	pub max_backward_blocks: BlockNumber,
	/// Digest item that carries the outbound queue commitment.
	pub digest_kind: DigestKind,
}

impl Default for ParachainScanParams {
	fn default() -> Self {
		ParachainScanParams {
			para_id: 1013,
			channels: vec![PRIMARY_GOVERNANCE_CHANNEL, SECONDARY_GOVERNANCE_CHANNEL],
			finalization_timeout: 4,
			max_backward_blocks: 4096,
			digest_kind: DigestKind::V1,
		}
	}
}

impl ParachainScanParams {
	/// Identifier of the parachain.
	pub fn para_id(&self) -> ParaId {
		ParaId(self.para_id)
	}
}

/// Client of the destination chain, where messages are delivered.
#[async_trait]
pub trait TargetClient: 'static + Send + Sync + Clone + Debug {
	/// Type of error these clients returns.
	type Error: 'static + std::error::Error + Send + Sync + MaybeConnectionError;

	/// Nonce of the latest message that has been delivered over given channel.
	async fn inbound_nonce(&self, channel: ChannelId) -> Result<u64, Self::Error>;
}

/// Message with the proof of its inclusion into the outbound queue commitment.
#[derive(Clone, Debug, Decode, Encode, Eq, PartialEq)]
pub struct MessageProof {
	/// The message.
	pub message: OutboundQueueMessage,
	/// Proof of the message leaf.
	pub proof: MerkleProof,
}

/// Inclusion context of the parachain header.
#[derive(Clone, Debug, Decode, Encode, Eq, PartialEq)]
pub struct ProofInput {
	/// Identifier of the parachain.
	pub para_id: ParaId,
	/// The first relay chain block, where the parachain head is the task header.
	pub relay_block_number: BlockNumber,
	/// Heads of all registered parachains at this relay chain block, ordered by parachain id.
	pub para_heads: Vec<(ParaId, ParaHead)>,
}

/// Proofs that anchor the parachain header to the BEEFY commitment. They're generated by
/// the submitter.
#[derive(Clone, Debug, Decode, Encode, Eq, PartialEq)]
pub struct ProofOutput {
	/// Proof of the MMR leaf, which is added at the inclusion block.
	pub mmr_proof: SimplifiedMmrProof,
	/// MMR root, as it is known to the destination chain.
	pub mmr_root_hash: H256,
	/// Proof of the parachain head inside the MMR leaf extra.
	pub para_head_proof: MerkleProof,
}

/// Unit of relay work: verified proofs of undelivered messages, committed by the single
/// parachain block.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Task {
	/// The parachain header with the commitment digest item.
	pub header: Header,
	/// Message proofs of every channel, ordered by nonce.
	pub message_proofs: BTreeMap<ChannelId, Vec<MessageProof>>,
	/// Inclusion context of the header. It is always set for tasks, returned by the scanner.
	pub proof_input: Option<ProofInput>,
	/// Filled by the submitter.
	pub proof_output: Option<ProofOutput>,
}

impl Task {
	/// Number of the parachain block.
	pub fn block_number(&self) -> BlockNumber {
		self.header.number
	}

	/// Nonces of collected messages of given channel.
	pub fn nonces(&self, channel: &ChannelId) -> Vec<u64> {
		self.message_proofs
			.get(channel)
			.map(|proofs| proofs.iter().map(|proof| proof.message.nonce).collect())
			.unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sibling_channel_id_is_derived_from_para_id() {
		// keccak256("para" ++ 1000u32.to_be_bytes())
		assert_eq!(
			ChannelId::from(ParaId(1000)),
			ChannelId::new(bp_merkle_proofs::keccak(&hex!("70617261000003e8")).0),
		);
		assert_ne!(ChannelId::from(ParaId(1000)), ChannelId::from(ParaId(1001)));
	}

	#[test]
	fn governance_channels_are_well_known() {
		assert_eq!(
			PRIMARY_GOVERNANCE_CHANNEL.as_bytes(),
			&hex!("0000000000000000000000000000000000000000000000000000000000000001")[..],
		);
		assert_eq!(
			SECONDARY_GOVERNANCE_CHANNEL.as_bytes(),
			&hex!("0000000000000000000000000000000000000000000000000000000000000002")[..],
		);
	}

	#[test]
	fn params_are_read_from_json() {
		let params: ParachainScanParams = relay_utils::config::parse_json(
			r#"{
				"para-id": 1000,
				"channels": ["0x0000000000000000000000000000000000000000000000000000000000000001"],
				"finalization-timeout": 32,
				"digest-kind": "V2"
			}"#,
		)
		.unwrap();
		assert_eq!(
			params,
			ParachainScanParams {
				para_id: 1000,
				channels: vec![PRIMARY_GOVERNANCE_CHANNEL],
				finalization_timeout: 32,
				digest_kind: DigestKind::V2,
				..Default::default()
			},
		);
	}
}
