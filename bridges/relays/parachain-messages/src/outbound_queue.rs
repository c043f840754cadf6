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

//! Reading the parachain outbound queue.

use crate::{scanner::guarded, ChannelId, DigestKind, Error};

use bp_merkle_proofs::MerkleProof;
use codec::{Decode, DecodeAll, Encode};
use ethabi::Token;
use relay_substrate_client::{storage_keys, Client, Hash, Header};
use relay_utils::ExitSignal;
use sp_core::H256;
use sp_runtime::DigestItem;

/// Runtime API method, which generates proof of the committed message.
pub const PROVE_MESSAGE_METHOD: &str = "OutboundQueueApi_prove_message";

/// Message, committed by the outbound queue.
#[derive(Clone, Debug, Decode, Encode, Eq, PartialEq)]
pub struct OutboundQueueMessage {
	/// The channel.
	pub channel_id: ChannelId,
	/// Nonce of the message within its channel.
	#[codec(compact)]
	pub nonce: u64,
	/// Command to execute at the destination chain.
	pub command: u8,
	/// Command parameters.
	pub params: Vec<u8>,
	/// Max gas that the command may use.
	#[codec(compact)]
	pub max_dispatch_gas: u64,
	/// Max fee per gas.
	#[codec(compact)]
	pub max_fee_per_gas: u128,
	/// Reward of the relayer.
	#[codec(compact)]
	pub reward: u128,
	/// Message id.
	pub id: H256,
}

impl From<OutboundQueueMessage> for Token {
	fn from(x: OutboundQueueMessage) -> Token {
		Token::Tuple(vec![
			Token::FixedBytes(x.channel_id.as_bytes().to_vec()),
			Token::Uint(x.nonce.into()),
			Token::Uint(x.command.into()),
			Token::Bytes(x.params),
			Token::Uint(x.max_dispatch_gas.into()),
			Token::Uint(x.max_fee_per_gas.into()),
			Token::Uint(x.reward.into()),
			Token::FixedBytes(x.id.as_bytes().to_vec()),
		])
	}
}

impl OutboundQueueMessage {
	/// ABI encoding of the message, which is hashed into the commitment tree leaf.
	pub fn abi_encode(&self) -> Vec<u8> {
		ethabi::encode(&[self.clone().into()])
	}

	/// Hash of the commitment tree leaf.
	pub fn leaf_hash(&self) -> H256 {
		bp_merkle_proofs::keccak(&self.abi_encode())
	}
}

/// Digest item, deposited by the outbound queue.
#[derive(Clone, Copy, Debug, Decode, Encode, Eq, PartialEq)]
pub enum AuxiliaryDigestItem {
	/// Commitment of the outbound queue.
	#[codec(index = 0)]
	Commitment(H256),
	/// Commitment of the second version of the outbound queue.
	#[codec(index = 1)]
	CommitmentV2(H256),
}

/// Find the outbound queue commitment of given kind in the header digest.
///
/// `DigestItem::Other` items that are not decodable are ignored. They're deposited by other
/// pallets.
pub fn commitment_from_digest(header: &Header, kind: DigestKind) -> Option<H256> {
	header.digest.logs.iter().find_map(|item| {
		let DigestItem::Other(ref data) = *item else { return None };
		match (AuxiliaryDigestItem::decode_all(&mut &data[..]).ok()?, kind) {
			(AuxiliaryDigestItem::Commitment(root), DigestKind::V1) => Some(root),
			(AuxiliaryDigestItem::CommitmentV2(root), DigestKind::V2) => Some(root),
			_ => None,
		}
	})
}

/// Outbound queue reads at the parachain.
pub struct OutboundQueue<'a, C> {
	client: &'a C,
	exit_signal: &'a ExitSignal,
}

impl<'a, C: Client> OutboundQueue<'a, C> {
	/// Create outbound queue reader.
	pub fn new(client: &'a C, exit_signal: &'a ExitSignal) -> Self {
		OutboundQueue { client, exit_signal }
	}

	/// Nonce of the latest message, generated by the channel. Zero if nothing has been sent.
	pub async fn nonce(&self, at: Hash, channel: ChannelId) -> Result<u64, Error> {
		let key = storage_keys::outbound_queue_nonce_key(&channel.encode());
		let nonce = guarded(self.exit_signal, self.client.storage_value(at, key)).await?;
		Ok(nonce.unwrap_or_default())
	}

	/// Messages, committed in the block, in commitment order.
	///
	/// Must only be called for blocks with the commitment digest item, where the storage
	/// value is always present.
	pub async fn messages(&self, at: Hash) -> Result<Vec<OutboundQueueMessage>, Error> {
		let key = storage_keys::outbound_queue_messages_key();
		guarded(
			self.exit_signal,
			self.client.required_storage_value(at, key, "EthereumOutboundQueue::Messages"),
		)
		.await
	}

	/// Proof of the message with given index in the block commitment.
	pub async fn prove_message(
		&self,
		at: Hash,
		leaf_index: u64,
	) -> Result<Option<MerkleProof>, Error> {
		guarded(
			self.exit_signal,
			self.client.state_call(at, PROVE_MESSAGE_METHOD.into(), leaf_index),
		)
		.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use hex_literal::hex;
	use sp_runtime::traits::Header as _;

	fn message() -> OutboundQueueMessage {
		OutboundQueueMessage {
			channel_id: crate::PRIMARY_GOVERNANCE_CHANNEL,
			nonce: 7,
			command: 2,
			params: hex!("deadbeef").to_vec(),
			max_dispatch_gas: 500_000,
			max_fee_per_gas: 1_000,
			reward: 1,
			id: H256::repeat_byte(0x11),
		}
	}

	#[test]
	fn message_is_decoded_from_compact_storage_layout() {
		let encoded = [
			&hex!("0000000000000000000000000000000000000000000000000000000000000001")[..],
			// compact nonce
			&hex!("1c"),
			// command
			&hex!("02"),
			// params
			&hex!("10deadbeef"),
			// compact max_dispatch_gas, max_fee_per_gas and reward
			&hex!("82841e00"),
			&hex!("a10f"),
			&hex!("04"),
			// id
			&hex!("1111111111111111111111111111111111111111111111111111111111111111"),
		]
		.concat();

		// the storage value is the vector of messages
		let stored = [&hex!("04")[..], &encoded].concat();
		assert_eq!(Vec::<OutboundQueueMessage>::decode(&mut &stored[..]).unwrap(), vec![message()]);
		assert_eq!(message().encode(), encoded);
	}

	#[test]
	fn leaf_is_hash_of_abi_encoded_message() {
		let abi_encoded = [
			// offset of the tuple
			hex!("0000000000000000000000000000000000000000000000000000000000000020"),
			// channel_id
			hex!("0000000000000000000000000000000000000000000000000000000000000001"),
			// nonce
			hex!("0000000000000000000000000000000000000000000000000000000000000007"),
			// command
			hex!("0000000000000000000000000000000000000000000000000000000000000002"),
			// offset of params within the tuple
			hex!("0000000000000000000000000000000000000000000000000000000000000100"),
			// max_dispatch_gas
			hex!("000000000000000000000000000000000000000000000000000000000007a120"),
			// max_fee_per_gas
			hex!("00000000000000000000000000000000000000000000000000000000000003e8"),
			// reward
			hex!("0000000000000000000000000000000000000000000000000000000000000001"),
			// id
			hex!("1111111111111111111111111111111111111111111111111111111111111111"),
			// params length and padded params
			hex!("0000000000000000000000000000000000000000000000000000000000000004"),
			hex!("deadbeef00000000000000000000000000000000000000000000000000000000"),
		]
		.concat();

		assert_eq!(message().abi_encode(), abi_encoded);
		assert_eq!(message().leaf_hash(), bp_merkle_proofs::keccak(&abi_encoded));
		assert_ne!(message().leaf_hash(), bp_merkle_proofs::keccak(&message().encode()));
	}

	fn header(logs: Vec<DigestItem>) -> Header {
		let mut header = Header::new(
			1,
			Default::default(),
			Default::default(),
			Default::default(),
			Default::default(),
		);
		header.digest.logs = logs;
		header
	}

	#[test]
	fn commitment_of_configured_kind_is_found() {
		let v1 = H256::repeat_byte(1);
		let v2 = H256::repeat_byte(2);
		let header = header(vec![
			DigestItem::Other(vec![42]),
			DigestItem::Other(AuxiliaryDigestItem::CommitmentV2(v2).encode()),
			DigestItem::Other(AuxiliaryDigestItem::Commitment(v1).encode()),
		]);

		assert_eq!(commitment_from_digest(&header, DigestKind::V1), Some(v1));
		assert_eq!(commitment_from_digest(&header, DigestKind::V2), Some(v2));
	}

	#[test]
	fn unrelated_digest_items_are_ignored() {
		let mut longer = AuxiliaryDigestItem::Commitment(H256::repeat_byte(1)).encode();
		longer.push(0);
		let header = header(vec![
			DigestItem::Other(longer),
			DigestItem::Other(vec![2, 1, 2, 3]),
			DigestItem::PreRuntime(*b"aura", AuxiliaryDigestItem::Commitment(H256::zero()).encode()),
		]);

		assert_eq!(commitment_from_digest(&header, DigestKind::V1), None);
		assert_eq!(commitment_from_digest(&header, DigestKind::V2), None);
	}
}
