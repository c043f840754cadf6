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

//! Backward walk over parachain blocks, collecting proofs of undelivered messages.

use crate::{
	commitment_from_digest,
	inclusion::{find_inclusion_block, read_block_hash, read_para_header, read_para_heads},
	ChannelId, Error, MessageProof, OutboundQueue, OutboundQueueMessage, ParachainScanParams,
	ProofInput, Task, TargetClient,
};

use bp_merkle_proofs::{verify_merkle_proof, MerkleProof};
use relay_substrate_client::{BlockNumber, Client, Error as ClientError, Hash, Header};
use relay_utils::{ExitSignal, MaybeConnectionError};
use sp_core::H256;
use std::{collections::BTreeMap, future::Future, ops::RangeInclusive};

/// Run client call unless exit signal is fired.
pub(crate) async fn guarded<T>(
	exit_signal: &ExitSignal,
	call: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, Error> {
	exit_signal.guard(call).await?.map_err(Into::into)
}

/// Scanner of undelivered parachain messages.
///
/// Every scan is independent of others. The scanner holds no state between scans.
#[derive(Debug)]
pub struct ParachainScanner<RC, PC, TC> {
	relay_client: RC,
	para_client: PC,
	target_client: TC,
	params: ParachainScanParams,
	exit_signal: ExitSignal,
}

impl<RC: Client, PC: Client, TC: TargetClient> ParachainScanner<RC, PC, TC> {
	/// Create new scanner.
	pub fn new(
		relay_client: RC,
		para_client: PC,
		target_client: TC,
		params: ParachainScanParams,
		exit_signal: ExitSignal,
	) -> Self {
		ParachainScanner { relay_client, para_client, target_client, params, exit_signal }
	}

	/// Find all undelivered messages that may be proved using the MMR root at given relay
	/// chain block.
	///
	/// Returned tasks are ordered by parachain block number. Empty result means that all
	/// messages are already delivered.
	pub async fn scan(&self, beefy_block: BlockNumber) -> Result<Vec<Task>, Error> {
		// the last parachain block, which is finalized before the BEEFY block
		let relay_block = beefy_block.saturating_sub(1);
		let relay_hash = read_block_hash(&self.relay_client, &self.exit_signal, relay_block).await?;
		let para_block = read_para_header(
			&self.relay_client,
			&self.exit_signal,
			self.params.para_id(),
			relay_block,
			relay_hash,
		)
		.await?
		.number;
		let para_hash = read_block_hash(&self.para_client, &self.exit_signal, para_block).await?;

		let undelivered = self.undelivered_nonces(para_hash).await?;
		if undelivered.is_empty() {
			log::debug!(
				target: "bridge",
				"All messages of parachain block #{} are delivered",
				para_block,
			);
			return Ok(Vec::new())
		}

		log::info!(
			target: "bridge",
			"Nonces are mismatched at parachain block #{}. Scanning for undelivered messages of {} channels",
			para_block,
			undelivered.len(),
		);

		let first_undelivered =
			undelivered.iter().map(|(channel, nonces)| (*channel, *nonces.start())).collect();
		let mut tasks = self.find_tasks(para_block, first_undelivered).await?;
		ensure_contiguous_nonces(&tasks, &undelivered)?;
		for task in &mut tasks {
			task.proof_input = Some(self.proof_input(task.block_number()).await?);
		}
		Ok(tasks)
	}

	/// Nonces of undelivered messages of every channel that has them.
	async fn undelivered_nonces(
		&self,
		para_hash: Hash,
	) -> Result<BTreeMap<ChannelId, RangeInclusive<u64>>, Error> {
		let queue = OutboundQueue::new(&self.para_client, &self.exit_signal);
		let mut undelivered = BTreeMap::new();
		for channel in &self.params.channels {
			let channel = *channel;
			let delivered = self
				.exit_signal
				.guard(self.target_client.inbound_nonce(channel))
				.await?
				.map_err(|e| Error::FailedToReadInboundNonce {
					channel,
					is_connection_error: e.is_connection_error(),
					error: Box::new(e),
				})?;
			let generated = queue.nonce(para_hash, channel).await?;

			log::info!(
				target: "bridge",
				"Channel {:?}: delivered nonce {}, generated nonce {}",
				channel,
				delivered,
				generated,
			);

			if generated > delivered {
				undelivered.insert(channel, delivered + 1..=generated);
			}
		}
		Ok(undelivered)
	}

	/// Walk parachain blocks backward until the first undelivered message of every channel
	/// is found.
	async fn find_tasks(
		&self,
		from_block: BlockNumber,
		mut pending: BTreeMap<ChannelId, u64>,
	) -> Result<Vec<Task>, Error> {
		let queue = OutboundQueue::new(&self.para_client, &self.exit_signal);
		let mut tasks = Vec::new();
		let mut block = from_block;
		let mut visited_blocks = 0;
		while let Some((channel, nonce)) = pending.first_key_value().map(|(c, n)| (*c, *n)) {
			if block == 0 {
				return Err(Error::NonceNotFoundAtGenesis { channel, nonce, from_block })
			}
			if visited_blocks == self.params.max_backward_blocks {
				return Err(Error::BackwardWalkLimitExceeded {
					channel,
					nonce,
					from_block,
					limit: self.params.max_backward_blocks,
				})
			}
			visited_blocks += 1;

			let hash = read_block_hash(&self.para_client, &self.exit_signal, block).await?;
			let header = self.read_header(hash).await?;
			log::trace!(target: "bridge", "Checking parachain block #{}", block);

			if let Some(commitment) = commitment_from_digest(&header, self.params.digest_kind) {
				let messages = queue.messages(hash).await?;
				let mut message_proofs = BTreeMap::new();
				for (channel, nonce) in pending.clone() {
					let (proofs, is_done) = self
						.scan_block_messages(&queue, hash, commitment, channel, nonce, &messages)
						.await?;
					if !proofs.is_empty() {
						message_proofs.insert(channel, proofs);
					}
					if is_done {
						log::debug!(
							target: "bridge",
							"Finished scan of channel {:?} at parachain block #{}",
							channel,
							block,
						);
						pending.remove(&channel);
					}
				}

				if !message_proofs.is_empty() {
					tasks.push(Task {
						header,
						message_proofs,
						proof_input: None,
						proof_output: None,
					});
				}
			}

			block -= 1;
		}

		tasks.reverse();
		Ok(tasks)
	}

	/// Collect proofs of undelivered messages of the channel, committed in the block.
	///
	/// Messages are visited in descending nonce order, so the channel is done when the
	/// first undelivered message is found or when the already delivered message is seen.
	async fn scan_block_messages(
		&self,
		queue: &OutboundQueue<'_, PC>,
		block_hash: Hash,
		commitment: H256,
		channel: ChannelId,
		first_undelivered: u64,
		messages: &[OutboundQueueMessage],
	) -> Result<(Vec<MessageProof>, bool), Error> {
		let mut proofs = Vec::new();
		let mut is_done = false;
		for (index, message) in messages.iter().enumerate().rev() {
			if message.channel_id != channel {
				continue
			}
			if message.nonce < first_undelivered {
				is_done = true;
				break
			}

			let proof = queue.prove_message(block_hash, index as u64).await?.ok_or_else(|| {
				Error::InvalidMessageProof {
					block_hash,
					nonce: message.nonce,
					reason: "runtime has not generated the proof".into(),
				}
			})?;
			verify_message_proof(block_hash, commitment, index as u64, message, &proof)?;
			proofs.push(MessageProof { message: message.clone(), proof });

			if message.nonce == first_undelivered {
				is_done = true;
				break
			}
		}

		proofs.reverse();
		Ok((proofs, is_done))
	}

	async fn read_header(&self, hash: Hash) -> Result<Header, Error> {
		guarded(&self.exit_signal, async {
			self.para_client
				.header_by_hash(hash)
				.await
				.map_err(|e| ClientError::failed_to_read_header_by_hash(hash, e))
		})
		.await
	}

	async fn proof_input(&self, para_block: BlockNumber) -> Result<ProofInput, Error> {
		let para_id = self.params.para_id();
		let relay_block_number = find_inclusion_block(
			&self.relay_client,
			&self.para_client,
			&self.exit_signal,
			para_id,
			para_block,
			self.params.finalization_timeout,
		)
		.await?;
		let relay_hash =
			read_block_hash(&self.relay_client, &self.exit_signal, relay_block_number).await?;
		let para_heads = read_para_heads(&self.relay_client, &self.exit_signal, relay_hash).await?;

		log::debug!(
			target: "bridge",
			"Parachain block #{} is included at relay chain block #{}",
			para_block,
			relay_block_number,
		);

		Ok(ProofInput { para_id, relay_block_number, para_heads })
	}
}

/// Check that tasks carry every undelivered message of every channel exactly once.
fn ensure_contiguous_nonces(
	tasks: &[Task],
	undelivered: &BTreeMap<ChannelId, RangeInclusive<u64>>,
) -> Result<(), Error> {
	for (channel, nonces) in undelivered {
		let mut found = tasks.iter().flat_map(|task| task.nonces(channel));
		for expected_nonce in nonces.clone() {
			match found.next() {
				Some(found_nonce) if found_nonce == expected_nonce => (),
				found_nonce => {
					let channel = *channel;
					return Err(Error::MessageNonceGap { channel, expected_nonce, found_nonce })
				},
			}
		}
		if let Some(found_nonce) = found.next() {
			return Err(Error::MessageNonceGap {
				channel: *channel,
				expected_nonce: nonces.end().saturating_add(1),
				found_nonce: Some(found_nonce),
			})
		}
	}
	Ok(())
}

/// Check that the proof is generated for the message and matches the digest commitment.
fn verify_message_proof(
	block_hash: Hash,
	commitment: H256,
	index: u64,
	message: &OutboundQueueMessage,
	proof: &MerkleProof,
) -> Result<(), Error> {
	if proof.root != commitment {
		return Err(Error::CommitmentRootMismatch {
			block_hash,
			digest_root: commitment,
			proof_root: proof.root,
		})
	}

	let invalid = |reason: String| Error::InvalidMessageProof {
		block_hash,
		nonce: message.nonce,
		reason,
	};
	if proof.leaf_index != index || proof.leaf != message.leaf_hash() {
		return Err(invalid(format!("proof of leaf {} is not a proof of the message", proof.leaf_index)))
	}
	verify_merkle_proof(proof).map_err(|e| invalid(e.to_string()))
}
