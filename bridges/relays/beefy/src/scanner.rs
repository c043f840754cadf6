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

//! Walking relay chain session boundaries and reading BEEFY commitments from there.

use crate::{proof::make_proof, BeefySignedCommitment, Error};

use bp_merkle_proofs::SimplifiedMmrProof;
use codec::Decode;
use relay_substrate_client::{
	storage_keys, BlockNumber, Client, Error as ClientError, Hash, HeaderId,
};
use relay_utils::ExitSignal;
use sp_consensus_beefy::{
	ecdsa_crypto::{AuthorityId, Signature},
	mmr::BeefyAuthoritySet,
	VersionedFinalityProof, BEEFY_ENGINE_ID,
};
use std::{future::Future, time::Duration};

/// Session index type of the relay chain.
pub type SessionIndex = u32;

/// Run client call unless exit signal is fired.
pub(crate) async fn guarded<T>(
	exit_signal: &ExitSignal,
	call: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, Error> {
	exit_signal.guard(call).await?.map_err(Into::into)
}

/// Read id of the best BEEFY-finalized relay chain block.
pub(crate) async fn read_best_beefy_block<C: Client>(
	client: &C,
	exit_signal: &ExitSignal,
) -> Result<HeaderId, Error> {
	let hash = guarded(exit_signal, async {
		client
			.best_finalized_beefy_header_hash()
			.await
			.map_err(ClientError::failed_to_read_best_finalized_beefy_header_hash)
	})
	.await?;
	let header = guarded(exit_signal, async {
		client
			.header_by_hash(hash)
			.await
			.map_err(|e| ClientError::failed_to_read_header_by_hash(hash, e))
	})
	.await?;
	Ok(relay_utils::HeaderId(header.number, hash))
}

/// Read hash of the canonical relay chain block.
pub(crate) async fn read_block_hash<C: Client>(
	client: &C,
	exit_signal: &ExitSignal,
	number: BlockNumber,
) -> Result<Hash, Error> {
	guarded(exit_signal, async {
		client
			.block_hash_by_number(number)
			.await
			.map_err(|e| ClientError::failed_to_read_block_hash(number, e))
	})
	.await
}

/// Read and decode BEEFY justification of given block.
pub(crate) async fn read_signed_commitment<C: Client>(
	client: &C,
	exit_signal: &ExitSignal,
	block: HeaderId,
) -> Result<BeefySignedCommitment, Error> {
	let justifications = guarded(exit_signal, async {
		client
			.justifications(block.hash())
			.await
			.map_err(|e| ClientError::failed_to_read_justifications(block.hash(), e))
	})
	.await?;

	let encoded_justification = justifications
		.into_iter()
		.find(|(engine_id, _)| *engine_id == BEEFY_ENGINE_ID)
		.map(|(_, encoded_justification)| encoded_justification)
		.ok_or(Error::MissingJustification(block.number(), block.hash()))?;
	decode_signed_commitment(block.number(), &encoded_justification)
}

/// Decode signed commitment from the encoded BEEFY justification.
pub(crate) fn decode_signed_commitment(
	block: BlockNumber,
	encoded_justification: &[u8],
) -> Result<BeefySignedCommitment, Error> {
	let finality_proof =
		VersionedFinalityProof::<BlockNumber, Signature>::decode(&mut &encoded_justification[..])
			.map_err(|e| Error::InvalidJustification(block, e))?;
	match finality_proof {
		VersionedFinalityProof::V1(signed_commitment) => Ok(signed_commitment),
	}
}

/// Read BEEFY authorities and the current authority set details at given block.
pub(crate) async fn read_authorities<C: Client>(
	client: &C,
	exit_signal: &ExitSignal,
	at: Hash,
) -> Result<(Vec<AuthorityId>, BeefyAuthoritySet<Hash>), Error> {
	let authorities = guarded(
		exit_signal,
		client.required_storage_value(
			at,
			storage_keys::beefy_authorities_key(),
			"Beefy::Authorities",
		),
	)
	.await?;
	let authority_set = guarded(
		exit_signal,
		client.required_storage_value(
			at,
			storage_keys::beefy_mmr_authorities_key(),
			"MmrLeaf::BeefyAuthorities",
		),
	)
	.await?;
	Ok((authorities, authority_set))
}

/// BEEFY commitment, found at the session boundary.
#[derive(Clone, Debug)]
pub(crate) struct ScannedCommitment {
	/// The commitment.
	pub signed_commitment: BeefySignedCommitment,
	/// Verified proof of the MMR leaf of the commitment block.
	pub proof: SimplifiedMmrProof,
	/// Hash of the commitment block.
	pub block_hash: Hash,
	/// Distance from the best BEEFY-finalized block.
	pub depth: BlockNumber,
}

/// Scanner of relay chain session boundaries.
///
/// The scanner never stops by itself. It only returns an error, including
/// [`Error::Cancelled`] when the exit signal is fired.
pub(crate) struct CommitmentScanner<C> {
	client: C,
	exit_signal: ExitSignal,
	finality_poll_interval: Duration,
	/// The next block to look at.
	cursor: BlockNumber,
	/// Session index at the block before the cursor.
	session_index: SessionIndex,
	/// Best known BEEFY-finalized block.
	best_beefy_block: BlockNumber,
}

impl<C: Client> CommitmentScanner<C> {
	/// Start scanning at given block.
	pub async fn new(
		client: C,
		exit_signal: ExitSignal,
		finality_poll_interval: Duration,
		start_block: BlockNumber,
	) -> Result<Self, Error> {
		let parent = start_block.saturating_sub(1);
		let parent_hash = read_block_hash(&client, &exit_signal, parent).await?;
		let session_index =
			read_session_index(&client, &exit_signal, parent_hash).await?.unwrap_or_default();
		let best_beefy_block = read_best_beefy_block(&client, &exit_signal).await?.number();

		log::debug!(
			target: "bridge",
			"Starting BEEFY commitments scan at block #{}. Session: {}, best BEEFY block: #{}",
			start_block,
			session_index,
			best_beefy_block,
		);

		Ok(CommitmentScanner {
			client,
			exit_signal,
			finality_poll_interval,
			cursor: start_block,
			session_index,
			best_beefy_block,
		})
	}

	/// Find the next session boundary and read verified commitment from there.
	pub async fn next_commitment(&mut self) -> Result<ScannedCommitment, Error> {
		let boundary = self.next_session_boundary().await?;
		let signed_commitment =
			read_signed_commitment(&self.client, &self.exit_signal, boundary).await?;

		let commitment_block = signed_commitment.commitment.block_number;
		let block_hash = if commitment_block == boundary.number() {
			boundary.hash()
		} else {
			read_block_hash(&self.client, &self.exit_signal, commitment_block).await?
		};
		let proof = make_proof(&self.client, &self.exit_signal, commitment_block, block_hash).await?;

		Ok(ScannedCommitment {
			signed_commitment,
			proof,
			block_hash,
			depth: self.best_beefy_block.saturating_sub(commitment_block),
		})
	}

	async fn next_session_boundary(&mut self) -> Result<HeaderId, Error> {
		loop {
			if self.cursor > self.best_beefy_block {
				self.exit_signal.sleep(self.finality_poll_interval).await?;
				self.best_beefy_block =
					read_best_beefy_block(&self.client, &self.exit_signal).await?.number();
				continue
			}

			let number = self.cursor;
			let hash = read_block_hash(&self.client, &self.exit_signal, number).await?;
			let session_index = read_session_index(&self.client, &self.exit_signal, hash)
				.await?
				.unwrap_or_default();
			self.cursor += 1;

			if session_index > self.session_index {
				log::trace!(
					target: "bridge",
					"Found session boundary at block #{}: {} -> {}",
					number,
					self.session_index,
					session_index,
				);

				self.session_index = session_index;
				return Ok(relay_utils::HeaderId(number, hash))
			}
		}
	}
}

async fn read_session_index<C: Client>(
	client: &C,
	exit_signal: &ExitSignal,
	at: Hash,
) -> Result<Option<SessionIndex>, Error> {
	guarded(exit_signal, client.storage_value(at, storage_keys::current_session_index_key())).await
}
