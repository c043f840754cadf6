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

//! Classification of scanned BEEFY commitments and their emission to the consumer.

use crate::{
	proof::make_proof,
	scanner::{
		read_authorities, read_best_beefy_block, read_block_hash, read_signed_commitment,
		CommitmentScanner, ScannedCommitment,
	},
	BeefyRelayParams, Error, RelayProgress, Request,
};

use futures::{
	channel::mpsc::{channel, Receiver, Sender},
	SinkExt,
};
use relay_substrate_client::{BlockNumber, Client};
use relay_utils::ExitSignal;
use sp_consensus_beefy::{ecdsa_crypto::AuthorityId, ValidatorSetId};
use sp_core::H256;

/// What to do with the scanned commitment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
	/// The commitment hands over to the new validator set and must be delivered.
	Handover,
	/// The commitment of the current validator set that may be delivered if the consumer
	/// is ready to accept it.
	Update,
	/// The commitment is not delivered.
	Discard(DiscardReason),
}

/// Why the commitment has been discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscardReason {
	/// Validator set id has changed, but the authorities are the same as the next set that
	/// is already known to the destination, and the update period has not elapsed yet.
	RedundantHandover,
	/// The commitment is too far behind the best BEEFY-finalized block.
	TooDeep,
	/// The commitment is too close to the latest relayed block.
	Sampled,
	/// The commitment is signed by the validator set that is older than the current set.
	OutdatedValidatorSet,
}

/// Result of the non-blocking request emission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmitOutcome {
	/// The consumer has accepted the request.
	Accepted,
	/// The consumer is busy and the request has been dropped.
	Dropped,
}

/// Classify commitment against the relay progress.
///
/// `current_authority_set_root` is the root of the current authority set, read at the
/// commitment block.
pub fn classify(
	params: &BeefyRelayParams,
	progress: &RelayProgress,
	block: BlockNumber,
	validator_set_id: ValidatorSetId,
	depth: BlockNumber,
	current_authority_set_root: H256,
) -> Classification {
	let is_sampled = block < progress.latest_beefy_block.saturating_add(params.update_period);
	if validator_set_id > progress.current_validator_set_id {
		if current_authority_set_root == progress.next_validator_set_root && is_sampled {
			return Classification::Discard(DiscardReason::RedundantHandover)
		}
		Classification::Handover
	} else if validator_set_id == progress.current_validator_set_id {
		if depth > params.fast_forward_depth {
			return Classification::Discard(DiscardReason::TooDeep)
		}
		if is_sampled {
			return Classification::Discard(DiscardReason::Sampled)
		}
		Classification::Update
	} else {
		Classification::Discard(DiscardReason::OutdatedValidatorSet)
	}
}

/// Create channel for relay requests.
pub fn request_channel(params: &BeefyRelayParams) -> (Sender<Request>, Receiver<Request>) {
	channel(params.request_channel_capacity)
}

/// Send request to the consumer unless it is busy.
pub fn try_emit(sender: &mut Sender<Request>, request: Request) -> Result<EmitOutcome, Error> {
	match sender.try_send(request) {
		Ok(()) => Ok(EmitOutcome::Accepted),
		Err(e) if e.is_full() => Ok(EmitOutcome::Dropped),
		Err(_) => Err(Error::RequestChannelClosed),
	}
}

/// Scan BEEFY commitments, starting right after the latest relayed block, and send them to
/// the consumer.
///
/// Runs until the exit signal is fired (then `Ok(())` is returned) or until the first error.
/// The `progress` is never changed here: the caller updates it after requests are delivered.
pub async fn run<C: Client>(
	client: C,
	params: BeefyRelayParams,
	progress: RelayProgress,
	mut requests: Sender<Request>,
	exit_signal: ExitSignal,
) -> Result<(), Error> {
	match run_until_error(client, params, progress, &mut requests, exit_signal).await {
		Err(Error::Cancelled(_)) => {
			log::info!(target: "bridge", "BEEFY commitments scan has been cancelled");
			Ok(())
		},
		result => result,
	}
}

async fn run_until_error<C: Client>(
	client: C,
	params: BeefyRelayParams,
	progress: RelayProgress,
	requests: &mut Sender<Request>,
	exit_signal: ExitSignal,
) -> Result<(), Error> {
	let mut state = progress.clone();
	let mut scanner = CommitmentScanner::new(
		client.clone(),
		exit_signal.clone(),
		params.finality_poll_interval,
		progress.latest_beefy_block.saturating_add(1),
	)
	.await?;

	loop {
		let commitment = scanner.next_commitment().await?;
		let block = commitment.signed_commitment.commitment.block_number;
		let validator_set_id = commitment.signed_commitment.commitment.validator_set_id;
		let (validators, current_authority_set) =
			read_authorities(&client, &exit_signal, commitment.block_hash).await?;

		let classification = classify(
			&params,
			&state,
			block,
			validator_set_id,
			commitment.depth,
			current_authority_set.keyset_commitment,
		);
		log::trace!(
			target: "bridge",
			"Commitment of block #{} (set {}, next set {}, depth {}) is classified as {:?}. \
			Current set: {}, latest relayed block: #{}",
			block,
			validator_set_id,
			commitment.proof.leaf.beefy_next_authority_set.id,
			commitment.depth,
			classification,
			state.current_validator_set_id,
			state.latest_beefy_block,
		);

		match classification {
			Classification::Handover => {
				let request = make_request(validators, commitment, true);
				guarded_send(requests, request, &exit_signal).await?;
				log::info!(
					target: "bridge",
					"Handover commitment of block #{} (set {}) has been sent",
					block,
					validator_set_id,
				);
				state.current_validator_set_id = validator_set_id;
				state.latest_beefy_block = block;
			},
			Classification::Update => {
				if exit_signal.is_triggered() {
					return Err(Error::Cancelled(relay_utils::Cancelled))
				}
				let request = make_request(validators, commitment, false);
				match try_emit(requests, request)? {
					EmitOutcome::Accepted => {
						log::info!(
							target: "bridge",
							"Commitment of block #{} (set {}) has been sent",
							block,
							validator_set_id,
						);
						state.latest_beefy_block = block;
					},
					EmitOutcome::Dropped => log::warn!(
						target: "bridge",
						"Commitment of block #{} (set {}) is dropped: consumer is busy",
						block,
						validator_set_id,
					),
				}
			},
			Classification::Discard(DiscardReason::OutdatedValidatorSet) => {
				if params.reject_outdated_validator_set {
					return Err(Error::OutdatedValidatorSet {
						block,
						commitment_set_id: validator_set_id,
						current_set_id: state.current_validator_set_id,
					})
				}
				log::warn!(
					target: "bridge",
					"Commitment of block #{} is discarded: it is signed by set {}, older than {}",
					block,
					validator_set_id,
					state.current_validator_set_id,
				);
			},
			Classification::Discard(DiscardReason::TooDeep) => log::warn!(
				target: "bridge",
				"Commitment of block #{} is discarded: depth {} exceeds {}",
				block,
				commitment.depth,
				params.fast_forward_depth,
			),
			Classification::Discard(reason) => log::info!(
				target: "bridge",
				"Commitment of block #{} (set {}) is discarded: {:?}",
				block,
				validator_set_id,
				reason,
			),
		}
	}
}

/// Build verified request for the latest BEEFY-finalized block, which is at or after the
/// given relay chain block.
///
/// Waits until the BEEFY-finalized block reaches `relay_block`.
pub async fn sync_update<C: Client>(
	client: C,
	params: BeefyRelayParams,
	progress: RelayProgress,
	relay_block: BlockNumber,
	exit_signal: ExitSignal,
) -> Result<Request, Error> {
	let best_beefy_block = loop {
		let best_beefy_block = read_best_beefy_block(&client, &exit_signal).await?;
		if best_beefy_block.number() >= relay_block {
			break best_beefy_block
		}

		log::debug!(
			target: "bridge",
			"Waiting for block #{} to be finalized by BEEFY. Best BEEFY block: #{}",
			relay_block,
			best_beefy_block.number(),
		);
		exit_signal.sleep(params.finality_poll_interval).await?;
	};

	let signed_commitment = read_signed_commitment(&client, &exit_signal, best_beefy_block).await?;
	let block = signed_commitment.commitment.block_number;
	let block_hash = if block == best_beefy_block.number() {
		best_beefy_block.hash()
	} else {
		read_block_hash(&client, &exit_signal, block).await?
	};
	let proof = make_proof(&client, &exit_signal, block, block_hash).await?;
	let (validators, _) = read_authorities(&client, &exit_signal, block_hash).await?;

	let is_handover =
		signed_commitment.commitment.validator_set_id > progress.current_validator_set_id;
	log::info!(
		target: "bridge",
		"Synced commitment of block #{} (set {}, handover: {})",
		block,
		signed_commitment.commitment.validator_set_id,
		is_handover,
	);

	Ok(Request {
		validators,
		signed_commitment,
		proof,
		is_handover,
		block_hash,
		depth: best_beefy_block.number().saturating_sub(block),
	})
}

fn make_request(
	validators: Vec<AuthorityId>,
	commitment: ScannedCommitment,
	is_handover: bool,
) -> Request {
	Request {
		validators,
		signed_commitment: commitment.signed_commitment,
		proof: commitment.proof,
		is_handover,
		block_hash: commitment.block_hash,
		depth: commitment.depth,
	}
}

async fn guarded_send(
	requests: &mut Sender<Request>,
	request: Request,
	exit_signal: &ExitSignal,
) -> Result<(), Error> {
	exit_signal
		.guard(requests.send(request))
		.await?
		.map_err(|_| Error::RequestChannelClosed)
}
