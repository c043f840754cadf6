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

//! Search for the relay chain block where the parachain block has been included.

use crate::{scanner::guarded, Error};

use relay_substrate_client::{
	storage_keys, BlockNumber, Client, Error as ClientError, Hash, Header, ParaHead, ParaId,
	PersistedValidationData,
};
use relay_utils::ExitSignal;

/// Find the first relay chain block, where the head of the parachain is the given
/// parachain block.
///
/// The search starts at the block right after the relay parent of the parachain block and
/// covers `finalization_timeout - 1` relay chain blocks.
pub async fn find_inclusion_block<RC: Client, PC: Client>(
	relay_client: &RC,
	para_client: &PC,
	exit_signal: &ExitSignal,
	para_id: ParaId,
	para_block: BlockNumber,
	finalization_timeout: BlockNumber,
) -> Result<BlockNumber, Error> {
	let para_hash = read_block_hash(para_client, exit_signal, para_block).await?;
	let validation_data: PersistedValidationData = guarded(
		exit_signal,
		para_client.storage_value(para_hash, storage_keys::validation_data_key()),
	)
	.await?
	.ok_or(Error::ValidationDataMissing(para_block))?;

	let first_relay_block = validation_data.relay_parent_number.saturating_add(1);
	let end_relay_block = validation_data.relay_parent_number.saturating_add(finalization_timeout);
	for relay_block in first_relay_block..end_relay_block {
		let relay_hash = read_block_hash(relay_client, exit_signal, relay_block).await?;
		let para_header =
			read_para_header(relay_client, exit_signal, para_id, relay_block, relay_hash).await?;

		log::trace!(
			target: "bridge",
			"Head of parachain {} at relay chain block #{}: #{}. Looking for #{}",
			para_id,
			relay_block,
			para_header.number,
			para_block,
		);

		if para_header.number == para_block {
			return Ok(relay_block)
		}
	}

	Err(Error::InclusionBlockNotFound { para_block, first_relay_block, end_relay_block })
}

/// Read hash of the canonical block.
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

/// Read and decode parachain head, stored at the relay chain block.
pub(crate) async fn read_para_header<RC: Client>(
	relay_client: &RC,
	exit_signal: &ExitSignal,
	para_id: ParaId,
	relay_block: BlockNumber,
	relay_hash: Hash,
) -> Result<Header, Error> {
	let head: ParaHead = guarded(
		exit_signal,
		relay_client.storage_value(relay_hash, storage_keys::parachain_head_key(para_id)),
	)
	.await?
	.ok_or(Error::ParachainNotRegistered { para_id, relay_block })?;
	head.header()
		.map_err(|error| Error::InvalidParachainHead { para_id, relay_block, error })
}

/// Read heads of all registered parachains at the relay chain block.
pub(crate) async fn read_para_heads<RC: Client>(
	relay_client: &RC,
	exit_signal: &ExitSignal,
	relay_hash: Hash,
) -> Result<Vec<(ParaId, ParaHead)>, Error> {
	let mut para_ids: Vec<ParaId> = guarded(
		exit_signal,
		relay_client.storage_value(relay_hash, storage_keys::parachains_key()),
	)
	.await?
	.unwrap_or_default();
	para_ids.sort();

	let mut heads = Vec::with_capacity(para_ids.len());
	for para_id in para_ids {
		let head = guarded(
			exit_signal,
			relay_client.storage_value(relay_hash, storage_keys::parachain_head_key(para_id)),
		)
		.await?;
		if let Some(head) = head {
			heads.push((para_id, head));
		}
	}
	Ok(heads)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::mock::*;

	async fn find(
		chain: &TestChains,
		para_block: BlockNumber,
		timeout: BlockNumber,
	) -> Result<BlockNumber, Error> {
		find_inclusion_block(
			&chain.relay_client(),
			&chain.para_client(),
			&ExitSignal::never(),
			PARA_ID,
			para_block,
			timeout,
		)
		.await
	}

	#[async_std::test]
	async fn inclusion_block_is_found() {
		let chain = TestChainsBuilder::new(20).build();
		// relay parent of parachain block #5 is #5 and it is included at #7
		assert_eq!(find(&chain, 5, 4).await.unwrap(), 7);
	}

	#[async_std::test]
	async fn inclusion_at_the_last_block_of_window_is_found() {
		let chain = TestChainsBuilder::new(20).with_inclusion_delay(3).build();
		assert_eq!(find(&chain, 5, 4).await.unwrap(), 8);
	}

	#[async_std::test]
	async fn inclusion_right_after_window_is_not_found() {
		let chain = TestChainsBuilder::new(20).with_inclusion_delay(4).build();
		assert!(matches!(
			find(&chain, 5, 4).await,
			Err(Error::InclusionBlockNotFound {
				para_block: 5,
				first_relay_block: 6,
				end_relay_block: 9,
			}),
		));
		// larger window finds it
		assert_eq!(find(&chain, 5, 32).await.unwrap(), 9);
	}

	#[async_std::test]
	async fn missing_validation_data_is_fatal() {
		let chain = TestChainsBuilder::new(20).build();
		let para_hash = chain.para_data().hash(5);
		chain
			.para_data()
			.storage
			.remove(&(para_hash, storage_keys::validation_data_key()));

		assert!(matches!(find(&chain, 5, 4).await, Err(Error::ValidationDataMissing(5))));
	}

	#[async_std::test]
	async fn unregistered_parachain_is_fatal() {
		let chain = TestChainsBuilder::new(20).build();
		let relay_hash = chain.relay_data().hash(6);
		chain
			.relay_data()
			.storage
			.remove(&(relay_hash, storage_keys::parachain_head_key(PARA_ID)));

		assert!(matches!(
			find(&chain, 5, 4).await,
			Err(Error::ParachainNotRegistered { relay_block: 6, .. }),
		));
	}

	#[async_std::test]
	async fn heads_of_all_parachains_are_read() {
		let chain = TestChainsBuilder::new(20).build();
		let relay_hash = chain.relay_data().hash(7);
		let heads =
			read_para_heads(&chain.relay_client(), &ExitSignal::never(), relay_hash).await.unwrap();

		assert_eq!(
			heads.iter().map(|(para_id, _)| *para_id).collect::<Vec<_>>(),
			vec![ParaId(1000), PARA_ID, ParaId(3000)],
		);
		assert_eq!(heads[1].1, ParaHead::from(&chain.para_data().header(5)));
	}
}
