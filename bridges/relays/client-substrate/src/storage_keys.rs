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

//! Storage keys of values that the relayer reads from the relay chain and parachain.

use crate::chain::ParaId;

use codec::Encode;
use frame_support::Twox64Concat;
use sp_core::storage::StorageKey;

/// Name of the `pallet-session` pallet at the relay chain.
pub const SESSION_PALLET_NAME: &str = "Session";
/// Name of the `pallet-mmr` pallet at the relay chain.
pub const MMR_PALLET_NAME: &str = "Mmr";
/// Name of the `pallet-beefy` pallet at the relay chain.
pub const BEEFY_PALLET_NAME: &str = "Beefy";
/// Name of the `pallet-beefy-mmr` pallet at the relay chain.
pub const BEEFY_MMR_PALLET_NAME: &str = "MmrLeaf";
/// Name of the `runtime_parachains::paras` pallet at the relay chain.
pub const PARAS_PALLET_NAME: &str = "Paras";
/// Name of the `cumulus-pallet-parachain-system` pallet at the parachain.
pub const PARACHAIN_SYSTEM_PALLET_NAME: &str = "ParachainSystem";
/// Name of the outbound queue pallet at the parachain.
pub const OUTBOUND_QUEUE_PALLET_NAME: &str = "EthereumOutboundQueue";

/// Storage key of the plain storage value.
pub fn storage_value_key(pallet_prefix: &str, value_name: &str) -> StorageKey {
	StorageKey(
		bp_runtime::storage_value_final_key(pallet_prefix.as_bytes(), value_name.as_bytes())
			.to_vec(),
	)
}

/// Storage key of the current session index.
pub fn current_session_index_key() -> StorageKey {
	storage_value_key(SESSION_PALLET_NAME, "CurrentIndex")
}

/// Storage key of the current MMR root.
pub fn mmr_root_hash_key() -> StorageKey {
	storage_value_key(MMR_PALLET_NAME, "RootHash")
}

/// Storage key of the current BEEFY authorities.
pub fn beefy_authorities_key() -> StorageKey {
	storage_value_key(BEEFY_PALLET_NAME, "Authorities")
}

/// Storage key of the current BEEFY authority set details, used by MMR leaves.
pub fn beefy_mmr_authorities_key() -> StorageKey {
	storage_value_key(BEEFY_MMR_PALLET_NAME, "BeefyAuthorities")
}

/// Storage key of the next BEEFY authority set details, used by MMR leaves.
pub fn beefy_mmr_next_authorities_key() -> StorageKey {
	storage_value_key(BEEFY_MMR_PALLET_NAME, "BeefyNextAuthorities")
}

/// Storage key of the parachain head at the relay chain.
pub fn parachain_head_key(para_id: ParaId) -> StorageKey {
	bp_runtime::storage_map_final_key::<Twox64Concat>(PARAS_PALLET_NAME, "Heads", &para_id.encode())
}

/// Storage key of the list of all registered parachains at the relay chain.
pub fn parachains_key() -> StorageKey {
	storage_value_key(PARAS_PALLET_NAME, "Parachains")
}

/// Storage key of the validation data at the parachain.
pub fn validation_data_key() -> StorageKey {
	storage_value_key(PARACHAIN_SYSTEM_PALLET_NAME, "ValidationData")
}

/// Storage key of the outbound queue nonce of given channel.
pub fn outbound_queue_nonce_key(encoded_channel_id: &[u8]) -> StorageKey {
	bp_runtime::storage_map_final_key::<Twox64Concat>(
		OUTBOUND_QUEUE_PALLET_NAME,
		"Nonce",
		encoded_channel_id,
	)
}

/// Storage key of messages, committed by the outbound queue in the current block.
pub fn outbound_queue_messages_key() -> StorageKey {
	storage_value_key(OUTBOUND_QUEUE_PALLET_NAME, "Messages")
}

#[cfg(test)]
mod tests {
	use super::*;
	use hex_literal::hex;

	#[test]
	fn storage_value_key_works() {
		// well-known key of `System::Number`
		assert_eq!(
			storage_value_key("System", "Number").0,
			hex!("26aa394eea5630e07c48ae0c9558cef702a5c1b19ab7a04f536c519aca4983ac").to_vec(),
		);
		// well-known key of `Session::CurrentIndex`
		assert_eq!(
			current_session_index_key().0,
			hex!("cec5070d609dd3497f72bde07fc96ba072763800a36a99fdfc7c10f6415f6ee6").to_vec(),
		);
	}

	#[test]
	fn storage_map_key_contains_raw_key() {
		let key = parachain_head_key(ParaId(1000));
		assert_eq!(key.0.len(), 32 + 8 + 4);
		assert_eq!(&key.0[..32], &storage_value_key("Paras", "Heads").0[..]);
		assert_eq!(&key.0[32..40], &sp_crypto_hashing::twox_64(&1000u32.encode())[..]);
		assert_eq!(&key.0[40..], &1000u32.encode()[..]);
	}

	#[test]
	fn parachain_head_key_is_well_known() {
		// `Paras::Heads(1000)`
		assert_eq!(
			parachain_head_key(ParaId(1000)).0,
			hex!("cd710b30bd2eab0352ddcc26417aa1941b3c252fcb29d88eff4f3de5de4476c3b6ff6f7d467b87a9e8030000")
				.to_vec(),
		);
	}
}
