//! # Contract Addresses
//!
//! Per-chain table of the contracts the mesh talks to.
//!
//! The production table (chain 1) is compiled in and can never be replaced.
//! Any other chain may be registered at startup, provided every required role
//! is set.

use crate::domain::errors::ContractAddressError;
use serde::{Deserialize, Serialize};
use shared_types::Address;
use std::collections::HashMap;

/// Chain id of the production network.
pub const MAINNET_CHAIN_ID: u64 = 1;

/// Chain id of the ganache development snapshot.
pub const GANACHE_CHAIN_ID: u64 = 1337;

const TESTNET_CHAIN_ID: u64 = 15001;

/// Addresses of every contract role on one chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContractAddresses {
    pub erc20_proxy: Address,
    pub erc721_proxy: Address,
    pub erc1155_proxy: Address,
    pub exchange: Address,
    pub coordinator: Address,
    pub coordinator_registry: Address,
    pub dev_utils: Address,
    pub weth9: Address,
    pub zrx_token: Address,
    pub chai_bridge: Address,
    pub chai_token: Address,
    pub maximum_gas_price: Address,
}

const fn nibble(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => panic!("invalid hex digit in address literal"),
    }
}

/// Parse a `0x`-prefixed 40-digit literal at compile time.
const fn addr(s: &str) -> Address {
    let b = s.as_bytes();
    assert!(b.len() == 42, "address literal must be 0x + 40 hex digits");
    let mut out = [0u8; 20];
    let mut i = 0;
    while i < 20 {
        out[i] = (nibble(b[2 + 2 * i]) << 4) | nibble(b[3 + 2 * i]);
        i += 1;
    }
    Address(out)
}

const MAINNET: ContractAddresses = ContractAddresses {
    erc20_proxy: Address::ZERO,
    erc721_proxy: Address::ZERO,
    erc1155_proxy: Address::ZERO,
    exchange: Address::ZERO,
    coordinator: Address::ZERO,
    coordinator_registry: Address::ZERO,
    dev_utils: Address::ZERO,
    weth9: Address::ZERO,
    zrx_token: Address::ZERO,
    chai_bridge: Address::ZERO,
    chai_token: Address::ZERO,
    maximum_gas_price: Address::ZERO,
};

const TESTNET: ContractAddresses = ContractAddresses {
    erc20_proxy: addr("0x979934a6e6500f5ab9a0625def49148017eefa03"),
    erc721_proxy: addr("0x8bef4a095f0188dfaf448a8e0b646e972cfc8a65"),
    erc1155_proxy: addr("0x8ace39ed9d17987782e283abe2973c568bf59a92"),
    exchange: addr("0xa5ab15972d62a5cd212d5ca791137bc6770373de"),
    coordinator: addr("0x2e64217707ffa5e17627160a9feeff83fe8e2da3"),
    coordinator_registry: Address::ZERO,
    dev_utils: addr("0x988e8d73acd4f9ab84cf4b0d6c264a6f0f275807"),
    weth9: addr("0xe11c000a97cd12843dbb6da2d61b4342e1f24772"),
    zrx_token: addr("0x7dc9fb4c428675e5ad08697d191847fe71e96700"),
    chai_bridge: Address::ZERO,
    chai_token: Address::ZERO,
    maximum_gas_price: addr("0x2c668051f237caa8aba4277143ac5f663bdbfeca"),
};

const GANACHE: ContractAddresses = ContractAddresses {
    erc20_proxy: addr("0x1dc4c1cefef38a777b15aa20260a54e584b16c48"),
    erc721_proxy: addr("0x1d7022f5b17d2f8b695918fb48fa1089c9f85401"),
    erc1155_proxy: addr("0x6a4a62e5a7ed13c361b176a5f62c2ee620ac0df8"),
    exchange: addr("0x48bacb9266a570d521063ef5dd96e61686dbe788"),
    coordinator: addr("0x4d3d5c850dd5bd9d6f4adda3dd039a3c8054ca29"),
    coordinator_registry: addr("0xaa86dda78e9434aca114b6676fc742a18d15a1cc"),
    dev_utils: addr("0xb23672f74749bf7916ba6827c64111a4d6de7f11"),
    weth9: addr("0x0b1ba0af832d7c05fd64161e0db78e85978e8082"),
    zrx_token: addr("0x871dd7c2b4b25e1aa18728e9d5f2af4c4e431f5c"),
    chai_bridge: Address::ZERO,
    chai_token: Address::ZERO,
    maximum_gas_price: addr("0x2c530e4ecc573f11bd72cf5fdf580d134d25f15f"),
};

impl ContractAddresses {
    /// The ganache development deployment.
    #[must_use]
    pub const fn ganache() -> Self {
        GANACHE
    }
}

/// Built-in table for `chain_id`.
pub fn contract_addresses_for_chain_id(chain_id: u64) -> Result<ContractAddresses, ContractAddressError> {
    match chain_id {
        MAINNET_CHAIN_ID => Ok(MAINNET),
        TESTNET_CHAIN_ID => Ok(TESTNET),
        GANACHE_CHAIN_ID => Ok(GANACHE),
        other => Err(ContractAddressError::UnknownChain(other)),
    }
}

/// Check a custom table before it is registered for `chain_id`.
///
/// Chain 1 always fails. Elsewhere the exchange, dev utils and every asset
/// proxy must be non-zero; the first missing role is reported.
pub fn validate_contract_addresses_for_chain_id(
    chain_id: u64,
    addresses: &ContractAddresses,
) -> Result<(), ContractAddressError> {
    if chain_id == MAINNET_CHAIN_ID {
        return Err(ContractAddressError::MainnetImmutable);
    }
    let required = [
        ("Exchange", addresses.exchange),
        ("DevUtils", addresses.dev_utils),
        ("ERC20Proxy", addresses.erc20_proxy),
        ("ERC721Proxy", addresses.erc721_proxy),
        ("ERC1155Proxy", addresses.erc1155_proxy),
    ];
    for (role, address) in required {
        if address.is_zero() {
            return Err(ContractAddressError::MissingRole { chain_id, role });
        }
    }
    Ok(())
}

/// Built-in tables plus any validated custom entries.
///
/// Owned by the node and passed to the components that need it; there is no
/// process-wide registry.
#[derive(Debug, Clone, Default)]
pub struct ContractAddressTable {
    custom: HashMap<u64, ContractAddresses>,
}

impl ContractAddressTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `addresses` for `chain_id` after validating them.
    pub fn add(&mut self, chain_id: u64, addresses: ContractAddresses) -> Result<(), ContractAddressError> {
        validate_contract_addresses_for_chain_id(chain_id, &addresses)?;
        self.custom.insert(chain_id, addresses);
        Ok(())
    }

    /// Custom entries take precedence over built-ins, except on chain 1 where
    /// none can exist.
    pub fn get(&self, chain_id: u64) -> Result<ContractAddresses, ContractAddressError> {
        match self.custom.get(&chain_id) {
            Some(addresses) => Ok(*addresses),
            None => contract_addresses_for_chain_id(chain_id),
        }
    }
}
