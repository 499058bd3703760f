//! # Ethereum Boundary (MESH-02)
//!
//! Everything the mesh knows about the ledger it watches.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): contract address tables, asset data
//!   decoding, block and order-state records
//! - **Ports Layer** (`ports/`): the [`LedgerClient`] trait the validator and
//!   watcher depend on
//! - **Adapters** (`adapters/`): [`InMemoryLedger`], a scriptable ledger for
//!   development nodes and tests
//!
//! ```text
//! ┌───────────────────┐   order_relevant_states   ┌──────────────────┐
//! │ OrderValidator    │ ────────────────────────► │                  │
//! └───────────────────┘                           │   LedgerClient   │
//! ┌───────────────────┐   latest_block            │   (port)         │
//! │ HeadPoller        │ ────────────────────────► │                  │
//! └───────────────────┘   block_events            └──────────────────┘
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::memory::InMemoryLedger;
pub use domain::asset_data::{decode_asset_data, AssetData, AssetProxy};
pub use domain::contract_addresses::{
    contract_addresses_for_chain_id, validate_contract_addresses_for_chain_id, ContractAddressTable,
    ContractAddresses, GANACHE_CHAIN_ID, MAINNET_CHAIN_ID,
};
pub use domain::entities::{BlockHeader, OrderRelevantState, OrderStatus};
pub use domain::errors::{AssetDataError, ContractAddressError, LedgerError};
pub use ports::outbound::LedgerClient;
