//! # Asset Data
//!
//! Asset data is ABI-encoded: a 4-byte proxy id followed by 32-byte words.
//!
//! ```text
//! ERC20      f47261b0 | token
//! ERC721     02571792 | token | tokenId
//! ERC1155    a7cb5fb7 | token | offsets and dynamic arrays ...
//! MultiAsset 94cfcdd7 | offset(amounts) | offset(nestedAssetData) ...
//! StaticCall c339d10a | target | offset(data) | expectedReturnHash ...
//! ```
//!
//! Only the head of each encoding is decoded; the mesh needs the token
//! address to scope re-validation, not the full argument list.

use crate::domain::errors::AssetDataError;
use primitive_types::U256;
use shared_types::Address;

const WORD: usize = 32;
const SELECTOR: usize = 4;

/// Asset proxy kinds, keyed by their 4-byte id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetProxy {
    Erc20,
    Erc721,
    Erc1155,
    MultiAsset,
    StaticCall,
}

impl AssetProxy {
    pub const ALL: [AssetProxy; 5] = [
        AssetProxy::Erc20,
        AssetProxy::Erc721,
        AssetProxy::Erc1155,
        AssetProxy::MultiAsset,
        AssetProxy::StaticCall,
    ];

    #[must_use]
    pub const fn id(&self) -> [u8; 4] {
        match self {
            AssetProxy::Erc20 => [0xf4, 0x72, 0x61, 0xb0],
            AssetProxy::Erc721 => [0x02, 0x57, 0x17, 0x92],
            AssetProxy::Erc1155 => [0xa7, 0xcb, 0x5f, 0xb7],
            AssetProxy::MultiAsset => [0x94, 0xcf, 0xcd, 0xd7],
            AssetProxy::StaticCall => [0xc3, 0x39, 0xd1, 0x0a],
        }
    }

    #[must_use]
    pub fn from_id(id: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.id() == id)
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            AssetProxy::Erc20 => "ERC20",
            AssetProxy::Erc721 => "ERC721",
            AssetProxy::Erc1155 => "ERC1155",
            AssetProxy::MultiAsset => "MultiAsset",
            AssetProxy::StaticCall => "StaticCall",
        }
    }

    /// Minimum encoded length, selector included.
    const fn min_len(&self) -> usize {
        match self {
            AssetProxy::Erc20 => SELECTOR + WORD,
            AssetProxy::Erc721 => SELECTOR + 2 * WORD,
            AssetProxy::Erc1155 => SELECTOR + 5 * WORD,
            AssetProxy::MultiAsset => SELECTOR + 2 * WORD,
            AssetProxy::StaticCall => SELECTOR + 3 * WORD,
        }
    }
}

/// Decoded head of an asset data blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetData {
    Erc20 { token: Address },
    Erc721 { token: Address, token_id: U256 },
    Erc1155 { token: Address },
    MultiAsset,
    StaticCall { target: Address },
}

impl AssetData {
    #[must_use]
    pub fn proxy(&self) -> AssetProxy {
        match self {
            AssetData::Erc20 { .. } => AssetProxy::Erc20,
            AssetData::Erc721 { .. } => AssetProxy::Erc721,
            AssetData::Erc1155 { .. } => AssetProxy::Erc1155,
            AssetData::MultiAsset => AssetProxy::MultiAsset,
            AssetData::StaticCall { .. } => AssetProxy::StaticCall,
        }
    }

    /// Token contract whose balance and allowance logs affect this asset.
    ///
    /// `None` for encodings whose funding cannot be tied to one contract's
    /// logs (ERC1155 batches, multi-asset bundles, static calls).
    #[must_use]
    pub fn tracked_token(&self) -> Option<Address> {
        match self {
            AssetData::Erc20 { token } | AssetData::Erc721 { token, .. } => Some(*token),
            _ => None,
        }
    }
}

fn address_word(data: &[u8], offset: usize, proxy: AssetProxy) -> Result<Address, AssetDataError> {
    let word = &data[offset..offset + WORD];
    if word[..12].iter().any(|b| *b != 0) {
        return Err(AssetDataError::Malformed { proxy: proxy.name() });
    }
    Address::from_slice(&word[12..]).map_err(|_| AssetDataError::Malformed { proxy: proxy.name() })
}

/// Decode the proxy id and leading arguments of `data`.
pub fn decode_asset_data(data: &[u8]) -> Result<AssetData, AssetDataError> {
    if data.len() < SELECTOR {
        return Err(AssetDataError::TooShort(data.len()));
    }
    let proxy = AssetProxy::from_id(&data[..SELECTOR])
        .ok_or_else(|| AssetDataError::UnknownProxy(hex_id(&data[..SELECTOR])))?;
    if data.len() < proxy.min_len() {
        return Err(AssetDataError::Malformed { proxy: proxy.name() });
    }

    let decoded = match proxy {
        AssetProxy::Erc20 => {
            if data.len() != proxy.min_len() {
                return Err(AssetDataError::Malformed { proxy: proxy.name() });
            }
            AssetData::Erc20 {
                token: address_word(data, SELECTOR, proxy)?,
            }
        }
        AssetProxy::Erc721 => {
            if data.len() != proxy.min_len() {
                return Err(AssetDataError::Malformed { proxy: proxy.name() });
            }
            AssetData::Erc721 {
                token: address_word(data, SELECTOR, proxy)?,
                token_id: U256::from_big_endian(&data[SELECTOR + WORD..SELECTOR + 2 * WORD]),
            }
        }
        AssetProxy::Erc1155 => AssetData::Erc1155 {
            token: address_word(data, SELECTOR, proxy)?,
        },
        AssetProxy::MultiAsset => AssetData::MultiAsset,
        AssetProxy::StaticCall => AssetData::StaticCall {
            target: address_word(data, SELECTOR, proxy)?,
        },
    };
    Ok(decoded)
}

fn hex_id(id: &[u8]) -> String {
    id.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::testing::erc20_asset_data;

    #[test]
    fn test_decode_erc20() {
        let token = Address([0xab; 20]);
        let data = erc20_asset_data(token);
        let decoded = decode_asset_data(data.as_slice()).unwrap();
        assert_eq!(decoded, AssetData::Erc20 { token });
        assert_eq!(decoded.tracked_token(), Some(token));
    }

    #[test]
    fn test_decode_erc721() {
        let token = Address([0x07; 20]);
        let mut data = AssetProxy::Erc721.id().to_vec();
        data.extend_from_slice(&token.to_word());
        let mut id = [0u8; 32];
        id[31] = 9;
        data.extend_from_slice(&id);

        assert_eq!(
            decode_asset_data(&data).unwrap(),
            AssetData::Erc721 {
                token,
                token_id: U256::from(9)
            }
        );
    }

    #[test]
    fn test_multi_asset_has_no_tracked_token() {
        let mut data = AssetProxy::MultiAsset.id().to_vec();
        data.extend_from_slice(&[0u8; 64]);
        let decoded = decode_asset_data(&data).unwrap();
        assert_eq!(decoded.proxy(), AssetProxy::MultiAsset);
        assert_eq!(decoded.tracked_token(), None);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(decode_asset_data(&[0xf4, 0x72]), Err(AssetDataError::TooShort(2)));
        assert_eq!(
            decode_asset_data(&[0xde, 0xad, 0xbe, 0xef, 0, 0]),
            Err(AssetDataError::UnknownProxy("deadbeef".to_string()))
        );

        // ERC20 with a truncated address word
        let mut short = AssetProxy::Erc20.id().to_vec();
        short.extend_from_slice(&[0u8; 20]);
        assert!(matches!(
            decode_asset_data(&short),
            Err(AssetDataError::Malformed { proxy: "ERC20" })
        ));

        // ERC20 with dirty high bytes in the address word
        let mut dirty = AssetProxy::Erc20.id().to_vec();
        dirty.extend_from_slice(&[0xffu8; 32]);
        assert!(decode_asset_data(&dirty).is_err());
    }
}
