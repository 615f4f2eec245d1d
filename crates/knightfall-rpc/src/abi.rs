//! Minimal ABI codec for the membership contract.
//!
//! Covers exactly the argument and return shapes the contract uses:
//! `address`, `uint256` and `string` arguments; `bool`, `uint256`, `address`
//! and `string` returns. Integers are limited to `u64`.

use crate::error::{Error, Result};
use knightfall_session::Address;

const WORD: usize = 32;

/// Function selectors: first four bytes of the keccak-256 of each signature.
pub mod selector {
    /// `totalSupply()`
    pub const TOTAL_SUPPLY: [u8; 4] = [0x18, 0x16, 0x0d, 0xdd];
    /// `isMember(address)`
    pub const IS_MEMBER: [u8; 4] = [0xa2, 0x30, 0xc5, 0x24];
    /// `memberName(address)`
    pub const MEMBER_NAME: [u8; 4] = [0x97, 0xe5, 0x36, 0xe0];
    /// `memberCategory(address)`
    pub const MEMBER_CATEGORY: [u8; 4] = [0x9f, 0xdd, 0xfb, 0x4c];
    /// `getTokenIdForAddress(address)`
    pub const TOKEN_ID_FOR_ADDRESS: [u8; 4] = [0x1b, 0x5b, 0xc4, 0xf9];
    /// `isWhitelisted(address)`
    pub const IS_WHITELISTED: [u8; 4] = [0x3a, 0xf3, 0x2a, 0xbf];
    /// `ownerOf(uint256)`
    pub const OWNER_OF: [u8; 4] = [0x63, 0x52, 0x21, 0x1e];
    /// `tokenURI(uint256)`
    pub const TOKEN_URI: [u8; 4] = [0xc8, 0x7b, 0x56, 0xdd];
    /// `mintMembership(string,string)`
    pub const MINT_MEMBERSHIP: [u8; 4] = [0x94, 0xfd, 0xf2, 0x7f];
    /// `whitelistMember(address)`
    pub const WHITELIST_MEMBER: [u8; 4] = [0x34, 0x50, 0xe6, 0x83];
}

/// A call argument.
#[derive(Debug, Clone, Copy)]
pub enum Token<'a> {
    Address(Address),
    Uint(u64),
    String(&'a str),
}

fn uint_word(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

fn address_word(address: &Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - Address::LEN..].copy_from_slice(address.as_bytes());
    word
}

/// Encode a call as `0x`-prefixed calldata.
pub fn encode_call(selector: [u8; 4], args: &[Token<'_>]) -> String {
    let head_len = WORD * args.len();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for arg in args {
        match arg {
            Token::Address(address) => head.extend_from_slice(&address_word(address)),
            Token::Uint(value) => head.extend_from_slice(&uint_word(*value)),
            Token::String(s) => {
                head.extend_from_slice(&uint_word((head_len + tail.len()) as u64));
                tail.extend_from_slice(&uint_word(s.len() as u64));
                tail.extend_from_slice(s.as_bytes());
                let padding = (WORD - s.len() % WORD) % WORD;
                tail.resize(tail.len() + padding, 0);
            }
        }
    }

    let mut data = Vec::with_capacity(4 + head.len() + tail.len());
    data.extend_from_slice(&selector);
    data.extend_from_slice(&head);
    data.extend_from_slice(&tail);
    format!("0x{}", hex::encode(data))
}

/// Decode `0x`-prefixed return data.
pub fn decode_hex(data: &str) -> Result<Vec<u8>> {
    let digits = data.strip_prefix("0x").unwrap_or(data);
    Ok(hex::decode(digits)?)
}

fn word(data: &[u8], offset: usize) -> Result<&[u8]> {
    offset
        .checked_add(WORD)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| Error::Abi(format!("return data too short for word at {offset}")))
}

/// Decode a `uint256` that must fit in 64 bits.
pub fn decode_uint(data: &[u8]) -> Result<u64> {
    decode_uint_at(data, 0)
}

fn decode_uint_at(data: &[u8], offset: usize) -> Result<u64> {
    let w = word(data, offset)?;
    if w[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(Error::Abi("uint256 does not fit in 64 bits".into()));
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&w[WORD - 8..]);
    Ok(u64::from_be_bytes(bytes))
}

/// Decode a `bool`.
pub fn decode_bool(data: &[u8]) -> Result<bool> {
    match decode_uint(data)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(Error::Abi(format!("invalid bool value {other}"))),
    }
}

/// Decode an `address`.
pub fn decode_address(data: &[u8]) -> Result<Address> {
    let w = word(data, 0)?;
    if w[..WORD - Address::LEN].iter().any(|b| *b != 0) {
        return Err(Error::Abi("address word has dirty high bytes".into()));
    }
    let mut bytes = [0u8; Address::LEN];
    bytes.copy_from_slice(&w[WORD - Address::LEN..]);
    Ok(Address::from_bytes(bytes))
}

/// Decode a single dynamic `string` return.
pub fn decode_string(data: &[u8]) -> Result<String> {
    let offset = usize::try_from(decode_uint(data)?)
        .map_err(|_| Error::Abi("string offset out of range".into()))?;
    let len = usize::try_from(decode_uint_at(data, offset)?)
        .map_err(|_| Error::Abi("string length out of range".into()))?;
    let start = offset + WORD;
    let bytes = start
        .checked_add(len)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| Error::Abi("string data truncated".into()))?;
    String::from_utf8(bytes.to_vec()).map_err(|e| Error::Abi(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> Address {
        "0x43db45efcb7b28ca004728e74f6ca880d5f31c39".parse().unwrap()
    }

    #[test]
    fn encode_no_args() {
        assert_eq!(encode_call(selector::TOTAL_SUPPLY, &[]), "0x18160ddd");
    }

    #[test]
    fn encode_address_arg() {
        let data = encode_call(selector::IS_MEMBER, &[Token::Address(addr())]);
        assert_eq!(
            data,
            "0xa230c524\
             00000000000000000000000043db45efcb7b28ca004728e74f6ca880d5f31c39"
        );
    }

    #[test]
    fn encode_uint_arg() {
        let data = encode_call(selector::OWNER_OF, &[Token::Uint(5)]);
        assert_eq!(data.len(), 2 + 8 + 64);
        assert!(data.ends_with("05"));
    }

    #[test]
    fn encode_two_strings() {
        let data = encode_call(
            selector::MINT_MEMBERSHIP,
            &[Token::String("Galahad"), Token::String("ipfs://x")],
        );
        let bytes = decode_hex(&data).unwrap();
        let body = &bytes[4..];
        // Heads point past both head words, then past the first string's two words.
        assert_eq!(decode_uint_at(body, 0).unwrap(), 0x40);
        assert_eq!(decode_uint_at(body, 32).unwrap(), 0x80);
        assert_eq!(decode_uint_at(body, 0x40).unwrap(), 7);
        assert_eq!(&body[0x60..0x67], b"Galahad");
        assert_eq!(decode_uint_at(body, 0x80).unwrap(), 8);
        assert_eq!(&body[0xa0..0xa8], b"ipfs://x");
        assert_eq!(body.len(), 0xc0);
    }

    #[test]
    fn decode_scalars() {
        let one = decode_hex(&format!("0x{:064x}", 1)).unwrap();
        assert!(decode_bool(&one).unwrap());
        assert_eq!(decode_uint(&one).unwrap(), 1);

        let two = decode_hex(&format!("0x{:064x}", 2)).unwrap();
        assert!(decode_bool(&two).is_err());

        let word = decode_hex("0x00000000000000000000000043db45efcb7b28ca004728e74f6ca880d5f31c39").unwrap();
        assert_eq!(decode_address(&word).unwrap(), addr());
    }

    #[test]
    fn decode_rejects_wide_uint_and_short_data() {
        let wide = decode_hex(&format!("0x01{}", "00".repeat(31))).unwrap();
        assert!(decode_uint(&wide).is_err());
        assert!(decode_uint(&[0u8; 4]).is_err());
    }

    #[test]
    fn decode_dynamic_string() {
        let mut data = Vec::new();
        data.extend_from_slice(&uint_word(0x20));
        data.extend_from_slice(&uint_word(7));
        let mut text = b"Galahad".to_vec();
        text.resize(32, 0);
        data.extend_from_slice(&text);
        assert_eq!(decode_string(&data).unwrap(), "Galahad");

        data.truncate(64 + 3);
        assert!(decode_string(&data).is_err());
    }
}
