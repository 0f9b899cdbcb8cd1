//! Contract call wrappers.
//!
//! The game talks to two contracts: the character NFT and the ERC-20 game
//! token. Every read and write is described as a typed call, lowered to a
//! `CallRequest` with hex calldata, and sent through a `ChainClient`. The
//! browser client lives in the web crate; `MockChain` serves tests and the
//! scenario runner.
use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::abi::{self, AbiError, ParamKind, Token, selectors};
use crate::address::{Address, AddressError, TokenAmount, from_hex, to_hex};
use crate::character::{Character, CharacterClass, Roster};
use crate::constants::{DEFAULT_TOKEN_DECIMALS, MAX_LEVEL};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("wallet is on chain {actual}, expected {expected}")]
    WrongChain { expected: u64, actual: u64 },
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("could not decode return data: {0}")]
    Decode(#[from] AbiError),
    #[error("insufficient funds: have {have}, need {need} base units")]
    InsufficientFunds { have: u128, need: u128 },
    #[error("caller does not own character #{0}")]
    NotOwner(u64),
    #[error("character #{0} does not exist")]
    UnknownToken(u64),
    #[error("{0} returned a result of the wrong kind")]
    UnexpectedResult(&'static str),
}

impl From<AddressError> for ChainError {
    fn from(err: AddressError) -> Self {
        Self::Decode(AbiError::Hex(err))
    }
}

const fn default_decimals() -> u8 {
    DEFAULT_TOKEN_DECIMALS
}

/// Deployment the client is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub character_contract: Address,
    pub token_contract: Address,
    #[serde(default = "default_decimals")]
    pub token_decimals: u8,
    /// Native-currency price of a mint, in wei.
    pub mint_price: TokenAmount,
}

impl ChainConfig {
    /// `0x`-prefixed chain id as wallets report it.
    #[must_use]
    pub fn chain_id_hex(&self) -> String {
        format!("{:#x}", self.chain_id)
    }
}

/// Parse an RPC quantity such as `"0x1a"`.
///
/// # Errors
///
/// Returns `Decode` for text that is not a hex quantity.
pub fn parse_quantity(text: &str) -> Result<u128, ChainError> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|_| ChainError::from(AddressError::InvalidHex(text.to_string())))
}

/// 32-byte transaction hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash([u8; 32]);

impl TxHash {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", to_hex(&self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({self})")
    }
}

impl FromStr for TxHash {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = from_hex(s.trim())?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidHex(s.to_string()))?;
        Ok(Self(array))
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

fn is_zero(amount: &TokenAmount) -> bool {
    *amount == TokenAmount::ZERO
}

fn serialize_quantity<S: Serializer>(amount: &TokenAmount, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("{:#x}", amount.base_units()))
}

/// Transaction object for `eth_call` / `eth_sendTransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    pub to: Address,
    /// `0x`-prefixed calldata.
    pub data: String,
    #[serde(skip_serializing_if = "is_zero", serialize_with = "serialize_quantity")]
    pub value: TokenAmount,
}

impl CallRequest {
    fn new(to: Address, calldata: &[u8]) -> Self {
        Self {
            from: None,
            to,
            data: format!("0x{}", to_hex(calldata)),
            value: TokenAmount::ZERO,
        }
    }

    /// Raw calldata bytes.
    ///
    /// # Errors
    ///
    /// Returns `Decode` when `data` is not valid hex.
    pub fn calldata(&self) -> Result<Vec<u8>, ChainError> {
        Ok(from_hex(&self.data)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum ReadCall {
    TokenBalance { owner: Address },
    CharacterOf { token_id: u64 },
    CharactersOfOwner { owner: Address },
    OwnerOf { token_id: u64 },
    MintPrice,
}

impl ReadCall {
    #[must_use]
    pub fn to_request(&self, config: &ChainConfig) -> CallRequest {
        match self {
            Self::TokenBalance { owner } => CallRequest::new(
                config.token_contract,
                &abi::encode_call(selectors::BALANCE_OF, &[Token::Address(*owner)]),
            ),
            Self::CharacterOf { token_id } => CallRequest::new(
                config.character_contract,
                &abi::encode_call(selectors::GET_CHARACTER, &[Token::Uint(u128::from(*token_id))]),
            ),
            Self::CharactersOfOwner { owner } => CallRequest::new(
                config.character_contract,
                &abi::encode_call(selectors::CHARACTERS_OF, &[Token::Address(*owner)]),
            ),
            Self::OwnerOf { token_id } => CallRequest::new(
                config.character_contract,
                &abi::encode_call(selectors::OWNER_OF, &[Token::Uint(u128::from(*token_id))]),
            ),
            Self::MintPrice => CallRequest::new(
                config.character_contract,
                &abi::encode_call(selectors::MINT_PRICE, &[]),
            ),
        }
    }

    /// Shape of the return tuple.
    #[must_use]
    pub const fn return_kinds(&self) -> &'static [ParamKind] {
        match self {
            Self::TokenBalance { .. } | Self::MintPrice => &[ParamKind::Uint],
            Self::CharacterOf { .. } => &[
                ParamKind::String,
                ParamKind::Uint,
                ParamKind::Uint,
                ParamKind::Uint,
            ],
            Self::CharactersOfOwner { .. } => &[ParamKind::UintArray],
            Self::OwnerOf { .. } => &[ParamKind::Address],
        }
    }
}

/// Character as recorded by the NFT contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnChainCharacter {
    pub token_id: u64,
    pub name: String,
    pub class: CharacterClass,
    pub level: u32,
    pub generation: u8,
}

impl OnChainCharacter {
    #[must_use]
    pub fn to_character(&self) -> Character {
        Character {
            level: self.level.max(1),
            generation: self.generation,
            ..Character::new(self.token_id, self.name.clone(), self.class)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReadResult {
    Balance { amount: TokenAmount },
    Character(OnChainCharacter),
    TokenIds { ids: Vec<u64> },
    Owner { owner: Address },
    MintPrice { price: TokenAmount },
}

fn narrow<T: TryFrom<u128>>(value: u128) -> Result<T, ChainError> {
    T::try_from(value).map_err(|_| ChainError::Decode(AbiError::Overflow))
}

/// Decode raw return data for `call`.
///
/// # Errors
///
/// Returns `Decode` when the data does not match the call's return shape,
/// including ids or levels too large for their local types and unknown
/// class ids.
pub fn decode_read(call: &ReadCall, data: &[u8]) -> Result<ReadResult, ChainError> {
    let tokens = abi::decode(call.return_kinds(), data)?;
    let uint = |i: usize| tokens.get(i).and_then(Token::as_uint).ok_or(AbiError::Overflow);
    let result = match call {
        ReadCall::TokenBalance { .. } => ReadResult::Balance {
            amount: TokenAmount::from_base_units(uint(0)?),
        },
        ReadCall::MintPrice => ReadResult::MintPrice {
            price: TokenAmount::from_base_units(uint(0)?),
        },
        ReadCall::CharacterOf { token_id } => {
            let name = tokens
                .first()
                .and_then(Token::as_str)
                .unwrap_or_default()
                .to_string();
            let class_id: u8 = narrow(uint(1)?)?;
            let class = CharacterClass::from_contract_id(class_id)
                .ok_or(ChainError::Decode(AbiError::Overflow))?;
            ReadResult::Character(OnChainCharacter {
                token_id: *token_id,
                name,
                class,
                level: narrow(uint(2)?)?,
                generation: narrow(uint(3)?)?,
            })
        }
        ReadCall::CharactersOfOwner { .. } => {
            let ids = tokens
                .first()
                .and_then(Token::as_uint_array)
                .unwrap_or_default()
                .iter()
                .map(|id| narrow::<u64>(*id))
                .collect::<Result<Vec<_>, _>>()?;
            ReadResult::TokenIds { ids }
        }
        ReadCall::OwnerOf { .. } => ReadResult::Owner {
            owner: tokens
                .first()
                .and_then(Token::as_address)
                .ok_or(AbiError::BadAddress)?,
        },
    };
    Ok(result)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum WriteCall {
    MintCharacter { name: String, class: CharacterClass },
    LevelUpCharacter { token_id: u64 },
    EvolveCharacter { token_id: u64 },
    TransferTokens { to: Address, amount: TokenAmount },
}

impl WriteCall {
    /// Transaction for `from` to send. Mints carry the configured price as
    /// native value.
    #[must_use]
    pub fn to_request(&self, config: &ChainConfig, from: Address) -> CallRequest {
        let mut request = match self {
            Self::MintCharacter { name, class } => {
                let mut req = CallRequest::new(
                    config.character_contract,
                    &abi::encode_call(
                        selectors::MINT_CHARACTER,
                        &[
                            Token::String(name.clone()),
                            Token::Uint(u128::from(class.contract_id())),
                        ],
                    ),
                );
                req.value = config.mint_price;
                req
            }
            Self::LevelUpCharacter { token_id } => CallRequest::new(
                config.character_contract,
                &abi::encode_call(selectors::LEVEL_UP, &[Token::Uint(u128::from(*token_id))]),
            ),
            Self::EvolveCharacter { token_id } => CallRequest::new(
                config.character_contract,
                &abi::encode_call(selectors::EVOLVE, &[Token::Uint(u128::from(*token_id))]),
            ),
            Self::TransferTokens { to, amount } => CallRequest::new(
                config.token_contract,
                &abi::encode_call(
                    selectors::TRANSFER,
                    &[Token::Address(*to), Token::Uint(amount.base_units())],
                ),
            ),
        };
        request.from = Some(from);
        request
    }
}

/// Wallet or node connection.
#[allow(async_fn_in_trait)]
pub trait ChainClient {
    fn config(&self) -> &ChainConfig;

    /// Accounts the wallet has exposed to the game.
    async fn accounts(&self) -> Result<Vec<Address>, ChainError>;

    async fn chain_id(&self) -> Result<u64, ChainError>;

    async fn read(&self, call: &ReadCall) -> Result<ReadResult, ChainError>;

    async fn write(&self, from: Address, call: &WriteCall) -> Result<TxHash, ChainError>;

    /// Fail with `WrongChain` unless connected to the configured chain.
    async fn ensure_chain(&self) -> Result<(), ChainError> {
        let actual = self.chain_id().await?;
        let expected = self.config().chain_id;
        if actual == expected {
            Ok(())
        } else {
            Err(ChainError::WrongChain { expected, actual })
        }
    }

    async fn character(&self, token_id: u64) -> Result<OnChainCharacter, ChainError> {
        match self.read(&ReadCall::CharacterOf { token_id }).await? {
            ReadResult::Character(c) => Ok(c),
            _ => Err(ChainError::UnexpectedResult("getCharacter")),
        }
    }

    /// Fetch every character `owner` holds.
    async fn characters_of(&self, owner: Address) -> Result<Vec<OnChainCharacter>, ChainError> {
        let ReadResult::TokenIds { ids } = self.read(&ReadCall::CharactersOfOwner { owner }).await? else {
            return Err(ChainError::UnexpectedResult("charactersOf"));
        };
        let mut characters = Vec::with_capacity(ids.len());
        for token_id in ids {
            characters.push(self.character(token_id).await?);
        }
        Ok(characters)
    }
}

/// Changes applied by [`sync_roster`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

/// Merge on-chain characters into the local roster. The chain is
/// authoritative for ownership, name, class and generation. Levels never go
/// down: a local level ahead of the chain (earned in play but not yet
/// recorded) is kept along with its XP, while a higher chain level replaces
/// the local one and resets XP progress.
pub fn sync_roster(roster: &mut Roster, characters: &[OnChainCharacter]) -> SyncSummary {
    let mut summary = SyncSummary::default();
    let stale: Vec<u64> = roster
        .characters
        .iter()
        .map(|c| c.token_id)
        .filter(|id| !characters.iter().any(|c| c.token_id == *id))
        .collect();
    for token_id in stale {
        roster.remove(token_id);
        summary.removed += 1;
    }
    for remote in characters {
        let mut merged = remote.to_character();
        match roster.get(remote.token_id) {
            Some(local) => {
                if local.level >= merged.level {
                    merged.level = local.level;
                    merged.xp = local.xp;
                }
                if *local == merged {
                    continue;
                }
                summary.updated += 1;
            }
            None => summary.added += 1,
        }
        roster.upsert(merged);
    }
    if summary != SyncSummary::default() {
        log::debug!(
            "roster sync: {} added, {} updated, {} removed",
            summary.added,
            summary.updated,
            summary.removed
        );
    }
    summary
}

#[derive(Debug, Default)]
struct MockState {
    chain_id: u64,
    accounts: Vec<Address>,
    native: HashMap<Address, u128>,
    tokens: HashMap<Address, u128>,
    characters: BTreeMap<u64, (Address, OnChainCharacter)>,
    next_token_id: u64,
    tx_count: u64,
    reject_next: bool,
}

/// In-memory chain that executes the game's calldata against simple
/// balance and NFT tables.
#[derive(Debug)]
pub struct MockChain {
    config: ChainConfig,
    state: RefCell<MockState>,
}

fn revert(message: &str) -> ChainError {
    ChainError::Rpc {
        code: -32000,
        message: format!("execution reverted: {message}"),
    }
}

impl MockChain {
    #[must_use]
    pub fn new(config: ChainConfig) -> Self {
        let chain_id = config.chain_id;
        Self {
            config,
            state: RefCell::new(MockState {
                chain_id,
                ..MockState::default()
            }),
        }
    }

    /// Expose `account` with native and game-token balances (base units).
    pub fn add_account(&self, account: Address, native: u128, tokens: u128) {
        let mut state = self.state.borrow_mut();
        if !state.accounts.contains(&account) {
            state.accounts.push(account);
        }
        *state.native.entry(account).or_default() += native;
        *state.tokens.entry(account).or_default() += tokens;
    }

    /// Simulate the wallet switching networks.
    pub fn set_chain_id(&self, chain_id: u64) {
        self.state.borrow_mut().chain_id = chain_id;
    }

    /// Make the next write fail as if the user dismissed the prompt.
    pub fn reject_next_write(&self) {
        self.state.borrow_mut().reject_next = true;
    }

    #[must_use]
    pub fn tx_count(&self) -> u64 {
        self.state.borrow().tx_count
    }

    #[must_use]
    pub fn native_balance(&self, account: &Address) -> u128 {
        self.state.borrow().native.get(account).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn token_balance(&self, account: &Address) -> u128 {
        self.state.borrow().tokens.get(account).copied().unwrap_or(0)
    }

    fn token_arg(tokens: &[Token]) -> Result<u64, ChainError> {
        narrow(tokens.first().and_then(Token::as_uint).unwrap_or_default())
    }

    fn execute_read(&self, request: &CallRequest) -> Result<Vec<u8>, ChainError> {
        let calldata = request.calldata()?;
        let (selector, args) = abi::split_selector(&calldata)?;
        let state = self.state.borrow();
        let ret = match selector {
            selectors::BALANCE_OF => {
                let owner = abi::decode(&[ParamKind::Address], args)?[0]
                    .as_address()
                    .unwrap_or_default();
                vec![Token::Uint(state.tokens.get(&owner).copied().unwrap_or(0))]
            }
            selectors::MINT_PRICE => vec![Token::Uint(self.config.mint_price.base_units())],
            selectors::CHARACTERS_OF => {
                let owner = abi::decode(&[ParamKind::Address], args)?[0]
                    .as_address()
                    .unwrap_or_default();
                let ids = state
                    .characters
                    .iter()
                    .filter(|(_, (holder, _))| *holder == owner)
                    .map(|(id, _)| u128::from(*id))
                    .collect();
                vec![Token::UintArray(ids)]
            }
            selectors::GET_CHARACTER | selectors::OWNER_OF => {
                let token_id = Self::token_arg(&abi::decode(&[ParamKind::Uint], args)?)?;
                let (owner, character) = state
                    .characters
                    .get(&token_id)
                    .ok_or(ChainError::UnknownToken(token_id))?;
                if selector == selectors::OWNER_OF {
                    vec![Token::Address(*owner)]
                } else {
                    vec![
                        Token::String(character.name.clone()),
                        Token::Uint(u128::from(character.class.contract_id())),
                        Token::Uint(u128::from(character.level)),
                        Token::Uint(u128::from(character.generation)),
                    ]
                }
            }
            _ => return Err(revert("unknown selector")),
        };
        Ok(abi::encode(&ret))
    }

    fn owned_mut<'a>(
        state: &'a mut MockState,
        from: Address,
        token_id: u64,
    ) -> Result<&'a mut OnChainCharacter, ChainError> {
        let (owner, character) = state
            .characters
            .get_mut(&token_id)
            .ok_or(ChainError::UnknownToken(token_id))?;
        if *owner != from {
            return Err(ChainError::NotOwner(token_id));
        }
        Ok(character)
    }

    fn execute_write(&self, from: Address, request: &CallRequest) -> Result<(), ChainError> {
        let calldata = request.calldata()?;
        let (selector, args) = abi::split_selector(&calldata)?;
        let mut state = self.state.borrow_mut();
        match selector {
            selectors::MINT_CHARACTER => {
                let decoded = abi::decode(&[ParamKind::String, ParamKind::Uint], args)?;
                let name = decoded[0].as_str().unwrap_or_default().to_string();
                let class = decoded[1]
                    .as_uint()
                    .and_then(|id| u8::try_from(id).ok())
                    .and_then(CharacterClass::from_contract_id)
                    .ok_or_else(|| revert("unknown class"))?;
                let price = self.config.mint_price.base_units();
                if request.value.base_units() < price {
                    return Err(revert("mint price not met"));
                }
                let have = state.native.get(&from).copied().unwrap_or(0);
                let need = request.value.base_units();
                if have < need {
                    return Err(ChainError::InsufficientFunds { have, need });
                }
                state.native.insert(from, have - need);
                state.next_token_id += 1;
                let token_id = state.next_token_id;
                state.characters.insert(
                    token_id,
                    (
                        from,
                        OnChainCharacter {
                            token_id,
                            name,
                            class,
                            level: 1,
                            generation: 0,
                        },
                    ),
                );
            }
            selectors::LEVEL_UP => {
                let token_id = Self::token_arg(&abi::decode(&[ParamKind::Uint], args)?)?;
                let character = Self::owned_mut(&mut state, from, token_id)?;
                if character.level >= MAX_LEVEL {
                    return Err(revert("max level"));
                }
                character.level += 1;
            }
            selectors::EVOLVE => {
                let token_id = Self::token_arg(&abi::decode(&[ParamKind::Uint], args)?)?;
                let character = Self::owned_mut(&mut state, from, token_id)?;
                character.generation = character.generation.saturating_add(1);
            }
            selectors::TRANSFER => {
                let decoded = abi::decode(&[ParamKind::Address, ParamKind::Uint], args)?;
                let to = decoded[0].as_address().unwrap_or_default();
                let need = decoded[1].as_uint().unwrap_or_default();
                let have = state.tokens.get(&from).copied().unwrap_or(0);
                if have < need {
                    return Err(ChainError::InsufficientFunds { have, need });
                }
                state.tokens.insert(from, have - need);
                *state.tokens.entry(to).or_default() += need;
            }
            _ => return Err(revert("unknown selector")),
        }
        Ok(())
    }

    fn tx_hash(&self, from: Address, request: &CallRequest, nonce: u64) -> TxHash {
        let mut hasher = Sha256::new();
        hasher.update(from.as_bytes());
        hasher.update(request.data.as_bytes());
        hasher.update(nonce.to_le_bytes());
        hasher.update(self.config.chain_id.to_le_bytes());
        TxHash(hasher.finalize().into())
    }
}

impl ChainClient for MockChain {
    fn config(&self) -> &ChainConfig {
        &self.config
    }

    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        Ok(self.state.borrow().accounts.clone())
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.state.borrow().chain_id)
    }

    async fn read(&self, call: &ReadCall) -> Result<ReadResult, ChainError> {
        let request = call.to_request(&self.config);
        let data = self.execute_read(&request)?;
        decode_read(call, &data)
    }

    async fn write(&self, from: Address, call: &WriteCall) -> Result<TxHash, ChainError> {
        self.ensure_chain().await?;
        if std::mem::take(&mut self.state.borrow_mut().reject_next) {
            return Err(ChainError::Rejected("User rejected the request.".into()));
        }
        let request = call.to_request(&self.config, from);
        self.execute_write(from, &request)?;
        let nonce = {
            let mut state = self.state.borrow_mut();
            state.tx_count += 1;
            state.tx_count
        };
        let hash = self.tx_hash(from, &request, nonce);
        log::debug!("mock tx {hash} from {from}");
        Ok(hash)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use futures::executor::block_on;

    pub(crate) fn config() -> ChainConfig {
        ChainConfig {
            chain_id: 31_337,
            character_contract: "0x00000000000000000000000000000000000000c1".parse().unwrap(),
            token_contract: "0x00000000000000000000000000000000000000e2".parse().unwrap(),
            token_decimals: 18,
            mint_price: TokenAmount::from_base_units(1_000),
        }
    }

    fn player(n: u8) -> Address {
        let mut bytes = [0_u8; 20];
        bytes[0] = n;
        Address::from_bytes(bytes)
    }

    #[test]
    fn requests_target_the_right_contract() {
        let cfg = config();
        let read = ReadCall::TokenBalance { owner: player(1) }.to_request(&cfg);
        assert_eq!(read.to, cfg.token_contract);
        assert!(read.data.starts_with("0x70a08231"));
        assert!(read.from.is_none());

        let mint = WriteCall::MintCharacter {
            name: "Aria".into(),
            class: CharacterClass::Mage,
        }
        .to_request(&cfg, player(1));
        assert_eq!(mint.to, cfg.character_contract);
        assert_eq!(mint.value, cfg.mint_price);
        assert_eq!(mint.from, Some(player(1)));
    }

    #[test]
    fn call_request_serializes_for_rpc() {
        let cfg = config();
        let mint = WriteCall::MintCharacter {
            name: "Aria".into(),
            class: CharacterClass::Mage,
        }
        .to_request(&cfg, player(1));
        let json = serde_json::to_value(&mint).unwrap();
        assert_eq!(json["value"], "0x3e8");
        let read = serde_json::to_value(ReadCall::MintPrice.to_request(&cfg)).unwrap();
        assert!(read.get("value").is_none());
        assert!(read.get("from").is_none());
        assert_eq!(read["data"], "0x6817c76c");
    }

    #[test]
    fn decode_read_rejects_unknown_classes() {
        let data = abi::encode(&[
            Token::String("Odd".into()),
            Token::Uint(9),
            Token::Uint(1),
            Token::Uint(0),
        ]);
        assert!(matches!(
            decode_read(&ReadCall::CharacterOf { token_id: 1 }, &data),
            Err(ChainError::Decode(_))
        ));
    }

    #[test]
    fn mock_mints_levels_and_reads_back() {
        let chain = MockChain::new(config());
        chain.add_account(player(1), 5_000, 0);
        block_on(async {
            let mint = WriteCall::MintCharacter {
                name: "Aria".into(),
                class: CharacterClass::Rogue,
            };
            chain.write(player(1), &mint).await.unwrap();
            chain
                .write(player(1), &WriteCall::LevelUpCharacter { token_id: 1 })
                .await
                .unwrap();
            let characters = chain.characters_of(player(1)).await.unwrap();
            assert_eq!(characters.len(), 1);
            assert_eq!(characters[0].name, "Aria");
            assert_eq!(characters[0].class, CharacterClass::Rogue);
            assert_eq!(characters[0].level, 2);
            assert_eq!(
                chain.read(&ReadCall::OwnerOf { token_id: 1 }).await.unwrap(),
                ReadResult::Owner { owner: player(1) }
            );
        });
        assert_eq!(chain.native_balance(&player(1)), 4_000);
        assert_eq!(chain.tx_count(), 2);
    }

    #[test]
    fn mock_enforces_ownership_and_funds() {
        let chain = MockChain::new(config());
        chain.add_account(player(1), 1_000, 50);
        chain.add_account(player(2), 0, 0);
        block_on(async {
            let mint = WriteCall::MintCharacter {
                name: "Bo".into(),
                class: CharacterClass::Warrior,
            };
            assert_eq!(
                chain.write(player(2), &mint).await,
                Err(ChainError::InsufficientFunds { have: 0, need: 1_000 })
            );
            chain.write(player(1), &mint).await.unwrap();
            assert_eq!(
                chain
                    .write(player(2), &WriteCall::EvolveCharacter { token_id: 1 })
                    .await,
                Err(ChainError::NotOwner(1))
            );
            assert_eq!(
                chain.read(&ReadCall::CharacterOf { token_id: 7 }).await,
                Err(ChainError::UnknownToken(7))
            );
            let transfer = WriteCall::TransferTokens {
                to: player(2),
                amount: TokenAmount::from_base_units(20),
            };
            chain.write(player(1), &transfer).await.unwrap();
            assert_eq!(
                chain.read(&ReadCall::TokenBalance { owner: player(2) }).await,
                Ok(ReadResult::Balance {
                    amount: TokenAmount::from_base_units(20)
                })
            );
        });
        assert_eq!(chain.token_balance(&player(1)), 30);
    }

    #[test]
    fn mock_rejections_and_wrong_chain() {
        let chain = MockChain::new(config());
        chain.add_account(player(1), 0, 10);
        let transfer = WriteCall::TransferTokens {
            to: player(2),
            amount: TokenAmount::from_base_units(1),
        };
        block_on(async {
            chain.reject_next_write();
            assert!(matches!(
                chain.write(player(1), &transfer).await,
                Err(ChainError::Rejected(_))
            ));
            assert!(chain.write(player(1), &transfer).await.is_ok());
            chain.set_chain_id(1);
            assert_eq!(
                chain.write(player(1), &transfer).await,
                Err(ChainError::WrongChain {
                    expected: 31_337,
                    actual: 1
                })
            );
        });
        assert_eq!(chain.tx_count(), 1);
    }

    #[test]
    fn sync_roster_lets_the_chain_win() {
        let mut roster = Roster::default();
        let mut local = Character::new(1, "Aria", CharacterClass::Mage);
        local.xp = 40;
        roster.upsert(local);
        roster.upsert(Character::new(2, "Gone", CharacterClass::Rogue));
        roster.upsert(Character::new(3, "Same", CharacterClass::Ranger));
        let remote = vec![
            OnChainCharacter {
                token_id: 1,
                name: "Aria".into(),
                class: CharacterClass::Mage,
                level: 4,
                generation: 1,
            },
            OnChainCharacter {
                token_id: 3,
                name: "Same".into(),
                class: CharacterClass::Ranger,
                level: 1,
                generation: 0,
            },
            OnChainCharacter {
                token_id: 9,
                name: "Fresh".into(),
                class: CharacterClass::Warrior,
                level: 1,
                generation: 0,
            },
        ];
        let summary = sync_roster(&mut roster, &remote);
        assert_eq!(
            summary,
            SyncSummary {
                added: 1,
                updated: 1,
                removed: 1
            }
        );
        let aria = roster.get(1).unwrap();
        assert_eq!((aria.level, aria.generation, aria.xp), (4, 1, 0));
        assert!(roster.get(2).is_none());
        assert_eq!(roster.get(9).unwrap().name, "Fresh");
        assert_eq!(sync_roster(&mut roster, &remote), SyncSummary::default());
    }

    #[test]
    fn sync_never_lowers_a_local_level() {
        let mut roster = Roster::default();
        let mut local = Character::new(1, "Aria", CharacterClass::Mage);
        local.level = 3;
        local.xp = 120;
        roster.upsert(local);
        let remote = vec![OnChainCharacter {
            token_id: 1,
            name: "Aria".into(),
            class: CharacterClass::Mage,
            level: 2,
            generation: 1,
        }];
        let summary = sync_roster(&mut roster, &remote);
        assert_eq!(summary.updated, 1);
        let aria = roster.get(1).unwrap();
        assert_eq!((aria.level, aria.generation, aria.xp), (3, 1, 120));
        assert_eq!(sync_roster(&mut roster, &remote), SyncSummary::default());
    }

    /// Node that answers every read with a token balance.
    struct MismatchedNode(ChainConfig);

    impl ChainClient for MismatchedNode {
        fn config(&self) -> &ChainConfig {
            &self.0
        }

        async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
            Ok(Vec::new())
        }

        async fn chain_id(&self) -> Result<u64, ChainError> {
            Ok(self.0.chain_id)
        }

        async fn read(&self, call: &ReadCall) -> Result<ReadResult, ChainError> {
            Ok(match call {
                ReadCall::CharactersOfOwner { .. } => ReadResult::TokenIds { ids: vec![1, 2] },
                _ => ReadResult::Balance {
                    amount: TokenAmount::from_base_units(0),
                },
            })
        }

        async fn write(&self, _from: Address, _call: &WriteCall) -> Result<TxHash, ChainError> {
            Err(ChainError::Rejected("read-only".into()))
        }
    }

    #[test]
    fn characters_of_fails_on_mismatched_results() {
        let node = MismatchedNode(config());
        assert_eq!(
            block_on(node.characters_of(player(1))),
            Err(ChainError::UnexpectedResult("getCharacter"))
        );
        assert_eq!(
            block_on(node.character(1)),
            Err(ChainError::UnexpectedResult("getCharacter"))
        );
    }

    #[test]
    fn tx_hash_round_trips_through_text() {
        let hash = TxHash::from_bytes([0xab; 32]);
        let text = hash.to_string();
        assert_eq!(text.len(), 66);
        assert_eq!(text.parse::<TxHash>().unwrap(), hash);
        assert!("0x1234".parse::<TxHash>().is_err());
    }

    #[test]
    fn quantities_parse() {
        assert_eq!(parse_quantity("0x7a69").unwrap(), 31_337);
        assert_eq!(parse_quantity("0x").unwrap(), 0);
        assert!(parse_quantity("0xzz").is_err());
    }
}
