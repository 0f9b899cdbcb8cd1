//! `window.ethereum` (EIP-1193) chain client.
//!
//! Every call goes through the provider's `request({ method, params })`
//! promise. Provider errors carry a numeric `code`; 4001 means the player
//! dismissed the wallet prompt and maps to [`ChainError::Rejected`].
use etherealm_game::address::from_hex;
use etherealm_game::chain::parse_quantity;
use etherealm_game::{
    AbiError, Address, CallRequest, ChainClient, ChainConfig, ChainError, ReadCall, ReadResult,
    TxHash, WriteCall, decode_read,
};
use js_sys::{Function, Promise, Reflect};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::dom;

pub const USER_REJECTED: i64 = 4001;
pub const DISCONNECTED: i64 = 4900;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

/// Argument object for `provider.request`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcRequest<'a> {
    pub method: &'a str,
    pub params: Value,
}

/// Map a provider error code and message onto the core error type.
#[must_use]
pub fn rpc_error(code: Option<i64>, message: String) -> ChainError {
    match code {
        Some(USER_REJECTED) => ChainError::Rejected(message),
        Some(code) => ChainError::Rpc { code, message },
        None => ChainError::Rpc {
            code: INTERNAL_ERROR,
            message,
        },
    }
}

fn js_rpc_error(err: &JsValue) -> ChainError {
    #[allow(clippy::cast_possible_truncation)]
    let code = dom::number_field(err, "code").map(|c| c as i64);
    rpc_error(code, dom::js_error_message(err))
}

fn encode_error(err: impl std::fmt::Display) -> ChainError {
    ChainError::Rpc {
        code: INVALID_PARAMS,
        message: err.to_string(),
    }
}

/// `eth_call` params: the call object pinned to the latest block.
///
/// # Errors
/// Returns an error if the request cannot be serialized.
pub fn call_params(request: &CallRequest) -> Result<Value, ChainError> {
    let request = serde_json::to_value(request).map_err(encode_error)?;
    Ok(Value::Array(vec![request, Value::from("latest")]))
}

/// `eth_sendTransaction` params.
///
/// # Errors
/// Returns an error if the request cannot be serialized.
pub fn send_params(request: &CallRequest) -> Result<Value, ChainError> {
    let request = serde_json::to_value(request).map_err(encode_error)?;
    Ok(Value::Array(vec![request]))
}

/// `wallet_switchEthereumChain` params for the configured deployment.
#[must_use]
pub fn switch_chain_params(config: &ChainConfig) -> Value {
    serde_json::json!([{ "chainId": config.chain_id_hex() }])
}

/// Parse the account list a wallet returns.
///
/// # Errors
/// Returns `Decode` if any entry is not a 20-byte hex address.
pub fn parse_accounts(raw: &[String]) -> Result<Vec<Address>, ChainError> {
    raw.iter()
        .map(|account| account.parse::<Address>().map_err(ChainError::from))
        .collect()
}

/// Parse an `eth_chainId` answer.
///
/// # Errors
/// Returns `Decode` for malformed or oversized quantities.
pub fn parse_chain_id(raw: &str) -> Result<u64, ChainError> {
    u64::try_from(parse_quantity(raw)?).map_err(|_| ChainError::Decode(AbiError::Overflow))
}

/// Chain client backed by the injected browser wallet.
#[derive(Debug, Clone)]
pub struct Eip1193Client {
    provider: JsValue,
    config: ChainConfig,
}

impl Eip1193Client {
    #[must_use]
    pub const fn new(provider: JsValue, config: ChainConfig) -> Self {
        Self { provider, config }
    }

    /// Bind to `window.ethereum`.
    ///
    /// # Errors
    /// Returns an RPC `4900` error when no wallet has injected a provider.
    pub fn from_window(config: ChainConfig) -> Result<Self, ChainError> {
        let missing = || rpc_error(Some(DISCONNECTED), "no wallet provider found".to_string());
        let window = dom::window().ok_or_else(missing)?;
        let provider = Reflect::get(&window, &JsValue::from_str("ethereum")).map_err(|err| js_rpc_error(&err))?;
        if provider.is_undefined() || provider.is_null() {
            return Err(missing());
        }
        Ok(Self::new(provider, config))
    }

    /// Send one RPC request and deserialize its result.
    ///
    /// # Errors
    /// Returns the provider's error, mapped through [`rpc_error`], or a
    /// decode error when the result has an unexpected shape.
    #[allow(clippy::future_not_send)] // Wasm futures rely on `JsFuture`, which is not `Send`.
    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ChainError> {
        log::debug!("rpc {method}");
        let args = RpcRequest { method, params }
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(encode_error)?;
        let request = Reflect::get(&self.provider, &JsValue::from_str("request"))
            .map_err(|err| js_rpc_error(&err))?
            .dyn_into::<Function>()
            .map_err(|_| rpc_error(Some(DISCONNECTED), "provider has no request()".to_string()))?;
        let pending = request
            .call1(&self.provider, &args)
            .map_err(|err| js_rpc_error(&err))?;
        let value = JsFuture::from(Promise::resolve(&pending))
            .await
            .map_err(|err| js_rpc_error(&err))?;
        serde_wasm_bindgen::from_value(value).map_err(|err| ChainError::Rpc {
            code: INTERNAL_ERROR,
            message: format!("unexpected {method} result: {err}"),
        })
    }

    /// Prompt the wallet to expose accounts (`eth_requestAccounts`).
    ///
    /// # Errors
    /// Returns `Rejected` when the player dismisses the prompt.
    #[allow(clippy::future_not_send)]
    pub async fn request_accounts(&self) -> Result<Vec<Address>, ChainError> {
        let raw: Vec<String> = self.request("eth_requestAccounts", Value::Array(Vec::new())).await?;
        parse_accounts(&raw)
    }

    /// Ask the wallet to switch to the configured chain.
    ///
    /// # Errors
    /// Returns the provider error; wallets answer 4902 for unknown chains.
    #[allow(clippy::future_not_send)]
    pub async fn switch_chain(&self) -> Result<(), ChainError> {
        let _: Value = self
            .request("wallet_switchEthereumChain", switch_chain_params(&self.config))
            .await?;
        Ok(())
    }
}

impl ChainClient for Eip1193Client {
    fn config(&self) -> &ChainConfig {
        &self.config
    }

    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        let raw: Vec<String> = self.request("eth_accounts", Value::Array(Vec::new())).await?;
        parse_accounts(&raw)
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        let raw: String = self.request("eth_chainId", Value::Array(Vec::new())).await?;
        parse_chain_id(&raw)
    }

    async fn read(&self, call: &ReadCall) -> Result<ReadResult, ChainError> {
        let request = call.to_request(&self.config);
        let raw: String = self.request("eth_call", call_params(&request)?).await?;
        decode_read(call, &from_hex(&raw)?)
    }

    async fn write(&self, from: Address, call: &WriteCall) -> Result<TxHash, ChainError> {
        self.ensure_chain().await?;
        let request = call.to_request(&self.config, from);
        let raw: String = self.request("eth_sendTransaction", send_params(&request)?).await?;
        let hash = raw.parse::<TxHash>()?;
        log::info!("sent {hash} from {from}");
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use etherealm_game::{GameData, TokenAmount};

    fn config() -> ChainConfig {
        GameData::builtin().chain
    }

    #[test]
    fn provider_codes_map_to_chain_errors() {
        assert_eq!(
            rpc_error(Some(USER_REJECTED), "denied".into()),
            ChainError::Rejected("denied".into())
        );
        assert_eq!(
            rpc_error(Some(-32000), "reverted".into()),
            ChainError::Rpc {
                code: -32000,
                message: "reverted".into()
            }
        );
        assert!(matches!(
            rpc_error(None, "?".into()),
            ChainError::Rpc {
                code: INTERNAL_ERROR,
                ..
            }
        ));
    }

    #[test]
    fn eth_call_params_pin_latest() {
        let owner: Address = "0x00000000000000000000000000000000000000aa".parse().unwrap();
        let request = ReadCall::TokenBalance { owner }.to_request(&config());
        let params = call_params(&request).unwrap();
        assert_eq!(params[1], "latest");
        assert!(params[0].get("from").is_none());
        assert!(params[0].get("value").is_none());
        assert!(params[0]["data"].as_str().unwrap().starts_with("0x70a08231"));
    }

    #[test]
    fn mint_transactions_carry_the_price() {
        let config = config();
        let from: Address = "0x00000000000000000000000000000000000000bb".parse().unwrap();
        let request = WriteCall::MintCharacter {
            name: "Aria".into(),
            class: etherealm_game::CharacterClass::Mage,
        }
        .to_request(&config, from);
        let params = send_params(&request).unwrap();
        assert_eq!(params.as_array().map(Vec::len), Some(1));
        assert_eq!(params[0]["from"], from.to_string());
        assert_eq!(
            params[0]["value"],
            format!("{:#x}", config.mint_price.base_units())
        );
        assert_ne!(config.mint_price, TokenAmount::ZERO);
    }

    #[test]
    fn wallet_answers_parse() {
        let accounts = parse_accounts(&["0x00000000000000000000000000000000000000Aa".to_string()]).unwrap();
        assert_eq!(accounts[0].to_string(), "0x00000000000000000000000000000000000000aa");
        assert!(parse_accounts(&["0x1234".to_string()]).is_err());
        assert_eq!(parse_chain_id("0x7a69").unwrap(), 31_337);
        assert!(parse_chain_id("0x1ffffffffffffffff").is_err());
        assert!(parse_chain_id("chain").is_err());
        assert_eq!(switch_chain_params(&config())[0]["chainId"], "0x7a69");
    }
}
