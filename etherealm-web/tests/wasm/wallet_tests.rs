use etherealm_game::{ChainClient, ChainError, GameData, ReadCall, ReadResult, TokenAmount};
use etherealm_web::Eip1193Client;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

/// Minimal injected provider answering the calls the game makes.
fn fake_provider() -> JsValue {
    js_sys::eval(
        r#"({
            request: async ({ method, params }) => {
                switch (method) {
                    case "eth_accounts": return ["0x00000000000000000000000000000000000000AA"];
                    case "eth_chainId": return "0x7a69";
                    case "eth_call": return "0x" + "0".repeat(49) + "2386f26fc10000".padStart(15, "0");
                    case "eth_sendTransaction": throw { code: 4001, message: "User rejected the request." };
                    default: throw { code: -32601, message: "unsupported " + method };
                }
            }
        })"#,
    )
    .expect("provider script")
}

#[wasm_bindgen_test]
async fn provider_answers_decode() {
    let client = Eip1193Client::new(fake_provider(), GameData::builtin().chain);
    let accounts = client.accounts().await.unwrap();
    assert_eq!(accounts[0].to_string(), "0x00000000000000000000000000000000000000aa");
    assert_eq!(client.chain_id().await.unwrap(), 31_337);
    client.ensure_chain().await.unwrap();
    assert_eq!(
        client.read(&ReadCall::MintPrice).await.unwrap(),
        ReadResult::MintPrice {
            price: TokenAmount::from_base_units(10_000_000_000_000_000)
        }
    );
}

#[wasm_bindgen_test]
async fn dismissed_transactions_surface_as_rejections() {
    let client = Eip1193Client::new(fake_provider(), GameData::builtin().chain);
    let from = client.accounts().await.unwrap()[0];
    let err = client
        .write(
            from,
            &etherealm_game::WriteCall::LevelUpCharacter { token_id: 1 },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ChainError::Rejected(_)));
}
