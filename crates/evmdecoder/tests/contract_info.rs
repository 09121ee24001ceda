use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use evmdecoder::classify::{ContractKind, Standard};
use evmdecoder::rpc::mock::MockTransport;
use evmdecoder::rpc::{JsonRpcError, TransportError};
use evmdecoder::{AbiRepository, Config, DecoderError, EvmDecoder};
use serde_json::{json, Value};

const TOKEN: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
const WALLET: &str = "0x00000000000000000000000000000000000000aa";

const TRANSFER_TOPIC: &str = "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

const TOKEN_ABI: &str = r#"[
    {"type":"function","name":"name","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"string"}]},
    {"type":"function","name":"symbol","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"string"}]},
    {"type":"function","name":"decimals","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"uint8"}]},
    {"type":"function","name":"balanceOf","stateMutability":"view","inputs":[{"name":"owner","type":"address"}],"outputs":[{"name":"","type":"uint256"}]},
    {"type":"event","name":"Transfer","anonymous":false,"inputs":[
        {"name":"from","type":"address","indexed":true},
        {"name":"to","type":"address","indexed":true},
        {"name":"value","type":"uint256","indexed":false}]}
]"#;

fn token_code() -> String {
    format!("0x60806040526306fdde036395d89b4163313ce5676370a082317f{TRANSFER_TOPIC}")
}

fn abi_string(s: &str) -> String {
    let mut data = hex::encode(s);
    while data.len() % 64 != 0 || data.is_empty() {
        data.push('0');
    }
    format!("0x{:064x}{:064x}{data}", 32, s.len())
}

fn revert() -> JsonRpcError {
    JsonRpcError {
        code: 3,
        message: "execution reverted".into(),
        data: None,
    }
}

fn node(method: &str, params: &[Value]) -> Result<Value, JsonRpcError> {
    let first = params.first().cloned().unwrap_or(Value::Null);
    match method {
        "eth_getCode" if first == json!(TOKEN) => Ok(json!(token_code())),
        "eth_getCode" => Ok(json!("0x")),
        "eth_call" => match first["data"].as_str().unwrap_or_default() {
            "0x06fdde03" => Ok(json!(abi_string("USD Coin"))),
            "0x95d89b41" => Ok(json!(abi_string("USDC"))),
            "0x313ce567" => Ok(json!(format!("0x{:064x}", 6))),
            _ => Err(revert()),
        },
        _ => Err(revert()),
    }
}

fn decoder_with(transport: Arc<MockTransport>, config: Config) -> EvmDecoder {
    let mut abis = AbiRepository::new();
    abis.add_abi_json("FiatTokenProxy", TOKEN_ABI, Some(TOKEN)).unwrap();
    EvmDecoder::with_transport(config, transport, abis).unwrap()
}

#[tokio::test]
async fn token_contract_info() {
    let transport = Arc::new(MockTransport::new(node));
    let decoder = decoder_with(transport.clone(), Config::default());

    let info = decoder.contract_info(TOKEN).await.unwrap();
    assert!(info.is_contract);
    assert_eq!(info.contract_name.as_deref(), Some("FiatTokenProxy"));
    assert_eq!(info.fingerprint.as_deref(), decoder.abis().fingerprint_for(TOKEN));

    let contract_type = info.contract_type.as_ref().unwrap();
    assert_eq!(contract_type.name, Some(ContractKind::Token));
    assert_eq!(contract_type.standards, vec![Standard::Erc20]);

    let json = serde_json::to_value(&*info).unwrap();
    assert_eq!(
        json["properties"],
        json!({ "type": "ERC20", "name": "USD Coin", "symbol": "USDC", "decimals": 6 })
    );
    assert_eq!(json["contractType"]["standards"], json!(["ERC20"]));
}

#[tokio::test]
async fn concurrent_lookups_share_one_fetch() {
    let transport = Arc::new(MockTransport::new(node));
    let decoder = decoder_with(transport.clone(), Config::default());

    let (a, b) = tokio::join!(decoder.contract_info(TOKEN), decoder.contract_info(TOKEN));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(transport.count_calls("eth_getCode", &json!(TOKEN)), 1);

    // Served from cache afterwards, whatever the address casing.
    decoder.contract_info(&TOKEN.to_lowercase()).await.unwrap();
    assert_eq!(transport.count_method("eth_getCode"), 1);
}

#[tokio::test]
async fn externally_owned_account() {
    let transport = Arc::new(MockTransport::new(node));
    let decoder = decoder_with(transport.clone(), Config::default());

    let info = decoder.contract_info(WALLET).await.unwrap();
    assert!(!info.is_contract);
    assert_eq!(serde_json::to_value(&*info).unwrap(), json!({ "isContract": false }));

    decoder.contract_info(WALLET).await.unwrap();
    assert_eq!(transport.count_method("eth_getCode"), 1);
    assert_eq!(transport.count_method("eth_call"), 0);
}

#[tokio::test]
async fn failed_lookup_is_not_cached() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let seen = attempts.clone();
    let transport = Arc::new(MockTransport::new(move |method, params| {
        if method == "eth_getCode" && seen.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(JsonRpcError {
                code: -32000,
                message: "header not found".into(),
                data: None,
            });
        }
        node(method, params)
    }));
    let decoder = decoder_with(transport.clone(), Config::default());

    let err = decoder.contract_info(TOKEN).await.unwrap_err();
    assert!(matches!(err, DecoderError::Transport(TransportError::Rpc(_))));

    let info = decoder.contract_info(TOKEN).await.unwrap();
    assert!(info.is_contract);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn property_failure_keeps_classification() {
    let transport = Arc::new(MockTransport::new(|method, params| match method {
        "eth_call" => Err(revert()),
        _ => node(method, params),
    }));
    let decoder = decoder_with(transport, Config::default());

    let info = decoder.contract_info(TOKEN).await.unwrap();
    assert!(info.properties.is_none());
    assert_eq!(
        info.contract_type.as_ref().map(|t| t.standards.clone()),
        Some(vec![Standard::Erc20])
    );
}

#[tokio::test]
async fn zero_capacity_disables_cache() {
    let transport = Arc::new(MockTransport::new(node));
    let mut config = Config::default();
    config.contract_info.max_cache_entries = 0;
    let decoder = decoder_with(transport.clone(), config);

    decoder.contract_info(WALLET).await.unwrap();
    decoder.contract_info(WALLET).await.unwrap();
    assert_eq!(transport.count_method("eth_getCode"), 2);
}

#[tokio::test]
async fn shutdown_aborts_requests() {
    let transport = Arc::new(MockTransport::new(node));
    let decoder = decoder_with(transport.clone(), Config::default());

    decoder.shutdown();
    assert!(decoder.is_shut_down());
    let err = decoder.contract_info(TOKEN).await.unwrap_err();
    assert!(matches!(err, DecoderError::Transport(TransportError::Aborted)));
}

#[tokio::test]
async fn decodes_calls_through_the_facade() {
    let transport = Arc::new(MockTransport::new(node));
    let decoder = decoder_with(transport, Config::default());

    let input = format!("0x70a08231{:0>64}", "83d50977190c592bb9f03054500b1fd81b53dd49");
    let call = decoder.decode_function_call(&input, Some(TOKEN)).await.unwrap();
    assert_eq!(call.signature, "balanceOf(address)");
    assert_eq!(
        call.args.unwrap()["owner"],
        json!("0x83D50977190c592BB9F03054500B1fd81B53Dd49")
    );
}

const NFT: &str = "0xbc4ca0eda7647a8ab7c2061c2e118a18a936f13d";

const NFT_ABI: &str = r#"[
    {"type":"function","name":"name","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"string"}]},
    {"type":"function","name":"symbol","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"string"}]},
    {"type":"function","name":"tokenURI","stateMutability":"view","inputs":[{"name":"tokenId","type":"uint256"}],"outputs":[{"name":"","type":"string"}]},
    {"type":"function","name":"transferFrom","stateMutability":"nonpayable","inputs":[
        {"name":"from","type":"address"},{"name":"to","type":"address"},{"name":"tokenId","type":"uint256"}],"outputs":[]}
]"#;

// Same selector, registered first, so only the bytecode fingerprint can
// pick NFT_ABI over it.
const LEGACY_ABI: &str = r#"[
    {"type":"function","name":"transferFrom","stateMutability":"nonpayable","inputs":[
        {"name":"src","type":"address"},{"name":"dst","type":"address"},{"name":"wad","type":"uint256"}],"outputs":[]}
]"#;

fn nft_node(method: &str, params: &[Value]) -> Result<Value, JsonRpcError> {
    let first = params.first().cloned().unwrap_or(Value::Null);
    match method {
        "eth_getCode" => Ok(json!("0x60806040526380ac58cd6306fdde036395d89b4163c87b56dd6323b872dd")),
        "eth_call" => {
            let data = first["data"].as_str().unwrap_or_default();
            if data == "0x06fdde03" {
                Ok(json!(abi_string("BoredApeYachtClub")))
            } else if data == "0x95d89b41" {
                Ok(json!(abi_string("BAYC")))
            } else if data == format!("0xc87b56dd{:064x}", 7) {
                Ok(json!(abi_string("ipfs://QmeSjSinHpPnmXmspMjwiXyN6zS4E9zccariGR3jxcaWtq/7")))
            } else {
                Err(revert())
            }
        }
        _ => Err(revert()),
    }
}

#[tokio::test]
async fn nft_transfer_resolves_token_uri() {
    let transport = Arc::new(MockTransport::new(nft_node));
    let mut abis = AbiRepository::new();
    abis.add_abi_json("Legacy", LEGACY_ABI, None).unwrap();
    abis.add_abi_json("BoredApeYachtClub", NFT_ABI, None).unwrap();
    let decoder = EvmDecoder::with_transport(Config::default(), transport, abis).unwrap();

    let input = format!(
        "0x23b872dd{:0>64}{:0>64}{:064x}",
        "83d50977190c592bb9f03054500b1fd81b53dd49", "d8da6bf26964af9d7eed9e03e53415d37aa96045", 7
    );
    let call = decoder.decode_function_call(&input, Some(NFT)).await.unwrap();

    assert_eq!(call.signature, "transferFrom(address,address,uint256)");
    assert_eq!(call.params[2].name.as_deref(), Some("tokenId"));
    assert_eq!(
        call.extra["tokenUri"],
        json!("ipfs://QmeSjSinHpPnmXmspMjwiXyN6zS4E9zccariGR3jxcaWtq/7")
    );
    assert_eq!(
        serde_json::to_value(&call).unwrap()["extra"]["tokenUri"],
        json!("ipfs://QmeSjSinHpPnmXmspMjwiXyN6zS4E9zccariGR3jxcaWtq/7")
    );

    let info = decoder.contract_info(NFT).await.unwrap();
    assert_eq!(info.contract_name.as_deref(), Some("BoredApeYachtClub"));
}

#[tokio::test]
async fn non_transfer_calls_carry_no_extra() {
    let transport = Arc::new(MockTransport::new(nft_node));
    let mut abis = AbiRepository::new();
    abis.add_abi_json("BoredApeYachtClub", NFT_ABI, None).unwrap();
    let decoder = EvmDecoder::with_transport(Config::default(), transport, abis).unwrap();

    let call = decoder
        .decode_function_call(&format!("0xc87b56dd{:064x}", 7), Some(NFT))
        .await
        .unwrap();
    assert_eq!(call.signature, "tokenURI(uint256)");
    assert!(call.extra.is_empty());
}
