//! evmdecoder CLI: inspect contracts and decode call data from the terminal.
//!
//! Usage:
//! ```bash
//! # Classify a contract and read its token properties
//! evmdecoder info --url http://localhost:8545 --address 0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48
//!
//! # Decode transaction input against an ABI file
//! evmdecoder decode --abi disperse.json --input 0xe63d38ed...
//!
//! # Decode against the classified contract, resolving NFT token URIs
//! evmdecoder decode --url http://localhost:8545 --to 0xBC4C... --abi erc721.json --input 0x23b872dd...
//! ```

use std::env;
use std::fs;
use std::path::Path;
use std::process;

use evmdecoder::{init_tracing, AbiRepository, Config, EvmDecoder};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "info" => cmd_info(&args[2..]).await,
        "decode" => cmd_decode(&args[2..]).await,
        "version" | "--version" | "-V" => {
            println!("evmdecoder {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("evmdecoder {}", env!("CARGO_PKG_VERSION"));
    println!("Inspect Ethereum contracts and decode call data\n");
    println!("USAGE:");
    println!("    evmdecoder <COMMAND>\n");
    println!("COMMANDS:");
    println!("    info       Classify a contract (standards, proxies, token properties)");
    println!("    decode     Decode transaction input against ABI files");
    println!("    version    Print version");
    println!("    help       Print this help\n");
    println!("INFO FLAGS:");
    println!("    --url <URL>        RPC endpoint URL  [required unless set in --config]");
    println!("    --address <ADDR>   Contract address  [required]");
    println!("    --config <FILE>    JSON config file");
    println!("    --abi <FILE>       ABI file used for contract names (repeatable)");
    println!("    --bind             Bind the --abi files to --address\n");
    println!("DECODE FLAGS:");
    println!("    --abi <FILE>       ABI JSON file  [required, repeatable]");
    println!("    --input <HEX>      Transaction input  [required]");
    println!("    --to <ADDR>        Contract address of the call");
    println!("    --bind             Bind the --abi files to --to");
    println!("    --url <URL>        RPC endpoint; with --to, decodes against the classified contract");
    println!("    --config <FILE>    JSON config file");
}

async fn cmd_info(args: &[String]) -> Result<(), String> {
    let address = parse_flag(args, "--address").ok_or("--address is required")?;
    let config = load_config(args)?;
    if config.eth.url.is_empty() {
        return Err("--url is required".into());
    }
    init_tracing(&config.log);

    let abis = load_abis(args, &address)?;
    let decoder = EvmDecoder::new(config, abis).map_err(|e| e.to_string())?;
    tracing::debug!(%address, "fetching contract info");
    let info = decoder
        .contract_info(&address)
        .await
        .map_err(|e| e.to_string())?;
    decoder.shutdown();

    println!("{}", serde_json::to_string_pretty(&*info).unwrap_or_default());
    Ok(())
}

async fn cmd_decode(args: &[String]) -> Result<(), String> {
    let input = parse_flag(args, "--input").ok_or("--input is required")?;
    let to = parse_flag(args, "--to");
    let abis = load_abis(args, to.as_deref().unwrap_or_default())?;
    if abis.is_empty() {
        return Err("--abi is required".into());
    }

    let config = load_config(args)?;
    let call = match to.as_deref() {
        Some(address) if !config.eth.url.is_empty() => {
            init_tracing(&config.log);
            let decoder = EvmDecoder::new(config, abis).map_err(|e| e.to_string())?;
            let call = decoder.decode_function_call(&input, Some(address)).await;
            decoder.shutdown();
            call
        }
        _ => abis.decode_function_call(&input, to.as_deref(), None),
    }
    .map_err(|e| e.to_string())?;
    println!("{}", serde_json::to_string_pretty(&call).unwrap_or_default());
    Ok(())
}

/// `--config` file if given, with `--url` layered on top.
fn load_config(args: &[String]) -> Result<Config, String> {
    let mut config = match parse_flag(args, "--config") {
        Some(path) => Config::from_file(&path).map_err(|e| e.to_string())?,
        None => Config::default(),
    };
    if let Some(url) = parse_flag(args, "--url") {
        config.eth.url = url;
    }
    Ok(config)
}

/// Every `--abi` file, named after its file stem and bound to `address`
/// when `--bind` is given.
fn load_abis(args: &[String], address: &str) -> Result<AbiRepository, String> {
    let bind = args.iter().any(|a| a == "--bind") && !address.is_empty();
    let mut abis = AbiRepository::new();
    for path in parse_flags(args, "--abi") {
        let json = fs::read_to_string(&path).map_err(|e| format!("{path}: {e}"))?;
        let name = Path::new(&path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown");
        abis.add_abi_json(name, &json, bind.then_some(address))
            .map_err(|e| e.to_string())?;
    }
    Ok(abis)
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}

fn parse_flags(args: &[String], flag: &str) -> Vec<String> {
    args.windows(2)
        .filter(|w| w[0] == flag)
        .map(|w| w[1].clone())
        .collect()
}
