//! Enclave Oracle CLI — enclave-side signing and ledger-side verification
//!
//! Commands:
//!   enclave-oracle keygen   — generate the enclave signing key
//!   enclave-oracle pubkey   — print the enclave public key
//!   enclave-oracle message  — print the canonical bytes for a payload
//!   enclave-oracle sign     — sign a payload as the enclave would
//!   enclave-oracle verify   — check a signature against a public key
//!   enclave-oracle ledger   — summarize the ledger snapshot
//!   enclave-oracle config   — write the effective config to disk
//!   enclave-oracle demo     — deploy, attest, register and submit end to end

use enclave_oracle_core::apps::{
    Inference, InferencePayload, Oracle, Weather, WeatherPayload,
};
use enclave_oracle_core::attestation::SimulatedNitroAuthority;
use enclave_oracle_core::config::{OracleConfig, DEFAULT_CONFIG_FILE};
use enclave_oracle_core::intent::{
    canonical_message, verify_with_key, EnclaveSigner, IntentPayload,
};
use enclave_oracle_core::{Address, Ledger, OracleError, Result};
use std::env;

fn print_usage() {
    println!(
        r#"
╔══════════════════════════════════════════════════════════════╗
║        Enclave Oracle v0.1 — attested data on a ledger       ║
║        Capability + Attestation + Intent Signatures          ║
╚══════════════════════════════════════════════════════════════╝

Usage: enclave-oracle <command> [options]

Commands:
  keygen                                                 Generate enclave signing key
  pubkey                                                 Print enclave public key
  message weather <location> <temp> <ts>                 Print canonical message (hex)
  message inference <question> <answer> <file> <ts>
  sign    weather <location> <temp> [ts]                 Sign as the enclave
  sign    inference <question> <answer> <file> [ts]
  verify  weather <pubkey> <location> <temp> <ts> <sig>  Verify a signature
  verify  inference <pubkey> <question> <answer> <file> <ts> <sig>
  ledger                                                 Summarize ledger snapshot
  config                                                 Write effective config file
  demo                                                   Run the end-to-end flow

Environment:
  ENCLAVE_ORACLE_CONFIG   config file (default: enclave-oracle.json)
  RUST_LOG                log filter (default: info)

Examples:
  enclave-oracle keygen
  enclave-oracle sign weather "New York" 18
  enclave-oracle verify weather <pubkey> "New York" 18 1748399400000 <sig>
  enclave-oracle demo
"#
    );
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return;
    }

    let config = match OracleConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("  Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let result = match args[1].as_str() {
        "keygen" => cmd_keygen(&config),
        "pubkey" => cmd_pubkey(&config),
        "message" => cmd_message(&args[2..]),
        "sign" => cmd_sign(&config, &args[2..]),
        "verify" => cmd_verify(&args[2..]),
        "ledger" => cmd_ledger(&config),
        "config" => cmd_config(&config),
        "demo" => cmd_demo(&config),
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("  Error (abort code {}): {}", e.abort_code(), e);
        std::process::exit(1);
    }
}

fn usage_error(usage: &str) -> OracleError {
    OracleError::MalformedPayload(format!("usage: enclave-oracle {}", usage))
}

fn parse_u64(name: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| OracleError::MalformedPayload(format!("{} must be an unsigned integer", name)))
}

fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

fn load_signer(config: &OracleConfig) -> Result<EnclaveSigner> {
    let seed = zeroize::Zeroizing::new(std::fs::read_to_string(&config.key_path)?);
    EnclaveSigner::from_hex(&seed)
}

/// Parsed payload for either application
enum Request {
    Weather(WeatherPayload),
    Inference(InferencePayload),
}

impl Request {
    /// Parse `<kind> <fields...>`; returns the request and the unused tail
    fn parse<'a>(args: &'a [String], usage: &str) -> Result<(Self, &'a [String])> {
        match args.first().map(String::as_str) {
            Some("weather") if args.len() >= 3 => Ok((
                Request::Weather(WeatherPayload {
                    location: args[1].clone(),
                    temperature: parse_u64("temperature", &args[2])?,
                }),
                &args[3..],
            )),
            Some("inference") if args.len() >= 4 => Ok((
                Request::Inference(InferencePayload {
                    question: args[1].clone(),
                    answer: args[2].clone(),
                    filename: args[3].clone(),
                }),
                &args[4..],
            )),
            _ => Err(usage_error(usage)),
        }
    }

    fn message(&self, timestamp_ms: u64) -> Result<Vec<u8>> {
        match self {
            Request::Weather(p) => canonical_message(WeatherPayload::INTENT.tag(), timestamp_ms, p),
            Request::Inference(p) => {
                canonical_message(InferencePayload::INTENT.tag(), timestamp_ms, p)
            }
        }
    }

    fn verify(&self, timestamp_ms: u64, signature: &[u8], public_key: &[u8; 32]) -> Result<bool> {
        Ok(match self {
            Request::Weather(p) => {
                p.validate()?;
                verify_with_key(WeatherPayload::INTENT.tag(), timestamp_ms, p, signature, public_key)
            }
            Request::Inference(p) => {
                p.validate()?;
                verify_with_key(InferencePayload::INTENT.tag(), timestamp_ms, p, signature, public_key)
            }
        })
    }
}

fn cmd_keygen(config: &OracleConfig) -> Result<()> {
    if std::path::Path::new(&config.key_path).exists() {
        eprintln!("  Key already exists at {}; refusing to overwrite", config.key_path);
        return Ok(());
    }
    let signer = EnclaveSigner::generate();
    std::fs::write(&config.key_path, signer.seed_hex().as_str())?;
    println!("\n  Generated enclave key: {}", config.key_path);
    println!("  Public key: {}", signer.public_key_hex());
    Ok(())
}

fn cmd_pubkey(config: &OracleConfig) -> Result<()> {
    let signer = load_signer(config)?;
    println!("{}", signer.public_key_hex());
    Ok(())
}

fn cmd_message(args: &[String]) -> Result<()> {
    const USAGE: &str = "message <weather|inference> <fields...> <ts>";
    let (request, rest) = Request::parse(args, USAGE)?;
    let ts = parse_u64("ts", rest.first().ok_or_else(|| usage_error(USAGE))?)?;
    println!("{}", hex::encode(request.message(ts)?));
    Ok(())
}

fn cmd_sign(config: &OracleConfig, args: &[String]) -> Result<()> {
    const USAGE: &str = "sign <weather|inference> <fields...> [ts]";
    let (request, rest) = Request::parse(args, USAGE)?;
    let ts = match rest.first() {
        Some(s) => parse_u64("ts", s)?,
        None => now_ms(),
    };
    let signer = load_signer(config)?;
    let json = match request {
        Request::Weather(p) => serde_json::to_string_pretty(&signer.sign(p, ts)?)?,
        Request::Inference(p) => serde_json::to_string_pretty(&signer.sign(p, ts)?)?,
    };
    println!("{}", json);
    Ok(())
}

fn cmd_verify(args: &[String]) -> Result<()> {
    const USAGE: &str = "verify <weather|inference> <pubkey> <fields...> <ts> <sig>";
    if args.len() < 2 {
        return Err(usage_error(USAGE));
    }
    let key_bytes = hex::decode(&args[1])
        .map_err(|e| OracleError::MalformedPayload(format!("pubkey hex: {}", e)))?;
    let public_key: [u8; 32] = key_bytes
        .try_into()
        .map_err(|_| OracleError::MalformedPayload("pubkey must be 32 bytes".into()))?;

    let mut fields = vec![args[0].clone()];
    fields.extend_from_slice(&args[2..]);
    let (request, rest) = Request::parse(&fields, USAGE)?;
    if rest.len() < 2 {
        return Err(usage_error(USAGE));
    }
    let ts = parse_u64("ts", &rest[0])?;
    let signature = hex::decode(&rest[1])
        .map_err(|e| OracleError::MalformedPayload(format!("signature hex: {}", e)))?;

    if request.verify(ts, &signature, &public_key)? {
        println!("  VALID");
        Ok(())
    } else {
        Err(OracleError::SignatureInvalid)
    }
}

fn cmd_ledger(config: &OracleConfig) -> Result<()> {
    let ledger = Ledger::open(&config.ledger_path, &config.enclave_name)?;
    println!("\n  {}", ledger.summary());
    println!("  {}", "-".repeat(80));
    for id in ledger_ids(&ledger) {
        if let Some(obj) = ledger.get(&id) {
            println!(
                "  [{}] {:<16} module={} v{} owner={:?}",
                id.short(),
                obj.body.label(),
                obj.module,
                obj.version,
                obj.owner
            );
        }
    }
    Ok(())
}

fn ledger_ids(ledger: &Ledger) -> Vec<enclave_oracle_core::ObjectId> {
    let mut ids: Vec<_> = ledger.objects().map(|(id, _)| *id).collect();
    ids.sort_by_key(|id| ledger.get(id).map(|o| o.created_at));
    ids
}

fn cmd_config(config: &OracleConfig) -> Result<()> {
    let path = env::var(enclave_oracle_core::config::CONFIG_ENV)
        .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    config.save(&path)?;
    println!("  Wrote config to {}", path);
    Ok(())
}

fn cmd_demo(config: &OracleConfig) -> Result<()> {
    println!(
        r#"
╔══════════════════════════════════════════════════════════════╗
║              Enclave Oracle — Full Demo                      ║
║   Capability + Config + Attestation + Weather + Inference    ║
╚══════════════════════════════════════════════════════════════╝
"#
    );

    // Step 1: Deploy
    println!("Step 1: Initialising module and minting capability...");
    println!("{}", "-".repeat(60));
    let mut ledger = Ledger::new(&config.enclave_name);
    if config.freshness_window_ms.is_some() {
        ledger.enable_replay_guard(config.freshness_window_ms);
    }
    let deployer = Address::random();
    let cap = ledger.mint_capability(Oracle::witness(), deployer)?;
    println!("  Capability {} owned by {}", cap.id().short(), deployer);

    // Step 2: Config
    println!("\nStep 2: Creating enclave config...");
    println!("{}", "-".repeat(60));
    let m = config.measurements()?;
    let enclave_config = ledger.create_config(&cap, &config.enclave_name, m.pcr0, m.pcr1, m.pcr2)?;
    println!(
        "  Config {} '{}' pcr0={}...",
        enclave_config.id().short(),
        enclave_config.name,
        &hex::encode(&enclave_config.measurements.pcr0)[..16]
    );

    // Step 3: Enclave boot + attestation
    println!("\nStep 3: Booting enclave and registering attested key...");
    println!("{}", "-".repeat(60));
    let signer = EnclaveSigner::generate();
    let vendor = SimulatedNitroAuthority::generate();
    let boot_ms = now_ms();
    let document = vendor.issue(&enclave_config.measurements, &signer.public_key(), boot_ms)?;
    let identity =
        ledger.register_enclave(&cap, &enclave_config, &document, &vendor.verifier(), boot_ms)?;
    println!("  Enclave key: {}", signer.public_key_hex());
    println!("  Identity {} registered at {}", identity.id().short(), boot_ms);

    // Step 4: Weather
    println!("\nStep 4: Submitting a signed weather reading...");
    println!("{}", "-".repeat(60));
    let caller = Address::random();
    let ts = now_ms();
    let weather = WeatherPayload {
        location: "New York".into(),
        temperature: 18,
    };
    let signed = signer.sign(weather.clone(), ts)?;
    let sig = signed.signature_bytes()?;
    println!("  Signed response: {}", serde_json::to_string(&signed)?);
    let (record_id, record) =
        ledger.submit::<Weather, Oracle>(weather.clone(), ts, &sig, &identity, caller)?;
    println!(
        "  Minted WeatherRecord {} -> {}: {} {}C at {}",
        record_id.short(),
        caller,
        record.location,
        record.temperature,
        record.timestamp_ms
    );

    // Step 5: Inference
    println!("\nStep 5: Submitting a signed model answer...");
    println!("{}", "-".repeat(60));
    let answer = InferencePayload {
        question: "What is the total revenue?".into(),
        answer: "The total revenue is USD 4.2 million".into(),
        filename: "report.csv".into(),
    };
    let signed = signer.sign(answer.clone(), ts)?;
    let (record_id, record) = ledger.submit::<Inference, Oracle>(
        answer,
        ts,
        &signed.signature_bytes()?,
        &identity,
        caller,
    )?;
    println!("  Minted InferenceRecord {}: {}", record_id.short(), record.answer);

    // Step 6: Rejections
    println!("\nStep 6: Rejections...");
    println!("{}", "-".repeat(60));
    let tampered = WeatherPayload {
        temperature: 35,
        ..weather.clone()
    };
    match ledger.submit::<Weather, Oracle>(tampered, ts, &sig, &identity, caller) {
        Ok(_) => println!("  Tampered reading: UNEXPECTEDLY ACCEPTED"),
        Err(e) => println!("  Tampered reading rejected: {}", e),
    }
    let cross = InferencePayload {
        question: weather.location.clone(),
        answer: weather.temperature.to_string(),
        filename: String::new(),
    };
    match ledger.submit::<Inference, Oracle>(cross, ts, &sig, &identity, caller) {
        Ok(_) => println!("  Cross-intent replay: UNEXPECTEDLY ACCEPTED"),
        Err(e) => println!("  Cross-intent replay rejected: {}", e),
    }
    match ledger.submit::<Weather, Oracle>(weather, ts, &sig, &identity, caller) {
        Ok((id, _)) => println!("  Identical resubmission accepted as {} (no replay guard)", id.short()),
        Err(e) => println!("  Identical resubmission rejected: {}", e),
    }

    // Step 7: Persist
    println!("\nStep 7: Saving ledger...");
    println!("{}", "-".repeat(60));
    ledger.save(&config.ledger_path)?;
    println!("  {}", ledger.summary());
    println!("  Saved to {}", config.ledger_path);
    Ok(())
}
