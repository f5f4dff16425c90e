//! Navigator CLI
//!
//! Operator tool for a navigator's data directory:
//!
//! 1. **identity**: print the navigator's public keys, creating the identity
//!    on first run.
//!
//! 2. **trusted**: list, inspect and remove trusted mates.
//!
//! 3. **sign**: sign a message with the navigator identity.
//!
//! 4. **pair-local**: simulate a mate on this machine and walk through a full
//!    pairing, including an encrypted round trip. Useful as a smoke test.
//!
//! Shared secrets never leave the data directory through this tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, eyre, Result, WrapErr};
use navigator_core::crypto::{
    decode_fixed, derive_pairing_code, encode_base64, ExchangeKeyPair, SecureChannel,
    SigningKeyPair, PUBLIC_KEY_SIZE,
};
use navigator_core::{Navigator, NavigatorConfig, PairingEvent, TrustedMate};

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "navigator", version, about = "Navigator pairing and trust management")]
struct Args {
    /// Directory holding navigator_keys.json and trusted_mates.json
    #[arg(long, env = "NAVIGATOR_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Optional TOML configuration file
    #[arg(long, env = "NAVIGATOR_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Lifetime of a pending pairing request in seconds
    #[arg(long, env = "NAVIGATOR_REQUEST_TTL_SECS", global = true)]
    request_ttl_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the navigator identity
    Identity,

    /// Manage trusted mates
    Trusted {
        #[command(subcommand)]
        command: TrustedCommand,
    },

    /// Sign a message and print the base64 signature
    Sign {
        /// Message to sign (UTF-8)
        data: String,
    },

    /// Pair with a mate simulated on this machine
    PairLocal {
        /// Mate display name
        #[arg(long, default_value = "local-mate")]
        name: String,

        /// Mate type
        #[arg(long = "type", default_value = "desktop")]
        mate_type: String,

        /// Keep the mate in the trust store afterwards
        #[arg(long)]
        keep: bool,
    },
}

#[derive(Subcommand, Debug)]
enum TrustedCommand {
    /// List trusted mates
    List,

    /// Show one mate as JSON (shared secret omitted)
    Show {
        /// Mate id
        id: String,
    },

    /// Remove a trusted mate
    Remove {
        /// Mate id
        id: String,
    },
}

// ── Entry Point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    color_eyre::install()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "navigator=info,navigator_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Args::parse())
}

fn run(args: Args) -> Result<()> {
    let config = resolve_config(&args)?;
    let navigator = Navigator::open(config).wrap_err("failed to open navigator")?;

    match args.command {
        Command::Identity => print_identity(&navigator),
        Command::Trusted { command } => run_trusted(&navigator, command)?,
        Command::Sign { data } => println!("{}", navigator.sign(data.as_bytes()).to_base64()),
        Command::PairLocal {
            name,
            mate_type,
            keep,
        } => pair_local(&navigator, &name, &mate_type, keep)?,
    }

    Ok(())
}

/// Build the configuration: flags and env win over the config file, which
/// wins over built-in defaults.
fn resolve_config(args: &Args) -> Result<NavigatorConfig> {
    let mut config = match &args.config {
        Some(path) => NavigatorConfig::load(path)
            .wrap_err_with(|| format!("cannot load config {}", path.display()))?,
        None => NavigatorConfig::with_data_dir(default_data_dir()),
    };

    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(ttl) = args.request_ttl_secs {
        config.pairing.request_ttl_secs = ttl;
    }

    config.validate()?;
    Ok(config)
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("navigator"))
        .unwrap_or_else(|| PathBuf::from(".navigator"))
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn print_identity(navigator: &Navigator) {
    println!("public key:          {}", navigator.public_key());
    println!("exchange public key: {}", navigator.exchange_public_key());
    println!("fingerprint:         {}", navigator.fingerprint());
    println!("data dir:            {}", navigator.config().data_dir.display());
}

fn run_trusted(navigator: &Navigator, command: TrustedCommand) -> Result<()> {
    match command {
        TrustedCommand::List => {
            let mates = navigator.list_trusted();
            if mates.is_empty() {
                println!("no trusted mates");
            }
            for mate in mates {
                println!(
                    "{}  {:<20} {:<10} channel={} last_seen={}",
                    mate.id,
                    mate.name,
                    mate.mate_type,
                    if mate.has_shared_secret() { "yes" } else { "no" },
                    mate.last_seen.to_rfc3339()
                );
            }
        }
        TrustedCommand::Show { id } => {
            let mate = navigator
                .get_trusted(&id)
                .ok_or_else(|| eyre!("no trusted mate with id {}", id))?;
            println!("{}", serde_json::to_string_pretty(&redacted(&mate))?);
        }
        TrustedCommand::Remove { id } => {
            let mate = navigator.remove(&id)?;
            println!("removed {} ({})", mate.name, mate.id);
        }
    }
    Ok(())
}

fn redacted(mate: &TrustedMate) -> serde_json::Value {
    let mut value = serde_json::to_value(mate).unwrap_or_default();
    if let Some(object) = value.as_object_mut() {
        object.remove("shared_secret");
        object.insert(
            "has_shared_secret".into(),
            serde_json::Value::Bool(mate.has_shared_secret()),
        );
    }
    value
}

fn pair_local(navigator: &Navigator, name: &str, mate_type: &str, keep: bool) -> Result<()> {
    let mut events = navigator.subscribe();

    let mate_signing = SigningKeyPair::generate();
    let mate_exchange = ExchangeKeyPair::generate();

    let request = navigator.initiate_pairing(
        name,
        mate_type,
        &encode_base64(mate_signing.public_bytes()),
        Some(&encode_base64(mate_exchange.public_bytes())),
    )?;

    // The mate only knows the navigator's published keys
    let navigator_key: [u8; PUBLIC_KEY_SIZE] = decode_fixed(&navigator.public_key())?;
    let navigator_exchange: [u8; PUBLIC_KEY_SIZE] = decode_fixed(&navigator.exchange_public_key())?;
    let mate_code = derive_pairing_code(&mate_signing.public_bytes(), &navigator_key);

    println!("request:        {}", request.id);
    println!("navigator code: {}", request.pairing_code);
    println!("mate code:      {}", mate_code);
    if mate_code != request.pairing_code {
        navigator.reject(&request.id)?;
        bail!("pairing codes differ, request rejected");
    }

    let trusted = navigator.approve(&request.id)?;
    println!("trusted mate:   {} ({})", trusted.name, trusted.id);

    let navigator_channel = navigator.open_secure_channel(&trusted.id)?;
    let mate_channel =
        SecureChannel::from_shared_secret(&mate_exchange.diffie_hellman(&navigator_exchange)?)?;

    let outbound = navigator_channel.encrypt_string("ping")?;
    let received = mate_channel.decrypt_string(&outbound)?;
    let reply = mate_channel.encrypt_string(&format!("{} ack", received))?;
    println!("round trip:     {}", navigator_channel.decrypt_string(&reply)?);

    while let Ok(event) = events.try_recv() {
        match event {
            PairingEvent::Requested(r) => println!("event:          requested {}", r.id),
            PairingEvent::Approved { mate_id, .. } => println!("event:          approved {}", mate_id),
            PairingEvent::Rejected { request_id } => println!("event:          rejected {}", request_id),
            PairingEvent::Expired { request_id } => println!("event:          expired {}", request_id),
        }
    }

    if !keep {
        navigator.remove(&trusted.id)?;
        println!("removed local mate (use --keep to retain it)");
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
