//! vaultsign CLI - Sign and verify with keys held by a remote KMS.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vaultsign_crypto::codec::PUBLIC_KEY_TAG;
use vaultsign_keystore::VaultKeyStore;
use vaultsign_signature::algorithms::{self, ALGORITHMS};
use vaultsign_signature::{SaltLength, SigningEngine};
use vaultsign_transit::{Client, TransitClient};
use vaultsign_transport_http::config::DEFAULT_ADDRESS;
use vaultsign_transport_http::{HttpTransport, HttpTransportConfig};

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "vaultsign")]
#[command(about = "Sign and verify with transit keys that never leave the KMS")]
#[command(version)]
struct Cli {
    /// KMS address
    #[arg(long, default_value = DEFAULT_ADDRESS, env = "VAULT_ADDR")]
    addr: String,

    /// Authentication token
    #[arg(long, env = "VAULT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Enterprise namespace
    #[arg(long, env = "VAULT_NAMESPACE")]
    namespace: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show KMS health
    Status,
    /// List transit keys
    List,
    /// Show a key's metadata
    Key {
        /// Key name
        name: String,
    },
    /// Sign data and print the base64 signature
    Sign {
        /// Key name
        name: String,
        /// Signature algorithm, e.g. SHA256withECDSA
        #[arg(long, short)]
        algorithm: String,
        /// PSS salt length (auto, hash or a byte count)
        #[arg(long)]
        salt_length: Option<String>,
        /// Input file (stdin if omitted)
        #[arg(long, short)]
        input: Option<PathBuf>,
    },
    /// Verify a base64 signature
    Verify {
        /// Key name
        name: String,
        /// Signature algorithm, e.g. SHA256withECDSA
        #[arg(long, short)]
        algorithm: String,
        /// Base64 signature
        #[arg(long, short)]
        signature: String,
        /// Input file (stdin if omitted)
        #[arg(long, short)]
        input: Option<PathBuf>,
    },
    /// Print the certificate chain of a key as PEM
    Chain {
        /// Key name
        name: String,
    },
    /// List supported algorithms and their aliases
    Algorithms,
}

// ============================================================================
// Setup
// ============================================================================

fn transport(cli: &Cli) -> Result<Arc<HttpTransport>> {
    debug!(
        addr = %cli.addr,
        namespace = ?cli.namespace,
        timeout_secs = cli.timeout,
        "Creating KMS transport"
    );

    let mut config =
        HttpTransportConfig::new(cli.addr.clone()).with_timeout(Duration::from_secs(cli.timeout));
    if let Some(namespace) = &cli.namespace {
        config = config.with_namespace(namespace.clone());
    }

    let transport = HttpTransport::new(&config).context("Failed to create HTTP client")?;
    Ok(Arc::new(transport))
}

/// Opens the key store and checks that the KMS is usable.
async fn open_store(cli: &Cli) -> Result<VaultKeyStore> {
    debug!(authenticated = cli.token.is_some(), "Opening key store");

    let client = TransitClient::new(transport(cli)?);
    let store = VaultKeyStore::new(Arc::new(client));

    store
        .load(cli.token.as_deref())
        .await
        .context("KMS is not ready")?;

    Ok(store)
}

fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
        },
        None => {
            let mut data = Vec::new();
            io::stdin()
                .read_to_end(&mut data)
                .context("Failed to read stdin")?;
            Ok(data)
        },
    }
}

// ============================================================================
// Command Handlers
// ============================================================================

async fn cmd_status(cli: &Cli) -> Result<()> {
    let client = match &cli.token {
        Some(token) => TransitClient::with_token(transport(cli)?, token),
        None => TransitClient::new(transport(cli)?),
    };
    let status = client.status().await.context("Failed to read KMS health")?;

    println!("KMS status:");
    println!("  Address:     {}", cli.addr);
    println!("  Version:     {}", status.version);
    println!("  Initialized: {}", status.initialized);
    println!("  Sealed:      {}", status.sealed);

    Ok(())
}

async fn cmd_list(store: &VaultKeyStore) -> Result<()> {
    let aliases = store.aliases().await.context("Failed to list keys")?;

    if aliases.is_empty() {
        println!("No keys found");
    } else {
        println!("Keys:");
        for alias in &aliases {
            println!("  {}", alias);
        }
    }

    Ok(())
}

async fn cmd_key(store: &VaultKeyStore, name: &str) -> Result<()> {
    let key = store.key(name).await?;
    let caps = key.capabilities();

    println!("Key '{}':", key.name());
    println!("  Type:            {}", key.key_type());
    println!("  Family:          {}", key.family());
    println!("  Latest version:  {}", key.latest_version());
    println!("  Supports signing: {}", caps.supports_signing);
    println!("  Exportable:      {}", caps.exportable);
    println!("  Deletion allowed: {}", caps.deletion_allowed);
    if let Some(period) = key.auto_rotate_period().filter(|p| *p > 0) {
        println!("  Auto-rotate:     {}s", period);
    }

    println!();
    println!("Versions:");
    for version in key.versions() {
        println!(
            "  v{}  created {}  chain: {}",
            version.index,
            version.creation_time.as_deref().unwrap_or("-"),
            if version.certificate_chain.is_some() { "yes" } else { "no" }
        );
    }

    if let Some(date) = store.creation_date(name).await {
        println!();
        println!("Latest created:  {}", date.to_rfc3339());
    }

    println!();
    print!(
        "{}",
        pem::encode(&pem::Pem::new(PUBLIC_KEY_TAG, key.encoded_public_key().to_vec()))
    );

    Ok(())
}

async fn cmd_sign(
    store: &VaultKeyStore,
    name: &str,
    algorithm: &str,
    salt_length: Option<&str>,
    input: Option<&Path>,
) -> Result<()> {
    let mut engine = SigningEngine::for_algorithm(algorithm)?;
    if let Some(salt) = salt_length {
        engine = engine.with_salt_length(salt.parse::<SaltLength>()?);
    }

    let key = store.key(name).await?;
    let data = read_input(input)?;
    debug!(key = %name, algorithm = %engine.algorithm(), bytes = data.len(), "Signing input");

    engine.init_sign(key)?;
    engine.update(&data);
    let signature = engine.sign().await.context("Signing failed")?;

    println!("{}", BASE64.encode(signature));
    Ok(())
}

async fn cmd_verify(
    store: &VaultKeyStore,
    name: &str,
    algorithm: &str,
    signature: &str,
    input: Option<&Path>,
) -> Result<()> {
    let signature = BASE64
        .decode(signature.trim())
        .context("Signature is not valid base64")?;

    let mut engine = SigningEngine::for_algorithm(algorithm)?;
    let key = store.key(name).await?;
    let data = read_input(input)?;
    debug!(key = %name, algorithm = %engine.algorithm(), bytes = data.len(), "Verifying input");

    engine.init_verify(key)?;
    engine.update(&data);

    if engine.verify(&signature).await.context("Verification failed")? {
        println!("Signature is valid");
        Ok(())
    } else {
        bail!("Signature is NOT valid");
    }
}

async fn cmd_chain(store: &VaultKeyStore, name: &str) -> Result<()> {
    let chain = store.certificate_chain(name).await?;

    if chain.is_empty() {
        eprintln!("Key '{}' has no certificate chain", name);
    }
    for certificate in &chain {
        print!("{}", certificate.to_pem());
    }

    Ok(())
}

fn cmd_algorithms() {
    println!("Algorithms:");
    for alg in ALGORITHMS {
        let name = alg.name();
        let aliases: Vec<&str> = algorithms::aliases_of(&name).collect();
        if aliases.is_empty() {
            println!("  {}", name);
        } else {
            println!("  {}  ({})", name, aliases.join(", "));
        }
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Status => cmd_status(&cli).await,
        Commands::Algorithms => {
            cmd_algorithms();
            Ok(())
        },
        command => {
            let store = open_store(&cli).await?;
            match command {
                Commands::List => cmd_list(&store).await,
                Commands::Key { name } => cmd_key(&store, name).await,
                Commands::Sign {
                    name,
                    algorithm,
                    salt_length,
                    input,
                } => {
                    cmd_sign(
                        &store,
                        name,
                        algorithm,
                        salt_length.as_deref(),
                        input.as_deref(),
                    )
                    .await
                },
                Commands::Verify {
                    name,
                    algorithm,
                    signature,
                    input,
                } => cmd_verify(&store, name, algorithm, signature, input.as_deref()).await,
                Commands::Chain { name } => cmd_chain(&store, name).await,
                Commands::Status | Commands::Algorithms => Ok(()),
            }
        },
    }
}
