//! `ddp authority` subcommands.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Subcommand};
use ddp_authority::{Authority, AuthorityConfig, DeviceOid, OpensslSigner};

/// Default certificate store directory.
const DEFAULT_STORE_DIR: &str = "certificates";

#[derive(Args)]
pub struct AuthorityArgs {
    #[command(subcommand)]
    command: AuthorityCommands,
}

#[derive(Subcommand)]
enum AuthorityCommands {
    /// Reset the store and generate root and batch material.
    Setup(SetupArgs),

    /// Sign a device certificate request and print the chain as hex.
    Issue(IssueArgs),
}

#[derive(Args)]
struct SetupArgs {
    /// OEM organization name.
    #[arg(long)]
    organization: String,

    /// OEM country code.
    #[arg(long)]
    country: String,

    /// Device OID embedded in issued certificates.
    #[arg(long)]
    oid: String,

    /// Batch identifier.
    #[arg(long)]
    batch: Option<String>,

    /// Certificate store directory.
    #[arg(long, default_value = DEFAULT_STORE_DIR)]
    store_dir: PathBuf,
}

#[derive(Args)]
struct IssueArgs {
    /// Certificate request file (PEM or DER).
    #[arg(long)]
    csr: PathBuf,

    /// Device serial number (hex octets).
    #[arg(long)]
    serial: String,

    /// Certificate store directory.
    #[arg(long, default_value = DEFAULT_STORE_DIR)]
    store_dir: PathBuf,
}

pub fn run(args: AuthorityArgs) -> anyhow::Result<()> {
    match args.command {
        AuthorityCommands::Setup(args) => setup(args),
        AuthorityCommands::Issue(args) => issue(args),
    }
}

fn setup(args: SetupArgs) -> anyhow::Result<()> {
    let mut builder = AuthorityConfig::builder()
        .store_dir(&args.store_dir)
        .organization(args.organization.as_str())
        .country(args.country.as_str());
    if let Some(batch) = &args.batch {
        builder = builder.batch_number(batch.as_str());
    }
    let config = builder.build()?;

    let mut authority = Authority::new(config, OpensslSigner::new());
    authority
        .setup(DeviceOid::new(args.oid))
        .context("authority setup failed")?;
    tracing::info!(store = %args.store_dir.display(), "local PKI ready");
    Ok(())
}

fn issue(args: IssueArgs) -> anyhow::Result<()> {
    let csr = std::fs::read(&args.csr)
        .with_context(|| format!("reading {}", args.csr.display()))?;

    let mut authority = Authority::open(&args.store_dir, OpensslSigner::new())
        .context("opening authority store")?;
    let oid = authority.device_oid()?.clone();
    let chain = authority
        .issue_device_certificate(&oid, &args.serial, &csr)
        .context("issuing device certificate")?;

    println!(
        "OK {} {} {}",
        hex::encode(&chain.device),
        hex::encode(&chain.batch),
        hex::encode(&chain.root)
    );
    Ok(())
}
