//! Operator CLI for device provisioning.
//!
//! - `ddp authority setup` - build the local PKI (root + batch)
//! - `ddp authority issue` - sign a device certificate request offline
//! - `ddp provision` - full on-device-generation provisioning run
//! - `ddp inject` - inject externally supplied key/certificate material

#![forbid(unsafe_code)]

mod authority;
mod inject;
mod keyfile;
mod probe;
mod provision;

use clap::{Parser, Subcommand};

/// Device provisioning and local certificate authority tooling.
#[derive(Parser)]
#[command(name = "ddp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the local certificate authority.
    Authority(authority::AuthorityArgs),

    /// Provision a device: on-device key generation, certificate issuance
    /// and NVM write-back.
    Provision(provision::ProvisionArgs),

    /// Inject externally supplied key and certificate material into a
    /// device.
    Inject(inject::InjectArgs),
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays clean for command output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Authority(args) => authority::run(args),
        Commands::Provision(args) => provision::run(args),
        Commands::Inject(args) => inject::run(args),
    }
}
