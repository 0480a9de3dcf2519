//! `ddp inject` - direct injection of externally supplied material.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use ddp_provision::{InjectionMaterial, ProvisionConfig, ProvisionWorkflow, SocProfile};

use crate::keyfile;
use crate::probe::ProbeArgs;

#[derive(Args)]
pub struct InjectArgs {
    /// SoC type (`xg12`, `xg25`, `xg28`).
    #[arg(long)]
    soc: String,

    /// Provisioning application image.
    #[arg(long)]
    prov_img: PathBuf,

    /// Device private key file (PEM or DER).
    #[arg(long)]
    device_key: Option<PathBuf>,

    /// Device certificate file (DER).
    #[arg(long)]
    device_cert: Option<PathBuf>,

    /// Trusted CA certificate file (DER); may be repeated. NVM slots are
    /// assigned in the order given.
    #[arg(long = "trusted-cert")]
    trusted_certs: Vec<PathBuf>,

    #[command(flatten)]
    probe: ProbeArgs,
}

pub fn run(args: InjectArgs) -> anyhow::Result<()> {
    let soc = SocProfile::find(&args.soc)
        .with_context(|| format!("{} is not a supported SoC type", args.soc))?;
    let image = std::fs::read(&args.prov_img)
        .with_context(|| format!("reading {}", args.prov_img.display()))?;

    let device_key = args
        .device_key
        .as_deref()
        .map(keyfile::load_key_scalar)
        .transpose()?;
    let device_cert = args
        .device_cert
        .as_deref()
        .map(std::fs::read)
        .transpose()
        .context("reading device certificate")?;
    let trusted_certs = args
        .trusted_certs
        .iter()
        .map(std::fs::read)
        .collect::<Result<Vec<_>, _>>()
        .context("reading trusted CA certificates")?;

    let material = InjectionMaterial {
        device_key,
        device_cert,
        trusted_certs,
    };

    let channel = args.probe.channel(soc.part)?;
    let config = ProvisionConfig::builder()
        .soc(*soc)
        .app_image(image)
        .build()?;

    let mut workflow = ProvisionWorkflow::new(config, channel);
    workflow.run_injection(&material)?;
    tracing::info!("injection finished");
    Ok(())
}
