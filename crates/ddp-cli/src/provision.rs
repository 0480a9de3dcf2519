//! `ddp provision` - on-device-generation provisioning run.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use ddp_authority::{Authority, OpensslSigner};
use ddp_provision::{ProvisionConfig, ProvisionWorkflow, SocProfile};

use crate::probe::ProbeArgs;

#[derive(Args)]
pub struct ProvisionArgs {
    /// SoC type (`xg12`, `xg25`, `xg28`).
    #[arg(long)]
    soc: String,

    /// Provisioning application image.
    #[arg(long)]
    prov_img: PathBuf,

    /// Certificate store directory.
    #[arg(long, default_value = "certificates")]
    store_dir: PathBuf,

    #[command(flatten)]
    probe: ProbeArgs,
}

pub fn run(args: ProvisionArgs) -> anyhow::Result<()> {
    let soc = SocProfile::find(&args.soc)
        .with_context(|| format!("{} is not a supported SoC type", args.soc))?;
    let image = std::fs::read(&args.prov_img)
        .with_context(|| format!("reading {}", args.prov_img.display()))?;

    let mut authority = Authority::open(&args.store_dir, OpensslSigner::new())
        .context("opening authority store")?;
    let channel = args.probe.channel(soc.part)?;
    let config = ProvisionConfig::builder()
        .soc(*soc)
        .app_image(image)
        .build()?;

    let mut workflow = ProvisionWorkflow::new(config, channel);
    let report = workflow.run_generation(&mut authority)?;
    tracing::info!(serial = %report.device_serial, "provisioning finished");
    Ok(())
}
