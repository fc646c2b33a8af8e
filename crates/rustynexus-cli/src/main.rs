//! create-nxmx: synthesize an NXmx-style detector container.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use rustynexus_nxmx::{build_tree, DetectorGeometry};
use rustynexus_store::H5JsonStore;
use rustynexus_tree::{write_tree, ObjectStore};

/// Write a synthetic NXmx detector entry to a container file.
#[derive(Debug, Parser)]
#[command(name = "create-nxmx", version, about)]
struct Args {
    /// Output container path.
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let args = Args::parse();

    let geometry = DetectorGeometry::default();
    info!(
        frames = geometry.frame_count,
        module = ?geometry.module_size,
        "building detector entry"
    );
    let tree = build_tree(&geometry);

    let mut store = H5JsonStore::create(&args.output);
    write_tree(&tree, &mut store)
        .with_context(|| format!("writing container to {}", args.output.display()))?;
    store
        .close()
        .with_context(|| format!("closing container {}", args.output.display()))?;

    info!(path = %args.output.display(), "container written");
    Ok(())
}
