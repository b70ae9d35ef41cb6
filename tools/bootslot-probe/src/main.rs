// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Boot slot probe tool
//! OWNERS: @tools-team
//! STATUS: Experimental
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Unit tests (argument merging, output format)
//!
//! PUBLIC API:
//!   - CLI: bootslot-probe [--config <toml>] [--mode none|misc|mender]
//!          [--misc-image <file>] [--misc-offset <n>] [--mender-root <dir>]
//!
//! DEPENDENCIES:
//!   - bootslot: decision core and host collaborators
//!   - clap: argument parsing
//!   - env_logger: RUST_LOG-driven diagnostics

use std::path::PathBuf;
use std::process::ExitCode;

use bootslot::{
    select_boot_slot, BootDecision, BootSlotConfig, DirConfigStore, EnvCopy, FileMetadata,
    SelectionMode,
};
use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "bootslot-probe", about = "Print the A/B slot the boot path would select")]
struct Args {
    /// TOML configuration; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    mode: Option<Mode>,
    /// Raw misc partition or image file.
    #[arg(long)]
    misc_image: Option<PathBuf>,
    /// Byte offset of the A/B record inside the misc image.
    #[arg(long)]
    misc_offset: Option<u64>,
    /// Directory holding grub-mender-grubenv/.
    #[arg(long)]
    mender_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    None,
    Misc,
    Mender,
}

impl From<Mode> for SelectionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::None => SelectionMode::None,
            Mode::Misc => SelectionMode::Misc,
            Mode::Mender => SelectionMode::Mender,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let config = match resolve_config(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("bootslot-probe: {err}");
            return ExitCode::from(2);
        }
    };
    let files = match config.mender.mender_files() {
        Ok(files) => files,
        Err(err) => {
            eprintln!("bootslot-probe: {err}");
            return ExitCode::from(2);
        }
    };

    log::debug!("bootslot-probe: mode {:?}", config.mode);
    let mut misc = FileMetadata::new(&config.misc.image, config.misc.offset)
        .with_block_size(config.misc.block_size);
    let mut env = DirConfigStore::new(&config.mender.root);
    let decision =
        select_boot_slot(config.mode, &mut misc, &mut env, &files, config.mender.max_size);
    println!("{}", render(&decision));
    ExitCode::SUCCESS
}

fn resolve_config(args: &Args) -> Result<BootSlotConfig, bootslot::ConfigError> {
    let mut config = match &args.config {
        Some(path) => BootSlotConfig::load(path)?,
        None => BootSlotConfig::default(),
    };
    if let Some(mode) = args.mode {
        config.mode = mode.into();
    }
    if let Some(image) = &args.misc_image {
        config.misc.image = image.clone();
    }
    if let Some(offset) = args.misc_offset {
        config.misc.offset = offset;
    }
    if let Some(root) = &args.mender_root {
        config.mender.root = root.clone();
    }
    config.validate()?;
    Ok(config)
}

fn render(decision: &BootDecision) -> String {
    let mut out = format!("slot={}", decision.index());
    if let Some(diag) = &decision.diagnostic {
        out.push_str(&format!("\ndiagnostic={diag}"));
    }
    for copy in EnvCopy::ALL {
        if let Some(reason) = decision.grubenv.rejection(copy) {
            out.push_str(&format!("\ngrubenv_copy{copy}={reason}"));
        }
    }
    out
}
