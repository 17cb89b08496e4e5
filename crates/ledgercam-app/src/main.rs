// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ledgercam — receipt and invoice capture from the command line.
//
// Entry point. Initialises logging, resolves services, and runs one command
// against a photo on disk.

mod commands;
mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use ledgercam_core::human_errors::humanize_error;
use ledgercam_core::types::CaptureTarget;
use ledgercam_core::Quadrilateral;
use ledgercam_document::scan::TextRegion;
use ledgercam_document::scan::trim::DEFAULT_MARGIN;

use services::app_services::AppServices;

/// Detect, straighten, and file photographed documents.
#[derive(Parser)]
#[command(name = "ledgercam", version)]
struct Cli {
    /// Capture configuration file (JSON). Defaults to the data directory's
    /// config.json when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find the document in a photo and print its corners.
    Detect {
        input: PathBuf,

        /// Also write the photo with the detected outline drawn on it.
        #[arg(long)]
        overlay: Option<PathBuf>,
    },

    /// Straighten the document in a photo.
    Rectify {
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Corners as x1,y1,x2,y2,x3,y3,x4,y4 (any order). Detected when omitted.
        #[arg(long, value_parser = commands::parse_corners, allow_hyphen_values = true)]
        corners: Option<Quadrilateral>,
    },

    /// Capture a photo as if taken with the camera, OCR it, and file it.
    Capture {
        input: PathBuf,

        /// receipt, invoice, payment, payment_detail, or cl_payment.
        #[arg(long, default_value = "receipt")]
        target: CaptureTarget,

        /// Owner of the upload.
        #[arg(long)]
        user: u64,

        /// Record date (YYYY-MM-DD). Falls back to the OCR date, then today.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Upload directory. Defaults to the data directory.
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// File holding a recorded OCR collaborator response.
        #[arg(long)]
        ocr_response: Option<PathBuf>,
    },

    /// Crop an image to the given text regions plus a margin.
    Trim {
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Text region as x,y,width,height. Repeatable.
        #[arg(long = "region", required = true)]
        regions: Vec<TextRegion>,

        #[arg(long, default_value_t = DEFAULT_MARGIN)]
        margin: u32,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "Command failed");
            let human = humanize_error(&err);
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ledgercam_core::error::Result<()> {
    let config = cli.config.as_deref();
    match cli.command {
        Command::Detect { input, overlay } => {
            let services = AppServices::init(config, None, None)?;
            commands::detect(&services, &input, overlay.as_deref())
        }
        Command::Rectify {
            input,
            output,
            corners,
        } => {
            let services = AppServices::init(config, None, None)?;
            commands::rectify(&services, &input, &output, corners)
        }
        Command::Capture {
            input,
            target,
            user,
            date,
            out_dir,
            ocr_response,
        } => {
            let services = AppServices::init(config, ocr_response.as_deref(), out_dir)?;
            commands::capture(&services, &input, target, user, date).await
        }
        Command::Trim {
            input,
            output,
            regions,
            margin,
        } => {
            let services = AppServices::init(config, None, None)?;
            commands::trim(&services, &input, &output, &regions, margin)
        }
    }
}
