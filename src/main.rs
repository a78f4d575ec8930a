//! # mzChrom
//!
//! Command-line front end of the chromatogram translator.
//!
//! ## Usage
//!
//! ```bash
//! # Translate a scan file (MSn siblings run.ndjson2, ... are picked up)
//! mzchrom translate run.ndjson out/
//!
//! # Inspect the result and extract one m/z
//! mzchrom info out/run.head --mz 760.5851
//!
//! # Generate a synthetic run to try it on
//! mzchrom demo run.ndjson
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
