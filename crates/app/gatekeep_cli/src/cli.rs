use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "gatekeep", version, about = "Gatekeep operator tooling")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the version.
    Version,

    /// Generate an RSA key pair for token signing.
    ///
    /// Writes `private.pem` (PKCS#1) and `public.pem` (SPKI) into `out_dir`.
    Keygen {
        /// Directory to write the key files to.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Modulus size in bits.
        #[arg(long, default_value_t = 2048, value_parser = clap::value_parser!(u32).range(1024..=8192))]
        bits: u32,

        /// Overwrite existing key files.
        #[arg(long)]
        force: bool,
    },
}
