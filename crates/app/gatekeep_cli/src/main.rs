// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use clap::Parser;
use cli::{Cli, Commands};

mod cli;
mod keygen;
mod logging;

fn main() -> Result<()> {
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    logging::init()?;

    let args = Cli::parse();

    match &args.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
        Commands::Keygen {
            out_dir,
            bits,
            force,
        } => {
            log::info!("generating {bits}-bit RSA key pair");
            let pair = keygen::generate(*bits as usize)?;
            let (private_path, public_path) = keygen::write(&pair, out_dir, *force)?;
            log::info!("wrote {}", private_path.display());
            log::info!("wrote {}", public_path.display());
        }
    }

    Ok(())
}
