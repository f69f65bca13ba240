use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sealzip::cli::{
    handle_config, handle_decrypt, handle_encrypt, handle_history, handle_keygen, handle_open,
    handle_pack, handle_seal, handle_unpack, AppContext, EncryptFlags, KeygenArgs,
};
use sealzip::config::{SealPaths, Settings};
use sealzip::SealError;

/// Environment variable holding a tracing filter directive
const LOG_ENV: &str = "SEALZIP_LOG";

#[derive(Parser)]
#[command(
    name = "sealzip",
    version,
    about = "Zip a directory and encrypt it to an OpenPGP key",
    long_about = "sealzip packs a directory into a zip archive and encrypts it to the \
                  holder of an OpenPGP public key, and reverses both steps with the \
                  matching secret key."
)]
struct Cli {
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Zip a directory tree into an archive
    Pack {
        /// Directory to pack
        source_dir: PathBuf,
        /// Archive file to write
        archive: PathBuf,
    },

    /// Extract a zip archive into a directory
    Unpack {
        archive: PathBuf,
        dest_dir: PathBuf,
    },

    /// Encrypt a file to a public key
    Encrypt {
        input: PathBuf,
        output: PathBuf,
        /// Public key ring (binary or armored)
        public_key: PathBuf,
        #[command(flatten)]
        flags: EncryptFlags,
    },

    /// Decrypt a file with a secret key
    Decrypt {
        input: PathBuf,
        /// Secret key ring (binary or armored)
        private_key: PathBuf,
        /// Secret key passphrase, or "-" to be prompted
        passphrase: String,
        output: PathBuf,
    },

    /// Pack a directory and encrypt the archive
    Seal {
        source_dir: PathBuf,
        output: PathBuf,
        public_key: PathBuf,
        #[command(flatten)]
        flags: EncryptFlags,
    },

    /// Decrypt a sealed archive and extract it
    Open {
        input: PathBuf,
        private_key: PathBuf,
        /// Secret key passphrase, or "-" to be prompted
        passphrase: String,
        dest_dir: PathBuf,
    },

    /// Generate an OpenPGP key pair
    Keygen(KeygenArgs),

    /// Show current configuration and paths
    Config {
        /// Write a settings file with the defaults
        #[arg(long)]
        init: bool,
    },

    /// Show recent operations from the journal
    History {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "20")]
        count: usize,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let (kind, code) = err
                .downcast_ref::<SealError>()
                .map(|e| (e.kind(), e.exit_code()))
                .unwrap_or(("Error", 1));
            eprintln!("error[{}]: {:#}", kind, err);
            ExitCode::from(code)
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    // Initialize paths and settings
    let paths = SealPaths::new()?;
    let settings = Settings::load_or_default(&paths)?;
    let ctx = AppContext::new(paths, settings);

    match cli.command {
        Commands::Pack {
            source_dir,
            archive,
        } => handle_pack(&ctx, &source_dir, &archive)?,
        Commands::Unpack { archive, dest_dir } => handle_unpack(&ctx, &archive, &dest_dir)?,
        Commands::Encrypt {
            input,
            output,
            public_key,
            flags,
        } => handle_encrypt(&ctx, &input, &output, &public_key, &flags)?,
        Commands::Decrypt {
            input,
            private_key,
            passphrase,
            output,
        } => handle_decrypt(&ctx, &input, &private_key, &passphrase, &output)?,
        Commands::Seal {
            source_dir,
            output,
            public_key,
            flags,
        } => handle_seal(&ctx, &source_dir, &output, &public_key, &flags)?,
        Commands::Open {
            input,
            private_key,
            passphrase,
            dest_dir,
        } => handle_open(&ctx, &input, &private_key, &passphrase, &dest_dir)?,
        Commands::Keygen(args) => handle_keygen(&ctx, &args)?,
        Commands::Config { init } => handle_config(&ctx, init)?,
        Commands::History { count } => handle_history(&ctx, count)?,
    }

    Ok(())
}
