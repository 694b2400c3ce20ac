use clap::Parser;
use proxmox_mcp_crypt::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::GenerateKey { ref output, force } => {
            proxmox_mcp_crypt::cli::commands::generate_key::execute(output.as_deref(), force)
        }
        Commands::Encrypt {
            ref config,
            ref output,
        } => proxmox_mcp_crypt::cli::commands::encrypt::execute(config, output.as_deref()),
        Commands::Status { ref config } => {
            proxmox_mcp_crypt::cli::commands::status::execute(&cli, config)
        }
        Commands::Check { ref config } => {
            proxmox_mcp_crypt::cli::commands::check::execute(&cli, config.as_deref())
        }
        Commands::Rotate {
            ref config,
            ref new_key_file,
            allow_same_key,
        } => proxmox_mcp_crypt::cli::commands::rotate::execute(
            &cli,
            config,
            new_key_file.as_deref(),
            allow_same_key,
        ),
        Commands::RotateAll {
            ref dir,
            ref new_key_file,
            allow_same_key,
            yes,
        } => proxmox_mcp_crypt::cli::commands::rotate_all::execute(
            &cli,
            dir,
            new_key_file.as_deref(),
            allow_same_key,
            yes,
        ),
    };

    if let Err(e) = result {
        proxmox_mcp_crypt::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Log to stderr so stdout stays clean for command output.
/// `--verbose` wins over `RUST_LOG`; otherwise only warnings show.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
