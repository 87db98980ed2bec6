//! auto-pvs1 main executable

use auto_pvs1::{batch, classify, common};
use clap::{Parser, Subcommand};
use console::{Emoji, Term};

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "PVS1 strength prediction",
    long_about = "Predict the ACMG/AMP PVS1 strength of loss-of-function variants"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Classify a single variant.
    Classify(classify::Args),
    /// Classify variants from a TSV file.
    Batch(batch::Args),
}

/// Install a global tracing subscriber according to `args`.
///
/// The subscriber is global so that events from rayon workers are kept.
fn init_tracing(args: &common::Args) -> Result<(), anyhow::Error> {
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_max_level(match args.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();
    tracing::subscriber::set_global_default(collector)?;
    Ok(())
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    init_tracing(&cli.common)?;

    let term = Term::stderr();
    match &cli.command {
        Commands::Classify(args) => classify::run(&cli.common, args)?,
        Commands::Batch(args) => batch::run(&cli.common, args)?,
    }
    term.write_line(&format!("All done. Have a nice day!{}", Emoji(" 😃", "")))?;

    Ok(())
}

#[cfg(test)]
mod test {
    use tracing::subscriber::NoSubscriber;

    use super::*;

    #[test]
    fn subscriber_reaches_worker_threads() -> Result<(), anyhow::Error> {
        init_tracing(&common::Args::default())?;
        let worker_has_subscriber = std::thread::spawn(|| {
            tracing::dispatcher::get_default(|dispatch| !dispatch.is::<NoSubscriber>())
        })
        .join()
        .unwrap();
        assert!(worker_has_subscriber);
        Ok(())
    }
}
