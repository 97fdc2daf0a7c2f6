use checkout_engine::application::session::CheckoutSession;
use checkout_engine::config::CheckoutConfig;
use checkout_engine::infrastructure::in_memory::{CartFixture, InMemoryBackend};
use checkout_engine::interfaces::csv::signal_reader::SignalReader;
use checkout_engine::interfaces::json::report_writer::ReportWriter;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// CSV script of shopper signals (`signal,value`)
    input: PathBuf,

    /// JSON cart fixture for the in-memory backend
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// JSON engine configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run the session as an authenticated shopper
    #[arg(long)]
    signed_in: bool,

    /// Comma separated payment method codes to hide
    #[arg(long, env = "CHECKOUT_DISABLED_PAYMENTS")]
    disabled_payments: Option<String>,

    /// Log filter, used when RUST_LOG is not set
    #[arg(long, default_value = "info,checkout_engine=debug")]
    log_filter: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_filter)))
        .init();

    let mut config = CheckoutConfig::load(cli.config.as_deref()).into_diagnostic()?;
    if let Some(raw) = cli.disabled_payments.as_deref() {
        config = config.with_disabled_payments(raw);
    }
    let fixture = match cli.fixture.as_deref() {
        Some(path) => CartFixture::load(path).into_diagnostic()?,
        None => CartFixture::default(),
    };

    let backend = InMemoryBackend::seeded(fixture).await;
    let session = CheckoutSession::new(backend.collaborators(), config);
    session.set_signed_in(cli.signed_in).await;

    // Replay signals
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = SignalReader::new(file);
    for signal in reader.signals() {
        match signal {
            Ok(signal) => signal.apply(&session).await,
            Err(e) => {
                warn!(error = %e, "Error reading signal");
            }
        }
    }
    session.wait_for_placement().await;

    // Output the journal and the final state
    let entries = backend.journal.entries().await;
    let view = session.view().await;
    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_entries(&entries).into_diagnostic()?;
    writer.write_summary(&view).into_diagnostic()?;

    Ok(())
}
