//! gsup CLI
//!
//! Uploads a local file to the configured GCS bucket via gsutil,
//! bootstrapping the tool on first use. This binary is presentation only:
//! it parses arguments, asks for install consent, renders the core's
//! progress updates, and maps errors to the process exit code.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use gsup_core::{
    Config, Error, Orchestrator, ProgressReporter, UploadEvent, UploadOutcome, Visibility,
    FATAL_EXIT_CODE, SPAWN_FAILURE_CODE,
};

#[derive(Debug, Parser)]
#[command(name = "gsup", version, about = "Upload a file to a GCS bucket via gsutil")]
struct Args {
    /// File to upload.
    file: PathBuf,

    /// Make the uploaded object publicly readable (default: private).
    #[arg(long)]
    public: bool,

    /// Install gsutil without asking when it is missing.
    #[arg(long, short = 'y')]
    yes: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gsup=info".parse().expect("valid directive")),
        )
        .with_writer(io::stderr)
        .init();

    tracing::info!("Starting gsup v{}", gsup_core::VERSION);

    let args = Args::parse();

    // Single top-level handler: the core never terminates the process;
    // every fatal error funnels through here and exits with 111.
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("gsup: {:#}", e);
            ExitCode::from(FATAL_EXIT_CODE)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::from_env().map_err(|e| {
        anyhow::anyhow!(e).context(format!(
            "set the {} environment variable to the name of your bucket",
            gsup_core::BUCKET_ENV_VAR
        ))
    })?;

    let mut session = Orchestrator::new(config);

    if !session.tool_available() {
        eprintln!("You don't have 'gsutil' installed.");
        if !(args.yes || confirm("Install gsutil?")?) {
            return Err(Error::InstallDeclined.into());
        }

        session.install_tool().await?;
        eprintln!(
            "Installation was successful. Open a shell and run \"gsutil config\" to authenticate."
        );

        if !session.tool_available() {
            return Err(Error::ToolNotFound.into());
        }
    }

    if !args.file.is_file() {
        anyhow::bail!("not a regular file: {}", args.file.display());
    }

    let visibility = if args.public {
        Visibility::Public
    } else {
        Visibility::Private
    };

    let mut events = session
        .start_upload(&args.file, visibility)?
        .context("no upload was started")?;

    let mut reporter = ProgressReporter::new();
    let mut outcome = None;

    while let Some(event) = events.recv().await {
        session.observe(&event);
        let update = reporter.on_event(&event);
        eprintln!("{}", update.message);

        if let UploadEvent::Finished(terminal) = event {
            outcome = Some(terminal);
            break;
        }
    }

    match outcome.context("upload ended without a terminal outcome")? {
        UploadOutcome::Succeeded { public_link } => {
            if let Some(link) = public_link {
                println!("{}", link);
            }
            Ok(())
        }
        UploadOutcome::Failed {
            exit_code,
            captured_output,
        } => {
            if !captured_output.is_empty() {
                eprintln!("{}", captured_output.trim_end());
            }
            if exit_code == SPAWN_FAILURE_CODE {
                Err(Error::ProcessSpawnFailed(captured_output).into())
            } else {
                Err(Error::UploadNonZeroExit { code: exit_code }.into())
            }
        }
    }
}

/// Asks a yes/no question on the terminal. Defaults to "no".
fn confirm(prompt: &str) -> io::Result<bool> {
    eprint!("{} [y/N] ", prompt);
    io::stderr().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
}
