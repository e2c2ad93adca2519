//! VajraShare terminal client
//!
//! Register an identity, send files to other handles, and decrypt what
//! arrives, all through a relay that only ever stores ciphertext.
//!
//! ```bash
//! vajra register alice
//! vajra send bob ./report.pdf
//! vajra inbox
//! vajra receive <id> --out ~/Downloads
//! ```

mod cli;
mod commands;
mod config;
mod relay_http;

use clap::Parser;
use color_eyre::{Report, Section};
use tracing_subscriber::EnvFilter;

use cli::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_tracing(args.verbose);

    let output = commands::run(args).await.map_err(annotate)?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "vajra_core=debug,vajra_cli=debug"
    } else {
        "vajra_core=warn,vajra_cli=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Attach the error code and a hint to core errors
fn annotate(report: Report) -> Report {
    let Some(err) = report.downcast_ref::<vajra_core::Error>() else {
        return report;
    };
    let code = err.code();
    let hint = hint(err);
    let report = report.note(format!("error code {}", code));
    match hint {
        Some(hint) => report.suggestion(hint),
        None => report,
    }
}

fn hint(err: &vajra_core::Error) -> Option<&'static str> {
    use vajra_core::Error;
    match err {
        Error::NoIdentity => Some("run `vajra register <handle>` or `vajra login <handle>`"),
        Error::AuthenticationError => Some("check the password; it is case-sensitive"),
        Error::HandleTaken(_) => Some("pick another handle, or `vajra login` if it is yours"),
        Error::RelayUnavailable(_) => {
            Some("check the relay URL with `vajra config show` or pass --server")
        }
        Error::UnsealError | Error::IntegrityError => {
            Some("the file was not sent to this identity, or it was altered in transit")
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hints() {
        assert!(hint(&vajra_core::Error::NoIdentity).is_some());
        assert!(hint(&vajra_core::Error::Internal("x".into())).is_none());
    }

    #[test]
    fn test_annotate_keeps_other_errors() {
        let report = annotate(color_eyre::eyre::eyre!("plain"));
        assert_eq!(report.to_string(), "plain");
    }
}
