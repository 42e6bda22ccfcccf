//! Command line interface for the `jabber-events` replay binary.
//!
//! Kept free of library types so the build script can render the manual
//! page from it.

use std::path::PathBuf;

use clap::Parser;

/// Command line arguments for the `jabber-events` binary.
#[derive(Debug, Parser)]
#[command(
    name = "jabber-events",
    version,
    about = "Replay decoded Jabber events and print the merged presence and messages"
)]
pub struct Cli {
    /// JSON-lines event script; reads standard input when omitted.
    pub script: Option<PathBuf>,

    /// JSON configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the fragment flush timeout, in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Override the placeholder for missing fragments.
    #[arg(long)]
    pub placeholder: Option<String>,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;

    #[test]
    fn parses_script_and_overrides() {
        let cli = Cli::parse_from([
            "jabber-events",
            "events.jsonl",
            "--timeout-ms",
            "250",
            "--placeholder",
            "[?]",
        ]);
        assert_eq!(
            cli.script.as_deref().and_then(|p| p.to_str()),
            Some("events.jsonl")
        );
        assert_eq!(cli.timeout_ms, Some(250));
        assert_eq!(cli.placeholder.as_deref(), Some("[?]"));
        assert!(cli.config.is_none());
    }
}
