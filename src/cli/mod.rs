//! Command-line interface for the HobbyList auth backend.

use clap::{Parser, Subcommand};

/// HobbyList - account backend
/// Signup, email verification and password reset for the HobbyList frontend
#[derive(Parser)]
#[command(name = "hobbylist")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP API (default)
    #[command(alias = "web")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Validate the effective configuration and print a summary
    CheckConfig,

    /// Issue a fresh verification email for an inactive account
    ResendVerification {
        /// Account email address
        email: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["hobbylist"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["hobbylist", "web"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Serve));

        let cli =
            Cli::try_parse_from(["hobbylist", "resend-verification", "a@example.com"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::ResendVerification {
                email: "a@example.com".to_string()
            })
        );

        assert!(Cli::try_parse_from(["hobbylist", "resend-verification"]).is_err());
    }
}
