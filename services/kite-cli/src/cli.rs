//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Kite Connect command-line client.
#[derive(Parser, Debug)]
#[command(name = "kite")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Env file holding API_KEY, API_SECRET and ACCESS_TOKEN
    #[arg(long, global = true, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Validate the stored access token, logging in again if needed
    Login,
    /// User profile
    Profile,
    /// Funds and margins, optionally for one segment (equity, commodity)
    Margins { segment: Option<String> },
    /// Net and day positions
    Positions,
    /// Long-term holdings
    Holdings,
    /// Today's orders
    Orders,
    /// Today's trades
    Trades,
    /// State history of one order
    OrderHistory { order_id: String },
    /// Trades generated by one order
    OrderTrades { order_id: String },
    /// Cancel an open order
    CancelOrder {
        /// Order variety (regular, amo, co, iceberg, auction)
        variety: String,
        order_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["kite", "holdings", "--env-file", "/tmp/k.env", "-vv"])
            .unwrap();
        assert_eq!(cli.command, Commands::Holdings);
        assert_eq!(cli.env_file, Some(PathBuf::from("/tmp/k.env")));
        assert_eq!(cli.verbose, 2);
        assert!(!cli.json_logs);
    }

    #[test]
    fn parses_positional_arguments() {
        let cli = Cli::try_parse_from(["kite", "cancel-order", "regular", "151220000000000"])
            .unwrap();
        assert_eq!(
            cli.command,
            Commands::CancelOrder {
                variety: "regular".into(),
                order_id: "151220000000000".into(),
            }
        );

        let cli = Cli::try_parse_from(["kite", "margins"]).unwrap();
        assert_eq!(cli.command, Commands::Margins { segment: None });
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["kite"]).is_err());
    }
}
