use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "order-sync")]
#[command(about = "Receives Shopify order webhooks and stores them in Airtable")]
pub struct CliArgs {
    /// Path to a TOML configuration file; environment variables are used when omitted
    #[arg(short, long, env = "ORDER_SYNC_CONFIG")]
    pub config: Option<String>,

    /// Override the listen port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args = CliArgs::parse_from(["order-sync", "--config", "sync.toml", "-p", "8080", "-v"]);
        assert_eq!(args.config.as_deref(), Some("sync.toml"));
        assert_eq!(args.port, Some(8080));
        assert!(args.verbose);
        assert!(!args.json_logs);
    }
}
