use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "homework-notifier")]
#[command(version = "0.1.0")]
#[command(about = "Forwards homework review status changes to a Telegram chat", long_about = None)]
pub struct Cli {
    /// Directory holding default.toml and profile overrides
    #[arg(short, long, default_value = "config", env = "HOMEWORK_CONFIG_DIR")]
    pub config_dir: PathBuf,

    /// Override the polling interval in seconds
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Initial cursor as a Unix timestamp (default: now)
    #[arg(long)]
    pub from_date: Option<i64>,

    /// Run a single poll iteration and exit
    #[arg(long)]
    pub once: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["homework-notifier"]).unwrap();
        assert_eq!(cli.interval, None);
        assert_eq!(cli.from_date, None);
        assert!(!cli.once);
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "homework-notifier",
            "--config-dir",
            "/etc/homework",
            "--interval",
            "30",
            "--from-date",
            "1700000000",
            "--once",
        ])
        .unwrap();
        assert_eq!(cli.config_dir, PathBuf::from("/etc/homework"));
        assert_eq!(cli.interval, Some(30));
        assert_eq!(cli.from_date, Some(1_700_000_000));
        assert!(cli.once);
    }
}
