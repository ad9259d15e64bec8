use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "coey", version, about = "Slack command bot", long_about = None)]
pub struct Cli {
    /// Select 1 to enable Coey testing mode.
    #[arg(long)]
    pub testing: Option<i64>,

    /// Configuration file (defaults to ~/.coey/coey.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Testing mode only turns on for the literal value 1.
    pub fn testing_mode(&self) -> bool {
        self.testing == Some(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn testing_mode_requires_one() {
        let cli = Cli::parse_from(["coey", "--testing", "1"]);
        assert!(cli.testing_mode());

        let cli = Cli::parse_from(["coey", "--testing", "2"]);
        assert!(!cli.testing_mode());

        let cli = Cli::parse_from(["coey"]);
        assert!(!cli.testing_mode());
        assert!(cli.config.is_none());
    }

    #[test]
    fn config_path_is_parsed() {
        let cli = Cli::parse_from(["coey", "--config", "/etc/coey.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/coey.toml")));
    }
}
