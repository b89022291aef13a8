//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// cacheprog - persistent build action cache helper
///
/// Speaks a line-delimited JSON protocol on stdin/stdout. Not meant to be
/// run by hand; point the build tool's cache-program setting at it.
#[derive(Parser, Debug)]
#[command(name = "cacheprog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v debug, -vv trace); logs go to stderr
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Cache directory (defaults to ~/.gocacheprog)
    #[arg(short = 'd', long, env = "GOCACHEPROG_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, env = "CACHEPROG_CONFIG")]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_verbose_levels() {
        let cli = Cli::parse_from(["cacheprog"]);
        assert_eq!(cli.verbose, 0);

        let cli = Cli::parse_from(["cacheprog", "--verbose"]);
        assert_eq!(cli.verbose, 1);

        let cli = Cli::parse_from(["cacheprog", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn cli_parses_cache_dir() {
        let cli = Cli::parse_from(["cacheprog", "--cache-dir", "/tmp/gocache"]);
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/gocache")));

        let cli = Cli::parse_from(["cacheprog", "-d", "rel/dir"]);
        assert_eq!(cli.cache_dir, Some(PathBuf::from("rel/dir")));
    }

    #[test]
    fn cli_parses_config_path() {
        let cli = Cli::parse_from(["cacheprog", "-c", "/etc/cacheprog.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/cacheprog.toml")));
    }

    #[test]
    fn cli_rejects_positional_args() {
        assert!(Cli::try_parse_from(["cacheprog", "extra"]).is_err());
    }
}
