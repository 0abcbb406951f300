use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "Jot",
    version = jot_core::version(),
    about = "Jot - A global quick-entry overlay",
)]
pub struct Args {
    /// Specify custom configuration file path
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Specify custom configuration file path"
    )]
    pub config_path: Option<PathBuf>,

    /// Validate configuration and exit without starting
    #[arg(
        long = "dry-run",
        help = "Validate configuration and exit without starting"
    )]
    pub dry_run: bool,

    /// Use default configuration and ignore config files
    #[arg(
        long = "defaults",
        help = "Use default configuration and ignore config files"
    )]
    pub use_defaults: bool,

    /// Print each submitted entry to stdout
    #[arg(long = "print", help = "Print each submitted entry to stdout")]
    pub print: bool,

    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,

    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

pub fn parse_args() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_parse() {
        let args = Args::try_parse_from(["jot", "--config", "/tmp/jot.yaml", "--print", "-v"]).unwrap();
        assert_eq!(args.config_path, Some(PathBuf::from("/tmp/jot.yaml")));
        assert!(args.print);
        assert!(args.verbose);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Args::try_parse_from(["jot", "-q", "-v"]).is_err());
    }
}
