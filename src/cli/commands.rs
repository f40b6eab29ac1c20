use clap::Parser;

/// Builds serverless function artifacts from a JSON-RPC request
#[derive(Parser, Debug)]
#[command(
    name = "fnpack",
    about = "Builds serverless function artifacts from a JSON-RPC request",
    version,
    long_about = "fnpack selects a build workflow for the requested capability, checks that the \
                  toolchain binaries it needs are installed and match the target runtime, and runs \
                  the workflow's build actions.\n\n\
                  The request is read from the first argument, or from stdin when no argument is \
                  given. The JSON-RPC response is written to stdout; logs go to stderr.\n\n\
                  Examples:\n  \
                  fnpack '{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"Builder.build\",\"params\":{...}}'\n  \
                  cat request.json | fnpack"
)]
pub struct CliArgs {
    #[arg(value_name = "REQUEST", help = "JSON-RPC request (read from stdin when omitted)")]
    pub request: Option<String>,

    #[arg(long, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        conflicts_with = "verbose",
        help = "Quiet mode - only log errors"
    )]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_request() {
        let args = CliArgs::parse_from(["fnpack", "{}"]);
        assert_eq!(args.request.as_deref(), Some("{}"));
        assert!(!args.verbose);
    }

    #[test]
    fn test_logging_flags() {
        let args = CliArgs::parse_from(["fnpack", "--log-level", "trace"]);
        assert_eq!(args.log_level.as_deref(), Some("trace"));
        assert!(args.request.is_none());

        let args = CliArgs::parse_from(["fnpack", "-q"]);
        assert!(args.quiet);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(CliArgs::try_parse_from(["fnpack", "-v", "-q"]).is_err());
    }
}
