use fnpack::cli::{handle_request, CliArgs, JsonRpcResponse};
use fnpack::cli::protocol::PARSE_ERROR;
use fnpack::util::logging::{init_logging, parse_level, LoggingConfig};
use fnpack::{FnpackConfig, NAME, VERSION};

use clap::Parser;
use serde_json::Value;
use std::io::{self, Read, Write};
use std::process;
use tracing::{debug, error, warn, Level};

fn main() {
    let args = CliArgs::parse();
    let config = FnpackConfig::default();
    init_logging_from_args(&args, &config);

    debug!("{} v{} starting", NAME, VERSION);
    debug!("Arguments: {:?}", args);
    if let Err(e) = config.validate() {
        warn!("{}", e);
    }

    let response = match read_request(&args) {
        Ok(raw) => handle_request(&raw, &config),
        Err(e) => {
            error!("Failed to read request: {}", e);
            JsonRpcResponse::error(Value::Null, PARSE_ERROR, format!("Parse error: {}", e))
        }
    };

    let exit_code = if response.is_error() { 1 } else { 0 };
    if let Err(e) = write_response(&response) {
        error!("Failed to write response: {}", e);
        process::exit(1);
    }

    process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs, config: &FnpackConfig) {
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        parse_level(&config.log_level)
    };

    let logging = if config.log_json {
        LoggingConfig {
            level,
            ..LoggingConfig::production()
        }
    } else {
        LoggingConfig::with_level(level)
    };
    init_logging(logging);
}

fn read_request(args: &CliArgs) -> io::Result<String> {
    match &args.request {
        Some(request) => Ok(request.clone()),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn write_response(response: &JsonRpcResponse) -> anyhow::Result<()> {
    let body = serde_json::to_string(response)?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(body.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
