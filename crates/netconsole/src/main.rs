mod console;
mod exit;
mod logging;
mod output;

use clap::Parser;
use netconsole_transport::DEFAULT_PORT;

use crate::console::ConsoleArgs;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "netconsole", version, about = "Netconsole telemetry client")]
struct Cli {
    /// Device address (host name or IP).
    address: String,

    /// Netconsole TCP port.
    #[arg(long, short = 'p', default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Impersonate a driver station so the device emits console output.
    #[arg(long)]
    fakeds: bool,

    /// Record output format (stdout).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    format: OutputFormat,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", env = "NETCONSOLE_LOG_LEVEL")]
    log_level: LogLevel,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let result = console::run(ConsoleArgs {
        address: cli.address,
        port: cli.port,
        fakeds: cli.fakeds,
        format: cli.format,
    });

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_address_with_defaults() {
        let cli = Cli::try_parse_from(["netconsole", "10.0.0.2"]).expect("address should parse");
        assert_eq!(cli.address, "10.0.0.2");
        assert_eq!(cli.port, 1741);
        assert!(!cli.fakeds);
        assert!(matches!(cli.format, OutputFormat::Text));
    }

    #[test]
    fn parses_port_fakeds_and_json() {
        let cli = Cli::try_parse_from([
            "netconsole",
            "roborio-1234-frc.local",
            "--port",
            "9000",
            "--fakeds",
            "--format",
            "json",
        ])
        .expect("flags should parse");
        assert_eq!(cli.port, 9000);
        assert!(cli.fakeds);
        assert!(matches!(cli.format, OutputFormat::Json));
    }

    #[test]
    fn requires_address() {
        let err = Cli::try_parse_from(["netconsole"]).expect_err("address is required");
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn rejects_invalid_port() {
        let err = Cli::try_parse_from(["netconsole", "host", "--port", "70000"])
            .expect_err("port must fit u16");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
