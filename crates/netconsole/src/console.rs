use std::sync::Arc;
use std::thread;

use netconsole_client::{Client, ConnectSignal, FakeDriverStation, StartMode};
use netconsole_frame::Record;

use crate::exit::{client_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Debug)]
pub struct ConsoleArgs {
    pub address: String,
    pub port: u16,
    pub fakeds: bool,
    pub format: OutputFormat,
}

/// Stream console output from the device until Ctrl-C.
pub fn run(args: ConsoleArgs) -> CliResult<i32> {
    let _station = if args.fakeds {
        Some(
            FakeDriverStation::start(&args.address)
                .map_err(|err| client_error("fake driver station failed", err))?,
        )
    } else {
        None
    };

    let format = args.format;
    let client = Arc::new(Client::new(move |record: Record| {
        print_record(&record, format)
    }));
    install_ctrlc_handler(Arc::clone(&client))?;

    let connected = ConnectSignal::new();
    announce_first_connection(connected.clone(), &args);

    client
        .start(&args.address, args.port, Some(connected), StartMode::Blocking)
        .map_err(|err| client_error("client failed", err))?;

    Ok(SUCCESS)
}

fn announce_first_connection(signal: ConnectSignal, args: &ConsoleArgs) {
    let endpoint = format!("{}:{}", args.address, args.port);
    tracing::info!(%endpoint, "waiting for device");
    let spawned = thread::Builder::new()
        .name("netconsole-notice".to_string())
        .spawn(move || {
            signal.wait();
            tracing::info!(%endpoint, "receiving console output");
        });
    if let Err(err) = spawned {
        tracing::debug!(error = %err, "connection notice disabled");
    }
}

fn install_ctrlc_handler(client: Arc<Client>) -> CliResult<()> {
    ctrlc::set_handler(move || client.stop()).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}
