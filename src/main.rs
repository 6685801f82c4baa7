use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wedpi::config::{DisplayBackend, LoggingConfig, WedpiConfig};
use wedpi::display::{ConsoleSink, FrameSink, Matrix};
use wedpi::stream::{StreamClient, TagListener};
use wedpi::ticker::{Ticker, TickerCommand, TickerContext};
use wedpi::WedpiError;

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("wedpi={},info", logging.level).into());

    let (file_layer, stdout_layer) = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .with_thread_names(true);
            (Some(layer), None)
        }
        None => (
            None,
            Some(tracing_subscriber::fmt::layer().with_thread_names(true)),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
    Ok(())
}

fn open_sink(config: &WedpiConfig) -> Result<Box<dyn FrameSink>> {
    match config.display.backend {
        DisplayBackend::Console => Ok(Box::new(ConsoleSink::new())),
        DisplayBackend::ScrollPhatHd => open_matrix(config),
    }
}

#[cfg(feature = "matrix-io")]
fn open_matrix(config: &WedpiConfig) -> Result<Box<dyn FrameSink>> {
    use wedpi::display::Is31fl3731;

    let path = &config.display.i2c_bus;
    let bus = linux_embedded_hal::I2cdev::new(path)
        .with_context(|| format!("Failed to open I2C bus {}", path.display()))?;
    let mut driver = Is31fl3731::new(bus);
    driver.init()?;
    Ok(Box::new(driver))
}

#[cfg(not(feature = "matrix-io"))]
fn open_matrix(_config: &WedpiConfig) -> Result<Box<dyn FrameSink>> {
    warn!("Built without matrix-io, rendering frames to the log");
    Ok(Box::new(ConsoleSink::new()))
}

/// Forward Ctrl-C to the display loop
fn spawn_signal_thread(commands: Sender<TickerCommand>) -> Result<()> {
    std::thread::Builder::new()
        .name("signal".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    error!("Failed to create signal runtime: {}", e);
                    return;
                }
            };

            match runtime.block_on(tokio::signal::ctrl_c()) {
                Ok(()) => info!("Interrupt received, shutting down"),
                Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
            }
            let _ = commands.send(TickerCommand::Shutdown);
        })?;
    Ok(())
}

/// Report a startup failure and leave with the same status as a clean exit
fn exit_on_startup_error<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            error!("Startup failed: {:#}", e);
            eprintln!("WedPi could not start: {:#}", e);
            std::process::exit(0);
        }
    }
}

fn main() -> Result<()> {
    let config = match WedpiConfig::from_env() {
        Ok(config) => config,
        Err(e @ WedpiError::MissingCredentials(_)) => {
            println!("{}", e.user_message());
            println!("{}", e);
            std::process::exit(0);
        }
        Err(e) => exit_on_startup_error(Err(e.into())),
    };
    exit_on_startup_error(config.validate().map_err(Into::into));

    exit_on_startup_error(init_tracing(&config.logging));
    info!("Starting WedPi");
    info!("Configuration: {:?}", config);

    let display = Matrix::new(exit_on_startup_error(open_sink(&config)));
    let ctx = TickerContext::new(config);
    let mut ticker = Ticker::new(display, ctx.clone());

    if let Err(e) = ticker.boot() {
        warn!("Boot failed: {}", e);
    }

    let client = StreamClient::new(ctx.config().stream.clone(), ctx.config().credentials.clone());
    let stream = client.start(Arc::new(TagListener::new(ctx.clone())))?;

    let (command_tx, command_rx) = crossbeam_channel::bounded(1);
    spawn_signal_thread(command_tx)?;

    ticker.run(&command_rx);

    stream.disconnect()?;
    info!("WedPi stopped");
    Ok(())
}
