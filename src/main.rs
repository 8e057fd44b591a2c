pub mod config;
pub mod context;
pub mod mqtt;
pub mod persistence;
pub mod rpc;
pub mod telemetry;

use crate::config::DeviceSettings;
use crate::context::DeviceContext;
use crate::mqtt::client::TbDeviceClient;
use crate::mqtt::config::MqttConfig;
use crate::mqtt::mqtt_handler::MqttHandler;
use crate::persistence::ConfigLoader;
use color_eyre::{eyre::eyre, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    setup()?;

    let settings = DeviceSettings::load(&DeviceSettings::settings_path()).await?;

    let credentials = ConfigLoader::new(&settings.credentials_dir)
        .load_client_credentials_from_file(&settings.credentials_file)
        .await
        .ok_or_else(|| {
            eyre!(
                "No client credentials available in {}",
                settings
                    .credentials_dir
                    .join(&settings.credentials_file)
                    .display()
            )
        })?;

    let mqtt_config = MqttConfig::from_credentials(&credentials, &settings);
    let (client, eventloop) = TbDeviceClient::new(&mqtt_config)
        .await
        .map_err(|e| eyre!("Unable to initialize client: {}", e))?;

    let mut context = DeviceContext::new(
        client,
        settings.telemetry_topic.clone(),
        settings.telemetry_interval(),
    );

    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone());

    info!("PID: {}", std::process::id());
    MqttHandler::new(eventloop, &mqtt_config)
        .run(&mut context, shutdown)
        .await;

    info!("Shut down");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

/// Cancels `shutdown` on the first SIGINT or SIGTERM
fn spawn_signal_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(signal) => {
                info!("Received signal {}.", signal);
                shutdown.cancel();
            }
            Err(e) => error!("Unable to listen for shutdown signals: {}", e),
        }
    });
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|_| "SIGINT"),
        _ = sigterm.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|_| "ctrl-c")
}
