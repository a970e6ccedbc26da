use std::fs::read_to_string;

use tracing::{error, info};

pub async fn shutdown_signal() {
    match signal::wait_for_stop_signal().await {
        Ok(signal) => info!("Received signal: {}", signal),
        Err(err) => {
            error!("cannot listen for stop signals: {}", err);
            std::future::pending::<()>().await
        }
    }
}

/// Reads `path`, else `<name>.toml`, else `/etc/<name>/<name>.toml`.
/// Falls back to defaults when nothing usable is found.
pub fn load<T>(name: &str, path: Option<String>) -> T
where
    T: serde::de::DeserializeOwned + std::default::Default,
{
    let result = read_to_string(path.unwrap_or(format!("{name}.toml")))
        .or(read_to_string(format!("/etc/{name}/{name}.toml")))
        .unwrap_or_default();
    match toml::from_str(result.as_str()) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("config load error: {}", err);
            Default::default()
        }
    }
}
