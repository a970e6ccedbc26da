use std::path::PathBuf;
use std::time::Duration;
use std::{env, net::SocketAddr, str::FromStr};

use iceserver::IceServer;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub ice_servers: Vec<IceServer>,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub session: Session,
    #[serde(default)]
    pub recorder: Recorder,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Http {
    #[serde(default = "default_http_listen")]
    pub listen: SocketAddr,
    /// Allow browser callers from any origin
    #[serde(default = "default_true")]
    pub cors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Upper bound for ICE candidate gathering while answering an offer (0 disables)
    #[serde(default = "default_gather_timeout_secs")]
    pub gather_timeout_secs: u64,
    /// Also offer 127.0.0.1 host candidates
    #[serde(default)]
    pub include_loopback_candidate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recorder {
    /// Directory the `.ogg` files are written to
    #[serde(default = "default_recorder_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u8,
    /// Stop a recording when its track goes quiet for this long (0 disables)
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_http_listen() -> SocketAddr {
    SocketAddr::from_str(&format!(
        "0.0.0.0:{}",
        env::var("PORT").unwrap_or(String::from("8085"))
    ))
    .unwrap_or(SocketAddr::from(([0, 0, 0, 0], 8085)))
}

fn default_log_level() -> String {
    env::var("LOG_LEVEL").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug".to_string()
        } else {
            "info".to_string()
        }
    })
}

fn default_gather_timeout_secs() -> u64 {
    10
}

fn default_recorder_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_sample_rate() -> u32 {
    48_000
}

fn default_channels() -> u8 {
    2
}

fn default_idle_timeout_secs() -> u64 {
    30
}

impl Default for Http {
    fn default() -> Self {
        Self {
            listen: default_http_listen(),
            cors: default_true(),
        }
    }
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self {
            gather_timeout_secs: default_gather_timeout_secs(),
            include_loopback_candidate: false,
        }
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self {
            dir: default_recorder_dir(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

impl Session {
    pub fn gather_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.gather_timeout_secs)
    }
}

impl Recorder {
    pub fn idle_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.idle_timeout_secs)
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        for ice_server in self.ice_servers.iter() {
            ice_server
                .validate()
                .map_err(|e| anyhow::anyhow!(format!("ice_server error : {}", e)))?;
        }
        if self.recorder.sample_rate == 0 {
            anyhow::bail!("recorder.sample_rate cannot be 0");
        }
        if self.recorder.channels == 0 {
            anyhow::bail!("recorder.channels cannot be 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert!(cfg.http.cors);
        assert!(cfg.ice_servers.is_empty());
        assert_eq!(48_000, cfg.recorder.sample_rate);
        assert_eq!(2, cfg.recorder.channels);
        assert_eq!(PathBuf::from("."), cfg.recorder.dir);
        assert_eq!(Some(Duration::from_secs(10)), cfg.session.gather_timeout());
        assert_eq!(Some(Duration::from_secs(30)), cfg.recorder.idle_timeout());
        assert!(!cfg.session.include_loopback_candidate);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_disables_timeouts() {
        let cfg: Config = toml::from_str(
            r#"
            [session]
            gather_timeout_secs = 0

            [recorder]
            dir = "/var/lib/whipogg"
            idle_timeout_secs = 0
            "#,
        )
        .unwrap();
        assert_eq!(None, cfg.session.gather_timeout());
        assert_eq!(None, cfg.recorder.idle_timeout());
        assert_eq!(PathBuf::from("/var/lib/whipogg"), cfg.recorder.dir);
    }

    #[test]
    fn channels_fit_opus_head() {
        let cfg: Config = toml::from_str("[recorder]\nchannels = 1").unwrap();
        assert_eq!(1u8, cfg.recorder.channels);
        assert!(toml::from_str::<Config>("[recorder]\nchannels = 256").is_err());
        assert!(toml::from_str::<Config>("[recorder]\nchannels = -1").is_err());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.recorder.channels = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.ice_servers.push(IceServer {
            urls: vec!["turn:turn.example.com".to_string()],
            ..Default::default()
        });
        assert!(cfg.validate().is_err());
    }
}
