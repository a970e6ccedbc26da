use tracing_subscriber::EnvFilter;

const TARGETS: [&str; 3] = ["whipogg", "ingest", "http_log"];

/// Our crates log at `level`, the WebRTC engine only reports errors.
/// `RUST_LOG` replaces the whole filter.
pub fn set(level: &str) {
    let directives = TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .chain(std::iter::once("webrtc=error".to_string()))
        .collect::<Vec<_>>()
        .join(",");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new(directives)))
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(true)
        .init();
}
