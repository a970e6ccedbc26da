use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ingest::recorder::naming::NameGenerator;
use tokio::net::TcpListener;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::api::APIBuilder;
use webrtc::interceptor::registry::Registry;
use webrtc::media::Sample;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;

pub const NAME_SEED: u64 = 777;

/// Serves `ingest::app` on an ephemeral localhost port. Recording names come
/// from `NameGenerator::from_seed(NAME_SEED)`.
pub async fn spawn_server(cfg: ingest::config::Config) -> (SocketAddr, ingest::AppState) {
    let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let state = ingest::AppState {
        config: cfg.clone(),
        sessions: Arc::new(ingest::Manager::with_names(
            cfg,
            NameGenerator::from_seed(NAME_SEED),
        )),
    };
    let app = ingest::app(state.clone());
    tokio::spawn(async move { axum::serve(listener, app).await });
    (addr, state)
}

pub fn config(dir: &Path) -> ingest::config::Config {
    let mut cfg = ingest::config::Config::default();
    cfg.recorder.dir = dir.to_path_buf();
    cfg.session.include_loopback_candidate = true;
    cfg
}

/// A sending peer with one audio track, offer already gathered.
pub struct Publisher {
    pub peer: Arc<RTCPeerConnection>,
    pub track: Arc<TrackLocalStaticSample>,
    pub offer: String,
}

impl Publisher {
    pub async fn new(mime_type: &str) -> Self {
        let mut m = MediaEngine::default();
        m.register_default_codecs().unwrap();
        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut m).unwrap();
        let mut s = SettingEngine::default();
        s.set_include_loopback_candidate(true);
        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .with_setting_engine(s)
            .build();
        let peer = Arc::new(
            api.new_peer_connection(RTCConfiguration::default())
                .await
                .unwrap(),
        );
        let track = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                ..Default::default()
            },
            "audio".to_owned(),
            "whipogg-test".to_owned(),
        ));
        peer.add_track(Arc::clone(&track) as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .unwrap();

        let offer = peer.create_offer(None).await.unwrap();
        let mut gather_complete = peer.gathering_complete_promise().await;
        peer.set_local_description(offer).await.unwrap();
        let _ = gather_complete.recv().await;
        let offer = peer.local_description().await.unwrap().sdp;

        Self { peer, track, offer }
    }

    /// Sends `frame` every 20ms until the returned task is aborted.
    pub fn start_sending(&self, frame: &'static [u8]) -> tokio::task::JoinHandle<()> {
        let track = self.track.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(20));
            loop {
                ticker.tick().await;
                let _ = track
                    .write_sample(&Sample {
                        data: bytes::Bytes::from_static(frame),
                        duration: Duration::from_millis(20),
                        ..Default::default()
                    })
                    .await;
            }
        })
    }
}

pub fn recordings(dir: &Path) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(ingest::recorder::naming::is_recording_name)
        })
        .collect()
}
