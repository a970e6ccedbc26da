use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

use crate::config::Config;
use crate::error::Result;
use crate::recorder::naming::NameGenerator;

use super::peer::{get_peer_id, new_ingest_peer, peer_complete};
use super::{register_handlers, RecorderContext, Session, SessionEvent};

struct SessionHandle {
    events: mpsc::UnboundedSender<SessionEvent>,
    task: JoinHandle<()>,
}

/// Owns every live session. One session per accepted offer.
pub struct Manager {
    config: Config,
    ice_servers: Vec<RTCIceServer>,
    recorder: Arc<RecorderContext>,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl Manager {
    pub fn new(config: Config) -> Self {
        Self::with_names(config, NameGenerator::from_os_rng())
    }

    pub fn with_names(config: Config, names: NameGenerator) -> Self {
        let ice_servers = config
            .ice_servers
            .clone()
            .into_iter()
            .map(|i| i.into())
            .collect();
        let recorder = Arc::new(RecorderContext::new(&config.recorder, names));
        Self {
            config,
            ice_servers,
            recorder,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Answers `offer` with a fully gathered local description and keeps the
    /// session running in the background. Returns the answer and the session id.
    pub async fn negotiate(
        self: &Arc<Self>,
        offer: RTCSessionDescription,
    ) -> Result<(RTCSessionDescription, String)> {
        let peer = new_ingest_peer(
            self.ice_servers.clone(),
            self.config.session.include_loopback_candidate,
        )
        .await?;
        let id = get_peer_id(&peer);
        let (tx, rx) = mpsc::unbounded_channel();
        register_handlers(&peer, tx.clone());

        let answer =
            match peer_complete(offer, &peer, self.config.session.gather_timeout()).await {
                Ok(answer) => answer,
                Err(err) => {
                    warn!("[{}] negotiation failed: {}", id, err);
                    if let Err(err) = peer.close().await {
                        warn!("[{}] close peer connection error: {}", id, err);
                    }
                    return Err(err);
                }
            };

        let session = Session::new(id.clone(), peer, rx, self.recorder.clone());
        let mut sessions = self.sessions.write().await;
        let task = tokio::spawn(session.run(Arc::downgrade(self)));
        sessions.insert(id.clone(), SessionHandle { events: tx, task });
        info!("[{}] session created, {} live", id, sessions.len());
        Ok((answer, id))
    }

    pub(crate) async fn remove(&self, id: &str) {
        self.sessions.write().await.remove(id);
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Stops every session and waits until their recordings are finalized.
    pub async fn shutdown(&self) {
        let sessions: Vec<(String, SessionHandle)> =
            self.sessions.write().await.drain().collect();
        if sessions.is_empty() {
            return;
        }
        info!("stopping {} sessions", sessions.len());
        for (_, handle) in sessions.iter() {
            let _ = handle.events.send(SessionEvent::Stop);
        }
        for (id, handle) in sessions {
            if let Err(err) = handle.task.await {
                error!("[{}] session task failed: {}", id, err);
            }
        }
    }
}
