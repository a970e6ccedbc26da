use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::track::track_remote::TrackRemote;

use crate::config;
use crate::recorder::naming::NameGenerator;
use crate::recorder::ogg::OggRecording;
use crate::recorder::{is_recordable, record, RecordingSummary, StopReason};

use self::manager::Manager;

pub mod manager;
mod peer;

/// Everything the engine tells a session about, in the order it happened.
pub(crate) enum SessionEvent {
    Track(Arc<TrackRemote>),
    IceState(RTCIceConnectionState),
    PeerState(RTCPeerConnectionState),
    Stop,
}

/// What a session needs to start recordings.
pub(crate) struct RecorderContext {
    pub dir: PathBuf,
    pub sample_rate: u32,
    pub channels: u8,
    pub idle_timeout: Option<Duration>,
    pub names: NameGenerator,
}

impl RecorderContext {
    pub fn new(cfg: &config::Recorder, names: NameGenerator) -> Self {
        Self {
            dir: cfg.dir.clone(),
            sample_rate: cfg.sample_rate,
            channels: cfg.channels,
            idle_timeout: cfg.idle_timeout(),
            names,
        }
    }
}

/// Engine callbacks only enqueue events; the session task is the single
/// consumer, so callbacks for one session are never handled concurrently.
pub(crate) fn register_handlers(
    peer: &RTCPeerConnection,
    events: mpsc::UnboundedSender<SessionEvent>,
) {
    let tx = events.clone();
    peer.on_track(Box::new(move |track, _, _| {
        let _ = tx.send(SessionEvent::Track(track));
        Box::pin(async {})
    }));
    let tx = events.clone();
    peer.on_ice_connection_state_change(Box::new(move |s: RTCIceConnectionState| {
        let _ = tx.send(SessionEvent::IceState(s));
        Box::pin(async {})
    }));
    peer.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
        let _ = events.send(SessionEvent::PeerState(s));
        Box::pin(async {})
    }));
}

pub(crate) struct Session {
    id: String,
    peer: Arc<RTCPeerConnection>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    recorder: Arc<RecorderContext>,
    closing: watch::Sender<bool>,
    recordings: JoinSet<(String, RecordingSummary)>,
}

impl Session {
    pub(crate) fn new(
        id: String,
        peer: Arc<RTCPeerConnection>,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        recorder: Arc<RecorderContext>,
    ) -> Self {
        Self {
            id,
            peer,
            events,
            recorder,
            closing: watch::channel(false).0,
            recordings: JoinSet::new(),
        }
    }

    pub(crate) async fn run(mut self, manager: Weak<Manager>) {
        debug!("[{}] session started", self.id);
        loop {
            tokio::select! {
                event = self.events.recv() => {
                    let Some(event) = event else { break };
                    if self.handle(event).await.is_break() {
                        break;
                    }
                }
                Some(done) = self.recordings.join_next(), if !self.recordings.is_empty() => {
                    self.reap(done);
                }
            }
        }
        let id = self.id.clone();
        self.teardown().await;
        if let Some(manager) = manager.upgrade() {
            manager.remove(&id).await;
        }
    }

    async fn handle(&mut self, event: SessionEvent) -> ControlFlow<()> {
        match event {
            SessionEvent::Track(track) => {
                self.on_track(track);
                ControlFlow::Continue(())
            }
            SessionEvent::IceState(state) => {
                info!("[{}] ICE connection state changed: {}", self.id, state);
                match state {
                    RTCIceConnectionState::Failed => {
                        self.close_peer().await;
                        ControlFlow::Break(())
                    }
                    RTCIceConnectionState::Closed => ControlFlow::Break(()),
                    _ => ControlFlow::Continue(()),
                }
            }
            SessionEvent::PeerState(state) => {
                debug!("[{}] connection state changed: {}", self.id, state);
                match state {
                    RTCPeerConnectionState::Failed | RTCPeerConnectionState::Closed => {
                        ControlFlow::Break(())
                    }
                    _ => ControlFlow::Continue(()),
                }
            }
            SessionEvent::Stop => {
                info!("[{}] stop requested", self.id);
                ControlFlow::Break(())
            }
        }
    }

    fn on_track(&mut self, track: Arc<TrackRemote>) {
        let codec = track.codec();
        if !is_recordable(&codec.capability) {
            info!(
                "[{}] [track] kind: {}, codec: {}, ssrc: {} ignored",
                self.id,
                track.kind(),
                codec.capability.mime_type,
                track.ssrc()
            );
            return;
        }

        let ctx = self.recorder.clone();
        let recording =
            match OggRecording::create(&ctx.dir, &ctx.names, ctx.sample_rate, ctx.channels) {
                Ok(recording) => recording,
                Err(err) => {
                    error!("[{}] cannot create recording: {}", self.id, err);
                    return;
                }
            };
        let name = recording.file_name();
        info!(
            "[{}] Got Opus track (ssrc: {}), saving to disk as {} ({} Hz, {} channels)",
            self.id,
            track.ssrc(),
            recording.path.display(),
            ctx.sample_rate,
            ctx.channels
        );

        let closing = self.closing.subscribe();
        self.recordings.spawn(async move {
            let summary = record(track, recording.writer, closing, ctx.idle_timeout).await;
            (name, summary)
        });
    }

    fn reap(&self, done: Result<(String, RecordingSummary), JoinError>) {
        match done {
            Ok((name, summary)) => match summary.reason {
                StopReason::EndOfStream | StopReason::Cancelled => info!(
                    "[{}] [recorder] {} finished ({}): {} packets, {} bytes",
                    self.id, name, summary.reason, summary.packets, summary.bytes
                ),
                StopReason::IdleTimeout => warn!(
                    "[{}] [recorder] {} stopped ({}): {} packets, {} bytes",
                    self.id, name, summary.reason, summary.packets, summary.bytes
                ),
                StopReason::ReadError(_) | StopReason::WriteError(_) => error!(
                    "[{}] [recorder] {} stopped ({}): {} packets, {} bytes",
                    self.id, name, summary.reason, summary.packets, summary.bytes
                ),
            },
            Err(err) => error!("[{}] [recorder] task failed: {}", self.id, err),
        }
    }

    async fn close_peer(&self) {
        if let Err(err) = self.peer.close().await {
            warn!("[{}] close peer connection error: {}", self.id, err);
        }
    }

    /// Stops every recording of this session and waits until each has
    /// finalized its file.
    async fn teardown(mut self) {
        self.closing.send_replace(true);
        self.close_peer().await;
        while let Some(done) = self.recordings.join_next().await {
            self.reap(done);
        }
        info!("[{}] session closed", self.id);
    }
}
