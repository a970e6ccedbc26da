use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{trace, warn};
use webrtc::api::media_engine::MIME_TYPE_OPUS;
use webrtc::rtp::packet::Packet;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_remote::TrackRemote;

pub mod naming;
pub mod ogg;


/// Where a recording pulls its RTP packets from.
#[async_trait]
pub trait RtpSource: Send {
    /// `Ok(None)` once the stream has ended.
    async fn read_packet(&mut self) -> anyhow::Result<Option<Packet>>;
}

/// Where a recording puts its RTP packets.
pub trait RtpSink: Send {
    fn write_packet(&mut self, packet: &Packet) -> anyhow::Result<()>;

    /// Writes the container trailer and flushes. Called exactly once.
    fn finalize(&mut self) -> anyhow::Result<()>;
}

#[async_trait]
impl RtpSource for Arc<TrackRemote> {
    async fn read_packet(&mut self) -> anyhow::Result<Option<Packet>> {
        match self.read_rtp().await {
            Ok((packet, _)) => Ok(Some(packet)),
            Err(webrtc::Error::ErrClosedPipe) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// Only Opus is written to Ogg; anything else negotiated on the session is ignored.
pub fn is_recordable(codec: &RTCRtpCodecCapability) -> bool {
    codec.mime_type.eq_ignore_ascii_case(MIME_TYPE_OPUS)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    Cancelled,
    IdleTimeout,
    ReadError(String),
    WriteError(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EndOfStream => f.write_str("end of stream"),
            StopReason::Cancelled => f.write_str("session closed"),
            StopReason::IdleTimeout => f.write_str("no packet within idle timeout"),
            StopReason::ReadError(err) => write!(f, "read error: {err}"),
            StopReason::WriteError(err) => write!(f, "write error: {err}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingSummary {
    pub packets: u64,
    pub bytes: u64,
    pub reason: StopReason,
}

enum Read {
    Packet(Packet),
    End,
    Idle,
    Failed(anyhow::Error),
}

async fn read_next<S: RtpSource>(source: &mut S, idle_timeout: Option<Duration>) -> Read {
    let read = match idle_timeout {
        Some(timeout) => match tokio::time::timeout(timeout, source.read_packet()).await {
            Ok(read) => read,
            Err(_) => return Read::Idle,
        },
        None => source.read_packet().await,
    };
    match read {
        Ok(Some(packet)) => Read::Packet(packet),
        Ok(None) => Read::End,
        Err(err) => Read::Failed(err),
    }
}

/// Copies packets from `source` into `sink` in arrival order until the
/// stream ends, an I/O error occurs, `cancel` turns true or the source stays
/// silent for `idle_timeout`.
///
/// Nothing is retried. `sink` is finalized exactly once on every exit path,
/// including when the task running this future is aborted.
pub async fn record<S, W>(
    mut source: S,
    sink: W,
    mut cancel: watch::Receiver<bool>,
    idle_timeout: Option<Duration>,
) -> RecordingSummary
where
    S: RtpSource,
    W: RtpSink,
{
    let mut sink = scopeguard::guard(sink, |mut sink| {
        if let Err(err) = sink.finalize() {
            warn!("[recorder] finalize failed: {err}");
        }
    });
    let mut packets = 0u64;
    let mut bytes = 0u64;

    let reason = loop {
        if *cancel.borrow_and_update() {
            break StopReason::Cancelled;
        }
        let read = tokio::select! {
            biased;
            changed = cancel.changed() => match changed {
                Ok(()) => continue,
                // the session dropped its end without saying goodbye
                Err(_) => break StopReason::Cancelled,
            },
            read = read_next(&mut source, idle_timeout) => read,
        };
        let packet = match read {
            Read::Packet(packet) => packet,
            Read::End => break StopReason::EndOfStream,
            Read::Idle => break StopReason::IdleTimeout,
            Read::Failed(err) => break StopReason::ReadError(err.to_string()),
        };
        trace!(
            "[recorder] seq: {}, ts: {}, {} bytes",
            packet.header.sequence_number,
            packet.header.timestamp,
            packet.payload.len()
        );
        if let Err(err) = sink.write_packet(&packet) {
            break StopReason::WriteError(err.to_string());
        }
        packets += 1;
        bytes += packet.payload.len() as u64;
    };

    drop(sink);
    RecordingSummary {
        packets,
        bytes,
        reason,
    }
}
