use std::sync::Arc;
use std::time::Duration;

use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::api::APIBuilder;
use webrtc::ice::mdns::MulticastDnsMode;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;

use crate::error::AppError;
use crate::error::Result;

pub(crate) fn get_peer_id(peer: &RTCPeerConnection) -> String {
    let digest = md5::compute(peer.get_stats_id());
    format!("{:x}", digest)
}

/// A receive-only peer connection with one audio transceiver.
pub(crate) async fn new_ingest_peer(
    ice_servers: Vec<RTCIceServer>,
    include_loopback: bool,
) -> Result<Arc<RTCPeerConnection>> {
    let mut m = MediaEngine::default();
    m.register_default_codecs()?;
    let mut registry = Registry::new();
    registry = register_default_interceptors(registry, &mut m)?;
    let mut s = SettingEngine::default();

    // NOTE: Disabled mDNS send
    // As a cloud server, we don't need this
    // https://github.com/binbat/live777/issues/155
    s.set_ice_multicast_dns_mode(MulticastDnsMode::Disabled);
    s.set_include_loopback_candidate(include_loopback);

    let api = APIBuilder::new()
        .with_media_engine(m)
        .with_interceptor_registry(registry)
        .with_setting_engine(s)
        .build();
    let config = RTCConfiguration {
        ice_servers,
        ..Default::default()
    };
    let peer = Arc::new(api.new_peer_connection(config).await?);
    peer.add_transceiver_from_kind(
        RTPCodecType::Audio,
        Some(RTCRtpTransceiverInit {
            direction: RTCRtpTransceiverDirection::Recvonly,
            send_encodings: Vec::new(),
        }),
    )
    .await?;
    Ok(peer)
}

/// Applies the offer, answers it and waits for ICE gathering, so the returned
/// description already carries every local candidate.
pub(crate) async fn peer_complete(
    offer: RTCSessionDescription,
    peer: &RTCPeerConnection,
    gather_timeout: Option<Duration>,
) -> Result<RTCSessionDescription> {
    peer.set_remote_description(offer)
        .await
        .map_err(AppError::invalid_offer)?;
    let answer = peer.create_answer(None).await?;
    let mut gather_complete = peer.gathering_complete_promise().await;
    peer.set_local_description(answer).await?;
    match gather_timeout {
        Some(timeout) => {
            if tokio::time::timeout(timeout, gather_complete.recv())
                .await
                .is_err()
            {
                return Err(AppError::NegotiationTimeout);
            }
        }
        None => {
            let _ = gather_complete.recv().await;
        }
    }
    let description = peer
        .local_description()
        .await
        .ok_or(AppError::throw("failed to get local description"))?;
    Ok(description)
}
