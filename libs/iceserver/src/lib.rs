use serde::{Deserialize, Serialize};
use webrtc::{ice, ice_transport::ice_server::RTCIceServer, Error};

/// One `[[ice_servers]]` entry of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct IceServer {
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub credential: String,
}

// from https://github.com/webrtc-rs/webrtc/blob/71157ba2153a891a8cfd819f3cf1441a7a0808d8/webrtc/src/ice_transport/ice_server.rs
impl IceServer {
    /// Every url must parse, and TURN urls need both a username and a credential.
    pub fn validate(&self) -> webrtc::error::Result<()> {
        for url in &self.urls {
            let url = ice::url::Url::parse_url(url)?;
            if (url.scheme == ice::url::SchemeType::Turn
                || url.scheme == ice::url::SchemeType::Turns)
                && (self.username.is_empty() || self.credential.is_empty())
            {
                // https://www.w3.org/TR/webrtc/#set-the-configuration (step #11.3.2)
                return Err(Error::ErrNoTurnCredentials);
            }
        }
        Ok(())
    }
}

impl From<IceServer> for RTCIceServer {
    fn from(val: IceServer) -> Self {
        RTCIceServer {
            urls: val.urls,
            username: val.username,
            credential: val.credential,
            ..Default::default()
        }
    }
}

/// WHIP advertises ICE servers to the client with `Link` headers,
/// one per url: <https://www.rfc-editor.org/rfc/rfc9725#section-4.6>
pub fn link_header(ice_servers: &[IceServer]) -> Vec<String> {
    ice_servers
        .iter()
        .flat_map(|server| {
            let credentials = if server.username.is_empty() {
                None
            } else {
                Some((
                    quoted_string(&server.username),
                    quoted_string(&server.credential),
                ))
            };
            server.urls.iter().map(move |url| match &credentials {
                Some((username, credential)) => format!(
                    "<{url}>; rel=\"ice-server\"; username=\"{username}\"; credential=\"{credential}\"; credential-type=\"password\""
                ),
                None => format!("<{url}>; rel=\"ice-server\""),
            })
        })
        .collect()
}

/// Escapes `"` and `\` the way a JSON string does, without the surrounding quotes.
fn quoted_string(s: &str) -> String {
    let quoted = serde_json::Value::String(s.to_owned()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}
