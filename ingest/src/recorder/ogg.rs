use std::fs::{File, OpenOptions};
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use tracing::debug;
use webrtc::media::io::ogg_writer::OggWriter;
use webrtc::media::io::Writer;
use webrtc::rtp::packet::Packet;

use super::naming::NameGenerator;
use super::RtpSink;

const CREATE_ATTEMPTS: usize = 8;

impl<W> RtpSink for OggWriter<W>
where
    W: Write + Seek + Send,
{
    fn write_packet(&mut self, packet: &Packet) -> anyhow::Result<()> {
        Ok(self.write_rtp(packet)?)
    }

    fn finalize(&mut self) -> anyhow::Result<()> {
        Ok(self.close()?)
    }
}

/// A freshly created `.ogg` file whose Opus headers are already written.
pub struct OggRecording {
    pub path: PathBuf,
    pub writer: OggWriter<File>,
}

impl OggRecording {
    /// Creates `<dir>/<random name>.ogg`. Never opens an existing file.
    pub fn create(
        dir: &Path,
        names: &NameGenerator,
        sample_rate: u32,
        channels: u8,
    ) -> anyhow::Result<Self> {
        let (path, file) = create_unique(dir, names)?;
        let writer = OggWriter::new(file, sample_rate, channels)
            .map_err(|e| anyhow!("{}: {}", path.display(), e))?;
        Ok(Self { path, writer })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

fn create_unique(dir: &Path, names: &NameGenerator) -> anyhow::Result<(PathBuf, File)> {
    for _ in 0..CREATE_ATTEMPTS {
        let path = dir.join(names.next_file_name());
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                debug!("[recorder] {} already exists, picking another name", path.display());
            }
            Err(err) => return Err(anyhow!("{}: {}", path.display(), err)),
        }
    }
    Err(anyhow!(
        "no free file name in {} after {} attempts",
        dir.display(),
        CREATE_ATTEMPTS
    ))
}
