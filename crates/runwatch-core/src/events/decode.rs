use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio_util::bytes::BytesMut;
use tokio_util::codec::Decoder;

const DATA_FIELD: &[u8] = b"data:";

/// How payload lines are carried inside the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Framing {
    /// Server-sent events: only `data:` fields carry payload.
    #[default]
    EventStream,
    /// Every line is payload, e.g. captured runner output.
    Plain,
}

/// Splits a fragmented byte stream into payload lines.
///
/// Bytes are buffered until a `\n` arrives, so a line (or a multi-byte
/// character) split across two fragments is decoded once it is complete.
#[derive(Debug, Clone, Default)]
pub struct LineDecoder {
    framing: Framing,
    // Bytes of the buffer already scanned for a newline.
    scanned: usize,
}

impl LineDecoder {
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            scanned: 0,
        }
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Returns the next complete payload line, skipping envelope-only lines.
    pub fn decode_line(&mut self, buf: &mut BytesMut) -> Option<String> {
        loop {
            let Some(offset) = buf[self.scanned..].iter().position(|b| *b == b'\n') else {
                self.scanned = buf.len();
                return None;
            };
            let line = buf.split_to(self.scanned + offset + 1);
            self.scanned = 0;
            if let Some(payload) = self.payload(&line[..line.len() - 1]) {
                return Some(payload);
            }
        }
    }

    /// Like [`decode_line`](Self::decode_line), but flushes an unterminated
    /// trailing line once the stream has ended.
    pub fn decode_line_eof(&mut self, buf: &mut BytesMut) -> Option<String> {
        if let Some(line) = self.decode_line(buf) {
            return Some(line);
        }
        if buf.is_empty() {
            return None;
        }
        let rest = buf.split();
        self.scanned = 0;
        self.payload(&rest)
    }

    fn payload(&self, raw: &[u8]) -> Option<String> {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let payload = match self.framing {
            Framing::Plain => raw,
            Framing::EventStream => {
                let data = raw.strip_prefix(DATA_FIELD)?;
                data.strip_prefix(b" ").unwrap_or(data)
            }
        };
        Some(String::from_utf8_lossy(payload).into_owned())
    }
}

impl Decoder for LineDecoder {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        Ok(self.decode_line(buf))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        Ok(self.decode_line_eof(buf))
    }
}
