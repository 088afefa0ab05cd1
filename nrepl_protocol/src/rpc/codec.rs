use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use super::NreplError;
use crate::bencode::{self, DecodeError, Value};
use crate::message::Message;

/// Frames nREPL messages on a byte stream.
///
/// Each frame is one bencoded dictionary. Decoding waits until a complete
/// dictionary is buffered; anything that cannot become one is a
/// [`NreplError::ProtocolDecode`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NreplCodec;

impl NreplCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for NreplCodec {
    type Item = Message;
    type Error = NreplError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, NreplError> {
        if src.is_empty() {
            return Ok(None);
        }
        match bencode::decode(src) {
            Ok((Value::Dict(fields), used)) => {
                src.advance(used);
                trace!("Decoded frame of {} bytes", used);
                Ok(Some(Message::from(fields)))
            }
            Ok((other, _)) => Err(NreplError::ProtocolDecode(format!(
                "expected a dictionary frame, got {:?}",
                other
            ))),
            Err(DecodeError::Incomplete) => Ok(None),
            Err(e @ DecodeError::Malformed { .. }) => Err(NreplError::ProtocolDecode(e.to_string())),
        }
    }
}

impl Encoder<Message> for NreplCodec {
    type Error = NreplError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), NreplError> {
        bencode::encode(&item.into_value(), dst);
        Ok(())
    }
}
