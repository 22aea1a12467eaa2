use crate::error::CodecError;
use crate::message::Message;

/// Split a raw router-socket envelope `[identity_frames..., empty_frame, payload_frames...]`
/// into the identity prefix and the decoded message body. The identity prefix is returned
/// untouched — the codec never inspects it, only the plane that owns the socket does.
pub fn split_router_envelope<B: AsRef<[u8]>>(frames: Vec<B>) -> Result<(Vec<B>, Message), CodecError> {
    let delimiter = frames
        .iter()
        .position(|frame| frame.as_ref().is_empty())
        .ok_or(CodecError::MissingEnvelopeDelimiter)?;

    let mut frames = frames;
    let body_frames: Vec<B> = frames.split_off(delimiter + 1);
    frames.truncate(delimiter); // drop the empty delimiter frame itself
    let message = Message::decode_frames(&body_frames)?;
    Ok((frames, message))
}

/// Build a router envelope addressed to `identity_frames` carrying `message`.
pub fn build_router_envelope(identity_frames: Vec<Vec<u8>>, message: &Message) -> Vec<Vec<u8>> {
    let mut envelope = identity_frames;
    envelope.push(Vec::new());
    envelope.push(message.encode());
    envelope
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_single_identity_frame() {
        let msg = Message::request_value("app", "cfg", None);
        let frames: Vec<Vec<u8>> = vec![b"ident".to_vec(), Vec::new(), msg.encode()];
        let (identity, decoded) = split_router_envelope(frames).unwrap();
        assert_eq!(identity, vec![b"ident".to_vec()]);
        assert_eq!(decoded, msg);
    }

    #[test]
    fn splits_multi_frame_identity_prefix() {
        let msg = Message::request_value("app", "cfg", None);
        let frames: Vec<Vec<u8>> = vec![b"hop1".to_vec(), b"hop2".to_vec(), Vec::new(), msg.encode()];
        let (identity, decoded) = split_router_envelope(frames).unwrap();
        assert_eq!(identity, vec![b"hop1".to_vec(), b"hop2".to_vec()]);
        assert_eq!(decoded, msg);
    }

    #[test]
    fn missing_delimiter_is_an_error() {
        let frames: Vec<Vec<u8>> = vec![b"ident".to_vec(), b"no-delimiter".to_vec()];
        let err = split_router_envelope(frames).unwrap_err();
        assert!(matches!(err, CodecError::MissingEnvelopeDelimiter));
    }

    #[test]
    fn build_then_split_round_trips() {
        let msg = Message::reply("BROKER", "app", 0, 1.0, Some(serde_json::json!({"k": 1})));
        let envelope = build_router_envelope(vec![b"ident".to_vec()], &msg);
        let (identity, decoded) = split_router_envelope(envelope).unwrap();
        assert_eq!(identity, vec![b"ident".to_vec()]);
        assert_eq!(decoded, msg);
    }
}
