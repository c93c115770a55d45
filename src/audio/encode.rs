use base64::Engine;

/// MIME descriptor the live service expects for raw PCM frames.
pub const PCM_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// One encoded audio frame, ready to stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    /// Base64-encoded little-endian PCM16 bytes
    pub data: String,
    /// Fixed MIME descriptor (`audio/pcm;rate=16000`)
    pub mime_type: &'static str,
}

/// Encode a block of float samples as base64 PCM16.
///
/// Policy: clamp to [-1.0, 1.0], scale by 32768, truncate toward zero. The
/// cast saturates, so +1.0 maps to 32767 and -1.0 to -32768. Bytes are packed
/// little-endian. Pure and deterministic; the hot path of every frame.
pub fn encode_pcm16(samples: &[f32]) -> AudioPayload {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * 32768.0) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    AudioPayload {
        data: base64::engine::general_purpose::STANDARD.encode(&bytes),
        mime_type: PCM_MIME_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn decode(payload: &AudioPayload) -> Vec<u8> {
        base64::engine::general_purpose::STANDARD
            .decode(&payload.data)
            .unwrap()
    }

    #[test]
    fn encoding_is_deterministic() {
        let block = vec![0.0, 0.25, -0.25, 0.99];
        assert_eq!(encode_pcm16(&block), encode_pcm16(&block));
    }

    #[test]
    fn out_of_range_samples_clamp_before_scaling() {
        assert_eq!(encode_pcm16(&[1.5]), encode_pcm16(&[1.0]));
        assert_eq!(encode_pcm16(&[-7.0]), encode_pcm16(&[-1.0]));
    }

    #[test]
    fn empty_block_yields_empty_payload_with_same_mime() {
        let payload = encode_pcm16(&[]);
        assert!(payload.data.is_empty());
        assert_eq!(payload.mime_type, PCM_MIME_TYPE);
    }

    #[test]
    fn samples_pack_little_endian() {
        // 0.5 * 32768 = 16384 = 0x4000 -> bytes [0x00, 0x40]
        let payload = encode_pcm16(&[0.5]);
        assert_eq!(decode(&payload), vec![0x00, 0x40]);
    }

    #[test]
    fn full_scale_values_saturate() {
        // +1.0 saturates to 32767 (0x7FFF), -1.0 is exactly -32768 (0x8000)
        assert_eq!(decode(&encode_pcm16(&[1.0])), vec![0xFF, 0x7F]);
        assert_eq!(decode(&encode_pcm16(&[-1.0])), vec![0x00, 0x80]);
    }

    #[test]
    fn silence_encodes_to_zero_bytes() {
        let payload = encode_pcm16(&[0.0; 4]);
        assert_eq!(decode(&payload), vec![0u8; 8]);
    }
}
