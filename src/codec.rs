//! Codec / framing shim: converts between realtime float PCM and
//! length-prefixed compressed wire frames, applying volume/mute at the
//! boundary so gain changes take effect on codec-frame boundaries rather
//! than mid-frame.
//!
//! The codec itself is a real Opus binding (`audiopus`), the same crate and
//! API shape used elsewhere in this corpus for voice-frame encode/decode.
//! Unlike that usage, the PCM<->codec-frame boundary here lives in the
//! transport workers (`transport.rs`), which own the accumulator; this
//! module only ever sees exactly one codec frame's worth of samples at a
//! time.

use anyhow::{anyhow, Result};
use audiopus::{coder::Decoder, coder::Encoder, Application, Bitrate, Channels, SampleRate};
use log::warn;

use crate::volume::VolumeControl;

/// Wire frame length prefix is 2 bytes, so a payload can never exceed this.
pub const WIRE_LENGTH_PREFIX_BYTES: usize = 2;

fn to_opus_sample_rate(sample_rate: u32) -> Result<SampleRate> {
    match sample_rate {
        8000 => Ok(SampleRate::Hz8000),
        12000 => Ok(SampleRate::Hz12000),
        16000 => Ok(SampleRate::Hz16000),
        24000 => Ok(SampleRate::Hz24000),
        48000 => Ok(SampleRate::Hz48000),
        other => Err(anyhow!("unsupported sample rate: {other}")),
    }
}

fn to_opus_channels(channels: u32) -> Result<Channels> {
    match channels {
        1 => Ok(Channels::Mono),
        2 => Ok(Channels::Stereo),
        other => Err(anyhow!("unsupported channel count: {other}")),
    }
}

/// Fixed configuration shared by the egress encoder and ingress decoder.
#[derive(Debug, Clone, Copy)]
pub struct CodecConfig {
    pub sample_rate: u32,
    pub channels: u32,
    pub frame_frames: u32,
    pub max_packet_bytes: u32,
    pub bitrate: u32,
    pub complexity: u32,
}

/// Owns the Opus encoder and the float->i16 scratch buffer for one egress
/// stream. One codec frame in, one wire frame out.
pub struct EgressCodec {
    config: CodecConfig,
    encoder: Encoder,
    pcm_i16: Vec<i16>,
    encoded: Vec<u8>,
}

impl EgressCodec {
    pub fn new(config: CodecConfig) -> Result<Self> {
        let sample_rate = to_opus_sample_rate(config.sample_rate)?;
        let channels = to_opus_channels(config.channels)?;

        let mut encoder = Encoder::new(sample_rate, channels, Application::Voip)
            .map_err(|e| anyhow!("failed to create Opus encoder: {e}"))?;
        encoder
            .set_bitrate(Bitrate::BitsPerSecond(config.bitrate as i32))
            .map_err(|e| anyhow!("failed to set Opus bitrate: {e}"))?;
        encoder
            .set_complexity(config.complexity as u8)
            .map_err(|e| anyhow!("failed to set Opus complexity: {e}"))?;
        encoder
            .set_vbr(true)
            .map_err(|e| anyhow!("failed to enable Opus VBR: {e}"))?;

        let frame_samples = config.frame_frames as usize * config.channels as usize;
        Ok(Self {
            config,
            encoder,
            pcm_i16: vec![0i16; frame_samples],
            encoded: vec![0u8; config.max_packet_bytes as usize],
        })
    }

    /// Encode one codec frame of interleaved float PCM (exactly
    /// `frame_frames * channels` samples) into a wire frame, applying the
    /// supplied volume snapshot. On codec failure, returns `Ok(None)`: the
    /// caller discards the frame and continues without reconnecting (§7).
    pub fn encode_wire_frame(
        &mut self,
        pcm: &[f32],
        volume: &VolumeControl,
    ) -> Result<Option<Vec<u8>>> {
        let expected = self.config.frame_frames as usize * self.config.channels as usize;
        if pcm.len() != expected {
            return Err(anyhow!(
                "egress codec frame size mismatch: expected {expected} samples, got {}",
                pcm.len()
            ));
        }

        let gain = volume.effective_gain();
        for (dst, &sample) in self.pcm_i16.iter_mut().zip(pcm.iter()) {
            let scaled = (sample * gain).clamp(-1.0, 1.0) * 32767.0;
            *dst = scaled.round() as i16;
        }

        match self.encoder.encode(&self.pcm_i16, &mut self.encoded) {
            Ok(len) if len > 0 => {
                let mut wire = Vec::with_capacity(WIRE_LENGTH_PREFIX_BYTES + len);
                wire.extend_from_slice(&(len as u16).to_be_bytes());
                wire.extend_from_slice(&self.encoded[..len]);
                Ok(Some(wire))
            }
            Ok(_) => {
                warn!("Opus encoder produced an empty packet, discarding frame");
                Ok(None)
            }
            Err(e) => {
                warn!("Opus encode failed, discarding accumulator: {e}");
                Ok(None)
            }
        }
    }
}

/// Owns the Opus decoder and the i16->float scratch buffer for one ingress
/// stream. One wire frame payload in, one codec frame of PCM out.
pub struct IngressCodec {
    config: CodecConfig,
    decoder: Decoder,
    pcm_i16: Vec<i16>,
}

impl IngressCodec {
    pub fn new(config: CodecConfig) -> Result<Self> {
        let sample_rate = to_opus_sample_rate(config.sample_rate)?;
        let channels = to_opus_channels(config.channels)?;
        let decoder = Decoder::new(sample_rate, channels)
            .map_err(|e| anyhow!("failed to create Opus decoder: {e}"))?;

        let frame_samples = config.frame_frames as usize * config.channels as usize;
        Ok(Self {
            config,
            decoder,
            pcm_i16: vec![0i16; frame_samples],
        })
    }

    /// Decode one wire frame payload into interleaved float PCM, applying
    /// the supplied volume snapshot. Returns `Ok(None)` on codec failure:
    /// the caller discards this frame and continues (§7), no reconnect.
    pub fn decode_frame(
        &mut self,
        payload: &[u8],
        volume: &VolumeControl,
    ) -> Result<Option<Vec<f32>>> {
        use audiopus::{packet::Packet, MutSignals};

        let packet = match Packet::try_from(payload) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("invalid Opus packet, discarding frame: {e}");
                return Ok(None);
            }
        };
        let signals = MutSignals::try_from(&mut self.pcm_i16[..])
            .map_err(|e| anyhow!("failed to wrap decode buffer: {e}"))?;

        let decoded_per_channel = match self.decoder.decode(Some(packet), signals, false) {
            Ok(len) => len,
            Err(e) => {
                warn!("Opus decode failed, discarding frame: {e}");
                return Ok(None);
            }
        };

        let total_samples = decoded_per_channel * self.config.channels as usize;
        let gain = volume.effective_gain();
        let pcm = self.pcm_i16[..total_samples]
            .iter()
            .map(|&s| (s as f32 / 32768.0) * gain)
            .collect();
        Ok(Some(pcm))
    }
}

/// Validate a wire frame length header against the configured ceiling.
/// `0` and anything above `max_packet_bytes` is a fatal protocol error.
pub fn validate_wire_length(len: u16, max_packet_bytes: u32) -> Result<usize, crate::error::DriverError> {
    if len == 0 || len as u32 > max_packet_bytes {
        Err(crate::error::DriverError::InvalidFrameLength(len))
    } else {
        Ok(len as usize)
    }
}
