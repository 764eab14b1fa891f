//! Egress and ingress transport workers: bridge the realtime rings to a
//! peer over two independent TCP byte-stream connections.
//!
//! Each worker is an outer reconnect loop wrapping an inner steady-state
//! loop, the same two-loop shape the teacher uses for its network/audio
//! worker threads — reconnect on failure with a fixed backoff, run steady
//! state until an error, then fall back out to reconnect. Here the workers
//! are `tokio` tasks rather than `std::thread`s (the spec's own stated
//! equivalence between preemptive threads with blocking I/O and async
//! tasks), cooperatively cancelled through an `AtomicBool` rather than a
//! `Mutex<bool>` running flag.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::sleep;

use crate::codec::{self, CodecConfig, EgressCodec, IngressCodec, WIRE_LENGTH_PREFIX_BYTES};
use crate::ring::FrameRing;
use crate::volume::VolumeControl;

/// Shared cancellation flag for both workers, observed between network
/// operations and before every sleep.
pub type RunningFlag = Arc<AtomicBool>;

async fn connect_with_backoff(addr: SocketAddr, backoff: Duration, running: &RunningFlag) -> Option<TcpStream> {
    loop {
        if !running.load(Ordering::Relaxed) {
            return None;
        }
        match TcpStream::connect(addr).await {
            Ok(stream) => return Some(stream),
            Err(e) => {
                warn!("transport connect to {addr} failed: {e}, retrying in {backoff:?}");
                sleep(backoff).await;
            }
        }
    }
}

/// Drains the egress ring in codec-frame units, encodes, and writes framed
/// packets to the peer. Runs until `running` is cleared.
pub async fn run_egress_worker(
    ring: Arc<FrameRing>,
    volume: Arc<VolumeControl>,
    codec_config: CodecConfig,
    peer_addr: SocketAddr,
    backoff: Duration,
    poll_interval: Duration,
    running: RunningFlag,
) -> Result<()> {
    let channels = ring.channels();
    let frame_frames = codec_config.frame_frames as usize;
    let mut accumulator = vec![0.0f32; 0];
    accumulator.reserve(frame_frames * channels);

    'outer: while running.load(Ordering::Relaxed) {
        let stream = match connect_with_backoff(peer_addr, backoff, &running).await {
            Some(stream) => stream,
            None => break,
        };
        info!("egress worker connected to {peer_addr}");
        let mut stream = stream;
        let mut codec = EgressCodec::new(codec_config).context("egress codec init")?;
        accumulator.clear();

        while running.load(Ordering::Relaxed) {
            let need = frame_frames - accumulator.len() / channels;
            if need > 0 {
                let mut scratch = vec![0.0f32; need * channels];
                let got = ring.read(&mut scratch);
                accumulator.extend_from_slice(&scratch[..got * channels]);
            }

            if accumulator.len() < frame_frames * channels {
                sleep(poll_interval).await;
                continue;
            }

            match codec.encode_wire_frame(&accumulator, &volume) {
                Ok(Some(wire)) => {
                    if let Err(e) = stream.write_all(&wire).await {
                        warn!("egress write failed, reconnecting: {e}");
                        accumulator.clear();
                        continue 'outer;
                    }
                }
                Ok(None) => {
                    // encoder declined this frame; drop it and keep going
                }
                Err(e) => {
                    warn!("egress codec error, discarding accumulator: {e}");
                }
            }
            accumulator.clear();
        }
    }

    info!("egress worker shutting down");
    Ok(())
}

async fn read_wire_frame(stream: &mut TcpStream, max_packet_bytes: u32) -> Result<Vec<u8>> {
    let mut len_buf = [0u8; WIRE_LENGTH_PREFIX_BYTES];
    stream
        .read_exact(&mut len_buf)
        .await
        .context("reading wire frame length")?;
    let len = u16::from_be_bytes(len_buf);
    let len = codec::validate_wire_length(len, max_packet_bytes)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let mut payload = vec![0u8; len];
    stream
        .read_exact(&mut payload)
        .await
        .context("reading wire frame payload")?;
    Ok(payload)
}

/// Reads framed packets from the peer, decodes, and writes PCM into the
/// ingress ring. Runs until `running` is cleared.
pub async fn run_ingress_worker(
    ring: Arc<FrameRing>,
    volume: Arc<VolumeControl>,
    codec_config: CodecConfig,
    peer_addr: SocketAddr,
    backoff: Duration,
    running: RunningFlag,
) -> Result<()> {
    while running.load(Ordering::Relaxed) {
        let stream = match connect_with_backoff(peer_addr, backoff, &running).await {
            Some(stream) => stream,
            None => break,
        };
        info!("ingress worker connected to {peer_addr}");
        let mut stream = stream;
        let mut codec = IngressCodec::new(codec_config).context("ingress codec init")?;

        loop {
            if !running.load(Ordering::Relaxed) {
                break;
            }
            let payload = match read_wire_frame(&mut stream, codec_config.max_packet_bytes).await {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("ingress read failed, reconnecting: {e}");
                    break;
                }
            };

            match codec.decode_frame(&payload, &volume) {
                Ok(Some(pcm)) => {
                    ring.write(&pcm);
                }
                Ok(None) => {
                    // decoder declined this frame; drop and continue
                }
                Err(e) => {
                    warn!("ingress codec error, discarding frame: {e}");
                }
            }
        }
    }

    info!("ingress worker shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodecSettings;

    fn codec_config_from(settings: &CodecSettings, sample_rate: u32, channels: u32) -> CodecConfig {
        CodecConfig {
            sample_rate,
            channels,
            frame_frames: settings.frame_frames,
            max_packet_bytes: settings.max_packet_bytes,
            bitrate: settings.bitrate,
            complexity: settings.complexity,
        }
    }

    #[tokio::test]
    async fn egress_worker_exits_promptly_when_running_flag_is_already_clear() {
        let ring = Arc::new(FrameRing::new(8192, 2));
        let volume = Arc::new(VolumeControl::default());
        let settings = CodecSettings {
            frame_frames: 960,
            max_packet_bytes: 1500,
            bitrate: 64_000,
            complexity: 5,
        };
        let codec_config = codec_config_from(&settings, 48_000, 2);
        let running = Arc::new(AtomicBool::new(false));

        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let result = run_egress_worker(
            ring,
            volume,
            codec_config,
            addr,
            Duration::from_millis(10),
            Duration::from_millis(2),
            running,
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn ingress_worker_exits_promptly_when_running_flag_is_already_clear() {
        let ring = Arc::new(FrameRing::new(8192, 2));
        let volume = Arc::new(VolumeControl::default());
        let settings = CodecSettings {
            frame_frames: 960,
            max_packet_bytes: 1500,
            bitrate: 64_000,
            complexity: 5,
        };
        let codec_config = codec_config_from(&settings, 48_000, 2);
        let running = Arc::new(AtomicBool::new(false));

        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let result = run_ingress_worker(
            ring,
            volume,
            codec_config,
            addr,
            Duration::from_millis(10),
            running,
        )
        .await;
        assert!(result.is_ok());
    }
}
