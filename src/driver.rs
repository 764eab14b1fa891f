//! Process-wide driver state: the single object created when the host
//! loads the plug-in and destroyed on unload (§9 "Process-wide state").
//!
//! Holds the two virtual devices, spawns the egress/ingress worker tasks
//! at construction, and tears them down on `Drop` — mirroring the
//! teacher's `Drop for RealTimeAudioProcessor`, which stops its stream and
//! joins its processing thread rather than leaving cleanup to the caller.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;
use tokio::task::JoinHandle;

use crate::codec::CodecConfig;
use crate::config::DriverConfig;
use crate::facade::{DeviceEndpoint, IoOperation};
use crate::transport;

/// Owns the output/input device endpoints and the two long-lived transport
/// workers that bridge them to the peer. Constructing one spawns both
/// workers; dropping one requests their cancellation.
pub struct DriverState {
    pub output: DeviceEndpoint,
    pub input: DeviceEndpoint,
    running: Arc<AtomicBool>,
    egress_task: Option<JoinHandle<Result<()>>>,
    ingress_task: Option<JoinHandle<Result<()>>>,
}

impl DriverState {
    /// Build the driver state from `config` and spawn the transport
    /// workers on the current `tokio` runtime. Codec/socket construction
    /// failures during worker startup are not observed here (the workers
    /// retry internally per §4.5/§4.6); only config-level mistakes the
    /// facade must refuse at init time (§7 "Init failure") surface as an
    /// error from this constructor.
    pub fn new(config: &DriverConfig) -> Result<Self> {
        let output = DeviceEndpoint::new(
            IoOperation::WriteMix,
            config.ring.capacity_frames as usize,
            config.format.channels as usize,
            config.format.sample_rate,
            config.clock.period_frames,
            config.volume.default_scalar,
        );
        let input = DeviceEndpoint::new(
            IoOperation::ReadInput,
            config.ring.capacity_frames as usize,
            config.format.channels as usize,
            config.format.sample_rate,
            config.clock.period_frames,
            config.volume.default_scalar,
        );

        let codec_config = CodecConfig {
            sample_rate: config.format.sample_rate,
            channels: config.format.channels,
            frame_frames: config.codec.frame_frames,
            max_packet_bytes: config.codec.max_packet_bytes,
            bitrate: config.codec.bitrate,
            complexity: config.codec.complexity,
        };

        let egress_addr: SocketAddr = format!(
            "{}:{}",
            config.transport.peer_host, config.transport.egress_port
        )
        .parse()
        .context("invalid egress peer address")?;
        let ingress_addr: SocketAddr = format!(
            "{}:{}",
            config.transport.peer_host, config.transport.ingress_port
        )
        .parse()
        .context("invalid ingress peer address")?;

        let backoff = Duration::from_millis(config.transport.reconnect_backoff_ms as u64);
        let poll_interval = Duration::from_millis(config.transport.accumulator_poll_ms as u64);

        let running = Arc::new(AtomicBool::new(true));

        let egress_ring = output.ring_handle();
        let egress_volume = output.volume_handle();
        let egress_running = Arc::clone(&running);
        let egress_task = tokio::spawn(transport::run_egress_worker(
            egress_ring,
            egress_volume,
            codec_config,
            egress_addr,
            backoff,
            poll_interval,
            egress_running,
        ));

        let ingress_ring = input.ring_handle();
        let ingress_volume = input.volume_handle();
        let ingress_running = Arc::clone(&running);
        let ingress_task = tokio::spawn(transport::run_ingress_worker(
            ingress_ring,
            ingress_volume,
            codec_config,
            ingress_addr,
            backoff,
            ingress_running,
        ));

        Ok(Self {
            output,
            input,
            running,
            egress_task: Some(egress_task),
            ingress_task: Some(ingress_task),
        })
    }

    pub fn start_io(&self) {
        self.output.start_io();
        self.input.start_io();
    }

    pub fn stop_io(&self) {
        self.output.stop_io();
        self.input.stop_io();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

impl Drop for DriverState {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(task) = self.egress_task.take() {
            task.abort();
        }
        if let Some(task) = self.ingress_task.take() {
            task.abort();
        }
        info!("driver state torn down");
    }
}
