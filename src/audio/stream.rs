//! cpal stream plumbing shared by the mic and system backends.
//!
//! cpal streams are not `Send`, so each capture runs on a dedicated thread
//! that owns the stream for its whole life. Frames leave the audio callback
//! through a bounded tokio channel (`try_send`, never blocking the callback);
//! a hardware-level failure flips a flag that makes the thread drop the
//! stream, which closes the frame channel and lets the controller react as if
//! the user had pressed stop.

use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::backend::{AudioFrame, CaptureSource};
use crate::error::ScribeError;

/// How the capture thread picks its input device.
pub(crate) enum DeviceSelector {
    /// The platform default input (microphone path)
    DefaultInput,
    /// A loopback/monitor input carrying system playback (tab-share path)
    Monitor,
}

/// Handle to a running capture thread.
pub(crate) struct CaptureThread {
    stop_tx: std_mpsc::Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CaptureThread {
    /// Signal the thread to drop the stream and wait for it to exit.
    pub(crate) async fn stop(&mut self) -> Result<()> {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            tokio::task::spawn_blocking(move || {
                if handle.join().is_err() {
                    warn!("capture thread panicked during shutdown");
                }
            })
            .await?;
        }
        Ok(())
    }
}

/// Spawn the capture thread and wait until the stream is actually running.
///
/// Device selection and stream construction happen on the thread (the device
/// handle never crosses threads); any failure is reported back through the
/// ready channel so callers see it as a start error, not a silent dead stream.
pub(crate) async fn spawn(
    selector: DeviceSelector,
    source: CaptureSource,
    target_sample_rate: u32,
    frames: mpsc::Sender<AudioFrame>,
) -> Result<CaptureThread> {
    let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();
    let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

    let handle = thread::Builder::new()
        .name(format!("audio-capture-{}", source))
        .spawn(move || capture_thread(selector, source, target_sample_rate, frames, ready_tx, stop_rx))?;

    match ready_rx.await {
        Ok(Ok(())) => Ok(CaptureThread {
            stop_tx,
            handle: Some(handle),
        }),
        Ok(Err(e)) => {
            let _ = handle.join();
            Err(e)
        }
        Err(_) => {
            let _ = handle.join();
            anyhow::bail!("capture thread exited before reporting readiness")
        }
    }
}

fn capture_thread(
    selector: DeviceSelector,
    source: CaptureSource,
    target_sample_rate: u32,
    frames: mpsc::Sender<AudioFrame>,
    ready_tx: oneshot::Sender<Result<()>>,
    stop_rx: std_mpsc::Receiver<()>,
) {
    let device = match resolve_device(&selector) {
        Ok(d) => d,
        Err(e) => {
            let _ = ready_tx.send(Err(e.into()));
            return;
        }
    };

    let device_name = device.name().unwrap_or_else(|_| "<unnamed>".to_string());
    info!("capturing {} audio from '{}'", source, device_name);

    let failed = Arc::new(AtomicBool::new(false));
    let stream = match build_stream(&device, source, target_sample_rate, frames, Arc::clone(&failed)) {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(ScribeError::PermissionDenied(format!(
            "could not start the audio stream on '{}': {}",
            device_name, e
        ))
        .into()));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    // Park until stopped, checking the failure flag so an unplugged device
    // closes the frame channel instead of leaving a zombie stream.
    loop {
        match stop_rx.recv_timeout(Duration::from_millis(250)) {
            Ok(()) | Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
            Err(std_mpsc::RecvTimeoutError::Timeout) => {
                if failed.load(Ordering::Relaxed) {
                    warn!("audio stream on '{}' failed; ending capture", device_name);
                    break;
                }
            }
        }
    }

    drop(stream);
    debug!("capture thread for {} exited", source);
}

fn resolve_device(selector: &DeviceSelector) -> Result<cpal::Device, ScribeError> {
    let host = cpal::default_host();

    match selector {
        DeviceSelector::DefaultInput => host.default_input_device().ok_or_else(|| {
            ScribeError::NoAudioInput(
                "No microphone input device is available. Check that a microphone is connected \
                 and the OS allows this application to use it."
                    .to_string(),
            )
        }),
        DeviceSelector::Monitor => {
            let devices = host.input_devices().map_err(|e| {
                ScribeError::PermissionDenied(format!("could not enumerate audio devices: {}", e))
            })?;

            devices
                .into_iter()
                .find(|d| d.name().map(|n| is_monitor_name(&n)).unwrap_or(false))
                .ok_or_else(|| {
                    ScribeError::NoAudioInput(
                        "No system loopback input was found. Enable a monitor source for your \
                         output device (e.g. in pavucontrol) and try again."
                            .to_string(),
                    )
                })
        }
    }
}

/// Loopback inputs announce themselves by name across platforms: PulseAudio
/// and PipeWire expose "Monitor of ...", Windows drivers call it "Stereo Mix",
/// and the common macOS virtual devices are BlackHole and Loopback.
fn is_monitor_name(name: &str) -> bool {
    let name = name.to_lowercase();
    name.contains("monitor")
        || name.contains("stereo mix")
        || name.contains("loopback")
        || name.contains("blackhole")
}

fn build_stream(
    device: &cpal::Device,
    source: CaptureSource,
    target_sample_rate: u32,
    frames: mpsc::Sender<AudioFrame>,
    failed: Arc<AtomicBool>,
) -> Result<cpal::Stream> {
    let (sample_format, config) = pick_stream_config(device, target_sample_rate)?;

    debug!(
        "opening input stream: {:?}, {}Hz, {}ch",
        sample_format, config.sample_rate.0, config.channels
    );

    let stream = match sample_format {
        SampleFormat::F32 => build_typed_stream::<f32>(device, &config, source, frames, failed),
        SampleFormat::I16 => build_typed_stream::<i16>(device, &config, source, frames, failed),
        SampleFormat::U16 => build_typed_stream::<u16>(device, &config, source, frames, failed),
        SampleFormat::I32 => build_typed_stream::<i32>(device, &config, source, frames, failed),
        other => anyhow::bail!("unsupported input sample format: {:?}", other),
    }?;

    Ok(stream)
}

/// Prefer opening the device directly at the target rate; fall back to its
/// default configuration and resample downstream.
fn pick_stream_config(
    device: &cpal::Device,
    target_sample_rate: u32,
) -> Result<(SampleFormat, StreamConfig)> {
    let default = device.default_input_config().map_err(|e| {
        ScribeError::PermissionDenied(format!("could not read the device configuration: {}", e))
    })?;

    if let Ok(mut supported) = device.supported_input_configs() {
        if let Some(range) = supported.find(|r| {
            r.sample_format() == default.sample_format()
                && r.min_sample_rate().0 <= target_sample_rate
                && target_sample_rate <= r.max_sample_rate().0
        }) {
            let cfg = range.with_sample_rate(cpal::SampleRate(target_sample_rate));
            return Ok((cfg.sample_format(), cfg.config()));
        }
    }

    Ok((default.sample_format(), default.config()))
}

fn build_typed_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    source: CaptureSource,
    frames: mpsc::Sender<AudioFrame>,
    failed: Arc<AtomicBool>,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let sample_rate = config.sample_rate.0;
    let channels = config.channels;

    let data_callback = move |data: &[T], _: &cpal::InputCallbackInfo| {
        let samples: Vec<f32> = data.iter().map(|&s| f32::from_sample(s)).collect();

        let frame = AudioFrame {
            samples,
            sample_rate,
            channels,
            source,
        };

        match frames.try_send(frame) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                // The consumer is behind; dropping one frame beats stalling
                // the audio callback.
                debug!("audio frame dropped: channel full");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    };

    let error_failed = Arc::clone(&failed);
    let error_callback = move |err: cpal::StreamError| {
        warn!("audio stream error: {}", err);
        error_failed.store(true, Ordering::Relaxed);
    };

    let stream = device
        .build_input_stream(config, data_callback, error_callback, None)
        .map_err(|e| match e {
            cpal::BuildStreamError::DeviceNotAvailable => anyhow::Error::from(
                ScribeError::NoAudioInput("The selected audio device is no longer available.".to_string()),
            ),
            other => anyhow::Error::from(ScribeError::PermissionDenied(format!(
                "the platform refused to open the input stream: {}",
                other
            ))),
        })?;

    Ok(stream)
}
