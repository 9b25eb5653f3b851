//! cpal capture backend.
//!
//! Each capture stream lives on its own owner thread, because `cpal::Stream`
//! is not `Send` on every platform. `CpalInputPort` forwards start/stop/close
//! to that thread and waits for the acknowledgement.
//!
//! Incoming devices without inputs are captured through loopback: cpal's
//! WASAPI host opens an input stream on the render endpoint. Other hosts have
//! no loopback, so the incoming device must be a monitor input there.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize, FromSample, SampleFormat, SampleRate, SizedSample, StreamConfig};
use crossbeam_channel::{Receiver, Sender};

use duplex_capture_core::models::audio_models::{DeviceDescriptor, StreamRole};
use duplex_capture_core::models::error::RecorderError;
use duplex_capture_core::processing::downmix::downmix_converted;
use duplex_capture_core::traits::audio_backend::{AudioBackend, AudioInputPort, StreamRequest};
use duplex_capture_core::traits::frame_sink::FrameSink;

use crate::device_catalog::DeviceCatalog;

/// Upper bound on waiting for the owner thread to acknowledge a command.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens capture streams on one cpal host.
#[derive(Debug, Clone, Copy)]
pub struct CpalBackend {
    host_id: cpal::HostId,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self {
            host_id: cpal::default_host().id(),
        }
    }

    pub fn catalog(&self) -> Result<DeviceCatalog, RecorderError> {
        DeviceCatalog::for_host(self.host_id)
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    type Port = CpalInputPort;

    fn describe(&self, device_id: &str) -> Result<DeviceDescriptor, RecorderError> {
        self.catalog()?.describe(device_id)
    }

    fn open(&self, request: &StreamRequest, sink: Arc<dyn FrameSink>) -> Result<CpalInputPort, RecorderError> {
        CpalInputPort::open(self.host_id, request.clone(), sink)
    }
}

enum Command {
    Start,
    Stop,
    Close,
}

type Reply = Sender<Result<(), RecorderError>>;

/// Handle to a capture stream owned by a dedicated thread.
pub struct CpalInputPort {
    label: String,
    commands: Option<Sender<(Command, Reply)>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl CpalInputPort {
    fn open(host_id: cpal::HostId, request: StreamRequest, sink: Arc<dyn FrameSink>) -> Result<Self, RecorderError> {
        let label = format!("{} [{}]", request.role.label(), request.device_id);
        let (command_tx, command_rx) = crossbeam_channel::unbounded::<(Command, Reply)>();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), RecorderError>>(1);

        let handle = thread::Builder::new()
            .name(format!("capture-{}", request.role.label().to_lowercase()))
            .spawn(move || stream_owner(host_id, request, sink, ready_tx, command_rx))
            .map_err(|e| RecorderError::Internal(format!("failed to spawn capture thread: {}", e)))?;

        let opened = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(RecorderError::DeviceOpenFailed("capture thread exited during open".into())));

        if let Err(e) = opened {
            if handle.join().is_err() {
                log::warn!("{}: capture thread panicked", label);
            }
            return Err(e);
        }

        log::debug!("{}: stream opened", label);
        Ok(Self {
            label,
            commands: Some(command_tx),
            thread: Some(handle),
        })
    }

    fn send(&self, command: Command) -> Result<(), RecorderError> {
        let commands = self
            .commands
            .as_ref()
            .ok_or_else(|| RecorderError::Internal(format!("{}: stream already closed", self.label)))?;
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        commands
            .send((command, reply_tx))
            .map_err(|_| RecorderError::Internal(format!("{}: capture thread is gone", self.label)))?;
        reply_rx
            .recv_timeout(COMMAND_TIMEOUT)
            .map_err(|_| RecorderError::Internal(format!("{}: capture thread did not respond", self.label)))?
    }
}

impl AudioInputPort for CpalInputPort {
    fn start(&mut self) -> Result<(), RecorderError> {
        self.send(Command::Start)
    }

    fn stop(&mut self) -> Result<(), RecorderError> {
        if self.commands.is_none() {
            return Ok(());
        }
        self.send(Command::Stop)
    }

    fn close(&mut self) -> Result<(), RecorderError> {
        if self.commands.is_none() {
            return Ok(());
        }
        let result = self.send(Command::Close);
        self.commands = None;
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::warn!("{}: capture thread panicked", self.label);
            }
        }
        result
    }
}

impl Drop for CpalInputPort {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("{}: {}", self.label, e);
        }
    }
}

/// Body of the owner thread: build the stream, report readiness, then serve commands.
fn stream_owner(
    host_id: cpal::HostId,
    request: StreamRequest,
    sink: Arc<dyn FrameSink>,
    ready: Sender<Result<(), RecorderError>>,
    commands: Receiver<(Command, Reply)>,
) {
    let stream = match open_stream(host_id, &request, sink) {
        Ok(stream) => {
            let _ = ready.send(Ok(()));
            stream
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    // Ends on Close, or when the port is dropped without closing.
    for (command, reply) in commands.iter() {
        let result = match command {
            Command::Start => stream
                .play()
                .map_err(|e| RecorderError::DeviceOpenFailed(format!("failed to start stream: {}", e))),
            Command::Stop => stream
                .pause()
                .map_err(|e| RecorderError::Internal(format!("failed to pause stream: {}", e))),
            Command::Close => {
                let _ = reply.send(Ok(()));
                break;
            }
        };
        let _ = reply.send(result);
    }
    drop(stream);
}

fn open_stream(
    host_id: cpal::HostId,
    request: &StreamRequest,
    sink: Arc<dyn FrameSink>,
) -> Result<cpal::Stream, RecorderError> {
    let (device, descriptor) = DeviceCatalog::for_host(host_id)?.find(&request.device_id)?;

    let loopback = request.role == StreamRole::Incoming && !descriptor.is_input();
    if loopback && !cfg!(target_os = "windows") {
        return Err(RecorderError::DeviceOpenFailed(format!(
            "{} has no inputs; choose its monitor source to capture system audio",
            descriptor.name
        )));
    }

    let format = sample_format(&device, request, loopback)?;
    let config = StreamConfig {
        channels: request.channels,
        sample_rate: SampleRate(request.sample_rate),
        buffer_size: BufferSize::Fixed(request.block_size),
    };

    log::info!(
        "Opening {} stream on {} ({} Hz, {} ch, {:?}{})",
        request.role.label(),
        descriptor.name,
        request.sample_rate,
        request.channels,
        format,
        if loopback { ", loopback" } else { "" }
    );

    match build_stream(&device, &config, format, Arc::clone(&sink)) {
        Ok(stream) => Ok(stream),
        Err(e) => {
            log::debug!(
                "{} frames per callback rejected ({}); using the device default",
                request.block_size,
                e
            );
            let config = StreamConfig {
                buffer_size: BufferSize::Default,
                ..config
            };
            build_stream(&device, &config, format, sink)
                .map_err(|e| RecorderError::DeviceOpenFailed(format!("{}: {}", descriptor.name, e)))
        }
    }
}

/// Sample format of a supported config matching the request's channels and rate.
fn sample_format(device: &cpal::Device, request: &StreamRequest, loopback: bool) -> Result<SampleFormat, RecorderError> {
    let rate = SampleRate(request.sample_rate);
    let matches = |c: &cpal::SupportedStreamConfigRange| {
        c.channels() == request.channels && c.min_sample_rate() <= rate && rate <= c.max_sample_rate()
    };

    let candidates: Vec<SampleFormat> = if loopback {
        device
            .supported_output_configs()
            .map(|configs| configs.filter(matches).map(|c| c.sample_format()).collect())
            .unwrap_or_default()
    } else {
        device
            .supported_input_configs()
            .map(|configs| configs.filter(matches).map(|c| c.sample_format()).collect())
            .unwrap_or_default()
    };

    if let Some(format) = pick_sample_format(&candidates) {
        return Ok(format);
    }

    let fallback = if loopback {
        device.default_output_config().map(|c| c.sample_format())
    } else {
        device.default_input_config().map(|c| c.sample_format())
    }
    .map_err(|e| RecorderError::DeviceOpenFailed(format!("no usable stream config: {}", e)))?;

    pick_sample_format(&[fallback])
        .ok_or_else(|| RecorderError::DeviceOpenFailed(format!("unsupported sample format {:?}", fallback)))
}

/// Preferred format among `candidates`: f32, then i16, then u16.
pub(crate) fn pick_sample_format(candidates: &[SampleFormat]) -> Option<SampleFormat> {
    [SampleFormat::F32, SampleFormat::I16, SampleFormat::U16]
        .into_iter()
        .find(|preferred| candidates.contains(preferred))
}

fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    format: SampleFormat,
    sink: Arc<dyn FrameSink>,
) -> Result<cpal::Stream, cpal::BuildStreamError> {
    match format {
        SampleFormat::F32 => build_float(device, config, sink),
        SampleFormat::I16 => build_converting::<i16>(device, config, sink),
        SampleFormat::U16 => build_converting::<u16>(device, config, sink),
        _ => Err(cpal::BuildStreamError::StreamConfigNotSupported),
    }
}

fn build_float(
    device: &cpal::Device,
    config: &StreamConfig,
    sink: Arc<dyn FrameSink>,
) -> Result<cpal::Stream, cpal::BuildStreamError> {
    let channels = config.channels;
    let data_sink = Arc::clone(&sink);
    device.build_input_stream(
        config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| data_sink.on_frame(data, channels),
        move |err: cpal::StreamError| sink.on_stream_error(&err.to_string()),
        None,
    )
}

fn build_converting<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    sink: Arc<dyn FrameSink>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + Send + 'static,
    f32: FromSample<T>,
{
    let channels = config.channels;
    let data_sink = Arc::clone(&sink);
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            data_sink.on_mono_frame(to_mono(data, channels));
        },
        move |err: cpal::StreamError| sink.on_stream_error(&err.to_string()),
        None,
    )
}

/// Convert integer samples to f32 and downmix them in a single pass.
pub(crate) fn to_mono<T>(data: &[T], channels: u16) -> Vec<f32>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    downmix_converted(data, channels as usize, |s| <f32 as FromSample<T>>::from_sample_(s))
}
