//! cpal binding for the shared destination

use std::sync::Arc;

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::config::AnalyserConfig;
use crate::error::{VisualizerError, VisualizerResult};

use super::context::{AudioContext, AudioHost, Destination};

/// Audio host backed by the default cpal output device
pub struct CpalHost {
    analyser: AnalyserConfig,
}

impl CpalHost {
    pub fn new(analyser: AnalyserConfig) -> Self {
        Self { analyser }
    }
}

fn default_stream_config() -> VisualizerResult<(cpal::Device, cpal::StreamConfig)> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or_else(|| {
        VisualizerError::EnvironmentUnsupported("no output device found".to_string())
    })?;
    let config: cpal::StreamConfig = device
        .default_output_config()
        .map_err(|e| VisualizerError::EnvironmentUnsupported(e.to_string()))?
        .into();
    Ok((device, config))
}

impl AudioHost for CpalHost {
    fn create_context(&self) -> VisualizerResult<AudioContext> {
        let (_, config) = default_stream_config()?;
        Ok(AudioContext::new(config.sample_rate, self.analyser.clone()))
    }
}

/// Start pulling `destination` into the default output device.
///
/// The returned stream must be kept alive for as long as audio should play.
pub fn start_output(destination: Arc<Destination>) -> Result<cpal::Stream> {
    let (device, config) = default_stream_config()?;
    log::info!(
        "Playing through: {} ({} Hz, {} channels)",
        device.description()?,
        config.sample_rate,
        config.channels
    );
    if config.sample_rate != destination.sample_rate() {
        log::warn!(
            "Output runs at {} Hz but the audio graph renders at {} Hz",
            config.sample_rate,
            destination.sample_rate()
        );
    }

    let channels = config.channels.max(1) as usize;
    let mut mono: Vec<f32> = Vec::new();
    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                mono.resize(data.len() / channels, 0.0);
                destination.render(&mut mono);
                for (frame, &s) in data.chunks_mut(channels).zip(mono.iter()) {
                    frame.fill(s);
                }
            },
            |err| log::error!("Output stream error: {}", err),
            None,
        )
        .context("Failed to build output stream")?;

    stream.play().context("Failed to start output stream")?;
    Ok(stream)
}
