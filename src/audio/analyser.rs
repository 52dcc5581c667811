//! Frequency analyser node
//!
//! Produces byte frequency data the way browser analyser nodes do: window the
//! most recent `fft_size` samples, FFT, normalise by N, smooth against the
//! previous frame, convert to decibels and map the configured decibel window
//! onto 0..=255.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use spectrum_analyzer::windows::hann_window;

use crate::config::AnalyserConfig;
use crate::error::{VisualizerError, VisualizerResult};

/// Transform size used for every visualizer entry (128 bins)
pub const FFT_SIZE: usize = 256;

const MIN_FFT_SIZE: usize = 32;
const MAX_FFT_SIZE: usize = 32768;

struct Spectrum {
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

pub struct AnalyserNode {
    fft_size: usize,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
    /// Most recent time-domain samples, at most `fft_size`
    input: Mutex<VecDeque<f32>>,
    spectrum: Mutex<Spectrum>,
}

impl AnalyserNode {
    pub fn new(fft_size: usize, config: &AnalyserConfig) -> VisualizerResult<Self> {
        if !fft_size.is_power_of_two() || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&fft_size) {
            return Err(VisualizerError::InvalidAnalyser(format!(
                "fft size {} must be a power of two in {}..={}",
                fft_size, MIN_FFT_SIZE, MAX_FFT_SIZE
            )));
        }
        config.validate()?;

        let fft = FftPlanner::new().plan_fft_forward(fft_size);
        Ok(Self {
            fft_size,
            smoothing: config.smoothing,
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
            input: Mutex::new(VecDeque::with_capacity(fft_size)),
            spectrum: Mutex::new(Spectrum {
                fft,
                buffer: vec![Complex::new(0.0, 0.0); fft_size],
                smoothed: vec![0.0; fft_size / 2],
            }),
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of bins written by [`Self::get_byte_frequency_data`]
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Feed rendered samples; only the last `fft_size` are kept
    pub fn push_samples(&self, samples: &[f32]) {
        let Ok(mut input) = self.input.lock() else {
            return;
        };
        let skip = samples.len().saturating_sub(self.fft_size);
        for &s in &samples[skip..] {
            if input.len() == self.fft_size {
                input.pop_front();
            }
            input.push_back(s);
        }
    }

    /// Overwrite `out` with the current magnitude spectrum as bytes.
    /// Extra entries of a longer `out` are left untouched.
    pub fn get_byte_frequency_data(&self, out: &mut [u8]) {
        let frame: Vec<f32> = match self.input.lock() {
            Ok(input) => {
                let pad = self.fft_size - input.len();
                std::iter::repeat_n(0.0, pad)
                    .chain(input.iter().copied())
                    .collect()
            }
            Err(_) => return,
        };
        let windowed = hann_window(&frame);

        let Ok(mut spectrum) = self.spectrum.lock() else {
            return;
        };
        let Spectrum {
            fft,
            buffer,
            smoothed,
        } = &mut *spectrum;

        for (slot, &s) in buffer.iter_mut().zip(windowed.iter()) {
            *slot = Complex::new(s, 0.0);
        }
        fft.process(buffer);

        let norm = 1.0 / self.fft_size as f32;
        let db_range = self.max_decibels - self.min_decibels;
        for (k, value) in smoothed.iter_mut().enumerate() {
            let magnitude = buffer[k].norm() * norm;
            *value = self.smoothing * *value + (1.0 - self.smoothing) * magnitude;
            if let Some(byte) = out.get_mut(k) {
                let db = 20.0 * value.max(f32::MIN_POSITIVE).log10();
                let scaled = 255.0 / db_range * (db - self.min_decibels);
                *byte = scaled.clamp(0.0, 255.0) as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    fn analyser() -> AnalyserNode {
        AnalyserNode::new(FFT_SIZE, &AnalyserConfig::default()).unwrap()
    }

    fn sine(bin: usize, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| (TAU * bin as f32 * n as f32 / FFT_SIZE as f32).sin() * 0.05)
            .collect()
    }

    #[test]
    fn test_bin_count_is_half_transform() {
        assert_eq!(analyser().frequency_bin_count(), 128);
    }

    #[test]
    fn test_rejects_bad_settings() {
        let config = AnalyserConfig::default();
        assert!(AnalyserNode::new(100, &config).is_err());
        assert!(AnalyserNode::new(16, &config).is_err());

        let flat = AnalyserConfig {
            min_decibels: -30.0,
            max_decibels: -30.0,
            ..AnalyserConfig::default()
        };
        assert!(AnalyserNode::new(FFT_SIZE, &flat).is_err());

        let frozen = AnalyserConfig {
            smoothing: 1.0,
            ..AnalyserConfig::default()
        };
        assert!(AnalyserNode::new(FFT_SIZE, &frozen).is_err());
    }

    #[test]
    fn test_silence_maps_to_zero() {
        let node = analyser();
        node.push_samples(&vec![0.0; FFT_SIZE]);
        let mut out = vec![7u8; 128];
        node.get_byte_frequency_data(&mut out);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sine_peaks_in_its_bin() {
        let node = AnalyserNode::new(
            FFT_SIZE,
            &AnalyserConfig {
                smoothing: 0.0,
                ..AnalyserConfig::default()
            },
        )
        .unwrap();
        node.push_samples(&sine(16, FFT_SIZE));

        let mut out = vec![0u8; 128];
        node.get_byte_frequency_data(&mut out);
        assert!(out[16] > 200);
        assert!(out[16] > out[15]);
        assert!(out[16] > out[17]);
        assert!(out[60] < out[16] / 2);
    }

    #[test]
    fn test_smoothing_rises_gradually() {
        let node = analyser();
        node.push_samples(&sine(8, FFT_SIZE));
        let mut first = vec![0u8; 128];
        node.get_byte_frequency_data(&mut first);
        let mut second = vec![0u8; 128];
        node.get_byte_frequency_data(&mut second);
        assert!(second[8] > first[8]);
    }

    #[test]
    fn test_keeps_only_latest_window() {
        let mut out = vec![0u8; 128];
        let fresh = AnalyserNode::new(
            FFT_SIZE,
            &AnalyserConfig {
                smoothing: 0.0,
                ..AnalyserConfig::default()
            },
        )
        .unwrap();
        fresh.push_samples(&sine(16, FFT_SIZE * 3));
        fresh.push_samples(&vec![0.0; FFT_SIZE]);
        fresh.get_byte_frequency_data(&mut out);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_short_output_buffer() {
        let node = analyser();
        node.push_samples(&sine(4, FFT_SIZE));
        let mut out = vec![0u8; 8];
        node.get_byte_frequency_data(&mut out);
        assert!(out[4] > 0);
    }
}
