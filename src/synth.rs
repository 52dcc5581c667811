//! Synthesized media element
//!
//! Demo tracks are generated rather than decoded: a chord progression, a
//! kick on every beat and noise hats on the off-beats, all derived from a
//! small [`TrackRecipe`].

use std::f64::consts::TAU;
use std::sync::Mutex;

use rand::random_range;

use crate::error::{VisualizerError, VisualizerResult};
use crate::media::{MediaElement, MediaEvent};

/// Seconds of rendered audio between two `TimeUpdate` events
const TIME_UPDATE_INTERVAL: f64 = 0.25;

/// Chord roots relative to the track root, one per bar
const PROGRESSION: [f64; 4] = [1.0, 4.0 / 3.0, 1.5, 9.0 / 8.0];

#[derive(Debug, Clone, PartialEq)]
pub struct TrackRecipe {
    pub duration_secs: f64,
    pub root_hz: f64,
    pub bpm: f64,
}

impl Default for TrackRecipe {
    fn default() -> Self {
        Self {
            duration_secs: 30.0,
            root_hz: 110.0,
            bpm: 120.0,
        }
    }
}

struct SynthState {
    position: f64,
    paused: bool,
    since_time_update: f64,
    events: Vec<MediaEvent>,
}

pub struct SynthTrack {
    recipe: TrackRecipe,
    state: Mutex<SynthState>,
}

impl SynthTrack {
    pub fn new(recipe: TrackRecipe) -> Self {
        Self {
            recipe,
            state: Mutex::new(SynthState {
                position: 0.0,
                paused: true,
                since_time_update: 0.0,
                events: vec![MediaEvent::LoadedMetadata],
            }),
        }
    }

    pub fn recipe(&self) -> &TrackRecipe {
        &self.recipe
    }

    fn sample_at(&self, t: f64) -> f32 {
        let beat_len = 60.0 / self.recipe.bpm.max(1.0);
        let beat = (t / beat_len).floor();
        let in_beat = t - beat * beat_len;
        let bar = (beat as usize / 4) % PROGRESSION.len();

        let root = self.recipe.root_hz * PROGRESSION[bar];
        let chord: f64 = [1.0, 1.25, 1.5, 2.0]
            .iter()
            .map(|ratio| (TAU * root * ratio * t).sin() * 0.08)
            .sum();

        // Kick: pitch falls from 170 Hz to 50 Hz
        let kick_phase = TAU * (50.0 * in_beat + 4.0 * (1.0 - (-30.0 * in_beat).exp()));
        let kick = kick_phase.sin() * (-18.0 * in_beat).exp() * 0.5;

        let off_beat = in_beat - beat_len / 2.0;
        let hat = if off_beat >= 0.0 {
            random_range(-1.0..1.0) * (-60.0 * off_beat).exp() * 0.15
        } else {
            0.0
        };

        ((chord + kick + hat) * 0.6) as f32
    }
}

impl MediaElement for SynthTrack {
    fn current_time(&self) -> f64 {
        self.state.lock().map(|s| s.position).unwrap_or(0.0)
    }

    fn duration(&self) -> f64 {
        self.recipe.duration_secs
    }

    fn set_current_time(&self, seconds: f64) {
        if let Ok(mut state) = self.state.lock() {
            state.position = seconds.clamp(0.0, self.recipe.duration_secs.max(0.0));
            state.events.push(MediaEvent::TimeUpdate);
        }
    }

    fn is_paused(&self) -> bool {
        self.state.lock().map(|s| s.paused).unwrap_or(true)
    }

    fn play(&self) -> VisualizerResult<()> {
        if self.recipe.duration_secs <= 0.0 {
            return Err(VisualizerError::PlaybackCommand(
                "track has no playable audio".to_string(),
            ));
        }
        let mut state = self
            .state
            .lock()
            .map_err(|_| VisualizerError::PlaybackCommand("player state poisoned".to_string()))?;
        if state.position >= self.recipe.duration_secs {
            state.position = 0.0;
        }
        if state.paused {
            state.paused = false;
            state.events.push(MediaEvent::Play);
        }
        Ok(())
    }

    fn pause(&self) {
        if let Ok(mut state) = self.state.lock() {
            if !state.paused {
                state.paused = true;
                state.events.push(MediaEvent::Pause);
            }
        }
    }

    fn render(&self, out: &mut [f32], sample_rate: u32) {
        let Ok(mut state) = self.state.lock() else {
            out.fill(0.0);
            return;
        };
        if state.paused || sample_rate == 0 {
            out.fill(0.0);
            return;
        }

        let dt = 1.0 / sample_rate as f64;
        let duration = self.recipe.duration_secs;
        let mut ended = false;
        for sample in out.iter_mut() {
            if state.position >= duration {
                *sample = 0.0;
                ended = true;
                continue;
            }
            *sample = self.sample_at(state.position);
            state.position += dt;
        }

        state.since_time_update += out.len() as f64 * dt;
        if state.since_time_update >= TIME_UPDATE_INTERVAL || ended {
            state.since_time_update = 0.0;
            state.events.push(MediaEvent::TimeUpdate);
        }

        if ended {
            state.position = duration;
            state.paused = true;
            state.events.push(MediaEvent::Pause);
            state.events.push(MediaEvent::Ended);
        }
    }

    fn drain_events(&self) -> Vec<MediaEvent> {
        self.state
            .lock()
            .map(|mut s| std::mem::take(&mut s.events))
            .unwrap_or_default()
    }
}
