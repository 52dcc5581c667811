use std::rc::Rc;
use std::sync::Arc;

use trackwave::audio::{AudioGraphRegistry, OfflineHost};
use trackwave::config::RenderStyle;
use trackwave::interaction::SurfaceLayout;
use trackwave::media::{MediaElement, MediaHandle, MediaLibrary, MediaResolver};
use trackwave::playback::PlaybackCoordinator;
use trackwave::render::{FrameStepper, WaveformVisualizer};
use trackwave::synth::{SynthTrack, TrackRecipe};

const SAMPLE_RATE: u32 = 8000;

fn library() -> MediaLibrary {
    let mut library = MediaLibrary::new();
    for id in ["1", "2"] {
        library.insert(
            MediaHandle::for_track(id),
            Arc::new(SynthTrack::new(TrackRecipe {
                duration_secs: 60.0,
                ..TrackRecipe::default()
            })),
        );
    }
    library
}

fn mount(
    handle: &MediaHandle,
    library: &MediaLibrary,
    registry: &AudioGraphRegistry,
    stepper: &Rc<FrameStepper>,
) -> WaveformVisualizer {
    let mut visualizer = WaveformVisualizer::mount(
        handle.clone(),
        library.resolve(handle),
        registry,
        stepper.clone(),
        RenderStyle::default(),
    );
    visualizer.observe_layout(SurfaceLayout::new(0.0, 512.0, 40.0));
    visualizer
}

/// Render a slice of audio so playback and analysers advance
fn pump(registry: &AudioGraphRegistry, seconds: f64) {
    let context = registry.context().unwrap();
    let mut block = vec![0.0f32; (SAMPLE_RATE as f64 * seconds) as usize];
    context.destination().render(&mut block);
}

#[test]
fn test_full_lifecycle() {
    let registry = AudioGraphRegistry::new(Box::new(OfflineHost::new(SAMPLE_RATE)));
    let stepper = Rc::new(FrameStepper::new());
    let library = library();
    let handle = MediaHandle::for_track("1");
    let mut coordinator = PlaybackCoordinator::new();

    let mut visualizer = mount(&handle, &library, &registry, &stepper);
    assert!(visualizer.is_available());
    assert!(!visualizer.is_animating());

    coordinator.toggle(&handle, &library);
    visualizer.set_playing(coordinator.is_playing(&handle));
    assert!(visualizer.is_animating());

    pump(&registry, 0.5);
    let before = visualizer.surface().frame_count();
    for _ in 0..3 {
        for token in stepper.step() {
            visualizer.on_frame(token);
        }
    }
    assert_eq!(visualizer.surface().frame_count(), before + 3);
    // Live bars reach beyond the flat paused pattern once audio flows
    let entry = registry.entry(&handle).unwrap();
    assert!(entry.read_frequency_data(|bins| bins.iter().any(|&b| b > 0)));

    let element = library.resolve(&handle).unwrap();
    for event in element.drain_events() {
        visualizer.on_media_event(event);
    }
    assert!(visualizer.state().current_time > 0.0);

    coordinator.toggle(&handle, &library);
    let before = visualizer.surface().frame_count();
    visualizer.set_playing(coordinator.is_playing(&handle));
    assert!(!visualizer.is_animating());
    assert_eq!(visualizer.surface().frame_count(), before + 1);
    assert_eq!(stepper.pending(), 0);

    drop(visualizer);
    assert_eq!(registry.len(), 1);

    let remounted = mount(&handle, &library, &registry, &stepper);
    assert!(remounted.is_available());
    assert!(Arc::ptr_eq(&registry.entry(&handle).unwrap(), &entry));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_switching_tracks_moves_animation() {
    let registry = AudioGraphRegistry::new(Box::new(OfflineHost::new(SAMPLE_RATE)));
    let stepper = Rc::new(FrameStepper::new());
    let library = library();
    let first = MediaHandle::for_track("1");
    let second = MediaHandle::for_track("2");
    let mut coordinator = PlaybackCoordinator::new();

    let mut rows = [
        mount(&first, &library, &registry, &stepper),
        mount(&second, &library, &registry, &stepper),
    ];
    let sync = |rows: &mut [WaveformVisualizer], coordinator: &PlaybackCoordinator| {
        for row in rows.iter_mut() {
            let playing = coordinator.is_playing(row.handle());
            row.set_playing(playing);
        }
    };

    coordinator.toggle(&first, &library);
    sync(&mut rows, &coordinator);
    assert!(rows[0].is_animating());
    assert!(!rows[1].is_animating());

    coordinator.toggle(&second, &library);
    sync(&mut rows, &coordinator);
    assert!(!rows[0].is_animating());
    assert!(rows[1].is_animating());
    assert_eq!(stepper.pending(), 1);
    assert!(library.resolve(&first).unwrap().is_paused());
    assert_eq!(registry.len(), 2);
}
