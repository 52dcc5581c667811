use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
        MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::{
    fs::File,
    io,
    path::PathBuf,
    rc::Rc,
    sync::{mpsc, Arc},
    time::{Duration, Instant},
};

use trackwave::{
    audio::{start_output, AudioGraphRegistry, CpalHost, Destination},
    config::{self, AppConfig, TrackConfig},
    interaction::SurfaceLayout,
    media::{known_duration, MediaElement, MediaEvent, MediaHandle, MediaLibrary, MediaResolver},
    playback::PlaybackCoordinator,
    render::{draw_visualizer, FrameStepper, Rgba, WaveformVisualizer},
    synth::SynthTrack,
};

/// Terminal rows per list item: one text line plus the waveform strip
const ROW_HEIGHT: u16 = 4;
const NOW_PLAYING_HEIGHT: u16 = 8;
const SEEK_STEP_SECS: f64 = 5.0;

/// Visualizer that receives pointer input, by list index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Row(usize),
    NowPlaying,
}

/// Drives the graph without an output device so playback still advances
struct SilentClock {
    destination: Arc<Destination>,
    last: Instant,
    scratch: Vec<f32>,
}

impl SilentClock {
    fn new(destination: Arc<Destination>) -> Self {
        Self {
            destination,
            last: Instant::now(),
            scratch: Vec::new(),
        }
    }

    fn advance(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last).as_secs_f64();
        let samples = (elapsed * self.destination.sample_rate() as f64) as usize;
        if samples == 0 {
            return;
        }
        self.last = now;
        self.scratch.resize(samples, 0.0);
        self.destination.render(&mut self.scratch);
    }
}

struct App {
    config: AppConfig,
    library: MediaLibrary,
    registry: Arc<AudioGraphRegistry>,
    stepper: Rc<FrameStepper>,
    coordinator: PlaybackCoordinator,
    rows: Vec<WaveformVisualizer>,
    now_playing: Option<WaveformVisualizer>,
    seeks: mpsc::Receiver<(MediaHandle, f64)>,
    seek_sender: mpsc::Sender<(MediaHandle, f64)>,
    selected: usize,
    hovered: Option<Target>,
    strips: Vec<(Target, Rect)>,
}

impl App {
    fn new(config: AppConfig, registry: Arc<AudioGraphRegistry>) -> Self {
        let mut library = MediaLibrary::new();
        for track in &config.tracks {
            let element: Arc<dyn MediaElement> = Arc::new(SynthTrack::new(track.recipe()));
            library.insert(MediaHandle::for_track(&track.id), element);
        }

        let (seek_sender, seeks) = mpsc::channel();
        let mut app = Self {
            library,
            registry,
            stepper: Rc::new(FrameStepper::new()),
            coordinator: PlaybackCoordinator::new(),
            rows: Vec::new(),
            now_playing: None,
            seeks,
            seek_sender,
            selected: 0,
            hovered: None,
            strips: Vec::new(),
            config,
        };
        app.rows = app
            .library
            .handles()
            .iter()
            .map(|handle| app.mount(handle.clone()))
            .collect();
        app
    }

    fn mount(&self, handle: MediaHandle) -> WaveformVisualizer {
        let sender = self.seek_sender.clone();
        let seek_handle = handle.clone();
        WaveformVisualizer::mount(
            handle.clone(),
            self.library.resolve(&handle),
            &self.registry,
            self.stepper.clone(),
            self.config.render.clone(),
        )
        .with_seek_callback(Box::new(move |time| {
            let _ = sender.send((seek_handle.clone(), time));
        }))
    }

    fn visualizer_mut(&mut self, target: Target) -> Option<&mut WaveformVisualizer> {
        match target {
            Target::Row(i) => self.rows.get_mut(i),
            Target::NowPlaying => self.now_playing.as_mut(),
        }
    }

    fn selected_handle(&self) -> Option<MediaHandle> {
        self.library.handles().get(self.selected).cloned()
    }

    /// Returns false when the user asked to quit
    fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return false,
                KeyCode::Up => self.selected = self.selected.saturating_sub(1),
                KeyCode::Down => {
                    self.selected = (self.selected + 1).min(self.rows.len().saturating_sub(1))
                }
                KeyCode::Char(' ') | KeyCode::Enter => {
                    if let Some(handle) = self.selected_handle() {
                        self.coordinator.toggle(&handle, &self.library);
                    }
                }
                KeyCode::Left => self.nudge(-SEEK_STEP_SECS),
                KeyCode::Right => self.nudge(SEEK_STEP_SECS),
                _ => {}
            },
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            _ => {}
        }
        true
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let position = Position::new(mouse.column, mouse.row);
        let target = self
            .strips
            .iter()
            .find(|(_, rect)| rect.contains(position))
            .map(|(target, _)| *target);

        if target != self.hovered {
            if let Some(previous) = self.hovered {
                if let Some(visualizer) = self.visualizer_mut(previous) {
                    visualizer.pointer_leave();
                }
            }
            if let Some(next) = target {
                if let Some(visualizer) = self.visualizer_mut(next) {
                    visualizer.pointer_enter();
                }
            }
            self.hovered = target;
        }

        let Some(target) = target else {
            return;
        };
        let x = mouse.column as f64 + 0.5;
        if let Target::Row(i) = target {
            if mouse.kind == MouseEventKind::Down(MouseButton::Left) {
                self.selected = i;
            }
        }
        if let Some(visualizer) = self.visualizer_mut(target) {
            match mouse.kind {
                MouseEventKind::Moved | MouseEventKind::Drag(_) => visualizer.pointer_move(x),
                MouseEventKind::Down(MouseButton::Left) => {
                    visualizer.pointer_move(x);
                    visualizer.pointer_click(x);
                }
                _ => {}
            }
        }
    }

    /// Seek the active track by `delta` seconds
    fn nudge(&mut self, delta: f64) {
        let Some(handle) = self.coordinator.active().cloned() else {
            return;
        };
        if let Some(element) = self.library.resolve(&handle) {
            let target = (element.current_time() + delta).clamp(0.0, known_duration(element.as_ref()));
            element.set_current_time(target);
        }
    }

    /// One host tick after input: playback bookkeeping, then frames
    fn tick(&mut self) {
        while let Ok((handle, time)) = self.seeks.try_recv() {
            self.coordinator.seek(&handle, time, &self.library);
        }

        for (i, handle) in self.library.handles().iter().enumerate() {
            let Some(element) = self.library.resolve(handle) else {
                continue;
            };
            for media_event in element.drain_events() {
                self.coordinator.handle_event(handle, media_event);
                if let Some(row) = self.rows.get_mut(i) {
                    row.on_media_event(media_event);
                }
                if let Some(panel) = self.now_playing.as_mut() {
                    if panel.handle() == handle {
                        panel.on_media_event(media_event);
                    }
                }
                if media_event == MediaEvent::Ended {
                    log::info!("{} finished", handle);
                }
            }
        }

        self.sync_now_playing();

        for (row, handle) in self.rows.iter_mut().zip(self.library.handles()) {
            row.set_playing(self.coordinator.is_playing(handle));
        }
        if let Some(panel) = self.now_playing.as_mut() {
            let playing = self.coordinator.is_playing(panel.handle());
            panel.set_playing(playing);
        }

        for token in self.stepper.step() {
            for row in self.rows.iter_mut() {
                row.on_frame(token);
            }
            if let Some(panel) = self.now_playing.as_mut() {
                panel.on_frame(token);
            }
        }
    }

    /// Remount the panel when another track becomes active
    fn sync_now_playing(&mut self) {
        let active = self.coordinator.active().cloned();
        let current = self.now_playing.as_ref().map(|v| v.handle().clone());
        if active == current {
            return;
        }
        if self.hovered == Some(Target::NowPlaying) {
            self.hovered = None;
        }
        self.now_playing = active.map(|handle| self.mount(handle));
    }

    fn draw(&mut self, f: &mut Frame) {
        let base = self.config.render.fill().unwrap_or(Rgba::BLACK);
        let chunks = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(ROW_HEIGHT),
            Constraint::Length(NOW_PLAYING_HEIGHT),
        ])
        .split(f.area());

        f.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(" trackwave ", Style::default().fg(Color::Black).bg(Color::Cyan)),
                Span::raw("  ↑/↓ select  space play/pause  ←/→ seek  click waveform to seek  q quit"),
            ])),
            chunks[0],
        );

        self.strips.clear();
        let visible = (chunks[1].height / ROW_HEIGHT).max(1) as usize;
        let first = self.selected.saturating_sub(visible - 1);
        let tracks: Vec<TrackConfig> = self.config.tracks.clone();
        for (slot, i) in (first..self.rows.len()).take(visible).enumerate() {
            let area = Rect {
                y: chunks[1].y + slot as u16 * ROW_HEIGHT,
                height: ROW_HEIGHT,
                ..chunks[1]
            };
            let handle = self.library.handles()[i].clone();
            let playing = self.coordinator.is_playing(&handle);
            let title = track_line(
                tracks.get(i),
                playing,
                i == self.selected,
                self.rows[i].state().current_time,
            );
            let [text, strip] =
                Layout::vertical([Constraint::Length(1), Constraint::Min(1)]).areas(area);
            f.render_widget(Paragraph::new(title), text);
            self.show(f, Target::Row(i), strip, base);
        }

        let block = Block::default()
            .title(" Now playing ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(chunks[2]);
        f.render_widget(block, chunks[2]);
        if self.now_playing.is_some() {
            self.show(f, Target::NowPlaying, inner, base);
        } else {
            f.render_widget(
                Paragraph::new(Span::styled(
                    "Nothing playing",
                    Style::default().fg(Color::DarkGray),
                )),
                inner,
            );
        }
    }

    /// Fit a visualizer to `area` and draw its latest frame
    fn show(&mut self, f: &mut Frame, target: Target, area: Rect, base: Rgba) {
        let Some(visualizer) = self.visualizer_mut(target) else {
            return;
        };
        visualizer.observe_layout(SurfaceLayout::new(
            area.x as f64,
            area.width as f64,
            area.height as f64 * 2.0,
        ));
        draw_visualizer(f, area, visualizer, base);
        self.strips.push((target, area));
    }
}

fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

fn track_line(track: Option<&TrackConfig>, playing: bool, selected: bool, time: f64) -> Line<'static> {
    let Some(track) = track else {
        return Line::default();
    };
    let marker = if playing { "▶" } else { "⏸" };
    let style = if selected {
        Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::styled(format!(" {} {} ", marker, track.title), style),
        Span::styled(format!(" {}", track.artist), Style::default().fg(Color::Gray)),
        Span::styled(
            format!("  {} / {}", format_time(time), format_time(track.duration_secs)),
            Style::default().fg(Color::DarkGray),
        ),
    ])
}

fn init_logging() -> Result<()> {
    let dir = dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("trackwave");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory: {:?}", dir))?;
    let file = File::create(dir.join("trackwave.log")).context("Failed to create log file")?;

    // RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    init_logging()?;
    log::info!("trackwave starting up");

    // 1. Configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(config::default_config_path);
    let first_run = !config_path.exists();
    let app_config = config::load_config(&config_path);
    if first_run {
        if let Err(e) = config::save_config(&app_config, &config_path) {
            log::warn!("Could not write default config: {:#}", e);
        }
    }

    // 2. Audio graph and output
    let registry = AudioGraphRegistry::install_global(Box::new(CpalHost::new(
        app_config.analyser.clone(),
    )));
    let mut silent_clock = None;
    let _stream = match registry.context() {
        Ok(context) => match start_output(Arc::clone(context.destination())) {
            Ok(stream) => Some(stream),
            Err(e) => {
                log::warn!("No audio output, continuing silently: {:#}", e);
                silent_clock = Some(SilentClock::new(Arc::clone(context.destination())));
                None
            }
        },
        Err(e) => {
            log::warn!("Visualization disabled: {}", e);
            None
        }
    };

    let frame_interval = Duration::from_millis(app_config.frame_interval_ms.max(1));
    let mut app = App::new(app_config, registry);

    // 3. Terminal UI
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // 4. Main loop
    let result = (|| -> Result<()> {
        loop {
            if event::poll(frame_interval)? && !app.handle_event(event::read()?) {
                break;
            }
            if let Some(clock) = silent_clock.as_mut() {
                clock.advance();
            }
            app.tick();
            terminal.draw(|f| app.draw(f))?;
        }
        Ok(())
    })();

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    log::info!("trackwave shutting down");
    result
}
