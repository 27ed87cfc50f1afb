// Copyright 2025 HEM Sp. z o.o.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};

use crate::command_lane::{CommandLane, LaneTicket};
use crate::config::BridgeConfig;
use crate::engine::{EngineEvent, EngineHandle, EngineListener, MediaEngine, RenderSurface, TrackKind};
use crate::error::{MediaError, SessionError};
use crate::event_queue::EventQueue;
use crate::events::{MediaEvent, RendererEvent, TrackCounters};
use crate::media::{AssetProvider, MediaDescriptor, MediaLocator, MediaRequest, MediaSource, LOOP_OPTION, NO_LOOP_OPTION};
use crate::renderer_registry::RendererRegistry;
use crate::session_directory::InstanceId;
use crate::snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    Disposed,
}

/// One player instance: an engine handle, its command lane, its event queues
/// and its renderer registry.
///
/// Mutating commands that block on the engine (`set_media`, `stop`,
/// `cast_to`, `start_discovery`, `stop_discovery` and the final teardown) run
/// on the session's lane and return a [`LaneTicket`]. Everything else calls the engine directly
/// and degrades to a sentinel value when the session is not ready.
pub struct PlayerSession {
    id: InstanceId,
    me: Weak<PlayerSession>,
    config: Arc<BridgeConfig>,
    assets: Arc<dyn AssetProvider>,
    surface: Arc<dyn RenderSurface>,
    state: RwLock<SessionState>,
    disposed: AtomicBool,
    engine: RwLock<Option<Arc<dyn EngineHandle>>>,
    lane: OnceLock<CommandLane>,
    options: RwLock<Vec<String>>,
    current_media: Mutex<Option<String>>,
    media_events: EventQueue<MediaEvent>,
    renderers: RendererRegistry,
}

impl PlayerSession {
    pub fn new(
        id: InstanceId,
        surface: Arc<dyn RenderSurface>,
        assets: Arc<dyn AssetProvider>,
        config: Arc<BridgeConfig>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            id,
            me: me.clone(),
            config,
            assets,
            surface,
            state: RwLock::new(SessionState::Uninitialized),
            disposed: AtomicBool::new(false),
            engine: RwLock::new(None),
            lane: OnceLock::new(),
            options: RwLock::new(Vec::new()),
            current_media: Mutex::new(None),
            media_events: EventQueue::new(),
            renderers: RendererRegistry::new(),
        })
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub fn media_events(&self) -> &EventQueue<MediaEvent> {
        &self.media_events
    }

    pub fn renderer_events(&self) -> &EventQueue<RendererEvent> {
        self.renderers.events()
    }

    /// Last media the engine accepted.
    pub fn current_media(&self) -> Option<String> {
        self.current_media.lock().clone()
    }

    /// Creates the engine player, wires it to the surface and starts the lane.
    /// Fails if the session was already initialized or disposed.
    pub fn initialize(&self, engine: &dyn MediaEngine, options: Vec<String>) -> Result<(), SessionError> {
        let mut state = self.state.write();
        match *state {
            SessionState::Ready => return Err(SessionError::AlreadyInitialized(self.id)),
            SessionState::Disposed => return Err(SessionError::Disposed(self.id)),
            SessionState::Uninitialized => {}
        }
        if self.is_disposed() {
            return Err(SessionError::Disposed(self.id));
        }

        let lane_name = format!("{}-{}", self.config.lane_thread_prefix, self.id);
        let lane = CommandLane::spawn(lane_name).map_err(SessionError::LaneSpawn)?;
        let handle = engine.create_player(&self.config.engine_options(&options))?;

        let size = self.surface.size();
        handle.set_window_size(size.width, size.height);
        handle.attach_surface(self.surface.clone());
        self.surface.attach();
        handle.set_event_listener(Some(self.engine_listener()));

        if self.lane.set(lane).is_err() {
            return Err(SessionError::AlreadyInitialized(self.id));
        }
        *self.options.write() = options;
        *self.engine.write() = Some(handle);
        *state = SessionState::Ready;

        info!("Session {} initialized", self.id);
        Ok(())
    }

    // --- Lane-serialized commands ---

    /// Replaces the current media. Pending lane work that has not started yet
    /// is dropped. The ticket resolves to `true` once the engine accepted the
    /// media; asset and engine failures are logged and leave the previous
    /// media in place.
    pub fn set_media(&self, request: MediaRequest) -> Result<LaneTicket<bool>, SessionError> {
        self.on_lane(true, false, move |session, engine| session.load_media(engine, request))
    }

    pub fn stop(&self) -> Result<LaneTicket<()>, SessionError> {
        self.on_lane(false, (), |_, engine| engine.stop())
    }

    /// Switches output to a discovered renderer. Resolves to `false` when the
    /// id is unknown, in which case output falls back to the local surface.
    pub fn cast_to(&self, device_id: &str) -> Result<LaneTicket<bool>, SessionError> {
        let device_id = device_id.to_string();
        self.on_lane(false, false, move |session, engine| session.renderers.cast_to(engine, &device_id))
    }

    /// Restarts renderer discovery. Resolves to the number of backends that
    /// started.
    pub fn start_discovery(&self, backend: Option<&str>) -> Result<LaneTicket<usize>, SessionError> {
        let backend = backend.map(str::to_string);
        self.on_lane(false, 0, move |session, engine| session.renderers.start_discovery(engine, backend.as_deref()))
    }

    pub fn stop_discovery(&self) -> Result<LaneTicket<()>, SessionError> {
        self.on_lane(false, (), |session, engine| session.renderers.stop_discovery(engine))
    }

    /// Resolves once every job submitted before it has finished.
    pub fn barrier(&self) -> Result<LaneTicket<()>, SessionError> {
        Ok(self.lane()?.submit(|| ())?)
    }

    fn lane(&self) -> Result<&CommandLane, SessionError> {
        match self.state() {
            SessionState::Uninitialized => Err(SessionError::NotInitialized(self.id)),
            SessionState::Disposed => Err(SessionError::Disposed(self.id)),
            SessionState::Ready => self.lane.get().ok_or(SessionError::NotInitialized(self.id)),
        }
    }

    fn on_lane<F, R>(&self, replacing: bool, fallback: R, f: F) -> Result<LaneTicket<R>, SessionError>
    where
        F: FnOnce(&PlayerSession, &dyn EngineHandle) -> R + Send + 'static,
        R: Send + 'static,
    {
        let lane = self.lane()?;
        let session = self.me.clone();
        let job = move || {
            let Some(session) = session.upgrade() else { return fallback; };
            match session.engine() {
                Some(engine) => f(&*session, &*engine),
                None => fallback,
            }
        };

        let ticket = if replacing { lane.submit_replacing(job)? } else { lane.submit(job)? };
        Ok(ticket)
    }

    fn load_media(&self, engine: &dyn EngineHandle, request: MediaRequest) -> bool {
        let source = match request.locator {
            MediaLocator::Asset(key) => match self.assets.open(&key) {
                Ok(asset) => MediaSource::Asset(asset),
                Err(source) => {
                    warn!("Session {}: {}", self.id, MediaError::Asset { key, source });
                    return false;
                }
            },
            MediaLocator::Uri(uri) => MediaSource::Uri(uri),
        };

        engine.stop();
        let media = MediaDescriptor::build(source, request.hw_accel, &self.options.read());
        if let Err(e) = engine.set_media(&media) {
            warn!("Session {}: {}", self.id, e);
            return false;
        }
        debug!("Session {} loaded {}", self.id, media.locator());
        *self.current_media.lock() = Some(media.locator().to_string());

        if request.auto_play {
            engine.play();
        }
        true
    }

    // --- Engine events ---

    fn engine_listener(&self) -> EngineListener {
        let session = self.me.clone();
        Arc::new(move |event: EngineEvent| {
            if let Some(session) = session.upgrade() {
                session.on_engine_event(event);
            }
        })
    }

    fn on_engine_event(&self, event: EngineEvent) {
        let Some(engine) = self.engine() else { return; };
        if let Some(event) = translate_event(&*engine, event) {
            self.media_events.enqueue(event);
        }
    }

    /// The engine handle, or `None` before initialization and after dispose.
    fn engine(&self) -> Option<Arc<dyn EngineHandle>> {
        if self.is_disposed() {
            return None;
        }
        self.engine.read().clone()
    }

    // --- Direct commands ---

    pub fn play(&self) {
        if let Some(engine) = self.engine() {
            engine.play();
        }
    }

    pub fn pause(&self) {
        if let Some(engine) = self.engine() {
            engine.pause();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.engine().is_some_and(|e| e.is_playing())
    }

    pub fn is_seekable(&self) -> bool {
        self.engine().is_some_and(|e| e.is_seekable())
    }

    /// Toggles looping on the current media; applies from the next load.
    pub fn set_looping(&self, looping: bool) -> bool {
        let option = if looping { LOOP_OPTION } else { NO_LOOP_OPTION };
        self.engine().is_some_and(|e| e.add_media_option(option))
    }

    pub fn seek_to(&self, position_ms: i64) {
        if let Some(engine) = self.engine() {
            engine.set_time(position_ms);
        }
    }

    pub fn position(&self) -> i64 {
        self.engine().map_or(-1, |e| e.time())
    }

    pub fn duration(&self) -> i64 {
        self.engine().map_or(-1, |e| e.length())
    }

    /// Sets the volume, clamped to `0..=100`.
    pub fn set_volume(&self, volume: i64) {
        if let Some(engine) = self.engine() {
            engine.set_volume(volume.clamp(0, 100) as i32);
        }
    }

    pub fn volume(&self) -> i32 {
        self.engine().map_or(-1, |e| e.volume())
    }

    pub fn set_playback_speed(&self, speed: f64) {
        if let Some(engine) = self.engine() {
            engine.set_rate(speed as f32);
        }
    }

    pub fn playback_speed(&self) -> f32 {
        self.engine().map_or(-1.0, |e| e.rate())
    }

    pub fn track_count(&self, kind: TrackKind) -> i32 {
        self.engine().map_or(-1, |e| e.track_count(kind))
    }

    /// Selectable tracks, id to name. The engine's "disable" entry is left out.
    pub fn tracks(&self, kind: TrackKind) -> BTreeMap<i32, String> {
        let Some(engine) = self.engine() else { return BTreeMap::new(); };
        engine
            .tracks(kind)
            .into_iter()
            .filter(|track| track.id >= 0)
            .map(|track| (track.id, track.name))
            .collect()
    }

    pub fn track(&self, kind: TrackKind) -> i32 {
        self.engine().map_or(-1, |e| e.track(kind))
    }

    pub fn set_track(&self, kind: TrackKind, id: i32) {
        if let Some(engine) = self.engine() {
            engine.set_track(kind, id);
        }
    }

    pub fn delay(&self, kind: TrackKind) -> i64 {
        self.engine().map_or(-1, |e| e.delay(kind))
    }

    pub fn set_delay(&self, kind: TrackKind, delay: i64) {
        if let Some(engine) = self.engine() {
            engine.set_delay(kind, delay);
        }
    }

    pub fn add_external_track(&self, uri: &str, kind: TrackKind, select: bool) -> bool {
        self.engine().is_some_and(|e| e.add_slave(kind, uri, select))
    }

    pub fn set_video_scale(&self, scale: f32) {
        if let Some(engine) = self.engine() {
            engine.set_scale(scale);
        }
    }

    pub fn video_scale(&self) -> f32 {
        self.engine().map_or(-1.0, |e| e.scale())
    }

    pub fn set_video_aspect_ratio(&self, aspect_ratio: &str) {
        if let Some(engine) = self.engine() {
            engine.set_aspect_ratio(Some(aspect_ratio).filter(|r| !r.is_empty()));
        }
    }

    pub fn video_aspect_ratio(&self) -> String {
        self.engine().and_then(|e| e.aspect_ratio()).unwrap_or_default()
    }

    pub fn resize(&self, width: u32, height: u32) {
        if self.is_disposed() {
            return;
        }
        self.surface.resize(width, height);
        if let Some(engine) = self.engine() {
            engine.set_window_size(width, height);
        }
    }

    /// Current frame as base64 JPEG, or an empty string when there is none.
    pub fn snapshot(&self) -> String {
        if self.is_disposed() {
            return String::new();
        }
        let Some(frame) = self.surface.current_frame() else { return String::new(); };
        snapshot::encode_frame(&frame, self.config.snapshot_quality).unwrap_or_else(|e| {
            warn!("Session {}: snapshot encoding failed: {}", self.id, e);
            String::new()
        })
    }

    pub fn start_recording(&self, directory: &str) -> bool {
        self.engine().is_some_and(|e| e.record(Some(directory)))
    }

    pub fn stop_recording(&self) -> bool {
        self.engine().is_some_and(|e| e.record(None))
    }

    // --- Renderer discovery ---

    pub fn available_renderer_backends(&self) -> Vec<String> {
        self.engine().map_or_else(Vec::new, |e| self.renderers.list_backends(&*e))
    }

    pub fn renderer_devices(&self) -> BTreeMap<String, String> {
        self.renderers.devices()
    }

    // --- Teardown ---

    /// Disposes the session. Only the first call has an effect; it returns the
    /// ticket of the engine teardown queued as the lane's terminal job.
    pub fn dispose(&self) -> Option<LaneTicket<()>> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return None;
        }
        *self.state.write() = SessionState::Disposed;

        self.media_events.enqueue(MediaEvent::Stopped);
        self.media_events.close();
        self.renderers.events().close();
        self.media_events.detach_delegate();
        self.renderers.events().detach_delegate();

        self.renderers.shutdown();
        self.surface.detach();
        self.surface.release();

        let engine = self.engine.write().take();
        let ticket = match (self.lane.get(), engine) {
            (Some(lane), Some(engine)) => lane
                .shutdown(move || {
                    engine.stop();
                    engine.set_event_listener(None);
                    engine.detach_surface();
                    engine.release();
                })
                .ok(),
            (Some(lane), None) => lane.shutdown(|| ()).ok(),
            (None, _) => None,
        };

        info!("Session {} disposed", self.id);
        ticket
    }
}

impl Drop for PlayerSession {
    fn drop(&mut self) {
        if !self.is_disposed() {
            debug!("Session {} dropped without dispose", self.id);
            let _ = self.dispose();
        }
    }
}

/// Maps an engine callback to the event pushed to the UI, reading transient
/// counters from the engine at the moment of the callback.
fn translate_event(engine: &dyn EngineHandle, event: EngineEvent) -> Option<MediaEvent> {
    match event {
        EngineEvent::Opening => Some(MediaEvent::Opening),
        EngineEvent::Paused => Some(MediaEvent::Paused),
        EngineEvent::Stopped => Some(MediaEvent::Stopped),
        EngineEvent::Playing => {
            let size = engine.video_size().unwrap_or_default();
            Some(MediaEvent::Playing {
                width: size.width,
                height: size.height,
                speed: engine.rate(),
                duration: engine.length(),
                tracks: track_counters(engine),
            })
        }
        EngineEvent::EndReached => Some(MediaEvent::Ended { position: engine.time() }),
        EngineEvent::Buffering(percent) => Some(time_changed(engine, percent)),
        EngineEvent::TimeChanged(_) => Some(time_changed(engine, 0.0)),
        EngineEvent::EncounteredError => Some(MediaEvent::Error),
        EngineEvent::RecordChanged { recording, path } => {
            Some(MediaEvent::Recording { is_recording: recording, record_path: path })
        }
        EngineEvent::Vout(_)
        | EngineEvent::LengthChanged(_)
        | EngineEvent::MediaChanged
        | EngineEvent::EsAdded
        | EngineEvent::EsDeleted
        | EngineEvent::EsSelected
        | EngineEvent::PausableChanged(_)
        | EngineEvent::SeekableChanged(_)
        | EngineEvent::PositionChanged(_) => None,
    }
}

fn time_changed(engine: &dyn EngineHandle, buffer: f32) -> MediaEvent {
    let size = engine.video_size().unwrap_or_default();
    MediaEvent::TimeChanged {
        width: size.width,
        height: size.height,
        speed: engine.rate(),
        position: engine.time(),
        duration: engine.length(),
        buffer,
        tracks: track_counters(engine),
        is_playing: engine.is_playing(),
    }
}

fn track_counters(engine: &dyn EngineHandle) -> TrackCounters {
    TrackCounters {
        audio_tracks_count: engine.track_count(TrackKind::Audio),
        active_audio_track: engine.track(TrackKind::Audio),
        spu_tracks_count: engine.track_count(TrackKind::Spu),
        active_spu_track: engine.track(TrackKind::Spu),
    }
}
