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

//! In-memory engine used by unit tests. Records every call and lets tests fire
//! engine and discoverer callbacks by hand.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use image::DynamicImage;
use parking_lot::Mutex;

use crate::engine::{
    DiscovererEvent, DiscovererListener, EngineEvent, EngineHandle, EngineListener, MediaEngine, RenderSurface,
    RendererDiscoverer, RendererItem, TrackDescription, TrackKind, VideoSize,
};
use crate::error::EngineError;
use crate::event_queue::{Delivery, EventQueue};
use crate::media::{AssetDescriptor, AssetProvider, MediaDescriptor};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Play,
    Pause,
    Stop,
    SetMedia(MediaDescriptor),
    AddMediaOption(String),
    SetTime(i64),
    SetVolume(i32),
    SetRate(f32),
    SetTrack(TrackKind, i32),
    SetDelay(TrackKind, i64),
    AddSlave(TrackKind, String, bool),
    SetScale(f32),
    SetAspectRatio(Option<String>),
    SetWindowSize(u32, u32),
    AttachSurface,
    DetachSurface,
    SetRenderer(Option<String>),
    Record(Option<String>),
    SetEventListener(bool),
    Release,
}

pub struct FakeEngine {
    backends: Vec<String>,
    failing_backends: Vec<String>,
    fail_create: AtomicBool,
    players: Mutex<Vec<Arc<FakePlayer>>>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Self::with_backends(&["microdns", "bonjour"], &[])
    }

    pub fn with_backends(backends: &[&str], failing: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            backends: backends.iter().map(|b| b.to_string()).collect(),
            failing_backends: failing.iter().map(|b| b.to_string()).collect(),
            fail_create: AtomicBool::new(false),
            players: Mutex::new(Vec::new()),
        })
    }

    pub fn fail_next_create(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    pub fn player(&self, index: usize) -> Arc<FakePlayer> {
        self.players.lock()[index].clone()
    }

    pub fn player_count(&self) -> usize {
        self.players.lock().len()
    }
}

impl MediaEngine for FakeEngine {
    fn create_player(&self, options: &[String]) -> Result<Arc<dyn EngineHandle>, EngineError> {
        if self.fail_create.swap(false, Ordering::SeqCst) {
            return Err(EngineError::PlayerCreation("scripted failure".into()));
        }
        let player = Arc::new(FakePlayer {
            options: options.to_vec(),
            backends: self.backends.clone(),
            failing_backends: self.failing_backends.clone(),
            calls: Mutex::new(Vec::new()),
            listener: Mutex::new(None),
            state: Mutex::new(PlayerState::default()),
            discoverers: Mutex::new(Vec::new()),
            reject_media: AtomicBool::new(false),
            releases: AtomicUsize::new(0),
        });
        self.players.lock().push(player.clone());
        Ok(player)
    }
}

#[derive(Default)]
struct PlayerState {
    playing: bool,
    has_media: bool,
    time: i64,
    volume: i32,
    rate: f32,
    scale: f32,
    aspect_ratio: Option<String>,
    active_tracks: HashMap<TrackKind, i32>,
    delays: HashMap<TrackKind, i64>,
}

pub struct FakePlayer {
    pub options: Vec<String>,
    backends: Vec<String>,
    failing_backends: Vec<String>,
    calls: Mutex<Vec<Call>>,
    listener: Mutex<Option<EngineListener>>,
    state: Mutex<PlayerState>,
    discoverers: Mutex<Vec<Arc<FakeDiscoverer>>>,
    reject_media: AtomicBool,
    releases: AtomicUsize,
}

impl FakePlayer {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn fire(&self, event: EngineEvent) {
        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener(event);
        }
    }

    pub fn has_listener(&self) -> bool {
        self.listener.lock().is_some()
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn reject_media(&self, reject: bool) {
        self.reject_media.store(reject, Ordering::SeqCst);
    }

    pub fn set_playing(&self, playing: bool) {
        self.state.lock().playing = playing;
    }

    pub fn discoverer(&self, backend: &str) -> Option<Arc<FakeDiscoverer>> {
        self.discoverers.lock().iter().rev().find(|d| d.backend == backend).cloned()
    }

    fn log_call(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

impl EngineHandle for FakePlayer {
    fn play(&self) {
        self.log_call(Call::Play);
        self.state.lock().playing = true;
    }

    fn pause(&self) {
        self.log_call(Call::Pause);
        self.state.lock().playing = false;
    }

    fn stop(&self) {
        self.log_call(Call::Stop);
        let was_playing = std::mem::replace(&mut self.state.lock().playing, false);
        if was_playing {
            self.fire(EngineEvent::Stopped);
        }
    }

    fn set_media(&self, media: &MediaDescriptor) -> Result<(), EngineError> {
        self.log_call(Call::SetMedia(media.clone()));
        if self.reject_media.load(Ordering::SeqCst) {
            return Err(EngineError::Media("unsupported".into()));
        }
        self.state.lock().has_media = true;
        Ok(())
    }

    fn add_media_option(&self, option: &str) -> bool {
        self.log_call(Call::AddMediaOption(option.to_string()));
        self.state.lock().has_media
    }

    fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    fn is_seekable(&self) -> bool {
        self.state.lock().has_media
    }

    fn time(&self) -> i64 {
        self.state.lock().time
    }

    fn set_time(&self, time_ms: i64) {
        self.log_call(Call::SetTime(time_ms));
        self.state.lock().time = time_ms;
    }

    fn length(&self) -> i64 {
        60_000
    }

    fn volume(&self) -> i32 {
        self.state.lock().volume
    }

    fn set_volume(&self, volume: i32) {
        self.log_call(Call::SetVolume(volume));
        self.state.lock().volume = volume;
    }

    fn rate(&self) -> f32 {
        self.state.lock().rate
    }

    fn set_rate(&self, rate: f32) {
        self.log_call(Call::SetRate(rate));
        self.state.lock().rate = rate;
    }

    fn track_count(&self, kind: TrackKind) -> i32 {
        (self.tracks(kind).len() as i32 - 1).max(0)
    }

    fn tracks(&self, kind: TrackKind) -> Vec<TrackDescription> {
        let named = |id: i32, name: &str| TrackDescription { id, name: name.to_string() };
        match kind {
            TrackKind::Audio => vec![named(-1, "Disable"), named(1, "English"), named(2, "Polish")],
            TrackKind::Spu => vec![named(-1, "Disable"), named(3, "Subtitles")],
            TrackKind::Video => vec![named(-1, "Disable"), named(0, "Main")],
        }
    }

    fn track(&self, kind: TrackKind) -> i32 {
        self.state.lock().active_tracks.get(&kind).copied().unwrap_or(-1)
    }

    fn set_track(&self, kind: TrackKind, id: i32) -> bool {
        self.log_call(Call::SetTrack(kind, id));
        self.state.lock().active_tracks.insert(kind, id);
        true
    }

    fn delay(&self, kind: TrackKind) -> i64 {
        self.state.lock().delays.get(&kind).copied().unwrap_or(0)
    }

    fn set_delay(&self, kind: TrackKind, delay_us: i64) -> bool {
        self.log_call(Call::SetDelay(kind, delay_us));
        self.state.lock().delays.insert(kind, delay_us);
        true
    }

    fn add_slave(&self, kind: TrackKind, uri: &str, select: bool) -> bool {
        self.log_call(Call::AddSlave(kind, uri.to_string(), select));
        true
    }

    fn video_size(&self) -> Option<VideoSize> {
        if self.state.lock().playing {
            Some(VideoSize { width: 1280, height: 720 })
        } else {
            None
        }
    }

    fn scale(&self) -> f32 {
        self.state.lock().scale
    }

    fn set_scale(&self, scale: f32) {
        self.log_call(Call::SetScale(scale));
        self.state.lock().scale = scale;
    }

    fn aspect_ratio(&self) -> Option<String> {
        self.state.lock().aspect_ratio.clone()
    }

    fn set_aspect_ratio(&self, aspect_ratio: Option<&str>) {
        self.log_call(Call::SetAspectRatio(aspect_ratio.map(str::to_string)));
        self.state.lock().aspect_ratio = aspect_ratio.map(str::to_string);
    }

    fn set_window_size(&self, width: u32, height: u32) {
        self.log_call(Call::SetWindowSize(width, height));
    }

    fn attach_surface(&self, _surface: Arc<dyn RenderSurface>) {
        self.log_call(Call::AttachSurface);
    }

    fn detach_surface(&self) {
        self.log_call(Call::DetachSurface);
    }

    fn set_renderer(&self, item: Option<&RendererItem>) -> bool {
        self.log_call(Call::SetRenderer(item.map(|i| i.name.clone())));
        true
    }

    fn record(&self, directory: Option<&str>) -> bool {
        self.log_call(Call::Record(directory.map(str::to_string)));
        self.state.lock().has_media
    }

    fn renderer_backends(&self) -> Vec<String> {
        self.backends.clone()
    }

    fn create_discoverer(&self, backend: &str) -> Result<Arc<dyn RendererDiscoverer>, EngineError> {
        if !self.backends.iter().any(|b| b == backend) {
            return Err(EngineError::Discoverer { backend: backend.to_string(), reason: "unknown backend".into() });
        }
        let discoverer = Arc::new(FakeDiscoverer {
            backend: backend.to_string(),
            fail_start: self.failing_backends.iter().any(|b| b == backend),
            listener: Mutex::new(None),
            running: AtomicBool::new(false),
            stops: AtomicUsize::new(0),
        });
        self.discoverers.lock().push(discoverer.clone());
        Ok(discoverer)
    }

    fn set_event_listener(&self, listener: Option<EngineListener>) {
        self.log_call(Call::SetEventListener(listener.is_some()));
        *self.listener.lock() = listener;
    }

    fn release(&self) {
        self.log_call(Call::Release);
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeDiscoverer {
    pub backend: String,
    fail_start: bool,
    listener: Mutex<Option<DiscovererListener>>,
    running: AtomicBool,
    stops: AtomicUsize,
}

impl FakeDiscoverer {
    pub fn add(&self, name: &str, display_name: &str) {
        self.emit(DiscovererEvent::ItemAdded(item(name, display_name)));
    }

    pub fn delete(&self, name: &str, display_name: &str) {
        self.emit(DiscovererEvent::ItemDeleted(item(name, display_name)));
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn has_listener(&self) -> bool {
        self.listener.lock().is_some()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    fn emit(&self, event: DiscovererEvent) {
        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener(event);
        }
    }
}

impl RendererDiscoverer for FakeDiscoverer {
    fn set_event_listener(&self, listener: Option<DiscovererListener>) {
        *self.listener.lock() = listener;
    }

    fn start(&self) -> Result<(), EngineError> {
        if self.fail_start {
            return Err(EngineError::Discoverer { backend: self.backend.clone(), reason: "start refused".into() });
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn item(name: &str, display_name: &str) -> RendererItem {
    RendererItem { name: name.to_string(), display_name: display_name.to_string() }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Attach,
    Detach,
    Resize(u32, u32),
    Release,
}

pub struct FakeSurface {
    calls: Mutex<Vec<SurfaceCall>>,
    frame: Mutex<Option<DynamicImage>>,
}

impl FakeSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { calls: Mutex::new(Vec::new()), frame: Mutex::new(None) })
    }

    pub fn set_frame(&self, frame: Option<DynamicImage>) {
        *self.frame.lock() = frame;
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().clone()
    }
}

impl RenderSurface for FakeSurface {
    fn attach(&self) {
        self.calls.lock().push(SurfaceCall::Attach);
    }

    fn detach(&self) {
        self.calls.lock().push(SurfaceCall::Detach);
    }

    fn resize(&self, width: u32, height: u32) {
        self.calls.lock().push(SurfaceCall::Resize(width, height));
    }

    fn size(&self) -> VideoSize {
        VideoSize { width: 640, height: 360 }
    }

    fn current_frame(&self) -> Option<DynamicImage> {
        self.frame.lock().clone()
    }

    fn release(&self) {
        self.calls.lock().push(SurfaceCall::Release);
    }
}

/// Asset provider that knows a fixed set of keys.
pub struct FakeAssets {
    keys: Vec<String>,
}

impl FakeAssets {
    pub fn with_keys(keys: &[&str]) -> Arc<Self> {
        Arc::new(Self { keys: keys.iter().map(|k| k.to_string()).collect() })
    }
}

impl AssetProvider for FakeAssets {
    fn lookup_key(&self, asset: &str, package: Option<&str>) -> String {
        match package {
            Some(package) => format!("assets/packages/{}/{}", package, asset),
            None => format!("assets/{}", asset),
        }
    }

    fn open(&self, key: &str) -> io::Result<AssetDescriptor> {
        if self.keys.iter().any(|k| k == key) {
            Ok(AssetDescriptor { key: key.to_string(), path: PathBuf::from("/fake").join(key), length: 1024 })
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, format!("no asset {}", key)))
        }
    }
}

/// Attaches a delegate collecting everything the queue delivers.
pub fn record_deliveries<T: Send + 'static>(queue: &EventQueue<T>) -> Arc<Mutex<Vec<Delivery<T>>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    queue.attach_delegate(Arc::new(move |delivery: Delivery<T>| sink.lock().push(delivery)));
    seen
}
