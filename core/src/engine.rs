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

use std::sync::Arc;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::media::MediaDescriptor;

pub type EngineListener = Arc<dyn Fn(EngineEvent) + Send + Sync>;
pub type DiscovererListener = Arc<dyn Fn(DiscovererEvent) + Send + Sync>;

/// Callbacks the engine fires from its own threads.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Opening,
    Paused,
    Stopped,
    Playing,
    Vout(u32),
    EndReached,
    Buffering(f32),
    TimeChanged(i64),
    EncounteredError,
    RecordChanged { recording: bool, path: Option<String> },
    LengthChanged(i64),
    MediaChanged,
    EsAdded,
    EsDeleted,
    EsSelected,
    PausableChanged(bool),
    SeekableChanged(bool),
    PositionChanged(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackKind {
    Audio,
    Video,
    Spu,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDescription {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VideoSize {
    pub width: u32,
    pub height: u32,
}

/// A candidate output device reported by a discoverer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererItem {
    /// Stable identifier.
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscovererEvent {
    ItemAdded(RendererItem),
    ItemDeleted(RendererItem),
}

/// Factory for engine players, shared by every session.
pub trait MediaEngine: Send + Sync {
    fn create_player(&self, options: &[String]) -> Result<Arc<dyn EngineHandle>, EngineError>;
}

/// One open player of the external engine.
///
/// Implementations must tolerate calls from any thread, but callers never
/// drive a handle from two lanes at once.
pub trait EngineHandle: Send + Sync {
    // --- Playback ---
    fn play(&self);
    fn pause(&self);
    fn stop(&self);
    fn set_media(&self, media: &MediaDescriptor) -> Result<(), EngineError>;
    /// Appends an option to the current media. Returns `false` without media.
    fn add_media_option(&self, option: &str) -> bool;
    fn is_playing(&self) -> bool;
    fn is_seekable(&self) -> bool;

    fn time(&self) -> i64;
    fn set_time(&self, time_ms: i64);
    fn length(&self) -> i64;
    fn volume(&self) -> i32;
    fn set_volume(&self, volume: i32);
    fn rate(&self) -> f32;
    fn set_rate(&self, rate: f32);

    // --- Tracks ---
    fn track_count(&self, kind: TrackKind) -> i32;
    fn tracks(&self, kind: TrackKind) -> Vec<TrackDescription>;
    /// Active track id, -1 when none is selected.
    fn track(&self, kind: TrackKind) -> i32;
    fn set_track(&self, kind: TrackKind, id: i32) -> bool;
    /// Delay in microseconds.
    fn delay(&self, kind: TrackKind) -> i64;
    fn set_delay(&self, kind: TrackKind, delay_us: i64) -> bool;
    fn add_slave(&self, kind: TrackKind, uri: &str, select: bool) -> bool;

    // --- Video output ---
    fn video_size(&self) -> Option<VideoSize>;
    fn scale(&self) -> f32;
    fn set_scale(&self, scale: f32);
    fn aspect_ratio(&self) -> Option<String>;
    fn set_aspect_ratio(&self, aspect_ratio: Option<&str>);
    fn set_window_size(&self, width: u32, height: u32);
    fn attach_surface(&self, surface: Arc<dyn RenderSurface>);
    fn detach_surface(&self);

    /// Passing `None` returns output to the local surface.
    fn set_renderer(&self, item: Option<&RendererItem>) -> bool;
    /// `Some(dir)` starts recording into `dir`, `None` stops it.
    fn record(&self, directory: Option<&str>) -> bool;

    // --- Renderer discovery ---
    fn renderer_backends(&self) -> Vec<String>;
    fn create_discoverer(&self, backend: &str) -> Result<Arc<dyn RendererDiscoverer>, EngineError>;

    /// Replaces the single event listener slot.
    fn set_event_listener(&self, listener: Option<EngineListener>);
    fn release(&self);
}

pub trait RendererDiscoverer: Send + Sync {
    fn set_event_listener(&self, listener: Option<DiscovererListener>);
    fn start(&self) -> Result<(), EngineError>;
    fn stop(&self);
}

/// Video surface a session renders into. Owned by the host, torn down by
/// the session on dispose.
pub trait RenderSurface: Send + Sync {
    fn attach(&self);
    fn detach(&self);
    fn resize(&self, width: u32, height: u32);
    fn size(&self) -> VideoSize;
    fn current_frame(&self) -> Option<DynamicImage>;
    fn release(&self);
}
