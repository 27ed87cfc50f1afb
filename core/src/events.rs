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

use serde::Serialize;

/// Track counters read from the engine at the moment of a callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackCounters {
    pub audio_tracks_count: i32,
    pub active_audio_track: i32,
    pub spu_tracks_count: i32,
    pub active_spu_track: i32,
}

/// Playback state change pushed to the UI layer, serialized as
/// `{"event": "...", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum MediaEvent {
    Opening,
    Paused,
    Stopped,
    #[serde(rename_all = "camelCase")]
    Playing {
        width: u32,
        height: u32,
        speed: f32,
        duration: i64,
        #[serde(flatten)]
        tracks: TrackCounters,
    },
    Ended {
        position: i64,
    },
    #[serde(rename_all = "camelCase")]
    TimeChanged {
        width: u32,
        height: u32,
        speed: f32,
        position: i64,
        duration: i64,
        /// Buffering percentage, 0..=100.
        buffer: f32,
        #[serde(flatten)]
        tracks: TrackCounters,
        is_playing: bool,
    },
    Error,
    #[serde(rename_all = "camelCase")]
    Recording {
        is_recording: bool,
        record_path: Option<String>,
    },
}

impl MediaEvent {
    /// Short name used in logs, identical to the serialized tag.
    pub fn name(&self) -> &'static str {
        match self {
            MediaEvent::Opening => "opening",
            MediaEvent::Paused => "paused",
            MediaEvent::Stopped => "stopped",
            MediaEvent::Playing { .. } => "playing",
            MediaEvent::Ended { .. } => "ended",
            MediaEvent::TimeChanged { .. } => "timeChanged",
            MediaEvent::Error => "error",
            MediaEvent::Recording { .. } => "recording",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Renderer device appearing on or vanishing from a discovery backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum RendererEvent {
    Attached { id: String, name: String },
    Detached { id: String, name: String },
}

impl RendererEvent {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
