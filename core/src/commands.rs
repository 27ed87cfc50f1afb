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

use serde::{Deserialize, Serialize};

use crate::engine::TrackKind;
use crate::error::MediaError;
use crate::media::{DataSourceType, HwAccel};

/// Media source description as it arrives from the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSetup {
    pub uri: String,
    #[serde(default)]
    pub package_name: Option<String>,
    pub data_source: DataSourceType,
    pub auto_play: bool,
    pub hw_accel: HwAccel,
}

impl MediaSetup {
    /// Builds a setup from the numeric data source and hw-acceleration codes
    /// used on the wire.
    pub fn from_codes(
        uri: impl Into<String>,
        package_name: Option<String>,
        data_source: i64,
        auto_play: bool,
        hw_accel: i64,
    ) -> Result<Self, MediaError> {
        Ok(Self {
            uri: uri.into(),
            package_name,
            data_source: DataSourceType::try_from(data_source)?,
            auto_play,
            hw_accel: HwAccel::try_from(hw_accel)?,
        })
    }
}

/// `initialize` and `setMedia` in one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub options: Vec<String>,
    #[serde(flatten)]
    pub media: MediaSetup,
}

/// Every command a host can route to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum PlayerCommand {
    Initialize { options: Vec<String> },
    Create(CreateRequest),
    SetMedia(MediaSetup),
    Play,
    Pause,
    Stop,
    Dispose,
    IsPlaying,
    IsSeekable,
    SetLooping { looping: bool },
    SeekTo { position: i64 },
    Position,
    Duration,
    SetVolume { volume: i64 },
    Volume,
    SetPlaybackSpeed { speed: f64 },
    PlaybackSpeed,
    Snapshot,
    TrackCount { kind: TrackKind },
    Tracks { kind: TrackKind },
    Track { kind: TrackKind },
    SetTrack { kind: TrackKind, id: i32 },
    Delay { kind: TrackKind },
    SetDelay { kind: TrackKind, delay: i64 },
    AddExternalTrack { kind: TrackKind, uri: String, select: bool },
    SetVideoScale { scale: f32 },
    VideoScale,
    #[serde(rename_all = "camelCase")]
    SetVideoAspectRatio { aspect_ratio: String },
    VideoAspectRatio,
    AvailableRendererBackends,
    StartDiscovery {
        #[serde(default)]
        backend: Option<String>,
    },
    StopDiscovery,
    RendererDevices,
    #[serde(rename_all = "camelCase")]
    CastTo { device_id: String },
    StartRecording { directory: String },
    StopRecording,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandReply {
    Done,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Tracks(BTreeMap<i32, String>),
    Devices(BTreeMap<String, String>),
    Names(Vec<String>),
}

impl PlayerCommand {
    /// Reply used when the addressed session is unknown, not ready or disposed.
    pub fn default_reply(&self) -> CommandReply {
        use PlayerCommand::*;

        match self {
            IsPlaying | IsSeekable | StartRecording { .. } | StopRecording => CommandReply::Bool(false),
            Position | Duration | Volume | TrackCount { .. } | Track { .. } | Delay { .. } => CommandReply::Int(-1),
            PlaybackSpeed | VideoScale => CommandReply::Float(-1.0),
            Snapshot | VideoAspectRatio => CommandReply::Text(String::new()),
            Tracks { .. } => CommandReply::Tracks(BTreeMap::new()),
            RendererDevices => CommandReply::Devices(BTreeMap::new()),
            AvailableRendererBackends => CommandReply::Names(Vec::new()),
            Initialize { .. }
            | Create(_)
            | SetMedia(_)
            | Play
            | Pause
            | Stop
            | Dispose
            | SetLooping { .. }
            | SeekTo { .. }
            | SetVolume { .. }
            | SetPlaybackSpeed { .. }
            | SetTrack { .. }
            | SetDelay { .. }
            | AddExternalTrack { .. }
            | SetVideoScale { .. }
            | SetVideoAspectRatio { .. }
            | StartDiscovery { .. }
            | StopDiscovery
            | CastTo { .. } => CommandReply::Done,
        }
    }
}
