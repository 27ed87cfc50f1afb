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

use std::io;

use thiserror::Error;

use crate::session_directory::InstanceId;

/// Failures reported by the external playback engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to create engine player: {0}")]
    PlayerCreation(String),

    #[error("Engine rejected media: {0}")]
    Media(String),

    #[error("Renderer discoverer \"{backend}\" failed: {reason}")]
    Discoverer { backend: String, reason: String },
}

/// Errors of the per-session command lane.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneError {
    /// The lane already accepted its terminal command.
    #[error("Command lane is closed")]
    Closed,

    /// The job was dropped before it started because the lane was cleared.
    #[error("Command was superseded before it started")]
    Superseded,

    #[error("Command panicked on the lane")]
    Panicked,
}

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Failed to open asset \"{key}\": {source}")]
    Asset {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid hardware acceleration mode {0}")]
    InvalidHwAccel(i64),

    #[error("Invalid data source type {0}")]
    InvalidDataSource(i64),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Unknown instance {0}")]
    UnknownInstance(InstanceId),

    #[error("Session {0} is already initialized")]
    AlreadyInitialized(InstanceId),

    #[error("Session {0} is not initialized")]
    NotInitialized(InstanceId),

    #[error("Session {0} is disposed")]
    Disposed(InstanceId),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Lane error: {0}")]
    Lane(#[from] LaneError),

    #[error("Failed to spawn command lane: {0}")]
    LaneSpawn(#[source] io::Error),
}
