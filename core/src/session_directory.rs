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

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};

use crate::command_lane::LaneTicket;
use crate::commands::{CommandReply, CreateRequest, MediaSetup, PlayerCommand};
use crate::config::BridgeConfig;
use crate::engine::{MediaEngine, RenderSurface};
use crate::error::SessionError;
use crate::media::{AssetProvider, DataSourceType, FsAssetProvider, MediaLocator, MediaRequest};
use crate::player_session::PlayerSession;

pub type InstanceId = u32;

/// Owns every live [`PlayerSession`] and routes commands to them by id.
pub struct SessionDirectory {
    engine: Arc<dyn MediaEngine>,
    assets: Arc<dyn AssetProvider>,
    config: Arc<BridgeConfig>,
    sessions: RwLock<HashMap<InstanceId, Arc<PlayerSession>>>,
    next_id: Mutex<InstanceId>,
}

impl SessionDirectory {
    pub fn new(engine: Arc<dyn MediaEngine>, assets: Arc<dyn AssetProvider>, config: BridgeConfig) -> Self {
        Self {
            engine,
            assets,
            config: Arc::new(config),
            sessions: RwLock::new(HashMap::new()),
            next_id: Mutex::new(1),
        }
    }

    /// Directory configured from the environment, with filesystem assets under
    /// the configured asset root (or the working directory).
    pub fn from_env(engine: Arc<dyn MediaEngine>) -> Self {
        let config = BridgeConfig::from_env();
        let root = config.asset_root.clone().unwrap_or_else(|| PathBuf::from("."));
        Self::new(engine, Arc::new(FsAssetProvider::new(root)), config)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Creates an uninitialized session rendering into `surface`.
    pub fn register(&self, surface: Arc<dyn RenderSurface>) -> InstanceId {
        let mut sessions = self.sessions.write();
        let id = {
            let mut next = self.next_id.lock();
            while *next == 0 || sessions.contains_key(&*next) {
                *next = next.wrapping_add(1);
            }
            let id = *next;
            *next = next.wrapping_add(1);
            id
        };

        let session = PlayerSession::new(id, surface, self.assets.clone(), self.config.clone());
        sessions.insert(id, session);
        info!("Session {} registered", id);
        id
    }

    pub fn session(&self, id: InstanceId) -> Option<Arc<PlayerSession>> {
        self.sessions.read().get(&id).cloned()
    }

    pub fn ids(&self) -> Vec<InstanceId> {
        let mut ids: Vec<_> = self.sessions.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    pub fn initialize(&self, id: InstanceId, options: Vec<String>) -> Result<(), SessionError> {
        let session = self.session(id).ok_or(SessionError::UnknownInstance(id))?;
        session.initialize(self.engine.as_ref(), options)
    }

    pub fn set_media(&self, id: InstanceId, setup: MediaSetup) -> Result<LaneTicket<bool>, SessionError> {
        let session = self.session(id).ok_or(SessionError::UnknownInstance(id))?;
        session.set_media(self.media_request(setup))
    }

    /// `initialize` followed by `set_media`.
    pub fn create(&self, id: InstanceId, request: CreateRequest) -> Result<LaneTicket<bool>, SessionError> {
        self.initialize(id, request.options)?;
        self.set_media(id, request.media)
    }

    /// Removes and disposes a session. The ticket, if any, resolves once the
    /// engine teardown on the session's lane finished.
    pub fn dispose(&self, id: InstanceId) -> Result<Option<LaneTicket<()>>, SessionError> {
        let session = self.sessions.write().remove(&id).ok_or(SessionError::UnknownInstance(id))?;
        Ok(session.dispose())
    }

    pub fn dispose_all(&self) {
        let sessions: Vec<_> = self.sessions.write().drain().map(|(_, s)| s).collect();
        info!("Disposing {} session(s)", sessions.len());
        for session in sessions {
            let _ = session.dispose();
        }
    }

    /// Routes `command` to session `id`. Unknown, uninitialized and disposed
    /// sessions answer with the command's default reply.
    pub fn dispatch(&self, id: InstanceId, command: PlayerCommand) -> CommandReply {
        let Some(session) = self.session(id) else {
            debug!("Command for unknown instance {}: {:?}", id, command);
            return command.default_reply();
        };

        let fallback = command.default_reply();
        let outcome = match command {
            PlayerCommand::Initialize { options } => self.initialize(id, options).map(|_| CommandReply::Done),
            PlayerCommand::Create(request) => self.create(id, request).map(|_| CommandReply::Done),
            PlayerCommand::SetMedia(setup) => session.set_media(self.media_request(setup)).map(|_| CommandReply::Done),
            PlayerCommand::Stop => session.stop().map(|_| CommandReply::Done),
            PlayerCommand::StartDiscovery { backend } => {
                session.start_discovery(backend.as_deref()).map(|_| CommandReply::Done)
            }
            PlayerCommand::StopDiscovery => session.stop_discovery().map(|_| CommandReply::Done),
            PlayerCommand::CastTo { device_id } => session.cast_to(&device_id).map(|_| CommandReply::Done),
            PlayerCommand::Dispose => self.dispose(id).map(|_| CommandReply::Done),
            other => Ok(direct(&session, other)),
        };

        outcome.unwrap_or_else(|e| {
            warn!("Command for instance {} failed: {}", id, e);
            fallback
        })
    }

    fn media_request(&self, setup: MediaSetup) -> MediaRequest {
        let locator = match setup.data_source {
            DataSourceType::Asset => MediaLocator::Asset(self.assets.lookup_key(&setup.uri, setup.package_name.as_deref())),
            DataSourceType::Network | DataSourceType::File => MediaLocator::Uri(setup.uri),
        };
        MediaRequest { locator, auto_play: setup.auto_play, hw_accel: setup.hw_accel }
    }
}

/// Commands answered by calling the session directly.
fn direct(session: &PlayerSession, command: PlayerCommand) -> CommandReply {
    use PlayerCommand::*;

    match command {
        Play => session.play(),
        Pause => session.pause(),
        SetLooping { looping } => {
            session.set_looping(looping);
        }
        SeekTo { position } => session.seek_to(position),
        SetVolume { volume } => session.set_volume(volume),
        SetPlaybackSpeed { speed } => session.set_playback_speed(speed),
        SetTrack { kind, id } => session.set_track(kind, id),
        SetDelay { kind, delay } => session.set_delay(kind, delay),
        AddExternalTrack { kind, uri, select } => {
            session.add_external_track(&uri, kind, select);
        }
        SetVideoScale { scale } => session.set_video_scale(scale),
        SetVideoAspectRatio { aspect_ratio } => session.set_video_aspect_ratio(&aspect_ratio),

        IsPlaying => return CommandReply::Bool(session.is_playing()),
        IsSeekable => return CommandReply::Bool(session.is_seekable()),
        Position => return CommandReply::Int(session.position()),
        Duration => return CommandReply::Int(session.duration()),
        Volume => return CommandReply::Int(session.volume().into()),
        PlaybackSpeed => return CommandReply::Float(session.playback_speed().into()),
        Snapshot => return CommandReply::Text(session.snapshot()),
        TrackCount { kind } => return CommandReply::Int(session.track_count(kind).into()),
        Tracks { kind } => return CommandReply::Tracks(session.tracks(kind)),
        Track { kind } => return CommandReply::Int(session.track(kind).into()),
        Delay { kind } => return CommandReply::Int(session.delay(kind)),
        VideoScale => return CommandReply::Float(session.video_scale().into()),
        VideoAspectRatio => return CommandReply::Text(session.video_aspect_ratio()),
        AvailableRendererBackends => return CommandReply::Names(session.available_renderer_backends()),
        RendererDevices => return CommandReply::Devices(session.renderer_devices()),
        StartRecording { directory } => return CommandReply::Bool(session.start_recording(&directory)),
        StopRecording => return CommandReply::Bool(session.stop_recording()),

        Initialize { .. }
        | Create(_)
        | SetMedia(_)
        | Stop
        | Dispose
        | StartDiscovery { .. }
        | StopDiscovery
        | CastTo { .. } => {}
    }
    CommandReply::Done
}

impl Drop for SessionDirectory {
    fn drop(&mut self) {
        self.dispose_all();
    }
}
