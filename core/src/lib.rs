pub mod command_lane;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod event_queue;
pub mod events;
pub mod media;
pub mod player_session;
pub mod renderer_registry;
pub mod session_directory;

mod snapshot;

#[cfg(test)]
mod test_engine;

pub use command_lane::{CommandLane, LaneTicket};
pub use commands::{CommandReply, CreateRequest, MediaSetup, PlayerCommand};
pub use config::BridgeConfig;
pub use engine::{EngineEvent, EngineHandle, MediaEngine, RenderSurface, RendererDiscoverer, RendererItem, TrackKind};
pub use error::{EngineError, LaneError, MediaError, SessionError};
pub use event_queue::{ChannelDelegate, Delivery, EventDelegate, EventQueue};
pub use events::{MediaEvent, RendererEvent, TrackCounters};
pub use media::{AssetProvider, DataSourceType, FsAssetProvider, HwAccel, MediaRequest};
pub use player_session::{PlayerSession, SessionState};
pub use renderer_registry::RendererRegistry;
pub use session_directory::{InstanceId, SessionDirectory};
