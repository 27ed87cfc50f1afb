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

use std::path::PathBuf;

use log::warn;

pub const LANE_PREFIX_ENV: &str = "MEDIA_BRIDGE_LANE_PREFIX";
pub const SNAPSHOT_QUALITY_ENV: &str = "MEDIA_BRIDGE_SNAPSHOT_QUALITY";
pub const ASSET_ROOT_ENV: &str = "MEDIA_BRIDGE_ASSET_ROOT";
pub const BASE_OPTIONS_ENV: &str = "MEDIA_BRIDGE_OPTIONS";

const DEFAULT_LANE_PREFIX: &str = "mp-lane";
const DEFAULT_SNAPSHOT_QUALITY: u8 = 100;

/// Process-wide tunables shared by every session of a directory.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// Name prefix of the per-session lane worker threads.
    pub lane_thread_prefix: String,
    /// JPEG quality (1..=100) used for snapshots.
    pub snapshot_quality: u8,
    /// Root directory of the filesystem asset provider.
    pub asset_root: Option<PathBuf>,
    /// Engine options prepended to every session's own options.
    pub base_options: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            lane_thread_prefix: DEFAULT_LANE_PREFIX.to_string(),
            snapshot_quality: DEFAULT_SNAPSHOT_QUALITY,
            asset_root: None,
            base_options: Vec::new(),
        }
    }
}

impl BridgeConfig {
    /// Defaults overridden by `MEDIA_BRIDGE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`BridgeConfig::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(prefix) = lookup(LANE_PREFIX_ENV) {
            if prefix.trim().is_empty() {
                warn!("{} is empty, keeping \"{}\"", LANE_PREFIX_ENV, config.lane_thread_prefix);
            } else {
                config.lane_thread_prefix = prefix.trim().to_string();
            }
        }

        if let Some(quality) = lookup(SNAPSHOT_QUALITY_ENV) {
            match quality.trim().parse::<u8>() {
                Ok(q) => config.snapshot_quality = q.clamp(1, 100),
                Err(e) => warn!("Ignoring {}={:?}: {}", SNAPSHOT_QUALITY_ENV, quality, e),
            }
        }

        if let Some(root) = lookup(ASSET_ROOT_ENV) {
            if !root.trim().is_empty() {
                config.asset_root = Some(PathBuf::from(root.trim()));
            }
        }

        if let Some(options) = lookup(BASE_OPTIONS_ENV) {
            config.base_options = options.split_whitespace().map(str::to_string).collect();
        }

        config
    }

    /// Options a session hands to the engine: base options first, then its own.
    pub fn engine_options(&self, session_options: &[String]) -> Vec<String> {
        self.base_options
            .iter()
            .chain(session_options.iter())
            .cloned()
            .collect()
    }
}
