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

use std::fs;
use std::io;
use std::path::PathBuf;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::MediaError;

const NO_MEDIACODEC_DIRECT_RENDERING: &str = ":no-mediacodec-dr";
const NO_OMXIL_DIRECT_RENDERING: &str = ":no-omxil-dr";
pub const LOOP_OPTION: &str = "--loop";
pub const NO_LOOP_OPTION: &str = "--no-loop";

/// Hardware acceleration policy applied on every media load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HwAccel {
    /// Software decoding and output.
    Disabled,
    /// Hardware decoding with software output.
    Decoding,
    /// Hardware decoding and output.
    Full,
}

impl TryFrom<i64> for HwAccel {
    type Error = MediaError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(HwAccel::Disabled),
            1 => Ok(HwAccel::Decoding),
            2 => Ok(HwAccel::Full),
            other => Err(MediaError::InvalidHwAccel(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataSourceType {
    Asset,
    Network,
    File,
}

impl TryFrom<i64> for DataSourceType {
    type Error = MediaError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DataSourceType::Asset),
            1 => Ok(DataSourceType::Network),
            2 => Ok(DataSourceType::File),
            other => Err(MediaError::InvalidDataSource(other)),
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HwDecoderFlags: u8 {
        const ENABLED = 0b01;
        const FORCE = 0b10;
    }
}

impl From<HwAccel> for HwDecoderFlags {
    fn from(mode: HwAccel) -> Self {
        match mode {
            HwAccel::Disabled => HwDecoderFlags::empty(),
            HwAccel::Decoding | HwAccel::Full => HwDecoderFlags::ENABLED | HwDecoderFlags::FORCE,
        }
    }
}

/// An opened asset, ready to be handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    pub key: String,
    pub path: PathBuf,
    pub length: u64,
}

/// Resolves packaged assets to something the engine can open.
pub trait AssetProvider: Send + Sync {
    /// Maps an asset name (optionally scoped to a package) to its lookup key.
    fn lookup_key(&self, asset: &str, package: Option<&str>) -> String;

    /// Opens the asset behind `key`. May block on I/O.
    fn open(&self, key: &str) -> io::Result<AssetDescriptor>;
}

/// Asset provider backed by a directory tree.
#[derive(Debug, Clone)]
pub struct FsAssetProvider {
    root: PathBuf,
}

impl FsAssetProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetProvider for FsAssetProvider {
    fn lookup_key(&self, asset: &str, package: Option<&str>) -> String {
        match package.filter(|p| !p.is_empty()) {
            Some(package) => format!("assets/packages/{}/{}", package, asset),
            None => format!("assets/{}", asset),
        }
    }

    fn open(&self, key: &str) -> io::Result<AssetDescriptor> {
        let path = self.root.join(key);
        let metadata = fs::metadata(&path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("{} is not a file", path.display())));
        }
        Ok(AssetDescriptor { key: key.to_string(), path, length: metadata.len() })
    }
}

/// Where a media load points to, before any I/O happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaLocator {
    /// Asset lookup key, opened through the session's [`AssetProvider`].
    Asset(String),
    /// Network URL or file URI handed verbatim to the engine.
    Uri(String),
}

impl MediaLocator {
    pub fn as_str(&self) -> &str {
        match self {
            MediaLocator::Asset(key) => key,
            MediaLocator::Uri(uri) => uri,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRequest {
    pub locator: MediaLocator,
    pub auto_play: bool,
    pub hw_accel: HwAccel,
}

impl MediaRequest {
    pub fn new(locator: impl Into<String>, is_asset: bool, auto_play: bool, hw_accel: HwAccel) -> Self {
        let locator = locator.into();
        let locator = if is_asset { MediaLocator::Asset(locator) } else { MediaLocator::Uri(locator) };
        Self { locator, auto_play, hw_accel }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Asset(AssetDescriptor),
    Uri(String),
}

/// A fully built media reference, committed to the engine with
/// `EngineHandle::set_media`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDescriptor {
    pub source: MediaSource,
    pub hw_decoder: HwDecoderFlags,
    pub options: Vec<String>,
}

impl MediaDescriptor {
    /// Applies the hardware acceleration policy, then appends `options` in order.
    pub fn build(source: MediaSource, hw_accel: HwAccel, options: &[String]) -> Self {
        let mut media_options = Vec::with_capacity(options.len() + 2);
        if hw_accel == HwAccel::Decoding {
            media_options.push(NO_MEDIACODEC_DIRECT_RENDERING.to_string());
            media_options.push(NO_OMXIL_DIRECT_RENDERING.to_string());
        }
        media_options.extend(options.iter().cloned());

        Self { source, hw_decoder: hw_accel.into(), options: media_options }
    }

    pub fn locator(&self) -> &str {
        match &self.source {
            MediaSource::Asset(asset) => &asset.key,
            MediaSource::Uri(uri) => uri,
        }
    }
}
