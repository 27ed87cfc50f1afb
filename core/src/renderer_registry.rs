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

//! Renderer discovery and output-target switching for one session.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::engine::{DiscovererEvent, DiscovererListener, EngineHandle, RendererDiscoverer, RendererItem};
use crate::event_queue::EventQueue;
use crate::events::RendererEvent;

type DeviceSet = Mutex<BTreeMap<String, RendererItem>>;

struct Discovery {
    sessions: Vec<Arc<dyn RendererDiscoverer>>,
    closed: bool,
}

pub struct RendererRegistry {
    devices: Arc<DeviceSet>,
    events: Arc<EventQueue<RendererEvent>>,
    /// Bumped, under the device lock, whenever the running discovery
    /// generation ends; callbacks from an older generation are ignored.
    generation: Arc<AtomicU64>,
    discovery: Mutex<Discovery>,
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self {
            devices: Arc::new(Mutex::new(BTreeMap::new())),
            events: Arc::new(EventQueue::new()),
            generation: Arc::new(AtomicU64::new(0)),
            discovery: Mutex::new(Discovery { sessions: Vec::new(), closed: false }),
        }
    }

    /// Queue of `attached`/`detached` notifications. Its delegate runs with the
    /// device set locked and must not call back into the registry.
    pub fn events(&self) -> &EventQueue<RendererEvent> {
        &self.events
    }

    pub fn list_backends(&self, engine: &dyn EngineHandle) -> Vec<String> {
        engine.renderer_backends()
    }

    /// Restarts discovery. `backend` restricts it to one backend, `None` or an
    /// empty name runs every backend the engine reports. Returns the number of
    /// discoverers that actually started.
    pub fn start_discovery(&self, engine: &dyn EngineHandle, backend: Option<&str>) -> usize {
        let mut discovery = self.discovery.lock();
        if discovery.closed {
            debug!("Renderer registry is shut down, ignoring discovery start");
            return 0;
        }
        self.stop_sessions(&mut discovery);

        let generation = self.generation.load(Ordering::Acquire);
        let wanted = backend.filter(|b| !b.is_empty());
        for name in engine.renderer_backends() {
            if wanted.is_some_and(|w| w != name) {
                continue;
            }

            let discoverer = match engine.create_discoverer(&name) {
                Ok(discoverer) => discoverer,
                Err(e) => {
                    warn!("Skipping renderer backend {}: {}", name, e);
                    continue;
                }
            };

            discoverer.set_event_listener(Some(self.listener(generation)));
            match discoverer.start() {
                Ok(()) => {
                    debug!("Renderer discovery running on {}", name);
                    discovery.sessions.push(discoverer);
                }
                Err(e) => {
                    warn!("Renderer backend {} failed to start: {}", name, e);
                    discoverer.set_event_listener(None);
                }
            }
        }

        info!("Renderer discovery started with {} backend(s)", discovery.sessions.len());
        discovery.sessions.len()
    }

    /// Stops discovery and returns output to the local surface.
    pub fn stop_discovery(&self, engine: &dyn EngineHandle) {
        self.stop_sessions(&mut self.discovery.lock());

        engine.pause();
        engine.set_renderer(None);
        engine.play();
    }

    /// Switches output to `device_id`. An unknown id clears the target, which
    /// brings output back to the local surface. Returns whether the id was known.
    pub fn cast_to(&self, engine: &dyn EngineHandle, device_id: &str) -> bool {
        if engine.is_playing() {
            engine.pause();
        }

        let item = self.devices.lock().get(device_id).cloned();
        if item.is_none() {
            debug!("Renderer {} is unknown, falling back to local output", device_id);
        }
        engine.set_renderer(item.as_ref());
        engine.play();

        item.is_some()
    }

    /// Known devices, id to display name.
    pub fn devices(&self) -> BTreeMap<String, String> {
        self.devices
            .lock()
            .values()
            .map(|item| (item.name.clone(), item.display_name.clone()))
            .collect()
    }

    pub fn running_sessions(&self) -> usize {
        self.discovery.lock().sessions.len()
    }

    /// Stops every discoverer for good; later `start_discovery` calls are no-ops.
    pub fn shutdown(&self) {
        let mut discovery = self.discovery.lock();
        discovery.closed = true;
        self.stop_sessions(&mut discovery);
    }

    fn stop_sessions(&self, discovery: &mut Discovery) {
        {
            let mut devices = self.devices.lock();
            self.generation.fetch_add(1, Ordering::AcqRel);
            devices.clear();
        }
        for session in discovery.sessions.drain(..) {
            session.stop();
            session.set_event_listener(None);
        }
    }

    fn listener(&self, generation: u64) -> DiscovererListener {
        let devices = self.devices.clone();
        let events = self.events.clone();
        let current = self.generation.clone();

        Arc::new(move |event: DiscovererEvent| {
            let mut devices = devices.lock();
            if current.load(Ordering::Acquire) != generation {
                return;
            }
            let notification = match event {
                DiscovererEvent::ItemAdded(item) => {
                    let notification = RendererEvent::Attached { id: item.name.clone(), name: item.display_name.clone() };
                    devices.insert(item.name.clone(), item);
                    notification
                }
                DiscovererEvent::ItemDeleted(item) => {
                    devices.remove(&item.name);
                    RendererEvent::Detached { id: item.name, name: item.display_name }
                }
            };
            // Enqueued under the device lock so notifications follow set mutations.
            events.enqueue(notification);
        })
    }
}
