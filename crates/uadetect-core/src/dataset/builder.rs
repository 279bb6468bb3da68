//! In-memory dataset construction
//!
//! Devices must be declared parent first. Handlers claim every device whose
//! user agent they accept unless a device was explicitly assigned.

use ahash::AHashMap;
use tracing::debug;

use crate::device::{DeviceGraph, DeviceIndex, DeviceInfo};
use crate::error::FormatError;
use crate::handler::{HandlerBuilder, HandlerDef};
use crate::provider::{Provider, ProviderConfig};

/// Builds a [`Provider`] without going through the binary format.
///
/// ```
/// use uadetect_core::dataset::DatasetBuilder;
/// use uadetect_core::handler::{Algorithm, HandlerDef};
/// use uadetect_core::pattern::PatternNode;
/// use uadetect_core::provider::ProviderConfig;
///
/// let mut builder = DatasetBuilder::new();
/// builder.handler(
///     HandlerDef::new("all", 10, Algorithm::EditDistance).allow(PatternNode::new(".*")?),
/// );
/// builder.device("generic", None, None)?;
/// builder.device("d1", Some("Mozilla/5.0 Example"), Some("generic"))?;
///
/// let provider = builder.build(ProviderConfig::default());
/// let device = provider.device_info("Mozilla/5.0 Example").unwrap();
/// assert_eq!(device.id(), "d1");
/// # Ok::<(), uadetect_core::FormatError>(())
/// ```
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    copyright: String,
    graph: DeviceGraph,
    handlers: Vec<HandlerDef>,
    assignments: AHashMap<DeviceIndex, Vec<usize>>,
}

impl DatasetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn copyright(&mut self, text: impl Into<String>) -> &mut Self {
        self.copyright = text.into();
        self
    }

    /// Declare a handler. Declaration order is the handler's position and the
    /// tie-break among equal confidences.
    pub fn handler(&mut self, def: HandlerDef) -> &mut Self {
        self.handlers.push(def);
        self
    }

    /// Declare a device under an already declared parent.
    pub fn device(
        &mut self,
        id: &str,
        user_agent: Option<&str>,
        parent: Option<&str>,
    ) -> Result<DeviceIndex, FormatError> {
        if self.graph.find(id).is_some() {
            return Err(FormatError::DuplicateDevice(id.to_string()));
        }
        let fallback = match parent {
            Some(parent) => Some(
                self.graph
                    .find(parent)
                    .ok_or_else(|| FormatError::UnknownParent(parent.to_string()))?,
            ),
            None => None,
        };

        let strings = self.graph.strings_mut();
        let mut info = DeviceInfo::new(strings.add(id));
        if let Some(ua) = user_agent {
            info = info.with_user_agent(strings.add(ua));
        }
        if let Some(fallback) = fallback {
            info = info.with_fallback(fallback);
        }
        Ok(self.graph.push(info))
    }

    /// Attach another user agent to a declared device. The first user agent
    /// of a device without one goes on the device record itself.
    pub fn variant(&mut self, id: &str, user_agent: &str) -> Result<DeviceIndex, FormatError> {
        let primary = self.require(id)?;
        let ua = self.graph.strings_mut().add(user_agent);
        if let Some(info) = self.graph.get_mut(primary) {
            if info.user_agent.is_none() {
                info.user_agent = Some(ua);
                return Ok(primary);
            }
        }
        let id = self.graph.strings_mut().add(id);
        Ok(self.graph.push(DeviceInfo::variant_of(primary, id, ua)))
    }

    /// Set a capability on a declared device, replacing earlier values.
    pub fn capability(&mut self, id: &str, name: &str, values: &[&str]) -> Result<&mut Self, FormatError> {
        let device = self.require(id)?;
        let strings = self.graph.strings_mut();
        let name = strings.add(name);
        let values = values.iter().map(|v| strings.add(v)).collect();
        if let Some(info) = self.graph.get_mut(device) {
            info.set_capability(name, values);
        }
        Ok(self)
    }

    /// Register a record with a named handler instead of letting handlers
    /// claim it by pattern.
    pub fn assign(&mut self, device: DeviceIndex, handler: &str) -> Result<&mut Self, FormatError> {
        if self.graph.get(device).is_none() {
            return Err(FormatError::UnknownReference(format!("device #{device}")));
        }
        let position = self
            .handlers
            .iter()
            .position(|h| h.name == handler)
            .ok_or_else(|| FormatError::UnknownReference(handler.to_string()))?;
        let assigned = self.assignments.entry(device).or_default();
        if !assigned.contains(&position) {
            assigned.push(position);
        }
        Ok(self)
    }

    pub fn build(self, config: ProviderConfig) -> Provider {
        let Self {
            copyright,
            graph,
            handlers,
            assignments,
        } = self;

        let builders: Vec<HandlerBuilder> = handlers
            .into_iter()
            .enumerate()
            .map(|(position, def)| HandlerBuilder::new(def, position, &graph))
            .collect();

        for (device, _) in graph.iter() {
            match assignments.get(&device) {
                Some(assigned) => {
                    for &position in assigned {
                        builders[position].set(&graph, device);
                    }
                }
                None => {
                    for builder in &builders {
                        if builder.handler().can_handle_device(&graph, device) {
                            builder.set(&graph, device);
                        }
                    }
                }
            }
        }

        let handlers = builders.into_iter().map(HandlerBuilder::freeze).collect();
        debug!(devices = graph.len(), "dataset built");
        Provider::assemble(copyright, graph, handlers, config)
    }

    fn require(&self, id: &str) -> Result<DeviceIndex, FormatError> {
        self.graph
            .find(id)
            .ok_or_else(|| FormatError::UnknownReference(id.to_string()))
    }
}
