//! Binary dataset reader
//!
//! Section order: copyright, extra text, version, string table, handlers,
//! device tree. Devices are registered with their handlers only after the
//! whole tree has been read, so every fallback chain is complete when the
//! handlers inspect it.

use std::io::{BufReader, Read};
use std::time::Instant;

use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::GzDecoder;
use tracing::{debug, info};

use super::format::{ReadFormatExt, SUPPORTED_VERSION};
use crate::device::{DeviceGraph, DeviceIndex, DeviceInfo};
use crate::error::{FormatError, LoadResult};
use crate::handler::{Algorithm, HandlerBuilder, HandlerDef, HandlerKind};
use crate::matching::{ReducedInitialMatcher, SegmentMatcher, SegmentPattern};
use crate::pattern::PatternNode;
use crate::provider::{Provider, ProviderConfig};
use crate::strings::{StringHandle, StringTable};

/// Deepest allow/deny pattern nesting accepted from a dataset
pub const MAX_PATTERN_DEPTH: usize = 64;

/// Device record paired with the handlers that claim it
type Registration = (DeviceIndex, Vec<usize>);

/// Decompress and parse a dataset into a ready provider.
pub fn load<R: Read>(source: R, config: ProviderConfig) -> LoadResult<Provider> {
    let started = Instant::now();
    let mut input = BufReader::new(GzDecoder::new(source));

    let copyright = input.read_text()?;
    let _extra = input.read_text()?;

    let major = input.read_i32::<LittleEndian>()?;
    let minor = input.read_i32::<LittleEndian>()?;
    if (major, minor) != SUPPORTED_VERSION {
        return Err(FormatError::UnsupportedVersion {
            found: (major, minor),
            expected: SUPPORTED_VERSION,
        }
        .into());
    }

    let strings = read_strings(&mut input)?;
    debug!(strings = strings.len(), "string table read");

    let defs = read_handlers(&mut input)?;
    let handler_count = defs.len();

    let mut tree = TreeReader {
        graph: DeviceGraph::new(strings),
        handler_count,
        registrations: Vec::new(),
    };
    tree.read_tree(&mut input)?;
    let TreeReader {
        graph,
        registrations,
        ..
    } = tree;

    let builders: Vec<HandlerBuilder> = defs
        .into_iter()
        .enumerate()
        .map(|(position, def)| HandlerBuilder::new(def, position, &graph))
        .collect();
    for (device, handlers) in &registrations {
        for &handler in handlers {
            builders[handler].set(&graph, *device);
        }
    }
    let handlers = builders.into_iter().map(HandlerBuilder::freeze).collect();

    let provider = Provider::assemble(copyright, graph, handlers, config);
    info!(
        strings = provider.graph().strings().len(),
        handlers = handler_count,
        devices = provider.graph().len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "dataset loaded"
    );
    Ok(provider)
}

fn read_strings<R: Read>(input: &mut R) -> LoadResult<StringTable> {
    let count = input.read_count32("string table")?;
    // bounded preallocation, the count is untrusted
    let mut strings = StringTable::with_capacity(count.min(1 << 16));
    for _ in 0..count {
        strings.push(input.read_text()?);
    }
    Ok(strings)
}

fn read_handlers<R: Read>(input: &mut R) -> LoadResult<Vec<HandlerDef>> {
    let count = input.read_count32("handlers")?;
    let mut defs = Vec::with_capacity(count.min(256));
    for _ in 0..count {
        defs.push(read_handler(input)?);
    }
    Ok(defs)
}

fn read_handler<R: Read>(input: &mut R) -> LoadResult<HandlerDef> {
    let kind = HandlerKind::from_tag(input.read_u8()?)?;
    let confidence = input.read_u8()?;
    let name = input.read_text()?;
    let check_uaprofs = input.read_flag("check uaprofs")?;

    let algorithm = match kind {
        HandlerKind::EditDistance => Algorithm::EditDistance,
        HandlerKind::RegexSegment => {
            let first_match_only = input.read_flag("first match only")?;
            let count = input.read_count16("segments")?;
            let mut patterns = Vec::with_capacity(count);
            for _ in 0..count {
                let pattern = input.read_text()?;
                let weight = input.read_i32::<LittleEndian>()?;
                patterns.push(SegmentPattern::new(&pattern, u32::try_from(weight).ok())?);
            }
            Algorithm::RegexSegment(SegmentMatcher::new(patterns, first_match_only))
        }
        HandlerKind::ReducedInitialString => {
            let tolerance = input.read_text()?;
            Algorithm::ReducedInitialString(ReducedInitialMatcher::new(&tolerance)?)
        }
    };

    let mut def = HandlerDef::new(name, confidence, algorithm).check_uaprofs(check_uaprofs);
    def.allow = read_patterns(input)?;
    def.deny = read_patterns(input)?;
    Ok(def)
}

fn read_patterns<R: Read>(input: &mut R) -> LoadResult<Vec<PatternNode>> {
    read_pattern_level(input, 0)
}

fn read_pattern_level<R: Read>(input: &mut R, depth: usize) -> LoadResult<Vec<PatternNode>> {
    if depth > MAX_PATTERN_DEPTH {
        return Err(FormatError::TooDeep {
            field: "pattern tree",
            limit: MAX_PATTERN_DEPTH,
        }
        .into());
    }
    let count = input.read_count16("pattern children")?;
    (0..count).map(|_| read_pattern(input, depth)).collect()
}

fn read_pattern<R: Read>(input: &mut R, depth: usize) -> LoadResult<PatternNode> {
    let pattern = input.read_text()?;
    let node = PatternNode::new(&pattern)?;
    Ok(node.with_children(read_pattern_level(input, depth + 1)?))
}

struct TreeReader {
    graph: DeviceGraph,
    handler_count: usize,
    registrations: Vec<Registration>,
}

impl TreeReader {
    /// Depth-first, with the open levels kept on an explicit stack so that
    /// nesting depth is bounded only by the data, not the call stack.
    fn read_tree<R: Read>(&mut self, input: &mut R) -> LoadResult<()> {
        let roots = input.read_count16("device children")?;
        let mut open: Vec<(Option<DeviceIndex>, usize)> = vec![(None, roots)];

        while let Some((parent, remaining)) = open.last_mut() {
            if *remaining == 0 {
                open.pop();
                continue;
            }
            *remaining -= 1;
            let parent = *parent;

            let index = self.read_device(input, parent)?;
            let children = input.read_count16("device children")?;
            if children > 0 {
                open.push((Some(index), children));
            }
        }
        Ok(())
    }

    /// One device record and its variants, up to but excluding its children
    fn read_device<R: Read>(&mut self, input: &mut R, parent: Option<DeviceIndex>) -> LoadResult<DeviceIndex> {
        let id = self.read_handle(input)?;

        let variant_count = input.read_count16("variants")?;
        let mut variants = Vec::with_capacity(variant_count);
        for _ in 0..variant_count {
            let user_agent = self.read_handle(input)?;
            let handlers = self.read_handler_indices(input)?;
            variants.push((user_agent, handlers));
        }

        let mut info = DeviceInfo::new(id);
        if let Some(parent) = parent {
            info = info.with_fallback(parent);
        }
        let property_count = input.read_count16("capabilities")?;
        for _ in 0..property_count {
            let name = self.read_handle(input)?;
            let value_count = input.read_u8()?;
            let values = (0..value_count)
                .map(|_| self.read_handle(input))
                .collect::<LoadResult<Vec<_>>>()?;
            info.set_capability(name, values);
        }

        let mut variants = variants.into_iter();
        let primary_handlers = match variants.next() {
            Some((user_agent, handlers)) => {
                info = info.with_user_agent(user_agent);
                handlers
            }
            None => Vec::new(),
        };
        let index = self.graph.push(info);
        self.registrations.push((index, primary_handlers));

        for (user_agent, handlers) in variants {
            let variant = self.graph.push(DeviceInfo::variant_of(index, id, user_agent));
            self.registrations.push((variant, handlers));
        }
        Ok(index)
    }

    fn read_handle<R: Read>(&self, input: &mut R) -> LoadResult<StringHandle> {
        let raw = input.read_i32::<LittleEndian>()?;
        let len = self.graph.strings().len();
        match StringHandle::try_from(raw) {
            Ok(handle) if (handle as usize) < len => Ok(handle),
            _ => Err(FormatError::StringIndex {
                index: raw.into(),
                len,
            }
            .into()),
        }
    }

    fn read_handler_indices<R: Read>(&self, input: &mut R) -> LoadResult<Vec<usize>> {
        let count = input.read_count16("device handlers")?;
        let mut indices = Vec::with_capacity(count);
        for _ in 0..count {
            let raw = input.read_i16::<LittleEndian>()?;
            match usize::try_from(raw) {
                Ok(index) if index < self.handler_count => indices.push(index),
                _ => {
                    return Err(FormatError::HandlerIndex {
                        index: raw.into(),
                        len: self.handler_count,
                    }
                    .into())
                }
            }
        }
        Ok(indices)
    }
}
