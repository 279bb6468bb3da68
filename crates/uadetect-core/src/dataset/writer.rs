//! Binary dataset writer, the inverse of the reader

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;

use super::format::{WriteFormatExt, SUPPORTED_VERSION};
use crate::device::{DeviceGraph, DeviceIndex};
use crate::error::{FormatError, LoadResult};
use crate::handler::{Algorithm, Handler};
use crate::pattern::PatternNode;
use crate::provider::Provider;
use crate::strings::StringHandle;

/// Serialize a provider's dataset, returning the underlying writer once the
/// gzip stream is finished.
///
/// Handler root whitelists and default devices are configuration, not data,
/// and are not written.
pub fn write_dataset<W: Write>(provider: &Provider, output: W) -> LoadResult<W> {
    let mut out = GzEncoder::new(output, Compression::default());
    let graph = provider.graph();

    out.write_text(provider.copyright())?;
    out.write_text("")?;
    out.write_i32::<LittleEndian>(SUPPORTED_VERSION.0)?;
    out.write_i32::<LittleEndian>(SUPPORTED_VERSION.1)?;

    out.write_count32("string table", graph.strings().len())?;
    for value in graph.strings().iter() {
        out.write_text(value)?;
    }

    out.write_count32("handlers", provider.handlers().len())?;
    for handler in provider.handlers() {
        write_handler(&mut out, handler)?;
    }

    let mut membership = vec![Vec::new(); graph.len()];
    for handler in provider.handlers() {
        for device in handler.devices() {
            membership[device].push(handler.position());
        }
    }
    let tree = TreeWriter {
        graph,
        children: graph.children(),
        membership,
    };
    tree.write_tree(&mut out, graph.roots().collect())?;

    debug!(devices = graph.len(), "dataset written");
    Ok(out.finish()?)
}

fn write_handler<W: Write>(out: &mut W, handler: &Handler) -> LoadResult<()> {
    out.write_u8(handler.kind().tag())?;
    out.write_u8(handler.confidence())?;
    out.write_text(handler.name())?;
    out.write_flag(handler.checks_uaprofs())?;

    match handler.algorithm() {
        Algorithm::EditDistance => {}
        Algorithm::RegexSegment(matcher) => {
            out.write_flag(matcher.first_match_only())?;
            out.write_count16("segments", matcher.patterns().len())?;
            for pattern in matcher.patterns() {
                out.write_text(pattern.pattern())?;
                let weight = pattern.explicit_weight().unwrap_or(0);
                let weight = i32::try_from(weight).map_err(|_| FormatError::TooMany {
                    field: "segment weight",
                    count: weight as usize,
                })?;
                out.write_i32::<LittleEndian>(weight)?;
            }
        }
        Algorithm::ReducedInitialString(matcher) => out.write_text(matcher.tolerance())?,
    }

    write_patterns(out, handler.allow_patterns())?;
    write_patterns(out, handler.deny_patterns())
}

fn write_patterns<W: Write>(out: &mut W, nodes: &[PatternNode]) -> LoadResult<()> {
    out.write_count16("pattern children", nodes.len())?;
    for node in nodes {
        out.write_text(node.pattern())?;
        write_patterns(out, node.children())?;
    }
    Ok(())
}

struct TreeWriter<'a> {
    graph: &'a DeviceGraph,
    children: Vec<Vec<DeviceIndex>>,
    membership: Vec<Vec<usize>>,
}

impl TreeWriter<'_> {
    /// Mirror of the reader's traversal, with an explicit stack of open levels
    fn write_tree<W: Write>(&self, out: &mut W, roots: Vec<DeviceIndex>) -> LoadResult<()> {
        out.write_count16("device children", roots.len())?;
        let mut open = vec![roots.into_iter()];

        while let Some(level) = open.last_mut() {
            let Some(device) = level.next() else {
                open.pop();
                continue;
            };
            let children = self.write_device(out, device)?;
            out.write_count16("device children", children.len())?;
            open.push(children.into_iter());
        }
        Ok(())
    }

    /// Writes one device record and returns its non-variant children.
    fn write_device<W: Write>(&self, out: &mut W, index: DeviceIndex) -> LoadResult<Vec<DeviceIndex>> {
        let info = self
            .graph
            .get(index)
            .ok_or_else(|| FormatError::UnknownReference(format!("device #{index}")))?;
        write_handle(out, info.id())?;

        let (variants, children): (Vec<DeviceIndex>, Vec<DeviceIndex>) = self.children[index]
            .iter()
            .partition(|&&child| self.graph.get(child).is_some_and(|c| c.is_variant()));

        let records: Vec<(DeviceIndex, StringHandle)> = info
            .user_agent()
            .map(|ua| (index, ua))
            .into_iter()
            .chain(variants.iter().filter_map(|&v| {
                self.graph
                    .get(v)
                    .and_then(|record| record.user_agent())
                    .map(|ua| (v, ua))
            }))
            .collect();
        out.write_count16("variants", records.len())?;
        for (record, user_agent) in records {
            write_handle(out, user_agent)?;
            let handlers = &self.membership[record];
            out.write_count16("device handlers", handlers.len())?;
            for &handler in handlers {
                let handler = i16::try_from(handler).map_err(|_| FormatError::TooMany {
                    field: "handlers",
                    count: handler,
                })?;
                out.write_i16::<LittleEndian>(handler)?;
            }
        }

        out.write_count16("capabilities", info.capabilities().len())?;
        for (name, values) in info.capabilities() {
            write_handle(out, *name)?;
            let count = u8::try_from(values.len()).map_err(|_| FormatError::TooMany {
                field: "capability values",
                count: values.len(),
            })?;
            out.write_u8(count)?;
            for value in values {
                write_handle(out, *value)?;
            }
        }
        Ok(children)
    }
}

fn write_handle<W: Write>(out: &mut W, handle: StringHandle) -> LoadResult<()> {
    let raw = i32::try_from(handle).map_err(|_| FormatError::TooMany {
        field: "string table",
        count: handle as usize,
    })?;
    out.write_i32::<LittleEndian>(raw)?;
    Ok(())
}
