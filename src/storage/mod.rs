//! Storage module for persisting fetched collections
//!
//! This module handles where artifacts live:
//! - The `ArtifactStore` capability consulted and written by workers
//! - A filesystem store writing `<destination>.json` files
//! - An in-memory store for tests and embedding
//! - The JSON encoding shared by both

mod fs;
mod memory;
mod traits;

pub use fs::FsArtifactStore;
pub use memory::MemoryArtifactStore;
pub use traits::{ArtifactStore, StorageError, StorageResult};

use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use serde_json::Value;
use std::io;

/// Indentation used for pretty artifacts
const PRETTY_INDENT: &[u8] = b"    ";

/// Single-line JSON with a space after every `,` and `:`
///
/// Produces `[{"id": 1}, {"id": 2}]` rather than the tightest encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Encodes any value on one line using `SpacedFormatter`
pub fn encode_spaced<T>(value: &T) -> Result<Vec<u8>, serde_json::Error>
where
    T: Serialize + ?Sized,
{
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}

/// Encodes an accumulated collection as a JSON array
///
/// # Arguments
///
/// * `items` - The accumulated elements
/// * `pretty` - Indent with four spaces instead of emitting a single line
pub fn encode_artifact(items: &[Value], pretty: bool) -> Result<Vec<u8>, serde_json::Error> {
    if !pretty {
        return encode_spaced(items);
    }

    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(PRETTY_INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    items.serialize(&mut serializer)?;
    Ok(buf)
}
