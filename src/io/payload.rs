//! Binary layouts for the artifacts of one run.
//!
//! Quantized payload (`MQNT`):
//! ```text
//! magic "MQNT" | major u8 | minor u8 | strategy id u8 | bins u64 | count u64 | count * 3 * i64
//! ```
//! Reconstructed vertices (`MQRV`):
//! ```text
//! magic "MQRV" | major u8 | minor u8 | count u64 | count * 3 * f64
//! ```
//! All integers and floats are little endian.

use std::fs;
use std::path::Path;

use crate::core::bit_coder::{ByteReader, ByteWriter, ReaderErr};
use crate::core::shared::{Vertex, NUM_AXES};
use crate::normalization::NormalizationType;
use crate::quantization::{self, QuantizedBuffer};

const QUANTIZED_MAGIC: &[u8; 4] = b"MQNT";
const VERTICES_MAGIC: &[u8; 4] = b"MQRV";
const VERSION_MAJOR: u8 = 1;
const VERSION_MINOR: u8 = 0;

#[remain::sorted]
#[derive(thiserror::Error, Debug)]
pub enum Err {
    #[error("Invalid quantized payload: {0}")]
    InvalidPayload(#[from] quantization::Err),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Not a {0} file")]
    NotAPayload(&'static str),
    #[error("Not enough data: {0}")]
    NotEnoughData(#[from] ReaderErr),
    #[error("Trailing data: {0} bytes after the last value")]
    TrailingData(usize),
    #[error("Unknown strategy id: {0}")]
    UnknownStrategy(u8),
    #[error("Unsupported version: {0}.{1}")]
    UnsupportedVersion(u8, u8),
}

fn write_header<W>(writer: &mut W, magic: &[u8; 4])
    where W: ByteWriter
{
    writer.write_bytes(magic);
    writer.write_u8(VERSION_MAJOR);
    writer.write_u8(VERSION_MINOR);
}

fn read_header<R>(reader: &mut R, magic: &[u8; 4], what: &'static str) -> Result<(), Err>
    where R: ByteReader
{
    for &expected in magic {
        if reader.read_u8()? != expected {
            return Err(Err::NotAPayload(what));
        }
    }
    let major = reader.read_u8()?;
    let minor = reader.read_u8()?;
    if major != VERSION_MAJOR {
        return Err(Err::UnsupportedVersion(major, minor));
    }
    Ok(())
}

/// Reads the vertex count and checks it against the bytes left, when the reader knows them.
fn read_count<R>(reader: &mut R, bytes_per_item: usize) -> Result<usize, Err>
    where R: ByteReader
{
    let count = reader.read_u64()? as usize;
    if let Some(remaining) = reader.remaining() {
        if count.checked_mul(bytes_per_item).is_none_or(|needed| needed > remaining) {
            return Err(Err::NotEnoughData(ReaderErr::NotEnoughData));
        }
    }
    Ok(count)
}

fn check_end<R>(reader: &R) -> Result<(), Err>
    where R: ByteReader
{
    match reader.remaining() {
        Some(n) if n > 0 => Err(Err::TrailingData(n)),
        _ => Ok(()),
    }
}


pub fn write_quantized<W>(writer: &mut W, strategy: NormalizationType, quantized: &QuantizedBuffer)
    where W: ByteWriter
{
    write_header(writer, QUANTIZED_MAGIC);
    writer.write_u8(strategy.get_id());
    writer.write_u64(quantized.get_bins());
    writer.write_u64(quantized.len() as u64);
    for v in quantized.get_values() {
        for &c in v {
            writer.write_i64(c);
        }
    }
}

pub fn read_quantized<R>(reader: &mut R) -> Result<(NormalizationType, QuantizedBuffer), Err>
    where R: ByteReader
{
    read_header(reader, QUANTIZED_MAGIC, "quantized payload")?;
    let id = reader.read_u8()?;
    let strategy = NormalizationType::from_id(id).ok_or(Err::UnknownStrategy(id))?;
    let bins = reader.read_u64()?;
    let count = read_count(reader, NUM_AXES * 8)?;
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push([reader.read_i64()?, reader.read_i64()?, reader.read_i64()?]);
    }
    check_end(reader)?;
    Ok((strategy, QuantizedBuffer::from_raw(values, bins)?))
}

pub fn write_vertices<W>(writer: &mut W, vertices: &[Vertex])
    where W: ByteWriter
{
    write_header(writer, VERTICES_MAGIC);
    writer.write_u64(vertices.len() as u64);
    for v in vertices {
        for &c in v {
            writer.write_f64(c);
        }
    }
}

pub fn read_vertices<R>(reader: &mut R) -> Result<Vec<Vertex>, Err>
    where R: ByteReader
{
    read_header(reader, VERTICES_MAGIC, "reconstructed vertices")?;
    let count = read_count(reader, NUM_AXES * 8)?;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push([reader.read_f64()?, reader.read_f64()?, reader.read_f64()?]);
    }
    check_end(reader)?;
    Ok(out)
}


pub fn save_quantized<P: AsRef<Path>>(path: P, strategy: NormalizationType, quantized: &QuantizedBuffer) -> Result<(), Err> {
    let mut buffer = Vec::new();
    write_quantized(&mut buffer, strategy, quantized);
    fs::write(path, buffer)?;
    Ok(())
}

pub fn load_quantized<P: AsRef<Path>>(path: P) -> Result<(NormalizationType, QuantizedBuffer), Err> {
    let mut reader = fs::read(path)?.into_iter();
    read_quantized(&mut reader)
}

pub fn save_vertices<P: AsRef<Path>>(path: P, vertices: &[Vertex]) -> Result<(), Err> {
    let mut buffer = Vec::new();
    write_vertices(&mut buffer, vertices);
    fs::write(path, buffer)?;
    Ok(())
}

pub fn load_vertices<P: AsRef<Path>>(path: P) -> Result<Vec<Vertex>, Err> {
    let mut reader = fs::read(path)?.into_iter();
    read_vertices(&mut reader)
}
