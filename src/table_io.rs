use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::cmp::Ordering;
use std::io::{self, ErrorKind, Read, Write};

use crate::corpus::WordId;
use crate::model::AlignmentModel;
use crate::table::{LogTable, WordPair};

/// Bytes per record: two `u32` ids and an `f64`.
pub const RECORD_BYTES: usize = 16;

/// One translation-table entry as stored on disk.
#[derive(Clone, Copy, Debug)]
pub struct Trec {
    pub source: WordId,
    pub target: WordId,
    pub log_prob: f64,
}

impl Trec {
    fn key(&self) -> WordPair {
        (self.source, self.target)
    }

    pub fn write_to<W: Write>(writer: &mut W, trec: &Trec) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(trec.source)?;
        writer.write_u32::<LittleEndian>(trec.target)?;
        writer.write_f64::<LittleEndian>(trec.log_prob)
    }

    /// `Ok(None)` when the reader is exhausted before the record starts; a
    /// record cut short is an `UnexpectedEof` error.
    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Option<Self>> {
        let mut buf = [0u8; RECORD_BYTES];
        let mut filled = 0;
        while filled < RECORD_BYTES {
            match reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        match filled {
            0 => Ok(None),
            RECORD_BYTES => {
                let mut fields = &buf[..];
                Ok(Some(Trec {
                    source: fields.read_u32::<LittleEndian>()?,
                    target: fields.read_u32::<LittleEndian>()?,
                    log_prob: fields.read_f64::<LittleEndian>()?,
                }))
            }
            n => Err(io::Error::new(
                ErrorKind::UnexpectedEof,
                format!("record cut short after {n} of {RECORD_BYTES} bytes"),
            )),
        }
    }
}

// Records order and compare by word pair only.
impl Ord for Trec {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for Trec {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Trec {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Trec {}

/// Entries of the translation table sorted by (source, target).
pub fn records(model: &AlignmentModel) -> Vec<Trec> {
    let mut recs: Vec<Trec> = model
        .translation_table()
        .iter()
        .map(|(&(source, target), &log_prob)| Trec {
            source,
            target,
            log_prob,
        })
        .collect();
    recs.sort_unstable();
    recs
}

/// Binary layout, little-endian: source vocab size (u64), target vocab size
/// (u64), record count (u64), then the records.
pub fn write_table<W: Write>(writer: &mut W, model: &AlignmentModel) -> io::Result<()> {
    let recs = records(model);
    writer.write_u64::<LittleEndian>(model.source_vocab_size() as u64)?;
    writer.write_u64::<LittleEndian>(model.target_vocab_size() as u64)?;
    writer.write_u64::<LittleEndian>(recs.len() as u64)?;
    for rec in &recs {
        Trec::write_to(writer, rec)?;
    }
    writer.flush()
}

pub fn read_table<R: Read>(reader: &mut R) -> io::Result<AlignmentModel> {
    let source_vocab_size = reader.read_u64::<LittleEndian>()? as usize;
    let target_vocab_size = reader.read_u64::<LittleEndian>()? as usize;
    let num_records = reader.read_u64::<LittleEndian>()?;

    let mut table = LogTable::new();
    for i in 0..num_records {
        let Some(rec) = Trec::read_from(reader)? else {
            return Err(io::Error::new(
                ErrorKind::UnexpectedEof,
                format!("table ends after {i} of {num_records} records"),
            ));
        };
        if rec.source as usize >= source_vocab_size || rec.target as usize >= target_vocab_size {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                format!(
                    "record ({}, {}) outside vocabularies {source_vocab_size}/{target_vocab_size}",
                    rec.source, rec.target
                ),
            ));
        }
        table.set(rec.source, rec.target, rec.log_prob);
    }
    Ok(AlignmentModel::from_parts(
        source_vocab_size,
        target_vocab_size,
        table,
    ))
}

/// One `source target log_prob prob` line per entry.
pub fn write_table_text<W: Write>(writer: &mut W, model: &AlignmentModel) -> io::Result<()> {
    for rec in records(model) {
        writeln!(
            writer,
            "{} {} {} {}",
            rec.source,
            rec.target,
            rec.log_prob,
            rec.log_prob.exp()
        )?;
    }
    writer.flush()
}
