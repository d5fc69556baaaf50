//! Scans one chunk into a local table.
//!
//! A chunk owns exactly the lines whose first byte lies inside its nominal
//! range. The scanner reads one byte before the range so that a line starting
//! right at `offset` is recognised, drops everything up to the first newline
//! (that head belongs to the previous chunk), and reads forward past the
//! nominal end until the last line it owns is complete.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::aggregate::LocalTable;
use crate::config::LinePolicy;
use crate::error::{BrcError, LineError, Result};
use crate::parse::parse_value;
use crate::partition::Chunk;
use crate::source::ChunkSource;

const SEPARATOR: u8 = b';';

/// Bytes read per step when finishing a line that runs past the chunk end.
const TAIL_PROBE: usize = 256;

/// Lines between checks of the cancellation flag.
const CANCEL_CHECK_INTERVAL: u64 = 1 << 14;

/// Malformed lines logged individually per chunk in lenient mode.
const MAX_LOGGED_SKIPS: u64 = 8;

#[derive(Debug, Default)]
pub struct ChunkScan {
    pub table: LocalTable,
    pub lines: u64,
    pub skipped: u64,
}

pub fn scan_chunk<S>(source: &S, chunk: Chunk, policy: LinePolicy, cancel: &AtomicBool) -> Result<ChunkScan>
where
    S: ChunkSource + ?Sized,
{
    let (buf, base) = read_owned_lines(source, chunk)?;
    let mut scan = ChunkScan::default();

    let mut pos = 0;
    while pos < buf.len() {
        let end = buf[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(buf.len(), |i| pos + i);
        let line = strip_cr(&buf[pos..end]);
        let line_offset = base + pos as u64;
        pos = end + 1;

        if line.is_empty() {
            continue;
        }
        if scan.lines % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
            return Err(BrcError::Cancelled { chunk: chunk.index });
        }
        scan.lines += 1;

        match split_line(line) {
            Ok((key, value)) => scan.table.observe(key, value),
            Err(reason) => match policy {
                LinePolicy::Strict => {
                    return Err(BrcError::MalformedLine { chunk: chunk.index, offset: line_offset, reason });
                }
                LinePolicy::Lenient => {
                    scan.skipped += 1;
                    if scan.skipped <= MAX_LOGGED_SKIPS {
                        warn!(chunk = chunk.index, offset = line_offset, %reason, "skipping malformed line");
                    }
                }
            },
        }
    }

    if scan.skipped > MAX_LOGGED_SKIPS {
        warn!(chunk = chunk.index, skipped = scan.skipped, "skipped malformed lines");
    }
    debug!(
        chunk = chunk.index,
        offset = chunk.offset,
        size = chunk.size,
        lines = scan.lines,
        keys = scan.table.len(),
        "chunk scanned"
    );
    Ok(scan)
}

/// Reads the bytes of every line owned by `chunk`. Returns the buffer and the
/// absolute file offset of its first byte.
fn read_owned_lines<S>(source: &S, chunk: Chunk) -> Result<(Vec<u8>, u64)>
where
    S: ChunkSource + ?Sized,
{
    let file_len = source.len();
    let read_start = chunk.offset.saturating_sub(1);
    let nominal_end = chunk.end().min(file_len);
    if read_start >= nominal_end {
        return Ok((Vec::new(), nominal_end));
    }

    let mut buf = vec![0u8; (nominal_end - read_start) as usize];
    read_at(source, chunk, &mut buf, read_start)?;

    let start = if chunk.offset == 0 {
        0
    } else {
        match buf.iter().position(|&b| b == b'\n') {
            Some(i) => i + 1,
            // No line starts inside this chunk.
            None => return Ok((Vec::new(), nominal_end)),
        }
    };
    if start == buf.len() {
        return Ok((Vec::new(), nominal_end));
    }

    let mut pos = nominal_end;
    while buf.last() != Some(&b'\n') && pos < file_len {
        let probe_len = TAIL_PROBE.min((file_len - pos) as usize);
        let mut probe = vec![0u8; probe_len];
        read_at(source, chunk, &mut probe, pos)?;
        match probe.iter().position(|&b| b == b'\n') {
            Some(i) => buf.extend_from_slice(&probe[..=i]),
            None => buf.extend_from_slice(&probe),
        }
        pos += probe_len as u64;
    }

    buf.drain(..start);
    Ok((buf, read_start + start as u64))
}

#[inline]
fn read_at<S>(source: &S, chunk: Chunk, buf: &mut [u8], offset: u64) -> Result<()>
where
    S: ChunkSource + ?Sized,
{
    let len = buf.len();
    source
        .read_exact_at(buf, offset)
        .map_err(|source| BrcError::ChunkRead { chunk: chunk.index, offset, len, source })
}

#[inline]
fn strip_cr(line: &[u8]) -> &[u8] {
    match line.split_last() {
        Some((b'\r', rest)) => rest,
        _ => line,
    }
}

/// Splits a line at its first separator and parses both halves.
#[inline]
pub fn split_line(line: &[u8]) -> std::result::Result<(&str, f64), LineError> {
    let sep = line
        .iter()
        .position(|&b| b == SEPARATOR)
        .ok_or(LineError::MissingSeparator)?;
    let (key, value) = (&line[..sep], &line[sep + 1..]);
    if key.is_empty() {
        return Err(LineError::EmptyKey);
    }
    let key = std::str::from_utf8(key).map_err(|_| LineError::InvalidKey)?;
    let value = parse_value(value)?;
    Ok((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregate;
    use crate::parse::ParseError;
    use crate::partition::partition;
    use std::io;

    fn scan(data: &[u8], chunk: Chunk) -> Result<ChunkScan> {
        scan_chunk(data, chunk, LinePolicy::Strict, &AtomicBool::new(false))
    }

    fn whole(data: &[u8]) -> Chunk {
        Chunk { index: 0, offset: 0, size: data.len() as u64 }
    }

    #[test]
    fn scans_whole_buffer() {
        let data = b"Hamburg;12.0\nHamburg;8.5\nBerlin;-1.0\nHamburg;15.2\n";
        let scan = scan(data, whole(data)).unwrap();
        assert_eq!(scan.lines, 4);
        assert_eq!(scan.table.len(), 2);
        assert_eq!(scan.table.get("Berlin"), Some(&Aggregate::new(-1.0)));
        let hamburg = scan.table.get("Hamburg").unwrap();
        assert_eq!((hamburg.min, hamburg.max, hamburg.count), (8.5, 15.2, 3));
    }

    #[test]
    fn last_line_without_newline_counts() {
        let data = b"A;1.0\nB;2.0";
        let scan = scan(data, whole(data)).unwrap();
        assert_eq!(scan.lines, 2);
        assert_eq!(scan.table.get("B"), Some(&Aggregate::new(2.0)));
    }

    #[test]
    fn blank_lines_and_crlf() {
        let data = b"\nA;1.0\r\n\r\nA;3.0\n\n";
        let scan = scan(data, whole(data)).unwrap();
        assert_eq!(scan.lines, 2);
        assert_eq!(scan.table.get("A").unwrap().sum, 4.0);
    }

    #[test]
    fn line_starting_at_chunk_offset_belongs_to_that_chunk() {
        let data = b"A;1.0\nB;2.0\n";
        let first = scan(data, Chunk { index: 0, offset: 0, size: 6 }).unwrap();
        let second = scan(data, Chunk { index: 1, offset: 6, size: 6 }).unwrap();
        assert_eq!(first.table.get("A"), Some(&Aggregate::new(1.0)));
        assert!(first.table.get("B").is_none());
        assert_eq!(second.table.get("B"), Some(&Aggregate::new(2.0)));
        assert!(second.table.get("A").is_none());
    }

    #[test]
    fn straddling_line_is_completed_by_its_owner() {
        let data = b"Alpha;1.0\nBravo;2.0\n";
        let first = scan(data, Chunk { index: 0, offset: 0, size: 13 }).unwrap();
        let second = scan(data, Chunk { index: 1, offset: 13, size: 7 }).unwrap();
        assert_eq!(first.lines, 2);
        assert_eq!(second.lines, 0);
        assert_eq!(first.table.get("Bravo"), Some(&Aggregate::new(2.0)));
    }

    #[test]
    fn line_longer_than_tail_probe_and_next_chunk() {
        let key = "K".repeat(TAIL_PROBE * 3);
        let data = format!("A;1.0\n{key};4.5\nB;2.0\n");
        let data = data.as_bytes();
        let chunks = partition(data.len() as u64, 16, 4);
        let mut total = LocalTable::new();
        for c in chunks {
            for (k, a) in scan(data, c).unwrap().table {
                total.absorb(k, a);
            }
        }
        assert_eq!(total.len(), 3);
        assert_eq!(total.observations(), 3);
        assert_eq!(total.get(key.as_str()), Some(&Aggregate::new(4.5)));
    }

    #[test]
    fn every_seam_position_counts_each_line_once() {
        let data = b"Hamburg;12.0\nHamburg;8.5\nBerlin;-1.0\nHamburg;15.2\nOslo;0.0";
        let expected = scan(data, whole(data)).unwrap().table;
        for seam in 1..data.len() as u64 {
            let left = scan(data, Chunk { index: 0, offset: 0, size: seam }).unwrap();
            let right = scan(data, Chunk { index: 1, offset: seam, size: data.len() as u64 - seam }).unwrap();
            let mut merged = left.table;
            for (k, a) in right.table {
                merged.absorb(k, a);
            }
            assert_eq!(merged.observations(), 5, "seam at {seam}");
            assert_eq!(merged.len(), expected.len(), "seam at {seam}");
            for (k, a) in expected.iter() {
                let m = merged.get(k).unwrap();
                assert_eq!((m.min, m.max, m.count), (a.min, a.max, a.count), "seam at {seam}");
            }
        }
    }

    #[test]
    fn strict_policy_reports_offset_of_bad_line() {
        let data = b"A;1.0\nnoseparator\nB;2.0\n";
        let err = scan(data, whole(data)).unwrap_err();
        match err {
            BrcError::MalformedLine { chunk, offset, reason } => {
                assert_eq!(chunk, 0);
                assert_eq!(offset, 6);
                assert_eq!(reason, LineError::MissingSeparator);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn lenient_policy_skips_and_counts() {
        let data = b"A;1.0\n;2.0\nA;abc\nA;3.0\n";
        let scan = scan_chunk(&data[..], whole(data), LinePolicy::Lenient, &AtomicBool::new(false)).unwrap();
        assert_eq!(scan.lines, 4);
        assert_eq!(scan.skipped, 2);
        assert_eq!(scan.table.get("A").unwrap().count, 2);
    }

    #[test]
    fn split_line_errors() {
        assert_eq!(split_line(b"nosep"), Err(LineError::MissingSeparator));
        assert_eq!(split_line(b";1.0"), Err(LineError::EmptyKey));
        assert_eq!(split_line(b"\xff\xfe;1.0"), Err(LineError::InvalidKey));
        assert_eq!(split_line(b"A;"), Err(LineError::Value(ParseError::Empty)));
        let (key, value) = split_line(b"St. John's;-3.2").unwrap();
        assert_eq!(key, "St. John's");
        assert!((value + 3.2).abs() < 1e-9);
    }

    #[test]
    fn cancelled_scan_stops() {
        let data = b"A;1.0\n";
        let err = scan_chunk(&data[..], whole(data), LinePolicy::Strict, &AtomicBool::new(true)).unwrap_err();
        assert!(matches!(err, BrcError::Cancelled { chunk: 0 }));
    }

    struct Failing;

    impl ChunkSource for Failing {
        fn len(&self) -> u64 {
            64
        }

        fn read_exact_at(&self, _buf: &mut [u8], _offset: u64) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }
    }

    #[test]
    fn read_failure_is_an_error_not_an_empty_table() {
        let err = scan_chunk(&Failing, Chunk { index: 3, offset: 32, size: 32 }, LinePolicy::Lenient, &AtomicBool::new(false))
            .unwrap_err();
        match err {
            BrcError::ChunkRead { chunk, offset, len, .. } => {
                assert_eq!((chunk, offset, len), (3, 31, 33));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
