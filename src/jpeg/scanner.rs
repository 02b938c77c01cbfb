use std::io::{self, Read, Write};
use thiserror::Error;

use super::policy::{RuleSet, SegmentRule};

// Markers that carry no length field.
const TEM: u8 = 0x01;
const RST0: u8 = 0xD0;
const RST7: u8 = 0xD7;
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
// Start of Scan; segment framing stops after its payload.
const SOS: u8 = 0xDA;

/// Chunk size for streaming segment payloads and the scan tail.
const COPY_CHUNK: usize = 32 * 1024;

/// Errors produced by [`strip`].
#[derive(Debug, Error)]
pub enum StripError {
    /// The input does not begin with the `FF D8` SOI signature.
    #[error("not a JPEG (missing SOI)")]
    NotJpeg,
    /// The input ended, or is shaped inconsistently with its declared
    /// lengths: a missing marker byte, a length field shorter than itself,
    /// a short payload, or a scan section that does not end in EOI.
    #[error("truncated or malformed JPEG")]
    Truncated,
    /// The output sink refused a write, or the input failed with a
    /// transport error other than end-of-stream.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Copy a JPEG from `input` to `output`, removing the segments matched by
/// `rules` and nothing else.
///
/// The input is read once, front to back, with no seeking; retained bytes
/// are written in their original order and the compressed scan data passes
/// through untouched in bounded chunks, so arbitrarily large images never
/// have to fit in memory. On an error the output may hold a partial prefix
/// of the result; callers that need atomicity must buffer or discard it
/// themselves.
///
/// # Example
///
/// ```rust
/// use exif_cleaner::jpeg::{strip, RuleSet};
///
/// # fn main() -> Result<(), exif_cleaner::jpeg::StripError> {
/// let rules = RuleSet::from_names(["exif", "icc"]).unwrap();
/// let input: &[u8] = &[0xFF, 0xD8, 0xFF, 0xD9]; // smallest accepted JPEG
/// let mut cleaned = Vec::new();
/// strip(input, &mut cleaned, &rules)?;
/// assert_eq!(cleaned, input);
/// # Ok(())
/// # }
/// ```
pub fn strip<R: Read, W: Write>(
    mut input: R,
    mut output: W,
    rules: &RuleSet,
) -> Result<(), StripError> {
    let mut signature = [0u8; 2];
    input.read_exact(&mut signature).map_err(read_err)?;
    if signature != [0xFF, SOI] {
        return Err(StripError::NotJpeg);
    }
    output.write_all(&signature)?;

    loop {
        let marker = read_marker_byte(&mut input)?;
        match marker {
            EOI => {
                output.write_all(&[0xFF, EOI])?;
                return Ok(());
            }
            SOS => {
                // Copy the scan header, then everything after it is raw
                // entropy-coded data with no further segment framing.
                copy_segment(&mut input, &mut output, marker)?;
                return copy_scan_tail(&mut input, &mut output);
            }
            m if is_standalone_marker(m) => {
                output.write_all(&[0xFF, m])?;
            }
            m => match rules.rule_for(m) {
                None => copy_segment(&mut input, &mut output, m)?,
                Some(SegmentRule::Always) => discard_segment(&mut input)?,
                Some(rule) => inspect_segment(&mut input, &mut output, m, rule)?,
            },
        }
    }
}

/// Read the next marker value: scan forward to an `FF`, step past any run
/// of `FF` fill bytes, and return the first byte that differs.
fn read_marker_byte<R: Read>(input: &mut R) -> Result<u8, StripError> {
    let mut byte = [0u8; 1];
    loop {
        input.read_exact(&mut byte).map_err(read_err)?;
        if byte[0] == 0xFF {
            break;
        }
    }
    loop {
        input.read_exact(&mut byte).map_err(read_err)?;
        if byte[0] != 0xFF {
            return Ok(byte[0]);
        }
    }
}

/// Markers that are bare two-byte codes with no length field.
fn is_standalone_marker(marker: u8) -> bool {
    matches!(marker, SOI | TEM | RST0..=RST7)
}

/// Read and validate a segment's 2-byte big-endian length field.
///
/// Returns the payload length and the raw field bytes. The field counts
/// its own two bytes, so a declared value below 2 cannot be satisfied.
fn read_segment_length<R: Read>(input: &mut R) -> Result<(u64, [u8; 2]), StripError> {
    let mut len_bytes = [0u8; 2];
    input.read_exact(&mut len_bytes).map_err(read_err)?;
    let declared = u16::from_be_bytes(len_bytes);
    if declared < 2 {
        return Err(StripError::Truncated);
    }
    Ok((u64::from(declared) - 2, len_bytes))
}

/// Copy a length-carrying segment verbatim: marker, length field, payload.
fn copy_segment<R: Read, W: Write>(
    input: &mut R,
    output: &mut W,
    marker: u8,
) -> Result<(), StripError> {
    output.write_all(&[0xFF, marker])?;
    let (payload_len, len_bytes) = read_segment_length(input)?;
    output.write_all(&len_bytes)?;
    copy_exact(input, output, payload_len)
}

/// Consume a length-carrying segment without writing anything.
fn discard_segment<R: Read>(input: &mut R) -> Result<(), StripError> {
    let (payload_len, _) = read_segment_length(input)?;
    skip_exact(input, payload_len)
}

/// Peek the start of a segment's payload and decide whether to drop it.
///
/// If a rule signature matches, the rest of the payload is discarded and
/// nothing is written. Otherwise the segment is reconstructed from the
/// peeked bytes and the remaining payload, byte-identical to what an
/// unconditional copy would have produced.
fn inspect_segment<R: Read, W: Write>(
    input: &mut R,
    output: &mut W,
    marker: u8,
    rule: &SegmentRule,
) -> Result<(), StripError> {
    let (payload_len, len_bytes) = read_segment_length(input)?;

    let peek_len = payload_len.min(rule.max_prefix_len() as u64) as usize;
    let mut peeked = vec![0u8; peek_len];
    input.read_exact(&mut peeked).map_err(read_err)?;

    if rule.matches(&peeked) {
        log::debug!("dropping segment 0xFF{marker:02X} ({payload_len} payload bytes)");
        return skip_exact(input, payload_len - peek_len as u64);
    }

    output.write_all(&[0xFF, marker])?;
    output.write_all(&len_bytes)?;
    output.write_all(&peeked)?;
    copy_exact(input, output, payload_len - peek_len as u64)
}

/// Stream the entropy-coded data after the SOS header to the output,
/// tracking the last two bytes seen in a sliding window. The scan is only
/// well-terminated if those final bytes are the literal EOI sequence.
fn copy_scan_tail<R: Read, W: Write>(input: &mut R, output: &mut W) -> Result<(), StripError> {
    let mut last = [0u8; 2];
    let mut buf = [0u8; COPY_CHUNK];
    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(StripError::Io(e)),
        };
        if n == 1 {
            last = [last[1], buf[0]];
        } else {
            last = [buf[n - 2], buf[n - 1]];
        }
        output.write_all(&buf[..n])?;
    }

    if last == [0xFF, EOI] {
        Ok(())
    } else {
        Err(StripError::Truncated)
    }
}

/// Copy exactly `remaining` bytes from `input` to `output` in bounded
/// chunks; running out of input is a truncation.
fn copy_exact<R: Read, W: Write>(
    input: &mut R,
    output: &mut W,
    mut remaining: u64,
) -> Result<(), StripError> {
    let mut buf = [0u8; COPY_CHUNK];
    while remaining > 0 {
        let want = remaining.min(COPY_CHUNK as u64) as usize;
        let n = match input.read(&mut buf[..want]) {
            Ok(0) => return Err(StripError::Truncated),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(StripError::Io(e)),
        };
        output.write_all(&buf[..n])?;
        remaining -= n as u64;
    }
    Ok(())
}

/// Consume exactly `remaining` bytes from `input`; running out is a
/// truncation.
fn skip_exact<R: Read>(input: &mut R, mut remaining: u64) -> Result<(), StripError> {
    let mut buf = [0u8; COPY_CHUNK];
    while remaining > 0 {
        let want = remaining.min(COPY_CHUNK as u64) as usize;
        let n = match input.read(&mut buf[..want]) {
            Ok(0) => return Err(StripError::Truncated),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(StripError::Io(e)),
        };
        remaining -= n as u64;
    }
    Ok(())
}

/// Classify a failed read: end-of-stream means the input is shorter than
/// its framing promised; anything else is a transport failure.
fn read_err(err: io::Error) -> StripError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        StripError::Truncated
    } else {
        StripError::Io(err)
    }
}
