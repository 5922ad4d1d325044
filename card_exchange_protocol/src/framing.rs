// Length-delimited message framing over TCP.
//
// Wire format: a 4-byte big-endian length prefix followed by that many payload
// bytes. `write_frame` and `read_frame` move raw bytes only; the JSON envelope
// lives in `codec.rs`, which keeps this layer format-agnostic.
//
// `MAX_FRAME_SIZE` (16 MiB) bounds the allocation a malformed or hostile
// length prefix can trigger. The largest legitimate frame is a pile snapshot:
// four decks of cards serialize to well under 20 KB.

use std::io::{self, Read, Write};

/// Maximum allowed frame size (16 MiB).
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Write one frame (length prefix, then payload) and flush.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let len = payload.len();
    if len > MAX_FRAME_SIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame too large: {len} bytes (max {MAX_FRAME_SIZE})"),
        ));
    }
    #[expect(clippy::cast_possible_truncation)]
    let len_bytes = (len as u32).to_be_bytes();
    writer.write_all(&len_bytes)?;
    writer.write_all(payload)?;
    writer.flush()
}

/// Read one frame.
///
/// `UnexpectedEof` means the peer closed the stream before or during a frame;
/// `InvalidData` means the length prefix exceeds `MAX_FRAME_SIZE`.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {len} bytes (max {MAX_FRAME_SIZE})"),
        ));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}
