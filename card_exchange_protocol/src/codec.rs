// Versioned JSON envelope on top of `framing.rs`.
//
// Every frame's payload is `{"version": PROTOCOL_VERSION, "body": <message>}`.
// The version is checked before the body is decoded, so a peer speaking a
// different revision fails with `VersionMismatch` instead of a confusing
// decode error.

use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::framing::{read_frame, write_frame};

/// Current wire protocol revision.
pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Serialize)]
struct OutgoingEnvelope<'a, T> {
    version: u32,
    body: &'a T,
}

#[derive(Deserialize)]
struct IncomingEnvelope {
    version: u32,
    body: serde_json::Value,
}

/// Serialize `body` inside an envelope and write it as one frame.
pub fn send<W: Write, T: Serialize>(writer: &mut W, body: &T) -> Result<(), ProtocolError> {
    let json = serde_json::to_vec(&OutgoingEnvelope {
        version: PROTOCOL_VERSION,
        body,
    })?;
    write_frame(writer, &json)?;
    Ok(())
}

/// Read one frame, check its version, and decode the body.
pub fn recv<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T, ProtocolError> {
    let bytes = read_frame(reader)?;
    let envelope: IncomingEnvelope = serde_json::from_slice(&bytes)?;
    if envelope.version != PROTOCOL_VERSION {
        return Err(ProtocolError::VersionMismatch {
            expected: PROTOCOL_VERSION,
            found: envelope.version,
        });
    }
    Ok(serde_json::from_value(envelope.body)?)
}
