//! P2FMS (pay-to-fake-multisig) transport codec
//!
//! Losslessly maps an opaque byte payload onto a sequence of output scripts
//! shaped like standard 1-of-N bare multisig outputs, whose "public keys" are
//! really 33-byte payload chunks.
//!
//! ## Frame layout
//!
//! ```text
//! [8-byte LE original length][32-byte sha256(payload)][payload][zero padding]
//! ```
//!
//! The frame is padded to a multiple of 33 bytes, split into 33-byte chunks,
//! and grouped into scripts of up to 3 chunk-keys each. The self-describing
//! length and hash let the decoder discard padding and detect truncation or
//! corruption without any external framing.

use bitcoin::opcodes::all::{OP_CHECKMULTISIG, OP_PUSHNUM_1};
use bitcoin::opcodes::Opcode;
use bitcoin::script::Builder;
use bitcoin::{Script, ScriptBuf, TxOut};
use byteorder::{ByteOrder, LittleEndian};
use sha2::{Digest, Sha256};

use crate::errors::CodecError;

/// Payload bytes carried per fake public key
pub const FAKE_KEY_SIZE: usize = 33;

/// Maximum chunk-keys per multisig-style output script
pub const MAX_CHUNKS_PER_SCRIPT: usize = 3;

/// Length word plus content hash
pub const FRAME_HEADER_LEN: usize = 8 + 32;

/// Total frame length (header + payload + padding) for a payload of
/// `payload_len` bytes. Used for fee pre-estimation before encoding.
pub fn padded_frame_len(payload_len: usize) -> usize {
    let raw = FRAME_HEADER_LEN + payload_len;
    raw.div_ceil(FAKE_KEY_SIZE) * FAKE_KEY_SIZE
}

/// Encode `payload` into an ordered sequence of fake multisig output scripts.
///
/// The caller embeds the scripts into transaction outputs in the same order,
/// followed by any non-payload (e.g. change) outputs.
pub fn encode(payload: &[u8]) -> Result<Vec<ScriptBuf>, CodecError> {
    if payload.is_empty() {
        return Err(CodecError::EmptyPayload);
    }

    // Frame: length word, content hash, payload, zero padding to a chunk
    // boundary. A frame already on the boundary gets no padding.
    let mut frame = Vec::with_capacity(padded_frame_len(payload.len()));
    let mut len_word = [0u8; 8];
    LittleEndian::write_u64(&mut len_word, payload.len() as u64);
    frame.extend_from_slice(&len_word);
    frame.extend_from_slice(Sha256::digest(payload).as_slice());
    frame.extend_from_slice(payload);
    let padding = (FAKE_KEY_SIZE - frame.len() % FAKE_KEY_SIZE) % FAKE_KEY_SIZE;
    frame.resize(frame.len() + padding, 0);

    let chunks: Vec<&[u8]> = frame.chunks(FAKE_KEY_SIZE).collect();
    let mut scripts = Vec::with_capacity(chunks.len().div_ceil(MAX_CHUNKS_PER_SCRIPT));
    for group in chunks.chunks(MAX_CHUNKS_PER_SCRIPT) {
        let mut builder = Builder::new().push_opcode(OP_PUSHNUM_1);
        for chunk in group {
            let mut key = [0u8; FAKE_KEY_SIZE];
            key.copy_from_slice(chunk);
            builder = builder.push_slice(key);
        }
        let op_n = Opcode::from(OP_PUSHNUM_1.to_u8() + group.len() as u8 - 1);
        scripts.push(
            builder
                .push_opcode(op_n)
                .push_opcode(OP_CHECKMULTISIG)
                .into_script(),
        );
    }

    if scripts.is_empty() {
        return Err(CodecError::NoChunksProduced);
    }
    Ok(scripts)
}

/// Reassemble and verify the payload embedded in `outputs`.
///
/// Every bare multisig output contributes its key bytes in output order;
/// outputs of any other script shape are ignored, not an error.
pub fn decode(outputs: &[TxOut]) -> Result<Vec<u8>, CodecError> {
    let mut assembled = Vec::new();
    let mut found_multisig = false;
    for output in outputs {
        if let Some(chunks) = match_multisig(&output.script_pubkey) {
            found_multisig = true;
            for chunk in chunks {
                assembled.extend_from_slice(&chunk);
            }
        }
    }

    if !found_multisig {
        return Err(CodecError::NoEmbeddedData);
    }
    if assembled.len() < FRAME_HEADER_LEN {
        return Err(CodecError::FrameTooShort {
            found: assembled.len(),
        });
    }

    let declared = LittleEndian::read_u64(&assembled[..8]);
    let stored_hash = &assembled[8..FRAME_HEADER_LEN];
    let body = &assembled[FRAME_HEADER_LEN..];
    if (body.len() as u64) < declared {
        return Err(CodecError::LengthMismatch {
            declared,
            available: body.len(),
        });
    }

    // Truncate to the declared length, dropping reassembly padding
    let payload = &body[..declared as usize];
    if Sha256::digest(payload).as_slice() != stored_hash {
        return Err(CodecError::HashMismatch);
    }
    Ok(payload.to_vec())
}

/// Match a bare M-of-N multisig script and extract its key bytes.
///
/// Pattern: `OP_M <key> ... <key> OP_N OP_CHECKMULTISIG`, where each key is a
/// 33-byte or 65-byte push. Returns the pushed key bytes in script order, or
/// `None` if the script does not match.
pub fn match_multisig(script: &Script) -> Option<Vec<Vec<u8>>> {
    let bytes = script.as_bytes();
    if bytes.len() < 3 {
        return None;
    }
    if !(0x51..=0x60).contains(&bytes[0]) {
        return None;
    }

    let keys_end = bytes.len() - 2;
    let mut chunks = Vec::new();
    let mut pos = 1;
    while pos < keys_end {
        let push_len = match bytes[pos] {
            0x21 => 33,
            0x41 => 65,
            _ => return None,
        };
        if pos + 1 + push_len > keys_end {
            return None;
        }
        chunks.push(bytes[pos + 1..pos + 1 + push_len].to_vec());
        pos += 1 + push_len;
    }

    let op_n = bytes[keys_end];
    if !(0x51..=0x60).contains(&op_n) {
        return None;
    }
    if (op_n - 0x50) as usize != chunks.len() {
        return None;
    }
    if bytes[keys_end + 1] != OP_CHECKMULTISIG.to_u8() {
        return None;
    }
    if chunks.is_empty() {
        return None;
    }
    Some(chunks)
}
