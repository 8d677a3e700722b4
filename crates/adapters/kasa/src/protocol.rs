//! Kasa local protocol — cipher, framing and message shapes.
//!
//! Every byte is XORed with the previous *cipher* byte, starting from a
//! fixed key of 171. TCP messages carry a 4-byte big-endian length prefix in
//! front of the ciphertext; UDP datagrams do not.

use serde::Deserialize;

use crate::error::KasaError;

const INITIAL_KEY: u8 = 171;

/// Largest response accepted over TCP. Sysinfo answers are a few hundred
/// bytes.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Request for the device description, including alias and relay state.
pub const GET_SYSINFO: &str = r#"{"system":{"get_sysinfo":{}}}"#;

#[must_use]
pub fn encrypt(plain: &[u8]) -> Vec<u8> {
    let mut key = INITIAL_KEY;
    plain
        .iter()
        .map(|byte| {
            key ^= byte;
            key
        })
        .collect()
}

#[must_use]
pub fn decrypt(cipher: &[u8]) -> Vec<u8> {
    let mut key = INITIAL_KEY;
    cipher
        .iter()
        .map(|&byte| {
            let plain = key ^ byte;
            key = byte;
            plain
        })
        .collect()
}

/// Encrypt and length-prefix a request for the TCP transport.
///
/// # Errors
///
/// Returns [`KasaError::FrameTooLarge`] for payloads over [`MAX_FRAME_LEN`].
pub fn frame(payload: &[u8]) -> Result<Vec<u8>, KasaError> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(KasaError::FrameTooLarge(payload.len()));
    }
    let len = u32::try_from(payload.len()).map_err(|_| KasaError::FrameTooLarge(payload.len()))?;
    let mut out = Vec::with_capacity(4 + payload.len());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend(encrypt(payload));
    Ok(out)
}

/// Validate a frame length prefix.
///
/// # Errors
///
/// Returns [`KasaError::FrameTooLarge`] when the announced length exceeds
/// [`MAX_FRAME_LEN`].
pub fn frame_len(prefix: [u8; 4]) -> Result<usize, KasaError> {
    let len = u32::from_be_bytes(prefix);
    let len = usize::try_from(len).unwrap_or(usize::MAX);
    if len > MAX_FRAME_LEN {
        return Err(KasaError::FrameTooLarge(len));
    }
    Ok(len)
}

/// Request switching the relay.
#[must_use]
pub fn set_relay_state(on: bool) -> String {
    serde_json::json!({ "system": { "set_relay_state": { "state": u8::from(on) } } }).to_string()
}

/// The part of `get_sysinfo` the controller cares about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SysInfo {
    pub alias: String,
    /// `1` when energised. Absent on multi-outlet strips.
    #[serde(default)]
    pub relay_state: Option<u8>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    err_code: i64,
    #[serde(default)]
    err_msg: Option<String>,
}

impl SysInfo {
    #[must_use]
    pub fn is_on(&self) -> Option<bool> {
        self.relay_state.map(|state| state == 1)
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    system: T,
}

#[derive(Deserialize)]
struct GetSysinfo {
    get_sysinfo: SysInfo,
}

#[derive(Deserialize)]
struct SetRelayState {
    set_relay_state: Status,
}

#[derive(Deserialize)]
struct Status {
    #[serde(default)]
    err_code: i64,
    #[serde(default)]
    err_msg: Option<String>,
}

fn check(code: i64, message: Option<String>) -> Result<(), KasaError> {
    if code == 0 {
        Ok(())
    } else {
        Err(KasaError::Device {
            code,
            message: message.unwrap_or_default(),
        })
    }
}

/// Parse a decrypted `get_sysinfo` response.
///
/// # Errors
///
/// Returns [`KasaError::Json`] on unexpected shapes and
/// [`KasaError::Device`] when the plug reported an error.
pub fn parse_sysinfo(plain: &[u8]) -> Result<SysInfo, KasaError> {
    let envelope: Envelope<GetSysinfo> = serde_json::from_slice(plain)?;
    let info = envelope.system.get_sysinfo;
    check(info.err_code, info.err_msg.clone())?;
    Ok(info)
}

/// Parse a decrypted `set_relay_state` response.
///
/// # Errors
///
/// Same as [`parse_sysinfo`].
pub fn parse_set_relay_state(plain: &[u8]) -> Result<(), KasaError> {
    let envelope: Envelope<SetRelayState> = serde_json::from_slice(plain)?;
    let status = envelope.system.set_relay_state;
    check(status.err_code, status.err_msg)
}
