//! Fixed-size command frame
//!
//! Layout (packed, little-endian):
//!
//! ```text
//! | command | pic | checksum | uid  | options | data  |
//! |   1 B   | 1 B |   2 B    | 25 B |   4 B   | 512 B |
//! ```
//!
//! The checksum is the byte sum of the whole frame serialized with a zero
//! checksum field, modulo `0xFFFF`.

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::command::Command;
use crate::error::{PacketError, Result};

/// Payload size of every frame
pub const DATA_SIZE: usize = 512;
/// Identifier length without the null terminator
pub const UID_LEN: usize = 24;
/// On-wire uid field (identifier + null terminator)
pub const UID_FIELD_SIZE: usize = UID_LEN + 1;
/// Total frame size
pub const FRAME_SIZE: usize = 1 + 1 + 2 + UID_FIELD_SIZE + 4 + DATA_SIZE;
/// Fill byte used when a command carries no payload
pub const DATA_SENTINEL: u8 = 0x07;

const CHECKSUM_MODULUS: u32 = 0xFFFF;

/// Default uid when no target is given
pub fn default_uid() -> String {
    "0".repeat(UID_LEN)
}

/// Decoded or built frame
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    code: u8,
    pic: u8,
    checksum: u16,
    uid: String,
    uid_field: [u8; UID_FIELD_SIZE],
    options: u32,
    data: [u8; DATA_SIZE],
}

impl Packet {
    /// Start building a frame for `command`
    pub fn builder(command: Command) -> PacketBuilder {
        PacketBuilder::new(command)
    }

    /// Decode a frame. The carried checksum is kept as received.
    pub fn from_bytes(blob: &[u8]) -> Result<Self> {
        if blob.len() != FRAME_SIZE {
            return Err(PacketError::Format {
                actual: blob.len(),
                expected: FRAME_SIZE,
            });
        }

        let mut buf = blob;
        let code = buf.get_u8();
        let pic = buf.get_u8();
        let checksum = buf.get_u16_le();

        let mut uid_field = [0u8; UID_FIELD_SIZE];
        buf.copy_to_slice(&mut uid_field);
        let uid_end = uid_field
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |pos| pos + 1);
        let uid = String::from_utf8_lossy(&uid_field[..uid_end]).into_owned();

        let options = buf.get_u32_le();
        let mut data = [0u8; DATA_SIZE];
        buf.copy_to_slice(&mut data);

        trace!(
            command = command_label(code),
            pic,
            checksum,
            options,
            "Decoded frame"
        );

        Ok(Self {
            code,
            pic,
            checksum,
            uid,
            uid_field,
            options,
            data,
        })
    }

    /// Serialize the frame with its stored checksum
    pub fn to_bytes(&self) -> Bytes {
        serialize(
            self.code,
            self.pic,
            self.checksum,
            &self.uid_field,
            self.options,
            &self.data,
        )
        .freeze()
    }

    /// Recompute the checksum from the fields
    pub fn compute_checksum(&self) -> u16 {
        let zeroed = serialize(
            self.code,
            self.pic,
            0,
            &self.uid_field,
            self.options,
            &self.data,
        );
        checksum_of(&zeroed)
    }

    /// Whether the carried checksum matches the fields
    pub fn verify_checksum(&self) -> bool {
        self.compute_checksum() == self.checksum
    }

    /// Raw command code as carried on the wire
    #[inline]
    pub fn code(&self) -> u8 {
        self.code
    }

    #[inline]
    pub fn command(&self) -> Command {
        Command::from_code(self.code)
    }

    #[inline]
    pub fn pic(&self) -> u8 {
        self.pic
    }

    #[inline]
    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    #[inline]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    #[inline]
    pub fn options(&self) -> u32 {
        self.options
    }

    #[inline]
    pub fn data(&self) -> &[u8; DATA_SIZE] {
        &self.data
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("command", &command_label(self.code))
            .field("pic", &self.pic)
            .field("checksum", &format_args!("0x{:04X}", self.checksum))
            .field("uid", &self.uid)
            .field("options", &self.options)
            .field("data_len", &self.data.len())
            .finish()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] 0x{:04X} P{} {}",
            command_label(self.code),
            self.options,
            self.checksum,
            self.pic,
            self.uid
        )
    }
}

impl TryFrom<&[u8]> for Packet {
    type Error = PacketError;

    fn try_from(blob: &[u8]) -> Result<Self> {
        Packet::from_bytes(blob)
    }
}

/// Fluent frame builder. Unset fields take the protocol defaults.
#[derive(Debug, Clone)]
pub struct PacketBuilder {
    command: Command,
    pic: u8,
    uid: Option<String>,
    options: u32,
    data: Option<[u8; DATA_SIZE]>,
}

impl PacketBuilder {
    fn new(command: Command) -> Self {
        Self {
            command,
            pic: 0,
            uid: None,
            options: 0,
            data: None,
        }
    }

    pub fn pic(mut self, pic: u8) -> Self {
        self.pic = pic;
        self
    }

    /// Target uid. Identifiers longer than [`UID_LEN`] bytes are truncated.
    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn options(mut self, options: u32) -> Self {
        self.options = options;
        self
    }

    pub fn data(mut self, data: [u8; DATA_SIZE]) -> Self {
        self.data = Some(data);
        self
    }

    /// Build the frame and compute its checksum
    pub fn build(self) -> Packet {
        let uid = truncate_uid(self.uid.unwrap_or_else(default_uid));
        let mut uid_field = [0u8; UID_FIELD_SIZE];
        uid_field[..uid.len()].copy_from_slice(uid.as_bytes());

        let data = self.data.unwrap_or([DATA_SENTINEL; DATA_SIZE]);
        let code = self.command.code();

        let zeroed = serialize(code, self.pic, 0, &uid_field, self.options, &data);
        let checksum = checksum_of(&zeroed);

        Packet {
            code,
            pic: self.pic,
            checksum,
            uid,
            uid_field,
            options: self.options,
            data,
        }
    }
}

fn serialize(
    code: u8,
    pic: u8,
    checksum: u16,
    uid_field: &[u8; UID_FIELD_SIZE],
    options: u32,
    data: &[u8; DATA_SIZE],
) -> BytesMut {
    let mut buf = BytesMut::with_capacity(FRAME_SIZE);
    buf.put_u8(code);
    buf.put_u8(pic);
    buf.put_u16_le(checksum);
    buf.put_slice(uid_field);

    buf.put_u32_le(options);
    buf.put_slice(data);
    buf
}

fn checksum_of(frame: &[u8]) -> u16 {
    let sum: u32 = frame.iter().map(|&b| u32::from(b)).sum();
    (sum % CHECKSUM_MODULUS) as u16
}

fn truncate_uid(mut uid: String) -> String {
    if uid.len() > UID_LEN {
        let mut end = UID_LEN;
        while !uid.is_char_boundary(end) {
            end -= 1;
        }
        uid.truncate(end);
    }
    uid
}

fn command_label(code: u8) -> &'static str {
    Command::from_code(code).name()
}
