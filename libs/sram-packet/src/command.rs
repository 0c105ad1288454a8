//! Protocol command codes

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PacketError;

/// Command carried in the first byte of every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum Command {
    Ack = 1,
    Ping = 2,
    Read = 3,
    Write = 4,
    Sensors = 5,
    Exec = 6,
    Err = 255,
}

impl Command {
    /// Map a wire code to a command. Unknown codes map to [`Command::Err`].
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Command::Ack,
            2 => Command::Ping,
            3 => Command::Read,
            4 => Command::Write,
            5 => Command::Sensors,
            6 => Command::Exec,
            _ => Command::Err,
        }
    }

    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::Ack => "ACK",
            Command::Ping => "PING",
            Command::Read => "READ",
            Command::Write => "WRITE",
            Command::Sensors => "SENSORS",
            Command::Exec => "EXEC",
            Command::Err => "ERR",
        }
    }
}

/// Name of a raw command code, `ERR` for anything unknown
pub fn command_name(code: u8) -> &'static str {
    Command::from_code(code).name()
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = PacketError;

    fn from_str(s: &str) -> Result<Self, <Self as FromStr>::Err> {
        match s {
            "ACK" => Ok(Command::Ack),
            "PING" => Ok(Command::Ping),
            "READ" => Ok(Command::Read),
            "WRITE" => Ok(Command::Write),
            "SENSORS" => Ok(Command::Sensors),
            "EXEC" => Ok(Command::Exec),
            "ERR" => Ok(Command::Err),
            other => Err(PacketError::UnknownCommand(other.to_string())),
        }
    }
}

impl From<u8> for Command {
    fn from(code: u8) -> Self {
        Command::from_code(code)
    }
}
