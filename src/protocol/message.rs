//! Request and response messages
//!
//! Field names follow the peer's wire format (`ID`, `ActionID`, ...). Byte
//! fields are base64 strings. Response fields holding their zero value are
//! omitted from the encoded line.

use crate::storage::CacheEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Command named in a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Command {
    Put,
    Get,
    Close,
    /// Anything else, kept verbatim for the error response
    Unknown(String),
}

impl Command {
    /// Commands advertised in the startup line
    pub const KNOWN: [Command; 3] = [Command::Put, Command::Get, Command::Close];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Put => "put",
            Self::Get => "get",
            Self::Close => "close",
            Self::Unknown(name) => name,
        }
    }
}

impl Default for Command {
    fn default() -> Self {
        Self::Unknown(String::new())
    }
}

impl From<String> for Command {
    fn from(name: String) -> Self {
        match name.as_str() {
            "put" => Self::Put,
            "get" => Self::Get,
            "close" => Self::Close,
            _ => Self::Unknown(name),
        }
    }
}

impl From<Command> for String {
    fn from(command: Command) -> Self {
        match command {
            Command::Unknown(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single request line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(rename = "ID")]
    pub id: i64,

    #[serde(rename = "Command", default)]
    pub command: Command,

    #[serde(
        rename = "ActionID",
        with = "crate::b64",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub action_id: Vec<u8>,

    #[serde(
        rename = "OutputID",
        with = "crate::b64",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub output_id: Vec<u8>,

    /// Declared length of the put body that follows the request line
    #[serde(rename = "BodySize", default, skip_serializing_if = "is_default")]
    pub body_size: i64,

    /// Deprecated alias some peers still send; accepted and ignored
    #[serde(
        rename = "ObjectID",
        with = "crate::b64",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub object_id: Vec<u8>,
}

/// A single response line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "ID", default, skip_serializing_if = "is_default")]
    pub id: i64,

    #[serde(rename = "Err", default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,

    #[serde(rename = "KnownCommands", default, skip_serializing_if = "Vec::is_empty")]
    pub known_commands: Vec<Command>,

    #[serde(rename = "Miss", default, skip_serializing_if = "is_default")]
    pub miss: bool,

    #[serde(
        rename = "OutputID",
        with = "crate::b64",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub output_id: Vec<u8>,

    #[serde(rename = "Size", default, skip_serializing_if = "is_default")]
    pub size: u64,

    #[serde(rename = "Time", default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,

    #[serde(rename = "DiskPath", default, skip_serializing_if = "String::is_empty")]
    pub disk_path: String,
}

impl Response {
    /// Startup line listing supported commands; carries no ID
    pub fn capabilities() -> Self {
        Self {
            known_commands: Command::KNOWN.to_vec(),
            ..Self::default()
        }
    }

    /// Empty success response (close)
    pub fn ack(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn error(id: i64, message: impl Into<String>) -> Self {
        Self {
            id,
            err: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn miss(id: i64) -> Self {
        Self {
            id,
            miss: true,
            ..Self::default()
        }
    }

    pub fn hit(id: i64, entry: &CacheEntry) -> Self {
        Self {
            id,
            output_id: entry.output_id.clone(),
            size: entry.size,
            time: Some(entry.time),
            disk_path: path_string(&entry.disk_path),
            ..Self::default()
        }
    }

    /// Successful put, reporting where the payload landed
    pub fn stored(id: i64, disk_path: &Path) -> Self {
        Self {
            id,
            disk_path: path_string(disk_path),
            ..Self::default()
        }
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}
