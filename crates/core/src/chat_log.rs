//! Reading and writing chat logs.
//!
//! A chat log is a pretty-printed JSON array with one object per message:
//!
//! ```json
//! [
//!     {
//!         "role": "assistant",
//!         "content": "Hello! How can I help you today?",
//!         "timestamp": "2024-05-01T09:00:00.123456"
//!     }
//! ]
//! ```
//!
//! Non-ASCII text is written as-is. Saving is always an explicit action; the
//! session never writes a log on its own.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::error::Error;
use crate::timestamp;
use crate::transcript::{Message, Role, Transcript};

const INDENT: &[u8] = b"    ";

/// A chat log rendered in memory, ready to be offered as a download.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogExport {
    /// Suggested file name, see [`derive_filename`].
    pub filename: String,
    /// The UTF-8 JSON document.
    pub bytes: Vec<u8>,
}

#[derive(Serialize)]
struct Record<'a> {
    role: &'static str,
    content: &'a str,
    timestamp: String,
}

/// Returns the file name a chat log is saved under.
///
/// The topic is used verbatim. It is not escaped, so a topic containing a
/// path separator does not name a plain file in the target directory.
#[inline]
pub fn derive_filename(topic: &str, date: NaiveDate) -> String {
    format!("{}_{topic}_chat_log.json", date.format("%Y%m%d"))
}

/// Renders the transcript as a chat log document.
pub fn to_document(transcript: &Transcript) -> Vec<u8> {
    let records: Vec<_> = transcript
        .messages()
        .iter()
        .map(|msg| Record {
            role: msg.role().as_str(),
            content: msg.content(),
            timestamp: timestamp::to_iso(&msg.timestamp()),
        })
        .collect();

    let mut bytes = Vec::new();
    let formatter = PrettyFormatter::with_indent(INDENT);
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut bytes, formatter);
    records
        .serialize(&mut serializer)
        .expect("serializing plain records into memory cannot fail");
    bytes
}

/// Renders the transcript for download, named after its topic and `date`.
pub fn export_bytes(transcript: &Transcript, date: NaiveDate) -> LogExport {
    LogExport {
        filename: derive_filename(&transcript.topic(), date),
        bytes: to_document(transcript),
    }
}

/// Writes the transcript into `directory`, creating it if needed.
///
/// The file is named by [`derive_filename`] from the transcript's topic and
/// `date`, and replaces any log of the same name. The document is written to
/// a temporary file next to it first, so an interrupted save never leaves a
/// truncated log behind.
///
/// Returns the path of the written file.
pub fn save(
    transcript: &Transcript,
    directory: &Path,
    date: NaiveDate,
) -> Result<PathBuf, Error> {
    let path = directory.join(derive_filename(&transcript.topic(), date));
    fs::create_dir_all(directory).map_err(|err| Error::io(directory, err))?;

    let mut temp_file =
        NamedTempFile::new_in(directory).map_err(|err| Error::io(directory, err))?;
    temp_file
        .write_all(&to_document(transcript))
        .and_then(|_| temp_file.flush())
        .and_then(|_| temp_file.as_file().sync_all())
        .map_err(|err| Error::io(&path, err))?;
    temp_file
        .persist(&path)
        .map_err(|err| Error::io(&path, err.error))?;

    info!(path = %path.display(), len = transcript.len(), "saved chat log");
    Ok(path)
}

/// Reads a chat log back into a transcript.
///
/// Every record must be an object with a `role` of `assistant` or `user`, a
/// string `content`, and a `timestamp` in [`timestamp::ISO_FORMAT`] that is
/// not earlier than the one before it. The first record that breaks any of
/// these rules fails the whole load with [`Error::MalformedLog`].
pub fn load(path: &Path) -> Result<Transcript, Error> {
    let bytes = fs::read(path).map_err(|err| Error::io(path, err))?;
    let transcript = parse_document(&bytes)?;
    info!(path = %path.display(), len = transcript.len(), "loaded chat log");
    Ok(transcript)
}

/// Parses a chat log document, see [`load`].
pub fn parse_document(bytes: &[u8]) -> Result<Transcript, Error> {
    let records: Vec<Value> = serde_json::from_slice(bytes).map_err(|err| {
        Error::malformed(None, format!("expected a JSON array: {err}"))
    })?;
    if records.is_empty() {
        return Err(Error::malformed(None, "the log contains no messages"));
    }

    let mut messages: Vec<Message> = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let msg = parse_record(record)
            .map_err(|reason| Error::malformed(Some(index), reason))?;
        if let Some(prev) = messages.last() {
            if msg.timestamp() < prev.timestamp() {
                return Err(Error::malformed(
                    Some(index),
                    "timestamp is earlier than the previous message",
                ));
            }
        }
        messages.push(msg);
    }
    Ok(Transcript::from_validated(messages))
}

fn parse_record(record: &Value) -> Result<Message, String> {
    let Some(fields) = record.as_object() else {
        return Err("record is not an object".to_owned());
    };

    let role = match string_field(fields, "role")? {
        Some(role) => role.parse::<Role>().map_err(|err| format!("{err}"))?,
        None => return Err("missing role".to_owned()),
    };
    let Some(content) = string_field(fields, "content")? else {
        return Err("missing content".to_owned());
    };
    let Some(timestamp) = string_field(fields, "timestamp")? else {
        return Err("missing timestamp".to_owned());
    };
    let timestamp =
        timestamp::parse_iso(timestamp).map_err(|err| format!("{err}"))?;

    Ok(Message::new(role, content.to_owned(), timestamp))
}

/// Returns the string value of `key`, treating `null` like an absent key.
fn string_field<'a>(
    fields: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a str>, String> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.as_str())),
        Some(_) => Err(format!("{key} is not a string")),
    }
}
