//! # Transcript Persistence
//!
//! Save finished conversations to `~/.folio/transcripts/`.
//!
//! Each transcript is a JSON file (`<uuid>.json`) plus a lightweight index
//! (`transcripts.json`) that avoids loading all files just to render a list.
//!
//! All writes use atomic rename (write `.tmp`, then `rename()`) for crash safety.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::core::conversation::{Conversation, ConversationRecord};

/// Summary metadata for a transcript (stored in the index file).
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TranscriptMeta {
    pub id: String,
    pub title: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub record_count: usize,
    /// Server-side path of the document the questions were about.
    pub document: String,
}

/// Full transcript data: metadata + committed records.
#[derive(Serialize, Deserialize, Debug)]
pub struct TranscriptData {
    pub meta: TranscriptMeta,
    pub records: Vec<ConversationRecord>,
}

/// Index of all transcripts, most recently updated first.
#[derive(Serialize, Deserialize, Default, Debug)]
pub struct TranscriptIndex {
    pub transcripts: Vec<TranscriptMeta>,
}

/// Returns `~/.folio/transcripts/`, creating it if needed.
pub fn transcripts_dir() -> io::Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no home directory"))?;
    let dir = home.join(".folio").join("transcripts");
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Generate a new UUID v4 transcript ID.
pub fn new_transcript_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Derive a title from the first question in the conversation.
/// Returns the first line, truncated to 60 chars.
pub fn derive_title(records: &[ConversationRecord]) -> String {
    for record in records {
        let first_line = record.question.lines().next().unwrap_or("").trim();
        if first_line.is_empty() {
            continue;
        }
        if first_line.len() > 60 {
            // Cut on a char boundary; byte 57 may fall inside a multibyte char
            let mut cut = 57;
            while !first_line.is_char_boundary(cut) {
                cut -= 1;
            }
            return format!("{}...", &first_line[..cut]);
        }
        return first_line.to_string();
    }
    "Untitled".to_string()
}

/// Atomically write `data` as JSON to `path` (via `.tmp` + rename).
fn atomic_write_json<T: Serialize>(path: &Path, data: &T) -> io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(&tmp_path, json)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Save a transcript to disk and update the index.
pub fn save_transcript(
    id: &str,
    records: &[ConversationRecord],
    document: &str,
    existing_meta: Option<&TranscriptMeta>,
) -> io::Result<()> {
    // Don't save empty transcripts
    if records.is_empty() {
        return Ok(());
    }

    let dir = transcripts_dir()?;
    let now = Utc::now().timestamp();

    let meta = TranscriptMeta {
        id: id.to_string(),
        title: existing_meta
            .map(|m| m.title.clone())
            .unwrap_or_else(|| derive_title(records)),
        created_at: existing_meta.map(|m| m.created_at).unwrap_or(now),
        updated_at: now,
        record_count: records.len(),
        document: document.to_string(),
    };

    let data = TranscriptData {
        meta: meta.clone(),
        records: records.to_vec(),
    };

    let transcript_path = dir.join(format!("{}.json", id));
    atomic_write_json(&transcript_path, &data)?;

    // Update index, most recently updated first
    let mut index = load_index().unwrap_or_default();
    index.transcripts.retain(|t| t.id != id);
    index.transcripts.push(meta);
    index.transcripts.sort_by_key(|t| std::cmp::Reverse(t.updated_at));

    let index_path = dir.join("transcripts.json");
    atomic_write_json(&index_path, &index)?;

    Ok(())
}

/// Load a transcript from disk by ID.
pub fn load_transcript(id: &str) -> io::Result<TranscriptData> {
    let dir = transcripts_dir()?;
    let path = dir.join(format!("{}.json", id));
    let json = fs::read_to_string(&path)?;
    serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Load the transcript index from disk.
pub fn load_index() -> io::Result<TranscriptIndex> {
    let dir = transcripts_dir()?;
    let path = dir.join("transcripts.json");
    if !path.exists() {
        return Ok(TranscriptIndex::default());
    }
    let json = fs::read_to_string(path)?;
    serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Save the current conversation to disk. Generates a transcript ID if needed.
/// Skips empty conversations. This is the single entry point for transcript
/// persistence — call from the TUI after each commit and on quit.
pub fn save_current_transcript(
    transcript_id: &mut Option<String>,
    conversation: &Conversation,
    document: &str,
) {
    if conversation.is_empty() {
        return;
    }

    let id = transcript_id.get_or_insert_with(new_transcript_id).clone();

    // Load existing meta to preserve title/created_at
    let existing_meta = load_transcript(&id).ok().map(|d| d.meta);

    if let Err(e) = save_transcript(&id, conversation.records(), document, existing_meta.as_ref())
    {
        warn!("Failed to save transcript: {}", e);
    } else {
        debug!("Transcript saved: {}", id);
    }
}
