//! NoteStore — one plain file per note under a single root directory
//!
//! The file name is the note's key and the file content is the note's text,
//! with no wrapping format. Nothing is cached: every call goes straight to
//! the filesystem, so reads always see the latest writes and deletes.
//!
//! Only regular files are notes. Symlinks and directories under the root are
//! invisible to every operation, so no key can reach outside the root.

use crate::error::{NoteError, NoteResult};
use notes_types::NoteEntry;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Longest accepted key in bytes (`NAME_MAX` on common filesystems)
pub const MAX_KEY_LEN: usize = 255;

/// Prefix of in-flight replacement files. It contains `..`, so it never
/// collides with a valid key and never shows up in listings.
const REPLACE_TMP_PREFIX: &str = "..replace-";

/// Check that `key` names exactly one entry directly under the root.
///
/// Rejects empty names, `.`, anything containing `..`, path separators
/// (`/` and `\`), NUL, and names longer than [`MAX_KEY_LEN`] bytes.
pub fn validate_key(key: &str) -> NoteResult<()> {
    let invalid = key.is_empty()
        || key.len() > MAX_KEY_LEN
        || key == "."
        || key.contains("..")
        || key.contains('/')
        || key.contains('\\')
        || key.contains('\0');

    if invalid {
        Err(NoteError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

fn not_found_or_io(e: io::Error) -> NoteError {
    if e.kind() == io::ErrorKind::NotFound {
        NoteError::NotFound
    } else {
        NoteError::Io(e)
    }
}

/// Write all of `content` to a freshly created note file, deleting the file
/// if the write fails so a failed create leaves nothing behind.
fn fill_or_discard<W: Write>(mut file: W, path: &Path, content: &[u8]) -> io::Result<()> {
    let result = file.write_all(content).and_then(|_| file.flush());
    if result.is_err() {
        drop(file);
        if let Err(e) = fs::remove_file(path) {
            log::warn!("[NOTES] Could not remove partial note {}: {}", path.display(), e);
        }
    }
    result
}

pub struct NoteStore {
    notes_dir: PathBuf,
}

impl NoteStore {
    /// Open a store rooted at `notes_dir`, creating it (and its parents) if missing
    pub fn open(notes_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let notes_dir = notes_dir.into();
        fs::create_dir_all(&notes_dir)?;
        Ok(Self { notes_dir })
    }

    pub fn notes_dir(&self) -> &Path {
        &self.notes_dir
    }

    fn note_path(&self, key: &str) -> NoteResult<PathBuf> {
        validate_key(key)?;
        Ok(self.notes_dir.join(key))
    }

    /// Path and metadata of an existing note.
    ///
    /// Uses `symlink_metadata`, so a symlink is never followed: links and
    /// directories are `NotFound`, the same way `list` skips them.
    fn existing_note(&self, key: &str) -> NoteResult<(PathBuf, fs::Metadata)> {
        let path = self.note_path(key)?;
        let metadata = fs::symlink_metadata(&path).map_err(not_found_or_io)?;
        if !metadata.file_type().is_file() {
            return Err(NoteError::NotFound);
        }
        Ok((path, metadata))
    }

    /// Read every note in the root directory.
    ///
    /// Order is whatever the directory enumeration yields. Entries that are
    /// not regular files, or whose names aren't valid keys, are skipped.
    pub fn list(&self) -> NoteResult<Vec<NoteEntry>> {
        let mut notes = Vec::new();

        for entry in fs::read_dir(&self.notes_dir)? {
            let entry = entry?;
            let Some(name) = listable_name(&entry)? else {
                continue;
            };

            let text = match fs::read_to_string(entry.path()) {
                Ok(text) => text,
                // Removed between read_dir and the read
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            notes.push(NoteEntry { name, text });
        }

        Ok(notes)
    }

    /// Number of notes `list` would return, without reading their contents
    pub fn count(&self) -> NoteResult<usize> {
        let mut count = 0;
        for entry in fs::read_dir(&self.notes_dir)? {
            if listable_name(&entry?)?.is_some() {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn get(&self, key: &str) -> NoteResult<String> {
        let (path, _) = self.existing_note(key)?;
        fs::read_to_string(&path).map_err(not_found_or_io)
    }

    /// Create a new note. Fails with `AlreadyExists` if `key` is taken.
    ///
    /// The existence check and the create are a single `create_new` open, so
    /// two concurrent creates of the same key can't both succeed. `create_new`
    /// also refuses to open through an existing symlink.
    pub fn create(&self, key: &str, content: &str) -> NoteResult<()> {
        let path = self.note_path(key)?;

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => NoteError::AlreadyExists,
                _ => NoteError::Io(e),
            })?;
        fill_or_discard(file, &path, content.as_bytes())?;

        log::info!("[NOTES] Created {} ({} bytes)", key, content.len());
        Ok(())
    }

    /// Overwrite an existing note. Fails with `NotFound` if `key` is absent.
    ///
    /// The new content goes to a temp file in the root which is then renamed
    /// over the note, so readers see either the old or the new text and a
    /// failed write leaves the old note intact.
    pub fn replace(&self, key: &str, content: &str) -> NoteResult<()> {
        let (path, metadata) = self.existing_note(key)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(REPLACE_TMP_PREFIX)
            .tempfile_in(&self.notes_dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().set_permissions(metadata.permissions())?;
        // On failure the temp file is dropped and deleted
        tmp.persist(&path).map_err(|e| NoteError::Io(e.error))?;

        log::info!("[NOTES] Replaced {} ({} bytes)", key, content.len());
        Ok(())
    }

    pub fn remove(&self, key: &str) -> NoteResult<()> {
        let (path, _) = self.existing_note(key)?;
        fs::remove_file(&path).map_err(not_found_or_io)?;

        log::info!("[NOTES] Removed {}", key);
        Ok(())
    }
}

/// Name of a directory entry if it should appear in listings
fn listable_name(entry: &fs::DirEntry) -> NoteResult<Option<String>> {
    let name = match entry.file_name().into_string() {
        Ok(name) => name,
        Err(raw) => {
            log::warn!("[NOTES] Skipping entry with non-UTF-8 name: {:?}", raw);
            return Ok(None);
        }
    };

    // In-flight replacement files and anything else no key could name
    if validate_key(&name).is_err() {
        log::debug!("[NOTES] Skipping entry with invalid name: {}", name);
        return Ok(None);
    }

    // file_type() does not follow symlinks, so links out of the root are skipped too
    if !entry.file_type()?.is_file() {
        log::warn!("[NOTES] Skipping non-file entry: {}", name);
        return Ok(None);
    }

    Ok(Some(name))
}
