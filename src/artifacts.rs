// Artifact file naming and IO
//
// Artifacts are plain UTF-8 text files in the outputs directory. The file
// name embeds the job id, so names never collide and a record can always be
// matched back to its files on disk.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// File name of the full conversation transcript for a job
pub fn transcript_file_name(job_id: &str) -> String {
    format!("job_{}_full_conversation_transcript.txt", job_id)
}

/// File name of the meeting minutes for a job
pub fn minutes_file_name(job_id: &str) -> String {
    format!("job_{}_meeting_minutes.txt", job_id)
}

/// Write one artifact, creating the outputs directory if needed
pub fn write_artifact(outputs_dir: &Path, file_name: &str, contents: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(outputs_dir).with_context(|| {
        format!("Failed to create outputs directory: {}", outputs_dir.display())
    })?;

    let path = outputs_dir.join(file_name);
    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write artifact: {}", path.display()))?;

    Ok(path)
}

/// Read an artifact's bytes, or `None` if the file does not exist
pub fn read_artifact(outputs_dir: &Path, file_name: &str) -> Result<Option<Vec<u8>>> {
    let path = outputs_dir.join(file_name);
    match std::fs::read(&path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read artifact: {}", path.display())),
    }
}

/// Remove a file, treating "already gone" as success
pub fn remove_file_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove file: {}", path.display())),
    }
}
