use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use rustyline::DefaultEditor;
use tracing::info;

use crate::domain::models::SUPPORTED_SUBTITLE_EXTENSIONS;
use crate::error::{Error, Result};

/// `<movie dir>/<movie stem>.<extension>`
pub fn subtitle_path(movie: &Path, extension: &str) -> PathBuf {
    let stem = movie
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "subtitle".to_string());
    let extension = sanitize_extension(extension);
    movie.with_file_name(format!("{stem}.{extension}"))
}

fn sanitize_extension(extension: &str) -> String {
    let cleaned: String = extension
        .trim()
        .trim_start_matches('.')
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_lowercase();
    if cleaned.is_empty() {
        "srt".to_string()
    } else {
        cleaned
    }
}

/// Write `content` next to `movie`; an existing file is kept unless `overwrite`.
pub fn save_next_to_movie(
    movie: &Path,
    extension: &str,
    content: &[u8],
    overwrite: bool,
) -> Result<PathBuf> {
    let path = subtitle_path(movie, extension);

    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    let mut file = options.open(&path).map_err(|e| Error::io(&path, e))?;
    file.write_all(content).map_err(|e| Error::io(&path, e))?;
    info!("Saved subtitle to {}", path.display());
    Ok(path)
}

/// Subtitle files already sitting next to `movie` under its stem.
pub fn existing_subtitles(movie: &Path) -> Result<Vec<PathBuf>> {
    let Some(stem) = movie.file_stem() else {
        return Ok(Vec::new());
    };
    let directory = match movie.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut found = Vec::new();
    for entry in fs::read_dir(directory).map_err(|e| Error::io(directory, e))? {
        let path = entry.map_err(|e| Error::io(directory, e))?.path();
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| SUPPORTED_SUBTITLE_EXTENSIONS.contains(&e.to_lowercase().as_str()));
        if supported && path.is_file() && path.file_stem() == Some(stem) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

pub fn confirm_overwrite(path: &Path) -> bool {
    println!("\"{}\" already exists. Overwrite? [y/N] ", path.display());

    let Ok(mut rl) = DefaultEditor::new() else {
        return false;
    };
    loop {
        let input = rl.readline("").unwrap_or_default();
        let input = input.trim().to_lowercase();

        if input == "y" || input == "yes" {
            return true;
        } else if input == "n" || input == "no" || input.is_empty() {
            return false;
        } else {
            println!("Please enter 'y' or 'n'.");
        }
    }
}
