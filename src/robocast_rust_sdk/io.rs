use std::fs;
use std::io::{BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use memmap::Mmap;
use tempfile::NamedTempFile;

use super::error::{ExtractError, Result};

const MCAP_EXTENSION: &str = "mcap";

/// Resolves `input` to an `.mcap` file: either the file itself or the one inside a bag directory.
pub fn check_mcap_input_path<P: AsRef<Utf8Path>>(input: P) -> Result<Utf8PathBuf> {
    let input = input.as_ref();
    if input.is_file() {
        if input.extension() != Some(MCAP_EXTENSION) {
            return Err(ExtractError::InvalidPath(format!(
                "Input path {} must point to an .mcap file or a folder containing one.",
                input
            )));
        }
        return Ok(input.to_path_buf());
    }
    if input.is_dir() {
        let entries = input.read_dir_utf8().map_err(|e| {
            ExtractError::InvalidPath(format!("Couldn't list directory {}: {}", input, e))
        })?;
        let mut candidates: Vec<Utf8PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path().to_path_buf())
            .filter(|path| path.extension() == Some(MCAP_EXTENSION))
            .collect();
        candidates.sort();
        if candidates.len() > 1 {
            tracing::warn!(
                directory = %input,
                count = candidates.len(),
                "several .mcap files found, using the first one"
            );
        }
        return candidates.into_iter().next().ok_or_else(|| {
            ExtractError::InvalidPath(format!(
                "Input path {} must point to an .mcap file or a folder containing one.",
                input
            ))
        });
    }
    Err(ExtractError::InvalidPath(format!(
        "Input path doesn't exist: {}",
        input
    )))
}

/// Creates `output` if needed and makes sure it is a directory.
pub fn check_output_path<P: AsRef<Utf8Path>>(output: P) -> Result<()> {
    let output = output.as_ref();
    if !output.exists() {
        fs::create_dir_all(output).map_err(|e| ExtractError::output(output.to_path_buf(), e))?;
    }
    if !output.is_dir() {
        return Err(ExtractError::InvalidPath(format!(
            "The output path {} is not a directory",
            output
        )));
    }
    Ok(())
}

pub fn map_mcap<P: AsRef<Utf8Path>>(p: P) -> Result<Mmap> {
    let fd = fs::File::open(p.as_ref()).map_err(|e| {
        ExtractError::source_io(format!("Couldn't open MCAP file {}", p.as_ref()), e)
    })?;
    // SAFETY: the bag is opened read-only and not expected to change while it is mapped.
    unsafe { Mmap::map(&fd) }
        .map_err(|e| ExtractError::source_io(format!("Couldn't map MCAP file {}", p.as_ref()), e))
}

/// Writes `path` through a temporary file in the same directory. A failed write leaves no
/// partial file behind and any previous file at `path` untouched.
pub(crate) fn write_atomic<P, F>(path: P, write: F) -> Result<()>
where
    P: AsRef<Utf8Path>,
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    let path = path.as_ref();
    let to_err = |e: std::io::Error| ExtractError::output(path.to_path_buf(), e);
    let dir = match path.parent() {
        Some(dir) if !dir.as_str().is_empty() => dir,
        _ => Utf8Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(to_err)?;
    {
        let mut writer = BufWriter::new(&mut file);
        write(&mut writer).map_err(to_err)?;
        writer.flush().map_err(to_err)?;
    }
    file.persist(path).map_err(|e| to_err(e.error))?;
    Ok(())
}
