use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::jpeg::{RuleSet, strip};

/// Supported input extensions. Only JPEG files carry the segment structure
/// the scanner understands.
const JPEG_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// The outcome of stripping a single file.
///
/// `error` is `None` on success; on failure no output file is left behind.
#[derive(Debug)]
pub struct StripReport {
    pub path: PathBuf,
    /// Where the cleaned bytes ended up (the input path itself for
    /// in-place runs).
    pub output_path: Option<PathBuf>,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub error: Option<String>,
}

/// Collect supported JPEG files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks); only `.jpg`/`.jpeg` files are included.
///
/// # Example
///
/// ```rust,no_run
/// use exif_cleaner::pipeline::collect_images;
/// use std::path::PathBuf;
///
/// let images = collect_images(&[
///     PathBuf::from("photo.jpg"),   // single file
///     PathBuf::from("./photos/"),   // entire directory
/// ]);
/// println!("Found {} JPEGs", images.len());
/// ```
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_supported_image(p) {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

/// Check if a file has a supported JPEG extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| JPEG_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Destination path for a stripped copy: `photo.jpg` → `photo.cleaned.jpg`.
pub fn output_path_for(path: &Path, suffix: &str) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let ext = path.extension().unwrap_or_default().to_string_lossy();
    path.with_file_name(format!("{stem}.{suffix}.{ext}"))
}

/// Create a backup of the original file.
fn backup_file(path: &Path) -> Result<PathBuf> {
    let backup_path = path.with_extension(format!(
        "{}.bak",
        path.extension().unwrap_or_default().to_string_lossy()
    ));

    if !backup_path.exists() {
        fs::copy(path, &backup_path).context("Failed to create backup")?;
        log::debug!("Backup created: {}", backup_path.display());
    }

    Ok(backup_path)
}

/// Strip the configured metadata categories from one file.
///
/// The cleaned bytes are streamed to a temporary sibling file and renamed
/// into place only after the whole input was processed, so a malformed or
/// truncated input never leaves a partial output file behind. In-place
/// runs optionally back the original up as `.bak` first.
///
/// # Example
///
/// ```rust,no_run
/// use exif_cleaner::config::Config;
/// use exif_cleaner::jpeg::RuleSet;
/// use exif_cleaner::pipeline::process_file;
/// use std::path::Path;
///
/// let config = Config::default();
/// let rules = RuleSet::from_names(&config.strip.categories).unwrap();
///
/// let report = process_file(Path::new("photo.jpg"), &rules, &config);
/// match report.error {
///     None => println!("Wrote {:?}", report.output_path),
///     Some(err) => eprintln!("Failed: {err}"),
/// }
/// ```
pub fn process_file(path: &Path, rules: &RuleSet, config: &Config) -> StripReport {
    let mut report = StripReport {
        path: path.to_path_buf(),
        output_path: None,
        bytes_in: 0,
        bytes_out: 0,
        error: None,
    };

    match fs::metadata(path) {
        Ok(meta) => report.bytes_in = meta.len(),
        Err(e) => {
            report.error = Some(format!("Failed to read input: {e}"));
            return report;
        }
    }

    let destination = if config.output.in_place {
        path.to_path_buf()
    } else {
        output_path_for(path, &config.output.suffix)
    };
    let tmp_path = destination.with_extension(format!(
        "{}.tmp",
        destination.extension().unwrap_or_default().to_string_lossy()
    ));

    if let Err(e) = strip_to_file(path, &tmp_path, rules) {
        let _ = fs::remove_file(&tmp_path);
        report.error = Some(format!("{e:#}"));
        return report;
    }

    if config.output.in_place && config.output.backup_originals {
        if let Err(e) = backup_file(path) {
            log::warn!("Failed to backup {}: {e}", path.display());
        }
    }

    if let Err(e) = fs::rename(&tmp_path, &destination) {
        let _ = fs::remove_file(&tmp_path);
        report.error = Some(format!("Failed to move output into place: {e}"));
        return report;
    }

    report.bytes_out = fs::metadata(&destination).map(|m| m.len()).unwrap_or(0);
    report.output_path = Some(destination);
    report
}

/// Stream `path` through the scanner into `tmp_path`.
fn strip_to_file(path: &Path, tmp_path: &Path, rules: &RuleSet) -> Result<()> {
    let input = File::open(path).context("Failed to open input file")?;
    let tmp = File::create(tmp_path).context("Failed to create output file")?;
    let mut writer = BufWriter::new(tmp);

    strip(BufReader::new(input), &mut writer, rules)
        .map_err(|e| anyhow::anyhow!("Failed to strip JPEG: {e}"))?;
    writer.flush().context("Failed to flush output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn push_segment(img: &mut Vec<u8>, marker: u8, payload: &[u8]) {
        img.extend_from_slice(&[0xFF, marker]);
        img.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        img.extend_from_slice(payload);
    }

    // Minimal JPEG with an EXIF APP1, a DQT, and a tiny scan section.
    fn sample_jpeg() -> Vec<u8> {
        let mut img = vec![0xFF, 0xD8];
        push_segment(&mut img, 0xE1, b"Exif\0\0SOME-EXIF-DATA");
        push_segment(&mut img, 0xDB, &[0x00]);
        push_segment(&mut img, 0xDA, &[0x00, 0x03, 0x01, 0x00, 0x02]);
        img.extend_from_slice(&[0x11, 0x22, 0x33]); // scan data
        img.extend_from_slice(&[0xFF, 0xD9]);
        img
    }

    fn exif_rules() -> RuleSet {
        RuleSet::from_names(["exif"]).unwrap()
    }

    // ── collect_images ───────────────────────────────────────────────

    #[test]
    fn collect_images_single_file() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("test.jpg");
        fs::write(&jpg, b"fake").unwrap();

        let images = collect_images(&[jpg.clone()]);
        assert_eq!(images, [jpg]);
    }

    #[test]
    fn collect_images_skips_unsupported() {
        let dir = TempDir::new().unwrap();
        let png = dir.path().join("image.png");
        fs::write(&png, b"fake").unwrap();

        let images = collect_images(&[png]);
        assert!(images.is_empty());
    }

    #[test]
    fn collect_images_directory_recursive() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();

        fs::write(dir.path().join("a.jpg"), b"fake").unwrap();
        fs::write(sub.join("b.JPEG"), b"fake").unwrap();
        fs::write(sub.join("c.txt"), b"fake").unwrap();

        let images = collect_images(&[dir.path().to_path_buf()]);
        assert_eq!(images.len(), 2);
    }

    #[test]
    fn collect_images_nonexistent_path() {
        let images = collect_images(&[PathBuf::from("/nonexistent/path")]);
        assert!(images.is_empty());
    }

    // ── output naming ────────────────────────────────────────────────

    #[test]
    fn output_path_inserts_suffix_before_extension() {
        assert_eq!(
            output_path_for(Path::new("/tmp/photo.jpg"), "cleaned"),
            Path::new("/tmp/photo.cleaned.jpg")
        );
        assert_eq!(
            output_path_for(Path::new("pic.jpeg"), "stripped"),
            Path::new("pic.stripped.jpeg")
        );
    }

    // ── process_file ─────────────────────────────────────────────────

    #[test]
    fn process_file_writes_cleaned_copy() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("photo.jpg");
        fs::write(&input, sample_jpeg()).unwrap();

        let report = process_file(&input, &exif_rules(), &Config::default());

        assert_eq!(report.error, None);
        let output = report.output_path.unwrap();
        assert_eq!(output, dir.path().join("photo.cleaned.jpg"));

        let cleaned = fs::read(&output).unwrap();
        assert!(!cleaned.windows(6).any(|w| w == b"Exif\0\0"));
        assert!(report.bytes_out < report.bytes_in);
        assert_eq!(report.bytes_out, cleaned.len() as u64);

        // Original untouched
        assert_eq!(fs::read(&input).unwrap(), sample_jpeg());
    }

    #[test]
    fn process_file_in_place_with_backup() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("photo.jpg");
        fs::write(&input, sample_jpeg()).unwrap();

        let mut config = Config::default();
        config.output.in_place = true;

        let report = process_file(&input, &exif_rules(), &config);

        assert_eq!(report.error, None);
        assert_eq!(report.output_path.as_deref(), Some(input.as_path()));

        let rewritten = fs::read(&input).unwrap();
        assert!(!rewritten.windows(6).any(|w| w == b"Exif\0\0"));
        assert!(rewritten.len() < sample_jpeg().len());

        let backup = dir.path().join("photo.jpg.bak");
        assert_eq!(fs::read(&backup).unwrap(), sample_jpeg());
    }

    #[test]
    fn process_file_in_place_without_backup() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("photo.jpg");
        fs::write(&input, sample_jpeg()).unwrap();

        let mut config = Config::default();
        config.output.in_place = true;
        config.output.backup_originals = false;

        let report = process_file(&input, &exif_rules(), &config);

        assert_eq!(report.error, None);
        assert!(!dir.path().join("photo.jpg.bak").exists());
    }

    #[test]
    fn process_file_rejects_non_jpeg_and_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("fake.jpg");
        fs::write(&input, b"not a jpeg at all").unwrap();

        let report = process_file(&input, &exif_rules(), &Config::default());

        let err = report.error.expect("expected an error report");
        assert!(err.contains("not a JPEG"), "unexpected error: {err}");
        assert!(report.output_path.is_none());

        // Only the untouched input remains in the directory.
        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, ["fake.jpg"]);
        assert_eq!(fs::read(&input).unwrap(), b"not a jpeg at all");
    }

    #[test]
    fn process_file_missing_input() {
        let report = process_file(
            Path::new("/nonexistent/photo.jpg"),
            &exif_rules(),
            &Config::default(),
        );
        assert!(report.error.is_some());
        assert!(report.output_path.is_none());
    }
}
