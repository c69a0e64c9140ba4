use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the config file path: `<exe_dir>/config.json`
pub fn get_config_path() -> PathBuf {
    get_exe_dir().join("config.json")
}

/// Returns the screenshot directory: `<output_dir>/image/`
pub fn image_dir(output_dir: &Path) -> PathBuf {
    output_dir.join("image")
}

/// Returns the PDF directory: `<output_dir>/pdf/`
pub fn pdf_dir(output_dir: &Path) -> PathBuf {
    output_dir.join("pdf")
}

/// Joins the optional chapter prefix with the rest of a file stem.
fn with_chapter(chapter: Option<&str>, rest: String) -> String {
    match chapter {
        Some(name) if !name.is_empty() => format!("{}_{}", name, rest),
        _ => rest,
    }
}

/// Path of the screenshot for `page`: `image/{chapter}_{page}.png` or `image/{page}.png`.
pub fn image_path(output_dir: &Path, page: u32, chapter: Option<&str>) -> PathBuf {
    let name = with_chapter(chapter, format!("{}.png", page));
    image_dir(output_dir).join(name)
}

/// Path of the assembled PDF: `pdf/{chapter}_{start}_{end}.pdf` or `pdf/{start}_{end}.pdf`.
pub fn pdf_path(output_dir: &Path, start: u64, end: u64, chapter: Option<&str>) -> PathBuf {
    let name = with_chapter(chapter, format!("{}_{}.pdf", start, end));
    pdf_dir(output_dir).join(name)
}

/// Creates `image/` and `pdf/` under the output directory.
pub fn ensure_output_dirs(output_dir: &Path) -> Result<()> {
    for dir in [image_dir(output_dir), pdf_dir(output_dir)] {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    Ok(())
}

/// Ensures the log directory exists. Call at startup.
pub fn ensure_log_dir() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_image_path_with_chapter() {
        let path = image_path(Path::new("out"), 7, Some("ch1"));
        assert_eq!(path, Path::new("out").join("image").join("ch1_7.png"));
    }

    #[test]
    fn test_image_path_without_chapter() {
        let out = Path::new("out");
        assert_eq!(image_path(out, 7, None), out.join("image").join("7.png"));
        // An empty chapter name behaves like no chapter at all
        assert_eq!(image_path(out, 7, Some("")), out.join("image").join("7.png"));
    }

    #[test]
    fn test_image_path_is_deterministic() {
        let out = Path::new("books");
        assert_eq!(
            image_path(out, 12, Some("intro")),
            image_path(out, 12, Some("intro"))
        );
    }

    #[test]
    fn test_pdf_path() {
        let out = Path::new(".");
        assert_eq!(
            pdf_path(out, 1, 3, Some("ch1")),
            out.join("pdf").join("ch1_1_3.pdf")
        );
        assert_eq!(pdf_path(out, 2, 10, None), out.join("pdf").join("2_10.pdf"));
    }

    #[test]
    fn test_ensure_output_dirs() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("nested").join("book");

        ensure_output_dirs(&out).unwrap();
        // Running twice is fine
        ensure_output_dirs(&out).unwrap();

        assert!(image_dir(&out).is_dir());
        assert!(pdf_dir(&out).is_dir());
    }

    #[test]
    fn test_ensure_output_dirs_fails_on_file() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("taken");
        std::fs::write(&out, "not a directory").unwrap();

        assert!(ensure_output_dirs(&out).is_err());
    }
}
