//! Finding and ordering screenshots by the page number in their file names.

use anyhow::{Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static PAGE_SUFFIX: OnceLock<Regex> = OnceLock::new();

fn page_suffix() -> &'static Regex {
    PAGE_SUFFIX.get_or_init(|| Regex::new(r"(?i)(\d+)\.png$").expect("valid page regex"))
}

/// A screenshot and the page number taken from its file name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct NumberedImage {
    pub page: u64,
    pub path: PathBuf,
}

/// What the file name says about the page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageNumber {
    Page(u64),
    /// No digits right before `.png`
    Missing,
    /// Digits that do not fit a `u64`
    TooLarge(String),
}

/// Reads the integer right before `.png`, e.g. `ch1_12.png` -> 12.
pub fn page_number(file_name: &str) -> PageNumber {
    let Some(caps) = page_suffix().captures(file_name) else {
        return PageNumber::Missing;
    };
    match caps[1].parse() {
        Ok(page) => PageNumber::Page(page),
        Err(_) => PageNumber::TooLarge(caps[1].to_string()),
    }
}

/// True for exactly `{chapter}_{digits}.png`.
///
/// `ch1_extra_3.png` does not belong to `ch1`.
fn in_chapter(file_name: &str, chapter: &str) -> bool {
    file_name
        .strip_prefix(chapter)
        .and_then(|rest| rest.strip_prefix('_'))
        .and_then(|rest| page_suffix().find(rest))
        .is_some_and(|m| m.start() == 0)
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}

/// Lists the PNGs in `dir`, ordered by page number.
///
/// With a chapter name only files named exactly `{chapter}_{page}.png` are
/// considered. Otherwise files without a trailing number are kept with page 0
/// and logged. Files whose number does not fit a `u64` are logged and left
/// out. Ties are broken by path so the result never depends on directory
/// listing order.
pub fn scan_images(dir: &Path, chapter: Option<&str>) -> Result<Vec<NumberedImage>> {
    let chapter = chapter.filter(|name| !name.is_empty());

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read image directory {}", dir.display()))?;

    let mut images = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to read entry in {}", dir.display()))?
            .path();
        if !path.is_file() || !is_png(&path) {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            crate::log(&format!("Skipping non-UTF-8 file name {}", path.display()));
            continue;
        };
        if chapter.is_some_and(|chapter| !in_chapter(file_name, chapter)) {
            continue;
        }

        let page = match page_number(file_name) {
            PageNumber::Page(page) => page,
            PageNumber::Missing => {
                crate::log(&format!(
                    "Warning: {} has no page number, sorting it as page 0",
                    file_name
                ));
                0
            }
            PageNumber::TooLarge(digits) => {
                crate::log(&format!(
                    "Skipping {}: page number {} is too large",
                    file_name, digits
                ));
                continue;
            }
        };
        images.push(NumberedImage { page, path });
    }

    images.sort();
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"").unwrap();
    }

    fn pages(images: &[NumberedImage]) -> Vec<u64> {
        images.iter().map(|i| i.page).collect()
    }

    #[test]
    fn test_page_number() {
        assert_eq!(page_number("12.png"), PageNumber::Page(12));
        assert_eq!(page_number("ch1_7.png"), PageNumber::Page(7));
        assert_eq!(page_number("vol2_ch3_045.PNG"), PageNumber::Page(45));
        assert_eq!(page_number("cover.png"), PageNumber::Missing);
        assert_eq!(page_number("12.jpg"), PageNumber::Missing);
        assert_eq!(page_number("12.png.bak"), PageNumber::Missing);
        assert_eq!(
            page_number("99999999999999999999999.png"),
            PageNumber::TooLarge("99999999999999999999999".to_string())
        );
    }

    #[test]
    fn test_scan_orders_numerically() {
        let dir = tempdir().unwrap();
        for name in ["5.png", "10.png", "2.png"] {
            touch(dir.path(), name);
        }

        let images = scan_images(dir.path(), None).unwrap();
        assert_eq!(pages(&images), vec![2, 5, 10]);
        assert_eq!(images[0].path, dir.path().join("2.png"));
        assert_eq!(images[2].path, dir.path().join("10.png"));
    }

    #[test]
    fn test_scan_ignores_other_files() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "1.png");
        touch(dir.path(), "2.jpg");
        touch(dir.path(), "notes.txt");
        std::fs::create_dir(dir.path().join("3.png")).unwrap();

        let images = scan_images(dir.path(), None).unwrap();
        assert_eq!(pages(&images), vec![1]);
    }

    #[test]
    fn test_scan_filters_by_chapter() {
        let dir = tempdir().unwrap();
        for name in ["ch1_2.png", "ch1_1.png", "ch2_1.png", "9.png"] {
            touch(dir.path(), name);
        }

        let images = scan_images(dir.path(), Some("ch1")).unwrap();
        assert_eq!(pages(&images), vec![1, 2]);
        assert!(images.iter().all(|i| i
            .path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("ch1_")));
    }

    #[test]
    fn test_scan_chapter_is_matched_exactly() {
        let dir = tempdir().unwrap();
        for name in ["ch1_3.png", "ch1_extra_3.png", "ch1_cover.png", "ch10_1.png"] {
            touch(dir.path(), name);
        }

        let images = scan_images(dir.path(), Some("ch1")).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].path, dir.path().join("ch1_3.png"));

        let extra = scan_images(dir.path(), Some("ch1_extra")).unwrap();
        assert_eq!(extra.len(), 1);
        assert_eq!(extra[0].path, dir.path().join("ch1_extra_3.png"));
    }

    #[test]
    fn test_scan_skips_oversized_page_number() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "99999999999999999999999.png");
        touch(dir.path(), "5.png");

        let images = scan_images(dir.path(), None).unwrap();
        assert_eq!(pages(&images), vec![5]);
    }

    #[test]
    fn test_unnumbered_files_sort_first_in_name_order() {
        let dir = tempdir().unwrap();
        for name in ["zeta.png", "3.png", "alpha.png", "0.png"] {
            touch(dir.path(), name);
        }

        let images = scan_images(dir.path(), None).unwrap();
        assert_eq!(pages(&images), vec![0, 0, 0, 3]);
        let names: Vec<_> = images
            .iter()
            .map(|i| i.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["0.png", "alpha.png", "zeta.png", "3.png"]);
    }

    #[test]
    fn test_scan_missing_directory_fails() {
        let dir = tempdir().unwrap();
        assert!(scan_images(&dir.path().join("nope"), None).is_err());
    }
}
