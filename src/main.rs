//! capture2pdf
//!
//! Captures a fixed screen region once per page of an e-book or slide viewer,
//! turning pages with a simulated arrow key, then binds the screenshots into
//! a single PDF.

mod capture;
mod cli;
mod config;
mod error;
mod interrupt;
mod paths;
mod pdf;

use anyhow::{anyhow, Result};
use chrono::Local;
use clap::Parser;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use crate::capture::{capture_pages, default_backend, select_region, CaptureJob, PageKey};
use crate::cli::{Cli, Command, OutputArgs, PageArgs};
use crate::config::{get_config, AppConfig};
use crate::error::PipelineError;
use crate::interrupt::Pacer;
use crate::pdf::{assemble_range, assemble_scan, AssemblyReport, LopdfDocument};

/// Prints a timestamped line and appends it to the log file.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = paths::get_logs_dir().join("capture2pdf.log");
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}

fn main() -> ExitCode {
    // Record panics in the log file as well as on stderr
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = if let Some(loc) = panic_info.location() {
            format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            String::new()
        };
        log(&format!("[PANIC]{} {}", location, msg));
    }));

    let cli = Cli::parse();

    if let Err(e) = paths::ensure_log_dir() {
        eprintln!("Warning: could not create log directory: {}", e);
    }
    config::init_config();
    if let Err(e) = interrupt::install_handler() {
        log(&format!("Warning: Ctrl+C handler not installed: {}", e));
    }

    match run(cli.command, get_config(), &Pacer::global()) {
        Ok(()) => {
            println!();
            println!("All steps completed.");
            ExitCode::SUCCESS
        }
        Err(e) if error::is_interrupted(&e) => {
            println!();
            log("Stopped by user.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log(&format!("Error: {:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: &AppConfig, pacer: &Pacer) -> Result<()> {
    match command {
        Command::Run { pages, key } => {
            prepare(&pages.location, Some((pages.start_page, pages.end_page)))?;
            capture_stage(&pages, key, config, pacer)?;
            println!("[Step 3: Build PDF]");
            report(assemble_range(
                LopdfDocument::new(),
                pacer,
                &pages.location.output_dir,
                pages.start_page,
                pages.end_page,
                pages.location.chapter(),
            )?);
            Ok(())
        }
        Command::Capture { pages, key } => {
            prepare(&pages.location, Some((pages.start_page, pages.end_page)))?;
            capture_stage(&pages, key, config, pacer)
        }
        Command::Assemble {
            start_page,
            end_page,
            location,
            scan,
        } => {
            println!("[Build PDF]");
            let result = if scan {
                prepare(&location, None)?;
                assemble_scan(
                    LopdfDocument::new(),
                    pacer,
                    &location.output_dir,
                    location.chapter(),
                    config.scan_page,
                )
            } else {
                let (start, end) = start_page.zip(end_page).ok_or_else(|| {
                    anyhow!("--start_page and --end_page are required without --scan")
                })?;
                prepare(&location, Some((start, end)))?;
                assemble_range(
                    LopdfDocument::new(),
                    pacer,
                    &location.output_dir,
                    start,
                    end,
                    location.chapter(),
                )
            };
            report(result?);
            Ok(())
        }
    }
}

/// Validates the range, creates the output directories and prints the banner.
fn prepare(location: &OutputArgs, range: Option<(u32, u32)>) -> Result<()> {
    if let Some((start, end)) = range {
        if start > end {
            return Err(PipelineError::InvalidRange { start, end }.into());
        }
    }
    paths::ensure_output_dirs(&location.output_dir)?;

    println!("=== capture2pdf ===");
    println!("Output: {}", absolute(&location.output_dir));
    if let Some((start, end)) = range {
        println!("Pages: {} - {}", start, end);
    }
    if let Some(chapter) = location.chapter() {
        println!("Chapter: {}", chapter);
    }
    println!("===================");
    println!();
    Ok(())
}

/// Region selection followed by the capture loop.
fn capture_stage(pages: &PageArgs, key: PageKey, config: &AppConfig, pacer: &Pacer) -> Result<()> {
    // Fail before any countdown if the desktop cannot be driven
    let mut backend = default_backend()?;

    println!("[Step 1: Select capture region]");
    let region = select_region(backend.as_mut(), pacer, config)?;
    println!("Region selected.");
    println!();

    println!("[Step 2: Capture pages]");
    let job = CaptureJob {
        output_dir: &pages.location.output_dir,
        start_page: pages.start_page,
        end_page: pages.end_page,
        chapter: pages.location.chapter(),
        key,
    };
    capture_pages(backend.as_mut(), pacer, config, &job, &region)?;
    println!("Capture finished.");
    println!();
    Ok(())
}

fn report(report: AssemblyReport) {
    println!(
        "PDF saved to {} ({} pages, {} skipped)",
        report.pdf_path.display(),
        report.pages_added,
        report.skipped.len()
    );
}

fn absolute(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use tempfile::tempdir;

    fn location(dir: &Path) -> OutputArgs {
        OutputArgs {
            output_dir: dir.to_path_buf(),
            chapter_name: Some("ch1".to_string()),
        }
    }

    #[test]
    fn test_prepare_rejects_reversed_range() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("book");

        let err = prepare(&location(&out), Some((5, 2))).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::InvalidRange { start: 5, end: 2 })
        ));
        // Nothing is created for an invalid request
        assert!(!out.exists());
    }

    #[test]
    fn test_prepare_creates_directories() {
        let dir = tempdir().unwrap();
        prepare(&location(dir.path()), Some((1, 1))).unwrap();
        assert!(dir.path().join("image").is_dir());
        assert!(dir.path().join("pdf").is_dir());
    }

    #[test]
    fn test_assemble_command_range_mode() {
        let dir = tempdir().unwrap();
        paths::ensure_output_dirs(dir.path()).unwrap();
        for page in 1..=2 {
            image::RgbImage::new(3, 3)
                .save(paths::image_path(dir.path(), page, Some("ch1")))
                .unwrap();
        }
        let stop = AtomicBool::new(false);

        let command = Command::Assemble {
            start_page: Some(1),
            end_page: Some(2),
            location: location(dir.path()),
            scan: false,
        };
        run(command, &AppConfig::instant(), &Pacer::new(&stop)).unwrap();

        assert!(dir.path().join("pdf").join("ch1_1_2.pdf").is_file());
    }

    #[test]
    fn test_assemble_command_scan_mode() {
        let dir = tempdir().unwrap();
        paths::ensure_output_dirs(dir.path()).unwrap();
        for page in [3, 7] {
            image::RgbImage::new(3, 3)
                .save(paths::image_path(dir.path(), page, Some("ch1")))
                .unwrap();
        }
        let stop = AtomicBool::new(false);

        let command = Command::Assemble {
            start_page: None,
            end_page: None,
            location: location(dir.path()),
            scan: true,
        };
        run(command, &AppConfig::instant(), &Pacer::new(&stop)).unwrap();

        assert!(dir.path().join("pdf").join("ch1_3_7.pdf").is_file());
    }

    #[test]
    fn test_assemble_command_stops_on_interrupt() {
        let dir = tempdir().unwrap();
        paths::ensure_output_dirs(dir.path()).unwrap();
        for page in 1..=2 {
            image::RgbImage::new(3, 3)
                .save(paths::image_path(dir.path(), page, Some("ch1")))
                .unwrap();
        }
        let stop = AtomicBool::new(true);

        let command = Command::Assemble {
            start_page: Some(1),
            end_page: Some(2),
            location: location(dir.path()),
            scan: false,
        };
        let err = run(command, &AppConfig::instant(), &Pacer::new(&stop)).unwrap_err();

        assert!(error::is_interrupted(&err));
        assert!(!dir.path().join("pdf").join("ch1_1_2.pdf").exists());
    }

    #[cfg(not(windows))]
    #[test]
    fn test_capture_without_backend_fails_fast() {
        let dir = tempdir().unwrap();
        let stop = AtomicBool::new(false);

        let command = Command::Capture {
            pages: PageArgs {
                start_page: 1,
                end_page: 2,
                location: location(dir.path()),
            },
            key: PageKey::Right,
        };
        let err = run(command, &AppConfig::default(), &Pacer::new(&stop)).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::CaptureUnavailable(_))
        ));
        assert!(!error::is_interrupted(&err));
    }
}
