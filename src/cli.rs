use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::capture::PageKey;

/// Capture a screen region page by page and bind the screenshots into a PDF
#[derive(Parser, Debug)]
#[command(name = "capture2pdf", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Select a region, capture every page, then build the PDF
    Run {
        #[command(flatten)]
        pages: PageArgs,

        /// Key that turns to the next page
        #[arg(short, long, value_enum, default_value_t = PageKey::Right)]
        key: PageKey,
    },

    /// Select a region and capture every page as PNG
    Capture {
        #[command(flatten)]
        pages: PageArgs,

        /// Key that turns to the next page
        #[arg(short, long, value_enum, default_value_t = PageKey::Right)]
        key: PageKey,
    },

    /// Build the PDF from screenshots already on disk
    Assemble {
        /// First page (not needed with --scan)
        #[arg(short = 's', long = "start_page", required_unless_present = "scan")]
        start_page: Option<u32>,

        /// Last page (not needed with --scan)
        #[arg(short = 'e', long = "end_page", required_unless_present = "scan")]
        end_page: Option<u32>,

        #[command(flatten)]
        location: OutputArgs,

        /// Use every PNG in the image directory, ordered by the number in its name
        #[arg(long, default_value_t = false)]
        scan: bool,
    },
}

/// Page range plus output location.
#[derive(Args, Debug, Clone)]
pub struct PageArgs {
    /// First page number
    #[arg(short = 's', long = "start_page")]
    pub start_page: u32,

    /// Last page number (inclusive)
    #[arg(short = 'e', long = "end_page")]
    pub end_page: u32,

    #[command(flatten)]
    pub location: OutputArgs,
}

#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Directory that receives image/ and pdf/
    #[arg(short = 'o', long = "output_dir", default_value = ".")]
    pub output_dir: PathBuf,

    /// Prefix for file names, e.g. a chapter name
    #[arg(short = 'c', long = "chapter_name")]
    pub chapter_name: Option<String>,
}

impl OutputArgs {
    /// Chapter name, with an empty string treated as absent.
    pub fn chapter(&self) -> Option<&str> {
        self.chapter_name.as_deref().filter(|name| !name.is_empty())
    }
}
