use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8000;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "open-vtt - Video to Enhanced VTT",
    after_help = "Examples:\n  open-vtt --serve              Serve player.html\n  open-vtt --serve --port 3000  Serve on port 3000\n  open-vtt --check              Check dependencies\n  open-vtt --convert video.mp4  Convert video to VTT\n  open-vtt --test               Run self tests"
)]
pub struct Args {
    /// Serve player.html and the media directory
    #[arg(long)]
    pub serve: bool,

    /// Port for serve mode
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Check system dependencies
    #[arg(long)]
    pub check: bool,

    /// Convert video file to enhanced VTT
    #[arg(long, value_name = "VIDEO")]
    pub convert: Option<PathBuf>,

    /// Output VTT filename (for --convert)
    #[arg(long, value_name = "FILE")]
    pub output_vtt: Option<PathBuf>,

    /// Run self tests
    #[arg(long)]
    pub test: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path (JSON, or TOML by extension)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// What a run does, after flag precedence is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Test,
    Check,
    Convert {
        video: PathBuf,
        output_vtt: Option<PathBuf>,
    },
    Serve {
        port: u16,
    },
}

impl Args {
    /// test > check > convert > serve; no mode flag means serve
    pub fn mode(&self) -> Mode {
        if self.test {
            Mode::Test
        } else if self.check {
            Mode::Check
        } else if let Some(video) = &self.convert {
            Mode::Convert {
                video: video.clone(),
                output_vtt: self.output_vtt.clone(),
            }
        } else {
            Mode::Serve { port: self.port }
        }
    }
}
