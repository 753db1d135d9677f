//! Errors raised by the host side of the radar display

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for radar display operations
pub type Result<T> = std::result::Result<T, RadarError>;

/// Errors that can occur while bringing up or driving the display window
#[derive(Error, Debug)]
pub enum RadarError {
    /// Event loop could not be created or exited abnormally
    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// Window creation failed
    #[error("Window creation failed: {0}")]
    Window(#[from] winit::error::OsError),

    /// Pixel surface creation or presentation failed
    #[error("Pixel surface error: {0}")]
    Surface(#[from] pixels::Error),

    /// Font file could not be read
    #[error("Failed to read font {}: {source}", .path.display())]
    FontRead { path: PathBuf, source: io::Error },

    /// Font data could not be parsed
    #[error("Invalid font data in {}", .0.display())]
    FontParse(PathBuf),
}
