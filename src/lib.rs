//! open-vtt - Video to enhanced WebVTT subtitles
//!
//! Probes a video with ffprobe, obtains baseline subtitles (embedded track or
//! whisper transcription), shrinks the video under an upload ceiling with
//! ffmpeg, and asks Gemini to produce an enhanced WebVTT document. A small
//! local server plays the results.

pub mod acquire;
pub mod check;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod enhance;
pub mod error;
pub mod media;
pub mod reduce;
pub mod selftest;
pub mod serve;
pub mod subtitle;
pub mod transcribe;
pub mod workflow;
