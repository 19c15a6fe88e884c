//! Wordloop - Looping Vocabulary Videos
//!
//! Builds a short looping video from a word, a still image and a
//! pronunciation clip: the clip is sped up and looped, and the word is drawn
//! onto the image at shuffled positions, one cumulative frame per clip
//! repetition, then muxed with ffmpeg.

pub mod cli;
pub mod config;
pub mod workflow;
pub mod word;
pub mod random;
pub mod grid;
pub mod overlay;
pub mod frames;
pub mod media;
pub mod workspace;
pub mod error;
