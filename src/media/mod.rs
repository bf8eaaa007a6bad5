pub mod archive;
pub mod ffmpeg;
pub mod fingerprint;
pub mod tracks;
