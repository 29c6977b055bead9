//! # mjpg-viewer: headless MJPEG viewer
//!
//! Connects to an MJPEG stream, pushes quality and fps settings to the
//! streaming server, then pulls frames and reports the local frame
//! rate. Optionally writes the latest frame to disk.

pub mod config;
