//! Reference card detection module
//!
//! This module handles computer vision tasks for locating the rectangular
//! calibration card in a capture image and rectifying it to a canonical
//! fronto-parallel rectangle.

pub mod card;

pub use card::{CardDetection, CardDetector};
