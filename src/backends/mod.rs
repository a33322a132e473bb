// SPDX-License-Identifier: GPL-3.0-only

//! Device collaborators behind the screen controller
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │               App Layer                  │
//! └───────────────────┬──────────────────────┘
//!                     │
//! ┌───────────────────┴──────────────────────┐
//! │  ┌──────────────┐   ┌──────────────────┐ │
//! │  │    Camera    │   │     Playback     │ │
//! │  │ (GStreamer)  │   │   (GStreamer)    │ │
//! │  └──────┬───────┘   └────────┬─────────┘ │
//! │         └──── frames ────────┘           │
//! └──────────────────────────────────────────┘
//! ```
//!
//! - [`camera`]: device enumeration, capture sessions, stills and recording
//! - [`playback`]: gallery video player
//! - [`frames`]: RGBA frames shared between appsinks and the screen

pub mod camera;
pub mod frames;
pub mod playback;
