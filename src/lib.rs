//! Reelsmith - Subtitled Video Render Orchestration
//!
//! Prepares a composition project in a scratch workspace, downloads its
//! narration audio and drives an external renderer (Remotion) to produce an
//! MP4. The workspace is always removed afterwards.

pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod orchestrator;
pub mod renderer;
pub mod subtitle;
pub mod template;
pub mod workspace;
