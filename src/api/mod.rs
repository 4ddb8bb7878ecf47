//! Boundary to the external backend
//!
//! The kids-mode core only reads chip playlists and reports finished
//! sessions. Both directions sit behind traits so the runtime can be driven
//! by in-memory fakes; [`client::HttpApiClient`] is the production
//! implementation.

pub mod client;
pub mod types;

pub use client::{ApiError, ApiSettings, HttpApiClient, PlaylistApi, SessionTracker, API_TIMEOUT_SECS};
pub use types::{Chip, ChipPlaylist, ChipUid, SessionReport, VideoRef};
