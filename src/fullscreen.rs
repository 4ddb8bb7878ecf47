//! FullscreenManager
//!
//! Entering fullscreen is best-effort: a surface without the capability
//! records the failure and playback goes on windowed. Exiting is idempotent:
//! only the first trigger reaches the surface. If the surface refuses, the
//! manager stays fullscreen so the next trigger tries again.

use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FullscreenError {
    #[error("Fullscreen is not supported on this surface")]
    Unsupported,

    #[error("Fullscreen request rejected: {0}")]
    Rejected(String),
}

/// Host display capability
pub trait FullscreenSurface: Send + 'static {
    fn request_fullscreen(&mut self) -> Result<(), FullscreenError>;

    fn exit_fullscreen(&mut self) -> Result<(), FullscreenError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FullscreenMode {
    #[default]
    Windowed,
    Fullscreen,
}

pub struct FullscreenManager {
    surface: Box<dyn FullscreenSurface>,
    mode: FullscreenMode,
    last_failure: Option<FullscreenError>,
}

impl FullscreenManager {
    pub fn new(surface: Box<dyn FullscreenSurface>) -> Self {
        Self {
            surface,
            mode: FullscreenMode::Windowed,
            last_failure: None,
        }
    }

    pub fn mode(&self) -> FullscreenMode {
        self.mode
    }

    pub fn is_fullscreen(&self) -> bool {
        self.mode == FullscreenMode::Fullscreen
    }

    /// Most recent failed enter or exit, kept for diagnostics
    pub fn last_failure(&self) -> Option<&FullscreenError> {
        self.last_failure.as_ref()
    }

    /// Returns whether the surface is fullscreen afterwards
    pub fn enter(&mut self) -> bool {
        if self.is_fullscreen() {
            debug!("Already fullscreen");
            return true;
        }

        match self.surface.request_fullscreen() {
            Ok(()) => {
                info!("Entered fullscreen");
                self.mode = FullscreenMode::Fullscreen;
                self.last_failure = None;
                true
            }
            Err(e) => {
                warn!("Fullscreen unavailable, continuing windowed: {}", e);
                self.last_failure = Some(e);
                false
            }
        }
    }

    pub fn exit(&mut self) {
        if !self.is_fullscreen() {
            debug!("Exit fullscreen requested while windowed, nothing to do");
            return;
        }

        match self.surface.exit_fullscreen() {
            Ok(()) => {
                info!("Left fullscreen");
                self.mode = FullscreenMode::Windowed;
            }
            Err(e) => {
                warn!("Surface refused to leave fullscreen, will retry: {}", e);
                self.last_failure = Some(e);
            }
        }
    }
}

/// Surface for headless hosts; only logs what a display would do
#[derive(Debug, Clone)]
pub struct LoggingSurface {
    supported: bool,
}

impl LoggingSurface {
    pub fn new(supported: bool) -> Self {
        Self { supported }
    }
}

impl FullscreenSurface for LoggingSurface {
    fn request_fullscreen(&mut self) -> Result<(), FullscreenError> {
        if !self.supported {
            return Err(FullscreenError::Unsupported);
        }
        info!("[display] fullscreen on");
        Ok(())
    }

    fn exit_fullscreen(&mut self) -> Result<(), FullscreenError> {
        info!("[display] fullscreen off");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Calls {
        requests: usize,
        exits: usize,
    }

    struct CountingSurface {
        calls: Arc<Mutex<Calls>>,
        supported: bool,
        refused_exits: usize,
    }

    impl FullscreenSurface for CountingSurface {
        fn request_fullscreen(&mut self) -> Result<(), FullscreenError> {
            self.calls.lock().unwrap().requests += 1;
            if self.supported {
                Ok(())
            } else {
                Err(FullscreenError::Unsupported)
            }
        }

        fn exit_fullscreen(&mut self) -> Result<(), FullscreenError> {
            self.calls.lock().unwrap().exits += 1;
            if self.refused_exits > 0 {
                self.refused_exits -= 1;
                return Err(FullscreenError::Rejected("busy".to_string()));
            }
            Ok(())
        }
    }

    fn manager(supported: bool) -> (FullscreenManager, Arc<Mutex<Calls>>) {
        refusing_manager(supported, 0)
    }

    fn refusing_manager(supported: bool, refused_exits: usize) -> (FullscreenManager, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let surface = CountingSurface {
            calls: calls.clone(),
            supported,
            refused_exits,
        };
        (FullscreenManager::new(Box::new(surface)), calls)
    }

    #[test]
    fn unsupported_surface_records_failure_and_stays_windowed() {
        let (mut manager, _) = manager(false);
        assert!(!manager.enter());
        assert_eq!(manager.mode(), FullscreenMode::Windowed);
        assert_eq!(manager.last_failure(), Some(&FullscreenError::Unsupported));
    }

    #[test]
    fn repeated_exits_reach_the_surface_once() {
        let (mut manager, calls) = manager(true);
        assert!(manager.enter());
        assert!(manager.enter());

        manager.exit();
        manager.exit();
        manager.exit();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.requests, 1);
        assert_eq!(calls.exits, 1);
        assert!(!manager.is_fullscreen());
    }

    #[test]
    fn exit_without_enter_is_harmless() {
        let (mut manager, calls) = manager(true);
        manager.exit();
        assert_eq!(calls.lock().unwrap().exits, 0);
        assert_eq!(manager.mode(), FullscreenMode::Windowed);
    }

    #[test]
    fn refused_exit_is_retried_on_next_trigger() {
        let (mut manager, calls) = refusing_manager(true, 1);
        assert!(manager.enter());

        manager.exit();
        assert!(manager.is_fullscreen());
        assert!(matches!(manager.last_failure(), Some(FullscreenError::Rejected(_))));

        manager.exit();
        assert!(!manager.is_fullscreen());
        manager.exit();
        assert_eq!(calls.lock().unwrap().exits, 2);
    }
}
