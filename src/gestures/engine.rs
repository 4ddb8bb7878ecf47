//! Gesture engine lifecycle
//!
//! ```text
//! Configured ──► Active ──► Stopped
//!                  │
//!      GestureInput queue ──► GestureInterpreter ──► GestureOutput queue
//! ```
//!
//! [`GestureHandle::spawn`] requests sensor permission, then runs the
//! sampler and the engine as two tokio tasks connected by the engine's
//! inbound queue. When permission is denied neither task is started and a
//! [`Notice::MotionAccessDenied`] is sent instead.

use super::interpreter::{GestureInterpreter, GestureState};
use super::GestureSettings;
use crate::events::{Command, GestureOutput, Notice};
use crate::sensors::{GestureSampler, GestureSignal, PermissionDecision, SamplerError, SensorSource};
use statum::{machine, state};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Inbound queue item of the gesture engine
#[derive(Debug, Clone, PartialEq)]
pub enum GestureInput {
    Signal(GestureSignal),
    /// A new playback session started; forget cooldowns and tilt history
    ResetSession,
}

#[derive(Debug, thiserror::Error)]
pub enum GestureError {
    #[error("Sampler error: {0}")]
    SamplerError(#[from] SamplerError),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("Engine task failed: {0}")]
    TaskError(String),
}

#[state]
#[derive(Debug, Clone)]
pub enum GestureEngineState {
    Configured,
    Active,
    Stopped,
}

#[machine]
pub struct GestureEngine<S: GestureEngineState> {
    input_receiver: mpsc::Receiver<GestureInput>,
    output_sender: mpsc::Sender<GestureOutput>,
    interpreter: GestureInterpreter,
}

impl<S: GestureEngineState> GestureEngine<S> {
    pub fn gesture_state(&self) -> &GestureState {
        self.interpreter.state()
    }
}

impl GestureEngine<Configured> {
    pub fn create(
        input_receiver: mpsc::Receiver<GestureInput>,
        output_sender: mpsc::Sender<GestureOutput>,
        settings: GestureSettings,
    ) -> Self {
        info!("Creating GestureEngine with settings: {:?}", settings);
        Self::new(input_receiver, output_sender, GestureInterpreter::new(settings))
    }

    pub fn activate(self) -> GestureEngine<Active> {
        info!("Activating GestureEngine");
        self.transition()
    }
}

impl GestureEngine<Active> {
    pub fn handle(&mut self, input: GestureInput) -> Option<Command> {
        match input {
            GestureInput::Signal(signal) => self.interpreter.handle(&signal),
            GestureInput::ResetSession => {
                self.interpreter.reset();
                None
            }
        }
    }

    pub async fn run_until_shutdown(mut self, shutdown: CancellationToken) -> GestureEngine<Stopped> {
        info!("Starting GestureEngine loop");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received for GestureEngine");
                    break;
                }
                input = self.input_receiver.recv() => {
                    let Some(input) = input else {
                        info!("GestureEngine input closed");
                        break;
                    };
                    if let Some(command) = self.handle(input) {
                        if let Err(e) = self.output_sender.send(GestureOutput::Command(command)).await {
                            error!("Failed to send gesture command: {}", e);
                            break;
                        }
                    }
                }
            }
        }

        debug!("Transitioning GestureEngine to Stopped state");
        self.transition()
    }
}

impl GestureEngine<Stopped> {
    pub fn into_state(self) -> GestureState {
        self.interpreter.state().clone()
    }
}

/// Running gesture pipeline (or a disabled one after a denied permission)
#[derive(Debug)]
pub struct GestureHandle {
    permission: PermissionDecision,
    input_sender: Option<mpsc::Sender<GestureInput>>,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl GestureHandle {
    pub async fn spawn(
        source: Box<dyn SensorSource>,
        settings: GestureSettings,
        output_sender: mpsc::Sender<GestureOutput>,
    ) -> Result<Self, GestureError> {
        let (input_sender, input_receiver) = mpsc::channel(256);
        let sampler =
            GestureSampler::create(source, Some(settings.sampler.clone()), input_sender.clone());

        let sampler = match sampler.request_permission() {
            Ok(sampler) => sampler,
            Err(SamplerError::PermissionDenied) => {
                output_sender
                    .send(GestureOutput::Notice(Notice::MotionAccessDenied))
                    .await
                    .map_err(|e| GestureError::ChannelError(e.to_string()))?;
                return Ok(Self {
                    permission: PermissionDecision::Denied,
                    input_sender: None,
                    shutdown: CancellationToken::new(),
                    tasks: Vec::new(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let shutdown = CancellationToken::new();
        let engine = GestureEngine::create(input_receiver, output_sender, settings).activate();

        let engine_shutdown = shutdown.clone();
        let engine_task = tokio::spawn(async move {
            let stopped = engine.run_until_shutdown(engine_shutdown).await;
            debug!("GestureEngine stopped with state {:?}", stopped.into_state());
        });

        let sampler_shutdown = shutdown.clone();
        let sampler_task = tokio::spawn(async move {
            sampler.run_sampling_loop(sampler_shutdown).await;
        });

        info!("Gesture pipeline started");
        Ok(Self {
            permission: PermissionDecision::Granted,
            input_sender: Some(input_sender),
            shutdown,
            tasks: vec![engine_task, sampler_task],
        })
    }

    pub fn permission(&self) -> PermissionDecision {
        self.permission
    }

    pub fn is_enabled(&self) -> bool {
        self.input_sender.is_some()
    }

    /// Sender into the engine's queue, `None` when gestures are disabled
    pub fn input_sender(&self) -> Option<mpsc::Sender<GestureInput>> {
        self.input_sender.clone()
    }

    pub async fn shutdown(&mut self) -> Result<(), GestureError> {
        self.shutdown.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!("Gesture task ended abnormally: {}", e);
                return Err(GestureError::TaskError(e.to_string()));
            }
        }
        Ok(())
    }
}
