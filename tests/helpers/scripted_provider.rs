// ABOUTME: Scripted CoachProvider that replays token events with pauses for relay tests
// ABOUTME: Records the contexts it receives and whether its stream was dropped or cancelled

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_stream::stream;
use pierre_coach_server::intelligence::CoachContext;
use pierre_coach_server::llm::{CoachProvider, TokenEvent, TokenStream};
use tokio_util::sync::CancellationToken;

/// One step of a provider script
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Emit an event
    Emit(TokenEvent),
    /// Sleep before the next step
    Pause(Duration),
    /// Never produce anything again, until cancelled
    Hang,
}

/// Sets the flag when the token stream is dropped
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Provider replaying a fixed script for every request
pub struct ScriptedProvider {
    script: Vec<ScriptStep>,
    dropped: Arc<AtomicBool>,
    saw_cancel: Arc<AtomicBool>,
    contexts: Arc<Mutex<Vec<CoachContext>>>,
}

impl ScriptedProvider {
    /// Provider that replays `script`
    pub fn new(script: Vec<ScriptStep>) -> Self {
        Self {
            script,
            dropped: Arc::new(AtomicBool::new(false)),
            saw_cancel: Arc::new(AtomicBool::new(false)),
            contexts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Chunks for each delta, then `Done("stop")`
    pub fn completing(deltas: &[&str]) -> Self {
        let mut script: Vec<ScriptStep> = deltas
            .iter()
            .map(|delta| ScriptStep::Emit(TokenEvent::chunk(*delta)))
            .collect();
        script.push(ScriptStep::Emit(TokenEvent::done("stop")));
        Self::new(script)
    }

    /// Whether the last token stream handed out was dropped
    pub fn stream_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Whether the stream observed its cancellation token firing
    pub fn saw_cancel(&self) -> bool {
        self.saw_cancel.load(Ordering::SeqCst)
    }

    /// Contexts received so far
    pub fn contexts(&self) -> Vec<CoachContext> {
        self.contexts.lock().unwrap().clone()
    }
}

impl CoachProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn stream_completion(&self, context: &CoachContext, cancel: CancellationToken) -> TokenStream {
        self.contexts.lock().unwrap().push(context.clone());
        self.dropped.store(false, Ordering::SeqCst);

        let script = self.script.clone();
        let flag = DropFlag(self.dropped.clone());
        let saw_cancel = self.saw_cancel.clone();

        Box::pin(stream! {
            let _flag = flag;
            for step in script {
                match step {
                    ScriptStep::Emit(event) => yield event,
                    ScriptStep::Pause(pause) => tokio::time::sleep(pause).await,
                    ScriptStep::Hang => {
                        cancel.cancelled().await;
                        saw_cancel.store(true, Ordering::SeqCst);
                        return;
                    }
                }
            }
        })
    }
}
