use crate::models::state::RecordState;

/// Marshals a task onto the host application's event thread.
///
/// The core never invokes host-facing consumer code directly from a
/// worker thread; every delegate call is wrapped in `run_on_host`.
/// Embedders with a UI thread route the task through their event loop.
pub trait HostDispatcher: Send + Sync {
    fn run_on_host(&self, task: Box<dyn FnOnce() + Send>);
}

/// Outbound event streams of one recorder, owned by the host bridge.
pub trait RecorderDelegate: Send + Sync {
    /// State stream: fired on every lifecycle transition.
    fn on_state_changed(&self, state: RecordState);

    /// Record stream: raw PCM chunks while stream mode is active.
    fn on_audio_chunk(&self, chunk: Vec<u8>);
}

/// Dispatcher that runs tasks inline on the calling thread.
///
/// For hosts without a dedicated event thread, and for tests.
pub struct InlineDispatcher;

impl HostDispatcher for InlineDispatcher {
    fn run_on_host(&self, task: Box<dyn FnOnce() + Send>) {
        task();
    }
}
