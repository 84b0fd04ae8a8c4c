use std::collections::VecDeque;

/// What an outstanding command was for. Used to interpret its result when
/// the matching command-result event arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    QueryCalls,
    Dial(String),
    Answer,
    Reject,
    Terminate,
    Hold,
    PrivateMode,
    ExplicitTransfer,
    Dtmf,
    NrecDisable,
    VolumeSync,
    SubscriberInfo,
    OperatorName,
    VoiceRecognition,
    VendorProbe,
}

/// Outstanding commands, strictly FIFO.
///
/// The transport delivers exactly one result per command, in submission
/// order, with no ids to correlate on. Results are therefore matched purely
/// by position; nothing is ever removed out of order or left behind.
#[derive(Default)]
pub struct CommandQueue {
    queue: VecDeque<PendingAction>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    pub fn push(&mut self, action: PendingAction) {
        tracing::trace!("queued {:?} ({} outstanding)", action, self.queue.len() + 1);
        self.queue.push_back(action);
    }

    /// Take the oldest outstanding command. None means the peer sent a
    /// result we never asked for; callers log and carry on.
    pub fn pop(&mut self) -> Option<PendingAction> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
