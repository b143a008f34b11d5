use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use super::GraphicsDevice;

/// A deferred GPU mutation, run on the graphics thread.
pub type Command = Box<dyn FnOnce(&mut GraphicsDevice) -> anyhow::Result<()> + Send>;

type Shared = Arc<Mutex<VecDeque<Command>>>;

/// Cloneable, thread-safe producer side of a device's command queue.
#[derive(Clone)]
pub struct CommandSender {
    shared: Shared,
}

impl CommandSender {
    /// Queues `command` to run at the next `GraphicsDevice::drain_commands`.
    pub fn enqueue<F>(&self, command: F)
    where
        F: FnOnce(&mut GraphicsDevice) -> anyhow::Result<()> + Send + 'static,
    {
        self.shared.lock().push_back(Box::new(command));
    }

    pub fn pending(&self) -> usize {
        self.shared.lock().len()
    }
}

impl std::fmt::Debug for CommandSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSender").field("pending", &self.pending()).finish()
    }
}

/// Consumer side, owned by `GraphicsDevice`.
#[derive(Default)]
pub(crate) struct CommandQueue {
    shared: Shared,
}

impl CommandQueue {
    pub(crate) fn sender(&self) -> CommandSender {
        CommandSender { shared: Arc::clone(&self.shared) }
    }

    pub(crate) fn pending(&self) -> usize {
        self.shared.lock().len()
    }

    /// Everything queued so far. Commands enqueued after this call wait for
    /// the next take.
    pub(crate) fn take_batch(&self) -> VecDeque<Command> {
        std::mem::take(&mut *self.shared.lock())
    }

    /// Puts the unrun tail of a failed batch back in front of anything
    /// enqueued meanwhile, preserving FIFO order.
    pub(crate) fn requeue_front(&self, mut rest: VecDeque<Command>) {
        let mut queue = self.shared.lock();
        rest.append(&mut queue);
        *queue = rest;
    }
}
