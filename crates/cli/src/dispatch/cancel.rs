// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! External cancellation of a run.

use crossbeam_channel::{Receiver, Sender};

/// Create a connected cancellation pair.
pub fn cancellation() -> (CancelHandle, CancelToken) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    (CancelHandle { tx }, CancelToken { rx })
}

/// Requests cancellation. Cloneable; any clone may cancel.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Sender<()>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // A full channel means cancellation is already pending.
        let _ = self.tx.try_send(());
    }
}

/// Observed by the dispatcher.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: Receiver<()>,
}

impl CancelToken {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        Self {
            rx: crossbeam_channel::never(),
        }
    }

    pub(super) fn receiver(&self) -> Receiver<()> {
        self.rx.clone()
    }
}
