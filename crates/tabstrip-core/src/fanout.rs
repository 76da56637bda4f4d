//! Notification fanout
//!
//! Registry mutations enqueue a [`Notification`]; the [`UiLoop`] is the
//! single consumer and runs wherever the host keeps its UI thread. Every
//! notification goes through the queue, even when the mutation already
//! happened on the UI thread, so observers see one global order.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

use tabstrip_tabs::{Tab, TabEvent};

/// Extra information attached to a notification
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EventData {
    #[default]
    None,
    /// START: whether the engine wants a progress indicator for this load
    ShowProgress(bool),
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub tab: Option<Arc<Tab>>,
    pub event: TabEvent,
    pub data: EventData,
}

impl Notification {
    pub fn tab_id(&self) -> Option<i32> {
        self.tab.as_ref().map(|t| t.id())
    }
}

/// Observer of registry changes. Always invoked on the UI thread.
pub trait TabsChangedListener: Send + Sync {
    fn on_tab_changed(&self, tab: Option<&Arc<Tab>>, event: TabEvent, data: &EventData);
}

impl<F> TabsChangedListener for F
where
    F: Fn(Option<&Arc<Tab>>, TabEvent, &EventData) + Send + Sync,
{
    fn on_tab_changed(&self, tab: Option<&Arc<Tab>>, event: TabEvent, data: &EventData) {
        self(tab, event, data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ListenerList = Arc<Mutex<Vec<(ListenerId, Arc<dyn TabsChangedListener>)>>>;

/// Process-wide bookkeeping that must run before observers see an event
pub(crate) trait Bookkeeping: Send + Sync {
    fn before_dispatch(&self, notification: &Notification);
}

/// Producer side, owned by the registry
pub(crate) struct Fanout {
    tx: mpsc::UnboundedSender<Notification>,
    listeners: ListenerList,
    next_listener: AtomicU64,
}

impl Fanout {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let fanout = Self {
            tx,
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener: AtomicU64::new(0),
        };
        (fanout, rx)
    }

    pub(crate) fn notify(&self, tab: Option<Arc<Tab>>, event: TabEvent, data: EventData) {
        let notification = Notification { tab, event, data };
        if let Err(e) = self.tx.send(notification) {
            tracing::warn!(
                tab_id = ?e.0.tab_id(),
                event = %e.0.event,
                "UI loop is gone, dropping notification"
            );
        }
    }

    pub(crate) fn register(&self, listener: Arc<dyn TabsChangedListener>) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    pub(crate) fn unregister(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub(crate) fn listeners(&self) -> ListenerList {
        Arc::clone(&self.listeners)
    }
}

/// Consumer side of the notification queue. Drive it from the UI thread.
pub struct UiLoop {
    rx: mpsc::UnboundedReceiver<Notification>,
    listeners: ListenerList,
    bookkeeping: Weak<dyn Bookkeeping>,
}

impl UiLoop {
    pub(crate) fn new(
        rx: mpsc::UnboundedReceiver<Notification>,
        listeners: ListenerList,
        bookkeeping: Weak<dyn Bookkeeping>,
    ) -> Self {
        Self {
            rx,
            listeners,
            bookkeeping,
        }
    }

    /// Dispatch everything queued so far without waiting.
    /// Returns the number of notifications delivered.
    pub fn drain(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(notification) = self.rx.try_recv() {
            self.dispatch(notification);
            delivered += 1;
        }
        delivered
    }

    /// Dispatch until the registry is dropped
    pub async fn run(mut self) {
        while let Some(notification) = self.rx.recv().await {
            self.dispatch(notification);
        }
        tracing::debug!("UI loop finished");
    }

    /// Same as [`UiLoop::run`] for a dedicated, non-async UI thread.
    ///
    /// Must not be called from inside an async runtime.
    pub fn run_blocking(mut self) {
        while let Some(notification) = self.rx.blocking_recv() {
            self.dispatch(notification);
        }
        tracing::debug!("UI loop finished");
    }

    fn dispatch(&self, notification: Notification) {
        if let Some(bookkeeping) = self.bookkeeping.upgrade() {
            bookkeeping.before_dispatch(&notification);
        }

        tracing::debug!(
            tab_id = ?notification.tab_id(),
            event = %notification.event,
            "Dispatching tab notification"
        );

        // Snapshot so listeners may (un)register while being called
        let listeners: Vec<Arc<dyn TabsChangedListener>> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener.on_tab_changed(
                notification.tab.as_ref(),
                notification.event,
                &notification.data,
            );
        }
    }
}
