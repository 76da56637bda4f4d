//! Tab registry
//!
//! The set of open tabs, their order, and which one is selected. All three
//! live behind one lock so readers never see the order and the id map
//! disagree. Every mutation enqueues its notifications while still holding
//! the lock, which makes the UI loop's delivery order equal the mutation
//! order.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use url::Url;

use tabstrip_session::{PersistJob, PersistScheduler, SessionError};
use tabstrip_storage::TabRecord;
use tabstrip_tabs::{LoadFlags, Tab, TabEvent, TabId};

use crate::bridge::EngineChannel;
use crate::config::Config;
use crate::error::CoreError;
use crate::fanout::{
    Bookkeeping, EventData, Fanout, ListenerId, Notification, TabsChangedListener, UiLoop,
};
use crate::host::{HostContext, HostId, SyncState};
use crate::message::{LoadRequest, OutboundMessage, NO_PARENT};
use crate::Result;

#[derive(Default)]
struct RegistryState {
    order: Vec<Arc<Tab>>,
    tabs: HashMap<TabId, Arc<Tab>>,
    selected: Option<TabId>,
}

impl RegistryState {
    fn selected_tab(&self) -> Option<Arc<Tab>> {
        self.selected.and_then(|id| self.tabs.get(&id).cloned())
    }

    fn index_of(&self, id: TabId) -> Option<usize> {
        self.order.iter().rposition(|t| t.id() == id)
    }

    fn next_from(&self, index: usize, private: bool) -> Option<Arc<Tab>> {
        self.order[index + 1..]
            .iter()
            .find(|t| t.is_private() == private)
            .cloned()
    }

    fn previous_from(&self, index: usize, private: bool) -> Option<Arc<Tab>> {
        self.order[..index]
            .iter()
            .rev()
            .find(|t| t.is_private() == private)
            .cloned()
    }

    fn records(&self) -> Vec<TabRecord> {
        self.order
            .iter()
            .enumerate()
            .map(|(position, tab)| TabRecord {
                tab_id: tab.id(),
                parent_id: tab.parent_id(),
                url: tab.url(),
                title: tab.title(),
                is_private: tab.is_private(),
                position,
                last_used: tab.updated_at(),
            })
            .collect()
    }
}

struct AttachedHost {
    context: HostContext,
    scheduler: Arc<PersistScheduler>,
    account_task: Option<JoinHandle<()>>,
}

impl AttachedHost {
    fn shutdown(mut self, flush: bool) {
        self.scheduler.cancel();
        if let Some(task) = self.account_task.take() {
            task.abort();
        }
        if flush {
            self.scheduler.persist_now();
        }
    }
}

struct RegistryInner {
    state: Mutex<RegistryState>,
    initial_tabs_added: AtomicBool,
    /// Next id to hand out. Wider than `TabId` so that running past
    /// `TabId::MAX` is seen instead of wrapping.
    next_id: AtomicI64,
    fanout: Fanout,
    channel: Arc<dyn EngineChannel>,
    config: Config,
    host: Mutex<Option<AttachedHost>>,
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        if let Some(host) = self.host.get_mut().take() {
            host.shutdown(false);
        }
    }
}

impl Bookkeeping for RegistryInner {
    fn before_dispatch(&self, notification: &Notification) {
        if notification.event == TabEvent::Restored {
            self.initial_tabs_added.store(true, Ordering::SeqCst);
        }

        if notification.event.schedules_persist() {
            if let Some(host) = self.host.lock().as_ref() {
                host.scheduler.schedule();
            }
        }
    }
}

/// Handle to the tab registry. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct TabRegistry {
    inner: Arc<RegistryInner>,
}

impl TabRegistry {
    /// Create a registry together with the loop that delivers its
    /// notifications. Drive the loop on the UI thread.
    pub fn new(config: Config, channel: Arc<dyn EngineChannel>) -> (Self, UiLoop) {
        let (fanout, rx) = Fanout::channel();
        let listeners = fanout.listeners();

        let inner = Arc::new(RegistryInner {
            state: Mutex::new(RegistryState::default()),
            initial_tabs_added: AtomicBool::new(false),
            next_id: AtomicI64::new(0),
            fanout,
            channel,
            config,
            host: Mutex::new(None),
        });

        let bookkeeping: Weak<dyn Bookkeeping> = Arc::downgrade(&inner) as Weak<dyn Bookkeeping>;
        let ui = UiLoop::new(rx, listeners, bookkeeping);

        (Self { inner }, ui)
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    // ---- Host binding ----

    /// Bind to a host. Attaching the same host twice is a no-op; attaching
    /// a different one detaches the current host first.
    pub fn attach(&self, host: HostContext) {
        let mut slot = self.inner.host.lock();

        if let Some(current) = slot.as_ref() {
            if current.context.id() == host.id() {
                tracing::debug!(host_id = host.id().0, "Already attached to host");
                return;
            }
        }

        if let Some(previous) = slot.take() {
            tracing::info!(host_id = previous.context.id().0, "Detaching previous host");
            previous.shutdown(self.inner.config.flush_on_detach);
        }

        let scheduler = Arc::new(PersistScheduler::new(
            host.runtime().clone(),
            self.inner.config.persist_delay(),
            self.persist_job(&host),
        ));

        let account_task = host.sync_state().map(|mut accounts| {
            let scheduler = Arc::clone(&scheduler);
            host.runtime().spawn(async move {
                while accounts.changed().await.is_ok() {
                    tracing::debug!("Sync accounts changed, persisting tabs");
                    scheduler.persist_now();
                }
            })
        });

        tracing::info!(host_id = host.id().0, "Attached tab registry to host");

        *slot = Some(AttachedHost {
            context: host,
            scheduler,
            account_task,
        });
    }

    /// Unbind from `host`. Returns false if a different host (or none) is
    /// attached.
    pub fn detach(&self, host: HostId) -> bool {
        let attached = {
            let mut slot = self.inner.host.lock();
            if slot.as_ref().is_some_and(|current| current.context.id() == host) {
                slot.take()
            } else {
                None
            }
        };

        match attached {
            Some(attached) => {
                attached.shutdown(self.inner.config.flush_on_detach);
                tracing::info!(host_id = host.0, "Detached tab registry from host");
                true
            }
            None => false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.inner.host.lock().is_some()
    }

    pub fn host(&self) -> Result<HostContext> {
        self.inner
            .host
            .lock()
            .as_ref()
            .map(|h| h.context.clone())
            .ok_or(CoreError::NotAttached)
    }

    fn persist_job(&self, host: &HostContext) -> PersistJob {
        let registry = Arc::downgrade(&self.inner);
        let sink = host.sink();
        let accounts = host.sync_state();

        Arc::new(move || -> tabstrip_session::Result<()> {
            if let Some(accounts) = &accounts {
                if *accounts.borrow() == SyncState::NotConfigured {
                    return Err(SessionError::SyncNotConfigured);
                }
            }

            // Registry gone: nothing left to write
            let Some(inner) = registry.upgrade() else {
                return Ok(());
            };

            let records = inner.state.lock().records();
            sink.persist_tabs(&records)?;
            Ok(())
        })
    }

    /// Write the tab strip now on the host's background runtime
    pub fn persist_all_tabs(&self) -> Result<()> {
        let host = self.inner.host.lock();
        let attached = host.as_ref().ok_or(CoreError::NotAttached)?;
        attached.scheduler.persist_now();
        Ok(())
    }

    /// Whether a debounced flush is waiting to run
    pub fn persist_pending(&self) -> bool {
        self.inner
            .host
            .lock()
            .as_ref()
            .is_some_and(|h| h.scheduler.is_pending())
    }

    // ---- Listeners ----

    pub fn register_listener(&self, listener: Arc<dyn TabsChangedListener>) -> ListenerId {
        self.inner.fanout.register(listener)
    }

    pub fn unregister_listener(&self, id: ListenerId) -> bool {
        self.inner.fanout.unregister(id)
    }

    /// Enqueue a notification for the UI loop
    pub fn notify_listeners(&self, tab: Option<Arc<Tab>>, event: TabEvent, data: EventData) {
        self.inner.fanout.notify(tab, event, data);
    }

    /// Whether the first RESTORED notification has been delivered
    pub fn initial_tabs_restored(&self) -> bool {
        self.inner.initial_tabs_added.load(Ordering::SeqCst)
    }

    // ---- Mutations ----

    /// Allocate an id no tab in this registry has used. Ids are never
    /// reused; once `TabId::MAX` is taken allocation fails.
    pub fn next_tab_id(&self) -> Result<TabId> {
        self.inner
            .next_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n <= i64::from(TabId::MAX)).then_some(n + 1)
            })
            .ok()
            .and_then(|n| TabId::try_from(n).ok())
            .ok_or(CoreError::TabIdsExhausted)
    }

    pub fn add_tab(
        &self,
        id: TabId,
        url: Option<String>,
        external: bool,
        parent_id: Option<TabId>,
        title: String,
        is_private: bool,
    ) -> Arc<Tab> {
        let mut state = self.inner.state.lock();
        self.add_tab_locked(&mut state, id, url, external, parent_id, title, is_private)
    }

    #[allow(clippy::too_many_arguments)]
    fn add_tab_locked(
        &self,
        state: &mut RegistryState,
        id: TabId,
        url: Option<String>,
        external: bool,
        parent_id: Option<TabId>,
        title: String,
        is_private: bool,
    ) -> Arc<Tab> {
        if let Some(existing) = state.tabs.get(&id) {
            tracing::error!(tab_id = id, "Tab id already registered");
            return Arc::clone(existing);
        }

        // Keep locally allocated ids clear of ids the engine picked
        self.inner
            .next_id
            .fetch_max(i64::from(id) + 1, Ordering::SeqCst);

        let tab = Arc::new(Tab::new(id, url, external, parent_id, title, is_private));
        state.order.push(Arc::clone(&tab));
        state.tabs.insert(id, Arc::clone(&tab));

        tracing::info!(tab_id = id, private = is_private, "Tab added");

        // No ADDED while the session is being restored
        if self.inner.initial_tabs_added.load(Ordering::SeqCst) {
            self.inner
                .fanout
                .notify(Some(Arc::clone(&tab)), TabEvent::Added, EventData::None);
        }

        tab
    }

    pub fn remove_tab(&self, id: TabId) {
        let mut state = self.inner.state.lock();
        Self::remove_tab_locked(&mut state, id);
    }

    fn remove_tab_locked(state: &mut RegistryState, id: TabId) -> Option<Arc<Tab>> {
        let tab = state.tabs.remove(&id)?;
        if let Some(index) = state.index_of(id) {
            state.order.remove(index);
        }
        if state.selected == Some(id) {
            state.selected = None;
        }
        Some(tab)
    }

    /// Select a tab. Returns `None` if it is unknown or already selected.
    pub fn select_tab(&self, id: TabId) -> Option<Arc<Tab>> {
        let mut state = self.inner.state.lock();
        self.select_tab_locked(&mut state, id)
    }

    fn select_tab_locked(&self, state: &mut RegistryState, id: TabId) -> Option<Arc<Tab>> {
        let tab = state.tabs.get(&id).cloned()?;
        if state.selected == Some(id) {
            return None;
        }

        let previous = state.selected_tab();
        state.selected = Some(id);

        tracing::debug!(tab_id = id, previous = ?previous.as_ref().map(|t| t.id()), "Tab selected");

        let fanout = &self.inner.fanout;
        fanout.notify(Some(Arc::clone(&tab)), TabEvent::Selected, EventData::None);
        if let Some(previous) = previous {
            fanout.notify(Some(previous), TabEvent::Unselected, EventData::None);
        }

        self.inner.channel.send(OutboundMessage::Selected { tab_id: id });
        Some(tab)
    }

    /// Close a tab and select the default successor
    pub fn close_tab(&self, tab: &Arc<Tab>) {
        self.close_tab_with_next(tab, None);
    }

    /// Close a tab and select `next` instead of the default successor.
    ///
    /// A `next` that is not registered, or is the closing tab itself, falls
    /// back to the default. Closing the last tab opens the home page.
    pub fn close_tab_with_next(&self, tab: &Arc<Tab>, next: Option<&Arc<Tab>>) {
        let mut state = self.inner.state.lock();
        let id = tab.id();

        if !state.tabs.contains_key(&id) {
            tracing::debug!(tab_id = id, "Close requested for unknown tab");
            return;
        }

        let explicit = next
            .filter(|n| n.id() != id && state.tabs.contains_key(&n.id()))
            .cloned();

        let next = match explicit.or_else(|| Self::next_tab_locked(&state, tab)) {
            Some(next) => Some(next),
            None => {
                let home = self.inner.config.home_url.clone();
                self.load_url_locked(&mut state, &home, None, None, LoadFlags::NEW_TAB)
            }
        };

        if let Some(next) = next {
            self.select_tab_locked(&mut state, next.id());
        }

        let Some(closed) = Self::remove_tab_locked(&mut state, id) else {
            return;
        };
        closed.on_destroy();

        tracing::info!(tab_id = id, "Tab closed");

        self.inner
            .fanout
            .notify(Some(closed), TabEvent::Closed, EventData::None);
        self.inner.channel.send(OutboundMessage::Closed { tab_id: id });
    }

    /// The tab that would be selected if `tab` were closed now
    pub fn get_next_tab(&self, tab: &Arc<Tab>) -> Option<Arc<Tab>> {
        let state = self.inner.state.lock();
        Self::next_tab_locked(&state, tab)
    }

    fn next_tab_locked(state: &RegistryState, tab: &Arc<Tab>) -> Option<Arc<Tab>> {
        if state.selected != Some(tab.id()) {
            return state.selected_tab();
        }

        let private = tab.is_private();
        let index = state.index_of(tab.id())?;

        let mut next = state
            .next_from(index, private)
            .or_else(|| state.previous_from(index, private));

        // Out of private tabs: fall back to the last normal one
        if next.is_none() && private {
            if let Some(last) = state.order.last() {
                next = if last.is_private() {
                    state.previous_from(state.order.len() - 1, false)
                } else {
                    Some(Arc::clone(last))
                };
            }
        }

        let parent = tab.parent_id().and_then(|pid| state.tabs.get(&pid).cloned());
        match parent {
            Some(parent) => match next {
                Some(sibling) if sibling.parent_id() == tab.parent_id() => Some(sibling),
                _ => Some(parent),
            },
            None => next,
        }
    }

    /// Load a URL. With `NEW_TAB`, the tab is created right away and
    /// returned; otherwise the selected tab navigates and `None` is returned.
    pub fn load_url(
        &self,
        url: &str,
        search_engine: Option<&str>,
        parent_id: Option<TabId>,
        flags: LoadFlags,
    ) -> Option<Arc<Tab>> {
        let mut state = self.inner.state.lock();
        self.load_url_locked(&mut state, url, search_engine, parent_id, flags)
    }

    fn load_url_locked(
        &self,
        state: &mut RegistryState,
        url: &str,
        search_engine: Option<&str>,
        parent_id: Option<TabId>,
        flags: LoadFlags,
    ) -> Option<Arc<Tab>> {
        let new_tab = flags.contains(LoadFlags::NEW_TAB);
        let delay_load = flags.contains(LoadFlags::DELAY_LOAD);
        let background = flags.is_background();
        let is_private = flags.contains(LoadFlags::PRIVATE);
        let desktop_mode = flags.contains(LoadFlags::DESKTOP);

        let mut request = LoadRequest {
            url: url.to_string(),
            engine: search_engine.map(str::to_string),
            parent_id: parent_id.unwrap_or(NO_PARENT),
            user_entered: flags.contains(LoadFlags::USER_ENTERED),
            new_tab,
            is_private,
            pinned: flags.contains(LoadFlags::PINNED),
            delay_load,
            desktop_mode,
            selected: !background,
            tab_id: None,
        };

        let added = if new_tab {
            let id = match self.next_tab_id() {
                Ok(id) if !state.tabs.contains_key(&id) => id,
                Ok(id) => {
                    tracing::error!(tab_id = id, url, "Allocated tab id already registered");
                    return None;
                }
                Err(e) => {
                    tracing::error!(error = %e, url, "Cannot open new tab");
                    return None;
                }
            };
            request.tab_id = Some(id);

            // The engine confirms the URL later; only keep it now if it
            // is already an absolute URI
            let tab_url = Url::parse(url).ok().map(|_| url.to_string());

            let tab = self.add_tab_locked(
                state,
                id,
                tab_url,
                flags.contains(LoadFlags::EXTERNAL),
                parent_id,
                url.to_string(),
                is_private,
            );
            tab.set_desktop_mode(desktop_mode);
            Some(tab)
        } else {
            None
        };

        self.inner.channel.send(OutboundMessage::Load(request));

        if let Some(tab) = &added {
            if !background {
                self.select_tab_locked(state, tab.id());
            }
        }

        added
    }

    /// Switch to a tab already showing `url`, or open it in a new tab whose
    /// parent is the selected tab.
    pub fn load_url_in_tab(&self, url: &str) {
        let mut state = self.inner.state.lock();

        let existing = state
            .order
            .iter()
            .find(|t| t.url().as_deref() == Some(url))
            .map(|t| t.id());

        if let Some(id) = existing {
            self.select_tab_locked(&mut state, id);
            return;
        }

        let parent_id = state.selected;
        self.load_url_locked(&mut state, url, None, parent_id, LoadFlags::NEW_TAB);
    }

    // ---- Queries ----

    pub fn get_tab(&self, id: TabId) -> Option<Arc<Tab>> {
        self.inner.state.lock().tabs.get(&id).cloned()
    }

    pub fn selected_tab(&self) -> Option<Arc<Tab>> {
        self.inner.state.lock().selected_tab()
    }

    pub fn is_selected(&self, tab: &Tab) -> bool {
        self.inner.state.lock().selected == Some(tab.id())
    }

    /// Snapshot of the tab strip in display order
    pub fn tabs_in_order(&self) -> Vec<Arc<Tab>> {
        self.inner.state.lock().order.clone()
    }

    /// Id of the first tab showing exactly `url`
    pub fn is_open(&self, url: &str) -> Option<TabId> {
        self.inner
            .state
            .lock()
            .order
            .iter()
            .find(|t| t.url().as_deref() == Some(url))
            .map(|t| t.id())
    }

    pub fn tab_count(&self) -> usize {
        self.inner.state.lock().order.len()
    }

    /// Tabs in the same mode (private or normal) as the selected tab
    pub fn get_display_count(&self) -> usize {
        let state = self.inner.state.lock();
        let private = state.selected_tab().is_some_and(|t| t.is_private());
        state
            .order
            .iter()
            .filter(|t| t.is_private() == private)
            .count()
    }
}

impl std::fmt::Debug for TabRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("TabRegistry")
            .field("tabs", &state.order.len())
            .field("selected", &state.selected)
            .finish()
    }
}
