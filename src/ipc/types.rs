use crate::db;
use crate::events::EventBus;
use crate::session::SessionContext;
use crate::slots::SlotSelection;
use crate::store::{RecordStore, SqliteRecordStore};
use serde::Deserialize;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub store: Option<SqliteRecordStore>,
    pub events: EventBus,
    pub slots: SlotSelection,
    pub session: SessionContext,
    busy_timeout: Duration,
    outbox: Rc<RefCell<Vec<serde_json::Value>>>,
}

impl AppState {
    /// Events published while a request runs are queued and written ahead of
    /// its response line.
    pub fn new(busy_timeout: Duration) -> Self {
        let outbox: Rc<RefCell<Vec<serde_json::Value>>> = Rc::default();
        let mut events = EventBus::new();
        let sink = outbox.clone();
        events.subscribe(move |event| {
            sink.borrow_mut().push(serde_json::to_value(event)?);
            Ok(())
        });
        Self {
            workspace: None,
            store: None,
            events,
            slots: SlotSelection::default(),
            session: SessionContext::default(),
            busy_timeout,
            outbox,
        }
    }

    pub fn take_events(&self) -> Vec<serde_json::Value> {
        std::mem::take(&mut *self.outbox.borrow_mut())
    }

    pub fn open_workspace(&mut self, path: &Path) -> anyhow::Result<()> {
        self.close_workspace();
        let conn = db::open_db(path, self.busy_timeout)?;
        let store = SqliteRecordStore::new(conn);
        store.init()?;
        let session = SessionContext::resume(&store)?;
        info!(
            workspace = %path.to_string_lossy(),
            current = session.current().unwrap_or("-"),
            "workspace opened"
        );
        self.workspace = Some(path.to_path_buf());
        self.store = Some(store);
        self.session = session;
        Ok(())
    }

    fn close_workspace(&mut self) {
        self.store = None;
        self.workspace = None;
        self.slots.clear();
        self.session = SessionContext::default();
    }
}
