//! In-memory pools and factory for exercising the lifecycle without a database.

#![allow(dead_code)]

use async_trait::async_trait;
use pg_topology::{ConnectionPool, PoolConnection, PoolError, PoolFactory, PoolSettings};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type EventLog = Arc<Mutex<Vec<String>>>;

/// How a fake pool behaves when probed or drained.
#[derive(Clone, Debug, Default)]
pub struct Behaviour {
    pub probe_delay: Duration,
    pub close_delay: Duration,
    pub fail_acquire: Option<String>,
    pub fail_execute: Option<String>,
    pub fail_close: Option<String>,
}

impl Behaviour {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn probe_delay(mut self, millis: u64) -> Self {
        self.probe_delay = Duration::from_millis(millis);
        self
    }

    pub fn close_delay(mut self, millis: u64) -> Self {
        self.close_delay = Duration::from_millis(millis);
        self
    }

    pub fn fail_acquire(mut self, reason: &str) -> Self {
        self.fail_acquire = Some(reason.into());
        self
    }

    pub fn fail_execute(mut self, reason: &str) -> Self {
        self.fail_execute = Some(reason.into());
        self
    }

    pub fn fail_close(mut self, reason: &str) -> Self {
        self.fail_close = Some(reason.into());
        self
    }
}

#[derive(Default)]
pub struct FakeStats {
    pub acquires: AtomicUsize,
    pub releases: AtomicUsize,
    pub drains: AtomicUsize,
    pub executed: Mutex<Vec<String>>,
}

pub struct FakePool {
    pub name: String,
    behaviour: Mutex<Behaviour>,
    pub stats: Arc<FakeStats>,
    closed: AtomicBool,
    events: EventLog,
}

impl FakePool {
    pub fn new(name: &str, behaviour: Behaviour, events: EventLog) -> Self {
        Self {
            name: name.to_string(),
            behaviour: Mutex::new(behaviour),
            stats: Arc::new(FakeStats::default()),
            closed: AtomicBool::new(false),
            events,
        }
    }

    pub fn set_behaviour(&self, behaviour: Behaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    pub fn acquires(&self) -> usize {
        self.stats.acquires.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.stats.releases.load(Ordering::SeqCst)
    }

    pub fn drains(&self) -> usize {
        self.stats.drains.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> Vec<String> {
        self.stats.executed.lock().unwrap().clone()
    }

    fn behaviour(&self) -> Behaviour {
        self.behaviour.lock().unwrap().clone()
    }
}

struct FakeConnection {
    name: String,
    behaviour: Behaviour,
    stats: Arc<FakeStats>,
    events: EventLog,
}

#[async_trait]
impl PoolConnection for FakeConnection {
    async fn execute(&mut self, sql: &str) -> Result<u64, PoolError> {
        tokio::time::sleep(self.behaviour.probe_delay).await;
        self.stats.executed.lock().unwrap().push(sql.to_string());
        if let Some(reason) = &self.behaviour.fail_execute {
            self.events.lock().unwrap().push(format!("probe-failed:{}", self.name));
            return Err(PoolError::Execute(reason.clone()));
        }
        self.events.lock().unwrap().push(format!("probe:{}", self.name));
        Ok(1)
    }

    fn release(self: Box<Self>) {
        self.stats.releases.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectionPool for FakePool {
    async fn acquire(&self) -> Result<Box<dyn PoolConnection>, PoolError> {
        self.stats.acquires.fetch_add(1, Ordering::SeqCst);
        if self.closed.load(Ordering::SeqCst) {
            return Err(PoolError::Closed);
        }
        let behaviour = self.behaviour();
        if let Some(reason) = &behaviour.fail_acquire {
            self.events.lock().unwrap().push(format!("acquire-failed:{}", self.name));
            return Err(PoolError::Acquire(reason.clone()));
        }
        Ok(Box::new(FakeConnection {
            name: self.name.clone(),
            behaviour,
            stats: self.stats.clone(),
            events: self.events.clone(),
        }))
    }

    async fn drain(&self) -> Result<(), PoolError> {
        let behaviour = self.behaviour();
        tokio::time::sleep(behaviour.close_delay).await;
        self.stats.drains.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push(format!("close:{}", self.name));
        if let Some(reason) = behaviour.fail_close {
            return Err(PoolError::Drain(reason));
        }
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Records every pool it builds, along with the merged settings it was given.
#[derive(Default)]
pub struct FakeFactory {
    behaviours: HashMap<String, Behaviour>,
    created: Mutex<Vec<Arc<FakePool>>>,
    settings: Mutex<Vec<(String, PoolSettings)>>,
    pub events: EventLog,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, behaviour: Behaviour) -> Self {
        self.behaviours.insert(name.to_string(), behaviour);
        self
    }

    pub fn created_names(&self) -> Vec<String> {
        self.created.lock().unwrap().iter().map(|p| p.name.clone()).collect()
    }

    pub fn pool(&self, name: &str) -> Arc<FakePool> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .unwrap_or_else(|| panic!("no pool named {}", name))
    }

    pub fn settings_for(&self, name: &str) -> PoolSettings {
        self.settings
            .lock()
            .unwrap()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s.clone())
            .unwrap_or_else(|| panic!("no settings for {}", name))
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl PoolFactory for FakeFactory {
    fn create_pool(&self, name: &str, settings: &PoolSettings) -> Arc<dyn ConnectionPool> {
        let behaviour = self.behaviours.get(name).cloned().unwrap_or_default();
        let pool = Arc::new(FakePool::new(name, behaviour, self.events.clone()));
        self.created.lock().unwrap().push(pool.clone());
        self.settings
            .lock()
            .unwrap()
            .push((name.to_string(), settings.clone()));
        pool
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("pg_topology=debug"))
        .with_test_writer()
        .try_init();
}
