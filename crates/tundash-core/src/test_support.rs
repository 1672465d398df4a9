// In-memory backend for unit tests.

#![allow(clippy::unwrap_used)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use serde_json::Map;
use tundash_api::LogFrame;

use crate::backend::{Backend, LogFrames};
use crate::error::CoreError;
use crate::model::{
    AdvancedOptions, Configuration, Endpoint, Port, ProcessStatus, StatusSnapshot,
    TunnelInstance,
};

pub(crate) fn server(id: &str, enabled: bool) -> TunnelInstance {
    TunnelInstance {
        id: id.into(),
        alias: id.to_uppercase(),
        enabled,
        endpoint: Endpoint::Server {
            local_port: Port::from(4567),
            remote_addr: "10.0.0.1".into(),
            remote_port: Port::from(51820),
        },
        tun_local: "192.168.201.1".into(),
        tun_peer: "192.168.201.2".into(),
        advanced: AdvancedOptions::default(),
        extra: Map::new(),
    }
}

pub(crate) fn client(id: &str, enabled: bool) -> TunnelInstance {
    TunnelInstance {
        endpoint: Endpoint::Client {
            local_addr: "127.0.0.1".into(),
            local_port: Port::from(1234),
            remote_addr: "vpn.example.com".into(),
            remote_port: Port::from(4567),
        },
        tun_local: "192.168.200.1".into(),
        tun_peer: "192.168.200.2".into(),
        ..server(id, enabled)
    }
}

pub(crate) fn running(id: &str, pid: u32) -> ProcessStatus {
    ProcessStatus {
        id: id.into(),
        running: true,
        pid: Some(pid),
        ..ProcessStatus::default()
    }
}

pub(crate) fn status_of(processes: Vec<ProcessStatus>) -> StatusSnapshot {
    let mut snapshot = StatusSnapshot::default();
    for p in processes {
        snapshot.processes.insert(p.id.clone(), p);
    }
    snapshot
}

#[derive(Default)]
pub(crate) struct MemoryBackend {
    remote: Mutex<Configuration>,
    pushed: Mutex<Vec<Configuration>>,
    status: Mutex<StatusSnapshot>,
    log_frames: Mutex<Vec<Result<LogFrame, CoreError>>>,
    fail_fetch: AtomicBool,
    fail_status: AtomicBool,
    fail_restart: AtomicBool,
    fail_logs: AtomicBool,
    end_logs: AtomicBool,
    restarts: AtomicUsize,
    status_fetches: AtomicUsize,
}

impl MemoryBackend {
    pub(crate) fn with_config(config: Configuration) -> Self {
        Self {
            remote: Mutex::new(config),
            ..Self::default()
        }
    }

    pub(crate) fn with_servers(servers: Vec<TunnelInstance>) -> Self {
        Self::with_config(Configuration {
            servers,
            ..Configuration::default()
        })
    }

    pub(crate) fn remote(&self) -> Configuration {
        self.remote.lock().unwrap().clone()
    }

    pub(crate) fn pushes(&self) -> Vec<Configuration> {
        self.pushed.lock().unwrap().clone()
    }

    pub(crate) fn push_count(&self) -> usize {
        self.pushed.lock().unwrap().len()
    }

    pub(crate) fn restart_count(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }

    pub(crate) fn status_fetch_count(&self) -> usize {
        self.status_fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn set_status(&self, snapshot: StatusSnapshot) {
        *self.status.lock().unwrap() = snapshot;
    }

    pub(crate) fn set_log_frames(&self, frames: Vec<Result<LogFrame, CoreError>>) {
        *self.log_frames.lock().unwrap() = frames;
    }

    pub(crate) fn fail_fetches(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_status(&self, fail: bool) {
        self.fail_status.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_restart(&self, fail: bool) {
        self.fail_restart.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_logs(&self, fail: bool) {
        self.fail_logs.store(fail, Ordering::SeqCst);
    }

    /// End the log stream after the queued frames instead of holding it open.
    pub(crate) fn end_logs(&self, end: bool) {
        self.end_logs.store(end, Ordering::SeqCst);
    }
}

fn unreachable_backend() -> CoreError {
    CoreError::Transport {
        message: "connection refused".into(),
        status: None,
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn fetch_config(&self) -> Result<Configuration, CoreError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(unreachable_backend());
        }
        Ok(self.remote())
    }

    async fn push_config(&self, config: &Configuration) -> Result<(), CoreError> {
        self.pushed.lock().unwrap().push(config.clone());
        *self.remote.lock().unwrap() = config.clone();
        Ok(())
    }

    async fn fetch_status(&self) -> Result<StatusSnapshot, CoreError> {
        self.status_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_status.load(Ordering::SeqCst) {
            return Err(unreachable_backend());
        }
        Ok(self.status.lock().unwrap().clone())
    }

    async fn restart(&self) -> Result<(), CoreError> {
        self.restarts.fetch_add(1, Ordering::SeqCst);
        if self.fail_restart.load(Ordering::SeqCst) {
            return Err(CoreError::Transport {
                message: "HTTP 500: failed to start processes".into(),
                status: Some(500),
            });
        }
        Ok(())
    }

    async fn open_logs(&self) -> Result<LogFrames, CoreError> {
        if self.fail_logs.load(Ordering::SeqCst) {
            return Err(unreachable_backend());
        }
        let frames = stream::iter(std::mem::take(&mut *self.log_frames.lock().unwrap()));
        if self.end_logs.load(Ordering::SeqCst) {
            Ok(Box::pin(frames))
        } else {
            Ok(Box::pin(frames.chain(stream::pending())))
        }
    }
}
