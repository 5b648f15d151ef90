use anyhow::{Context, Result};
use pulse_core::TriggerRequest;
use pulse_engine::{
    CheckInService, GoalService, MemoryDispatcher, MemoryStore, ReminderLifecycle,
    ReminderOrchestrator,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;

pub fn pulse_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("PULSE_HOME") {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".pulse"))
}

pub fn ensure_pulse_home() -> Result<PathBuf> {
    let dir = pulse_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// Documents and live triggers, loaded from and saved back to the state directory.
pub struct Session {
    pub store: Arc<MemoryStore>,
    pub dispatcher: Arc<MemoryDispatcher>,
    dir: PathBuf,
}

impl Session {
    pub fn open(cfg: &Config) -> Result<Self> {
        Self::open_in(&ensure_pulse_home()?, cfg)
    }

    pub fn open_in(dir: &Path, cfg: &Config) -> Result<Self> {
        let docs: BTreeMap<String, Value> = read_json(&dir.join("store.json"))?.unwrap_or_default();
        let triggers: Vec<TriggerRequest> =
            read_json(&dir.join("triggers.json"))?.unwrap_or_default();

        let user = Some(cfg.user_id.trim().to_string()).filter(|u| !u.is_empty());
        Ok(Self {
            store: Arc::new(MemoryStore::from_snapshot(user, docs)),
            dispatcher: Arc::new(MemoryDispatcher::with_live(triggers)),
            dir: dir.to_path_buf(),
        })
    }

    pub async fn save(&self) -> Result<()> {
        write_json(&self.dir.join("store.json"), &self.store.snapshot().await)?;
        write_json(&self.dir.join("triggers.json"), &self.dispatcher.live_triggers().await)?;
        Ok(())
    }

    pub fn lifecycle(&self) -> ReminderLifecycle {
        ReminderLifecycle::new(self.dispatcher.clone(), self.store.clone())
    }

    pub fn check_ins(&self, cfg: &Config) -> CheckInService {
        CheckInService::new(self.store.clone())
            .with_reread_delay(Duration::from_millis(cfg.check_in.reread_delay_ms))
    }

    pub fn goals(&self) -> GoalService {
        GoalService::new(self.store.clone(), self.dispatcher.clone())
    }

    pub fn orchestrator(&self, cfg: &Config) -> Result<ReminderOrchestrator> {
        Ok(ReminderOrchestrator::new(
            self.lifecycle(),
            self.check_ins(cfg),
            cfg.reminders.clone(),
            cfg.zone()?,
        ))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(p: &Path) -> Result<Option<T>> {
    if !p.exists() {
        return Ok(None);
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    let value = serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))?;
    Ok(Some(value))
}

fn write_json<T: serde::Serialize>(p: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(p, json).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}
