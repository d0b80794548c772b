//! Trigger-driven schedule engine with restart-safe persistence

use crate::error::AutomationError;
use crate::persistence::{self, ScheduleRecord};
use crate::trigger::Trigger;
use chrono::{Local, NaiveDateTime};
use dashmap::DashMap;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// A zero-argument scheduled action.
pub type TaskFn = Arc<dyn Fn() -> Result<(), AutomationError> + Send + Sync>;

/// Named action table.
///
/// Actions are closures and cannot be serialized, so the persistence
/// layer stores their names and resolves them here on reload. Every
/// action referenced by a schedule must be registered before the engine
/// loads.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: DashMap<String, TaskFn>,
}

impl TaskRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&self, name: impl Into<String>, task: F)
    where
        F: Fn() -> Result<(), AutomationError> + Send + Sync + 'static,
    {
        self.tasks.insert(name.into(), Arc::new(task));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<TaskFn> {
        self.tasks.get(name).map(|entry| entry.value().clone())
    }
}

struct ScheduledTask {
    trigger: Trigger,
    task_name: String,
    action: TaskFn,
}

/// Evaluates every registered trigger once per second and fires the
/// matching actions.
///
/// The task map is persisted on every change and reloaded before any
/// tick runs, so schedules survive a restart. Triggers are pure
/// predicates over the current wall-clock time, so nothing fires
/// retroactively for time the process was down.
pub struct ScheduleEngine {
    tasks: DashMap<String, ScheduledTask>,
    registry: Arc<TaskRegistry>,
    data_path: PathBuf,
    tick_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ScheduleEngine {
    /// Create an engine and load the persisted task map.
    ///
    /// Records whose action name is missing from `registry` are logged
    /// and skipped.
    pub async fn new(data_path: PathBuf, registry: Arc<TaskRegistry>) -> Self {
        let engine = Self {
            tasks: DashMap::new(),
            registry,
            data_path,
            tick_handle: Mutex::new(None),
        };
        engine.load().await;
        engine
    }

    async fn load(&self) {
        let records = persistence::load_schedules(&self.data_path).await;
        for (id, record) in records {
            match self.registry.get(&record.task) {
                Some(action) => {
                    self.tasks.insert(
                        id,
                        ScheduledTask {
                            trigger: record.trigger,
                            task_name: record.task,
                            action,
                        },
                    );
                }
                None => {
                    tracing::warn!(
                        "Skipping schedule '{}': no task registered for '{}'",
                        id,
                        record.task
                    );
                }
            }
        }
    }

    /// Upsert a schedule and persist it durably before returning.
    ///
    /// On persistence failure the insert is rolled back and the error is
    /// returned, so a successful registration is always on disk. The task
    /// is evaluated starting from the next tick.
    pub async fn register(
        &self,
        id: impl Into<String>,
        trigger: Trigger,
        task_name: &str,
    ) -> Result<(), AutomationError> {
        let id = id.into();
        let action = self
            .registry
            .get(task_name)
            .ok_or_else(|| AutomationError::UnknownTask(task_name.to_string()))?;

        let previous = self.tasks.insert(
            id.clone(),
            ScheduledTask {
                trigger,
                task_name: task_name.to_string(),
                action,
            },
        );

        if let Err(e) = self.save().await {
            // Roll back so the in-memory map never runs unpersisted.
            match previous {
                Some(previous) => {
                    self.tasks.insert(id, previous);
                }
                None => {
                    self.tasks.remove(&id);
                }
            }
            return Err(e);
        }

        tracing::info!("Registered schedule '{}' -> task '{}'", id, task_name);
        Ok(())
    }

    /// Remove a schedule and persist the removal. Unknown ids are a no-op.
    pub async fn unregister(&self, id: &str) -> Result<(), AutomationError> {
        if self.tasks.remove(id).is_none() {
            tracing::debug!("Unregister for unknown schedule '{}' ignored", id);
            return Ok(());
        }
        self.save().await?;
        tracing::info!("Unregistered schedule '{}'", id);
        Ok(())
    }

    async fn save(&self) -> Result<(), AutomationError> {
        let records: HashMap<String, ScheduleRecord> = self
            .tasks
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    ScheduleRecord {
                        trigger: entry.value().trigger.clone(),
                        task: entry.value().task_name.clone(),
                    },
                )
            })
            .collect();
        persistence::save_schedules(&self.data_path, &records).await?;
        Ok(())
    }

    /// Evaluate every registered trigger against `now` and invoke the
    /// matching actions.
    ///
    /// A failing action is logged and neither stops the tick nor
    /// unregisters its task; the trigger is simply evaluated again on the
    /// next occurrence.
    pub fn tick(&self, now: NaiveDateTime) {
        // Snapshot matching actions first: an action may itself register
        // or unregister schedules, which must not run under the map locks.
        let due: Vec<(String, TaskFn)> = self
            .tasks
            .iter()
            .filter(|entry| entry.value().trigger.matches(now))
            .map(|entry| (entry.key().clone(), entry.value().action.clone()))
            .collect();

        for (id, action) in due {
            tracing::debug!("Schedule '{}' fired", id);
            if let Err(e) = action() {
                tracing::error!("Scheduled task '{}' failed: {}", id, e);
            }
        }
    }

    /// Start the one-second evaluation tick.
    pub fn run(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                engine.tick(Local::now().naive_local());
            }
        });
        let mut guard = self.tick_handle.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(old) = guard.replace(handle) {
            old.abort();
        }
    }

    /// Stop the evaluation tick. Registered tasks stay in place.
    pub fn shutdown(&self) {
        let mut guard = self.tick_handle.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = guard.take() {
            handle.abort();
        }
    }

    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }
}

impl Drop for ScheduleEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_registry() -> (Arc<TaskRegistry>, Arc<AtomicUsize>) {
        let registry = Arc::new(TaskRegistry::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        registry.register("count", move || {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        (registry, counter)
    }

    fn eight_oclock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn registered_task_fires_on_matching_tick() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, counter) = counting_registry();
        let engine = ScheduleEngine::new(dir.path().join("schedules.json"), registry).await;

        engine
            .register(
                "wakeup",
                Trigger::Daily {
                    time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                },
                "count",
            )
            .await
            .unwrap();

        engine.tick(eight_oclock() - chrono::Duration::seconds(1));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        engine.tick(eight_oclock());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn register_with_unknown_task_fails() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScheduleEngine::new(
            dir.path().join("schedules.json"),
            Arc::new(TaskRegistry::new()),
        )
        .await;

        let result = engine
            .register("wakeup", Trigger::EveryMinute, "missing")
            .await;
        assert!(matches!(result, Err(AutomationError::UnknownTask(_))));
        assert_eq!(engine.task_count(), 0);
    }

    #[tokio::test]
    async fn re_register_replaces_previous_task() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, counter) = counting_registry();
        let engine = ScheduleEngine::new(dir.path().join("schedules.json"), registry).await;

        engine
            .register("job", Trigger::EverySecond, "count")
            .await
            .unwrap();
        engine
            .register(
                "job",
                Trigger::Daily {
                    time: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
                },
                "count",
            )
            .await
            .unwrap();

        assert_eq!(engine.task_count(), 1);
        engine.tick(eight_oclock());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn register_rolls_back_when_persistence_fails() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the data directory should be makes every
        // save fail.
        let blocker = dir.path().join("blocker");
        tokio::fs::write(&blocker, "").await.unwrap();
        let (registry, _) = counting_registry();
        let engine = ScheduleEngine::new(blocker.join("schedules.json"), registry).await;

        let result = engine.register("job", Trigger::EverySecond, "count").await;
        assert!(matches!(result, Err(AutomationError::Io(_))));
        assert!(!engine.contains("job"));
        assert_eq!(engine.task_count(), 0);
    }

    #[tokio::test]
    async fn failed_re_register_keeps_the_previous_task() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedules.json");
        let (registry, counter) = counting_registry();
        let engine = ScheduleEngine::new(path.clone(), registry).await;

        engine
            .register(
                "job",
                Trigger::Daily {
                    time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                },
                "count",
            )
            .await
            .unwrap();

        // Occupy the temp file the next save writes through.
        tokio::fs::create_dir_all(path.with_extension("json.tmp"))
            .await
            .unwrap();
        let result = engine.register("job", Trigger::EverySecond, "count").await;
        assert!(matches!(result, Err(AutomationError::Io(_))));

        // The rolled-back entry still carries the original trigger.
        assert!(engine.contains("job"));
        engine.tick(eight_oclock() + chrono::Duration::seconds(30));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        engine.tick(eight_oclock());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unregister_stops_firing_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, counter) = counting_registry();
        let engine = ScheduleEngine::new(dir.path().join("schedules.json"), registry).await;

        engine
            .register("job", Trigger::EverySecond, "count")
            .await
            .unwrap();
        engine.unregister("job").await.unwrap();
        engine.unregister("job").await.unwrap();

        engine.tick(eight_oclock());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_action_does_not_block_other_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, counter) = counting_registry();
        registry.register("broken", || {
            Err(AutomationError::TaskFailed("boom".to_string()))
        });
        let engine = ScheduleEngine::new(dir.path().join("schedules.json"), registry).await;

        engine
            .register("a.broken", Trigger::EverySecond, "broken")
            .await
            .unwrap();
        engine
            .register("b.count", Trigger::EverySecond, "count")
            .await
            .unwrap();

        engine.tick(eight_oclock());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        // The failing task stays registered for the next occurrence.
        assert!(engine.contains("a.broken"));
    }

    #[tokio::test]
    async fn schedules_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedules.json");
        let (registry, counter) = counting_registry();

        {
            let engine = ScheduleEngine::new(path.clone(), registry.clone()).await;
            engine
                .register(
                    "wakeup",
                    Trigger::Daily {
                        time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                    },
                    "count",
                )
                .await
                .unwrap();
        }

        // Simulated restart: fresh engine, same persistence file.
        let engine = ScheduleEngine::new(path, registry).await;
        assert!(engine.contains("wakeup"));

        // Nothing fired retroactively for the downtime gap.
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        engine.tick(eight_oclock());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn load_skips_records_with_unregistered_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedules.json");
        let (registry, _) = counting_registry();

        {
            let engine = ScheduleEngine::new(path.clone(), registry).await;
            engine
                .register("job", Trigger::EveryMinute, "count")
                .await
                .unwrap();
        }

        // Restart with a registry that no longer knows the action.
        let engine = ScheduleEngine::new(path, Arc::new(TaskRegistry::new())).await;
        assert_eq!(engine.task_count(), 0);
    }
}
