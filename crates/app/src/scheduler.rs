//! Scheduler — owns the schedule collection and fires schedules.
//!
//! The background loop ([`Scheduler::run`]) blocks on three sources:
//!
//! - the controller signal channel (controller ready, value notifications);
//! - a low-frequency ticker reserved for time based conditions;
//! - a shutdown watch channel.
//!
//! Startup schedules fire once on the first iteration and controller-ready
//! schedules fire once after the first ready signal. Device events are
//! appended to the [`EventLog`] and offered to every schedule as they arrive.
//!
//! [`Scheduler::execute`] is the only way a schedule's script starts. It
//! serialises through the state mutex and never starts a second instance of a
//! schedule whose previous run is still alive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use scripthub_domain::error::{NotFoundError, ScriptHubError, ValidationError};
use scripthub_domain::event::DeviceEvent;
use scripthub_domain::id::ScheduleId;
use scripthub_domain::schedule::{Occasion, Schedule, ScheduleRecord};
use scripthub_domain::time::{Timestamp, now};

use crate::event_log::EventLog;
use crate::ports::{ControllerSignal, ControllerSink, DeviceCatalog, ScheduleStore, ScriptCatalog};
use crate::script_runner::ScriptRunner;

/// Capacity of the controller signal channel.
const SIGNAL_CHANNEL_CAPACITY: usize = 256;

/// Runtime knobs of the scheduler loop.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Period of the ticker evaluating time based conditions.
    pub tick_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(60),
        }
    }
}

/// A schedule together with the runner of its latest launch.
#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    pub schedule: Schedule,
    pub runner: Option<Arc<ScriptRunner>>,
}

impl ScheduleEntry {
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.runner.as_ref().is_some_and(|r| r.is_alive())
    }
}

#[derive(Debug, Default)]
struct SchedulerState {
    entries: Vec<ScheduleEntry>,
    startup_done: bool,
    controller_ready_done: bool,
}

/// Owner of the schedule collection and the event log.
pub struct Scheduler<SS, SC, DC> {
    store: SS,
    scripts: SC,
    devices: DC,
    config: SchedulerConfig,
    state: Mutex<SchedulerState>,
    events: Mutex<EventLog>,
    controller_ready: AtomicBool,
    signal_tx: mpsc::Sender<ControllerSignal>,
    signal_rx: Mutex<Option<mpsc::Receiver<ControllerSignal>>>,
}

impl<SS, SC, DC> Scheduler<SS, SC, DC>
where
    SS: ScheduleStore + Send + Sync,
    SC: ScriptCatalog + Send + Sync,
    DC: DeviceCatalog + Send + Sync,
{
    /// Create an empty scheduler. Call [`load`](Self::load) to restore the
    /// persisted collection.
    pub fn new(store: SS, scripts: SC, devices: DC, config: SchedulerConfig) -> Self {
        let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_CHANNEL_CAPACITY);
        Self {
            store,
            scripts,
            devices,
            config,
            state: Mutex::new(SchedulerState::default()),
            events: Mutex::new(EventLog::new()),
            controller_ready: AtomicBool::new(false),
            signal_tx,
            signal_rx: Mutex::new(Some(signal_rx)),
        }
    }

    /// A sink a controller feed pushes its signals into.
    #[must_use]
    pub fn sink(&self) -> ControllerSink {
        ControllerSink::new(self.signal_tx.clone())
    }

    /// Whether the controller has reported ready.
    #[must_use]
    pub fn is_controller_ready(&self) -> bool {
        self.controller_ready.load(Ordering::SeqCst)
    }

    /// Replace the in-memory collection with the persisted one.
    ///
    /// Device references are resolved against a fresh catalog snapshot;
    /// unresolvable ones load as inert conditions.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the store cannot be read and a validation
    /// error for an unknown condition type or a malformed condition.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self) -> Result<usize, ScriptHubError> {
        let records = self.store.load().await?;
        let catalog = self.devices.catalog().await?;

        let entries = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                Schedule::from_record(ScheduleId::new(index), record, &catalog).map(|schedule| {
                    ScheduleEntry {
                        schedule,
                        runner: None,
                    }
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        let count = entries.len();
        self.state().entries = entries;
        tracing::info!(count, "schedules loaded");
        Ok(count)
    }

    /// Persist the whole collection.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the store cannot be written.
    #[tracing::instrument(skip(self))]
    pub async fn save(&self) -> Result<(), ScriptHubError> {
        let records: Vec<ScheduleRecord> = self
            .state()
            .entries
            .iter()
            .map(|entry| entry.schedule.to_record())
            .collect();
        self.store.save(records).await
    }

    /// Validate, add or replace, and persist a schedule.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty name or an unknown script,
    /// [`NotFoundError`] when replacing an id that does not exist, and a
    /// storage error when persisting fails.
    #[tracing::instrument(skip(self, schedule), fields(name = %schedule.name))]
    pub async fn save_schedule(&self, schedule: Schedule) -> Result<ScheduleId, ScriptHubError> {
        schedule.validate()?;
        if !self.scripts.contains(&schedule.script).await? {
            return Err(ValidationError::UnknownScript(schedule.script).into());
        }
        let id = self.add(schedule)?;
        self.save().await?;
        tracing::info!(%id, "schedule saved");
        Ok(id)
    }

    /// Remove a schedule and persist the collection.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError`] for an unknown id and a storage error when
    /// persisting fails.
    #[tracing::instrument(skip(self))]
    pub async fn delete_schedule(&self, id: ScheduleId) -> Result<(), ScriptHubError> {
        if !self.remove(id) {
            return Err(schedule_not_found(id).into());
        }
        self.save().await?;
        tracing::info!(%id, "schedule deleted");
        Ok(())
    }

    /// Add a schedule to the in-memory collection.
    ///
    /// A schedule without id is appended and receives the next position; one
    /// with an id replaces the schedule at that position, keeping its runner.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError`] when the schedule carries an id outside the
    /// collection.
    pub fn add(&self, mut schedule: Schedule) -> Result<ScheduleId, ScriptHubError> {
        let mut state = self.state();
        match schedule.id {
            Some(id) => {
                let entry = state
                    .entries
                    .get_mut(id.index())
                    .ok_or_else(|| schedule_not_found(id))?;
                schedule.last_triggered = entry.schedule.last_triggered;
                entry.schedule = schedule;
                Ok(id)
            }
            None => {
                let id = ScheduleId::new(state.entries.len());
                schedule.id = Some(id);
                state.entries.push(ScheduleEntry {
                    schedule,
                    runner: None,
                });
                Ok(id)
            }
        }
    }

    /// Remove a schedule from the in-memory collection.
    ///
    /// Every schedule after it moves one position down. Returns whether
    /// anything was removed; a missing id is ignored.
    pub fn remove(&self, id: ScheduleId) -> bool {
        let mut state = self.state();
        if id.index() >= state.entries.len() {
            return false;
        }
        state.entries.remove(id.index());
        for (index, entry) in state.entries.iter_mut().enumerate().skip(id.index()) {
            entry.schedule.id = Some(ScheduleId::new(index));
        }
        true
    }

    #[must_use]
    pub fn exists(&self, id: ScheduleId) -> bool {
        id.index() < self.state().entries.len()
    }

    #[must_use]
    pub fn get(&self, id: ScheduleId) -> Option<Schedule> {
        self.entry(id).map(|entry| entry.schedule)
    }

    #[must_use]
    pub fn entry(&self, id: ScheduleId) -> Option<ScheduleEntry> {
        self.state().entries.get(id.index()).cloned()
    }

    /// Runner of the latest launch of a schedule, if any.
    #[must_use]
    pub fn runner(&self, id: ScheduleId) -> Option<Arc<ScriptRunner>> {
        self.entry(id).and_then(|entry| entry.runner)
    }

    /// Snapshot of the whole collection, in id order.
    #[must_use]
    pub fn schedules(&self) -> Vec<ScheduleEntry> {
        self.state().entries.clone()
    }

    /// Launch the script of a schedule unless its previous run is alive.
    ///
    /// Returns whether a new run was started.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError`] for an unknown id and a validation error when
    /// the script name cannot be turned into a command.
    pub fn execute(&self, id: ScheduleId) -> Result<bool, ScriptHubError> {
        let mut state = self.state();
        let entry = state
            .entries
            .get_mut(id.index())
            .ok_or_else(|| schedule_not_found(id))?;
        self.launch(id, entry)
    }

    /// Start `entry` unless it is running. Callers hold the state lock.
    fn launch(&self, id: ScheduleId, entry: &mut ScheduleEntry) -> Result<bool, ScriptHubError> {
        if entry.is_running() {
            tracing::info!(
                %id,
                name = %entry.schedule.name,
                "schedule still running, not starting again"
            );
            return Ok(false);
        }

        let command = self.scripts.command(&entry.schedule.script)?;
        tracing::info!(
            %id,
            name = %entry.schedule.name,
            script = %entry.schedule.script,
            "starting schedule"
        );
        entry.runner = Some(ScriptRunner::spawn(entry.schedule.script.clone(), command));
        entry.schedule.last_triggered = Some(now());
        Ok(true)
    }

    /// Number of device events ever received.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.events().total_count()
    }

    /// Up to `limit` retained device events, newest first.
    #[must_use]
    pub fn recent_events(&self, limit: usize) -> Vec<DeviceEvent> {
        self.events().recent(limit)
    }

    /// Run the scheduler loop until `shutdown` flips to `true` or its sender
    /// is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let Some(mut signals) = self.take_signals() else {
            tracing::warn!("scheduler loop is already running");
            return;
        };

        tracing::info!("scheduler started");
        self.startup();

        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + self.config.tick_interval,
            self.config.tick_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                signal = signals.recv() => match signal {
                    Some(ControllerSignal::Ready) => self.controller_ready_received(),
                    Some(ControllerSignal::ValueUpdated(event)) => self.handle_event(event),
                    None => break,
                },
                _ = ticker.tick() => self.tick(now()),
            }
        }
        tracing::info!("scheduler stopped");
    }

    /// Fire every startup schedule, once.
    fn startup(&self) {
        {
            let mut state = self.state();
            if state.startup_done {
                return;
            }
            state.startup_done = true;
        }
        self.fire(&Occasion::Startup);
    }

    /// Record readiness and fire every controller-ready schedule, once.
    fn controller_ready_received(&self) {
        self.controller_ready.store(true, Ordering::SeqCst);
        {
            let mut state = self.state();
            if state.controller_ready_done {
                return;
            }
            state.controller_ready_done = true;
        }
        tracing::info!("controller ready");
        self.fire(&Occasion::ControllerReady);
    }

    fn tick(&self, at: Timestamp) {
        self.fire(&Occasion::Tick(at));
    }

    fn handle_event(&self, event: DeviceEvent) {
        self.launch_matching(|schedule| schedule.on_event(&event));
        self.events().add(event);
    }

    fn fire(&self, occasion: &Occasion) {
        self.launch_matching(|schedule| schedule.matches(occasion));
    }

    /// Launch every schedule accepted by `predicate`.
    ///
    /// Matching and launching share one lock acquisition so a concurrent
    /// removal cannot shift positions in between.
    fn launch_matching(&self, predicate: impl Fn(&Schedule) -> bool) {
        let mut state = self.state();
        for (index, entry) in state.entries.iter_mut().enumerate() {
            if !predicate(&entry.schedule) {
                continue;
            }
            let id = ScheduleId::new(index);
            if let Err(err) = self.launch(id, entry) {
                tracing::error!(%id, error = %err, "failed to execute schedule");
            }
        }
    }

    fn take_signals(&self) -> Option<mpsc::Receiver<ControllerSignal>> {
        self.signal_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn events(&self) -> MutexGuard<'_, EventLog> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn schedule_not_found(id: ScheduleId) -> NotFoundError {
    NotFoundError {
        entity: "Schedule",
        id: id.to_string(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::future::Future;

    use scripthub_domain::device::{Catalog, Channel, Device, ParamRef};
    use scripthub_domain::event::EventKind;
    use scripthub_domain::schedule::{Condition, DeviceEventCondition};

    use crate::ports::ScriptCommand;

    // ── In-memory schedule store ───────────────────────────────────

    #[derive(Default)]
    struct InMemoryStore {
        records: Mutex<Option<Vec<ScheduleRecord>>>,
    }

    impl InMemoryStore {
        fn with(records: Vec<ScheduleRecord>) -> Self {
            Self {
                records: Mutex::new(Some(records)),
            }
        }

        fn saved(&self) -> Vec<ScheduleRecord> {
            self.records.lock().unwrap().clone().unwrap_or_default()
        }
    }

    impl ScheduleStore for InMemoryStore {
        fn load(&self) -> impl Future<Output = Result<Vec<ScheduleRecord>, ScriptHubError>> + Send {
            let records = self.saved();
            async move { Ok(records) }
        }

        fn save(
            &self,
            records: Vec<ScheduleRecord>,
        ) -> impl Future<Output = Result<(), ScriptHubError>> + Send {
            *self.records.lock().unwrap() = Some(records);
            async { Ok(()) }
        }
    }

    // ── Shell script catalog ───────────────────────────────────────

    /// Every known script name maps to a shell snippet.
    struct ShellScripts {
        scripts: Vec<(&'static str, &'static str)>,
        launched: Mutex<Vec<String>>,
    }

    impl ShellScripts {
        fn new() -> Self {
            Self {
                scripts: vec![
                    ("backup.sh", "echo backup"),
                    ("slow.sh", "exec sleep 30"),
                    ("quick.sh", "true"),
                ],
                launched: Mutex::new(Vec::new()),
            }
        }

        /// Names passed to `command`, in call order.
        fn launched(&self) -> Vec<String> {
            self.launched.lock().unwrap().clone()
        }
    }

    impl ScriptCatalog for ShellScripts {
        fn list(&self) -> impl Future<Output = Result<Vec<String>, ScriptHubError>> + Send {
            let names = self.scripts.iter().map(|(n, _)| (*n).to_string()).collect();
            async move { Ok(names) }
        }

        fn contains(
            &self,
            name: &str,
        ) -> impl Future<Output = Result<bool, ScriptHubError>> + Send {
            let found = self.scripts.iter().any(|(n, _)| *n == name);
            async move { Ok(found) }
        }

        fn install(
            &self,
            _name: &str,
            _content: Vec<u8>,
        ) -> impl Future<Output = Result<(), ScriptHubError>> + Send {
            async { Ok(()) }
        }

        fn remove(&self, _name: &str) -> impl Future<Output = Result<(), ScriptHubError>> + Send {
            async { Ok(()) }
        }

        fn command(&self, name: &str) -> Result<ScriptCommand, ScriptHubError> {
            self.launched.lock().unwrap().push(name.to_string());
            let body = self
                .scripts
                .iter()
                .find(|(n, _)| *n == name)
                .map_or("exit 127", |(_, body)| *body);
            Ok(ScriptCommand::new("sh").arg("-c").arg(body))
        }
    }

    // ── Static device catalog ──────────────────────────────────────

    struct StaticDevices(Catalog);

    impl DeviceCatalog for StaticDevices {
        fn catalog(&self) -> impl Future<Output = Result<Catalog, ScriptHubError>> + Send {
            let catalog = self.0.clone();
            async move { Ok(catalog) }
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![Device::new("LEQ0000001", "Actuator").channel(
            Channel::new("LEQ0000001:1", "Actuator:1").parameter("STATE", "State"),
        )])
    }

    fn state_ref() -> ParamRef {
        ParamRef::new("LEQ0000001", "LEQ0000001:1", "STATE")
    }

    type TestScheduler = Scheduler<InMemoryStore, ShellScripts, StaticDevices>;

    fn scheduler_with(records: Vec<ScheduleRecord>) -> TestScheduler {
        Scheduler::new(
            InMemoryStore::with(records),
            ShellScripts::new(),
            StaticDevices(catalog()),
            SchedulerConfig::default(),
        )
    }

    fn scheduler() -> TestScheduler {
        scheduler_with(Vec::new())
    }

    fn schedule(name: &str, script: &str, condition: Condition) -> Schedule {
        Schedule::builder()
            .name(name)
            .script(script)
            .condition(condition)
            .build()
            .unwrap()
    }

    fn record(json: serde_json::Value) -> ScheduleRecord {
        serde_json::from_value(json).unwrap()
    }

    fn changed_event(param: ParamRef) -> DeviceEvent {
        let ts = now();
        DeviceEvent {
            time: ts,
            time_changed: ts,
            param,
            value: serde_json::json!(true),
            formatted_value: "on".to_string(),
        }
    }

    async fn wait_for(mut check: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    // ── Collection ─────────────────────────────────────────────────

    #[test]
    fn should_assign_next_position_when_adding_new_schedule() {
        let scheduler = scheduler();
        let a = scheduler
            .add(schedule("a", "quick.sh", Condition::OnStartup))
            .unwrap();
        let b = scheduler
            .add(schedule("b", "quick.sh", Condition::OnStartup))
            .unwrap();
        assert_eq!(a, ScheduleId::new(0));
        assert_eq!(b, ScheduleId::new(1));
        assert_eq!(scheduler.get(b).unwrap().id, Some(b));
    }

    #[test]
    fn should_replace_in_place_when_schedule_has_id() {
        let scheduler = scheduler();
        let id = scheduler
            .add(schedule("a", "quick.sh", Condition::OnStartup))
            .unwrap();

        let mut edited = scheduler.get(id).unwrap();
        edited.name = "renamed".to_string();
        assert_eq!(scheduler.add(edited).unwrap(), id);

        assert_eq!(scheduler.schedules().len(), 1);
        assert_eq!(scheduler.get(id).unwrap().name, "renamed");
    }

    #[test]
    fn should_fail_when_replacing_unknown_id() {
        let scheduler = scheduler();
        let mut orphan = schedule("a", "quick.sh", Condition::OnStartup);
        orphan.id = Some(ScheduleId::new(3));
        let err = scheduler.add(orphan).unwrap_err();
        assert!(matches!(err, ScriptHubError::NotFound(_)));
    }

    #[test]
    fn should_renumber_following_schedules_when_removing() {
        let scheduler = scheduler();
        for name in ["a", "b", "c"] {
            scheduler
                .add(schedule(name, "quick.sh", Condition::OnStartup))
                .unwrap();
        }

        assert!(scheduler.remove(ScheduleId::new(0)));

        assert!(scheduler.exists(ScheduleId::new(1)));
        assert!(!scheduler.exists(ScheduleId::new(2)));
        let b = scheduler.get(ScheduleId::new(0)).unwrap();
        assert_eq!(b.name, "b");
        assert_eq!(b.id, Some(ScheduleId::new(0)));
        assert_eq!(
            scheduler.get(ScheduleId::new(1)).unwrap().id,
            Some(ScheduleId::new(1))
        );
    }

    #[test]
    fn should_ignore_remove_when_id_is_missing() {
        let scheduler = scheduler();
        assert!(!scheduler.remove(ScheduleId::new(5)));
    }

    // ── Persistence ────────────────────────────────────────────────

    #[tokio::test]
    async fn should_load_empty_collection_when_nothing_is_stored() {
        let scheduler = Scheduler::new(
            InMemoryStore::default(),
            ShellScripts::new(),
            StaticDevices(catalog()),
            SchedulerConfig::default(),
        );
        assert_eq!(scheduler.load().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn should_fail_load_when_condition_type_is_unknown() {
        let scheduler = scheduler_with(vec![record(serde_json::json!({
            "name": "x", "script": "quick.sh",
            "conditions": [{"type_name": "on_moonrise"}]
        }))]);
        let err = scheduler.load().await.unwrap_err();
        assert!(matches!(
            err,
            ScriptHubError::Validation(ValidationError::UnknownConditionType(_))
        ));
    }

    #[tokio::test]
    async fn should_load_stale_reference_without_blocking_other_schedules() {
        let scheduler = scheduler_with(vec![
            record(serde_json::json!({
                "name": "stale", "script": "quick.sh",
                "conditions": [{
                    "type_name": "on_device_event", "device_address": "GONE",
                    "channel_address": "GONE:1", "param_id": "STATE", "event_type": "changed"
                }]
            })),
            record(serde_json::json!({
                "name": "fine", "script": "quick.sh",
                "conditions": [{"type_name": "on_startup"}]
            })),
        ]);

        assert_eq!(scheduler.load().await.unwrap(), 2);
        assert_eq!(scheduler.get(ScheduleId::new(1)).unwrap().name, "fine");
    }

    #[tokio::test]
    async fn should_reject_save_when_script_is_unknown() {
        let scheduler = scheduler();
        let err = scheduler
            .save_schedule(schedule("x", "nope.sh", Condition::OnStartup))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScriptHubError::Validation(ValidationError::UnknownScript(_))
        ));
        assert!(scheduler.schedules().is_empty());
    }

    #[tokio::test]
    async fn should_persist_whole_collection_when_saving_schedule() {
        let scheduler = scheduler();
        scheduler
            .save_schedule(schedule("a", "quick.sh", Condition::OnStartup))
            .await
            .unwrap();
        scheduler
            .save_schedule(schedule("b", "backup.sh", Condition::OnControllerReady))
            .await
            .unwrap();

        let saved = scheduler.store.saved();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[1].name, "b");
        assert_eq!(saved[1].conditions[0].type_name, "on_controller_ready");
    }

    #[tokio::test]
    async fn should_persist_removal_when_deleting_schedule() {
        let scheduler = scheduler();
        scheduler
            .save_schedule(schedule("a", "quick.sh", Condition::OnStartup))
            .await
            .unwrap();

        scheduler.delete_schedule(ScheduleId::new(0)).await.unwrap();

        assert!(scheduler.store.saved().is_empty());
        let err = scheduler
            .delete_schedule(ScheduleId::new(0))
            .await
            .unwrap_err();
        assert!(matches!(err, ScriptHubError::NotFound(_)));
    }

    // ── Execution ──────────────────────────────────────────────────

    #[tokio::test]
    async fn should_start_runner_and_stamp_last_triggered() {
        let scheduler = scheduler();
        let id = scheduler
            .add(schedule("backup", "backup.sh", Condition::OnStartup))
            .unwrap();

        assert!(scheduler.execute(id).unwrap());

        let entry = scheduler.entry(id).unwrap();
        assert!(entry.runner.is_some());
        assert!(entry.schedule.last_triggered.is_some());
        let runner = entry.runner.unwrap();
        wait_for(|| !runner.is_alive()).await;
        assert_eq!(runner.output(), vec!["backup".to_string()]);
    }

    #[tokio::test]
    async fn should_not_start_again_while_previous_run_is_alive() {
        let scheduler = scheduler();
        let id = scheduler
            .add(schedule("slow", "slow.sh", Condition::OnStartup))
            .unwrap();

        assert!(scheduler.execute(id).unwrap());
        let first = scheduler.runner(id).unwrap();
        let first_triggered = scheduler.get(id).unwrap().last_triggered;

        assert!(!scheduler.execute(id).unwrap());
        assert!(Arc::ptr_eq(&first, &scheduler.runner(id).unwrap()));
        assert_eq!(scheduler.get(id).unwrap().last_triggered, first_triggered);

        first.abort().await.unwrap();
    }

    #[tokio::test]
    async fn should_start_again_once_previous_run_finished() {
        let scheduler = scheduler();
        let id = scheduler
            .add(schedule("quick", "quick.sh", Condition::OnStartup))
            .unwrap();

        scheduler.execute(id).unwrap();
        let first = scheduler.runner(id).unwrap();
        wait_for(|| !first.is_alive()).await;

        assert!(scheduler.execute(id).unwrap());
        assert!(!Arc::ptr_eq(&first, &scheduler.runner(id).unwrap()));
    }

    #[tokio::test]
    async fn should_fail_execute_when_id_is_unknown() {
        let err = scheduler().execute(ScheduleId::new(0)).unwrap_err();
        assert!(matches!(err, ScriptHubError::NotFound(_)));
    }

    #[tokio::test]
    async fn should_keep_runner_when_schedule_is_replaced() {
        let scheduler = scheduler();
        let id = scheduler
            .add(schedule("slow", "slow.sh", Condition::OnStartup))
            .unwrap();
        scheduler.execute(id).unwrap();

        let mut edited = scheduler.get(id).unwrap();
        edited.name = "still slow".to_string();
        scheduler.add(edited).unwrap();

        let entry = scheduler.entry(id).unwrap();
        assert!(entry.is_running());
        assert!(entry.schedule.last_triggered.is_some());

        assert!(scheduler.runner(id).unwrap().abort().await.unwrap());
    }

    // ── Loop ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn should_run_persisted_startup_schedule_exactly_once() {
        let scheduler = Arc::new(scheduler_with(vec![record(serde_json::json!({
            "name": "backup", "keep_running": false, "script": "backup.sh",
            "conditions": [{"type_name": "on_startup"}]
        }))]));
        scheduler.load().await.unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let looping = Arc::clone(&scheduler);
        let handle = tokio::spawn(async move { looping.run(shutdown_rx).await });

        wait_for(|| scheduler.runner(ScheduleId::new(0)).is_some()).await;
        let first = scheduler.runner(ScheduleId::new(0)).unwrap();
        wait_for(|| !first.is_alive()).await;

        // Later signals must not fire the startup phase again.
        assert!(scheduler.sink().ready().await);
        wait_for(|| scheduler.is_controller_ready()).await;
        let after = scheduler.runner(ScheduleId::new(0)).unwrap();
        assert!(Arc::ptr_eq(&first, &after));

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn should_fire_controller_ready_schedules_once() {
        let scheduler = Arc::new(scheduler());
        let id = scheduler
            .add(schedule("ready", "quick.sh", Condition::OnControllerReady))
            .unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let looping = Arc::clone(&scheduler);
        let handle = tokio::spawn(async move { looping.run(shutdown_rx).await });

        assert!(scheduler.runner(id).is_none());
        let sink = scheduler.sink();
        assert!(sink.ready().await);
        wait_for(|| scheduler.runner(id).is_some()).await;
        let first = scheduler.runner(id).unwrap();
        wait_for(|| !first.is_alive()).await;

        assert!(sink.ready().await);
        // Push an event through the channel to know the second ready was consumed.
        assert!(sink.value_updated(changed_event(state_ref())).await);
        wait_for(|| scheduler.event_count() == 1).await;
        assert!(Arc::ptr_eq(&first, &scheduler.runner(id).unwrap()));

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn should_log_events_and_fire_matching_device_schedules() {
        let scheduler = Arc::new(scheduler());
        let watched =
            DeviceEventCondition::new(&catalog(), state_ref(), EventKind::Changed).unwrap();
        let hit = scheduler
            .add(schedule("hit", "quick.sh", Condition::OnDeviceEvent(watched)))
            .unwrap();
        let miss = scheduler
            .add(schedule("miss", "quick.sh", Condition::OnControllerReady))
            .unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let looping = Arc::clone(&scheduler);
        let handle = tokio::spawn(async move { looping.run(shutdown_rx).await });

        let sink = scheduler.sink();
        assert!(sink.value_updated(changed_event(ParamRef::new("X", "X:1", "STATE"))).await);
        assert!(sink.value_updated(changed_event(state_ref())).await);
        wait_for(|| scheduler.event_count() == 2).await;

        assert!(scheduler.runner(hit).is_some());
        assert!(scheduler.runner(miss).is_none());
        let recent = scheduler.recent_events(10);
        assert_eq!(recent[0].param, state_ref());

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn should_launch_only_matching_schedule_while_positions_shift() {
        let scheduler = scheduler();
        scheduler
            .add(schedule("other", "backup.sh", Condition::OnStartup))
            .unwrap();
        let watched =
            DeviceEventCondition::new(&catalog(), state_ref(), EventKind::Changed).unwrap();
        scheduler
            .add(schedule("watched", "quick.sh", Condition::OnDeviceEvent(watched)))
            .unwrap();

        std::thread::scope(|scope| {
            // keep rotating the collection so every id keeps changing owner
            scope.spawn(|| {
                for _ in 0..1000 {
                    let mut first = scheduler.get(ScheduleId::new(0)).unwrap();
                    scheduler.remove(ScheduleId::new(0));
                    first.id = None;
                    scheduler.add(first).unwrap();
                }
            });
            for _ in 0..1000 {
                scheduler.handle_event(changed_event(state_ref()));
            }
        });

        let launched = scheduler.scripts.launched();
        assert!(!launched.is_empty());
        assert!(launched.iter().all(|script| script == "quick.sh"), "{launched:?}");
    }

    #[tokio::test]
    async fn should_stop_loop_when_shutdown_sender_is_dropped() {
        let scheduler = Arc::new(scheduler());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let looping = Arc::clone(&scheduler);
        let handle = tokio::spawn(async move { looping.run(shutdown_rx).await });

        drop(shutdown_tx);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn should_refuse_second_loop() {
        let scheduler = scheduler();
        let (_tx, rx) = watch::channel(false);
        let _ = scheduler.take_signals();
        // Returns immediately instead of blocking forever.
        tokio::time::timeout(Duration::from_secs(1), scheduler.run(rx))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn should_launch_each_startup_schedule_once() {
        let scheduler = scheduler();
        for name in ["a", "b"] {
            scheduler
                .add(schedule(name, "quick.sh", Condition::OnStartup))
                .unwrap();
        }
        scheduler
            .add(schedule("c", "quick.sh", Condition::OnControllerReady))
            .unwrap();

        scheduler.startup();
        let launched: HashSet<usize> = scheduler
            .schedules()
            .iter()
            .filter(|e| e.runner.is_some())
            .filter_map(|e| e.schedule.id.map(ScheduleId::index))
            .collect();
        assert_eq!(launched, HashSet::from([0, 1]));

        let firsts: Vec<_> = scheduler.schedules().into_iter().map(|e| e.runner).collect();
        scheduler.startup();
        let seconds: Vec<_> = scheduler.schedules().into_iter().map(|e| e.runner).collect();
        for (first, second) in firsts.iter().zip(&seconds) {
            match (first, second) {
                (Some(a), Some(b)) => assert!(Arc::ptr_eq(a, b)),
                (None, None) => {}
                _ => panic!("startup phase ran twice"),
            }
        }
    }
}
