//! PCH task queue - merges pending tasks and dispatches them to schedulers.
//!
//! System PCHs have strict priority. Every [`PchTaskQueue::process_entries`]
//! call first hands system tasks to the system scheduler; project tasks are
//! only dispatched while the system scheduler has nothing in flight, because
//! a project PCH is built on top of its system PCH.

use pchqueue_core::{
    Environment, Error, PchCreator, PchTask, PchTasks, PrecompiledHeaderStorage, ProgressCounter,
    ProjectPartId, Result,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::collection::PchTaskCollection;
use crate::scheduler::{SlotUsage, Task, TaskScheduler, task};

/// How many tasks one tick handed to each scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub system_admitted: usize,
    pub project_admitted: usize,
}

/// Snapshot of pending work and scheduler capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending_system: usize,
    pub pending_project: usize,
    pub system_slots: SlotUsage,
    pub project_slots: SlotUsage,
}

impl QueueStats {
    /// Nothing pending and nothing in flight.
    pub fn is_idle(&self) -> bool {
        self.pending_system == 0
            && self.pending_project == 0
            && self.system_slots.used == 0
            && self.project_slots.used == 0
    }
}

/// Queue of pending system and project PCH tasks.
pub struct PchTaskQueue {
    system_pch_tasks: PchTaskCollection,
    project_pch_tasks: PchTaskCollection,
    system_scheduler: Arc<dyn TaskScheduler>,
    project_scheduler: Arc<dyn TaskScheduler>,
    progress: Arc<dyn ProgressCounter>,
    storage: Arc<dyn PrecompiledHeaderStorage>,
    environment: Arc<dyn Environment>,
}

impl PchTaskQueue {
    pub fn new(
        system_scheduler: Arc<dyn TaskScheduler>,
        project_scheduler: Arc<dyn TaskScheduler>,
        progress: Arc<dyn ProgressCounter>,
        storage: Arc<dyn PrecompiledHeaderStorage>,
        environment: Arc<dyn Environment>,
    ) -> Self {
        Self {
            system_pch_tasks: PchTaskCollection::new(),
            project_pch_tasks: PchTaskCollection::new(),
            system_scheduler,
            project_scheduler,
            progress,
            storage,
            environment,
        }
    }

    /// Queue system PCH tasks. A task replaces a pending one with the same
    /// project part ids.
    pub fn add_system_pch_tasks(&mut self, pch_tasks: PchTasks) {
        Self::add_pch_tasks(pch_tasks, &mut self.system_pch_tasks, self.progress.as_ref());
    }

    /// Queue project PCH tasks. A task replaces a pending one for the same
    /// project part.
    pub fn add_project_pch_tasks(&mut self, pch_tasks: PchTasks) {
        Self::add_pch_tasks(pch_tasks, &mut self.project_pch_tasks, self.progress.as_ref());
    }

    /// Drop pending project tasks of the given project parts. Tasks already
    /// handed to a scheduler are not affected, and neither are system tasks.
    pub fn remove_pch_tasks(&mut self, project_part_ids: &[ProjectPartId]) {
        Self::remove_pch_tasks_by_project_part_id(
            project_part_ids,
            &mut self.project_pch_tasks,
            self.progress.as_ref(),
        );
    }

    /// Dispatch as many pending tasks as the schedulers have free slots for,
    /// system tasks first.
    pub fn process_entries(&mut self) -> TickOutcome {
        let system_admitted = self.process_system_pch_tasks();
        let project_admitted = self.process_project_pch_tasks();

        TickOutcome {
            system_admitted,
            project_admitted,
        }
    }

    pub fn pending_system_tasks(&self) -> usize {
        self.system_pch_tasks.len()
    }

    pub fn pending_project_tasks(&self) -> usize {
        self.project_pch_tasks.len()
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pending_system: self.system_pch_tasks.len(),
            pending_project: self.project_pch_tasks.len(),
            system_slots: self.system_scheduler.slot_usage(),
            project_slots: self.project_scheduler.slot_usage(),
        }
    }

    fn add_pch_tasks(
        new_pch_tasks: PchTasks,
        destination: &mut PchTaskCollection,
        progress: &dyn ProgressCounter,
    ) {
        let submitted = new_pch_tasks.len();
        let added = destination.merge(new_pch_tasks);

        debug!(submitted, added, pending = destination.len(), "Merged PCH tasks");
        progress.add_total(added);
    }

    fn remove_pch_tasks_by_project_part_id(
        project_part_ids: &[ProjectPartId],
        destination: &mut PchTaskCollection,
        progress: &dyn ProgressCounter,
    ) {
        let removed = destination.remove_project_parts(project_part_ids);

        debug!(
            requested = project_part_ids.len(),
            removed,
            pending = destination.len(),
            "Removed PCH tasks"
        );
        progress.remove_total(removed);
    }

    fn process_system_pch_tasks(&mut self) -> usize {
        let free = self.system_scheduler.slot_usage().free;
        let pch_tasks = self.system_pch_tasks.drain_tail(free);
        let count = pch_tasks.len();

        if count > 0 {
            info!(
                count,
                pending = self.system_pch_tasks.len(),
                "Dispatching system PCH tasks"
            );
            self.system_scheduler
                .add_tasks(self.create_system_tasks(pch_tasks));
        }

        count
    }

    fn process_project_pch_tasks(&mut self) -> usize {
        // Reads live usage, so system tasks accepted earlier in this tick
        // already block project work.
        let system_running = self.system_scheduler.slot_usage().used;
        if system_running > 0 {
            if !self.project_pch_tasks.is_empty() {
                debug!(
                    system_running,
                    pending = self.project_pch_tasks.len(),
                    "Holding back project PCH tasks while system PCHs are generated"
                );
            }
            return 0;
        }

        let free = self.project_scheduler.slot_usage().free;
        let pch_tasks = self.project_pch_tasks.drain_tail(free);
        let count = pch_tasks.len();

        if count > 0 {
            info!(
                count,
                pending = self.project_pch_tasks.len(),
                "Dispatching project PCH tasks"
            );
            self.project_scheduler
                .add_tasks(self.create_project_tasks(pch_tasks));
        }

        count
    }

    fn create_project_tasks(&self, pch_tasks: PchTasks) -> Vec<Task> {
        pch_tasks
            .into_iter()
            .map(|pch_task| {
                let storage = self.storage.clone();
                let environment = self.environment.clone();
                task(move |creator| {
                    Box::pin(run_project_task(pch_task, creator, storage, environment))
                })
            })
            .collect()
    }

    fn create_system_tasks(&self, pch_tasks: PchTasks) -> Vec<Task> {
        pch_tasks
            .into_iter()
            .map(|pch_task| {
                let storage = self.storage.clone();
                let environment = self.environment.clone();
                task(move |creator| {
                    Box::pin(run_system_task(pch_task, creator, storage, environment))
                })
            })
            .collect()
    }
}

async fn run_project_task(
    mut pch_task: PchTask,
    creator: &mut dyn PchCreator,
    storage: Arc<dyn PrecompiledHeaderStorage>,
    environment: Arc<dyn Environment>,
) -> Result<()> {
    let project_part_id = pch_task
        .project_part_id()
        .ok_or_else(|| Error::InvalidInput("project PCH task without project part".to_string()))?;

    if pch_task.is_deletion() {
        debug!(%project_part_id, "Deleting project PCH");
        return storage.delete_project_precompiled_header(project_part_id).await;
    }

    pch_task.system_pch_path = storage
        .fetch_system_precompiled_header_path(project_part_id)
        .await?;
    pch_task.pre_include_search_path = environment.pre_include_search_path();

    creator.generate_pch(pch_task).await?;
    let pch = creator.project_part_pch().clone();

    match pch.pch_path {
        Some(path) => {
            debug!(%project_part_id, path = %path.display(), "Storing project PCH");
            storage
                .insert_project_precompiled_header(project_part_id, &path, pch.last_modified)
                .await
        }
        None => {
            debug!(%project_part_id, "No project PCH produced, deleting stored one");
            storage.delete_project_precompiled_header(project_part_id).await
        }
    }
}

async fn run_system_task(
    mut pch_task: PchTask,
    creator: &mut dyn PchCreator,
    storage: Arc<dyn PrecompiledHeaderStorage>,
    environment: Arc<dyn Environment>,
) -> Result<()> {
    let project_part_ids = pch_task.project_part_ids.clone();

    if pch_task.is_deletion() {
        debug!(count = project_part_ids.len(), "Deleting system PCHs");
        return storage
            .delete_system_precompiled_headers(&project_part_ids)
            .await;
    }

    pch_task.pre_include_search_path = environment.pre_include_search_path();

    creator.generate_pch(pch_task).await?;
    let pch = creator.project_part_pch().clone();

    match pch.pch_path {
        Some(path) => {
            debug!(count = project_part_ids.len(), path = %path.display(), "Storing system PCH");
            storage
                .insert_system_precompiled_headers(&project_part_ids, &path, pch.last_modified)
                .await
        }
        None => {
            debug!(count = project_part_ids.len(), "No system PCH produced, deleting stored ones");
            storage
                .delete_system_precompiled_headers(&project_part_ids)
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use pchqueue_core::{PchRecord, ProjectPartPch, SharedProgressCounter, StaticEnvironment};
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    fn id(value: i32) -> ProjectPartId {
        ProjectPartId::new(value)
    }

    fn ids(values: &[i32]) -> Vec<ProjectPartId> {
        values.iter().copied().map(id).collect()
    }

    fn project(value: i32, includes: &[&str]) -> PchTask {
        PchTask::project(id(value), includes.iter().map(PathBuf::from).collect())
    }

    fn system(values: &[i32], includes: &[&str]) -> PchTask {
        PchTask::system(ids(values), includes.iter().map(PathBuf::from).collect())
    }

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    /// Scheduler with a fixed number of slots that keeps the tasks it
    /// accepts instead of running them.
    struct MockScheduler {
        slots: usize,
        accepted: Mutex<Vec<Task>>,
        batches: Mutex<Vec<usize>>,
    }

    impl MockScheduler {
        fn new(slots: usize) -> Arc<Self> {
            Arc::new(Self {
                slots,
                accepted: Mutex::new(Vec::new()),
                batches: Mutex::new(Vec::new()),
            })
        }

        fn take_tasks(&self) -> Vec<Task> {
            std::mem::take(&mut *self.accepted.lock().unwrap())
        }

        fn batches(&self) -> Vec<usize> {
            self.batches.lock().unwrap().clone()
        }
    }

    impl TaskScheduler for MockScheduler {
        fn slot_usage(&self) -> SlotUsage {
            let used = self.accepted.lock().unwrap().len();
            SlotUsage {
                free: self.slots.saturating_sub(used),
                used,
            }
        }

        fn add_tasks(&self, tasks: Vec<Task>) {
            self.batches.lock().unwrap().push(tasks.len());
            self.accepted.lock().unwrap().extend(tasks);
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum StorageCall {
        FetchSystemPath(ProjectPartId),
        InsertProject(ProjectPartId, PathBuf),
        DeleteProject(ProjectPartId),
        InsertSystem(Vec<ProjectPartId>, PathBuf),
        DeleteSystem(Vec<ProjectPartId>),
    }

    #[derive(Default)]
    struct RecordingStorage {
        calls: Mutex<Vec<StorageCall>>,
        system_path: Option<PathBuf>,
        fail_inserts: bool,
    }

    impl RecordingStorage {
        fn calls(&self) -> Vec<StorageCall> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: StorageCall) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl PrecompiledHeaderStorage for RecordingStorage {
        async fn fetch_system_precompiled_header_path(
            &self,
            id: ProjectPartId,
        ) -> Result<Option<PathBuf>> {
            self.record(StorageCall::FetchSystemPath(id));
            Ok(self.system_path.clone())
        }

        async fn fetch_precompiled_header(&self, _id: ProjectPartId) -> Result<Option<PchRecord>> {
            Ok(None)
        }

        async fn insert_project_precompiled_header(
            &self,
            id: ProjectPartId,
            path: &Path,
            last_modified: DateTime<Utc>,
        ) -> Result<()> {
            assert_eq!(last_modified, timestamp());
            if self.fail_inserts {
                return Err(Error::Storage("disk full".to_string()));
            }
            self.record(StorageCall::InsertProject(id, path.to_path_buf()));
            Ok(())
        }

        async fn delete_project_precompiled_header(&self, id: ProjectPartId) -> Result<()> {
            self.record(StorageCall::DeleteProject(id));
            Ok(())
        }

        async fn insert_system_precompiled_headers(
            &self,
            ids: &[ProjectPartId],
            path: &Path,
            last_modified: DateTime<Utc>,
        ) -> Result<()> {
            assert_eq!(last_modified, timestamp());
            self.record(StorageCall::InsertSystem(ids.to_vec(), path.to_path_buf()));
            Ok(())
        }

        async fn delete_system_precompiled_headers(&self, ids: &[ProjectPartId]) -> Result<()> {
            self.record(StorageCall::DeleteSystem(ids.to_vec()));
            Ok(())
        }
    }

    /// Creator that records the tasks it gets and "produces" `output`.
    struct MockCreator {
        output: Option<PathBuf>,
        fail: bool,
        generated: Vec<PchTask>,
        pch: ProjectPartPch,
    }

    impl MockCreator {
        fn producing(output: Option<&str>) -> Self {
            Self {
                output: output.map(PathBuf::from),
                fail: false,
                generated: Vec::new(),
                pch: ProjectPartPch::default(),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::producing(None)
            }
        }
    }

    #[async_trait]
    impl PchCreator for MockCreator {
        async fn generate_pch(&mut self, task: PchTask) -> Result<()> {
            if self.fail {
                return Err(Error::Generation("clang crashed".to_string()));
            }
            let project_part_id = task.project_part_id().unwrap_or_default();
            self.pch = ProjectPartPch {
                project_part_id,
                pch_path: self.output.clone(),
                last_modified: timestamp(),
            };
            self.generated.push(task);
            Ok(())
        }

        fn project_part_pch(&self) -> &ProjectPartPch {
            &self.pch
        }
    }

    struct Fixture {
        queue: PchTaskQueue,
        system_scheduler: Arc<MockScheduler>,
        project_scheduler: Arc<MockScheduler>,
        progress: Arc<SharedProgressCounter>,
        storage: Arc<RecordingStorage>,
    }

    fn fixture(system_slots: usize, project_slots: usize) -> Fixture {
        fixture_with_storage(system_slots, project_slots, RecordingStorage::default())
    }

    fn fixture_with_storage(
        system_slots: usize,
        project_slots: usize,
        storage: RecordingStorage,
    ) -> Fixture {
        let system_scheduler = MockScheduler::new(system_slots);
        let project_scheduler = MockScheduler::new(project_slots);
        let progress = Arc::new(SharedProgressCounter::silent());
        let storage = Arc::new(storage);
        let queue = PchTaskQueue::new(
            system_scheduler.clone(),
            project_scheduler.clone(),
            progress.clone(),
            storage.clone(),
            Arc::new(StaticEnvironment::new("/pre/include")),
        );
        Fixture {
            queue,
            system_scheduler,
            project_scheduler,
            progress,
            storage,
        }
    }

    #[test]
    fn test_add_system_tasks_counts_new_keys() {
        let mut f = fixture(1, 1);

        f.queue.add_system_pch_tasks(vec![system(&[1, 2], &["a.h"]), system(&[3], &["b.h"])]);
        f.queue.add_system_pch_tasks(vec![system(&[1, 2], &["c.h"]), system(&[4], &["d.h"])]);

        assert_eq!(f.queue.pending_system_tasks(), 3);
        assert_eq!(f.queue.pending_project_tasks(), 0);
        assert_eq!(f.progress.snapshot(), (0, 3));
    }

    #[test]
    fn test_add_project_tasks_counts_new_keys() {
        let mut f = fixture(1, 1);

        f.queue.add_project_pch_tasks(vec![project(1, &["a.h"])]);
        f.queue.add_project_pch_tasks(vec![project(1, &["b.h"]), project(2, &["c.h"])]);

        assert_eq!(f.queue.pending_project_tasks(), 2);
        assert_eq!(f.progress.snapshot(), (0, 2));
    }

    #[test]
    fn test_remove_pch_tasks() {
        let mut f = fixture(1, 1);
        f.queue.add_project_pch_tasks(vec![
            project(3, &["a.h"]),
            project(5, &["b.h"]),
            project(7, &["c.h"]),
        ]);

        f.queue.remove_pch_tasks(&[id(5)]);

        assert_eq!(f.queue.pending_project_tasks(), 2);
        assert_eq!(f.progress.snapshot(), (0, 2));
    }

    #[test]
    fn test_remove_pch_tasks_leaves_system_tasks() {
        let mut f = fixture(1, 1);
        f.queue.add_system_pch_tasks(vec![system(&[5], &["a.h"])]);
        f.queue.add_project_pch_tasks(vec![project(5, &["b.h"])]);

        f.queue.remove_pch_tasks(&[id(5)]);

        assert_eq!(f.queue.pending_system_tasks(), 1);
        assert_eq!(f.queue.pending_project_tasks(), 0);
        assert_eq!(f.progress.snapshot(), (0, 1));
    }

    #[test]
    fn test_remove_with_empty_ids_is_noop() {
        let mut f = fixture(1, 1);
        f.queue.add_project_pch_tasks(vec![project(1, &["a.h"])]);

        f.queue.remove_pch_tasks(&[]);

        assert_eq!(f.queue.pending_project_tasks(), 1);
        assert_eq!(f.progress.snapshot(), (0, 1));
    }

    #[test]
    fn test_system_admission_bounded_by_free_slots() {
        let mut f = fixture(2, 4);
        f.queue.add_system_pch_tasks(vec![
            system(&[1], &["a.h"]),
            system(&[2], &["b.h"]),
            system(&[3], &["c.h"]),
        ]);

        let outcome = f.queue.process_entries();

        assert_eq!(outcome.system_admitted, 2);
        assert_eq!(f.system_scheduler.batches(), vec![2]);
        assert_eq!(f.queue.pending_system_tasks(), 1);

        // No free slot left, nothing more is admitted.
        let outcome = f.queue.process_entries();
        assert_eq!(outcome.system_admitted, 0);
        assert_eq!(f.system_scheduler.batches(), vec![2]);
    }

    #[test]
    fn test_whole_collection_drains_when_smaller_than_free_slots() {
        let mut f = fixture(1, 8);
        f.queue.add_project_pch_tasks(vec![project(1, &["a.h"]), project(2, &["b.h"])]);

        let outcome = f.queue.process_entries();

        assert_eq!(outcome.project_admitted, 2);
        assert_eq!(f.queue.pending_project_tasks(), 0);
        assert_eq!(f.project_scheduler.batches(), vec![2]);
    }

    #[test]
    fn test_project_admission_bounded_by_free_slots() {
        let mut f = fixture(1, 2);
        f.queue.add_project_pch_tasks(vec![
            project(1, &["a.h"]),
            project(2, &["b.h"]),
            project(3, &["c.h"]),
        ]);

        f.queue.process_entries();

        assert_eq!(f.project_scheduler.batches(), vec![2]);
        assert_eq!(f.queue.pending_project_tasks(), 1);
    }

    #[test]
    fn test_project_tasks_wait_while_system_tasks_run() {
        let mut f = fixture(1, 4);
        // One system task already in flight.
        f.system_scheduler
            .add_tasks(vec![task(|_| Box::pin(async { Ok::<(), Error>(()) }))]);
        f.queue.add_project_pch_tasks(vec![project(1, &["a.h"])]);

        let outcome = f.queue.process_entries();

        assert_eq!(outcome, TickOutcome::default());
        assert!(f.project_scheduler.batches().is_empty());
        assert_eq!(f.queue.pending_project_tasks(), 1);

        // Once the system scheduler is quiet, project work goes out.
        drop(f.system_scheduler.take_tasks());
        let outcome = f.queue.process_entries();
        assert_eq!(outcome.project_admitted, 1);
    }

    #[test]
    fn test_system_tasks_admitted_this_tick_block_project_tasks() {
        let mut f = fixture(1, 1);
        f.queue.add_system_pch_tasks(vec![system(&[1, 2], &["a.h"])]);
        f.queue.add_project_pch_tasks(vec![project(5, &["b.h"])]);

        let outcome = f.queue.process_entries();

        assert_eq!(
            outcome,
            TickOutcome {
                system_admitted: 1,
                project_admitted: 0
            }
        );
        assert_eq!(f.queue.pending_system_tasks(), 0);
        assert_eq!(f.queue.pending_project_tasks(), 1);

        drop(f.system_scheduler.take_tasks());
        let outcome = f.queue.process_entries();
        assert_eq!(outcome.project_admitted, 1);
        assert_eq!(f.queue.pending_project_tasks(), 0);
    }

    #[test]
    fn test_tail_of_collection_is_admitted_first() {
        let mut f = fixture(1, 1);
        f.queue.add_project_pch_tasks(vec![project(1, &["a.h"]), project(9, &["b.h"])]);

        f.queue.process_entries();

        assert_eq!(f.queue.pending_project_tasks(), 1);
        let stats = f.queue.stats();
        assert_eq!(stats.pending_project, 1);
        assert_eq!(stats.project_slots, SlotUsage { free: 0, used: 1 });
        assert!(!stats.is_idle());
    }

    #[tokio::test]
    async fn test_project_task_generates_and_stores_pch() {
        let storage = RecordingStorage {
            system_path: Some(PathBuf::from("/pch/system.pch")),
            ..Default::default()
        };
        let mut f = fixture_with_storage(1, 1, storage);
        f.queue.add_project_pch_tasks(vec![project(5, &["a.h"])]);
        f.queue.process_entries();

        let mut creator = MockCreator::producing(Some("/pch/project-5.pch"));
        for task in f.project_scheduler.take_tasks() {
            task(&mut creator).await.unwrap();
        }

        assert_eq!(creator.generated.len(), 1);
        let generated = &creator.generated[0];
        assert_eq!(generated.system_pch_path, Some(PathBuf::from("/pch/system.pch")));
        assert_eq!(generated.pre_include_search_path, "/pre/include");
        assert_eq!(
            f.storage.calls(),
            vec![
                StorageCall::FetchSystemPath(id(5)),
                StorageCall::InsertProject(id(5), PathBuf::from("/pch/project-5.pch")),
            ]
        );
    }

    #[tokio::test]
    async fn test_project_task_without_output_deletes_pch() {
        let mut f = fixture(1, 1);
        f.queue.add_project_pch_tasks(vec![project(5, &["a.h"])]);
        f.queue.process_entries();

        let mut creator = MockCreator::producing(None);
        for task in f.project_scheduler.take_tasks() {
            task(&mut creator).await.unwrap();
        }

        assert_eq!(
            f.storage.calls(),
            vec![
                StorageCall::FetchSystemPath(id(5)),
                StorageCall::DeleteProject(id(5)),
            ]
        );
    }

    #[tokio::test]
    async fn test_project_deletion_task_skips_generation() {
        let mut f = fixture(1, 1);
        f.queue.add_project_pch_tasks(vec![project(5, &[])]);
        f.queue.process_entries();

        let mut creator = MockCreator::producing(Some("/pch/never.pch"));
        for task in f.project_scheduler.take_tasks() {
            task(&mut creator).await.unwrap();
        }

        assert!(creator.generated.is_empty());
        assert_eq!(f.storage.calls(), vec![StorageCall::DeleteProject(id(5))]);
    }

    #[tokio::test]
    async fn test_system_task_generates_and_stores_pch_for_all_parts() {
        let mut f = fixture(1, 1);
        f.queue.add_system_pch_tasks(vec![system(&[1, 2], &["vector", "string"])]);
        f.queue.process_entries();

        let mut creator = MockCreator::producing(Some("/pch/system.pch"));
        for task in f.system_scheduler.take_tasks() {
            task(&mut creator).await.unwrap();
        }

        assert_eq!(creator.generated.len(), 1);
        assert_eq!(creator.generated[0].pre_include_search_path, "/pre/include");
        assert!(creator.generated[0].system_pch_path.is_none());
        assert_eq!(
            f.storage.calls(),
            vec![StorageCall::InsertSystem(ids(&[1, 2]), PathBuf::from("/pch/system.pch"))]
        );
    }

    #[tokio::test]
    async fn test_system_task_without_output_deletes_pchs() {
        let mut f = fixture(1, 1);
        f.queue.add_system_pch_tasks(vec![system(&[1, 2], &["vector"])]);
        f.queue.process_entries();

        let mut creator = MockCreator::producing(None);
        for task in f.system_scheduler.take_tasks() {
            task(&mut creator).await.unwrap();
        }

        assert_eq!(f.storage.calls(), vec![StorageCall::DeleteSystem(ids(&[1, 2]))]);
    }

    #[tokio::test]
    async fn test_system_deletion_task_skips_generation() {
        let mut f = fixture(1, 1);
        f.queue.add_system_pch_tasks(vec![system(&[3, 4], &[])]);
        f.queue.process_entries();

        let mut creator = MockCreator::producing(Some("/pch/never.pch"));
        for task in f.system_scheduler.take_tasks() {
            task(&mut creator).await.unwrap();
        }

        assert!(creator.generated.is_empty());
        assert_eq!(f.storage.calls(), vec![StorageCall::DeleteSystem(ids(&[3, 4]))]);
    }

    #[tokio::test]
    async fn test_creator_failure_propagates_without_storage_writes() {
        let mut f = fixture(1, 1);
        f.queue.add_system_pch_tasks(vec![system(&[1], &["a.h"])]);
        f.queue.process_entries();

        let mut creator = MockCreator::failing();
        let tasks = f.system_scheduler.take_tasks();
        let mut results = Vec::new();
        for task in tasks {
            results.push(task(&mut creator).await);
        }

        assert!(matches!(results.as_slice(), [Err(Error::Generation(_))]));
        assert!(f.storage.calls().is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let storage = RecordingStorage {
            fail_inserts: true,
            ..Default::default()
        };
        let mut f = fixture_with_storage(1, 1, storage);
        f.queue.add_project_pch_tasks(vec![project(2, &["a.h"])]);
        f.queue.process_entries();

        let mut creator = MockCreator::producing(Some("/pch/p.pch"));
        let tasks = f.project_scheduler.take_tasks();
        let mut results = Vec::new();
        for task in tasks {
            results.push(task(&mut creator).await);
        }

        assert!(matches!(results.as_slice(), [Err(Error::Storage(_))]));
    }
}
