//! Run a task file through the queue.

use anyhow::{Context, Result, bail};
use pchqueue_config::{QueueConfig, load_queue_config};
use pchqueue_core::{
    MemoryPchStorage, PchCreator, PchTask, ProjectPartId, SharedProgressCounter, normalize_ids,
};
use pchqueue_scheduler::{PchTaskQueue, QueueWorker, SlotScheduler};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

use crate::creator::DryRunCreator;

/// Tasks to feed into the queue.
#[derive(Debug, Default, Deserialize)]
pub struct TaskFile {
    #[serde(default)]
    pub system: Vec<PchTask>,
    #[serde(default)]
    pub project: Vec<PchTask>,
    /// Project parts whose pending project tasks are dropped again.
    #[serde(default)]
    pub remove: Vec<ProjectPartId>,
}

pub fn parse_task_file(content: &str) -> Result<TaskFile> {
    let mut file: TaskFile = serde_json::from_str(content)?;
    for (index, task) in file.project.iter().enumerate() {
        if task.project_part_ids.len() != 1 {
            bail!(
                "project task {} must have exactly one project part id, got {:?}",
                index,
                task.project_part_ids
            );
        }
    }
    for task in &mut file.system {
        normalize_ids(&mut task.project_part_ids);
    }
    normalize_ids(&mut file.remove);
    Ok(file)
}

/// Run the tasks in `tasks_path` and print the resulting PCH records.
pub async fn run_tasks(config_path: Option<&str>, tasks_path: &str) -> Result<()> {
    let config = match config_path {
        Some(path) => load_queue_config(path)
            .with_context(|| format!("Failed to load config file: {}", path))?,
        None => QueueConfig::default(),
    };

    let content = std::fs::read_to_string(tasks_path)
        .with_context(|| format!("Failed to read task file: {}", tasks_path))?;
    let task_file = parse_task_file(&content)
        .with_context(|| format!("Failed to parse task file: {}", tasks_path))?;

    println!(
        "Queueing {} system and {} project tasks",
        task_file.system.len(),
        task_file.project.len()
    );

    let wakeup = Arc::new(Notify::new());
    let progress = Arc::new(SharedProgressCounter::new(|progress, total| {
        println!("  progress {}/{}", progress, total);
    }));
    let storage = Arc::new(MemoryPchStorage::new());

    let make_creator = {
        let output_dir = config.output_dir.clone();
        move || Box::new(DryRunCreator::new(output_dir.clone())) as Box<dyn PchCreator>
    };
    let system_scheduler = SlotScheduler::new(
        "system",
        config.system_slots,
        make_creator.clone(),
        progress.clone(),
        wakeup.clone(),
    )?;
    let project_scheduler = SlotScheduler::new(
        "project",
        config.project_slots,
        make_creator,
        progress.clone(),
        wakeup.clone(),
    )?;

    for scheduler in [&system_scheduler, &project_scheduler] {
        println!("  {} scheduler: {} slots", scheduler.name(), scheduler.slots());
    }

    let mut queue = PchTaskQueue::new(
        Arc::new(system_scheduler),
        Arc::new(project_scheduler),
        progress,
        storage.clone(),
        Arc::new(config.environment()),
    );
    queue.add_system_pch_tasks(task_file.system);
    queue.add_project_pch_tasks(task_file.project);
    queue.remove_pch_tasks(&task_file.remove);

    let worker = QueueWorker::new(Arc::new(Mutex::new(queue)), config.tick_interval, wakeup);
    worker.run_until_drained().await;

    println!("\n--- System PCHs ---");
    for (id, record) in storage.system_records() {
        println!("  {} -> {}", id, record.path.display());
    }
    println!("\n--- Project PCHs ---");
    for (id, record) in storage.project_records() {
        println!("  {} -> {}", id, record.path.display());
    }

    Ok(())
}
