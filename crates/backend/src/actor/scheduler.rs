//! Recurring-task scheduler.
//!
//! One tokio task per enabled indexing task. Each fires immediately and
//! then at its fixed interval, queueing an incremental pass for every
//! locally backed repository through the router. Rebuilding on a
//! configuration change cancels the timer tasks only; passes already queued
//! or in flight inside the actors run to completion.

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use artidex_core::{IndexerSettings, IndexingTask};

use crate::{domain::Repository, service::FailureChannel};

use super::{message::RepositoryCommand, router::RepositoryRouter};

pub struct Scheduler {
  router: Arc<RepositoryRouter>,
  failures: FailureChannel,
  /// Parent token; every recurring task gets a child.
  cancel: CancellationToken,
  tasks: Vec<RecurringTask>,
}

struct RecurringTask {
  name: String,
  token: CancellationToken,
  join: JoinHandle<()>,
}

impl Scheduler {
  pub fn new(router: Arc<RepositoryRouter>, failures: FailureChannel, cancel: CancellationToken) -> Self {
    Self {
      router,
      failures,
      cancel,
      tasks: Vec::new(),
    }
  }

  /// Drop the current recurring task set and register one task per enabled
  /// configuration entry. Called at startup and whenever the task set
  /// changes.
  pub fn rebuild(&mut self, settings: &Arc<IndexerSettings>, repositories: &[Repository]) {
    self.cancel_tasks();

    if !settings.enabled {
      info!("Indexing disabled, no recurring tasks registered");
      return;
    }

    for task in settings.enabled_tasks() {
      let token = self.cancel.child_token();
      let join = tokio::spawn(run_recurring(
        task.clone(),
        settings.clone(),
        repositories.to_vec(),
        self.router.clone(),
        self.failures.clone(),
        token.clone(),
      ));
      debug!(task = %task.name, interval = ?task.interval.duration(), "Registered recurring indexing task");
      self.tasks.push(RecurringTask {
        name: task.name.clone(),
        token,
        join,
      });
    }

    info!(tasks = self.tasks.len(), "Scheduler rebuilt");
  }

  fn cancel_tasks(&mut self) {
    for task in self.tasks.drain(..) {
      debug!(task = %task.name, "Cancelling recurring indexing task");
      task.token.cancel();
      // The timer loop exits on its own; only shutdown waits for joins.
      drop(task.join);
    }
  }

  /// Cancel everything and wait for the timer tasks to exit, escalating to
  /// abort when the bounded wait expires.
  pub async fn shutdown(&mut self, wait: Duration) {
    let tasks: Vec<RecurringTask> = self.tasks.drain(..).collect();
    for task in &tasks {
      task.token.cancel();
    }

    for task in tasks {
      let mut join = task.join;
      if timeout(wait, &mut join).await.is_err() {
        warn!(task = %task.name, "Recurring task did not stop in time, aborting");
        join.abort();
      }
    }

    info!("Scheduler stopped");
  }
}

async fn run_recurring(
  task: IndexingTask,
  settings: Arc<IndexerSettings>,
  repositories: Vec<Repository>,
  router: Arc<RepositoryRouter>,
  failures: FailureChannel,
  token: CancellationToken,
) {
  let continuous = settings.is_continuous(&task);
  let mut timer = tokio::time::interval(task.interval.duration());

  loop {
    tokio::select! {
      biased;

      _ = token.cancelled() => {
        debug!(task = %task.name, "Recurring task cancelled");
        break;
      }

      // First tick fires immediately, then fixed-rate.
      _ = timer.tick() => {
        debug!(task = %task.name, "Scheduled indexing tick");
        for repository in &repositories {
          if repository.local_root().is_none() {
            continue;
          }
          let handle = router.get_or_create(repository);
          let command = RepositoryCommand::Index {
            settings: settings.clone(),
            prefix: None,
            indexers: task.indexers.effective(),
            continuous,
          };
          if let Err(e) = handle.send(command).await {
            failures.report(&repository.name, "schedule", e);
          }
        }
      }
    }
  }
}
