//! Imperative facade.
//!
//! The boundary callers use: index or purge one repository or all of them,
//! optionally scoped to a path prefix. Everything returns a typed result
//! and goes through the router, so per-repository serialization holds no
//! matter who calls.

use std::sync::Arc;

use crate::{
  actor::{RepositoryRouter, message::RepositoryCommand},
  domain::Repository,
  service::{OperationReport, ServiceError},
  subsystem::SettingsCell,
};

#[derive(Clone)]
pub struct IndexFacade {
  router: Arc<RepositoryRouter>,
  /// Repositories registered at subsystem start.
  repositories: Arc<Vec<Repository>>,
  settings: SettingsCell,
}

impl IndexFacade {
  pub(crate) fn new(router: Arc<RepositoryRouter>, repositories: Arc<Vec<Repository>>, settings: SettingsCell) -> Self {
    Self {
      router,
      repositories,
      settings,
    }
  }

  /// Run an incremental pass over one repository.
  pub async fn index_repository(
    &self,
    repository: &Repository,
    prefix: Option<&str>,
  ) -> Result<OperationReport, ServiceError> {
    let settings = self.enabled_settings()?;
    require_local(repository)?;

    let command = RepositoryCommand::Index {
      indexers: settings.all_indexers(),
      continuous: settings.continuous_index_updates,
      settings,
      prefix: prefix.map(str::to_string),
    };
    self.router.get_or_create(repository).request(command).await
  }

  /// Purge and rebuild one repository's index from scratch.
  pub async fn rebuild_repository(
    &self,
    repository: &Repository,
    prefix: Option<&str>,
  ) -> Result<OperationReport, ServiceError> {
    let settings = self.enabled_settings()?;
    require_local(repository)?;

    let command = RepositoryCommand::Rebuild {
      indexers: settings.all_indexers(),
      settings,
      prefix: prefix.map(str::to_string),
    };
    self.router.get_or_create(repository).request(command).await
  }

  /// Drop every index entry under the prefix for one repository.
  pub async fn purge_repository(
    &self,
    repository: &Repository,
    prefix: Option<&str>,
  ) -> Result<OperationReport, ServiceError> {
    self.enabled_settings()?;
    require_local(repository)?;

    let command = RepositoryCommand::Purge {
      prefix: prefix.map(str::to_string),
    };
    self.router.get_or_create(repository).request(command).await
  }

  /// Incrementally index every locally backed repository, in registration
  /// order, stopping at the first failure. Repositories finished before
  /// the failure keep their committed state.
  pub async fn index_all(&self, prefix: Option<&str>) -> Result<Vec<OperationReport>, ServiceError> {
    let mut reports = Vec::new();
    for repository in self.local_repositories() {
      reports.push(self.index_repository(&repository, prefix).await?);
    }
    Ok(reports)
  }

  /// Purge every locally backed repository, stopping at the first failure.
  pub async fn purge_all(&self, prefix: Option<&str>) -> Result<Vec<OperationReport>, ServiceError> {
    let mut reports = Vec::new();
    for repository in self.local_repositories() {
      reports.push(self.purge_repository(&repository, prefix).await?);
    }
    Ok(reports)
  }

  fn local_repositories(&self) -> Vec<Repository> {
    self
      .repositories
      .iter()
      .filter(|r| r.local_root().is_some())
      .cloned()
      .collect()
  }

  fn enabled_settings(&self) -> Result<Arc<artidex_core::IndexerSettings>, ServiceError> {
    let settings = self.settings.current();
    if !settings.enabled {
      return Err(ServiceError::Disabled);
    }
    Ok(settings)
  }
}

fn require_local(repository: &Repository) -> Result<(), ServiceError> {
  if repository.local_root().is_none() {
    return Err(ServiceError::NotLocal(repository.name.clone()));
  }
  Ok(())
}
