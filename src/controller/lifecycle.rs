//! Scoped ownership of active chaos experiments
//!
//! A [`ChaosController`] remembers every experiment it injected and removes
//! them when the scope ends, whether the scope body succeeded, failed or
//! panicked. Cleanup failures are aggregated into a [`CleanupReport`] and
//! logged; they never replace the body's own result.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{error, info, warn};

use crate::client::ChaosApi;
use crate::crd::Experiment;
use crate::manager::ChaosManager;
use crate::Error;

/// Where a tracked experiment is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Built and validated, not yet submitted
    Defined,
    /// Accepted by the API server
    Submitted,
    /// Waiting for the reconciler to report `AllInjected`
    Injecting,
    /// The reconciler reported `AllInjected=True`
    Injected,
    /// Delete requested
    Removing,
    /// Confirmed absent
    Deleted,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Defined => "Defined",
            Self::Submitted => "Submitted",
            Self::Injecting => "Injecting",
            Self::Injected => "Injected",
            Self::Removing => "Removing",
            Self::Deleted => "Deleted",
        };
        f.write_str(s)
    }
}

/// An experiment that could not be deleted during cleanup
#[derive(Debug)]
pub struct CleanupFailure {
    /// Resource kind
    pub kind: String,
    /// Resource namespace
    pub namespace: String,
    /// Resource name
    pub name: String,
    /// Why the delete failed
    pub error: Error,
}

/// Outcome of [`ChaosController::cleanup_all`]
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// `kind/name` of every experiment whose delete succeeded
    pub removed: Vec<String>,
    /// Experiments whose delete failed
    pub failures: Vec<CleanupFailure>,
}

impl CleanupReport {
    /// True if every delete succeeded
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn summary(&self) -> String {
        self.failures
            .iter()
            .map(|f| format!("{}/{} in {}: {}", f.kind, f.name, f.namespace, f.error))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug)]
struct Tracked {
    experiment: Experiment,
    phase: Phase,
}

/// Owner of the experiments injected within one scope
pub struct ChaosController<C: ChaosApi + ?Sized + 'static> {
    manager: ChaosManager<C>,
    tracked: Vec<Tracked>,
}

impl<C: ChaosApi + ?Sized + 'static> ChaosController<C> {
    /// Controller with nothing tracked
    pub fn new(manager: ChaosManager<C>) -> Self {
        Self {
            manager,
            tracked: Vec::new(),
        }
    }

    /// Run `body` with a fresh controller, then remove everything it injected.
    ///
    /// Cleanup always runs. The body's result is returned unchanged, and a
    /// panic in the body is resumed once cleanup has finished.
    ///
    /// ```ignore
    /// let result = ChaosController::scope(manager, |chaos| {
    ///     Box::pin(async move {
    ///         chaos.inject(experiment).await?;
    ///         run_checks().await
    ///     })
    /// })
    /// .await;
    /// ```
    pub async fn scope<T, F>(manager: ChaosManager<C>, body: F) -> Result<T, Error>
    where
        F: for<'a> FnOnce(&'a mut ChaosController<C>) -> BoxFuture<'a, Result<T, Error>>,
    {
        let mut controller = Self::new(manager);

        let borrowed = &mut controller;
        let outcome = AssertUnwindSafe(async move { body(borrowed).await })
            .catch_unwind()
            .await;
        if outcome.is_err() {
            error!("Chaos scope body panicked, cleaning up before resuming");
        }

        controller.cleanup_all().await;

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Lifecycle manager used by this controller
    pub fn manager(&self) -> &ChaosManager<C> {
        &self.manager
    }

    /// Experiments currently tracked, in injection order
    pub fn active(&self) -> impl Iterator<Item = &Experiment> {
        self.tracked.iter().map(|t| &t.experiment)
    }

    /// Number of tracked experiments
    pub fn active_count(&self) -> usize {
        self.tracked.len()
    }

    /// Phase of a tracked experiment
    pub fn phase(&self, experiment: &Experiment) -> Option<Phase> {
        self.position(experiment).map(|i| self.tracked[i].phase)
    }

    /// Submit the experiment, track it and wait for injection
    pub async fn inject(&mut self, experiment: Experiment) -> Result<Experiment, Error> {
        self.inject_with(experiment, true, None).await
    }

    /// Submit the experiment, track it and optionally wait for injection.
    ///
    /// A failed wait leaves the experiment tracked so the scope still removes it.
    pub async fn inject_with(
        &mut self,
        experiment: Experiment,
        wait: bool,
        timeout: Option<Duration>,
    ) -> Result<Experiment, Error> {
        self.manager.apply(&experiment).await?;

        let index = self.tracked.len();
        self.tracked.push(Tracked {
            experiment: experiment.clone(),
            phase: Phase::Submitted,
        });

        if wait {
            self.tracked[index].phase = Phase::Injecting;
            self.manager
                .wait_for_injection(&experiment, timeout, None)
                .await?;
            self.tracked[index].phase = Phase::Injected;
        }

        Ok(experiment)
    }

    /// Delete the experiment, optionally wait until it is gone, and stop tracking it.
    ///
    /// Failures propagate; the experiment stays tracked until removal succeeds.
    pub async fn remove(
        &mut self,
        experiment: &Experiment,
        wait_for_deletion: bool,
    ) -> Result<(), Error> {
        self.set_phase(experiment, Phase::Removing);
        self.manager.delete(experiment).await?;

        if wait_for_deletion {
            self.manager
                .wait_for_deletion(experiment, None, None)
                .await?;
        }

        if let Some(i) = self.position(experiment) {
            self.tracked.remove(i);
        }
        Ok(())
    }

    /// Delete every tracked experiment; the scope-exit operation.
    ///
    /// Each delete is attempted independently and in order. After a successful
    /// delete, disappearance is awaited for `cleanup_timeout`; a wait failure is
    /// only logged. The tracked list is always cleared.
    pub async fn cleanup_all(&mut self) -> CleanupReport {
        let mut report = CleanupReport::default();
        if self.tracked.is_empty() {
            return report;
        }

        info!(count = self.tracked.len(), "Cleaning up chaos experiments");
        let cleanup_timeout = self.manager.config().cleanup_timeout;

        for i in 0..self.tracked.len() {
            self.tracked[i].phase = Phase::Removing;
            let experiment = self.tracked[i].experiment.clone();

            match self.manager.delete(&experiment).await {
                Ok(()) => {
                    match self
                        .manager
                        .wait_for_deletion(&experiment, Some(cleanup_timeout), None)
                        .await
                    {
                        Ok(_) => self.tracked[i].phase = Phase::Deleted,
                        Err(e) => warn!(
                            kind = %experiment.kind(),
                            name = %experiment.name(),
                            error = %e,
                            "Deletion not confirmed during cleanup"
                        ),
                    }
                    report
                        .removed
                        .push(format!("{}/{}", experiment.kind(), experiment.name()));
                }
                Err(e) => {
                    error!(
                        kind = %experiment.kind(),
                        name = %experiment.name(),
                        namespace = %experiment.namespace(),
                        error = %e,
                        "Failed to delete chaos experiment during cleanup"
                    );
                    report.failures.push(CleanupFailure {
                        kind: experiment.kind().to_string(),
                        namespace: experiment.namespace().to_string(),
                        name: experiment.name().to_string(),
                        error: e,
                    });
                }
            }
        }

        self.tracked.clear();

        if !report.is_clean() {
            warn!(
                failed = report.failures.len(),
                removed = report.removed.len(),
                failures = %report.summary(),
                "Chaos cleanup finished with failures"
            );
        }
        report
    }

    fn position(&self, experiment: &Experiment) -> Option<usize> {
        self.tracked.iter().position(|t| {
            t.experiment.kind() == experiment.kind()
                && t.experiment.namespace() == experiment.namespace()
                && t.experiment.name() == experiment.name()
        })
    }

    fn set_phase(&mut self, experiment: &Experiment, phase: Phase) {
        if let Some(i) = self.position(experiment) {
            self.tracked[i].phase = phase;
        }
    }
}

impl<C: ChaosApi + ?Sized + 'static> Drop for ChaosController<C> {
    fn drop(&mut self) {
        if self.tracked.is_empty() {
            return;
        }
        let pending: Vec<Experiment> = self.tracked.drain(..).map(|t| t.experiment).collect();
        error!(
            count = pending.len(),
            "Chaos controller dropped with active experiments"
        );

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            for experiment in &pending {
                error!(
                    kind = %experiment.kind(),
                    name = %experiment.name(),
                    namespace = %experiment.namespace(),
                    "No runtime to remove chaos experiment; delete it manually"
                );
            }
            return;
        };

        let client = self.manager.client().clone();
        handle.spawn(async move {
            for experiment in pending {
                if let Err(e) = client
                    .delete(experiment.kind(), experiment.namespace(), experiment.name())
                    .await
                {
                    error!(
                        kind = %experiment.kind(),
                        name = %experiment.name(),
                        error = %e,
                        "Best-effort removal of chaos experiment failed"
                    );
                }
            }
        });
    }
}
