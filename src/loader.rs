//! Day snapshot loading.
//!
//! A snapshot is only built when all four collections were fetched. Loads
//! may overlap when the user flips through dates quickly; every load takes a
//! generation ticket and only the latest ticket may publish its result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::{SchedulerError, SchedulerResult};
use crate::events::{EventBus, PlannerEvent};
use crate::models::DaySnapshot;
use crate::repository::{Repositories, RepositoryResult};
use crate::validation::validate_snapshot;

/// Fetches the four collections for `date` concurrently.
///
/// Fails as a whole if any fetch fails.
pub async fn fetch_day(repos: &Repositories, date: NaiveDate) -> RepositoryResult<DaySnapshot> {
    let (technicians, appointments, assignments, absences) = tokio::try_join!(
        repos.technicians.active_technicians(),
        repos.appointments.appointments_for_date(date),
        repos.assignments.assignments_for_date(date),
        repos.absences.absences_for_date(date),
    )?;

    Ok(DaySnapshot {
        date,
        technicians,
        appointments,
        assignments,
        absences,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The snapshot is now current.
    Fresh(Arc<DaySnapshot>),
    /// A newer load was started meanwhile; this result was discarded.
    Stale { date: NaiveDate },
}

impl LoadOutcome {
    pub fn snapshot(&self) -> Option<&Arc<DaySnapshot>> {
        match self {
            Self::Fresh(snapshot) => Some(snapshot),
            Self::Stale { .. } => None,
        }
    }
}

/// Holds the current day snapshot and discards out-of-order loads.
pub struct DayLoader {
    repos: Repositories,
    generation: AtomicU64,
    current: RwLock<Option<Arc<DaySnapshot>>>,
    events: Option<EventBus>,
}

impl DayLoader {
    pub fn new(repos: Repositories) -> Self {
        Self {
            repos,
            generation: AtomicU64::new(0),
            current: RwLock::new(None),
            events: None,
        }
    }

    /// Publishes [`PlannerEvent::DayLoaded`] on `events` after fresh loads.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// The last snapshot that loaded successfully.
    pub fn current(&self) -> Option<Arc<DaySnapshot>> {
        self.current.read().clone()
    }

    /// Loads `date` and makes it current unless a newer load started.
    ///
    /// A failed load leaves the current snapshot untouched; call again to
    /// retry.
    pub async fn load(&self, date: NaiveDate) -> SchedulerResult<LoadOutcome> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(%date, ticket, "loading day snapshot");

        let fetched = fetch_day(&self.repos, date).await;

        let snapshot = {
            let mut current = self.current.write();
            if self.generation.load(Ordering::SeqCst) != ticket {
                warn!(%date, ticket, "discarding stale day snapshot");
                return Ok(LoadOutcome::Stale { date });
            }
            let snapshot = Arc::new(fetched.map_err(|source| {
                warn!(%date, error = %source, "day snapshot failed to load");
                SchedulerError::DataLoad { date, source }
            })?);
            *current = Some(snapshot.clone());
            snapshot
        };

        if let Err(errors) = validate_snapshot(&snapshot) {
            for error in &errors {
                warn!(%date, kind = ?error.kind, "{}", error.message);
            }
        }
        if let Some(events) = &self.events {
            events.publish(PlannerEvent::DayLoaded { date });
        }
        debug!(
            %date,
            technicians = snapshot.technicians.len(),
            appointments = snapshot.appointments.len(),
            assignments = snapshot.assignments.len(),
            "day snapshot loaded"
        );
        Ok(LoadOutcome::Fresh(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{assignment, day, sample_snapshot};
    use crate::models::{Absence, AbsenceKind, Appointment, AppointmentPatch};
    use crate::repository::{AppointmentRepository, InMemoryStore, RepositoryError};
    use async_trait::async_trait;
    use tokio::sync::Notify;

    fn store() -> Arc<InMemoryStore> {
        Arc::new(
            InMemoryStore::from_snapshot(&sample_snapshot())
                .with_assignment(assignment("S1", "X", "T1", (9, 0), (10, 0), 10))
                .with_absence(Absence::full_day("AB1", "T2", day(), AbsenceKind::Sick)),
        )
    }

    /// Holds back appointment reads for one date until released.
    struct GatedAppointments {
        inner: Arc<InMemoryStore>,
        gated: NaiveDate,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl AppointmentRepository for GatedAppointments {
        async fn appointments_for_date(
            &self,
            date: NaiveDate,
        ) -> RepositoryResult<Vec<Appointment>> {
            if date == self.gated {
                self.gate.notified().await;
            }
            self.inner.appointments_for_date(date).await
        }

        async fn update_appointment(
            &self,
            id: &str,
            patch: &AppointmentPatch,
        ) -> RepositoryResult<Appointment> {
            self.inner.update_appointment(id, patch).await
        }
    }

    #[tokio::test]
    async fn test_fetch_day_builds_full_snapshot() {
        let repos = Repositories::from_store(store());
        let snapshot = fetch_day(&repos, day()).await.unwrap();
        assert_eq!(snapshot.date, day());
        assert_eq!(snapshot.technicians.len(), 2);
        assert_eq!(snapshot.appointments.len(), 3);
        assert_eq!(snapshot.assignments.len(), 1);
        assert_eq!(snapshot.absences.len(), 1);
    }

    #[tokio::test]
    async fn test_load_sets_current_and_notifies() {
        let bus = EventBus::default();
        let mut events = bus.subscribe();
        let loader = DayLoader::new(Repositories::from_store(store())).with_events(bus);
        assert!(loader.current().is_none());

        let outcome = loader.load(day()).await.unwrap();
        let snapshot = outcome.snapshot().cloned().unwrap();
        assert_eq!(loader.current(), Some(snapshot));
        assert_eq!(events.recv().await.unwrap(), PlannerEvent::DayLoaded { date: day() });
    }

    #[tokio::test]
    async fn test_failed_load_keeps_last_snapshot() {
        let store = store();
        let loader = DayLoader::new(Repositories::from_store(store.clone()));
        loader.load(day()).await.unwrap();

        store.set_available(false);
        let err = loader.load(day().succ_opt().unwrap()).await.unwrap_err();
        match err {
            SchedulerError::DataLoad { date, source } => {
                assert_eq!(date, day().succ_opt().unwrap());
                assert!(matches!(source, RepositoryError::Unavailable(_)));
            }
            other => panic!("expected data load error, got {other:?}"),
        }
        assert_eq!(loader.current().map(|s| s.date), Some(day()));

        store.set_available(true);
        assert!(loader.load(day()).await.is_ok());
    }

    #[tokio::test]
    async fn test_stale_response_discarded() {
        let store = store();
        let gate = Arc::new(Notify::new());
        let mut repos = Repositories::from_store(store.clone());
        repos.appointments = Arc::new(GatedAppointments {
            inner: store,
            gated: day(),
            gate: gate.clone(),
        });
        let loader = DayLoader::new(repos);
        let next_day = day().succ_opt().unwrap();

        let slow = loader.load(day());
        let fast = async {
            let outcome = loader.load(next_day).await;
            gate.notify_one();
            outcome
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert_eq!(slow.unwrap(), LoadOutcome::Stale { date: day() });
        assert!(matches!(fast.unwrap(), LoadOutcome::Fresh(ref s) if s.date == next_day));
        assert_eq!(loader.current().map(|s| s.date), Some(next_day));
    }
}
