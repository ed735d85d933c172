//! Delivery write path with post-commit hooks.
//!
//! Every delivery create, update and delete made by application code goes
//! through a [`DeliveryWriter`]. The writer commits the change to the
//! repository first and only then runs its hooks, in registration order, so
//! a hook always observes committed state. Hooks that need to write
//! deliveries themselves use the raw [`DeliveryRepository`] methods, which do
//! not re-enter the hooks.
//!
//! [`DeliveryRepository`]: crate::DeliveryRepository

use std::sync::Arc;

use recon_types::{Delivery, DeliveryId};

use crate::error::{StoreError, StoreResult};
use crate::traits::{DeliveryRepository, Repository};

/// Reaction to a committed delivery write.
pub trait DeliveryHook: Send + Sync {
    /// Human-readable name, used in logs and errors.
    fn name(&self) -> &str;

    /// Called after a delivery was inserted (`previous = None`) or replaced.
    fn on_delivery_written(&self, previous: Option<&Delivery>, current: &Delivery)
        -> StoreResult<()>;

    /// Called after a delivery was deleted.
    fn on_delivery_deleted(&self, deleted: &Delivery) -> StoreResult<()>;
}

/// The only write path for deliveries outside of hooks.
pub struct DeliveryWriter {
    repo: Arc<dyn Repository>,
    hooks: Vec<Arc<dyn DeliveryHook>>,
}

impl DeliveryWriter {
    /// Create a writer with no hooks.
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self {
            repo,
            hooks: Vec::new(),
        }
    }

    /// Append a hook; hooks run in registration order.
    pub fn add_hook(&mut self, hook: Arc<dyn DeliveryHook>) {
        self.hooks.push(hook);
    }

    pub fn with_hook(mut self, hook: Arc<dyn DeliveryHook>) -> Self {
        self.add_hook(hook);
        self
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repo
    }

    pub fn get(&self, id: &DeliveryId) -> StoreResult<Option<Delivery>> {
        self.repo.get_delivery(id)
    }

    /// Insert or replace a delivery, then run hooks.
    pub fn save(&self, delivery: &Delivery) -> StoreResult<()> {
        let previous = self.repo.get_delivery(&delivery.id)?;
        self.repo.save_delivery(delivery)?;
        self.run_written(previous.as_ref(), delivery)
    }

    /// Apply `change` to a stored delivery, write it back, then run hooks.
    ///
    /// Returns the delivery as written.
    pub fn update<F>(&self, id: &DeliveryId, change: F) -> StoreResult<Delivery>
    where
        F: FnOnce(&mut Delivery),
    {
        let previous = self
            .repo
            .get_delivery(id)?
            .ok_or_else(|| StoreError::not_found("delivery", id))?;
        let mut current = previous.clone();
        change(&mut current);
        self.repo.save_delivery(&current)?;
        self.run_written(Some(&previous), &current)?;
        Ok(current)
    }

    /// Delete a delivery, then run hooks. Deleting a missing delivery is a
    /// no-op and runs no hooks.
    pub fn delete(&self, id: &DeliveryId) -> StoreResult<Option<Delivery>> {
        let Some(deleted) = self.repo.delete_delivery(id)? else {
            return Ok(None);
        };
        for hook in &self.hooks {
            hook.on_delivery_deleted(&deleted)
                .map_err(|e| hook_failure(hook.name(), e))?;
        }
        Ok(Some(deleted))
    }

    fn run_written(&self, previous: Option<&Delivery>, current: &Delivery) -> StoreResult<()> {
        for hook in &self.hooks {
            hook.on_delivery_written(previous, current)
                .map_err(|e| hook_failure(hook.name(), e))?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for DeliveryWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.hooks.iter().map(|h| h.name()).collect();
        f.debug_struct("DeliveryWriter").field("hooks", &names).finish()
    }
}

fn hook_failure(name: &str, err: StoreError) -> StoreError {
    tracing::warn!(hook = name, error = %err, "delivery hook failed after commit");
    match err {
        StoreError::Hook { .. } => err,
        other => StoreError::hook(name, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use recon_types::DeliveryStatus;

    use super::*;
    use crate::memory::{InMemoryRepository, Table};
    use crate::traits::DeliveryRepository;

    #[derive(Default)]
    struct RecordingHook {
        events: Mutex<Vec<String>>,
        fail: bool,
    }

    impl DeliveryHook for RecordingHook {
        fn name(&self) -> &str {
            "recording"
        }

        fn on_delivery_written(
            &self,
            previous: Option<&Delivery>,
            current: &Delivery,
        ) -> StoreResult<()> {
            let prev = previous.map(|p| p.status.as_str()).unwrap_or("none");
            self.events
                .lock()
                .unwrap()
                .push(format!("written:{prev}->{}", current.status));
            if self.fail {
                return Err(StoreError::Unavailable("orders offline".into()));
            }
            Ok(())
        }

        fn on_delivery_deleted(&self, deleted: &Delivery) -> StoreResult<()> {
            self.events
                .lock()
                .unwrap()
                .push(format!("deleted:{}", deleted.status));
            Ok(())
        }
    }

    fn writer_with(hook: Arc<RecordingHook>) -> (Arc<InMemoryRepository>, DeliveryWriter) {
        let repo = Arc::new(InMemoryRepository::new());
        let writer = DeliveryWriter::new(repo.clone()).with_hook(hook);
        (repo, writer)
    }

    #[test]
    fn hooks_see_every_write() {
        let hook = Arc::new(RecordingHook::default());
        let (_repo, writer) = writer_with(hook.clone());

        let d = Delivery::planned(None, None);
        writer.save(&d).unwrap();
        writer
            .update(&d.id, |d| d.status = DeliveryStatus::Delivered)
            .unwrap();
        writer.delete(&d.id).unwrap();

        let events = hook.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "written:none->planned",
                "written:planned->delivered",
                "deleted:delivered",
            ]
        );
    }

    #[test]
    fn write_commits_before_hook_failure() {
        let hook = Arc::new(RecordingHook {
            fail: true,
            ..Default::default()
        });
        let (repo, writer) = writer_with(hook);

        let d = Delivery::planned(None, None);
        let err = writer.save(&d).unwrap_err();
        assert!(matches!(err, StoreError::Hook { ref hook, .. } if hook == "recording"));
        assert_eq!(repo.get_delivery(&d.id).unwrap(), Some(d));
    }

    #[test]
    fn update_missing_delivery_is_not_found() {
        let (_repo, writer) = writer_with(Arc::new(RecordingHook::default()));
        let err = writer.update(&DeliveryId::new(), |_| {}).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "delivery", .. }));
    }

    #[test]
    fn deleting_missing_delivery_runs_no_hooks() {
        let hook = Arc::new(RecordingHook::default());
        let (_repo, writer) = writer_with(hook.clone());
        assert_eq!(writer.delete(&DeliveryId::new()).unwrap(), None);
        assert!(hook.events.lock().unwrap().is_empty());
    }

    #[test]
    fn failed_write_runs_no_hooks() {
        let hook = Arc::new(RecordingHook::default());
        let (repo, writer) = writer_with(hook.clone());
        repo.set_unavailable(Table::Deliveries, true);
        assert!(writer.save(&Delivery::planned(None, None)).is_err());
        assert!(hook.events.lock().unwrap().is_empty());
    }
}
