//! Issue planned writes against a [`RecordStore`].
//!
//! Writes go out one request at a time in plan order. A rejected write is
//! logged, recorded as [`WriteOutcome::Failed`] and the batch continues; there
//! is no retry and no rollback of writes already issued.

use serde::Serialize;

use tablesync_core::{PivotValue, RecordId};
use tablesync_remote::RecordStore;

use crate::reconcile::{CreateRequest, UpdateRequest};

/// Kind of remote write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteAction {
    Update,
    Create,
}

/// Outcome of one planned write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WriteOutcome {
    /// The remote record was patched.
    Updated { pivot: PivotValue, id: RecordId },
    /// `--dry-run`: the record *would* have been patched.
    WouldUpdate { pivot: PivotValue, id: RecordId },
    /// A new remote record was created; `id` is `None` if the API did not echo it.
    Created {
        pivot: PivotValue,
        id: Option<RecordId>,
    },
    /// `--dry-run`: the record *would* have been created.
    WouldCreate { pivot: PivotValue },
    /// The remote store rejected the write.
    Failed {
        action: WriteAction,
        pivot: PivotValue,
        id: Option<RecordId>,
        reason: String,
    },
}

impl WriteOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, WriteOutcome::Failed { .. })
    }

    pub fn pivot(&self) -> &PivotValue {
        match self {
            WriteOutcome::Updated { pivot, .. }
            | WriteOutcome::WouldUpdate { pivot, .. }
            | WriteOutcome::Created { pivot, .. }
            | WriteOutcome::WouldCreate { pivot }
            | WriteOutcome::Failed { pivot, .. } => pivot,
        }
    }
}

/// Patch each record in order.
pub fn apply_updates<S: RecordStore + ?Sized>(
    store: &S,
    updates: &[UpdateRequest],
    dry_run: bool,
) -> Vec<WriteOutcome> {
    let mut outcomes = Vec::with_capacity(updates.len());
    for update in updates {
        if dry_run {
            tracing::info!(id = %update.id, pivot = %update.pivot, "[dry-run] would update record");
            outcomes.push(WriteOutcome::WouldUpdate {
                pivot: update.pivot.clone(),
                id: update.id.clone(),
            });
            continue;
        }

        match store.update(&update.id, &update.fields) {
            Ok(()) => {
                tracing::info!(id = %update.id, pivot = %update.pivot, "updated record");
                outcomes.push(WriteOutcome::Updated {
                    pivot: update.pivot.clone(),
                    id: update.id.clone(),
                });
            }
            Err(err) => {
                tracing::error!(id = %update.id, pivot = %update.pivot, error = %err, "error updating record");
                outcomes.push(WriteOutcome::Failed {
                    action: WriteAction::Update,
                    pivot: update.pivot.clone(),
                    id: Some(update.id.clone()),
                    reason: err.to_string(),
                });
            }
        }
    }
    outcomes
}

/// Create records in chunks of [`RecordStore::max_batch_size`].
///
/// A rejected chunk fails every record in it; later chunks are still sent.
pub fn apply_creates<S: RecordStore + ?Sized>(
    store: &S,
    creates: &[CreateRequest],
    dry_run: bool,
) -> Vec<WriteOutcome> {
    if dry_run {
        return creates
            .iter()
            .map(|create| {
                tracing::info!(pivot = %create.pivot, "[dry-run] would create record");
                WriteOutcome::WouldCreate {
                    pivot: create.pivot.clone(),
                }
            })
            .collect();
    }

    let mut outcomes = Vec::with_capacity(creates.len());
    for chunk in creates.chunks(store.max_batch_size().max(1)) {
        let payload: Vec<_> = chunk.iter().map(|c| c.fields.clone()).collect();
        match store.create_batch(&payload) {
            Ok(ids) => {
                let mut ids = ids.into_iter();
                for create in chunk {
                    let id = ids.next();
                    tracing::info!(pivot = %create.pivot, id = ?id, "created record");
                    outcomes.push(WriteOutcome::Created {
                        pivot: create.pivot.clone(),
                        id,
                    });
                }
            }
            Err(err) => {
                tracing::error!(records = chunk.len(), error = %err, "error creating records");
                outcomes.extend(chunk.iter().map(|create| WriteOutcome::Failed {
                    action: WriteAction::Create,
                    pivot: create.pivot.clone(),
                    id: None,
                    reason: err.to_string(),
                }));
            }
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashSet;

    use tablesync_core::{FieldValue, Fields, Table};
    use tablesync_remote::RemoteError;

    use super::*;

    /// In-memory store that rejects writes for configured pivots.
    #[derive(Default)]
    struct FakeStore {
        batch: usize,
        reject: HashSet<String>,
        updates: RefCell<Vec<(RecordId, Fields)>>,
        batches: RefCell<Vec<Vec<Fields>>>,
    }

    impl FakeStore {
        fn rejects(&self, fields: &Fields) -> bool {
            fields
                .values()
                .any(|v| self.reject.contains(&v.to_string()))
        }
    }

    impl RecordStore for FakeStore {
        fn fetch_all(&self) -> Result<Table, RemoteError> {
            Ok(Table::default())
        }

        fn update(&self, id: &RecordId, fields: &Fields) -> Result<(), RemoteError> {
            if self.reject.contains(&id.0) {
                return Err(RemoteError::Status {
                    status: 422,
                    body: "rejected".into(),
                });
            }
            self.updates.borrow_mut().push((id.clone(), fields.clone()));
            Ok(())
        }

        fn create_batch(&self, records: &[Fields]) -> Result<Vec<RecordId>, RemoteError> {
            if records.iter().any(|f| self.rejects(f)) {
                return Err(RemoteError::Status {
                    status: 422,
                    body: "rejected".into(),
                });
            }
            let start = self.batches.borrow().iter().map(Vec::len).sum::<usize>();
            self.batches.borrow_mut().push(records.to_vec());
            Ok((0..records.len())
                .map(|i| RecordId(format!("new{}", start + i)))
                .collect())
        }

        fn max_batch_size(&self) -> usize {
            self.batch
        }
    }

    fn update(id: &str, pivot: &str) -> UpdateRequest {
        let mut fields = Fields::new();
        fields.insert("status".into(), FieldValue::from("closed"));
        UpdateRequest {
            id: RecordId::from(id),
            pivot: PivotValue::from(pivot),
            fields,
            changes: vec![],
        }
    }

    fn create(pivot: &str) -> CreateRequest {
        let mut fields = Fields::new();
        fields.insert("pivot".into(), FieldValue::from(pivot));
        CreateRequest {
            pivot: PivotValue::from(pivot),
            fields,
        }
    }

    #[test]
    fn failed_update_does_not_stop_the_batch() {
        let store = FakeStore {
            reject: HashSet::from(["r2".to_string()]),
            ..FakeStore::default()
        };
        let outcomes = apply_updates(
            &store,
            &[update("r1", "A"), update("r2", "B"), update("r3", "C")],
            false,
        );

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[1].is_failure());
        assert!(matches!(outcomes[2], WriteOutcome::Updated { .. }));
        let patched: Vec<_> = store.updates.borrow().iter().map(|(id, _)| id.0.clone()).collect();
        assert_eq!(patched, vec!["r1", "r3"]);
    }

    #[test]
    fn dry_run_issues_no_writes() {
        let store = FakeStore {
            batch: 10,
            ..FakeStore::default()
        };
        let updates = apply_updates(&store, &[update("r1", "A")], true);
        let creates = apply_creates(&store, &[create("B")], true);

        assert!(matches!(updates[0], WriteOutcome::WouldUpdate { .. }));
        assert!(matches!(creates[0], WriteOutcome::WouldCreate { .. }));
        assert!(store.updates.borrow().is_empty());
        assert!(store.batches.borrow().is_empty());
    }

    #[test]
    fn creates_are_chunked_by_batch_size() {
        let store = FakeStore {
            batch: 2,
            ..FakeStore::default()
        };
        let creates: Vec<_> = ["A", "B", "C", "D", "E"].iter().map(|p| create(p)).collect();
        let outcomes = apply_creates(&store, &creates, false);

        let sizes: Vec<_> = store.batches.borrow().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(outcomes.len(), 5);
        assert_eq!(
            outcomes[4],
            WriteOutcome::Created {
                pivot: PivotValue::from("E"),
                id: Some(RecordId::from("new4")),
            }
        );
    }

    #[test]
    fn rejected_chunk_fails_its_records_only() {
        let store = FakeStore {
            batch: 2,
            reject: HashSet::from(["C".to_string()]),
            ..FakeStore::default()
        };
        let creates: Vec<_> = ["A", "B", "C", "D", "E"].iter().map(|p| create(p)).collect();
        let outcomes = apply_creates(&store, &creates, false);

        let failed: Vec<_> = outcomes
            .iter()
            .filter(|o| o.is_failure())
            .map(|o| o.pivot().0.clone())
            .collect();
        assert_eq!(failed, vec!["C", "D"]);
        assert_eq!(store.batches.borrow().len(), 2);
    }

    #[test]
    fn zero_batch_size_still_makes_progress() {
        let store = FakeStore::default();
        let outcomes = apply_creates(&store, &[create("A"), create("B")], false);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(store.batches.borrow().len(), 2);
    }
}
