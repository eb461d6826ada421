use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::outbox::OutboxMessage;
use crate::uow::{Database, Session};

/// A stored JSON document and the version it was last written at.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub version: u64,
    pub body: serde_json::Value,
}

#[derive(Default)]
pub(super) struct Tables {
    pub(super) documents: HashMap<(String, Uuid), Document>,
    pub(super) outbox: Vec<OutboxMessage>,
}

/// In-memory backend: versioned JSON documents keyed by table and id, plus
/// the outbox table.
///
/// Cloning returns another handle to the same storage.
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    pub(super) tables: Arc<RwLock<Tables>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self, table: &str, id: Uuid) -> Result<Option<Document>, PersistenceError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| PersistenceError::LockPoisoned("read"))?;
        Ok(tables.documents.get(&(table.to_string(), id)).cloned())
    }

    pub fn documents(&self, table: &str) -> Result<Vec<(Uuid, Document)>, PersistenceError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| PersistenceError::LockPoisoned("read"))?;
        Ok(tables
            .documents
            .iter()
            .filter(|((t, _), _)| t == table)
            .map(|((_, id), doc)| (*id, doc.clone()))
            .collect())
    }

    /// Every outbox row in insertion order, whatever its state.
    pub fn outbox_messages(&self) -> Result<Vec<OutboxMessage>, PersistenceError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| PersistenceError::LockPoisoned("outbox read"))?;
        Ok(tables.outbox.clone())
    }

    /// Append rows directly, outside any session.
    pub fn insert_outbox(&self, messages: impl IntoIterator<Item = OutboxMessage>) -> Result<(), PersistenceError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| PersistenceError::LockPoisoned("outbox write"))?;
        tables.outbox.extend(messages);
        Ok(())
    }
}

#[async_trait]
impl Database for InMemoryDatabase {
    type Session = InMemorySession;

    async fn begin(&self) -> Result<InMemorySession, PersistenceError> {
        Ok(InMemorySession {
            tables: Arc::clone(&self.tables),
            writes: Vec::new(),
            outbox: Vec::new(),
        })
    }
}

struct StagedWrite {
    table: String,
    id: Uuid,
    expected_version: u64,
    body: serde_json::Value,
    unique_fields: Vec<&'static str>,
}

/// Buffered change-set against an [`InMemoryDatabase`].
///
/// Reads see this session's own staged writes on top of committed state.
pub struct InMemorySession {
    tables: Arc<RwLock<Tables>>,
    writes: Vec<StagedWrite>,
    outbox: Vec<OutboxMessage>,
}

impl InMemorySession {
    pub fn document(&self, table: &str, id: Uuid) -> Result<Option<Document>, PersistenceError> {
        if let Some(write) = self
            .writes
            .iter()
            .rev()
            .find(|w| w.table == table && w.id == id)
        {
            return Ok(Some(staged_document(write)));
        }

        let tables = self
            .tables
            .read()
            .map_err(|_| PersistenceError::LockPoisoned("read"))?;
        Ok(tables.documents.get(&(table.to_string(), id)).cloned())
    }

    pub fn documents(&self, table: &str) -> Result<Vec<(Uuid, Document)>, PersistenceError> {
        let mut merged: HashMap<Uuid, Document> = {
            let tables = self
                .tables
                .read()
                .map_err(|_| PersistenceError::LockPoisoned("read"))?;
            tables
                .documents
                .iter()
                .filter(|((t, _), _)| t == table)
                .map(|((_, id), doc)| (*id, doc.clone()))
                .collect()
        };
        for write in self.writes.iter().filter(|w| w.table == table) {
            merged.insert(write.id, staged_document(write));
        }
        Ok(merged.into_iter().collect())
    }

    /// Stage a write of `body`. `expected_version` is the version the caller
    /// loaded, or 0 for a new document; commit fails if it no longer matches.
    pub fn put_document(&mut self, table: &str, id: Uuid, expected_version: u64, body: serde_json::Value) {
        self.put_unique_document(table, id, expected_version, body, &[]);
    }

    /// Like [`put_document`](Self::put_document), and commit also fails with
    /// [`PersistenceError::UniqueViolation`] if another document in `table`
    /// holds the same value for any of `unique_fields`. The constraint is
    /// named `{table}_{field}_key`.
    pub fn put_unique_document(
        &mut self,
        table: &str,
        id: Uuid,
        expected_version: u64,
        body: serde_json::Value,
        unique_fields: &[&'static str],
    ) {
        self.writes.push(StagedWrite {
            table: table.to_string(),
            id,
            expected_version,
            body,
            unique_fields: unique_fields.to_vec(),
        });
    }

    pub fn staged_outbox(&self) -> &[OutboxMessage] {
        &self.outbox
    }
}

/// Checks unique fields against the table as it would look after commit.
fn check_unique(tables: &Tables, writes: &[StagedWrite]) -> Result<(), PersistenceError> {
    for write in writes.iter().filter(|w| !w.unique_fields.is_empty()) {
        let mut after: HashMap<Uuid, &serde_json::Value> = tables
            .documents
            .iter()
            .filter(|((t, _), _)| *t == write.table)
            .map(|((_, id), doc)| (*id, &doc.body))
            .collect();
        for staged in writes.iter().filter(|w| w.table == write.table) {
            after.insert(staged.id, &staged.body);
        }

        for field in &write.unique_fields {
            let Some(value) = write.body.get(*field).filter(|v| !v.is_null()) else {
                continue;
            };
            let taken = after
                .iter()
                .any(|(id, body)| *id != write.id && body.get(*field) == Some(value));
            if taken {
                return Err(PersistenceError::UniqueViolation {
                    constraint: format!("{}_{}_key", write.table, field),
                });
            }
        }
    }
    Ok(())
}

fn staged_document(write: &StagedWrite) -> Document {
    Document {
        version: write.expected_version + 1,
        body: write.body.clone(),
    }
}

#[async_trait]
impl Session for InMemorySession {
    async fn stage_outbox(&mut self, messages: Vec<OutboxMessage>) -> Result<(), PersistenceError> {
        self.outbox.extend(messages);
        Ok(())
    }

    fn has_write_for(&self, id: Uuid) -> bool {
        self.writes.iter().any(|w| w.id == id)
    }

    async fn commit(self) -> Result<usize, PersistenceError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| PersistenceError::LockPoisoned("commit"))?;

        // Validate every write before applying any of them.
        let mut versions: HashMap<(String, Uuid), u64> = HashMap::new();
        for write in &self.writes {
            let key = (write.table.clone(), write.id);
            let actual = match versions.get(&key) {
                Some(version) => *version,
                None => tables.documents.get(&key).map_or(0, |doc| doc.version),
            };
            if actual != write.expected_version {
                return Err(PersistenceError::ConcurrentWrite {
                    id: format!("{}/{}", write.table, write.id),
                    expected: write.expected_version,
                    actual,
                });
            }
            versions.insert(key, write.expected_version + 1);
        }
        check_unique(&tables, &self.writes)?;

        let written = self.writes.len() + self.outbox.len();
        for write in self.writes {
            let document = staged_document(&write);
            tables.documents.insert((write.table, write.id), document);
        }
        tables.outbox.extend(self.outbox);

        Ok(written)
    }

    async fn rollback(self) -> Result<(), PersistenceError> {
        Ok(())
    }
}
