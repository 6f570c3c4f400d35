//! In-memory transactional source.
//!
//! Each transform is applied in place under the write lock. The first write to a record saves its
//! prior state in an undo log, and a failing operation restores every saved record. Inverse
//! relationships are kept symmetric on every write, and relationship replacement diffs against the
//! current state so only identities that actually changed touch their inverse side.

use crate::error::SourceError;
use crate::operation::{Operation, Transform};
use crate::record::{Identity, Linkage, Record};
use crate::schema::{Dependent, RelationshipDefinition, Schema};
use crate::source::query::{filter_and_sort, Query, QueryExpression, QueryResult};
use crate::source::{RequestOptions, Source, TransformObservers};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

type Store = HashMap<String, BTreeMap<String, Record>>;

pub struct MemorySource {
    schema: Arc<Schema>,
    store: RwLock<Store>,
    observers: TransformObservers,
    activated: AtomicBool,
}

impl MemorySource {
    pub fn new(schema: Arc<Schema>) -> Self {
        let store = schema
            .model_names()
            .map(|t| (t.to_string(), BTreeMap::new()))
            .collect();
        MemorySource {
            schema,
            store: RwLock::new(store),
            observers: TransformObservers::new(),
            activated: AtomicBool::new(false),
        }
    }

    /// Load fixture records as one transform without notifying observers. Works before activation.
    pub fn seed(&self, records: Vec<Record>) -> Result<(), SourceError> {
        let transform = Transform::new(
            records
                .into_iter()
                .map(|record| Operation::AddRecord { record })
                .collect(),
        );
        self.apply(&transform).map(|_| ())
    }

    /// All stored records ordered by identity.
    pub fn snapshot(&self) -> Vec<Record> {
        let guard = self.store.read().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<Record> = guard.values().flat_map(|m| m.values().cloned()).collect();
        out.sort_by(|a, b| a.identity().cmp(&b.identity()));
        out
    }

    pub fn count(&self, type_name: &str) -> usize {
        let guard = self.store.read().unwrap_or_else(PoisonError::into_inner);
        guard.get(type_name).map(BTreeMap::len).unwrap_or(0)
    }

    fn ensure_active(&self) -> Result<(), SourceError> {
        if self.activated.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SourceError::NotActivated)
        }
    }

    fn apply(&self, transform: &Transform) -> Result<Vec<Option<Record>>, SourceError> {
        let mut guard = self.store.write().unwrap_or_else(PoisonError::into_inner);
        let mut changes = Changeset::new(&self.schema, &mut guard, transform);
        match changes.run(transform) {
            Ok(results) => Ok(results),
            Err(e) => {
                let restored = changes.rollback();
                tracing::debug!(transform = %transform.id, restored, error = %e, "transform rolled back");
                Err(e)
            }
        }
    }

    fn run(&self, query: &Query) -> Result<Vec<QueryResult>, SourceError> {
        let guard = self.store.read().unwrap_or_else(PoisonError::into_inner);
        query
            .expressions
            .iter()
            .map(|expr| self.evaluate(&guard, expr))
            .collect()
    }

    fn evaluate(&self, store: &Store, expr: &QueryExpression) -> Result<QueryResult, SourceError> {
        let lookup = |identity: &Identity| store.get(&identity.type_name).and_then(|m| m.get(&identity.id));
        match expr {
            QueryExpression::FindRecord { record } => lookup(record)
                .cloned()
                .map(|r| QueryResult::Record(Some(r)))
                .ok_or_else(|| SourceError::RecordNotFound(record.clone())),
            QueryExpression::FindRecords { type_name, filter, sort } => {
                if !self.schema.has_model(type_name) {
                    return Err(SourceError::ModelNotFound(type_name.clone()));
                }
                let records = store
                    .get(type_name)
                    .map(|m| m.values().cloned().collect::<Vec<_>>())
                    .unwrap_or_default();
                Ok(QueryResult::Records(filter_and_sort(records, filter, sort)))
            }
            QueryExpression::FindRelatedRecords { record, relationship }
            | QueryExpression::FindRelatedRecord { record, relationship } => {
                let parent = lookup(record).ok_or_else(|| SourceError::RecordNotFound(record.clone()))?;
                let def = self
                    .schema
                    .relationship(&record.type_name, relationship)
                    .ok_or_else(|| SourceError::RelationshipNotFound {
                        model: record.type_name.clone(),
                        relationship: relationship.clone(),
                    })?;
                let related: Vec<Record> = parent
                    .relationships
                    .get(relationship)
                    .map(|l| l.identities().into_iter().filter_map(|i| lookup(i).cloned()).collect())
                    .unwrap_or_default();
                let wants_many = matches!(expr, QueryExpression::FindRelatedRecords { .. });
                if wants_many != def.is_many() {
                    return Err(SourceError::Validation(format!(
                        "{}.{} is a {} relationship",
                        record.type_name,
                        relationship,
                        if def.is_many() { "hasMany" } else { "hasOne" }
                    )));
                }
                if wants_many {
                    Ok(QueryResult::Records(related))
                } else {
                    Ok(QueryResult::Record(related.into_iter().next()))
                }
            }
        }
    }
}

#[async_trait]
impl Source for MemorySource {
    fn schema(&self) -> Arc<Schema> {
        self.schema.clone()
    }

    async fn query(&self, query: Query, options: &RequestOptions) -> Result<Vec<QueryResult>, SourceError> {
        self.ensure_active()?;
        tracing::debug!(
            query = %query.id,
            expressions = query.expressions.len(),
            include = ?options.include,
            "query"
        );
        self.run(&query)
    }

    async fn update(&self, transform: Transform, _options: &RequestOptions) -> Result<Vec<Option<Record>>, SourceError> {
        self.ensure_active()?;
        tracing::debug!(
            transform = %transform.id,
            operations = transform.operations.len(),
            "update"
        );
        let results = self.apply(&transform)?;
        self.observers.notify(&transform);
        Ok(results)
    }

    fn observers(&self) -> &TransformObservers {
        &self.observers
    }

    async fn activate(&self) -> Result<(), SourceError> {
        self.activated.store(true, Ordering::SeqCst);
        tracing::info!(models = self.schema.model_names().count(), "memory source activated");
        Ok(())
    }

    async fn deactivate(&self) -> Result<(), SourceError> {
        self.activated.store(false, Ordering::SeqCst);
        tracing::info!("memory source deactivated");
        Ok(())
    }

    fn is_activated(&self) -> bool {
        self.activated.load(Ordering::SeqCst)
    }
}

/// Working state of one transform.
struct Changeset<'a> {
    schema: &'a Schema,
    store: &'a mut Store,
    /// Adds of this transform that have not run yet, per identity. Their records may be
    /// referenced before the create runs.
    upcoming: HashMap<Identity, usize>,
    /// Inverse links owed to records that do not exist yet: target -> [(relationship on target, owner)].
    pending: HashMap<Identity, Vec<(String, Identity)>>,
    /// State of every touched record before this transform; `None` for records it created.
    undo: HashMap<Identity, Option<Record>>,
}

impl<'a> Changeset<'a> {
    fn new(schema: &'a Schema, store: &'a mut Store, transform: &Transform) -> Self {
        Changeset {
            schema,
            store,
            upcoming: transform
                .created_identities()
                .into_iter()
                .fold(HashMap::new(), |mut upcoming, identity| {
                    *upcoming.entry(identity).or_insert(0) += 1;
                    upcoming
                }),
            pending: HashMap::new(),
            undo: HashMap::new(),
        }
    }

    fn run(&mut self, transform: &Transform) -> Result<Vec<Option<Record>>, SourceError> {
        let mut results = Vec::with_capacity(transform.operations.len());
        for op in &transform.operations {
            results.push(self.apply(op)?);
        }
        self.finish()?;
        Ok(results)
    }

    /// Put every touched record back as it was. Returns the number of records restored.
    fn rollback(self) -> usize {
        let restored = self.undo.len();
        for (identity, original) in self.undo {
            let records = self.store.entry(identity.type_name).or_default();
            match original {
                Some(record) => {
                    records.insert(identity.id, record);
                }
                None => {
                    records.remove(&identity.id);
                }
            }
        }
        restored
    }

    fn touch(&mut self, identity: &Identity) {
        if !self.undo.contains_key(identity) {
            let original = self.get(identity).cloned();
            self.undo.insert(identity.clone(), original);
        }
    }

    fn get(&self, identity: &Identity) -> Option<&Record> {
        self.store.get(&identity.type_name)?.get(&identity.id)
    }

    fn get_mut(&mut self, identity: &Identity) -> Option<&mut Record> {
        self.touch(identity);
        self.store.get_mut(&identity.type_name)?.get_mut(&identity.id)
    }

    fn exists(&self, identity: &Identity) -> bool {
        self.get(identity).is_some()
    }

    fn require(&self, identity: &Identity) -> Result<&Record, SourceError> {
        self.get(identity)
            .ok_or_else(|| SourceError::RecordNotFound(identity.clone()))
    }

    fn relationship_def(&self, type_name: &str, relationship: &str) -> Result<&'a RelationshipDefinition, SourceError> {
        self.schema
            .relationship(type_name, relationship)
            .ok_or_else(|| SourceError::RelationshipNotFound {
                model: type_name.to_string(),
                relationship: relationship.to_string(),
            })
    }

    fn check_target(&self, owner: &Identity, relationship: &str, def: &RelationshipDefinition, target: &Identity) -> Result<(), SourceError> {
        if !def.target.accepts(&target.type_name) {
            return Err(SourceError::Validation(format!(
                "{}.{} does not accept records of type '{}'",
                owner.type_name, relationship, target.type_name
            )));
        }
        if !self.exists(target) && !self.upcoming.contains_key(target) {
            return Err(SourceError::RecordNotFound(target.clone()));
        }
        Ok(())
    }

    fn consume_upcoming(&mut self, identity: &Identity) {
        if let Some(count) = self.upcoming.get_mut(identity) {
            *count -= 1;
            if *count == 0 {
                self.upcoming.remove(identity);
            }
        }
    }

    fn expect_kind(owner: &Identity, relationship: &str, def: &RelationshipDefinition, many: bool) -> Result<(), SourceError> {
        if def.is_many() == many {
            Ok(())
        } else {
            Err(SourceError::Validation(format!(
                "{}.{} is a {} relationship",
                owner.type_name,
                relationship,
                if def.is_many() { "hasMany" } else { "hasOne" }
            )))
        }
    }

    fn apply(&mut self, op: &Operation) -> Result<Option<Record>, SourceError> {
        match op {
            Operation::AddRecord { record } => {
                self.consume_upcoming(&record.identity());
                self.add_record(record)?;
                Ok(self.get(&record.identity()).cloned())
            }
            Operation::UpdateRecord { record } => {
                self.update_record(record)?;
                Ok(self.get(&record.identity()).cloned())
            }
            Operation::RemoveRecord { record } => {
                self.remove_record(record, &mut HashSet::new())?;
                Ok(None)
            }
            Operation::AddToRelatedRecords {
                record,
                relationship,
                related_record,
            } => {
                self.require(record)?;
                let def = self.relationship_def(&record.type_name, relationship)?;
                Self::expect_kind(record, relationship, def, true)?;
                self.relate(record, relationship, related_record)?;
                Ok(self.get(record).cloned())
            }
            Operation::RemoveFromRelatedRecords {
                record,
                relationship,
                related_record,
            } => {
                self.require(record)?;
                let def = self.relationship_def(&record.type_name, relationship)?;
                Self::expect_kind(record, relationship, def, true)?;
                self.check_target(record, relationship, def, related_record)?;
                self.unrelate(record, relationship, related_record)?;
                Ok(self.get(record).cloned())
            }
            Operation::ReplaceRelatedRecords {
                record,
                relationship,
                related_records,
            } => {
                self.require(record)?;
                self.replace_many(record, relationship, related_records)?;
                Ok(self.get(record).cloned())
            }
            Operation::ReplaceRelatedRecord {
                record,
                relationship,
                related_record,
            } => {
                self.require(record)?;
                self.replace_one(record, relationship, related_record.as_ref())?;
                Ok(self.get(record).cloned())
            }
        }
    }

    fn add_record(&mut self, record: &Record) -> Result<(), SourceError> {
        let model = self
            .schema
            .model(&record.type_name)
            .map_err(|_| SourceError::ModelNotFound(record.type_name.clone()))?;
        let identity = record.identity();
        if self.exists(&identity) {
            return Err(SourceError::Validation(format!("record {} already exists", identity)));
        }

        let mut stored = Record::new(record.type_name.clone(), record.id.clone());
        stored.attributes = record
            .attributes
            .iter()
            .filter(|(k, _)| model.attributes.contains_key(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (name, def) in &model.relationships {
            let empty = if def.is_many() {
                Linkage::Many(Vec::new())
            } else {
                Linkage::One(None)
            };
            stored.relationships.insert(name.clone(), empty);
        }
        self.touch(&identity);
        self.store
            .entry(record.type_name.clone())
            .or_default()
            .insert(record.id.clone(), stored);

        for (name, linkage) in &record.relationships {
            if model.relationships.contains_key(name) {
                self.replace_linkage(&identity, name, linkage)?;
            }
        }
        if let Some(links) = self.pending.remove(&identity) {
            for (relationship, owner) in links {
                self.relate(&identity, &relationship, &owner)?;
            }
        }
        Ok(())
    }

    fn update_record(&mut self, record: &Record) -> Result<(), SourceError> {
        let model = self
            .schema
            .model(&record.type_name)
            .map_err(|_| SourceError::ModelNotFound(record.type_name.clone()))?;
        let identity = record.identity();
        let stored = self
            .get_mut(&identity)
            .ok_or_else(|| SourceError::RecordNotFound(identity.clone()))?;
        for (k, v) in &record.attributes {
            if model.attributes.contains_key(k) {
                stored.attributes.insert(k.clone(), v.clone());
            }
        }
        for (name, linkage) in &record.relationships {
            if model.relationships.contains_key(name) {
                self.replace_linkage(&identity, name, linkage)?;
            }
        }
        Ok(())
    }

    fn remove_record(&mut self, identity: &Identity, removing: &mut HashSet<Identity>) -> Result<(), SourceError> {
        if removing.contains(identity) {
            return Ok(());
        }
        let record = self.require(identity)?.clone();
        removing.insert(identity.clone());
        for (name, linkage) in &record.relationships {
            let Some(def) = self.schema.relationship(&identity.type_name, name) else { continue };
            for related in linkage.identities() {
                if let Some(inverse) = def.inverse.as_deref() {
                    self.raw_remove(related, inverse, identity);
                }
                if def.dependent == Some(Dependent::Remove) && self.exists(related) {
                    self.remove_record(related, removing)?;
                }
            }
        }
        // Links declared without an inverse have no back-pointer; sweep the models that can hold one.
        let mut linked = Vec::new();
        for (type_name, model) in self.schema.models() {
            let holds_one_way_link = model
                .relationships
                .values()
                .any(|def| def.inverse.is_none() && def.target.accepts(&identity.type_name));
            if !holds_one_way_link {
                continue;
            }
            let Some(records) = self.store.get(type_name) else { continue };
            linked.extend(
                records
                    .values()
                    .filter(|other| other.relationships.values().any(|l| l.contains(identity)))
                    .map(Record::identity),
            );
        }
        for owner in linked {
            if let Some(other) = self.get_mut(&owner) {
                for linkage in other.relationships.values_mut() {
                    unlink(linkage, identity);
                }
            }
        }
        self.touch(identity);
        if let Some(records) = self.store.get_mut(&identity.type_name) {
            records.remove(&identity.id);
        }
        Ok(())
    }

    fn replace_linkage(&mut self, owner: &Identity, relationship: &str, linkage: &Linkage) -> Result<(), SourceError> {
        match linkage {
            Linkage::Many(ids) => self.replace_many(owner, relationship, ids),
            Linkage::One(id) => self.replace_one(owner, relationship, id.as_ref()),
        }
    }

    fn replace_many(&mut self, owner: &Identity, relationship: &str, related: &[Identity]) -> Result<(), SourceError> {
        let def = self.relationship_def(&owner.type_name, relationship)?;
        Self::expect_kind(owner, relationship, def, true)?;
        for target in related {
            self.check_target(owner, relationship, def, target)?;
        }
        let current: Vec<Identity> = self
            .require(owner)?
            .relationships
            .get(relationship)
            .map(|l| l.identities().into_iter().cloned().collect())
            .unwrap_or_default();
        for removed in current.iter().filter(|c| !related.contains(c)) {
            self.unrelate(owner, relationship, removed)?;
        }
        for added in related.iter().filter(|r| !current.contains(r)) {
            self.relate(owner, relationship, added)?;
        }
        let mut ordered: Vec<Identity> = Vec::with_capacity(related.len());
        for r in related {
            if !ordered.contains(r) {
                ordered.push(r.clone());
            }
        }
        if let Some(stored) = self.get_mut(owner) {
            stored
                .relationships
                .insert(relationship.to_string(), Linkage::Many(ordered));
        }
        Ok(())
    }

    fn replace_one(&mut self, owner: &Identity, relationship: &str, related: Option<&Identity>) -> Result<(), SourceError> {
        let def = self.relationship_def(&owner.type_name, relationship)?;
        Self::expect_kind(owner, relationship, def, false)?;
        match related {
            Some(target) => self.relate(owner, relationship, target),
            None => {
                let current = self
                    .require(owner)?
                    .relationships
                    .get(relationship)
                    .and_then(|l| l.identities().into_iter().next().cloned());
                match current {
                    Some(current) => self.unrelate(owner, relationship, &current),
                    None => Ok(()),
                }
            }
        }
    }

    /// Link `owner.relationship -> target` and the inverse side, displacing whatever a hasOne slot held.
    fn relate(&mut self, owner: &Identity, relationship: &str, target: &Identity) -> Result<(), SourceError> {
        let def = self.relationship_def(&owner.type_name, relationship)?;
        self.check_target(owner, relationship, def, target)?;
        let current = self.require(owner)?.relationships.get(relationship).cloned();
        if current.as_ref().map(|l| l.contains(target)).unwrap_or(false) {
            return Ok(());
        }
        if let Some(Linkage::One(Some(previous))) = current {
            self.unrelate(owner, relationship, &previous)?;
        }
        self.raw_add(owner, relationship, def, target);

        let Some(inverse) = def.inverse.as_deref() else { return Ok(()) };
        if !self.exists(target) {
            self.pending
                .entry(target.clone())
                .or_default()
                .push((inverse.to_string(), owner.clone()));
            return Ok(());
        }
        let inverse_def = self.relationship_def(&target.type_name, inverse)?;
        if !inverse_def.is_many() {
            let previous = self
                .get(target)
                .and_then(|r| r.relationships.get(inverse))
                .and_then(|l| l.identities().into_iter().next().cloned());
            if let Some(previous) = previous.filter(|p| p != owner) {
                let back = inverse_def.inverse.as_deref().unwrap_or(relationship);
                self.raw_remove(&previous, back, target);
            }
        }
        self.raw_add(target, inverse, inverse_def, owner);
        Ok(())
    }

    fn unrelate(&mut self, owner: &Identity, relationship: &str, target: &Identity) -> Result<(), SourceError> {
        let def = self.relationship_def(&owner.type_name, relationship)?;
        self.raw_remove(owner, relationship, target);
        if let Some(inverse) = def.inverse.as_deref() {
            if self.exists(target) {
                self.raw_remove(target, inverse, owner);
            } else if let Some(links) = self.pending.get_mut(target) {
                links.retain(|(r, o)| !(r == inverse && o == owner));
            }
        }
        Ok(())
    }

    fn raw_add(&mut self, owner: &Identity, relationship: &str, def: &RelationshipDefinition, target: &Identity) {
        let Some(record) = self.get_mut(owner) else { return };
        let slot = record
            .relationships
            .entry(relationship.to_string())
            .or_insert_with(|| {
                if def.is_many() {
                    Linkage::Many(Vec::new())
                } else {
                    Linkage::One(None)
                }
            });
        match slot {
            Linkage::Many(ids) => {
                if !ids.contains(target) {
                    ids.push(target.clone());
                }
            }
            Linkage::One(id) => *id = Some(target.clone()),
        }
    }

    fn raw_remove(&mut self, owner: &Identity, relationship: &str, target: &Identity) {
        if let Some(linkage) = self.get_mut(owner).and_then(|r| r.relationships.get_mut(relationship)) {
            unlink(linkage, target);
        }
    }

    fn finish(&self) -> Result<(), SourceError> {
        match self.pending.iter().find(|(_, links)| !links.is_empty()) {
            Some((target, _)) => Err(SourceError::RecordNotFound(target.clone())),
            None => Ok(()),
        }
    }
}

fn unlink(linkage: &mut Linkage, target: &Identity) {
    match linkage {
        Linkage::Many(ids) => ids.retain(|i| i != target),
        Linkage::One(id) => {
            if id.as_ref() == Some(target) {
                *id = None;
            }
        }
    }
}
