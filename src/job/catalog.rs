// src/job/catalog.rs

//! Mutable collection of job specs, consumed when the engine is configured.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::errors::{JobdagError, Result};
use crate::job::spec::JobSpec;

static NEXT_CATALOG: AtomicU64 = AtomicU64::new(1);

/// Handle to a job inside one [`JobCatalog`].
///
/// Each catalog stamps its own identity into the handles it issues, so a
/// handle from another catalog is reported as an unknown job instead of
/// silently aliasing a local one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId {
    catalog: u64,
    index: usize,
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job#{}.{}", self.catalog, self.index)
    }
}

/// Jobs and dependency edges declared before the graph is built.
///
/// Dependencies can be declared on the spec itself ([`JobSpec::after`]) or
/// added later with [`JobCatalog::depends_on`], e.g. to attach jobs that
/// are generated from data. Once the catalog is handed to the engine it is
/// gone, so the dependency set cannot change while jobs run.
#[derive(Debug)]
pub struct JobCatalog {
    id: u64,
    specs: Vec<JobSpec>,
    names: HashMap<String, JobId>,
}

impl JobCatalog {
    pub fn new() -> Self {
        Self {
            id: NEXT_CATALOG.fetch_add(1, Ordering::Relaxed),
            specs: Vec::new(),
            names: HashMap::new(),
        }
    }

    /// Add a job. Names must be unique within a catalog.
    pub fn add(&mut self, spec: JobSpec) -> Result<JobId> {
        if self.names.contains_key(&spec.name) {
            return Err(JobdagError::DuplicateJob(spec.name.clone()));
        }

        let id = JobId {
            catalog: self.id,
            index: self.specs.len(),
        };
        self.names.insert(spec.name.clone(), id);
        self.specs.push(spec);
        Ok(id)
    }

    /// Add a dependency edge: `dependent` will wait for `dependency`.
    ///
    /// Only `dependent` must belong to this catalog here; the dependency is
    /// resolved (and self-references rejected) when the graph is built.
    pub fn depends_on(&mut self, dependent: JobId, dependency: JobId) -> Result<()> {
        if !self.contains(dependent) {
            return Err(JobdagError::UnknownJob(format!(
                "{dependent} is not part of this catalog"
            )));
        }

        let deps = &mut self.specs[dependent.index].deps;
        if !deps.contains(&dependency) {
            deps.push(dependency);
        }
        Ok(())
    }

    pub fn get(&self, id: JobId) -> Option<&JobSpec> {
        if self.contains(id) {
            self.specs.get(id.index)
        } else {
            None
        }
    }

    pub fn id_of(&self, name: &str) -> Option<JobId> {
        self.names.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub(crate) fn contains(&self, id: JobId) -> bool {
        id.catalog == self.id && id.index < self.specs.len()
    }

    pub(crate) fn index_of(&self, id: JobId) -> Option<usize> {
        self.contains(id).then_some(id.index)
    }

    pub(crate) fn spec_at(&self, index: usize) -> Option<&JobSpec> {
        self.specs.get(index)
    }

    /// Hand the specs over to the graph builder, one slot per job.
    pub(crate) fn into_slots(self) -> Vec<Option<JobSpec>> {
        self.specs.into_iter().map(Some).collect()
    }
}

impl Default for JobCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_are_rejected() {
        let mut catalog = JobCatalog::new();
        catalog.add(JobSpec::dummy("a")).unwrap();

        let err = catalog.add(JobSpec::dummy("a")).unwrap_err();
        assert!(matches!(err, JobdagError::DuplicateJob(name) if name == "a"));
    }

    #[test]
    fn handles_from_other_catalogs_are_not_ours() {
        let mut mine = JobCatalog::new();
        let mut theirs = JobCatalog::new();
        let a = mine.add(JobSpec::dummy("a")).unwrap();
        let foreign = theirs.add(JobSpec::dummy("a")).unwrap();

        assert!(mine.get(foreign).is_none());
        assert!(matches!(
            mine.depends_on(foreign, a),
            Err(JobdagError::UnknownJob(_))
        ));
    }

    #[test]
    fn depends_on_deduplicates_edges() {
        let mut catalog = JobCatalog::new();
        let a = catalog.add(JobSpec::dummy("a")).unwrap();
        let b = catalog.add(JobSpec::dummy("b").after(a)).unwrap();

        catalog.depends_on(b, a).unwrap();

        assert_eq!(catalog.get(b).unwrap().dependencies(), &[a]);
        assert_eq!(catalog.id_of("b"), Some(b));
    }
}
