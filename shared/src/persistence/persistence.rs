use std::{
    sync::{mpsc, Arc},
    thread::{self, JoinHandle},
};

use log::{debug, warn};

use crate::{
    facet::{facet::ReplicaFacet, facet_kind::FacetKind},
    persistence::{
        database::PlayerDatabase,
        error::DatabaseError,
    },
    record::record::Record,
    types::EntityId,
};

/// A facet fetched from a backend, waiting to be applied on the next dispatch
pub struct LoadedFacet {
    pub entity_id: EntityId,
    pub facet: Box<dyn ReplicaFacet>,
}

/// Completion side of the load queue. Cloned into every background load.
#[derive(Clone)]
pub struct LoadSender {
    sender: mpsc::Sender<LoadedFacet>,
}

impl LoadSender {
    pub fn send(&self, entity_id: EntityId, facet: Box<dyn ReplicaFacet>) {
        if self.sender.send(LoadedFacet { entity_id, facet }).is_err() {
            debug!("Dropping loaded facet, persistence is gone");
        }
    }
}

trait ErasedDatabase: Send + Sync {
    fn kind(&self) -> FacetKind;
    fn load(&self, entity_id: &EntityId) -> Result<Option<Box<dyn ReplicaFacet>>, DatabaseError>;
    fn save(&self, facet: Box<dyn ReplicaFacet>) -> Result<(), DatabaseError>;
}

struct DatabaseHandle<D: PlayerDatabase>(D);

impl<D: PlayerDatabase> ErasedDatabase for DatabaseHandle<D> {
    fn kind(&self) -> FacetKind {
        FacetKind::of::<D::Facet>()
    }

    fn load(&self, entity_id: &EntityId) -> Result<Option<Box<dyn ReplicaFacet>>, DatabaseError> {
        if !self.0.contains(entity_id)? {
            return Ok(None);
        }
        let facet: Box<dyn ReplicaFacet> = Box::new(self.0.get(entity_id)?);
        Ok(Some(facet))
    }

    fn save(&self, facet: Box<dyn ReplicaFacet>) -> Result<(), DatabaseError> {
        let Ok(facet) = facet.into_any().downcast::<D::Facet>() else {
            return Err(DatabaseError::Serialization {
                entity_id: String::new(),
                reason: format!("facet is not a {}", FacetKind::of::<D::Facet>()),
            });
        };
        self.0.set(&facet)
    }
}

enum Job {
    Load {
        database: Arc<dyn ErasedDatabase>,
        entity_id: EntityId,
    },
    Save {
        database: Arc<dyn ErasedDatabase>,
        facet: Box<dyn ReplicaFacet>,
        entity_id: Option<EntityId>,
    },
    Flush(mpsc::Sender<()>),
}

struct Worker {
    jobs: mpsc::Sender<Job>,
    handle: JoinHandle<()>,
}

impl Worker {
    fn spawn(loaded: LoadSender) -> Self {
        let (jobs, queue) = mpsc::channel();
        let handle = thread::spawn(move || {
            for job in queue {
                run_job(job, &loaded);
            }
        });
        Self { jobs, handle }
    }
}

fn run_job(job: Job, loaded: &LoadSender) {
    match job {
        Job::Load {
            database,
            entity_id,
        } => match database.load(&entity_id) {
            Ok(Some(facet)) => loaded.send(entity_id, facet),
            Ok(None) => debug!("No {} stored for {}", database.kind(), entity_id),
            Err(err) => warn!(
                "Failed to load {} for {}: {}",
                database.kind(),
                entity_id,
                err
            ),
        },
        Job::Save {
            database,
            facet,
            entity_id,
        } => {
            if let Err(err) = database.save(facet) {
                warn!(
                    "Failed to save {} for {:?}: {}",
                    database.kind(),
                    entity_id,
                    err
                );
            }
        }
        Job::Flush(done) => {
            let _ = done.send(());
        }
    }
}

/// Load and save hooks backed by any number of [`PlayerDatabase`]s, one per
/// stored facet type.
///
/// Backend calls run in submission order on a single background worker,
/// started on first use. Loaded facets come back through a completion queue
/// which the owning registry drains on its dispatch path.
pub struct Persistence {
    databases: Vec<Arc<dyn ErasedDatabase>>,
    sender: LoadSender,
    receiver: mpsc::Receiver<LoadedFacet>,
    worker: Option<Worker>,
}

impl Default for Persistence {
    fn default() -> Self {
        Self::new()
    }
}

impl Persistence {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            databases: Vec::new(),
            sender: LoadSender { sender },
            receiver,
            worker: None,
        }
    }

    pub fn add_database<D: PlayerDatabase>(&mut self, database: D) -> &mut Self {
        self.databases.push(Arc::new(DatabaseHandle(database)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }

    pub fn load_sender(&self) -> LoadSender {
        self.sender.clone()
    }

    /// Asks every backend for its entry on `entity_id`
    pub fn load(&mut self, entity_id: &EntityId) {
        for index in 0..self.databases.len() {
            let job = Job::Load {
                database: self.databases[index].clone(),
                entity_id: entity_id.clone(),
            };
            self.submit(job);
        }
    }

    /// Hands every stored facet `record` carries to its backend
    pub fn save(&mut self, record: &Record) {
        for index in 0..self.databases.len() {
            let database = self.databases[index].clone();
            let Some(facet) = record.facet(&database.kind()) else {
                continue;
            };
            let job = Job::Save {
                facet: facet.clone_boxed(),
                database,
                entity_id: record.entity_id().cloned(),
            };
            self.submit(job);
        }
    }

    fn submit(&mut self, job: Job) {
        let sender = self.sender.clone();
        let worker = self.worker.get_or_insert_with(|| Worker::spawn(sender));
        if let Err(mpsc::SendError(job)) = worker.jobs.send(job) {
            warn!("Persistence worker is gone, running job inline");
            run_job(job, &self.sender);
        }
    }

    /// Every load that completed since the last drain
    pub fn drain_loaded(&self) -> Vec<LoadedFacet> {
        self.receiver.try_iter().collect()
    }

    /// Blocks until every queued load and save has finished
    pub fn flush(&mut self) {
        let Some(worker) = &self.worker else {
            return;
        };
        let (done, wait) = mpsc::channel();
        if worker.jobs.send(Job::Flush(done)).is_err() || wait.recv().is_err() {
            warn!("Persistence worker panicked");
        }
    }
}

impl Drop for Persistence {
    fn drop(&mut self) {
        let Some(Worker { jobs, handle }) = self.worker.take() else {
            return;
        };
        // closing the queue lets the worker finish what is left and exit
        drop(jobs);
        if handle.join().is_err() {
            warn!("Persistence worker panicked");
        }
    }
}
