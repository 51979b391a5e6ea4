use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::info;

use crate::domain::{Location, ResolvedDataset};
use crate::error::DiveError;

pub const DATASET: &str = "Dataset";
pub const LOCATION: &str = "Location";
pub const SET: &str = "set";
pub const SET_LOCATION: &str = "setLocation";

const EVENT_CAPACITY: usize = 64;

/// All partitions held by the application store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StateTree {
    pub dataset: Option<Arc<ResolvedDataset>>,
    pub location: Option<Location>,
}

#[derive(Debug, Clone)]
pub enum Payload {
    Dataset(Arc<ResolvedDataset>),
    Location(Location),
}

/// Emitted after a mutation has been applied, in commit order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    pub partition: &'static str,
    pub mutation: &'static str,
}

type Mutation = fn(&mut StateTree, Payload) -> Result<(), DiveError>;

#[derive(Clone, Copy)]
struct Registration {
    partition: &'static str,
    mutation: &'static str,
    root_visible: bool,
    apply: Mutation,
}

pub struct Store {
    state: Mutex<StateTree>,
    mutations: HashMap<&'static str, HashMap<&'static str, Registration>>,
    events: broadcast::Sender<Committed>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::with_state(StateTree::default())
    }

    pub fn with_state(state: StateTree) -> Self {
        let (events, _rx) = broadcast::channel(EVENT_CAPACITY);
        let mut store = Self {
            state: Mutex::new(state),
            mutations: HashMap::new(),
            events,
        };
        // The dataset partition is namespaced: only the loader writes it.
        store.register(DATASET, SET, false, set_dataset);
        store.register(LOCATION, SET_LOCATION, true, set_location);
        store
    }

    fn register(
        &mut self,
        partition: &'static str,
        mutation: &'static str,
        root_visible: bool,
        apply: Mutation,
    ) {
        self.mutations.entry(partition).or_default().insert(
            mutation,
            Registration {
                partition,
                mutation,
                root_visible,
                apply,
            },
        );
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Committed> {
        self.events.subscribe()
    }

    pub fn dataset(&self) -> Option<Arc<ResolvedDataset>> {
        self.lock().dataset.clone()
    }

    pub fn location(&self) -> Option<Location> {
        self.lock().location.clone()
    }

    pub fn snapshot(&self) -> StateTree {
        self.lock().clone()
    }

    /// Root-scoped commit addressed as `Partition/mutation`.
    pub fn commit(&self, path: &str, payload: Payload) -> Result<(), DiveError> {
        let (partition, mutation) = path
            .split_once('/')
            .ok_or_else(|| DiveError::UnknownMutation(path.to_string()))?;
        let registration = self.lookup(partition, mutation)?;
        if !registration.root_visible {
            return Err(DiveError::PrivateMutation {
                mutation: path.to_string(),
            });
        }
        self.apply(registration, payload)
    }

    /// Commit from inside the partition's own module.
    pub(crate) fn commit_local(
        &self,
        partition: &str,
        mutation: &str,
        payload: Payload,
    ) -> Result<(), DiveError> {
        let registration = self.lookup(partition, mutation)?;
        self.apply(registration, payload)
    }

    pub fn set_location(&self, location: Location) -> Result<(), DiveError> {
        self.commit(
            &format!("{LOCATION}/{SET_LOCATION}"),
            Payload::Location(location),
        )
    }

    fn lookup(&self, partition: &str, mutation: &str) -> Result<Registration, DiveError> {
        self.mutations
            .get(partition)
            .and_then(|table| table.get(mutation))
            .copied()
            .ok_or_else(|| DiveError::UnknownMutation(format!("{partition}/{mutation}")))
    }

    fn apply(&self, registration: Registration, payload: Payload) -> Result<(), DiveError> {
        {
            let mut state = self.lock();
            (registration.apply)(&mut state, payload)?;
        }
        info!(
            partition = registration.partition,
            mutation = registration.mutation,
            "state committed"
        );
        // No receivers is not an error.
        let _ = self.events.send(Committed {
            partition: registration.partition,
            mutation: registration.mutation,
        });
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, StateTree> {
        // Mutations are single assignments, so a poisoned lock still holds whole values.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn set_dataset(state: &mut StateTree, payload: Payload) -> Result<(), DiveError> {
    match payload {
        Payload::Dataset(dataset) => {
            state.dataset = Some(dataset);
            Ok(())
        }
        Payload::Location(_) => Err(DiveError::PayloadMismatch(format!("{DATASET}/{SET}"))),
    }
}

fn set_location(state: &mut StateTree, payload: Payload) -> Result<(), DiveError> {
    match payload {
        Payload::Location(location) => {
            state.location = Some(location);
            Ok(())
        }
        Payload::Dataset(_) => Err(DiveError::PayloadMismatch(format!(
            "{LOCATION}/{SET_LOCATION}"
        ))),
    }
}
