//! Processor-scoped state shared across packets: runtime calibration
//! overrides and the extraction subscription.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::mdb::{
    Calibrator, ContainerIdx, ContextCalibrator, DataEncoding, EntryKind, MissionDatabase,
    NumericCalibration, ParameterIdx,
};

type OverrideMap = HashMap<ParameterIdx, NumericCalibration>;

/// Runtime overrides layered on top of the static MDB calibration.
///
/// Writers clone the override map, modify the copy, and swap the `Arc`;
/// extraction takes one [`CalibrationSnapshot`] per packet, so a packet sees
/// a consistent set of calibrators even while overrides change concurrently.
#[derive(Debug)]
pub struct ProcessorData {
    mdb: Arc<MissionDatabase>,
    overrides: RwLock<Arc<OverrideMap>>,
}

impl ProcessorData {
    pub fn new(mdb: Arc<MissionDatabase>) -> Self {
        ProcessorData {
            mdb,
            overrides: RwLock::new(Arc::new(OverrideMap::new())),
        }
    }

    /// Replaces the default calibrator for `p` from now on. `None` removes
    /// the default while keeping any context calibrators in effect.
    pub fn set_default_calibrator(&self, p: ParameterIdx, calibrator: Option<Calibrator>) {
        self.update(p, |nc| nc.default = calibrator);
    }

    /// Replaces the context calibrator list for `p` from now on.
    pub fn set_context_calibrators(&self, p: ParameterIdx, context: Vec<ContextCalibrator>) {
        self.update(p, |nc| nc.context = context);
    }

    /// Reverts `p` to the calibration defined in the MDB.
    pub fn clear_parameter_overrides(&self, p: ParameterIdx) {
        let mut guard = self.overrides.write().unwrap_or_else(|e| e.into_inner());
        let mut map = OverrideMap::clone(&guard);
        map.remove(&p);
        *guard = Arc::new(map);
    }

    fn update(&self, p: ParameterIdx, f: impl FnOnce(&mut NumericCalibration)) {
        let mut guard = self.overrides.write().unwrap_or_else(|e| e.into_inner());
        let mut map = OverrideMap::clone(&guard);
        let nc = map
            .entry(p)
            .or_insert_with(|| self.static_calibration(p).cloned().unwrap_or_default());
        f(nc);
        *guard = Arc::new(map);
    }

    fn static_calibration(&self, p: ParameterIdx) -> Option<&NumericCalibration> {
        match self.mdb.parameter(p).ptype.encoding()? {
            DataEncoding::Integer(e) => Some(&e.calibration),
            DataEncoding::Float(e) => Some(&e.calibration),
            _ => None,
        }
    }

    /// The override map as of now; cheap to take, immutable afterwards.
    pub fn calibration_snapshot(&self) -> CalibrationSnapshot {
        let guard = self.overrides.read().unwrap_or_else(|e| e.into_inner());
        CalibrationSnapshot(Arc::clone(&guard))
    }
}

/// Immutable view of the calibration overrides, valid for one packet.
#[derive(Debug, Clone)]
pub struct CalibrationSnapshot(Arc<OverrideMap>);

impl CalibrationSnapshot {
    pub fn get(&self, p: ParameterIdx) -> Option<&NumericCalibration> {
        self.0.get(&p)
    }
}

/// Which parameters and containers extraction should deliver.
///
/// Subscribing a parameter pulls in every container that can produce it plus
/// that container's whole inheritance chain, so the walk can actually reach
/// the entry. Subscribing a container pulls in its ancestors for the same
/// reason; derived containers are only descended into when subscribed.
#[derive(Debug, Clone, Default)]
pub struct Subscription {
    all: bool,
    parameters: HashSet<ParameterIdx>,
    containers: HashSet<ContainerIdx>,
}

impl Subscription {
    pub fn new() -> Self {
        Subscription::default()
    }

    /// Deliver every parameter and descend into every container.
    pub fn provide_all(&mut self) {
        self.all = true;
    }

    pub fn start_providing(&mut self, mdb: &MissionDatabase, p: ParameterIdx) {
        self.parameters.insert(p);
        for c in mdb.containers_producing(p) {
            self.add_container_with_ancestors(mdb, c);
        }
        self.close_over_container_entries(mdb);
    }

    pub fn start_providing_container(&mut self, mdb: &MissionDatabase, c: ContainerIdx) {
        self.add_container_with_ancestors(mdb, c);
        self.close_over_container_entries(mdb);
    }

    fn add_container_with_ancestors(&mut self, mdb: &MissionDatabase, c: ContainerIdx) {
        self.containers.insert(c);
        for a in mdb.ancestors(c) {
            self.containers.insert(a);
        }
    }

    /// A subscribed container referenced through a `ContainerEntry` is only
    /// reachable if the referencing container is walked too. Iterate until
    /// the container set is closed under that relation.
    fn close_over_container_entries(&mut self, mdb: &MissionDatabase) {
        loop {
            let mut added = Vec::new();
            for i in 0..mdb.container_count() {
                if self.containers.contains(&i) {
                    continue;
                }
                let referencing = mdb.container(i).entries.iter().any(|e| {
                    matches!(&e.kind, EntryKind::Container(sub) if self.containers.contains(sub))
                });
                if referencing {
                    added.push(i);
                }
            }
            if added.is_empty() {
                return;
            }
            for c in added {
                self.add_container_with_ancestors(mdb, c);
            }
        }
    }

    pub fn includes_all(&self) -> bool {
        self.all
    }

    pub fn includes_parameter(&self, p: ParameterIdx) -> bool {
        self.all || self.parameters.contains(&p)
    }

    pub fn includes_container(&self, c: ContainerIdx) -> bool {
        self.all || self.containers.contains(&c)
    }
}
