//! Extracted parameter values and the insertion-ordered result list.

use std::collections::{HashMap, VecDeque};

use crate::mdb::ParameterIdx;
use crate::value::Value;

/// Whether a value made it out of the packet intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcquisitionStatus {
    #[default]
    Valid,
    /// Raw extraction succeeded but the engineering conversion failed; the
    /// raw value is retained, the engineering value is absent.
    Invalid,
    NotReceived,
}

/// One extracted instance of a parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterValue {
    pub parameter: ParameterIdx,
    pub raw_value: Option<Value>,
    pub eng_value: Option<Value>,
    /// When the value was produced on board, ms since the unix epoch.
    pub generation_time: i64,
    /// When the packet was received, ms since the unix epoch.
    pub acquisition_time: i64,
    /// How long the value stays fresh, derived from the container's expected
    /// rate in stream.
    pub expire_millis: Option<i64>,
    pub status: AcquisitionStatus,
    /// Absolute bit offset of the raw data inside the packet.
    pub start_bit: usize,
    /// Number of bits the raw data occupied.
    pub bit_size: usize,
}

impl ParameterValue {
    pub fn new(parameter: ParameterIdx, generation_time: i64, acquisition_time: i64) -> Self {
        ParameterValue {
            parameter,
            raw_value: None,
            eng_value: None,
            generation_time,
            acquisition_time,
            expire_millis: None,
            status: AcquisitionStatus::Valid,
            start_bit: 0,
            bit_size: 0,
        }
    }

    /// Raw or engineering value, per the caller's preference.
    pub fn value(&self, calibrated: bool) -> Option<&Value> {
        if calibrated {
            self.eng_value.as_ref()
        } else {
            self.raw_value.as_ref()
        }
    }
}

/// Insertion-ordered multimap of parameter values.
///
/// Iteration yields values in the order they were extracted from the packet,
/// across all parameters. Per-parameter access follows FIFO order:
/// `first_inserted`/`remove_first` operate on the oldest instance,
/// `last_inserted`/`remove_last` on the newest. Removal never disturbs the
/// relative order of the remaining values (removed slots are tombstoned).
#[derive(Debug, Clone, Default)]
pub struct ParameterValueList {
    slots: Vec<Option<ParameterValue>>,
    by_param: HashMap<ParameterIdx, VecDeque<usize>>,
    len: usize,
}

impl ParameterValueList {
    pub fn new() -> Self {
        ParameterValueList::default()
    }

    pub fn push(&mut self, pv: ParameterValue) {
        let slot = self.slots.len();
        self.by_param.entry(pv.parameter).or_default().push_back(slot);
        self.slots.push(Some(pv));
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of instances of `p` currently in the list.
    pub fn count(&self, p: ParameterIdx) -> usize {
        self.by_param.get(&p).map_or(0, VecDeque::len)
    }

    /// Most recently inserted instance of `p`.
    pub fn last_inserted(&self, p: ParameterIdx) -> Option<&ParameterValue> {
        let slot = *self.by_param.get(&p)?.back()?;
        self.slots[slot].as_ref()
    }

    /// Oldest instance of `p`.
    pub fn first_inserted(&self, p: ParameterIdx) -> Option<&ParameterValue> {
        let slot = *self.by_param.get(&p)?.front()?;
        self.slots[slot].as_ref()
    }

    /// Removes and returns the oldest instance of `p`.
    pub fn remove_first(&mut self, p: ParameterIdx) -> Option<ParameterValue> {
        let slot = self.by_param.get_mut(&p)?.pop_front()?;
        self.take(slot)
    }

    /// Removes and returns the newest instance of `p`.
    pub fn remove_last(&mut self, p: ParameterIdx) -> Option<ParameterValue> {
        let slot = self.by_param.get_mut(&p)?.pop_back()?;
        self.take(slot)
    }

    fn take(&mut self, slot: usize) -> Option<ParameterValue> {
        let pv = self.slots[slot].take();
        if pv.is_some() {
            self.len -= 1;
        }
        pv
    }

    /// All values in extraction order.
    pub fn iter(&self) -> impl Iterator<Item = &ParameterValue> {
        self.slots.iter().filter_map(Option::as_ref)
    }
}

impl<'a> IntoIterator for &'a ParameterValueList {
    type Item = &'a ParameterValue;
    type IntoIter = Box<dyn Iterator<Item = &'a ParameterValue> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl FromIterator<ParameterValue> for ParameterValueList {
    fn from_iter<T: IntoIterator<Item = ParameterValue>>(iter: T) -> Self {
        let mut list = ParameterValueList::new();
        for pv in iter {
            list.push(pv);
        }
        list
    }
}
