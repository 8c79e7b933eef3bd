//! The extraction engine: walks the container hierarchy over a packet and
//! produces parameter values plus the list of matched containers.
//!
//! Processing starts at the root container (or an explicit start container),
//! runs its entries in order, then follows inheritance: derived containers
//! are tried in declaration order and the first one whose restriction
//! criteria match is entered, continuing at the current position. Structural
//! errors (running off the end of the packet, malformed sizes) curtail the
//! container in which they occur; values extracted before the error are kept
//! and the caller still gets a result. Only configuration errors fail the
//! whole packet.

use std::collections::HashSet;
use std::sync::Arc;

use log::{trace, warn};

use crate::bitbuf::BitBuffer;
use crate::calib;
use crate::criteria;
use crate::decode;
use crate::error::ExtractionError;
use crate::mdb::{
    ContainerIdx, DynamicValue, EntryKind, EntryLocation, IntegerValue, MissionDatabase,
    ParameterIdx, ParameterType, SequenceEntry,
};
use crate::proc::{CalibrationSnapshot, ProcessorData, Subscription};
use crate::pvlist::{ParameterValue, ParameterValueList};
use crate::value::{AggregateValue, ArrayValue, Value};

/// Values expire after this multiple of the container's rate in stream.
const EXPIRATION_FACTOR: f64 = 1.9;

/// Tunables for packet processing.
#[derive(Debug, Clone)]
pub struct ProcessingOptions {
    /// Upper bound on the total element count of any extracted array;
    /// protects against absurd sizes read from corrupted packets.
    pub max_array_size: usize,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        ProcessingOptions {
            max_array_size: 10_000,
        }
    }
}

/// One container matched while processing a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerExtractionResult {
    pub container: ContainerIdx,
    /// Byte offset inside the packet where this container's data begins.
    pub offset: usize,
    /// Bit offset, relative to `offset`, where the container's own entries
    /// begin. For a derived container this is where the base left off.
    pub location_in_container_bits: usize,
}

/// Everything extracted from one packet.
#[derive(Debug)]
pub struct ContainerProcessingResult {
    packet: Box<[u8]>,
    /// Matched containers, outermost first.
    pub containers: Vec<ContainerExtractionResult>,
    pub values: ParameterValueList,
    pub generation_time: i64,
    pub acquisition_time: i64,
}

impl ContainerProcessingResult {
    pub fn packet(&self) -> &[u8] {
        &self.packet
    }

    /// The packet bytes from the start of the given container's data to the
    /// end of the packet.
    pub fn container_content(&self, r: &ContainerExtractionResult) -> &[u8] {
        &self.packet[r.offset..]
    }
}

/// Extracts parameter values from telemetry packets, per the mission
/// database and the configured subscription.
///
/// `process_packet` takes `&self`; one extractor can serve multiple threads
/// once the subscription is set up.
#[derive(Debug)]
pub struct TmExtractor {
    mdb: Arc<MissionDatabase>,
    pdata: Arc<ProcessorData>,
    subscription: Subscription,
    /// Parameters referenced by restrictions, repeats, dynamic sizes and
    /// indirect selectors; always delivered, subscription or not.
    needed: HashSet<ParameterIdx>,
    options: ProcessingOptions,
}

impl TmExtractor {
    pub fn new(mdb: Arc<MissionDatabase>) -> Self {
        let pdata = Arc::new(ProcessorData::new(Arc::clone(&mdb)));
        TmExtractor::with_processor_data(mdb, pdata)
    }

    /// Shares processor state (calibration overrides) with other extractors.
    pub fn with_processor_data(mdb: Arc<MissionDatabase>, pdata: Arc<ProcessorData>) -> Self {
        let needed = mdb.referenced_parameters();
        TmExtractor {
            mdb,
            pdata,
            subscription: Subscription::new(),
            needed,
            options: ProcessingOptions::default(),
        }
    }

    pub fn processor_data(&self) -> &Arc<ProcessorData> {
        &self.pdata
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub fn options_mut(&mut self) -> &mut ProcessingOptions {
        &mut self.options
    }

    /// Deliver all parameters and walk all containers.
    pub fn provide_all(&mut self) {
        self.subscription.provide_all();
    }

    pub fn start_providing(&mut self, p: ParameterIdx) {
        self.subscription.start_providing(&self.mdb, p);
    }

    pub fn start_providing_container(&mut self, c: ContainerIdx) {
        self.subscription.start_providing_container(&self.mdb, c);
    }

    /// Processes one packet starting at the root container.
    pub fn process_packet(
        &self,
        packet: &[u8],
        generation_time: i64,
        acquisition_time: i64,
    ) -> Result<ContainerProcessingResult, ExtractionError> {
        let root = self.mdb.root_container().ok_or_else(|| {
            ExtractionError::Configuration("no root container defined".to_string())
        })?;
        self.process_packet_from(packet, generation_time, acquisition_time, root)
    }

    /// Processes one packet starting at an explicit container.
    pub fn process_packet_from(
        &self,
        packet: &[u8],
        generation_time: i64,
        acquisition_time: i64,
        start: ContainerIdx,
    ) -> Result<ContainerProcessingResult, ExtractionError> {
        let mut proc = PacketProcessor {
            mdb: &self.mdb,
            snapshot: self.pdata.calibration_snapshot(),
            subscription: &self.subscription,
            needed: &self.needed,
            options: &self.options,
            containers: Vec::new(),
            values: ParameterValueList::new(),
            generation_time,
            acquisition_time,
            expire_millis: None,
        };
        let mut buf = BitBuffer::new(packet);
        proc.process_container(&mut buf, start)?;
        Ok(ContainerProcessingResult {
            packet: packet.into(),
            containers: proc.containers,
            values: proc.values,
            generation_time,
            acquisition_time,
        })
    }
}

/// Per-packet walk state.
struct PacketProcessor<'a> {
    mdb: &'a MissionDatabase,
    snapshot: CalibrationSnapshot,
    subscription: &'a Subscription,
    needed: &'a HashSet<ParameterIdx>,
    options: &'a ProcessingOptions,
    containers: Vec<ContainerExtractionResult>,
    values: ParameterValueList,
    generation_time: i64,
    acquisition_time: i64,
    /// Expiration inherited from the innermost container declaring a rate.
    expire_millis: Option<i64>,
}

impl PacketProcessor<'_> {
    fn process_container(
        &mut self,
        buf: &mut BitBuffer,
        c: ContainerIdx,
    ) -> Result<(), ExtractionError> {
        let container = self.mdb.container(c);
        let entry_start = buf.position();
        self.containers.push(ContainerExtractionResult {
            container: c,
            offset: buf.offset(),
            location_in_container_bits: entry_start,
        });
        if let Some(rate) = container.rate_in_stream_millis {
            self.expire_millis = Some((rate as f64 * EXPIRATION_FACTOR) as i64);
        }
        for entry in &container.entries {
            if let Err(e) = self.process_entry(buf, entry_start, entry) {
                if e.is_recoverable() {
                    warn!("giving up on container {}: {e}", container.qualified_name);
                    return Ok(());
                }
                return Err(e);
            }
        }
        // Inheritance: first declared derived container whose restriction
        // matches wins; with no match, extraction stops at this base.
        for &child in self.mdb.children(c) {
            if !self.subscription.includes_container(child) {
                continue;
            }
            let matched = match &self.mdb.container(child).restriction {
                Some(cr) => criteria::matches(cr, &self.values),
                None => true,
            };
            if matched {
                return self.process_container(buf, child);
            }
        }
        Ok(())
    }

    fn process_entry(
        &mut self,
        buf: &mut BitBuffer,
        entry_start: usize,
        entry: &SequenceEntry,
    ) -> Result<(), ExtractionError> {
        let pos = match entry.location {
            EntryLocation::PreviousEntry { offset_in_bits } => {
                buf.position() as i64 + offset_in_bits
            }
            EntryLocation::ContainerStart { offset_in_bits } => {
                entry_start as i64 + offset_in_bits
            }
        };
        if pos < 0 {
            return Err(ExtractionError::Configuration(format!(
                "entry location resolves to negative bit position {pos}"
            )));
        }
        buf.set_position(pos as usize);
        let count = match &entry.repeat {
            None => 1,
            Some(rep) => match rep.count {
                IntegerValue::Fixed(n) => n,
                IntegerValue::Dynamic(dv) => {
                    decode::resolve_dynamic(&dv, &self.values).unwrap_or_else(|| {
                        trace!("repeat count parameter has no value; repeating zero times");
                        0
                    })
                }
            }
            .max(0),
        };
        for _ in 0..count {
            self.process_entry_once(buf, entry)?;
        }
        Ok(())
    }

    fn process_entry_once(
        &mut self,
        buf: &mut BitBuffer,
        entry: &SequenceEntry,
    ) -> Result<(), ExtractionError> {
        match &entry.kind {
            EntryKind::Parameter(p) => self.extract_parameter(buf, *p, None),
            EntryKind::Array { parameter, size } => {
                self.extract_parameter(buf, *parameter, size.as_deref())
            }
            EntryKind::Container(sub) => self.process_container_entry(buf, *sub),
            EntryKind::IndirectParameter {
                selector,
                alias_namespace,
            } => self.extract_indirect(buf, selector, alias_namespace.as_deref()),
        }
    }

    fn extract_parameter(
        &mut self,
        buf: &mut BitBuffer,
        p: ParameterIdx,
        entry_sizes: Option<&[IntegerValue]>,
    ) -> Result<(), ExtractionError> {
        let param = self.mdb.parameter(p);
        let start = buf.position();
        let raw = match (&param.ptype, entry_sizes) {
            (ParameterType::Array(t), Some(sizes)) => {
                self.extract_array(buf, &t.element_type, sizes)?
            }
            (_, Some(_)) => {
                return Err(ExtractionError::Configuration(format!(
                    "array entry for non-array parameter {}",
                    param.qualified_name
                )));
            }
            (ptype, None) => self.extract_type(buf, ptype)?,
        };
        let mut pv = ParameterValue::new(p, self.generation_time, self.acquisition_time);
        pv.start_bit = buf.offset() * 8 + start;
        pv.bit_size = buf.position() - start;
        pv.raw_value = Some(raw);
        pv.expire_millis = self.expire_millis;
        calib::calibrate(&mut pv, &param.ptype, &self.snapshot, &self.values);
        if self.should_deliver(p) {
            self.values.push(pv);
        }
        Ok(())
    }

    fn should_deliver(&self, p: ParameterIdx) -> bool {
        self.subscription.includes_parameter(p) || self.needed.contains(&p)
    }

    fn extract_type(
        &mut self,
        buf: &mut BitBuffer,
        ptype: &ParameterType,
    ) -> Result<Value, ExtractionError> {
        if let Some(enc) = ptype.encoding() {
            return decode::extract_raw(enc, &self.values, buf);
        }
        match ptype {
            ParameterType::Aggregate(t) => {
                let mut av = AggregateValue::new(t.member_names.clone());
                for (name, mtype) in t.member_names.iter().zip(&t.member_types) {
                    let v = self.extract_type(buf, mtype)?;
                    av.set_member(name, v);
                }
                Ok(Value::Aggregate(av))
            }
            ParameterType::Array(t) => self.extract_array(buf, &t.element_type, &t.size),
            _ => Err(ExtractionError::Configuration(
                "parameter type without a data encoding".to_string(),
            )),
        }
    }

    fn extract_array(
        &mut self,
        buf: &mut BitBuffer,
        element_type: &ParameterType,
        sizes: &[IntegerValue],
    ) -> Result<Value, ExtractionError> {
        let mut dims = Vec::with_capacity(sizes.len());
        for iv in sizes {
            let n = match iv {
                IntegerValue::Fixed(n) => *n,
                IntegerValue::Dynamic(dv) => {
                    decode::resolve_dynamic(dv, &self.values).ok_or_else(|| {
                        ExtractionError::MalformedSize(
                            "array size references a parameter with no value".to_string(),
                        )
                    })?
                }
            };
            if n < 0 {
                return Err(ExtractionError::MalformedSize(format!(
                    "negative array dimension {n}"
                )));
            }
            dims.push(n as usize);
        }
        let total = dims.iter().product::<usize>();
        if total > self.options.max_array_size {
            return Err(ExtractionError::MalformedSize(format!(
                "array of {total} elements exceeds the maximum of {}",
                self.options.max_array_size
            )));
        }
        let mut elements = Vec::with_capacity(total);
        for _ in 0..total {
            elements.push(self.extract_type(buf, element_type)?);
        }
        Ok(Value::Array(ArrayValue::new(dims, elements)))
    }

    /// Sub-container entry: the referenced container gets its own buffer
    /// starting at the current byte, and the outer cursor advances by what
    /// the inner walk consumed (or the container's fixed size).
    fn process_container_entry(
        &mut self,
        buf: &mut BitBuffer,
        sub: ContainerIdx,
    ) -> Result<(), ExtractionError> {
        if !self.subscription.includes_container(sub) {
            return Ok(());
        }
        let mut inner = buf.slice()?;
        self.process_container(&mut inner, sub)?;
        let consumed = match self.mdb.container(sub).size_in_bits {
            Some(size) => size,
            None => inner.position(),
        };
        buf.skip(consumed);
        Ok(())
    }

    /// The selector parameter's value names the parameter occupying this
    /// slot, via the alias namespace. Both the selector having no value and
    /// the name not resolving skip the entry without consuming bits.
    fn extract_indirect(
        &mut self,
        buf: &mut BitBuffer,
        selector: &DynamicValue,
        alias_namespace: Option<&str>,
    ) -> Result<(), ExtractionError> {
        let name = match self
            .values
            .last_inserted(selector.parameter)
            .and_then(|pv| pv.value(selector.use_calibrated))
        {
            Some(v) => v.to_string(),
            None => {
                trace!("indirect selector has no value; skipping entry");
                return Ok(());
            }
        };
        let target = match alias_namespace {
            Some(ns) => self.mdb.parameter_by_alias(ns, &name),
            None => self.mdb.parameter_by_name(&name),
        };
        match target {
            Some(p) => self.extract_parameter(buf, p, None),
            None => {
                warn!(
                    "indirect selector value {name:?} does not name a parameter{}",
                    alias_namespace
                        .map(|ns| format!(" in namespace {ns}"))
                        .unwrap_or_default()
                );
                Ok(())
            }
        }
    }
}
