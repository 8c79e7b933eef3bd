//! Resolved mission database (MDB) object graph.
//!
//! The MDB describes *what* a telemetry packet contains: parameters with
//! their types and physical encodings, sequence containers with inheritance
//! and restriction criteria, and calibrator definitions. It is built
//! programmatically (loading XTCE documents is left to the caller), validated
//! once by [`MissionDatabase::resolve`], and read-only afterwards. Parameters and containers are identified by index into the
//! database vectors; name and alias lookup maps are built during resolve.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::bitbuf::Endianness;
use crate::decode::DataDecoder;
use crate::error::ExtractionError;
use crate::value::Value;

pub type ParameterIdx = usize;
pub type ContainerIdx = usize;

/// A telemetry parameter definition.
#[derive(Debug)]
pub struct Parameter {
    pub name: String,
    pub qualified_name: String,
    /// (namespace, alias) pairs under which this parameter is also known.
    pub aliases: Vec<(String, String)>,
    pub ptype: ParameterType,
}

/// Parameter type: engineering-side semantics plus the physical encoding.
#[derive(Debug)]
pub enum ParameterType {
    Integer(IntegerParameterType),
    Float(FloatParameterType),
    String(StringParameterType),
    Binary(BinaryParameterType),
    Boolean(BooleanParameterType),
    Enumerated(EnumeratedParameterType),
    AbsoluteTime(AbsoluteTimeParameterType),
    Aggregate(AggregateParameterType),
    Array(ArrayParameterType),
}

#[derive(Debug)]
pub struct IntegerParameterType {
    pub size_in_bits: usize,
    pub signed: bool,
    pub encoding: DataEncoding,
}

#[derive(Debug)]
pub struct FloatParameterType {
    /// 32 or 64: width of the engineering value.
    pub size_in_bits: usize,
    pub encoding: DataEncoding,
}

#[derive(Debug)]
pub struct StringParameterType {
    pub encoding: DataEncoding,
}

#[derive(Debug)]
pub struct BinaryParameterType {
    pub encoding: DataEncoding,
}

#[derive(Debug)]
pub struct BooleanParameterType {
    /// String raw values equal (case-insensitively) to this convert to
    /// false; so do "0" and the empty string. Everything else is true.
    pub zero_string_value: String,
    pub one_string_value: String,
    pub encoding: DataEncoding,
}

impl Default for BooleanParameterType {
    fn default() -> Self {
        BooleanParameterType {
            zero_string_value: "False".to_string(),
            one_string_value: "True".to_string(),
            encoding: DataEncoding::Boolean(BooleanDataEncoding::default()),
        }
    }
}

#[derive(Debug)]
pub struct EnumeratedParameterType {
    pub encoding: DataEncoding,
    /// Exact-value labels, matched before ranges.
    pub enumeration: Vec<ValueEnumeration>,
    pub ranges: Vec<RangeEnumeration>,
}

#[derive(Debug, Clone)]
pub struct ValueEnumeration {
    pub value: i64,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct RangeEnumeration {
    pub min: f64,
    pub max: f64,
    pub label: String,
}

#[derive(Debug)]
pub struct AbsoluteTimeParameterType {
    pub encoding: DataEncoding,
    /// Epoch of the raw count, milliseconds since the unix epoch.
    pub epoch_millis: i64,
    /// Engineering seconds = offset + scale * raw.
    pub scale: f64,
    pub offset: f64,
}

#[derive(Debug)]
pub struct AggregateParameterType {
    /// Interned member names, shared with every [`crate::value::AggregateValue`]
    /// instance of this type.
    pub member_names: Arc<[String]>,
    /// Member types, parallel to `member_names`.
    pub member_types: Vec<ParameterType>,
}

impl AggregateParameterType {
    pub fn new(members: Vec<(String, ParameterType)>) -> Self {
        let (names, types): (Vec<_>, Vec<_>) = members.into_iter().unzip();
        AggregateParameterType {
            member_names: names.into(),
            member_types: types,
        }
    }
}

#[derive(Debug)]
pub struct ArrayParameterType {
    pub element_type: Box<ParameterType>,
    /// One entry per dimension.
    pub size: Vec<IntegerValue>,
}

impl ParameterType {
    /// The physical encoding, for the types that have one directly.
    pub fn encoding(&self) -> Option<&DataEncoding> {
        match self {
            ParameterType::Integer(t) => Some(&t.encoding),
            ParameterType::Float(t) => Some(&t.encoding),
            ParameterType::String(t) => Some(&t.encoding),
            ParameterType::Binary(t) => Some(&t.encoding),
            ParameterType::Boolean(t) => Some(&t.encoding),
            ParameterType::Enumerated(t) => Some(&t.encoding),
            ParameterType::AbsoluteTime(t) => Some(&t.encoding),
            ParameterType::Aggregate(_) | ParameterType::Array(_) => None,
        }
    }
}

/// How a raw value is physically represented in the packet.
#[derive(Debug)]
pub enum DataEncoding {
    Integer(IntegerDataEncoding),
    Float(FloatDataEncoding),
    String(StringDataEncoding),
    Binary(BinaryDataEncoding),
    Boolean(BooleanDataEncoding),
    /// Externally supplied decoder; the engine treats its result opaquely.
    Custom(CustomDataEncoding),
}

#[derive(Debug)]
pub struct IntegerDataEncoding {
    pub size_in_bits: usize,
    pub encoding: IntegerEncodingKind,
    pub byte_order: Endianness,
    pub calibration: NumericCalibration,
}

impl IntegerDataEncoding {
    /// Unsigned big-endian encoding of the given width, no calibration.
    pub fn unsigned(size_in_bits: usize) -> Self {
        IntegerDataEncoding {
            size_in_bits,
            encoding: IntegerEncodingKind::Unsigned,
            byte_order: Endianness::Big,
            calibration: NumericCalibration::default(),
        }
    }

    pub fn is_signed(&self) -> bool {
        !matches!(
            self.encoding,
            IntegerEncodingKind::Unsigned | IntegerEncodingKind::String(_)
        )
    }
}

#[derive(Debug)]
pub enum IntegerEncodingKind {
    Unsigned,
    TwosComplement,
    SignMagnitude,
    OnesComplement,
    /// Integer spelled out as text; the string is read with the given
    /// encoding and parsed at calibration time.
    String(Box<StringDataEncoding>),
}

#[derive(Debug)]
pub struct FloatDataEncoding {
    /// 32 or 64 for IEEE-754.
    pub size_in_bits: usize,
    pub encoding: FloatEncodingKind,
    pub byte_order: Endianness,
    pub calibration: NumericCalibration,
}

impl FloatDataEncoding {
    pub fn ieee754(size_in_bits: usize) -> Self {
        FloatDataEncoding {
            size_in_bits,
            encoding: FloatEncodingKind::Ieee754,
            byte_order: Endianness::Big,
            calibration: NumericCalibration::default(),
        }
    }
}

#[derive(Debug)]
pub enum FloatEncodingKind {
    Ieee754,
    /// Float spelled out as text; parsed at calibration time.
    String(Box<StringDataEncoding>),
}

/// Default and context-sensitive calibrators attached to a numeric encoding.
#[derive(Debug, Clone, Default)]
pub struct NumericCalibration {
    pub default: Option<Calibrator>,
    pub context: Vec<ContextCalibrator>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Calibrator {
    /// Coefficients in ascending power order.
    Polynomial(Vec<f64>),
    /// Piecewise-linear interpolation over points sorted by raw value,
    /// clamped at the ends.
    Spline(Vec<SplinePoint>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplinePoint {
    pub raw: f64,
    pub calibrated: f64,
}

#[derive(Debug, Clone)]
pub struct ContextCalibrator {
    pub context: MatchCriteria,
    pub calibrator: Calibrator,
}

#[derive(Debug)]
pub struct StringDataEncoding {
    pub size_type: StringSizeType,
    /// Total size in bits of the buffer the string occupies, when fixed.
    pub size_in_bits: Option<usize>,
    /// Hard cap on the string buffer, for terminated/leading-size strings.
    pub max_size_in_bytes: Option<usize>,
    /// Buffer size in bits taken from a previously extracted parameter.
    pub dynamic_buffer_size: Option<DynamicValue>,
}

impl StringDataEncoding {
    pub fn fixed(size_in_bits: usize) -> Self {
        StringDataEncoding {
            size_type: StringSizeType::Fixed,
            size_in_bits: Some(size_in_bits),
            max_size_in_bytes: None,
            dynamic_buffer_size: None,
        }
    }

    pub fn terminated(terminator: u8, max_size_in_bytes: Option<usize>) -> Self {
        StringDataEncoding {
            size_type: StringSizeType::Terminated { terminator },
            size_in_bits: None,
            max_size_in_bytes,
            dynamic_buffer_size: None,
        }
    }

    pub fn leading_size(size_tag_bits: usize) -> Self {
        StringDataEncoding {
            size_type: StringSizeType::LeadingSize { size_tag_bits },
            size_in_bits: None,
            max_size_in_bytes: None,
            dynamic_buffer_size: None,
        }
    }
}

#[derive(Debug)]
pub enum StringSizeType {
    /// The string fills a fixed-size buffer.
    Fixed,
    /// A size tag immediately precedes the string bytes.
    LeadingSize { size_tag_bits: usize },
    /// The string runs until a terminator byte, or until the buffer/max size
    /// is exhausted, whichever comes first.
    Terminated { terminator: u8 },
}

#[derive(Debug)]
pub struct BinaryDataEncoding {
    pub size_type: BinarySizeType,
}

#[derive(Debug)]
pub enum BinarySizeType {
    Fixed { size_in_bits: usize },
    LeadingSize { size_tag_bits: usize },
    Dynamic(DynamicValue),
}

#[derive(Debug)]
pub struct BooleanDataEncoding {
    pub size_in_bits: usize,
}

impl Default for BooleanDataEncoding {
    fn default() -> Self {
        BooleanDataEncoding { size_in_bits: 1 }
    }
}

pub struct CustomDataEncoding {
    /// Name of the decoder, for diagnostics.
    pub name: String,
    pub decoder: Arc<dyn DataDecoder>,
}

impl fmt::Debug for CustomDataEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomDataEncoding")
            .field("name", &self.name)
            .finish()
    }
}

/// Reference to the value of an already-extracted parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicValue {
    pub parameter: ParameterIdx,
    pub use_calibrated: bool,
}

impl DynamicValue {
    pub fn raw(parameter: ParameterIdx) -> Self {
        DynamicValue {
            parameter,
            use_calibrated: false,
        }
    }

    pub fn calibrated(parameter: ParameterIdx) -> Self {
        DynamicValue {
            parameter,
            use_calibrated: true,
        }
    }
}

/// Fixed count or a count taken from an already-extracted parameter.
#[derive(Debug, Clone, Copy)]
pub enum IntegerValue {
    Fixed(i64),
    Dynamic(DynamicValue),
}

/// Boolean expression over already-extracted parameter values, used for
/// container inheritance restrictions and context-calibrator selection.
#[derive(Debug, Clone)]
pub enum MatchCriteria {
    Comparison(Comparison),
    /// ANDed list of comparisons (the XTCE `ComparisonList`).
    ComparisonList(Vec<Comparison>),
    And(Vec<MatchCriteria>),
    Or(Vec<MatchCriteria>),
}

#[derive(Debug, Clone)]
pub struct Comparison {
    pub reference: DynamicValue,
    pub operator: ComparisonOperator,
    pub value: Value,
}

impl Comparison {
    pub fn new(reference: DynamicValue, operator: ComparisonOperator, value: Value) -> Self {
        Comparison {
            reference,
            operator,
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A telemetry container: ordered entries plus optional single inheritance
/// with a restriction criteria.
#[derive(Debug)]
pub struct SequenceContainer {
    pub name: String,
    pub qualified_name: String,
    pub long_description: Option<String>,
    /// Fixed size of the container content, when declared.
    pub size_in_bits: Option<usize>,
    pub base: Option<ContainerIdx>,
    /// Condition under which this container specializes its base.
    pub restriction: Option<MatchCriteria>,
    pub entries: Vec<SequenceEntry>,
    /// Expected update interval; drives the expiration of extracted values.
    pub rate_in_stream_millis: Option<i64>,
}

#[derive(Debug)]
pub struct SequenceEntry {
    pub location: EntryLocation,
    pub repeat: Option<Repeat>,
    pub kind: EntryKind,
}

impl SequenceEntry {
    /// Entry placed right after the previous one.
    pub fn next(kind: EntryKind) -> Self {
        SequenceEntry {
            location: EntryLocation::PreviousEntry { offset_in_bits: 0 },
            repeat: None,
            kind,
        }
    }

    pub fn at_container_start(offset_in_bits: i64, kind: EntryKind) -> Self {
        SequenceEntry {
            location: EntryLocation::ContainerStart { offset_in_bits },
            repeat: None,
            kind,
        }
    }

    pub fn with_repeat(mut self, count: IntegerValue) -> Self {
        self.repeat = Some(Repeat { count });
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub enum EntryLocation {
    /// Bit offset from the end of the previous entry.
    PreviousEntry { offset_in_bits: i64 },
    /// Bit offset from the start of the enclosing container's content.
    ContainerStart { offset_in_bits: i64 },
}

#[derive(Debug, Clone, Copy)]
pub struct Repeat {
    pub count: IntegerValue,
}

#[derive(Debug)]
pub enum EntryKind {
    Parameter(ParameterIdx),
    /// Array parameter with entry-level dimensions overriding the type's.
    Array {
        parameter: ParameterIdx,
        size: Option<Vec<IntegerValue>>,
    },
    Container(ContainerIdx),
    /// The selector's extracted value names (through the alias namespace)
    /// which parameter occupies this slot.
    IndirectParameter {
        selector: DynamicValue,
        alias_namespace: Option<String>,
    },
}

/// The resolved, read-only mission database handed to the extractor.
#[derive(Debug)]
pub struct MissionDatabase {
    parameters: Vec<Parameter>,
    containers: Vec<SequenceContainer>,
    root_container: Option<ContainerIdx>,
    parameters_by_name: HashMap<String, ParameterIdx>,
    containers_by_name: HashMap<String, ContainerIdx>,
    aliases: HashMap<(String, String), ParameterIdx>,
    /// Derived containers per base, in declaration order.
    children: Vec<Vec<ContainerIdx>>,
}

impl MissionDatabase {
    /// Validates the graph and builds the lookup maps. Fails on duplicate
    /// qualified names or out-of-range index references.
    pub fn resolve(
        parameters: Vec<Parameter>,
        containers: Vec<SequenceContainer>,
        root_container: Option<ContainerIdx>,
    ) -> Result<Self, ExtractionError> {
        let mut parameters_by_name = HashMap::new();
        let mut aliases = HashMap::new();
        for (i, p) in parameters.iter().enumerate() {
            if parameters_by_name
                .insert(p.qualified_name.clone(), i)
                .is_some()
            {
                return Err(ExtractionError::Configuration(format!(
                    "duplicate parameter name: {}",
                    p.qualified_name
                )));
            }
            for (ns, alias) in &p.aliases {
                if aliases.insert((ns.clone(), alias.clone()), i).is_some() {
                    return Err(ExtractionError::Configuration(format!(
                        "duplicate alias {alias} in namespace {ns}"
                    )));
                }
            }
        }
        let mut containers_by_name = HashMap::new();
        let mut children = vec![Vec::new(); containers.len()];
        for (i, c) in containers.iter().enumerate() {
            if containers_by_name
                .insert(c.qualified_name.clone(), i)
                .is_some()
            {
                return Err(ExtractionError::Configuration(format!(
                    "duplicate container name: {}",
                    c.qualified_name
                )));
            }
            if let Some(base) = c.base {
                if base >= containers.len() {
                    return Err(ExtractionError::Configuration(format!(
                        "container {} references unknown base {base}",
                        c.qualified_name
                    )));
                }
                children[base].push(i);
            }
            for e in &c.entries {
                let param = match &e.kind {
                    EntryKind::Parameter(p) | EntryKind::Array { parameter: p, .. } => Some(*p),
                    EntryKind::IndirectParameter { selector, .. } => Some(selector.parameter),
                    EntryKind::Container(sub) => {
                        if *sub >= containers.len() {
                            return Err(ExtractionError::Configuration(format!(
                                "container {} references unknown container {sub}",
                                c.qualified_name
                            )));
                        }
                        None
                    }
                };
                if let Some(p) = param {
                    if p >= parameters.len() {
                        return Err(ExtractionError::Configuration(format!(
                            "container {} references unknown parameter {p}",
                            c.qualified_name
                        )));
                    }
                }
            }
        }
        if let Some(root) = root_container {
            if root >= containers.len() {
                return Err(ExtractionError::Configuration(format!(
                    "unknown root container {root}"
                )));
            }
        }
        Ok(MissionDatabase {
            parameters,
            containers,
            root_container,
            parameters_by_name,
            containers_by_name,
            aliases,
            children,
        })
    }

    pub fn parameter(&self, idx: ParameterIdx) -> &Parameter {
        &self.parameters[idx]
    }

    pub fn container(&self, idx: ContainerIdx) -> &SequenceContainer {
        &self.containers[idx]
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    pub fn root_container(&self) -> Option<ContainerIdx> {
        self.root_container
    }

    pub fn parameter_by_name(&self, qualified_name: &str) -> Option<ParameterIdx> {
        self.parameters_by_name.get(qualified_name).copied()
    }

    pub fn container_by_name(&self, qualified_name: &str) -> Option<ContainerIdx> {
        self.containers_by_name.get(qualified_name).copied()
    }

    pub fn parameter_by_alias(&self, namespace: &str, alias: &str) -> Option<ParameterIdx> {
        self.aliases
            .get(&(namespace.to_string(), alias.to_string()))
            .copied()
    }

    /// Derived containers of `base`, in declaration order.
    pub fn children(&self, base: ContainerIdx) -> &[ContainerIdx] {
        &self.children[base]
    }

    /// Base-container chain of `c`, nearest first.
    pub fn ancestors(&self, c: ContainerIdx) -> Vec<ContainerIdx> {
        let mut out = Vec::new();
        let mut cur = self.containers[c].base;
        while let Some(b) = cur {
            out.push(b);
            cur = self.containers[b].base;
        }
        out
    }

    /// Containers whose entries can produce `p` (directly, as an array, or
    /// through an indirect reference whose alias namespace contains `p`).
    pub fn containers_producing(&self, p: ParameterIdx) -> Vec<ContainerIdx> {
        let mut out = Vec::new();
        for (i, c) in self.containers.iter().enumerate() {
            let produces = c.entries.iter().any(|e| match &e.kind {
                EntryKind::Parameter(q) => *q == p,
                EntryKind::Array { parameter: q, .. } => *q == p,
                EntryKind::IndirectParameter {
                    alias_namespace, ..
                } => match alias_namespace {
                    Some(ns) => self
                        .aliases
                        .iter()
                        .any(|((ans, _), &target)| ans == ns && target == p),
                    None => true,
                },
                EntryKind::Container(_) => false,
            });
            if produces {
                out.push(i);
            }
        }
        out
    }

    /// Parameters referenced by restrictions, repeat counts, dynamic sizes,
    /// indirect selectors, and context-calibrator criteria anywhere in the
    /// database. These must be extracted even when not subscribed.
    pub fn referenced_parameters(&self) -> HashSet<ParameterIdx> {
        let mut out = HashSet::new();
        for c in &self.containers {
            if let Some(cr) = &c.restriction {
                cr.collect_referenced(&mut out);
            }
            for e in &c.entries {
                if let Some(rep) = &e.repeat {
                    if let IntegerValue::Dynamic(dv) = rep.count {
                        out.insert(dv.parameter);
                    }
                }
                match &e.kind {
                    EntryKind::Array {
                        size: Some(sizes), ..
                    } => {
                        for iv in sizes {
                            if let IntegerValue::Dynamic(dv) = iv {
                                out.insert(dv.parameter);
                            }
                        }
                    }
                    EntryKind::IndirectParameter { selector, .. } => {
                        out.insert(selector.parameter);
                    }
                    _ => {}
                }
            }
        }
        for p in &self.parameters {
            p.ptype.collect_referenced(&mut out);
        }
        out
    }
}

impl MatchCriteria {
    fn collect_referenced(&self, out: &mut HashSet<ParameterIdx>) {
        match self {
            MatchCriteria::Comparison(c) => {
                out.insert(c.reference.parameter);
            }
            MatchCriteria::ComparisonList(list) => {
                for c in list {
                    out.insert(c.reference.parameter);
                }
            }
            MatchCriteria::And(subs) | MatchCriteria::Or(subs) => {
                for s in subs {
                    s.collect_referenced(out);
                }
            }
        }
    }
}

impl ParameterType {
    fn collect_referenced(&self, out: &mut HashSet<ParameterIdx>) {
        if let Some(enc) = self.encoding() {
            enc.collect_referenced(out);
        }
        match self {
            ParameterType::Aggregate(a) => {
                for m in &a.member_types {
                    m.collect_referenced(out);
                }
            }
            ParameterType::Array(a) => {
                a.element_type.collect_referenced(out);
                for iv in &a.size {
                    if let IntegerValue::Dynamic(dv) = iv {
                        out.insert(dv.parameter);
                    }
                }
            }
            _ => {}
        }
    }
}

impl DataEncoding {
    fn collect_referenced(&self, out: &mut HashSet<ParameterIdx>) {
        match self {
            DataEncoding::Integer(e) => {
                if let IntegerEncodingKind::String(se) = &e.encoding {
                    se.collect_referenced(out);
                }
                e.calibration.collect_referenced(out);
            }
            DataEncoding::Float(e) => {
                if let FloatEncodingKind::String(se) = &e.encoding {
                    se.collect_referenced(out);
                }
                e.calibration.collect_referenced(out);
            }
            DataEncoding::String(se) => se.collect_referenced(out),
            DataEncoding::Binary(be) => {
                if let BinarySizeType::Dynamic(dv) = &be.size_type {
                    out.insert(dv.parameter);
                }
            }
            DataEncoding::Boolean(_) | DataEncoding::Custom(_) => {}
        }
    }
}

impl StringDataEncoding {
    fn collect_referenced(&self, out: &mut HashSet<ParameterIdx>) {
        if let Some(dv) = &self.dynamic_buffer_size {
            out.insert(dv.parameter);
        }
    }
}

impl NumericCalibration {
    fn collect_referenced(&self, out: &mut HashSet<ParameterIdx>) {
        for cc in &self.context {
            cc.context.collect_referenced(out);
        }
    }
}
