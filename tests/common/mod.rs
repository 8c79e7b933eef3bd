//! Shared test fixture: a reference mission database built in code, plus
//! packet generators producing matching byte streams.
#![allow(dead_code)]

use std::sync::Arc;

use xtcetm::bitbuf::{BitBuffer, Endianness};
use xtcetm::decode::DataDecoder;
use xtcetm::error::ExtractionError;
use xtcetm::mdb::{
    AggregateParameterType, ArrayParameterType, BinaryDataEncoding, BinaryParameterType,
    BinarySizeType, BooleanParameterType, Calibrator, Comparison, ComparisonOperator,
    ContextCalibrator, CustomDataEncoding, DataEncoding, DynamicValue, EntryKind,
    FloatDataEncoding, FloatEncodingKind, FloatParameterType, IntegerDataEncoding,
    IntegerEncodingKind, IntegerParameterType, IntegerValue, MatchCriteria, MissionDatabase,
    Parameter, ParameterType, RangeEnumeration, SequenceContainer, SequenceEntry, SplinePoint,
    StringDataEncoding, StringParameterType, ValueEnumeration,
};
use xtcetm::value::Value;

/// GPS epoch, ms since the unix epoch.
pub const GPS_EPOCH_MILLIS: i64 = 315_964_800_000;

/// The reference database with every parameter and container index exposed.
pub struct RefMdb {
    pub mdb: Arc<MissionDatabase>,

    pub packet_id: usize,
    pub packet_type: usize,
    pub integer_para1_1: usize,
    pub integer_para1_2: usize,
    pub float_para1_3: usize,
    pub string_para1_4: usize,
    pub bool_para1_5: usize,
    pub enum_para1_6: usize,
    pub context_para1_7: usize,
    pub invalid_float_para1_8: usize,
    pub calib_para1_9: usize,
    pub integer_para1_11: usize,
    pub rep_count_para3_1: usize,
    pub repeated_para3_2: usize,
    pub fixed_rep_para3_3: usize,
    pub trail_para3_4: usize,
    pub fixed_bin_para5_1: usize,
    pub prepended_bin_para5_2: usize,
    pub size_para5_3: usize,
    pub dyn_str_para5_4: usize,
    pub prepended_str_para5_5: usize,
    pub agg_para6_1: usize,
    pub array_count_para6_2: usize,
    pub array_para6_3: usize,
    pub matrix_para6_4: usize,
    pub agg_array_para6_5: usize,
    pub sub_para7_1: usize,
    pub sub_para7_2: usize,
    pub tail_para7_3: usize,
    pub ob_id_para9_1: usize,
    pub ob_para9_2: usize,
    pub ob_para9_3: usize,
    pub custom_para11_1: usize,
    pub time_para12_1: usize,
    pub twos_para13_1: usize,
    pub sign_mag_para13_2: usize,
    pub ones_para13_3: usize,
    pub le_para13_4: usize,
    pub term_str_para14_1: usize,
    pub marker_para14_2: usize,
    pub int_str_para14_3: usize,

    pub ccsds_default: usize,
    pub pkt1: usize,
    pub pkt1_1: usize,
    pub pkt1_1_copy: usize,
    pub pkt1_range: usize,
    pub pkt1_or_and: usize,
    pub pkt3: usize,
    pub pkt5: usize,
    pub pkt6: usize,
    pub sub1: usize,
    pub pkt7: usize,
    pub pkt9: usize,
    pub pkt11: usize,
    pub pkt12: usize,
    pub pkt13: usize,
    pub pkt14: usize,
}

/// Skips a 32 bit tag and returns a fixed binary blob; stands in for a
/// mission-specific decoder.
pub struct TagDecoder;

impl DataDecoder for TagDecoder {
    fn extract_raw(
        &self,
        _encoding: &CustomDataEncoding,
        _pvlist: &xtcetm::pvlist::ParameterValueList,
        buf: &mut BitBuffer,
    ) -> Result<Value, ExtractionError> {
        buf.get_bits(32)?;
        Ok(Value::Binary(vec![0x02, 0x03, 0x1b]))
    }
}

fn param(name: &str, ptype: ParameterType) -> Parameter {
    Parameter {
        name: name.to_string(),
        qualified_name: format!("/REFMDB/{name}"),
        aliases: Vec::new(),
        ptype,
    }
}

fn uint_param(name: &str, bits: usize) -> Parameter {
    param(
        name,
        ParameterType::Integer(IntegerParameterType {
            size_in_bits: 32,
            signed: false,
            encoding: DataEncoding::Integer(IntegerDataEncoding::unsigned(bits)),
        }),
    )
}

fn sint_param(name: &str, bits: usize, kind: IntegerEncodingKind) -> Parameter {
    param(
        name,
        ParameterType::Integer(IntegerParameterType {
            size_in_bits: 32,
            signed: true,
            encoding: DataEncoding::Integer(IntegerDataEncoding {
                size_in_bits: bits,
                encoding: kind,
                byte_order: Endianness::Big,
                calibration: Default::default(),
            }),
        }),
    )
}

fn add(params: &mut Vec<Parameter>, p: Parameter) -> usize {
    params.push(p);
    params.len() - 1
}

fn add_container(containers: &mut Vec<SequenceContainer>, c: SequenceContainer) -> usize {
    containers.push(c);
    containers.len() - 1
}

fn container(
    name: &str,
    base: Option<usize>,
    restriction: Option<MatchCriteria>,
    entries: Vec<SequenceEntry>,
) -> SequenceContainer {
    SequenceContainer {
        name: name.to_string(),
        qualified_name: format!("/REFMDB/{name}"),
        long_description: None,
        size_in_bits: None,
        base,
        restriction,
        entries,
        rate_in_stream_millis: None,
    }
}

fn ent(p: usize) -> SequenceEntry {
    SequenceEntry::next(EntryKind::Parameter(p))
}

fn eq_u32(p: usize, v: u32) -> MatchCriteria {
    cmp(p, ComparisonOperator::Eq, v)
}

fn cmp(p: usize, op: ComparisonOperator, v: u32) -> MatchCriteria {
    MatchCriteria::Comparison(Comparison::new(DynamicValue::raw(p), op, Value::Uint32(v)))
}

impl RefMdb {
    pub fn new() -> RefMdb {
        let mut params = Vec::new();

        let packet_id = add(&mut params, uint_param("PacketId", 16));
        let packet_type = add(&mut params, uint_param("PacketType", 16));

        let integer_para1_1 = add(&mut params, uint_param("IntegerPara1_1", 4));
        let integer_para1_2 = add(&mut params, uint_param("IntegerPara1_2", 8));
        let float_para1_3 = add(
            &mut params,
            param(
                "FloatPara1_3",
                ParameterType::Float(FloatParameterType {
                    size_in_bits: 32,
                    encoding: DataEncoding::Float(FloatDataEncoding::ieee754(32)),
                }),
            ),
        );
        // 6 byte buffer, zero-terminated inside it.
        let string_para1_4 = add(
            &mut params,
            param(
                "StringPara1_4",
                ParameterType::String(StringParameterType {
                    encoding: DataEncoding::String(StringDataEncoding {
                        size_type: xtcetm::mdb::StringSizeType::Terminated { terminator: 0 },
                        size_in_bits: Some(48),
                        max_size_in_bytes: None,
                        dynamic_buffer_size: None,
                    }),
                }),
            ),
        );
        // 5 byte text buffer interpreted as a boolean.
        let bool_para1_5 = add(
            &mut params,
            param(
                "BoolPara1_5",
                ParameterType::Boolean(BooleanParameterType {
                    encoding: DataEncoding::String(StringDataEncoding {
                        size_type: xtcetm::mdb::StringSizeType::Terminated { terminator: 0 },
                        size_in_bits: Some(40),
                        max_size_in_bytes: None,
                        dynamic_buffer_size: None,
                    }),
                    ..Default::default()
                }),
            ),
        );
        let enum_para1_6 = add(
            &mut params,
            param(
                "EnumPara1_6",
                ParameterType::Enumerated(xtcetm::mdb::EnumeratedParameterType {
                    encoding: DataEncoding::Integer(IntegerDataEncoding::unsigned(8)),
                    enumeration: vec![
                        ValueEnumeration {
                            value: 1,
                            label: "one".to_string(),
                        },
                        ValueEnumeration {
                            value: 2,
                            label: "two".to_string(),
                        },
                    ],
                    ranges: vec![RangeEnumeration {
                        min: 3.0,
                        max: 5.0,
                        label: "few".to_string(),
                    }],
                }),
            ),
        );
        // Spline calibration active only while IntegerPara1_2 == 32.
        let context_para1_7 = add(
            &mut params,
            param(
                "ContextPara1_7",
                ParameterType::Float(FloatParameterType {
                    size_in_bits: 32,
                    encoding: DataEncoding::Integer(IntegerDataEncoding {
                        size_in_bits: 8,
                        encoding: IntegerEncodingKind::Unsigned,
                        byte_order: Endianness::Big,
                        calibration: xtcetm::mdb::NumericCalibration {
                            default: None,
                            context: vec![ContextCalibrator {
                                context: eq_u32(integer_para1_2, 32),
                                calibrator: Calibrator::Spline(vec![
                                    SplinePoint {
                                        raw: 0.0,
                                        calibrated: 0.0,
                                    },
                                    SplinePoint {
                                        raw: 10.0,
                                        calibrated: 1.0,
                                    },
                                    SplinePoint {
                                        raw: 30.0,
                                        calibrated: 3.0,
                                    },
                                ]),
                            }],
                        },
                    }),
                }),
            ),
        );
        // Float spelled as 12 bytes of text.
        let invalid_float_para1_8 = add(
            &mut params,
            param(
                "FloatFromTextPara1_8",
                ParameterType::Float(FloatParameterType {
                    size_in_bits: 64,
                    encoding: DataEncoding::Float(FloatDataEncoding {
                        size_in_bits: 64,
                        encoding: FloatEncodingKind::String(Box::new(StringDataEncoding::fixed(
                            96,
                        ))),
                        byte_order: Endianness::Big,
                        calibration: Default::default(),
                    }),
                }),
            ),
        );
        let calib_para1_9 = add(
            &mut params,
            param(
                "CalibPara1_9",
                ParameterType::Float(FloatParameterType {
                    size_in_bits: 32,
                    encoding: DataEncoding::Integer(IntegerDataEncoding {
                        size_in_bits: 8,
                        encoding: IntegerEncodingKind::Unsigned,
                        byte_order: Endianness::Big,
                        calibration: xtcetm::mdb::NumericCalibration {
                            default: Some(Calibrator::Polynomial(vec![0.0, 2.0])),
                            context: Vec::new(),
                        },
                    }),
                }),
            ),
        );
        let integer_para1_11 = add(&mut params, uint_param("IntegerPara1_11", 16));

        let rep_count_para3_1 = add(&mut params, uint_param("RepCountPara3_1", 8));
        let repeated_para3_2 = add(&mut params, uint_param("RepeatedPara3_2", 8));
        let fixed_rep_para3_3 = add(&mut params, uint_param("FixedRepPara3_3", 8));
        let trail_para3_4 = add(&mut params, uint_param("TrailPara3_4", 8));

        let fixed_bin_para5_1 = add(
            &mut params,
            param(
                "FixedBinPara5_1",
                ParameterType::Binary(BinaryParameterType {
                    encoding: DataEncoding::Binary(BinaryDataEncoding {
                        size_type: BinarySizeType::Fixed { size_in_bits: 16 },
                    }),
                }),
            ),
        );
        let prepended_bin_para5_2 = add(
            &mut params,
            param(
                "PrependedBinPara5_2",
                ParameterType::Binary(BinaryParameterType {
                    encoding: DataEncoding::Binary(BinaryDataEncoding {
                        size_type: BinarySizeType::LeadingSize { size_tag_bits: 8 },
                    }),
                }),
            ),
        );
        let size_para5_3 = add(&mut params, uint_param("SizePara5_3", 8));
        let dyn_str_para5_4 = add(
            &mut params,
            param(
                "DynStrPara5_4",
                ParameterType::String(StringParameterType {
                    encoding: DataEncoding::String(StringDataEncoding {
                        size_type: xtcetm::mdb::StringSizeType::Fixed,
                        size_in_bits: None,
                        max_size_in_bytes: None,
                        dynamic_buffer_size: Some(DynamicValue::raw(size_para5_3)),
                    }),
                }),
            ),
        );
        let prepended_str_para5_5 = add(
            &mut params,
            param(
                "PrependedStrPara5_5",
                ParameterType::String(StringParameterType {
                    encoding: DataEncoding::String(StringDataEncoding::leading_size(16)),
                }),
            ),
        );

        let agg_para6_1 = add(
            &mut params,
            param(
                "AggPara6_1",
                ParameterType::Aggregate(AggregateParameterType::new(vec![
                    (
                        "member1".to_string(),
                        ParameterType::Integer(IntegerParameterType {
                            size_in_bits: 32,
                            signed: false,
                            encoding: DataEncoding::Integer(IntegerDataEncoding::unsigned(8)),
                        }),
                    ),
                    (
                        "member2".to_string(),
                        ParameterType::Float(FloatParameterType {
                            size_in_bits: 32,
                            encoding: DataEncoding::Float(FloatDataEncoding::ieee754(32)),
                        }),
                    ),
                ])),
            ),
        );
        let array_count_para6_2 = add(&mut params, uint_param("ArrayCountPara6_2", 8));
        let array_para6_3 = add(
            &mut params,
            param(
                "ArrayPara6_3",
                ParameterType::Array(ArrayParameterType {
                    element_type: Box::new(ParameterType::Integer(IntegerParameterType {
                        size_in_bits: 32,
                        signed: false,
                        encoding: DataEncoding::Integer(IntegerDataEncoding::unsigned(16)),
                    })),
                    size: vec![IntegerValue::Dynamic(DynamicValue::raw(array_count_para6_2))],
                }),
            ),
        );
        let matrix_para6_4 = add(
            &mut params,
            param(
                "MatrixPara6_4",
                ParameterType::Array(ArrayParameterType {
                    element_type: Box::new(ParameterType::Integer(IntegerParameterType {
                        size_in_bits: 32,
                        signed: false,
                        encoding: DataEncoding::Integer(IntegerDataEncoding::unsigned(8)),
                    })),
                    size: vec![IntegerValue::Fixed(2), IntegerValue::Fixed(3)],
                }),
            ),
        );

        let agg_array_para6_5 = add(
            &mut params,
            param(
                "AggArrayPara6_5",
                ParameterType::Array(ArrayParameterType {
                    element_type: Box::new(ParameterType::Aggregate(
                        AggregateParameterType::new(vec![
                            (
                                "a".to_string(),
                                ParameterType::Integer(IntegerParameterType {
                                    size_in_bits: 32,
                                    signed: false,
                                    encoding: DataEncoding::Integer(
                                        IntegerDataEncoding::unsigned(8),
                                    ),
                                }),
                            ),
                            (
                                "b".to_string(),
                                ParameterType::Integer(IntegerParameterType {
                                    size_in_bits: 32,
                                    signed: false,
                                    encoding: DataEncoding::Integer(
                                        IntegerDataEncoding::unsigned(8),
                                    ),
                                }),
                            ),
                        ]),
                    )),
                    size: vec![IntegerValue::Fixed(2)],
                }),
            ),
        );

        let sub_para7_1 = add(&mut params, uint_param("SubPara7_1", 16));
        let sub_para7_2 = add(&mut params, uint_param("SubPara7_2", 16));
        let tail_para7_3 = add(&mut params, uint_param("TailPara7_3", 8));

        let ob_id_para9_1 = add(&mut params, uint_param("ObIdPara9_1", 16));
        let mut ob2 = uint_param("ObPara9_2", 32);
        ob2.aliases.push(("MDB:OB".to_string(), "1".to_string()));
        let ob_para9_2 = add(&mut params, ob2);
        let mut ob3 = param(
            "ObPara9_3",
            ParameterType::Float(FloatParameterType {
                size_in_bits: 32,
                encoding: DataEncoding::Float(FloatDataEncoding::ieee754(32)),
            }),
        );
        ob3.aliases.push(("MDB:OB".to_string(), "2".to_string()));
        let ob_para9_3 = add(&mut params, ob3);

        let custom_para11_1 = add(
            &mut params,
            param(
                "CustomPara11_1",
                ParameterType::Binary(BinaryParameterType {
                    encoding: DataEncoding::Custom(CustomDataEncoding {
                        name: "tag-decoder".to_string(),
                        decoder: Arc::new(TagDecoder),
                    }),
                }),
            ),
        );

        let time_para12_1 = add(
            &mut params,
            param(
                "TimePara12_1",
                ParameterType::AbsoluteTime(xtcetm::mdb::AbsoluteTimeParameterType {
                    encoding: DataEncoding::Integer(IntegerDataEncoding::unsigned(32)),
                    epoch_millis: GPS_EPOCH_MILLIS,
                    scale: 1.0,
                    offset: 0.0,
                }),
            ),
        );

        let twos_para13_1 = add(
            &mut params,
            sint_param("TwosPara13_1", 8, IntegerEncodingKind::TwosComplement),
        );
        let sign_mag_para13_2 = add(
            &mut params,
            sint_param("SignMagPara13_2", 8, IntegerEncodingKind::SignMagnitude),
        );
        let ones_para13_3 = add(
            &mut params,
            sint_param("OnesPara13_3", 8, IntegerEncodingKind::OnesComplement),
        );
        let mut le = uint_param("LEPara13_4", 16);
        if let ParameterType::Integer(t) = &mut le.ptype {
            if let DataEncoding::Integer(e) = &mut t.encoding {
                e.byte_order = Endianness::Little;
            }
        }
        let le_para13_4 = add(&mut params, le);

        // Zero-terminated string capped at 20 bytes.
        let term_str_para14_1 = add(
            &mut params,
            param(
                "TermStrPara14_1",
                ParameterType::String(StringParameterType {
                    encoding: DataEncoding::String(StringDataEncoding::terminated(0, Some(20))),
                }),
            ),
        );
        let marker_para14_2 = add(&mut params, uint_param("MarkerPara14_2", 8));
        // Integer spelled as 4 bytes of text.
        let int_str_para14_3 = add(
            &mut params,
            param(
                "IntStrPara14_3",
                ParameterType::Integer(IntegerParameterType {
                    size_in_bits: 32,
                    signed: false,
                    encoding: DataEncoding::Integer(IntegerDataEncoding {
                        size_in_bits: 32,
                        encoding: IntegerEncodingKind::String(Box::new(StringDataEncoding::fixed(
                            32,
                        ))),
                        byte_order: Endianness::Big,
                        calibration: Default::default(),
                    }),
                }),
            ),
        );

        let mut containers = Vec::new();

        let mut root = container(
            "ccsds-default",
            None,
            None,
            vec![ent(packet_id), ent(packet_type)],
        );
        root.rate_in_stream_millis = Some(1500);
        let ccsds_default = add_container(&mut containers, root);

        let pkt1 = add_container(
            &mut containers,
            container(
                "PKT1",
                Some(ccsds_default),
                Some(eq_u32(packet_id, 1)),
                vec![
                    ent(integer_para1_1),
                    // 4 pad bits after the 4 bit field
                    SequenceEntry {
                        location: xtcetm::mdb::EntryLocation::PreviousEntry { offset_in_bits: 4 },
                        repeat: None,
                        kind: EntryKind::Parameter(integer_para1_2),
                    },
                    ent(float_para1_3),
                    ent(string_para1_4),
                    ent(bool_para1_5),
                    ent(enum_para1_6),
                    ent(context_para1_7),
                    ent(invalid_float_para1_8),
                    ent(calib_para1_9),
                ],
            ),
        );
        let pkt1_1 = add_container(
            &mut containers,
            container(
                "PKT1_1",
                Some(pkt1),
                Some(eq_u32(packet_type, 1)),
                vec![ent(integer_para1_11)],
            ),
        );
        // Same restriction as PKT1_1, declared later: must never be selected.
        let pkt1_1_copy = add_container(
            &mut containers,
            container(
                "PKT1_1_COPY",
                Some(pkt1),
                Some(eq_u32(packet_type, 1)),
                vec![ent(integer_para1_11)],
            ),
        );
        let pkt1_range = add_container(
            &mut containers,
            container(
                "PKT1_RANGE",
                Some(pkt1),
                Some(MatchCriteria::ComparisonList(vec![
                    Comparison::new(
                        DynamicValue::raw(packet_type),
                        ComparisonOperator::Ge,
                        Value::Uint32(2),
                    ),
                    Comparison::new(
                        DynamicValue::raw(packet_type),
                        ComparisonOperator::Le,
                        Value::Uint32(4),
                    ),
                ])),
                vec![ent(integer_para1_11)],
            ),
        );
        let pkt1_or_and = add_container(
            &mut containers,
            container(
                "PKT1_OR_AND",
                Some(pkt1),
                Some(MatchCriteria::Or(vec![
                    eq_u32(packet_type, 7),
                    MatchCriteria::And(vec![
                        cmp(packet_type, ComparisonOperator::Ge, 8),
                        cmp(packet_type, ComparisonOperator::Le, 9),
                    ]),
                ])),
                vec![ent(integer_para1_11)],
            ),
        );

        let pkt3 = add_container(
            &mut containers,
            container(
                "PKT3",
                Some(ccsds_default),
                Some(eq_u32(packet_id, 3)),
                vec![
                    ent(rep_count_para3_1),
                    SequenceEntry::next(EntryKind::Parameter(repeated_para3_2)).with_repeat(
                        IntegerValue::Dynamic(DynamicValue::raw(rep_count_para3_1)),
                    ),
                    SequenceEntry::next(EntryKind::Parameter(fixed_rep_para3_3))
                        .with_repeat(IntegerValue::Fixed(3)),
                    ent(trail_para3_4),
                ],
            ),
        );
        let pkt5 = add_container(
            &mut containers,
            container(
                "PKT5",
                Some(ccsds_default),
                Some(eq_u32(packet_id, 5)),
                vec![
                    ent(fixed_bin_para5_1),
                    ent(prepended_bin_para5_2),
                    ent(size_para5_3),
                    ent(dyn_str_para5_4),
                    ent(prepended_str_para5_5),
                ],
            ),
        );
        let pkt6 = add_container(
            &mut containers,
            container(
                "PKT6",
                Some(ccsds_default),
                Some(eq_u32(packet_id, 6)),
                vec![
                    ent(agg_para6_1),
                    ent(array_count_para6_2),
                    ent(array_para6_3),
                    ent(matrix_para6_4),
                    ent(agg_array_para6_5),
                ],
            ),
        );
        let sub1 = add_container(
            &mut containers,
            container("SUB1", None, None, vec![ent(sub_para7_1), ent(sub_para7_2)]),
        );
        let pkt7 = add_container(
            &mut containers,
            container(
                "PKT7",
                Some(ccsds_default),
                Some(eq_u32(packet_id, 7)),
                vec![
                    SequenceEntry::next(EntryKind::Container(sub1)),
                    ent(tail_para7_3),
                ],
            ),
        );
        let pkt9 = add_container(
            &mut containers,
            container(
                "PKT9",
                Some(ccsds_default),
                Some(eq_u32(packet_id, 9)),
                vec![
                    ent(ob_id_para9_1),
                    SequenceEntry::next(EntryKind::IndirectParameter {
                        selector: DynamicValue::raw(ob_id_para9_1),
                        alias_namespace: Some("MDB:OB".to_string()),
                    }),
                ],
            ),
        );
        let pkt11 = add_container(
            &mut containers,
            container(
                "PKT11",
                Some(ccsds_default),
                Some(eq_u32(packet_id, 11)),
                vec![ent(custom_para11_1)],
            ),
        );
        let pkt12 = add_container(
            &mut containers,
            container(
                "PKT12",
                Some(ccsds_default),
                Some(eq_u32(packet_id, 12)),
                vec![ent(time_para12_1)],
            ),
        );
        let pkt13 = add_container(
            &mut containers,
            container(
                "PKT13",
                Some(ccsds_default),
                Some(eq_u32(packet_id, 13)),
                vec![
                    ent(twos_para13_1),
                    ent(sign_mag_para13_2),
                    ent(ones_para13_3),
                    ent(le_para13_4),
                ],
            ),
        );

        let pkt14 = add_container(
            &mut containers,
            container(
                "PKT14",
                Some(ccsds_default),
                Some(eq_u32(packet_id, 14)),
                vec![
                    ent(term_str_para14_1),
                    ent(marker_para14_2),
                    ent(int_str_para14_3),
                ],
            ),
        );

        let mdb = MissionDatabase::resolve(params, containers, Some(ccsds_default))
            .expect("reference database resolves");

        RefMdb {
            mdb: Arc::new(mdb),
            packet_id,
            packet_type,
            integer_para1_1,
            integer_para1_2,
            float_para1_3,
            string_para1_4,
            bool_para1_5,
            enum_para1_6,
            context_para1_7,
            invalid_float_para1_8,
            calib_para1_9,
            integer_para1_11,
            rep_count_para3_1,
            repeated_para3_2,
            fixed_rep_para3_3,
            trail_para3_4,
            fixed_bin_para5_1,
            prepended_bin_para5_2,
            size_para5_3,
            dyn_str_para5_4,
            prepended_str_para5_5,
            agg_para6_1,
            array_count_para6_2,
            array_para6_3,
            matrix_para6_4,
            agg_array_para6_5,
            sub_para7_1,
            sub_para7_2,
            tail_para7_3,
            ob_id_para9_1,
            ob_para9_2,
            ob_para9_3,
            custom_para11_1,
            time_para12_1,
            twos_para13_1,
            sign_mag_para13_2,
            ones_para13_3,
            le_para13_4,
            term_str_para14_1,
            marker_para14_2,
            int_str_para14_3,
            ccsds_default,
            pkt1,
            pkt1_1,
            pkt1_1_copy,
            pkt1_range,
            pkt1_or_and,
            pkt3,
            pkt5,
            pkt6,
            sub1,
            pkt7,
            pkt9,
            pkt11,
            pkt12,
            pkt13,
            pkt14,
        }
    }
}

pub fn header(packet_id: u16, packet_type: u16) -> Vec<u8> {
    let mut v = Vec::with_capacity(4);
    v.extend_from_slice(&packet_id.to_be_bytes());
    v.extend_from_slice(&packet_type.to_be_bytes());
    v
}

/// Knobs for the PKT1 body; defaults produce a fully valid packet.
pub struct Pkt1 {
    pub packet_type: u16,
    pub para1_1: u8,
    pub para1_2: u8,
    pub string_bytes: [u8; 6],
    pub bool_bytes: [u8; 5],
    pub enum_raw: u8,
    pub context_raw: u8,
    pub float_text: [u8; 12],
    pub calib_raw: u8,
}

impl Default for Pkt1 {
    fn default() -> Self {
        let mut float_text = [b' '; 12];
        float_text[..7].copy_from_slice(b"3.14159");
        Pkt1 {
            packet_type: 0,
            para1_1: 5,
            para1_2: 32,
            string_bytes: *b"ab\0cde",
            bool_bytes: *b"true\0",
            enum_raw: 1,
            context_raw: 30,
            float_text,
            calib_raw: 10,
        }
    }
}

/// Byte offset of the PKT1 body inside the packet.
pub const PKT1_BODY_OFFSET: usize = 4;

pub fn generate_pkt1(cfg: &Pkt1) -> Vec<u8> {
    let mut v = header(1, cfg.packet_type);
    v.push(cfg.para1_1 << 4);
    v.push(cfg.para1_2);
    v.extend_from_slice(&2.5f32.to_be_bytes());
    v.extend_from_slice(&cfg.string_bytes);
    v.extend_from_slice(&cfg.bool_bytes);
    v.push(cfg.enum_raw);
    v.push(cfg.context_raw);
    v.extend_from_slice(&cfg.float_text);
    v.push(cfg.calib_raw);
    // room for IntegerPara1_11 in the derived containers
    v.extend_from_slice(&0x0A0Bu16.to_be_bytes());
    v
}

pub fn generate_pkt3(count: u8) -> Vec<u8> {
    let mut v = header(3, 0);
    v.push(count);
    for i in 0..count {
        v.push(10 + i);
    }
    v.extend_from_slice(&[0xAA, 0xBB, 0xCC]);
    v.push(0x77);
    v
}

pub fn generate_pkt5() -> Vec<u8> {
    let mut v = header(5, 0);
    v.extend_from_slice(&[0xCA, 0xFE]); // fixed binary
    v.extend_from_slice(&[3, 1, 2, 3]); // prepended binary
    v.push(40); // buffer size in bits for the dynamic string
    v.extend_from_slice(b"hello");
    v.extend_from_slice(&[0x00, 0x03]); // 16 bit leading size
    v.extend_from_slice(b"xyz");
    v
}

pub fn generate_pkt6(count: u8) -> Vec<u8> {
    let mut v = header(6, 0);
    v.push(7); // aggregate member1
    v.extend_from_slice(&4.5f32.to_be_bytes()); // aggregate member2
    v.push(count);
    for i in 0..count as u16 {
        v.extend_from_slice(&(0x10 * (i + 1)).to_be_bytes());
    }
    v.extend_from_slice(&[1, 2, 3, 4, 5, 6]); // 2x3 matrix
    v.extend_from_slice(&[9, 8, 7, 6]); // two {a, b} aggregates
    v
}

pub fn generate_pkt7() -> Vec<u8> {
    let mut v = header(7, 0);
    v.extend_from_slice(&[0xAB, 0xCD, 0x12, 0x34]); // SUB1
    v.push(0x55); // tail
    v
}

pub fn generate_pkt9(ob_id: u16, payload: &[u8]) -> Vec<u8> {
    let mut v = header(9, 0);
    v.extend_from_slice(&ob_id.to_be_bytes());
    v.extend_from_slice(payload);
    v
}

pub fn generate_pkt11() -> Vec<u8> {
    let mut v = header(11, 0);
    v.extend_from_slice(&[0, 0, 0, 0]); // tag skipped by the custom decoder
    v
}

pub fn generate_pkt12(seconds: u32) -> Vec<u8> {
    let mut v = header(12, 0);
    v.extend_from_slice(&seconds.to_be_bytes());
    v
}

pub fn generate_pkt13() -> Vec<u8> {
    let mut v = header(13, 0);
    v.push(0xFF); // two's complement -1
    v.push(0x85); // sign-magnitude -5
    v.push(0xF9); // ones' complement -6
    v.extend_from_slice(&[0x12, 0x34]); // little-endian 0x3412
    v
}

pub fn generate_pkt14(string_field: &[u8], int_text: &[u8; 4]) -> Vec<u8> {
    let mut v = header(14, 0);
    v.extend_from_slice(string_field);
    v.push(0x5A);
    v.extend_from_slice(int_text);
    v
}
