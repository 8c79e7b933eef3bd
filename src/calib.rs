//! Engineering conversion: calibrator evaluation and per-type raw→eng rules.
//!
//! Conversion failures are not extraction errors. A raw value that cannot be
//! converted (unparseable text, enumeration miss, kind mismatch) leaves the
//! parameter value with `AcquisitionStatus::Invalid`, raw value retained,
//! engineering value absent; extraction continues with the next entry.

use log::warn;

use crate::criteria;
use crate::mdb::{
    Calibrator, DataEncoding, IntegerParameterType, NumericCalibration, ParameterIdx,
    ParameterType, SplinePoint,
};
use crate::proc::CalibrationSnapshot;
use crate::pvlist::{AcquisitionStatus, ParameterValue, ParameterValueList};
use crate::value::{AggregateValue, ArrayValue, Value};

impl Calibrator {
    /// Applies the calibration curve to a raw numeric value.
    pub fn calibrate(&self, x: f64) -> f64 {
        match self {
            Calibrator::Polynomial(coeffs) => {
                coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
            }
            Calibrator::Spline(points) => spline(points, x),
        }
    }
}

/// Piecewise-linear interpolation, clamped to the first/last point.
fn spline(points: &[SplinePoint], x: f64) -> f64 {
    let first = match points.first() {
        Some(p) => p,
        None => return x,
    };
    if x <= first.raw {
        return first.calibrated;
    }
    for w in points.windows(2) {
        if x <= w[1].raw {
            let dx = w[1].raw - w[0].raw;
            if dx == 0.0 {
                return w[1].calibrated;
            }
            let t = (x - w[0].raw) / dx;
            return w[0].calibrated + t * (w[1].calibrated - w[0].calibrated);
        }
    }
    points[points.len() - 1].calibrated
}

/// Fills in `pv.eng_value` from its raw value, or marks it invalid.
pub(crate) fn calibrate(
    pv: &mut ParameterValue,
    ptype: &ParameterType,
    snapshot: &CalibrationSnapshot,
    pvlist: &ParameterValueList,
) {
    let eng = match &pv.raw_value {
        Some(raw) => convert(ptype, raw, Some(pv.parameter), snapshot, pvlist),
        None => None,
    };
    match eng {
        Some(v) => pv.eng_value = Some(v),
        None => {
            pv.status = AcquisitionStatus::Invalid;
            pv.eng_value = None;
        }
    }
}

fn convert(
    ptype: &ParameterType,
    raw: &Value,
    param: Option<ParameterIdx>,
    snapshot: &CalibrationSnapshot,
    pvlist: &ParameterValueList,
) -> Option<Value> {
    match ptype {
        ParameterType::Integer(t) => {
            let v = raw_to_i64(raw)?;
            let cal = effective_calibrator(param, encoding_calibration(&t.encoding), snapshot, pvlist);
            let v = match cal {
                Some(c) => c.calibrate(v as f64) as i64,
                None => v,
            };
            Some(make_integer(t, v))
        }
        ParameterType::Float(t) => {
            let x = raw_to_f64(raw)?;
            let cal = effective_calibrator(param, encoding_calibration(&t.encoding), snapshot, pvlist);
            let x = match cal {
                Some(c) => c.calibrate(x),
                None => x,
            };
            Some(if t.size_in_bits <= 32 {
                Value::Float(x as f32)
            } else {
                Value::Double(x)
            })
        }
        ParameterType::String(_) => match raw {
            Value::String(s) => Some(Value::String(s.clone())),
            _ => {
                warn!("cannot convert {raw:?} to a string engineering value");
                None
            }
        },
        ParameterType::Binary(_) => match raw {
            Value::Binary(b) => Some(Value::Binary(b.clone())),
            _ => {
                warn!("cannot convert {raw:?} to a binary engineering value");
                None
            }
        },
        ParameterType::Boolean(t) => match raw {
            Value::Boolean(b) => Some(Value::Boolean(*b)),
            Value::String(s) => {
                let is_false =
                    s.is_empty() || s.eq_ignore_ascii_case(&t.zero_string_value) || s == "0";
                Some(Value::Boolean(!is_false))
            }
            Value::Float(f) => Some(Value::Boolean(*f != 0.0)),
            Value::Double(d) => Some(Value::Boolean(*d != 0.0)),
            _ => match raw.as_i64() {
                Some(v) => Some(Value::Boolean(v != 0)),
                None => {
                    warn!("cannot convert {raw:?} to a boolean engineering value");
                    None
                }
            },
        },
        ParameterType::Enumerated(t) => {
            let v = raw_to_i64(raw)?;
            if let Some(e) = t.enumeration.iter().find(|e| e.value == v) {
                return Some(Value::String(e.label.clone()));
            }
            let x = v as f64;
            if let Some(r) = t.ranges.iter().find(|r| r.min <= x && x <= r.max) {
                return Some(Value::String(r.label.clone()));
            }
            warn!("no enumeration label for raw value {v}");
            None
        }
        ParameterType::AbsoluteTime(t) => {
            let x = raw_to_f64(raw)?;
            let seconds = t.offset + t.scale * x;
            Some(Value::Timestamp(t.epoch_millis + (seconds * 1000.0) as i64))
        }
        ParameterType::Aggregate(t) => {
            let av = raw.as_aggregate()?;
            let mut out = AggregateValue::new(t.member_names.clone());
            for (name, mtype) in t.member_names.iter().zip(&t.member_types) {
                let mraw = av.member(name)?;
                let meng = convert(mtype, mraw, None, snapshot, pvlist)?;
                out.set_member(name, meng);
            }
            Some(Value::Aggregate(out))
        }
        ParameterType::Array(t) => {
            let arr = raw.as_array()?;
            let mut elements = Vec::with_capacity(arr.flat_length());
            for e in arr.elements() {
                elements.push(convert(&t.element_type, e, None, snapshot, pvlist)?);
            }
            Some(Value::Array(ArrayValue::new(arr.dims().to_vec(), elements)))
        }
    }
}

fn make_integer(t: &IntegerParameterType, v: i64) -> Value {
    match (t.signed, t.size_in_bits <= 32) {
        (true, true) => Value::Sint32(v as i32),
        (true, false) => Value::Sint64(v),
        (false, true) => Value::Uint32(v as u32),
        (false, false) => Value::Uint64(v as u64),
    }
}

fn encoding_calibration(enc: &DataEncoding) -> Option<&NumericCalibration> {
    match enc {
        DataEncoding::Integer(e) => Some(&e.calibration),
        DataEncoding::Float(e) => Some(&e.calibration),
        _ => None,
    }
}

/// Picks the calibrator for this extraction: processor overrides replace the
/// encoding's calibration wholesale; within the winning set, the first
/// context calibrator whose criteria match takes precedence over the default.
fn effective_calibrator<'a>(
    param: Option<ParameterIdx>,
    static_cal: Option<&'a NumericCalibration>,
    snapshot: &'a CalibrationSnapshot,
    pvlist: &ParameterValueList,
) -> Option<&'a Calibrator> {
    let nc = param.and_then(|p| snapshot.get(p)).or(static_cal)?;
    for cc in &nc.context {
        if criteria::matches(&cc.context, pvlist) {
            return Some(&cc.calibrator);
        }
    }
    nc.default.as_ref()
}

/// Raw value as an integer; text is parsed here so that malformed numbers
/// surface as invalid values rather than extraction errors.
fn raw_to_i64(raw: &Value) -> Option<i64> {
    match raw {
        Value::Uint32(x) => Some(*x as i64),
        Value::Sint32(x) => Some(*x as i64),
        Value::Uint64(x) => Some(*x as i64),
        Value::Sint64(x) => Some(*x),
        Value::Float(f) => Some(*f as i64),
        Value::Double(d) => Some(*d as i64),
        Value::Boolean(b) => Some(*b as i64),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                .or_else(|| {
                    warn!("cannot parse {s:?} as an integer");
                    None
                })
        }
        _ => {
            warn!("cannot convert {raw:?} to an integer");
            None
        }
    }
}

fn raw_to_f64(raw: &Value) -> Option<f64> {
    match raw {
        Value::Float(f) => Some(*f as f64),
        Value::Double(d) => Some(*d),
        Value::Uint32(x) => Some(*x as f64),
        Value::Sint32(x) => Some(*x as f64),
        Value::Uint64(x) => Some(*x as f64),
        Value::Sint64(x) => Some(*x as f64),
        Value::Boolean(b) => Some(*b as u8 as f64),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(x) => Some(x),
            Err(_) => {
                warn!("cannot parse {s:?} as a number");
                None
            }
        },
        _ => {
            warn!("cannot convert {raw:?} to a number");
            None
        }
    }
}
