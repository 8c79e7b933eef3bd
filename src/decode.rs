//! Raw value extraction: one decoder per data encoding kind.
//!
//! Decoders read from the [`BitBuffer`] and produce the *raw* [`Value`];
//! engineering conversion happens later in [`crate::calib`]. Integer and
//! float encodings whose kind is `String` read the text here and defer the
//! numeric parse to calibration, so a malformed number marks the value
//! invalid instead of aborting the container.

use crate::bitbuf::BitBuffer;
use crate::error::ExtractionError;
use crate::mdb::{
    BinaryDataEncoding, BinarySizeType, BooleanDataEncoding, CustomDataEncoding, DataEncoding,
    DynamicValue, FloatDataEncoding, FloatEncodingKind, IntegerDataEncoding, IntegerEncodingKind,
    StringDataEncoding, StringSizeType,
};
use crate::pvlist::ParameterValueList;
use crate::value::Value;

/// Pluggable decoder for `DataEncoding::Custom`. Implementations read their
/// bits from the buffer and return the raw value; already-extracted values
/// are available for decoders that depend on earlier fields.
pub trait DataDecoder: Send + Sync {
    fn extract_raw(
        &self,
        encoding: &CustomDataEncoding,
        pvlist: &ParameterValueList,
        buf: &mut BitBuffer,
    ) -> Result<Value, ExtractionError>;
}

/// Extracts the raw value for `de` at the buffer's current position.
/// Dynamic sizes are resolved against values already in `pvlist`.
pub fn extract_raw(
    de: &DataEncoding,
    pvlist: &ParameterValueList,
    buf: &mut BitBuffer,
) -> Result<Value, ExtractionError> {
    match de {
        DataEncoding::Integer(e) => extract_integer(e, pvlist, buf),
        DataEncoding::Float(e) => extract_float(e, pvlist, buf),
        DataEncoding::String(e) => extract_string(e, pvlist, buf),
        DataEncoding::Binary(e) => extract_binary(e, pvlist, buf),
        DataEncoding::Boolean(e) => extract_boolean(e, buf),
        DataEncoding::Custom(e) => e.decoder.extract_raw(e, pvlist, buf),
    }
}

/// Value of a previously extracted parameter, as an integer.
pub(crate) fn resolve_dynamic(dv: &DynamicValue, pvlist: &ParameterValueList) -> Option<i64> {
    let pv = pvlist.last_inserted(dv.parameter)?;
    pv.value(dv.use_calibrated)?.as_i64()
}

fn extract_integer(
    e: &IntegerDataEncoding,
    pvlist: &ParameterValueList,
    buf: &mut BitBuffer,
) -> Result<Value, ExtractionError> {
    if let IntegerEncodingKind::String(se) = &e.encoding {
        return extract_string(se, pvlist, buf);
    }
    buf.set_byte_order(e.byte_order);
    let n = e.size_in_bits;
    let rv = buf.get_bits(n)?;
    let signed = match &e.encoding {
        IntegerEncodingKind::Unsigned | IntegerEncodingKind::String(_) => {
            return Ok(if n <= 32 {
                Value::Uint32(rv as u32)
            } else {
                Value::Uint64(rv)
            });
        }
        IntegerEncodingKind::TwosComplement => sign_extend(rv, n),
        IntegerEncodingKind::SignMagnitude => {
            if n >= 2 && (rv >> (n - 1)) & 1 == 1 {
                -((rv & ((1u64 << (n - 1)) - 1)) as i64)
            } else {
                rv as i64
            }
        }
        IntegerEncodingKind::OnesComplement => {
            let x = sign_extend(rv, n);
            if x < 0 {
                -!x
            } else {
                x
            }
        }
    };
    Ok(if n <= 32 {
        Value::Sint32(signed as i32)
    } else {
        Value::Sint64(signed)
    })
}

fn sign_extend(rv: u64, num_bits: usize) -> i64 {
    let shift = 64 - num_bits as u32;
    ((rv << shift) as i64) >> shift
}

fn extract_float(
    e: &FloatDataEncoding,
    pvlist: &ParameterValueList,
    buf: &mut BitBuffer,
) -> Result<Value, ExtractionError> {
    if let FloatEncodingKind::String(se) = &e.encoding {
        return extract_string(se, pvlist, buf);
    }
    buf.set_byte_order(e.byte_order);
    match e.size_in_bits {
        32 => Ok(Value::Float(f32::from_bits(buf.get_bits(32)? as u32))),
        64 => Ok(Value::Double(f64::from_bits(buf.get_bits(64)?))),
        n => Err(ExtractionError::Configuration(format!(
            "unsupported float encoding size: {n} bits"
        ))),
    }
}

fn extract_string(
    se: &StringDataEncoding,
    pvlist: &ParameterValueList,
    buf: &mut BitBuffer,
) -> Result<Value, ExtractionError> {
    let start = buf.position();
    // bmr: the bytes the string buffer may occupy at most.
    let mut bmr = buf.remaining_bytes()?;
    if let Some(max) = se.max_size_in_bytes {
        if max < bmr {
            bmr = max;
        }
    }
    let mut buf_size: Option<usize> = None;
    if let Some(dv) = &se.dynamic_buffer_size {
        let bits = resolve_dynamic(dv, pvlist).ok_or_else(|| {
            ExtractionError::MalformedSize(
                "string buffer size references a parameter with no value".to_string(),
            )
        })?;
        if bits < 0 || bits % 8 != 0 {
            return Err(ExtractionError::MalformedSize(format!(
                "dynamic string buffer size of {bits} bits is not a whole number of bytes"
            )));
        }
        let sz = bits as usize / 8;
        if sz > bmr {
            return Err(ExtractionError::MalformedSize(format!(
                "string buffer size {sz} exceeds the {bmr} bytes available"
            )));
        }
        buf_size = Some(sz);
        bmr = sz;
    } else if let Some(bits) = se.size_in_bits {
        let sz = bits / 8;
        if sz > bmr {
            return Err(ExtractionError::MalformedSize(format!(
                "string buffer size {sz} exceeds the {bmr} bytes available"
            )));
        }
        buf_size = Some(sz);
        bmr = sz;
    }
    let size_in_bytes = match se.size_type {
        StringSizeType::Fixed => buf_size.ok_or_else(|| {
            ExtractionError::Configuration("fixed-size string encoding without a size".to_string())
        })?,
        StringSizeType::LeadingSize { size_tag_bits } => {
            let tag_bytes = size_tag_bits / 8;
            if tag_bytes > bmr {
                return Err(ExtractionError::MalformedSize(format!(
                    "no room for the {size_tag_bits} bit size tag in the {bmr} bytes available"
                )));
            }
            let sz = buf.get_bits(size_tag_bits)? as usize;
            if sz > bmr - tag_bytes {
                return Err(ExtractionError::MalformedSize(format!(
                    "leading size {sz} exceeds the {} bytes available",
                    bmr - tag_bytes
                )));
            }
            if buf_size.is_none() {
                buf_size = Some(tag_bytes + sz);
            }
            sz
        }
        StringSizeType::Terminated { terminator } => {
            let mut n = 0;
            let mut found = false;
            while n < bmr {
                if buf.get_byte()? == terminator {
                    found = true;
                    break;
                }
                n += 1;
            }
            buf.set_position(start);
            if buf_size.is_none() {
                // No terminator within the window: the window itself bounds
                // the string and the cursor resumes right after it.
                buf_size = Some(if found { n + 1 } else { n });
            }
            n
        }
    };
    let bytes = buf.get_byte_array(size_in_bytes)?;
    let total = buf_size.unwrap_or(size_in_bytes);
    buf.set_position(start + total * 8);
    Ok(Value::String(String::from_utf8_lossy(&bytes).into_owned()))
}

fn extract_binary(
    e: &BinaryDataEncoding,
    pvlist: &ParameterValueList,
    buf: &mut BitBuffer,
) -> Result<Value, ExtractionError> {
    if buf.position() & 7 != 0 {
        return Err(ExtractionError::Unaligned {
            position: buf.position(),
        });
    }
    let size_in_bytes = match &e.size_type {
        BinarySizeType::Fixed { size_in_bits } => {
            if size_in_bits % 8 != 0 {
                return Err(ExtractionError::Configuration(format!(
                    "binary encoding size of {size_in_bits} bits is not a whole number of bytes"
                )));
            }
            size_in_bits / 8
        }
        BinarySizeType::LeadingSize { size_tag_bits } => {
            let sz = buf.get_bits(*size_tag_bits)? as usize;
            let remaining = buf.remaining_bytes()?;
            if sz > remaining {
                return Err(ExtractionError::MalformedSize(format!(
                    "leading size {sz} exceeds the {remaining} bytes available"
                )));
            }
            sz
        }
        BinarySizeType::Dynamic(dv) => {
            let bits = resolve_dynamic(dv, pvlist).ok_or_else(|| {
                ExtractionError::MalformedSize(
                    "binary size references a parameter with no value".to_string(),
                )
            })?;
            if bits < 0 || bits % 8 != 0 {
                return Err(ExtractionError::MalformedSize(format!(
                    "dynamic binary size of {bits} bits is not a whole number of bytes"
                )));
            }
            bits as usize / 8
        }
    };
    Ok(Value::Binary(buf.get_byte_array(size_in_bytes)?))
}

fn extract_boolean(
    e: &BooleanDataEncoding,
    buf: &mut BitBuffer,
) -> Result<Value, ExtractionError> {
    Ok(Value::Boolean(buf.get_bits(e.size_in_bits)? != 0))
}
