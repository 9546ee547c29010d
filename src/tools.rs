//!
//! Contains the numeric codecs that everything else in this crate is built on: vint sizes and element ids, fixed-width integers, floats, dates and checksums.
//!

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use chrono::{DateTime, Duration, TimeZone, Utc};

use super::errors::tool::ToolError;

///
/// Largest value accepted in any vint, and in any fixed-width integer this crate writes (52 significant bits).
///
pub const MAX_SAFE_VALUE: u64 = (1 << 53) - 1;

///
/// Trait to enable easy serialization to a vint.
///
/// This is only available for types that can be cast as `u64`.
///
pub trait Vint: Into<u64> + Copy {
    ///
    /// Returns a representation of the current value as a vint array, using the smallest length class that can hold it.
    ///
    /// A length class `L` holds values strictly below `2^(7*L) - 1`: the all-ones pattern of each class is left alone since EBML reserves it.
    ///
    /// # Errors
    ///
    /// This can return an error if the value is too large to be representable as a vint.
    ///
    fn as_vint(&self) -> Result<Vec<u8>, ToolError> {
        let val: u64 = (*self).into();
        match val {
            0 => Ok(vec![0x80]),
            1 => Ok(vec![0x81]),
            _ => Ok(as_vint_no_check_u64(val, vint_size(val)?)),
        }
    }

    ///
    /// Returns a representation of the current value as a vint array with a specified length.
    ///
    /// # Errors
    ///
    /// This can return an error if the value is too large to be representable as a vint of that length.
    ///
    fn as_vint_with_length(&self, length: usize) -> Result<Vec<u8>, ToolError> {
        let val: u64 = (*self).into();
        if length == 0 || length > 8 || val > MAX_SAFE_VALUE || val >= (1 << (7 * length)) - 1 {
            return Err(ToolError::WriteVintOverflow(val));
        }
        Ok(as_vint_no_check_u64(val, length))
    }
}

impl Vint for u64 { }
impl Vint for u32 { }
impl Vint for u16 { }
impl Vint for u8 { }

///
/// Returns the number of bytes [`Vint::as_vint`] uses for `val`.
///
/// # Errors
///
/// This can return an error if the value is too large to be representable as a vint.
///
pub fn vint_size(val: u64) -> Result<usize, ToolError> {
    if val > MAX_SAFE_VALUE {
        return Err(ToolError::WriteVintOverflow(val));
    }

    let mut length = 1;
    while length < 8 && val >= (1 << (7 * length)) - 1 {
        length += 1;
    }
    Ok(length)
}

#[inline]
fn as_vint_no_check_u64(val: u64, length: usize) -> Vec<u8> {
    let bytes: [u8; 8] = val.to_be_bytes();
    let mut result: Vec<u8> = Vec::from(&bytes[(8-length)..]);
    result[0] |= 1 << (8 - length);
    result
}

///
/// Reads a variable size integer from the beginning of the input array slice.
///
/// This method returns an option with the `None` variant used to indicate there was not enough data in the buffer to completely read a vint.
///
/// The returned tuple contains the value of the vint (`u64`) and the length of the vint (`usize`).  When `keep_marker` is set the length marker bit is left in the value, which is how element ids are compared.
///
/// # Errors
///
/// This method can return a `ToolError` if the leading byte is zero, or if an 8 byte vint holds a value above [`MAX_SAFE_VALUE`].
///
pub fn read_var_size(buffer: &[u8], keep_marker: bool) -> Result<Option<(u64, usize)>, ToolError> {
    if buffer.is_empty() {
        return Ok(None);
    }

    if buffer[0] == 0 {
        return Err(ToolError::InvalidVintMarker);
    }

    let length = 8 - buffer[0].ilog2() as usize;

    if length > buffer.len() {
        // Not enough data in the buffer to read out the vint value
        return Ok(None);
    }

    let mut value = buffer[0] as u64;
    if !keep_marker {
        value -= 1 << (8 - length);
    }

    for item in buffer.iter().take(length).skip(1) {
        value <<= 8;
        value += *item as u64;
    }

    if length == 8 && !keep_marker && value > MAX_SAFE_VALUE {
        return Err(ToolError::ReadVintOverflow { length });
    }

    Ok(Some((value, length)))
}

///
/// Reads an element id from the beginning of the input array slice.  Ids keep their length marker bits, e.g. `[0x1A, 0x45, 0xDF, 0xA3]` reads as `0x1A45DFA3`.
///
/// # Errors
///
/// This method can return a `ToolError` if the leading byte is zero or if the id is longer than 4 bytes.
///
pub fn read_element_id(buffer: &[u8]) -> Result<Option<(u32, usize)>, ToolError> {
    match read_var_size(buffer, true)? {
        Some((_, length)) if length > 4 => Err(ToolError::ElementIdTooLong(length)),
        Some((value, length)) => Ok(Some((value as u32, length))),
        None => Ok(None),
    }
}

///
/// Returns the encoded bytes of an element id (its big endian bytes without leading zeros).
///
pub fn write_element_id(id: u32) -> Vec<u8> {
    id.to_be_bytes().iter().skip_while(|&v| *v == 0u8).copied().collect()
}

///
/// Returns the number of bytes [`write_element_id`] produces for `id`.
///
pub fn element_id_size(id: u32) -> usize {
    (4 - id.leading_zeros() as usize / 8).max(1)
}

///
/// Returns the smallest byte count that can hold `val` as an unsigned integer.
///
pub fn uint_size(val: u64) -> usize {
    let mut length = 1;
    while length < 8 && val >= (1 << (8 * length)) {
        length += 1;
    }
    length
}

///
/// Returns the smallest byte count that can hold `val` as a two's complement integer.
///
pub fn int_size(val: i64) -> usize {
    let mut length = 1;
    while length < 8 {
        let bound = 1i64 << (8 * length - 1);
        if val > -bound && val < bound {
            break;
        }
        length += 1;
    }
    length
}

///
/// Encodes an unsigned integer using the smallest possible number of bytes.
///
/// # Errors
///
/// This method returns [`ToolError::Unrepresentable`] if the value needs more than 52 significant bits.
///
pub fn write_uint(val: u64) -> Result<Vec<u8>, ToolError> {
    if val > MAX_SAFE_VALUE {
        return Err(ToolError::Unrepresentable(val.to_string()));
    }
    Ok(Vec::from(&val.to_be_bytes()[(8 - uint_size(val))..]))
}

///
/// Encodes a signed integer using the smallest possible number of bytes.
///
/// # Errors
///
/// This method returns [`ToolError::Unrepresentable`] if the value needs more than 52 significant bits.
///
pub fn write_int(val: i64) -> Result<Vec<u8>, ToolError> {
    if val.unsigned_abs() > MAX_SAFE_VALUE {
        return Err(ToolError::Unrepresentable(val.to_string()));
    }
    Ok(Vec::from(&val.to_be_bytes()[(8 - int_size(val))..]))
}

///
/// Encodes a float as 4 bytes if that loses nothing, otherwise as 8 bytes.
///
pub fn write_float(val: f64) -> Vec<u8> {
    if (val as f32) as f64 == val {
        Vec::from((val as f32).to_be_bytes())
    } else {
        Vec::from(val.to_be_bytes())
    }
}

///
/// Reads a `u64` value from any length array slice.
///
/// Rather than forcing the input to be a `[u8; 8]` like standard library methods, this can interpret a `u64` from a slice of any length <= 8.  An empty slice reads as `0`.
///
/// # Errors
///
/// This method will return an error if the input slice has a length > 8.
///
/// ## Example
///
/// ```
/// # use ebml_document::tools::arr_to_u64;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let result = arr_to_u64(&[16,0])?;
/// assert_eq!(result, 4096);
/// # Ok(())
/// # }
/// ```
///
pub fn arr_to_u64(arr: &[u8]) -> Result<u64, ToolError> {
    match arr.len() {
        0 => Ok(0),
        1..=8 => Ok(BigEndian::read_uint(arr, arr.len())),
        _ => Err(ToolError::ReadU64Overflow(Vec::from(arr))),
    }
}

///
/// Reads an `i64` value from any length array slice, sign extending from the first byte.  An empty slice reads as `0`.
///
/// # Errors
///
/// This method will return an error if the input slice has a length > 8.
///
/// ## Example
///
/// ```
/// # use ebml_document::tools::arr_to_i64;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// assert_eq!(arr_to_i64(&[4,0])?, 1024);
/// assert_eq!(arr_to_i64(&[0xFF,0x80])?, -128);
/// # Ok(())
/// # }
/// ```
///
pub fn arr_to_i64(arr: &[u8]) -> Result<i64, ToolError> {
    match arr.len() {
        0 => Ok(0),
        1..=8 => Ok(BigEndian::read_int(arr, arr.len())),
        _ => Err(ToolError::ReadI64Overflow(Vec::from(arr))),
    }
}

///
/// Reads an `f64` value from an array slice of length 0, 4 or 8.
///
/// # Errors
///
/// This method will throw an error if the input slice length is not 0, 4 or 8.
///
pub fn arr_to_f64(arr: &[u8]) -> Result<f64, ToolError> {
    match arr.len() {
        0 => Ok(0.0),
        4 => Ok(BigEndian::read_f32(arr) as f64),
        8 => Ok(BigEndian::read_f64(arr)),
        _ => Err(ToolError::ReadF64Mismatch(Vec::from(arr))),
    }
}

///
/// The origin of EBML dates: 2001-01-01T00:00:00 UTC.
///
pub fn date_epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(978_307_200, 0).single().unwrap_or_default()
}

///
/// Encodes a date as 8 bytes.
///
/// The nanosecond offset from [`date_epoch`] is stored in units of 65536 nanoseconds in the 6 leading bytes, followed by two zero bytes.  Read back as a big endian integer this is the nanosecond offset rounded down to a multiple of 65536.
///
/// # Errors
///
/// This method returns [`ToolError::Unrepresentable`] if the date is too far from the epoch to be counted in nanoseconds.
///
pub fn write_date(date: &DateTime<Utc>) -> Result<Vec<u8>, ToolError> {
    let nanos = date.signed_duration_since(date_epoch())
        .num_nanoseconds()
        .ok_or_else(|| ToolError::Unrepresentable(date.to_rfc3339()))?;
    let scaled = nanos.div_euclid(1 << 16);
    Ok(Vec::from((scaled << 16).to_be_bytes()))
}

///
/// Reads a date written by [`write_date`] (or any 8 byte EBML date, truncated to 65536 nanoseconds).  An empty slice reads as the epoch.
///
/// # Errors
///
/// This method will throw an error if the input slice length is not 0 or 8.
///
pub fn arr_to_date(arr: &[u8]) -> Result<DateTime<Utc>, ToolError> {
    match arr.len() {
        0 => Ok(date_epoch()),
        8 => {
            let nanos = BigEndian::read_i64(arr) & !0xFFFF;
            Ok(date_epoch() + Duration::nanoseconds(nanos))
        },
        _ => Err(ToolError::ReadDateMismatch(Vec::from(arr))),
    }
}

///
/// Encodes a CRC-32 value the way EBML stores it (little endian).
///
pub fn write_checksum(crc: u32) -> [u8; 4] {
    let mut buf = [0u8; 4];
    LittleEndian::write_u32(&mut buf, crc);
    buf
}

///
/// Reads a stored CRC-32 value.  Returns `None` unless the slice is 4 bytes long.
///
pub fn arr_to_checksum(arr: &[u8]) -> Option<u32> {
    if arr.len() == 4 {
        Some(LittleEndian::read_u32(arr))
    } else {
        None
    }
}
