//! Finite Check Module
//!
//! JSON has no NaN or infinity, and `serde_json` writes both as `null`.
//! [`ensure_finite`] walks a value before it is encoded so that such floats
//! are rejected instead of collapsing into `null`.

use std::fmt;

use serde::ser::{self, Serialize};

use crate::error::{MemoError, Result};

/// Fails with [`MemoError::Serialization`] if `value` contains a NaN or
/// infinite `f32`/`f64` anywhere in its structure.
pub fn ensure_finite<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    value
        .serialize(FiniteCheck)
        .map_err(|err| MemoError::Serialization(err.0))
}

#[derive(Debug)]
struct CheckError(String);

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for CheckError {}

impl ser::Error for CheckError {
    fn custom<M: fmt::Display>(msg: M) -> Self {
        CheckError(msg.to_string())
    }
}

fn check_float(value: f64) -> std::result::Result<(), CheckError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CheckError(format!("{value} has no JSON representation")))
    }
}

// Visits every node and discards it; only floats are inspected.
struct FiniteCheck;

type Visit = std::result::Result<(), CheckError>;

impl ser::Serializer for FiniteCheck {
    type Ok = ();
    type Error = CheckError;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, _: bool) -> Visit {
        Ok(())
    }
    fn serialize_i8(self, _: i8) -> Visit {
        Ok(())
    }
    fn serialize_i16(self, _: i16) -> Visit {
        Ok(())
    }
    fn serialize_i32(self, _: i32) -> Visit {
        Ok(())
    }
    fn serialize_i64(self, _: i64) -> Visit {
        Ok(())
    }
    fn serialize_i128(self, _: i128) -> Visit {
        Ok(())
    }
    fn serialize_u8(self, _: u8) -> Visit {
        Ok(())
    }
    fn serialize_u16(self, _: u16) -> Visit {
        Ok(())
    }
    fn serialize_u32(self, _: u32) -> Visit {
        Ok(())
    }
    fn serialize_u64(self, _: u64) -> Visit {
        Ok(())
    }
    fn serialize_u128(self, _: u128) -> Visit {
        Ok(())
    }
    fn serialize_f32(self, v: f32) -> Visit {
        check_float(f64::from(v))
    }
    fn serialize_f64(self, v: f64) -> Visit {
        check_float(v)
    }
    fn serialize_char(self, _: char) -> Visit {
        Ok(())
    }
    fn serialize_str(self, _: &str) -> Visit {
        Ok(())
    }
    fn serialize_bytes(self, _: &[u8]) -> Visit {
        Ok(())
    }
    fn serialize_none(self) -> Visit {
        Ok(())
    }
    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Visit {
        value.serialize(FiniteCheck)
    }
    fn serialize_unit(self) -> Visit {
        Ok(())
    }
    fn serialize_unit_struct(self, _: &'static str) -> Visit {
        Ok(())
    }
    fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> Visit {
        Ok(())
    }
    fn serialize_newtype_struct<T: ?Sized + Serialize>(self, _: &'static str, value: &T) -> Visit {
        value.serialize(FiniteCheck)
    }
    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        value: &T,
    ) -> Visit {
        value.serialize(FiniteCheck)
    }
    fn serialize_seq(self, _: Option<usize>) -> std::result::Result<Self, CheckError> {
        Ok(self)
    }
    fn serialize_tuple(self, _: usize) -> std::result::Result<Self, CheckError> {
        Ok(self)
    }
    fn serialize_tuple_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> std::result::Result<Self, CheckError> {
        Ok(self)
    }
    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> std::result::Result<Self, CheckError> {
        Ok(self)
    }
    fn serialize_map(self, _: Option<usize>) -> std::result::Result<Self, CheckError> {
        Ok(self)
    }
    fn serialize_struct(self, _: &'static str, _: usize) -> std::result::Result<Self, CheckError> {
        Ok(self)
    }
    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> std::result::Result<Self, CheckError> {
        Ok(self)
    }
}

impl ser::SerializeSeq for FiniteCheck {
    type Ok = ();
    type Error = CheckError;
    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Visit {
        value.serialize(FiniteCheck)
    }
    fn end(self) -> Visit {
        Ok(())
    }
}

impl ser::SerializeTuple for FiniteCheck {
    type Ok = ();
    type Error = CheckError;
    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Visit {
        value.serialize(FiniteCheck)
    }
    fn end(self) -> Visit {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for FiniteCheck {
    type Ok = ();
    type Error = CheckError;
    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Visit {
        value.serialize(FiniteCheck)
    }
    fn end(self) -> Visit {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for FiniteCheck {
    type Ok = ();
    type Error = CheckError;
    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Visit {
        value.serialize(FiniteCheck)
    }
    fn end(self) -> Visit {
        Ok(())
    }
}

impl ser::SerializeMap for FiniteCheck {
    type Ok = ();
    type Error = CheckError;
    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Visit {
        key.serialize(FiniteCheck)
    }
    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Visit {
        value.serialize(FiniteCheck)
    }
    fn end(self) -> Visit {
        Ok(())
    }
}

impl ser::SerializeStruct for FiniteCheck {
    type Ok = ();
    type Error = CheckError;
    fn serialize_field<T: ?Sized + Serialize>(&mut self, _: &'static str, value: &T) -> Visit {
        value.serialize(FiniteCheck)
    }
    fn end(self) -> Visit {
        Ok(())
    }
}

impl ser::SerializeStructVariant for FiniteCheck {
    type Ok = ();
    type Error = CheckError;
    fn serialize_field<T: ?Sized + Serialize>(&mut self, _: &'static str, value: &T) -> Visit {
        value.serialize(FiniteCheck)
    }
    fn end(self) -> Visit {
        Ok(())
    }
}
