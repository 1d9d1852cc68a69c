//! A [`serde::Serializer`] whose output is canonical JSON text.
//!
//! Every value renders to its own `String`. Compound values collect their
//! rendered children and are assembled on `end`, which is where object
//! members get sorted.

use serde::Serialize;
use serde::ser::{self, Impossible};

use crate::CanonicalizationError;
use crate::number::{format_f64, format_signed, format_unsigned};
use crate::string::write_string;

type Result<T> = std::result::Result<T, CanonicalizationError>;

fn quoted(value: &str) -> String {
    let mut out = String::new();
    write_string(&mut out, value);
    out
}

/// Assembles `{"name":value}` for externally tagged enum variants.
fn tagged(variant: &str, value: String) -> String {
    let mut out = String::from("{");
    write_string(&mut out, variant);
    out.push(':');
    out.push_str(&value);
    out.push('}');
    out
}

fn render_object(mut members: Vec<(String, String)>) -> Result<String> {
    members.sort_by(|(a, _), (b, _)| a.encode_utf16().cmp(b.encode_utf16()));

    if let Some(pair) = members.windows(2).find(|pair| pair[0].0 == pair[1].0) {
        return Err(CanonicalizationError::DuplicateKey(pair[0].0.clone()));
    }

    let mut out = String::from("{");
    for (index, (name, value)) in members.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        write_string(&mut out, name);
        out.push(':');
        out.push_str(value);
    }
    out.push('}');
    Ok(out)
}

pub(crate) struct Canonicalizer;

impl ser::Serializer for Canonicalizer {
    type Ok = String;
    type Error = CanonicalizationError;

    type SerializeSeq = ArrayWriter;
    type SerializeTuple = ArrayWriter;
    type SerializeTupleStruct = ArrayWriter;
    type SerializeTupleVariant = VariantWriter<ArrayWriter>;
    type SerializeMap = ObjectWriter;
    type SerializeStruct = ObjectWriter;
    type SerializeStructVariant = VariantWriter<ObjectWriter>;

    fn serialize_bool(self, v: bool) -> Result<String> {
        Ok(if v { "true" } else { "false" }.to_owned())
    }

    fn serialize_i8(self, v: i8) -> Result<String> {
        format_signed(v.into())
    }

    fn serialize_i16(self, v: i16) -> Result<String> {
        format_signed(v.into())
    }

    fn serialize_i32(self, v: i32) -> Result<String> {
        format_signed(v.into())
    }

    fn serialize_i64(self, v: i64) -> Result<String> {
        format_signed(v.into())
    }

    fn serialize_i128(self, v: i128) -> Result<String> {
        format_signed(v)
    }

    fn serialize_u8(self, v: u8) -> Result<String> {
        format_unsigned(v.into())
    }

    fn serialize_u16(self, v: u16) -> Result<String> {
        format_unsigned(v.into())
    }

    fn serialize_u32(self, v: u32) -> Result<String> {
        format_unsigned(v.into())
    }

    fn serialize_u64(self, v: u64) -> Result<String> {
        format_unsigned(v.into())
    }

    fn serialize_u128(self, v: u128) -> Result<String> {
        format_unsigned(v)
    }

    fn serialize_f32(self, v: f32) -> Result<String> {
        format_f64(v.into())
    }

    fn serialize_f64(self, v: f64) -> Result<String> {
        format_f64(v)
    }

    fn serialize_char(self, v: char) -> Result<String> {
        Ok(quoted(v.encode_utf8(&mut [0; 4])))
    }

    fn serialize_str(self, v: &str) -> Result<String> {
        Ok(quoted(v))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<String> {
        let elements: Vec<String> = v.iter().map(u8::to_string).collect();
        Ok(format!("[{}]", elements.join(",")))
    }

    fn serialize_none(self) -> Result<String> {
        self.serialize_unit()
    }

    fn serialize_some<T>(self, value: &T) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<String> {
        Ok("null".to_owned())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<String> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        Ok(tagged(variant, value.serialize(self)?))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<ArrayWriter> {
        Ok(ArrayWriter {
            elements: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<ArrayWriter> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<ArrayWriter> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantWriter<ArrayWriter>> {
        Ok(VariantWriter {
            variant,
            inner: self.serialize_seq(Some(len))?,
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<ObjectWriter> {
        Ok(ObjectWriter {
            members: Vec::with_capacity(len.unwrap_or(0)),
            pending: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<ObjectWriter> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantWriter<ObjectWriter>> {
        Ok(VariantWriter {
            variant,
            inner: self.serialize_map(Some(len))?,
        })
    }
}

pub(crate) struct ArrayWriter {
    elements: Vec<String>,
}

impl ArrayWriter {
    fn push<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.elements.push(value.serialize(Canonicalizer)?);
        Ok(())
    }

    fn finish(self) -> String {
        format!("[{}]", self.elements.join(","))
    }
}

impl ser::SerializeSeq for ArrayWriter {
    type Ok = String;
    type Error = CanonicalizationError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<String> {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for ArrayWriter {
    type Ok = String;
    type Error = CanonicalizationError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<String> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleStruct for ArrayWriter {
    type Ok = String;
    type Error = CanonicalizationError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<String> {
        Ok(self.finish())
    }
}

pub(crate) struct ObjectWriter {
    members: Vec<(String, String)>,
    pending: Option<String>,
}

impl ser::SerializeMap for ObjectWriter {
    type Ok = String;
    type Error = CanonicalizationError;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.pending = Some(key.serialize(MemberName)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let name = self.pending.take().ok_or_else(|| {
            CanonicalizationError::Custom("map value serialized before its key".to_owned())
        })?;
        self.members.push((name, value.serialize(Canonicalizer)?));
        Ok(())
    }

    fn end(self) -> Result<String> {
        render_object(self.members)
    }
}

impl ser::SerializeStruct for ObjectWriter {
    type Ok = String;
    type Error = CanonicalizationError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.members
            .push((key.to_owned(), value.serialize(Canonicalizer)?));
        Ok(())
    }

    fn end(self) -> Result<String> {
        render_object(self.members)
    }
}

pub(crate) struct VariantWriter<W> {
    variant: &'static str,
    inner: W,
}

impl ser::SerializeTupleVariant for VariantWriter<ArrayWriter> {
    type Ok = String;
    type Error = CanonicalizationError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.inner.push(value)
    }

    fn end(self) -> Result<String> {
        Ok(tagged(self.variant, self.inner.finish()))
    }
}

impl ser::SerializeStructVariant for VariantWriter<ObjectWriter> {
    type Ok = String;
    type Error = CanonicalizationError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        ser::SerializeStruct::serialize_field(&mut self.inner, key, value)
    }

    fn end(self) -> Result<String> {
        Ok(tagged(self.variant, render_object(self.inner.members)?))
    }
}

/// Serializes map keys to the raw (unquoted) member name.
struct MemberName;

impl ser::Serializer for MemberName {
    type Ok = String;
    type Error = CanonicalizationError;

    type SerializeSeq = Impossible<String, CanonicalizationError>;
    type SerializeTuple = Impossible<String, CanonicalizationError>;
    type SerializeTupleStruct = Impossible<String, CanonicalizationError>;
    type SerializeTupleVariant = Impossible<String, CanonicalizationError>;
    type SerializeMap = Impossible<String, CanonicalizationError>;
    type SerializeStruct = Impossible<String, CanonicalizationError>;
    type SerializeStructVariant = Impossible<String, CanonicalizationError>;

    fn serialize_bool(self, _v: bool) -> Result<String> {
        Err(CanonicalizationError::InvalidKey("bool"))
    }

    fn serialize_i8(self, v: i8) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i16(self, v: i16) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i32(self, v: i32) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i64(self, v: i64) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i128(self, v: i128) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u8(self, v: u8) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u16(self, v: u16) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u32(self, v: u32) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u64(self, v: u64) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u128(self, v: u128) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_f32(self, _v: f32) -> Result<String> {
        Err(CanonicalizationError::InvalidKey("float"))
    }

    fn serialize_f64(self, _v: f64) -> Result<String> {
        Err(CanonicalizationError::InvalidKey("float"))
    }

    fn serialize_char(self, v: char) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_str(self, v: &str) -> Result<String> {
        Ok(v.to_owned())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<String> {
        Err(CanonicalizationError::InvalidKey("bytes"))
    }

    fn serialize_none(self) -> Result<String> {
        Err(CanonicalizationError::InvalidKey("null"))
    }

    fn serialize_some<T>(self, value: &T) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<String> {
        Err(CanonicalizationError::InvalidKey("null"))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<String> {
        Err(CanonicalizationError::InvalidKey("null"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String> {
        Ok(variant.to_owned())
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        Err(CanonicalizationError::InvalidKey("enum"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(CanonicalizationError::InvalidKey("array"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(CanonicalizationError::InvalidKey("array"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(CanonicalizationError::InvalidKey("array"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(CanonicalizationError::InvalidKey("enum"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(CanonicalizationError::InvalidKey("object"))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(CanonicalizationError::InvalidKey("object"))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(CanonicalizationError::InvalidKey("enum"))
    }
}
