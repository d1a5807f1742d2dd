use super::buffer::{ByteReader, ByteWriter};
use super::descriptor::{CountWidth, EnumCodes, Field, Scalar, Schema};
use super::CodecError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

const ABSENT: i64 = -1;

/// Encodes `value` against `schema` into one frame.
pub fn encode(value: &Value, schema: &Schema) -> Result<Vec<u8>, CodecError> {
    let mut encoder = Encoder {
        writer: ByteWriter::new(),
        path: Vec::new(),
    };
    encoder.write(value, schema)?;
    Ok(encoder.writer.build())
}

/// Decodes one whole frame. Bytes left over after the value are an error.
pub fn decode(bytes: &[u8], schema: &Schema) -> Result<Value, CodecError> {
    let mut reader = ByteReader::new(bytes);
    let value = read(&mut reader, schema)?;
    if reader.has_remaining() {
        return Err(CodecError::TrailingBytes {
            remaining: bytes.len() - reader.position(),
        });
    }
    Ok(value)
}

pub fn to_bytes<T: Serialize>(message: &T, schema: &Schema) -> Result<Vec<u8>, CodecError> {
    let value = serde_json::to_value(message)?;
    encode(&value, schema)
}

pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8], schema: &Schema) -> Result<T, CodecError> {
    let value = decode(bytes, schema)?;
    Ok(serde_json::from_value(value)?)
}

/// Text-frame fallback carrying the same typed messages as JSON.
pub fn to_text<T: Serialize>(message: &T) -> Result<String, CodecError> {
    Ok(serde_json::to_string(message)?)
}

pub fn from_text<T: DeserializeOwned>(text: &str) -> Result<T, CodecError> {
    Ok(serde_json::from_str(text)?)
}

struct Encoder {
    writer: ByteWriter,
    path: Vec<&'static str>,
}

impl Encoder {
    fn path(&self) -> String {
        if self.path.is_empty() {
            "<root>".to_string()
        } else {
            self.path.join(".")
        }
    }

    fn mismatch(&self, expected: &'static str) -> CodecError {
        CodecError::ShapeMismatch {
            path: self.path(),
            expected,
        }
    }

    fn out_of_range(&self, value: f64) -> CodecError {
        CodecError::OutOfRange {
            path: self.path(),
            value,
        }
    }

    fn write(&mut self, value: &Value, schema: &Schema) -> Result<(), CodecError> {
        match schema {
            Schema::Scalar(scalar) => self.write_scalar(value, *scalar),
            Schema::Record(fields) => {
                let object = value.as_object().ok_or_else(|| self.mismatch("object"))?;
                self.write_fields(object, fields, None)
            }
            Schema::Enum(codes) => {
                let code = self.enum_code(value, codes)?;
                self.writer.write_u8(code);
                Ok(())
            }
            Schema::OptionalEnum(codes) => {
                if value.is_null() {
                    self.writer.write_i8(ABSENT as i8);
                } else {
                    let code = self.enum_code(value, codes)?;
                    self.writer.write_i8(code as i8);
                }
                Ok(())
            }
            Schema::Bitmask(keys) => {
                let object = value.as_object().ok_or_else(|| self.mismatch("flag object"))?;
                let mut flags = Vec::with_capacity(keys.len());
                for key in keys {
                    self.path.push(*key);
                    let flag = object
                        .get(*key)
                        .and_then(Value::as_bool)
                        .ok_or_else(|| self.mismatch("boolean flag"))?;
                    self.path.pop();
                    flags.push(flag);
                }
                self.writer.write_bits(&flags);
                Ok(())
            }
            Schema::Array { count, element } => {
                let items = value.as_array().ok_or_else(|| self.mismatch("array"))?;
                if items.len() > count.max_len() {
                    return Err(self.out_of_range(items.len() as f64));
                }
                match count {
                    CountWidth::U8 => self.writer.write_u8(items.len() as u8),
                    CountWidth::U16 => self.writer.write_u16(items.len() as u16),
                }
                self.path.push("[]");
                for item in items {
                    self.write(item, element)?;
                }
                self.path.pop();
                Ok(())
            }
            Schema::Union(union) => {
                let object = value.as_object().ok_or_else(|| self.mismatch("tagged object"))?;
                let name = object
                    .get(union.tag_key)
                    .and_then(Value::as_str)
                    .ok_or_else(|| self.mismatch("variant tag"))?;
                let variant = union
                    .by_name(name)
                    .ok_or_else(|| self.mismatch("known variant"))?;
                self.writer.write_u8(variant.tag);
                self.path.push(variant.name);
                self.write_fields(object, &variant.fields, Some(union.tag_key))?;
                self.path.pop();
                Ok(())
            }
        }
    }

    fn write_fields(
        &mut self,
        object: &Map<String, Value>,
        fields: &[Field],
        skip: Option<&str>,
    ) -> Result<(), CodecError> {
        for field in fields {
            if Some(field.name) == skip {
                continue;
            }
            self.path.push(field.name);
            let value = object.get(field.name).unwrap_or(&Value::Null);
            self.write(value, &field.schema)?;
            self.path.pop();
        }
        Ok(())
    }

    fn enum_code(&self, value: &Value, codes: &EnumCodes) -> Result<u8, CodecError> {
        let name = value.as_str().ok_or_else(|| self.mismatch("enum name"))?;
        codes
            .code_of(name)
            .ok_or_else(|| self.mismatch("known enum name"))
    }

    fn unsigned(&self, value: &Value, max: u64) -> Result<u64, CodecError> {
        let n = value.as_u64().ok_or_else(|| self.mismatch("unsigned integer"))?;
        if n > max {
            return Err(self.out_of_range(n as f64));
        }
        Ok(n)
    }

    fn signed(&self, value: &Value, min: i64, max: i64) -> Result<i64, CodecError> {
        let n = value.as_i64().ok_or_else(|| self.mismatch("signed integer"))?;
        if n < min || n > max {
            return Err(self.out_of_range(n as f64));
        }
        Ok(n)
    }

    /// Unsigned optionals use the all-ones value of their width as the
    /// absent sentinel.
    fn optional_unsigned(&self, value: &Value, max: u64) -> Result<u64, CodecError> {
        if value.is_null() {
            return Ok(max);
        }
        let n = self.unsigned(value, max)?;
        if n == max {
            return Err(CodecError::SentinelCollision { path: self.path() });
        }
        Ok(n)
    }

    fn optional(&self, value: &Value, min: i64, max: i64) -> Result<i64, CodecError> {
        if value.is_null() {
            return Ok(ABSENT);
        }
        let n = self.signed(value, min, max)?;
        if n == ABSENT {
            return Err(CodecError::SentinelCollision { path: self.path() });
        }
        Ok(n)
    }

    fn write_scalar(&mut self, value: &Value, scalar: Scalar) -> Result<(), CodecError> {
        match scalar {
            Scalar::Uint8 => {
                let n = self.unsigned(value, u8::MAX as u64)?;
                self.writer.write_u8(n as u8);
            }
            Scalar::Uint16 => {
                let n = self.unsigned(value, u16::MAX as u64)?;
                self.writer.write_u16(n as u16);
            }
            Scalar::Uint32 => {
                let n = self.unsigned(value, u32::MAX as u64)?;
                self.writer.write_u32(n as u32);
            }
            Scalar::Int8 => {
                let n = self.signed(value, i8::MIN as i64, i8::MAX as i64)?;
                self.writer.write_i8(n as i8);
            }
            Scalar::Int16 => {
                let n = self.signed(value, i16::MIN as i64, i16::MAX as i64)?;
                self.writer.write_i16(n as i16);
            }
            Scalar::Int32 => {
                let n = self.signed(value, i32::MIN as i64, i32::MAX as i64)?;
                self.writer.write_i32(n as i32);
            }
            Scalar::Float32 => {
                let n = value.as_f64().ok_or_else(|| self.mismatch("number"))?;
                self.writer.write_f32(n as f32);
            }
            Scalar::Float64 => {
                let n = value.as_f64().ok_or_else(|| self.mismatch("number"))?;
                self.writer.write_f64(n);
            }
            Scalar::Boolean => {
                let flag = value.as_bool().ok_or_else(|| self.mismatch("boolean"))?;
                self.writer.write_u8(flag as u8);
            }
            Scalar::String => {
                let text = value.as_str().ok_or_else(|| self.mismatch("string"))?;
                self.writer.write_string(text)?;
            }
            Scalar::Int8Optional => {
                let n = self.optional(value, i8::MIN as i64, i8::MAX as i64)?;
                self.writer.write_i8(n as i8);
            }
            Scalar::Uint32Optional => {
                let n = self.optional_unsigned(value, u32::MAX as u64)?;
                self.writer.write_u32(n as u32);
            }
        }
        Ok(())
    }
}

fn read(reader: &mut ByteReader<'_>, schema: &Schema) -> Result<Value, CodecError> {
    match schema {
        Schema::Scalar(scalar) => read_scalar(reader, *scalar),
        Schema::Record(fields) => {
            let mut object = Map::new();
            read_fields(reader, fields, &mut object)?;
            Ok(Value::Object(object))
        }
        Schema::Enum(codes) => {
            let code = reader.read_u8()?;
            enum_name(codes, code)
        }
        Schema::OptionalEnum(codes) => {
            let code = reader.read_i8()?;
            if code as i64 == ABSENT {
                return Ok(Value::Null);
            }
            enum_name(codes, code as u8)
        }
        Schema::Bitmask(keys) => {
            let bits = reader.read_bits()?;
            let object = keys
                .iter()
                .zip(bits.iter())
                .map(|(key, bit)| (key.to_string(), Value::Bool(*bit)))
                .collect();
            Ok(Value::Object(object))
        }
        Schema::Array { count, element } => {
            let len = match count {
                CountWidth::U8 => reader.read_u8()? as usize,
                CountWidth::U16 => reader.read_u16()? as usize,
            };
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(read(reader, element)?);
            }
            Ok(Value::Array(items))
        }
        Schema::Union(union) => {
            let tag = reader.read_u8()?;
            let variant = union
                .by_tag(tag)
                .ok_or(CodecError::SchemaNotFound { tag })?;
            let mut object = Map::new();
            object.insert(
                union.tag_key.to_string(),
                Value::String(variant.name.to_string()),
            );
            let fields: Vec<&Field> = variant
                .fields
                .iter()
                .filter(|f| f.name != union.tag_key)
                .collect();
            for field in fields {
                object.insert(field.name.to_string(), read(reader, &field.schema)?);
            }
            Ok(Value::Object(object))
        }
    }
}

fn read_fields(
    reader: &mut ByteReader<'_>,
    fields: &[Field],
    object: &mut Map<String, Value>,
) -> Result<(), CodecError> {
    for field in fields {
        object.insert(field.name.to_string(), read(reader, &field.schema)?);
    }
    Ok(())
}

fn enum_name(codes: &EnumCodes, code: u8) -> Result<Value, CodecError> {
    codes
        .name_of(code)
        .map(|name| Value::String(name.to_string()))
        .ok_or(CodecError::SchemaNotFound { tag: code })
}

fn read_scalar(reader: &mut ByteReader<'_>, scalar: Scalar) -> Result<Value, CodecError> {
    let value = match scalar {
        Scalar::Uint8 => Value::from(reader.read_u8()?),
        Scalar::Uint16 => Value::from(reader.read_u16()?),
        Scalar::Uint32 => Value::from(reader.read_u32()?),
        Scalar::Int8 => Value::from(reader.read_i8()?),
        Scalar::Int16 => Value::from(reader.read_i16()?),
        Scalar::Int32 => Value::from(reader.read_i32()?),
        Scalar::Float32 => Value::from(reader.read_f32()? as f64),
        Scalar::Float64 => Value::from(reader.read_f64()?),
        Scalar::Boolean => Value::Bool(reader.read_u8()? != 0),
        Scalar::String => Value::String(reader.read_string()?),
        Scalar::Int8Optional => match reader.read_i8()? {
            n if n as i64 == ABSENT => Value::Null,
            n => Value::from(n),
        },
        Scalar::Uint32Optional => match reader.read_u32()? {
            u32::MAX => Value::Null,
            n => Value::from(n),
        },
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Variant;
    use serde_json::json;

    fn drop_schema() -> Schema {
        Schema::record(vec![
            ("entityId", Scalar::Uint32.into()),
            ("x", Scalar::Float32.into()),
            ("owner", Scalar::Uint32Optional.into()),
            (
                "drop",
                Schema::union(
                    "type",
                    vec![
                        Variant::new("health", 1, vec![("amount", Scalar::Uint8.into())]),
                        Variant::new(
                            "shield",
                            2,
                            vec![("level", Schema::enumeration(&[("medium", 1), ("big", 2)]))],
                        ),
                    ],
                ),
            ),
            ("keys", Schema::bitmask(&["up", "down", "shoot"])),
            ("tags", Schema::array_u8(Scalar::String.into())),
        ])
    }

    #[test]
    fn test_record_roundtrip() {
        let value = json!({
            "entityId": 7,
            "x": 12.5,
            "owner": null,
            "drop": {"type": "shield", "level": "big"},
            "keys": {"up": true, "down": false, "shoot": true},
            "tags": ["a", "bc"],
        });
        let schema = drop_schema();
        let bytes = encode(&value, &schema).unwrap();
        assert_eq!(decode(&bytes, &schema).unwrap(), value);
    }

    #[test]
    fn test_wire_layout_has_no_field_names() {
        let value = json!({
            "entityId": 1,
            "x": 0.0,
            "owner": 3,
            "drop": {"type": "health", "amount": 9},
            "keys": {"up": false, "down": true, "shoot": false},
            "tags": [],
        });
        let bytes = encode(&value, &drop_schema()).unwrap();
        // u32 + f32 + u32 + tag + u8 + bits + count
        assert_eq!(bytes.len(), 4 + 4 + 4 + 1 + 1 + 1 + 1);
        assert_eq!(bytes[12], 1);
        assert_eq!(bytes[13], 9);
        assert_eq!(bytes[14], 0b010);
        assert_eq!(bytes[15], 0);
    }

    #[test]
    fn test_unknown_union_tag_is_schema_not_found() {
        let schema = drop_schema();
        let value = json!({
            "entityId": 1,
            "x": 0.0,
            "owner": null,
            "drop": {"type": "health", "amount": 9},
            "keys": {"up": false, "down": false, "shoot": false},
            "tags": [],
        });
        let mut bytes = encode(&value, &schema).unwrap();
        bytes[12] = 42;
        assert!(matches!(
            decode(&bytes, &schema),
            Err(CodecError::SchemaNotFound { tag: 42 })
        ));
    }

    #[test]
    fn test_unknown_enum_code_is_schema_not_found() {
        let schema = Schema::enumeration(&[("blue", 1), ("red", 2)]);
        assert!(matches!(
            decode(&[9], &schema),
            Err(CodecError::SchemaNotFound { tag: 9 })
        ));
    }

    #[test]
    fn test_optional_sentinel_collision() {
        let schema = Schema::record(vec![("owner", Scalar::Uint32Optional.into())]);
        let err = encode(&json!({"owner": u32::MAX}), &schema).unwrap_err();
        assert!(matches!(err, CodecError::SentinelCollision { .. }));
    }

    #[test]
    fn test_optional_id_covers_full_unsigned_range() {
        let schema = Schema::record(vec![("owner", Scalar::Uint32Optional.into())]);
        let high = json!({"owner": i32::MAX as u64 + 5});
        let bytes = encode(&high, &schema).unwrap();
        assert_eq!(decode(&bytes, &schema).unwrap(), high);

        let absent = json!({"owner": null});
        let bytes = encode(&absent, &schema).unwrap();
        assert_eq!(bytes, vec![0xFF; 4]);
        assert_eq!(decode(&bytes, &schema).unwrap(), absent);
    }

    #[test]
    fn test_optional_enum_absent_and_present() {
        let schema = Schema::optional_enumeration(&[("laser1", 1), ("rocket", 3)]);
        assert_eq!(encode(&Value::Null, &schema).unwrap(), vec![0xFF]);
        assert_eq!(decode(&[0xFF], &schema).unwrap(), Value::Null);
        assert_eq!(decode(&[3], &schema).unwrap(), json!("rocket"));
    }

    #[test]
    fn test_shape_mismatch_reports_path() {
        let schema = Schema::record(vec![(
            "inner",
            Schema::record(vec![("health", Scalar::Uint8.into())]),
        )]);
        let err = encode(&json!({"inner": {"health": "full"}}), &schema).unwrap_err();
        match err {
            CodecError::ShapeMismatch { path, .. } => assert_eq!(path, "inner.health"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_out_of_range_integer() {
        let schema: Schema = Scalar::Uint8.into();
        assert!(matches!(
            encode(&json!(300), &schema),
            Err(CodecError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_array_count_is_read_not_terminated() {
        let schema = Schema::array_u16(Scalar::Uint8.into());
        let bytes = encode(&json!([1, 0, 2]), &schema).unwrap();
        assert_eq!(bytes, vec![3, 0, 1, 0, 2]);
        assert_eq!(decode(&bytes, &schema).unwrap(), json!([1, 0, 2]));
    }

    #[test]
    fn test_truncated_and_trailing_frames() {
        let schema = Schema::array_u8(Scalar::Uint16.into());
        assert!(matches!(
            decode(&[2, 1, 0], &schema),
            Err(CodecError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            decode(&[0, 7], &schema),
            Err(CodecError::TrailingBytes { remaining: 1 })
        ));
    }
}
