//! Declarative schema descriptors.
//!
//! A descriptor is plain data describing the wire layout of a value. Records
//! list their fields in wire order; the frame itself carries no field names.

/// Fixed-size leaf encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    Uint8,
    Uint16,
    Uint32,
    Int8,
    Int16,
    Int32,
    Float32,
    Float64,
    Boolean,
    /// u16 byte length followed by UTF-8 bytes.
    String,
    /// i8 where -1 means absent.
    Int8Optional,
    /// u32 where `u32::MAX` means absent.
    Uint32Optional,
}

/// Width of the element count written in front of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountWidth {
    U8,
    U16,
}

impl CountWidth {
    pub fn max_len(self) -> usize {
        match self {
            CountWidth::U8 => u8::MAX as usize,
            CountWidth::U16 => u16::MAX as usize,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub schema: Schema,
}

/// Bidirectional name <-> code table for a one-byte enum.
#[derive(Debug, Clone)]
pub struct EnumCodes {
    entries: Vec<(&'static str, u8)>,
}

impl EnumCodes {
    pub fn code_of(&self, name: &str) -> Option<u8> {
        self.entries
            .iter()
            .find(|(entry, _)| *entry == name)
            .map(|(_, code)| *code)
    }

    pub fn name_of(&self, code: u8) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(_, entry)| *entry == code)
            .map(|(name, _)| *name)
    }
}

#[derive(Debug, Clone)]
pub struct Variant {
    pub name: &'static str,
    pub tag: u8,
    pub fields: Vec<Field>,
}

impl Variant {
    pub fn new(name: &'static str, tag: u8, fields: Vec<(&'static str, Schema)>) -> Self {
        Self {
            name,
            tag,
            fields: into_fields(fields),
        }
    }
}

/// Discriminated union: a leading tag byte selects the variant whose fields
/// follow inline. `tag_key` is the property that names the variant.
#[derive(Debug, Clone)]
pub struct Union {
    pub tag_key: &'static str,
    pub variants: Vec<Variant>,
}

impl Union {
    pub fn by_name(&self, name: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.name == name)
    }

    pub fn by_tag(&self, tag: u8) -> Option<&Variant> {
        self.variants.iter().find(|v| v.tag == tag)
    }
}

#[derive(Debug, Clone)]
pub enum Schema {
    Scalar(Scalar),
    Record(Vec<Field>),
    Enum(EnumCodes),
    /// One-byte enum code carried in an `Int8Optional` slot.
    OptionalEnum(EnumCodes),
    /// Up to eight named flags packed into one byte, in declaration order.
    Bitmask(Vec<&'static str>),
    Array {
        count: CountWidth,
        element: Box<Schema>,
    },
    Union(Union),
}

impl From<Scalar> for Schema {
    fn from(scalar: Scalar) -> Self {
        Schema::Scalar(scalar)
    }
}

fn into_fields(fields: Vec<(&'static str, Schema)>) -> Vec<Field> {
    fields
        .into_iter()
        .map(|(name, schema)| Field { name, schema })
        .collect()
}

fn enum_codes(entries: &[(&'static str, u8)]) -> EnumCodes {
    for (i, (name, code)) in entries.iter().enumerate() {
        assert!(
            !entries[..i].iter().any(|(n, c)| n == name || c == code),
            "duplicate enum entry {name}/{code}"
        );
    }
    EnumCodes {
        entries: entries.to_vec(),
    }
}

impl Schema {
    pub fn record(fields: Vec<(&'static str, Schema)>) -> Self {
        Schema::Record(into_fields(fields))
    }

    /// Record made of `base` fields followed by `extra` fields.
    pub fn extend(base: &[(&'static str, Schema)], extra: Vec<(&'static str, Schema)>) -> Self {
        let mut fields = base.to_vec();
        fields.extend(extra);
        Schema::record(fields)
    }

    pub fn enumeration(entries: &[(&'static str, u8)]) -> Self {
        Schema::Enum(enum_codes(entries))
    }

    pub fn optional_enumeration(entries: &[(&'static str, u8)]) -> Self {
        assert!(
            entries.iter().all(|(_, code)| *code <= i8::MAX as u8),
            "optional enum codes must fit in i8"
        );
        Schema::OptionalEnum(enum_codes(entries))
    }

    pub fn bitmask(keys: &[&'static str]) -> Self {
        assert!(keys.len() <= 8, "bitmask holds at most 8 flags");
        Schema::Bitmask(keys.to_vec())
    }

    pub fn array_u8(element: Schema) -> Self {
        Schema::Array {
            count: CountWidth::U8,
            element: Box::new(element),
        }
    }

    pub fn array_u16(element: Schema) -> Self {
        Schema::Array {
            count: CountWidth::U16,
            element: Box::new(element),
        }
    }

    pub fn union(tag_key: &'static str, variants: Vec<Variant>) -> Self {
        for (i, variant) in variants.iter().enumerate() {
            assert!(
                !variants[..i]
                    .iter()
                    .any(|v| v.tag == variant.tag || v.name == variant.name),
                "duplicate union variant {}",
                variant.name
            );
        }
        Schema::Union(Union { tag_key, variants })
    }
}
