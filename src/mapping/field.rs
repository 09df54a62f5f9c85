/// Storage width of an integer-backed element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    /// Size in bytes.
    pub const fn size(&self) -> usize {
        match self {
            Self::W8 => 1,
            Self::W16 => 2,
            Self::W32 => 4,
            Self::W64 => 8,
        }
    }

    /// Largest unsigned value that fits.
    pub const fn max_value(&self) -> u64 {
        u64::MAX >> (64 - 8 * self.size())
    }

    pub const fn bits(&self) -> usize {
        8 * self.size()
    }
}

/// Named values of an enumerated field.
#[derive(Debug, PartialEq, Eq)]
pub struct EnumDef {
    pub name: &'static str,
    pub width: IntWidth,
    pub variants: &'static [(&'static str, u64)],
}

impl EnumDef {
    /// Gets the variant name of a stored value.
    pub fn name_of(&self, value: u64) -> Option<&'static str> {
        self.variants
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(name, _)| *name)
    }

    /// Gets the value of a variant, ignoring ASCII case.
    pub fn value_of(&self, name: &str) -> Option<u64> {
        self.variants
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, value)| *value)
    }
}

/// Element type of a field
///
/// Integer and floating point elements are stored little-endian. Strings are
/// fixed-width byte arrays, NUL terminated when shorter than the width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    /// Fixed-width string of the given number of bytes.
    String(usize),
    /// Integer rendered by variant name.
    Enum(&'static EnumDef),
    /// Integer rendered as hexadecimal flags.
    Bitfield(IntWidth),
}

impl ElementType {
    /// Size of one element in bytes.
    pub const fn size(&self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
            Self::String(width) => *width,
            Self::Enum(def) => def.width.size(),
            Self::Bitfield(width) => width.size(),
        }
    }

    /// Signedness and width of integer elements, `None` for the rest.
    pub const fn integer(&self) -> Option<(bool, IntWidth)> {
        match self {
            Self::I8 => Some((true, IntWidth::W8)),
            Self::U8 => Some((false, IntWidth::W8)),
            Self::I16 => Some((true, IntWidth::W16)),
            Self::U16 => Some((false, IntWidth::W16)),
            Self::I32 => Some((true, IntWidth::W32)),
            Self::U32 => Some((false, IntWidth::W32)),
            Self::I64 => Some((true, IntWidth::W64)),
            Self::U64 => Some((false, IntWidth::W64)),
            _ => None,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Self::String(..))
    }

    /// Checks the element type can be encoded at all.
    pub(crate) fn defect(&self) -> Option<&'static str> {
        match self {
            Self::String(0) => Some("zero-width string"),
            Self::Enum(def) if def.variants.is_empty() => Some("enum without variants"),
            Self::Enum(def) if def.variants.iter().any(|(_, v)| *v > def.width.max_value()) => {
                Some("enum variant exceeds storage width")
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::I8 => write!(f, "i8"),
            Self::U8 => write!(f, "u8"),
            Self::I16 => write!(f, "i16"),
            Self::U16 => write!(f, "u16"),
            Self::I32 => write!(f, "i32"),
            Self::U32 => write!(f, "u32"),
            Self::I64 => write!(f, "i64"),
            Self::U64 => write!(f, "u64"),
            Self::F32 => write!(f, "f32"),
            Self::F64 => write!(f, "f64"),
            Self::String(width) => write!(f, "string[{}]", width),
            Self::Enum(def) => write!(f, "enum {}", def.name),
            Self::Bitfield(width) => write!(f, "bits{}", width.bits()),
        }
    }
}

/// Field descriptor
///
/// Identifies one field of one record type: where it starts, what it holds
/// and how many elements it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    name: &'static str,
    offset: usize,
    element_type: ElementType,
    count: usize,
}

impl Field {
    /// Creates a scalar field.
    pub const fn new(name: &'static str, offset: usize, element_type: ElementType) -> Self {
        Self::array(name, offset, element_type, 1)
    }

    /// Creates a fixed-size array field.
    pub const fn array(
        name: &'static str,
        offset: usize,
        element_type: ElementType,
        count: usize,
    ) -> Self {
        Self {
            name,
            offset,
            element_type,
            count,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_array(&self) -> bool {
        self.count > 1
    }

    /// Total size in bytes.
    pub fn size(&self) -> usize {
        self.count * self.element_type.size()
    }

    /// First byte past the field, `None` on overflow.
    pub fn end(&self) -> Option<usize> {
        self.count
            .checked_mul(self.element_type.size())
            .and_then(|size| size.checked_add(self.offset))
    }

    /// Byte range of the field within its record.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.size()
    }

    /// Gets element `index` of an array field as a scalar field.
    pub fn element(&self, index: usize) -> Option<Self> {
        if index >= self.count {
            return None;
        }
        Some(Self {
            offset: self.offset + index * self.element_type.size(),
            count: 1,
            ..*self
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODE: EnumDef = EnumDef {
        name: "Mode",
        width: IntWidth::W8,
        variants: &[("off", 0), ("on", 1)],
    };

    #[test]
    fn int_width_limits() {
        assert_eq!(IntWidth::W8.max_value(), 0xff);
        assert_eq!(IntWidth::W16.max_value(), 0xffff);
        assert_eq!(IntWidth::W32.max_value(), 0xffff_ffff);
        assert_eq!(IntWidth::W64.max_value(), u64::MAX);
    }

    #[test]
    fn element_sizes() {
        assert_eq!(ElementType::I16.size(), 2);
        assert_eq!(ElementType::F64.size(), 8);
        assert_eq!(ElementType::String(24).size(), 24);
        assert_eq!(ElementType::Enum(&MODE).size(), 1);
        assert_eq!(ElementType::Bitfield(IntWidth::W32).size(), 4);
    }

    #[test]
    fn enum_lookup_ignores_case() {
        assert_eq!(MODE.value_of("ON"), Some(1));
        assert_eq!(MODE.name_of(0), Some("off"));
        assert_eq!(MODE.name_of(7), None);
    }

    #[test]
    fn element_of_array() {
        let field = Field::array("rotation", 12, ElementType::F32, 3);
        assert_eq!(field.size(), 12);
        assert_eq!(field.range(), 12..24);

        let second = field.element(1).unwrap();
        assert_eq!(second.offset(), 16);
        assert_eq!(second.count(), 1);
        assert_eq!(second.name(), "rotation");
        assert!(field.element(3).is_none());
    }

    #[test]
    fn defects() {
        const EMPTY: EnumDef = EnumDef {
            name: "Empty",
            width: IntWidth::W8,
            variants: &[],
        };
        const WIDE: EnumDef = EnumDef {
            name: "Wide",
            width: IntWidth::W8,
            variants: &[("big", 256)],
        };
        assert!(ElementType::String(0).defect().is_some());
        assert!(ElementType::Enum(&EMPTY).defect().is_some());
        assert!(ElementType::Enum(&WIDE).defect().is_some());
        assert!(ElementType::Enum(&MODE).defect().is_none());
        assert!(ElementType::U32.defect().is_none());
    }
}
