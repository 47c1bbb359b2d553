//! Storage slot assignment.
//!
//! Fields get consecutive slots in declaration order starting at 0. A struct field takes
//! one slot per struct member (member `i` lives at `base + i`); every other field takes
//! exactly one slot. Arrays keep their length at the base slot with elements from
//! `keccak(base)`, and mapping values live at `keccak(base, key)`, so neither grows the
//! static layout.

use indexmap::IndexMap;
use veriyul_core::{Struct, Type, Variable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub offset: u64,
    pub ty: Type,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructLayout {
    pub members: IndexMap<String, Member>,
}

impl StructLayout {
    fn new(def: &Struct) -> Self {
        let members = def
            .fields
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let member = Member {
                    offset: i as u64,
                    ty: field.ty.clone(),
                };
                (field.name.clone(), member)
            })
            .collect();
        Self { members }
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    pub fn len(&self) -> u64 {
        self.members.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotEntry {
    pub slot: u64,
    pub size: u64,
    pub ty: Type,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageLayout {
    slots: IndexMap<String, SlotEntry>,
    structs: IndexMap<String, StructLayout>,
    next: u64,
}

impl StorageLayout {
    pub fn allocate(fields: &[Variable], structs: &[Struct]) -> Self {
        let mut layout = StorageLayout {
            structs: structs
                .iter()
                .map(|def| (def.name.clone(), StructLayout::new(def)))
                .collect(),
            ..Default::default()
        };
        for field in fields {
            let size = layout.size_of(&field.ty);
            let entry = SlotEntry {
                slot: layout.next,
                size,
                ty: field.ty.clone(),
            };
            tracing::debug!(field = %field.name, slot = entry.slot, size, "allocated storage");
            layout.slots.insert(field.name.clone(), entry);
            layout.next += size;
        }
        layout
    }

    /// Number of consecutive slots a value of `ty` occupies in the static layout.
    pub fn size_of(&self, ty: &Type) -> u64 {
        match ty {
            Type::Struct(name) => self
                .structs
                .get(name)
                .map_or(1, |layout| layout.len().max(1)),
            _ => 1,
        }
    }

    pub fn slot(&self, name: &str) -> Option<u64> {
        self.slots.get(name).map(|entry| entry.slot)
    }

    pub fn field(&self, name: &str) -> Option<&SlotEntry> {
        self.slots.get(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &SlotEntry)> {
        self.slots.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn struct_layout(&self, name: &str) -> Option<&StructLayout> {
        self.structs.get(name)
    }

    /// First member with this name in any struct, in declaration order. Used when the
    /// struct type of an access is not known.
    pub fn find_member(&self, name: &str) -> Option<&Member> {
        self.structs.values().find_map(|layout| layout.member(name))
    }

    pub fn total_slots(&self) -> u64 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, ty: Type) -> Variable {
        Variable::new(name, ty)
    }

    fn point() -> Struct {
        Struct {
            name: "Point".to_string(),
            fields: vec![var("x", Type::Uint(256)), var("y", Type::Uint(256))],
        }
    }

    #[test]
    fn test_declaration_order_not_alphabetical() {
        let fields = vec![
            var("zeta", Type::Uint(256)),
            var("alpha", Type::Bool),
            var("mid", Type::Address),
        ];
        let layout = StorageLayout::allocate(&fields, &[]);
        assert_eq!(layout.slot("zeta"), Some(0));
        assert_eq!(layout.slot("alpha"), Some(1));
        assert_eq!(layout.slot("mid"), Some(2));
        let names: Vec<&str> = layout.entries().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_struct_fields_take_member_count() {
        let fields = vec![
            var("a", Type::Uint(8)),
            var("origin", Type::Struct("Point".to_string())),
            var("b", Type::Bool),
        ];
        let layout = StorageLayout::allocate(&fields, &[point()]);
        assert_eq!(layout.slot("a"), Some(0));
        assert_eq!(layout.slot("origin"), Some(1));
        assert_eq!(layout.slot("b"), Some(3));
        assert_eq!(layout.total_slots(), 4);
        assert_eq!(layout.struct_layout("Point").unwrap().member("y").unwrap().offset, 1);
    }

    #[test]
    fn test_unknown_struct_and_collections_take_one_slot() {
        let fields = vec![
            var("ghost", Type::Struct("Missing".to_string())),
            var(
                "map",
                Type::Mapping(Box::new(Type::Address), Box::new(Type::Uint(256))),
            ),
            var("list", Type::Array(Box::new(Type::Struct("Point".to_string())))),
            var("last", Type::Uint(256)),
        ];
        let layout = StorageLayout::allocate(&fields, &[point()]);
        assert_eq!(layout.slot("map"), Some(1));
        assert_eq!(layout.slot("list"), Some(2));
        assert_eq!(layout.slot("last"), Some(3));
    }

    #[test]
    fn test_find_member_without_type() {
        let layout = StorageLayout::allocate(&[], &[point()]);
        assert_eq!(layout.find_member("y").map(|m| m.offset), Some(1));
        assert!(layout.find_member("z").is_none());
    }
}
