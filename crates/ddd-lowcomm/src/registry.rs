//! Message-type registry.
//!
//! A message type is a name plus an ordered list of components. Types are
//! registered once per context, before any message of the type exists, and
//! identically on every rank. They stay valid for the lifetime of the
//! context.

use std::mem::size_of;
use std::sync::Arc;

use ddd_transport::{Lease, MemClass, MemoryPool};

use crate::config::MAX_COMPONENTS;

/// Handle of a registered message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MsgType(pub(crate) u16);

/// Handle of one component of a message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Comp {
    pub(crate) msg_type: MsgType,
    pub(crate) index: u8,
}

impl Comp {
    /// The message type this component belongs to.
    pub fn msg_type(&self) -> MsgType {
        self.msg_type
    }

    /// Position in declaration order.
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

/// Shape of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    /// Repeated entries of a fixed size.
    Table { entry_size: usize },
    /// A raw byte run.
    Chunk,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDesc {
    pub name: String,
    pub kind: ComponentKind,
}

/// A registered message type.
#[derive(Debug)]
pub struct MessageType {
    name: String,
    components: Vec<ComponentDesc>,
    /// Set once the first message of this type is created.
    sealed: bool,
    _lease: Lease,
}

impl MessageType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn components(&self) -> &[ComponentDesc] {
        &self.components
    }
}

/// All message types of one context.
#[derive(Debug)]
pub struct TypeRegistry {
    types: Vec<MessageType>,
    capacity: usize,
}

impl TypeRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            types: Vec::new(),
            capacity,
        }
    }

    /// Register a new, empty message type.
    ///
    /// # Panics
    /// If the registry is full or the persistent pool cannot hold the type.
    pub fn define(&mut self, pool: &Arc<dyn MemoryPool>, name: &str) -> MsgType {
        assert!(
            self.types.len() < self.capacity && self.types.len() < u16::MAX as usize,
            "message-type registry overflow: {} types registered",
            self.types.len()
        );
        let lease = Lease::acquire(pool, MemClass::Persistent, size_of::<MessageType>())
            .unwrap_or_else(|| {
                panic!("persistent pool exhausted registering message type {name:?}")
            });

        self.types.push(MessageType {
            name: name.to_owned(),
            components: Vec::new(),
            sealed: false,
            _lease: lease,
        });
        MsgType((self.types.len() - 1) as u16)
    }

    /// Append a component to a message type.
    ///
    /// # Panics
    /// If the type already has [`MAX_COMPONENTS`] components or messages of the
    /// type have been created.
    pub fn add_component(&mut self, msg_type: MsgType, name: &str, kind: ComponentKind) -> Comp {
        let ty = self.get_mut(msg_type);
        assert!(
            !ty.sealed,
            "message type {:?} already has instances; cannot add component {name:?}",
            ty.name
        );
        assert!(
            ty.components.len() < MAX_COMPONENTS,
            "message type {:?} exceeds {MAX_COMPONENTS} components",
            ty.name
        );
        if let ComponentKind::Table { entry_size } = kind {
            assert!(entry_size > 0, "table {name:?} needs a positive entry size");
        }

        ty.components.push(ComponentDesc {
            name: name.to_owned(),
            kind,
        });
        Comp {
            msg_type,
            index: (ty.components.len() - 1) as u8,
        }
    }

    /// Look up a message type.
    ///
    /// # Panics
    /// If the handle does not belong to this registry.
    pub fn get(&self, msg_type: MsgType) -> &MessageType {
        self.types
            .get(msg_type.0 as usize)
            .unwrap_or_else(|| panic!("unknown message type {msg_type:?}"))
    }

    fn get_mut(&mut self, msg_type: MsgType) -> &mut MessageType {
        self.types
            .get_mut(msg_type.0 as usize)
            .unwrap_or_else(|| panic!("unknown message type {msg_type:?}"))
    }

    /// Mark a type as instantiated; its component list is frozen from now on.
    pub(crate) fn seal(&mut self, msg_type: MsgType) -> &MessageType {
        let ty = self.get_mut(msg_type);
        ty.sealed = true;
        ty
    }

    /// Component descriptor for `comp`.
    pub fn component(&self, comp: Comp) -> &ComponentDesc {
        &self.get(comp.msg_type).components[comp.index()]
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddd_transport::{BudgetPool, HeapPool};

    #[test]
    fn test_define_and_lookup() {
        let pool = HeapPool::new();
        let mut registry = TypeRegistry::new(4);
        let ty = registry.define(&pool, "xfer");
        let table = registry.add_component(ty, "objs", ComponentKind::Table { entry_size: 16 });
        let chunk = registry.add_component(ty, "data", ComponentKind::Chunk);

        assert_eq!(registry.get(ty).name(), "xfer");
        assert_eq!(table.index(), 0);
        assert_eq!(chunk.index(), 1);
        assert_eq!(
            registry.component(table).kind,
            ComponentKind::Table { entry_size: 16 }
        );
        assert!(pool.in_use(MemClass::Persistent) > 0);
    }

    #[test]
    fn test_identical_schemas_are_distinct_types() {
        let pool = HeapPool::new();
        let mut registry = TypeRegistry::new(4);
        let a = registry.define(&pool, "same");
        let b = registry.define(&pool, "same");
        let ca = registry.add_component(a, "t", ComponentKind::Table { entry_size: 4 });
        let cb = registry.add_component(b, "t", ComponentKind::Table { entry_size: 4 });
        assert_ne!(a, b);
        assert_ne!(ca, cb);
        assert_eq!(ca.msg_type(), a);
        assert_eq!(cb.msg_type(), b);
    }

    #[test]
    #[should_panic(expected = "exceeds 8 components")]
    fn test_component_limit() {
        let pool = HeapPool::new();
        let mut registry = TypeRegistry::new(4);
        let ty = registry.define(&pool, "wide");
        for i in 0..=MAX_COMPONENTS {
            registry.add_component(ty, &format!("c{i}"), ComponentKind::Chunk);
        }
    }

    #[test]
    #[should_panic(expected = "registry overflow")]
    fn test_registry_overflow() {
        let pool = HeapPool::new();
        let mut registry = TypeRegistry::new(2);
        for _ in 0..3 {
            registry.define(&pool, "t");
        }
    }

    #[test]
    #[should_panic(expected = "persistent pool exhausted")]
    fn test_persistent_pool_exhausted() {
        let pool: Arc<dyn MemoryPool> = BudgetPool::new(0, 1024);
        TypeRegistry::new(2).define(&pool, "t");
    }

    #[test]
    #[should_panic(expected = "already has instances")]
    fn test_sealed_type_rejects_components() {
        let pool = HeapPool::new();
        let mut registry = TypeRegistry::new(2);
        let ty = registry.define(&pool, "t");
        registry.seal(ty);
        registry.add_component(ty, "late", ComponentKind::Chunk);
    }
}
