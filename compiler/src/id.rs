// id.rs — Stable arena identifiers for one compilation session
//
// Components, virtual components and state use-cases live in flat arenas
// owned by the session. These IDs index into them and are allocated in
// declaration order, so iteration over them is deterministic.

/// Identifier of a concrete component (index into the session arena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u32);

/// Identifier of a declared virtual component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtualId(pub u32);

/// Identifier of a `set state` declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub u32);

impl ComponentId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl VirtualId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl StateId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Allocator for arena IDs. Produces monotonically increasing IDs in
/// allocation order.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next_component: u32,
    next_virtual: u32,
    next_state: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_component(&mut self) -> ComponentId {
        let id = ComponentId(self.next_component);
        self.next_component += 1;
        id
    }

    pub fn alloc_virtual(&mut self) -> VirtualId {
        let id = VirtualId(self.next_virtual);
        self.next_virtual += 1;
        id
    }

    pub fn alloc_state(&mut self) -> StateId {
        let id = StateId(self.next_state);
        self.next_state += 1;
        id
    }
}
