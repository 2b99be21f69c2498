use std::collections::HashMap;

use super::mono::MonoType;

/// Handle to a type stored in a [`TypeInterner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Arena of structurally distinct monotypes.
///
/// Owned by whoever needs signature identity (the compilation cache); there is
/// no process-wide type table.
#[derive(Debug, Default)]
pub struct TypeInterner {
    types: Vec<MonoType>,
    index: HashMap<MonoType, TypeId>,
}

impl TypeInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, ty: &MonoType) -> TypeId {
        if let Some(id) = self.index.get(ty) {
            return *id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty.clone());
        self.index.insert(ty.clone(), id);
        id
    }

    pub fn lookup(&self, ty: &MonoType) -> Option<TypeId> {
        self.index.get(ty).copied()
    }

    pub fn get(&self, id: TypeId) -> Option<&MonoType> {
        self.types.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
