use crate::models::{Act, ActId, ActRef};

// ---------------------------------------------------------------------------
// Resolver traits
// ---------------------------------------------------------------------------

/// Read-only lookup of acts by reference.
///
/// Implementations own the acts; traversals only borrow them for the lifetime
/// of the resolver borrow. A lookup that cannot be satisfied (deleted or
/// inaccessible record) returns `None` and is never an error.
pub trait ActResolver: Send + Sync {
    fn get_act(&self, id: &ActId) -> Option<&Act>;

    /// Resolve a reference. The default implementation ignores the category.
    fn resolve(&self, reference: &ActRef) -> Option<&Act> {
        self.get_act(&reference.id)
    }
}

/// Queries used to select the root acts of a traversal.
pub trait ActSource: ActResolver {
    /// Acts of the given patient, in no particular order.
    fn acts_for_patient(&self, patient: &str) -> Vec<&Act>;

    /// Acts that hold a relationship targeting `id`.
    fn parents_of(&self, id: &ActId) -> Vec<&Act>;
}

impl<T: ActResolver + ?Sized> ActResolver for &T {
    fn get_act(&self, id: &ActId) -> Option<&Act> {
        (**self).get_act(id)
    }

    fn resolve(&self, reference: &ActRef) -> Option<&Act> {
        (**self).resolve(reference)
    }
}
