//! Actions and their routing identity.
//!
//! An action is an immutable value describing one intended state transition.
//! Each concrete action type is its own *kind*: the Store routes an action to
//! the reducer registered for its Rust type, so a closed set of actions is
//! written as one struct per kind.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Marker trait for values that can be dispatched to a Store.
///
/// # Example
///
/// ```
/// use unistate_core::action::{Action, ActionKind};
///
/// #[derive(Debug, Clone, Copy)]
/// struct UpdateScore(i64);
///
/// impl Action for UpdateScore {}
///
/// assert_eq!(ActionKind::of::<UpdateScore>().name(), "UpdateScore");
/// ```
pub trait Action: Any + Send + Sync + fmt::Debug {}

/// Runtime identity of an action type.
///
/// Equality and hashing use only the [`TypeId`]; the type name is carried
/// for diagnostics.
#[derive(Clone, Copy)]
pub struct ActionKind {
    id: TypeId,
    type_name: &'static str,
}

impl ActionKind {
    /// The kind of action type `A`.
    #[must_use]
    pub fn of<A: Action>() -> Self {
        Self {
            id: TypeId::of::<A>(),
            type_name: std::any::type_name::<A>(),
        }
    }

    /// Short name of the action type (last path segment, generics kept).
    #[must_use]
    pub fn name(&self) -> &'static str {
        short_name(self.type_name)
    }

    /// Fully qualified type name of the action.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The `TypeId` this kind routes on.
    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }
}

fn short_name(full: &'static str) -> &'static str {
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

impl PartialEq for ActionKind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ActionKind {}

impl Hash for ActionKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ActionKind").field(&self.type_name).finish()
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Object-safe view of an [`Action`], used for open action sets where the
/// concrete type is only known at runtime.
pub trait AnyAction: Send + Sync + fmt::Debug {
    /// The kind this action routes as.
    fn kind(&self) -> ActionKind;

    /// Borrow the action as `Any` for downcasting inside a reducer.
    fn as_any(&self) -> &dyn Any;

    /// Fully qualified name of the concrete type behind this value.
    fn type_name(&self) -> &'static str;
}

impl<A: Action> AnyAction for A {
    fn kind(&self) -> ActionKind {
        ActionKind::of::<A>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<A>()
    }
}
