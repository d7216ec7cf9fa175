use crate::{
    context::request::RequestContext,
    error::{FilterError, Result},
};
use model::{
    core::identifiers::{Entity, EntityType, FilterKind, FilterName},
    query::{Lambda, Variable},
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ORDER: i32 = 0;

/// Where a filter is conjoined relative to the query's own predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FilterPlace {
    /// Same as `Head`.
    #[default]
    Default,
    /// Before the existing predicate, on the call nearest the query root.
    Head,
    /// After the existing predicate, on the call nearest the caller.
    Tail,
}

impl FilterPlace {
    pub fn is_tail(&self) -> bool {
        matches!(self, FilterPlace::Tail)
    }
}

/// Kind of descriptors declared inline from a predicate rather than by a
/// dedicated filter type.
pub struct ExpressionFilter;

/// One predicate rule for an entity type.
#[derive(Debug, Clone)]
pub struct FilterDescriptor {
    entity: EntityType,
    name: Option<FilterName>,
    order: i32,
    place: FilterPlace,
    enabled: bool,
    predicate: Lambda,
    kind: FilterKind,
}

impl FilterDescriptor {
    /// Fails unless `predicate` binds exactly one variable of `entity`.
    pub fn new(entity: EntityType, predicate: Lambda) -> Result<Self> {
        match predicate.bound_variable() {
            Some(variable) if variable.entity == entity => {}
            _ => {
                return Err(FilterError::InvalidPredicate {
                    predicate: predicate.clone().into_expr().to_string(),
                    entity,
                });
            }
        }

        Ok(Self {
            entity,
            name: None,
            order: DEFAULT_ORDER,
            place: FilterPlace::Default,
            enabled: true,
            predicate,
            kind: FilterKind::of::<ExpressionFilter>(),
        })
    }

    pub fn for_entity<T: Entity>(predicate: Lambda) -> Result<Self> {
        Self::new(EntityType::of::<T>(), predicate)
    }

    pub fn named(mut self, name: impl Into<FilterName>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_name(mut self, name: Option<FilterName>) -> Self {
        self.name = name;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_place(mut self, place: FilterPlace) -> Self {
        self.place = place;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_kind(mut self, kind: FilterKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn entity(&self) -> &EntityType {
        &self.entity
    }

    pub fn name(&self) -> Option<&FilterName> {
        self.name.as_ref()
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn place(&self) -> FilterPlace {
        self.place
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn predicate(&self) -> &Lambda {
        &self.predicate
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    /// The predicate's row variable.
    pub fn bound_variable(&self) -> &Variable {
        // Construction guarantees exactly one parameter
        &self.predicate.parameters[0]
    }
}

/// A filter implemented as its own type. Descriptors built from it carry
/// the type as their [`FilterKind`], so the whole kind can be ignored at once.
pub trait DynamicQueryFilter: Send + Sync + 'static {
    type Entity: Entity;

    fn predicate(&self) -> Lambda;

    fn name(&self) -> Option<FilterName> {
        None
    }

    fn order(&self) -> i32 {
        DEFAULT_ORDER
    }

    fn place(&self) -> FilterPlace {
        FilterPlace::Default
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn descriptor(&self) -> Result<FilterDescriptor>
    where
        Self: Sized,
    {
        Ok(FilterDescriptor::for_entity::<Self::Entity>(self.predicate())?
            .with_name(self.name())
            .with_order(self.order())
            .with_place(self.place())
            .with_enabled(self.is_enabled())
            .with_kind(FilterKind::of::<Self>()))
    }
}

/// Construction of a filter from the current request's services.
pub trait FromRequest: Sized {
    fn from_request(ctx: &RequestContext) -> Result<Self>;
}
