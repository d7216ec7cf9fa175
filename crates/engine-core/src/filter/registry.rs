use super::descriptor::FilterDescriptor;
use crate::{
    context::request::RequestContext,
    error::{FilterError, Result},
};
use model::core::identifiers::{EntityType, FilterName};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tracing::{debug, warn};

/// Produces a descriptor for the current request. Invoked on every
/// resolution, never cached.
pub type FilterFactory = Arc<dyn Fn(&RequestContext) -> Result<FilterDescriptor> + Send + Sync>;

/// Anything the rewriter can ask for the filters of an entity type.
///
/// `Ok(None)` means no filter was ever registered for the type, which is
/// different from an empty list.
pub trait FilterSource {
    fn filters_for(&self, entity: &EntityType) -> Result<Option<Vec<FilterDescriptor>>>;
}

/// Static table of filter factories per entity type. Built once at
/// startup and read-only afterwards.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    factories: HashMap<EntityType, Vec<FilterFactory>>,
    disabled: HashSet<FilterName>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entity: EntityType, factory: FilterFactory) {
        self.factories.entry(entity).or_default().push(factory);
    }

    /// Descriptors named `name` are produced disabled.
    pub fn disable(&mut self, name: impl Into<FilterName>) {
        self.disabled.insert(name.into());
    }

    pub fn is_registered(&self, entity: &EntityType) -> bool {
        self.factories
            .get(entity)
            .is_some_and(|factories| !factories.is_empty())
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &EntityType> {
        self.factories.keys()
    }

    pub fn resolve(
        &self,
        entity: &EntityType,
        ctx: &RequestContext,
    ) -> Result<Option<Vec<FilterDescriptor>>> {
        let Some(factories) = self.factories.get(entity).filter(|f| !f.is_empty()) else {
            return Ok(None);
        };

        let mut filters = Vec::with_capacity(factories.len());
        for factory in factories {
            let descriptor = factory(ctx).inspect_err(|e| {
                warn!("Dynamic filter factory for {} failed: {}", entity, e);
            })?;

            if descriptor.entity() != entity {
                return Err(FilterError::Factory {
                    entity: entity.clone(),
                    message: format!("factory produced a filter for {}", descriptor.entity()),
                });
            }

            let disabled = descriptor
                .name()
                .is_some_and(|name| self.disabled.contains(name));
            filters.push(if disabled {
                descriptor.with_enabled(false)
            } else {
                descriptor
            });
        }

        debug!("Resolved {} dynamic filter(s) for {}", filters.len(), entity);
        Ok(Some(filters))
    }

    /// View of this registry bound to one request.
    pub fn scoped<'a>(&'a self, ctx: &'a RequestContext) -> ScopedFilters<'a> {
        ScopedFilters {
            registry: self,
            ctx,
        }
    }
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<_, _> = self
            .factories
            .iter()
            .map(|(entity, factories)| (entity.as_str(), factories.len()))
            .collect();
        f.debug_struct("FilterRegistry")
            .field("factories", &counts)
            .field("disabled", &self.disabled)
            .finish()
    }
}

pub struct ScopedFilters<'a> {
    registry: &'a FilterRegistry,
    ctx: &'a RequestContext,
}

impl FilterSource for ScopedFilters<'_> {
    fn filters_for(&self, entity: &EntityType) -> Result<Option<Vec<FilterDescriptor>>> {
        self.registry.resolve(entity, self.ctx)
    }
}

/// Fixed descriptors, handy when no request state is involved.
impl FilterSource for HashMap<EntityType, Vec<FilterDescriptor>> {
    fn filters_for(&self, entity: &EntityType) -> Result<Option<Vec<FilterDescriptor>>> {
        Ok(self.get(entity).cloned())
    }
}
