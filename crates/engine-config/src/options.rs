use crate::{
    error::{ConfigError, Result},
    settings::DynamicFilterSettings,
};
use engine_core::{
    context::request::RequestContext,
    error::Result as FilterResult,
    filter::{
        DEFAULT_ORDER, DynamicQueryFilter, FilterDescriptor, FilterFactory, FilterPlace,
        FilterRegistry, FromRequest,
    },
};
use model::{
    core::identifiers::{Entity, EntityType, FilterName},
    query::Lambda,
};
use std::{marker::PhantomData, sync::Arc};
use tracing::debug;

type PredicateFactory = Arc<dyn Fn(&RequestContext) -> FilterResult<Lambda> + Send + Sync>;

enum PredicateSource {
    Fixed(Lambda),
    Factory(PredicateFactory),
}

/// Declaration of one predicate filter: the predicate (or a factory for it)
/// plus optional name, order and placement.
pub struct FilterSpec {
    name: Option<FilterName>,
    order: i32,
    place: FilterPlace,
    source: PredicateSource,
}

impl FilterSpec {
    pub fn new(predicate: Lambda) -> Self {
        Self::from_source(PredicateSource::Fixed(predicate))
    }

    /// The predicate is rebuilt from the request context on every query.
    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn(&RequestContext) -> FilterResult<Lambda> + Send + Sync + 'static,
    {
        Self::from_source(PredicateSource::Factory(Arc::new(factory)))
    }

    fn from_source(source: PredicateSource) -> Self {
        Self {
            name: None,
            order: DEFAULT_ORDER,
            place: FilterPlace::Default,
            source,
        }
    }

    pub fn named(mut self, name: impl Into<FilterName>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn place(mut self, place: FilterPlace) -> Self {
        self.place = place;
        self
    }
}

/// Startup-time filter configuration. [`build`](Self::build) freezes it
/// into a [`FilterRegistry`].
#[derive(Default)]
pub struct FilterOptions {
    registry: FilterRegistry,
    errors: Vec<ConfigError>,
}

impl FilterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity<T, F>(&mut self, build: F) -> &mut Self
    where
        T: Entity,
        F: FnOnce(&mut EntityFilterBuilder<'_, T>),
    {
        let mut builder = EntityFilterBuilder {
            options: self,
            _entity: PhantomData,
        };
        build(&mut builder);
        self
    }

    pub fn with_settings(&mut self, settings: &DynamicFilterSettings) -> &mut Self {
        for name in &settings.disabled_filters {
            self.registry.disable(name.as_str());
        }
        self
    }

    /// Fails with the first invalid declaration, if any.
    pub fn build(self) -> Result<FilterRegistry> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.registry),
        }
    }
}

/// Declares the filters of one entity type.
pub struct EntityFilterBuilder<'a, T> {
    options: &'a mut FilterOptions,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> EntityFilterBuilder<'_, T> {
    pub fn add_filter(&mut self, spec: FilterSpec) -> &mut Self {
        let FilterSpec {
            name,
            order,
            place,
            source,
        } = spec;

        match source {
            PredicateSource::Fixed(predicate) => {
                let descriptor = FilterDescriptor::for_entity::<T>(predicate).map(|descriptor| {
                    descriptor
                        .with_name(name)
                        .with_order(order)
                        .with_place(place)
                });
                self.add_descriptor(descriptor)
            }
            PredicateSource::Factory(factory) => self.add_factory(move |ctx| {
                Ok(FilterDescriptor::for_entity::<T>(factory(ctx)?)?
                    .with_name(name.clone())
                    .with_order(order)
                    .with_place(place))
            }),
        }
    }

    pub fn add_head_filter(&mut self, spec: FilterSpec) -> &mut Self {
        self.add_filter(spec.place(FilterPlace::Head))
    }

    pub fn add_tail_filter(&mut self, spec: FilterSpec) -> &mut Self {
        self.add_filter(spec.place(FilterPlace::Tail))
    }

    /// Register a ready-made filter value, shared by every request.
    pub fn add_filter_instance<F>(&mut self, filter: F) -> &mut Self
    where
        F: DynamicQueryFilter<Entity = T>,
    {
        self.add_descriptor(filter.descriptor())
    }

    /// Register a filter type built from the request context per query.
    pub fn add_typed_filter<F>(&mut self) -> &mut Self
    where
        F: DynamicQueryFilter<Entity = T> + FromRequest,
    {
        self.add_factory(|ctx| F::from_request(ctx)?.descriptor())
    }

    /// Register a raw descriptor factory.
    pub fn add_factory<F>(&mut self, factory: F) -> &mut Self
    where
        F: Fn(&RequestContext) -> FilterResult<FilterDescriptor> + Send + Sync + 'static,
    {
        let factory: FilterFactory = Arc::new(factory);
        self.options.registry.register(EntityType::of::<T>(), factory);
        debug!("Registered dynamic filter factory for {}", T::NAME);
        self
    }

    fn add_descriptor(&mut self, descriptor: FilterResult<FilterDescriptor>) -> &mut Self {
        match descriptor {
            Ok(descriptor) => self.add_factory(move |_| Ok(descriptor.clone())),
            Err(source) => {
                self.options.errors.push(ConfigError::InvalidFilter {
                    entity: EntityType::of::<T>(),
                    source,
                });
                self
            }
        }
    }
}
