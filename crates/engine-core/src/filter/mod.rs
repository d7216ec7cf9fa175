pub mod descriptor;
pub mod registry;

pub use descriptor::{
    DEFAULT_ORDER, DynamicQueryFilter, ExpressionFilter, FilterDescriptor, FilterPlace, FromRequest,
};
pub use registry::{FilterFactory, FilterRegistry, FilterSource, ScopedFilters};
