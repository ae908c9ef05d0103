// Record and view configuration models
pub mod order;
pub mod production;
pub mod states;
pub mod view;

pub use order::{Attachment, Customer, Order, OrderItem, Shipping};
pub use production::ProductionItem;
pub use states::{FabricationState, ProductionState, SaleState, ShippingState, StampType};
pub use view::{
    DateRange, FilterConfig, ProductionFilterConfig, SortConfig, SortCriterion, SortDirection,
    SortField, ViewConfig, ViewFilters, ViewName,
};
