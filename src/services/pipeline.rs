use serde::Serialize;
use tracing::trace;

use crate::models::order::Order;
use crate::models::production::ProductionItem;
use crate::models::view::{FilterConfig, ProductionFilterConfig, ViewConfig};
use crate::services::filtering::apply_filters;
use crate::services::rollup::{OrderRow, ProductionRow};
use crate::services::sorting::sort_rows;

/// Rows ready for display plus the counts behind an "N of M" badge.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedView<R> {
    pub rows: Vec<R>,
    pub total_records: usize,
    pub visible_records: usize,
}

impl<R> DerivedView<R> {
    pub fn is_filtered(&self) -> bool {
        self.visible_records < self.total_records
    }
}

/// Filter, aggregate and sort orders for the order table.
pub fn derive_order_rows(orders: &[Order], config: &ViewConfig<FilterConfig>) -> Vec<OrderRow> {
    let kept = apply_filters(orders, &config.filters, &config.search_query);
    let rows = kept.into_iter().map(OrderRow::new).collect();
    sort_rows(rows, &config.sort)
}

/// Filter and sort production items, ranking them in the fabrication space.
pub fn derive_production_rows(
    items: &[ProductionItem],
    config: &ViewConfig<ProductionFilterConfig>,
) -> Vec<ProductionRow> {
    let kept = apply_filters(items, &config.filters, &config.search_query);
    let rows = kept.into_iter().map(ProductionRow::new).collect();
    sort_rows(rows, &config.sort)
}

pub fn derive_order_view(orders: &[Order], config: &ViewConfig<FilterConfig>) -> DerivedView<OrderRow> {
    let rows = derive_order_rows(orders, config);
    trace!(total = orders.len(), visible = rows.len(), "order view derived");
    DerivedView {
        total_records: orders.len(),
        visible_records: rows.len(),
        rows,
    }
}

pub fn derive_production_view(
    items: &[ProductionItem],
    config: &ViewConfig<ProductionFilterConfig>,
) -> DerivedView<ProductionRow> {
    let rows = derive_production_rows(items, config);
    trace!(total = items.len(), visible = rows.len(), "production view derived");
    DerivedView {
        total_records: items.len(),
        visible_records: rows.len(),
        rows,
    }
}
