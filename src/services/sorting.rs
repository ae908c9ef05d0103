use std::cmp::Ordering;

use tracing::debug;

use crate::models::states::{FabricationState, SaleState, ShippingState};
use crate::models::view::{SortConfig, SortDirection, SortField};
use crate::services::priority::{PriorityOrder, Rank, RankedState};
use crate::services::rollup::{OrderRow, ProductionRow};

/// Rankings available to row comparators.
pub struct SortContext<'a> {
    pub fabrication: &'a PriorityOrder<FabricationState>,
    pub sale: PriorityOrder<SaleState>,
    pub shipping: PriorityOrder<ShippingState>,
}

impl<'a> SortContext<'a> {
    pub fn new(fabrication: &'a PriorityOrder<FabricationState>) -> Self {
        Self {
            fabrication,
            sale: PriorityOrder::default(),
            shipping: PriorityOrder::default(),
        }
    }
}

/// Rows that can be compared column by column.
pub trait SortableRow {
    /// Ascending comparison on `field`. Fields a row type does not carry
    /// compare as equal.
    fn compare_by(&self, other: &Self, field: &SortField, ctx: &SortContext<'_>) -> Ordering;
}

/// Stable sort of `rows` by the effective criteria chain of `config`.
///
/// Each criterion is consulted only when every earlier one ties; rows equal
/// under every criterion keep their incoming relative order.
pub fn sort_rows<T: SortableRow>(mut rows: Vec<T>, config: &SortConfig) -> Vec<T> {
    let criteria = config.effective_criteria();
    let unknown: Vec<&str> = criteria
        .iter()
        .filter_map(|criterion| match &criterion.field {
            SortField::Unknown(raw) => Some(raw.as_str()),
            _ => None,
        })
        .collect();
    if !unknown.is_empty() {
        debug!(fields = ?unknown, "ignoring unknown sort fields");
    }

    let ctx = SortContext::new(&config.fabrication_priority);
    rows.sort_by(|a, b| {
        criteria
            .iter()
            .map(|criterion| {
                let ordering = a.compare_by(b, &criterion.field, &ctx);
                match criterion.dir {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    rows
}

fn best_rank<S: RankedState>(order: &PriorityOrder<S>, values: &[S]) -> Rank {
    values
        .iter()
        .map(|value| order.rank(*value))
        .min()
        .unwrap_or(Rank::UNKNOWN)
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

impl SortableRow for OrderRow {
    fn compare_by(&self, other: &Self, field: &SortField, ctx: &SortContext<'_>) -> Ordering {
        let (a, b) = (&self.summary, &other.summary);
        match field {
            SortField::OrderDate => self.order.order_date.cmp(&other.order.order_date),
            SortField::Customer => compare_text(&self.order.customer.name, &other.order.customer.name),
            SortField::Fabrication => ctx
                .fabrication
                .rank(a.dominant_state)
                .cmp(&ctx.fabrication.rank(b.dominant_state)),
            SortField::Sale => best_rank(&ctx.sale, &a.sale_states).cmp(&best_rank(&ctx.sale, &b.sale_states)),
            SortField::Shipping => best_rank(&ctx.shipping, &a.shipping_states)
                .cmp(&best_rank(&ctx.shipping, &b.shipping_states)),
            SortField::Priority => a.has_priority_item.cmp(&b.has_priority_item),
            SortField::TotalValue => a.total_value.cmp(&b.total_value),
            SortField::Deposit => a.deposit_value_order.cmp(&b.deposit_value_order),
            SortField::RestPaid => a.rest_paid_amount_order.cmp(&b.rest_paid_amount_order),
            SortField::ItemCount => a.item_count.cmp(&b.item_count),
            SortField::DesignName
            | SortField::AspireState
            | SortField::Program
            | SortField::StampType
            | SortField::Unknown(_) => Ordering::Equal,
        }
    }
}

impl SortableRow for ProductionRow {
    fn compare_by(&self, other: &Self, field: &SortField, ctx: &SortContext<'_>) -> Ordering {
        let (a, b) = (&self.item, &other.item);
        match field {
            SortField::OrderDate => a.created_on.cmp(&b.created_on),
            SortField::Customer => compare_text(&a.customer_name, &b.customer_name),
            SortField::DesignName => compare_text(&a.design_name, &b.design_name),
            SortField::Fabrication => ctx
                .fabrication
                .rank(self.fabrication_state)
                .cmp(&ctx.fabrication.rank(other.fabrication_state)),
            SortField::AspireState => a.aspire_state.cmp(&b.aspire_state),
            SortField::Program => a.program_name.cmp(&b.program_name),
            SortField::Priority => a.is_priority.cmp(&b.is_priority),
            SortField::StampType => a.stamp_type.cmp(&b.stamp_type),
            SortField::Sale
            | SortField::Shipping
            | SortField::TotalValue
            | SortField::Deposit
            | SortField::RestPaid
            | SortField::ItemCount
            | SortField::Unknown(_) => Ordering::Equal,
        }
    }
}
