use std::collections::BTreeSet;

use crate::models::order::{Order, OrderItem};
use crate::models::production::ProductionItem;
use crate::models::view::{FilterConfig, ProductionFilterConfig, UNASSIGNED_ASPIRE};

/// Records that expose free-text searchable fields.
pub trait Searchable {
    /// Text fields matched by the search box.
    fn search_fields(&self) -> Vec<&str>;

    /// Case-insensitive substring match of `query` against the search
    /// fields. A blank query matches everything.
    fn matches_search(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.search_fields()
            .into_iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// A predicate set evaluated against one record.
pub trait RecordFilter<R> {
    fn matches(&self, record: &R) -> bool;
}

/// Keeps the records that pass `filter` and the search query, preserving
/// their relative order.
pub fn apply_filters<R, F>(records: &[R], filter: &F, search_query: &str) -> Vec<R>
where
    R: Clone + Searchable,
    F: RecordFilter<R>,
{
    records
        .iter()
        .filter(|record| filter.matches(record) && record.matches_search(search_query))
        .cloned()
        .collect()
}

fn accepts<T: Ord>(set: &BTreeSet<T>, value: &T) -> bool {
    set.contains(value)
}

fn accepts_label(set: &BTreeSet<String>, value: &str) -> bool {
    let value = value.trim();
    set.iter().any(|accepted| accepted.to_lowercase() == value.to_lowercase())
}

/// An empty set leaves the dimension unconstrained; otherwise at least one
/// item must satisfy `item_matches`.
fn any_item<T>(set: &BTreeSet<T>, items: &[OrderItem], item_matches: impl Fn(&OrderItem) -> bool) -> bool {
    set.is_empty() || items.iter().any(item_matches)
}

impl Searchable for Order {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = Vec::with_capacity(self.items.len() + 2);
        fields.push(self.customer.name.as_str());
        if let Some(phone) = self.customer.phone.as_deref() {
            fields.push(phone);
        }
        fields.extend(self.items.iter().map(|item| item.design_name.as_str()));
        fields
    }
}

impl RecordFilter<Order> for FilterConfig {
    fn matches(&self, order: &Order) -> bool {
        let items = order.items.as_slice();

        self.date_range.contains(order.order_date)
            && any_item(&self.fabrication, items, |item| {
                !item.fabrication_state.is_unknown() && accepts(&self.fabrication, &item.fabrication_state)
            })
            && any_item(&self.sale, items, |item| {
                !item.sale_state.is_unknown() && accepts(&self.sale, &item.sale_state)
            })
            && any_item(&self.shipping, items, |item| {
                !item.shipping_state.is_unknown() && accepts(&self.shipping, &item.shipping_state)
            })
            && any_item(&self.stamp_type, items, |item| {
                !item.stamp_type.is_unknown() && accepts(&self.stamp_type, &item.stamp_type)
            })
            && any_item(&self.channel, items, |item| {
                item.contact_channel
                    .as_deref()
                    .is_some_and(|channel| accepts_label(&self.channel, channel))
            })
            && any_item(&self.uploader, items, |item| {
                item.uploaders()
                    .any(|uploader| accepts_label(&self.uploader, uploader))
            })
            && (!self.priority_only || items.iter().any(|item| item.is_priority))
    }
}

impl Searchable for ProductionItem {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.design_name.as_str(), self.customer_name.as_str()];
        if let Some(program) = self.program_name.as_deref() {
            fields.push(program);
        }
        fields
    }
}

impl RecordFilter<ProductionItem> for ProductionFilterConfig {
    fn matches(&self, item: &ProductionItem) -> bool {
        let aspire_matches = self.aspire.is_empty()
            || match item.aspire_state.as_deref() {
                Some(label) if !label.trim().is_empty() => accepts_label(&self.aspire, label),
                _ => self.aspire.contains(UNASSIGNED_ASPIRE),
            };

        self.date_range.contains(item.created_on)
            && (self.production.is_empty()
                || (!item.production_state.is_unknown()
                    && accepts(&self.production, &item.production_state)))
            && aspire_matches
            && (self.stamp_type.is_empty()
                || (!item.stamp_type.is_unknown() && accepts(&self.stamp_type, &item.stamp_type)))
            && (!self.priority_only || item.is_priority)
            && self.vectorized.map_or(true, |wanted| item.is_vectorized == wanted)
    }
}
