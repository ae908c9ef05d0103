//! View configuration shapes: search, filters and sort settings per table view.
//!
//! Persisted configurations are parsed field by field. A field that is
//! missing or malformed falls back to its default without discarding the
//! rest of the document; the names of the fields that fell back are
//! reported so the store can log them.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::states::{FabricationState, ProductionState, SaleState, ShippingState, StampType};
use crate::errors::ViewError;
use crate::services::priority::PriorityOrder;

/// Named table views, each with its own persisted configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewName {
    Pedidos,
    Produccion,
}

impl ViewName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewName::Pedidos => "pedidos",
            ViewName::Produccion => "produccion",
        }
    }
}

impl fmt::Display for ViewName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive date range on the date component; an unset bound is open.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    fn from_persisted(value: Option<&Value>, fallbacks: &mut Vec<String>) -> Self {
        let Some(value) = value else {
            return Self::default();
        };
        let Some(object) = value.as_object() else {
            if !value.is_null() {
                fallbacks.push("filters.dateRange".to_string());
            }
            return Self::default();
        };
        Self {
            from: read_field(object, "from", "filters.dateRange.from", fallbacks),
            to: read_field(object, "to", "filters.dateRange.to", fallbacks),
        }
    }
}

/// Reads `key` from `object`, falling back to `T::default()` when it is
/// missing or does not deserialize.
pub(crate) fn read_field<T: DeserializeOwned + Default>(
    object: &Map<String, Value>,
    key: &str,
    path: &str,
    fallbacks: &mut Vec<String>,
) -> T {
    match object.get(key) {
        None | Some(Value::Null) => T::default(),
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|_| {
            fallbacks.push(path.to_string());
            T::default()
        }),
    }
}

/// Reads a set of states, dropping values that are not recognised.
fn read_state_set<T>(
    object: &Map<String, Value>,
    key: &str,
    path: &str,
    fallbacks: &mut Vec<String>,
    is_unknown: fn(&T) -> bool,
) -> BTreeSet<T>
where
    T: DeserializeOwned + Ord,
{
    let mut set: BTreeSet<T> = read_field(object, key, path, fallbacks);
    set.retain(|value| !is_unknown(value));
    set
}

/// Reads a set of free-text labels, trimming and dropping blanks.
fn read_label_set(
    object: &Map<String, Value>,
    key: &str,
    path: &str,
    fallbacks: &mut Vec<String>,
) -> BTreeSet<String> {
    let raw: BTreeSet<String> = read_field(object, key, path, fallbacks);
    raw.into_iter()
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty())
        .collect()
}

fn toggle_in<T: Ord>(set: &mut BTreeSet<T>, value: T) -> bool {
    if set.remove(&value) {
        false
    } else {
        set.insert(value);
        true
    }
}

/// Filter section of a view configuration, as stored and as evaluated.
pub trait ViewFilters:
    Clone + Default + fmt::Debug + PartialEq + Serialize + Send + Sync + 'static
{
    /// Parses a persisted `filters` object field by field.
    fn from_persisted(value: &Value, fallbacks: &mut Vec<String>) -> Self;

    /// Whether any predicate constrains the record set.
    fn is_active(&self) -> bool;

    /// Number of constrained dimensions, for "N filters active" badges.
    fn active_dimension_count(&self) -> usize;
}

/// Filters for the order view.
///
/// Empty sets leave their dimension unconstrained.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    #[serde(default)]
    pub date_range: DateRange,
    #[serde(default)]
    pub fabrication: BTreeSet<FabricationState>,
    #[serde(default)]
    pub sale: BTreeSet<SaleState>,
    #[serde(default)]
    pub shipping: BTreeSet<ShippingState>,
    #[serde(default)]
    pub stamp_type: BTreeSet<StampType>,
    #[serde(default)]
    pub channel: BTreeSet<String>,
    #[serde(default)]
    pub uploader: BTreeSet<String>,
    /// Keep only orders holding at least one priority item.
    #[serde(default)]
    pub priority_only: bool,
}

impl FilterConfig {
    /// Adds the state when absent, removes it when present. Returns whether
    /// it is now accepted.
    pub fn toggle_fabrication(&mut self, state: FabricationState) -> bool {
        toggle_in(&mut self.fabrication, state)
    }

    pub fn toggle_sale(&mut self, state: SaleState) -> bool {
        toggle_in(&mut self.sale, state)
    }

    pub fn toggle_shipping(&mut self, state: ShippingState) -> bool {
        toggle_in(&mut self.shipping, state)
    }

    pub fn toggle_stamp_type(&mut self, stamp_type: StampType) -> bool {
        toggle_in(&mut self.stamp_type, stamp_type)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl ViewFilters for FilterConfig {
    fn from_persisted(value: &Value, fallbacks: &mut Vec<String>) -> Self {
        let Some(object) = value.as_object() else {
            fallbacks.push("filters".to_string());
            return Self::default();
        };
        Self {
            date_range: DateRange::from_persisted(object.get("dateRange"), fallbacks),
            fabrication: read_state_set(
                object,
                "fabrication",
                "filters.fabrication",
                fallbacks,
                FabricationState::is_unknown,
            ),
            sale: read_state_set(object, "sale", "filters.sale", fallbacks, SaleState::is_unknown),
            shipping: read_state_set(
                object,
                "shipping",
                "filters.shipping",
                fallbacks,
                ShippingState::is_unknown,
            ),
            stamp_type: read_state_set(
                object,
                "stampType",
                "filters.stampType",
                fallbacks,
                StampType::is_unknown,
            ),
            channel: read_label_set(object, "channel", "filters.channel", fallbacks),
            uploader: read_label_set(object, "uploader", "filters.uploader", fallbacks),
            priority_only: read_field(object, "priorityOnly", "filters.priorityOnly", fallbacks),
        }
    }

    fn is_active(&self) -> bool {
        self.active_dimension_count() > 0
    }

    fn active_dimension_count(&self) -> usize {
        [
            !self.date_range.is_unbounded(),
            !self.fabrication.is_empty(),
            !self.sale.is_empty(),
            !self.shipping.is_empty(),
            !self.stamp_type.is_empty(),
            !self.channel.is_empty(),
            !self.uploader.is_empty(),
            self.priority_only,
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }
}

/// Aspire label matching production items with no machine assigned.
pub const UNASSIGNED_ASPIRE: &str = "SIN_ASIGNAR";

/// Filters for the production view.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionFilterConfig {
    #[serde(default)]
    pub date_range: DateRange,
    #[serde(default)]
    pub production: BTreeSet<ProductionState>,
    /// Accepted aspire labels; [`UNASSIGNED_ASPIRE`] matches a missing label.
    #[serde(default)]
    pub aspire: BTreeSet<String>,
    #[serde(default)]
    pub stamp_type: BTreeSet<StampType>,
    #[serde(default)]
    pub priority_only: bool,
    #[serde(default)]
    pub vectorized: Option<bool>,
}

impl ProductionFilterConfig {
    pub fn toggle_production(&mut self, state: ProductionState) -> bool {
        toggle_in(&mut self.production, state)
    }

    pub fn toggle_aspire(&mut self, label: impl Into<String>) -> bool {
        toggle_in(&mut self.aspire, label.into())
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl ViewFilters for ProductionFilterConfig {
    fn from_persisted(value: &Value, fallbacks: &mut Vec<String>) -> Self {
        let Some(object) = value.as_object() else {
            fallbacks.push("filters".to_string());
            return Self::default();
        };
        Self {
            date_range: DateRange::from_persisted(object.get("dateRange"), fallbacks),
            production: read_state_set(
                object,
                "production",
                "filters.production",
                fallbacks,
                ProductionState::is_unknown,
            ),
            aspire: read_label_set(object, "aspire", "filters.aspire", fallbacks),
            stamp_type: read_state_set(
                object,
                "stampType",
                "filters.stampType",
                fallbacks,
                StampType::is_unknown,
            ),
            priority_only: read_field(object, "priorityOnly", "filters.priorityOnly", fallbacks),
            vectorized: read_field(object, "vectorized", "filters.vectorized", fallbacks),
        }
    }

    fn is_active(&self) -> bool {
        self.active_dimension_count() > 0
    }

    fn active_dimension_count(&self) -> usize {
        [
            !self.date_range.is_unbounded(),
            !self.production.is_empty(),
            !self.aspire.is_empty(),
            !self.stamp_type.is_empty(),
            self.priority_only,
            self.vectorized.is_some(),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Sortable column. Names that are not recognised are kept verbatim so they
/// survive a save, and compare every pair of rows as equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SortField {
    OrderDate,
    Customer,
    Fabrication,
    Sale,
    Shipping,
    Priority,
    TotalValue,
    Deposit,
    RestPaid,
    ItemCount,
    DesignName,
    AspireState,
    Program,
    StampType,
    Unknown(String),
}

impl SortField {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "fecha" => SortField::OrderDate,
            "cliente" => SortField::Customer,
            "fabricacion" | "fabricación" => SortField::Fabrication,
            "venta" => SortField::Sale,
            "envio" | "envío" => SortField::Shipping,
            "prioridad" => SortField::Priority,
            "total" => SortField::TotalValue,
            "sena" | "seña" => SortField::Deposit,
            "resta" => SortField::RestPaid,
            "items" => SortField::ItemCount,
            "diseno" | "diseño" => SortField::DesignName,
            "aspire" => SortField::AspireState,
            "programa" => SortField::Program,
            "tipo" => SortField::StampType,
            _ => SortField::Unknown(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SortField::OrderDate => "fecha",
            SortField::Customer => "cliente",
            SortField::Fabrication => "fabricacion",
            SortField::Sale => "venta",
            SortField::Shipping => "envio",
            SortField::Priority => "prioridad",
            SortField::TotalValue => "total",
            SortField::Deposit => "sena",
            SortField::RestPaid => "resta",
            SortField::ItemCount => "items",
            SortField::DesignName => "diseno",
            SortField::AspireState => "aspire",
            SortField::Program => "programa",
            SortField::StampType => "tipo",
            SortField::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SortField {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SortField {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(SortField::parse(&raw))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortCriterion {
    pub field: SortField,
    #[serde(default)]
    pub dir: SortDirection,
}

impl SortCriterion {
    pub fn asc(field: SortField) -> Self {
        Self {
            field,
            dir: SortDirection::Asc,
        }
    }

    pub fn desc(field: SortField) -> Self {
        Self {
            field,
            dir: SortDirection::Desc,
        }
    }
}

/// Sort settings of a view: the user's fabrication priority ranking plus an
/// ordered chain of criteria.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortConfig {
    #[serde(default)]
    pub fabrication_priority: PriorityOrder<FabricationState>,
    #[serde(default)]
    pub criteria: Vec<SortCriterion>,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            fabrication_priority: PriorityOrder::default(),
            criteria: vec![SortCriterion::desc(SortField::OrderDate)],
        }
    }
}

impl SortConfig {
    /// The chain actually applied: the configured criteria when they already
    /// position the fabrication ranking, otherwise the ranking (ascending)
    /// followed by the configured criteria.
    pub fn effective_criteria(&self) -> Vec<SortCriterion> {
        if self
            .criteria
            .iter()
            .any(|criterion| criterion.field == SortField::Fabrication)
        {
            return self.criteria.clone();
        }
        let mut chain = Vec::with_capacity(self.criteria.len() + 1);
        chain.push(SortCriterion::asc(SortField::Fabrication));
        chain.extend(self.criteria.iter().cloned());
        chain
    }

    /// Appends a criterion; an existing criterion on the same field is
    /// replaced in place instead of duplicated.
    pub fn push_criterion(&mut self, criterion: SortCriterion) {
        if let Some(existing) = self
            .criteria
            .iter_mut()
            .find(|existing| existing.field == criterion.field)
        {
            existing.dir = criterion.dir;
        } else {
            self.criteria.push(criterion);
        }
    }

    pub fn remove_criterion(&mut self, index: usize) -> Result<SortCriterion, ViewError> {
        if index >= self.criteria.len() {
            return Err(ViewError::InvalidInput(format!(
                "no sort criterion at index {} (have {})",
                index,
                self.criteria.len()
            )));
        }
        Ok(self.criteria.remove(index))
    }

    pub fn toggle_direction(&mut self, index: usize) -> Result<SortDirection, ViewError> {
        let criterion = self.criteria.get_mut(index).ok_or_else(|| {
            ViewError::InvalidInput(format!("no sort criterion at index {}", index))
        })?;
        criterion.dir = criterion.dir.toggled();
        Ok(criterion.dir)
    }

    pub fn move_criterion(&mut self, from: usize, to: usize) -> Result<(), ViewError> {
        let len = self.criteria.len();
        if from >= len || to >= len {
            return Err(ViewError::InvalidReorder { from, to, len });
        }
        let criterion = self.criteria.remove(from);
        self.criteria.insert(to, criterion);
        Ok(())
    }

    /// Parses a persisted `sort` object field by field. Criteria entries are
    /// read one at a time; an entry without a string `field` is dropped and
    /// an unreadable `dir` defaults to ascending.
    pub fn from_persisted(value: &Value, fallbacks: &mut Vec<String>) -> Self {
        let Some(object) = value.as_object() else {
            fallbacks.push("sort".to_string());
            return Self::default();
        };

        let fabrication_priority = match object.get("fabricationPriority") {
            None | Some(Value::Null) => PriorityOrder::default(),
            Some(raw) => match serde_json::from_value::<Vec<Value>>(raw.clone()) {
                Ok(entries) => PriorityOrder::new(
                    entries
                        .iter()
                        .filter_map(Value::as_str)
                        .map(FabricationState::parse_lenient),
                ),
                Err(_) => {
                    fallbacks.push("sort.fabricationPriority".to_string());
                    PriorityOrder::default()
                }
            },
        };

        let criteria = match object.get("criteria") {
            None | Some(Value::Null) => Self::default().criteria,
            Some(Value::Array(entries)) => entries
                .iter()
                .filter_map(|entry| {
                    let field = entry.get("field")?.as_str()?;
                    let dir = entry
                        .get("dir")
                        .and_then(|dir| serde_json::from_value(dir.clone()).ok())
                        .unwrap_or_default();
                    Some(SortCriterion {
                        field: SortField::parse(field),
                        dir,
                    })
                })
                .collect(),
            Some(_) => {
                fallbacks.push("sort.criteria".to_string());
                Self::default().criteria
            }
        };

        Self {
            fabrication_priority,
            criteria,
        }
    }
}

/// Live configuration of one view.
///
/// Only `filters` and `sort` are persisted; the search query is per session
/// and `loaded` tracks whether persisted state has been reconciled.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewConfig<F> {
    pub search_query: String,
    pub filters: F,
    pub sort: SortConfig,
    pub loaded: bool,
}

impl<F: ViewFilters> Default for ViewConfig<F> {
    fn default() -> Self {
        Self {
            search_query: String::new(),
            filters: F::default(),
            sort: SortConfig::default(),
            loaded: false,
        }
    }
}

impl<F: ViewFilters> ViewConfig<F> {
    /// Persisted form: `{ "filters": {...}, "sort": {...} }`.
    pub fn to_persisted(&self) -> Result<Value, ViewError> {
        Ok(json!({
            "filters": serde_json::to_value(&self.filters)?,
            "sort": serde_json::to_value(&self.sort)?,
        }))
    }

    /// Overwrites filters and sort from a persisted document. Returns the
    /// paths of fields that fell back to defaults.
    pub fn apply_persisted(&mut self, value: &Value) -> Vec<String> {
        let mut fallbacks = Vec::new();
        let Some(object) = value.as_object() else {
            fallbacks.push("$".to_string());
            self.filters = F::default();
            self.sort = SortConfig::default();
            return fallbacks;
        };
        self.filters = match object.get("filters") {
            None | Some(Value::Null) => F::default(),
            Some(filters) => F::from_persisted(filters, &mut fallbacks),
        };
        self.sort = match object.get("sort") {
            None | Some(Value::Null) => SortConfig::default(),
            Some(sort) => SortConfig::from_persisted(sort, &mut fallbacks),
        };
        fallbacks
    }

    /// Parses a standalone persisted document into a fresh configuration.
    pub fn from_persisted(value: &Value) -> (Self, Vec<String>) {
        let mut config = Self::default();
        let fallbacks = config.apply_persisted(value);
        (config, fallbacks)
    }
}
