/*!
 * # Priority Ranking
 *
 * Converts a categorical state into a numeric rank according to an ordered
 * list of that state's reorderable members. The list is edited by the user
 * (drag and drop) and is always kept a permutation of the reorderable set.
 *
 * Members that are not reorderable fall into two groups:
 * - pinned pseudo-states, ranked a half step after a designated anchor so
 *   they follow it wherever the user moves it;
 * - everything else (legacy or unrecognised values), ranked at a fixed tail
 *   past every real rank.
 */

use std::fmt;
use std::hash::Hash;
use std::sync::OnceLock;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::ViewError;
use crate::models::states::{FabricationState, SaleState, ShippingState};

/// Sort key produced by a [`PriorityOrder`].
///
/// Stored in half steps so pinned pseudo-states keep a total order with the
/// real ranks: position `i` is `2 * i`, the half step after it is `2 * i + 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rank(u32);

impl Rank {
    /// Tail rank for values outside the ranked set.
    pub const UNKNOWN: Rank = Rank(u32::MAX);

    pub fn at(position: usize) -> Self {
        Rank(u32::try_from(position).map_or(u32::MAX - 1, |p| p.saturating_mul(2)))
    }

    /// Rank sitting strictly between this rank and the next real one.
    pub fn half_step_after(self) -> Self {
        if self.is_unknown() {
            self
        } else {
            Rank(self.0 + 1)
        }
    }

    pub fn is_unknown(self) -> bool {
        self == Self::UNKNOWN
    }

    /// Numeric rank (`0`, `0.5`, `1`, ...); the unknown tail is `+inf`.
    pub fn value(self) -> f64 {
        if self.is_unknown() {
            f64::INFINITY
        } else {
            f64::from(self.0) / 2.0
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            write!(f, "unknown")
        } else {
            write!(f, "{}", self.value())
        }
    }
}

/// A categorical state that can be ranked by a [`PriorityOrder`].
pub trait RankedState: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Reorderable members in their default order.
    fn reorderable() -> &'static [Self];

    /// Anchor a non-reorderable pseudo-state is ranked after, if any.
    fn pinned_after(&self) -> Option<Self> {
        None
    }
}

impl RankedState for FabricationState {
    fn reorderable() -> &'static [Self] {
        &[
            FabricationState::SinHacer,
            FabricationState::Haciendo,
            FabricationState::Retocar,
            FabricationState::Rehacer,
            FabricationState::Verificar,
            FabricationState::Hecho,
        ]
    }

    fn pinned_after(&self) -> Option<Self> {
        match self {
            FabricationState::Programado => Some(FabricationState::SinHacer),
            _ => None,
        }
    }
}

impl RankedState for SaleState {
    fn reorderable() -> &'static [Self] {
        &[
            SaleState::Senado,
            SaleState::FotoEnviada,
            SaleState::Transferido,
            SaleState::Deudor,
        ]
    }
}

impl RankedState for ShippingState {
    fn reorderable() -> &'static [Self] {
        &[
            ShippingState::SinEnvio,
            ShippingState::HacerEtiqueta,
            ShippingState::EtiquetaLista,
            ShippingState::Despachado,
            ShippingState::SeguimientoEnviado,
        ]
    }
}

/// User-ordered permutation of a state's reorderable members.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriorityOrder<S: RankedState> {
    members: Vec<S>,
}

impl<S: RankedState> PriorityOrder<S> {
    /// Builds an order from an arbitrary list, normalising it into a
    /// permutation: duplicates and non-reorderable values are dropped and
    /// missing members are appended in their default order.
    pub fn new(values: impl IntoIterator<Item = S>) -> Self {
        let reorderable = S::reorderable();
        let mut members: Vec<S> = Vec::with_capacity(reorderable.len());
        for value in values {
            if reorderable.contains(&value) && !members.contains(&value) {
                members.push(value);
            }
        }
        for value in reorderable {
            if !members.contains(value) {
                members.push(*value);
            }
        }
        Self { members }
    }

    pub fn members(&self) -> &[S] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Rank of `value`: its index for reorderable members, a half step after
    /// the anchor for pinned pseudo-states, [`Rank::UNKNOWN`] otherwise.
    pub fn rank(&self, value: S) -> Rank {
        if let Some(position) = self.position(value) {
            return Rank::at(position);
        }
        value
            .pinned_after()
            .and_then(|anchor| self.position(anchor))
            .map_or(Rank::UNKNOWN, |position| Rank::at(position).half_step_after())
    }

    fn position(&self, value: S) -> Option<usize> {
        self.members.iter().position(|member| *member == value)
    }

    /// Moves the member at `from` to index `to`, shifting the others.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), ViewError> {
        let len = self.members.len();
        if from >= len || to >= len {
            return Err(ViewError::InvalidReorder { from, to, len });
        }
        if from != to {
            let member = self.members.remove(from);
            self.members.insert(to, member);
        }
        Ok(())
    }

    /// Moves `value` to index `to`; a value that is not reorderable is rejected.
    pub fn move_member(&mut self, value: S, to: usize) -> Result<(), ViewError> {
        let from = self.position(value).ok_or_else(|| {
            ViewError::InvalidInput(format!("{:?} is not a reorderable member", value))
        })?;
        self.reorder(from, to)
    }

    /// Restores the default order.
    pub fn reset(&mut self) {
        self.members = S::reorderable().to_vec();
    }

    /// Whether the list holds every reorderable member exactly once.
    pub fn is_permutation(&self) -> bool {
        let reorderable = S::reorderable();
        self.members.len() == reorderable.len()
            && reorderable.iter().all(|member| {
                self.members
                    .iter()
                    .filter(|candidate| *candidate == member)
                    .count()
                    == 1
            })
    }
}

impl<S: RankedState> Default for PriorityOrder<S> {
    fn default() -> Self {
        Self {
            members: S::reorderable().to_vec(),
        }
    }
}

impl<S: RankedState + Serialize> Serialize for PriorityOrder<S> {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        self.members.serialize(serializer)
    }
}

impl<'de, S: RankedState + DeserializeOwned> Deserialize<'de> for PriorityOrder<S> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = Vec::<S>::deserialize(deserializer)?;
        Ok(Self::new(values))
    }
}

const CANONICAL_FABRICATION: [FabricationState; 6] = [
    FabricationState::SinHacer,
    FabricationState::Haciendo,
    FabricationState::Retocar,
    FabricationState::Rehacer,
    FabricationState::Verificar,
    FabricationState::Hecho,
];

/// Fixed "least complete first" order used to pick an order's dominant
/// fabrication state. Independent of any user-edited order.
///
/// SIN_HACER=0, PROGRAMADO=0.5, HACIENDO=1, RETOCAR=2, REHACER=3,
/// VERIFICAR=4, HECHO=5.
pub fn canonical_fabrication_order() -> &'static PriorityOrder<FabricationState> {
    static CANONICAL: OnceLock<PriorityOrder<FabricationState>> = OnceLock::new();
    CANONICAL.get_or_init(|| PriorityOrder::new(CANONICAL_FABRICATION))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn canonical_ranks_match_the_documented_table() {
        let canonical = canonical_fabrication_order();
        let expected = [
            (FabricationState::SinHacer, 0.0),
            (FabricationState::Programado, 0.5),
            (FabricationState::Haciendo, 1.0),
            (FabricationState::Retocar, 2.0),
            (FabricationState::Rehacer, 3.0),
            (FabricationState::Verificar, 4.0),
            (FabricationState::Hecho, 5.0),
        ];
        for (state, rank) in expected {
            assert_eq!(canonical.rank(state).value(), rank, "{:?}", state);
        }
    }

    #[test]
    fn pinned_state_follows_its_anchor() {
        let mut order = PriorityOrder::<FabricationState>::default();
        order.move_member(FabricationState::SinHacer, 3).unwrap();

        let anchor = order.rank(FabricationState::SinHacer);
        let pinned = order.rank(FabricationState::Programado);
        assert_eq!(anchor.value(), 3.0);
        assert_eq!(pinned.value(), 3.5);
        assert!(pinned > anchor);
        assert!(pinned < order.rank(order.members()[4]));
    }

    #[test]
    fn unknown_values_rank_past_every_real_rank() {
        let order = PriorityOrder::<FabricationState>::default();
        let unknown = order.rank(FabricationState::Unknown);
        assert!(unknown.is_unknown());
        assert!(order
            .members()
            .iter()
            .all(|member| order.rank(*member) < unknown));
        assert_eq!(unknown.to_string(), "unknown");
    }

    #[test]
    fn normalisation_repairs_partial_and_duplicated_lists() {
        let order = PriorityOrder::new([
            FabricationState::Hecho,
            FabricationState::Hecho,
            FabricationState::Programado,
            FabricationState::Unknown,
            FabricationState::Haciendo,
        ]);
        assert!(order.is_permutation());
        assert_eq!(
            order.members(),
            &[
                FabricationState::Hecho,
                FabricationState::Haciendo,
                FabricationState::SinHacer,
                FabricationState::Retocar,
                FabricationState::Rehacer,
                FabricationState::Verificar,
            ]
        );
    }

    #[test]
    fn reorder_is_a_pure_move() {
        let mut order = PriorityOrder::<ShippingState>::default();
        order.reorder(4, 0).unwrap();
        assert_eq!(order.members()[0], ShippingState::SeguimientoEnviado);
        assert_eq!(order.members()[1], ShippingState::SinEnvio);
        assert!(order.is_permutation());

        assert_matches!(
            order.reorder(0, 5),
            Err(ViewError::InvalidReorder { from: 0, to: 5, len: 5 })
        );
    }

    #[test]
    fn pinned_members_cannot_be_moved() {
        let mut order = PriorityOrder::<FabricationState>::default();
        assert_matches!(
            order.move_member(FabricationState::Programado, 0),
            Err(ViewError::InvalidInput(_))
        );
    }

    #[test]
    fn serde_uses_plain_lists_and_normalises_on_read() {
        let order = PriorityOrder::<SaleState>::default();
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(
            json,
            serde_json::json!(["SEÑADO", "FOTO_ENVIADA", "TRANSFERIDO", "DEUDOR"])
        );

        let back: PriorityOrder<SaleState> =
            serde_json::from_value(serde_json::json!(["DEUDOR", "BOGUS"])).unwrap();
        assert_eq!(back.members()[0], SaleState::Deudor);
        assert!(back.is_permutation());
    }
}
