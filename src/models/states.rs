//! Enumerated states carried by order items and production items.
//!
//! Wire names are the upper-case literals used by the record source and by
//! persisted view configurations. Anything the record source sends that is
//! not recognised deserializes to the `Unknown` variant instead of failing.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

macro_rules! lenient_state_serde {
    ($ty:ident) => {
        impl $ty {
            /// Wire name of the state.
            pub fn as_str(&self) -> &'static str {
                self.into()
            }

            /// Parses a wire name, mapping unrecognised input to `Unknown`.
            pub fn parse_lenient(raw: &str) -> Self {
                raw.trim().to_uppercase().parse().unwrap_or($ty::Unknown)
            }

            pub fn is_unknown(&self) -> bool {
                matches!(self, $ty::Unknown)
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Ok($ty::parse_lenient(&raw))
            }
        }
    };
}

/// Stamp construction type.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
pub enum StampType {
    #[strum(serialize = "3MM")]
    ThreeMm,
    #[strum(serialize = "ALIMENTO")]
    Alimento,
    #[strum(serialize = "CLASICO")]
    Clasico,
    #[strum(serialize = "ABC")]
    Abc,
    #[strum(serialize = "LACRE")]
    Lacre,
    #[strum(serialize = "UNKNOWN")]
    Unknown,
}

lenient_state_serde!(StampType);

/// Production stage of an order item.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
pub enum FabricationState {
    #[default]
    #[strum(serialize = "SIN_HACER")]
    SinHacer,
    #[strum(serialize = "HACIENDO")]
    Haciendo,
    #[strum(serialize = "VERIFICAR")]
    Verificar,
    #[strum(serialize = "HECHO")]
    Hecho,
    #[strum(serialize = "REHACER")]
    Rehacer,
    #[strum(serialize = "RETOCAR")]
    Retocar,
    /// Scheduling pseudo-state; never user-reorderable.
    #[strum(serialize = "PROGRAMADO")]
    Programado,
    #[strum(serialize = "UNKNOWN")]
    Unknown,
}

lenient_state_serde!(FabricationState);

impl FabricationState {
    /// Production-side label written back when a fabrication state is
    /// assigned from the order view.
    ///
    /// This direction is lossy: `Verificar` and `Retocar` both land on
    /// `Revisar`, and `SinHacer` and `Programado` both land on `Pendiente`.
    /// `ProductionState::to_fabrication` followed by this function is the
    /// identity for every production state.
    pub fn to_production(self) -> ProductionState {
        match self {
            FabricationState::SinHacer | FabricationState::Programado => ProductionState::Pendiente,
            FabricationState::Haciendo => ProductionState::EnProgreso,
            FabricationState::Verificar | FabricationState::Retocar => ProductionState::Revisar,
            FabricationState::Rehacer => ProductionState::Rehacer,
            FabricationState::Hecho => ProductionState::Completado,
            FabricationState::Unknown => ProductionState::Unknown,
        }
    }
}

/// Payment state of an order item.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
pub enum SaleState {
    #[strum(serialize = "SEÑADO")]
    Senado,
    #[strum(serialize = "FOTO_ENVIADA")]
    FotoEnviada,
    #[strum(serialize = "TRANSFERIDO")]
    Transferido,
    #[strum(serialize = "DEUDOR")]
    Deudor,
    #[strum(serialize = "UNKNOWN")]
    Unknown,
}

lenient_state_serde!(SaleState);

/// Dispatch state of an order item.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
pub enum ShippingState {
    #[strum(serialize = "SIN_ENVIO")]
    SinEnvio,
    #[strum(serialize = "HACER_ETIQUETA")]
    HacerEtiqueta,
    #[strum(serialize = "ETIQUETA_LISTA")]
    EtiquetaLista,
    #[strum(serialize = "DESPACHADO")]
    Despachado,
    #[strum(serialize = "SEGUIMIENTO_ENVIADO")]
    SeguimientoEnviado,
    #[strum(serialize = "UNKNOWN")]
    Unknown,
}

lenient_state_serde!(ShippingState);

/// State of an item on the production floor.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
pub enum ProductionState {
    #[default]
    #[strum(serialize = "PENDIENTE")]
    Pendiente,
    #[strum(serialize = "EN_PROGRESO")]
    EnProgreso,
    #[strum(serialize = "COMPLETADO")]
    Completado,
    #[strum(serialize = "REVISAR")]
    Revisar,
    #[strum(serialize = "REHACER")]
    Rehacer,
    #[strum(serialize = "UNKNOWN")]
    Unknown,
}

lenient_state_serde!(ProductionState);

impl ProductionState {
    /// Fixed mapping into the order-item fabrication space, used before
    /// ranking production rows against the fabrication priority order.
    pub fn to_fabrication(self) -> FabricationState {
        match self {
            ProductionState::Pendiente => FabricationState::SinHacer,
            ProductionState::EnProgreso => FabricationState::Haciendo,
            ProductionState::Completado => FabricationState::Hecho,
            ProductionState::Revisar => FabricationState::Verificar,
            ProductionState::Rehacer => FabricationState::Rehacer,
            ProductionState::Unknown => FabricationState::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn wire_names_round_trip_through_serde() {
        let json = serde_json::to_string(&SaleState::Senado).unwrap();
        assert_eq!(json, "\"SEÑADO\"");
        let back: SaleState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SaleState::Senado);

        let stamp: StampType = serde_json::from_str("\"3MM\"").unwrap();
        assert_eq!(stamp, StampType::ThreeMm);
    }

    #[test]
    fn unrecognised_values_become_unknown() {
        let state: FabricationState = serde_json::from_str("\"EN_COLA\"").unwrap();
        assert_eq!(state, FabricationState::Unknown);
        assert!(state.is_unknown());
        assert_eq!(
            ShippingState::parse_lenient("  despachado "),
            ShippingState::Despachado
        );
        assert_eq!(SaleState::parse_lenient("señado"), SaleState::Senado);
    }

    #[test]
    fn production_mapping_round_trips() {
        for state in ProductionState::iter() {
            assert_eq!(state.to_fabrication().to_production(), state);
        }
    }

    #[test]
    fn lossy_inverse_collapses_to_canonical_labels() {
        assert_eq!(
            FabricationState::Retocar.to_production(),
            ProductionState::Revisar
        );
        assert_eq!(
            FabricationState::Verificar.to_production(),
            ProductionState::Revisar
        );
        assert_eq!(
            FabricationState::Programado.to_production(),
            ProductionState::Pendiente
        );
        assert_eq!(
            ProductionState::Revisar.to_fabrication(),
            FabricationState::Verificar
        );
    }

    #[test]
    fn default_fabrication_state_is_not_started() {
        assert_eq!(FabricationState::default(), FabricationState::SinHacer);
    }
}
