//! Static spell definitions as the session engine sees them.

/// Aura an effect applies, reduced to the kinds the engine branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuraKind {
    ModPossess,
    ModPossessPet,
    ModShapeshift,
    SpiritOfRedemption,
    PreventResurrection,
    AreaAura,
    Other(u32),
}

impl AuraKind {
    pub fn is_possession(self) -> bool {
        matches!(self, AuraKind::ModPossess | AuraKind::ModPossessPet)
    }
}

/// Implicit target class of an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImplicitTarget {
    #[default]
    None,
    Caster,
    Unit,
    Point,
    Area,
}

impl ImplicitTarget {
    pub fn is_point_or_area(self) -> bool {
        matches!(self, ImplicitTarget::Point | ImplicitTarget::Area)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpellEffect {
    pub aura: Option<AuraKind>,
    pub implicit_target: ImplicitTarget,
    /// Spell fired when this effect triggers, 0 for none.
    pub trigger_spell: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpellInfo {
    pub id: u32,
    pub passive: bool,
    pub positive: bool,
    pub channeled: bool,
    pub cant_cancel: bool,
    pub castable_on_vehicle: bool,
    /// Cannot be used while in combat.
    pub non_combat: bool,
    pub effects: [SpellEffect; 3],
}

impl SpellInfo {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            positive: true,
            ..Self::default()
        }
    }

    pub fn has_possession_aura(&self) -> bool {
        self.effects
            .iter()
            .any(|e| e.aura.is_some_and(AuraKind::is_possession))
    }

    pub fn has_area_aura(&self) -> bool {
        self.effects.iter().any(|e| e.aura == Some(AuraKind::AreaAura))
    }

    pub fn trigger_spells(&self) -> impl Iterator<Item = u32> + '_ {
        self.effects
            .iter()
            .map(|e| e.trigger_spell)
            .filter(|id| *id != 0)
    }
}
