use crate::core::guid::ObjectGuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemClass {
    Consumable,
    Weapon,
    Armor,
    Quest,
    #[default]
    Miscellaneous,
    Other(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bonding {
    #[default]
    None,
    WhenPickedUp,
    WhenEquipped,
    WhenUsed,
    QuestItem,
}

impl Bonding {
    /// Bindings applied on first use if the item is not yet soulbound.
    pub fn binds_on_use(self) -> bool {
        matches!(
            self,
            Bonding::WhenUsed | Bonding::WhenPickedUp | Bonding::QuestItem
        )
    }
}

/// Static template of an item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemProto {
    pub entry: u32,
    pub class: ItemClass,
    /// Needs an equipment slot to be used.
    pub equippable: bool,
    pub usable_in_arena: bool,
    /// Restricts use to one area, 0 for anywhere.
    pub area: u32,
    /// Restricts use to one map, 0 for anywhere.
    pub map: u32,
    pub bonding: Bonding,
    pub potion: bool,
    pub spells: Vec<u32>,
}

/// One inventory item as currently held by a player.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemView {
    pub guid: ObjectGuid,
    pub equipped: bool,
    pub in_trade: bool,
    pub soulbound: bool,
    pub proto: Option<ItemProto>,
}
