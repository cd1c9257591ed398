//! Per-account client settings: account data slots and tutorial flags.

use crate::core::buffer::CommandBuffer;
use crate::core::command::OutboundPacket;
use crate::protocol::opcodes;
use crate::world::storage::{sql, Row, SqlValue, Statement};
use tracing::error;

pub const NUM_ACCOUNT_DATA_TYPES: usize = 8;

/// Slots shared by every character of an account.
pub const GLOBAL_CACHE_MASK: u32 = 0x15;

/// Slots stored per character.
pub const PER_CHARACTER_CACHE_MASK: u32 = 0xEA;

pub const NUM_TUTORIAL_WORDS: usize = 8;

/// One client settings blob with its last modification time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountDataSlot {
    pub time: u64,
    pub data: String,
}

pub fn is_global(kind: usize) -> bool {
    kind < NUM_ACCOUNT_DATA_TYPES && GLOBAL_CACHE_MASK & (1 << kind) != 0
}

#[derive(Debug, Clone, Default)]
pub struct AccountDataStore {
    slots: [AccountDataSlot; NUM_ACCOUNT_DATA_TYPES],
}

impl AccountDataStore {
    pub fn get(&self, kind: usize) -> Option<&AccountDataSlot> {
        self.slots.get(kind)
    }

    /// Reset the slots in `mask` and fill them from `(type, time, data)` rows.
    /// Rows with an out-of-range type or a type outside `mask` are skipped.
    pub fn load(&mut self, rows: &[Row], mask: u32) -> usize {
        for (kind, slot) in self.slots.iter_mut().enumerate() {
            if mask & (1 << kind) != 0 {
                *slot = AccountDataSlot::default();
            }
        }

        let table = if mask == GLOBAL_CACHE_MASK {
            "account_data"
        } else {
            "character_account_data"
        };

        let mut loaded = 0;
        for row in rows {
            let kind = row.first().and_then(SqlValue::as_u32).unwrap_or(u32::MAX) as usize;
            if kind >= NUM_ACCOUNT_DATA_TYPES {
                error!(table, kind, "Invalid account data type, ignored");
                continue;
            }
            if mask & (1 << kind) == 0 {
                error!(table, kind, "Account data type does not belong to this table, ignored");
                continue;
            }
            self.slots[kind] = AccountDataSlot {
                time: row.get(1).and_then(SqlValue::as_u64).unwrap_or(0),
                data: row
                    .get(2)
                    .and_then(SqlValue::as_text)
                    .unwrap_or_default()
                    .to_string(),
            };
            loaded += 1;
        }
        loaded
    }

    pub fn set(&mut self, kind: usize, time: u64, data: String) {
        if let Some(slot) = self.slots.get_mut(kind) {
            *slot = AccountDataSlot { time, data };
        }
    }

    /// `ACCOUNT_DATA_TIMES`: `[Now(4)][1(1)][Mask(4)]` then a u32 time per set bit.
    pub fn times_packet(&self, now: u32, mask: u32) -> OutboundPacket {
        let mut body = CommandBuffer::with_capacity(9 + 4 * NUM_ACCOUNT_DATA_TYPES);
        body.write_u32(now).write_u8(1).write_u32(mask);
        for (kind, slot) in self.slots.iter().enumerate() {
            if mask & (1 << kind) != 0 {
                body.write_u32(slot.time as u32);
            }
        }
        OutboundPacket::new(opcodes::SMSG_ACCOUNT_DATA_TIMES, body)
    }
}

/// Replace one slot: delete then insert, keyed by account id for global
/// slots and character counter otherwise.
pub fn replace_statements(kind: usize, owner: u32, time: u64, data: &str) -> Vec<Statement> {
    let (delete, insert) = if is_global(kind) {
        (sql::DELETE_ACCOUNT_DATA, sql::INSERT_ACCOUNT_DATA)
    } else {
        (sql::DELETE_CHARACTER_ACCOUNT_DATA, sql::INSERT_CHARACTER_ACCOUNT_DATA)
    };
    vec![
        Statement::new(delete)
            .bind(SqlValue::U32(owner))
            .bind(SqlValue::U32(kind as u32)),
        Statement::new(insert)
            .bind(SqlValue::U32(owner))
            .bind(SqlValue::U32(kind as u32))
            .bind(SqlValue::U64(time))
            .bind(SqlValue::Text(data.to_string())),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TutorialState {
    #[default]
    Unchanged,
    Changed,
    /// No stored row yet.
    New,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tutorials {
    words: [u32; NUM_TUTORIAL_WORDS],
    state: TutorialState,
}

impl Tutorials {
    /// Build from the stored row; no row means a fresh account.
    pub fn from_rows(rows: &[Row]) -> Self {
        let Some(row) = rows.last() else {
            return Self {
                words: [0; NUM_TUTORIAL_WORDS],
                state: TutorialState::New,
            };
        };
        let mut words = [0; NUM_TUTORIAL_WORDS];
        for (word, value) in words.iter_mut().zip(row) {
            *word = value.as_u32().unwrap_or(0);
        }
        Self {
            words,
            state: TutorialState::Unchanged,
        }
    }

    pub fn word(&self, index: usize) -> u32 {
        self.words.get(index).copied().unwrap_or(0)
    }

    pub fn state(&self) -> TutorialState {
        self.state
    }

    pub fn set_word(&mut self, index: usize, value: u32) {
        let Some(word) = self.words.get_mut(index) else {
            return;
        };
        if *word != value {
            *word = value;
            if self.state == TutorialState::Unchanged {
                self.state = TutorialState::Changed;
            }
        }
    }

    /// Set one tutorial bit. Out-of-range flags are ignored.
    pub fn mark_seen(&mut self, flag: u32) -> bool {
        let index = (flag / 32) as usize;
        if index >= NUM_TUTORIAL_WORDS {
            return false;
        }
        let value = self.words[index] | (1 << (flag % 32));
        self.set_word(index, value);
        true
    }

    pub fn fill(&mut self, value: u32) {
        for index in 0..NUM_TUTORIAL_WORDS {
            self.set_word(index, value);
        }
    }

    pub fn flags_packet(&self) -> OutboundPacket {
        let mut body = CommandBuffer::with_capacity(4 * NUM_TUTORIAL_WORDS);
        for word in self.words {
            body.write_u32(word);
        }
        OutboundPacket::new(opcodes::SMSG_TUTORIAL_FLAGS, body)
    }

    /// Statement persisting pending changes, if any.
    pub fn save_statement(&self, account_id: u32) -> Option<Statement> {
        match self.state {
            TutorialState::Unchanged => None,
            TutorialState::Changed => {
                let stmt = self
                    .words
                    .iter()
                    .fold(Statement::new(sql::UPDATE_TUTORIALS), |s, w| {
                        s.bind(SqlValue::U32(*w))
                    });
                Some(stmt.bind(SqlValue::U32(account_id)))
            }
            TutorialState::New => Some(
                self.words.iter().fold(
                    Statement::new(sql::INSERT_TUTORIALS).bind(SqlValue::U32(account_id)),
                    |s, w| s.bind(SqlValue::U32(*w)),
                ),
            ),
        }
    }

    pub fn mark_saved(&mut self) {
        self.state = TutorialState::Unchanged;
    }
}
