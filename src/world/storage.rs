//! Parameterized statements handed to the persistence collaborator.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Database {
    Login,
    Character,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    U32(u32),
    U64(u64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            SqlValue::U32(v) => Some(*v),
            SqlValue::U64(v) => u32::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            SqlValue::U32(v) => Some(*v as u64),
            SqlValue::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: &'static str,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: &'static str) -> Self {
        Self {
            sql,
            params: Vec::new(),
        }
    }

    pub fn bind(mut self, value: SqlValue) -> Self {
        self.params.push(value);
        self
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{} params]", self.sql, self.params.len())
    }
}

pub type Row = Vec<SqlValue>;

pub mod sql {
    pub const RESET_ACTIVE_REALM: &str = "UPDATE account SET active_realm_id = ? WHERE id = ?";
    pub const SET_CHARACTER_OFFLINE: &str = "UPDATE characters SET online = 0 WHERE guid = ?";

    pub const LOAD_ACCOUNT_DATA: &str = "SELECT type, time, data FROM account_data WHERE account = ?";
    pub const LOAD_CHARACTER_ACCOUNT_DATA: &str =
        "SELECT type, time, data FROM character_account_data WHERE guid = ?";
    pub const DELETE_ACCOUNT_DATA: &str = "DELETE FROM account_data WHERE account = ? AND type = ?";
    pub const INSERT_ACCOUNT_DATA: &str =
        "INSERT INTO account_data VALUES (?, ?, ?, ?)";
    pub const DELETE_CHARACTER_ACCOUNT_DATA: &str =
        "DELETE FROM character_account_data WHERE guid = ? AND type = ?";
    pub const INSERT_CHARACTER_ACCOUNT_DATA: &str =
        "INSERT INTO character_account_data VALUES (?, ?, ?, ?)";

    pub const LOAD_TUTORIALS: &str =
        "SELECT tut0, tut1, tut2, tut3, tut4, tut5, tut6, tut7 FROM character_tutorial WHERE account = ?";
    pub const UPDATE_TUTORIALS: &str = "UPDATE character_tutorial SET tut0 = ?, tut1 = ?, tut2 = ?, tut3 = ?, tut4 = ?, tut5 = ?, tut6 = ?, tut7 = ? WHERE account = ?";
    pub const INSERT_TUTORIALS: &str = "INSERT INTO character_tutorial (account, tut0, tut1, tut2, tut3, tut4, tut5, tut6, tut7) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)";
}
