use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;

pub const CODE_LEN: usize = 6;

/// Exactly six ASCII digits. Leading zeros are significant.
#[derive(Clone, PartialEq, Eq)]
pub struct VerificationCode(String);

impl VerificationCode {
    pub fn parse(raw: &str) -> Result<Self, ClientError> {
        if raw.len() == CODE_LEN && raw.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(raw.to_owned()))
        } else {
            Err(ClientError::InvalidCodeFormat)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for VerificationCode {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VerificationCode(******)")
    }
}

/// The six single-digit input boxes of the code form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeEntry {
    slots: [Option<char>; CODE_LEN],
}

impl CodeEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false (and leaves the slot alone) for non-digits or an out-of-range index.
    pub fn set_digit(&mut self, index: usize, ch: char) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if ch.is_ascii_digit() => {
                *slot = Some(ch);
                true
            }
            _ => false,
        }
    }

    pub fn backspace(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = None;
        }
    }

    /// Replaces the whole entry with the digits found in `text`, in order.
    /// Separators such as spaces or dashes are skipped. Returns how many slots were filled.
    pub fn paste(&mut self, text: &str) -> usize {
        self.clear();
        let digits = text.chars().filter(char::is_ascii_digit).take(CODE_LEN);
        let mut filled = 0;
        for (slot, d) in self.slots.iter_mut().zip(digits) {
            *slot = Some(d);
            filled += 1;
        }
        filled
    }

    pub fn clear(&mut self) {
        self.slots = [None; CODE_LEN];
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Where focus goes next.
    pub fn next_empty(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    pub fn slots(&self) -> &[Option<char>; CODE_LEN] {
        &self.slots
    }

    /// Slot contents as displayed; empty boxes are empty strings.
    pub fn display(&self) -> [String; CODE_LEN] {
        self.slots
            .map(|slot| slot.map(String::from).unwrap_or_default())
    }

    pub fn code(&self) -> Result<VerificationCode, ClientError> {
        let raw: String = self.slots.iter().flatten().collect();
        VerificationCode::parse(&raw)
    }
}
