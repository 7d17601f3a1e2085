//! Pointer chain description and its text form

use super::error::{MemoryError, MemoryResult};
use super::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a pointer chain starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainBase {
    /// A concrete address
    Address(Address),
    /// The load address of a module, looked up by display name
    Module(String),
}

/// A base plus "add offset, then dereference" steps.
///
/// `offsets[0]` is applied to the base directly. Every later offset is
/// applied to the pointer read at the previous address.
///
/// Text form is `<base>[+<offset>][,<offset>...]` with hexadecimal offsets,
/// each optionally negative: `game.exe+1A0,-8,10` or `7FF6A000+10,8`.
///
/// A bare base that parses as hex is an address, so a module named `cafe`
/// must be quoted: `"cafe"+10`. Anything else is a module name. A `+` only
/// separates the first offset when a valid offset follows it, which keeps
/// names like `notepad++.exe` intact; quote the name when it ends in
/// something that looks like `+<hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerChain {
    pub base: ChainBase,
    pub offsets: Vec<i64>,
}

impl PointerChain {
    /// Chain rooted at a concrete address
    pub fn from_address(base: Address, offsets: Vec<i64>) -> Self {
        PointerChain {
            base: ChainBase::Address(base),
            offsets,
        }
    }

    /// Chain rooted at a module's base address
    pub fn from_module(module: impl Into<String>, offsets: Vec<i64>) -> Self {
        PointerChain {
            base: ChainBase::Module(module.into()),
            offsets,
        }
    }

    /// Number of dereferences the chain performs
    pub fn depth(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Parses the textual form described on [`PointerChain`]
    pub fn parse(text: &str) -> MemoryResult<Self> {
        let invalid = || MemoryError::InvalidPointerChain(text.to_string());
        let trimmed = text.trim();

        let (base, first_offset, tail) = match trimmed.strip_prefix('"') {
            Some(quoted) => {
                let (name, rest) = quoted.split_once('"').ok_or_else(invalid)?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(invalid());
                }
                let (after_name, tail) = split_head(rest);
                let after_name = after_name.trim();
                let first_offset = match after_name.strip_prefix('+') {
                    Some(offset) => Some(parse_offset(offset).ok_or_else(invalid)?),
                    None if after_name.is_empty() => None,
                    None => return Err(invalid()),
                };
                (ChainBase::Module(name.to_string()), first_offset, tail)
            }
            None => {
                let (head, tail) = split_head(trimmed);
                let head = head.trim();
                let (base_text, first_offset) = match head.rsplit_once('+') {
                    Some((base, offset)) => match parse_offset(offset) {
                        Some(offset) => (base.trim(), Some(offset)),
                        // an address base can not absorb the '+'
                        None if Address::from_hex(base.trim()).is_ok() => return Err(invalid()),
                        None => (head, None),
                    },
                    None => (head, None),
                };
                if base_text.is_empty() {
                    return Err(invalid());
                }
                let base = match Address::from_hex(base_text) {
                    Ok(address) => ChainBase::Address(address),
                    Err(_) => ChainBase::Module(base_text.to_string()),
                };
                (base, first_offset, tail)
            }
        };

        let mut offsets: Vec<i64> = first_offset.into_iter().collect();
        for segment in tail.into_iter().flat_map(|tail| tail.split(',')) {
            offsets.push(parse_offset(segment).ok_or_else(invalid)?);
        }

        Ok(PointerChain { base, offsets })
    }
}

fn split_head(text: &str) -> (&str, Option<&str>) {
    match text.split_once(',') {
        Some((head, tail)) => (head, Some(tail)),
        None => (text, None),
    }
}

// Names that would not survive an unquoted round trip
fn needs_quotes(name: &str) -> bool {
    Address::from_hex(name).is_ok() || name.contains([',', '+'])
}

fn parse_offset(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }

    let magnitude = u64::from_str_radix(digits, 16).ok()?;
    if negative {
        0i64.checked_sub_unsigned(magnitude)
    } else {
        i64::try_from(magnitude).ok()
    }
}

fn write_offset(f: &mut fmt::Formatter<'_>, offset: i64) -> fmt::Result {
    if offset < 0 {
        write!(f, "-{:X}", offset.unsigned_abs())
    } else {
        write!(f, "{:X}", offset)
    }
}

impl FromStr for PointerChain {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PointerChain::parse(s)
    }
}

impl fmt::Display for PointerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.base {
            ChainBase::Address(address) => write!(f, "{:X}", address)?,
            ChainBase::Module(name) if needs_quotes(name) => write!(f, "\"{}\"", name)?,
            ChainBase::Module(name) => write!(f, "{}", name)?,
        }
        for (index, offset) in self.offsets.iter().enumerate() {
            f.write_str(if index == 0 { "+" } else { "," })?;
            write_offset(f, *offset)?;
        }
        Ok(())
    }
}
