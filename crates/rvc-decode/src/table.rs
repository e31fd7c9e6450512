//! Opcode table matching (spec §4.B, §6): `(pattern, mask)` entries, most
//! specific mask wins on overlap.

use crate::ir::CodeSet;

/// One opcode table entry. `emit` lowers a matched 16-bit word plus its
/// instruction address into a [`CodeSet`].
pub struct InstrDef {
    pub mnemonic: &'static str,
    pub pattern: u16,
    pub mask: u16,
    pub emit: fn(u16, u64) -> CodeSet,
}

/// A decoded instruction: its mnemonic (for disassembly/logging) and its
/// lowered semantics.
pub struct DecodedInstr {
    pub mnemonic: &'static str,
    pub code: CodeSet,
}

/// A static table of [`InstrDef`]s, matched by `word & mask == pattern`.
pub struct OpcodeTable {
    pub entries: &'static [InstrDef],
}

impl OpcodeTable {
    /// Decode `word` (fetched at `current_address`), selecting the
    /// matching entry whose mask constrains the most bits. Reserved /
    /// illegal encodings are themselves ordinary entries (`dii`,
    /// `__reserved_*`) rather than `None` — every 16-bit word that is part
    /// of this ISA's RVC subset decodes to *something*.
    #[must_use]
    pub fn decode(&self, word: u16, current_address: u64) -> Option<DecodedInstr> {
        let mut best: Option<&InstrDef> = None;
        for def in self.entries {
            if word & def.mask == def.pattern {
                best = match best {
                    None => Some(def),
                    Some(b) if def.mask.count_ones() > b.mask.count_ones() => Some(def),
                    Some(b) => Some(b),
                };
            }
        }
        best.map(|def| DecodedInstr { mnemonic: def.mnemonic, code: (def.emit)(word, current_address) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rvc::RVC_TABLE;

    /// Every word matched by more than one entry must have a unique
    /// strictly-highest-specificity winner; a tie between two equally
    /// specific masks would make decoding ambiguous.
    #[test]
    fn no_ambiguous_ties_among_sample_words() {
        for word in (0u16..=0xffff).step_by(997) {
            let matches: Vec<&InstrDef> = RVC_TABLE.entries.iter().filter(|d| word & d.mask == d.pattern).collect();
            if let Some(max_mask) = matches.iter().map(|d| d.mask.count_ones()).max() {
                let winners = matches.iter().filter(|d| d.mask.count_ones() == max_mask).count();
                assert_eq!(winners, 1, "word {word:#06x} has {winners} equally-specific matches");
            }
        }
    }

    #[test]
    fn every_word_decodes_to_something() {
        for word in (0u16..=0xffff).step_by(1301) {
            assert!(RVC_TABLE.decode(word, 0x1000).is_some(), "word {word:#06x} did not decode");
        }
    }
}
