//! # Note Catalog
//!
//! Static lookup from (letter name, register, clef) to a pitch id.
//!
//! The table comes from a JSON asset bundled by the `sightread-catalog` package
//! and is parsed once per process. A lookup miss returns `None`; callers that
//! build notes turn it into [`EngineError::UnknownPitch`].

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::error::EngineError;
use crate::note::{Clef, NoteName, PitchId, MAX_REGISTER};

/// One register of the bundled asset
#[derive(Deserialize, Debug)]
struct RawOctave {
    octave: i32,
    notes: Vec<RawCatalogNote>,
}

#[derive(Deserialize, Debug)]
struct RawCatalogNote {
    name: String,
    number: i32,
}

static BUNDLED: Lazy<NoteCatalog> = Lazy::new(|| {
    match NoteCatalog::load_bundled(sightread_catalog::DEFAULT_CATALOG) {
        Ok(catalog) => catalog,
        Err(e) => {
            log::error!("bundled note catalog is unusable: {}", e);
            NoteCatalog::default()
        }
    }
});

/// Register-keyed table of natural pitches
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteCatalog {
    registers: BTreeMap<u8, Vec<(NoteName, PitchId)>>,
}

impl NoteCatalog {
    /// The default catalog bundled with the crate, parsed on first use.
    pub fn bundled() -> &'static NoteCatalog {
        &BUNDLED
    }

    /// Parse one of the assets embedded in `sightread-catalog` by file name.
    pub fn load_bundled(name: &str) -> Result<Self, EngineError> {
        let raw = sightread_catalog::get_catalog(name)
            .ok_or_else(|| EngineError::Catalog(format!("no bundled catalog named '{}'", name)))?;
        Self::from_json(raw)
    }

    /// Parse a catalog from its JSON form:
    /// `[{"octave": 4, "notes": [{"name": "C", "number": 60}, ...]}, ...]`
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let octaves: Vec<RawOctave> = serde_json::from_str(json)?;
        let mut registers: BTreeMap<u8, Vec<(NoteName, PitchId)>> = BTreeMap::new();

        for octave in octaves {
            let register = match u8::try_from(octave.octave) {
                Ok(r) if r <= MAX_REGISTER => r,
                _ => {
                    log::debug!("skipping catalog octave {} outside 0..={}", octave.octave, MAX_REGISTER);
                    continue;
                }
            };

            let entries = registers.entry(register).or_default();
            for note in octave.notes {
                let name: NoteName = note.name.parse().map_err(|_| {
                    EngineError::Catalog(format!("'{}' in octave {} is not a note name", note.name, register))
                })?;
                let pitch = u8::try_from(note.number)
                    .ok()
                    .filter(|p| *p <= 127)
                    .ok_or_else(|| {
                        EngineError::Catalog(format!(
                            "{}{} has MIDI number {} outside 0..=127",
                            name, register, note.number
                        ))
                    })?;
                entries.push((name, pitch));
            }
        }

        Ok(Self { registers })
    }

    /// Pitch of the natural note `name` in `register`.
    ///
    /// The clef only changes where a note is drawn, not its pitch; it is part of
    /// the lookup so notes are always resolved with their full identity.
    pub fn resolve_pitch(&self, name: NoteName, register: u8, _clef: Clef) -> Option<PitchId> {
        self.registers
            .get(&register)?
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, pitch)| *pitch)
    }

    /// Registers present in the catalog, lowest first
    pub fn registers(&self) -> impl Iterator<Item = u8> + '_ {
        self.registers.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }
}
