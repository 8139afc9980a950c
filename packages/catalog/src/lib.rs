//! Static note catalog assets bundled at build time.
//!
//! Every `*.json` file under `data/` is embedded by `build.rs`. Each file maps a
//! register ("octave") to the letter names it contains and their MIDI numbers:
//!
//! ```text
//! [ { "octave": 4, "notes": [ { "name": "C", "number": 60 }, ... ] }, ... ]
//! ```

include!(concat!(env!("OUT_DIR"), "/catalogs.rs"));

/// Name of the catalog the engine loads when nothing else is configured.
pub const DEFAULT_CATALOG: &str = "midi_notes.json";

/// Get the raw JSON of an embedded catalog by file name
pub fn get_catalog(name: &str) -> Option<&'static str> {
    CATALOGS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, content)| *content)
}

/// List all embedded catalog names
pub fn list_catalogs() -> Vec<&'static str> {
    CATALOGS.iter().map(|(name, _)| *name).collect()
}
