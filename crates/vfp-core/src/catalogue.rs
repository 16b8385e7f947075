//! The fixed layer catalogue of a VFP data source.
//!
//! Every VFP file exposes the same 19 layers, each backed by the element of the
//! same name. `zs` is listed twice; both entries are kept and the second one is
//! exposed as `zs_2` so layer names stay unique.

/// One catalogue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerEntry {
    /// Layer name as listed in the catalogue.
    pub name: &'static str,
    /// Element scanned for the layer schema.
    pub element: &'static str,
}

impl LayerEntry {
    const fn same(name: &'static str) -> Self {
        Self {
            name,
            element: name,
        }
    }
}

/// Layers of a VFP data source, in catalogue order.
pub const LAYER_CATALOGUE: [LayerEntry; 19] = [
    LayerEntry::same("ucastnici"),
    LayerEntry::same("narok"),
    LayerEntry::same("navrh"),
    LayerEntry::same("pneres"),
    LayerEntry::same("pmimo"),
    LayerEntry::same("bpej"),
    LayerEntry::same("bpejr2"),
    LayerEntry::same("mdp"),
    LayerEntry::same("zs"),
    LayerEntry::same("opu"),
    LayerEntry::same("por"),
    LayerEntry::same("pbre"),
    LayerEntry::same("spoz"),
    LayerEntry::same("pm"),
    LayerEntry::same("mp"),
    LayerEntry::same("meos"),
    LayerEntry::same("meon"),
    LayerEntry::same("hvpsz"),
    LayerEntry::same("zs"),
];

/// Unique exposed names for `entries`, in order.
///
/// The first occurrence of a name is kept as is; later ones get a `_2`, `_3`,
/// ... suffix, skipping suffixed names that are already taken.
#[must_use]
pub fn exposed_layer_names(entries: &[LayerEntry]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(entries.len());

    for entry in entries {
        let taken = |candidate: &str, names: &[String]| {
            names.iter().any(|name| name == candidate)
                || entries.iter().any(|other| other.name == candidate && other.name != entry.name)
        };

        let mut candidate = entry.name.to_string();
        let mut suffix = 1;
        while taken(&candidate, &names) {
            suffix += 1;
            candidate = format!("{}_{suffix}", entry.name);
        }
        names.push(candidate);
    }
    names
}

/// Distinct elements scanned by the catalogue.
#[must_use]
pub fn catalogue_elements() -> Vec<&'static str> {
    let mut elements: Vec<&'static str> = Vec::new();
    for entry in &LAYER_CATALOGUE {
        if !elements.contains(&entry.element) {
            elements.push(entry.element);
        }
    }
    elements
}
