//! Interning of well-known DRM property names and a small per-object property
//! table indexed by them, with a string-keyed fallback for anything else.

use indexmap::IndexMap;

/// Well-known DRM/KMS property names the engine reasons about directly.
///
/// Every other property name is still tracked (on planes, to build the
/// applier's id lookup; on layers, as an opaque value the applier forwards
/// verbatim) but only through the string fallback in [`PropertyTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CoreProperty {
    /// `FB_ID`
    FbId,
    /// `CRTC_ID`
    CrtcId,
    /// `CRTC_X`
    CrtcX,
    /// `CRTC_Y`
    CrtcY,
    /// `CRTC_W`
    CrtcW,
    /// `CRTC_H`
    CrtcH,
    /// `SRC_X`
    SrcX,
    /// `SRC_Y`
    SrcY,
    /// `SRC_W`
    SrcW,
    /// `SRC_H`
    SrcH,
    /// `zpos`
    Zpos,
    /// `alpha`
    Alpha,
    /// `rotation`
    Rotation,
    /// `type`
    Type,
    /// `IN_FENCE_FD`
    InFenceFd,
    /// `FB_DAMAGE_CLIPS`
    FbDamageClips,
}

impl CoreProperty {
    /// Number of interned well-known properties; used to size the fast-path
    /// lookup array in [`PropertyTable`].
    pub const COUNT: usize = 16;

    /// All well-known properties, in the same order as their index.
    pub const ALL: [CoreProperty; Self::COUNT] = [
        CoreProperty::FbId,
        CoreProperty::CrtcId,
        CoreProperty::CrtcX,
        CoreProperty::CrtcY,
        CoreProperty::CrtcW,
        CoreProperty::CrtcH,
        CoreProperty::SrcX,
        CoreProperty::SrcY,
        CoreProperty::SrcW,
        CoreProperty::SrcH,
        CoreProperty::Zpos,
        CoreProperty::Alpha,
        CoreProperty::Rotation,
        CoreProperty::Type,
        CoreProperty::InFenceFd,
        CoreProperty::FbDamageClips,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// The canonical DRM property name for this well-known property.
    pub fn name(self) -> &'static str {
        match self {
            CoreProperty::FbId => "FB_ID",
            CoreProperty::CrtcId => "CRTC_ID",
            CoreProperty::CrtcX => "CRTC_X",
            CoreProperty::CrtcY => "CRTC_Y",
            CoreProperty::CrtcW => "CRTC_W",
            CoreProperty::CrtcH => "CRTC_H",
            CoreProperty::SrcX => "SRC_X",
            CoreProperty::SrcY => "SRC_Y",
            CoreProperty::SrcW => "SRC_W",
            CoreProperty::SrcH => "SRC_H",
            CoreProperty::Zpos => "zpos",
            CoreProperty::Alpha => "alpha",
            CoreProperty::Rotation => "rotation",
            CoreProperty::Type => "type",
            CoreProperty::InFenceFd => "IN_FENCE_FD",
            CoreProperty::FbDamageClips => "FB_DAMAGE_CLIPS",
        }
    }

    /// Looks up the well-known property matching `name`, if any.
    pub fn from_name(name: &str) -> Option<CoreProperty> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }
}

/// A per-object (plane or layer) table of `(name, value)` pairs, with O(1)
/// access for well-known [`CoreProperty`] names and an insertion-ordered
/// string fallback for everything else.
///
/// Values are stored once in `entries`; `core` is a parallel index into
/// `entries` for the well-known subset, so a lookup by [`CoreProperty`] never
/// touches the string map.
#[derive(Debug, Clone)]
pub struct PropertyTable<V> {
    core: [Option<usize>; CoreProperty::COUNT],
    entries: IndexMap<Box<str>, V>,
}

impl<V> Default for PropertyTable<V> {
    fn default() -> Self {
        PropertyTable {
            core: [None; CoreProperty::COUNT],
            entries: IndexMap::new(),
        }
    }
}

impl<V> PropertyTable<V> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of properties currently stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no properties.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up a property by name, whether well-known or driver-specific.
    pub fn get(&self, name: &str) -> Option<&V> {
        if let Some(core) = CoreProperty::from_name(name) {
            return self.get_core(core);
        }
        self.entries.get(name)
    }

    /// Looks up a property by its well-known identity.
    pub fn get_core(&self, core: CoreProperty) -> Option<&V> {
        self.core[core.index()].map(|i| self.entries.get_index(i).unwrap().1)
    }

    /// Inserts or updates a property by name, returning the previous value if
    /// any was set.
    pub fn insert(&mut self, name: &str, value: V) -> Option<V> {
        if let Some(core) = CoreProperty::from_name(name) {
            return self.insert_core(core, value);
        }
        self.entries.insert(Box::from(name), value)
    }

    /// Inserts or updates a property by its well-known identity.
    pub fn insert_core(&mut self, core: CoreProperty, value: V) -> Option<V> {
        if let Some(i) = self.core[core.index()] {
            let (_, slot) = self.entries.get_index_mut(i).unwrap();
            return Some(std::mem::replace(slot, value));
        }
        let (i, prev) = self.entries.insert_full(Box::from(core.name()), value);
        debug_assert!(prev.is_none());
        self.core[core.index()] = Some(i);
        None
    }

    /// Iterates over every `(name, value)` pair in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_ref(), v))
    }

    /// Mutably iterates over every `(name, value)` pair in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut V)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_ref(), v))
    }

    /// Mutably looks up a property by name, whether well-known or
    /// driver-specific.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut V> {
        if let Some(core) = CoreProperty::from_name(name) {
            return self.get_core_mut(core);
        }
        self.entries.get_mut(name)
    }

    /// Mutably looks up a property by its well-known identity.
    pub fn get_core_mut(&mut self, core: CoreProperty) -> Option<&mut V> {
        let i = self.core[core.index()]?;
        Some(self.entries.get_index_mut(i).unwrap().1)
    }
}
