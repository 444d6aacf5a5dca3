use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

/// A GDS layer identifier: layer number plus datatype sub-channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId {
    pub layer: u16,
    pub datatype: u16,
}

impl LayerId {
    pub const fn new(layer: u16, datatype: u16) -> Self {
        Self { layer, datatype }
    }
}

impl From<u16> for LayerId {
    fn from(layer: u16) -> Self {
        Self::new(layer, 0)
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.layer, self.datatype)
    }
}

/// Conductor (center pin) layer used when nothing else is configured.
pub const DEFAULT_CONDUCTOR_LAYER: LayerId = LayerId::new(1, 0);
/// Gap (ground cut / undercut) layer used when nothing else is configured.
pub const DEFAULT_GAP_LAYER: LayerId = LayerId::new(2, 0);

/// The two logical layers CPW geometry is emitted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerRole {
    Conductor,
    Gap,
}

/// Role -> layer mapping consulted by every primitive at the moment it emits
/// geometry.
///
/// Drawing calls take the mapping explicitly, so re-pointing a role only
/// affects calls made afterwards. Temporary re-routing goes through
/// [`LayerRoles::override_role`], whose guard puts the previous layer back
/// when it is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRoles {
    pub conductor: LayerId,
    pub gap: LayerId,
}

impl Default for LayerRoles {
    fn default() -> Self {
        Self {
            conductor: DEFAULT_CONDUCTOR_LAYER,
            gap: DEFAULT_GAP_LAYER,
        }
    }
}

impl LayerRoles {
    pub fn new(conductor: LayerId, gap: LayerId) -> Self {
        Self { conductor, gap }
    }

    pub fn get(&self, role: LayerRole) -> LayerId {
        match role {
            LayerRole::Conductor => self.conductor,
            LayerRole::Gap => self.gap,
        }
    }

    pub fn set(&mut self, role: LayerRole, layer: LayerId) {
        match role {
            LayerRole::Conductor => self.conductor = layer,
            LayerRole::Gap => self.gap = layer,
        }
    }

    /// Point `role` at `layer` until the returned guard is dropped.
    pub fn override_role(&mut self, role: LayerRole, layer: LayerId) -> RoleOverride<'_> {
        let previous = self.get(role);
        self.set(role, layer);
        log::trace!("layer role {:?} overridden: {} -> {}", role, previous, layer);
        RoleOverride {
            roles: self,
            role,
            previous,
        }
    }

    /// Route the conductor role to the gap layer, so solid sections land on
    /// the gap layer.
    pub fn route_conductor_to_gap(&mut self) -> RoleOverride<'_> {
        let gap = self.gap;
        self.override_role(LayerRole::Conductor, gap)
    }
}

/// Scoped role override returned by [`LayerRoles::override_role`].
#[derive(Debug)]
pub struct RoleOverride<'a> {
    roles: &'a mut LayerRoles,
    role: LayerRole,
    previous: LayerId,
}

impl Deref for RoleOverride<'_> {
    type Target = LayerRoles;

    fn deref(&self) -> &LayerRoles {
        self.roles
    }
}

impl DerefMut for RoleOverride<'_> {
    fn deref_mut(&mut self) -> &mut LayerRoles {
        self.roles
    }
}

impl Drop for RoleOverride<'_> {
    fn drop(&mut self) {
        self.roles.set(self.role, self.previous);
    }
}
