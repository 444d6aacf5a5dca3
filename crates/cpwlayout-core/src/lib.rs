//! # cpwlayout Core
//!
//! Coplanar-waveguide geometry engine: a stateful drawing cursor, the
//! straight / linear-taper / bend primitives, the conductor/gap layer role
//! mapping, and the canvas and library containers the primitives draw into.
//!
//! Drawing is chained: every primitive is emitted relative to the cursor's
//! current pose and leaves the cursor at the end of what it drew.

pub mod canvas;
pub mod cursor;
pub mod error;
pub mod geometry;
pub mod kernel;
pub mod layer;
pub mod library;
pub mod primitives;

pub use canvas::{Canvas, CanvasId};
pub use cursor::{Cursor, Pose};
pub use error::{positive, DrawError};
pub use geometry::{BBox, Point, Polygon};
pub use kernel::CrossSection;
pub use layer::{LayerId, LayerRole, LayerRoles, RoleOverride};
pub use library::Library;
pub use primitives::{Bend, LinearTaper, Primitive, Straight, DEFAULT_BEND_SEGMENTS};
