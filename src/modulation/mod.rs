// Purpose: Named control signals routed onto synth parameters.
// Sources and destinations are fixed catalogs; routings are edited live.

pub mod destination;
pub mod frame;
pub mod matrix;
pub mod routing;
pub mod source;

pub use destination::ModulationDestination;
pub use frame::{ModFrame, VoiceSources};
pub use matrix::{MatrixStats, ModulationMatrix, RoutingView};
pub use routing::{Routing, RoutingId, RoutingSpec};
pub use source::{LfoPatch, ModulationSource, SourceKind};
