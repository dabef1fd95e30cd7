//! Look-direction arbitration shared by every feature that steers the avatar

pub mod angle;
pub mod request;
pub mod scheduler;
pub mod sequence;
pub mod session;
pub mod smoothing;

pub use angle::{angle_difference, mouse_gcd, wrap_degrees, Rotation, RotationDelta};
pub use request::{MovementCorrection, OwnerId, Priority, RotationRequest};
pub use scheduler::{ActiveTarget, ResolvedRotation, RotationScheduler, SchedulerConfig};
pub use sequence::{AimPhase, AimSequence};
pub use smoothing::AngleSmooth;
