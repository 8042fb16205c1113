//! # SkyAim Core
//!
//! Platform-independent aim computation for a camera carried by a drone.
//!
//! This crate contains the pure math and the input handoff with **no I/O** and
//! no threads of its own. The host crate decides where samples come from,
//! how often the loop runs and where commands go.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  skyaim-core (no I/O, no async, no threads spawned)          │
//! │  ├── exchange/  (latest-value handoff, drop on contention)   │
//! │  ├── lock_on/   (Direct / Locked state machine)              │
//! │  ├── geodesy/   (coordinate <-> aim angles)                  │
//! │  ├── rotation/  (attitude compensation)                      │
//! │  └── aim_loop/  (one cycle -> CameraCommand -> CommandSink)  │
//! └──────────────────────────────────────────────────────────────┘
//!            ▲                                       │
//!   publish_attitude / publish_aim           CommandSink::apply_command
//!            │                                       ▼
//!   ┌────────┴─────────────┐              ┌──────────────────────┐
//!   │ vehicle / operator   │              │ crop / gimbal output │
//!   └──────────────────────┘              └──────────────────────┘
//! ```
//!
//! ## Angles
//!
//! | Quantity        | Unit                       | Notes                         |
//! |-----------------|----------------------------|-------------------------------|
//! | theta           | degrees from straight down | clamped into [0, 90)          |
//! | phi             | degrees from north         | clockwise                     |
//! | roll/pitch/yaw  | radians in, degrees stored | as reported by the autopilot  |
//! | longitude/lat   | degrees                    |                               |
//!
//! ## Example: One Cycle
//!
//! ```rust
//! use std::sync::Arc;
//! use skyaim_core::{AimInput, AimLoop, InputExchange};
//!
//! let exchange = Arc::new(InputExchange::new());
//! exchange.publish_attitude(0.0, 0.0, 0.0, 50.0, 18.07, 59.33);
//! exchange.publish_aim(AimInput { theta: 30.0, phi: 90.0, ..Default::default() });
//!
//! let mut aim_loop = AimLoop::new(exchange);
//! let command = aim_loop.cycle().unwrap();
//! assert!((command.yaw - 90.0).abs() < 1e-9);
//! assert!((command.pitch - 0.5).abs() < 1e-9);
//! ```

pub mod aim_loop;
pub mod error;
pub mod exchange;
pub mod geodesy;
pub mod lock_on;
pub mod rotation;
pub mod types;

// Re-export commonly used types
pub use aim_loop::{compute_command, AimLoop, CommandSink};
pub use error::AimError;
pub use exchange::{AimInput, ExchangeStats, InputExchange, PublishOutcome};
pub use geodesy::{coordinate_to_point, earth_radius_at_lat, point_to_coordinate};
pub use lock_on::{LockOnTracker, LockState};
pub use rotation::{compensate_for_attitude, rotation_matrix};
pub use types::{AimAngles, AimRequest, AttitudeSample, CameraCommand, GeoCoordinate};
