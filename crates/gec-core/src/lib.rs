//! # gec-core: Electro-Thermal Dispatch Inputs
//!
//! Typed inputs for the day-ahead dispatch of a low-voltage microgrid whose
//! households run a heat pump, a gas boiler and rooftop PV.
//!
//! ## Quick Start
//!
//! ```rust
//! use gec_core::ParameterSet;
//!
//! let case = ParameterSet::reference_case(3);
//! let topology = case.validate().expect("reference case is valid");
//! assert_eq!(topology.n_bus(), 4);
//! ```
//!
//! ## Modules
//!
//! - [`params`] - [`ParameterSet`] and its typed groups (horizon, network,
//!   users, devices, prices, weather, thermal)
//! - [`topology`] - Radial tree validation via petgraph
//! - [`comfort`] - Piecewise-linear PPD breakpoints and their envelope
//! - [`diagnostics`] - Non-fatal warnings collected during validation and
//!   result checks
//! - [`error`] - [`ValidationError`] and the [`GecError`] umbrella

pub mod comfort;
pub mod diagnostics;
pub mod error;
pub mod params;
pub mod topology;

pub use comfort::{ComfortBreakpoints, ComfortSegment};
pub use diagnostics::{Concern, Diagnostics, Warning};
pub use error::{GecError, GecResult, ValidationError};
pub use params::{
    gas_flow_for_heat, price_bucket, CongestionSchedule, DeviceRatings, Horizon, NetworkParams,
    ParameterSet, PriceSeries, ThermalDynamics, ThermalParams, UserParams, WeatherSeries,
    STEPS_PER_DAY, STEPS_PER_HOUR, STEP_HOURS,
};
pub use topology::{Line, Topology, SLACK_BUS};
