//! Typed parameter groups for one day-ahead dispatch case.
//!
//! A [`ParameterSet`] is immutable once loaded. [`ParameterSet::validate`]
//! checks every series length, rating and the network topology, and returns
//! the indexed [`Topology`] that the model builders consume.
//!
//! Units: power in MW / MVAr, voltage in kV, current in kA, impedance in Ω,
//! heat in MW, temperature in °C.

use serde::{Deserialize, Serialize};

use crate::comfort::ComfortBreakpoints;
use crate::diagnostics::Diagnostics;
use crate::error::ValidationError;
use crate::topology::{Line, Topology, SLACK_BUS};

/// Length of one dispatch interval in hours.
pub const STEP_HOURS: f64 = 0.25;

/// Dispatch intervals per hourly price bucket.
pub const STEPS_PER_HOUR: usize = 4;

/// Steps in a full day at 15-minute resolution.
pub const STEPS_PER_DAY: usize = 96;

/// Gas flow (rate-equivalent units) needed for `heat_mw` of boiler output.
///
/// Mirrors the boiler conversion constraint `1000·h = 4·LHV·g`.
pub fn gas_flow_for_heat(heat_mw: f64, lhv_kwh_per_m3: f64) -> f64 {
    1000.0 * heat_mw / (STEPS_PER_HOUR as f64 * lhv_kwh_per_m3)
}

/// Hourly bucket that prices step `t`.
pub fn price_bucket(t: usize) -> usize {
    t / STEPS_PER_HOUR
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Horizon {
    pub steps: usize,
}

impl Default for Horizon {
    fn default() -> Self {
        Self {
            steps: STEPS_PER_DAY,
        }
    }
}

/// Lower bound on the slack-bus injection, tightened inside a window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CongestionSchedule {
    pub default_limit_mw: f64,
    pub window_limit_mw: f64,
    /// First step of the window (inclusive)
    pub window_start: usize,
    /// End of the window (exclusive)
    pub window_end: usize,
}

impl CongestionSchedule {
    pub fn limit_at(&self, t: usize) -> f64 {
        if (self.window_start..self.window_end).contains(&t) {
            self.window_limit_mw
        } else {
            self.default_limit_mw
        }
    }

    pub fn reference() -> Self {
        Self {
            default_limit_mw: -0.05,
            window_limit_mw: -0.1,
            window_start: 40,
            window_end: 48,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkParams {
    pub lines: Vec<Line>,
    /// Apparent power rating of the transformer in MVA
    pub trafo_capacity_mva: f64,
    /// Reference voltage magnitude at the slack bus in kV
    pub v_ref_kv: f64,
    pub v_lower_pu: f64,
    pub v_upper_pu: f64,
    pub congestion: CongestionSchedule,
}

impl NetworkParams {
    pub fn n_bus(&self) -> usize {
        self.lines.len() + 1
    }

    /// Squared slack voltage in kV².
    pub fn v_ref_sq(&self) -> f64 {
        self.v_ref_kv * self.v_ref_kv
    }

    /// Bounds on squared bus voltage in kV².
    pub fn v_sq_bounds(&self) -> (f64, f64) {
        let lo = self.v_lower_pu * self.v_ref_kv;
        let hi = self.v_upper_pu * self.v_ref_kv;
        (lo * lo, hi * hi)
    }
}

/// One household: connection bus, PV size and inflexible load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserParams {
    pub bus: usize,
    pub pv_capacity_mw: f64,
    pub owns_heat_pump: bool,
    pub baseload_p_mw: Vec<f64>,
    /// Empty means no reactive baseload
    #[serde(default)]
    pub baseload_q_mvar: Vec<f64>,
}

impl UserParams {
    pub fn baseload_q_at(&self, t: usize) -> f64 {
        self.baseload_q_mvar.get(t).copied().unwrap_or(0.0)
    }

    /// 1.0 when the household owns a heat pump, 0.0 otherwise.
    pub fn ownership(&self) -> f64 {
        if self.owns_heat_pump {
            1.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceRatings {
    pub hp_min_mw: f64,
    pub hp_max_mw: f64,
    pub cop: f64,
    pub boiler_min_mw: f64,
    pub boiler_max_mw: f64,
    pub gas_lhv_kwh_per_m3: f64,
    pub tan_phi_pv: f64,
    pub tan_phi_hp: f64,
}

impl DeviceRatings {
    /// `sqrt(1 - pf²) / pf`
    pub fn tan_phi_from_power_factor(pf: f64) -> f64 {
        (1.0 - pf * pf).sqrt() / pf
    }

    pub fn reference() -> Self {
        Self {
            hp_min_mw: 3e-3,
            hp_max_mw: 5e-3,
            cop: 4.5,
            boiler_min_mw: 1e-3,
            boiler_max_mw: 15e-3,
            gas_lhv_kwh_per_m3: 10.16,
            tan_phi_pv: Self::tan_phi_from_power_factor(0.95),
            tan_phi_hp: Self::tan_phi_from_power_factor(0.9),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let checks: [(&str, f64, f64); 2] = [
            ("devices.hp", self.hp_min_mw, self.hp_max_mw),
            ("devices.boiler", self.boiler_min_mw, self.boiler_max_mw),
        ];
        for (name, min, max) in checks {
            if !min.is_finite() || !max.is_finite() || min < 0.0 || min > max {
                return Err(ValidationError::InvalidRating {
                    name: name.to_string(),
                    reason: format!("need 0 <= min <= max, got min={min}, max={max}"),
                });
            }
        }
        for (name, value) in [
            ("devices.cop", self.cop),
            ("devices.gas_lhv_kwh_per_m3", self.gas_lhv_kwh_per_m3),
        ] {
            require_positive(name, value)?;
        }
        for (name, value) in [
            ("devices.tan_phi_pv", self.tan_phi_pv),
            ("devices.tan_phi_hp", self.tan_phi_hp),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::InvalidRating {
                    name: name.to_string(),
                    reason: "must be finite".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Hourly prices; step `t` uses bucket `t / 4`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    /// Electricity price per kWh
    pub electricity_hourly: Vec<f64>,
    /// Gas price per rate-equivalent unit
    pub gas_hourly: Vec<f64>,
    /// Penalty per PPD point per step
    pub comfort_price: f64,
}

impl PriceSeries {
    pub fn electricity_at(&self, t: usize) -> f64 {
        self.electricity_hourly[price_bucket(t)]
    }

    pub fn gas_at(&self, t: usize) -> f64 {
        self.gas_hourly[price_bucket(t)]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSeries {
    pub ambient_c: Vec<f64>,
    /// Fraction of installed PV capacity available per step
    pub pv_availability: Vec<f64>,
    /// Solar gain input of the state-space thermal model
    #[serde(default)]
    pub solar_irradiance: Vec<f64>,
}

/// Building thermal dynamics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ThermalDynamics {
    /// First-order lumped RC model
    Rc {
        capacitance_kwh_per_k: f64,
        resistance_k_per_kw: f64,
    },
    /// Identified 3-state model, state `(T_in, T_emission, T_envelope)`,
    /// input `(T_amb, heat_kw, solar)`. Only the indoor row is imposed.
    StateSpace {
        a: [[f64; 3]; 3],
        b: [[f64; 3]; 3],
        emission_temp_c: f64,
    },
}

impl ThermalDynamics {
    pub fn reference_rc() -> Self {
        ThermalDynamics::Rc {
            capacitance_kwh_per_k: 10.0 + 0.2 + 30.0,
            resistance_k_per_kw: 1.0 / (1.0 / 7.0 + 1.0 / 6.0 + 1.0 / 2.0),
        }
    }

    pub fn reference_state_space() -> Self {
        ThermalDynamics::StateSpace {
            a: [
                [0.975_423_437_233_804_1, 0.013_301_970_222_414_965, 0.004_636_748_139_716_821],
                [0.003_420_608_057_092_957_4, 0.996_477_256_023_124_9, 8.382_306_645_063_422e-6],
                [0.204_322_369_210_747_95, 0.001_436_410_630_836_898_7, 0.793_524_864_333_977],
            ],
            b: [
                [0.006_637_844_404_064_138, 0.002_245_983_298_958_080_5, 0.166_438_543_824_825_37],
                [9.375_361_313_721_34e-5, 2.650_514_114_774_541_8e-6, 0.006_442_730_239_255_753],
                [0.000_716_355_824_438_184_2, 0.828_949_695_673_272_6, 0.017_961_087_687_400_356],
            ],
            emission_temp_c: 25.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalParams {
    /// Measured indoor temperature before the first step
    pub initial_indoor_c: f64,
    pub dynamics: ThermalDynamics,
}

/// Complete input for one dispatch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    #[serde(default)]
    pub horizon: Horizon,
    pub network: NetworkParams,
    pub users: Vec<UserParams>,
    pub devices: DeviceRatings,
    pub prices: PriceSeries,
    pub weather: WeatherSeries,
    pub thermal: ThermalParams,
    #[serde(default)]
    pub comfort: ComfortBreakpoints,
}

impl ParameterSet {
    pub fn steps(&self) -> usize {
        self.horizon.steps
    }

    pub fn n_bus(&self) -> usize {
        self.network.n_bus()
    }

    pub fn n_users(&self) -> usize {
        self.users.len()
    }

    /// Check the whole case and index the network.
    ///
    /// Runs before any model is built; a failure here means the case cannot
    /// produce a well-defined dispatch model.
    pub fn validate(&self) -> Result<Topology, ValidationError> {
        let steps = self.horizon.steps;
        if steps == 0 {
            return Err(ValidationError::EmptyHorizon);
        }

        let topology = Topology::from_lines(&self.network.lines)?;
        self.validate_network()?;
        self.validate_users(topology.n_bus())?;
        self.devices.validate()?;

        let buckets = steps.div_ceil(STEPS_PER_HOUR);
        require_min_len("prices.electricity_hourly", &self.prices.electricity_hourly, buckets)?;
        require_min_len("prices.gas_hourly", &self.prices.gas_hourly, buckets)?;
        if !self.prices.comfort_price.is_finite() || self.prices.comfort_price < 0.0 {
            return Err(ValidationError::NegativeComfortPrice(self.prices.comfort_price));
        }

        require_len("weather.ambient_c", &self.weather.ambient_c, steps)?;
        require_len("weather.pv_availability", &self.weather.pv_availability, steps)?;

        match &self.thermal.dynamics {
            ThermalDynamics::Rc {
                capacitance_kwh_per_k,
                resistance_k_per_kw,
            } => {
                require_positive("thermal.capacitance_kwh_per_k", *capacitance_kwh_per_k)?;
                require_positive("thermal.resistance_k_per_kw", *resistance_k_per_kw)?;
            }
            ThermalDynamics::StateSpace { .. } => {
                require_len("weather.solar_irradiance", &self.weather.solar_irradiance, steps)?;
            }
        }
        if !self.thermal.initial_indoor_c.is_finite() {
            return Err(ValidationError::InvalidRating {
                name: "thermal.initial_indoor_c".to_string(),
                reason: "must be finite".to_string(),
            });
        }

        self.comfort.validate()?;
        Ok(topology)
    }

    /// Conditions that are legal but worth reporting.
    pub fn diagnose(&self) -> Diagnostics {
        let mut diag = Diagnostics::new();
        if !self.comfort.is_convex() {
            diag.comfort("comfort breakpoints are not convex; the PPD envelope under-estimates the curve");
        }
        if self.prices.comfort_price == 0.0 {
            diag.comfort("comfort price is zero; PPD values are not driven onto the envelope");
        }
        for (idx, user) in self.users.iter().enumerate() {
            if !user.owns_heat_pump && user.pv_capacity_mw == 0.0 {
                diag.household(idx, "household has neither heat pump nor PV");
            }
        }
        diag
    }

    /// Case built from the reference ratings on a chain feeder with one
    /// household per bus.
    ///
    /// Device, network and comfort values are the measured reference ones;
    /// the weather, load and price profiles are a smooth synthetic winter day.
    pub fn reference_case(n_users: usize) -> Self {
        let steps = STEPS_PER_DAY;
        let lines = (0..n_users)
            .map(|i| Line::new(i, i + 1, 0.05, 0.02, 0.2))
            .collect();

        let hourly_pv = [
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.006, 0.053, 0.129, 0.179, 0.166, 0.14, 0.094,
            0.046, 0.007, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
        ];
        let pv_availability = (0..steps).map(|t| hourly_pv[price_bucket(t)]).collect();
        let day_phase = |t: usize| (t as f64 / steps as f64) * std::f64::consts::TAU;
        let ambient_c = (0..steps)
            .map(|t| 4.0 - 3.0 * (day_phase(t)).cos())
            .collect();
        let solar_irradiance = (0..steps)
            .map(|t| hourly_pv[price_bucket(t)] * 5.0)
            .collect();

        let electricity_hourly = (0..24)
            .map(|h| if (17..21).contains(&h) { 0.38 } else { 0.24 })
            .collect();
        let gas_hourly = vec![1.1; 24];

        let users = (0..n_users)
            .map(|i| UserParams {
                bus: i + 1,
                pv_capacity_mw: 5e-3,
                owns_heat_pump: true,
                baseload_p_mw: (0..steps)
                    .map(|t| 4e-4 + 2e-4 * (1.0 - (day_phase(t)).cos()))
                    .collect(),
                baseload_q_mvar: vec![1e-4; steps],
            })
            .collect();

        Self {
            horizon: Horizon { steps },
            network: NetworkParams {
                lines,
                trafo_capacity_mva: 0.23 * 0.16 * 3.0,
                v_ref_kv: 0.23,
                v_lower_pu: 0.96,
                v_upper_pu: 1.04,
                congestion: CongestionSchedule::reference(),
            },
            users,
            devices: DeviceRatings::reference(),
            prices: PriceSeries {
                electricity_hourly,
                gas_hourly,
                comfort_price: 0.27,
            },
            weather: WeatherSeries {
                ambient_c,
                pv_availability,
                solar_irradiance,
            },
            thermal: ThermalParams {
                initial_indoor_c: 20.5,
                dynamics: ThermalDynamics::reference_rc(),
            },
            comfort: ComfortBreakpoints::reference(),
        }
    }

    /// Shorten every per-step series to the first `steps` entries.
    pub fn truncated(&self, steps: usize) -> Self {
        let mut case = self.clone();
        let steps = steps.min(self.horizon.steps);
        case.horizon.steps = steps;
        case.weather.ambient_c.truncate(steps);
        case.weather.pv_availability.truncate(steps);
        case.weather.solar_irradiance.truncate(steps);
        for user in &mut case.users {
            user.baseload_p_mw.truncate(steps);
            user.baseload_q_mvar.truncate(steps);
        }
        case.network.congestion.window_start = case.network.congestion.window_start.min(steps);
        case.network.congestion.window_end = case.network.congestion.window_end.min(steps);
        case
    }

    fn validate_network(&self) -> Result<(), ValidationError> {
        let net = &self.network;
        require_positive("network.trafo_capacity_mva", net.trafo_capacity_mva)?;
        require_positive("network.v_ref_kv", net.v_ref_kv)?;
        if !(net.v_lower_pu > 0.0 && net.v_lower_pu <= net.v_upper_pu && net.v_upper_pu.is_finite()) {
            return Err(ValidationError::InvalidRating {
                name: "network.voltage_band".to_string(),
                reason: format!(
                    "need 0 < lower <= upper, got [{}, {}]",
                    net.v_lower_pu, net.v_upper_pu
                ),
            });
        }
        let cong = &net.congestion;
        if cong.window_start > cong.window_end || cong.window_end > self.horizon.steps {
            return Err(ValidationError::CongestionWindow {
                start: cong.window_start,
                end: cong.window_end,
                steps: self.horizon.steps,
            });
        }
        if !cong.default_limit_mw.is_finite() || !cong.window_limit_mw.is_finite() {
            return Err(ValidationError::InvalidRating {
                name: "network.congestion".to_string(),
                reason: "limits must be finite".to_string(),
            });
        }
        Ok(())
    }

    fn validate_users(&self, n_bus: usize) -> Result<(), ValidationError> {
        let steps = self.horizon.steps;
        let mut owner: Vec<Option<usize>> = vec![None; n_bus];
        for (idx, user) in self.users.iter().enumerate() {
            if user.bus == SLACK_BUS || user.bus >= n_bus {
                return Err(ValidationError::UserBus {
                    user: idx,
                    bus: user.bus,
                });
            }
            if let Some(first) = owner[user.bus] {
                return Err(ValidationError::DuplicateUserBus {
                    bus: user.bus,
                    first,
                    second: idx,
                });
            }
            owner[user.bus] = Some(idx);

            if !user.pv_capacity_mw.is_finite() || user.pv_capacity_mw < 0.0 {
                return Err(ValidationError::InvalidRating {
                    name: format!("users[{idx}].pv_capacity_mw"),
                    reason: format!("must be non-negative, got {}", user.pv_capacity_mw),
                });
            }
            require_len(
                &format!("users[{idx}].baseload_p_mw"),
                &user.baseload_p_mw,
                steps,
            )?;
            if !user.baseload_q_mvar.is_empty() {
                require_len(
                    &format!("users[{idx}].baseload_q_mvar"),
                    &user.baseload_q_mvar,
                    steps,
                )?;
            }
        }
        Ok(())
    }
}

fn require_len(name: &str, series: &[f64], expected: usize) -> Result<(), ValidationError> {
    if series.len() != expected {
        return Err(ValidationError::SeriesLength {
            name: name.to_string(),
            expected,
            actual: series.len(),
        });
    }
    Ok(())
}

fn require_min_len(name: &str, series: &[f64], expected: usize) -> Result<(), ValidationError> {
    if series.len() < expected {
        return Err(ValidationError::SeriesLength {
            name: name.to_string(),
            expected,
            actual: series.len(),
        });
    }
    Ok(())
}

fn require_positive(name: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::InvalidRating {
            name: name.to_string(),
            reason: format!("must be positive, got {value}"),
        });
    }
    Ok(())
}
