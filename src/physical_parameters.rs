//! Properties of the air column as functions of ambient conditions.
//!
//! Speed of sound follows Cramer (1993) for moist air with CO₂; density uses the
//! ideal-gas law on the moist-air molar mass; viscosity follows Sutherland's law.
//! The visco-thermal loss constant follows Keefe (1984):
//!
//! α₀ = √(η / (2ρc)) · (1 + (γ − 1)/ν)
//!
//! so that the attenuation in a tube of radius r at wave number k is α₀·√k / r.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Standard atmospheric pressure (kPa).
pub const STANDARD_PRESSURE_KPA: f64 = 101.325;

/// Typical indoor CO₂ mole fraction.
pub const DEFAULT_CO2_FRACTION: f64 = 0.000_39;

const KELVIN_OFFSET: f64 = 273.15;
const GAS_CONSTANT: f64 = 8.314_472;
const MOLAR_MASS_WATER: f64 = 0.018_015_28;

/// Ambient conditions for a study.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientConditions {
    /// Air temperature (°C)
    pub temperature: f64,
    /// Barometric pressure (kPa)
    pub pressure: f64,
    /// Relative humidity (0-1)
    pub humidity: f64,
    /// CO₂ mole fraction (0-1)
    pub co2_fraction: f64,
}

impl Default for AmbientConditions {
    fn default() -> Self {
        Self {
            temperature: 20.0,
            pressure: STANDARD_PRESSURE_KPA,
            humidity: 0.45,
            co2_fraction: DEFAULT_CO2_FRACTION,
        }
    }
}

impl AmbientConditions {
    pub fn new(temperature: f64, pressure: f64, humidity: f64, co2_fraction: f64) -> Self {
        Self {
            temperature,
            pressure,
            humidity,
            co2_fraction,
        }
    }

    /// Dry air at the given temperature and standard pressure.
    pub fn dry(temperature: f64) -> Self {
        Self {
            temperature,
            humidity: 0.0,
            ..Default::default()
        }
    }
}

/// Air properties derived from ambient conditions. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalParameters {
    conditions: AmbientConditions,
    /// Speed of sound (m/s)
    speed_of_sound: f64,
    /// Density (kg/m³)
    rho: f64,
    /// Dynamic viscosity (Pa·s)
    eta: f64,
    /// Ratio of specific heats
    gamma: f64,
    /// Square root of the Prandtl number
    nu: f64,
    /// Visco-thermal loss constant (√m)
    alpha_constant: f64,
}

impl Default for PhysicalParameters {
    fn default() -> Self {
        Self::new(AmbientConditions::default())
    }
}

impl PhysicalParameters {
    /// Compute air properties for the given conditions.
    pub fn new(conditions: AmbientConditions) -> Self {
        let t = conditions.temperature;
        let kelvin = t + KELVIN_OFFSET;
        let pressure_pa = conditions.pressure * 1000.0;
        let xw = water_vapour_fraction(t, pressure_pa, conditions.humidity);
        let xc = conditions.co2_fraction;

        let speed_of_sound = cramer_speed_of_sound(t, pressure_pa, xw, xc);

        let molar_mass_dry = 0.028_965_46 + 0.012_011 * (xc - 0.0004);
        let molar_mass = molar_mass_dry * (1.0 - xw) + MOLAR_MASS_WATER * xw;
        let rho = pressure_pa * molar_mass / (GAS_CONSTANT * kelvin);

        // Sutherland's law for air
        let eta = 1.458e-6 * kelvin.powf(1.5) / (kelvin + 110.4);

        // Keefe's linear fits around 26.85 °C
        let delta_t = t - 26.85;
        let gamma = 1.4017 * (1.0 - 0.000_02 * delta_t);
        let nu = 0.8410 * (1.0 - 0.0002 * delta_t);

        let alpha_constant = loss_constant(eta, rho, speed_of_sound, gamma, nu);

        Self {
            conditions,
            speed_of_sound,
            rho,
            eta,
            gamma,
            nu,
            alpha_constant,
        }
    }

    /// Dry air at the given temperature (°C), standard pressure.
    pub fn at_temperature(temperature: f64) -> Self {
        Self::new(AmbientConditions::dry(temperature))
    }

    /// Override the speed of sound, keeping the other properties consistent.
    pub fn with_speed_of_sound(mut self, speed_of_sound: f64) -> Self {
        self.speed_of_sound = speed_of_sound;
        self.alpha_constant =
            loss_constant(self.eta, self.rho, speed_of_sound, self.gamma, self.nu);
        self
    }

    /// Remove visco-thermal losses.
    pub fn lossless(mut self) -> Self {
        self.alpha_constant = 0.0;
        self
    }

    pub fn conditions(&self) -> &AmbientConditions {
        &self.conditions
    }

    pub fn speed_of_sound(&self) -> f64 {
        self.speed_of_sound
    }

    pub fn rho(&self) -> f64 {
        self.rho
    }

    pub fn eta(&self) -> f64 {
        self.eta
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn nu(&self) -> f64 {
        self.nu
    }

    pub fn alpha_constant(&self) -> f64 {
        self.alpha_constant
    }

    /// Wave number for a frequency: k = 2πf / c.
    pub fn calc_wave_number(&self, frequency: f64) -> f64 {
        2.0 * PI * frequency / self.speed_of_sound
    }

    /// Frequency for a wave number.
    pub fn calc_frequency(&self, wave_number: f64) -> f64 {
        wave_number * self.speed_of_sound / (2.0 * PI)
    }

    /// Characteristic impedance of a cylinder: Z₀ = ρc / (πr²).
    pub fn calc_z0(&self, radius: f64) -> f64 {
        self.rho * self.speed_of_sound / (PI * radius * radius)
    }

    /// Attenuation constant α = α₀·√k / r for a tube of the given radius.
    pub fn calc_loss(&self, wave_number: f64, radius: f64) -> f64 {
        self.alpha_constant * wave_number.sqrt() / radius
    }
}

fn loss_constant(eta: f64, rho: f64, c: f64, gamma: f64, nu: f64) -> f64 {
    (eta / (2.0 * rho * c)).sqrt() * (1.0 + (gamma - 1.0) / nu)
}

/// Mole fraction of water vapour (Giacomo / CIPM enhancement factor).
fn water_vapour_fraction(t: f64, pressure_pa: f64, humidity: f64) -> f64 {
    if humidity <= 0.0 {
        return 0.0;
    }
    let kelvin = t + KELVIN_OFFSET;
    let enhancement = 1.000_62 + 3.14e-8 * pressure_pa + 5.6e-7 * t * t;
    let saturation = (1.281_180_5e-5 * kelvin * kelvin - 1.950_987_4e-2 * kelvin
        + 34.049_260_34
        - 6.353_631_1e3 / kelvin)
        .exp();
    humidity * enhancement * saturation / pressure_pa
}

/// Cramer (1993) zero-frequency speed of sound in humid air with CO₂.
fn cramer_speed_of_sound(t: f64, p: f64, xw: f64, xc: f64) -> f64 {
    const A: [f64; 16] = [
        331.5024,
        0.603_055,
        -0.000_528,
        51.471_935,
        0.149_587_4,
        -0.000_782,
        -1.82e-7,
        3.73e-8,
        -2.93e-10,
        -85.209_31,
        -0.228_525,
        5.91e-5,
        -2.835_149,
        -2.15e-13,
        29.179_762,
        0.000_486,
    ];
    let t2 = t * t;
    A[0] + A[1] * t
        + A[2] * t2
        + (A[3] + A[4] * t + A[5] * t2) * xw
        + (A[6] + A[7] * t + A[8] * t2) * p
        + (A[9] + A[10] * t + A[11] * t2) * xc
        + A[12] * xw * xw
        + A[13] * p * p
        + A[14] * xc * xc
        + A[15] * xw * p * xc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_of_sound_at_room_temperature() {
        let params = PhysicalParameters::at_temperature(20.0);
        assert!(
            (params.speed_of_sound() - 343.3).abs() < 0.5,
            "c = {}",
            params.speed_of_sound()
        );
    }

    #[test]
    fn speed_of_sound_rises_with_temperature_and_humidity() {
        let cold = PhysicalParameters::at_temperature(10.0);
        let warm = PhysicalParameters::at_temperature(30.0);
        assert!(warm.speed_of_sound() > cold.speed_of_sound());

        let dry = PhysicalParameters::new(AmbientConditions::new(25.0, 101.325, 0.0, 0.0004));
        let humid = PhysicalParameters::new(AmbientConditions::new(25.0, 101.325, 1.0, 0.0004));
        assert!(humid.speed_of_sound() > dry.speed_of_sound());
        assert!(humid.rho() < dry.rho());
    }

    #[test]
    fn density_and_viscosity_are_plausible() {
        let params = PhysicalParameters::at_temperature(20.0);
        assert!((params.rho() - 1.204).abs() < 0.01, "rho = {}", params.rho());
        assert!((params.eta() - 1.81e-5).abs() < 0.05e-5, "eta = {}", params.eta());
        assert!(params.alpha_constant() > 0.0);
    }

    #[test]
    fn wave_number_round_trip() {
        let params = PhysicalParameters::default().with_speed_of_sound(345.0);
        let k = params.calc_wave_number(440.0);
        assert!((k - 2.0 * PI * 440.0 / 345.0).abs() < 1e-12);
        assert!((params.calc_frequency(k) - 440.0).abs() < 1e-9);
    }

    #[test]
    fn lossless_removes_attenuation() {
        let params = PhysicalParameters::default().lossless();
        assert_eq!(params.calc_loss(10.0, 0.01), 0.0);
    }
}
