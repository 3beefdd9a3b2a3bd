/// Grid emission factor used when none is configured, kg CO2e per kWh.
pub const DEFAULT_EMISSION_FACTOR: f64 = 0.82;

pub fn emissions_kg(total_kwh: f64, factor: f64) -> f64 {
    total_kwh * factor
}
