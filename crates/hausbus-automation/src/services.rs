//! Read-only service provider boundaries (weather, energy cost, calendar)

use chrono::NaiveTime;
use std::sync::Arc;
use std::time::Duration;

/// Rough part of the day for temperature lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPeriod {
    Morning,
    Midday,
    Evening,
}

/// Weather lookups consumed by rules and scheduled tasks as pure data.
pub trait WeatherProvider: Send + Sync {
    fn temperature_today(&self, _period: DayPeriod) -> Option<f32> {
        None
    }

    /// Local sunrise/sunset window for today.
    fn daylight_window(&self) -> Option<(NaiveTime, NaiveTime)> {
        None
    }
}

/// Electricity pricing lookups.
pub trait EnergyPriceProvider: Send + Sync {
    fn price_per_kwh(&self) -> Option<f32> {
        None
    }

    /// Cost of running a load of `watts` for `duration` at the current price.
    fn running_cost(&self, watts: f32, duration: Duration) -> Option<f32> {
        self.price_per_kwh()
            .map(|price| price * watts / 1000.0 * duration.as_secs_f32() / 3600.0)
    }
}

/// Calendar availability lookups.
pub trait CalendarProvider: Send + Sync {
    fn is_available_now(&self) -> bool {
        false
    }
}

struct NoWeather;
impl WeatherProvider for NoWeather {}

struct NoEnergyPrice;
impl EnergyPriceProvider for NoEnergyPrice {}

struct NoCalendar;
impl CalendarProvider for NoCalendar {}

/// Bundle of all provider boundaries, defaulting to no-op lookups.
#[derive(Clone)]
pub struct ServiceProviders {
    weather: Arc<dyn WeatherProvider>,
    energy: Arc<dyn EnergyPriceProvider>,
    calendar: Arc<dyn CalendarProvider>,
}

impl ServiceProviders {
    pub fn new(
        weather: Arc<dyn WeatherProvider>,
        energy: Arc<dyn EnergyPriceProvider>,
        calendar: Arc<dyn CalendarProvider>,
    ) -> Self {
        Self {
            weather,
            energy,
            calendar,
        }
    }

    #[must_use]
    pub fn weather(&self) -> &dyn WeatherProvider {
        self.weather.as_ref()
    }

    #[must_use]
    pub fn energy(&self) -> &dyn EnergyPriceProvider {
        self.energy.as_ref()
    }

    #[must_use]
    pub fn calendar(&self) -> &dyn CalendarProvider {
        self.calendar.as_ref()
    }
}

impl Default for ServiceProviders {
    fn default() -> Self {
        Self {
            weather: Arc::new(NoWeather),
            energy: Arc::new(NoEnergyPrice),
            calendar: Arc::new(NoCalendar),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPrice(f32);
    impl EnergyPriceProvider for FixedPrice {
        fn price_per_kwh(&self) -> Option<f32> {
            Some(self.0)
        }
    }

    #[test]
    fn running_cost_derives_from_price() {
        let price = FixedPrice(0.30);
        // 1000 W for one hour at 0.30 per kWh.
        let cost = price
            .running_cost(1000.0, Duration::from_secs(3600))
            .unwrap();
        assert!((cost - 0.30).abs() < 1e-6);
    }

    #[test]
    fn defaults_answer_with_nothing() {
        let services = ServiceProviders::default();
        assert!(services.weather().temperature_today(DayPeriod::Morning).is_none());
        assert!(services.energy().price_per_kwh().is_none());
        assert!(!services.calendar().is_available_now());
    }
}
