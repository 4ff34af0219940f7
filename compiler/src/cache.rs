// cache.rs — Sensor read-cache allocation
//
// A sensor read more often than its minimum update period goes through a
// numbered cache slot instead of the hardware. Slots are handed out from one
// session-wide counter in discovery order and are never reassigned.

use crate::component::Component;
use crate::usecase::Schedule;

#[derive(Debug, Clone)]
pub struct CacheAllocator {
    next_slot: u32,
    /// How often the control layer re-evaluates conditions, in milliseconds.
    condition_eval_period: u64,
}

impl CacheAllocator {
    pub fn new(condition_eval_period: u64) -> Self {
        CacheAllocator {
            next_slot: 0,
            condition_eval_period,
        }
    }

    /// Number of slots handed out so far.
    pub fn slots_used(&self) -> u32 {
        self.next_slot
    }

    /// Assign a slot if any use-case samples faster than the sensor allows.
    /// Returns the sensor's slot, if it has one.
    pub fn check_use_cases(&mut self, sensor: &mut Component) -> Option<u32> {
        let fastest = sensor
            .use_cases
            .iter()
            .filter_map(|uc| match uc.schedule {
                Schedule::Period(ms) => Some(ms),
                _ => None,
            })
            .min();
        self.check(sensor, fastest)
    }

    /// Assign a slot if the sensor is read inside conditions that are
    /// evaluated faster than the sensor allows.
    pub fn check_condition_read(&mut self, sensor: &mut Component) -> Option<u32> {
        let period = self.condition_eval_period;
        self.check(sensor, Some(period))
    }

    fn check(&mut self, sensor: &mut Component, read_period: Option<u64>) -> Option<u32> {
        let name = sensor.name.clone();
        let state = sensor.sensor_mut()?;
        if state.cache_slot.is_some() {
            return state.cache_slot;
        }
        if read_period.is_some_and(|p| p < state.min_update_period) {
            let slot = self.next_slot;
            self.next_slot += 1;
            state.cache_slot = Some(slot);
            tracing::debug!(sensor = %name, slot, "read cache slot assigned");
        }
        state.cache_slot
    }
}
