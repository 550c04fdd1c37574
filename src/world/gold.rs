//! Per-room gold drawn from a clamped normal distribution.

use rand::Rng;
use std::f64::consts::PI;

use crate::config::GoldConfig;
use crate::world::types::{CoinConfig, Room};

pub struct GoldDistributor<'a> {
    config: &'a GoldConfig,
}

impl<'a> GoldDistributor<'a> {
    pub fn new(config: &'a GoldConfig) -> Self {
        Self { config }
    }

    /// One standard normal deviate via Box–Muller.
    fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
        // 1 - [0,1) keeps u1 away from zero so ln stays finite.
        let u1: f64 = 1.0 - rng.gen::<f64>();
        let u2: f64 = rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    /// Gold for one room, always within `[min, max]`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        let raw = self.config.mean + self.config.stddev * Self::standard_normal(rng);
        let rounded = raw.round();
        let clamped = rounded.clamp(self.config.min as f64, self.config.max as f64);
        clamped as u32
    }

    /// Assign a coin config to every room; a `respawn_chance` share of rooms respawn.
    pub fn distribute<'r, R, I>(&self, rooms: I, rng: &mut R)
    where
        R: Rng + ?Sized,
        I: IntoIterator<Item = &'r mut Room>,
    {
        for room in rooms {
            let amount = self.sample(rng);
            room.coins = if rng.gen_bool(self.config.respawn_chance.clamp(0.0, 1.0)) {
                CoinConfig::respawning(amount, self.config.default_respawn_secs)
            } else {
                CoinConfig::initial_only(amount)
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::types::SpawnType;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn samples_stay_in_bounds_and_centre_on_mean() {
        let config = GoldConfig {
            min: 2,
            mean: 12.0,
            stddev: 6.0,
            max: 30,
            ..GoldConfig::default()
        };
        let gold = GoldDistributor::new(&config);
        let mut rng = StdRng::seed_from_u64(42);
        let samples: Vec<u32> = (0..20_000).map(|_| gold.sample(&mut rng)).collect();
        assert!(samples.iter().all(|g| (2..=30).contains(g)));
        let mean = samples.iter().map(|&g| g as f64).sum::<f64>() / samples.len() as f64;
        assert!((mean - 12.0).abs() < 0.5, "mean drifted to {}", mean);
    }

    #[test]
    fn zero_stddev_is_constant() {
        let config = GoldConfig {
            stddev: 0.0,
            mean: 7.0,
            ..GoldConfig::default()
        };
        let gold = GoldDistributor::new(&config);
        let mut rng = StdRng::seed_from_u64(3);
        assert!((0..100).all(|_| gold.sample(&mut rng) == 7));
    }

    #[test]
    fn respawn_share_follows_chance() {
        let config = GoldConfig {
            respawn_chance: 1.0,
            default_respawn_secs: 45,
            ..GoldConfig::default()
        };
        let mut rooms: Vec<Room> = (0..10)
            .map(|i| Room::new(&format!("room_{}", i), "Room", ""))
            .collect();
        let mut rng = StdRng::seed_from_u64(9);
        GoldDistributor::new(&config).distribute(rooms.iter_mut(), &mut rng);
        for room in &rooms {
            assert_eq!(room.coins.spawn_type, SpawnType::RespawnTimer);
            assert_eq!(room.coins.respawn_interval_secs, 45);
        }
    }
}
