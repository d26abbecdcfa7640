use std::str::FromStr as _;

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use sea_orm::{ConnectionTrait, DbErr, EntityTrait};
use tracing::warn;
use uuid::Uuid;

use crate::{clock::Clock, entity::{location, prelude::*}};

/// Maps a location to the civil zone its employees' days are counted in
#[derive(Debug, Clone, Copy)]
pub struct TimezoneResolver {
    default_zone: Tz,
}

impl TimezoneResolver {
    pub fn new(default_zone: Tz) -> Self {
        Self { default_zone }
    }

    pub fn default_zone(&self) -> Tz {
        self.default_zone
    }

    pub fn zone_of(&self, location: Option<&location::Model>) -> Tz {
        let Some(name) = location.and_then(|l| l.timezone.as_deref()) else {
            return self.default_zone;
        };

        match Tz::from_str(name.trim()) {
            Ok(zone) => zone,
            Err(_) => {
                warn!(timezone = name, "location carries an unknown timezone, using the default zone");
                self.default_zone
            }
        }
    }

    pub async fn timezone_for<C: ConnectionTrait>(&self, db: &C, location_id: Option<Uuid>) -> Result<Tz, DbErr> {
        let Some(location_id) = location_id else {
            return Ok(self.default_zone);
        };

        let location = Location::find_by_id(location_id).one(db).await?;

        Ok(self.zone_of(location.as_ref()))
    }

    pub fn now_in(&self, clock: &dyn Clock, zone: Tz) -> DateTime<Tz> {
        clock.now().with_timezone(&zone)
    }

    pub fn today_in(&self, clock: &dyn Clock, zone: Tz) -> NaiveDate {
        self.now_in(clock, zone).date_naive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone as _, Utc};

    use crate::clock::FixedClock;

    use super::*;

    fn location(timezone: Option<&str>) -> location::Model {
        location::Model {
            id: Uuid::new_v4(),
            created_at: Local::now().into(),
            updated_at: Local::now().into(),
            name: "Site".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            radius_km: 1.0,
            is_active: true,
            timezone: timezone.map(str::to_string),
            weekend_days: "sat,sun".to_string(),
            nilai_hk: 0.0,
        }
    }

    #[test]
    fn test_zone_of_falls_back_to_default() {
        let resolver = TimezoneResolver::new(chrono_tz::Asia::Jakarta);

        assert_eq!(resolver.zone_of(None), chrono_tz::Asia::Jakarta);
        assert_eq!(resolver.zone_of(Some(&location(None))), chrono_tz::Asia::Jakarta);
        assert_eq!(resolver.zone_of(Some(&location(Some("Mars/Olympus")))), chrono_tz::Asia::Jakarta);
        assert_eq!(resolver.zone_of(Some(&location(Some("Asia/Tokyo")))), chrono_tz::Asia::Tokyo);
    }

    #[test]
    fn test_today_is_local_to_the_zone() {
        let resolver = TimezoneResolver::new(chrono_tz::UTC);

        // 23:50 in Tokyo is still 14:50 of the same day in UTC, 00:10 in Tokyo is the previous day in UTC
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 3, 10, 14, 50, 0).unwrap());
        assert_eq!(resolver.today_in(&clock, chrono_tz::Asia::Tokyo), NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());

        clock.set(Utc.with_ymd_and_hms(2025, 3, 10, 15, 10, 0).unwrap());
        assert_eq!(resolver.today_in(&clock, chrono_tz::Asia::Tokyo), NaiveDate::from_ymd_opt(2025, 3, 11).unwrap());
        assert_eq!(resolver.today_in(&clock, chrono_tz::UTC), NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
    }
}
