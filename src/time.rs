//! # Time
//!
//! Julian dates, calendar conversions, sidereal time and the UTC/TT/UT1 offsets used by the frame
//! pipeline. Julian dates keep the whole day and the day fraction apart so that sub-millisecond
//! precision survives arithmetic on dates around 2.45 million days.

use std::f64::consts::TAU;

use chrono::prelude::*;
use chrono::{DateTime, Duration};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const DEG2RAD: f64 = std::f64::consts::PI / 180.0;

pub const SECONDS_PER_DAY: f64 = 86400.0;
pub const MINUTES_PER_DAY: f64 = 1440.0;
pub const DAYS_PER_CENTURY: f64 = 36525.0;

/// Julian date of the J2000.0 epoch.
pub const J2000: f64 = 2451545.0;

/// Julian date of 1949 December 31 00:00, the origin SGP-4 measures its epoch from.
pub const JD_1950: f64 = 2433281.5;

/// Difference between TT and TAI, in seconds.
const TT_MINUS_TAI: f64 = 32.184;

/// TAI - UTC from each leap second onwards, keyed by the UTC Julian date it takes effect.
const LEAP_SECONDS: [(f64, f64); 28] = [
    (2441317.5, 10.0), // 1972-01-01
    (2441499.5, 11.0), // 1972-07-01
    (2441683.5, 12.0), // 1973-01-01
    (2442048.5, 13.0), // 1974-01-01
    (2442413.5, 14.0), // 1975-01-01
    (2442778.5, 15.0), // 1976-01-01
    (2443144.5, 16.0), // 1977-01-01
    (2443509.5, 17.0), // 1978-01-01
    (2443874.5, 18.0), // 1979-01-01
    (2444239.5, 19.0), // 1980-01-01
    (2444786.5, 20.0), // 1981-07-01
    (2445151.5, 21.0), // 1982-07-01
    (2445516.5, 22.0), // 1983-07-01
    (2446247.5, 23.0), // 1985-07-01
    (2447161.5, 24.0), // 1988-01-01
    (2447892.5, 25.0), // 1990-01-01
    (2448257.5, 26.0), // 1991-01-01
    (2448804.5, 27.0), // 1992-07-01
    (2449169.5, 28.0), // 1993-07-01
    (2449534.5, 29.0), // 1994-07-01
    (2450083.5, 30.0), // 1996-01-01
    (2450630.5, 31.0), // 1997-07-01
    (2451179.5, 32.0), // 1999-01-01
    (2453736.5, 33.0), // 2006-01-01
    (2454832.5, 34.0), // 2009-01-01
    (2456109.5, 35.0), // 2012-07-01
    (2457204.5, 36.0), // 2015-07-01
    (2457754.5, 37.0), // 2017-01-01
];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimeError {
    #[error("Julian date {0} cannot be represented as a calendar date")]
    Unrepresentable(f64),
}

/// A Julian date split into its whole (half-integer) day and the fraction of a day.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JulianDate {
    pub jd: f64,
    pub fraction: f64,
}

/// A broken-down proleptic Gregorian date and time.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalendarTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: f64,
}

impl JulianDate {
    pub fn new(jd: f64, fraction: f64) -> JulianDate {
        JulianDate { jd, fraction }
    }

    /// The date as a single number. Loses precision; prefer `days_since` for differences.
    pub fn value(&self) -> f64 {
        self.jd + self.fraction
    }

    pub fn days_since(&self, other: &JulianDate) -> f64 {
        (self.jd - other.jd) + (self.fraction - other.fraction)
    }

    pub fn minutes_since(&self, other: &JulianDate) -> f64 {
        self.days_since(other) * MINUTES_PER_DAY
    }

    /// Julian centuries elapsed since J2000.0.
    pub fn centuries_since_j2000(&self) -> f64 {
        ((self.jd - J2000) + self.fraction) / DAYS_PER_CENTURY
    }

    pub fn add_days(&self, days: f64) -> JulianDate {
        let fraction = self.fraction + days;
        let whole = fraction.floor();
        JulianDate {
            jd: self.jd + whole,
            fraction: fraction - whole,
        }
    }

    pub fn add_minutes(&self, minutes: f64) -> JulianDate {
        self.add_days(minutes / MINUTES_PER_DAY)
    }

    pub fn add_seconds(&self, seconds: f64) -> JulianDate {
        self.add_days(seconds / SECONDS_PER_DAY)
    }

    /// Reinterpret a UTC date on the TT scale.
    pub fn to_tt(&self) -> JulianDate {
        self.add_seconds(tt_offset_seconds(self))
    }

    /// Reinterpret a UTC date on the UT1 scale, given UT1 - UTC in seconds.
    pub fn to_ut1(&self, ut1_utc: f64) -> JulianDate {
        self.add_seconds(ut1_utc)
    }

    pub fn to_calendar(&self) -> CalendarTime {
        julian_to_calendar(self)
    }

    pub fn from_datetime(t: &DateTime<Utc>) -> JulianDate {
        let seconds = t.second() as f64 + t.nanosecond() as f64 * 1e-9;
        calendar_to_julian(t.year(), t.month(), t.day(), t.hour(), t.minute(), seconds)
    }

    /// Convert to a `chrono` timestamp, rounded to the microsecond.
    pub fn to_datetime(&self) -> Result<DateTime<Utc>, TimeError> {
        let cal = self.to_calendar();
        let micros = (cal.second * 1e6).round() as i64;
        let naive = NaiveDate::from_ymd_opt(cal.year, cal.month, cal.day)
            .and_then(|d| d.and_hms_opt(cal.hour, cal.minute, 0))
            .ok_or(TimeError::Unrepresentable(self.value()))?;
        Ok(Utc.from_utc_datetime(&(naive + Duration::microseconds(micros))))
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn year_length(year: i32) -> u32 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

fn month_lengths(year: i32) -> [u32; 12] {
    let feb = if is_leap_year(year) { 29 } else { 28 };
    [31, feb, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
}

/// Fliegel & Van Flandern day number. Integer division truncates, as the algorithm requires.
fn day_number(year: i64, month: i64, day: i64) -> i64 {
    let a = (month - 14) / 12;
    (1461 * (year + 4800 + a)) / 4 + (367 * (month - 2 - 12 * a)) / 12
        - (3 * ((year + 4900 + a) / 100)) / 4
        + day
        - 32075
}

/// Convert a proleptic Gregorian date and time to a split Julian date.
///
/// No range checking is done, so out of range fields simply carry into the next unit.
pub fn calendar_to_julian(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: f64,
) -> JulianDate {
    let jd = day_number(year as i64, month as i64, day as i64) as f64 - 0.5;
    let fraction = (second + minute as f64 * 60.0 + hour as f64 * 3600.0) / SECONDS_PER_DAY;
    JulianDate { jd, fraction }
}

/// Convert a split Julian date back to a calendar date and time.
pub fn julian_to_calendar(date: &JulianDate) -> CalendarTime {
    let shifted = date.jd + 0.5;
    let mut whole = shifted.floor();
    let mut fraction = (shifted - whole) + date.fraction;
    let carry = fraction.floor();
    whole += carry;
    fraction -= carry;

    // Richards' inversion of the Gregorian day number.
    let j = whole as i64;
    let f = j + 1401 + (((4 * j + 274277) / 146097) * 3) / 4 - 38;
    let e = 4 * f + 3;
    let g = (e % 1461) / 4;
    let h = 5 * g + 2;
    let day = (h % 153) / 5 + 1;
    let month = (h / 153 + 2) % 12 + 1;
    let year = e / 1461 - 4716 + (12 + 2 - month) / 12;

    let seconds = fraction * SECONDS_PER_DAY;
    let hour = ((seconds / 3600.0).floor() as u32).min(23);
    let remainder = seconds - hour as f64 * 3600.0;
    let minute = ((remainder / 60.0).floor() as u32).min(59);
    let second = remainder - minute as f64 * 60.0;

    CalendarTime {
        year: year as i32,
        month: month as u32,
        day: day as u32,
        hour,
        minute,
        second,
    }
}

/// Convert a fractional day of year to month, day, hour, minute and second.
///
/// Day 1.0 is January 1st, 00:00. A day count past the end of the year rolls into the next one.
pub fn days_to_mdhms(year: i32, days: f64) -> CalendarTime {
    let mut year = year;
    let mut days = days;
    while days.floor() > year_length(year) as f64 {
        days -= year_length(year) as f64;
        year += 1;
    }

    let day_of_year = days.floor().max(0.0) as u32;
    let lengths = month_lengths(year);
    let mut month = 1;
    let mut elapsed = 0;
    while month < 12 && day_of_year > elapsed + lengths[month - 1] {
        elapsed += lengths[month - 1];
        month += 1;
    }

    let mut temp = (days - day_of_year as f64) * 24.0;
    let hour = temp.floor();
    temp = (temp - hour) * 60.0;
    let minute = temp.floor();
    let second = (temp - minute) * 60.0;

    CalendarTime {
        year,
        month: month as u32,
        day: day_of_year - elapsed,
        hour: hour as u32,
        minute: minute as u32,
        second,
    }
}

/// Greenwich mean sidereal time (IAU-82) in radians, for a UT1 Julian date.
pub fn gstime(jdut1: f64) -> f64 {
    let tut1 = (jdut1 - J2000) / DAYS_PER_CENTURY;
    let seconds = -6.2e-6 * tut1.powf(3.0)
        + 0.093104 * tut1 * tut1
        + (876600.0 * 3600.0 + 8640184.812866) * tut1
        + 67310.54841;
    // 240 seconds of time per degree
    let gst = (seconds * DEG2RAD / 240.0) % TAU;
    if gst < 0.0 {
        gst + TAU
    } else {
        gst
    }
}

/// TAI - UTC in seconds. Dates before 1972 use the initial 10 s offset.
pub fn leap_seconds(utc: &JulianDate) -> f64 {
    let t = utc.value();
    LEAP_SECONDS
        .iter()
        .rev()
        .find(|(start, _)| t >= *start)
        .map(|(_, offset)| *offset)
        .unwrap_or(LEAP_SECONDS[0].1)
}

/// TT - UTC in seconds.
pub fn tt_offset_seconds(utc: &JulianDate) -> f64 {
    leap_seconds(utc) + TT_MINUS_TAI
}
