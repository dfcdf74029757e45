//! Time module for Vesper scripts.
//!
//! Exposes calendar operations as native functions:
//! - `now`: current local time
//! - `date`: local time from components
//! - `unix`: local time from epoch seconds
//! - `sleep`: block for a number of milliseconds
//!
//! Times are plain objects carrying `Year`, `Month`, `Day`, `Hour`,
//! `Minute`, `Second` and `Nanosecond` fields. Their behaviour comes entirely
//! from meta-methods: `__string` renders RFC 3339, `__int` and `__float`
//! give epoch seconds and `__cmp` orders them chronologically.

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use chrono::{
    DateTime, Datelike, Local, NaiveDate, NaiveDateTime, SecondsFormat, TimeDelta, TimeZone,
    Timelike,
};
use thiserror::Error;
use tracing::trace;
use vesper_core::{Converter, Ctx, Func, Object, RuntimeError, Value};

/// Upper bound of a single uninterrupted wait inside `sleep`.
const SLEEP_SLICE: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum TimeError {
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("timestamp out of range: {0}")]
    InvalidTimestamp(i64),
}

// ---------------------------------------------------------------------------
// TimeTool enum
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeTool {
    Now,
    Date,
    Unix,
    Sleep,
}

impl TimeTool {
    const ALL: [TimeTool; 4] = [TimeTool::Now, TimeTool::Date, TimeTool::Unix, TimeTool::Sleep];

    fn tool_name(&self) -> &'static str {
        match self {
            TimeTool::Now => "now",
            TimeTool::Date => "date",
            TimeTool::Unix => "unix",
            TimeTool::Sleep => "sleep",
        }
    }
}

// ---------------------------------------------------------------------------
// TimeMod
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
pub struct TimeMod;

impl TimeMod {
    pub fn new() -> Self {
        Self
    }

    /// Current local time.
    pub fn now(&self) -> Value {
        Value::Object(time_object(Local::now()))
    }

    /// Local time from `year` and optional `month, day, hour, minute,
    /// second, nanosecond`. Month and day default to 1, the rest to 0.
    /// Components outside their usual range carry into the neighbouring
    /// unit: month 13 is January of the next year, hour -1 the last hour of
    /// the previous day.
    pub fn date(&self, ctx: &Ctx, args: &[Value]) -> Result<Value, RuntimeError> {
        let mut parts = [0, 1, 1, 0, 0, 0, 0];
        parts[0] = arg(args).int(ctx)?;
        for (i, slot) in parts.iter_mut().enumerate().skip(1) {
            match args.get(i) {
                None | Some(Value::Nil) => {}
                Some(v) => *slot = v.int(ctx)?,
            }
        }
        let invalid = || {
            let [y, mo, d, h, mi, s, ns] = parts;
            RuntimeError::host(TimeError::InvalidDate(format!(
                "{}-{:02}-{:02} {:02}:{:02}:{:02}.{:09}",
                y, mo, d, h, mi, s, ns
            )))
        };
        let naive = normalize(parts).ok_or_else(invalid)?;
        // A wall-clock time skipped by a DST change moves forward an hour.
        let t = Local
            .from_local_datetime(&naive)
            .earliest()
            .or_else(|| {
                let shifted = naive.checked_add_signed(TimeDelta::hours(1))?;
                Local.from_local_datetime(&shifted).earliest()
            })
            .ok_or_else(invalid)?;
        Ok(Value::Object(time_object(t)))
    }

    /// Local time from a count of seconds since the Unix epoch.
    pub fn unix(&self, ctx: &Ctx, seconds: &Value) -> Result<Value, RuntimeError> {
        let secs = seconds.int(ctx)?;
        let t = Local
            .timestamp_opt(secs, 0)
            .single()
            .ok_or_else(|| RuntimeError::host(TimeError::InvalidTimestamp(secs)))?;
        Ok(Value::Object(time_object(t)))
    }

    /// Block for `ms` milliseconds, waking early with an error when the
    /// context is cancelled or its deadline passes.
    pub fn sleep(&self, ctx: &Ctx, ms: &Value) -> Result<Value, RuntimeError> {
        let ms = ms.int(ctx)?;
        let until = Instant::now() + Duration::from_millis(u64::try_from(ms).unwrap_or(0));
        trace!(ms, "sleeping");
        loop {
            ctx.check()?;
            let now = Instant::now();
            if now >= until {
                return Ok(Value::Nil);
            }
            let mut step = (until - now).min(SLEEP_SLICE);
            if let Some(left) = ctx.remaining() {
                step = step.min(left);
            }
            std::thread::sleep(step);
        }
    }

    /// An object exposing the module's functions by name.
    pub fn module(&self) -> Object {
        let tm = *self;
        let m = Object::new();
        for tool in TimeTool::ALL {
            let name = tool.tool_name();
            let f = match tool {
                TimeTool::Now => Func::native(name, move |_, _| Ok(tm.now())),
                TimeTool::Date => Func::native(name, move |ctx, args| tm.date(ctx, args)),
                TimeTool::Unix => Func::native(name, move |ctx, args| tm.unix(ctx, &arg(args))),
                TimeTool::Sleep => Func::native(name, move |ctx, args| tm.sleep(ctx, &arg(args))),
            };
            m.set(name, f);
        }
        m
    }
}

fn arg(args: &[Value]) -> Value {
    args.first().cloned().unwrap_or_default()
}

/// Calendar arithmetic on `[year, month, day, hour, minute, second,
/// nanosecond]`, carrying overflow into the next larger unit. `None` when
/// the result is outside the representable range.
fn normalize(parts: [i64; 7]) -> Option<NaiveDateTime> {
    let [year, month, day, hour, minute, second, nanos] = parts;
    let months = year.checked_mul(12)?.checked_add(month.checked_sub(1)?)?;
    let y = i32::try_from(months.div_euclid(12)).ok()?;
    let m = u32::try_from(months.rem_euclid(12) + 1).ok()?;
    let mut t = NaiveDate::from_ymd_opt(y, m, 1)?.and_hms_opt(0, 0, 0)?;
    let deltas = [
        TimeDelta::try_days(day.checked_sub(1)?)?,
        TimeDelta::try_hours(hour)?,
        TimeDelta::try_minutes(minute)?,
        TimeDelta::try_seconds(second)?,
        TimeDelta::nanoseconds(nanos),
    ];
    for delta in deltas {
        t = t.checked_add_signed(delta)?;
    }
    Some(t)
}

// ---------------------------------------------------------------------------
// Time objects
// ---------------------------------------------------------------------------

/// Build the script object representing `t`.
pub fn time_object(t: DateTime<Local>) -> Object {
    let o = Object::new();
    o.set("Year", t.year());
    o.set("Month", f64::from(t.month()));
    o.set("Day", f64::from(t.day()));
    o.set("Hour", f64::from(t.hour()));
    o.set("Minute", f64::from(t.minute()));
    o.set("Second", f64::from(t.second()));
    o.set("Nanosecond", f64::from(t.nanosecond()));

    o.set(
        "__string",
        Func::native("time.string", move |_, _| {
            Ok(Value::from(t.to_rfc3339_opts(SecondsFormat::Secs, true)))
        }),
    );
    o.set(
        "__int",
        Func::native("time.int", move |_, _| Ok(Value::from(t.timestamp()))),
    );
    o.set(
        "__float",
        Func::native("time.float", move |_, _| {
            let frac = f64::from(t.timestamp_subsec_nanos()) / 1e9;
            Ok(Value::Number(t.timestamp() as f64 + frac))
        }),
    );
    o.set(
        "__cmp",
        Func::native("time.cmp", move |ctx, args| {
            let other = instant_of(ctx, &arg(args))?;
            let is_left = args.get(1).map(|v| v.bool(ctx)).transpose()?.unwrap_or(true);
            let mut ord = (t.timestamp(), t.timestamp_subsec_nanos()).cmp(&other);
            if !is_left {
                ord = ord.reverse();
            }
            Ok(Value::Number(match ord {
                Ordering::Less => -1.0,
                Ordering::Equal => 0.0,
                Ordering::Greater => 1.0,
            }))
        }),
    );
    o
}

/// Epoch seconds and sub-second nanos of a time object, or of a plain
/// number of epoch seconds.
fn instant_of(ctx: &Ctx, v: &Value) -> Result<(i64, u32), RuntimeError> {
    match v.as_object() {
        Some(o) => {
            let secs = v.int(ctx)?;
            let nanos = match o.get_str("Nanosecond") {
                Some(n) => n.int(ctx)?,
                None => 0,
            };
            Ok((secs, u32::try_from(nanos).unwrap_or(0)))
        }
        None => {
            let f = v.float(ctx)?;
            let secs = f.floor();
            Ok((secs as i64, ((f - secs) * 1e9) as u32))
        }
    }
}
