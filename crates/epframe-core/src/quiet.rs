use std::fmt;
use std::str::FromStr;

use chrono::Timelike;
use serde::Serialize;

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// A wall-clock time truncated to the minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
	hour: u8,
	minute: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeParseError {
	#[error("expected HH:MM, got {0:?}")]
	Format(String),
	#[error("time out of range: {hour:02}:{minute:02}")]
	Range { hour: u32, minute: u32 },
}

impl TimeOfDay {
	pub fn new(hour: u8, minute: u8) -> Option<Self> {
		if hour < 24 && minute < 60 {
			Some(Self { hour, minute })
		} else {
			None
		}
	}

	pub fn from_minutes(minutes: u16) -> Option<Self> {
		if minutes >= MINUTES_PER_DAY {
			return None;
		}
		Some(Self {
			hour: (minutes / 60) as u8,
			minute: (minutes % 60) as u8,
		})
	}

	pub fn hour(&self) -> u8 {
		self.hour
	}

	pub fn minute(&self) -> u8 {
		self.minute
	}

	pub fn minutes_since_midnight(&self) -> u16 {
		self.hour as u16 * 60 + self.minute as u16
	}
}

impl<T: Timelike> From<&T> for TimeOfDay {
	fn from(t: &T) -> Self {
		Self {
			hour: t.hour() as u8,
			minute: t.minute() as u8,
		}
	}
}

impl FromStr for TimeOfDay {
	type Err = TimeParseError;

	/// Accepts `H:MM` or `HH:MM`; anything after a second colon is ignored.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut parts = s.trim().split(':');
		let (Some(h), Some(m)) = (parts.next(), parts.next()) else {
			return Err(TimeParseError::Format(s.to_string()));
		};
		let hour: u32 = h.trim().parse().map_err(|_| TimeParseError::Format(s.to_string()))?;
		let minute: u32 = m.trim().parse().map_err(|_| TimeParseError::Format(s.to_string()))?;
		if hour >= 24 || minute >= 60 {
			return Err(TimeParseError::Range { hour, minute });
		}
		Ok(Self {
			hour: hour as u8,
			minute: minute as u8,
		})
	}
}

impl fmt::Display for TimeOfDay {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:02}:{:02}", self.hour, self.minute)
	}
}

impl Serialize for TimeOfDay {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

/// The daily span during which rotation is suppressed.
///
/// `evening == morning` covers the whole day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuietWindow {
	pub evening: TimeOfDay,
	pub morning: TimeOfDay,
}

impl QuietWindow {
	pub fn new(evening: TimeOfDay, morning: TimeOfDay) -> Self {
		Self { evening, morning }
	}

	pub fn crosses_midnight(&self) -> bool {
		self.evening >= self.morning
	}

	pub fn contains(&self, now: TimeOfDay) -> bool {
		in_quiet_window(now, *self)
	}
}

impl fmt::Display for QuietWindow {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}-{}", self.evening, self.morning)
	}
}

pub fn in_quiet_window(now: TimeOfDay, window: QuietWindow) -> bool {
	let QuietWindow { evening, morning } = window;
	if evening < morning {
		evening <= now && now < morning
	} else {
		now >= evening || now < morning
	}
}

/// Quiet state for an optional window; no window is never quiet.
pub fn is_quiet(now: TimeOfDay, window: Option<&QuietWindow>) -> bool {
	window.is_some_and(|w| w.contains(now))
}

pub trait Clock {
	fn now(&self) -> TimeOfDay;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
	fn now(&self) -> TimeOfDay {
		TimeOfDay::from(&chrono::Local::now())
	}
}
