//! Calendar Context
//!
//! Date-keyed lookup with no state: meteorological season (northern
//! hemisphere), major holidays in a +/- 3 day window with relative timing,
//! the exact-date fun observance, and seasonal suggestion heuristics. The
//! result is prompting context for the creative director.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::observances::observance_for;

/// Meteorological season, northern hemisphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub fn for_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
        }
    }
}

/// Everything the creative director needs to pick a timely theme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarContext {
    pub date: NaiveDate,
    pub season: Season,
    /// Holidays within +/- 3 days, annotated with relative timing,
    /// e.g. "Christmas Day (2 days away)". Empty windows render as
    /// "None nearby" in the prompt.
    pub major_holidays: Vec<String>,
    /// Niche observance matching the exact date, if any.
    pub fun_observance: Option<String>,
    /// Creative prompt triggers derived from the season and observance.
    pub suggestion_heuristics: Vec<String>,
}

impl CalendarContext {
    /// Render the context as prompt lines for the ideation stage.
    pub fn render(&self) -> String {
        let holidays = if self.major_holidays.is_empty() {
            "None nearby".to_string()
        } else {
            self.major_holidays.join("; ")
        };
        let observance = self
            .fun_observance
            .as_deref()
            .unwrap_or("None specific today");
        let mut lines = vec![
            format!("Current date: {}", self.date),
            format!("Season: {}", self.season.as_str()),
            format!("Major holidays: {}", holidays),
            format!("Fun observance: {}", observance),
        ];
        if !self.suggestion_heuristics.is_empty() {
            lines.push(format!(
                "Suggestions: {}",
                self.suggestion_heuristics.join("; ")
            ));
        }
        lines.join("\n")
    }
}

/// Resolve the calendar context for a date. Pure lookup.
pub fn events(date: NaiveDate) -> CalendarContext {
    let season = Season::for_month(date.month());

    // Window of 3 days before through 3 days after, so a run can plan
    // slightly ahead or cover a just-passed event.
    let mut major_holidays = Vec::new();
    for offset in -3i64..=3 {
        let check = match offset {
            0 => date,
            _ => match date.checked_add_signed(chrono::Duration::days(offset)) {
                Some(d) => d,
                None => continue,
            },
        };
        for name in holidays_on(check) {
            let status = match offset {
                0 => "Today".to_string(),
                o if o < 0 => format!("{} days ago", -o),
                o => format!("{} days away", o),
            };
            major_holidays.push(format!("{} ({})", name, status));
        }
    }

    let fun_observance = observance_for(date.month(), date.day()).map(str::to_string);

    let mut suggestion_heuristics = Vec::new();
    match season {
        Season::Winter => suggestion_heuristics
            .push("Snow, cozy indoors, warm clothes, ice sports".to_string()),
        Season::Summer => {
            suggestion_heuristics.push("Beach, sun, camping, insects, ice cream".to_string())
        }
        _ => {}
    }
    if let Some(obs) = &fun_observance {
        suggestion_heuristics.push(format!("Create something related to {}", obs));
    }

    CalendarContext {
        date,
        season,
        major_holidays,
        fun_observance,
        suggestion_heuristics,
    }
}

/// Major holidays falling on an exact date. Administrative holidays with
/// little child appeal (Veterans Day, Columbus Day) are left out.
fn holidays_on(date: NaiveDate) -> Vec<&'static str> {
    let mut names = Vec::new();
    let (year, month, day) = (date.year(), date.month(), date.day());

    for (m, d, name) in FIXED_HOLIDAYS {
        if *m == month && *d == day {
            names.push(*name);
        }
    }

    // Movable US holidays.
    if nth_weekday(year, 1, Weekday::Mon, 3) == Some(date) {
        names.push("Martin Luther King Jr. Day");
    }
    if last_weekday(year, 5, Weekday::Mon) == Some(date) {
        names.push("Memorial Day");
    }
    if nth_weekday(year, 9, Weekday::Mon, 1) == Some(date) {
        names.push("Labor Day");
    }
    if nth_weekday(year, 11, Weekday::Thu, 4) == Some(date) {
        names.push("Thanksgiving");
    }

    names
}

const FIXED_HOLIDAYS: &[(u32, u32, &str)] = &[
    (1, 1, "New Year's Day"),
    (2, 14, "Valentine's Day"),
    (3, 17, "St. Patrick's Day"),
    (6, 19, "Juneteenth"),
    (7, 4, "Independence Day"),
    (10, 31, "Halloween"),
    (12, 25, "Christmas Day"),
    (12, 31, "New Year's Eve"),
];

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, 5)
        .or_else(|| NaiveDate::from_weekday_of_month_opt(year, month, weekday, 4))
}
