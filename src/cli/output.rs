use ansi_term::{Colour, Style};

use crate::daemon::storage::{
    entities::{Counter, DailyRecord},
    tracker::Increment,
};

fn paint(styled: bool, style: Style, text: impl AsRef<str>) -> String {
    if styled {
        style.paint(text.as_ref()).to_string()
    } else {
        text.as_ref().to_string()
    }
}

fn progress_bar(value: u32, goal: u32) -> String {
    (0..goal)
        .map(|i| if i < value { '■' } else { '□' })
        .collect()
}

/// Today's record as shown by `status`.
pub fn render_status(record: &DailyRecord, styled: bool) -> String {
    let mut lines = vec![paint(
        styled,
        Style::new().bold(),
        format!("Daily tracker for {}", record.date),
    )];

    let creatine = if record.creatine_taken {
        paint(styled, Colour::Green.normal(), "taken")
    } else {
        paint(styled, Colour::Red.normal(), "not taken")
    };
    lines.push(format!("  {:<14}{creatine}", "Creatine"));

    for counter in Counter::ALL {
        let value = record.count(counter);
        let colour = if record.goal_reached(counter) {
            Colour::Green
        } else {
            Colour::Yellow
        };
        lines.push(format!(
            "  {:<14}{} {value}/{}",
            counter.label(),
            paint(styled, colour.normal(), progress_bar(value, counter.goal())),
            counter.goal()
        ));
    }
    lines.join("\n")
}

pub fn creatine_message(taken: bool) -> &'static str {
    if taken {
        "✅ Creatine marked as taken!"
    } else {
        "Creatine marked as not taken"
    }
}

pub fn increment_message(increment: &Increment) -> String {
    let (added, noun) = match increment.counter {
        Counter::WaterBottles => ("Added water bottle", "water"),
        Counter::SunscreenApplications => ("Added sunscreen application", "sunscreen"),
    };
    let goal = increment.counter.goal();

    if !increment.applied {
        return format!(
            "Daily {noun} goal already reached ({}/{goal}), nothing to add",
            increment.value()
        );
    }

    let mut message = format!("{added} #{}", increment.value());
    if increment.reached_goal() {
        message.push_str(&format!("\n🎉 Daily {noun} goal achieved!"));
    }
    message
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::daemon::storage::{
        entities::{Counter, DailyRecord},
        tracker::Increment,
    };

    use super::{increment_message, render_status};

    fn record() -> DailyRecord {
        DailyRecord::new_for(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    #[test]
    fn test_plain_status() {
        let mut record = record();
        record.creatine_taken = true;
        record.water_bottles = 2;
        record.sunscreen_applications = 3;

        assert_eq!(
            render_status(&record, false),
            "Daily tracker for 2024-06-01\n\
             \x20 Creatine      taken\n\
             \x20 Water bottles ■■□□□□ 2/6\n\
             \x20 Sunscreen     ■■■ 3/3"
        );
    }

    #[test]
    fn test_styled_status_keeps_content() {
        let styled = render_status(&record(), true);
        assert!(styled.contains("\u{1b}["));
        assert!(styled.contains("not taken"));
        assert!(styled.contains("0/6"));
    }

    #[test]
    fn test_increment_messages() {
        let mut record = record();
        record.water_bottles = 3;
        let added = Increment {
            counter: Counter::WaterBottles,
            applied: true,
            record: record.clone(),
        };
        assert_eq!(increment_message(&added), "Added water bottle #3");

        record.sunscreen_applications = 3;
        let reached = Increment {
            counter: Counter::SunscreenApplications,
            applied: true,
            record: record.clone(),
        };
        assert_eq!(
            increment_message(&reached),
            "Added sunscreen application #3\n🎉 Daily sunscreen goal achieved!"
        );

        let ignored = Increment {
            counter: Counter::SunscreenApplications,
            applied: false,
            record,
        };
        assert_eq!(
            increment_message(&ignored),
            "Daily sunscreen goal already reached (3/3), nothing to add"
        );
    }
}
