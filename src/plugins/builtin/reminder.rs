// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! `reminder-plugin`: reminders announced while Echo is running
//!
//! Requests read like "call John in 30 minutes", "stretch at 3pm",
//! "call mom tomorrow at 9am" or "water plants daily at 7am". Without a
//! time the reminder is due in one hour. Reminders live in this process and
//! are dropped when it exits.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveTime};
use regex::Regex;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::brain::ToolArgs;
use crate::error::{EchoError, Result};
use crate::plugins::{CommandSpec, Plugin, PluginReply};

/// Delivers a due reminder to the user
pub type Notifier = Arc<dyn Fn(&str) + Send + Sync>;

const MAX_AMOUNT: i64 = 10_000;
const DUE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Announce reminders on stderr and in the log
pub fn terminal_notifier() -> Notifier {
    Arc::new(|message: &str| {
        tracing::info!("Reminder due: {}", message);
        eprintln!("\n⏰ Reminder: {}", message);
    })
}

/// When a reminder fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Schedule {
    pub due: DateTime<Local>,
    /// Fires again every 24 hours
    pub recurring: bool,
}

struct Reminder {
    id: u64,
    message: String,
    schedule: Schedule,
    task: JoinHandle<()>,
}

type Reminders = Arc<Mutex<Vec<Reminder>>>;

pub struct ReminderPlugin {
    notifier: Notifier,
    reminders: Reminders,
    next_id: AtomicU64,
}

impl ReminderPlugin {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            notifier,
            reminders: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    async fn add(&self, message: String, schedule: Schedule) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        // Held across the spawn so an immediately due task cannot finish
        // before its entry exists
        let mut reminders = self.reminders.lock().await;
        let task = tokio::spawn(fire(
            id,
            message.clone(),
            schedule,
            self.notifier.clone(),
            Arc::clone(&self.reminders),
        ));
        tracing::info!("Reminder {} set for {}: {}", id, schedule.due, message);
        reminders.push(Reminder {
            id,
            message,
            schedule,
            task,
        });
    }

    async fn remind_me(&self, args: &ToolArgs) -> PluginReply {
        let input = args
            .text(&["reminder", "text", "message"])
            .unwrap_or_default();
        match parse_request(&input, Local::now()) {
            Ok((message, schedule)) => {
                let reply = format!(
                    "Reminder set for {}{}: {}",
                    schedule.due.format(DUE_FORMAT),
                    if schedule.recurring { " (daily)" } else { "" },
                    message
                );
                self.add(message, schedule).await;
                PluginReply::ok(reply)
            }
            Err(e) => PluginReply::failed(e),
        }
    }

    async fn show(&self) -> PluginReply {
        let reminders = self.reminders.lock().await;
        if reminders.is_empty() {
            return PluginReply::ok("You have no active reminders.");
        }

        let mut pending: Vec<&Reminder> = reminders.iter().collect();
        pending.sort_by_key(|r| r.schedule.due);
        let list: Vec<String> = pending
            .iter()
            .enumerate()
            .map(|(i, r)| format!("{}. {} - {}", i + 1, r.message, r.schedule.due.format(DUE_FORMAT)))
            .collect();

        PluginReply::ok(format!(
            "You have {} reminder{}: {}",
            pending.len(),
            if pending.len() == 1 { "" } else { "s" },
            list.join(". ")
        ))
    }

    /// Cancel every pending reminder and return how many there were
    async fn cancel_all(&self) -> usize {
        let mut reminders = self.reminders.lock().await;
        for reminder in reminders.iter() {
            reminder.task.abort();
        }
        let count = reminders.len();
        reminders.clear();
        count
    }
}

async fn fire(id: u64, message: String, schedule: Schedule, notifier: Notifier, reminders: Reminders) {
    let mut due = schedule.due;
    loop {
        let wait = (due - Local::now()).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;
        notifier(&message);

        let mut reminders = reminders.lock().await;
        if !schedule.recurring {
            reminders.retain(|r| r.id != id);
            return;
        }
        due += Duration::days(1);
        if let Some(reminder) = reminders.iter_mut().find(|r| r.id == id) {
            reminder.schedule.due = due;
        }
    }
}

/// Split a request into what to remember and when.
pub(crate) fn parse_request(
    input: &str,
    now: DateTime<Local>,
) -> std::result::Result<(String, Schedule), String> {
    static REQUEST: OnceLock<Regex> = OnceLock::new();
    let request = REQUEST.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:remind\s+me\s+)?(?:to\s+)?(?P<what>.+?)(?:\s+(?P<when>in\s+\d+\s*[a-z]+|(?:(?:tomorrow|daily|every\s+day)\s+)?at\s+\d{1,2}(?::\d{2})?\s*(?:am|pm)?(?:\s+(?:daily|every\s+day))?))?\s*$",
        )
        .unwrap()
    });

    let Some(captures) = request.captures(input.trim()) else {
        return Err("Please specify what you want to be reminded about.".to_string());
    };
    let message = captures["what"].trim().to_string();

    let schedule = match captures.name("when") {
        Some(when) => parse_when(when.as_str(), now).ok_or_else(|| {
            format!("I couldn't understand when \"{}\" should be.", when.as_str())
        })?,
        None => Schedule {
            due: now + Duration::hours(1),
            recurring: false,
        },
    };
    Ok((message, schedule))
}

/// `in 30 minutes`, `at 3pm`, `tomorrow at 9:15`, `daily at 7am`
fn parse_when(when: &str, now: DateTime<Local>) -> Option<Schedule> {
    static RELATIVE: OnceLock<Regex> = OnceLock::new();
    static CLOCK: OnceLock<Regex> = OnceLock::new();
    let relative = RELATIVE.get_or_init(|| Regex::new(r"(?i)^in\s+(\d+)\s*([a-z]+)$").unwrap());
    let clock = CLOCK.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:(?P<prefix>tomorrow|daily|every\s+day)\s+)?at\s+(?P<hour>\d{1,2})(?::(?P<minute>\d{2}))?\s*(?P<meridiem>am|pm)?(?:\s+(?P<suffix>daily|every\s+day))?$",
        )
        .unwrap()
    });

    if let Some(captures) = relative.captures(when) {
        let amount: i64 = captures[1].parse().ok().filter(|n| *n <= MAX_AMOUNT)?;
        let unit = captures[2].to_lowercase();
        let seconds = match unit.as_str() {
            u if u == "s" || u.starts_with("sec") => 1,
            u if u == "m" || u.starts_with("min") => 60,
            u if u == "h" || u == "hr" || u == "hrs" || u.starts_with("hour") => 3600,
            u if u == "d" || u.starts_with("day") => 86_400,
            _ => return None,
        };
        return Some(Schedule {
            due: now + Duration::seconds(amount * seconds),
            recurring: false,
        });
    }

    let captures = clock.captures(when)?;
    let mut hour: u32 = captures["hour"].parse().ok()?;
    let minute: u32 = match captures.name("minute") {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    match captures.name("meridiem").map(|m| m.as_str().to_lowercase()) {
        Some(meridiem) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            if meridiem == "pm" && hour < 12 {
                hour += 12;
            } else if meridiem == "am" && hour == 12 {
                hour = 0;
            }
        }
        None if hour > 23 => return None,
        None => {}
    }
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;

    let prefix = captures.name("prefix").map(|m| m.as_str().to_lowercase());
    let tomorrow = prefix.as_deref() == Some("tomorrow");
    let recurring = captures.name("suffix").is_some() || (prefix.is_some() && !tomorrow);

    let mut date = now.date_naive();
    if tomorrow {
        date = date.succ_opt()?;
    }
    let mut due = date.and_time(time).and_local_timezone(Local).earliest()?;
    if !tomorrow && due <= now {
        due = (date.succ_opt()?)
            .and_time(time)
            .and_local_timezone(Local)
            .earliest()?;
    }
    Some(Schedule { due, recurring })
}

#[async_trait]
impl Plugin for ReminderPlugin {
    fn name(&self) -> &str {
        "reminder-plugin"
    }

    fn description(&self) -> &str {
        "Create and manage reminders through voice commands"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new(
                "remind_me",
                "Create a reminder with natural language (e.g., \"call John at 3pm\")",
            )
            .with_string_param(
                "reminder",
                "What to be reminded about and when, e.g. \"stretch in 30 minutes\"",
                true,
            ),
            CommandSpec::new("show_reminders", "Show all active reminders"),
            CommandSpec::new("clear_reminders", "Clear all reminders"),
        ]
    }

    async fn execute(&self, command: &str, args: &ToolArgs) -> Result<PluginReply> {
        match command {
            "remind_me" => Ok(self.remind_me(args).await),
            "show_reminders" => Ok(self.show().await),
            "clear_reminders" => {
                let count = self.cancel_all().await;
                Ok(PluginReply::ok(format!(
                    "Cleared {} reminder{}.",
                    count,
                    if count == 1 { "" } else { "s" }
                )))
            }
            other => Err(EchoError::Plugin(format!(
                "Unknown command '{}' for reminder-plugin",
                other
            ))),
        }
    }

    async fn cleanup(&self) -> Result<()> {
        let count = self.cancel_all().await;
        if count > 0 {
            tracing::info!("Dropped {} pending reminders", count);
        }
        Ok(())
    }
}
