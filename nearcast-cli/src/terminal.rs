use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Local;
use nearcast_core::{WeatherDisplay, WeatherScreen};

/// The weather screen drawn on stdout; busy state and notices go to stderr.
#[derive(Debug, Default)]
pub struct TerminalScreen {
    busy: AtomicBool,
}

impl TerminalScreen {
    /// Whether the refresh control is currently enabled.
    pub fn refresh_enabled(&self) -> bool {
        !self.busy.load(Ordering::SeqCst)
    }
}

impl WeatherScreen for TerminalScreen {
    fn set_busy(&self, busy: bool) {
        let was = self.busy.swap(busy, Ordering::SeqCst);
        if busy && !was {
            eprintln!("Fetching weather for your location...");
        }
    }

    fn show_notice(&self, message: &str) {
        eprintln!("! {message}");
    }

    fn render(&self, display: &WeatherDisplay) {
        println!("{}", format_display(display));
    }
}

pub fn format_display(display: &WeatherDisplay) -> String {
    let updated = display.observed_at.with_timezone(&Local).format("%H:%M");

    format!(
        "\n  {location}, {country}\n\n  {temp:<8} {description}\n  Humidity  {humidity}\n  Wind      {wind}\n  Pressure  {pressure}\n\n  Updated at {updated}\n",
        location = display.location,
        country = display.country,
        temp = display.temperature,
        description = display.description,
        humidity = display.humidity,
        wind = display.wind,
        pressure = display.pressure,
    )
}
