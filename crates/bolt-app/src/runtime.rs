//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`App`]: pure state machine
//! - [`Driver`]: platform-specific I/O
//!
//! It also owns the two timers the app asks for: the one-second countdown
//! ticker and the reconnect deadline. Each is a single `Option` so dropping
//! the runtime releases them.

use std::{pin::Pin, time::Duration};

use bolt_core::{Environment, SessionConfig};
use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep};

use crate::{App, AppAction, AppEvent, Driver};

/// Countdown tick period.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Generic runtime that orchestrates App and Driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `E`: Environment for timestamps and correlation ids
pub struct Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    driver: D,
    app: App<E>,
    countdown: Option<Interval>,
    reconnect: Option<Pin<Box<Sleep>>>,
}

impl<D, E> Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    /// Create a runtime for `display_name` joining with `token`.
    pub fn new(
        driver: D,
        env: E,
        config: SessionConfig,
        display_name: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let app = App::new(env, config, display_name, token);
        Self { driver, app, countdown: None, reconnect: None }
    }

    /// Run the main event loop until the app quits or input ends.
    ///
    /// On exit the connection is torn down and both timers are released.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn run(mut self) -> Result<(), D::Error> {
        self.driver.render(&self.app)?;
        let actions = self.app.connect();
        let mut quit = self.execute(actions)?;

        while !quit {
            let event = tokio::select! {
                event = self.driver.next_event() => event?.unwrap_or(AppEvent::Quit),
                () = next_tick(self.countdown.as_mut()) => AppEvent::Tick,
                () = deadline(self.reconnect.as_mut()) => AppEvent::ReconnectDue,
            };
            if event == AppEvent::ReconnectDue {
                self.reconnect = None;
            }

            let actions = self.app.handle(event);
            quit = self.execute(actions)?;
        }

        let actions = self.app.disconnect();
        self.execute(actions)?;
        self.countdown = None;
        self.reconnect = None;
        self.driver.stop();
        Ok(())
    }

    /// Execute actions returned by the App.
    ///
    /// Returns `true` if the app should quit.
    fn execute(&mut self, actions: Vec<AppAction>) -> Result<bool, D::Error> {
        let mut quit = false;
        for action in actions {
            match action {
                AppAction::Render => self.driver.render(&self.app)?,
                AppAction::Quit => quit = true,
                AppAction::Open { generation, token } => self.driver.open(generation, &token),
                AppAction::Send(frame) => self.driver.send_frame(frame),
                AppAction::Close { generation } => self.driver.close(generation),
                AppAction::StartCountdown => {
                    let mut interval =
                        tokio::time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
                    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    self.countdown = Some(interval);
                },
                AppAction::StopCountdown => self.countdown = None,
                AppAction::ScheduleReconnect { delay } => {
                    self.reconnect = Some(Box::pin(tokio::time::sleep(delay)));
                },
                AppAction::CancelReconnect => self.reconnect = None,
            }
        }
        Ok(quit)
    }

    /// Get a reference to the App
    pub fn app(&self) -> &App<E> {
        &self.app
    }

    /// Get a reference to the Driver
    pub fn driver(&self) -> &D {
        &self.driver
    }
}

async fn next_tick(interval: Option<&mut Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        },
        None => std::future::pending().await,
    }
}

async fn deadline(sleep: Option<&mut Pin<Box<Sleep>>>) {
    match sleep {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
