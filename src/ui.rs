//! Console status reporting.
//!
//! Colored status lines on stdout and, when stderr is a terminal, a spinner
//! while a long network call or playback is running.

use colored::{Color, Colorize};
use std::io::{IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

const FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const FRAME_INTERVAL: Duration = Duration::from_millis(100);

/// Progress feedback for the pipeline stages
pub trait StatusReporter: Send + Sync {
    /// Plain status line
    fn info(&self, message: &str);
    /// A long-running step begins
    fn start(&self, message: &str);
    /// Replace the running step's message
    fn update(&self, message: &str);
    /// The running step finished
    fn stop(&self, message: &str);
    /// The running step failed
    fn fail(&self, message: &str);
}

struct Spinner {
    running: Arc<AtomicBool>,
    message: Arc<Mutex<String>>,
    handle: JoinHandle<()>,
}

impl Spinner {
    fn spawn(message: &str) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let message = Arc::new(Mutex::new(message.to_string()));

        let handle = {
            let running = Arc::clone(&running);
            let message = Arc::clone(&message);
            std::thread::spawn(move || {
                let mut stderr = std::io::stderr();
                for frame in FRAMES.iter().cycle() {
                    if !running.load(Ordering::Relaxed) {
                        break;
                    }
                    let text = message.lock().map(|m| m.clone()).unwrap_or_default();
                    let _ = write!(stderr, "\r\x1b[2K{} {}", frame.cyan(), text);
                    let _ = stderr.flush();
                    std::thread::sleep(FRAME_INTERVAL);
                }
                let _ = write!(stderr, "\r\x1b[2K");
                let _ = stderr.flush();
            })
        };

        Self {
            running,
            message,
            handle,
        }
    }

    fn set_message(&self, text: &str) {
        if let Ok(mut message) = self.message.lock() {
            *message = text.to_string();
        }
    }

    fn finish(self) {
        self.running.store(false, Ordering::Relaxed);
        let _ = self.handle.join();
    }
}

/// Colored console output with an animated spinner.
pub struct ConsoleStatus {
    animate: bool,
    spinner: Mutex<Option<Spinner>>,
}

impl Default for ConsoleStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleStatus {
    /// Animates only on a terminal; redirected stderr gets plain lines.
    pub fn new() -> Self {
        Self::with_animation(std::io::stderr().is_terminal())
    }

    pub fn with_animation(animate: bool) -> Self {
        Self {
            animate,
            spinner: Mutex::new(None),
        }
    }

    fn take_spinner(&self) {
        let spinner = self.spinner.lock().ok().and_then(|mut s| s.take());
        if let Some(spinner) = spinner {
            spinner.finish();
        }
    }
}

impl StatusReporter for ConsoleStatus {
    fn info(&self, message: &str) {
        println!("{}", message.color(Color::Blue));
    }

    fn start(&self, message: &str) {
        self.take_spinner();
        if !self.animate {
            println!("{} {}", "…".cyan(), message);
            return;
        }
        if let Ok(mut slot) = self.spinner.lock() {
            *slot = Some(Spinner::spawn(message));
        }
    }

    fn update(&self, message: &str) {
        let updated = self
            .spinner
            .lock()
            .ok()
            .and_then(|slot| slot.as_ref().map(|spinner| spinner.set_message(message)))
            .is_some();
        if !updated {
            self.info(message);
        }
    }

    fn stop(&self, message: &str) {
        self.take_spinner();
        println!("{} {}", "✔".green(), message.green());
    }

    fn fail(&self, message: &str) {
        self.take_spinner();
        eprintln!("{} {}", "✘".red(), message.red());
    }
}

impl Drop for ConsoleStatus {
    fn drop(&mut self) {
        self.take_spinner();
    }
}
